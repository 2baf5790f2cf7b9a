use crate::jvm::class_file::{ConstantIndex, ConstantPool, Serialize};
use crate::jvm::code::{Label, LabelTable};
use crate::jvm::{BaseType, Constant, Error, FieldType};
use crate::util::Width;
use byteorder::WriteBytesExt;

/// These types are from [this hierarchy][0]
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-4.html#jvms-4.10.1.2
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum VerificationType<Cls, U> {
    /// Unusable slot (eg. a local that hasn't been set yet)
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,

    /// In the constructor, the `this` parameter starts with this type then turns into an object
    /// type after `<init>` is called
    UninitializedThis,

    /// Object type
    Object(Cls),

    /// State of an object after `new` has been called but `<init>` has not been called
    ///
    ///   - while assembling, we use [`CodeOffset`] for `U`, since the `new` instruction can be
    ///     identified by a label that has not been placed yet.
    ///   - when serializing into a classfile, we use `u16` for `U`, corresponding to the offset of
    ///     the `new` instruction from the start of the method body
    Uninitialized(U),
}

/// Position in the code, either known up front or identified by a label
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum CodeOffset {
    Offset(u16),
    Label(Label),
}

impl CodeOffset {
    /// Resolve to an absolute offset (labels only have offsets after layout)
    pub fn resolve(&self, labels: &LabelTable) -> Result<u16, Error> {
        match self {
            CodeOffset::Offset(offset) => Ok(*offset),
            CodeOffset::Label(label) => {
                let offset = labels.offset(*label)?;
                u16::try_from(offset).map_err(|_| {
                    Error::numeric(format!("label '{}' is at offset {}", labels.name(*label), offset))
                })
            }
        }
    }
}

/// Verification type as it is declared in assembly
pub type DeclaredType = VerificationType<String, CodeOffset>;

impl<Cls, U> VerificationType<Cls, U> {
    pub fn try_map<'a, C2, U2, E>(
        &'a self,
        map_class: impl FnOnce(&'a Cls) -> Result<C2, E>,
        map_uninitialized: impl FnOnce(&'a U) -> Result<U2, E>,
    ) -> Result<VerificationType<C2, U2>, E> {
        Ok(match self {
            VerificationType::Top => VerificationType::Top,
            VerificationType::Integer => VerificationType::Integer,
            VerificationType::Float => VerificationType::Float,
            VerificationType::Long => VerificationType::Long,
            VerificationType::Double => VerificationType::Double,
            VerificationType::Null => VerificationType::Null,
            VerificationType::UninitializedThis => VerificationType::UninitializedThis,
            VerificationType::Object(cls) => VerificationType::Object(map_class(cls)?),
            VerificationType::Uninitialized(uninit) => {
                VerificationType::Uninitialized(map_uninitialized(uninit)?)
            }
        })
    }
}

impl DeclaredType {
    /// Parse the verification type names used in `.stack` directives
    ///
    /// `Object` and `Uninitialized` take an argument (class name and offset or label); all the
    /// others are bare names.
    pub fn from_name(
        name: &str,
        argument: Option<&str>,
        labels: &mut LabelTable,
    ) -> Result<DeclaredType, Error> {
        let typ = match (name, argument) {
            ("Top", None) => VerificationType::Top,
            ("Integer", None) => VerificationType::Integer,
            ("Float", None) => VerificationType::Float,
            ("Long", None) => VerificationType::Long,
            ("Double", None) => VerificationType::Double,
            ("Null", None) => VerificationType::Null,
            ("UninitializedThis", None) => VerificationType::UninitializedThis,
            ("Object", Some(class)) => VerificationType::Object(class.to_owned()),
            ("Uninitialized", Some(position)) => {
                let offset = match position.parse::<i64>() {
                    Ok(offset) => CodeOffset::Offset(u16::try_from(offset).map_err(|_| {
                        Error::numeric(format!("uninitialized offset {} is out of range", offset))
                    })?),
                    Err(_) => CodeOffset::Label(labels.label(position)),
                };
                VerificationType::Uninitialized(offset)
            }
            ("Object" | "Uninitialized", None) => {
                let msg = format!("verification type '{}' needs an argument", name);
                return Err(Error::structural(msg));
            }
            (_, Some(_)) if Self::is_simple_name(name) => {
                let msg = format!("verification type '{}' takes no argument", name);
                return Err(Error::structural(msg));
            }
            _ => {
                let msg = format!("unknown verification type '{}'", name);
                return Err(Error::structural(msg));
            }
        };
        Ok(typ)
    }

    fn is_simple_name(name: &str) -> bool {
        matches!(
            name,
            "Top" | "Integer" | "Float" | "Long" | "Double" | "Null" | "UninitializedThis"
        )
    }

    /// Resolve labels (but not classes) so that types can be compared
    pub fn resolve_offsets(&self, labels: &LabelTable) -> Result<VerificationType<&str, u16>, Error> {
        self.try_map(|cls| Ok(cls.as_str()), |offset| offset.resolve(labels))
    }
}

impl<'a> VerificationType<&'a str, u16> {
    /// Resolve classes into constant pool indices
    pub fn resolve_classes(
        &self,
        pool: &ConstantPool,
    ) -> Result<VerificationType<ConstantIndex, u16>, Error> {
        self.try_map(|cls| pool.class_index(cls), |offset| Ok(*offset))
    }
}

impl From<&FieldType> for DeclaredType {
    fn from(field_type: &FieldType) -> Self {
        match field_type {
            FieldType::Base(BaseType::Int)
            | FieldType::Base(BaseType::Char)
            | FieldType::Base(BaseType::Short)
            | FieldType::Base(BaseType::Byte)
            | FieldType::Base(BaseType::Boolean) => VerificationType::Integer,
            FieldType::Base(BaseType::Float) => VerificationType::Float,
            FieldType::Base(BaseType::Long) => VerificationType::Long,
            FieldType::Base(BaseType::Double) => VerificationType::Double,
            FieldType::Ref(class) => VerificationType::Object(class.clone()),
        }
    }
}

impl DeclaredType {
    /// Class constant needed to write this type out
    pub fn constant(&self) -> Option<Constant> {
        match self {
            VerificationType::Object(cls) => Some(Constant::class(cls.as_str())),
            _ => None,
        }
    }
}

impl Serialize for VerificationType<ConstantIndex, u16> {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            VerificationType::Top => 0u8.serialize(writer)?,
            VerificationType::Integer => 1u8.serialize(writer)?,
            VerificationType::Float => 2u8.serialize(writer)?,
            VerificationType::Double => 3u8.serialize(writer)?,
            VerificationType::Long => 4u8.serialize(writer)?,
            VerificationType::Null => 5u8.serialize(writer)?,
            VerificationType::UninitializedThis => 6u8.serialize(writer)?,
            VerificationType::Object(cls) => {
                7u8.serialize(writer)?;
                cls.serialize(writer)?;
            }
            VerificationType::Uninitialized(off) => {
                8u8.serialize(writer)?;
                off.serialize(writer)?;
            }
        };
        Ok(())
    }
}

impl<Cls, A> Width for VerificationType<Cls, A> {
    fn width(&self) -> usize {
        match self {
            VerificationType::Double | VerificationType::Long => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_type_names() {
        let mut labels = LabelTable::new();
        assert_eq!(
            DeclaredType::from_name("Integer", None, &mut labels).unwrap(),
            VerificationType::Integer
        );
        assert_eq!(
            DeclaredType::from_name("Object", Some("java/lang/String"), &mut labels).unwrap(),
            VerificationType::Object("java/lang/String".to_owned())
        );
        assert_eq!(
            DeclaredType::from_name("Uninitialized", Some("12"), &mut labels).unwrap(),
            VerificationType::Uninitialized(CodeOffset::Offset(12))
        );
        let label = labels.label("New");
        assert_eq!(
            DeclaredType::from_name("Uninitialized", Some("New"), &mut labels).unwrap(),
            VerificationType::Uninitialized(CodeOffset::Label(label))
        );
        assert!(DeclaredType::from_name("Object", None, &mut labels).is_err());
        assert!(DeclaredType::from_name("Integer", Some("x"), &mut labels).is_err());
        assert!(DeclaredType::from_name("Boolean", None, &mut labels).is_err());
        assert!(DeclaredType::from_name("Uninitialized", Some("70000"), &mut labels)
            .unwrap_err()
            .is_numeric());
    }

    #[test]
    fn field_types_widen_to_integer() {
        assert_eq!(
            DeclaredType::from(&FieldType::Base(BaseType::Boolean)),
            VerificationType::Integer
        );
        assert_eq!(DeclaredType::from(&FieldType::long()), VerificationType::Long);
        assert_eq!(
            DeclaredType::from(&FieldType::object("[I")),
            VerificationType::Object("[I".to_owned())
        );
    }

    #[test]
    fn type_tags() {
        let typ: VerificationType<ConstantIndex, u16> = VerificationType::Top;
        assert_eq!(typ.to_vec().unwrap(), vec![0]);
        let typ: VerificationType<ConstantIndex, u16> = VerificationType::Object(ConstantIndex(3));
        assert_eq!(typ.to_vec().unwrap(), vec![7, 0, 3]);
        let typ: VerificationType<ConstantIndex, u16> = VerificationType::Uninitialized(258);
        assert_eq!(typ.to_vec().unwrap(), vec![8, 1, 2]);
    }
}
