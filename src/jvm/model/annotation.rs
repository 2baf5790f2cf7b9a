use crate::jvm::class_file::{AnnotationInfo, ConstantPool, ElementValueInfo, ElementValuePair};
use crate::jvm::errors::u16_count;
use crate::jvm::{BaseType, Constant, Error, RenderDescriptor};

/// Annotation on a class, field, method, or parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Field descriptor of the annotation type (eg. `Ljava/lang/Deprecated;`)
    pub type_descriptor: String,

    /// Named element values, in declaration order
    pub elements: Vec<(String, ElementValue)>,
}

/// Value of an annotation element
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    /// `byte`, `char`, `int`, `short`, or `boolean` (all stored as `Integer` constants)
    Integer(BaseType, i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
    Enum {
        type_descriptor: String,
        const_name: String,
    },

    /// Return descriptor of the class (eg. `Ljava/lang/Object;` or `V`)
    Class(String),
    Annotation(Annotation),
    Array(Vec<ElementValue>),
}

impl Annotation {
    pub fn new<S: Into<String>>(type_descriptor: S) -> Annotation {
        Annotation {
            type_descriptor: type_descriptor.into(),
            elements: vec![],
        }
    }

    pub fn register(&self, pool: &mut ConstantPool) -> Result<(), Error> {
        pool.add(Constant::utf8(self.type_descriptor.as_str()))?;
        for (name, value) in &self.elements {
            pool.add(Constant::utf8(name.as_str()))?;
            value.register(pool)?;
        }
        Ok(())
    }

    pub fn serialize_annotation(&self, pool: &ConstantPool) -> Result<AnnotationInfo, Error> {
        let element_value_pairs = self
            .elements
            .iter()
            .map(|(name, value)| {
                Ok(ElementValuePair {
                    name_index: pool.utf8_index(name)?,
                    value: value.serialize_value(pool)?,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        u16_count(element_value_pairs.len(), "annotation elements")?;
        Ok(AnnotationInfo {
            type_index: pool.utf8_index(&self.type_descriptor)?,
            element_value_pairs,
        })
    }
}

impl ElementValue {
    /// Make an integer-like element, checking that the value fits the type
    pub fn integer(base_type: BaseType, value: i64) -> Result<ElementValue, Error> {
        let (min, max) = base_type.int_range().ok_or_else(|| {
            let msg = format!("'{}' element values are not integers", base_type.render());
            Error::structural(msg)
        })?;
        if value < min || value > max {
            let msg = format!("{} does not fit in a '{}' element", value, base_type.render());
            return Err(Error::numeric(msg));
        }
        Ok(ElementValue::Integer(base_type, value as i32))
    }

    /// Constant backing a primitive or string element
    fn constant(&self) -> Option<Constant> {
        match self {
            ElementValue::Integer(_, value) => Some(Constant::Integer(*value)),
            ElementValue::Float(value) => Some(Constant::float(*value)),
            ElementValue::Long(value) => Some(Constant::Long(*value)),
            ElementValue::Double(value) => Some(Constant::double(*value)),
            ElementValue::String(value) => Some(Constant::utf8(value.as_str())),
            _ => None,
        }
    }

    fn tag(&self) -> u8 {
        match self {
            ElementValue::Integer(base_type, _) => match base_type {
                BaseType::Byte => b'B',
                BaseType::Char => b'C',
                BaseType::Short => b'S',
                BaseType::Boolean => b'Z',
                _ => b'I',
            },
            ElementValue::Float(_) => b'F',
            ElementValue::Long(_) => b'J',
            ElementValue::Double(_) => b'D',
            ElementValue::String(_) => b's',
            ElementValue::Enum { .. } => b'e',
            ElementValue::Class(_) => b'c',
            ElementValue::Annotation(_) => b'@',
            ElementValue::Array(_) => b'[',
        }
    }

    pub fn register(&self, pool: &mut ConstantPool) -> Result<(), Error> {
        if let Some(constant) = self.constant() {
            return pool.add(constant);
        }
        match self {
            ElementValue::Enum {
                type_descriptor,
                const_name,
            } => {
                pool.add(Constant::utf8(type_descriptor.as_str()))?;
                pool.add(Constant::utf8(const_name.as_str()))?;
            }
            ElementValue::Class(descriptor) => pool.add(Constant::utf8(descriptor.as_str()))?,
            ElementValue::Annotation(annotation) => annotation.register(pool)?,
            ElementValue::Array(values) => {
                for value in values {
                    value.register(pool)?;
                }
            }
            _ => (),
        }
        Ok(())
    }

    pub fn serialize_value(&self, pool: &ConstantPool) -> Result<ElementValueInfo, Error> {
        if let Some(constant) = self.constant() {
            return Ok(ElementValueInfo::Const {
                tag: self.tag(),
                value: pool.index_of(&constant)?,
            });
        }
        Ok(match self {
            ElementValue::Enum {
                type_descriptor,
                const_name,
            } => ElementValueInfo::Enum {
                type_name: pool.utf8_index(type_descriptor)?,
                const_name: pool.utf8_index(const_name)?,
            },
            ElementValue::Class(descriptor) => ElementValueInfo::Class(pool.utf8_index(descriptor)?),
            ElementValue::Annotation(annotation) => {
                ElementValueInfo::Annotation(annotation.serialize_annotation(pool)?)
            }
            ElementValue::Array(values) => {
                u16_count(values.len(), "array element values")?;
                ElementValueInfo::Array(
                    values
                        .iter()
                        .map(|value| value.serialize_value(pool))
                        .collect::<Result<_, _>>()?,
                )
            }
            _ => return Err(Error::internal("primitive element value without a constant")),
        })
    }
}
