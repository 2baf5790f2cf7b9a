use crate::jvm::class_file::{self, ConstantPool, ConstantValue};
use crate::jvm::model::CommonAttributes;
use crate::jvm::{BaseType, Constant, Error, FieldAccessFlags, FieldType, ParseDescriptor};

/// Semantic representation of a field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub access_flags: FieldAccessFlags,
    pub name: String,
    pub descriptor: String,

    /// Constant field value (only meaningful on `static` fields)
    pub constant_value: Option<Constant>,
    pub attributes: CommonAttributes,
}

impl Field {
    pub fn new<S1: Into<String>, S2: Into<String>>(
        access_flags: FieldAccessFlags,
        name: S1,
        descriptor: S2,
    ) -> Field {
        Field {
            access_flags,
            name: name.into(),
            descriptor: descriptor.into(),
            constant_value: None,
            attributes: CommonAttributes::default(),
        }
    }

    /// Set the constant value, checking it has the right kind for the field descriptor
    pub fn set_constant_value(&mut self, constant: Constant) -> Result<(), Error> {
        let field_type = FieldType::parse(&self.descriptor)?;
        let matches = match (&field_type, &constant) {
            (FieldType::Base(BaseType::Float), Constant::Float(_)) => true,
            (FieldType::Base(BaseType::Long), Constant::Long(_)) => true,
            (FieldType::Base(BaseType::Double), Constant::Double(_)) => true,
            (FieldType::Base(base_type), Constant::Integer(value)) => {
                match base_type.int_range() {
                    Some((min, max)) => {
                        let value = *value as i64;
                        if value < min || value > max {
                            let msg = format!(
                                "{} does not fit in field '{}' of type '{}'",
                                value, self.name, self.descriptor
                            );
                            return Err(Error::numeric(msg));
                        }
                        true
                    }
                    None => false,
                }
            }
            (field_type, Constant::String(_)) => field_type.is_string(),
            _ => false,
        };
        if !matches {
            let msg = format!(
                "constant value {:?} does not match type '{}' of field '{}'",
                constant, self.descriptor, self.name
            );
            return Err(Error::structural(msg));
        }
        self.constant_value = Some(constant);
        Ok(())
    }

    pub fn register(&self, pool: &mut ConstantPool) -> Result<(), Error> {
        pool.add(Constant::utf8(self.name.as_str()))?;
        pool.add(Constant::utf8(self.descriptor.as_str()))?;
        if let Some(constant) = &self.constant_value {
            pool.add(Constant::utf8("ConstantValue"))?;
            pool.add(constant.clone())?;
        }
        self.attributes.register(pool)
    }

    /// Serialize the field
    pub fn serialize_field(&self, pool: &ConstantPool) -> Result<class_file::Field, Error> {
        let mut attributes = vec![];

        // `ConstantValue` attribute
        if let Some(constant) = &self.constant_value {
            let value = ConstantValue(pool.index_of(constant)?);
            attributes.push(pool.attribute(&value)?);
        }
        self.attributes.serialize_into(pool, &mut attributes)?;

        log::debug!("Serialized field {} {}", self.name, self.descriptor);
        Ok(class_file::Field {
            access_flags: self.access_flags,
            name_index: pool.utf8_index(&self.name)?,
            descriptor_index: pool.utf8_index(&self.descriptor)?,
            attributes,
        })
    }
}
