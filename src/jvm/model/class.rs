use crate::jvm::class_file::{
    self, encode_modified_utf8, ClassFile, ConstantIndex, ConstantPool, EnclosingMethod,
    InnerClass, InnerClasses, SourceDebugExtension, SourceFile, Version,
};
use crate::jvm::errors::u16_count;
use crate::jvm::model::{CommonAttributes, Field, Method};
use crate::jvm::verifier::StackMapForm;
use crate::jvm::{ClassAccessFlags, Constant, Error, InnerClassAccessFlags};

/// Class enclosing a local or anonymous class
#[derive(Debug, Clone, PartialEq)]
pub struct EnclosingMethodRef {
    pub class: String,

    /// Name and descriptor of the enclosing method, if there is one
    pub method: Option<(String, String)>,
}

/// Entry in the `InnerClasses` attribute (absent parts are written as `0`)
#[derive(Debug, Clone, PartialEq)]
pub struct InnerClassEntry {
    pub inner_class: Option<String>,
    pub outer_class: Option<String>,
    pub inner_name: Option<String>,
    pub access_flags: InnerClassAccessFlags,
}

/// Semantic representation of a class
#[derive(Debug)]
pub struct Class {
    pub version: Version,
    pub access_flags: ClassAccessFlags,

    /// Binary name of the class (eg. `java/lang/String`)
    pub this_class: Option<String>,

    /// Must be set for every class except `java/lang/Object`
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,

    pub source_file: Option<String>,
    pub enclosing_method: Option<EnclosingMethodRef>,
    pub inner_classes: Vec<InnerClassEntry>,
    pub source_debug_extension: Option<String>,
    pub attributes: CommonAttributes,
}

impl Default for Class {
    fn default() -> Class {
        Class {
            version: Version::default(),
            access_flags: ClassAccessFlags::empty(),
            this_class: None,
            super_class: None,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            source_file: None,
            enclosing_method: None,
            inner_classes: vec![],
            source_debug_extension: None,
            attributes: CommonAttributes::default(),
        }
    }
}

impl Class {
    /// Create a new class
    pub fn new<S: Into<String>>(this_class: S) -> Class {
        Class {
            this_class: Some(this_class.into()),
            ..Class::default()
        }
    }

    /// Serialize the class into a class file
    ///
    /// This happens in two passes: first every constant the class needs is registered and the
    /// pool finalized, then fields, methods, and attributes get lowered using the final indices.
    pub fn serialize(self) -> Result<ClassFile, Error> {
        let this_class = self
            .this_class
            .clone()
            .ok_or_else(|| Error::structural("missing class name"))?;
        let super_class = match &self.super_class {
            Some(super_class) => Some(super_class.as_str()),
            None if this_class == "java/lang/Object" => None,
            None => {
                let msg = format!("missing super class for '{}'", this_class);
                return Err(Error::structural(msg));
            }
        };
        let form = StackMapForm::for_version(self.version);

        // Register everything
        let mut pool = ConstantPool::new();
        pool.add(Constant::class(this_class.as_str()))?;
        if let Some(super_class) = super_class {
            pool.add(Constant::class(super_class))?;
        }
        for interface in &self.interfaces {
            pool.add(Constant::class(interface.as_str()))?;
        }
        for field in &self.fields {
            field.register(&mut pool)?;
        }
        for method in &self.methods {
            method.register(&mut pool, form)?;
        }
        self.register_attributes(&mut pool)?;
        pool.finalize()?;

        // Lower
        let this_index = pool.class_index(&this_class)?;
        let super_index = match super_class {
            Some(super_class) => pool.class_index(super_class)?,
            None => ConstantIndex::NONE,
        };
        let interfaces = self
            .interfaces
            .iter()
            .map(|interface| pool.class_index(interface))
            .collect::<Result<Vec<_>, Error>>()?;
        u16_count(interfaces.len(), "interfaces")?;

        let attributes = self.serialize_attributes(&pool)?;

        let fields: Vec<class_file::Field> = self
            .fields
            .iter()
            .map(|field| field.serialize_field(&pool))
            .collect::<Result<_, Error>>()?;
        u16_count(fields.len(), "fields")?;

        let methods: Vec<class_file::Method> = self
            .methods
            .into_iter()
            .map(|method| method.serialize_method(&pool, &this_class, form))
            .collect::<Result<_, Error>>()?;
        u16_count(methods.len(), "methods")?;

        log::debug!(
            "Serialized class {} ({} constants, {} fields, {} methods)",
            this_class,
            pool.len(),
            fields.len(),
            methods.len()
        );
        Ok(ClassFile {
            version: self.version,
            constant_pool_count: pool.count()?,
            constants: pool.entries()?,
            access_flags: self.access_flags,
            this_class: this_index,
            super_class: super_index,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    fn register_attributes(&self, pool: &mut ConstantPool) -> Result<(), Error> {
        if let Some(source_file) = &self.source_file {
            pool.add(Constant::utf8("SourceFile"))?;
            pool.add(Constant::utf8(source_file.as_str()))?;
        }
        if let Some(enclosing) = &self.enclosing_method {
            pool.add(Constant::utf8("EnclosingMethod"))?;
            pool.add(Constant::class(enclosing.class.as_str()))?;
            if let Some((name, descriptor)) = &enclosing.method {
                pool.add(Constant::name_and_type(name.as_str(), descriptor.as_str()))?;
            }
        }
        if !self.inner_classes.is_empty() {
            pool.add(Constant::utf8("InnerClasses"))?;
            for entry in &self.inner_classes {
                for class in entry.inner_class.iter().chain(&entry.outer_class) {
                    pool.add(Constant::class(class.as_str()))?;
                }
                if let Some(name) = &entry.inner_name {
                    pool.add(Constant::utf8(name.as_str()))?;
                }
            }
        }
        if self.source_debug_extension.is_some() {
            pool.add(Constant::utf8("SourceDebugExtension"))?;
        }
        self.attributes.register(pool)
    }

    fn serialize_attributes(&self, pool: &ConstantPool) -> Result<Vec<class_file::Attribute>, Error> {
        let mut attributes = vec![];

        // `SourceFile` attribute
        if let Some(source_file) = &self.source_file {
            attributes.push(pool.attribute(&SourceFile(pool.utf8_index(source_file)?))?);
        }

        // `EnclosingMethod` attribute
        if let Some(enclosing) = &self.enclosing_method {
            let method = match &enclosing.method {
                Some((name, descriptor)) => {
                    pool.index_of(&Constant::name_and_type(name.as_str(), descriptor.as_str()))?
                }
                None => ConstantIndex::NONE,
            };
            let class = pool.class_index(&enclosing.class)?;
            attributes.push(pool.attribute(&EnclosingMethod { class, method })?);
        }

        // `InnerClasses` attribute
        if !self.inner_classes.is_empty() {
            let class_or_zero = |class: &Option<String>| match class {
                Some(class) => pool.class_index(class),
                None => Ok(ConstantIndex::NONE),
            };
            let inner_classes = self
                .inner_classes
                .iter()
                .map(|entry| {
                    Ok(InnerClass {
                        inner_class: class_or_zero(&entry.inner_class)?,
                        outer_class: class_or_zero(&entry.outer_class)?,
                        inner_name: match &entry.inner_name {
                            Some(name) => pool.utf8_index(name)?,
                            None => ConstantIndex::NONE,
                        },
                        access_flags: entry.access_flags,
                    })
                })
                .collect::<Result<Vec<_>, Error>>()?;
            u16_count(inner_classes.len(), "inner classes")?;
            attributes.push(pool.attribute(&InnerClasses(inner_classes))?);
        }

        // `SourceDebugExtension` attribute
        if let Some(extension) = &self.source_debug_extension {
            let extension = SourceDebugExtension(encode_modified_utf8(extension));
            attributes.push(pool.attribute(&extension)?);
        }

        self.attributes.serialize_into(pool, &mut attributes)?;
        u16_count(attributes.len(), "class attributes")?;
        Ok(attributes)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{CodeAttr, Insn, Opcode, Operand};
    use crate::jvm::{FieldAccessFlags, MethodAccessFlags};

    #[test]
    fn needs_names() {
        assert!(Class::default().serialize().is_err());
        assert!(Class::new("Foo").serialize().is_err());

        let object = Class::new("java/lang/Object").serialize().unwrap();
        assert_eq!(object.super_class, ConstantIndex::NONE);
    }

    #[test]
    fn return_only_method() {
        let mut class = Class::new("Foo");
        class.super_class = Some("java/lang/Object".to_owned());

        let mut code = CodeAttr::new();
        code.max_stack = Some(0);
        code.max_locals = Some(0);
        let ret = Opcode::lookup("return").unwrap();
        code.push_insn(Insn::new(ret, Operand::None).unwrap());
        let mut method = Method::new(MethodAccessFlags::STATIC, "run", "()V");
        method.code = Some(code);
        class.methods.push(method);

        let class_file = class.serialize().unwrap();
        assert_eq!(class_file.methods.len(), 1);
        let code = &class_file.methods[0].attributes[0].info;
        assert_eq!(&code[0..9], &[0, 0, 0, 0, 0, 0, 0, 1, 0xb1]);
    }

    #[test]
    fn class_attributes() {
        let mut class = Class::new("Outer$1");
        class.super_class = Some("java/lang/Object".to_owned());
        class.source_file = Some("Outer.j".to_owned());
        class.enclosing_method = Some(EnclosingMethodRef {
            class: "Outer".to_owned(),
            method: None,
        });
        class.inner_classes.push(InnerClassEntry {
            inner_class: Some("Outer$1".to_owned()),
            outer_class: None,
            inner_name: None,
            access_flags: InnerClassAccessFlags::empty(),
        });
        class.source_debug_extension = Some("SMAP".to_owned());
        class
            .fields
            .push(Field::new(FieldAccessFlags::PRIVATE, "x", "I"));

        let class_file = class.serialize().unwrap();
        assert_eq!(class_file.fields.len(), 1);
        assert_eq!(class_file.attributes.len(), 4);

        let outer_1 = class_file.this_class.0 as u8;
        assert_eq!(class_file.attributes[2].info, vec![0, 1, 0, outer_1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(class_file.attributes[3].info, b"SMAP".to_vec());
        assert_eq!(&class_file.attributes[1].info[2..4], &[0, 0]);
    }
}
