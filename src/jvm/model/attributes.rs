use crate::jvm::class_file::{
    AnnotationInfo, Attribute, ConstantPool, Deprecated, RuntimeInvisibleAnnotations,
    RuntimeVisibleAnnotations, Signature,
};
use crate::jvm::errors::u16_count;
use crate::jvm::model::Annotation;
use crate::jvm::{Constant, Error};

/// Attribute the assembler knows nothing about, written out as-is
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAttribute {
    pub name: String,
    pub info: Vec<u8>,
}

impl CustomAttribute {
    pub fn new<S: Into<String>>(name: S, info: Vec<u8>) -> CustomAttribute {
        CustomAttribute {
            name: name.into(),
            info,
        }
    }

    pub fn register(&self, pool: &mut ConstantPool) -> Result<(), Error> {
        pool.add(Constant::utf8(self.name.as_str()))
    }

    pub fn resolve(&self, pool: &ConstantPool) -> Result<Attribute, Error> {
        Attribute::new(pool.utf8_index(&self.name)?, self.info.clone())
    }
}

/// Attributes that classes, fields, and methods can all carry
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CommonAttributes {
    /// Generic signature
    ///
    /// [Format](https://docs.oracle.com/javase/specs/jvms/se11/html/jvms-4.html#jvms-4.7.9.1)
    pub signature: Option<String>,
    pub deprecated: bool,
    pub visible_annotations: Vec<Annotation>,
    pub invisible_annotations: Vec<Annotation>,
    pub custom: Vec<CustomAttribute>,
}

impl CommonAttributes {
    pub fn register(&self, pool: &mut ConstantPool) -> Result<(), Error> {
        if let Some(signature) = &self.signature {
            pool.add(Constant::utf8("Signature"))?;
            pool.add(Constant::utf8(signature.as_str()))?;
        }
        if self.deprecated {
            pool.add(Constant::utf8("Deprecated"))?;
        }
        if !self.visible_annotations.is_empty() {
            pool.add(Constant::utf8("RuntimeVisibleAnnotations"))?;
        }
        if !self.invisible_annotations.is_empty() {
            pool.add(Constant::utf8("RuntimeInvisibleAnnotations"))?;
        }
        for annotation in self.visible_annotations.iter().chain(&self.invisible_annotations) {
            annotation.register(pool)?;
        }
        for attribute in &self.custom {
            attribute.register(pool)?;
        }
        Ok(())
    }

    /// Append the encoded attributes (custom ones last)
    pub fn serialize_into(
        &self,
        pool: &ConstantPool,
        attributes: &mut Vec<Attribute>,
    ) -> Result<(), Error> {
        if let Some(signature) = &self.signature {
            attributes.push(pool.attribute(&Signature(pool.utf8_index(signature)?))?);
        }
        if self.deprecated {
            attributes.push(pool.attribute(&Deprecated)?);
        }
        if !self.visible_annotations.is_empty() {
            let annotations = serialize_annotations(&self.visible_annotations, pool)?;
            attributes.push(pool.attribute(&RuntimeVisibleAnnotations(annotations))?);
        }
        if !self.invisible_annotations.is_empty() {
            let annotations = serialize_annotations(&self.invisible_annotations, pool)?;
            attributes.push(pool.attribute(&RuntimeInvisibleAnnotations(annotations))?);
        }
        for attribute in &self.custom {
            attributes.push(attribute.resolve(pool)?);
        }
        Ok(())
    }
}

pub(crate) fn serialize_annotations(
    annotations: &[Annotation],
    pool: &ConstantPool,
) -> Result<Vec<AnnotationInfo>, Error> {
    u16_count(annotations.len(), "annotations")?;
    annotations
        .iter()
        .map(|annotation| annotation.serialize_annotation(pool))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn attribute_order() {
        let attributes = CommonAttributes {
            signature: Some("TT;".to_owned()),
            deprecated: true,
            visible_annotations: vec![Annotation::new("LA;")],
            invisible_annotations: vec![],
            custom: vec![CustomAttribute::new("Custom", vec![1, 2, 3])],
        };

        let mut pool = ConstantPool::new();
        attributes.register(&mut pool).unwrap();
        pool.finalize().unwrap();
        let mut encoded = vec![];
        attributes.serialize_into(&pool, &mut encoded).unwrap();

        let names: Vec<_> = encoded.iter().map(|attribute| attribute.name_index).collect();
        assert_eq!(
            names,
            vec![
                pool.utf8_index("Signature").unwrap(),
                pool.utf8_index("Deprecated").unwrap(),
                pool.utf8_index("RuntimeVisibleAnnotations").unwrap(),
                pool.utf8_index("Custom").unwrap(),
            ]
        );
        assert!(encoded[1].info.is_empty());
        assert_eq!(encoded[3].info, vec![1, 2, 3]);
    }
}
