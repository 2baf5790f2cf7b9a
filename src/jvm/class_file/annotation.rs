use crate::jvm::class_file::{ConstantIndex, Serialize};
use byteorder::WriteBytesExt;
use std::io::Result;

/// Annotation as it is laid out inside the annotation attributes
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.16
#[derive(Debug, PartialEq)]
pub struct AnnotationInfo {
    /// UTF8 constant holding a field descriptor for the annotation type
    pub type_index: ConstantIndex,
    pub element_value_pairs: Vec<ElementValuePair>,
}

#[derive(Debug, PartialEq)]
pub struct ElementValuePair {
    pub name_index: ConstantIndex,
    pub value: ElementValueInfo,
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.16.1
#[derive(Debug, PartialEq)]
pub enum ElementValueInfo {
    /// Primitive or string constant (tag is one of `B C D F I J S Z s`)
    Const { tag: u8, value: ConstantIndex },

    Enum {
        type_name: ConstantIndex,
        const_name: ConstantIndex,
    },

    /// UTF8 constant holding a return descriptor
    Class(ConstantIndex),

    Annotation(AnnotationInfo),

    Array(Vec<ElementValueInfo>),
}

impl Serialize for AnnotationInfo {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.type_index.serialize(writer)?;
        self.element_value_pairs.serialize(writer)?;
        Ok(())
    }
}

impl Serialize for ElementValuePair {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.name_index.serialize(writer)?;
        self.value.serialize(writer)?;
        Ok(())
    }
}

impl Serialize for ElementValueInfo {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        match self {
            ElementValueInfo::Const { tag, value } => {
                tag.serialize(writer)?;
                value.serialize(writer)?;
            }
            ElementValueInfo::Enum {
                type_name,
                const_name,
            } => {
                b'e'.serialize(writer)?;
                type_name.serialize(writer)?;
                const_name.serialize(writer)?;
            }
            ElementValueInfo::Class(return_descriptor) => {
                b'c'.serialize(writer)?;
                return_descriptor.serialize(writer)?;
            }
            ElementValueInfo::Annotation(annotation) => {
                b'@'.serialize(writer)?;
                annotation.serialize(writer)?;
            }
            ElementValueInfo::Array(values) => {
                b'['.serialize(writer)?;
                values.serialize(writer)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn nested_element_values() {
        let annotation = AnnotationInfo {
            type_index: ConstantIndex(1),
            element_value_pairs: vec![ElementValuePair {
                name_index: ConstantIndex(2),
                value: ElementValueInfo::Array(vec![
                    ElementValueInfo::Const {
                        tag: b'I',
                        value: ConstantIndex(3),
                    },
                    ElementValueInfo::Enum {
                        type_name: ConstantIndex(4),
                        const_name: ConstantIndex(5),
                    },
                ]),
            }],
        };
        assert_eq!(
            annotation.to_vec().unwrap(),
            vec![0, 1, 0, 1, 0, 2, b'[', 0, 2, b'I', 0, 3, b'e', 0, 4, 0, 5]
        );
    }
}
