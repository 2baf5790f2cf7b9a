use crate::jvm::class_file::{
    self, AnnotationDefault, ConstantPool, Exceptions, RuntimeInvisibleParameterAnnotations,
    RuntimeVisibleParameterAnnotations,
};
use crate::jvm::code::{BodyContext, CodeAttr};
use crate::jvm::errors::u16_count;
use crate::jvm::model::{serialize_annotations, Annotation, CommonAttributes, ElementValue};
use crate::jvm::verifier::{self, StackMapForm};
use crate::jvm::{Constant, Error, MethodAccessFlags, MethodDescriptor, ParseDescriptor};

/// Semantic representation of a method
#[derive(Debug)]
pub struct Method {
    pub access_flags: MethodAccessFlags,
    pub name: String,
    pub descriptor: String,

    /// Method code implementation
    pub code: Option<CodeAttr>,

    /// Which exceptions can this method throw?
    ///
    /// Note: this does not need to include `RuntimeException`, `Error`, or subclasses
    pub exceptions: Vec<String>,

    /// Annotations on each parameter (indexed by parameter)
    pub visible_parameter_annotations: Vec<Vec<Annotation>>,
    pub invisible_parameter_annotations: Vec<Vec<Annotation>>,

    /// Default value of an annotation interface element
    pub annotation_default: Option<ElementValue>,
    pub attributes: CommonAttributes,
}

impl Method {
    /// Create a new method
    pub fn new<S1: Into<String>, S2: Into<String>>(
        access_flags: MethodAccessFlags,
        name: S1,
        descriptor: S2,
    ) -> Method {
        Method {
            access_flags,
            name: name.into(),
            descriptor: descriptor.into(),
            code: None,
            exceptions: vec![],
            visible_parameter_annotations: vec![],
            invisible_parameter_annotations: vec![],
            annotation_default: None,
            attributes: CommonAttributes::default(),
        }
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    /// Abstract and native methods have no body
    pub fn may_have_code(&self) -> bool {
        !self
            .access_flags
            .intersects(MethodAccessFlags::ABSTRACT | MethodAccessFlags::NATIVE)
    }

    pub fn register(&self, pool: &mut ConstantPool, form: StackMapForm) -> Result<(), Error> {
        pool.add(Constant::utf8(self.name.as_str()))?;
        pool.add(Constant::utf8(self.descriptor.as_str()))?;
        if let Some(code) = &self.code {
            code.register(pool, form)?;
        }
        if !self.exceptions.is_empty() {
            pool.add(Constant::utf8("Exceptions"))?;
            for exception in &self.exceptions {
                pool.add(Constant::class(exception.as_str()))?;
            }
        }
        let parameter_annotations = [
            (
                &self.visible_parameter_annotations,
                "RuntimeVisibleParameterAnnotations",
            ),
            (
                &self.invisible_parameter_annotations,
                "RuntimeInvisibleParameterAnnotations",
            ),
        ];
        for (parameters, name) in parameter_annotations {
            if !parameters.is_empty() {
                pool.add(Constant::utf8(name))?;
                for annotation in parameters.iter().flatten() {
                    annotation.register(pool)?;
                }
            }
        }
        if let Some(default) = &self.annotation_default {
            pool.add(Constant::utf8("AnnotationDefault"))?;
            default.register(pool)?;
        }
        self.attributes.register(pool)
    }

    /// Serialize the method
    pub fn serialize_method(
        self,
        pool: &ConstantPool,
        this_class: &str,
        form: StackMapForm,
    ) -> Result<class_file::Method, Error> {
        let mut attributes = vec![];
        let may_have_code = self.may_have_code();
        let is_static = self.is_static();

        // `Code` attribute
        if let Some(mut code) = self.code {
            if !may_have_code {
                let msg = format!("abstract or native method '{}' cannot have code", self.name);
                return Err(Error::structural(msg));
            }
            let descriptor = MethodDescriptor::parse(&self.descriptor)?;
            let parameter_length = descriptor.parameter_length(!is_static);
            let context = BodyContext {
                stack_map_form: form,
                initial_locals: verifier::initial_locals(
                    this_class,
                    &self.name,
                    &descriptor,
                    is_static,
                ),
                default_max_locals: u16::try_from(parameter_length).map_err(|_| {
                    let msg = format!("parameters of '{}' take {} slots", self.name, parameter_length);
                    Error::numeric(msg)
                })?,
            };
            let code = code.serialize_code(pool, &context)?;
            log::debug!(
                "Serialized code of {}{} ({} bytes)",
                self.name,
                self.descriptor,
                code.code_array.0.len()
            );
            attributes.push(pool.attribute(&code)?);
        }

        // `Exceptions` attribute
        if !self.exceptions.is_empty() {
            let exceptions = self
                .exceptions
                .iter()
                .map(|exception| pool.class_index(exception))
                .collect::<Result<Vec<_>, Error>>()?;
            u16_count(exceptions.len(), "thrown exceptions")?;
            attributes.push(pool.attribute(&Exceptions(exceptions))?);
        }

        if !self.visible_parameter_annotations.is_empty() {
            let parameters = serialize_parameters(&self.visible_parameter_annotations, pool)?;
            attributes.push(pool.attribute(&RuntimeVisibleParameterAnnotations(parameters))?);
        }
        if !self.invisible_parameter_annotations.is_empty() {
            let parameters = serialize_parameters(&self.invisible_parameter_annotations, pool)?;
            attributes.push(pool.attribute(&RuntimeInvisibleParameterAnnotations(parameters))?);
        }
        if let Some(default) = &self.annotation_default {
            attributes.push(pool.attribute(&AnnotationDefault(default.serialize_value(pool)?))?);
        }

        self.attributes.serialize_into(pool, &mut attributes)?;
        u16_count(attributes.len(), "method attributes")?;

        Ok(class_file::Method {
            access_flags: self.access_flags,
            name_index: pool.utf8_index(&self.name)?,
            descriptor_index: pool.utf8_index(&self.descriptor)?,
            attributes,
        })
    }
}

fn serialize_parameters(
    parameters: &[Vec<Annotation>],
    pool: &ConstantPool,
) -> Result<Vec<Vec<class_file::AnnotationInfo>>, Error> {
    if parameters.len() > u8::MAX as usize {
        let msg = format!("annotations for {} parameters (at most 255)", parameters.len());
        return Err(Error::numeric(msg));
    }
    parameters
        .iter()
        .map(|annotations| serialize_annotations(annotations, pool))
        .collect()
}
