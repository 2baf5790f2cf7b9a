use crate::assemble::{Argument, Diagnostic, Error, Literal, Settings};
use crate::jvm::class_file::{ClassFile, Version};
use crate::jvm::code::{CatchEntry, CodeAttr, Insn, Label, LabelTable, LineEntry, LocalVar, Opcode};
use crate::jvm::model::{
    Annotation, Class, CommonAttributes, CustomAttribute, ElementValue, EnclosingMethodRef, Field,
    InnerClassEntry, Method,
};
use crate::jvm::verifier::{CodeOffset, DeclaredType, StackMapForm, VerifyFrame};
use crate::jvm::{
    self, ClassAccessFlags, FieldAccessFlags, FieldType, MethodAccessFlags, MethodDescriptor,
    ParseDescriptor,
};
use std::io::Write;

/// Where a top-level annotation ends up
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AnnotationTarget {
    Visible,
    Invisible,

    /// Annotation on the parameter at this index of the current method
    VisibleParameter(usize),
    InvisibleParameter(usize),
}

/// Method whose body is still being assembled
struct MethodState {
    method: Method,
    code: CodeAttr,

    /// Instruction not yet committed to the code (so numeric labels can go in front of it)
    pending: Option<(Insn, Option<usize>)>,

    /// Frame between `.stack` and `.end stack`, with the number of locals copied from the
    /// previous frame
    frame: Option<(VerifyFrame, usize)>,

    /// Start and end of the body (for local variables without an explicit range)
    start: Label,
    end: Label,
    last_line: Option<usize>,
}

/// Annotation between `.annotation` and `.end annotation`
struct PendingAnnotation {
    annotation: Annotation,

    /// Top-level annotations have a target, nested ones the name of the element they fill
    parent: Result<AnnotationTarget, String>,
}

/// Turns a stream of directives into a class
///
/// Every directive method records problems as [`Diagnostic`]s instead of failing, so that as many
/// errors as possible get reported in one go. Nothing gets produced by [`ClassAssembler::finish`]
/// if any error was recorded.
pub struct ClassAssembler {
    settings: Settings,
    class: Class,
    line: Option<usize>,
    diagnostics: Vec<Diagnostic>,

    /// Fixed by the first method, since every method of a class uses the same form
    stack_map_form: Option<StackMapForm>,
    field: Option<Field>,
    method: Option<MethodState>,
    annotations: Vec<PendingAnnotation>,
}

impl ClassAssembler {
    pub fn new(settings: Settings) -> ClassAssembler {
        let mut class = Class::default();
        class.version = settings.default_version;
        ClassAssembler {
            settings,
            class,
            line: None,
            diagnostics: vec![],
            stack_map_form: None,
            field: None,
            method: None,
            annotations: vec![],
        }
    }

    /// Name of the class being assembled (if `.class` has been seen)
    pub fn class_name(&self) -> Option<&str> {
        self.class.this_class.as_deref()
    }

    /// Errors recorded so far
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Source line that subsequent directives come from
    pub fn set_line(&mut self, line: usize) {
        self.line = Some(line);
    }

    /// Record an error found outside the assembler (eg. while reading directives)
    pub fn error(&mut self, error: jvm::Error) {
        log::debug!("Error on line {:?}: {}", self.line, error);
        self.diagnostics.push(Diagnostic {
            line: self.line,
            error,
        });
    }

    fn report<T>(&mut self, result: Result<T, jvm::Error>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.error(error);
                None
            }
        }
    }

    fn method_state(&mut self, directive: &str) -> Result<&mut MethodState, jvm::Error> {
        self.method.as_mut().ok_or_else(|| {
            jvm::Error::structural(format!("{} outside of a method", directive))
        })
    }

    /// Attributes of the innermost member being declared
    fn common_attributes(&mut self) -> &mut CommonAttributes {
        if let Some(state) = &mut self.method {
            &mut state.method.attributes
        } else if let Some(field) = &mut self.field {
            &mut field.attributes
        } else {
            &mut self.class.attributes
        }
    }

    // Class header

    pub fn set_version(&mut self, version: Version) {
        let form = StackMapForm::for_version(version);
        match self.stack_map_form {
            Some(locked) if locked != form => {
                let msg = format!(
                    "version {} needs a {} attribute but methods already use {}",
                    version,
                    form.attribute_name(),
                    locked.attribute_name()
                );
                self.error(jvm::Error::structural(msg));
            }
            _ => self.class.version = version,
        }
    }

    pub fn set_source<S: Into<String>>(&mut self, source_file: S) {
        self.class.source_file = Some(source_file.into());
    }

    pub fn set_class<S: Into<String>>(&mut self, access_flags: ClassAccessFlags, name: S) {
        if self.class.this_class.is_some() {
            self.error(jvm::Error::structural("class is already declared"));
            return;
        }
        self.class.access_flags = access_flags;
        self.class.this_class = Some(name.into());
    }

    pub fn set_super<S: Into<String>>(&mut self, name: S) {
        if self.class.super_class.is_some() {
            self.error(jvm::Error::structural("super class is already declared"));
            return;
        }
        self.class.super_class = Some(name.into());
    }

    pub fn add_interface<S: Into<String>>(&mut self, name: S) {
        self.class.interfaces.push(name.into());
    }

    /// Generic signature of the current method, field, or class
    pub fn set_signature<S: Into<String>>(&mut self, signature: S) {
        self.common_attributes().signature = Some(signature.into());
    }

    /// Mark the current method, field, or class deprecated
    pub fn set_deprecated(&mut self) {
        self.common_attributes().deprecated = true;
    }

    pub fn set_enclosing_method<S: Into<String>>(
        &mut self,
        class: S,
        method: Option<(String, String)>,
    ) {
        self.class.enclosing_method = Some(EnclosingMethodRef {
            class: class.into(),
            method,
        });
    }

    pub fn add_inner_class(&mut self, inner_class: InnerClassEntry) {
        self.class.inner_classes.push(inner_class);
    }

    pub fn set_source_debug_extension<S: Into<String>>(&mut self, extension: S) {
        self.class.source_debug_extension = Some(extension.into());
    }

    /// Opaque attribute on the current method, field, or class
    pub fn add_attribute<S: Into<String>>(&mut self, name: S, info: Vec<u8>) {
        let attribute = CustomAttribute::new(name, info);
        self.common_attributes().custom.push(attribute);
    }

    // Fields

    pub fn begin_field<S1: Into<String>, S2: Into<String>>(
        &mut self,
        access_flags: FieldAccessFlags,
        name: S1,
        descriptor: S2,
        value: Option<Literal>,
    ) {
        if self.method.is_some() {
            self.error(jvm::Error::structural("field declared inside a method"));
            return;
        }
        self.end_field();

        let mut field = Field::new(access_flags, name, descriptor);
        if let Err(error) = FieldType::parse(&field.descriptor) {
            self.error(error);
        } else if let Some(value) = value {
            let result = value
                .field_constant(&field.descriptor)
                .and_then(|constant| field.set_constant_value(constant));
            self.report(result);
        }
        self.field = Some(field);
    }

    /// Close the current field (if there is one)
    pub fn end_field(&mut self) {
        if let Some(field) = self.field.take() {
            log::debug!("Assembled field {} {}", field.name, field.descriptor);
            self.class.fields.push(field);
        }
    }

    // Methods

    pub fn begin_method<S1: Into<String>, S2: Into<String>>(
        &mut self,
        access_flags: MethodAccessFlags,
        name: S1,
        descriptor: S2,
    ) {
        if self.method.is_some() {
            self.error(jvm::Error::structural("missing '.end method' before new method"));
            return;
        }
        self.end_field();

        let method = Method::new(access_flags, name, descriptor);
        let descriptor = MethodDescriptor::parse(&method.descriptor);
        self.report(descriptor);
        if self.stack_map_form.is_none() {
            self.stack_map_form = Some(StackMapForm::for_version(self.class.version));
        }

        let mut code = CodeAttr::new();
        let start = code.here();
        let end = code.labels.fresh();
        self.method = Some(MethodState {
            method,
            code,
            pending: None,
            frame: None,
            start,
            end,
            last_line: None,
        });
    }

    pub fn end_method(&mut self) {
        let mut state = match self.method.take() {
            Some(state) => state,
            None => {
                self.error(jvm::Error::structural("'.end method' without a method"));
                return;
            }
        };
        let mut errors = vec![];
        Self::flush(self.settings.auto_line_numbers, &mut state, &mut errors);
        if state.frame.take().is_some() {
            errors.push(jvm::Error::structural("missing '.end stack' before end of method"));
        }
        let placed_end = state.code.place_label(state.end);
        let checked = placed_end.and_then(|()| state.code.check_labels());
        errors.extend(checked.err());
        for error in errors {
            self.error(error);
        }

        let mut method = state.method;
        if method.may_have_code() {
            method.code = Some(state.code);
        }
        log::debug!("Assembled method {}{}", method.name, method.descriptor);
        self.class.methods.push(method);
    }

    pub fn set_limit_stack(&mut self, max_stack: i64) {
        let result = self.method_state(".limit stack").and_then(|state| {
            state.code.max_stack = Some(narrow_u16(max_stack, "max stack")?);
            Ok(())
        });
        self.report(result);
    }

    pub fn set_limit_locals(&mut self, max_locals: i64) {
        let result = self.method_state(".limit locals").and_then(|state| {
            state.code.max_locals = Some(narrow_u16(max_locals, "max locals")?);
            Ok(())
        });
        self.report(result);
    }

    pub fn add_throws<S: Into<String>>(&mut self, class: S) {
        let result = self
            .method_state(".throws")
            .map(|state| state.method.exceptions.push(class.into()));
        self.report(result);
    }

    /// Emit an instruction into the current method
    pub fn emit(&mut self, mnemonic: &str, argument: Argument) {
        let line = self.line;
        let auto_line_numbers = self.settings.auto_line_numbers;
        let mut errors = vec![];
        let result = self.method_state(mnemonic).and_then(|state| {
            if !state.method.may_have_code() {
                let msg = format!("abstract or native method '{}' cannot contain code", state.method.name);
                return Err(jvm::Error::structural(msg));
            }
            let opcode = Opcode::lookup(mnemonic).ok_or_else(|| {
                jvm::Error::structural(format!("unknown instruction '{}'", mnemonic))
            })?;
            let operand = argument.into_operand(opcode, &mut state.code.labels)?;
            let insn = Insn::new(opcode, operand)?;
            Self::flush(auto_line_numbers, state, &mut errors);
            state.pending = Some((insn, line));
            Ok(())
        });
        for error in errors {
            self.error(error);
        }
        self.report(result);
    }

    /// Place a label at the current position
    ///
    /// Numeric labels go in front of the last instruction emitted (it hasn't been committed yet),
    /// other labels go after it.
    pub fn plant_label(&mut self, name: &str) {
        let auto_line_numbers = self.settings.auto_line_numbers;
        let mut errors = vec![];
        let result = self.method_state("label").and_then(|state| {
            let label = state.code.labels.label(name);
            if !LabelTable::is_numeric(name) {
                Self::flush(auto_line_numbers, state, &mut errors);
            }
            state.code.place_label(label)
        });
        for error in errors {
            self.error(error);
        }
        self.report(result);
    }

    /// Commit the pending instruction (if any) to the code
    fn flush(auto_line_numbers: bool, state: &mut MethodState, errors: &mut Vec<jvm::Error>) {
        if let Some((insn, line)) = state.pending.take() {
            if auto_line_numbers {
                if let Some(line) = line.filter(|line| state.last_line != Some(*line)) {
                    match u16::try_from(line) {
                        Ok(line_number) => {
                            let start = state.code.here();
                            state.code.add_line(LineEntry {
                                start,
                                line: line_number,
                            });
                        }
                        Err(_) => errors.push(jvm::Error::numeric(format!(
                            "line number {} is out of range",
                            line
                        ))),
                    }
                    state.last_line = Some(line);
                }
            }
            state.code.push_insn(insn);
        }
    }

    /// Flush the pending instruction then give access to the method (for directives that plant
    /// a position)
    fn positioned_state(&mut self, directive: &str) -> Result<&mut MethodState, jvm::Error> {
        let mut errors = vec![];
        if let Some(state) = &mut self.method {
            Self::flush(self.settings.auto_line_numbers, state, &mut errors);
        }
        for error in errors {
            self.error(error);
        }
        self.method_state(directive)
    }

    /// Add an exception handler (`None` catches everything)
    pub fn add_catch(&mut self, catch_type: Option<&str>, start: &str, end: &str, handler: &str) {
        let result = self.method_state(".catch").map(|state| {
            let labels = &mut state.code.labels;
            let entry = CatchEntry {
                start: labels.label(start),
                end: labels.label(end),
                handler: labels.label(handler),
                catch_type: catch_type.map(str::to_owned),
            };
            state.code.add_catch(entry);
        });
        self.report(result);
    }

    /// Explicit line number for the code that follows (ignored with automatic line numbers)
    pub fn add_line(&mut self, line: i64) {
        if self.settings.auto_line_numbers {
            return;
        }
        let result = self.positioned_state(".line").and_then(|state| {
            let line = narrow_u16(line, "line number")?;
            let start = state.code.here();
            state.code.add_line(LineEntry { start, line });
            Ok(())
        });
        self.report(result);
    }

    /// Describe a local variable
    ///
    /// Without a range, the variable covers the whole method body.
    pub fn add_var(
        &mut self,
        index: i64,
        name: &str,
        descriptor: &str,
        signature: Option<&str>,
        range: Option<(&str, &str)>,
    ) {
        let result = self.method_state(".var").and_then(|state| {
            let index = narrow_u16(index, "local variable index")?;
            let (start, end) = match range {
                Some((start, end)) => (state.code.labels.label(start), state.code.labels.label(end)),
                None => (state.start, state.end),
            };
            state.code.add_local_var(LocalVar {
                start,
                end,
                name: name.to_owned(),
                descriptor: descriptor.to_owned(),
                signature: signature.map(str::to_owned),
                index,
            });
            Ok(())
        });
        self.report(result);
    }

    // Stack map frames

    pub fn begin_frame(&mut self) {
        let result = self.positioned_state(".stack").and_then(|state| {
            if state.frame.is_some() {
                return Err(jvm::Error::structural("nested '.stack'"));
            }
            state.frame = Some((VerifyFrame::new(CodeOffset::Offset(0)), 0));
            Ok(())
        });
        if self.report(result).is_some() {
            // Until an explicit offset shows up, the frame is for the next instruction
            if let Some(state) = &mut self.method {
                let here = state.code.here();
                if let Some((frame, _)) = &mut state.frame {
                    frame.offset = CodeOffset::Label(here);
                }
            }
        }
    }

    fn frame_state(&mut self) -> Result<(&mut VerifyFrame, &mut usize, &mut LabelTable), jvm::Error> {
        let state = self.method_state("frame directive")?;
        match &mut state.frame {
            Some((frame, copied)) => Ok((frame, copied, &mut state.code.labels)),
            None => Err(jvm::Error::structural("frame directive outside of '.stack'")),
        }
    }

    /// Offset of the current frame: a number or a label
    pub fn frame_offset(&mut self, position: &str) {
        let result = self.frame_state().and_then(|(frame, _, labels)| {
            frame.offset = match position.parse::<i64>() {
                Ok(offset) => CodeOffset::Offset(narrow_u16(offset, "frame offset")?),
                Err(_) => CodeOffset::Label(labels.label(position)),
            };
            Ok(())
        });
        self.report(result);
    }

    /// Append a local to the current frame (eg. `Object java/lang/String`)
    pub fn frame_locals(&mut self, type_name: &str, argument: Option<&str>) {
        let result = self.frame_state().and_then(|(frame, _, labels)| {
            frame.push_local(DeclaredType::from_name(type_name, argument, labels)?);
            Ok(())
        });
        self.report(result);
    }

    /// Start the current frame's locals with the first `count` locals of the previous frame
    pub fn frame_use_locals(&mut self, count: i64) {
        let result = self.frame_state().and_then(|(frame, copied, _)| {
            if !frame.locals.is_empty() {
                return Err(jvm::Error::structural("'use' must come before any locals"));
            }
            *copied = narrow_u16(count, "copied locals")? as usize;
            Ok(())
        });
        self.report(result);
    }

    pub fn frame_stack(&mut self, type_name: &str, argument: Option<&str>) {
        let result = self.frame_state().and_then(|(frame, _, labels)| {
            frame.push_stack(DeclaredType::from_name(type_name, argument, labels)?);
            Ok(())
        });
        self.report(result);
    }

    pub fn end_frame(&mut self) {
        let result = self.method_state(".end stack").and_then(|state| {
            let (frame, copied) = state
                .frame
                .take()
                .ok_or_else(|| jvm::Error::structural("'.end stack' without '.stack'"))?;
            state.code.add_frame(frame, copied)
        });
        self.report(result);
    }

    // Annotations

    pub fn begin_annotation<S: Into<String>>(&mut self, target: AnnotationTarget, type_descriptor: S) {
        if !self.annotations.is_empty() {
            let msg = "annotation started inside another one (use a nested annotation)";
            self.error(jvm::Error::structural(msg));
            return;
        }
        if matches!(
            target,
            AnnotationTarget::VisibleParameter(_) | AnnotationTarget::InvisibleParameter(_)
        ) && self.method.is_none()
        {
            self.error(jvm::Error::structural("parameter annotation outside of a method"));
            return;
        }
        self.annotations.push(PendingAnnotation {
            annotation: Annotation::new(type_descriptor),
            parent: Ok(target),
        });
    }

    pub fn annotation_value<S: Into<String>>(&mut self, name: S, value: ElementValue) {
        match self.annotations.last_mut() {
            Some(pending) => pending.annotation.elements.push((name.into(), value)),
            None => self.error(jvm::Error::structural("annotation value outside of an annotation")),
        }
    }

    /// Start an annotation that will be the value of element `name` in the current annotation
    pub fn begin_nested_annotation<S1: Into<String>, S2: Into<String>>(
        &mut self,
        name: S1,
        type_descriptor: S2,
    ) {
        if self.annotations.is_empty() {
            self.error(jvm::Error::structural("nested annotation outside of an annotation"));
            return;
        }
        self.annotations.push(PendingAnnotation {
            annotation: Annotation::new(type_descriptor),
            parent: Err(name.into()),
        });
    }

    pub fn end_annotation(&mut self) {
        let pending = match self.annotations.pop() {
            Some(pending) => pending,
            None => {
                self.error(jvm::Error::structural("'.end annotation' without an annotation"));
                return;
            }
        };
        match pending.parent {
            Err(name) => {
                if let Some(parent) = self.annotations.last_mut() {
                    let value = ElementValue::Annotation(pending.annotation);
                    parent.annotation.elements.push((name, value));
                }
            }
            Ok(AnnotationTarget::Visible) => {
                let annotation = pending.annotation;
                self.common_attributes().visible_annotations.push(annotation);
            }
            Ok(AnnotationTarget::Invisible) => {
                let annotation = pending.annotation;
                self.common_attributes().invisible_annotations.push(annotation);
            }
            Ok(AnnotationTarget::VisibleParameter(index)) => {
                self.add_parameter_annotation(true, index, pending.annotation)
            }
            Ok(AnnotationTarget::InvisibleParameter(index)) => {
                self.add_parameter_annotation(false, index, pending.annotation)
            }
        }
    }

    fn add_parameter_annotation(&mut self, visible: bool, index: usize, annotation: Annotation) {
        if let Some(state) = &mut self.method {
            let method = &mut state.method;
            let parameter_count = MethodDescriptor::parse(&method.descriptor)
                .map(|descriptor| descriptor.parameters.len())
                .unwrap_or(0);
            let parameters = if visible {
                &mut method.visible_parameter_annotations
            } else {
                &mut method.invisible_parameter_annotations
            };

            // One (possibly empty) list per parameter
            let len = parameters.len().max(parameter_count).max(index + 1);
            parameters.resize(len, vec![]);
            parameters[index].push(annotation);
        }
    }

    /// Default value of the current annotation interface method
    pub fn set_annotation_default(&mut self, value: ElementValue) {
        let result = self
            .method_state(".annotation default")
            .map(|state| state.method.annotation_default = Some(value));
        self.report(result);
    }

    // Output

    /// Check that everything was closed properly and build the class file
    pub fn finish(mut self) -> Result<ClassFile, Error> {
        self.end_field();
        if self.method.is_some() {
            self.error(jvm::Error::structural("missing '.end method' at end of class"));
        }
        if !self.annotations.is_empty() {
            self.error(jvm::Error::structural("missing '.end annotation' at end of class"));
        }
        if self.class.this_class.is_none() {
            self.error(jvm::Error::structural("missing '.class' or '.interface'"));
        }
        if self.class.super_class.is_none() && self.class_name() != Some("java/lang/Object") {
            self.error(jvm::Error::structural("missing '.super'"));
        }
        if !self.diagnostics.is_empty() {
            return Err(Error::Assembly(self.diagnostics));
        }

        if self.class.source_file.is_none() {
            self.class.source_file = self.settings.source_file.clone();
        }
        self.class.serialize().map_err(|error| {
            Error::Assembly(vec![Diagnostic { line: None, error }])
        })
    }

    /// Assemble the class and write it out
    ///
    /// The class is serialized fully before anything gets written.
    pub fn write<W: Write>(self, writer: &mut W) -> Result<(), Error> {
        let bytes = self.finish()?.to_bytes()?;
        writer.write_all(&bytes)?;
        Ok(())
    }
}

fn narrow_u16(value: i64, what: &str) -> Result<u16, jvm::Error> {
    u16::try_from(value)
        .map_err(|_| jvm::Error::numeric(format!("{} {} is out of range", what, value)))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::BaseType;

    fn assembler() -> ClassAssembler {
        let mut assembler = ClassAssembler::new(Settings::default());
        assembler.set_class(ClassAccessFlags::PUBLIC, "Test");
        assembler.set_super("java/lang/Object");
        assembler
    }

    fn code_of(class_file: &ClassFile, method: usize) -> Vec<u8> {
        class_file.methods[method].attributes[0].info.clone()
    }

    /// Bytecode of the first method, skipping the `max_*` and length fields
    fn bytecode(class_file: &ClassFile) -> Vec<u8> {
        let code = code_of(class_file, 0);
        let len = u32::from_be_bytes([code[4], code[5], code[6], code[7]]) as usize;
        code[8..8 + len].to_vec()
    }

    #[test]
    fn numeric_labels_go_before_pending_instruction() {
        let mut assembler = assembler();
        assembler.begin_method(MethodAccessFlags::STATIC, "f", "()V");
        assembler.emit("nop", Argument::None);
        assembler.emit("iconst_0", Argument::None);
        assembler.plant_label("5");
        assembler.emit("pop", Argument::None);
        assembler.emit("goto", Argument::word("5"));
        assembler.end_method();
        let class_file = assembler.finish().unwrap();

        // `5` is in front of `iconst_0`, at offset 1
        assert_eq!(bytecode(&class_file), vec![0x00, 0x03, 0x57, 0xa7, 0xff, 0xfe]);
    }

    #[test]
    fn symbolic_labels_go_after_pending_instruction() {
        let mut assembler = assembler();
        assembler.begin_method(MethodAccessFlags::STATIC, "f", "()V");
        assembler.emit("nop", Argument::None);
        assembler.plant_label("here");
        assembler.emit("goto", Argument::word("here"));
        assembler.end_method();
        let class_file = assembler.finish().unwrap();
        assert_eq!(bytecode(&class_file), vec![0x00, 0xa7, 0x00, 0x00]);
    }

    #[test]
    fn collects_many_errors() {
        let mut assembler = assembler();
        assembler.begin_method(MethodAccessFlags::STATIC, "f", "()V");
        assembler.set_line(3);
        assembler.emit("frobnicate", Argument::None);
        assembler.set_line(4);
        assembler.emit("bipush", Argument::Int(1000));
        assembler.set_line(5);
        assembler.emit("goto", Argument::word("nowhere"));
        assembler.plant_label("twice");
        assembler.plant_label("twice");
        assembler.end_method();

        match assembler.finish() {
            Err(Error::Assembly(diagnostics)) => {
                let lines: Vec<_> = diagnostics.iter().map(|d| d.line).collect();
                assert_eq!(lines, vec![Some(3), Some(4), Some(5), Some(5)]);
                assert!(diagnostics[1].error.is_numeric());
                assert!(diagnostics[3].error.to_string().contains("nowhere"));
            }
            other => panic!("expected errors, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn directives_outside_a_method() {
        let mut assembler = assembler();
        assembler.emit("return", Argument::None);
        assembler.add_catch(None, "a", "b", "c");
        assembler.set_limit_stack(3);
        assert_eq!(assembler.diagnostics().len(), 3);
    }

    #[test]
    fn abstract_methods_reject_code() {
        let mut assembler = assembler();
        assembler.begin_method(MethodAccessFlags::ABSTRACT, "f", "()V");
        assembler.emit("return", Argument::None);
        assembler.end_method();
        assert_eq!(assembler.diagnostics().len(), 1);
    }

    #[test]
    fn missing_super() {
        let mut assembler = ClassAssembler::new(Settings::default());
        assembler.set_class(ClassAccessFlags::PUBLIC, "NoSuper");
        assert!(assembler.finish().is_err());
    }

    #[test]
    fn version_cannot_flip_frame_form() {
        let mut assembler = assembler();
        assembler.begin_method(MethodAccessFlags::STATIC, "f", "()V");
        assembler.emit("return", Argument::None);
        assembler.end_method();
        assembler.set_version(Version::new(45, 0));
        assert!(assembler.diagnostics().is_empty());
        assembler.set_version(Version::JAVA6);
        assert_eq!(assembler.diagnostics().len(), 1);
    }

    #[test]
    fn auto_line_numbers() {
        let mut assembler = ClassAssembler::new(Settings {
            auto_line_numbers: true,
            ..Settings::default()
        });
        assembler.set_class(ClassAccessFlags::PUBLIC, "Lines");
        assembler.set_super("java/lang/Object");
        assembler.begin_method(MethodAccessFlags::STATIC, "f", "()V");
        assembler.set_line(10);
        assembler.emit("iconst_0", Argument::None);
        assembler.emit("pop", Argument::None);
        assembler.set_line(11);
        assembler.add_line(99);
        assembler.emit("return", Argument::None);
        assembler.end_method();
        let class_file = assembler.finish().unwrap();

        let code = code_of(&class_file, 0);
        // max_stack, max_locals, length, 3 bytes of code, empty exception table, 1 attribute
        assert_eq!(&code[4..8], &[0, 0, 0, 3]);
        assert_eq!(&code[11..15], &[0, 0, 0, 1]);
        let table = &code[15 + 6..];
        assert_eq!(table, &[0, 2, 0, 0, 0, 10, 0, 2, 0, 11]);
    }

    #[test]
    fn frames_for_next_instruction() {
        let mut assembler = assembler();
        assembler.set_version(Version::JAVA6);
        assembler.begin_method(MethodAccessFlags::STATIC, "f", "(I)V");
        assembler.emit("iload_0", Argument::None);
        assembler.emit("ifeq", Argument::word("skip"));
        assembler.emit("return", Argument::None);
        assembler.plant_label("skip");
        assembler.begin_frame();
        assembler.frame_locals("Integer", None);
        assembler.end_frame();
        assembler.emit("return", Argument::None);
        assembler.end_method();
        let class_file = assembler.finish().unwrap();

        // same_frame at offset 5
        let code = code_of(&class_file, 0);
        assert_eq!(&code[code.len() - 3..], &[0, 1, 5]);
    }

    #[test]
    fn annotations_attach_to_innermost_member() {
        let mut assembler = assembler();
        assembler.begin_annotation(AnnotationTarget::Visible, "LOnClass;");
        assembler.end_annotation();
        assembler.begin_field(FieldAccessFlags::PUBLIC, "x", "I", None);
        assembler.begin_annotation(AnnotationTarget::Invisible, "LOnField;");
        assembler.annotation_value("v", ElementValue::Integer(BaseType::Int, 1));
        assembler.begin_nested_annotation("inner", "LInner;");
        assembler.end_annotation();
        assembler.end_annotation();
        assembler.end_field();
        assembler.begin_method(MethodAccessFlags::ABSTRACT, "m", "(II)V");
        assembler.begin_annotation(AnnotationTarget::VisibleParameter(0), "LOnParam;");
        assembler.end_annotation();
        assembler.end_method();

        let class = &assembler.class;
        assert_eq!(class.attributes.visible_annotations.len(), 1);
        let field_annotation = &class.fields[0].attributes.invisible_annotations[0];
        assert_eq!(field_annotation.elements.len(), 2);
        assert_eq!(class.methods[0].visible_parameter_annotations.len(), 2);
        assert!(assembler.finish().is_ok());
    }

    #[test]
    fn field_constant_values() {
        let mut assembler = assembler();
        assembler.begin_field(FieldAccessFlags::STATIC, "b", "B", Some(Literal::Int(300)));
        assembler.begin_field(FieldAccessFlags::STATIC, "s", "I", Some(Literal::Float(1.5)));
        let diagnostics = assembler.diagnostics();
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics[0].error.is_numeric());
        assert!(!diagnostics[1].error.is_numeric());
    }
}
