use crate::jvm::class_file::{
    self, Attribute, BytecodeArray, ConstantIndex, ConstantPool, ExceptionHandler, LineNumber,
    LineNumberTable, LocalVariable, LocalVariableTable, LocalVariableTypeTable,
};
use crate::jvm::code::{Insn, Label, LabelTable};
use crate::jvm::model::CustomAttribute;
use crate::jvm::verifier::{self, DeclaredType, StackMapForm, VerifyFrame};
use crate::jvm::{errors::u16_count, Constant, Error};

/// Largest number of bytes in the code array of a method
pub const MAX_CODE_LENGTH: usize = 65535;

/// Element in the instruction stream of a method body
#[derive(Debug, Clone, PartialEq)]
pub enum CodeElement {
    /// Instruction (contributes bytes)
    Insn(Insn),

    /// Zero-width marker at the current position
    Label(Label),
}

/// Entry in the exception table
#[derive(Debug, Clone, PartialEq)]
pub struct CatchEntry {
    pub start: Label,
    pub end: Label,
    pub handler: Label,

    /// `None` catches everything (used for `finally`)
    pub catch_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineEntry {
    pub start: Label,
    pub line: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVar {
    pub start: Label,
    pub end: Label,
    pub name: String,
    pub descriptor: String,

    /// Generic signature, which also gets the variable into the `LocalVariableTypeTable`
    pub signature: Option<String>,
    pub index: u16,
}

/// Things about the enclosing method that are needed to encode its body
#[derive(Debug)]
pub struct BodyContext {
    pub stack_map_form: StackMapForm,

    /// Locals on entry to the method (baseline for the first stack map frame)
    pub initial_locals: Vec<DeclaredType>,

    /// `max_locals` to use if none was set explicitly
    pub default_max_locals: u16,
}

/// Semantic representation of a method body
///
/// Instructions and labels get appended in order. Nothing has an offset until [`CodeAttr::layout`]
/// runs, which can only happen once the constant pool has been finalized (since the size of `ldc`
/// depends on the index of its constant).
#[derive(Debug, Default)]
pub struct CodeAttr {
    /// Maximum size of stack through the method (`1` if unset)
    pub max_stack: Option<u16>,

    /// Maximum size of locals through the method (size of the parameters if unset)
    pub max_locals: Option<u16>,

    pub labels: LabelTable,
    elements: Vec<CodeElement>,
    catch_table: Vec<CatchEntry>,
    line_table: Vec<LineEntry>,
    local_vars: Vec<LocalVar>,
    frames: Vec<VerifyFrame>,
    attributes: Vec<CustomAttribute>,
}

impl CodeAttr {
    pub fn new() -> CodeAttr {
        CodeAttr::default()
    }

    pub fn push_insn(&mut self, insn: Insn) {
        self.elements.push(CodeElement::Insn(insn));
    }

    /// Place a label at the current end of the instruction stream
    pub fn place_label(&mut self, label: Label) -> Result<(), Error> {
        self.labels.place(label)?;
        self.elements.push(CodeElement::Label(label));
        Ok(())
    }

    /// Place a fresh anonymous label at the current end of the instruction stream
    pub fn here(&mut self) -> Label {
        let label = self.labels.fresh();
        self.elements.push(CodeElement::Label(label));
        // A fresh label can't have been placed already
        let _ = self.labels.place(label);
        label
    }

    pub fn elements(&self) -> &[CodeElement] {
        &self.elements
    }

    pub fn has_instructions(&self) -> bool {
        self.elements
            .iter()
            .any(|element| matches!(element, CodeElement::Insn(_)))
    }

    pub fn add_catch(&mut self, entry: CatchEntry) {
        self.catch_table.push(entry);
    }

    pub fn add_line(&mut self, entry: LineEntry) {
        self.line_table.push(entry);
    }

    pub fn add_local_var(&mut self, var: LocalVar) {
        self.local_vars.push(var);
    }

    pub fn add_attribute(&mut self, attribute: CustomAttribute) {
        self.attributes.push(attribute);
    }

    /// Add a stack map frame, first copying `copied_locals` from the previous declared frame
    pub fn add_frame(&mut self, mut frame: VerifyFrame, copied_locals: usize) -> Result<(), Error> {
        if copied_locals > 0 {
            let previous: &[DeclaredType] = match self.frames.last() {
                Some(previous) => &previous.locals,
                None => &[],
            };
            frame.copy_locals_from(previous, copied_locals)?;
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn frames(&self) -> &[VerifyFrame] {
        &self.frames
    }

    /// Check that every label mentioned has been placed
    pub fn check_labels(&self) -> Result<(), Error> {
        let unplaced = self.labels.unplaced();
        if unplaced.is_empty() {
            Ok(())
        } else {
            let msg = format!("undefined label(s): {}", unplaced.join(", "));
            Err(Error::structural(msg))
        }
    }

    /// Register everything the body will need from the constant pool
    pub fn register(&self, pool: &mut ConstantPool, form: StackMapForm) -> Result<(), Error> {
        pool.add(Constant::utf8("Code"))?;
        for element in &self.elements {
            if let CodeElement::Insn(insn) = element {
                if let Some(constant) = insn.constant() {
                    pool.add(constant.clone())?;
                }
            }
        }
        for entry in &self.catch_table {
            if let Some(catch_type) = &entry.catch_type {
                pool.add(Constant::class(catch_type.as_str()))?;
            }
        }
        if !self.line_table.is_empty() {
            pool.add(Constant::utf8("LineNumberTable"))?;
        }
        if !self.local_vars.is_empty() {
            pool.add(Constant::utf8("LocalVariableTable"))?;
        }
        for var in &self.local_vars {
            pool.add(Constant::utf8(var.name.as_str()))?;
            pool.add(Constant::utf8(var.descriptor.as_str()))?;
            if let Some(signature) = &var.signature {
                pool.add(Constant::utf8("LocalVariableTypeTable"))?;
                pool.add(Constant::utf8(signature.as_str()))?;
            }
        }
        if !self.frames.is_empty() {
            pool.add(Constant::utf8(form.attribute_name()))?;
            for frame in &self.frames {
                for class in frame.classes() {
                    pool.add(Constant::class(class))?;
                }
            }
        }
        for attribute in &self.attributes {
            attribute.register(pool)?;
        }
        Ok(())
    }

    /// Assign offsets to every instruction and label, returning the offset of each instruction
    /// along with the total code length
    pub fn layout(&mut self, pool: &ConstantPool) -> Result<(Vec<usize>, usize), Error> {
        let mut offset = 0;
        let mut insn_offsets = vec![];
        for element in &self.elements {
            match element {
                CodeElement::Label(label) => self.labels.set_offset(*label, offset),
                CodeElement::Insn(insn) => {
                    insn_offsets.push(offset);
                    offset += insn.size(offset, pool)?;
                }
            }
        }

        if offset > MAX_CODE_LENGTH {
            let msg = format!("method code is {} bytes long (at most {})", offset, MAX_CODE_LENGTH);
            return Err(Error::numeric(msg));
        }
        log::trace!("Laid out {} instructions in {} bytes", insn_offsets.len(), offset);
        Ok((insn_offsets, offset))
    }

    fn pc(&self, label: Label) -> Result<u16, Error> {
        // Layout already checked offsets fit in the code array
        Ok(self.labels.offset(label)? as u16)
    }

    /// Lay out and encode the method body
    pub fn serialize_code(
        &mut self,
        pool: &ConstantPool,
        context: &BodyContext,
    ) -> Result<class_file::Code, Error> {
        let (insn_offsets, code_length) = self.layout(pool)?;

        let mut code_array = Vec::with_capacity(code_length);
        let insns = self.elements.iter().filter_map(|element| match element {
            CodeElement::Insn(insn) => Some(insn),
            CodeElement::Label(_) => None,
        });
        for (insn, offset) in insns.zip(insn_offsets) {
            insn.serialize(offset, pool, &self.labels, &mut code_array)?;
        }

        let mut exception_table = vec![];
        for entry in &self.catch_table {
            let start_pc = self.pc(entry.start)?;
            let end_pc = self.pc(entry.end)?;
            if end_pc <= start_pc {
                let msg = format!(
                    "empty exception range from '{}' to '{}'",
                    self.labels.name(entry.start),
                    self.labels.name(entry.end)
                );
                return Err(Error::structural(msg));
            }
            exception_table.push(ExceptionHandler {
                start_pc,
                end_pc,
                handler_pc: self.pc(entry.handler)?,
                catch_type: match &entry.catch_type {
                    Some(catch_type) => pool.class_index(catch_type)?,
                    None => ConstantIndex::NONE,
                },
            });
        }
        u16_count(exception_table.len(), "exception handlers")?;

        let mut attributes = vec![];
        if !self.line_table.is_empty() {
            attributes.push(self.line_number_table(pool)?);
        }
        if !self.local_vars.is_empty() {
            let (table, type_table) = self.local_variable_tables(pool)?;
            attributes.push(pool.attribute(&table)?);
            if !type_table.0.is_empty() {
                attributes.push(pool.attribute(&type_table)?);
            }
        }
        if !self.frames.is_empty() {
            u16_count(self.frames.len(), "stack map frames")?;
            attributes.push(verifier::encode_stack_map(
                context.stack_map_form,
                &self.frames,
                &context.initial_locals,
                pool,
                &self.labels,
            )?);
        }
        for attribute in &self.attributes {
            attributes.push(attribute.resolve(pool)?);
        }
        u16_count(attributes.len(), "code attributes")?;

        Ok(class_file::Code {
            max_stack: self.max_stack.unwrap_or(1),
            max_locals: self.max_locals.unwrap_or(context.default_max_locals),
            code_array: BytecodeArray(code_array),
            exception_table,
            attributes,
        })
    }

    fn line_number_table(&self, pool: &ConstantPool) -> Result<Attribute, Error> {
        let lines = self
            .line_table
            .iter()
            .map(|entry| {
                Ok(LineNumber {
                    start_pc: self.pc(entry.start)?,
                    line_number: entry.line,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        u16_count(lines.len(), "line numbers")?;
        pool.attribute(&LineNumberTable(lines))
    }

    fn local_variable_tables(
        &self,
        pool: &ConstantPool,
    ) -> Result<(LocalVariableTable, LocalVariableTypeTable), Error> {
        let mut table = vec![];
        let mut type_table = vec![];
        for var in &self.local_vars {
            let start_pc = self.pc(var.start)?;
            let end_pc = self.pc(var.end)?;
            if end_pc < start_pc {
                let msg = format!("local variable '{}' ends before it starts", var.name);
                return Err(Error::structural(msg));
            }
            let name_index = pool.utf8_index(&var.name)?;
            table.push(LocalVariable {
                start_pc,
                length: end_pc - start_pc,
                name_index,
                descriptor_index: pool.utf8_index(&var.descriptor)?,
                index: var.index,
            });
            if let Some(signature) = &var.signature {
                type_table.push(LocalVariable {
                    start_pc,
                    length: end_pc - start_pc,
                    name_index,
                    descriptor_index: pool.utf8_index(signature)?,
                    index: var.index,
                });
            }
        }
        u16_count(table.len(), "local variables")?;
        Ok((LocalVariableTable(table), LocalVariableTypeTable(type_table)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{Opcode, Operand};
    use crate::jvm::verifier::CodeOffset;

    fn insn(mnemonic: &str, operand: Operand) -> Insn {
        Insn::new(Opcode::lookup(mnemonic).unwrap(), operand).unwrap()
    }

    fn context() -> BodyContext {
        BodyContext {
            stack_map_form: StackMapForm::Compact,
            initial_locals: vec![],
            default_max_locals: 0,
        }
    }

    fn encode(code: &mut CodeAttr) -> class_file::Code {
        let mut pool = ConstantPool::new();
        code.register(&mut pool, StackMapForm::Compact).unwrap();
        pool.finalize().unwrap();
        code.serialize_code(&pool, &context()).unwrap()
    }

    #[test]
    fn return_only_body() {
        let mut code = CodeAttr::new();
        code.max_stack = Some(0);
        code.push_insn(insn("return", Operand::None));
        let encoded = encode(&mut code);
        assert_eq!(encoded.code_array.0, vec![0xb1]);
        assert_eq!(encoded.max_stack, 0);
        assert_eq!(encoded.max_locals, 0);
        assert!(encoded.attributes.is_empty());
    }

    #[test]
    fn backward_branch() {
        let mut code = CodeAttr::new();
        let top = code.labels.label("top");
        code.place_label(top).unwrap();
        code.push_insn(insn("iinc", Operand::Iinc { index: 0, delta: 1 }));
        code.push_insn(insn("goto", Operand::Branch(top)));
        let encoded = encode(&mut code);
        assert_eq!(encoded.code_array.0, vec![0x84, 0, 1, 0xa7, 0xff, 0xfd]);
        assert_eq!(encoded.max_stack, 1);
    }

    #[test]
    fn switch_after_unaligned_prefix() {
        let mut code = CodeAttr::new();
        let end = code.labels.label("end");
        code.push_insn(insn("iconst_0", Operand::None));
        code.push_insn(insn(
            "lookupswitch",
            Operand::LookupSwitch {
                default: end,
                pairs: vec![(1, end)],
            },
        ));
        code.place_label(end).unwrap();
        code.push_insn(insn("return", Operand::None));
        let encoded = encode(&mut code);

        // opcode at 1, 2 padding bytes, default, npairs, one pair: end is at 20
        assert_eq!(
            encoded.code_array.0,
            vec![
                0x03, 0xab, 0, 0, 0, 0, 0, 19, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 19, 0xb1
            ]
        );
    }

    #[test]
    fn catch_and_debug_tables() {
        let mut code = CodeAttr::new();
        let start = code.here();
        code.push_insn(insn("nop", Operand::None));
        let end = code.here();
        code.push_insn(insn("return", Operand::None));
        let handler = code.here();
        code.push_insn(insn("athrow", Operand::None));
        code.add_catch(CatchEntry {
            start,
            end,
            handler,
            catch_type: None,
        });
        code.add_line(LineEntry { start, line: 7 });
        code.add_local_var(LocalVar {
            start,
            end: handler,
            name: "xs".to_owned(),
            descriptor: "Ljava/util/List;".to_owned(),
            signature: Some("Ljava/util/List<Ljava/lang/String;>;".to_owned()),
            index: 0,
        });
        let encoded = encode(&mut code);

        assert_eq!(
            encoded.exception_table,
            vec![ExceptionHandler {
                start_pc: 0,
                end_pc: 1,
                handler_pc: 2,
                catch_type: ConstantIndex::NONE,
            }]
        );
        assert_eq!(encoded.attributes.len(), 3);
        assert_eq!(encoded.attributes[0].info, vec![0, 1, 0, 0, 0, 7]);
        assert_eq!(&encoded.attributes[1].info[0..6], &[0, 1, 0, 0, 0, 2]);
    }

    #[test]
    fn unplaced_labels_are_reported() {
        let mut code = CodeAttr::new();
        let missing = code.labels.label("missing");
        code.push_insn(insn("goto", Operand::Branch(missing)));
        let err = code.check_labels().unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn oversized_code_is_numeric() {
        let mut code = CodeAttr::new();
        for _ in 0..=MAX_CODE_LENGTH {
            code.push_insn(insn("nop", Operand::None));
        }
        let mut pool = ConstantPool::new();
        code.register(&mut pool, StackMapForm::Compact).unwrap();
        pool.finalize().unwrap();
        assert!(code.layout(&pool).unwrap_err().is_numeric());
    }

    #[test]
    fn frames_copy_previous_locals() {
        let mut code = CodeAttr::new();
        let mut first = VerifyFrame::new(CodeOffset::Offset(0));
        first.push_local(DeclaredType::Integer);
        first.push_local(DeclaredType::Float);
        code.add_frame(first, 0).unwrap();

        let mut second = VerifyFrame::new(CodeOffset::Offset(3));
        second.push_local(DeclaredType::Long);
        code.add_frame(second, 1).unwrap();
        assert_eq!(
            code.frames()[1].locals,
            vec![DeclaredType::Integer, DeclaredType::Long]
        );

        let third = VerifyFrame::new(CodeOffset::Offset(4));
        assert!(code.add_frame(third, 3).is_err());
    }
}
