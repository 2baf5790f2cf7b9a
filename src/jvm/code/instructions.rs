use crate::jvm::class_file::{ConstantPool, Serialize};
use crate::jvm::code::{Label, LabelTable};
use crate::jvm::{Constant, Error};
use byteorder::WriteBytesExt;

/// Shape of the operand an opcode expects
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum OperandKind {
    None,

    /// Local variable index (`wide` prefixed when above 255)
    LocalVar,

    /// Local variable index and signed increment (`wide` prefixed when either doesn't fit a byte)
    Iinc,

    /// Signed byte immediate (`bipush`)
    Byte,

    /// Signed short immediate (`sipush`)
    Short,

    /// Primitive array type code (`newarray`)
    ArrayType,

    /// Branch with a 2-byte displacement
    Branch,

    /// Branch with a 4-byte displacement
    BranchWide,

    /// Loadable constant with a 1-byte index, promoted to `ldc_w` if the index doesn't fit
    Ldc,

    /// Loadable constant with a 2-byte index
    LdcWide,

    /// `long` or `double` constant
    Ldc2,

    Class,
    Field,
    Method,
    InterfaceMethod,
    MultiANewArray,
    TableSwitch,
    LookupSwitch,
}

/// Entry in the instruction set table
#[derive(Debug, PartialEq, Eq)]
pub struct Opcode {
    pub mnemonic: &'static str,
    pub code: u8,
    pub operand: OperandKind,
}

/// Prefix that widens the operands of the following local variable instruction
pub const WIDE: u8 = 0xc4;

const LDC_W: u8 = 0x13;

macro_rules! opcodes {
    ($($mnemonic:literal => $code:literal $kind:ident,)*) => {
        /// All opcodes that can be written in assembly (`wide` gets added automatically)
        ///
        /// [0]: https://docs.oracle.com/javase/specs/jvms/se18/html/jvms-6.html#jvms-6.5
        pub static OPCODES: &[Opcode] = &[
            $(Opcode { mnemonic: $mnemonic, code: $code, operand: OperandKind::$kind },)*
        ];
    };
}

opcodes! {
    "nop" => 0x00 None,
    "aconst_null" => 0x01 None,
    "iconst_m1" => 0x02 None,
    "iconst_0" => 0x03 None,
    "iconst_1" => 0x04 None,
    "iconst_2" => 0x05 None,
    "iconst_3" => 0x06 None,
    "iconst_4" => 0x07 None,
    "iconst_5" => 0x08 None,
    "lconst_0" => 0x09 None,
    "lconst_1" => 0x0a None,
    "fconst_0" => 0x0b None,
    "fconst_1" => 0x0c None,
    "fconst_2" => 0x0d None,
    "dconst_0" => 0x0e None,
    "dconst_1" => 0x0f None,
    "bipush" => 0x10 Byte,
    "sipush" => 0x11 Short,
    "ldc" => 0x12 Ldc,
    "ldc_w" => 0x13 LdcWide,
    "ldc2_w" => 0x14 Ldc2,
    "iload" => 0x15 LocalVar,
    "lload" => 0x16 LocalVar,
    "fload" => 0x17 LocalVar,
    "dload" => 0x18 LocalVar,
    "aload" => 0x19 LocalVar,
    "iload_0" => 0x1a None,
    "iload_1" => 0x1b None,
    "iload_2" => 0x1c None,
    "iload_3" => 0x1d None,
    "lload_0" => 0x1e None,
    "lload_1" => 0x1f None,
    "lload_2" => 0x20 None,
    "lload_3" => 0x21 None,
    "fload_0" => 0x22 None,
    "fload_1" => 0x23 None,
    "fload_2" => 0x24 None,
    "fload_3" => 0x25 None,
    "dload_0" => 0x26 None,
    "dload_1" => 0x27 None,
    "dload_2" => 0x28 None,
    "dload_3" => 0x29 None,
    "aload_0" => 0x2a None,
    "aload_1" => 0x2b None,
    "aload_2" => 0x2c None,
    "aload_3" => 0x2d None,
    "iaload" => 0x2e None,
    "laload" => 0x2f None,
    "faload" => 0x30 None,
    "daload" => 0x31 None,
    "aaload" => 0x32 None,
    "baload" => 0x33 None,
    "caload" => 0x34 None,
    "saload" => 0x35 None,
    "istore" => 0x36 LocalVar,
    "lstore" => 0x37 LocalVar,
    "fstore" => 0x38 LocalVar,
    "dstore" => 0x39 LocalVar,
    "astore" => 0x3a LocalVar,
    "istore_0" => 0x3b None,
    "istore_1" => 0x3c None,
    "istore_2" => 0x3d None,
    "istore_3" => 0x3e None,
    "lstore_0" => 0x3f None,
    "lstore_1" => 0x40 None,
    "lstore_2" => 0x41 None,
    "lstore_3" => 0x42 None,
    "fstore_0" => 0x43 None,
    "fstore_1" => 0x44 None,
    "fstore_2" => 0x45 None,
    "fstore_3" => 0x46 None,
    "dstore_0" => 0x47 None,
    "dstore_1" => 0x48 None,
    "dstore_2" => 0x49 None,
    "dstore_3" => 0x4a None,
    "astore_0" => 0x4b None,
    "astore_1" => 0x4c None,
    "astore_2" => 0x4d None,
    "astore_3" => 0x4e None,
    "iastore" => 0x4f None,
    "lastore" => 0x50 None,
    "fastore" => 0x51 None,
    "dastore" => 0x52 None,
    "aastore" => 0x53 None,
    "bastore" => 0x54 None,
    "castore" => 0x55 None,
    "sastore" => 0x56 None,
    "pop" => 0x57 None,
    "pop2" => 0x58 None,
    "dup" => 0x59 None,
    "dup_x1" => 0x5a None,
    "dup_x2" => 0x5b None,
    "dup2" => 0x5c None,
    "dup2_x1" => 0x5d None,
    "dup2_x2" => 0x5e None,
    "swap" => 0x5f None,
    "iadd" => 0x60 None,
    "ladd" => 0x61 None,
    "fadd" => 0x62 None,
    "dadd" => 0x63 None,
    "isub" => 0x64 None,
    "lsub" => 0x65 None,
    "fsub" => 0x66 None,
    "dsub" => 0x67 None,
    "imul" => 0x68 None,
    "lmul" => 0x69 None,
    "fmul" => 0x6a None,
    "dmul" => 0x6b None,
    "idiv" => 0x6c None,
    "ldiv" => 0x6d None,
    "fdiv" => 0x6e None,
    "ddiv" => 0x6f None,
    "irem" => 0x70 None,
    "lrem" => 0x71 None,
    "frem" => 0x72 None,
    "drem" => 0x73 None,
    "ineg" => 0x74 None,
    "lneg" => 0x75 None,
    "fneg" => 0x76 None,
    "dneg" => 0x77 None,
    "ishl" => 0x78 None,
    "lshl" => 0x79 None,
    "ishr" => 0x7a None,
    "lshr" => 0x7b None,
    "iushr" => 0x7c None,
    "lushr" => 0x7d None,
    "iand" => 0x7e None,
    "land" => 0x7f None,
    "ior" => 0x80 None,
    "lor" => 0x81 None,
    "ixor" => 0x82 None,
    "lxor" => 0x83 None,
    "iinc" => 0x84 Iinc,
    "i2l" => 0x85 None,
    "i2f" => 0x86 None,
    "i2d" => 0x87 None,
    "l2i" => 0x88 None,
    "l2f" => 0x89 None,
    "l2d" => 0x8a None,
    "f2i" => 0x8b None,
    "f2l" => 0x8c None,
    "f2d" => 0x8d None,
    "d2i" => 0x8e None,
    "d2l" => 0x8f None,
    "d2f" => 0x90 None,
    "i2b" => 0x91 None,
    "i2c" => 0x92 None,
    "i2s" => 0x93 None,
    "lcmp" => 0x94 None,
    "fcmpl" => 0x95 None,
    "fcmpg" => 0x96 None,
    "dcmpl" => 0x97 None,
    "dcmpg" => 0x98 None,
    "ifeq" => 0x99 Branch,
    "ifne" => 0x9a Branch,
    "iflt" => 0x9b Branch,
    "ifge" => 0x9c Branch,
    "ifgt" => 0x9d Branch,
    "ifle" => 0x9e Branch,
    "if_icmpeq" => 0x9f Branch,
    "if_icmpne" => 0xa0 Branch,
    "if_icmplt" => 0xa1 Branch,
    "if_icmpge" => 0xa2 Branch,
    "if_icmpgt" => 0xa3 Branch,
    "if_icmple" => 0xa4 Branch,
    "if_acmpeq" => 0xa5 Branch,
    "if_acmpne" => 0xa6 Branch,
    "goto" => 0xa7 Branch,
    "jsr" => 0xa8 Branch,
    "ret" => 0xa9 LocalVar,
    "tableswitch" => 0xaa TableSwitch,
    "lookupswitch" => 0xab LookupSwitch,
    "ireturn" => 0xac None,
    "lreturn" => 0xad None,
    "freturn" => 0xae None,
    "dreturn" => 0xaf None,
    "areturn" => 0xb0 None,
    "return" => 0xb1 None,
    "getstatic" => 0xb2 Field,
    "putstatic" => 0xb3 Field,
    "getfield" => 0xb4 Field,
    "putfield" => 0xb5 Field,
    "invokevirtual" => 0xb6 Method,
    "invokespecial" => 0xb7 Method,
    "invokestatic" => 0xb8 Method,
    "invokeinterface" => 0xb9 InterfaceMethod,
    "new" => 0xbb Class,
    "newarray" => 0xbc ArrayType,
    "anewarray" => 0xbd Class,
    "arraylength" => 0xbe None,
    "athrow" => 0xbf None,
    "checkcast" => 0xc0 Class,
    "instanceof" => 0xc1 Class,
    "monitorenter" => 0xc2 None,
    "monitorexit" => 0xc3 None,
    "multianewarray" => 0xc5 MultiANewArray,
    "ifnull" => 0xc6 Branch,
    "ifnonnull" => 0xc7 Branch,
    "goto_w" => 0xc8 BranchWide,
    "jsr_w" => 0xc9 BranchWide,
}

impl Opcode {
    /// Find an opcode by its mnemonic
    pub fn lookup(mnemonic: &str) -> Option<&'static Opcode> {
        OPCODES.iter().find(|opcode| opcode.mnemonic == mnemonic)
    }
}

/// Resolved operand of an instruction
///
/// Constants are kept by value until the pool is finalized, and labels are kept as handles until
/// layout. Everything else has already been range checked to fit its encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    LocalVar(u16),
    Iinc {
        index: u16,
        delta: i16,
    },
    Byte(i8),
    Short(i16),
    ArrayType(u8),
    Branch(Label),

    /// Used by `ldc*`, field/method instructions, and class instructions
    Constant(Constant),

    /// `invokeinterface` method and argument count (in slots, including the receiver)
    InterfaceMethod(Constant, u8),

    /// `multianewarray` class and number of dimensions
    MultiANewArray(Constant, u8),

    TableSwitch {
        low: i32,
        default: Label,
        targets: Vec<Label>,
    },

    /// Pairs are sorted by key
    LookupSwitch {
        default: Label,
        pairs: Vec<(i32, Label)>,
    },
}

/// Instruction with its operand
#[derive(Debug, Clone, PartialEq)]
pub struct Insn {
    pub opcode: &'static Opcode,
    pub operand: Operand,
}

impl Insn {
    /// Pair an opcode with an operand, checking the operand has the right shape
    pub fn new(opcode: &'static Opcode, operand: Operand) -> Result<Insn, Error> {
        let operand = match (opcode.operand, operand) {
            (OperandKind::None, operand @ Operand::None)
            | (OperandKind::LocalVar, operand @ Operand::LocalVar(_))
            | (OperandKind::Iinc, operand @ Operand::Iinc { .. })
            | (OperandKind::Byte, operand @ Operand::Byte(_))
            | (OperandKind::Short, operand @ Operand::Short(_))
            | (OperandKind::ArrayType, operand @ Operand::ArrayType(_))
            | (OperandKind::Branch, operand @ Operand::Branch(_))
            | (OperandKind::BranchWide, operand @ Operand::Branch(_)) => operand,

            (OperandKind::Ldc | OperandKind::LdcWide, Operand::Constant(c)) if c.is_loadable() => {
                Operand::Constant(c)
            }
            (OperandKind::Ldc2, Operand::Constant(c @ (Constant::Long(_) | Constant::Double(_)))) => {
                Operand::Constant(c)
            }
            (OperandKind::Class, Operand::Constant(c @ Constant::Class(_))) => Operand::Constant(c),
            (OperandKind::Field, Operand::Constant(c @ Constant::FieldRef(_))) => {
                Operand::Constant(c)
            }
            (OperandKind::Method, Operand::Constant(c @ Constant::MethodRef(_))) => {
                Operand::Constant(c)
            }
            (
                OperandKind::InterfaceMethod,
                Operand::InterfaceMethod(c @ Constant::InterfaceMethodRef(_), count),
            ) => {
                if count == 0 {
                    let msg = "invokeinterface argument count must be at least 1";
                    return Err(Error::numeric(msg));
                }
                Operand::InterfaceMethod(c, count)
            }
            (
                OperandKind::MultiANewArray,
                Operand::MultiANewArray(c @ Constant::Class(_), dimensions),
            ) => {
                if dimensions == 0 {
                    let msg = "multianewarray needs at least 1 dimension";
                    return Err(Error::numeric(msg));
                }
                Operand::MultiANewArray(c, dimensions)
            }
            (
                OperandKind::TableSwitch,
                Operand::TableSwitch {
                    low,
                    default,
                    targets,
                },
            ) => {
                if targets.is_empty() {
                    return Err(Error::structural("tableswitch needs at least one target"));
                }
                if (low as i64) + (targets.len() as i64) - 1 > i32::MAX as i64 {
                    let msg = format!("tableswitch from {} has too many targets", low);
                    return Err(Error::numeric(msg));
                }
                Operand::TableSwitch {
                    low,
                    default,
                    targets,
                }
            }
            (OperandKind::LookupSwitch, Operand::LookupSwitch { default, mut pairs }) => {
                pairs.sort_by_key(|(key, _)| *key);
                if let Some(pair) = pairs.windows(2).find(|pair| pair[0].0 == pair[1].0) {
                    let msg = format!("duplicate lookupswitch key {}", pair[0].0);
                    return Err(Error::structural(msg));
                }
                Operand::LookupSwitch { default, pairs }
            }
            (kind, operand) => {
                let msg = format!(
                    "'{}' expects {} but got {}",
                    opcode.mnemonic,
                    kind.describe(),
                    operand.describe()
                );
                return Err(Error::structural(msg));
            }
        };
        Ok(Insn { opcode, operand })
    }

    /// Constants that need to be in the pool for this instruction to be encoded
    pub fn constant(&self) -> Option<&Constant> {
        match &self.operand {
            Operand::Constant(constant)
            | Operand::InterfaceMethod(constant, _)
            | Operand::MultiANewArray(constant, _) => Some(constant),
            _ => None,
        }
    }

    /// Labels referenced by the instruction
    pub fn labels(&self) -> Vec<Label> {
        match &self.operand {
            Operand::Branch(label) => vec![*label],
            Operand::TableSwitch {
                default, targets, ..
            } => std::iter::once(*default).chain(targets.iter().copied()).collect(),
            Operand::LookupSwitch { default, pairs } => std::iter::once(*default)
                .chain(pairs.iter().map(|(_, label)| *label))
                .collect(),
            _ => vec![],
        }
    }

    /// Does an `ldc` need to be encoded as `ldc_w`?
    fn needs_ldc_w(&self, pool: &ConstantPool) -> Result<bool, Error> {
        match (&self.opcode.operand, &self.operand) {
            (OperandKind::Ldc, Operand::Constant(constant)) => Ok(pool.index_of(constant)?.0 > 255),
            _ => Ok(false),
        }
    }

    /// Size of the encoded instruction (including any `wide` prefix or switch padding)
    ///
    /// The size depends on the offset at which the instruction is placed (switch padding) and on
    /// the finalized constant pool (`ldc` widening).
    pub fn size(&self, offset: usize, pool: &ConstantPool) -> Result<usize, Error> {
        let size = match &self.operand {
            Operand::None => 1,
            Operand::LocalVar(index) if *index > 255 => 4,
            Operand::LocalVar(_) => 2,
            Operand::Iinc { index, delta } if needs_wide_iinc(*index, *delta) => 6,
            Operand::Iinc { .. } => 3,
            Operand::Byte(_) | Operand::ArrayType(_) => 2,
            Operand::Short(_) => 3,
            Operand::Branch(_) if self.opcode.operand == OperandKind::BranchWide => 5,
            Operand::Branch(_) => 3,
            Operand::Constant(_) if self.opcode.operand == OperandKind::Ldc => {
                if self.needs_ldc_w(pool)? {
                    3
                } else {
                    2
                }
            }
            Operand::Constant(_) => 3,
            Operand::MultiANewArray(_, _) => 4,
            Operand::InterfaceMethod(_, _) => 5,
            Operand::TableSwitch { targets, .. } => {
                1 + switch_padding(offset) + 12 + 4 * targets.len()
            }
            Operand::LookupSwitch { pairs, .. } => 1 + switch_padding(offset) + 8 + 8 * pairs.len(),
        };
        Ok(size)
    }

    /// Write out the instruction, which must start at `offset` in the code array
    pub fn serialize<W: WriteBytesExt>(
        &self,
        offset: usize,
        pool: &ConstantPool,
        labels: &LabelTable,
        writer: &mut W,
    ) -> Result<(), Error> {
        let code = self.opcode.code;
        let jump = |label: &Label| -> Result<i64, Error> {
            Ok(labels.offset(*label)? as i64 - offset as i64)
        };
        let wide_jump = |label: &Label| -> Result<i32, Error> {
            let displacement = jump(label)?;
            i32::try_from(displacement).map_err(|_| {
                let msg = format!("jump to '{}' is too far ({})", labels.name(*label), displacement);
                Error::numeric(msg)
            })
        };

        match &self.operand {
            Operand::None => code.serialize(writer)?,
            Operand::LocalVar(index) => match u8::try_from(*index) {
                Ok(index) => {
                    code.serialize(writer)?;
                    index.serialize(writer)?;
                }
                Err(_) => {
                    WIDE.serialize(writer)?;
                    code.serialize(writer)?;
                    index.serialize(writer)?;
                }
            },
            Operand::Iinc { index, delta } => {
                if needs_wide_iinc(*index, *delta) {
                    WIDE.serialize(writer)?;
                    code.serialize(writer)?;
                    index.serialize(writer)?;
                    delta.serialize(writer)?;
                } else {
                    code.serialize(writer)?;
                    (*index as u8).serialize(writer)?;
                    (*delta as i8).serialize(writer)?;
                }
            }
            Operand::Byte(byte) => {
                code.serialize(writer)?;
                byte.serialize(writer)?;
            }
            Operand::Short(short) => {
                code.serialize(writer)?;
                short.serialize(writer)?;
            }
            Operand::ArrayType(array_type) => {
                code.serialize(writer)?;
                array_type.serialize(writer)?;
            }
            Operand::Branch(label) if self.opcode.operand == OperandKind::BranchWide => {
                code.serialize(writer)?;
                wide_jump(label)?.serialize(writer)?;
            }
            Operand::Branch(label) => {
                let displacement = jump(label)?;
                let displacement = i16::try_from(displacement).map_err(|_| {
                    let msg = format!(
                        "branch to '{}' is too far for '{}' ({})",
                        labels.name(*label),
                        self.opcode.mnemonic,
                        displacement
                    );
                    Error::numeric(msg)
                })?;
                code.serialize(writer)?;
                displacement.serialize(writer)?;
            }
            Operand::Constant(constant) => {
                let index = pool.index_of(constant)?;
                if self.opcode.operand == OperandKind::Ldc && index.0 <= 255 {
                    code.serialize(writer)?;
                    (index.0 as u8).serialize(writer)?;
                } else {
                    let code = if self.opcode.operand == OperandKind::Ldc {
                        LDC_W
                    } else {
                        code
                    };
                    code.serialize(writer)?;
                    index.serialize(writer)?;
                }
            }
            Operand::InterfaceMethod(constant, count) => {
                code.serialize(writer)?;
                pool.index_of(constant)?.serialize(writer)?;
                count.serialize(writer)?;
                0u8.serialize(writer)?;
            }
            Operand::MultiANewArray(constant, dimensions) => {
                code.serialize(writer)?;
                pool.index_of(constant)?.serialize(writer)?;
                dimensions.serialize(writer)?;
            }
            Operand::TableSwitch {
                low,
                default,
                targets,
            } => {
                code.serialize(writer)?;
                writer.write_all(&[0u8; 3][..switch_padding(offset)])?;
                wide_jump(default)?.serialize(writer)?;
                low.serialize(writer)?;
                (low + (targets.len() as i32 - 1)).serialize(writer)?;
                for target in targets {
                    wide_jump(target)?.serialize(writer)?;
                }
            }
            Operand::LookupSwitch { default, pairs } => {
                code.serialize(writer)?;
                writer.write_all(&[0u8; 3][..switch_padding(offset)])?;
                wide_jump(default)?.serialize(writer)?;
                (pairs.len() as i32).serialize(writer)?;
                for (key, target) in pairs {
                    key.serialize(writer)?;
                    wide_jump(target)?.serialize(writer)?;
                }
            }
        }
        Ok(())
    }
}

fn needs_wide_iinc(index: u16, delta: i16) -> bool {
    index > 255 || i8::try_from(delta).is_err()
}

/// Number of padding bytes after a switch opcode at `offset`
///
/// The padding aligns the start of the jump table to a multiple of 4 bytes from the start of the
/// method code.
pub fn switch_padding(offset: usize) -> usize {
    (4 - ((offset + 1) % 4)) % 4
}

impl OperandKind {
    fn describe(&self) -> &'static str {
        match self {
            OperandKind::None => "no operand",
            OperandKind::LocalVar => "a local variable index",
            OperandKind::Iinc => "a local variable index and an increment",
            OperandKind::Byte => "a byte immediate",
            OperandKind::Short => "a short immediate",
            OperandKind::ArrayType => "a primitive array type",
            OperandKind::Branch | OperandKind::BranchWide => "a label",
            OperandKind::Ldc | OperandKind::LdcWide => "an int, float, string, or class constant",
            OperandKind::Ldc2 => "a long or double constant",
            OperandKind::Class => "a class name",
            OperandKind::Field => "a field reference",
            OperandKind::Method => "a method reference",
            OperandKind::InterfaceMethod => "an interface method reference and argument count",
            OperandKind::MultiANewArray => "a class name and dimension count",
            OperandKind::TableSwitch => "a table switch",
            OperandKind::LookupSwitch => "a lookup switch",
        }
    }
}

impl Operand {
    fn describe(&self) -> &'static str {
        match self {
            Operand::None => "no operand",
            Operand::LocalVar(_) => "a local variable index",
            Operand::Iinc { .. } => "a local variable index and an increment",
            Operand::Byte(_) => "a byte immediate",
            Operand::Short(_) => "a short immediate",
            Operand::ArrayType(_) => "a primitive array type",
            Operand::Branch(_) => "a label",
            Operand::Constant(Constant::Integer(_)) => "an int constant",
            Operand::Constant(Constant::Float(_)) => "a float constant",
            Operand::Constant(Constant::Long(_)) => "a long constant",
            Operand::Constant(Constant::Double(_)) => "a double constant",
            Operand::Constant(Constant::String(_)) => "a string constant",
            Operand::Constant(Constant::Class(_)) => "a class name",
            Operand::Constant(Constant::FieldRef(_)) => "a field reference",
            Operand::Constant(Constant::MethodRef(_)) => "a method reference",
            Operand::Constant(Constant::InterfaceMethodRef(_)) => "an interface method reference",
            Operand::Constant(_) => "an unloadable constant",
            Operand::InterfaceMethod(_, _) => "an interface method reference and argument count",
            Operand::MultiANewArray(_, _) => "a class name and dimension count",
            Operand::TableSwitch { .. } => "a table switch",
            Operand::LookupSwitch { .. } => "a lookup switch",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::MemberRef;

    fn op(mnemonic: &str) -> &'static Opcode {
        Opcode::lookup(mnemonic).unwrap()
    }

    fn encode(insn: &Insn, offset: usize, pool: &ConstantPool, labels: &LabelTable) -> Vec<u8> {
        let mut bytes = vec![];
        insn.serialize(offset, pool, labels, &mut bytes).unwrap();
        assert_eq!(bytes.len(), insn.size(offset, pool).unwrap());
        bytes
    }

    fn finalized(constants: Vec<Constant>) -> ConstantPool {
        let mut pool = ConstantPool::new();
        for constant in constants {
            pool.add(constant).unwrap();
        }
        pool.finalize().unwrap();
        pool
    }

    #[test]
    fn table_has_no_duplicates() {
        for (i, a) in OPCODES.iter().enumerate() {
            for b in &OPCODES[i + 1..] {
                assert_ne!(a.mnemonic, b.mnemonic);
                assert_ne!(a.code, b.code);
            }
        }
        assert!(Opcode::lookup("wide").is_none());
        assert_eq!(op("return").code, 0xb1);
    }

    #[test]
    fn local_variables_get_wide_prefix() {
        let pool = finalized(vec![]);
        let labels = LabelTable::new();

        let insn = Insn::new(op("iload"), Operand::LocalVar(0)).unwrap();
        assert_eq!(encode(&insn, 0, &pool, &labels), vec![0x15, 0]);

        let insn = Insn::new(op("astore"), Operand::LocalVar(255)).unwrap();
        assert_eq!(encode(&insn, 0, &pool, &labels), vec![0x3a, 255]);

        let insn = Insn::new(op("dload"), Operand::LocalVar(256)).unwrap();
        assert_eq!(encode(&insn, 0, &pool, &labels), vec![WIDE, 0x18, 1, 0]);

        let insn = Insn::new(op("ret"), Operand::LocalVar(300)).unwrap();
        assert_eq!(encode(&insn, 0, &pool, &labels), vec![WIDE, 0xa9, 1, 44]);
    }

    #[test]
    fn iinc_widening() {
        let pool = finalized(vec![]);
        let labels = LabelTable::new();

        let insn = Insn::new(op("iinc"), Operand::Iinc { index: 1, delta: -128 }).unwrap();
        assert_eq!(encode(&insn, 0, &pool, &labels), vec![0x84, 1, 0x80]);

        let insn = Insn::new(op("iinc"), Operand::Iinc { index: 1, delta: 128 }).unwrap();
        assert_eq!(encode(&insn, 0, &pool, &labels), vec![WIDE, 0x84, 0, 1, 0, 128]);

        let insn = Insn::new(op("iinc"), Operand::Iinc { index: 256, delta: 1 }).unwrap();
        assert_eq!(encode(&insn, 0, &pool, &labels), vec![WIDE, 0x84, 1, 0, 0, 1]);
    }

    #[test]
    fn ldc_is_promoted_for_large_indices() {
        let mut constants: Vec<Constant> = (0..300).map(Constant::Integer).collect();
        constants.push(Constant::string("late"));
        let pool = finalized(constants);
        let labels = LabelTable::new();

        let early = Insn::new(op("ldc"), Operand::Constant(Constant::Integer(4))).unwrap();
        assert_eq!(encode(&early, 0, &pool, &labels), vec![0x12, 5]);

        let late = Insn::new(op("ldc"), Operand::Constant(Constant::string("late"))).unwrap();
        assert_eq!(encode(&late, 0, &pool, &labels), vec![0x13, 1, 45]);

        let wide = Insn::new(op("ldc_w"), Operand::Constant(Constant::Integer(4))).unwrap();
        assert_eq!(encode(&wide, 0, &pool, &labels), vec![0x13, 0, 5]);
    }

    #[test]
    fn branches_are_relative_to_the_branch() {
        let pool = finalized(vec![]);
        let mut labels = LabelTable::new();
        let back = labels.label("back");
        labels.place(back).unwrap();
        labels.set_offset(back, 2);

        let insn = Insn::new(op("goto"), Operand::Branch(back)).unwrap();
        assert_eq!(encode(&insn, 10, &pool, &labels), vec![0xa7, 0xff, 0xf8]);

        let insn = Insn::new(op("goto_w"), Operand::Branch(back)).unwrap();
        assert_eq!(encode(&insn, 10, &pool, &labels), vec![0xc8, 0xff, 0xff, 0xff, 0xf8]);

        labels.set_offset(back, 40000);
        let insn = Insn::new(op("ifeq"), Operand::Branch(back)).unwrap();
        let mut bytes = vec![];
        let err = insn.serialize(0, &pool, &labels, &mut bytes).unwrap_err();
        assert!(err.is_numeric());
    }

    #[test]
    fn switch_padding_depends_on_offset() {
        assert_eq!(switch_padding(0), 3);
        assert_eq!(switch_padding(1), 2);
        assert_eq!(switch_padding(2), 1);
        assert_eq!(switch_padding(3), 0);
        assert_eq!(switch_padding(4), 3);

        let pool = finalized(vec![]);
        let mut labels = LabelTable::new();
        let target = labels.label("t");
        labels.place(target).unwrap();
        labels.set_offset(target, 20);

        let insn = Insn::new(
            op("tableswitch"),
            Operand::TableSwitch {
                low: 5,
                default: target,
                targets: vec![target],
            },
        )
        .unwrap();
        assert_eq!(
            encode(&insn, 1, &pool, &labels),
            vec![0xaa, 0, 0, 0, 0, 0, 19, 0, 0, 0, 5, 0, 0, 0, 5, 0, 0, 0, 19]
        );
    }

    #[test]
    fn lookupswitch_keys_are_sorted() {
        let mut labels = LabelTable::new();
        let a = labels.label("a");
        let b = labels.label("b");
        let insn = Insn::new(
            op("lookupswitch"),
            Operand::LookupSwitch {
                default: a,
                pairs: vec![(10, a), (-3, b)],
            },
        )
        .unwrap();
        assert_eq!(
            insn.operand,
            Operand::LookupSwitch {
                default: a,
                pairs: vec![(-3, b), (10, a)],
            }
        );

        let dup = Insn::new(
            op("lookupswitch"),
            Operand::LookupSwitch {
                default: a,
                pairs: vec![(1, a), (1, b)],
            },
        );
        assert!(dup.unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn operand_shape_is_checked() {
        let err = Insn::new(op("return"), Operand::LocalVar(1)).unwrap_err();
        assert!(!err.is_numeric() && !err.is_internal());
        assert!(err.to_string().contains("'return' expects no operand"));

        let field = Constant::FieldRef(MemberRef::new("A", "f", "I"));
        assert!(Insn::new(op("invokevirtual"), Operand::Constant(field.clone())).is_err());
        assert!(Insn::new(op("getfield"), Operand::Constant(field)).is_ok());
        assert!(Insn::new(op("ldc"), Operand::Constant(Constant::Long(1))).is_err());
        assert!(Insn::new(op("ldc2_w"), Operand::Constant(Constant::Long(1))).is_ok());
    }

    #[test]
    fn interface_calls_carry_a_count() {
        let method = Constant::InterfaceMethodRef(MemberRef::new("I", "m", "(J)V"));
        let pool = finalized(vec![method.clone()]);
        let labels = LabelTable::new();
        let insn = Insn::new(op("invokeinterface"), Operand::InterfaceMethod(method, 3)).unwrap();
        assert_eq!(encode(&insn, 0, &pool, &labels), vec![0xb9, 0, 1, 3, 0]);
    }
}
