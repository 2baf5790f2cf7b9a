use crate::jvm::code::{LabelTable, Opcode, Operand, OperandKind};
use crate::jvm::{BaseType, Constant, Error, FieldType, MemberRef, MethodDescriptor, ParseDescriptor};

/// Operand of an instruction, as written in assembly
///
/// Unlike [`Operand`], nothing here has been range checked and labels are still names. Which
/// shapes are acceptable depends on the mnemonic.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    None,
    Int(i64),
    Float(f64),

    /// Quoted string literal
    String(String),

    /// Bare word: a class name, a label, or a primitive array type
    Word(String),

    /// Field or method reference
    Member(MemberRef),

    /// Interface method reference with an explicit argument count
    InterfaceMember(MemberRef, i64),

    /// Local variable index and increment (`iinc`)
    IntPair(i64, i64),

    /// Class name and dimension count (`multianewarray`)
    WordInt(String, i64),

    TableSwitch {
        low: i64,

        /// Checked against `low` and the number of targets when present
        high: Option<i64>,
        targets: Vec<String>,
        default: String,
    },
    LookupSwitch {
        pairs: Vec<(i64, String)>,
        default: String,
    },
}

/// Constant value of a field
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
}

impl Argument {
    pub fn member<S1, S2, S3>(class: S1, name: S2, descriptor: S3) -> Argument
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Argument::Member(MemberRef::new(class, name, descriptor))
    }

    pub fn string<S: Into<String>>(string: S) -> Argument {
        Argument::String(string.into())
    }

    pub fn word<S: Into<String>>(word: S) -> Argument {
        Argument::Word(word.into())
    }

    fn describe(&self) -> &'static str {
        match self {
            Argument::None => "no operand",
            Argument::Int(_) => "an integer",
            Argument::Float(_) => "a floating point number",
            Argument::String(_) => "a string",
            Argument::Word(_) => "a name",
            Argument::Member(_) => "a member reference",
            Argument::InterfaceMember(_, _) => "a member reference and count",
            Argument::IntPair(_, _) => "two integers",
            Argument::WordInt(_, _) => "a name and an integer",
            Argument::TableSwitch { .. } => "a table switch",
            Argument::LookupSwitch { .. } => "a lookup switch",
        }
    }

    /// Resolve into the operand for `opcode`, creating handles for any labels mentioned
    pub fn into_operand(self, opcode: &Opcode, labels: &mut LabelTable) -> Result<Operand, Error> {
        let operand = match (opcode.operand, self) {
            (OperandKind::None, Argument::None) => Operand::None,
            (OperandKind::LocalVar, Argument::Int(index)) => {
                Operand::LocalVar(narrow(index, "local variable index")?)
            }
            (OperandKind::Iinc, Argument::IntPair(index, delta)) => Operand::Iinc {
                index: narrow(index, "local variable index")?,
                delta: narrow(delta, "iinc increment")?,
            },
            (OperandKind::Byte, Argument::Int(value)) => Operand::Byte(narrow(value, "bipush value")?),
            (OperandKind::Short, Argument::Int(value)) => {
                Operand::Short(narrow(value, "sipush value")?)
            }
            (OperandKind::ArrayType, Argument::Word(name)) => Operand::ArrayType(array_type(&name)?),
            (OperandKind::ArrayType, Argument::Int(code)) => {
                Operand::ArrayType(narrow(code, "array type code")?)
            }
            (OperandKind::Branch | OperandKind::BranchWide, Argument::Word(label)) => {
                Operand::Branch(labels.label(&label))
            }

            (OperandKind::Ldc | OperandKind::LdcWide, Argument::Int(value)) => {
                Operand::Constant(Constant::Integer(narrow(value, "int constant")?))
            }
            (OperandKind::Ldc | OperandKind::LdcWide, Argument::Float(value)) => {
                Operand::Constant(Constant::float(value as f32))
            }
            (OperandKind::Ldc | OperandKind::LdcWide, Argument::String(string)) => {
                Operand::Constant(Constant::string(string))
            }
            (OperandKind::Ldc | OperandKind::LdcWide, Argument::Word(class)) => {
                Operand::Constant(Constant::class(class))
            }
            (OperandKind::Ldc2, Argument::Int(value)) => Operand::Constant(Constant::Long(value)),
            (OperandKind::Ldc2, Argument::Float(value)) => Operand::Constant(Constant::double(value)),

            (OperandKind::Class, Argument::Word(class)) => Operand::Constant(Constant::class(class)),
            (OperandKind::Field, Argument::Member(member)) => {
                Operand::Constant(Constant::FieldRef(member))
            }
            (OperandKind::Method, Argument::Member(member)) => {
                Operand::Constant(Constant::MethodRef(member))
            }
            (OperandKind::InterfaceMethod, Argument::Member(member)) => {
                let descriptor = MethodDescriptor::parse(&member.descriptor)?;
                let count = descriptor.parameter_length(true) as i64;
                let count = narrow(count, "invokeinterface argument count")?;
                Operand::InterfaceMethod(Constant::InterfaceMethodRef(member), count)
            }
            (OperandKind::InterfaceMethod, Argument::InterfaceMember(member, count)) => {
                let count = narrow(count, "invokeinterface argument count")?;
                Operand::InterfaceMethod(Constant::InterfaceMethodRef(member), count)
            }
            (OperandKind::MultiANewArray, Argument::WordInt(class, dimensions)) => {
                let dimensions = narrow(dimensions, "multianewarray dimensions")?;
                Operand::MultiANewArray(Constant::class(class), dimensions)
            }

            (
                OperandKind::TableSwitch,
                Argument::TableSwitch {
                    low,
                    high,
                    targets,
                    default,
                },
            ) => {
                if let Some(high) = high {
                    let expected = low + targets.len() as i64 - 1;
                    if high != expected {
                        let msg = format!(
                            "tableswitch from {} to {} needs {} targets but has {}",
                            low,
                            high,
                            high - low + 1,
                            targets.len()
                        );
                        return Err(Error::structural(msg));
                    }
                }
                Operand::TableSwitch {
                    low: narrow(low, "tableswitch low bound")?,
                    default: labels.label(&default),
                    targets: targets.iter().map(|target| labels.label(target)).collect(),
                }
            }
            (OperandKind::LookupSwitch, Argument::LookupSwitch { pairs, default }) => {
                let pairs = pairs
                    .iter()
                    .map(|(key, target)| Ok((narrow(*key, "lookupswitch key")?, labels.label(target))))
                    .collect::<Result<Vec<_>, Error>>()?;
                Operand::LookupSwitch {
                    default: labels.label(&default),
                    pairs,
                }
            }

            (_, argument) => {
                let msg = format!("'{}' cannot take {}", opcode.mnemonic, argument.describe());
                return Err(Error::structural(msg));
            }
        };
        Ok(operand)
    }
}

impl Literal {
    /// Constant for a field with this descriptor
    pub fn field_constant(&self, descriptor: &str) -> Result<Constant, Error> {
        let field_type = FieldType::parse(descriptor)?;
        let constant = match (&field_type, self) {
            (FieldType::Base(BaseType::Long), Literal::Int(value)) => Constant::Long(*value),
            (FieldType::Base(BaseType::Float), Literal::Int(value)) => Constant::float(*value as f32),
            (FieldType::Base(BaseType::Float), Literal::Float(value)) => {
                Constant::float(*value as f32)
            }
            (FieldType::Base(BaseType::Double), Literal::Int(value)) => {
                Constant::double(*value as f64)
            }
            (FieldType::Base(BaseType::Double), Literal::Float(value)) => Constant::double(*value),
            (FieldType::Base(base_type), Literal::Int(value)) => match base_type.int_range() {
                Some((min, max)) if *value < min || *value > max => {
                    let msg = format!("{} does not fit in a field of type '{}'", value, descriptor);
                    return Err(Error::numeric(msg));
                }
                Some(_) => Constant::Integer(*value as i32),
                None => return Err(mismatch(self, descriptor)),
            },
            (field_type, Literal::String(string)) if field_type.is_string() => {
                Constant::string(string.as_str())
            }
            _ => return Err(mismatch(self, descriptor)),
        };
        Ok(constant)
    }
}

fn mismatch(literal: &Literal, descriptor: &str) -> Error {
    let msg = format!(
        "constant value {:?} does not match field type '{}'",
        literal, descriptor
    );
    Error::structural(msg)
}

/// Convert a number into a narrower type, or complain that it is out of range
fn narrow<T: TryFrom<i64>>(value: i64, what: &str) -> Result<T, Error> {
    T::try_from(value).map_err(|_| Error::numeric(format!("{} {} is out of range", what, value)))
}

/// Type codes of `newarray`
fn array_type(name: &str) -> Result<u8, Error> {
    let code = match name {
        "boolean" => 4,
        "char" => 5,
        "float" => 6,
        "double" => 7,
        "byte" => 8,
        "short" => 9,
        "int" => 10,
        "long" => 11,
        _ => {
            let msg = format!("'{}' is not a primitive array type", name);
            return Err(Error::structural(msg));
        }
    };
    Ok(code)
}

#[cfg(test)]
mod test {
    use super::*;

    fn operand(mnemonic: &str, argument: Argument) -> Result<Operand, Error> {
        let mut labels = LabelTable::new();
        argument.into_operand(Opcode::lookup(mnemonic).unwrap(), &mut labels)
    }

    #[test]
    fn immediates_are_range_checked() {
        assert_eq!(operand("bipush", Argument::Int(-128)).unwrap(), Operand::Byte(-128));
        assert!(operand("bipush", Argument::Int(128)).unwrap_err().is_numeric());
        assert!(operand("sipush", Argument::Int(40000)).unwrap_err().is_numeric());
        assert!(operand("iload", Argument::Int(65536)).unwrap_err().is_numeric());
        assert!(operand("iinc", Argument::IntPair(1, 40000))
            .unwrap_err()
            .is_numeric());
        assert_eq!(
            operand("iinc", Argument::IntPair(300, -200)).unwrap(),
            Operand::Iinc {
                index: 300,
                delta: -200
            }
        );
    }

    #[test]
    fn ldc_constants() {
        assert_eq!(
            operand("ldc", Argument::Int(5)).unwrap(),
            Operand::Constant(Constant::Integer(5))
        );
        assert_eq!(
            operand("ldc", Argument::Float(1.5)).unwrap(),
            Operand::Constant(Constant::float(1.5))
        );
        assert_eq!(
            operand("ldc2_w", Argument::Float(1.5)).unwrap(),
            Operand::Constant(Constant::double(1.5))
        );
        assert_eq!(
            operand("ldc2_w", Argument::Int(1 << 40)).unwrap(),
            Operand::Constant(Constant::Long(1 << 40))
        );
        assert!(operand("ldc", Argument::Int(1 << 40)).unwrap_err().is_numeric());
        assert!(operand("ldc2_w", Argument::string("x")).is_err());
    }

    #[test]
    fn interface_count_from_descriptor() {
        let member = Argument::member("java/util/List", "set", "(ILjava/lang/Object;)V");
        match operand("invokeinterface", member).unwrap() {
            Operand::InterfaceMethod(_, count) => assert_eq!(count, 3),
            other => panic!("unexpected operand {:?}", other),
        }
    }

    #[test]
    fn tableswitch_high_must_match() {
        let switch = |high| Argument::TableSwitch {
            low: 1,
            high: Some(high),
            targets: vec!["a".to_owned(), "b".to_owned()],
            default: "c".to_owned(),
        };
        assert!(operand("tableswitch", switch(2)).is_ok());
        let err = operand("tableswitch", switch(3)).unwrap_err();
        assert!(!err.is_numeric());
    }

    #[test]
    fn array_types() {
        assert_eq!(
            operand("newarray", Argument::word("int")).unwrap(),
            Operand::ArrayType(10)
        );
        assert!(operand("newarray", Argument::word("String")).is_err());
    }

    #[test]
    fn shape_mismatch() {
        let err = operand("goto", Argument::Int(3)).unwrap_err();
        assert_eq!(err.to_string(), "'goto' cannot take an integer");
    }

    #[test]
    fn field_constants() {
        assert_eq!(
            Literal::Int(300).field_constant("I").unwrap(),
            Constant::Integer(300)
        );
        assert!(Literal::Int(300).field_constant("B").unwrap_err().is_numeric());
        assert_eq!(
            Literal::Int(3).field_constant("J").unwrap(),
            Constant::Long(3)
        );
        assert_eq!(
            Literal::String("x".to_owned())
                .field_constant("Ljava/lang/String;")
                .unwrap(),
            Constant::string("x")
        );
        assert!(Literal::Float(1.0).field_constant("I").is_err());
        assert!(Literal::Int(1).field_constant("Ljava/lang/Object;").is_err());
    }
}
