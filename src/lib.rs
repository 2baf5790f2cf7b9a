//! Assemble JVM class files from a stream of directives
//!
//! The crate is split in two:
//!
//!   - [`jvm`] models class files: the constant pool, attributes, method bodies, and stack map
//!     frames, along with their binary encoding
//!   - [`assemble`] drives that model from Jasmin-style directives (`.class`, `.method`,
//!     instruction mnemonics, `.catch`, `.stack`, ...) and collects diagnostics
//!
//! ### Simple example
//!
//! ```
//! use jvmasm::assemble::{Argument, ClassAssembler, Settings};
//! use jvmasm::jvm::{ClassAccessFlags, MethodAccessFlags};
//!
//! # fn assemble() -> Result<(), jvmasm::assemble::Error> {
//! let mut assembler = ClassAssembler::new(Settings::default());
//! assembler.set_class(ClassAccessFlags::PUBLIC, "me/Hello");
//! assembler.set_super("java/lang/Object");
//!
//! assembler.begin_method(MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC, "main", "([Ljava/lang/String;)V");
//! assembler.set_limit_stack(2);
//! assembler.emit("getstatic", Argument::member("java/lang/System", "out", "Ljava/io/PrintStream;"));
//! assembler.emit("ldc", Argument::string("Hello, world"));
//! assembler.emit("invokevirtual", Argument::member("java/io/PrintStream", "println", "(Ljava/lang/String;)V"));
//! assembler.emit("return", Argument::None);
//! assembler.end_method();
//!
//! let class_file = assembler.finish()?;
//! let bytes: Vec<u8> = class_file.to_bytes().map_err(jvmasm::assemble::Error::from)?;
//! assert_eq!(&bytes[0..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
//! # Ok(())
//! # }
//! # assemble().unwrap();
//! ```

pub mod assemble;
pub mod jvm;
pub mod util;
