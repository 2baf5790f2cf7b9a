//! Model and encode JVM classes
//!
//! There are two representations of a class:
//!
//!   - [`model`] is the semantic one, where constants are referred to by value and positions in
//!     method bodies by [`code::Label`]s
//!   - [`class_file`] is the on-disk one, where everything has been resolved to constant pool
//!     indices and offsets
//!
//! Going from the first to the second happens in [`model::Class::serialize`], which registers
//! every constant the class needs, finalizes the pool, then lays out every method body.
//!
//! ### Simple example
//!
//! ```
//! use jvmasm::jvm::code::{CodeAttr, Insn, Opcode, Operand};
//! use jvmasm::jvm::model::{Class, Method};
//! use jvmasm::jvm::*;
//!
//! # fn generate_class() -> Result<(), Error> {
//! let mut class = Class::new("me/alec/Empty");
//! class.super_class = Some(String::from("java/lang/Object"));
//! class.access_flags = ClassAccessFlags::PUBLIC;
//!
//! // Static method with an empty body
//! let mut method = Method::new(MethodAccessFlags::STATIC, "nothing", "()V");
//! let mut code = CodeAttr::new();
//! let ret = Opcode::lookup("return").ok_or_else(|| Error::structural("no return"))?;
//! code.push_insn(Insn::new(ret, Operand::None)?);
//! method.code = Some(code);
//! class.methods.push(method);
//!
//! // Finally, encode the class into bytes
//! let class_bytes: Vec<u8> = class.serialize()?.to_bytes()?;
//! assert_eq!(&class_bytes[0..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
//! # Ok(())
//! # }
//! # generate_class().unwrap();
//! ```

mod access_flags;
pub mod class_file;
pub mod code;
mod descriptors;
mod errors;
pub mod model;
pub mod verifier;

pub use access_flags::*;
pub use class_file::{Constant, MemberRef};
pub use descriptors::*;
pub use errors::Error;
