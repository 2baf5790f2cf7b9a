//! Binary representation of class files
//!
//! Everything in here is already resolved down to constant pool indices and byte offsets: the
//! structures map one-to-one onto what gets written out. Building them up happens in
//! [`crate::jvm::model`].

mod annotation;
mod attribute;
mod class;
mod constants;
mod field;
mod method;
mod serialize;
mod version;

pub use annotation::*;
pub use attribute::*;
pub use class::*;
pub use constants::*;
pub use field::*;
pub use method::*;
pub use serialize::*;
pub use version::*;
