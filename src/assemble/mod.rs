//! Assembling classes from a stream of directives
//!
//! [`ClassAssembler`] is driven one directive at a time (by [`reader`] or by hand) and keeps
//! going after errors so that everything wrong with a source unit gets reported at once.

mod class_assembler;
mod errors;
mod operand;
pub mod reader;
mod settings;

pub use class_assembler::*;
pub use errors::*;
pub use operand::*;
pub use settings::*;
