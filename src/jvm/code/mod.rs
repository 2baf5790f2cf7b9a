//! Method bodies
//!
//! A method body is built up as a flat stream of instructions and labels. Since the assembler does
//! no automatic widening of jumps, the size of every instruction is known as soon as the constant
//! pool is finalized, so a single layout pass is enough to assign offsets to everything.

mod code;
mod instructions;
mod label;

pub use code::*;
pub use instructions::*;
pub use label::*;
