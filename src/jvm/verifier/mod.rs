//! Stack map frames
//!
//! For any specific instruction inside a method body, the stack and locals should have the same
//! structure, regardless of which control flow was used to reach that instruction. In other words:
//! although the values on the stack and in the locals may obviously be different, the types and
//! order of the stack and local variables cannot. This information is referred to as the _stack
//! map frame_ and the set of stack map frames for all possible jump targets in a method is the
//! _stack map table_.
//!
//! The assembler does not infer frames: they are declared explicitly (see [`VerifyFrame`]) and
//! only their encoding happens here. Depending on the class file version, frames end up either in
//! the compact [`crate::jvm::class_file::StackMapTable`] attribute (each frame delta-encoded
//! against the one before it) or in the older [`crate::jvm::class_file::StackMap`] attribute.
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.10.1

mod frame;
mod types;

pub use frame::*;
pub use types::*;
