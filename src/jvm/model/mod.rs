//! Semantic representations of classes
//!
//! This is the representation the assembler builds up while reading directives. Constants are
//! kept by value and positions in code by label, so nothing needs to be resolved until the whole
//! class is known.
//!
//!   - __Class__ is represented using [`Class`]
//!   - __Method__ is represented using [`Method`]
//!   - __Field__ is represented using [`Field`]
//!   - __Annotation__ is represented using [`Annotation`]

mod annotation;
mod attributes;
mod class;
mod field;
mod method;

pub use annotation::*;
pub use attributes::*;
pub use class::*;
pub use field::*;
pub use method::*;
