//! The resolution pipeline: reference lookup, per-field resolution, and
//! whole-record building.

pub mod builder;
pub mod field;
pub mod reference;

pub use builder::build_record;
pub use field::{resolve_field, FieldContext};
pub use reference::{resolve_reference, Reference};
