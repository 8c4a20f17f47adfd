#![forbid(unsafe_code)]

pub mod common;
pub mod directives;
pub mod selection;
pub mod vocabulary;
pub mod wire;

pub use common::{ContractViolation, ReasonCodeId, SchemaVersion, Validate};
pub use directives::{Coercion, FieldDirective, FieldDirectives, NormalizeOutput};
pub use selection::{FieldEdit, FieldId, Selection};
pub use vocabulary::{
    Diameter, GravityVariant, MotorType, PowerRating, ProductType, TopPart, ValveKind,
    ValvePosition, Vocabulary,
};
