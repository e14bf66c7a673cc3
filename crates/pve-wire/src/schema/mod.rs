//! Property schema engine: typed extraction from wire maps.
//!
//! Each domain type declares a static table of [`FieldSpec`]s and decodes
//! itself field by field in declaration order, stopping at the first error.

pub mod composite;
pub mod defaults;
pub mod extract;
pub mod field;

pub use composite::{composite_from_wire, composite_to_wire, Composite};
pub(crate) use composite::composite_wire;
pub use defaults::DefaultTable;
pub use extract::{reject, scalar_from_wire, FromWire, FromWireMap};
pub use field::{EmissionPolicy, FieldSpec, Presence};
