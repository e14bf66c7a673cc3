//! Request building: typed values back to form pairs.

pub mod form;
pub mod scalar;

pub use form::{Form, FormEncoder, Mode, ToForm, TokenWriter, DELETE_KEY};
pub use scalar::{scalar_to_wire, ToWire};
