//! Wire-level building blocks: raw values, scalar tokens and token lists.

pub mod dictionary;
pub mod scalar;
pub mod value;

pub use dictionary::{marshal_flags, parse_flags, Entry, Flag, Grammar, TokenList};
pub use scalar::{Size, WireScalar};
pub(crate) use scalar::wire_enum;
pub use value::{wire_map_from_json, wire_map_from_pairs, WireMap, WireValue};
