//! Records packed into one string with the token-list grammar.

use crate::error::{CodecError, PropertyError, Rejection};
use crate::schema::extract::FromWire;
use crate::wire::{Grammar, TokenList, WireValue};

/// A record stored as a token list inside a single wire field, such as a
/// disk (`local-lvm:vm-100-disk-0,size=32G`) or a network interface.
pub trait Composite: Sized {
    /// Builds the record from parsed entries.
    fn from_tokens(list: &TokenList) -> Result<Self, PropertyError>;

    /// Lays the record out as entries, positional ones first.
    fn to_tokens(&self) -> Result<TokenList, CodecError>;
}

/// Parses a string value with `grammar` and hands the entries to `T`.
///
/// Errors inside the record surface as [`Rejection::Entry`], so the outer
/// property name and the inner key are both reported.
pub fn composite_from_wire<T: Composite>(value: &WireValue, grammar: &Grammar) -> Result<T, Rejection> {
    let list = TokenList::from_wire(value, grammar)?;
    T::from_tokens(&list).map_err(|err| Rejection::Entry(Box::new(err)))
}

/// Renders a record with `grammar`.
pub fn composite_to_wire<T: Composite>(value: &T, grammar: &Grammar) -> Result<String, CodecError> {
    Ok(value.to_tokens()?.marshal(grammar))
}

/// Implements `FromWire`/`ToWire` for a [`Composite`] using `grammar`.
macro_rules! composite_wire {
    ($ty:ty, $grammar:expr) => {
        impl $crate::schema::FromWire for $ty {
            const GRAMMAR: $crate::wire::Grammar = $grammar;

            fn from_wire(
                value: &$crate::wire::WireValue,
                grammar: &$crate::wire::Grammar,
            ) -> Result<Self, $crate::error::Rejection> {
                $crate::schema::composite_from_wire(value, grammar)
            }
        }

        impl $crate::encode::ToWire for $ty {
            fn to_wire(
                &self,
                grammar: &$crate::wire::Grammar,
            ) -> Result<Option<String>, $crate::error::CodecError> {
                $crate::schema::composite_to_wire(self, grammar).map(Some)
            }

            fn is_zero(&self) -> bool {
                false
            }
        }
    };
}

pub(crate) use composite_wire;
