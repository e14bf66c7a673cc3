//! Rendering typed values back to wire strings.

use crate::error::CodecError;
use crate::wire::{Grammar, Size, TokenList, WireScalar};

/// A type that can be rendered as a single wire value.
pub trait ToWire {
    /// Renders the value; `None` means there is nothing to send.
    fn to_wire(&self, grammar: &Grammar) -> Result<Option<String>, CodecError>;

    /// Returns true for the type's zero value (`0`, `false`, `""`, `None`,
    /// empty lists).
    fn is_zero(&self) -> bool;
}

/// Renders any [`WireScalar`].
pub fn scalar_to_wire<T: WireScalar>(value: &T) -> Result<Option<String>, CodecError> {
    value.marshal().map(Some)
}

impl ToWire for bool {
    fn to_wire(&self, _grammar: &Grammar) -> Result<Option<String>, CodecError> {
        scalar_to_wire(self)
    }

    fn is_zero(&self) -> bool {
        !*self
    }
}

impl ToWire for String {
    fn to_wire(&self, _grammar: &Grammar) -> Result<Option<String>, CodecError> {
        Ok(Some(self.clone()))
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

macro_rules! impl_integer_to_wire {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToWire for $ty {
                fn to_wire(&self, _grammar: &Grammar) -> Result<Option<String>, CodecError> {
                    scalar_to_wire(self)
                }

                fn is_zero(&self) -> bool {
                    *self == 0
                }
            }
        )*
    };
}

impl_integer_to_wire!(u8, u16, u32, u64, i8, i16, i32, i64);

impl ToWire for f64 {
    fn to_wire(&self, _grammar: &Grammar) -> Result<Option<String>, CodecError> {
        if !self.is_finite() {
            return Err(CodecError::UnknownVariant { type_name: "number" });
        }
        Ok(Some(self.to_string()))
    }

    fn is_zero(&self) -> bool {
        *self == 0.0
    }
}

impl ToWire for Size {
    fn to_wire(&self, _grammar: &Grammar) -> Result<Option<String>, CodecError> {
        scalar_to_wire(self)
    }

    fn is_zero(&self) -> bool {
        self.bytes() == 0
    }
}

impl ToWire for TokenList {
    fn to_wire(&self, grammar: &Grammar) -> Result<Option<String>, CodecError> {
        Ok(Some(self.marshal(grammar)))
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T: ToWire> ToWire for Option<T> {
    fn to_wire(&self, grammar: &Grammar) -> Result<Option<String>, CodecError> {
        match self {
            Some(value) => value.to_wire(grammar),
            None => Ok(None),
        }
    }

    fn is_zero(&self) -> bool {
        self.is_none()
    }
}

/// Joined with the grammar's list separator, mirroring extraction.
impl<T: ToWire> ToWire for Vec<T> {
    fn to_wire(&self, grammar: &Grammar) -> Result<Option<String>, CodecError> {
        let mut out = String::new();
        for (i, item) in self.iter().enumerate() {
            if i > 0 {
                out.push(grammar.list_separator);
            }
            if let Some(token) = item.to_wire(grammar)? {
                out.push_str(&token);
            }
        }
        Ok(Some(out))
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}
