//! Scalar encoding/decoding for wire tokens.
//!
//! Booleans travel as `"1"`/`"0"`, integers as plain decimal, enumerations as
//! exact case-sensitive tokens and byte sizes with a unit suffix.

use std::fmt;

use crate::error::CodecError;

/// A value with a single-token wire representation.
pub trait WireScalar: Sized {
    /// Human readable name of the expected token, used in errors.
    const EXPECTED: &'static str;

    /// Renders the value as its wire token.
    fn marshal(&self) -> Result<String, CodecError>;

    /// Parses a wire token.
    fn unmarshal(raw: &str) -> Result<Self, CodecError>;
}

impl WireScalar for bool {
    const EXPECTED: &'static str = "boolean";

    fn marshal(&self) -> Result<String, CodecError> {
        Ok(if *self { "1" } else { "0" }.to_string())
    }

    fn unmarshal(raw: &str) -> Result<Self, CodecError> {
        match raw {
            "1" => Ok(true),
            "0" => Ok(false),
            _ => Err(CodecError::unrecognized(Self::EXPECTED, raw)),
        }
    }
}

impl WireScalar for String {
    const EXPECTED: &'static str = "string";

    fn marshal(&self) -> Result<String, CodecError> {
        Ok(self.clone())
    }

    fn unmarshal(raw: &str) -> Result<Self, CodecError> {
        Ok(raw.to_string())
    }
}

macro_rules! impl_integer_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl WireScalar for $ty {
                const EXPECTED: &'static str = stringify!($ty);

                fn marshal(&self) -> Result<String, CodecError> {
                    Ok(self.to_string())
                }

                fn unmarshal(raw: &str) -> Result<Self, CodecError> {
                    // str::parse accepts a leading '+', the wire never does
                    if raw.starts_with('+') {
                        return Err(CodecError::unrecognized(Self::EXPECTED, raw));
                    }
                    raw.parse::<$ty>()
                        .map_err(|_| CodecError::unrecognized(Self::EXPECTED, raw))
                }
            }
        )*
    };
}

impl_integer_scalar!(u8, u16, u32, u64, usize, i8, i16, i32, i64);

/// Defines a closed enumeration of wire tokens.
///
/// Every generated enum carries an extra `Unknown` member, which is what
/// `from_token_lenient` yields for tokens this crate does not know. Strict
/// [`WireScalar::unmarshal`] rejects them instead, and `Unknown` itself cannot
/// be marshaled. `Unknown` is also the zero value seen by the form encoder.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident as $label:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $token:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// Token not known to this crate.
            #[default]
            Unknown,
        }

        impl $name {
            /// All known members, in declaration order.
            pub const VARIANTS: &'static [$name] = &[$($name::$variant),+];

            /// Returns the wire token, or `None` for `Unknown`.
            pub fn token(&self) -> Option<&'static str> {
                match self {
                    $( $name::$variant => Some($token), )+
                    $name::Unknown => None,
                }
            }

            /// Returns true for every member except `Unknown`.
            pub fn is_valid(&self) -> bool {
                !self.is_unknown()
            }

            /// Returns true if this is the `Unknown` member.
            pub fn is_unknown(&self) -> bool {
                matches!(self, $name::Unknown)
            }

            /// Parses a token, mapping unrecognized input to `Unknown`.
            pub fn from_token_lenient(raw: &str) -> Self {
                match raw {
                    $( $token => $name::$variant, )+
                    _ => {
                        tracing::warn!(token = raw, kind = $label, "unrecognized enum token");
                        $name::Unknown
                    }
                }
            }
        }

        impl $crate::wire::WireScalar for $name {
            const EXPECTED: &'static str = $label;

            fn marshal(&self) -> Result<String, $crate::error::CodecError> {
                self.token()
                    .map(str::to_string)
                    .ok_or($crate::error::CodecError::UnknownVariant { type_name: $label })
            }

            fn unmarshal(raw: &str) -> Result<Self, $crate::error::CodecError> {
                match raw {
                    $( $token => Ok($name::$variant), )+
                    _ => Err($crate::error::CodecError::unrecognized($label, raw)),
                }
            }
        }

        impl $crate::schema::FromWire for $name {
            fn from_wire(
                value: &$crate::wire::WireValue,
                _grammar: &$crate::wire::Grammar,
            ) -> Result<Self, $crate::error::Rejection> {
                $crate::schema::scalar_from_wire(value)
            }
        }

        impl $crate::encode::ToWire for $name {
            fn to_wire(
                &self,
                _grammar: &$crate::wire::Grammar,
            ) -> Result<Option<String>, $crate::error::CodecError> {
                $crate::encode::scalar_to_wire(self)
            }

            fn is_zero(&self) -> bool {
                self.is_unknown()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.token().unwrap_or("unknown"))
            }
        }
    };
}

pub(crate) use wire_enum;

const KIB: u64 = 1024;
const UNITS: [(char, u64); 4] = [
    ('T', KIB * KIB * KIB * KIB),
    ('G', KIB * KIB * KIB),
    ('M', KIB * KIB),
    ('K', KIB),
];

/// A byte size in the wire's suffix notation (`32G`, `512M`, `4096`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Size(u64);

impl Size {
    /// Creates a size from a byte count.
    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    /// Creates a size from a count of mebibytes.
    pub const fn from_mib(mib: u64) -> Self {
        Self(mib * KIB * KIB)
    }

    /// Creates a size from a count of gibibytes.
    pub const fn from_gib(gib: u64) -> Self {
        Self(gib * KIB * KIB * KIB)
    }

    /// Returns the size in bytes.
    pub const fn bytes(self) -> u64 {
        self.0
    }
}

impl WireScalar for Size {
    const EXPECTED: &'static str = "size";

    fn marshal(&self) -> Result<String, CodecError> {
        Ok(self.to_string())
    }

    fn unmarshal(raw: &str) -> Result<Self, CodecError> {
        let err = || CodecError::unrecognized(Self::EXPECTED, raw);
        let (digits, multiplier) = match raw.chars().last() {
            Some(c) if c.is_ascii_digit() => (raw, 1),
            Some(c) => {
                let (_, mult) = UNITS.iter().find(|(unit, _)| *unit == c).ok_or_else(err)?;
                (&raw[..raw.len() - c.len_utf8()], *mult)
            }
            None => return Err(err()),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let count: u64 = digits.parse().map_err(|_| err())?;
        count.checked_mul(multiplier).map(Size).ok_or_else(err)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 != 0 {
            for (unit, mult) in UNITS {
                if self.0 % mult == 0 {
                    return write!(f, "{}{}", self.0 / mult, unit);
                }
            }
        }
        write!(f, "{}", self.0)
    }
}
