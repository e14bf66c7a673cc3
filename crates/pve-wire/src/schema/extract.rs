//! Extraction of typed values from wire maps.
//!
//! Policy per field:
//!
//! | Kind      | Missing                      | Present, rejected        |
//! |-----------|------------------------------|--------------------------|
//! | Required  | `MissingProperty`            | `InvalidProperty`        |
//! | Optional  | empty value                  | `InvalidProperty`        |
//! | Default   | default token, decoded       | `InvalidProperty`        |
//!
//! A transform, when declared, runs last on both paths.

use crate::error::{PropertyError, Rejection};
use crate::schema::field::{FieldSpec, Presence};
use crate::wire::{Grammar, Size, TokenList, WireMap, WireScalar, WireValue};

/// A type that can be decoded from a single [`WireValue`].
pub trait FromWire: Sized {
    /// Grammar used for string-encoded composite values of this type.
    const GRAMMAR: Grammar = Grammar::PROPERTY_STRING;

    /// Decodes a present value.
    fn from_wire(value: &WireValue, grammar: &Grammar) -> Result<Self, Rejection>;

    /// The value an optional field takes when missing, if the type has one.
    fn absent() -> Option<Self> {
        None
    }
}

/// A record decoded from a whole wire map, field by field.
///
/// Implementations extract fields in declaration order and return on the
/// first failure.
pub trait FromWireMap: Sized {
    fn from_wire_map(map: &WireMap) -> Result<Self, PropertyError>;
}

impl<T: FromWire> FieldSpec<T> {
    /// Extracts this field from a wire map.
    pub fn extract(&self, map: &WireMap) -> Result<T, PropertyError> {
        self.resolve(map.get(self.name))
    }

    /// Extracts this field from the entries of a token list.
    ///
    /// A bare key counts as missing.
    pub fn extract_from_tokens(&self, list: &TokenList) -> Result<T, PropertyError> {
        let value = list.get(self.name).map(WireValue::from);
        self.resolve(value.as_ref())
    }

    /// Decodes an already-located value, or applies the missing policy.
    pub fn resolve(&self, raw: Option<&WireValue>) -> Result<T, PropertyError> {
        let grammar = self.grammar.unwrap_or(T::GRAMMAR);
        let value = match raw.filter(|v| !v.is_absent()) {
            Some(raw) => {
                let value =
                    T::from_wire(raw, &grammar).map_err(|reason| self.invalid(raw, reason))?;
                if let Some(validate) = self.validator {
                    if !validate(&value) {
                        return Err(self.invalid(raw, Rejection::FailedValidation));
                    }
                }
                value
            }
            None => match self.presence {
                Presence::Required => {
                    return Err(PropertyError::MissingProperty { name: self.name });
                }
                Presence::Optional => {
                    T::absent().ok_or(PropertyError::MissingProperty { name: self.name })?
                }
                Presence::Default(token) => {
                    tracing::trace!(field = self.name, default = token, "using default");
                    let raw = WireValue::from(token);
                    T::from_wire(&raw, &grammar).map_err(|reason| self.invalid(&raw, reason))?
                }
            },
        };

        Ok(match self.transform {
            Some(transform) => transform(value),
            None => value,
        })
    }

    fn invalid(&self, raw: &WireValue, reason: Rejection) -> PropertyError {
        let reason = match reason {
            Rejection::Codec(err) => Rejection::Codec(err.with_field(self.name)),
            other => other,
        };
        PropertyError::InvalidProperty {
            name: self.name,
            value: raw.to_string(),
            reason,
        }
    }
}

/// Builds an `InvalidProperty` error for values decoded outside a field spec.
pub fn reject(name: &'static str, raw: &str, reason: impl Into<Rejection>) -> PropertyError {
    let reason = match reason.into() {
        Rejection::Codec(err) => Rejection::Codec(err.with_field(name)),
        other => other,
    };
    PropertyError::InvalidProperty {
        name,
        value: WireValue::from(raw).to_string(),
        reason,
    }
}

fn mismatch(expected: &'static str, found: &WireValue) -> Rejection {
    Rejection::TypeMismatch {
        expected,
        found: found.type_name(),
    }
}

/// Decodes any [`WireScalar`] carried as a string.
pub fn scalar_from_wire<T: WireScalar>(value: &WireValue) -> Result<T, Rejection> {
    match value {
        WireValue::String(s) => Ok(T::unmarshal(s)?),
        other => Err(mismatch(T::EXPECTED, other)),
    }
}

impl FromWire for bool {
    fn from_wire(value: &WireValue, _grammar: &Grammar) -> Result<Self, Rejection> {
        match value {
            WireValue::Number(n) if *n == 0.0 => Ok(false),
            WireValue::Number(n) if *n == 1.0 => Ok(true),
            WireValue::Number(_) => Err(Rejection::NotBoolean),
            other => scalar_from_wire(other),
        }
    }
}

macro_rules! impl_integer_from_wire {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromWire for $ty {
                fn from_wire(value: &WireValue, _grammar: &Grammar) -> Result<Self, Rejection> {
                    match value {
                        WireValue::Number(n) => {
                            if !n.is_finite() || n.fract() != 0.0 {
                                return Err(Rejection::NotIntegral);
                            }
                            // MAX + 1 is a power of two, exact as f64
                            if *n < <$ty>::MIN as f64 || *n >= <$ty>::MAX as f64 + 1.0 {
                                return Err(Rejection::OutOfRange { expected: stringify!($ty) });
                            }
                            Ok(*n as $ty)
                        }
                        other => scalar_from_wire(other),
                    }
                }
            }
        )*
    };
}

impl_integer_from_wire!(u8, u16, u32, u64, i8, i16, i32, i64);

impl FromWire for f64 {
    fn from_wire(value: &WireValue, _grammar: &Grammar) -> Result<Self, Rejection> {
        match value {
            WireValue::Number(n) => Ok(*n),
            WireValue::String(s) => s
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| crate::error::CodecError::unrecognized("number", s.as_str()).into()),
            other => Err(mismatch("number", other)),
        }
    }
}

impl FromWire for String {
    fn from_wire(value: &WireValue, _grammar: &Grammar) -> Result<Self, Rejection> {
        scalar_from_wire(value)
    }
}

impl FromWire for Size {
    fn from_wire(value: &WireValue, grammar: &Grammar) -> Result<Self, Rejection> {
        match value {
            WireValue::Number(_) => u64::from_wire(value, grammar).map(Size::from_bytes),
            other => scalar_from_wire(other),
        }
    }
}

impl FromWire for TokenList {
    fn from_wire(value: &WireValue, grammar: &Grammar) -> Result<Self, Rejection> {
        match value {
            WireValue::String(s) => Ok(TokenList::parse(s, grammar)?),
            other => Err(mismatch("token list", other)),
        }
    }
}

impl<T: FromWire> FromWire for Option<T> {
    const GRAMMAR: Grammar = T::GRAMMAR;

    fn from_wire(value: &WireValue, grammar: &Grammar) -> Result<Self, Rejection> {
        match value {
            WireValue::Absent => Ok(None),
            other => T::from_wire(other, grammar).map(Some),
        }
    }

    fn absent() -> Option<Self> {
        Some(None)
    }
}

/// Sequences decode element-wise; strings split on the grammar's list
/// separator (`images,rootdir`).
impl<T: FromWire> FromWire for Vec<T> {
    const GRAMMAR: Grammar = T::GRAMMAR;

    fn from_wire(value: &WireValue, grammar: &Grammar) -> Result<Self, Rejection> {
        match value {
            WireValue::Sequence(items) => items.iter().map(|v| T::from_wire(v, grammar)).collect(),
            WireValue::String(s) if s.is_empty() => Ok(Vec::new()),
            WireValue::String(s) => s
                .split(grammar.list_separator)
                .map(|token| T::from_wire(&WireValue::from(token), grammar))
                .collect(),
            other => Err(mismatch("sequence", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CodecError, ErrorKind};

    fn map(pairs: &[(&str, WireValue)]) -> WireMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn even(v: &u32) -> bool {
        v % 2 == 0
    }

    fn double(v: u32) -> u32 {
        v * 2
    }

    static REQUIRED: FieldSpec<u32> = FieldSpec::required("cores");
    static DEFAULTED: FieldSpec<u32> = FieldSpec::defaulted("sockets", "3");
    static VALIDATED: FieldSpec<u32> = FieldSpec::defaulted("vcpus", "3").validate(even);
    static TRANSFORMED: FieldSpec<u32> = FieldSpec::defaulted("shares", "5").transform(double);
    static OPTIONAL: FieldSpec<Option<String>> = FieldSpec::optional("description");
    static FLAG: FieldSpec<bool> = FieldSpec::defaulted("onboot", "0");

    #[test]
    fn test_required_missing() {
        assert_eq!(
            REQUIRED.extract(&WireMap::default()),
            Err(PropertyError::MissingProperty { name: "cores" })
        );
        // explicit absent counts as missing
        let m = map(&[("cores", WireValue::Absent)]);
        assert_eq!(REQUIRED.extract(&m).unwrap_err().kind(), ErrorKind::MissingProperty);
    }

    #[test]
    fn test_default_is_declared_value_not_zero() {
        assert_eq!(DEFAULTED.extract(&WireMap::default()).unwrap(), 3);
        assert_eq!(FLAG.extract(&WireMap::default()).unwrap(), false);
        assert_eq!(OPTIONAL.extract(&WireMap::default()).unwrap(), None);
    }

    #[test]
    fn test_integral_numbers_only() {
        let m = map(&[("cores", WireValue::Number(4.0))]);
        assert_eq!(REQUIRED.extract(&m).unwrap(), 4);

        let m = map(&[("cores", WireValue::Number(4.5))]);
        let err = REQUIRED.extract(&m).unwrap_err();
        assert_eq!(
            err,
            PropertyError::InvalidProperty {
                name: "cores",
                value: "4.5".to_string(),
                reason: Rejection::NotIntegral,
            }
        );

        let m = map(&[("cores", WireValue::Number(-1.0))]);
        assert!(matches!(
            REQUIRED.extract(&m),
            Err(PropertyError::InvalidProperty { reason: Rejection::OutOfRange { .. }, .. })
        ));

        let m = map(&[("cores", WireValue::Number(4294967296.0))]);
        assert!(REQUIRED.extract(&m).is_err());
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let m = map(&[("cores", "8".into())]);
        assert_eq!(REQUIRED.extract(&m).unwrap(), 8);

        let m = map(&[("cores", "+8".into())]);
        let err = REQUIRED.extract(&m).unwrap_err();
        assert!(matches!(
            err,
            PropertyError::InvalidProperty {
                reason: Rejection::Codec(CodecError::UnrecognizedToken { field: Some("cores"), .. }),
                ..
            }
        ));
    }

    #[test]
    fn test_boolean_boundary() {
        for (raw, expected) in [(0.0, false), (1.0, true)] {
            let m = map(&[("onboot", WireValue::Number(raw))]);
            assert_eq!(FLAG.extract(&m).unwrap(), expected);
        }
        let m = map(&[("onboot", WireValue::Number(2.0))]);
        assert!(matches!(
            FLAG.extract(&m),
            Err(PropertyError::InvalidProperty { name: "onboot", reason: Rejection::NotBoolean, .. })
        ));
        let m = map(&[("onboot", "true".into())]);
        assert_eq!(FLAG.extract(&m).unwrap_err().kind(), ErrorKind::InvalidProperty);
        let m = map(&[("onboot", "1".into())]);
        assert_eq!(FLAG.extract(&m).unwrap(), true);
    }

    #[test]
    fn test_validator_only_on_present_values() {
        // default 3 is odd but skips validation
        assert_eq!(VALIDATED.extract(&WireMap::default()).unwrap(), 3);

        let m = map(&[("vcpus", WireValue::Number(4.0))]);
        assert_eq!(VALIDATED.extract(&m).unwrap(), 4);

        let m = map(&[("vcpus", WireValue::Number(5.0))]);
        assert_eq!(
            VALIDATED.extract(&m),
            Err(PropertyError::InvalidProperty {
                name: "vcpus",
                value: "5".to_string(),
                reason: Rejection::FailedValidation,
            })
        );
    }

    #[test]
    fn test_transform_on_both_paths() {
        assert_eq!(TRANSFORMED.extract(&WireMap::default()).unwrap(), 10);
        let m = map(&[("shares", WireValue::Number(7.0))]);
        assert_eq!(TRANSFORMED.extract(&m).unwrap(), 14);
    }

    #[test]
    fn test_type_mismatch() {
        let m = map(&[("description", WireValue::Number(1.0))]);
        assert!(matches!(
            OPTIONAL.extract(&m),
            Err(PropertyError::InvalidProperty {
                reason: Rejection::TypeMismatch { expected: "string", found: "number" },
                ..
            })
        ));
    }

    #[test]
    fn test_vec_from_sequence_and_string() {
        static TAGS: FieldSpec<Vec<String>> = FieldSpec::defaulted("tags", "");
        static IDS: FieldSpec<Vec<u16>> = FieldSpec::required("ids").grammar(Grammar::FLAG_LIST);

        assert!(TAGS.extract(&WireMap::default()).unwrap().is_empty());
        let m = map(&[("tags", "a,b".into())]);
        assert_eq!(TAGS.extract(&m).unwrap(), vec!["a", "b"]);

        let m = map(&[(
            "ids",
            WireValue::Sequence(vec![WireValue::Number(1.0), "2".into()]),
        )]);
        assert_eq!(IDS.extract(&m).unwrap(), vec![1, 2]);
        let m = map(&[("ids", "3;4".into())]);
        assert_eq!(IDS.extract(&m).unwrap(), vec![3, 4]);
    }

    #[test]
    fn test_token_list_field_reports_malformed_entry() {
        static OPTS: FieldSpec<TokenList> = FieldSpec::required("opts").grammar(Grammar::STRICT);
        let m = map(&[("opts", "a=1,b".into())]);
        assert!(matches!(
            OPTS.extract(&m),
            Err(PropertyError::InvalidProperty {
                name: "opts",
                reason: Rejection::Codec(CodecError::MalformedEntry { position: 1, .. }),
                ..
            })
        ));
    }

    #[test]
    fn test_extract_from_tokens() {
        let list = TokenList::parse("cores=2,bare", &Grammar::PROPERTY_STRING).unwrap();
        assert_eq!(REQUIRED.extract_from_tokens(&list).unwrap(), 2);
        assert_eq!(DEFAULTED.extract_from_tokens(&list).unwrap(), 3);
    }

    #[test]
    fn test_size_from_number_or_suffix() {
        static SIZE: FieldSpec<Size> = FieldSpec::required("size");
        let m = map(&[("size", WireValue::Number(1024.0))]);
        assert_eq!(SIZE.extract(&m).unwrap(), Size::from_bytes(1024));
        let m = map(&[("size", "8G".into())]);
        assert_eq!(SIZE.extract(&m).unwrap(), Size::from_gib(8));
    }
}
