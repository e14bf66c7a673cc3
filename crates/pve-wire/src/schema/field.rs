//! Declarative field descriptions.

use std::fmt;

use crate::wire::Grammar;

/// What happens when a field is missing from the wire map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Missing is an error.
    Required,
    /// Missing yields the type's empty value (`None` for `Option<T>`).
    Optional,
    /// Missing yields this wire token, decoded like a present value.
    Default(&'static str),
}

/// How the form encoder treats a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmissionPolicy {
    /// Always sent when there is a value.
    #[default]
    Always,
    /// Left out when equal to the declared default, or zero when there is
    /// no default; on update the wire name goes into the `delete` list
    /// instead. An unset optional with a declared default fails to encode.
    OmitIfZeroOrDefault,
    /// Read-only on the wire; never sent nor deleted.
    NeverEmit,
}

/// Description of one domain field: wire name, presence, validation,
/// transform, sub-grammar and emission policy.
///
/// Specs are `const`-constructible and meant to live in `static` tables next
/// to the type they describe:
///
/// ```
/// use pve_wire::schema::{EmissionPolicy, FieldSpec};
///
/// fn at_least_one(v: &u32) -> bool {
///     *v >= 1
/// }
///
/// static CORES: FieldSpec<u32> = FieldSpec::defaulted("cores", "1")
///     .validate(at_least_one)
///     .emit(EmissionPolicy::OmitIfZeroOrDefault);
/// assert_eq!(CORES.name, "cores");
/// ```
pub struct FieldSpec<T> {
    pub name: &'static str,
    pub presence: Presence,
    pub validator: Option<fn(&T) -> bool>,
    pub transform: Option<fn(T) -> T>,
    /// Overrides the value type's own grammar for composite fields.
    pub grammar: Option<Grammar>,
    pub emit: EmissionPolicy,
}

impl<T> FieldSpec<T> {
    const fn with_presence(name: &'static str, presence: Presence) -> Self {
        Self {
            name,
            presence,
            validator: None,
            transform: None,
            grammar: None,
            emit: EmissionPolicy::Always,
        }
    }

    /// A field that must be present.
    pub const fn required(name: &'static str) -> Self {
        Self::with_presence(name, Presence::Required)
    }

    /// A field that falls back to `default` (a wire token) when missing.
    pub const fn defaulted(name: &'static str, default: &'static str) -> Self {
        Self::with_presence(name, Presence::Default(default))
    }

    /// Adds a validator run on present values.
    pub const fn validate(mut self, validator: fn(&T) -> bool) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Adds a transform applied to both present and defaulted values.
    pub const fn transform(mut self, transform: fn(T) -> T) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Sets the sub-grammar used to split a composite value.
    pub const fn grammar(mut self, grammar: Grammar) -> Self {
        self.grammar = Some(grammar);
        self
    }

    /// Sets the emission policy.
    pub const fn emit(mut self, emit: EmissionPolicy) -> Self {
        self.emit = emit;
        self
    }

    /// Returns the declared default token, if any.
    pub fn default_token(&self) -> Option<&'static str> {
        match self.presence {
            Presence::Default(token) => Some(token),
            _ => None,
        }
    }

    /// Returns a copy whose default is replaced by `default`, when given.
    ///
    /// Used with [`DefaultTable`](crate::schema::DefaultTable) lookups.
    pub fn or_default(self, default: Option<&'static str>) -> Self {
        match default {
            Some(token) => Self {
                presence: Presence::Default(token),
                ..self
            },
            None => self,
        }
    }
}

impl<T> FieldSpec<Option<T>> {
    /// A field that is `None` when missing.
    pub const fn optional(name: &'static str) -> Self {
        Self::with_presence(name, Presence::Optional)
    }
}

// Manual impls: every member is Copy regardless of T.
impl<T> Clone for FieldSpec<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FieldSpec<T> {}

impl<T> fmt::Debug for FieldSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("presence", &self.presence)
            .field("validator", &self.validator.is_some())
            .field("transform", &self.transform.is_some())
            .field("grammar", &self.grammar)
            .field("emit", &self.emit)
            .finish()
    }
}
