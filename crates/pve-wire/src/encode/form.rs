//! Struct-to-form encoding.
//!
//! Create and update calls differ in how they treat a field that holds its
//! zero or default value: create leaves it out, update names it in the
//! `delete` list so the server clears it. The caller picks the behavior with
//! an explicit [`Mode`].

use crate::error::{CodecError, EncodeError};
use crate::schema::{EmissionPolicy, FieldSpec, FromWire};
use crate::encode::scalar::ToWire;
use crate::wire::{wire_map_from_pairs, Entry, TokenList, WireMap};

/// Wire key carrying the comma-separated list of keys to clear.
pub const DELETE_KEY: &str = "delete";

/// Whether the form creates a resource or updates an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

impl Mode {
    /// Maps an `is_update` flag to a mode.
    pub fn from_update_flag(is_update: bool) -> Self {
        if is_update { Mode::Update } else { Mode::Create }
    }
}

/// Ordered key/value pairs plus the keys to delete.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Form {
    pairs: Vec<(String, String)>,
    delete: Vec<&'static str>,
}

impl Form {
    /// Returns the pairs in field declaration order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Returns the keys recorded for deletion.
    pub fn delete(&self) -> &[&'static str] {
        &self.delete
    }

    /// Returns the value sent for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if nothing would be sent.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty() && self.delete.is_empty()
    }

    /// Flattens to the pairs to send, with `delete=a,b` last when needed.
    pub fn into_pairs(self) -> Vec<(String, String)> {
        let mut pairs = self.pairs;
        if !self.delete.is_empty() {
            pairs.push((DELETE_KEY.to_string(), self.delete.join(",")));
        }
        pairs
    }

    /// Views the pairs (without `delete`) as a wire map, as the server
    /// would echo them back.
    pub fn to_wire_map(&self) -> WireMap {
        wire_map_from_pairs(self.pairs.iter().cloned())
    }
}

/// Outcome of applying a field's emission policy.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Emission {
    Emit(String),
    /// Zero or default under `OmitIfZeroOrDefault`.
    Omit,
    /// Nothing to say about this field.
    Skip,
}

fn decide<T: FromWire + ToWire>(spec: &FieldSpec<T>, value: &T) -> Result<Emission, CodecError> {
    let grammar = spec.grammar.unwrap_or(T::GRAMMAR);
    match spec.emit {
        EmissionPolicy::NeverEmit => Ok(Emission::Skip),
        EmissionPolicy::Always => Ok(value.to_wire(&grammar)?.map_or(Emission::Skip, Emission::Emit)),
        // With a declared default only the default is redundant; `backup=0`
        // must still be sent when the default is `1`.
        EmissionPolicy::OmitIfZeroOrDefault => match spec.default_token() {
            // An unset value cannot be sent, and leaving it out brings the
            // default back.
            Some(default) => match value.to_wire(&grammar)? {
                Some(wire) if wire != default => Ok(Emission::Emit(wire)),
                Some(_) => Ok(Emission::Omit),
                None => Err(CodecError::UnsetOverDefault { default }),
            },
            None if value.is_zero() => Ok(Emission::Omit),
            None => Ok(value.to_wire(&grammar)?.map_or(Emission::Omit, Emission::Emit)),
        },
    }
}

/// Builds a [`Form`] field by field.
#[derive(Debug)]
pub struct FormEncoder {
    mode: Mode,
    form: Form,
}

impl FormEncoder {
    /// Creates an encoder for the given mode.
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            form: Form::default(),
        }
    }

    /// Returns true when encoding an update.
    pub fn is_update(&self) -> bool {
        self.mode == Mode::Update
    }

    /// Applies `spec`'s emission policy to `value`.
    pub fn field<T: FromWire + ToWire>(
        &mut self,
        spec: &FieldSpec<T>,
        value: &T,
    ) -> Result<&mut Self, EncodeError> {
        let emission = decide(spec, value).map_err(|source| EncodeError::Marshal {
            name: spec.name,
            source,
        })?;
        match emission {
            Emission::Emit(wire) => self.form.pairs.push((spec.name.to_string(), wire)),
            Emission::Omit if self.is_update() => self.form.delete.push(spec.name),
            Emission::Omit | Emission::Skip => {}
        }
        Ok(self)
    }

    /// Appends a pair not described by a field spec.
    pub fn raw(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.form.pairs.push((key.into(), value.into()));
        self
    }

    /// Finishes encoding.
    pub fn finish(self) -> Form {
        self.form
    }
}

/// A record that can be sent as a form.
pub trait ToForm {
    /// Feeds every field to the encoder in declaration order.
    fn encode_into(&self, encoder: &mut FormEncoder) -> Result<(), EncodeError>;

    /// Encodes the record for `mode`.
    fn to_form(&self, mode: Mode) -> Result<Form, EncodeError> {
        let mut encoder = FormEncoder::new(mode);
        self.encode_into(&mut encoder)?;
        Ok(encoder.finish())
    }
}

/// Builds the token list of a composite record.
///
/// Omitted fields are simply left out; composites have no delete list.
#[derive(Debug, Default)]
pub struct TokenWriter {
    list: TokenList,
}

impl TokenWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional entry (`key` or `key=value`).
    pub fn positional(&mut self, key: impl Into<String>, value: Option<String>) -> &mut Self {
        self.list.push(Entry {
            key: key.into(),
            value,
        });
        self
    }

    /// Applies `spec`'s emission policy to `value`.
    pub fn field<T: FromWire + ToWire>(
        &mut self,
        spec: &FieldSpec<T>,
        value: &T,
    ) -> Result<&mut Self, CodecError> {
        if let Emission::Emit(wire) = decide(spec, value)? {
            self.list.push(Entry::new(spec.name, wire));
        }
        Ok(self)
    }

    /// Finishes the list.
    pub fn finish(self) -> TokenList {
        self.list
    }
}
