//! Token-list grammar: `key=value` entries packed into one wire string.
//!
//! The remote API encodes structured settings as a single scalar such as
//! `local-lvm:vm-100-disk-0,size=32G,cache=writeback`. A [`Grammar`] names the
//! separators; [`TokenList`] is the ordered, parsed form.

use std::fmt;

use crate::error::CodecError;
use crate::limits::{MAX_TOKEN_LIST_ENTRIES, MAX_WIRE_STRING_LEN};
use crate::wire::scalar::WireScalar;

/// Separators and bare-key policy for one token-list dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Grammar {
    /// Splits the scalar into entries.
    pub list_separator: char,
    /// Splits an entry into key and value (first occurrence only).
    pub entry_separator: char,
    /// Whether an entry without `entry_separator` is a bare key or an error.
    pub allow_bare_key: bool,
}

impl Grammar {
    /// `a,b=c`: the common property-string dialect.
    pub const PROPERTY_STRING: Grammar = Grammar::new(',', '=', true);

    /// `a=b,c=d`: every entry must carry a value.
    pub const STRICT: Grammar = Grammar::new(',', '=', false);

    /// `+aes;-pcid`: flag lists nested inside a single value.
    pub const FLAG_LIST: Grammar = Grammar::new(';', '=', true);

    /// `pve1:2,pve2`: node lists with optional priorities.
    pub const NODE_PRIORITY: Grammar = Grammar::new(',', ':', true);

    /// Creates a grammar.
    pub const fn new(list_separator: char, entry_separator: char, allow_bare_key: bool) -> Self {
        Self {
            list_separator,
            entry_separator,
            allow_bare_key,
        }
    }

    /// Returns the same grammar with a different list separator.
    pub const fn with_list_separator(mut self, sep: char) -> Self {
        self.list_separator = sep;
        self
    }

    /// Returns the same grammar with bare keys allowed or rejected.
    pub const fn with_bare_keys(mut self, allow: bool) -> Self {
        self.allow_bare_key = allow;
        self
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Grammar::PROPERTY_STRING
    }
}

/// One parsed `key[=value]` unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry {
    pub key: String,
    pub value: Option<String>,
}

impl Entry {
    /// Creates an entry with a value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// Creates an entry without a value.
    pub fn bare(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    /// Returns true if the entry carried a value.
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

/// Ordered sequence of entries.
///
/// Order is significant: the first bare entry of a disk or network string is
/// positional. Duplicate keys are kept as they appear.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenList {
    entries: Vec<Entry>,
}

impl TokenList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a wire string.
    ///
    /// The empty string is the empty list. Entries are split on the list
    /// separator, then each entry on the first entry separator only, so values
    /// may themselves contain it.
    pub fn parse(raw: &str, grammar: &Grammar) -> Result<Self, CodecError> {
        if raw.len() > MAX_WIRE_STRING_LEN {
            return Err(CodecError::LengthExceedsLimit {
                field: "token list",
                len: raw.len(),
                max: MAX_WIRE_STRING_LEN,
            });
        }
        if raw.is_empty() {
            return Ok(Self::new());
        }

        let mut entries = Vec::new();
        for (position, token) in raw.split(grammar.list_separator).enumerate() {
            if position >= MAX_TOKEN_LIST_ENTRIES {
                return Err(CodecError::LengthExceedsLimit {
                    field: "token list entries",
                    len: raw.split(grammar.list_separator).count(),
                    max: MAX_TOKEN_LIST_ENTRIES,
                });
            }
            entries.push(parse_entry(token, position, grammar)?);
        }
        Ok(Self { entries })
    }

    /// Renders the list back to its wire string.
    pub fn marshal(&self, grammar: &Grammar) -> String {
        let mut out = String::new();
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push(grammar.list_separator);
            }
            out.push_str(&entry.key);
            if let Some(value) = &entry.value {
                out.push(grammar.entry_separator);
                out.push_str(value);
            }
        }
        out
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in wire order.
    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// Returns the entries as a slice.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Returns the value of the first entry with this key.
    ///
    /// A bare key yields `None` here; use [`contains_key`](Self::contains_key)
    /// to test for presence.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .and_then(|e| e.value.as_deref())
    }

    /// Returns true if any entry has this key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    /// Returns the key of the first entry if it carries no value.
    pub fn first_bare(&self) -> Option<&str> {
        self.entries
            .first()
            .filter(|e| !e.has_value())
            .map(|e| e.key.as_str())
    }

    /// Parses the value for `key` as a scalar.
    pub fn get_parsed<T: WireScalar>(&self, key: &str) -> Result<Option<T>, CodecError> {
        self.get(key).map(T::unmarshal).transpose()
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Replaces the value of the first entry with this key, or appends one.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.value = Some(value),
            None => self.entries.push(Entry::new(key, value)),
        }
    }

    /// Removes every entry with this key, returning how many were removed.
    pub fn remove(&mut self, key: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.key != key);
        before - self.entries.len()
    }
}

impl FromIterator<Entry> for TokenList {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for TokenList {
    type Item = Entry;
    type IntoIter = std::vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a TokenList {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for TokenList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.marshal(&Grammar::PROPERTY_STRING))
    }
}

fn parse_entry(token: &str, position: usize, grammar: &Grammar) -> Result<Entry, CodecError> {
    let malformed = |reason| CodecError::MalformedEntry {
        raw: token.to_string(),
        position,
        reason,
    };

    match token.split_once(grammar.entry_separator) {
        Some(("", _)) => Err(malformed("empty key")),
        Some((key, value)) => Ok(Entry::new(key, value)),
        None if token.is_empty() => Err(malformed("empty entry")),
        None if grammar.allow_bare_key => Ok(Entry::bare(token)),
        None => Err(malformed("missing value")),
    }
}

/// A `+name`/`-name` switch inside a flag list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Flag {
    pub name: String,
    pub enabled: bool,
}

impl Flag {
    /// Creates an enabled flag.
    pub fn on(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
        }
    }

    /// Creates a disabled flag.
    pub fn off(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: false,
        }
    }
}

/// Parses a nested flag list such as `+aes;-pcid`.
///
/// This is a second [`TokenList`] under [`Grammar::FLAG_LIST`]; each bare key
/// must start with `+` or `-`.
pub fn parse_flags(raw: &str) -> Result<Vec<Flag>, CodecError> {
    let list = TokenList::parse(raw, &Grammar::FLAG_LIST)?;
    list.iter()
        .enumerate()
        .map(|(position, entry)| {
            let malformed = |reason| CodecError::MalformedEntry {
                raw: entry.key.clone(),
                position,
                reason,
            };
            if entry.has_value() {
                return Err(malformed("flag cannot carry a value"));
            }
            match entry.key.split_at_checked(1) {
                Some(("+", name)) if !name.is_empty() => Ok(Flag::on(name)),
                Some(("-", name)) if !name.is_empty() => Ok(Flag::off(name)),
                _ => Err(malformed("flag must start with '+' or '-'")),
            }
        })
        .collect()
}

/// Renders a flag list back to its wire string.
pub fn marshal_flags(flags: &[Flag]) -> String {
    flags
        .iter()
        .map(|f| Entry::bare(format!("{}{}", if f.enabled { '+' } else { '-' }, f.name)))
        .collect::<TokenList>()
        .marshal(&Grammar::FLAG_LIST)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_disk_string() {
        let list = TokenList::parse(
            "local-lvm:vm-100-disk-0,size=32G,cache=writeback",
            &Grammar::PROPERTY_STRING,
        )
        .unwrap();

        assert_eq!(
            list.entries(),
            &[
                Entry::bare("local-lvm:vm-100-disk-0"),
                Entry::new("size", "32G"),
                Entry::new("cache", "writeback"),
            ]
        );
        assert_eq!(list.first_bare(), Some("local-lvm:vm-100-disk-0"));
        assert_eq!(list.get("size"), Some("32G"));
    }

    #[test]
    fn test_split_on_first_separator_only() {
        let list = TokenList::parse("virtio=BC:24:11:2A:3B:4C,bridge=vmbr0,tag=a=b", &Grammar::STRICT)
            .unwrap();
        assert_eq!(list.get("virtio"), Some("BC:24:11:2A:3B:4C"));
        assert_eq!(list.get("tag"), Some("a=b"));

        let nodes = TokenList::parse("pve1:2,pve2", &Grammar::NODE_PRIORITY).unwrap();
        assert_eq!(nodes.entries(), &[Entry::new("pve1", "2"), Entry::bare("pve2")]);
    }

    #[test]
    fn test_bare_key_rejected_when_disallowed() {
        let err = TokenList::parse("size=32G,discard", &Grammar::STRICT).unwrap_err();
        assert_eq!(
            err,
            CodecError::MalformedEntry {
                raw: "discard".to_string(),
                position: 1,
                reason: "missing value",
            }
        );
    }

    #[test]
    fn test_empty_entries_rejected() {
        assert!(matches!(
            TokenList::parse("a=1,,b=2", &Grammar::PROPERTY_STRING),
            Err(CodecError::MalformedEntry { position: 1, .. })
        ));
        assert!(matches!(
            TokenList::parse("=1", &Grammar::PROPERTY_STRING),
            Err(CodecError::MalformedEntry { position: 0, reason: "empty key", .. })
        ));
        assert!(TokenList::parse("", &Grammar::STRICT).unwrap().is_empty());
    }

    #[test]
    fn test_empty_value_is_kept() {
        let list = TokenList::parse("comment=", &Grammar::STRICT).unwrap();
        assert_eq!(list.entries(), &[Entry::new("comment", "")]);
        assert_eq!(list.marshal(&Grammar::STRICT), "comment=");
    }

    #[test]
    fn test_entry_limit() {
        let raw = vec!["a"; MAX_TOKEN_LIST_ENTRIES + 1].join(",");
        assert!(matches!(
            TokenList::parse(&raw, &Grammar::PROPERTY_STRING),
            Err(CodecError::LengthExceedsLimit { .. })
        ));
    }

    #[test]
    fn test_duplicates_and_order_preserved() {
        let raw = "b=1,a,b=2";
        let list = TokenList::parse(raw, &Grammar::PROPERTY_STRING).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.get("b"), Some("1"));
        assert_eq!(list.marshal(&Grammar::PROPERTY_STRING), raw);
    }

    #[test]
    fn test_set_and_remove() {
        let mut list = TokenList::parse("a=1,b=2", &Grammar::STRICT).unwrap();
        list.set("a", "9");
        list.set("c", "3");
        assert_eq!(list.marshal(&Grammar::STRICT), "a=9,b=2,c=3");
        assert_eq!(list.remove("b"), 1);
        assert_eq!(list.marshal(&Grammar::STRICT), "a=9,c=3");
    }

    #[test]
    fn test_get_parsed() {
        let list = TokenList::parse("tag=10,firewall=x", &Grammar::STRICT).unwrap();
        assert_eq!(list.get_parsed::<u16>("tag").unwrap(), Some(10));
        assert_eq!(list.get_parsed::<u16>("mtu").unwrap(), None);
        assert!(list.get_parsed::<bool>("firewall").is_err());
    }

    #[test]
    fn test_nested_flags() {
        let list = TokenList::parse("cputype=host,flags=+aes;-pcid", &Grammar::PROPERTY_STRING).unwrap();
        let flags = parse_flags(list.get("flags").unwrap()).unwrap();
        assert_eq!(flags, vec![Flag::on("aes"), Flag::off("pcid")]);
        assert_eq!(marshal_flags(&flags), "+aes;-pcid");

        assert!(matches!(
            parse_flags("+aes;pcid"),
            Err(CodecError::MalformedEntry { position: 1, .. })
        ));
        assert!(parse_flags("+").is_err());
    }

    fn entry_strategy(
        key: &'static str,
        value: &'static str,
        bare: bool,
    ) -> impl Strategy<Value = Entry> {
        let value = if bare {
            proptest::option::of(value).boxed()
        } else {
            value.prop_map(Some).boxed()
        };
        (key, value).prop_map(|(key, value)| Entry { key, value })
    }

    fn assert_roundtrip(entries: Vec<Entry>, grammar: &Grammar) -> Result<(), TestCaseError> {
        let list: TokenList = entries.into_iter().collect();
        let raw = list.marshal(grammar);
        let parsed = TokenList::parse(&raw, grammar).unwrap();
        prop_assert_eq!(&parsed, &list);
        prop_assert_eq!(parsed.marshal(grammar), raw);
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_token_list_roundtrip(entries in proptest::collection::vec(
            entry_strategy("[a-z0-9_.:-]{1,12}", "[a-zA-Z0-9_.:/+=-]{0,12}", true),
            0..16,
        )) {
            assert_roundtrip(entries, &Grammar::PROPERTY_STRING)?;
        }

        #[test]
        fn prop_strict_roundtrip(entries in proptest::collection::vec(
            entry_strategy("[a-z0-9_.:-]{1,12}", "[a-zA-Z0-9_.:/+=-]{0,12}", false),
            0..16,
        )) {
            assert_roundtrip(entries, &Grammar::STRICT)?;
        }

        #[test]
        fn prop_node_priority_roundtrip(entries in proptest::collection::vec(
            entry_strategy("[a-z0-9_.-]{1,12}", "[0-9a-z:]{0,6}", true),
            0..16,
        )) {
            assert_roundtrip(entries, &Grammar::NODE_PRIORITY)?;
        }

        #[test]
        fn prop_flag_list_roundtrip(entries in proptest::collection::vec(
            entry_strategy("[+-]?[a-z0-9_.-]{1,12}", "[a-zA-Z0-9_.:,/+=-]{0,12}", true),
            0..16,
        )) {
            assert_roundtrip(entries, &Grammar::FLAG_LIST)?;
        }
    }
}
