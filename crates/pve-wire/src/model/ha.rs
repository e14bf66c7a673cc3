//! High-availability groups.

use crate::encode::{FormEncoder, ToForm};
use crate::error::{CodecError, EncodeError, PropertyError};
use crate::schema::{composite_wire, reject, Composite, EmissionPolicy, FieldSpec, FromWireMap};
use crate::wire::{Entry, Grammar, TokenList, WireMap, WireScalar};

use EmissionPolicy::{NeverEmit, OmitIfZeroOrDefault};

/// A member node with an optional priority; higher runs first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePriority {
    pub node: String,
    pub priority: Option<u32>,
}

impl NodePriority {
    pub fn new(node: impl Into<String>, priority: Option<u32>) -> Self {
        Self {
            node: node.into(),
            priority,
        }
    }
}

/// The `nodes` property, `node1:2,node2:1,node3`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeList(pub Vec<NodePriority>);

impl NodeList {
    /// Returns the members sorted by descending priority, unprioritized last.
    pub fn by_priority(&self) -> Vec<&NodePriority> {
        let mut nodes: Vec<_> = self.0.iter().collect();
        nodes.sort_by_key(|n| std::cmp::Reverse(n.priority));
        nodes
    }

    pub fn contains(&self, node: &str) -> bool {
        self.0.iter().any(|n| n.node == node)
    }
}

impl Composite for NodeList {
    fn from_tokens(list: &TokenList) -> Result<Self, PropertyError> {
        list.iter()
            .map(|entry| -> Result<NodePriority, PropertyError> {
                let priority = match &entry.value {
                    Some(raw) => Some(u32::unmarshal(raw).map_err(|err| reject("nodes", raw, err))?),
                    None => None,
                };
                Ok(NodePriority::new(entry.key.as_str(), priority))
            })
            .collect::<Result<Vec<_>, PropertyError>>()
            .map(NodeList)
    }

    fn to_tokens(&self) -> Result<TokenList, CodecError> {
        self.0
            .iter()
            .map(|n| -> Result<Entry, CodecError> {
                Ok(match n.priority {
                    Some(p) => Entry::new(n.node.as_str(), p.marshal()?),
                    None => Entry::bare(n.node.as_str()),
                })
            })
            .collect()
    }
}

composite_wire!(NodeList, Grammar::NODE_PRIORITY);

/// An HA group: the nodes a resource may run on and how it fails over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HaGroup {
    pub group: String,
    pub nodes: NodeList,
    /// Resources may only run on listed nodes.
    pub restricted: bool,
    /// Do not move back to a higher-priority node once it recovers.
    pub nofailback: bool,
    pub comment: Option<String>,
    pub digest: Option<String>,
}

static GROUP: FieldSpec<String> = FieldSpec::required("group");
static NODES: FieldSpec<NodeList> = FieldSpec::required("nodes");
static RESTRICTED: FieldSpec<bool> =
    FieldSpec::defaulted("restricted", "0").emit(OmitIfZeroOrDefault);
static NOFAILBACK: FieldSpec<bool> =
    FieldSpec::defaulted("nofailback", "0").emit(OmitIfZeroOrDefault);
static COMMENT: FieldSpec<Option<String>> =
    FieldSpec::optional("comment").emit(OmitIfZeroOrDefault);
static DIGEST: FieldSpec<Option<String>> = FieldSpec::optional("digest").emit(NeverEmit);

impl FromWireMap for HaGroup {
    fn from_wire_map(map: &WireMap) -> Result<Self, PropertyError> {
        Ok(Self {
            group: GROUP.extract(map)?,
            nodes: NODES.extract(map)?,
            restricted: RESTRICTED.extract(map)?,
            nofailback: NOFAILBACK.extract(map)?,
            comment: COMMENT.extract(map)?,
            digest: DIGEST.extract(map)?,
        })
    }
}

impl ToForm for HaGroup {
    fn encode_into(&self, encoder: &mut FormEncoder) -> Result<(), EncodeError> {
        // the group id is part of the update URL, not the body
        if !encoder.is_update() {
            encoder.field(&GROUP, &self.group)?;
        }
        encoder
            .field(&NODES, &self.nodes)?
            .field(&RESTRICTED, &self.restricted)?
            .field(&NOFAILBACK, &self.nofailback)?
            .field(&COMMENT, &self.comment)?
            .field(&DIGEST, &self.digest)?;
        Ok(())
    }
}
