//! Corosync cluster membership.

use std::collections::BTreeMap;

use lazy_static::lazy_static;

use crate::encode::{FormEncoder, ToForm, TokenWriter};
use crate::error::{CodecError, EncodeError, PropertyError};
use crate::schema::{composite_wire, Composite, EmissionPolicy, FieldSpec, FromWireMap};
use crate::wire::{Grammar, TokenList, WireMap};

/// A `linkN` property: `10.0.0.1,priority=10`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterLink {
    pub address: String,
    pub priority: Option<u8>,
}

static ADDRESS: FieldSpec<String> = FieldSpec::required("address");
static PRIORITY: FieldSpec<Option<u8>> =
    FieldSpec::optional("priority").emit(EmissionPolicy::OmitIfZeroOrDefault);

impl Composite for ClusterLink {
    fn from_tokens(list: &TokenList) -> Result<Self, PropertyError> {
        let address = match list.first_bare() {
            Some(address) => address.to_string(),
            None => ADDRESS.extract_from_tokens(list)?,
        };
        Ok(Self {
            address,
            priority: PRIORITY.extract_from_tokens(list)?,
        })
    }

    fn to_tokens(&self) -> Result<TokenList, CodecError> {
        let mut writer = TokenWriter::new();
        writer
            .positional(self.address.as_str(), None)
            .field(&PRIORITY, &self.priority)?;
        Ok(writer.finish())
    }
}

composite_wire!(ClusterLink, Grammar::PROPERTY_STRING);

const LINK_SLOTS: [&str; 8] = ["link0", "link1", "link2", "link3", "link4", "link5", "link6", "link7"];

lazy_static! {
    static ref LINK_FIELDS: Vec<FieldSpec<Option<ClusterLink>>> =
        LINK_SLOTS.iter().map(|&slot| FieldSpec::optional(slot)).collect();
}

/// A node as listed in the cluster configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterNode {
    pub name: String,
    pub nodeid: Option<u32>,
    pub votes: u32,
    /// Keyed by link number.
    pub links: BTreeMap<u8, ClusterLink>,
}

fn positive(v: &Option<u32>) -> bool {
    *v != Some(0)
}

static NAME: FieldSpec<String> = FieldSpec::required("name");
static NODEID: FieldSpec<Option<u32>> = FieldSpec::optional("nodeid")
    .validate(positive)
    .emit(EmissionPolicy::OmitIfZeroOrDefault);
static VOTES: FieldSpec<u32> =
    FieldSpec::defaulted("votes", "1").emit(EmissionPolicy::OmitIfZeroOrDefault);

impl ClusterNode {
    /// Returns the address of the lowest-numbered link.
    pub fn primary_address(&self) -> Option<&str> {
        self.links.values().next().map(|link| link.address.as_str())
    }
}

impl FromWireMap for ClusterNode {
    fn from_wire_map(map: &WireMap) -> Result<Self, PropertyError> {
        let name = NAME.extract(map)?;
        let nodeid = NODEID.extract(map)?;
        let votes = VOTES.extract(map)?;
        let mut links = BTreeMap::new();
        for (number, spec) in (0u8..).zip(LINK_FIELDS.iter()) {
            if let Some(link) = spec.extract(map)? {
                links.insert(number, link);
            }
        }
        Ok(Self {
            name,
            nodeid,
            votes,
            links,
        })
    }
}

impl ToForm for ClusterNode {
    fn encode_into(&self, encoder: &mut FormEncoder) -> Result<(), EncodeError> {
        encoder
            .field(&NAME, &self.name)?
            .field(&NODEID, &self.nodeid)?
            .field(&VOTES, &self.votes)?;
        for (number, spec) in (0u8..).zip(LINK_FIELDS.iter()) {
            encoder.field(spec, &self.links.get(&number).cloned())?;
        }
        Ok(())
    }
}
