//! Firewall rules.

use crate::encode::{FormEncoder, ToForm};
use crate::error::{EncodeError, PropertyError};
use crate::schema::{EmissionPolicy, FieldSpec, FromWireMap};
use crate::wire::{wire_enum, WireMap};

use EmissionPolicy::{NeverEmit, OmitIfZeroOrDefault};

wire_enum! {
    /// Traffic direction, or a security group reference.
    pub enum RuleType as "rule type" {
        In => "in",
        Out => "out",
        Group => "group",
    }
}

wire_enum! {
    /// Syslog level for matched packets.
    pub enum LogLevel as "log level" {
        Emerg => "emerg",
        Alert => "alert",
        Crit => "crit",
        Err => "err",
        Warning => "warning",
        Notice => "notice",
        Info => "info",
        Debug => "debug",
        Nolog => "nolog",
    }
}

/// One rule of a cluster, node or guest firewall.
///
/// `action` is `ACCEPT`, `DROP`, `REJECT`, or a security group name when
/// `rule_type` is [`RuleType::Group`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallRule {
    /// Position in the rule list; assigned by the server.
    pub pos: Option<u32>,
    pub rule_type: RuleType,
    pub action: String,
    pub enable: bool,
    pub macro_name: Option<String>,
    pub source: Option<String>,
    pub dest: Option<String>,
    pub proto: Option<String>,
    pub dport: Option<String>,
    pub sport: Option<String>,
    pub iface: Option<String>,
    pub log: Option<LogLevel>,
    pub comment: Option<String>,
    pub ipversion: Option<u8>,
    pub digest: Option<String>,
}

fn not_empty(v: &String) -> bool {
    !v.is_empty()
}

fn trimmed(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string())
}

static POS: FieldSpec<Option<u32>> = FieldSpec::optional("pos").emit(NeverEmit);
static TYPE: FieldSpec<RuleType> = FieldSpec::required("type");
static ACTION: FieldSpec<String> = FieldSpec::required("action").validate(not_empty);
static ENABLE: FieldSpec<bool> = FieldSpec::defaulted("enable", "0").emit(OmitIfZeroOrDefault);
static MACRO: FieldSpec<Option<String>> = FieldSpec::optional("macro").emit(OmitIfZeroOrDefault);
static SOURCE: FieldSpec<Option<String>> = FieldSpec::optional("source").emit(OmitIfZeroOrDefault);
static DEST: FieldSpec<Option<String>> = FieldSpec::optional("dest").emit(OmitIfZeroOrDefault);
static PROTO: FieldSpec<Option<String>> = FieldSpec::optional("proto").emit(OmitIfZeroOrDefault);
static DPORT: FieldSpec<Option<String>> = FieldSpec::optional("dport").emit(OmitIfZeroOrDefault);
static SPORT: FieldSpec<Option<String>> = FieldSpec::optional("sport").emit(OmitIfZeroOrDefault);
static IFACE: FieldSpec<Option<String>> = FieldSpec::optional("iface").emit(OmitIfZeroOrDefault);
static LOG: FieldSpec<Option<LogLevel>> = FieldSpec::optional("log").emit(OmitIfZeroOrDefault);
static COMMENT: FieldSpec<Option<String>> = FieldSpec::optional("comment")
    .transform(trimmed)
    .emit(OmitIfZeroOrDefault);
static IPVERSION: FieldSpec<Option<u8>> = FieldSpec::optional("ipversion").emit(NeverEmit);
static DIGEST: FieldSpec<Option<String>> = FieldSpec::optional("digest").emit(NeverEmit);

impl FirewallRule {
    /// A disabled rule with only direction and action set.
    pub fn new(rule_type: RuleType, action: impl Into<String>) -> Self {
        Self {
            pos: None,
            rule_type,
            action: action.into(),
            enable: false,
            macro_name: None,
            source: None,
            dest: None,
            proto: None,
            dport: None,
            sport: None,
            iface: None,
            log: None,
            comment: None,
            ipversion: None,
            digest: None,
        }
    }

    /// Returns true if the rule jumps to a security group.
    pub fn is_group(&self) -> bool {
        self.rule_type == RuleType::Group
    }
}

impl FromWireMap for FirewallRule {
    fn from_wire_map(map: &WireMap) -> Result<Self, PropertyError> {
        Ok(Self {
            pos: POS.extract(map)?,
            rule_type: TYPE.extract(map)?,
            action: ACTION.extract(map)?,
            enable: ENABLE.extract(map)?,
            macro_name: MACRO.extract(map)?,
            source: SOURCE.extract(map)?,
            dest: DEST.extract(map)?,
            proto: PROTO.extract(map)?,
            dport: DPORT.extract(map)?,
            sport: SPORT.extract(map)?,
            iface: IFACE.extract(map)?,
            log: LOG.extract(map)?,
            comment: COMMENT.extract(map)?,
            ipversion: IPVERSION.extract(map)?,
            digest: DIGEST.extract(map)?,
        })
    }
}

impl ToForm for FirewallRule {
    fn encode_into(&self, encoder: &mut FormEncoder) -> Result<(), EncodeError> {
        encoder
            .field(&POS, &self.pos)?
            .field(&TYPE, &self.rule_type)?
            .field(&ACTION, &self.action)?
            .field(&ENABLE, &self.enable)?
            .field(&MACRO, &self.macro_name)?
            .field(&SOURCE, &self.source)?
            .field(&DEST, &self.dest)?
            .field(&PROTO, &self.proto)?
            .field(&DPORT, &self.dport)?
            .field(&SPORT, &self.sport)?
            .field(&IFACE, &self.iface)?
            .field(&LOG, &self.log)?
            .field(&COMMENT, &self.comment)?
            .field(&IPVERSION, &self.ipversion)?
            .field(&DIGEST, &self.digest)?;
        Ok(())
    }
}
