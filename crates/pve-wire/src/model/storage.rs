//! Storage definitions.
//!
//! All backends share one property set; what differs per backend is which
//! properties apply and their defaults. The defaults live in
//! [`STORAGE_DEFAULTS`], so extraction and encoding are the same code for
//! every kind.

use lazy_static::lazy_static;

use crate::encode::{FormEncoder, ToForm};
use crate::error::{EncodeError, PropertyError};
use crate::schema::{DefaultTable, EmissionPolicy, FieldSpec, FromWireMap};
use crate::wire::{wire_enum, WireMap};

use EmissionPolicy::{NeverEmit, OmitIfZeroOrDefault};

wire_enum! {
    /// Storage backend.
    pub enum StorageKind as "storage type" {
        Dir => "dir",
        Lvm => "lvm",
        LvmThin => "lvmthin",
        Nfs => "nfs",
        Cifs => "cifs",
        ZfsPool => "zfspool",
        Rbd => "rbd",
        CephFs => "cephfs",
        Pbs => "pbs",
    }
}

wire_enum! {
    /// Kind of volume a storage may hold.
    pub enum ContentType as "content type" {
        Images => "images",
        Rootdir => "rootdir",
        Vztmpl => "vztmpl",
        Iso => "iso",
        Backup => "backup",
        Snippets => "snippets",
        Import => "import",
    }
}

lazy_static! {
    /// Per-backend defaults as wire tokens.
    pub static ref STORAGE_DEFAULTS: DefaultTable<StorageKind> = DefaultTable::from_rows(&[
        (StorageKind::Dir, "content", "images,rootdir"),
        (StorageKind::Lvm, "content", "images,rootdir"),
        (StorageKind::LvmThin, "content", "images,rootdir"),
        (StorageKind::Nfs, "content", "images"),
        (StorageKind::Cifs, "content", "images"),
        (StorageKind::ZfsPool, "content", "images,rootdir"),
        (StorageKind::Rbd, "content", "images"),
        (StorageKind::CephFs, "content", "vztmpl,iso,backup"),
        (StorageKind::Pbs, "content", "backup"),
        (StorageKind::Nfs, "shared", "1"),
        (StorageKind::Cifs, "shared", "1"),
        (StorageKind::Rbd, "shared", "1"),
        (StorageKind::CephFs, "shared", "1"),
        (StorageKind::Pbs, "shared", "1"),
        (StorageKind::ZfsPool, "sparse", "0"),
    ]);
}

/// One entry of the storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Storage {
    pub storage: String,
    pub kind: StorageKind,
    pub content: Vec<ContentType>,
    pub shared: bool,
    pub disable: bool,
    /// Nodes the storage is available on; empty means all.
    pub nodes: Vec<String>,
    pub path: Option<String>,
    pub server: Option<String>,
    pub export: Option<String>,
    pub options: Option<String>,
    pub vgname: Option<String>,
    pub thinpool: Option<String>,
    pub pool: Option<String>,
    pub sparse: bool,
    pub digest: Option<String>,
}

fn storage_id(v: &String) -> bool {
    let mut chars = v.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

static STORAGE: FieldSpec<String> = FieldSpec::required("storage").validate(storage_id);
static TYPE: FieldSpec<StorageKind> = FieldSpec::required("type");
static CONTENT: FieldSpec<Vec<ContentType>> =
    FieldSpec::defaulted("content", "").emit(OmitIfZeroOrDefault);
static SHARED: FieldSpec<bool> = FieldSpec::defaulted("shared", "0").emit(OmitIfZeroOrDefault);
static DISABLE: FieldSpec<bool> = FieldSpec::defaulted("disable", "0").emit(OmitIfZeroOrDefault);
static NODES: FieldSpec<Vec<String>> = FieldSpec::defaulted("nodes", "").emit(OmitIfZeroOrDefault);
static PATH: FieldSpec<Option<String>> = FieldSpec::optional("path").emit(OmitIfZeroOrDefault);
static SERVER: FieldSpec<Option<String>> = FieldSpec::optional("server").emit(OmitIfZeroOrDefault);
static EXPORT: FieldSpec<Option<String>> = FieldSpec::optional("export").emit(OmitIfZeroOrDefault);
static OPTIONS: FieldSpec<Option<String>> =
    FieldSpec::optional("options").emit(OmitIfZeroOrDefault);
static VGNAME: FieldSpec<Option<String>> = FieldSpec::optional("vgname").emit(OmitIfZeroOrDefault);
static THINPOOL: FieldSpec<Option<String>> =
    FieldSpec::optional("thinpool").emit(OmitIfZeroOrDefault);
static POOL: FieldSpec<Option<String>> = FieldSpec::optional("pool").emit(OmitIfZeroOrDefault);
static SPARSE: FieldSpec<bool> = FieldSpec::defaulted("sparse", "0").emit(OmitIfZeroOrDefault);
static DIGEST: FieldSpec<Option<String>> = FieldSpec::optional("digest").emit(NeverEmit);

impl Storage {
    /// A storage of `kind` with every backend default applied.
    pub fn new(storage: impl Into<String>, kind: StorageKind) -> Result<Self, PropertyError> {
        let storage: String = storage.into();
        let mut map = WireMap::default();
        map.insert("storage".to_string(), storage.into());
        map.insert("type".to_string(), kind.token().unwrap_or_default().into());
        Self::from_wire_map(&map)
    }

    /// Returns true if the storage may hold `content`.
    pub fn holds(&self, content: ContentType) -> bool {
        self.content.contains(&content)
    }

    /// Returns true if the storage is enabled on `node`.
    pub fn available_on(&self, node: &str) -> bool {
        !self.disable && (self.nodes.is_empty() || self.nodes.iter().any(|n| n == node))
    }
}

impl FromWireMap for Storage {
    fn from_wire_map(map: &WireMap) -> Result<Self, PropertyError> {
        let storage = STORAGE.extract(map)?;
        let kind = TYPE.extract(map)?;
        let defaults = &*STORAGE_DEFAULTS;
        Ok(Self {
            storage,
            kind,
            content: defaults.apply(kind, &CONTENT).extract(map)?,
            shared: defaults.apply(kind, &SHARED).extract(map)?,
            disable: DISABLE.extract(map)?,
            nodes: NODES.extract(map)?,
            path: PATH.extract(map)?,
            server: SERVER.extract(map)?,
            export: EXPORT.extract(map)?,
            options: OPTIONS.extract(map)?,
            vgname: VGNAME.extract(map)?,
            thinpool: THINPOOL.extract(map)?,
            pool: POOL.extract(map)?,
            sparse: defaults.apply(kind, &SPARSE).extract(map)?,
            digest: DIGEST.extract(map)?,
        })
    }
}

impl ToForm for Storage {
    fn encode_into(&self, encoder: &mut FormEncoder) -> Result<(), EncodeError> {
        let defaults = &*STORAGE_DEFAULTS;
        let kind = self.kind;
        // id and type are fixed once created
        if !encoder.is_update() {
            encoder.field(&STORAGE, &self.storage)?.field(&TYPE, &kind)?;
        }
        encoder
            .field(&defaults.apply(kind, &CONTENT), &self.content)?
            .field(&defaults.apply(kind, &SHARED), &self.shared)?
            .field(&DISABLE, &self.disable)?
            .field(&NODES, &self.nodes)?
            .field(&PATH, &self.path)?
            .field(&SERVER, &self.server)?
            .field(&EXPORT, &self.export)?
            .field(&OPTIONS, &self.options)?
            .field(&VGNAME, &self.vgname)?
            .field(&THINPOOL, &self.thinpool)?
            .field(&POOL, &self.pool)?
            .field(&defaults.apply(kind, &SPARSE), &self.sparse)?
            .field(&DIGEST, &self.digest)?;
        Ok(())
    }
}
