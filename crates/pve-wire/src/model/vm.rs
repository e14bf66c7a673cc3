//! Virtual machine configuration properties.
//!
//! CPU, memory, network interfaces and disks as the guest config endpoint
//! reports them. NICs and disks are property strings:
//!
//! ```text
//! net0:  virtio=BC:24:11:2A:3B:4C,bridge=vmbr0,firewall=1,tag=10
//! scsi0: local-lvm:vm-100-disk-0,size=32G,cache=writeback
//! cpu:   host,flags=+aes;-pcid
//! ```

use std::collections::BTreeMap;

use lazy_static::lazy_static;

use crate::encode::{FormEncoder, ToForm, TokenWriter};
use crate::error::{CodecError, EncodeError, PropertyError};
use crate::schema::{composite_wire, reject, Composite, EmissionPolicy, FieldSpec, FromWireMap};
use crate::wire::{marshal_flags, parse_flags, wire_enum, Flag, Grammar, Size, TokenList, WireMap, WireScalar};

use EmissionPolicy::{NeverEmit, OmitIfZeroOrDefault};

wire_enum! {
    /// Emulated network card.
    pub enum NicModel as "network model" {
        Virtio => "virtio",
        E1000 => "e1000",
        E1000e => "e1000e",
        Rtl8139 => "rtl8139",
        Vmxnet3 => "vmxnet3",
    }
}

wire_enum! {
    /// Host page cache mode for a disk.
    pub enum CacheMode as "cache mode" {
        None => "none",
        WriteBack => "writeback",
        WriteThrough => "writethrough",
        DirectSync => "directsync",
        Unsafe => "unsafe",
    }
}

wire_enum! {
    /// Whether discard requests are passed to the storage.
    pub enum Discard as "discard mode" {
        On => "on",
        Ignore => "ignore",
    }
}

wire_enum! {
    pub enum Media as "media" {
        Disk => "disk",
        Cdrom => "cdrom",
    }
}

wire_enum! {
    pub enum DiskFormat as "disk format" {
        Raw => "raw",
        Qcow2 => "qcow2",
        Vmdk => "vmdk",
    }
}

fn at_least_one(v: &u32) -> bool {
    *v >= 1
}

// =============================================================================
// CPU
// =============================================================================

/// The `cpu` property: model name plus optional flag switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuType {
    pub cputype: String,
    pub flags: Vec<Flag>,
    pub hidden: bool,
}

static CPUTYPE: FieldSpec<String> = FieldSpec::required("cputype");
static HIDDEN: FieldSpec<bool> = FieldSpec::defaulted("hidden", "0").emit(OmitIfZeroOrDefault);

impl CpuType {
    /// A CPU model with no flags.
    pub fn new(cputype: impl Into<String>) -> Self {
        Self {
            cputype: cputype.into(),
            flags: Vec::new(),
            hidden: false,
        }
    }
}

impl Composite for CpuType {
    fn from_tokens(list: &TokenList) -> Result<Self, PropertyError> {
        let cputype = match list.first_bare() {
            Some(name) => name.to_string(),
            None => CPUTYPE.extract_from_tokens(list)?,
        };
        let flags = match list.get("flags") {
            Some(raw) => parse_flags(raw).map_err(|err| reject("flags", raw, err))?,
            None => Vec::new(),
        };
        Ok(Self {
            cputype,
            flags,
            hidden: HIDDEN.extract_from_tokens(list)?,
        })
    }

    fn to_tokens(&self) -> Result<TokenList, CodecError> {
        let mut writer = TokenWriter::new();
        writer.positional(self.cputype.as_str(), None);
        if !self.flags.is_empty() {
            writer.positional("flags", Some(marshal_flags(&self.flags)));
        }
        writer.field(&HIDDEN, &self.hidden)?;
        Ok(writer.finish())
    }
}

composite_wire!(CpuType, Grammar::PROPERTY_STRING);

/// Processor topology and scheduling settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuConfig {
    pub cores: u32,
    pub sockets: u32,
    pub vcpus: Option<u32>,
    pub cpu: Option<CpuType>,
    pub cpulimit: f64,
    pub cpuunits: Option<u32>,
    pub numa: bool,
}

fn cpulimit_in_range(v: &f64) -> bool {
    (0.0..=128.0).contains(v)
}

fn cpuunits_in_range(v: &Option<u32>) -> bool {
    v.is_none_or(|units| (1..=262_144).contains(&units))
}

static CORES: FieldSpec<u32> = FieldSpec::defaulted("cores", "1")
    .validate(at_least_one)
    .emit(OmitIfZeroOrDefault);
static SOCKETS: FieldSpec<u32> = FieldSpec::defaulted("sockets", "1")
    .validate(at_least_one)
    .emit(OmitIfZeroOrDefault);
static VCPUS: FieldSpec<Option<u32>> = FieldSpec::optional("vcpus").emit(OmitIfZeroOrDefault);
static CPU: FieldSpec<Option<CpuType>> = FieldSpec::optional("cpu").emit(OmitIfZeroOrDefault);
static CPULIMIT: FieldSpec<f64> = FieldSpec::defaulted("cpulimit", "0")
    .validate(cpulimit_in_range)
    .emit(OmitIfZeroOrDefault);
static CPUUNITS: FieldSpec<Option<u32>> = FieldSpec::optional("cpuunits")
    .validate(cpuunits_in_range)
    .emit(OmitIfZeroOrDefault);
static NUMA: FieldSpec<bool> = FieldSpec::defaulted("numa", "0").emit(OmitIfZeroOrDefault);

impl CpuConfig {
    /// Total virtual CPUs the guest sees unless `vcpus` hot-plugs fewer.
    ///
    /// Widened so that any accepted topology has a product.
    pub fn max_vcpus(&self) -> u64 {
        u64::from(self.cores) * u64::from(self.sockets)
    }
}

impl FromWireMap for CpuConfig {
    fn from_wire_map(map: &WireMap) -> Result<Self, PropertyError> {
        Ok(Self {
            cores: CORES.extract(map)?,
            sockets: SOCKETS.extract(map)?,
            vcpus: VCPUS.extract(map)?,
            cpu: CPU.extract(map)?,
            cpulimit: CPULIMIT.extract(map)?,
            cpuunits: CPUUNITS.extract(map)?,
            numa: NUMA.extract(map)?,
        })
    }
}

impl ToForm for CpuConfig {
    fn encode_into(&self, encoder: &mut FormEncoder) -> Result<(), EncodeError> {
        encoder
            .field(&CORES, &self.cores)?
            .field(&SOCKETS, &self.sockets)?
            .field(&VCPUS, &self.vcpus)?
            .field(&CPU, &self.cpu)?
            .field(&CPULIMIT, &self.cpulimit)?
            .field(&CPUUNITS, &self.cpuunits)?
            .field(&NUMA, &self.numa)?;
        Ok(())
    }
}

// =============================================================================
// MEMORY
// =============================================================================

/// Memory size and ballooning, all in MiB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryConfig {
    pub memory: u64,
    /// Balloon target; `Some(0)` disables the balloon device.
    pub balloon: Option<u64>,
    pub shares: Option<u32>,
}

fn memory_at_least_16(v: &u64) -> bool {
    *v >= 16
}

fn shares_in_range(v: &Option<u32>) -> bool {
    v.is_none_or(|shares| shares <= 50_000)
}

static MEMORY: FieldSpec<u64> = FieldSpec::defaulted("memory", "512")
    .validate(memory_at_least_16)
    .emit(OmitIfZeroOrDefault);
static BALLOON: FieldSpec<Option<u64>> = FieldSpec::optional("balloon").emit(OmitIfZeroOrDefault);
static SHARES: FieldSpec<Option<u32>> = FieldSpec::optional("shares")
    .validate(shares_in_range)
    .emit(OmitIfZeroOrDefault);

impl MemoryConfig {
    /// Returns true if a balloon device is configured.
    pub fn ballooning(&self) -> bool {
        self.balloon != Some(0)
    }
}

impl FromWireMap for MemoryConfig {
    fn from_wire_map(map: &WireMap) -> Result<Self, PropertyError> {
        Ok(Self {
            memory: MEMORY.extract(map)?,
            balloon: BALLOON.extract(map)?,
            shares: SHARES.extract(map)?,
        })
    }
}

impl ToForm for MemoryConfig {
    fn encode_into(&self, encoder: &mut FormEncoder) -> Result<(), EncodeError> {
        encoder
            .field(&MEMORY, &self.memory)?
            .field(&BALLOON, &self.balloon)?
            .field(&SHARES, &self.shares)?;
        Ok(())
    }
}

// =============================================================================
// NETWORK
// =============================================================================

/// A `netN` property.
///
/// The first entry is usually `model=mac`; `model=virtio` appears when no
/// MAC address is set.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkInterface {
    pub model: NicModel,
    pub macaddr: Option<String>,
    pub bridge: Option<String>,
    pub firewall: bool,
    pub link_down: bool,
    pub tag: Option<u16>,
    pub mtu: Option<u16>,
    pub rate: Option<f64>,
    pub queues: Option<u8>,
}

fn vlan_tag(v: &Option<u16>) -> bool {
    v.is_none_or(|tag| (1..=4094).contains(&tag))
}

fn queue_count(v: &Option<u8>) -> bool {
    v.is_none_or(|q| q <= 64)
}

static MODEL: FieldSpec<NicModel> = FieldSpec::required("model");
static MACADDR: FieldSpec<Option<String>> = FieldSpec::optional("macaddr");
static BRIDGE: FieldSpec<Option<String>> = FieldSpec::optional("bridge").emit(OmitIfZeroOrDefault);
static FIREWALL: FieldSpec<bool> = FieldSpec::defaulted("firewall", "0").emit(OmitIfZeroOrDefault);
static LINK_DOWN: FieldSpec<bool> = FieldSpec::defaulted("link_down", "0").emit(OmitIfZeroOrDefault);
static TAG: FieldSpec<Option<u16>> = FieldSpec::optional("tag")
    .validate(vlan_tag)
    .emit(OmitIfZeroOrDefault);
static MTU: FieldSpec<Option<u16>> = FieldSpec::optional("mtu").emit(OmitIfZeroOrDefault);
static RATE: FieldSpec<Option<f64>> = FieldSpec::optional("rate").emit(OmitIfZeroOrDefault);
static QUEUES: FieldSpec<Option<u8>> = FieldSpec::optional("queues")
    .validate(queue_count)
    .emit(OmitIfZeroOrDefault);

impl NetworkInterface {
    /// A NIC of `model` on `bridge`, everything else default.
    pub fn new(model: NicModel, bridge: impl Into<String>) -> Self {
        Self {
            model,
            macaddr: None,
            bridge: Some(bridge.into()),
            firewall: false,
            link_down: false,
            tag: None,
            mtu: None,
            rate: None,
            queues: None,
        }
    }
}

impl Composite for NetworkInterface {
    fn from_tokens(list: &TokenList) -> Result<Self, PropertyError> {
        let positional = list
            .entries()
            .first()
            .and_then(|e| NicModel::unmarshal(&e.key).ok().map(|model| (model, e.value.clone())));
        let (model, macaddr) = match positional {
            Some(pair) => pair,
            None => (MODEL.extract_from_tokens(list)?, MACADDR.extract_from_tokens(list)?),
        };

        Ok(Self {
            model,
            macaddr,
            bridge: BRIDGE.extract_from_tokens(list)?,
            firewall: FIREWALL.extract_from_tokens(list)?,
            link_down: LINK_DOWN.extract_from_tokens(list)?,
            tag: TAG.extract_from_tokens(list)?,
            mtu: MTU.extract_from_tokens(list)?,
            rate: RATE.extract_from_tokens(list)?,
            queues: QUEUES.extract_from_tokens(list)?,
        })
    }

    fn to_tokens(&self) -> Result<TokenList, CodecError> {
        let model = self.model.marshal()?;
        let mut writer = TokenWriter::new();
        match &self.macaddr {
            Some(mac) => writer.positional(model, Some(mac.clone())),
            None => writer.positional(MODEL.name, Some(model)),
        };
        writer
            .field(&BRIDGE, &self.bridge)?
            .field(&FIREWALL, &self.firewall)?
            .field(&LINK_DOWN, &self.link_down)?
            .field(&TAG, &self.tag)?
            .field(&MTU, &self.mtu)?
            .field(&RATE, &self.rate)?
            .field(&QUEUES, &self.queues)?;
        Ok(writer.finish())
    }
}

composite_wire!(NetworkInterface, Grammar::STRICT);

// =============================================================================
// DISK
// =============================================================================

/// A disk property (`scsiN`, `virtioN`, `sataN`, `ideN`).
///
/// The first bare entry is the volume, `storage:volume-name`, or `none` for
/// an empty CD-ROM drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disk {
    pub volume: String,
    pub size: Option<Size>,
    pub cache: Option<CacheMode>,
    pub discard: Option<Discard>,
    pub ssd: bool,
    pub iothread: bool,
    pub backup: bool,
    pub media: Option<Media>,
    pub format: Option<DiskFormat>,
}

static FILE: FieldSpec<String> = FieldSpec::required("file");
static SIZE: FieldSpec<Option<Size>> = FieldSpec::optional("size").emit(OmitIfZeroOrDefault);
static CACHE: FieldSpec<Option<CacheMode>> = FieldSpec::optional("cache").emit(OmitIfZeroOrDefault);
static DISCARD: FieldSpec<Option<Discard>> =
    FieldSpec::optional("discard").emit(OmitIfZeroOrDefault);
static SSD: FieldSpec<bool> = FieldSpec::defaulted("ssd", "0").emit(OmitIfZeroOrDefault);
static IOTHREAD: FieldSpec<bool> = FieldSpec::defaulted("iothread", "0").emit(OmitIfZeroOrDefault);
static BACKUP: FieldSpec<bool> = FieldSpec::defaulted("backup", "1").emit(OmitIfZeroOrDefault);
static MEDIA: FieldSpec<Option<Media>> = FieldSpec::optional("media").emit(OmitIfZeroOrDefault);
static FORMAT: FieldSpec<Option<DiskFormat>> =
    FieldSpec::optional("format").emit(OmitIfZeroOrDefault);

impl Disk {
    /// A disk on `volume` with default options.
    pub fn new(volume: impl Into<String>) -> Self {
        Self {
            volume: volume.into(),
            size: None,
            cache: None,
            discard: None,
            ssd: false,
            iothread: false,
            backup: true,
            media: None,
            format: None,
        }
    }

    /// Returns the storage part of `storage:volume-name`.
    pub fn storage(&self) -> Option<&str> {
        self.volume.split_once(':').map(|(storage, _)| storage)
    }

    /// Returns the volume name without the storage prefix.
    pub fn volume_name(&self) -> &str {
        self.volume
            .split_once(':')
            .map_or(self.volume.as_str(), |(_, name)| name)
    }

    /// Returns true for CD-ROM drives.
    pub fn is_cdrom(&self) -> bool {
        self.media == Some(Media::Cdrom)
    }
}

impl Composite for Disk {
    fn from_tokens(list: &TokenList) -> Result<Self, PropertyError> {
        let volume = match list.first_bare() {
            Some(volume) => volume.to_string(),
            None => FILE.extract_from_tokens(list)?,
        };
        Ok(Self {
            volume,
            size: SIZE.extract_from_tokens(list)?,
            cache: CACHE.extract_from_tokens(list)?,
            discard: DISCARD.extract_from_tokens(list)?,
            ssd: SSD.extract_from_tokens(list)?,
            iothread: IOTHREAD.extract_from_tokens(list)?,
            backup: BACKUP.extract_from_tokens(list)?,
            media: MEDIA.extract_from_tokens(list)?,
            format: FORMAT.extract_from_tokens(list)?,
        })
    }

    fn to_tokens(&self) -> Result<TokenList, CodecError> {
        let mut writer = TokenWriter::new();
        writer
            .positional(self.volume.as_str(), None)
            .field(&SIZE, &self.size)?
            .field(&CACHE, &self.cache)?
            .field(&DISCARD, &self.discard)?
            .field(&SSD, &self.ssd)?
            .field(&IOTHREAD, &self.iothread)?
            .field(&BACKUP, &self.backup)?
            .field(&MEDIA, &self.media)?
            .field(&FORMAT, &self.format)?;
        Ok(writer.finish())
    }
}

composite_wire!(Disk, Grammar::PROPERTY_STRING);

// =============================================================================
// GUEST CONFIG
// =============================================================================

const NET_SLOTS: [&str; 8] = ["net0", "net1", "net2", "net3", "net4", "net5", "net6", "net7"];

const DISK_SLOTS: [&str; 26] = [
    "ide0", "ide1", "ide2", "ide3", "sata0", "sata1", "sata2", "sata3", "sata4", "sata5", "scsi0",
    "scsi1", "scsi2", "scsi3", "scsi4", "scsi5", "scsi6", "scsi7", "virtio0", "virtio1", "virtio2",
    "virtio3", "virtio4", "virtio5", "virtio6", "virtio7",
];

lazy_static! {
    static ref NET_FIELDS: Vec<FieldSpec<Option<NetworkInterface>>> =
        NET_SLOTS.iter().map(|&slot| FieldSpec::optional(slot)).collect();
    static ref DISK_FIELDS: Vec<FieldSpec<Option<Disk>>> =
        DISK_SLOTS.iter().map(|&slot| FieldSpec::optional(slot)).collect();
}

static NAME: FieldSpec<Option<String>> = FieldSpec::optional("name").emit(OmitIfZeroOrDefault);
static ONBOOT: FieldSpec<bool> = FieldSpec::defaulted("onboot", "0").emit(OmitIfZeroOrDefault);
static DIGEST: FieldSpec<Option<String>> = FieldSpec::optional("digest").emit(NeverEmit);

/// The subset of a guest config this crate understands.
///
/// Device slots that are absent are left alone on update; removing a device
/// is a separate `delete` of its slot name.
#[derive(Debug, Clone, PartialEq)]
pub struct VmConfig {
    pub name: Option<String>,
    pub onboot: bool,
    pub cpu: CpuConfig,
    pub memory: MemoryConfig,
    /// Keyed by slot (`net0`).
    pub nets: BTreeMap<String, NetworkInterface>,
    /// Keyed by slot (`scsi0`).
    pub disks: BTreeMap<String, Disk>,
    pub digest: Option<String>,
}

fn extract_slots<T: Clone + crate::schema::FromWire>(
    fields: &[FieldSpec<Option<T>>],
    map: &WireMap,
) -> Result<BTreeMap<String, T>, PropertyError> {
    let mut slots = BTreeMap::new();
    for spec in fields {
        if let Some(device) = spec.extract(map)? {
            slots.insert(spec.name.to_string(), device);
        }
    }
    Ok(slots)
}

impl FromWireMap for VmConfig {
    fn from_wire_map(map: &WireMap) -> Result<Self, PropertyError> {
        Ok(Self {
            name: NAME.extract(map)?,
            onboot: ONBOOT.extract(map)?,
            cpu: CpuConfig::from_wire_map(map)?,
            memory: MemoryConfig::from_wire_map(map)?,
            nets: extract_slots(&NET_FIELDS, map)?,
            disks: extract_slots(&DISK_FIELDS, map)?,
            digest: DIGEST.extract(map)?,
        })
    }
}

impl ToForm for VmConfig {
    fn encode_into(&self, encoder: &mut FormEncoder) -> Result<(), EncodeError> {
        encoder.field(&NAME, &self.name)?.field(&ONBOOT, &self.onboot)?;
        self.cpu.encode_into(encoder)?;
        self.memory.encode_into(encoder)?;
        for spec in NET_FIELDS.iter() {
            encoder.field(spec, &self.nets.get(spec.name).cloned())?;
        }
        for spec in DISK_FIELDS.iter() {
            encoder.field(spec, &self.disks.get(spec.name).cloned())?;
        }
        encoder.field(&DIGEST, &self.digest)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::encode::{Mode, ToWire};
    use crate::error::{ErrorKind, Rejection};
    use crate::schema::FromWire;
    use crate::wire::{wire_map_from_json, WireValue};

    fn decode<T: FromWire>(raw: &str) -> Result<T, Rejection> {
        T::from_wire(&WireValue::from(raw), &T::GRAMMAR)
    }

    fn encode<T: FromWire + ToWire>(value: &T) -> String {
        value.to_wire(&T::GRAMMAR).unwrap().unwrap()
    }

    #[test]
    fn test_disk_from_wire() {
        let disk: Disk = decode("local-lvm:vm-100-disk-0,size=32G,cache=writeback").unwrap();
        assert_eq!(disk.volume, "local-lvm:vm-100-disk-0");
        assert_eq!(disk.storage(), Some("local-lvm"));
        assert_eq!(disk.volume_name(), "vm-100-disk-0");
        assert_eq!(disk.size, Some(Size::from_gib(32)));
        assert_eq!(disk.cache, Some(CacheMode::WriteBack));
        assert!(disk.backup);
        assert!(!disk.ssd);
    }

    #[test]
    fn test_disk_roundtrip_keeps_volume_first() {
        let raw = "local-lvm:vm-100-disk-0,size=32G,cache=writeback,iothread=1,backup=0";
        let disk: Disk = decode(raw).unwrap();
        assert_eq!(encode(&disk), raw);
    }

    #[test]
    fn test_disk_file_key_and_cdrom() {
        let disk: Disk = decode("file=local:iso/debian.iso,media=cdrom").unwrap();
        assert_eq!(disk.volume, "local:iso/debian.iso");
        assert!(disk.is_cdrom());
        assert_eq!(encode(&disk), "local:iso/debian.iso,media=cdrom");
    }

    #[test]
    fn test_disk_bad_option_names_inner_key() {
        let err = decode::<Disk>("local-lvm:vm-100-disk-0,cache=fast").unwrap_err();
        let Rejection::Entry(inner) = err else {
            panic!("expected nested error, got {err:?}");
        };
        assert_eq!(inner.name(), "cache");
        assert_eq!(inner.kind(), ErrorKind::InvalidProperty);
    }

    #[test]
    fn test_disk_without_volume_is_missing_file() {
        let err = decode::<Disk>("size=32G").unwrap_err();
        assert_eq!(
            err,
            Rejection::Entry(Box::new(PropertyError::MissingProperty { name: "file" }))
        );
    }

    #[test]
    fn test_network_interface() {
        let nic: NetworkInterface =
            decode("virtio=BC:24:11:2A:3B:4C,bridge=vmbr0,firewall=1,tag=10").unwrap();
        assert_eq!(nic.model, NicModel::Virtio);
        assert_eq!(nic.macaddr.as_deref(), Some("BC:24:11:2A:3B:4C"));
        assert_eq!(nic.bridge.as_deref(), Some("vmbr0"));
        assert!(nic.firewall);
        assert_eq!(nic.tag, Some(10));
        assert_eq!(encode(&nic), "virtio=BC:24:11:2A:3B:4C,bridge=vmbr0,firewall=1,tag=10");
    }

    #[test]
    fn test_network_interface_without_mac() {
        let nic = NetworkInterface::new(NicModel::E1000, "vmbr1");
        assert_eq!(encode(&nic), "model=e1000,bridge=vmbr1");
        let back: NetworkInterface = decode("model=e1000,bridge=vmbr1").unwrap();
        assert_eq!(back, nic);
    }

    #[test]
    fn test_network_interface_rejects_bad_vlan_and_bare_keys() {
        let err = decode::<NetworkInterface>("virtio=BC:24:11:2A:3B:4C,tag=5000").unwrap_err();
        assert!(matches!(err, Rejection::Entry(ref e) if e.name() == "tag"));

        let err = decode::<NetworkInterface>("virtio,bridge=vmbr0").unwrap_err();
        assert!(matches!(err, Rejection::Codec(CodecError::MalformedEntry { position: 0, .. })));
    }

    #[test]
    fn test_unknown_model_cannot_be_encoded() {
        let mut nic = NetworkInterface::new(NicModel::Virtio, "vmbr0");
        nic.model = NicModel::from_token_lenient("ne2k_pci");
        assert!(nic.model.is_unknown());
        assert_eq!(
            nic.to_wire(&Grammar::STRICT),
            Err(CodecError::UnknownVariant { type_name: "network model" })
        );
    }

    #[test]
    fn test_cpu_type_with_flags() {
        let cpu: CpuType = decode("host,flags=+aes;-pcid").unwrap();
        assert_eq!(cpu.cputype, "host");
        assert_eq!(cpu.flags, vec![Flag::on("aes"), Flag::off("pcid")]);
        assert_eq!(encode(&cpu), "host,flags=+aes;-pcid");

        let cpu: CpuType = decode("cputype=kvm64,hidden=1").unwrap();
        assert_eq!(cpu.cputype, "kvm64");
        assert!(cpu.hidden);

        let err = decode::<CpuType>("host,flags=aes").unwrap_err();
        assert!(matches!(err, Rejection::Entry(ref e) if e.name() == "flags"));
    }

    #[test]
    fn test_cpu_config_defaults_and_validation() {
        let cpu = CpuConfig::from_wire_map(&WireMap::default()).unwrap();
        assert_eq!(cpu.cores, 1);
        assert_eq!(cpu.sockets, 1);
        assert_eq!(cpu.max_vcpus(), 1);
        assert_eq!(cpu.cpu, None);

        let map = wire_map_from_json(json!({"cores": 0})).unwrap();
        assert!(matches!(
            CpuConfig::from_wire_map(&map),
            Err(PropertyError::InvalidProperty { name: "cores", reason: Rejection::FailedValidation, .. })
        ));
    }

    #[test]
    fn test_max_vcpus_of_huge_topology() {
        let map = wire_map_from_json(json!({"cores": 65536, "sockets": 65536})).unwrap();
        let cpu = CpuConfig::from_wire_map(&map).unwrap();
        assert_eq!(cpu.max_vcpus(), 1 << 32);

        let map = wire_map_from_json(json!({"cores": u32::MAX, "sockets": u32::MAX})).unwrap();
        let cpu = CpuConfig::from_wire_map(&map).unwrap();
        assert_eq!(cpu.max_vcpus(), u64::from(u32::MAX) * u64::from(u32::MAX));
    }

    #[test]
    fn test_memory_config() {
        let map = wire_map_from_json(json!({"memory": "4096", "balloon": 0})).unwrap();
        let mem = MemoryConfig::from_wire_map(&map).unwrap();
        assert_eq!(mem.memory, 4096);
        assert!(!mem.ballooning());

        let form = mem.to_form(Mode::Update).unwrap();
        assert_eq!(form.get("memory"), Some("4096"));
        assert_eq!(form.get("balloon"), Some("0"));
        assert_eq!(form.delete(), &["shares"]);
    }

    fn sample_config() -> serde_json::Value {
        json!({
            "name": "web01",
            "onboot": 1,
            "cores": 4,
            "sockets": 1,
            "cpu": "host,flags=+aes",
            "memory": 8192,
            "balloon": 2048,
            "net0": "virtio=BC:24:11:2A:3B:4C,bridge=vmbr0,firewall=1",
            "scsi0": "local-lvm:vm-100-disk-0,size=32G,iothread=1",
            "ide2": "none,media=cdrom",
            "digest": "4f1c2d",
            "boot": "order=scsi0;net0",
        })
    }

    #[test]
    fn test_vm_config_from_json() {
        let config = VmConfig::from_wire_map(&wire_map_from_json(sample_config()).unwrap()).unwrap();
        assert_eq!(config.name.as_deref(), Some("web01"));
        assert!(config.onboot);
        assert_eq!(config.cpu.cores, 4);
        assert_eq!(config.cpu.cpu.as_ref().map(|c| c.cputype.as_str()), Some("host"));
        assert_eq!(config.memory.balloon, Some(2048));
        assert_eq!(config.nets.len(), 1);
        assert_eq!(config.nets["net0"].model, NicModel::Virtio);
        assert_eq!(config.disks.keys().collect::<Vec<_>>(), vec!["ide2", "scsi0"]);
        assert!(config.disks["ide2"].is_cdrom());
        assert_eq!(config.digest.as_deref(), Some("4f1c2d"));
    }

    #[test]
    fn test_vm_config_first_failure_wins() {
        let mut json = sample_config();
        json["cores"] = json!(2.5);
        json["net0"] = json!("virtio,bridge");
        let err = VmConfig::from_wire_map(&wire_map_from_json(json).unwrap()).unwrap_err();
        assert_eq!(err.name(), "cores");
    }

    #[test]
    fn test_vm_config_reextract_from_form() {
        let config = VmConfig::from_wire_map(&wire_map_from_json(sample_config()).unwrap()).unwrap();
        let form = config.to_form(Mode::Create).unwrap();
        assert_eq!(form.get("digest"), None);
        assert_eq!(form.get("scsi0"), Some("local-lvm:vm-100-disk-0,size=32G,iothread=1"));

        let mut back = VmConfig::from_wire_map(&form.to_wire_map()).unwrap();
        back.digest = config.digest.clone();
        assert_eq!(back, config);
    }

    fn nic_strategy() -> impl Strategy<Value = NetworkInterface> {
        (
            (
                proptest::sample::select(NicModel::VARIANTS),
                proptest::option::of("[0-9A-F]{2}(:[0-9A-F]{2}){5}"),
                proptest::option::of("vmbr[0-9]{1,2}"),
                any::<bool>(),
                any::<bool>(),
            ),
            (
                proptest::option::of(1u16..=4094),
                proptest::option::of(any::<u16>()),
                proptest::option::of((0u32..100_000).prop_map(|r| f64::from(r) / 10.0)),
                proptest::option::of(0u8..=64),
            ),
        )
            .prop_map(|((model, macaddr, bridge, firewall, link_down), (tag, mtu, rate, queues))| {
                NetworkInterface {
                    model,
                    macaddr,
                    bridge,
                    firewall,
                    link_down,
                    tag,
                    mtu,
                    rate,
                    queues,
                }
            })
    }

    fn disk_strategy() -> impl Strategy<Value = Disk> {
        (
            (
                "[a-z][a-z0-9-]{0,8}:vm-[0-9]{1,3}-disk-[0-9]",
                proptest::option::of(any::<u64>().prop_map(Size::from_bytes)),
                proptest::option::of(proptest::sample::select(CacheMode::VARIANTS)),
                proptest::option::of(proptest::sample::select(Discard::VARIANTS)),
            ),
            (
                any::<bool>(),
                any::<bool>(),
                any::<bool>(),
                proptest::option::of(proptest::sample::select(Media::VARIANTS)),
                proptest::option::of(proptest::sample::select(DiskFormat::VARIANTS)),
            ),
        )
            .prop_map(|((volume, size, cache, discard), (ssd, iothread, backup, media, format))| Disk {
                volume,
                size,
                cache,
                discard,
                ssd,
                iothread,
                backup,
                media,
                format,
            })
    }

    proptest! {
        #[test]
        fn prop_devices_survive_create_form(
            nic in nic_strategy(),
            disk in disk_strategy(),
            cores in 1u32..=256,
            onboot in any::<bool>(),
        ) {
            let mut config = VmConfig::from_wire_map(&WireMap::default()).unwrap();
            config.onboot = onboot;
            config.cpu.cores = cores;
            config.nets.insert("net0".to_string(), nic);
            config.disks.insert("scsi0".to_string(), disk);

            let form = config.to_form(Mode::Create).unwrap();
            let back = VmConfig::from_wire_map(&form.to_wire_map()).unwrap();
            prop_assert_eq!(back, config);
        }

        #[test]
        fn prop_nic_and_disk_wire_roundtrip(nic in nic_strategy(), disk in disk_strategy()) {
            prop_assert_eq!(decode::<NetworkInterface>(&encode(&nic)).unwrap(), nic);
            prop_assert_eq!(decode::<Disk>(&encode(&disk)).unwrap(), disk);
        }
    }
}
