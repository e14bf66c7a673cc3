//! Typed resource properties.
//!
//! Each record declares its fields as static [`FieldSpec`](crate::schema::FieldSpec)
//! tables and implements [`FromWireMap`](crate::schema::FromWireMap) and
//! [`ToForm`](crate::encode::ToForm) over them.

pub mod cluster;
pub mod firewall;
pub mod ha;
pub mod storage;
pub mod vm;

pub use cluster::{ClusterLink, ClusterNode};
pub use firewall::{FirewallRule, LogLevel, RuleType};
pub use ha::{HaGroup, NodeList, NodePriority};
pub use storage::{ContentType, Storage, StorageKind, STORAGE_DEFAULTS};
pub use vm::{
    CacheMode, CpuConfig, CpuType, Discard, Disk, DiskFormat, Media, MemoryConfig,
    NetworkInterface, NicModel, VmConfig,
};
