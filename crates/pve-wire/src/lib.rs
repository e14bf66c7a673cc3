//! pve-wire: property codec and task coordinator for the Proxmox VE API.
//!
//! The management API packs structured settings into single strings
//! (`local-lvm:vm-100-disk-0,size=32G,cache=writeback`) and reports mutating
//! calls as asynchronous tasks. This crate converts between those strings and
//! typed, validated values, builds create/update forms, and waits for tasks.
//! HTTP transport is left to the caller.
//!
//! # Quick Start
//!
//! ```rust
//! use pve_wire::{FromWireMap, Mode, ToForm, VmConfig, wire_map_from_json};
//!
//! let map = wire_map_from_json(serde_json::json!({
//!     "name": "web01",
//!     "cores": 2,
//!     "memory": "2048",
//!     "scsi0": "local-lvm:vm-100-disk-0,size=32G,cache=writeback",
//! }))
//! .unwrap();
//!
//! let mut config = VmConfig::from_wire_map(&map).unwrap();
//! assert_eq!(config.disks["scsi0"].storage(), Some("local-lvm"));
//!
//! config.cpu.cores = 1;
//! let form = config.to_form(Mode::Update).unwrap();
//! assert!(form.delete().contains(&"cores"));
//! ```
//!
//! # Modules
//!
//! - [`wire`]: Raw values, scalar tokens and the token-list grammar
//! - [`schema`]: Field specs and typed extraction
//! - [`encode`]: Typed values back to form pairs and token lists
//! - [`model`]: VM, firewall, HA, cluster and storage properties
//! - [`task`]: Waiting for remote tasks
//! - [`error`]: Error types
//! - [`limits`]: Parser and poller bounds
//!
//! # Errors
//!
//! Every error maps to an [`ErrorKind`] with a stable code (`W001`..`W009`).
//! Property errors name the offending wire key; errors inside a composite
//! value nest the inner key under the outer one.

pub mod encode;
pub mod error;
pub mod limits;
pub mod model;
pub mod schema;
pub mod task;
pub mod wire;

// Re-export commonly used types at crate root
pub use encode::{Form, FormEncoder, Mode, ToForm, ToWire};
pub use error::{
    CodecError, EncodeError, ErrorKind, PropertyError, Rejection, TaskError, TransportError,
};
pub use model::{
    ClusterLink, ClusterNode, CpuConfig, CpuType, Disk, FirewallRule, HaGroup, MemoryConfig,
    NetworkInterface, NodeList, Storage, StorageKind, VmConfig,
};
pub use schema::{Composite, DefaultTable, EmissionPolicy, FieldSpec, FromWire, FromWireMap};
pub use task::{submit, PollOptions, StatusCheck, TaskHandle, TaskStatus, Upid};
pub use wire::{wire_map_from_json, Grammar, Size, TokenList, WireMap, WireScalar, WireValue};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
