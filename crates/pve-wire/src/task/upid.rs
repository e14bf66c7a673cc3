//! Task identifiers.

use std::fmt;

use crate::error::CodecError;

/// Identifier of a remote task, as returned by every mutating call.
///
/// Format: `UPID:{node}:{pid}:{pstart}:{starttime}:{type}:{id}:{user}:` with
/// pid, pstart and starttime in hex. The full string is kept verbatim; the
/// parsed parts are for routing and display.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Upid {
    raw: String,
    node: String,
    pid: u32,
    start_time: u64,
    task_type: String,
    id: String,
    user: String,
}

impl Upid {
    /// Parses a task identifier.
    pub fn parse(raw: &str) -> Result<Self, CodecError> {
        let err = || CodecError::unrecognized("task id", raw);
        let parts: Vec<&str> = raw.split(':').collect();
        // trailing ':' yields an empty last part
        if parts.len() != 9 || parts[0] != "UPID" || !parts[8].is_empty() {
            return Err(err());
        }
        let hex = |s: &str| u64::from_str_radix(s, 16).map_err(|_| err());
        let node = parts[1];
        // node names end up in thread names, which must not contain NUL
        if node.is_empty() || !node.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(err());
        }
        let pid = u32::from_str_radix(parts[2], 16).map_err(|_| err())?;
        hex(parts[3])?;
        let start_time = hex(parts[4])?;

        Ok(Self {
            raw: raw.to_string(),
            node: node.to_string(),
            pid,
            start_time,
            task_type: parts[5].to_string(),
            id: parts[6].to_string(),
            user: parts[7].to_string(),
        })
    }

    /// Returns the identifier exactly as received.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the node the task runs on.
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Returns the worker process id.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Returns the start time in seconds since the Unix epoch.
    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    /// Returns the task type, e.g. `qmstart`.
    pub fn task_type(&self) -> &str {
        &self.task_type
    }

    /// Returns the object the task acts on, e.g. a VM id. May be empty.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the user that started the task.
    pub fn user(&self) -> &str {
        &self.user
    }
}

impl fmt::Display for Upid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for Upid {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Upid::parse(s)
    }
}
