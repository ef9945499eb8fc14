#![forbid(unsafe_code)]
//! Shared vocabulary for the RFS in-memory filesystem.
//!
//! Everything here is plain data: validated configuration, the stat
//! projection returned to callers, open/seek flag types, and the storage
//! charge model used for quota accounting. The filesystem itself lives in
//! `rfs-core`; this crate must stay free of tree or locking concerns so
//! that adapters can depend on it without pulling in the volume.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum length in bytes of a single entry name.
///
/// The on-device ancestor packed the name length into six bits of the
/// entry flags; the ceiling is kept as an explicit validated constant.
pub const NAME_MAX: usize = 63;

/// Maximum length in bytes of a full path handed to any operation.
pub const PATH_MAX: usize = 64;

// ── Storage charge model ────────────────────────────────────────────────────
//
// Quota accounting charges a fixed overhead per object plus the variable
// payload, replacing the ancestor's `sizeof` arithmetic with explicit,
// platform-independent constants. `current_size` is the sum of these
// charges over every live entry.

/// Fixed charge for any entry, on top of its name bytes.
pub const ENTRY_BASE_COST: u64 = 16;

/// Additional fixed charge for a file entry's header (chain ends + size).
pub const FILE_HEADER_COST: u64 = 16;

/// Per-block charge on top of the block's data bytes (the chain link).
pub const BLOCK_LINK_COST: u64 = 8;

/// Quota charge for one entry of the given kind.
#[must_use]
pub fn entry_cost(name_len: usize, kind: EntryType) -> u64 {
    let base = ENTRY_BASE_COST + name_len as u64;
    match kind {
        EntryType::Directory => base,
        EntryType::File => base + FILE_HEADER_COST,
    }
}

/// Quota charge for one storage block.
#[must_use]
pub fn block_cost(block_size: u32) -> u64 {
    BLOCK_LINK_COST + u64::from(block_size)
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid config field: {field} ({reason})")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
}

/// Validated block size (power of two in 16..=65536).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockSize(u32);

impl BlockSize {
    /// Create a `BlockSize` if `value` is a power of two in [16, 65536].
    pub fn new(value: u32) -> Result<Self, ConfigError> {
        if !value.is_power_of_two() || !(16..=65536).contains(&value) {
            return Err(ConfigError::InvalidField {
                field: "block_size",
                reason: "must be a power of two in 16..=65536",
            });
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BlockSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mount-time configuration of a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsConfig {
    /// Total byte budget for every entry, header, and block on the volume.
    pub quota: u64,
    /// Size of each storage block.
    pub block_size: BlockSize,
}

impl FsConfig {
    /// Build a config, validating the block size.
    pub fn new(quota: u64, block_size: u32) -> Result<Self, ConfigError> {
        Ok(Self {
            quota,
            block_size: BlockSize::new(block_size)?,
        })
    }
}

/// Quota snapshot of a mounted volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsUsage {
    pub quota: u64,
    pub used: u64,
    pub block_size: u32,
}

/// The two entry kinds a volume stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    Directory,
    File,
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory => write!(f, "directory"),
            Self::File => write!(f, "file"),
        }
    }
}

/// Stat projection of an entry: name, kind, and logical size.
///
/// Directories always report size zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
    pub name: String,
    pub kind: EntryType,
    pub size: u64,
}

/// Origin for a seek offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeekWhence {
    Set,
    Current,
    End,
}

bitflags::bitflags! {
    /// File open flags.
    ///
    /// The low two bits carry the access mode; `RDWR` is the union of
    /// `RDONLY` and `WRONLY`. The remaining bits adjust open behavior.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        const RDONLY = 0x0001;
        const WRONLY = 0x0002;
        const RDWR   = 0x0003;
        /// Create the file if it does not exist.
        const CREATE = 0x0100;
        /// With `CREATE`, fail if the file already exists.
        const EXCL   = 0x0200;
        /// Truncate to zero length at open (writable modes only).
        const TRUNC  = 0x0400;
        /// Position the offset at end-of-file at open.
        const APPEND = 0x0800;
    }
}

impl OpenFlags {
    /// Mask selecting the access-mode bits.
    pub const ACCMODE: u32 = 0x0003;

    #[must_use]
    pub fn access_mode(self) -> u32 {
        self.bits() & Self::ACCMODE
    }

    /// The access mode is exactly one of read-only, write-only, read-write.
    #[must_use]
    pub fn has_valid_access_mode(self) -> bool {
        (1..=3).contains(&self.access_mode())
    }

    #[must_use]
    pub fn readable(self) -> bool {
        matches!(self.access_mode(), 0x1 | 0x3)
    }

    #[must_use]
    pub fn writable(self) -> bool {
        matches!(self.access_mode(), 0x2 | 0x3)
    }
}
