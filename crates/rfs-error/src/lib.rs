#![forbid(unsafe_code)]
//! Error types for RFS.
//!
//! `RfsError` is the single user-facing error type returned by every
//! volume operation. The VFS/POSIX adapter sitting above the volume
//! translates each variant into an errno via [`RfsError::to_errno`];
//! the mapping is exhaustive (no wildcard arm) so adding a variant is a
//! compile error until its errno is assigned.
//!
//! There is no logging and no fatal-abort path here: every failure is a
//! recoverable return value, detected synchronously and handed to the
//! immediate caller.

use thiserror::Error;

/// Unified error type for all volume operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RfsError {
    /// The allocator could not satisfy a request.
    ///
    /// Exists for the adapter boundary's ENOMEM row. In-process
    /// allocation failure aborts in Rust, so the volume itself reports
    /// quota exhaustion as [`RfsError::NoSpace`] instead.
    #[error("out of memory")]
    OutOfMemory,

    /// A path component does not exist.
    #[error("no such entry")]
    NoEntry,

    /// Create-exclusive collision, or mkdir over an existing entry.
    #[error("entry already exists")]
    Exists,

    /// A path traverses through (or names) a file where a directory is
    /// required.
    #[error("not a directory")]
    NotDirectory,

    /// Operation on an unopened, exhausted, or mode-incompatible handle.
    #[error("bad handle")]
    BadHandle,

    /// Invalid open-mode combination.
    #[error("access denied")]
    AccessDenied,

    /// The operation would push usage past the volume quota.
    #[error("no space left on volume")]
    NoSpace,

    /// Negative offset or size, or a malformed argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// File-only operation attempted on a directory.
    #[error("is a directory")]
    IsDirectory,

    /// rmdir (or rename) target directory has children.
    #[error("directory not empty")]
    NotEmpty,

    /// rmdir or unlink on the root directory.
    #[error("resource busy")]
    Busy,

    /// unlink on a directory.
    #[error("operation not permitted")]
    PermissionDenied,

    /// Path exceeds `PATH_MAX`, or a component exceeds `NAME_MAX`.
    #[error("name too long")]
    NameTooLong,
}

impl RfsError {
    /// Convert this error into a POSIX errno for the adapter boundary.
    #[must_use]
    pub fn to_errno(self) -> libc::c_int {
        match self {
            Self::OutOfMemory => libc::ENOMEM,
            Self::NoEntry => libc::ENOENT,
            Self::Exists => libc::EEXIST,
            Self::NotDirectory => libc::ENOTDIR,
            Self::BadHandle => libc::EBADF,
            Self::AccessDenied => libc::EACCES,
            Self::NoSpace => libc::ENOSPC,
            Self::InvalidArgument(_) => libc::EINVAL,
            Self::IsDirectory => libc::EISDIR,
            Self::NotEmpty => libc::ENOTEMPTY,
            Self::Busy => libc::EBUSY,
            Self::PermissionDenied => libc::EPERM,
            Self::NameTooLong => libc::ENAMETOOLONG,
        }
    }
}

/// Result alias using `RfsError`.
pub type Result<T> = std::result::Result<T, RfsError>;
