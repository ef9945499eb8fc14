#![forbid(unsafe_code)]
//! RFS: an in-memory, quota-bounded RAM filesystem.
//!
//! The volume stores a tree of directory and file entries. File bytes
//! live in chains of fixed-size zero-initialized blocks sized at mount;
//! every entry, file header, and block is charged against a single byte
//! quota. Entries that are unlinked while handles are still open on them
//! survive, detached and still charged, until the last handle closes
//! (deferred destruction).
//!
//! Nothing persists: the volume is born empty at [`RamFs::mount`] and
//! everything is dropped at [`RamFs::umount`].
//!
//! # Concurrency
//!
//! One exclusive [`parking_lot::Mutex`] guards the entire instance.
//! Every public operation holds it for its full duration, so all
//! operations on one volume are totally ordered. This is a deliberate
//! simplicity choice for low-concurrency embedded use, not a performance
//! design; there are no concurrent readers and no per-entry locks.
//!
//! # Example
//!
//! ```
//! use rfs_core::RamFs;
//! use rfs_types::{FsConfig, OpenFlags};
//!
//! let fs = RamFs::mount(FsConfig::new(4096, 128).unwrap());
//! fs.mkdir("/a").unwrap();
//!
//! let mut file = fs
//!     .file_open("/a/f", OpenFlags::RDWR | OpenFlags::CREATE)
//!     .unwrap();
//! assert_eq!(fs.file_write(&mut file, b"hello").unwrap(), 5);
//! fs.file_close(file).unwrap();
//! ```

mod arena;
mod entry;
mod inner;
mod path;

use inner::FsInner;
use parking_lot::Mutex;
use rfs_error::{Result, RfsError};
use rfs_types::{EntryInfo, FsConfig, FsUsage, OpenFlags, SeekWhence};
use tracing::{debug, info, trace};

use arena::EntryId;

/// Ephemeral per-open file state.
///
/// A handle pins its entry alive through the volume's reference tracker
/// until it is passed back to [`RamFs::file_close`]. Dropping a handle
/// without closing it leaks the reference (and, for an unlinked entry,
/// its quota charge) until umount.
#[derive(Debug)]
pub struct FileHandle {
    pub(crate) id: EntryId,
    pub(crate) flags: OpenFlags,
    /// Logical byte offset. The block position is derived from it; with
    /// indexed blocks there is no separate chain cursor to maintain.
    pub(crate) offset: u64,
}

impl FileHandle {
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[must_use]
    pub fn flags(&self) -> OpenFlags {
        self.flags
    }
}

/// Ephemeral per-open directory iteration state.
///
/// `id` is `None` for the implicit root directory. `pos` is the
/// iteration position; `None` marks a poisoned (exhausted) handle.
#[derive(Debug)]
pub struct DirHandle {
    pub(crate) id: Option<EntryId>,
    pub(crate) pos: Option<u64>,
}

/// A mounted RAM volume.
#[derive(Debug)]
pub struct RamFs {
    inner: Mutex<FsInner>,
}

impl RamFs {
    /// Mount a fresh, empty volume.
    #[must_use]
    pub fn mount(config: FsConfig) -> Self {
        info!(
            quota = config.quota,
            block_size = config.block_size.get(),
            "ramfs: mounted"
        );
        Self {
            inner: Mutex::new(FsInner::new(config)),
        }
    }

    /// Tear the volume down, freeing every entry.
    ///
    /// The sweep ignores outstanding references; handles still open
    /// afterwards fail `BadHandle` on use. The instance itself is left
    /// equivalent to a freshly mounted empty volume.
    pub fn umount(&self) {
        let freed = self.inner.lock().umount_sweep();
        debug!(freed, "ramfs: unmounted");
    }

    /// Quota snapshot: total budget, bytes charged, block size.
    #[must_use]
    pub fn usage(&self) -> FsUsage {
        self.inner.lock().usage()
    }

    /// Recompute usage from scratch by walking every live entry.
    ///
    /// Always equals [`RamFs::usage`]`().used`; exposed so harnesses can
    /// audit the incremental accounting after every mutation.
    #[must_use]
    pub fn recount(&self) -> u64 {
        self.inner.lock().recount()
    }

    // ── Whole-path operations ───────────────────────────────────────────

    /// Create a directory. The parent must already exist; intermediate
    /// components are never auto-created.
    pub fn mkdir(&self, path: &str) -> Result<()> {
        let result = self.inner.lock().mkdir(path);
        trace!(path, ok = result.is_ok(), "ramfs: mkdir");
        result
    }

    /// Remove an empty directory.
    pub fn rmdir(&self, path: &str) -> Result<()> {
        let result = self.inner.lock().rmdir(path);
        trace!(path, ok = result.is_ok(), "ramfs: rmdir");
        result
    }

    /// Remove a file. If handles are still open on it, destruction is
    /// deferred until the last close.
    pub fn unlink(&self, path: &str) -> Result<()> {
        let result = self.inner.lock().unlink(path);
        trace!(path, ok = result.is_ok(), "ramfs: unlink");
        result
    }

    /// Move `old` to `new`, replacing an existing file or empty
    /// directory at the destination.
    pub fn rename(&self, old: &str, new: &str) -> Result<()> {
        let result = self.inner.lock().rename(old, new);
        trace!(old, new, ok = result.is_ok(), "ramfs: rename");
        result
    }

    /// Stat a path. `/` is reported as an empty-named zero-size
    /// directory.
    pub fn stat(&self, path: &str) -> Result<EntryInfo> {
        self.inner.lock().stat(path)
    }

    // ── Directory handles ───────────────────────────────────────────────

    /// Open a directory for iteration.
    pub fn dir_open(&self, path: &str) -> Result<DirHandle> {
        self.inner.lock().dir_open(path)
    }

    /// Read the next child in creation order, or `Ok(None)` at
    /// end-of-directory. The end poisons the handle; reading past it
    /// fails `BadHandle`.
    pub fn dir_read(&self, handle: &mut DirHandle) -> Result<Option<EntryInfo>> {
        self.inner.lock().dir_read(handle)
    }

    /// Current iteration position of a directory handle.
    pub fn tell_dir(&self, handle: &DirHandle) -> Result<u64> {
        handle.pos.ok_or(RfsError::BadHandle)
    }

    /// Close a directory handle, releasing its reference.
    pub fn dir_close(&self, handle: DirHandle) -> Result<()> {
        if let Some(id) = handle.id {
            self.inner.lock().release(id);
        }
        Ok(())
    }

    // ── File handles ────────────────────────────────────────────────────

    /// Open (and with [`OpenFlags::CREATE`], possibly create) a file.
    pub fn file_open(&self, path: &str, flags: OpenFlags) -> Result<FileHandle> {
        let result = self.inner.lock().file_open(path, flags);
        trace!(path, ?flags, ok = result.is_ok(), "ramfs: file_open");
        result
    }

    /// Read at the handle offset. Returns the bytes actually copied;
    /// `0` at end-of-file. A short read is not an error.
    pub fn file_read(&self, handle: &mut FileHandle, buf: &mut [u8]) -> Result<usize> {
        self.inner.lock().read(handle, buf)
    }

    /// Write at the handle offset, allocating blocks as needed. A quota
    /// failure mid-copy yields a short count rather than an error; the
    /// bytes already copied stay written.
    pub fn file_write(&self, handle: &mut FileHandle, buf: &[u8]) -> Result<usize> {
        self.inner.lock().write(handle, buf)
    }

    /// Reposition the handle offset. Seeking past end-of-file is
    /// allowed; blocks materialize on the next write.
    pub fn file_seek(
        &self,
        handle: &mut FileHandle,
        offset: i64,
        whence: SeekWhence,
    ) -> Result<u64> {
        self.inner.lock().seek(handle, offset, whence)
    }

    /// Grow or shrink the file to `size` bytes.
    pub fn file_truncate(&self, handle: &FileHandle, size: i64) -> Result<()> {
        self.inner.lock().truncate(handle, size)
    }

    /// Stat the file behind an open handle.
    pub fn file_stat(&self, handle: &FileHandle) -> Result<EntryInfo> {
        self.inner.lock().file_stat(handle)
    }

    /// No-op flush; validates the handle.
    pub fn file_sync(&self, handle: &FileHandle) -> Result<()> {
        self.inner.lock().file_sync(handle)
    }

    /// Close a file handle, releasing its reference. If the entry was
    /// unlinked while open, this is the point where it is actually
    /// freed and its quota charge returns.
    pub fn file_close(&self, handle: FileHandle) -> Result<()> {
        self.inner.lock().release(handle.id);
        Ok(())
    }
}
