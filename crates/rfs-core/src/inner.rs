//! The locked interior of a mounted volume.
//!
//! Everything in this module runs with the volume's single lock already
//! held by the public operation layer in `lib.rs`. The state is one
//! arena of entries, the root child chain, the open-handle reference
//! list, and the quota counters; no sub-structure is ever touched
//! outside the lock.

use crate::arena::{Arena, EntryId};
use crate::entry::{Entry, Payload};
use crate::path;
use crate::{DirHandle, FileHandle};
use rfs_error::{Result, RfsError};
use rfs_types::{
    block_cost, entry_cost, EntryInfo, EntryType, FsConfig, FsUsage, OpenFlags, SeekWhence,
};

/// Open-handle counter for one entry.
///
/// The list is scanned linearly; the number of concurrently open handles
/// is small in the embedded deployments this targets.
#[derive(Debug)]
struct RefCount {
    id: EntryId,
    uses: u32,
}

/// Outcome of a path traversal.
#[derive(Debug)]
pub(crate) enum Traversal {
    /// The path named an existing entry.
    Found {
        id: EntryId,
        parent: Option<EntryId>,
    },
    /// The final component was absent and has been created.
    Created { id: EntryId },
}

#[derive(Debug)]
pub(crate) struct FsInner {
    arena: Arena<Entry>,
    /// Child chain of the implicit root directory, in insertion order.
    root: Vec<EntryId>,
    refs: Vec<RefCount>,
    quota: u64,
    block_size: u32,
    current_size: u64,
}

impl FsInner {
    pub(crate) fn new(config: FsConfig) -> Self {
        Self {
            arena: Arena::new(),
            root: Vec::new(),
            refs: Vec::new(),
            quota: config.quota,
            block_size: config.block_size.get(),
            current_size: 0,
        }
    }

    pub(crate) fn usage(&self) -> FsUsage {
        FsUsage {
            quota: self.quota,
            used: self.current_size,
            block_size: self.block_size,
        }
    }

    // ── Reference tracking ──────────────────────────────────────────────

    fn acquire(&mut self, id: EntryId) {
        match self.refs.iter_mut().find(|r| r.id == id) {
            Some(counter) => counter.uses = counter.uses.saturating_add(1),
            None => self.refs.push(RefCount { id, uses: 1 }),
        }
    }

    pub(crate) fn release(&mut self, id: EntryId) {
        let Some(pos) = self.refs.iter().position(|r| r.id == id) else {
            return;
        };
        self.refs[pos].uses = self.refs[pos].uses.saturating_sub(1);
        if self.refs[pos].uses > 0 {
            return;
        }
        self.refs.swap_remove(pos);
        let pending = self
            .arena
            .get(id)
            .map(|entry| entry.pending_delete)
            .unwrap_or(false);
        if pending {
            self.free_entry(id);
        }
    }

    fn ref_uses(&self, id: EntryId) -> u32 {
        self.refs
            .iter()
            .find(|r| r.id == id)
            .map_or(0, |r| r.uses)
    }

    // ── Entry tree ──────────────────────────────────────────────────────

    /// Linear name scan of one child chain, in insertion order.
    fn lookup_child(&self, parent: Option<EntryId>, name: &str) -> Option<EntryId> {
        let children = match parent {
            None => &self.root,
            Some(pid) => &self.arena.get(pid)?.as_dir()?.children,
        };
        children
            .iter()
            .copied()
            .find(|&id| self.arena.get(id).is_some_and(|e| e.name == name))
    }

    fn attach(&mut self, parent: Option<EntryId>, id: EntryId) -> Result<()> {
        match parent {
            None => {
                self.root.push(id);
                Ok(())
            }
            Some(pid) => {
                let Some(dir) = self.arena.get_mut(pid).and_then(Entry::as_dir_mut) else {
                    return Err(RfsError::NotDirectory);
                };
                dir.children.push(id);
                Ok(())
            }
        }
    }

    /// Create a new entry at the end of `parent`'s child chain.
    fn add_entry(
        &mut self,
        name: &str,
        parent: Option<EntryId>,
        kind: EntryType,
    ) -> Result<EntryId> {
        let cost = entry_cost(name.len(), kind);
        if self.current_size + cost > self.quota {
            return Err(RfsError::NoSpace);
        }

        let entry = match kind {
            EntryType::Directory => Entry::new_dir(name, parent),
            EntryType::File => Entry::new_file(name, parent),
        };
        let id = self.arena.insert(entry);
        if let Err(err) = self.attach(parent, id) {
            self.arena.remove(id);
            return Err(err);
        }
        self.current_size += cost;
        Ok(id)
    }

    /// Detach `id` from the tree. If any handle still references it the
    /// entry is marked pending-delete and survives (still charged against
    /// the quota) until the last release; otherwise it is freed now.
    fn detach(&mut self, id: EntryId, parent: Option<EntryId>) {
        match parent {
            None => self.root.retain(|&child| child != id),
            Some(pid) => {
                if let Some(dir) = self.arena.get_mut(pid).and_then(Entry::as_dir_mut) {
                    dir.children.retain(|&child| child != id);
                }
            }
        }

        if self.ref_uses(id) > 0 {
            if let Some(entry) = self.arena.get_mut(id) {
                entry.pending_delete = true;
                entry.parent = None;
            }
            return;
        }
        self.free_entry(id);
    }

    /// Reclaim the entry's memory and quota charge, blocks included.
    fn free_entry(&mut self, id: EntryId) {
        if let Some(entry) = self.arena.remove(id) {
            self.current_size = self
                .current_size
                .saturating_sub(entry.footprint(self.block_size));
        }
    }

    fn entry_info(&self, id: EntryId) -> Result<EntryInfo> {
        self.arena
            .get(id)
            .map(Entry::info)
            .ok_or(RfsError::BadHandle)
    }

    // ── Path traversal ──────────────────────────────────────────────────

    /// Resolve `p` against the tree, optionally creating the final
    /// component when absent. Intermediate components must exist and be
    /// directories; they are never auto-created.
    pub(crate) fn traverse(&mut self, p: &str, create: Option<EntryType>) -> Result<Traversal> {
        let components = path::split(p)?;
        let Some((last, intermediate)) = components.split_last() else {
            return Err(RfsError::NoEntry);
        };

        let mut parent: Option<EntryId> = None;
        for component in intermediate {
            let Some(id) = self.lookup_child(parent, component) else {
                return Err(RfsError::NoEntry);
            };
            let entry = self.arena.get(id).ok_or(RfsError::NoEntry)?;
            if entry.kind() != EntryType::Directory {
                return Err(RfsError::NotDirectory);
            }
            parent = Some(id);
        }

        match self.lookup_child(parent, last) {
            Some(id) => Ok(Traversal::Found { id, parent }),
            None => match create {
                Some(kind) => Ok(Traversal::Created {
                    id: self.add_entry(last, parent, kind)?,
                }),
                None => Err(RfsError::NoEntry),
            },
        }
    }

    // ── Block chain ─────────────────────────────────────────────────────

    fn file_block_count(&self, id: EntryId) -> Result<usize> {
        self.arena
            .get(id)
            .and_then(Entry::as_file)
            .map(|f| f.blocks.len())
            .ok_or(RfsError::BadHandle)
    }

    /// Append one zeroed block to the file's chain, charging the quota.
    fn add_block(&mut self, id: EntryId) -> Result<()> {
        let cost = block_cost(self.block_size);
        if self.current_size + cost > self.quota {
            return Err(RfsError::NoSpace);
        }
        let block_size = self.block_size as usize;
        let Some(file) = self.arena.get_mut(id).and_then(Entry::as_file_mut) else {
            return Err(RfsError::BadHandle);
        };
        file.blocks.push(vec![0_u8; block_size].into_boxed_slice());
        self.current_size += cost;
        Ok(())
    }

    /// Remove the block at the tail of the chain. The chain only ever
    /// shrinks from the end.
    fn remove_block(&mut self, id: EntryId) -> Result<()> {
        let Some(file) = self.arena.get_mut(id).and_then(Entry::as_file_mut) else {
            return Err(RfsError::BadHandle);
        };
        if file.blocks.pop().is_some() {
            self.current_size = self
                .current_size
                .saturating_sub(block_cost(self.block_size));
        }
        Ok(())
    }

    // ── Directory operations ────────────────────────────────────────────

    pub(crate) fn mkdir(&mut self, p: &str) -> Result<()> {
        if p == "/" {
            return Err(RfsError::Exists);
        }
        match self.traverse(p, Some(EntryType::Directory))? {
            Traversal::Created { .. } => Ok(()),
            Traversal::Found { .. } => Err(RfsError::Exists),
        }
    }

    pub(crate) fn rmdir(&mut self, p: &str) -> Result<()> {
        if p == "/" {
            return Err(RfsError::Busy);
        }
        let Traversal::Found { id, parent } = self.traverse(p, None)? else {
            return Err(RfsError::NoEntry);
        };
        let entry = self.arena.get(id).ok_or(RfsError::NoEntry)?;
        match &entry.payload {
            Payload::File(_) => return Err(RfsError::NotDirectory),
            Payload::Directory(dir) if !dir.children.is_empty() => {
                return Err(RfsError::NotEmpty)
            }
            Payload::Directory(_) => {}
        }
        self.detach(id, parent);
        Ok(())
    }

    pub(crate) fn unlink(&mut self, p: &str) -> Result<()> {
        if p == "/" {
            return Err(RfsError::Busy);
        }
        let Traversal::Found { id, parent } = self.traverse(p, None)? else {
            return Err(RfsError::NoEntry);
        };
        let entry = self.arena.get(id).ok_or(RfsError::NoEntry)?;
        if entry.kind() != EntryType::File {
            return Err(RfsError::PermissionDenied);
        }
        self.detach(id, parent);
        Ok(())
    }

    pub(crate) fn rename(&mut self, oldp: &str, newp: &str) -> Result<()> {
        // Reject moving a directory into its own subtree before any
        // mutation happens; the resulting cycle would detach the subtree
        // from every reachability walk.
        let old_components = path::split(oldp)?;
        let new_components = path::split(newp)?;
        if new_components.len() > old_components.len()
            && new_components[..old_components.len()] == old_components[..]
        {
            return Err(RfsError::InvalidArgument("rename into own subtree"));
        }

        let Traversal::Found {
            id: old_id,
            parent: old_parent,
        } = self.traverse(oldp, None)?
        else {
            return Err(RfsError::NoEntry);
        };
        let old_kind = self.arena.get(old_id).ok_or(RfsError::NoEntry)?.kind();

        let new_id = match self.traverse(newp, Some(old_kind))? {
            Traversal::Found { id, .. } => {
                if id == old_id {
                    return Ok(());
                }
                let entry = self.arena.get(id).ok_or(RfsError::NoEntry)?;
                match (old_kind, entry.kind()) {
                    (EntryType::File, EntryType::Directory) => {
                        return Err(RfsError::IsDirectory)
                    }
                    (EntryType::Directory, EntryType::File) => {
                        return Err(RfsError::NotDirectory)
                    }
                    (EntryType::Directory, EntryType::Directory) => {
                        if entry.as_dir().is_some_and(|d| !d.children.is_empty()) {
                            return Err(RfsError::NotEmpty);
                        }
                    }
                    (EntryType::File, EntryType::File) => {}
                }
                id
            }
            Traversal::Created { id } => id,
        };

        // Move the payload across. For files the destination's old chain
        // is freed first so quota accounting stays consistent with
        // reachability.
        match old_kind {
            EntryType::File => {
                let moved = match self.arena.get_mut(old_id).and_then(Entry::as_file_mut) {
                    Some(file) => std::mem::take(file),
                    None => return Err(RfsError::NoEntry),
                };
                let dropped_blocks;
                match self.arena.get_mut(new_id).and_then(Entry::as_file_mut) {
                    Some(dest) => {
                        dropped_blocks = dest.blocks.len() as u64;
                        *dest = moved;
                    }
                    None => return Err(RfsError::NoEntry),
                }
                self.current_size = self
                    .current_size
                    .saturating_sub(dropped_blocks * block_cost(self.block_size));
            }
            EntryType::Directory => {
                let moved = match self.arena.get_mut(old_id).and_then(Entry::as_dir_mut) {
                    Some(dir) => std::mem::take(&mut dir.children),
                    None => return Err(RfsError::NoEntry),
                };
                for &child in &moved {
                    if let Some(entry) = self.arena.get_mut(child) {
                        entry.parent = Some(new_id);
                    }
                }
                match self.arena.get_mut(new_id).and_then(Entry::as_dir_mut) {
                    Some(dest) => dest.children = moved,
                    None => return Err(RfsError::NoEntry),
                }
            }
        }

        // The source keeps only its empty shell; open handles on it now
        // observe an empty file. Detach respects those references.
        self.detach(old_id, old_parent);
        Ok(())
    }

    pub(crate) fn stat(&mut self, p: &str) -> Result<EntryInfo> {
        if p == "/" {
            return Ok(EntryInfo {
                name: String::new(),
                kind: EntryType::Directory,
                size: 0,
            });
        }
        match self.traverse(p, None)? {
            Traversal::Found { id, .. } => self.entry_info(id),
            Traversal::Created { .. } => Err(RfsError::NoEntry),
        }
    }

    pub(crate) fn dir_open(&mut self, p: &str) -> Result<DirHandle> {
        if p == "/" {
            return Ok(DirHandle {
                id: None,
                pos: Some(0),
            });
        }
        match self.traverse(p, None)? {
            Traversal::Found { id, .. } => {
                let entry = self.arena.get(id).ok_or(RfsError::NoEntry)?;
                if entry.kind() != EntryType::Directory {
                    return Err(RfsError::NotDirectory);
                }
                self.acquire(id);
                Ok(DirHandle {
                    id: Some(id),
                    pos: Some(0),
                })
            }
            Traversal::Created { .. } => Err(RfsError::NoEntry),
        }
    }

    /// Yield the next child, or `None` once at end-of-directory. Hitting
    /// the end poisons the position; later reads fail `BadHandle`.
    pub(crate) fn dir_read(&mut self, handle: &mut DirHandle) -> Result<Option<EntryInfo>> {
        let Some(pos) = handle.pos else {
            return Err(RfsError::BadHandle);
        };
        let children = match handle.id {
            None => &self.root,
            Some(id) => {
                let Some(dir) = self.arena.get(id).and_then(Entry::as_dir) else {
                    return Err(RfsError::BadHandle);
                };
                &dir.children
            }
        };
        match children.get(pos as usize) {
            Some(&child) => {
                let info = self.entry_info(child)?;
                handle.pos = Some(pos + 1);
                Ok(Some(info))
            }
            None => {
                handle.pos = None;
                Ok(None)
            }
        }
    }

    // ── File operations ─────────────────────────────────────────────────

    pub(crate) fn file_open(&mut self, p: &str, flags: OpenFlags) -> Result<FileHandle> {
        if !flags.has_valid_access_mode() {
            return Err(RfsError::AccessDenied);
        }

        let create = flags
            .contains(OpenFlags::CREATE)
            .then_some(EntryType::File);
        let id = match self.traverse(p, create)? {
            Traversal::Found { id, .. } => {
                if flags.contains(OpenFlags::CREATE) && flags.contains(OpenFlags::EXCL) {
                    return Err(RfsError::Exists);
                }
                let entry = self.arena.get(id).ok_or(RfsError::NoEntry)?;
                if entry.kind() == EntryType::Directory {
                    return Err(RfsError::IsDirectory);
                }
                id
            }
            Traversal::Created { id } => id,
        };

        self.acquire(id);
        let mut handle = FileHandle {
            id,
            flags,
            offset: 0,
        };

        if flags.contains(OpenFlags::TRUNC) && flags.writable() {
            if let Err(err) = self.truncate(&handle, 0) {
                self.release(id);
                return Err(err);
            }
        }
        if flags.contains(OpenFlags::APPEND) {
            handle.offset = self
                .arena
                .get(id)
                .and_then(Entry::as_file)
                .map_or(0, |f| f.size);
        }
        Ok(handle)
    }

    pub(crate) fn read(&mut self, handle: &mut FileHandle, buf: &mut [u8]) -> Result<usize> {
        if !handle.flags.readable() {
            return Err(RfsError::BadHandle);
        }
        let file = self
            .arena
            .get(handle.id)
            .and_then(Entry::as_file)
            .ok_or(RfsError::BadHandle)?;

        let block_size = u64::from(self.block_size);
        let mut done = 0_usize;
        while done < buf.len() && handle.offset < file.size {
            let block_index = (handle.offset / block_size) as usize;
            let in_block = (handle.offset % block_size) as usize;
            let Some(block) = file.blocks.get(block_index) else {
                break;
            };
            let want = (buf.len() - done) as u64;
            let n = want
                .min(block_size - in_block as u64)
                .min(file.size - handle.offset) as usize;
            buf[done..done + n].copy_from_slice(&block[in_block..in_block + n]);
            done += n;
            handle.offset += n as u64;
        }
        Ok(done)
    }

    /// Copy `buf` at the handle's offset, growing the chain on demand.
    ///
    /// Writing past end-of-file first fills the gap with zero blocks. A
    /// quota failure mid-copy returns the bytes already written when that
    /// count is non-zero; nothing written so far is rolled back.
    pub(crate) fn write(&mut self, handle: &mut FileHandle, buf: &[u8]) -> Result<usize> {
        if !handle.flags.writable() {
            return Err(RfsError::BadHandle);
        }
        if self
            .arena
            .get(handle.id)
            .and_then(Entry::as_file)
            .is_none()
        {
            return Err(RfsError::BadHandle);
        }

        let block_size = u64::from(self.block_size);
        let mut done = 0_usize;
        while done < buf.len() {
            let block_index = (handle.offset / block_size) as usize;
            let in_block = (handle.offset % block_size) as usize;

            while block_index >= self.file_block_count(handle.id)? {
                if let Err(err) = self.add_block(handle.id) {
                    return if done == 0 { Err(err) } else { Ok(done) };
                }
            }

            let Some(file) = self.arena.get_mut(handle.id).and_then(Entry::as_file_mut)
            else {
                return Err(RfsError::BadHandle);
            };
            let n = (buf.len() - done).min(block_size as usize - in_block);
            file.blocks[block_index][in_block..in_block + n]
                .copy_from_slice(&buf[done..done + n]);
            done += n;
            handle.offset += n as u64;
            if handle.offset > file.size {
                file.size = handle.offset;
            }
        }
        Ok(done)
    }

    pub(crate) fn seek(
        &mut self,
        handle: &mut FileHandle,
        offset: i64,
        whence: SeekWhence,
    ) -> Result<u64> {
        let file = self
            .arena
            .get(handle.id)
            .and_then(Entry::as_file)
            .ok_or(RfsError::BadHandle)?;

        let base = match whence {
            SeekWhence::Set => 0,
            SeekWhence::Current => i64::try_from(handle.offset)
                .map_err(|_| RfsError::InvalidArgument("offset exceeds i64"))?,
            SeekWhence::End => i64::try_from(file.size)
                .map_err(|_| RfsError::InvalidArgument("size exceeds i64"))?,
        };
        let target = base
            .checked_add(offset)
            .ok_or(RfsError::InvalidArgument("seek offset overflow"))?;
        if target < 0 {
            return Err(RfsError::InvalidArgument("seek before start of file"));
        }
        handle.offset = target as u64;
        Ok(handle.offset)
    }

    /// Resize to `size` bytes. Shrinking drops tail blocks and zeroes the
    /// bytes past the new size in the remaining tail block; growing
    /// appends zero blocks, rolling back the blocks added by this call if
    /// the quota runs out mid-way.
    pub(crate) fn truncate(&mut self, handle: &FileHandle, size: i64) -> Result<()> {
        if !handle.flags.writable() {
            return Err(RfsError::BadHandle);
        }
        if size < 0 {
            return Err(RfsError::InvalidArgument("negative truncate size"));
        }
        let target = size as u64;

        let block_size = u64::from(self.block_size);
        let needed = target.div_ceil(block_size) as usize;
        let current = self.file_block_count(handle.id)?;

        if needed < current {
            for _ in needed..current {
                self.remove_block(handle.id)?;
            }
        } else if needed > current {
            let mut added = 0_usize;
            for _ in current..needed {
                if let Err(err) = self.add_block(handle.id) {
                    for _ in 0..added {
                        self.remove_block(handle.id)?;
                    }
                    return Err(err);
                }
                added += 1;
            }
        }

        let Some(file) = self.arena.get_mut(handle.id).and_then(Entry::as_file_mut) else {
            return Err(RfsError::BadHandle);
        };
        let shrinking = target < file.size;
        file.size = target;
        // A later grow over this region must read as zeros.
        if shrinking && needed > 0 {
            let in_block = (target % block_size) as usize;
            if in_block != 0 {
                file.blocks[needed - 1][in_block..].fill(0);
            }
        }
        Ok(())
    }

    pub(crate) fn file_stat(&self, handle: &FileHandle) -> Result<EntryInfo> {
        self.entry_info(handle.id)
    }

    pub(crate) fn file_sync(&self, handle: &FileHandle) -> Result<()> {
        // Nothing to flush on a RAM volume; validate the handle only.
        self.arena
            .get(handle.id)
            .map(|_| ())
            .ok_or(RfsError::BadHandle)
    }

    // ── Mount lifecycle ─────────────────────────────────────────────────

    /// Free every entry on the volume, ignoring the reference list.
    ///
    /// Iterative post-order sweep with an explicit stack: children first,
    /// then their directory. Returns the number of entries freed.
    pub(crate) fn umount_sweep(&mut self) -> usize {
        let mut freed = 0_usize;
        let mut stack: Vec<(EntryId, bool)> = self
            .root
            .drain(..)
            .map(|id| (id, false))
            .collect();

        while let Some((id, children_done)) = stack.pop() {
            if children_done {
                self.free_entry(id);
                freed += 1;
                continue;
            }
            let children: Vec<EntryId> = self
                .arena
                .get(id)
                .and_then(Entry::as_dir)
                .map(|dir| dir.children.clone())
                .unwrap_or_default();
            if children.is_empty() {
                self.free_entry(id);
                freed += 1;
            } else {
                stack.push((id, true));
                for child in children {
                    stack.push((child, false));
                }
            }
        }

        // Entries detached but kept alive for open handles are not
        // reachable from the root; sweep them as well.
        let pending: Vec<EntryId> = self.refs.iter().map(|r| r.id).collect();
        for id in pending {
            if self.arena.get(id).is_some() {
                self.free_entry(id);
                freed += 1;
            }
        }

        self.refs.clear();
        debug_assert_eq!(self.arena.live(), 0);
        debug_assert_eq!(self.current_size, 0);
        self.current_size = 0;
        freed
    }

    /// Independent audit walk: recompute what `current_size` must be by
    /// summing the footprint of every live entry, reachable or detached
    /// pending delete.
    pub(crate) fn recount(&self) -> u64 {
        let mut total = 0_u64;
        let mut stack: Vec<EntryId> = self.root.clone();
        while let Some(id) = stack.pop() {
            if let Some(entry) = self.arena.get(id) {
                total += entry.footprint(self.block_size);
                if let Some(dir) = entry.as_dir() {
                    stack.extend(dir.children.iter().copied());
                }
            }
        }
        // Detached-but-referenced entries stay charged until last close.
        for counter in &self.refs {
            if let Some(entry) = self.arena.get(counter.id) {
                if entry.pending_delete {
                    total += entry.footprint(self.block_size);
                }
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inner(quota: u64, block_size: u32) -> FsInner {
        FsInner::new(FsConfig::new(quota, block_size).unwrap())
    }

    #[test]
    fn add_entry_charges_quota() {
        let mut fs = inner(4096, 128);
        fs.mkdir("/a").unwrap();
        assert_eq!(fs.usage().used, entry_cost(1, EntryType::Directory));
        assert_eq!(fs.recount(), fs.usage().used);
    }

    #[test]
    fn add_entry_respects_quota() {
        // Quota too small for even one entry.
        let mut fs = inner(4, 128);
        assert_eq!(fs.mkdir("/a").unwrap_err(), RfsError::NoSpace);
        assert_eq!(fs.usage().used, 0);
    }

    #[test]
    fn traversal_through_file_is_not_directory() {
        let mut fs = inner(4096, 128);
        let h = fs
            .file_open("/f", OpenFlags::RDWR | OpenFlags::CREATE)
            .unwrap();
        fs.release(h.id);
        assert_eq!(
            fs.traverse("/f/x", None).unwrap_err(),
            RfsError::NotDirectory
        );
    }

    #[test]
    fn intermediate_components_are_never_created() {
        let mut fs = inner(4096, 128);
        let err = fs.traverse("/a/b", Some(EntryType::Directory)).unwrap_err();
        assert_eq!(err, RfsError::NoEntry);
        assert_eq!(fs.usage().used, 0);
        assert_eq!(fs.recount(), 0);
    }

    #[test]
    fn reference_counting_defers_free() {
        let mut fs = inner(4096, 128);
        let handle = fs
            .file_open("/f", OpenFlags::RDWR | OpenFlags::CREATE)
            .unwrap();
        let charged = fs.usage().used;

        fs.unlink("/f").unwrap();
        // Still charged: the open handle keeps the entry alive.
        assert_eq!(fs.usage().used, charged);
        assert_eq!(fs.recount(), charged);

        fs.release(handle.id);
        assert_eq!(fs.usage().used, 0);
        assert_eq!(fs.recount(), 0);
    }

    #[test]
    fn two_opens_one_close_keeps_entry() {
        let mut fs = inner(4096, 128);
        let first = fs
            .file_open("/f", OpenFlags::RDWR | OpenFlags::CREATE)
            .unwrap();
        let second = fs.file_open("/f", OpenFlags::RDONLY).unwrap();

        fs.unlink("/f").unwrap();
        fs.release(first.id);
        assert!(fs.usage().used > 0);

        fs.release(second.id);
        assert_eq!(fs.usage().used, 0);
    }

    #[test]
    fn blocks_grow_and_shrink_with_accounting() {
        let mut fs = inner(4096, 128);
        let h = fs
            .file_open("/f", OpenFlags::RDWR | OpenFlags::CREATE)
            .unwrap();
        let base = fs.usage().used;

        fs.add_block(h.id).unwrap();
        fs.add_block(h.id).unwrap();
        assert_eq!(fs.usage().used, base + 2 * block_cost(128));

        fs.remove_block(h.id).unwrap();
        assert_eq!(fs.usage().used, base + block_cost(128));
        fs.release(h.id);
    }

    #[test]
    fn add_block_fails_at_quota() {
        let quota = entry_cost(1, EntryType::File) + block_cost(128);
        let mut fs = inner(quota, 128);
        let h = fs
            .file_open("/f", OpenFlags::RDWR | OpenFlags::CREATE)
            .unwrap();
        fs.add_block(h.id).unwrap();
        assert_eq!(fs.add_block(h.id).unwrap_err(), RfsError::NoSpace);
        assert_eq!(fs.recount(), fs.usage().used);
        fs.release(h.id);
    }

    #[test]
    fn umount_sweep_ignores_references() {
        let mut fs = inner(8192, 128);
        fs.mkdir("/a").unwrap();
        fs.mkdir("/a/b").unwrap();
        let mut h = fs
            .file_open("/a/b/f", OpenFlags::RDWR | OpenFlags::CREATE)
            .unwrap();
        fs.write(&mut h, &[0xAB; 300]).unwrap();

        let freed = fs.umount_sweep();
        assert_eq!(freed, 3);
        assert_eq!(fs.usage().used, 0);
        assert_eq!(fs.recount(), 0);

        // The stale handle no longer resolves.
        let mut buf = [0_u8; 4];
        assert_eq!(fs.read(&mut h, &mut buf).unwrap_err(), RfsError::BadHandle);
    }

    #[test]
    fn umount_sweep_collects_pending_entries() {
        let mut fs = inner(4096, 128);
        let mut h = fs
            .file_open("/f", OpenFlags::RDWR | OpenFlags::CREATE)
            .unwrap();
        fs.write(&mut h, &[1_u8; 10]).unwrap();
        fs.unlink("/f").unwrap();

        let freed = fs.umount_sweep();
        assert_eq!(freed, 1);
        assert_eq!(fs.usage().used, 0);
    }
}
