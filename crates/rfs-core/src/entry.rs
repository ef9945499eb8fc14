//! Entry nodes: directories and files.
//!
//! Entries form a forest. Top-level entries hang off the volume's root
//! chain; every other entry is owned by exactly one parent directory's
//! child list. A file entry owns its block chain outright; blocks are
//! zero-initialized fixed-size chunks sized at mount.

use crate::arena::EntryId;
use rfs_types::{block_cost, entry_cost, EntryInfo, EntryType};

/// One fixed-size storage chunk.
pub(crate) type Block = Box<[u8]>;

/// File payload: the block chain plus the logical size in bytes.
///
/// The chain holds exactly `ceil(size / block_size)` blocks; an empty
/// file holds none.
#[derive(Debug, Default)]
pub(crate) struct FileNode {
    pub(crate) blocks: Vec<Block>,
    pub(crate) size: u64,
}

impl FileNode {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

/// Directory payload: child entries in insertion order.
#[derive(Debug, Default)]
pub(crate) struct DirNode {
    pub(crate) children: Vec<EntryId>,
}

#[derive(Debug)]
pub(crate) enum Payload {
    Directory(DirNode),
    File(FileNode),
}

#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) name: String,
    /// `None` means the entry sits on the volume's root chain.
    pub(crate) parent: Option<EntryId>,
    /// Detached from the tree while still referenced; freed on last release.
    pub(crate) pending_delete: bool,
    pub(crate) payload: Payload,
}

impl Entry {
    pub(crate) fn new_dir(name: &str, parent: Option<EntryId>) -> Self {
        Self {
            name: name.to_owned(),
            parent,
            pending_delete: false,
            payload: Payload::Directory(DirNode::default()),
        }
    }

    pub(crate) fn new_file(name: &str, parent: Option<EntryId>) -> Self {
        Self {
            name: name.to_owned(),
            parent,
            pending_delete: false,
            payload: Payload::File(FileNode::new()),
        }
    }

    pub(crate) fn kind(&self) -> EntryType {
        match self.payload {
            Payload::Directory(_) => EntryType::Directory,
            Payload::File(_) => EntryType::File,
        }
    }

    pub(crate) fn as_dir(&self) -> Option<&DirNode> {
        match &self.payload {
            Payload::Directory(dir) => Some(dir),
            Payload::File(_) => None,
        }
    }

    pub(crate) fn as_dir_mut(&mut self) -> Option<&mut DirNode> {
        match &mut self.payload {
            Payload::Directory(dir) => Some(dir),
            Payload::File(_) => None,
        }
    }

    pub(crate) fn as_file(&self) -> Option<&FileNode> {
        match &self.payload {
            Payload::File(file) => Some(file),
            Payload::Directory(_) => None,
        }
    }

    pub(crate) fn as_file_mut(&mut self) -> Option<&mut FileNode> {
        match &mut self.payload {
            Payload::File(file) => Some(file),
            Payload::Directory(_) => None,
        }
    }

    /// Total quota charge of this entry: base + name, header for files,
    /// and every block currently in the chain.
    pub(crate) fn footprint(&self, block_size: u32) -> u64 {
        let mut total = entry_cost(self.name.len(), self.kind());
        if let Payload::File(file) = &self.payload {
            total += file.blocks.len() as u64 * block_cost(block_size);
        }
        total
    }

    pub(crate) fn info(&self) -> EntryInfo {
        EntryInfo {
            name: self.name.clone(),
            kind: self.kind(),
            size: match &self.payload {
                Payload::File(file) => file.size,
                Payload::Directory(_) => 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfs_types::{ENTRY_BASE_COST, FILE_HEADER_COST};

    #[test]
    fn footprint_of_empty_file() {
        let entry = Entry::new_file("f", None);
        assert_eq!(entry.footprint(128), ENTRY_BASE_COST + 1 + FILE_HEADER_COST);
    }

    #[test]
    fn footprint_counts_blocks() {
        let mut entry = Entry::new_file("f", None);
        if let Some(file) = entry.as_file_mut() {
            file.blocks.push(vec![0_u8; 128].into_boxed_slice());
            file.blocks.push(vec![0_u8; 128].into_boxed_slice());
        }
        assert_eq!(
            entry.footprint(128),
            ENTRY_BASE_COST + 1 + FILE_HEADER_COST + 2 * block_cost(128)
        );
    }

    #[test]
    fn directory_info_reports_zero_size() {
        let entry = Entry::new_dir("d", None);
        let info = entry.info();
        assert_eq!(info.kind, EntryType::Directory);
        assert_eq!(info.size, 0);
        assert_eq!(info.name, "d");
    }
}
