//! Iterative worklist shared by every tree traversal.
//!
//! Tree depth never grows the call stack: walkers push pending items here and
//! loop until the list drains.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Visiting order of a [`Worklist`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Order {
    /// Last pushed is visited first.
    DepthFirst,
    /// First pushed is visited first.
    BreadthFirst,
}

/// Pending items of an iterative walk.
#[derive(Debug)]
pub(crate) struct Worklist<T> {
    items: VecDeque<T>,
    order: Order,
}

impl<T> Worklist<T> {
    pub(crate) fn depth_first(root: T) -> Self {
        Self::with_root(root, Order::DepthFirst)
    }

    pub(crate) fn breadth_first(root: T) -> Self {
        Self::with_root(root, Order::BreadthFirst)
    }

    fn with_root(root: T, order: Order) -> Self {
        let mut items = VecDeque::new();
        items.push_back(root);
        Self { items, order }
    }

    pub(crate) fn push(&mut self, item: T) {
        self.items.push_back(item);
    }

    pub(crate) fn pop(&mut self) -> Option<T> {
        match self.order {
            Order::DepthFirst => self.items.pop_back(),
            Order::BreadthFirst => self.items.pop_front(),
        }
    }

    /// Next item `pop` would return, mutably.
    pub(crate) fn peek_mut(&mut self) -> Option<&mut T> {
        match self.order {
            Order::DepthFirst => self.items.back_mut(),
            Order::BreadthFirst => self.items.front_mut(),
        }
    }
}

/// Entry kind as reported by `lstat` semantics (links are never followed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryKind {
    File,
    Dir,
    Other,
}

impl EntryKind {
    pub(crate) fn of(file_type: fs::FileType) -> Self {
        if file_type.is_file() {
            Self::File
        } else if file_type.is_dir() {
            Self::Dir
        } else {
            Self::Other
        }
    }

    /// Kind of `path` without following a final symlink.
    pub(crate) fn of_path(path: &Path) -> Option<Self> {
        fs::symlink_metadata(path)
            .ok()
            .map(|meta| Self::of(meta.file_type()))
    }
}

/// One directory child.
#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) name: OsString,
    pub(crate) path: PathBuf,
    pub(crate) kind: EntryKind,
}

/// Lists the children of `dir` in enumeration order (`.`/`..` excluded).
///
/// Children whose type cannot be determined are reported as
/// [`EntryKind::Other`].
pub(crate) fn read_entries(dir: &Path) -> io::Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let kind = entry
            .file_type()
            .map_or(EntryKind::Other, EntryKind::of);
        entries.push(Entry {
            name: entry.file_name(),
            path: entry.path(),
            kind,
        });
    }
    Ok(entries)
}
