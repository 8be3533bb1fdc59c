//! iterators over the files of an archive

use std::slice;

use super::{
    Archive,
    entry::{Entry, FileEntry},
};

/// iterator over every file of an archive, in index order
#[derive(Clone)]
pub struct Entries<'a> {
    archive: &'a Archive,
    inner: slice::Iter<'a, Entry>,
}

impl<'a> Entries<'a> {
    pub(super) fn new(archive: &'a Archive) -> Self {
        Self {
            archive,
            inner: archive.index.entries().iter(),
        }
    }
}

impl<'a> Iterator for Entries<'a> {
    type Item = FileEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.inner.next()?;
        Some(FileEntry {
            archive: self.archive,
            entry,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Entries<'_> {}

impl DoubleEndedIterator for Entries<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let entry = self.inner.next_back()?;
        Some(FileEntry {
            archive: self.archive,
            entry,
        })
    }
}
