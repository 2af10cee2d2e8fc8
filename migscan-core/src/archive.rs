//! Sequential, case-insensitive scanning of ZIP package entries.

use std::io::{Cursor, Read, Seek};
use zip::ZipArchive;

use crate::error::Result;

/// Upper bound on the buffer pre-allocated from an entry's declared size.
const MAX_PREALLOC: usize = 4 * 1024 * 1024;

/// Single-pass scanner over the entries of a ZIP archive, in archive order.
///
/// Entries are handed out one at a time through [`ArchiveScanner::next_entry`].
/// Once the scanner has moved past an entry it is not revisited; rescanning
/// requires opening a new scanner over the original bytes.
pub struct ArchiveScanner<R> {
    archive: ZipArchive<R>,
    next: usize,
}

impl<'a> ArchiveScanner<Cursor<&'a [u8]>> {
    /// Open a scanner over an in-memory archive.
    pub fn from_bytes(data: &'a [u8]) -> Result<Self> {
        Self::new(Cursor::new(data))
    }
}

impl<R: Read + Seek> ArchiveScanner<R> {
    /// Open a scanner over any seekable reader.
    ///
    /// Fails with [`crate::CodecError::MalformedArchive`] when the reader does
    /// not contain a ZIP central directory.
    pub fn new(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;
        log::trace!("opened archive with {} entries", archive.len());
        Ok(ArchiveScanner { archive, next: 0 })
    }

    /// Total number of entries in the archive.
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// Advance to the next entry, or `None` once the archive is exhausted.
    pub fn next_entry(&mut self) -> Option<Result<ArchiveEntry<'_, R>>> {
        if self.next >= self.archive.len() {
            return None;
        }
        let index = self.next;
        self.next += 1;

        let name = match self.archive.by_index_raw(index) {
            Ok(file) => file.name().to_owned(),
            Err(e) => return Some(Err(e.into())),
        };
        log::trace!("archive entry {}: {}", index, name);

        Some(Ok(ArchiveEntry {
            archive: &mut self.archive,
            index,
            name,
        }))
    }
}

/// One entry of an [`ArchiveScanner`]. Content is decompressed only when read.
pub struct ArchiveEntry<'s, R> {
    archive: &'s mut ZipArchive<R>,
    index: usize,
    name: String,
}

impl<'s, R: Read + Seek> ArchiveEntry<'s, R> {
    /// Entry name as stored in the archive.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// ASCII case-insensitive comparison against a part name.
    pub fn is_named(&self, part: &str) -> bool {
        self.name.eq_ignore_ascii_case(part)
    }

    /// True if the entry matches any of the given part names.
    pub fn is_any_of(&self, parts: &[&str]) -> bool {
        parts.iter().any(|p| self.is_named(p))
    }

    /// Decompress the entry into memory, consuming it.
    pub fn read_to_vec(self) -> Result<Vec<u8>> {
        let mut file = self.archive.by_index(self.index)?;
        let capacity = (file.size() as usize).min(MAX_PREALLOC);
        let mut buf = Vec::with_capacity(capacity);
        file.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Build an in-memory archive from (name, content) pairs, in order.
    pub fn zip_of(parts: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, content) in parts {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }
}
