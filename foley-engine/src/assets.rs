//! Asset access abstraction.
//!
//! Game audio lives inside the game's own resource packs, so the engine
//! never touches the filesystem directly. [`AssetStore`] is the seam the
//! host supplies: [`DirStore`] reads loose files from a directory and
//! [`MemStore`] serves in-memory blobs, which the tests use.

use crate::{Error, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::PathBuf;

/// Readable handle on one asset, with the remaining byte count exposed
/// so streaming decoders know when the final chunk has been fed.
pub trait AssetReader: Read + Send {
    /// Bytes left to read.
    fn remaining(&self) -> u64;

    /// Total size of the asset in bytes.
    fn size(&self) -> u64;
}

/// Source of audio assets addressed by file name.
pub trait AssetStore: Send + Sync {
    /// Open an asset for incremental reading.
    fn open(&self, name: &str) -> Result<Box<dyn AssetReader>>;

    /// Read an entire asset into memory.
    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let mut reader = self.open(name)?;
        let mut data = Vec::with_capacity(reader.size() as usize);
        reader.read_to_end(&mut data)?;
        Ok(data)
    }

    /// True if the asset exists without opening it.
    fn exists(&self, name: &str) -> bool;
}

/// Asset store backed by loose files under a root directory.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

struct FileReader {
    file: File,
    size: u64,
    read: u64,
}

impl Read for FileReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.file.read(buf)?;
        self.read += n as u64;
        Ok(n)
    }
}

impl AssetReader for FileReader {
    fn remaining(&self) -> u64 {
        self.size.saturating_sub(self.read)
    }

    fn size(&self) -> u64 {
        self.size
    }
}

impl AssetStore for DirStore {
    fn open(&self, name: &str) -> Result<Box<dyn AssetReader>> {
        let path = self.root.join(name);
        let file = File::open(&path)
            .map_err(|e| Error::DecodeOpen(format!("cannot open {}: {e}", path.display())))?;
        let size = file.metadata()?.len();
        Ok(Box::new(FileReader {
            file,
            size,
            read: 0,
        }))
    }

    fn exists(&self, name: &str) -> bool {
        self.root.join(name).is_file()
    }
}

/// In-memory asset store. Populate it before sharing with the engine.
#[derive(Default)]
pub struct MemStore {
    files: HashMap<String, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.files.insert(name.into(), data);
    }
}

struct MemReader {
    cursor: Cursor<Vec<u8>>,
    size: u64,
}

impl Read for MemReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl AssetReader for MemReader {
    fn remaining(&self) -> u64 {
        self.size.saturating_sub(self.cursor.position())
    }

    fn size(&self) -> u64 {
        self.size
    }
}

impl AssetStore for MemStore {
    fn open(&self, name: &str) -> Result<Box<dyn AssetReader>> {
        let data = self
            .files
            .get(name)
            .ok_or_else(|| Error::DecodeOpen(format!("no such asset: {name}")))?
            .clone();
        let size = data.len() as u64;
        Ok(Box::new(MemReader {
            cursor: Cursor::new(data),
            size,
        }))
    }

    fn exists(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_store_reads_and_tracks_remaining() {
        let mut store = MemStore::new();
        store.insert("boom.wav", vec![1, 2, 3, 4, 5]);

        let mut reader = store.open("boom.wav").unwrap();
        assert_eq!(reader.size(), 5);

        let mut buf = [0u8; 3];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(reader.remaining(), 2);
        assert_eq!(&buf, &[1, 2, 3]);
    }

    #[test]
    fn missing_asset_is_a_decode_open_error() {
        let store = MemStore::new();
        assert!(!store.exists("ghost.ogg"));
        assert!(matches!(
            store.open("ghost.ogg"),
            Err(Error::DecodeOpen(_))
        ));
    }

    #[test]
    fn dir_store_round_trips_a_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hit.wav"), b"pcm").unwrap();

        let store = DirStore::new(dir.path());
        assert!(store.exists("hit.wav"));
        assert_eq!(store.read("hit.wav").unwrap(), b"pcm");
    }
}
