use crate::iter::{read_blocks, BlkScanner, ScanOptions};
use crate::parser::cursor::FieldStore;
use crate::parser::block::Block;
use crate::parser::errors::OpResult;
use log::info;
use std::fmt;
use std::fs;
#[cfg(feature = "mmap")]
use std::fs::File;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

enum Backing {
    Heap(Vec<u8>),
    #[cfg(feature = "mmap")]
    Mapped(memmap::Mmap),
}

impl Backing {
    #[inline]
    fn as_slice(&self) -> &[u8] {
        match self {
            Backing::Heap(bytes) => bytes.as_slice(),
            #[cfg(feature = "mmap")]
            Backing::Mapped(map) => &map[..],
        }
    }
}

///
/// Read-only contents of one blk file.
///
/// Clones share the same bytes, so lazily decoded blocks can be
/// resolved from any clone, on any thread.
///
#[derive(Clone)]
pub struct BlkBuffer {
    inner: Arc<Backing>,
}

impl BlkBuffer {
    pub fn is_mapped(&self) -> bool {
        match *self.inner {
            Backing::Heap(_) => false,
            #[cfg(feature = "mmap")]
            Backing::Mapped(_) => true,
        }
    }

    /// iterate over the blocks of this buffer
    pub fn scan<S: FieldStore>(&self, options: ScanOptions) -> BlkScanner<'_, S> {
        BlkScanner::new(self, options)
    }

    /// decode all blocks of this buffer
    pub fn read_blocks<S: FieldStore>(&self, options: &ScanOptions) -> OpResult<Vec<Block<S>>> {
        read_blocks(self, options)
    }
}

impl Deref for BlkBuffer {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.inner.as_slice()
    }
}

impl AsRef<[u8]> for BlkBuffer {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.inner.as_slice()
    }
}

impl From<Vec<u8>> for BlkBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        BlkBuffer {
            inner: Arc::new(Backing::Heap(bytes)),
        }
    }
}

impl fmt::Debug for BlkBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlkBuffer")
            .field("len", &self.len())
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

/// Location of a raw blk file
#[derive(Debug, Clone)]
pub struct BlkFile {
    path: PathBuf,
}

impl BlkFile {
    pub fn new(path: &Path) -> BlkFile {
        BlkFile {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file into memory.
    pub fn open(&self) -> OpResult<BlkBuffer> {
        let bytes = fs::read(&self.path)?;
        info!("Read {} bytes from {}", bytes.len(), self.path.display());
        Ok(BlkBuffer::from(bytes))
    }

    ///
    /// Memory-map the file.
    ///
    /// The file must not be modified while the map is alive,
    /// Bitcoin Core only appends to the last blk file.
    ///
    #[cfg(feature = "mmap")]
    pub fn map(&self) -> OpResult<BlkBuffer> {
        let file = File::open(&self.path)?;
        if file.metadata()?.len() == 0 {
            // empty maps are rejected by the OS
            return Ok(BlkBuffer::from(Vec::new()));
        }
        let map = unsafe { memmap::Mmap::map(&file)? };
        info!("Mapped {} bytes from {}", map.len(), self.path.display());
        Ok(BlkBuffer {
            inner: Arc::new(Backing::Mapped(map)),
        })
    }
}
