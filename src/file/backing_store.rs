use log::info;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::error::{FileError, FileResult};
use super::{HEADER_SIZE, PageId, SIGNATURE};
use crate::page::PageLayout;

/// Exclusive handle to the on-disk page array
pub struct BackingStore {
    file: File,
    path: PathBuf,
    layout: PageLayout,
    page_count: usize,
}

impl BackingStore {
    /// Create a new store holding `page_count` zeroed pages
    pub fn create<P: AsRef<Path>>(
        path: P,
        layout: PageLayout,
        page_count: usize,
    ) -> FileResult<Self> {
        let path = path.as_ref();
        let len = Self::expected_len(layout, page_count)?;

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        file.write_all(&SIGNATURE)?;
        // set_len zero-fills the page area
        file.set_len(len)?;

        info!(
            "Created backing store {} with {} pages of {} bytes",
            path.display(),
            page_count,
            layout.size_on_disk()
        );

        Ok(Self {
            file,
            path: path.to_path_buf(),
            layout,
            page_count,
        })
    }

    /// Open an existing store, checking its signature and length
    pub fn open<P: AsRef<Path>>(
        path: P,
        layout: PageLayout,
        page_count: usize,
    ) -> FileResult<Self> {
        let path = path.as_ref();
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;

        let mut signature = [0u8; HEADER_SIZE];
        read_full(&mut file, &mut signature)?;
        if signature != SIGNATURE {
            return Err(FileError::InvalidSignature { found: signature });
        }

        let expected = Self::expected_len(layout, page_count)?;
        let actual = file.metadata()?.len();
        if actual < expected {
            return Err(FileError::Truncated {
                expected: expected as usize,
                actual: actual as usize,
            });
        }

        info!("Opened backing store {}", path.display());

        Ok(Self {
            file,
            path: path.to_path_buf(),
            layout,
            page_count,
        })
    }

    /// Open the store at `path`, creating it first if it is missing
    pub fn open_or_create<P: AsRef<Path>>(
        path: P,
        layout: PageLayout,
        page_count: usize,
    ) -> FileResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::open(path, layout, page_count)
        } else {
            Self::create(path, layout, page_count)
        }
    }

    fn expected_len(layout: PageLayout, page_count: usize) -> FileResult<u64> {
        store_len(layout, page_count).ok_or_else(|| {
            FileError::InvalidConfig(format!(
                "{} pages of {} bytes overflow the store size",
                page_count,
                layout.size_on_disk()
            ))
        })
    }

    fn page_offset(&self, page_id: PageId) -> u64 {
        (HEADER_SIZE + page_id * self.layout.size_on_disk()) as u64
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Read `count` consecutive page records starting at `first`
    pub fn read_pages(&mut self, first: PageId, count: usize) -> FileResult<Vec<u8>> {
        let mut buffer = vec![0u8; count * self.layout.size_on_disk()];
        self.file.seek(SeekFrom::Start(self.page_offset(first)))?;
        read_full(&mut self.file, &mut buffer)?;
        Ok(buffer)
    }

    /// Read one page record into `buffer`
    pub fn read_page(&mut self, page_id: PageId, buffer: &mut [u8]) -> FileResult<()> {
        let size = self.layout.size_on_disk();
        if buffer.len() != size {
            return Err(FileError::InvalidPageSize {
                expected: size,
                actual: buffer.len(),
            });
        }

        self.file.seek(SeekFrom::Start(self.page_offset(page_id)))?;
        read_full(&mut self.file, buffer)
    }

    /// Write a page record as `[bitmap][data]`
    pub fn write_page(&mut self, page_id: PageId, bitmap: &[u8], data: &[u8]) -> FileResult<()> {
        if bitmap.len() != self.layout.bitmap_len() || data.len() != self.layout.data_len() {
            return Err(FileError::InvalidPageSize {
                expected: self.layout.size_on_disk(),
                actual: bitmap.len() + data.len(),
            });
        }

        self.file.seek(SeekFrom::Start(self.page_offset(page_id)))?;
        self.file.write_all(bitmap)?;
        self.file.write_all(data)?;
        Ok(())
    }

    /// Flush OS buffers to disk
    pub fn sync(&mut self) -> FileResult<()> {
        self.file.sync_data()?;
        Ok(())
    }
}

/// Total store length in bytes, or `None` if it does not fit in `u64`
pub(crate) fn store_len(layout: PageLayout, page_count: usize) -> Option<u64> {
    let pages = (page_count as u64).checked_mul(layout.size_on_disk() as u64)?;
    pages.checked_add(HEADER_SIZE as u64)
}

/// Fill `buffer` completely, reporting a short file as truncation
fn read_full(file: &mut File, buffer: &mut [u8]) -> FileResult<()> {
    let mut filled = 0;
    while filled < buffer.len() {
        match file.read(&mut buffer[filled..]) {
            Ok(0) => {
                return Err(FileError::Truncated {
                    expected: buffer.len(),
                    actual: filled,
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
