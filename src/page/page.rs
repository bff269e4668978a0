use super::bitmap::{get_bit, set_bit};
use super::ELEMENT_SIZE;
use crate::file::{FileError, FileResult, PageId};

/// Geometry of a page record, fixed for the lifetime of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    elements_per_page: usize,
}

impl PageLayout {
    pub fn new(elements_per_page: usize) -> Self {
        Self { elements_per_page }
    }

    pub fn elements_per_page(&self) -> usize {
        self.elements_per_page
    }

    /// Bitmap bytes per page: one bit per element, rounded up
    pub fn bitmap_len(&self) -> usize {
        self.elements_per_page.div_ceil(8)
    }

    pub fn data_len(&self) -> usize {
        self.elements_per_page * ELEMENT_SIZE
    }

    /// Bytes one page occupies in the backing store
    pub fn size_on_disk(&self) -> usize {
        self.bitmap_len() + self.data_len()
    }
}

/// A page resident in the buffer
#[derive(Debug, Clone)]
pub struct Page {
    index: PageId,
    bitmap: Vec<u8>,
    data: Vec<u8>,
    dirty: bool,
    last_touch: u64,
}

impl Page {
    /// Create an empty page stamped with `tick`
    pub fn new(index: PageId, layout: PageLayout, tick: u64) -> Self {
        Self {
            index,
            bitmap: vec![0u8; layout.bitmap_len()],
            data: vec![0u8; layout.data_len()],
            dirty: false,
            last_touch: tick,
        }
    }

    /// Build a clean page from an on-disk `[bitmap][data]` record
    pub fn from_record(
        index: PageId,
        layout: PageLayout,
        record: &[u8],
        tick: u64,
    ) -> FileResult<Self> {
        if record.len() != layout.size_on_disk() {
            return Err(FileError::InvalidPageSize {
                expected: layout.size_on_disk(),
                actual: record.len(),
            });
        }

        let mut page = Self::new(index, layout, tick);
        let (bitmap, data) = record.split_at(layout.bitmap_len());
        page.bitmap.copy_from_slice(bitmap);
        page.data.copy_from_slice(data);
        Ok(page)
    }

    pub fn index(&self) -> PageId {
        self.index
    }

    pub fn bitmap(&self) -> &[u8] {
        &self.bitmap
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn last_touch(&self) -> u64 {
        self.last_touch
    }

    pub fn touch(&mut self, tick: u64) {
        self.last_touch = tick;
    }

    /// Whether the element at `slot` has been written at least once
    pub fn is_written(&self, slot: usize) -> bool {
        get_bit(&self.bitmap, slot)
    }

    /// Value at `slot`, or `None` if it was never written
    pub fn read_slot(&self, slot: usize) -> Option<i32> {
        if !self.is_written(slot) {
            return None;
        }

        let start = slot * ELEMENT_SIZE;
        let bytes = &self.data[start..start + ELEMENT_SIZE];
        Some(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Store `value` at `slot`, marking it written and the page dirty
    pub fn write_slot(&mut self, slot: usize, value: i32) {
        let start = slot * ELEMENT_SIZE;
        self.data[start..start + ELEMENT_SIZE].copy_from_slice(&value.to_le_bytes());
        set_bit(&mut self.bitmap, slot, true);
        self.dirty = true;
    }
}
