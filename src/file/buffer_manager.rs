use ahash::AHashMap;
use log::{debug, error};
use std::path::Path;

use super::backing_store::BackingStore;
use super::error::{FileError, FileResult};
use super::{PageId, SlotId};
use crate::config::VmConfig;
use crate::page::{Page, PageLayout};

/// Result of reading one element of the logical array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementValue {
    /// The element holds this value
    Found(i32),
    /// The element has never been written
    NotWritten,
}

impl ElementValue {
    pub fn value(self) -> Option<i32> {
        match self {
            ElementValue::Found(v) => Some(v),
            ElementValue::NotWritten => None,
        }
    }

    pub fn is_written(self) -> bool {
        matches!(self, ElementValue::Found(_))
    }
}

/// Counters describing buffer traffic since construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Dirty victims written back during eviction
    pub write_backs: u64,
}

/// Fixed-size page buffer over a `BackingStore` with least-recently-touched eviction
pub struct BufferManager {
    /// Underlying store, owned exclusively
    store: BackingStore,
    /// Exactly `buffer_size` resident pages
    pages: Vec<Page>,
    /// Resident page index -> slot in `pages`
    page_table: AHashMap<PageId, SlotId>,
    layout: PageLayout,
    array_size: usize,
    /// Logical clock for `last_touch` stamps
    clock: u64,
    stats: BufferStats,
    /// Set once the final flush has run
    released: bool,
}

impl BufferManager {
    /// Open a buffer manager with the default configuration
    pub fn new() -> FileResult<Self> {
        Self::open(&VmConfig::default())
    }

    /// Open (or create) the backing store and warm-start the buffer with
    /// pages `0..buffer_size`
    pub fn open(config: &VmConfig) -> FileResult<Self> {
        config.validate()?;

        let layout = config.layout();
        let mut store = BackingStore::open_or_create(&config.path, layout, config.page_count())?;

        // Warm-start pages arrive in one transfer and share the initial tick
        let bytes = store.read_pages(0, config.buffer_size)?;
        let mut pages = Vec::with_capacity(config.buffer_size);
        let mut page_table = AHashMap::with_capacity(config.buffer_size);
        for (slot, record) in bytes.chunks_exact(layout.size_on_disk()).enumerate() {
            pages.push(Page::from_record(slot, layout, record, 0)?);
            page_table.insert(slot, slot);
        }

        debug!(
            "Buffer warm-started with {} pages from {}",
            pages.len(),
            store.path().display()
        );

        Ok(Self {
            store,
            pages,
            page_table,
            layout,
            array_size: config.array_size,
            clock: 0,
            stats: BufferStats::default(),
            released: false,
        })
    }

    /// Run `f` against a freshly opened manager, always releasing it afterwards.
    ///
    /// An error from `f` takes precedence over an error from the final flush.
    pub fn scoped<T, F>(config: &VmConfig, f: F) -> FileResult<T>
    where
        F: FnOnce(&mut BufferManager) -> FileResult<T>,
    {
        let mut manager = Self::open(config)?;
        let result = f(&mut manager);
        let released = manager.close();
        let value = result?;
        released?;
        Ok(value)
    }

    fn next_tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Resolve the buffer slot holding the page of `element_index`, loading
    /// the page on a miss. Returns `None` when the page lies beyond the
    /// array capacity.
    pub fn find_page(&mut self, element_index: usize) -> FileResult<Option<SlotId>> {
        let page_index = self.page_index_of(element_index);
        if page_index > self.max_page_index() {
            return Ok(None);
        }

        let tick = self.next_tick();

        if let Some(&slot) = self.page_table.get(&page_index) {
            self.pages[slot].touch(tick);
            self.stats.hits += 1;
            return Ok(Some(slot));
        }

        self.stats.misses += 1;
        let victim = self.select_victim();
        self.replace_page(victim, page_index, tick)?;
        Ok(Some(victim))
    }

    /// Slot with the oldest `last_touch`; the lowest slot wins ties
    fn select_victim(&self) -> SlotId {
        self.pages
            .iter()
            .enumerate()
            .min_by_key(|(_, page)| page.last_touch())
            .map(|(slot, _)| slot)
            .unwrap_or(0)
    }

    /// Write back the victim if dirty, then load `page_index` into its slot.
    ///
    /// If the load fails the slot keeps the old page, already persisted.
    fn replace_page(&mut self, slot: SlotId, page_index: PageId, tick: u64) -> FileResult<()> {
        let victim_index = self.pages[slot].index();

        if self.pages[slot].is_dirty() {
            debug!("Writing back dirty page {} from slot {}", victim_index, slot);
            self.save_page(slot)?;
            self.stats.write_backs += 1;
        }

        let mut record = vec![0u8; self.layout.size_on_disk()];
        self.store.read_page(page_index, &mut record)?;
        let page = Page::from_record(page_index, self.layout, &record, tick)?;

        self.pages[slot] = page;
        self.page_table.remove(&victim_index);
        self.page_table.insert(page_index, slot);
        self.stats.evictions += 1;

        debug!(
            "Evicted page {} from slot {}, loaded page {}",
            victim_index, slot, page_index
        );

        Ok(())
    }

    /// Read one element. `NotWritten` is a normal outcome, out-of-range
    /// indices are an error.
    pub fn read_value(&mut self, element_index: usize) -> FileResult<ElementValue> {
        let slot = self
            .find_page(element_index)?
            .ok_or(FileError::OutOfRange {
                index: element_index,
            })?;

        let on_page_index = element_index % self.layout.elements_per_page();
        Ok(match self.pages[slot].read_slot(on_page_index) {
            Some(value) => ElementValue::Found(value),
            None => ElementValue::NotWritten,
        })
    }

    /// Write one element, marking its page dirty
    pub fn write_value(&mut self, value: i32, element_index: usize) -> FileResult<()> {
        let slot = self
            .find_page(element_index)?
            .ok_or(FileError::OutOfRange {
                index: element_index,
            })?;

        let on_page_index = element_index % self.layout.elements_per_page();
        self.pages[slot].write_slot(on_page_index, value);
        Ok(())
    }

    /// Write the page in `slot` to its place in the store, dirty or not
    pub fn save_page(&mut self, slot: SlotId) -> FileResult<()> {
        let page = self.pages.get(slot).ok_or(FileError::InvalidSlot(slot))?;
        self.store
            .write_page(page.index(), page.bitmap(), page.data())?;
        self.pages[slot].mark_clean();
        Ok(())
    }

    /// Indexed read
    pub fn get(&mut self, index: usize) -> FileResult<ElementValue> {
        self.read_value(index)
    }

    /// Indexed write. Assigning no value is rejected before any state changes.
    pub fn set(&mut self, index: usize, value: Option<i32>) -> FileResult<()> {
        let value = value.ok_or(FileError::InvalidAssignment { index })?;
        self.write_value(value, index)
    }

    /// Save every slot and sync the store; the manager stays usable.
    ///
    /// A failing slot does not stop the remaining slots from being saved;
    /// the first error is returned.
    pub fn flush_all(&mut self) -> FileResult<()> {
        let mut first_error = None;
        for slot in 0..self.pages.len() {
            if let Err(e) = self.save_page(slot) {
                error!(
                    "Failed to save page {} from slot {}: {}",
                    self.pages[slot].index(),
                    slot,
                    e
                );
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        let synced = self.store.sync();
        match first_error {
            Some(e) => Err(e),
            None => synced,
        }
    }

    /// Flush every resident page and release the store
    pub fn close(mut self) -> FileResult<()> {
        self.release()
    }

    fn release(&mut self) -> FileResult<()> {
        if self.released {
            return Ok(());
        }
        // Marked first so a failed flush is not retried from Drop
        self.released = true;
        self.flush_all()
    }

    pub fn page_index_of(&self, element_index: usize) -> PageId {
        element_index / self.layout.elements_per_page()
    }

    fn max_page_index(&self) -> PageId {
        self.array_size / self.layout.elements_per_page()
    }

    pub fn buffer_size(&self) -> usize {
        self.pages.len()
    }

    pub fn array_size(&self) -> usize {
        self.array_size
    }

    pub fn layout(&self) -> PageLayout {
        self.layout
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    pub fn page(&self, slot: SlotId) -> Option<&Page> {
        self.pages.get(slot)
    }

    /// Page index held by each slot, in slot order
    pub fn resident_pages(&self) -> Vec<PageId> {
        self.pages.iter().map(Page::index).collect()
    }

    pub fn is_page_resident(&self, page_index: PageId) -> bool {
        self.page_table.contains_key(&page_index)
    }

    pub fn dirty_page_count(&self) -> usize {
        self.pages.iter().filter(|p| p.is_dirty()).count()
    }

    pub fn stats(&self) -> BufferStats {
        self.stats
    }
}

impl Drop for BufferManager {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            error!(
                "Failed to flush buffer to {}: {}",
                self.store.path().display(),
                e
            );
        }
    }
}
