pub mod config;
pub mod file;
pub mod page;

pub use config::VmConfig;
pub use file::{
    BackingStore, BufferManager, BufferStats, ElementValue, FileError, FileResult, HEADER_SIZE,
    PageId, SIGNATURE, SlotId,
};
pub use page::{DEFAULT_ELEMENTS_PER_PAGE, ELEMENT_SIZE, Page, PageLayout, get_bit, set_bit};
