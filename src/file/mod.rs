mod backing_store;
mod buffer_manager;
mod error;

pub use backing_store::BackingStore;
pub(crate) use backing_store::store_len;
pub use buffer_manager::{BufferManager, BufferStats, ElementValue};
pub use error::{FileError, FileResult};

/// Signature at the start of every backing store
pub const SIGNATURE: [u8; 2] = *b"VM";

/// Bytes before the first page record
pub const HEADER_SIZE: usize = SIGNATURE.len();

/// Absolute page number within the logical array
pub type PageId = usize;

/// Position of a page inside the buffer
pub type SlotId = usize;
