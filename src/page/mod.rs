mod bitmap;
mod page;

pub use bitmap::{get_bit, set_bit};
pub use page::{Page, PageLayout};

/// Default number of `i32` elements per page (512-byte payload)
pub const DEFAULT_ELEMENTS_PER_PAGE: usize = 512 / ELEMENT_SIZE;

/// Size of one element on disk in bytes
pub const ELEMENT_SIZE: usize = std::mem::size_of::<i32>();
