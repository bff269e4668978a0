use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::file::{FileError, FileResult, store_len};
use crate::page::{DEFAULT_ELEMENTS_PER_PAGE, ELEMENT_SIZE, PageLayout};

/// Default number of resident pages
pub const DEFAULT_BUFFER_SIZE: usize = 3;

/// Default logical array capacity in elements
pub const DEFAULT_ARRAY_SIZE: usize = 10000;

/// Default backing store path
pub const DEFAULT_STORE_PATH: &str = "vm.bin";

/// Construction parameters for a `BufferManager`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Number of page slots held in memory
    pub buffer_size: usize,
    /// Logical array capacity in elements
    pub array_size: usize,
    /// Elements per page, fixed once the store is created
    pub elements_per_page: usize,
    /// Backing store file
    pub path: PathBuf,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            array_size: DEFAULT_ARRAY_SIZE,
            elements_per_page: DEFAULT_ELEMENTS_PER_PAGE,
            path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

impl VmConfig {
    pub fn new<P: AsRef<Path>>(buffer_size: usize, array_size: usize, path: P) -> Self {
        Self {
            buffer_size,
            array_size,
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_array_size(mut self, array_size: usize) -> Self {
        self.array_size = array_size;
        self
    }

    pub fn with_elements_per_page(mut self, elements_per_page: usize) -> Self {
        self.elements_per_page = elements_per_page;
        self
    }

    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = path.as_ref().to_path_buf();
        self
    }

    pub fn layout(&self) -> PageLayout {
        PageLayout::new(self.elements_per_page)
    }

    /// Highest page index that element lookups accept
    pub fn max_page_index(&self) -> usize {
        self.array_size / self.elements_per_page
    }

    /// Number of page records the backing store holds.
    ///
    /// Covers the boundary page `max_page_index()` and never fewer pages
    /// than the buffer warm-starts with.
    pub fn page_count(&self) -> usize {
        self.max_page_index()
            .saturating_add(1)
            .max(self.buffer_size)
    }

    /// Reject parameters no buffer can be built from
    pub fn validate(&self) -> FileResult<()> {
        if self.buffer_size == 0 {
            return Err(FileError::InvalidConfig(
                "buffer_size must be at least 1".to_string(),
            ));
        }
        if self.elements_per_page == 0 {
            return Err(FileError::InvalidConfig(
                "elements_per_page must be at least 1".to_string(),
            ));
        }
        if self.array_size == 0 {
            return Err(FileError::InvalidConfig(
                "array_size must be at least 1".to_string(),
            ));
        }
        if self.elements_per_page.checked_mul(ELEMENT_SIZE + 1).is_none() {
            return Err(FileError::InvalidConfig(format!(
                "elements_per_page {} is too large",
                self.elements_per_page
            )));
        }
        if store_len(self.layout(), self.page_count()).is_none() {
            return Err(FileError::InvalidConfig(format!(
                "{} pages of {} bytes overflow the store size",
                self.page_count(),
                self.layout().size_on_disk()
            )));
        }
        Ok(())
    }

    pub fn load(config_path: &Path) -> FileResult<Self> {
        let content = fs::read_to_string(config_path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, config_path: &Path) -> FileResult<()> {
        let content = serde_json::to_string_pretty(&self)?;
        fs::write(config_path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = VmConfig::default();
        assert_eq!(config.buffer_size, 3);
        assert_eq!(config.array_size, 10000);
        assert_eq!(config.elements_per_page, 128);
        assert_eq!(config.path, PathBuf::from("vm.bin"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_page_count() {
        let config = VmConfig::new(3, 10112, "vm.bin");
        assert_eq!(config.max_page_index(), 79);
        assert_eq!(config.page_count(), 80);

        // Tiny arrays still get a full warm-start buffer on disk
        let tiny = VmConfig::new(4, 10, "vm.bin");
        assert_eq!(tiny.max_page_index(), 0);
        assert_eq!(tiny.page_count(), 4);
    }

    #[test]
    fn test_validate_rejects_zero() {
        let config = VmConfig::default().with_buffer_size(0);
        assert!(matches!(config.validate(), Err(FileError::InvalidConfig(_))));

        let config = VmConfig::default().with_elements_per_page(0);
        assert!(matches!(config.validate(), Err(FileError::InvalidConfig(_))));

        let config = VmConfig::default().with_array_size(0);
        assert!(matches!(config.validate(), Err(FileError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_oversized_store() {
        let config = VmConfig::default().with_array_size(usize::MAX);
        assert!(matches!(config.validate(), Err(FileError::InvalidConfig(_))));

        let config = VmConfig::default().with_buffer_size(usize::MAX);
        assert!(matches!(config.validate(), Err(FileError::InvalidConfig(_))));

        let config = VmConfig::default().with_elements_per_page(usize::MAX);
        assert!(matches!(config.validate(), Err(FileError::InvalidConfig(_))));

        let config = VmConfig::default()
            .with_array_size(usize::MAX)
            .with_elements_per_page(1);
        assert_eq!(config.page_count(), usize::MAX);
        assert!(matches!(config.validate(), Err(FileError::InvalidConfig(_))));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("vm.json");

        let config = VmConfig::new(5, 2048, temp_dir.path().join("store.bin"))
            .with_elements_per_page(64);
        config.save(&config_path).unwrap();

        let loaded = VmConfig::load(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_partial_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("vm.json");
        fs::write(&config_path, r#"{ "buffer_size": 8 }"#).unwrap();

        let loaded = VmConfig::load(&config_path).unwrap();
        assert_eq!(loaded.buffer_size, 8);
        assert_eq!(loaded.array_size, DEFAULT_ARRAY_SIZE);
    }

    #[test]
    fn test_load_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("vm.json");
        fs::write(&config_path, "not json").unwrap();

        let result = VmConfig::load(&config_path);
        assert!(matches!(result, Err(FileError::Config(_))));
    }
}
