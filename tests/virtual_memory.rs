//! End-to-end tests for the buffer manager over a real backing store.

use tempfile::TempDir;
use vmem::{BufferManager, ElementValue, FileError, HEADER_SIZE, VmConfig};

fn setup_config() -> (TempDir, VmConfig) {
    let temp_dir = TempDir::new().unwrap();
    let config = VmConfig::new(3, 10112, temp_dir.path().join("vm.bin"));
    (temp_dir, config)
}

#[test]
fn test_demo_scenario() {
    let (_temp, config) = setup_config();

    let mut bm = BufferManager::open(&config).unwrap();
    assert_eq!(bm.layout().elements_per_page(), 128);

    bm.set(0, Some(3)).unwrap();
    bm.set(200, Some(5)).unwrap();
    bm.set(640, Some(10)).unwrap();

    assert_eq!(bm.get(0).unwrap(), ElementValue::Found(3));
    assert_eq!(bm.get(200).unwrap(), ElementValue::Found(5));
    assert_eq!(bm.get(640).unwrap(), ElementValue::Found(10));
    assert_eq!(bm.get(1).unwrap(), ElementValue::NotWritten);

    for slot in 0..bm.buffer_size() {
        bm.save_page(slot).unwrap();
    }
    bm.close().unwrap();

    let mut bm = BufferManager::open(&config).unwrap();
    assert_eq!(bm.get(0).unwrap(), ElementValue::Found(3));
    assert_eq!(bm.get(200).unwrap(), ElementValue::Found(5));
    assert_eq!(bm.get(640).unwrap(), ElementValue::Found(10));
    assert_eq!(bm.get(1).unwrap(), ElementValue::NotWritten);
}

#[test]
fn test_round_trip_across_many_pages() {
    let (_temp, config) = setup_config();

    let indices: Vec<usize> = (0..10112).step_by(97).collect();
    {
        let mut bm = BufferManager::open(&config).unwrap();
        for &i in &indices {
            bm.set(i, Some(i as i32 * -3)).unwrap();
            assert_eq!(bm.get(i).unwrap(), ElementValue::Found(i as i32 * -3));
        }
        assert_eq!(bm.resident_pages().len(), 3);
        assert!(bm.stats().write_backs > 0);
    }

    let mut bm = BufferManager::open(&config).unwrap();
    for &i in &indices {
        assert_eq!(bm.get(i).unwrap(), ElementValue::Found(i as i32 * -3));
    }
    assert_eq!(bm.get(1).unwrap(), ElementValue::NotWritten);
}

#[test]
fn test_out_of_range_reported() {
    let (_temp, config) = setup_config();
    let mut bm = BufferManager::open(&config).unwrap();

    assert!(matches!(bm.get(20000), Err(FileError::OutOfRange { .. })));
    assert!(matches!(
        bm.set(20000, Some(1)),
        Err(FileError::OutOfRange { .. })
    ));
    assert_eq!(bm.resident_pages(), vec![0, 1, 2]);
}

#[test]
fn test_store_layout_on_disk() {
    let (_temp, config) = setup_config();

    BufferManager::scoped(&config, |bm| bm.set(129, Some(0x0102_0304))).unwrap();

    let bytes = std::fs::read(&config.path).unwrap();
    assert_eq!(&bytes[..2], b"VM");
    assert_eq!(bytes.len(), HEADER_SIZE + 80 * 528);

    let page = &bytes[HEADER_SIZE + 528..HEADER_SIZE + 2 * 528];
    assert_eq!(page[0], 0b0000_0010);
    assert_eq!(&page[16 + 4..16 + 8], &[0x04, 0x03, 0x02, 0x01]);
}

#[test]
fn test_reopen_rejects_bad_signature() {
    let (_temp, config) = setup_config();
    BufferManager::open(&config).unwrap().close().unwrap();

    let mut bytes = std::fs::read(&config.path).unwrap();
    bytes[0] = b'X';
    std::fs::write(&config.path, &bytes).unwrap();

    let result = BufferManager::open(&config);
    assert!(matches!(result, Err(FileError::InvalidSignature { .. })));
}

#[test]
fn test_reopen_rejects_truncated_store() {
    let (_temp, config) = setup_config();
    BufferManager::open(&config).unwrap().close().unwrap();

    let bytes = std::fs::read(&config.path).unwrap();
    std::fs::write(&config.path, &bytes[..HEADER_SIZE + 2 * 528]).unwrap();

    let result = BufferManager::open(&config);
    assert!(matches!(result, Err(FileError::Truncated { .. })));
}

#[test]
fn test_small_array_still_fills_buffer() {
    let temp_dir = TempDir::new().unwrap();
    let config = VmConfig::new(4, 10, temp_dir.path().join("vm.bin"));

    let mut bm = BufferManager::open(&config).unwrap();
    assert_eq!(bm.resident_pages(), vec![0, 1, 2, 3]);

    bm.set(9, Some(1)).unwrap();
    assert_eq!(bm.get(9).unwrap(), ElementValue::Found(1));
    assert!(matches!(bm.get(128), Err(FileError::OutOfRange { .. })));
}

#[test]
fn test_custom_page_size() {
    let temp_dir = TempDir::new().unwrap();
    let config = VmConfig::new(2, 1000, temp_dir.path().join("vm.bin")).with_elements_per_page(10);

    BufferManager::scoped(&config, |bm| {
        for i in (0..1000).step_by(7) {
            bm.set(i, Some(i as i32))?;
        }
        Ok(())
    })
    .unwrap();

    let bytes = std::fs::read(&config.path).unwrap();
    assert_eq!(bytes.len(), HEADER_SIZE + 101 * 42);

    BufferManager::scoped(&config, |bm| {
        for i in 0..1000 {
            let expected = if i % 7 == 0 {
                ElementValue::Found(i as i32)
            } else {
                ElementValue::NotWritten
            };
            assert_eq!(bm.get(i)?, expected);
        }
        Ok(())
    })
    .unwrap();
}
