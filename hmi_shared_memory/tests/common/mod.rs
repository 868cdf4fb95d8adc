//! Producer-side helpers for integration tests.
//!
//! The store never creates regions, so tests play the producer: create a
//! POSIX shared memory object of the layout size and unlink it on drop.

#![allow(dead_code)]

use hmi_common::schema::VariableSchema;
use memmap2::{MmapMut, MmapOptions};
use nix::fcntl::OFlag;
use nix::sys::mman::{shm_open, shm_unlink};
use nix::sys::stat::Mode;
use std::fs::File;
use std::sync::atomic::{AtomicUsize, Ordering};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Unique region name for this process and call site.
pub fn unique_name(prefix: &str) -> String {
    format!(
        "/{}_{}_{}",
        prefix,
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

/// A region created by the test acting as producer.
pub struct TestRegion {
    pub name: String,
    map: MmapMut,
}

impl TestRegion {
    /// Create a zeroed region of `size` bytes.
    pub fn create(name: &str, size: usize) -> Self {
        let fd = shm_open(
            name,
            OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR,
            Mode::S_IRUSR | Mode::S_IWUSR,
        )
        .unwrap();
        let file = File::from(fd);
        file.set_len(size as u64).unwrap();
        let map = unsafe { MmapOptions::new().len(size).map_mut(&file).unwrap() };
        Self {
            name: name.to_string(),
            map,
        }
    }

    /// Create a region sized for `schema`.
    pub fn for_schema(schema: &VariableSchema, sync_mode: bool) -> Self {
        Self::create(schema.region_name(), schema.layout(sync_mode).unwrap().total_size)
    }

    /// Raw bytes as seen by the producer.
    pub fn bytes(&self) -> &[u8] {
        &self.map[..]
    }

    /// Overwrite raw bytes.
    pub fn write(&mut self, offset: usize, data: &[u8]) {
        self.map[offset..offset + data.len()].copy_from_slice(data);
    }
}

impl Drop for TestRegion {
    fn drop(&mut self) {
        let _ = shm_unlink(self.name.as_str());
    }
}
