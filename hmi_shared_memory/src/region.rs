//! Mapped shared region with bounds-checked access

use crate::error::{ShmError, ShmResult};
use crate::platform::{attach_region_mmap, normalize_region_name};
use memmap2::MmapRaw;
use std::sync::atomic::{AtomicI32, AtomicU8};
use tracing::debug;

/// Atomic view of a 4-byte lock flag inside the region.
///
/// Slots are packed, so a flag may start at an unaligned offset. Aligned
/// flags use a 32-bit atomic. Unaligned flags use an atomic on the low byte,
/// which carries the whole state since the flag only holds `0` or `1`
/// little-endian.
#[derive(Debug, Clone, Copy)]
pub enum LockWord<'a> {
    /// 4-byte aligned flag
    Word(&'a AtomicI32),
    /// Low byte of an unaligned flag
    Byte(&'a AtomicU8),
}

/// An attached, fixed-size shared memory region.
pub struct SharedRegion {
    name: String,
    mmap: MmapRaw,
}

impl SharedRegion {
    /// Attach to an existing region of exactly `size` bytes.
    pub fn attach(name: &str, size: usize) -> ShmResult<Self> {
        let name = normalize_region_name(name)?;
        let mmap = attach_region_mmap(&name, size)?;
        debug!(region = %name, size, "Region mapped");
        Ok(Self { name, mmap })
    }

    /// Normalized region name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mapped size in bytes.
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Whether the mapping is empty.
    pub fn is_empty(&self) -> bool {
        self.mmap.len() == 0
    }

    fn check(&self, offset: usize, len: usize) -> ShmResult<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len() => Ok(()),
            _ => Err(ShmError::OutOfBounds {
                offset,
                len,
                size: self.len(),
            }),
        }
    }

    /// Copy `buf.len()` bytes starting at `offset` into `buf`.
    pub fn read_bytes(&self, offset: usize, buf: &mut [u8]) -> ShmResult<()> {
        self.check(offset, buf.len())?;
        // SAFETY: range checked above; the mapping outlives `self`.
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.mmap.as_ptr().add(offset),
                buf.as_mut_ptr(),
                buf.len(),
            );
        }
        Ok(())
    }

    /// Copy `data` into the region starting at `offset`.
    pub fn write_bytes(&self, offset: usize, data: &[u8]) -> ShmResult<()> {
        self.check(offset, data.len())?;
        // SAFETY: range checked above; the mapping is shared read/write.
        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                self.mmap.as_mut_ptr().add(offset),
                data.len(),
            );
        }
        Ok(())
    }

    /// Atomic view of the 4-byte lock flag at `offset`.
    pub fn lock_word(&self, offset: usize) -> ShmResult<LockWord<'_>> {
        self.check(offset, hmi_common::consts::LOCK_HEADER_SIZE)?;
        // SAFETY: range checked above. Atomics are only formed over properly
        // aligned addresses, and every access to lock flags goes through them.
        unsafe {
            let ptr = self.mmap.as_mut_ptr().add(offset);
            if (ptr as usize) % std::mem::align_of::<AtomicI32>() == 0 {
                Ok(LockWord::Word(AtomicI32::from_ptr(ptr.cast::<i32>())))
            } else {
                Ok(LockWord::Byte(AtomicU8::from_ptr(ptr)))
            }
        }
    }
}

impl std::fmt::Debug for SharedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRegion")
            .field("name", &self.name)
            .field("len", &self.len())
            .finish()
    }
}
