//! Cross-process spinlock over a region lock flag
//!
//! Acquire is a CAS `0 -> 1`, release a CAS `1 -> 0`. The same flag guards
//! readers and writers. The [`LockPolicy`] decides how long acquisition spins.

use crate::error::{ShmError, ShmResult};
use crate::region::{LockWord, SharedRegion};
use hmi_common::consts::{LOCK_FREE, LOCK_HELD};
use std::sync::atomic::Ordering;
use std::time::Instant;
use tracing::warn;

pub use hmi_common::config::LockPolicy;

impl LockWord<'_> {
    fn try_acquire(&self) -> bool {
        match self {
            LockWord::Word(word) => word
                .compare_exchange_weak(LOCK_FREE, LOCK_HELD, Ordering::Acquire, Ordering::Relaxed)
                .is_ok(),
            LockWord::Byte(byte) => byte
                .compare_exchange_weak(
                    LOCK_FREE as u8,
                    LOCK_HELD as u8,
                    Ordering::Acquire,
                    Ordering::Relaxed,
                )
                .is_ok(),
        }
    }

    fn release(&self) -> bool {
        match self {
            LockWord::Word(word) => word
                .compare_exchange(LOCK_HELD, LOCK_FREE, Ordering::Release, Ordering::Relaxed)
                .is_ok(),
            LockWord::Byte(byte) => byte
                .compare_exchange(
                    LOCK_HELD as u8,
                    LOCK_FREE as u8,
                    Ordering::Release,
                    Ordering::Relaxed,
                )
                .is_ok(),
        }
    }

    /// Whether the flag is currently held.
    pub fn is_held(&self) -> bool {
        match self {
            LockWord::Word(word) => word.load(Ordering::Acquire) != LOCK_FREE,
            LockWord::Byte(byte) => byte.load(Ordering::Acquire) != LOCK_FREE as u8,
        }
    }
}

/// Spinlock on the flag at a fixed region offset.
#[derive(Debug, Clone, Copy)]
pub struct SlotLock {
    offset: usize,
    policy: LockPolicy,
}

impl SlotLock {
    /// Lock on the flag at `offset`.
    pub fn new(offset: usize, policy: LockPolicy) -> Self {
        Self { offset, policy }
    }

    /// Offset of the lock flag.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Spin until the flag is acquired; released when the guard drops.
    pub fn acquire<'a>(&self, region: &'a SharedRegion) -> ShmResult<SlotGuard<'a>> {
        let word = region.lock_word(self.offset)?;
        self.spin(|| word.try_acquire())?;
        Ok(SlotGuard {
            word,
            offset: self.offset,
        })
    }

    /// Spin until the flag is observed free, without taking it.
    pub fn wait_clear(&self, region: &SharedRegion) -> ShmResult<()> {
        let word = region.lock_word(self.offset)?;
        self.spin(|| !word.is_held())
    }

    fn spin(&self, mut attempt: impl FnMut() -> bool) -> ShmResult<()> {
        let started = Instant::now();
        let mut spins: u64 = 0;
        loop {
            if attempt() {
                return Ok(());
            }
            spins += 1;
            let exhausted = match self.policy {
                LockPolicy::Unbounded => false,
                LockPolicy::Spins(max) => spins >= max,
                LockPolicy::Timeout(limit) => started.elapsed() >= limit,
            };
            if exhausted {
                return Err(ShmError::LockTimeout {
                    offset: self.offset,
                    spins,
                });
            }
            std::hint::spin_loop();
        }
    }
}

/// Held slot lock.
pub struct SlotGuard<'a> {
    word: LockWord<'a>,
    offset: usize,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        if !self.word.release() {
            warn!(offset = self.offset, "Lock flag was not held at release");
        }
    }
}
