//! Tag region constants.
//!
//! These constants define the fixed layout parameters of the shared tag region.
//! They are the single source of truth - all other crates should import from here.

use static_assertions::const_assert_eq;

/// Size of the lock flag that prefixes every tag slot, in bytes.
///
/// The flag is a little-endian 32-bit integer: `0` = free, `1` = held.
pub const LOCK_HEADER_SIZE: usize = 4;

/// Size of the optional region-wide synchronization flag at offset 0.
///
/// Only present when the region is opened in sync mode.
pub const REGION_SYNC_FLAG_SIZE: usize = 4;

/// Default slot size for `string` tags that do not declare one.
pub const DEFAULT_STRING_SIZE: usize = 256;

/// Lock flag value for a free slot.
pub const LOCK_FREE: i32 = 0;

/// Lock flag value for a held slot.
pub const LOCK_HELD: i32 = 1;

/// Separator between id and name in a tag key (`"7:gp1_freq"`).
pub const TAG_KEY_SEPARATOR: char = ':';

const_assert_eq!(LOCK_HEADER_SIZE, core::mem::size_of::<i32>());
const_assert_eq!(REGION_SYNC_FLAG_SIZE, core::mem::size_of::<i32>());
