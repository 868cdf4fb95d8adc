//! Platform-specific region access

#[cfg(unix)]
mod linux;

#[cfg(unix)]
pub use linux::{attach_region_mmap, normalize_region_name};
