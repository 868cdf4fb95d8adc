//! POSIX shared memory attach

use crate::error::{ShmError, ShmResult};
use memmap2::{MmapOptions, MmapRaw};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::mman::shm_open;
use nix::sys::stat::Mode;
use std::fs::File;

/// Normalize a region name to the `/name` form required by `shm_open`.
///
/// A single leading `/` is optional; any other `/` is rejected.
pub fn normalize_region_name(name: &str) -> ShmResult<String> {
    let bare = name.strip_prefix('/').unwrap_or(name);
    if bare.is_empty() || bare.contains('/') || bare.contains('\0') {
        return Err(ShmError::InvalidRegionName {
            name: name.to_string(),
        });
    }
    Ok(format!("/{bare}"))
}

/// Attach to an existing shared memory object of exactly `expected_size` bytes.
///
/// Never creates the object. The mapping is shared and read/write.
pub fn attach_region_mmap(name: &str, expected_size: usize) -> ShmResult<MmapRaw> {
    let shm_name = normalize_region_name(name)?;

    let fd = shm_open(shm_name.as_str(), OFlag::O_RDWR, Mode::empty()).map_err(|errno| match errno {
        Errno::ENOENT => ShmError::RegionNotFound {
            name: shm_name.clone(),
        },
        Errno::EACCES | Errno::EPERM => ShmError::PermissionDenied {
            name: shm_name.clone(),
        },
        Errno::EINVAL | Errno::ENAMETOOLONG => ShmError::InvalidRegionName {
            name: shm_name.clone(),
        },
        other => ShmError::Nix { source: other },
    })?;
    let file = File::from(fd);

    let actual = file.metadata()?.len() as usize;
    if actual != expected_size {
        return Err(ShmError::RegionSizeMismatch {
            name: shm_name,
            expected: expected_size,
            actual,
        });
    }

    let mmap = MmapOptions::new().len(expected_size).map_raw(&file)?;
    Ok(mmap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_region_name() {
        assert_eq!(normalize_region_name("hmi").unwrap(), "/hmi");
        assert_eq!(normalize_region_name("/hmi").unwrap(), "/hmi");
        assert!(matches!(
            normalize_region_name("/a/b"),
            Err(ShmError::InvalidRegionName { .. })
        ));
        assert!(normalize_region_name("/").is_err());
        assert!(normalize_region_name("").is_err());
    }

    #[test]
    fn test_attach_missing_region() {
        let name = format!("/hmi_missing_{}", std::process::id());
        assert!(matches!(
            attach_region_mmap(&name, 16),
            Err(ShmError::RegionNotFound { .. })
        ));
    }
}
