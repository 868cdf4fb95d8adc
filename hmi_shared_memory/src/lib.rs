//! # HMI Shared Memory Tag Store
//!
//! Typed tag exchange over a fixed-layout POSIX shared memory region. Another
//! process (the producer) creates the region and publishes tag values; this
//! crate attaches to it, reads and writes individual tags under per-slot
//! spinlocks and supports a local-cache mode for batched synchronization.
//!
//! ## Features
//!
//! - **Attach only**: the region is never created here; a missing region is
//!   reported as [`ShmError::RegionNotFound`]
//! - **Exact layout**: region size must equal the size computed from the schema
//! - **Cross-process locking**: every slot starts with a 4-byte flag, taken
//!   with CAS `0 -> 1` and released with CAS `1 -> 0`
//! - **Optional region flag**: in sync mode a 4-byte flag at offset 0 guards
//!   bulk refresh/flush against per-slot access
//! - **Bounded locking**: [`LockPolicy`] can cap spinning by count or time
//!
//! ## Region Layout
//!
//! ```text
//! ┌───────────┬──────┬────────────┬──────┬────────────┬─────┐
//! │ sync flag │ lock │ tag 1 data │ lock │ tag 2 data │ ... │
//! │ (4, opt.) │ (4)  │ (size)     │ (4)  │ (size)     │     │
//! └───────────┴──────┴────────────┴──────┴────────────┴─────┘
//! ```
//!
//! Numerics are little-endian. Strings are UTF-8, NUL padded.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hmi_common::prelude::*;
//! use hmi_shared_memory::SharedVariableStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let specs = vec![
//!     TagSpec::new(1, "run", TagType::Bool),
//!     TagSpec::new(2, "speed", TagType::Float32),
//! ];
//! let schema = VariableSchema::from_specs("/hmi_tags", &specs);
//! let store = SharedVariableStore::open(&schema, "/hmi_tags", false)?;
//!
//! store.set("2:speed", &TagValue::from(12.5))?;
//! let running = store.get_tag(1, "run")?;
//! store.update("2:speed", |v| TagValue::from(v.as_number().unwrap_or(0.0) + 1.0))?;
//!
//! // Batched access
//! store.refresh_local_from_region()?;
//! store.set("1:run", &TagValue::from(true))?;
//! store.flush_local_to_region()?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod lock;
pub mod platform;
pub mod region;
pub mod store;

pub use error::{ShmError, ShmResult};
pub use lock::{LockPolicy, SlotGuard, SlotLock};
pub use region::{LockWord, SharedRegion};
pub use store::{SharedVariableStore, TagInfo};

/// Initialize tracing for tag store operations
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
