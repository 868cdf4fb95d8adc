//! Typed tag store over an attached shared region
//!
//! [`SharedVariableStore`] maps every tag of a [`VariableSchema`] to a slot
//! in a region created by another process. Access to a slot is serialized by
//! the slot's lock flag, which other processes honor as well.
//!
//! # Modes
//!
//! - **Write-through** (default): `get` reads the slot, `set` writes it.
//! - **Local cache**: entered by [`SharedVariableStore::refresh_local_from_region`].
//!   `get`/`set` touch only the local copy; changed slots are written back by
//!   [`SharedVariableStore::flush_local_to_region`], which returns to
//!   write-through mode.
//!
//! # Lock Order
//!
//! When sync mode is enabled the region-wide flag at offset 0 is taken before
//! any slot flag. Slot operations never wait for the region flag while holding
//! a slot flag.
//!
//! The mode is held in a lock of its own: `get`/`set`/`update` hold it shared
//! for their whole run, bulk synchronization holds it exclusively. A write
//! therefore lands entirely on one side of a mode switch.

use crate::codec;
use crate::error::{ShmError, ShmResult};
use crate::lock::{LockPolicy, SlotLock};
use crate::region::SharedRegion;
use hmi_common::config::TagExchangeConfig;
use hmi_common::schema::{SlotLayout, VariableSchema, tag_key};
use hmi_common::value::{TagType, TagValue};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Layout information about one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagInfo {
    /// Numeric tag id
    pub id: u32,
    /// Tag name
    pub name: String,
    /// Wire type
    #[serde(rename = "type")]
    pub tag_type: TagType,
    /// Data size in bytes
    pub size: usize,
    /// Offset of the lock flag
    pub lock_offset: usize,
    /// Offset of the data bytes
    pub data_offset: usize,
}

#[derive(Debug)]
struct SlotState {
    value: TagValue,
    changed: bool,
}

#[derive(Debug)]
struct Slot {
    key: String,
    layout: SlotLayout,
    lock: SlotLock,
    state: Mutex<SlotState>,
}

impl Slot {
    fn tag_type(&self) -> TagType {
        self.layout.descriptor.tag_type
    }

    fn encode(&self, value: &TagValue) -> ShmResult<(TagValue, Vec<u8>)> {
        let tag_type = self.tag_type();
        let encoding_error = |source| ShmError::EncodingError {
            key: self.key.clone(),
            tag_type,
            source,
        };
        let coerced = value.coerce(tag_type).map_err(encoding_error)?;
        let bytes = codec::encode(tag_type, self.layout.size(), &coerced).map_err(encoding_error)?;
        // Re-decode so the cached value reflects truncation (strings).
        Ok((codec::decode(tag_type, &bytes), bytes))
    }

    /// Read the slot; the caller holds the slot lock.
    fn read_locked(&self, region: &SharedRegion) -> ShmResult<TagValue> {
        let mut buf = vec![0u8; self.layout.size()];
        region.read_bytes(self.layout.data_offset, &mut buf)?;
        Ok(codec::decode(self.tag_type(), &buf))
    }

    fn read(&self, region: &SharedRegion) -> ShmResult<TagValue> {
        let _guard = self.lock.acquire(region)?;
        self.read_locked(region)
    }

    fn write(&self, region: &SharedRegion, bytes: &[u8]) -> ShmResult<()> {
        let _guard = self.lock.acquire(region)?;
        region.write_bytes(self.layout.data_offset, bytes)
    }
}

/// Tag store attached to an externally created shared region.
///
/// `Send + Sync`; share it behind an `Arc`.
#[derive(Debug)]
pub struct SharedVariableStore {
    region_name: String,
    size: usize,
    policy: LockPolicy,
    sync_lock: Option<SlotLock>,
    region: RwLock<Option<SharedRegion>>,
    slots: Vec<Slot>,
    index: HashMap<String, usize>,
    /// `true` while in local-cache mode.
    local_mode: RwLock<bool>,
}

impl SharedVariableStore {
    /// Attach to `region_name` with the unbounded lock policy.
    pub fn open(schema: &VariableSchema, region_name: &str, sync_mode: bool) -> ShmResult<Self> {
        Self::open_with_policy(schema, region_name, sync_mode, LockPolicy::Unbounded)
    }

    /// Attach using the region settings and tag list of a configuration.
    pub fn from_config(config: &TagExchangeConfig) -> ShmResult<Self> {
        Self::open_with_policy(
            &config.schema(),
            &config.region.name,
            config.region.sync_mode,
            config.region.lock_policy(),
        )
    }

    /// Attach to `region_name`, which must already exist with exactly the
    /// size the schema layout requires.
    ///
    /// No lock flag is touched while opening.
    pub fn open_with_policy(
        schema: &VariableSchema,
        region_name: &str,
        sync_mode: bool,
        policy: LockPolicy,
    ) -> ShmResult<Self> {
        if schema.is_empty() {
            return Err(ShmError::EmptySchema {
                name: region_name.to_string(),
            });
        }

        let layout = schema.layout(sync_mode)?;
        let total_size = layout.total_size;
        let sync_lock = layout
            .sync_flag_offset()
            .map(|offset| SlotLock::new(offset, policy));
        let region = SharedRegion::attach(region_name, total_size)?;

        let slots: Vec<Slot> = layout
            .slots
            .into_iter()
            .map(|slot| Slot {
                key: slot.descriptor.key(),
                lock: SlotLock::new(slot.lock_offset, policy),
                state: Mutex::new(SlotState {
                    value: slot.descriptor.initial_value.clone(),
                    changed: false,
                }),
                layout: slot,
            })
            .collect();
        let index = slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (slot.key.clone(), i))
            .collect();

        info!(
            region = %region.name(),
            size = total_size,
            tags = slots.len(),
            sync_mode,
            "🔗 Attached tag store"
        );

        Ok(Self {
            region_name: region.name().to_string(),
            size: total_size,
            policy,
            sync_lock,
            region: RwLock::new(Some(region)),
            slots,
            index,
            local_mode: RwLock::new(false),
        })
    }

    /// Normalized region name.
    pub fn region_name(&self) -> &str {
        &self.region_name
    }

    /// Region size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether the region-wide sync flag is in use.
    pub fn sync_mode(&self) -> bool {
        self.sync_lock.is_some()
    }

    /// Lock policy applied to every flag.
    pub fn lock_policy(&self) -> LockPolicy {
        self.policy
    }

    /// Whether the store is in local-cache mode.
    pub fn is_local_mode(&self) -> bool {
        *self.local_mode.read()
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.region.read().is_none()
    }

    /// Tag keys in schema order.
    pub fn keys(&self) -> Vec<String> {
        self.slots.iter().map(|slot| slot.key.clone()).collect()
    }

    /// Layout information for `key`.
    pub fn info(&self, key: &str) -> ShmResult<TagInfo> {
        let slot = self.slot(key)?;
        let descriptor = &slot.layout.descriptor;
        Ok(TagInfo {
            id: descriptor.id,
            name: descriptor.name.clone(),
            tag_type: descriptor.tag_type,
            size: descriptor.size,
            lock_offset: slot.layout.lock_offset,
            data_offset: slot.layout.data_offset,
        })
    }

    /// Layout of every tag as a JSON array.
    pub fn layout_json(&self) -> ShmResult<String> {
        let infos = self
            .slots
            .iter()
            .map(|slot| self.info(&slot.key))
            .collect::<ShmResult<Vec<_>>>()?;
        Ok(serde_json::to_string(&infos)?)
    }

    fn slot(&self, key: &str) -> ShmResult<&Slot> {
        self.index
            .get(key)
            .map(|&i| &self.slots[i])
            .ok_or_else(|| ShmError::UnknownTag {
                key: key.to_string(),
            })
    }

    fn wait_region_clear(&self, region: &SharedRegion) -> ShmResult<()> {
        match &self.sync_lock {
            Some(lock) => lock.wait_clear(region),
            None => Ok(()),
        }
    }

    /// Current value of `key`.
    pub fn get(&self, key: &str) -> ShmResult<TagValue> {
        let slot = self.slot(key)?;
        let guard = self.region.read();
        let region = guard.as_ref().ok_or(ShmError::StoreClosed)?;
        let local = self.local_mode.read();

        if *local {
            return Ok(slot.state.lock().value.clone());
        }

        self.wait_region_clear(region)?;
        let value = slot.read(region)?;
        slot.state.lock().value = value.clone();
        Ok(value)
    }

    /// Current value of tag `id:name`.
    pub fn get_tag(&self, id: u32, name: &str) -> ShmResult<TagValue> {
        self.get(&tag_key(id, name))
    }

    /// Store `value` into `key`, coerced to the slot type.
    pub fn set(&self, key: &str, value: &TagValue) -> ShmResult<()> {
        let slot = self.slot(key)?;
        let guard = self.region.read();
        let region = guard.as_ref().ok_or(ShmError::StoreClosed)?;
        let (stored, bytes) = slot.encode(value)?;
        let local = self.local_mode.read();

        if *local {
            let mut state = slot.state.lock();
            if state.value != stored {
                state.value = stored;
                state.changed = true;
            }
            return Ok(());
        }

        self.wait_region_clear(region)?;
        slot.write(region, &bytes)?;
        slot.state.lock().value = stored;
        Ok(())
    }

    /// Store `value` into tag `id:name`.
    pub fn set_tag(&self, id: u32, name: &str, value: &TagValue) -> ShmResult<()> {
        self.set(&tag_key(id, name), value)
    }

    /// Read-modify-write `key` while holding its lock.
    ///
    /// Returns the stored value. In local-cache mode the local copy is
    /// updated under its mutex instead.
    ///
    /// `f` runs with the slot locked and must not call back into the store.
    pub fn update<F>(&self, key: &str, f: F) -> ShmResult<TagValue>
    where
        F: FnOnce(&TagValue) -> TagValue,
    {
        let slot = self.slot(key)?;
        let guard = self.region.read();
        let region = guard.as_ref().ok_or(ShmError::StoreClosed)?;
        let local = self.local_mode.read();

        if *local {
            let mut state = slot.state.lock();
            let (stored, _) = slot.encode(&f(&state.value))?;
            if state.value != stored {
                state.value = stored.clone();
                state.changed = true;
            }
            return Ok(stored);
        }

        self.wait_region_clear(region)?;
        let stored = {
            let _slot_guard = slot.lock.acquire(region)?;
            let current = slot.read_locked(region)?;
            let (stored, bytes) = slot.encode(&f(&current))?;
            region.write_bytes(slot.layout.data_offset, &bytes)?;
            stored
        };
        slot.state.lock().value = stored.clone();
        Ok(stored)
    }

    /// Values of every tag in schema order.
    pub fn snapshot(&self) -> ShmResult<Vec<(String, TagValue)>> {
        self.slots
            .iter()
            .map(|slot| Ok((slot.key.clone(), self.get(&slot.key)?)))
            .collect()
    }

    /// Copy every slot into the local cache and enter local-cache mode.
    ///
    /// On a slot failure the remaining slots are still copied, the first
    /// error is returned and the store stays in write-through mode.
    pub fn refresh_local_from_region(&self) -> ShmResult<()> {
        let guard = self.region.read();
        let region = guard.as_ref().ok_or(ShmError::StoreClosed)?;
        let mut local = self.local_mode.write();
        let _region_guard = match &self.sync_lock {
            Some(lock) => Some(lock.acquire(region)?),
            None => None,
        };

        let mut first_error = None;
        for slot in &self.slots {
            match slot.read(region) {
                Ok(value) => {
                    let mut state = slot.state.lock();
                    state.value = value;
                    state.changed = false;
                }
                Err(e) => {
                    warn!(tag = %slot.key, error = %e, "Refresh of slot failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                *local = true;
                debug!(region = %self.region_name, "Local cache refreshed");
                Ok(())
            }
        }
    }

    /// Write every changed slot back and return to write-through mode.
    ///
    /// Returns the number of slots written. Slots that fail stay marked
    /// changed; the first error is returned and local-cache mode is kept so
    /// the flush can be retried.
    pub fn flush_local_to_region(&self) -> ShmResult<usize> {
        let guard = self.region.read();
        let region = guard.as_ref().ok_or(ShmError::StoreClosed)?;
        let mut local = self.local_mode.write();
        let _region_guard = match &self.sync_lock {
            Some(lock) => Some(lock.acquire(region)?),
            None => None,
        };

        let mut written = 0;
        let mut first_error = None;
        for slot in &self.slots {
            let mut state = slot.state.lock();
            if !state.changed {
                continue;
            }
            let result = slot
                .encode(&state.value)
                .and_then(|(_, bytes)| slot.write(region, &bytes));
            match result {
                Ok(()) => {
                    state.changed = false;
                    written += 1;
                }
                Err(e) => {
                    warn!(tag = %slot.key, error = %e, "Flush of slot failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                *local = false;
                debug!(region = %self.region_name, written, "Local cache flushed");
                Ok(written)
            }
        }
    }

    /// Unmap the region. Later value operations fail with `StoreClosed`.
    ///
    /// Idempotent. Waits for in-flight operations. The shared object itself
    /// is left in place for its owner.
    pub fn close(&self) {
        if let Some(region) = self.region.write().take() {
            info!(region = %region.name(), "Tag store closed");
        }
    }
}

impl Drop for SharedVariableStore {
    fn drop(&mut self) {
        self.close();
    }
}
