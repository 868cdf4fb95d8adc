//! Concurrent access tests: slot locks must serialize read-modify-write
//! across threads and across independent attachments of the same region.

mod common;

use common::{TestRegion, unique_name};
use hmi_common::prelude::*;
use hmi_shared_memory::{SharedVariableStore, ShmResult};
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;
const INCREMENTS: usize = 500;

fn increment(v: &TagValue) -> TagValue {
    match v {
        TagValue::Int32(n) => TagValue::Int32(n + 1),
        other => panic!("unexpected value {other:?}"),
    }
}

fn counter_schema(prefix: &str) -> VariableSchema {
    // The leading bool pushes the counter's lock flag to an unaligned offset.
    VariableSchema::from_specs(
        unique_name(prefix),
        &[
            TagSpec::new(1, "flag", TagType::Bool),
            TagSpec::new(2, "counter", TagType::Int32),
        ],
    )
}

#[test]
fn test_concurrent_increments_lose_no_updates() -> ShmResult<()> {
    let schema = counter_schema("hmi_incr");
    let region = TestRegion::for_schema(&schema, false);
    let store = Arc::new(SharedVariableStore::open(&schema, &region.name, false)?);

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || -> ShmResult<()> {
                for _ in 0..INCREMENTS {
                    store.update("2:counter", increment)?;
                }
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked")?;
    }

    assert_eq!(
        store.get("2:counter")?,
        TagValue::Int32((THREADS * INCREMENTS) as i32)
    );
    Ok(())
}

#[test]
fn test_independent_attachments_share_locks() -> ShmResult<()> {
    let schema = counter_schema("hmi_multi");
    let region = TestRegion::for_schema(&schema, true);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let schema = schema.clone();
            let name = region.name.clone();
            thread::spawn(move || -> ShmResult<()> {
                // Each worker attaches on its own, like a separate process.
                let store = SharedVariableStore::open(&schema, &name, true)?;
                for _ in 0..INCREMENTS {
                    store.update("2:counter", increment)?;
                }
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked")?;
    }

    let store = SharedVariableStore::open(&schema, &region.name, true)?;
    assert_eq!(store.get("2:counter")?, TagValue::Int32((4 * INCREMENTS) as i32));
    Ok(())
}

#[test]
fn test_refresh_and_flush_interleaved_with_writers() -> ShmResult<()> {
    let schema = counter_schema("hmi_bulk");
    let region = TestRegion::for_schema(&schema, true);
    let batch = Arc::new(SharedVariableStore::open(&schema, &region.name, true)?);
    let writer = SharedVariableStore::open(&schema, &region.name, true)?;

    let bulk = {
        let batch = Arc::clone(&batch);
        thread::spawn(move || -> ShmResult<()> {
            for _ in 0..100 {
                batch.refresh_local_from_region()?;
                batch.set("1:flag", &TagValue::Bool(true))?;
                batch.flush_local_to_region()?;
            }
            Ok(())
        })
    };

    for _ in 0..INCREMENTS {
        writer.update("2:counter", increment)?;
    }
    bulk.join().expect("bulk worker panicked")?;

    // Bulk flushes only write dirty slots, so no counter update is lost.
    assert_eq!(writer.get("2:counter")?, TagValue::Int32(INCREMENTS as i32));
    assert_eq!(writer.get("1:flag")?, TagValue::Bool(true));
    assert!(!batch.is_local_mode());
    Ok(())
}

#[test]
fn test_set_racing_flush_is_never_lost() -> ShmResult<()> {
    let schema = counter_schema("hmi_flush_race");
    let region = TestRegion::for_schema(&schema, false);
    let store = Arc::new(SharedVariableStore::open(&schema, &region.name, false)?);

    for i in 0..2_000 {
        store.refresh_local_from_region()?;
        let start = Arc::new(Barrier::new(2));

        let setter = {
            let store = Arc::clone(&store);
            let start = Arc::clone(&start);
            thread::spawn(move || -> ShmResult<()> {
                start.wait();
                store.set("2:counter", &TagValue::Int32(i))
            })
        };
        start.wait();
        store.flush_local_to_region()?;
        setter.join().expect("setter panicked")?;

        // Either flushed from the cache or written through afterwards.
        assert!(!store.is_local_mode());
        assert_eq!(store.get("2:counter")?, TagValue::Int32(i), "iteration {i}");
    }
    Ok(())
}
