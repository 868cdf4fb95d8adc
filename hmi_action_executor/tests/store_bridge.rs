//! Engine over the real tag store, with the test acting as region producer

#[path = "../../hmi_shared_memory/tests/common/mod.rs"]
mod common;

use common::{TestRegion, unique_name};
use hmi_action_executor::{
    ActionEngine, ActionTree, LoggingNavigator, ProviderError, StoreProvider, TagValueProvider,
};
use hmi_common::prelude::*;
use hmi_shared_memory::SharedVariableStore;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn open_store(prefix: &str) -> (TestRegion, Arc<SharedVariableStore>) {
    let specs = vec![
        TagSpec::new(1, "temp", TagType::Float32),
        TagSpec::new(2, "run", TagType::Bool),
        TagSpec::new(3, "status", TagType::String).with_size(16),
    ];
    let schema = VariableSchema::from_specs(unique_name(prefix), &specs);
    let region = TestRegion::for_schema(&schema, false);
    let store = SharedVariableStore::open(&schema, &region.name, false).unwrap();
    (region, Arc::new(store))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn action_tree_drives_store() {
    let (_region, store) = open_store("hmi_bridge_tree");
    store.set("1:temp", &TagValue::Float32(95.0)).unwrap();

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        "{}",
        json!({
            "root": "main",
            "nodes": [
                { "id": "main", "type": "GROUP", "executionMode": "serial",
                  "children": [{"id": "check", "type": "ACTION"}] },
                { "id": "check", "type": "CONDITION", "targetId": "1:temp", "operator": ">=",
                  "referenceValue": 90, "then": [{"id": "trip", "type": "GROUP"}] },
                { "id": "trip", "type": "GROUP", "executionMode": "parallel",
                  "children": [{"id": "stop"}, {"id": "label"}] },
                { "id": "stop", "type": "SET", "targetIds": ["2:run"], "value": 0 },
                { "id": "label", "type": "SET", "targetIds": ["3:status"], "value": "OVERTEMP TRIPPED!" }
            ]
        })
    )
    .unwrap();
    file.flush().unwrap();
    let tree = ActionTree::load(file.path()).unwrap();

    store.set("2:run", &TagValue::Bool(true)).unwrap();
    let engine = ActionEngine::new(
        Arc::new(StoreProvider::new(Arc::clone(&store))),
        Arc::new(LoggingNavigator),
    );
    let report = engine.execute(&tree).await;

    assert!(report.is_success(), "{report:?}");
    assert_eq!(store.get("2:run").unwrap(), TagValue::Bool(false));
    // 17 bytes truncated to the 16-byte slot
    assert_eq!(store.get("3:status").unwrap(), TagValue::from("OVERTEMP TRIPPED"));
}

#[tokio::test]
async fn store_provider_maps_errors() {
    let (_region, store) = open_store("hmi_bridge_errors");
    let provider = StoreProvider::new(Arc::clone(&store));

    assert!(matches!(
        provider.set("42:nothing", TagValue::Bool(true)).await,
        Err(ProviderError::UnknownTag { tag }) if tag == "42:nothing"
    ));
    assert!(matches!(
        provider.set("1:temp", TagValue::from("hot")).await,
        Err(ProviderError::Store { .. })
    ));
    assert_eq!(provider.get("42:nothing"), None);
    assert_eq!(provider.get("1:temp"), Some(TagValue::Float32(0.0)));

    store.close();
    assert_eq!(provider.get("1:temp"), None);
}
