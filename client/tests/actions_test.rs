//! Integration tests for the action orchestrator
//!
//! Exercises the full get/post/patch/delete/search/get_related surface
//! over a scripted mock transport, including the status lifecycle and the
//! store effects of each action.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use jsonapi_store_client::transport::TransportError;
use jsonapi_store_client::{RequestOverride, ResourceStore, StoreError};
use jsonapi_store_core::config::StoreConfig;
use jsonapi_store_core::record::NormalizedRecord;
use jsonapi_store_core::resolver::{Related, Resolved};
use jsonapi_store_core::state::ActionStatus;
use jsonapi_store_testing::{fixtures, MockTransport};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

fn store_with(config: StoreConfig) -> (ResourceStore, Arc<MockTransport>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let transport = Arc::new(MockTransport::new());
    let store = ResourceStore::new(transport.clone(), config);
    (store, transport)
}

fn default_store() -> (ResourceStore, Arc<MockTransport>) {
    store_with(StoreConfig::default())
}

// ============================================================================
// get
// ============================================================================

#[tokio::test]
async fn get_stores_and_resolves_a_single_record() {
    let (store, transport) = default_store();
    transport.enqueue_document(fixtures::widget_document());

    let resolved = store.get("widgets/1").await.unwrap();

    // returned view carries the attribute
    let record = resolved.as_one().unwrap();
    assert_eq!(record.record.attributes["name"], json!("foo"));

    // store contains the normalized record with its own type/id
    let stored = store.record("widgets", "1").unwrap();
    assert_eq!(stored.attributes["name"], json!("foo"));
    assert_eq!(stored.meta.resource_type, "widgets");
    assert_eq!(stored.meta.id, "1");

    // the transport saw the verbatim path
    assert_eq!(transport.requests()[0].url, "widgets/1");
}

#[tokio::test]
async fn get_side_loads_included_before_primary() {
    let (store, transport) = default_store();
    transport.enqueue_document(fixtures::widget_with_author_document());

    let resolved = store.get("widgets/1").await.unwrap();

    // included person is in the store
    assert!(store.record("people", "7").is_some());

    // and the relationship view resolves to it
    let record = resolved.as_one().unwrap();
    let Related::One(author) = &record.related["author"] else {
        panic!("author must resolve from the side-loaded record");
    };
    assert_eq!(author.record.attributes["name"], json!("ann"));
}

#[tokio::test]
async fn get_collection_with_clear_on_update_reconciles_stale_ids() {
    let (store, transport) = store_with(StoreConfig::default().with_clear_on_update(true));

    transport.enqueue_json(json!({ "data": [
        { "type": "widgets", "id": "1", "attributes": { "name": "foo" } },
        { "type": "widgets", "id": "2", "attributes": { "name": "bar" } },
        { "type": "widgets", "id": "3", "attributes": { "name": "baz" } }
    ]}));
    store.get("widgets").await.unwrap();

    transport.enqueue_json(json!({ "data": [
        { "type": "widgets", "id": "1", "attributes": { "name": "foo" } },
        { "type": "widgets", "id": "2", "attributes": { "name": "bar" } }
    ]}));
    store.get("widgets").await.unwrap();

    assert!(store.record("widgets", "1").is_some());
    assert!(store.record("widgets", "2").is_some());
    assert!(store.record("widgets", "3").is_none());
}

#[tokio::test]
async fn get_merges_when_merge_records_enabled() {
    let (store, transport) = store_with(StoreConfig::default().with_merge_records(true));

    transport.enqueue_json(json!({ "data": {
        "type": "widgets", "id": "1", "attributes": { "a": 1, "b": 2 }
    }}));
    store.get("widgets/1").await.unwrap();

    transport.enqueue_json(json!({ "data": {
        "type": "widgets", "id": "1", "attributes": { "b": 3, "c": 4 }
    }}));
    store.get("widgets/1").await.unwrap();

    let stored = store.record("widgets", "1").unwrap();
    assert_eq!(stored.attributes["a"], json!(1));
    assert_eq!(stored.attributes["b"], json!(3));
    assert_eq!(stored.attributes["c"], json!(4));
}

#[tokio::test]
async fn get_with_preserve_json_attaches_the_wire_payload() {
    let (store, transport) = store_with(StoreConfig::default().with_preserve_json(true));
    transport.enqueue_document(fixtures::widget_document());

    let resolved = store.get("widgets/1").await.unwrap();
    let record = resolved.as_one().unwrap();
    assert_eq!(record.record.meta.json, Some(fixtures::widget_document()));

    // the stored copy stays clean
    assert_eq!(store.record("widgets", "1").unwrap().meta.json, None);
}

#[tokio::test]
async fn get_passes_request_override_through() {
    let (store, transport) = default_store();
    transport.enqueue_document(fixtures::widget_collection_document());

    let override_ = RequestOverride::default().with_param("filter[name]", "foo");
    store.get(("widgets", override_)).await.unwrap();

    let request = &transport.requests()[0];
    assert_eq!(request.url, "widgets");
    assert_eq!(
        request.params,
        vec![("filter[name]".to_string(), "foo".to_string())]
    );
}

// ============================================================================
// search
// ============================================================================

#[tokio::test]
async fn search_resolves_but_writes_nothing() {
    let (store, transport) = default_store();
    transport.enqueue_document(fixtures::widget_with_author_document());

    let resolved = store.search("widgets/1").await.unwrap();

    // result is fully resolved, including the side-loaded author
    let record = resolved.as_one().unwrap();
    assert_eq!(record.record.attributes["name"], json!("foo"));
    assert!(matches!(record.related["author"], Related::One(_)));

    // but the store is untouched
    assert!(store.record("widgets", "1").is_none());
    assert!(store.record("people", "7").is_none());
}

// ============================================================================
// status lifecycle
// ============================================================================

#[tokio::test]
async fn status_is_loading_immediately_then_success() {
    let (store, transport) = default_store();
    transport.enqueue_document(fixtures::widget_document());

    let handle = store.get("widgets/1");
    assert_eq!(
        store.status(&handle).unwrap().status,
        ActionStatus::Loading
    );

    let id = handle.id();
    handle.await.unwrap();
    assert_eq!(store.status(id).unwrap().status, ActionStatus::Success);
}

#[tokio::test]
async fn failed_action_records_error_and_reraises_the_original() {
    let (store, transport) = default_store();
    transport.enqueue_error(TransportError::ApiError {
        status: 503,
        message: "down".to_string(),
    });

    let handle = store.get("widgets/1");
    let id = handle.id();
    let err = handle.await.unwrap_err();

    assert_eq!(store.status(id).unwrap().status, ActionStatus::Error);
    // the transport error comes back unchanged
    match err {
        StoreError::Transport(TransportError::ApiError { status, message }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "down");
        }
        other => panic!("expected the original transport error, got {other:?}"),
    }
    // the store was not corrupted
    assert!(store.record("widgets", "1").is_none());
}

#[tokio::test]
async fn sequence_ids_strictly_increase_across_action_kinds() {
    let (store, transport) = default_store();
    transport.enqueue_document(fixtures::widget_document());
    transport.enqueue_empty(204);

    let get_handle = store.get("widgets/1");
    let delete_handle = store.delete("widgets/1");
    assert!(delete_handle.id() > get_handle.id());

    get_handle.await.unwrap();
    delete_handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn status_entries_expire_after_the_clean_age() {
    let (store, transport) = store_with(StoreConfig::default().with_action_status_clean_age(5));
    transport.enqueue_document(fixtures::widget_document());

    let handle = store.get("widgets/1");
    let id = handle.id();
    handle.await.unwrap();
    assert!(store.status(id).is_some());

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(store.status(id).is_none());
}

#[tokio::test(start_paused = true)]
async fn zero_clean_age_disables_expiry() {
    let (store, transport) = store_with(StoreConfig::default().with_action_status_clean_age(0));
    transport.enqueue_document(fixtures::widget_document());

    let handle = store.get("widgets/1");
    let id = handle.id();
    handle.await.unwrap();

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert!(store.status(id).is_some());
}

// ============================================================================
// post
// ============================================================================

#[tokio::test]
async fn post_stores_the_server_copy_when_returned() {
    let (store, transport) = default_store();
    transport.enqueue_json(json!({ "data": {
        "type": "widgets", "id": "42",
        "attributes": { "name": "foo", "serial": "srv-1" }
    }}));

    let record = NormalizedRecord::new("widgets", "").with_attr("name", json!("foo"));
    let resolved = store.post(record).await.unwrap();

    // server assigned the id; its copy is authoritative
    let stored = store.record("widgets", "42").unwrap();
    assert_eq!(stored.attributes["serial"], json!("srv-1"));
    assert_eq!(
        resolved.as_one().unwrap().record.meta.id,
        "42"
    );

    // POST went to the collection endpoint with the denormalized body
    let request = &transport.requests()[0];
    assert_eq!(request.url, "widgets");
    let body = serde_json::to_value(request.document.as_ref().unwrap()).unwrap();
    assert_eq!(body["data"]["type"], json!("widgets"));
    assert_eq!(body["data"]["attributes"]["name"], json!("foo"));
}

#[tokio::test]
async fn post_with_bodyless_201_stores_the_submitted_record() {
    let (store, transport) = default_store();
    transport.enqueue_empty(201);

    let record = NormalizedRecord::new("widgets", "9").with_attr("name", json!("local"));
    store.post(record).await.unwrap();

    let stored = store.record("widgets", "9").unwrap();
    assert_eq!(stored.attributes["name"], json!("local"));
}

// ============================================================================
// patch
// ============================================================================

#[tokio::test]
async fn patch_with_full_body_replaces_the_stored_record() {
    let (store, transport) = default_store();
    transport.enqueue_json(json!({ "data": {
        "type": "widgets", "id": "1", "attributes": { "a": 1, "b": 2, "stale": true }
    }}));
    store.get("widgets/1").await.unwrap();

    transport.enqueue_json(json!({ "data": {
        "type": "widgets", "id": "1", "attributes": { "a": 1, "b": 9 }
    }}));
    let record = NormalizedRecord::new("widgets", "1").with_attr("b", json!(9));
    store.patch(record).await.unwrap();

    let stored = store.record("widgets", "1").unwrap();
    // full replacement: the stale attribute is gone
    assert!(!stored.is_attr("stale"));
    assert_eq!(stored.attributes["b"], json!(9));
}

#[tokio::test]
async fn patch_with_empty_response_merges_the_submitted_fields() {
    let (store, transport) = default_store();
    transport.enqueue_json(json!({ "data": {
        "type": "widgets", "id": "1", "attributes": { "a": 1, "b": 2 }
    }}));
    store.get("widgets/1").await.unwrap();

    transport.enqueue_empty(204);
    let record = NormalizedRecord::new("widgets", "1").with_attr("b", json!(9));
    store.patch(record).await.unwrap();

    let stored = store.record("widgets", "1").unwrap();
    // merge: untouched fields survive
    assert_eq!(stored.attributes["a"], json!(1));
    assert_eq!(stored.attributes["b"], json!(9));
}

#[tokio::test]
async fn patch_with_clean_patch_submits_only_changed_attributes() {
    let (store, transport) = store_with(StoreConfig::default().with_clean_patch(true));
    transport.enqueue_json(json!({ "data": {
        "type": "widgets", "id": "1", "attributes": { "a": 1, "b": 2 }
    }}));
    store.get("widgets/1").await.unwrap();

    transport.enqueue_empty(204);
    let record = NormalizedRecord::new("widgets", "1")
        .with_attr("a", json!(1))
        .with_attr("b", json!(9));
    store.patch(record).await.unwrap();

    let body =
        serde_json::to_value(transport.requests()[1].document.as_ref().unwrap()).unwrap();
    assert_eq!(body["data"]["attributes"], json!({ "b": 9 }));
    assert_eq!(body["data"]["type"], json!("widgets"));
    assert_eq!(body["data"]["id"], json!("1"));
}

// ============================================================================
// delete
// ============================================================================

#[tokio::test]
async fn delete_removes_the_local_record() {
    let (store, transport) = default_store();
    transport.enqueue_document(fixtures::widget_document());
    store.get("widgets/1").await.unwrap();

    transport.enqueue_empty(204);
    let resolved = store.delete("widgets/1").await.unwrap();

    assert!(store.record("widgets", "1").is_none());
    // no body: the submitted identifier's view comes back
    let record = resolved.as_one().unwrap();
    assert_eq!(record.record.meta.resource_type, "widgets");
    assert_eq!(record.record.meta.id, "1");
}

#[tokio::test]
async fn delete_returns_the_server_representation_when_present() {
    let (store, transport) = default_store();
    transport.enqueue_document(fixtures::widget_document());
    store.get("widgets/1").await.unwrap();

    transport.enqueue_json(json!({ "data": {
        "type": "widgets", "id": "1", "attributes": { "name": "tombstone" }
    }}));
    let resolved = store.delete("widgets/1").await.unwrap();

    let record = resolved.as_one().unwrap();
    assert_eq!(record.record.attributes["name"], json!("tombstone"));
}

#[tokio::test]
async fn delete_without_identifier_fails_without_a_request() {
    let (store, transport) = default_store();

    let err = store.delete("widgets").await.unwrap_err();
    assert!(matches!(err, StoreError::Record(_)));
    assert!(transport.requests().is_empty());
}

// ============================================================================
// get_related
// ============================================================================

#[tokio::test]
async fn get_related_follows_embedded_linkage() {
    let (store, transport) = default_store();
    // root fetch
    transport.enqueue_json(json!({ "data": {
        "type": "widgets", "id": "1",
        "relationships": {
            "author": { "data": { "type": "people", "id": "7" } }
        }
    }}));
    // per-identifier fetch
    transport.enqueue_json(json!({ "data": {
        "type": "people", "id": "7", "attributes": { "name": "ann" }
    }}));

    let related = store.get_related("widgets/1").await.unwrap();

    let author = &related["author"]["people"]["7"];
    assert_eq!(author.record.attributes["name"], json!("ann"));
    assert_eq!(transport.requests()[1].url, "people/7");
}

#[tokio::test]
async fn get_related_uses_the_linkage_endpoint_when_data_is_absent() {
    let (store, transport) = default_store();
    // root fetch: relationship stub with neither data nor links
    transport.enqueue_json(json!({ "data": {
        "type": "widgets", "id": "1",
        "relationships": { "parts": { "meta": { "count": 2 } } }
    }}));
    // linkage endpoint response
    transport.enqueue_json(json!({ "data": [
        { "type": "parts", "id": "a" },
        { "type": "parts", "id": "b" }
    ]}));
    // per-identifier fetches
    transport.enqueue_json(json!({ "data": {
        "type": "parts", "id": "a", "attributes": { "name": "bolt" }
    }}));
    transport.enqueue_json(json!({ "data": {
        "type": "parts", "id": "b", "attributes": { "name": "nut" }
    }}));

    let related = store.get_related("widgets/1").await.unwrap();

    assert_eq!(transport.requests()[1].url, "widgets/1/relationships/parts");
    assert_eq!(related["parts"]["parts"].len(), 2);
}

#[tokio::test]
async fn get_related_follows_the_related_link() {
    let (store, transport) = default_store();
    transport.enqueue_json(json!({ "data": {
        "type": "widgets", "id": "1",
        "relationships": {
            "author": { "links": { "related": "widgets/1/author" } }
        }
    }}));
    transport.enqueue_json(json!({ "data": {
        "type": "people", "id": "7", "attributes": { "name": "ann" }
    }}));

    let related = store.get_related("widgets/1").await.unwrap();

    assert_eq!(transport.requests()[1].url, "widgets/1/author");
    assert_eq!(
        related["author"]["people"]["7"].record.attributes["name"],
        json!("ann")
    );
}

#[tokio::test]
async fn get_related_rejects_unknown_relationship_names() {
    let (store, transport) = default_store();
    transport.enqueue_json(json!({ "data": {
        "type": "widgets", "id": "1",
        "relationships": {
            "author": { "data": { "type": "people", "id": "7" } }
        }
    }}));

    let err = store.get_related("widgets/1/owner").await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::MissingRelationship { ref relationship, .. } if relationship == "owner"
    ));
}

#[tokio::test]
async fn get_related_without_type_and_id_is_a_record_error() {
    let (store, _transport) = default_store();
    let err = store.get_related("widgets").await.unwrap_err();
    assert!(matches!(err, StoreError::Record(_)));
}

#[tokio::test]
async fn get_related_aborts_the_batch_when_one_fetch_fails() {
    let (store, transport) = default_store();
    transport.enqueue_json(json!({ "data": {
        "type": "widgets", "id": "1",
        "relationships": {
            "parts": { "data": [
                { "type": "parts", "id": "a" },
                { "type": "parts", "id": "b" }
            ] }
        }
    }}));
    transport.enqueue_json(json!({ "data": { "type": "parts", "id": "a" } }));
    transport.enqueue_error(TransportError::ApiError {
        status: 404,
        message: "gone".to_string(),
    });

    let err = store.get_related("widgets/1").await.unwrap_err();
    assert!(matches!(err, StoreError::Transport(_)));
}

// ============================================================================
// accessors
// ============================================================================

#[tokio::test]
async fn read_accessor_addresses_collection_and_record() {
    let (store, transport) = default_store();
    transport.enqueue_document(fixtures::widget_collection_document());
    store.get("widgets").await.unwrap();

    let Resolved::Collection(collection) = store.read("widgets") else {
        panic!("type path must yield a collection");
    };
    assert_eq!(collection.len(), 2);

    let one = store.read("widgets/2");
    assert_eq!(
        one.as_one().unwrap().record.attributes["name"],
        json!("bar")
    );
    assert_eq!(store.read("widgets/404"), Resolved::None);
}

#[tokio::test]
async fn read_filtered_applies_jsonpath_after_resolution() {
    let (store, transport) = default_store();
    transport.enqueue_document(fixtures::widget_collection_document());
    store.get("widgets").await.unwrap();

    let matched = store
        .read_filtered("widgets", "$[?(@.name == 'bar')]")
        .unwrap();
    assert_eq!(matched.len(), 1);
    assert!(matched.contains_key("2"));
}

#[tokio::test]
async fn aliases_delegate_to_their_actions() {
    let (store, transport) = default_store();
    transport.enqueue_document(fixtures::widget_document());
    store.fetch("widgets/1").await.unwrap();

    transport.enqueue_empty(204);
    let record = NormalizedRecord::new("widgets", "1").with_attr("name", json!("renamed"));
    store.update(record).await.unwrap();

    assert_eq!(
        store.record("widgets", "1").unwrap().attributes["name"],
        json!("renamed")
    );
}
