//! Record codec
//!
//! Pure, stateless conversions between the JSON:API wire format and
//! normalized records, and between normalized records and the two-level
//! store shape. No store access, no I/O.

use crate::config::StoreConfig;
use crate::document::{Document, PrimaryData, ResourceObject};
use crate::error::RecordError;
use crate::record::{NormalizedRecord, RecordMeta, Records, StoreShape};

/// Normalize one wire resource object
#[must_use]
pub fn normalize_item(resource: &ResourceObject) -> NormalizedRecord {
    NormalizedRecord {
        attributes: resource.attributes.clone(),
        meta: RecordMeta {
            resource_type: resource.resource_type.clone(),
            id: resource.id.clone(),
            relationships: resource.relationships.clone(),
            links: resource.links.clone(),
            meta: resource.meta.clone(),
            json: None,
        },
    }
}

/// Normalize a document's primary data
///
/// A single resource yields [`Records::One`]; an array yields
/// [`Records::Collection`] grouped by id. Duplicate ids within one array
/// are deep-merged, last write winning. Missing data yields an empty
/// record.
#[must_use]
pub fn normalize(data: Option<&PrimaryData>) -> Records {
    match data {
        None => Records::One(NormalizedRecord::default()),
        Some(PrimaryData::One(resource)) => Records::One(normalize_item(resource)),
        Some(PrimaryData::Many(resources)) => {
            let mut collection = crate::record::RecordCollection::new();
            for resource in resources {
                let record = normalize_item(resource);
                match collection.get_mut(&record.meta.id) {
                    Some(existing) => existing.merge_from(record),
                    None => {
                        collection.insert(record.meta.id.clone(), record);
                    }
                }
            }
            Records::Collection(collection)
        }
    }
}

/// Normalize a multi-type batch (e.g. a document's `included` array)
/// directly into store shape
#[must_use]
pub fn normalize_resources(resources: &[ResourceObject]) -> StoreShape {
    let mut shape = StoreShape::new();
    for resource in resources {
        let record = normalize_item(resource);
        let collection = shape.entry(record.meta.resource_type.clone()).or_default();
        match collection.get_mut(&record.meta.id) {
            Some(existing) => existing.merge_from(record),
            None => {
                collection.insert(record.meta.id.clone(), record);
            }
        }
    }
    shape
}

/// Denormalize one record back to a wire resource object
#[must_use]
pub fn denormalize_item(record: &NormalizedRecord) -> ResourceObject {
    ResourceObject {
        resource_type: record.meta.resource_type.clone(),
        id: record.meta.id.clone(),
        attributes: record.attributes.clone(),
        relationships: record.meta.relationships.clone(),
        links: record.meta.links.clone(),
        meta: record.meta.meta.clone(),
    }
}

/// Denormalize records into a wire document
///
/// [`Records::One`] emits `{"data": {...}}`; [`Records::Collection`] emits
/// `{"data": [...]}` even for a single entry. The array is ordered by id
/// so output is deterministic.
#[must_use]
pub fn denormalize(records: &Records) -> Document {
    match records {
        Records::One(record) => Document::one(denormalize_item(record)),
        Records::Collection(collection) => {
            let mut ids: Vec<&String> = collection.keys().collect();
            ids.sort();
            let resources = ids
                .into_iter()
                .filter_map(|id| collection.get(id))
                .map(denormalize_item)
                .collect();
            Document::many(resources)
        }
    }
}

/// Convert records into the two-level store shape
///
/// When `follow_relationships_data` is enabled, attribute keys shadowing a
/// relationship name are stripped from the stored copy: relationship views
/// are reconstructed on read, never persisted, so a stored literal copy
/// would go stale and could close a reference cycle inside the store.
///
/// # Errors
///
/// Returns [`RecordError::Unidentifiable`] if any record lacks a type or
/// id, carrying the offending record in flattened form.
pub fn to_store_shape(records: &Records, config: &StoreConfig) -> Result<StoreShape, RecordError> {
    let mut shape = StoreShape::new();
    for record in records.iter() {
        if !record.has_identifier() {
            return Err(RecordError::Unidentifiable {
                value: record.to_value(&config.reserved_key),
            });
        }
        let mut stored = record.clone();
        if config.follow_relationships_data {
            let shadowed: Vec<String> = stored
                .attributes
                .keys()
                .filter(|key| stored.meta.relationships.contains_key(*key))
                .cloned()
                .collect();
            for key in shadowed {
                stored.attributes.remove(&key);
            }
        }
        shape
            .entry(stored.meta.resource_type.clone())
            .or_default()
            .insert(stored.meta.id.clone(), stored);
    }
    Ok(shape)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::{Linkage, Relationship, ResourceIdentifier};
    use serde_json::json;

    fn widget() -> ResourceObject {
        serde_json::from_value(json!({
            "type": "widgets",
            "id": "1",
            "attributes": { "name": "sprocket", "color": "black" },
            "relationships": {
                "author": { "data": { "type": "people", "id": "7" } }
            },
            "meta": { "revision": 3 }
        }))
        .unwrap()
    }

    #[test]
    fn normalize_hoists_attributes() {
        let record = normalize_item(&widget());
        assert_eq!(record.attributes["name"], json!("sprocket"));
        assert_eq!(record.meta.resource_type, "widgets");
        assert_eq!(record.meta.id, "1");
        assert!(record.is_rel("author"));
        assert_eq!(record.meta.meta, Some(json!({ "revision": 3 })));
    }

    #[test]
    fn normalize_missing_data_is_empty_record() {
        let records = normalize(None);
        assert_eq!(records, Records::One(NormalizedRecord::default()));
    }

    #[test]
    fn normalize_array_groups_by_id_and_merges_duplicates() {
        let data = PrimaryData::Many(vec![
            serde_json::from_value(json!({
                "type": "widgets", "id": "1",
                "attributes": { "name": "one", "color": "red" }
            }))
            .unwrap(),
            serde_json::from_value(json!({
                "type": "widgets", "id": "2",
                "attributes": { "name": "two" }
            }))
            .unwrap(),
            serde_json::from_value(json!({
                "type": "widgets", "id": "1",
                "attributes": { "name": "one again" }
            }))
            .unwrap(),
        ]);
        let Records::Collection(collection) = normalize(Some(&data)) else {
            unreachable!("array input must normalize to a collection");
        };
        assert_eq!(collection.len(), 2);
        assert_eq!(collection["1"].attributes["name"], json!("one again"));
        assert_eq!(collection["1"].attributes["color"], json!("red"));
        assert_eq!(collection["2"].attributes["name"], json!("two"));
    }

    #[test]
    fn roundtrip_preserves_type_id_attributes_and_meta() {
        let resource = widget();
        let records = normalize(Some(&PrimaryData::One(resource.clone())));
        let doc = denormalize(&records);
        assert_eq!(doc, Document::one(resource));
    }

    #[test]
    fn single_item_collection_still_emits_array() {
        let record = normalize_item(&widget());
        let mut collection = crate::record::RecordCollection::new();
        collection.insert(record.meta.id.clone(), record);
        let doc = denormalize(&Records::Collection(collection));
        assert!(matches!(doc.data, Some(PrimaryData::Many(ref items)) if items.len() == 1));
    }

    #[test]
    fn store_shape_strips_shadowed_attribute_keys() {
        let mut record = normalize_item(&widget());
        record
            .attributes
            .insert("author".to_string(), json!({ "stale": true }));
        let shape =
            to_store_shape(&Records::One(record), &StoreConfig::default()).unwrap();
        let stored = &shape["widgets"]["1"];
        assert!(!stored.is_attr("author"));
        assert!(stored.is_rel("author"));
    }

    #[test]
    fn store_shape_keeps_shadowed_keys_when_following_disabled() {
        let mut record = normalize_item(&widget());
        record
            .attributes
            .insert("author".to_string(), json!({ "stale": true }));
        let config = StoreConfig::default().with_follow_relationships_data(false);
        let shape = to_store_shape(&Records::One(record), &config).unwrap();
        assert!(shape["widgets"]["1"].is_attr("author"));
    }

    #[test]
    fn store_shape_rejects_unidentifiable_records() {
        let record = NormalizedRecord::default().with_attr("name", json!("foo"));
        let err =
            to_store_shape(&Records::One(record), &StoreConfig::default()).unwrap_err();
        assert!(matches!(err, RecordError::Unidentifiable { .. }));
    }

    #[test]
    fn included_batch_groups_by_type_then_id() {
        let resources: Vec<ResourceObject> = vec![
            serde_json::from_value(json!({ "type": "people", "id": "7" })).unwrap(),
            serde_json::from_value(json!({ "type": "widgets", "id": "2" })).unwrap(),
            serde_json::from_value(json!({ "type": "people", "id": "8" })).unwrap(),
        ];
        let shape = normalize_resources(&resources);
        assert_eq!(shape["people"].len(), 2);
        assert_eq!(shape["widgets"].len(), 1);
    }

    #[test]
    fn relationship_linkage_survives_normalization() {
        let record = normalize_item(&widget());
        let author = &record.meta.relationships["author"];
        assert_eq!(
            author.data,
            Some(Linkage::ToOne(ResourceIdentifier::new("people", "7")))
        );
        let rebuilt = denormalize_item(&record);
        assert_eq!(
            rebuilt.relationships["author"],
            Relationship::to_one(ResourceIdentifier::new("people", "7"))
        );
    }
}
