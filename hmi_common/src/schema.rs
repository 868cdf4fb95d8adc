//! Tag schema and region layout.
//!
//! A [`VariableSchema`] is the ordered, de-duplicated list of tags a region
//! carries. [`VariableSchema::layout`] assigns every tag a contiguous slot:
//!
//! ```text
//! [sync flag: 4]? [lock: 4][data: size] [lock: 4][data: size] ...
//! ```
//!
//! There is no padding beyond the 4-byte lock header, so lock words are not
//! necessarily 4-byte aligned.

use crate::consts::{
    DEFAULT_STRING_SIZE, LOCK_HEADER_SIZE, REGION_SYNC_FLAG_SIZE, TAG_KEY_SEPARATOR,
};
use crate::value::{TagType, TagValue};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::warn;

/// Tag entry as it appears in a tag list (configuration or external schema).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagSpec {
    /// Numeric tag id
    pub id: u32,
    /// Tag name
    pub name: String,
    /// Wire type
    #[serde(rename = "type")]
    pub tag_type: TagType,
    /// Declared byte size, only meaningful for `string`
    #[serde(default)]
    pub size: Option<i64>,
    /// Raw initial value
    #[serde(default)]
    pub value: Option<TagValue>,
}

impl TagSpec {
    /// Create a spec without size or initial value.
    pub fn new(id: u32, name: impl Into<String>, tag_type: TagType) -> Self {
        Self {
            id,
            name: name.into(),
            tag_type,
            size: None,
            value: None,
        }
    }

    /// Set the declared size.
    pub fn with_size(mut self, size: i64) -> Self {
        self.size = Some(size);
        self
    }

    /// Set the raw initial value.
    pub fn with_value(mut self, value: impl Into<TagValue>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Resolved tag: identity, type, slot size and initial value.
#[derive(Debug, Clone, PartialEq)]
pub struct TagDescriptor {
    /// Numeric tag id
    pub id: u32,
    /// Tag name
    pub name: String,
    /// Wire type
    pub tag_type: TagType,
    /// Slot data size in bytes
    pub size: usize,
    /// Initial local value
    pub initial_value: TagValue,
}

impl TagDescriptor {
    /// Resolve a raw spec into a descriptor.
    pub fn from_spec(spec: &TagSpec) -> Self {
        let size = match spec.tag_type.fixed_size() {
            Some(size) => size,
            None => match spec.size {
                Some(declared) if declared > 0 => usize::try_from(declared).unwrap_or(usize::MAX),
                _ => DEFAULT_STRING_SIZE,
            },
        };

        Self {
            id: spec.id,
            name: spec.name.clone(),
            tag_type: spec.tag_type,
            size,
            initial_value: initial_value(spec.tag_type, spec.value.as_ref()),
        }
    }

    /// Composite key `id:name`.
    pub fn key(&self) -> String {
        tag_key(self.id, &self.name)
    }
}

/// Build a composite tag key.
pub fn tag_key(id: u32, name: &str) -> String {
    format!("{id}{TAG_KEY_SEPARATOR}{name}")
}

/// Split a composite tag key into id and name.
///
/// Only the first separator splits, so names may contain `:`.
pub fn parse_tag_key(key: &str) -> Option<(u32, &str)> {
    let (id, name) = key.split_once(TAG_KEY_SEPARATOR)?;
    Some((id.trim().parse().ok()?, name))
}

fn initial_value(tag_type: TagType, raw: Option<&TagValue>) -> TagValue {
    let Some(raw) = raw else {
        return TagValue::default_for(tag_type);
    };

    match tag_type {
        TagType::Bool => TagValue::Bool(raw.to_string().trim().eq_ignore_ascii_case("true")),
        TagType::String => TagValue::String(raw.to_string()),
        _ => raw
            .coerce(tag_type)
            .unwrap_or_else(|_| TagValue::default_for(tag_type)),
    }
}

/// Slot sizes add up past the addressable range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Layout of region {region} overflows at tag {tag}")]
pub struct LayoutOverflow {
    /// Region name
    pub region: String,
    /// First tag that does not fit
    pub tag: String,
}

/// Ordered, de-duplicated tag list for one region.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSchema {
    region_name: String,
    tags: Vec<TagDescriptor>,
    duplicates: Vec<String>,
}

impl VariableSchema {
    /// Build a schema from raw specs, keeping the first occurrence of every key.
    pub fn from_specs<'a>(
        region_name: impl Into<String>,
        specs: impl IntoIterator<Item = &'a TagSpec>,
    ) -> Self {
        let region_name = region_name.into();
        let mut seen = HashSet::new();
        let mut tags = Vec::new();
        let mut duplicates = Vec::new();

        for spec in specs {
            let descriptor = TagDescriptor::from_spec(spec);
            let key = descriptor.key();
            if seen.insert(key.clone()) {
                tags.push(descriptor);
            } else {
                warn!(region = %region_name, tag = %key, "Duplicate tag dropped");
                duplicates.push(key);
            }
        }

        Self {
            region_name,
            tags,
            duplicates,
        }
    }

    /// Name of the region this schema describes.
    pub fn region_name(&self) -> &str {
        &self.region_name
    }

    /// Tags in schema order.
    pub fn tags(&self) -> &[TagDescriptor] {
        &self.tags
    }

    /// Keys dropped as duplicates, in encounter order.
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether the schema has no tags.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Assign offsets to every tag.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutOverflow`] when the declared sizes do not fit in
    /// `usize`.
    pub fn layout(&self, sync_mode: bool) -> Result<RegionLayout, LayoutOverflow> {
        let mut offset = if sync_mode { REGION_SYNC_FLAG_SIZE } else { 0 };
        let mut slots = Vec::with_capacity(self.tags.len());

        for descriptor in &self.tags {
            let data_offset = offset.checked_add(LOCK_HEADER_SIZE);
            let end = data_offset.and_then(|start| start.checked_add(descriptor.size));
            let (Some(data_offset), Some(end)) = (data_offset, end) else {
                return Err(LayoutOverflow {
                    region: self.region_name.clone(),
                    tag: descriptor.key(),
                });
            };
            slots.push(SlotLayout {
                descriptor: descriptor.clone(),
                lock_offset: offset,
                data_offset,
            });
            offset = end;
        }

        Ok(RegionLayout {
            sync_mode,
            total_size: offset,
            slots,
        })
    }
}

/// Placement of one tag in the region.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotLayout {
    /// Tag this slot holds
    pub descriptor: TagDescriptor,
    /// Offset of the 4-byte lock flag
    pub lock_offset: usize,
    /// Offset of the first data byte
    pub data_offset: usize,
}

impl SlotLayout {
    /// Data size in bytes.
    pub fn size(&self) -> usize {
        self.descriptor.size
    }

    /// End of the slot (exclusive).
    pub fn end(&self) -> usize {
        self.data_offset + self.descriptor.size
    }
}

/// Complete region layout.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionLayout {
    /// Whether a region-wide sync flag precedes the slots
    pub sync_mode: bool,
    /// Required region size in bytes
    pub total_size: usize,
    /// Slots in schema order
    pub slots: Vec<SlotLayout>,
}

impl RegionLayout {
    /// Offset of the region-wide sync flag, if present.
    pub fn sync_flag_offset(&self) -> Option<usize> {
        self.sync_mode.then_some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs() -> Vec<TagSpec> {
        vec![
            TagSpec::new(1, "run", TagType::Bool),
            TagSpec::new(2, "speed", TagType::Float32),
            TagSpec::new(3, "label", TagType::String).with_size(16),
        ]
    }

    #[test]
    fn test_layout_without_sync() {
        let schema = VariableSchema::from_specs("/hmi", &specs());
        let layout = schema.layout(false).unwrap();

        assert_eq!(layout.slots[0].lock_offset, 0);
        assert_eq!(layout.slots[0].data_offset, 4);
        assert_eq!(layout.slots[1].lock_offset, 5);
        assert_eq!(layout.slots[1].data_offset, 9);
        assert_eq!(layout.slots[2].lock_offset, 13);
        assert_eq!(layout.slots[2].end(), 33);
        assert_eq!(layout.total_size, 33);
        assert_eq!(layout.sync_flag_offset(), None);
    }

    #[test]
    fn test_layout_with_sync_flag() {
        let schema = VariableSchema::from_specs("/hmi", &specs());
        let layout = schema.layout(true).unwrap();

        assert_eq!(layout.sync_flag_offset(), Some(0));
        assert_eq!(layout.slots[0].lock_offset, 4);
        assert_eq!(layout.total_size, 37);
    }

    #[test]
    fn test_oversized_strings_overflow_layout() {
        let specs = vec![
            TagSpec::new(1, "a", TagType::String).with_size(i64::MAX),
            TagSpec::new(2, "b", TagType::String).with_size(i64::MAX),
        ];
        let schema = VariableSchema::from_specs("/hmi", &specs);

        let err = schema.layout(false).unwrap_err();
        assert_eq!(err.region, "/hmi");
        // 64-bit targets fit the first slot, 32-bit targets do not.
        assert!(["1:a", "2:b"].contains(&err.tag.as_str()));
    }

    #[test]
    fn test_string_size_defaults() {
        for declared in [None, Some(0), Some(-5)] {
            let spec = TagSpec {
                size: declared,
                ..TagSpec::new(9, "s", TagType::String)
            };
            assert_eq!(TagDescriptor::from_spec(&spec).size, DEFAULT_STRING_SIZE);
        }
    }

    #[test]
    fn test_fixed_size_ignores_declared() {
        let spec = TagSpec::new(1, "n", TagType::Int16).with_size(64);
        assert_eq!(TagDescriptor::from_spec(&spec).size, 2);
    }

    #[test]
    fn test_duplicates_first_wins() {
        let specs = vec![
            TagSpec::new(1, "a", TagType::Int32).with_value(1),
            TagSpec::new(1, "a", TagType::Int32).with_value(2),
            TagSpec::new(1, "b", TagType::Int32),
        ];
        let schema = VariableSchema::from_specs("/hmi", &specs);

        assert_eq!(schema.len(), 2);
        assert_eq!(schema.tags()[0].initial_value, TagValue::Int32(1));
        assert_eq!(schema.duplicates(), ["1:a".to_string()]);
    }

    #[test]
    fn test_initial_values() {
        let bool_spec = TagSpec::new(1, "b", TagType::Bool).with_value(" TRUE ");
        assert_eq!(TagDescriptor::from_spec(&bool_spec).initial_value, TagValue::Bool(true));

        let numeric_bool = TagSpec::new(1, "b", TagType::Bool).with_value(1);
        assert_eq!(TagDescriptor::from_spec(&numeric_bool).initial_value, TagValue::Bool(false));

        let bad_int = TagSpec::new(2, "i", TagType::UInt16).with_value("n/a");
        assert_eq!(TagDescriptor::from_spec(&bad_int).initial_value, TagValue::UInt16(0));

        let float = TagSpec::new(3, "f", TagType::Float64).with_value("2.5");
        assert_eq!(TagDescriptor::from_spec(&float).initial_value, TagValue::Float64(2.5));

        let text = TagSpec::new(4, "s", TagType::String).with_value(12);
        assert_eq!(TagDescriptor::from_spec(&text).initial_value, TagValue::from("12"));
    }

    #[test]
    fn test_tag_key_parsing() {
        assert_eq!(parse_tag_key("7:gp1_freq"), Some((7, "gp1_freq")));
        assert_eq!(parse_tag_key("7:a:b"), Some((7, "a:b")));
        assert_eq!(parse_tag_key("x:y"), None);
        assert_eq!(parse_tag_key("noseparator"), None);
        assert_eq!(tag_key(3, "m"), "3:m");
    }
}
