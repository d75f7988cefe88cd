use std::collections::BTreeMap;

use crate::error::{invalid_argument, StoreResult};
use crate::model::{DocumentKey, FieldPath};
use crate::value::{FieldValue, MapValue, ValueKind};

/// Pre-encoded data for partial-merge updates: the patch plus the leaf
/// field paths it touches, which become the write's update mask.
#[derive(Clone, Debug)]
pub struct EncodedUpdateData {
    pub map: MapValue,
    pub field_paths: Vec<FieldPath>,
}

pub fn encode_update_data(data: BTreeMap<String, FieldValue>) -> StoreResult<EncodedUpdateData> {
    if data.is_empty() {
        return Err(invalid_argument(
            "update requires at least one field/value pair",
        ));
    }
    let field_paths = collect_update_paths(&data)?;
    Ok(EncodedUpdateData {
        map: MapValue::new(data),
        field_paths,
    })
}

pub fn validate_document_path(path: &str) -> StoreResult<DocumentKey> {
    DocumentKey::from_string(path)
}

fn collect_update_paths(data: &BTreeMap<String, FieldValue>) -> StoreResult<Vec<FieldPath>> {
    let mut paths = Vec::new();
    for (key, value) in data {
        collect_paths_from_value(&mut paths, vec![key.clone()], value)?;
    }
    Ok(paths)
}

fn collect_paths_from_value(
    acc: &mut Vec<FieldPath>,
    segments: Vec<String>,
    value: &FieldValue,
) -> StoreResult<()> {
    match value.kind() {
        ValueKind::Map(map) if !map.fields().is_empty() => {
            for (child_key, child_value) in map.fields() {
                let mut child_segments = segments.clone();
                child_segments.push(child_key.clone());
                collect_paths_from_value(acc, child_segments, child_value)?;
            }
            Ok(())
        }
        _ => {
            acc.push(FieldPath::new(segments)?);
            Ok(())
        }
    }
}

pub(crate) fn value_for_field_path(map: &MapValue, path: &FieldPath) -> Option<FieldValue> {
    value_for_segments(map, path.segments())
}

fn value_for_segments(map: &MapValue, segments: &[String]) -> Option<FieldValue> {
    let (first, rest) = segments.split_first()?;
    let value = map.fields().get(first)?;
    if rest.is_empty() {
        Some(value.clone())
    } else if let ValueKind::Map(child) = value.kind() {
        value_for_segments(child, rest)
    } else {
        None
    }
}

pub(crate) fn set_value_at_field_path(
    fields: &mut BTreeMap<String, FieldValue>,
    path: &FieldPath,
    value: FieldValue,
) {
    set_value_at_segments(fields, path.segments(), value);
}

fn set_value_at_segments(
    fields: &mut BTreeMap<String, FieldValue>,
    segments: &[String],
    value: FieldValue,
) {
    if segments.is_empty() {
        return;
    }

    if segments.len() == 1 {
        fields.insert(segments[0].clone(), value);
        return;
    }

    let first = &segments[0];
    let entry = fields
        .entry(first.clone())
        .or_insert_with(|| FieldValue::from_map(BTreeMap::new()));

    // A non-map value along the path is replaced by a map holding the patch.
    let mut child_fields = match entry.kind() {
        ValueKind::Map(map) => map.fields().clone(),
        _ => BTreeMap::new(),
    };

    set_value_at_segments(&mut child_fields, &segments[1..], value);
    *entry = FieldValue::from_map(child_fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_collects_leaf_paths() {
        let mut stats = BTreeMap::new();
        stats.insert("visits".to_string(), FieldValue::from_integer(2));
        stats.insert("shares".to_string(), FieldValue::from_integer(9));
        let mut data = BTreeMap::new();
        data.insert("stats".to_string(), FieldValue::from_map(stats));
        data.insert("state".to_string(), FieldValue::from_string("open"));

        let encoded = encode_update_data(data).unwrap();
        let paths: Vec<String> = encoded
            .field_paths
            .iter()
            .map(FieldPath::canonical_string)
            .collect();
        assert_eq!(paths, vec!["state", "stats.shares", "stats.visits"]);
    }

    #[test]
    fn empty_update_is_rejected() {
        let err = encode_update_data(BTreeMap::new()).unwrap_err();
        assert_eq!(err.code_str(), "docstore/invalid-argument");
    }

    #[test]
    fn nested_set_and_get_roundtrip() {
        let mut fields = BTreeMap::new();
        let path = FieldPath::from_dot_separated("stats.visits").unwrap();
        set_value_at_field_path(&mut fields, &path, FieldValue::from_integer(3));
        let map = MapValue::new(fields);
        assert_eq!(
            value_for_field_path(&map, &path),
            Some(FieldValue::from_integer(3))
        );
    }
}
