use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{json, Value as JsonValue};

use crate::error::{invalid_argument, StoreResult};
use crate::model::{DatabaseId, DocumentKey, FieldPath, Timestamp};
use crate::value::{FieldValue, MapValue, ValueKind};

/// Translates between crate values and the store's tagged-JSON wire
/// dialect, and renders the resource names and write bodies the REST
/// endpoints expect.
#[derive(Clone, Debug)]
pub struct JsonSerializer {
    database_id: DatabaseId,
}

impl JsonSerializer {
    pub fn new(database_id: DatabaseId) -> Self {
        Self { database_id }
    }

    pub fn database_name(&self) -> String {
        format!(
            "projects/{}/databases/{}",
            self.database_id.project_id(),
            self.database_id.database()
        )
    }

    pub fn document_name(&self, key: &DocumentKey) -> String {
        format!(
            "{}/documents/{}",
            self.database_name(),
            key.path().canonical_string()
        )
    }

    pub fn encode_document_fields(&self, map: &MapValue) -> JsonValue {
        json!({
            "fields": encode_map_fields(map)
        })
    }

    /// Encodes a full-document write (create or overwrite).
    pub fn encode_set_write(&self, key: &DocumentKey, map: &MapValue) -> JsonValue {
        json!({
            "update": {
                "name": self.document_name(key),
                "fields": encode_map_fields(map)
            }
        })
    }

    /// Encodes a partial-merge write: the touched paths become the update
    /// mask and the write carries an exists precondition, so updating an
    /// absent document fails rather than creating it.
    pub fn encode_update_write(
        &self,
        key: &DocumentKey,
        map: &MapValue,
        field_paths: &[FieldPath],
    ) -> JsonValue {
        let mask: Vec<String> = field_paths.iter().map(FieldPath::canonical_string).collect();
        json!({
            "update": {
                "name": self.document_name(key),
                "fields": encode_map_fields(map)
            },
            "updateMask": { "fieldPaths": mask },
            "currentDocument": { "exists": true }
        })
    }

    pub fn encode_delete_write(&self, key: &DocumentKey) -> JsonValue {
        json!({
            "delete": self.document_name(key)
        })
    }

    pub fn decode_document_fields(&self, value: &JsonValue) -> StoreResult<MapValue> {
        decode_map_value(value)
    }

    pub fn encode_value(&self, value: &FieldValue) -> JsonValue {
        encode_value(value)
    }
}

fn encode_map_fields(map: &MapValue) -> JsonValue {
    let mut fields = serde_json::Map::new();
    for (key, value) in map.fields() {
        fields.insert(key.clone(), encode_value(value));
    }
    JsonValue::Object(fields)
}

fn encode_value(value: &FieldValue) -> JsonValue {
    match value.kind() {
        ValueKind::Null => json!({ "nullValue": JsonValue::Null }),
        ValueKind::Boolean(boolean) => json!({ "booleanValue": boolean }),
        ValueKind::Integer(integer) => json!({ "integerValue": integer.to_string() }),
        ValueKind::Double(double) => json!({ "doubleValue": double }),
        ValueKind::Timestamp(timestamp) => json!({ "timestampValue": encode_timestamp(timestamp) }),
        ValueKind::String(string) => json!({ "stringValue": string }),
        ValueKind::Array(array) => {
            let values = array.values().iter().map(encode_value).collect::<Vec<_>>();
            json!({ "arrayValue": { "values": values } })
        }
        ValueKind::Map(map) => json!({
            "mapValue": {
                "fields": encode_map_fields(map)
            }
        }),
    }
}

fn decode_map_value(value: &JsonValue) -> StoreResult<MapValue> {
    let map = value
        .as_object()
        .ok_or_else(|| invalid_argument("Expected object for map value"))?;
    let fields_object = match map.get("fields") {
        Some(fields_value) => fields_value
            .as_object()
            .ok_or_else(|| invalid_argument("Expected 'fields' to be an object"))?,
        // A document can exist with no user fields at all.
        None => return Ok(MapValue::empty()),
    };

    let mut fields = BTreeMap::new();
    for (key, value) in fields_object {
        fields.insert(key.clone(), decode_value(value)?);
    }
    Ok(MapValue::new(fields))
}

fn decode_value(value: &JsonValue) -> StoreResult<FieldValue> {
    let object = value
        .as_object()
        .ok_or_else(|| invalid_argument("Expected tagged value object"))?;
    if let Some(null_value) = object.get("nullValue") {
        if null_value.is_null() {
            return Ok(FieldValue::null());
        }
    }
    if let Some(bool_value) = object.get("booleanValue") {
        let value = bool_value
            .as_bool()
            .ok_or_else(|| invalid_argument("booleanValue must be bool"))?;
        return Ok(FieldValue::from_bool(value));
    }
    if let Some(integer_value) = object.get("integerValue") {
        let parsed = match integer_value {
            JsonValue::String(value) => i64::from_str(value)
                .map_err(|err| invalid_argument(format!("Invalid integerValue: {err}")))?,
            JsonValue::Number(number) => number
                .as_i64()
                .ok_or_else(|| invalid_argument("Integer out of range"))?,
            _ => return Err(invalid_argument("integerValue must be a string or number")),
        };
        return Ok(FieldValue::from_integer(parsed));
    }
    if let Some(double_value) = object.get("doubleValue") {
        let parsed = match double_value {
            JsonValue::Number(number) => number
                .as_f64()
                .ok_or_else(|| invalid_argument("Invalid doubleValue"))?,
            JsonValue::String(value) => value
                .parse::<f64>()
                .map_err(|err| invalid_argument(format!("Invalid doubleValue: {err}")))?,
            _ => return Err(invalid_argument("doubleValue must be a number or string")),
        };
        return Ok(FieldValue::from_double(parsed));
    }
    if let Some(timestamp_value) = object.get("timestampValue") {
        let timestamp_str = timestamp_value
            .as_str()
            .ok_or_else(|| invalid_argument("timestampValue must be string"))?;
        return Ok(FieldValue::from_timestamp(parse_timestamp(timestamp_str)?));
    }
    if let Some(string_value) = object.get("stringValue") {
        let str_value = string_value
            .as_str()
            .ok_or_else(|| invalid_argument("stringValue must be string"))?;
        return Ok(FieldValue::from_string(str_value));
    }
    if let Some(array_value) = object.get("arrayValue") {
        let decoded = match array_value.get("values").and_then(JsonValue::as_array) {
            Some(entries) => entries
                .iter()
                .map(decode_value)
                .collect::<StoreResult<Vec<_>>>()?,
            None => Vec::new(),
        };
        return Ok(FieldValue::from_array(decoded));
    }
    if let Some(map_value) = object.get("mapValue") {
        let map = decode_map_value(map_value)?;
        return Ok(FieldValue::from_map(map.into_fields()));
    }

    Err(invalid_argument("Unknown tagged value type"))
}

fn encode_timestamp(timestamp: &Timestamp) -> String {
    Utc.timestamp_opt(timestamp.seconds, timestamp.nanos as u32)
        .single()
        .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().expect("zero timestamp"))
        .to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(value: &str) -> StoreResult<Timestamp> {
    let datetime = DateTime::parse_from_rfc3339(value)
        .map_err(|err| invalid_argument(format!("Invalid timestamp: {err}")))?;
    let datetime_utc = datetime.with_timezone(&Utc);
    Ok(Timestamp::new(
        datetime_utc.timestamp(),
        datetime_utc.timestamp_subsec_nanos() as i32,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let mut inner = BTreeMap::new();
        inner.insert("flag".to_string(), FieldValue::from_bool(true));
        let mut map = BTreeMap::new();
        map.insert("name".to_string(), FieldValue::from_string("Ada"));
        map.insert("age".to_string(), FieldValue::from_integer(42));
        map.insert("nested".to_string(), FieldValue::from_map(inner));
        map.insert(
            "seen".to_string(),
            FieldValue::from_timestamp(Timestamp::new(1_700_000_000, 250_000_000)),
        );
        let map = MapValue::new(map);

        let serializer = JsonSerializer::new(DatabaseId::default("project"));
        let encoded = serializer.encode_document_fields(&map);
        let decoded = serializer.decode_document_fields(&encoded).unwrap();
        assert_eq!(decoded, map);
    }

    #[test]
    fn update_write_carries_mask_and_precondition() {
        let serializer = JsonSerializer::new(DatabaseId::default("project"));
        let key = DocumentKey::from_string("orders/a17").unwrap();
        let mut fields = BTreeMap::new();
        fields.insert("total".to_string(), FieldValue::from_integer(12));
        let paths = vec![FieldPath::from_dot_separated("total").unwrap()];

        let write = serializer.encode_update_write(&key, &MapValue::new(fields), &paths);
        assert_eq!(write["updateMask"]["fieldPaths"][0], "total");
        assert_eq!(write["currentDocument"]["exists"], true);
        assert_eq!(
            write["update"]["name"],
            "projects/project/databases/(default)/documents/orders/a17"
        );
    }

    #[test]
    fn document_without_fields_decodes_empty() {
        let serializer = JsonSerializer::new(DatabaseId::default("project"));
        let decoded = serializer
            .decode_document_fields(&json!({ "name": "projects/p/databases/d/documents/a/b" }))
            .unwrap();
        assert!(decoded.fields().is_empty());
    }
}
