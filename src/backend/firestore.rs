//! Firestore REST document shapes and the mapping to journal entries.

use crate::errors::StoreError;
use crate::journal_entry::{EntryDraft, EntryId, JournalEntry, Mood, UserId};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub(crate) const FIELD_OWNER: &str = "uid";
pub(crate) const FIELD_TIMESTAMP: &str = "timestamp";

/// Firestore's typed value encoding, e.g. `{"stringValue": "hi"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct ArrayValue {
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "known_values"
    )]
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct MapValue {
    #[serde(default, deserialize_with = "known_fields")]
    pub fields: BTreeMap<String, Value>,
}

// References, geo points and bytes have no place in an entry; they are
// skipped rather than failing the whole document.
fn known_fields<'de, D>(deserializer: D) -> Result<BTreeMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| serde_json::from_value(value).ok().map(|v| (key, v)))
        .collect())
}

fn known_values<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Document {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "known_fields")]
    pub fields: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
}

/// One row of a `runQuery` response; rows without a document carry only
/// read metadata.
#[derive(Debug, Deserialize)]
pub(crate) struct QueryRow {
    #[serde(default)]
    pub document: Option<Document>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CommitRequest {
    pub writes: Vec<Write>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Write {
    pub update: Document,
    pub current_document: Precondition,
    pub update_transforms: Vec<FieldTransform>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Precondition {
    pub exists: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FieldTransform {
    pub field_path: String,
    pub set_to_server_value: String,
}

impl Write {
    /// Full-document write that stamps the server timestamp. `must_exist`
    /// distinguishes update from create.
    pub fn upsert(name: String, draft: &EntryDraft, must_exist: bool) -> Self {
        Write {
            update: Document {
                name,
                fields: encode_fields(draft),
                ..Document::default()
            },
            current_document: Precondition { exists: must_exist },
            update_transforms: vec![FieldTransform {
                field_path: FIELD_TIMESTAMP.to_string(),
                set_to_server_value: "REQUEST_TIME".to_string(),
            }],
        }
    }
}

fn timestamp(value: DateTime<Utc>) -> Value {
    Value::TimestampValue(value.to_rfc3339_opts(SecondsFormat::Micros, true))
}

pub(crate) fn encode_fields(draft: &EntryDraft) -> BTreeMap<String, Value> {
    let mut fields = BTreeMap::new();
    fields.insert(
        FIELD_OWNER.to_string(),
        Value::StringValue(draft.owner_id.to_string()),
    );
    fields.insert(
        "title".to_string(),
        match &draft.title {
            Some(title) => Value::StringValue(title.clone()),
            None => Value::NullValue(()),
        },
    );
    fields.insert("text".to_string(), Value::StringValue(draft.text.clone()));
    fields.insert("date".to_string(), timestamp(draft.date));
    fields.insert(
        "mood".to_string(),
        Value::StringValue(draft.mood.as_str().to_string()),
    );
    fields.insert(
        "tags".to_string(),
        Value::ArrayValue(ArrayValue {
            values: draft
                .tags
                .iter()
                .map(|tag| Value::StringValue(tag.clone()))
                .collect(),
        }),
    );
    fields
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn time_field(fields: &BTreeMap<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    match fields.get(key)? {
        // Older clients stored the date as an ISO string.
        Value::TimestampValue(raw) | Value::StringValue(raw) => parse_time(raw),
        _ => None,
    }
}

fn string_field<'a>(fields: &'a BTreeMap<String, Value>, key: &str) -> Option<&'a str> {
    match fields.get(key)? {
        Value::StringValue(s) => Some(s),
        _ => None,
    }
}

/// Maps a stored document to an entry, filling the same defaults the form
/// would: neutral mood, no tags, and a date taken from the write time when
/// the document has none.
pub(crate) fn decode_entry(doc: &Document) -> Result<JournalEntry, StoreError> {
    let id = doc
        .name
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| StoreError::Decode("document without a name".to_string()))?;
    let owner = string_field(&doc.fields, FIELD_OWNER)
        .ok_or_else(|| StoreError::Decode(format!("document {id} has no owner")))?;

    let created_at = time_field(&doc.fields, FIELD_TIMESTAMP);
    let date = time_field(&doc.fields, "date")
        .or(created_at)
        .or_else(|| doc.create_time.as_deref().and_then(parse_time))
        .unwrap_or_default();

    let tags = match doc.fields.get("tags") {
        Some(Value::ArrayValue(array)) => array
            .values
            .iter()
            .filter_map(|v| match v {
                Value::StringValue(tag) if !tag.trim().is_empty() => Some(tag.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    Ok(JournalEntry {
        id: EntryId::new(id),
        owner_id: UserId::new(owner),
        title: string_field(&doc.fields, "title")
            .filter(|t| !t.is_empty())
            .map(str::to_string),
        text: string_field(&doc.fields, "text").unwrap_or_default().to_string(),
        date,
        mood: string_field(&doc.fields, "mood")
            .map(Mood::parse_lenient)
            .unwrap_or_default(),
        tags,
        created_at,
    })
}
