use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use sqlx::types::Json;
use sqlx::FromRow;

pub const DEFAULT_RESUME_NAME: &str = "Untitled Resume";

/// One row of the `resumes` table. `tags` and `data` are JSON text columns.
#[derive(Debug, Clone, FromRow)]
pub struct ResumeRow {
    pub id: String,
    pub name: String,
    pub tags: Json<Value>,
    #[sqlx(rename = "lastEdited")]
    pub last_edited: DateTime<Utc>,
    pub data: Json<Value>,
}

/// Wire shape of a resume. `lastEdited` is the UTC calendar date only.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resume {
    pub id: String,
    pub name: String,
    pub tags: Value,
    pub last_edited: String,
    pub data: Value,
}

impl From<ResumeRow> for Resume {
    fn from(row: ResumeRow) -> Self {
        Resume {
            last_edited: to_date_string(&row.last_edited),
            id: row.id,
            name: row.name,
            tags: row.tags.0,
            data: row.data.0,
        }
    }
}

/// Projects a timestamp onto its UTC calendar date (`YYYY-MM-DD`).
pub fn to_date_string(ts: &DateTime<Utc>) -> String {
    ts.date_naive().format("%Y-%m-%d").to_string()
}

/// Server-generated id: `resume-` followed by the epoch milliseconds of `now`.
pub fn generate_resume_id(now: DateTime<Utc>) -> String {
    format!("resume-{}", now.timestamp_millis())
}

/// POST body. Every field is optional and any JSON type is accepted;
/// see [`CreateResumeRequest::into_new_resume`].
#[derive(Debug, Default, Deserialize)]
pub struct CreateResumeRequest {
    pub id: Option<Value>,
    pub name: Option<Value>,
    pub tags: Option<Value>,
    pub data: Option<Value>,
}

/// A fully defaulted resume ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewResume {
    pub id: String,
    /// Set when `id` was derived from the clock rather than sent by the client.
    pub id_generated: bool,
    pub name: String,
    pub tags: Value,
    pub data: Value,
}

impl CreateResumeRequest {
    /// Fills defaults: any absent or empty field takes its default value.
    pub fn into_new_resume(self, now: DateTime<Utc>) -> NewResume {
        let id = self.id.filter(|v| !is_falsy(v)).map(into_text);
        NewResume {
            id_generated: id.is_none(),
            id: id.unwrap_or_else(|| generate_resume_id(now)),
            name: self
                .name
                .filter(|v| !is_falsy(v))
                .map(into_text)
                .unwrap_or_else(|| DEFAULT_RESUME_NAME.to_string()),
            tags: self.tags.filter(|v| !is_falsy(v)).unwrap_or_else(|| json!([])),
            data: self.data.filter(|v| !is_falsy(v)).unwrap_or_else(|| json!({})),
        }
    }
}

/// PUT body. A key that is present overwrites the stored field; absent keys are
/// left alone. For `tags` and `data` an explicit `null` counts as present;
/// a `null` name is ignored and any other name is stored as text.
#[derive(Debug, Default, Deserialize)]
pub struct ResumePatch {
    #[serde(default, deserialize_with = "text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub tags: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub data: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Value>::deserialize(deserializer).map(|v| v.map(into_text))
}

/// Text-column form of a JSON value: strings as-is, anything else as its JSON text.
fn into_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
