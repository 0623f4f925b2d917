use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One form submission as returned by the Graph API
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawLead {
    /// Empty when the API omits the id or sends null
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub field_data: Vec<FieldData>,
    /// Any other top-level keys, kept for fallback lookups
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldData {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub values: Vec<String>,
}

/// A lead in the exported schema. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedLead {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub created_time: String,
}

impl NormalizedLead {
    pub const COLUMNS: [&'static str; 5] = ["id", "name", "email", "phone", "created_time"];

    pub fn has_contact(&self) -> bool {
        !self.email.is_empty() || !self.phone.is_empty()
    }
}

/// One page of the leads edge
#[derive(Debug, Deserialize)]
pub struct LeadsPage {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<RawLead>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub next: Option<String>,
}

impl LeadsPage {
    pub fn next_url(&self) -> Option<&str> {
        self.paging
            .as_ref()
            .and_then(|p| p.next.as_deref())
            .filter(|next| !next.is_empty())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected lead id to be a string, got {}",
            other
        ))),
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::String(s) => vec![s],
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::Number(n) => vec![n.to_string()],
        _ => Vec::new(),
    };
    Ok(values)
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
