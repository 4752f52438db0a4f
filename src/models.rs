use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Reply shape shared by every façade operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }
}

/// Login form contents, forwarded to the façade untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(pub Map<String, Value>);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockQuery {
    pub id: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct StockPath {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MainContext {
    pub categories: Value,
}

#[derive(Debug, Serialize)]
pub struct CompanyContext {
    pub company: Value,
    pub stocks: Value,
    pub stats: Value,
    pub users: Value,
    pub categories: Value,
}

#[derive(Debug, Serialize)]
pub struct StockContext {
    pub stock: Value,
    pub stats: Value,
    pub categories: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A stock form as the browser would serialize it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockForm {
    pub fields: Vec<(String, String)>,
    pub logo: Option<LogoUpload>,
}

impl StockForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn with_logo(mut self, logo: LogoUpload) -> Self {
        self.logo = Some(logo);
        self
    }
}

/// Locally held copy of a façade-owned stock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl StockRecord {
    pub fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::parse(&self.id)),
            "startDate" => self.start_date.as_deref().map(FieldValue::Text),
            "endDate" => self.end_date.as_deref().map(FieldValue::Text),
            "logo" => self.logo.as_deref().map(FieldValue::Text),
            other => match self.extra.get(other)? {
                Value::String(text) => Some(FieldValue::Text(text)),
                Value::Number(number) => Some(FieldValue::Number(number.clone())),
                _ => None,
            },
        }
    }

    /// Form values replacing a numeric field stay numeric when they parse.
    pub fn set_field(&mut self, name: &str, value: String) {
        match name {
            "id" => self.id = value,
            "startDate" => self.start_date = Some(value),
            "endDate" => self.end_date = Some(value),
            "logo" => self.logo = Some(value),
            other => {
                let value = match (self.extra.get(other), value.trim().parse::<Number>()) {
                    (Some(Value::Number(_)), Ok(number)) => Value::Number(number),
                    _ => Value::String(value),
                };
                self.extra.insert(other.to_string(), value);
            }
        }
    }
}

/// A sortable, displayable field of a [`StockRecord`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Number(Number),
    Text(&'a str),
}

impl<'a> FieldValue<'a> {
    fn parse(text: &'a str) -> Self {
        text.parse::<Number>()
            .map(FieldValue::Number)
            .unwrap_or(FieldValue::Text(text))
    }

    /// Numbers compare numerically and sort before text.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => {
                let a = a.as_f64().unwrap_or(f64::NAN);
                let b = b.as_f64().unwrap_or(f64::NAN);
                a.total_cmp(&b)
            }
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or numeric id, got {other}"
        ))),
    }
}

/// Renders a façade identifier the way it appears in URLs and forms.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
