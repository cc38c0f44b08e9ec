//! Typed access to Notion page property values.
//!
//! A page property arrives as a loosely-shaped JSON object. Its shape is only
//! known once the property kind is taken from the database schema, so parsing
//! happens in two steps: [`RawProperty::parse`] lifts the JSON into one variant
//! per kind, then [`RawProperty::decode`] (matching) or
//! [`RawProperty::display`] (formatting) reduce it to a canonical value.

use crate::schema::{PropertyKind, PropertySchema};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, warn};

/// Page properties as received in a webhook, keyed by property name.
pub type PageProperties = Map<String, Value>;

pub const DATE_DISPLAY_FORMAT: &str = "%Y/%m/%d %H:%M";
pub const LIST_SEPARATOR: &str = ", ";

const CHECKBOX_CHECKED: &str = "✅";
const CHECKBOX_UNCHECKED: &str = "⬜";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
}

pub fn plain_text(runs: &[RichText]) -> String {
    runs.iter().map(|run| run.plain_text.as_str()).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SelectValue {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Person {
    fn label(&self) -> Option<&str> {
        non_empty(self.name.as_deref()).or(non_empty(self.id.as_deref()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FileUrl {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FileRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub file: Option<FileUrl>,
    #[serde(default)]
    pub external: Option<FileUrl>,
}

impl FileRef {
    fn label(&self) -> Option<&str> {
        non_empty(self.name.as_deref())
            .or(non_empty(self.url.as_deref()))
            .or_else(|| non_empty(self.file.as_ref()?.url.as_deref()))
            .or_else(|| non_empty(self.external.as_ref()?.url.as_deref()))
    }
}

/// A page property value, shaped by the kind declared in the database schema.
#[derive(Debug, Clone, PartialEq)]
pub enum RawProperty {
    Title(Vec<RichText>),
    RichText(Vec<RichText>),
    Number(Option<f64>),
    Select(Option<SelectValue>),
    MultiSelect(Vec<SelectValue>),
    Status(Option<SelectValue>),
    Checkbox(bool),
    Date(Option<DateRange>),
    People(Vec<Person>),
    Files(Vec<FileRef>),
    Url(Option<String>),
    Email(Option<String>),
    PhoneNumber(Option<String>),
    Unsupported { kind: String, raw: Value },
}

/// Returned by [`RawProperty::decode`] for kinds that cannot take part in matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Undecodable {
    pub kind: String,
}

/// Canonical value of a property, shared by condition evaluation and formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(DateValue),
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateValue {
    pub start: String,
    pub end: Option<String>,
}

impl DateValue {
    pub fn start_instant(&self) -> Option<DateTime<FixedOffset>> {
        parse_date(&self.start)
    }
}

impl DecodedValue {
    pub fn is_empty(&self) -> bool {
        match self {
            DecodedValue::Empty => true,
            DecodedValue::Text(text) => text.is_empty(),
            DecodedValue::List(items) => items.is_empty(),
            DecodedValue::Number(_) | DecodedValue::Bool(_) | DecodedValue::Date(_) => false,
        }
    }
}

/// String form used by equality conditions.
impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedValue::Empty => Ok(()),
            DecodedValue::Text(text) => f.write_str(text),
            DecodedValue::Number(number) => f.write_str(&format_number(*number)),
            DecodedValue::Bool(value) => write!(f, "{value}"),
            DecodedValue::Date(date) => f.write_str(&date.start),
            DecodedValue::List(items) => f.write_str(&items.join(",")),
        }
    }
}

pub fn decode(raw: &Value, schema: &PropertySchema) -> Result<DecodedValue, Undecodable> {
    RawProperty::parse(&schema.kind, raw).decode()
}

impl RawProperty {
    pub fn parse(kind: &PropertyKind, raw: &Value) -> Self {
        match kind {
            PropertyKind::Title => RawProperty::Title(field(raw, "title")),
            PropertyKind::RichText => RawProperty::RichText(field(raw, "rich_text")),
            PropertyKind::Number => RawProperty::Number(field(raw, "number")),
            PropertyKind::Select => RawProperty::Select(field(raw, "select")),
            PropertyKind::MultiSelect => RawProperty::MultiSelect(field(raw, "multi_select")),
            PropertyKind::Status => RawProperty::Status(field(raw, "status")),
            PropertyKind::Checkbox => RawProperty::Checkbox(field(raw, "checkbox")),
            PropertyKind::Date => RawProperty::Date(field(raw, "date")),
            PropertyKind::People => RawProperty::People(field(raw, "people")),
            PropertyKind::Files => RawProperty::Files(field(raw, "files")),
            PropertyKind::Url => RawProperty::Url(field(raw, "url")),
            PropertyKind::Email => RawProperty::Email(field(raw, "email")),
            PropertyKind::PhoneNumber => RawProperty::PhoneNumber(field(raw, "phone_number")),
            PropertyKind::Other(kind) => RawProperty::Unsupported {
                kind: kind.clone(),
                raw: raw.clone(),
            },
        }
    }

    pub fn decode(&self) -> Result<DecodedValue, Undecodable> {
        let value = match self {
            RawProperty::Title(runs) | RawProperty::RichText(runs) => {
                DecodedValue::Text(plain_text(runs))
            }
            RawProperty::Number(number) => number.map_or(DecodedValue::Empty, DecodedValue::Number),
            RawProperty::Select(option) | RawProperty::Status(option) => option
                .as_ref()
                .map_or(DecodedValue::Empty, |option| {
                    DecodedValue::Text(option.name.clone())
                }),
            RawProperty::MultiSelect(options) => DecodedValue::List(
                options.iter().map(|option| option.name.clone()).collect(),
            ),
            RawProperty::Checkbox(checked) => DecodedValue::Bool(*checked),
            RawProperty::Date(range) => match range {
                Some(DateRange {
                    start: Some(start),
                    end,
                }) if !start.is_empty() => DecodedValue::Date(DateValue {
                    start: start.clone(),
                    end: end.clone(),
                }),
                _ => DecodedValue::Empty,
            },
            RawProperty::People(people) => DecodedValue::List(
                people
                    .iter()
                    .filter_map(Person::label)
                    .map(str::to_owned)
                    .collect(),
            ),
            RawProperty::Files(files) => DecodedValue::List(
                files
                    .iter()
                    .filter_map(FileRef::label)
                    .map(str::to_owned)
                    .collect(),
            ),
            RawProperty::Url(text) | RawProperty::Email(text) | RawProperty::PhoneNumber(text) => {
                text.clone().map_or(DecodedValue::Empty, DecodedValue::Text)
            }
            RawProperty::Unsupported { kind, .. } => {
                return Err(Undecodable { kind: kind.clone() })
            }
        };
        Ok(value)
    }

    /// Human-readable rendering of the value. Never fails: unknown kinds fall
    /// back to a JSON dump and unparseable dates to their raw text.
    pub fn display(&self) -> String {
        match self {
            RawProperty::Checkbox(true) => CHECKBOX_CHECKED.to_owned(),
            RawProperty::Checkbox(false) => CHECKBOX_UNCHECKED.to_owned(),
            RawProperty::Unsupported { kind, raw } => {
                warn!(property.kind = %kind, "Unhandled property kind, dumping raw value");
                serde_json::to_string(raw).unwrap_or_else(|_| format!("[Unhandled type: {kind}]"))
            }
            _ => match self.decode() {
                Ok(DecodedValue::Date(date)) => {
                    let mut rendered = display_date(&date.start);
                    if let Some(end) = date.end.as_deref().filter(|end| !end.is_empty()) {
                        rendered.push_str(" ~ ");
                        rendered.push_str(&display_date(end));
                    }
                    rendered
                }
                Ok(DecodedValue::List(items)) => items.join(LIST_SEPARATOR),
                Ok(value) => value.to_string(),
                Err(_) => String::new(),
            },
        }
    }
}

/// Parses the date forms Notion emits: full RFC 3339 timestamps, naive
/// date-times and plain dates. Values without an offset are taken as UTC.
pub fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        return Some(date_time);
    }
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    Some(naive.and_utc().fixed_offset())
}

fn display_date(value: &str) -> String {
    match parse_date(value) {
        Some(date_time) => date_time
            .naive_local()
            .format(DATE_DISPLAY_FORMAT)
            .to_string(),
        None => {
            warn!(date = value, "Failed to parse date, rendering it verbatim");
            value.to_owned()
        }
    }
}

/// Integral numbers are printed without a fractional part.
pub fn format_number(number: f64) -> String {
    if number.is_finite() && number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

fn field<T: DeserializeOwned + Default>(raw: &Value, key: &str) -> T {
    match raw.get(key) {
        None | Some(Value::Null) => T::default(),
        Some(value) => T::deserialize(value).unwrap_or_else(|err| {
            debug!(property.field = key, error = %err, "Malformed property value, treating as empty");
            T::default()
        }),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}
