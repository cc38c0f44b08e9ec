use crate::error::EngineError;
use crate::property::{plain_text, RichText};
use async_trait::async_trait;
use metrics::{counter, Counter};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long a fetched database schema is served from memory.
pub const SCHEMA_TTL: Duration = Duration::from_secs(30 * 60);
const SCHEMA_CACHE_CAPACITY: u64 = 1_000;
const UNTITLED_DATABASE: &str = "Untitled Database";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PropertyKind {
    Title,
    RichText,
    Number,
    Select,
    MultiSelect,
    Status,
    Checkbox,
    Date,
    People,
    Files,
    Url,
    Email,
    PhoneNumber,
    Other(String),
}

impl PropertyKind {
    pub fn as_str(&self) -> &str {
        match self {
            PropertyKind::Title => "title",
            PropertyKind::RichText => "rich_text",
            PropertyKind::Number => "number",
            PropertyKind::Select => "select",
            PropertyKind::MultiSelect => "multi_select",
            PropertyKind::Status => "status",
            PropertyKind::Checkbox => "checkbox",
            PropertyKind::Date => "date",
            PropertyKind::People => "people",
            PropertyKind::Files => "files",
            PropertyKind::Url => "url",
            PropertyKind::Email => "email",
            PropertyKind::PhoneNumber => "phone_number",
            PropertyKind::Other(kind) => kind,
        }
    }

    fn has_options(&self) -> bool {
        matches!(
            self,
            PropertyKind::Select | PropertyKind::MultiSelect | PropertyKind::Status
        )
    }
}

impl From<String> for PropertyKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "title" => PropertyKind::Title,
            "rich_text" => PropertyKind::RichText,
            "number" => PropertyKind::Number,
            "select" => PropertyKind::Select,
            "multi_select" => PropertyKind::MultiSelect,
            "status" => PropertyKind::Status,
            "checkbox" => PropertyKind::Checkbox,
            "date" => PropertyKind::Date,
            "people" => PropertyKind::People,
            "files" => PropertyKind::Files,
            "url" => PropertyKind::Url,
            "email" => PropertyKind::Email,
            "phone_number" => PropertyKind::PhoneNumber,
            _ => PropertyKind::Other(value),
        }
    }
}

impl From<PropertyKind> for String {
    fn from(value: PropertyKind) -> Self {
        value.as_str().to_owned()
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyOption {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PropertyKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<PropertyOption>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub id: String,
    pub title: String,
    /// Keyed by property name.
    pub properties: BTreeMap<String, PropertySchema>,
}

impl DatabaseSchema {
    /// Finds a property by id or by name.
    pub fn resolve(&self, reference: &str) -> Option<&PropertySchema> {
        self.properties
            .values()
            .find(|property| property.id == reference || property.name == reference)
    }
}

/// Database object as returned by the schema API.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDatabase {
    #[serde(default)]
    pub object: String,
    pub id: String,
    #[serde(default)]
    pub title: Vec<RichText>,
    #[serde(default)]
    pub properties: BTreeMap<String, RawPropertyDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPropertyDefinition {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PropertyKind,
    /// Kind-specific configuration, e.g. `{"select": {"options": [...]}}`.
    #[serde(flatten)]
    pub config: Map<String, Value>,
}

#[derive(Deserialize)]
struct OptionsConfig {
    #[serde(default)]
    options: Vec<PropertyOption>,
}

impl RawPropertyDefinition {
    fn options(&self) -> Option<Vec<PropertyOption>> {
        if !self.kind.has_options() {
            return None;
        }
        let config = self.config.get(self.kind.as_str())?;
        match OptionsConfig::deserialize(config) {
            Ok(config) => Some(config.options),
            Err(err) => {
                warn!(property.name = %self.name, error = %err, "Malformed option list in schema");
                None
            }
        }
    }
}

impl From<RawDatabase> for DatabaseSchema {
    fn from(raw: RawDatabase) -> Self {
        let title = match plain_text(&raw.title) {
            title if title.is_empty() => UNTITLED_DATABASE.to_owned(),
            title => title,
        };

        let properties = raw
            .properties
            .into_iter()
            .map(|(key, definition)| {
                let options = definition.options();
                let property = PropertySchema {
                    id: definition.id,
                    name: definition.name,
                    kind: definition.kind,
                    options,
                };
                (key, property)
            })
            .collect();

        Self {
            id: raw.id,
            title,
            properties,
        }
    }
}

/// The remote API that owns database schemas.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Returns `Ok(None)` when the database does not exist or is not shared
    /// with the integration behind `token`.
    async fn fetch_schema(
        &self,
        database_id: &str,
        token: &str,
    ) -> Result<Option<RawDatabase>, EngineError>;
}

/// Read-through cache in front of a [`SchemaSource`].
///
/// Entries are keyed by database id alone, whichever token fetched them.
pub struct SchemaGateway {
    source: Arc<dyn SchemaSource>,
    cache: Cache<String, Arc<DatabaseSchema>>,
    cache_hit: Counter,
    cache_miss: Counter,
}

impl SchemaGateway {
    pub fn new(source: Arc<dyn SchemaSource>) -> Self {
        Self::with_ttl(source, SCHEMA_TTL)
    }

    pub fn with_ttl(source: Arc<dyn SchemaSource>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(SCHEMA_CACHE_CAPACITY)
            .time_to_live(ttl)
            .build();

        Self {
            source,
            cache,
            cache_hit: counter!("schema_cache_hit"),
            cache_miss: counter!("schema_cache_miss"),
        }
    }

    pub async fn get_schema(
        &self,
        database_id: &str,
        token: &str,
    ) -> Result<Option<Arc<DatabaseSchema>>, EngineError> {
        if let Some(schema) = self.cache.get(database_id).await {
            self.cache_hit.increment(1);
            debug!(database_id, "Schema cache hit");
            return Ok(Some(schema));
        }
        self.cache_miss.increment(1);
        debug!(database_id, "Schema cache miss, fetching");

        let Some(raw) = self.source.fetch_schema(database_id, token).await? else {
            info!(database_id, "Database schema not found");
            return Ok(None);
        };
        if raw.object != "database" {
            warn!(
                database_id,
                object = %raw.object,
                "Schema response is not a database object"
            );
            return Ok(None);
        }

        let schema = Arc::new(DatabaseSchema::from(raw));
        self.cache
            .insert(database_id.to_owned(), schema.clone())
            .await;
        Ok(Some(schema))
    }
}
