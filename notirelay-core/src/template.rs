use crate::condition::Condition;
use crate::error::EngineError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

/// A rule mapping match conditions on one database to a message and a destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    pub database_id: String,
    /// Message body with `{Property Name}` and `{_special}` placeholders.
    pub body: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    pub destination_id: Uuid,
    pub owner_id: Uuid,
    #[serde(default)]
    pub credential_id: Option<Uuid>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait TemplateStorage: Send + Sync {
    /// Templates of every owner that target `database_id`.
    async fn list_by_database(&self, database_id: &str) -> Result<Vec<Template>, EngineError>;
}

#[derive(Default, Debug)]
pub struct MemoryTemplateStorage(HashMap<String, Vec<Template>>);

impl MemoryTemplateStorage {
    pub fn add_template(&mut self, template: Template) {
        info!(
            template.id = %template.id,
            template.database_id = %template.database_id,
            "Added template"
        );
        self.0
            .entry(template.database_id.clone())
            .or_default()
            .push(template);
    }
}

#[async_trait]
impl TemplateStorage for MemoryTemplateStorage {
    async fn list_by_database(&self, database_id: &str) -> Result<Vec<Template>, EngineError> {
        Ok(self.0.get(database_id).cloned().unwrap_or_default())
    }
}
