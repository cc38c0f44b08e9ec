use crate::error::EngineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;
use url::Url;
use uuid::Uuid;

/// A webhook endpoint that receives rendered messages.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Destination {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    pub webhook_url: Url,
    pub owner_id: Uuid,
}

#[async_trait]
pub trait DestinationStorage: Send + Sync {
    /// Returns `None` when the destination does not exist or belongs to another owner.
    async fn find_by_id(&self, id: Uuid, owner_id: Uuid)
        -> Result<Option<Destination>, EngineError>;
}

#[derive(Default, Debug)]
pub struct MemoryDestinationStorage(HashMap<Uuid, Destination>);

impl MemoryDestinationStorage {
    pub fn add_destination(&mut self, destination: Destination) {
        info!(
            destination.id = %destination.id,
            destination.owner_id = %destination.owner_id,
            "Added destination"
        );
        self.0.insert(destination.id, destination);
    }
}

#[async_trait]
impl DestinationStorage for MemoryDestinationStorage {
    async fn find_by_id(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Destination>, EngineError> {
        Ok(self
            .0
            .get(&id)
            .filter(|destination| destination.owner_id == owner_id)
            .cloned())
    }
}
