use crate::credentials::{Credential, CredentialStorage};
use crate::error::EngineError;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

#[derive(Default, Debug)]
pub struct MemoryCredentialStorage(HashMap<Uuid, Credential>);

impl MemoryCredentialStorage {
    pub fn add_credential(&mut self, credential: Credential) {
        info!(
            credential.id = %credential.id,
            credential.owner_id = %credential.owner_id,
            credential.name = %credential.name,
            "Added credential"
        );
        self.0.insert(credential.id, credential);
    }
}

#[async_trait]
impl CredentialStorage for MemoryCredentialStorage {
    async fn find_by_id(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Credential>, EngineError> {
        Ok(self
            .0
            .get(&id)
            .filter(|credential| credential.owner_id == owner_id)
            .cloned())
    }
}
