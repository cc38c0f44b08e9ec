pub mod cipher;
pub mod memory;

use crate::credentials::cipher::Cipher;
use crate::error::EngineError;
use crate::template::Template;
use async_trait::async_trait;
use futures::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::pin;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// An encrypted integration token belonging to one owner.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Credential {
    pub id: Uuid,
    pub owner_id: Uuid,
    #[serde(default)]
    pub name: String,
    /// `hex(iv):hex(tag):hex(data)`, see [`cipher::AesGcmCipher`].
    pub encrypted_token: String,
}

#[async_trait]
pub trait CredentialStorage: Send + Sync {
    /// Returns `None` when the credential does not exist or belongs to another owner.
    async fn find_by_id(&self, id: Uuid, owner_id: Uuid)
        -> Result<Option<Credential>, EngineError>;
}

/// Picks the integration token used to read a database schema.
pub struct CredentialResolver {
    storage: Arc<dyn CredentialStorage>,
    cipher: Arc<dyn Cipher>,
}

impl CredentialResolver {
    pub fn new(storage: Arc<dyn CredentialStorage>, cipher: Arc<dyn Cipher>) -> Self {
        Self { storage, cipher }
    }

    /// Tries the credentials of `templates` in order and returns the first
    /// token that decrypts. Templates without a credential are skipped.
    pub async fn resolve_token(&self, templates: &[Template]) -> Option<String> {
        let candidates = templates.iter().filter_map(|template| {
            template
                .credential_id
                .map(|credential_id| (template, credential_id))
        });

        let tokens = stream::iter(candidates)
            .then(|(template, credential_id)| async move {
                self.unseal(credential_id, template.owner_id)
                    .await
                    .inspect_err(|err| {
                        warn!(
                            template.id = %template.id,
                            credential.id = %credential_id,
                            error = %err,
                            "Skipping unusable credential"
                        )
                    })
            })
            .filter_map(|result| async move { result.ok() });
        let mut tokens = pin!(tokens);

        let token = tokens.next().await;
        if token.is_none() {
            debug!("No usable credential among matched templates");
        }
        token
    }

    async fn unseal(&self, credential_id: Uuid, owner_id: Uuid) -> Result<String, EngineError> {
        let credential = self
            .storage
            .find_by_id(credential_id, owner_id)
            .await?
            .ok_or_else(|| {
                EngineError::Access(format!(
                    "credential {credential_id} is not available to owner {owner_id}"
                ))
            })?;
        self.cipher.decrypt(&credential.encrypted_token)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::cipher::AesGcmCipher;
    use super::memory::MemoryCredentialStorage;
    use super::*;
    use chrono::Utc;

    pub(crate) const KEY: &str =
        "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    pub(crate) fn cipher() -> Arc<AesGcmCipher> {
        Arc::new(AesGcmCipher::from_hex_key(KEY).unwrap())
    }

    pub(crate) fn credential(owner_id: Uuid, encrypted_token: String) -> Credential {
        Credential {
            id: Uuid::now_v7(),
            owner_id,
            name: "notion".to_string(),
            encrypted_token,
        }
    }

    fn template(owner_id: Uuid, credential_id: Option<Uuid>) -> Template {
        Template {
            id: Uuid::now_v7(),
            name: "t".to_string(),
            database_id: "db-1".to_string(),
            body: String::new(),
            conditions: vec![],
            destination_id: Uuid::now_v7(),
            owner_id,
            credential_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_first_decryptable_credential_wins() {
        let cipher = cipher();
        let owner = Uuid::now_v7();
        let broken = credential(owner, "00:11:22".to_string());
        let good = credential(owner, cipher.encrypt("secret_b").unwrap());
        let later = credential(owner, cipher.encrypt("secret_c").unwrap());

        let mut storage = MemoryCredentialStorage::default();
        storage.add_credential(broken.clone());
        storage.add_credential(good.clone());
        storage.add_credential(later.clone());
        let resolver = CredentialResolver::new(Arc::new(storage), cipher);

        let templates = vec![
            template(owner, None),
            template(owner, Some(broken.id)),
            template(owner, Some(good.id)),
            template(owner, Some(later.id)),
        ];
        assert_eq!(
            resolver.resolve_token(&templates).await.as_deref(),
            Some("secret_b")
        );
    }

    #[tokio::test]
    async fn test_foreign_and_missing_credentials_are_skipped() {
        let cipher = cipher();
        let owner = Uuid::now_v7();
        let stranger = Uuid::now_v7();
        let foreign = credential(stranger, cipher.encrypt("not yours").unwrap());

        let mut storage = MemoryCredentialStorage::default();
        storage.add_credential(foreign.clone());
        let resolver = CredentialResolver::new(Arc::new(storage), cipher);

        let templates = vec![
            template(owner, Some(foreign.id)),
            template(owner, Some(Uuid::now_v7())),
        ];
        assert_eq!(resolver.resolve_token(&templates).await, None);
    }

    #[tokio::test]
    async fn test_no_credentials_at_all() {
        let resolver =
            CredentialResolver::new(Arc::new(MemoryCredentialStorage::default()), cipher());
        let templates = vec![template(Uuid::now_v7(), None)];
        assert_eq!(resolver.resolve_token(&templates).await, None);
        assert_eq!(resolver.resolve_token(&[]).await, None);
    }
}
