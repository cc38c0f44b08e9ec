use anyhow::Context;
use notirelay_core::credentials::memory::MemoryCredentialStorage;
use notirelay_core::credentials::Credential;
use notirelay_core::destination::{Destination, MemoryDestinationStorage};
use notirelay_core::template::{MemoryTemplateStorage, Template};
use serde::Deserialize;
use std::path::Path;

/// Stores file: templates, destinations and encrypted credentials.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Config {
    #[serde(default)]
    pub templates: Vec<Template>,
    #[serde(default)]
    pub destinations: Vec<Destination>,
    #[serde(default)]
    pub credentials: Vec<Credential>,
}

pub(crate) struct Stores {
    pub templates: MemoryTemplateStorage,
    pub destinations: MemoryDestinationStorage,
    pub credentials: MemoryCredentialStorage,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn into_stores(self) -> Stores {
        let mut stores = Stores {
            templates: MemoryTemplateStorage::default(),
            destinations: MemoryDestinationStorage::default(),
            credentials: MemoryCredentialStorage::default(),
        };
        for template in self.templates {
            stores.templates.add_template(template);
        }
        for destination in self.destinations {
            stores.destinations.add_destination(destination);
        }
        for credential in self.credentials {
            stores.credentials.add_credential(credential);
        }
        stores
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notirelay_core::condition::Operator;
    use notirelay_core::destination::DestinationStorage;
    use notirelay_core::template::TemplateStorage;
    use serde_json::json;
    use uuid::Uuid;

    const STORES: &str = r#"
[[credentials]]
id = "0190a5c8-0000-7000-8000-000000000001"
owner_id = "0190a5c8-0000-7000-8000-0000000000aa"
name = "workspace"
encrypted_token = "00:11:22"

[[destinations]]
id = "0190a5c8-0000-7000-8000-000000000002"
name = "team channel"
webhook_url = "https://discord.com/api/webhooks/1/abc"
owner_id = "0190a5c8-0000-7000-8000-0000000000aa"

[[templates]]
id = "0190a5c8-0000-7000-8000-000000000003"
name = "done tasks"
database_id = "db-1"
body = "{Name} is done"
destination_id = "0190a5c8-0000-7000-8000-000000000002"
owner_id = "0190a5c8-0000-7000-8000-0000000000aa"
credential_id = "0190a5c8-0000-7000-8000-000000000001"
conditions = [
    { property = "Status", operator = "=", value = "Done" },
    { property = "Tags", operator = "in", value = ["urgent", "p0"] },
    { property = "Due Date", operator = "is_not_empty" },
]
"#;

    #[tokio::test]
    async fn test_parses_stores_file() {
        let config: Config = toml::from_str(STORES).unwrap();
        assert_eq!(config.templates.len(), 1);

        let conditions = &config.templates[0].conditions;
        assert_eq!(conditions[0].operator, Operator::Eq);
        assert_eq!(conditions[1].value, json!(["urgent", "p0"]));
        assert_eq!(conditions[2].value, serde_json::Value::Null);

        let owner: Uuid = "0190a5c8-0000-7000-8000-0000000000aa".parse().unwrap();
        let destination_id: Uuid = "0190a5c8-0000-7000-8000-000000000002".parse().unwrap();
        let stores = config.into_stores();
        assert_eq!(stores.templates.list_by_database("db-1").await.unwrap().len(), 1);
        assert!(stores
            .destinations
            .find_by_id(destination_id, owner)
            .await
            .unwrap()
            .is_some());
        assert!(stores
            .destinations
            .find_by_id(destination_id, Uuid::now_v7())
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.templates.is_empty());
    }
}
