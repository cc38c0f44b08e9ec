pub mod runner;

use crate::property::PageProperties;
use serde::{Deserialize, Serialize};

const DATABASE_PARENT: &str = "database_id";

/// Notion automation webhook body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookRequest {
    #[serde(default)]
    pub data: Option<PageData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageData {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub parent: Option<Parent>,
    #[serde(default)]
    pub properties: PageProperties,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub database_id: Option<String>,
    #[serde(default)]
    pub page_id: Option<String>,
}

/// A page change inside a database, ready for matching.
#[derive(Debug, Clone, PartialEq)]
pub struct PageEvent {
    pub page_id: String,
    pub database_id: String,
    pub properties: PageProperties,
    pub url: Option<String>,
}

impl PageData {
    /// `None` unless the page lives directly in a database.
    pub fn into_event(self) -> Option<PageEvent> {
        let parent = self.parent?;
        if parent.kind != DATABASE_PARENT {
            return None;
        }
        let database_id = parent.database_id.filter(|id| !id.is_empty())?;

        Some(PageEvent {
            page_id: self.id,
            database_id,
            properties: self.properties,
            url: self.url.filter(|url| !url.is_empty()),
        })
    }
}

impl WebhookRequest {
    pub fn into_event(self) -> Option<PageEvent> {
        self.data?.into_event()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_database_page() {
        let request: WebhookRequest = serde_json::from_value(json!({
            "source": { "type": "automation" },
            "data": {
                "object": "page",
                "id": "page-1",
                "parent": { "type": "database_id", "database_id": "db-1" },
                "properties": { "Name": { "title": [] } },
                "url": "https://www.notion.so/page-1"
            }
        }))
        .unwrap();

        let event = request.into_event().unwrap();
        assert_eq!(event.database_id, "db-1");
        assert_eq!(event.page_id, "page-1");
        assert_eq!(event.url.as_deref(), Some("https://www.notion.so/page-1"));
        assert!(event.properties.contains_key("Name"));
    }

    #[test]
    fn test_non_database_parents() {
        for body in [
            json!({}),
            json!({ "data": { "object": "page", "id": "p" } }),
            json!({ "data": { "parent": { "type": "page_id", "page_id": "p0" } } }),
            json!({ "data": { "parent": { "type": "database_id" } } }),
            json!({ "data": { "parent": { "type": "database_id", "database_id": "" } } }),
        ] {
            let request: WebhookRequest = serde_json::from_value(body.clone()).unwrap();
            assert!(request.into_event().is_none(), "{body}");
        }
    }
}
