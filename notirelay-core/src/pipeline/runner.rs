use crate::credentials::CredentialResolver;
use crate::destination::DestinationStorage;
use crate::error::EngineError;
use crate::formatter::render;
use crate::matcher::find_matching_templates;
use crate::pipeline::{PageEvent, WebhookRequest};
use crate::recorder::Recorder;
use crate::schema::SchemaGateway;
use crate::template::{Template, TemplateStorage};
use crate::transport::{NotificationPayload, NotificationSender};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Where processing of one event ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The page is not a database row.
    NoDatabase,
    NoTemplates,
    /// None of the templates' credentials yielded a token.
    NoCredential,
    SchemaUnavailable,
    NoMatches,
    Completed { sent: usize, failed: usize },
}

pub struct PipelineRunner {
    templates: Arc<dyn TemplateStorage>,
    destinations: Arc<dyn DestinationStorage>,
    credentials: CredentialResolver,
    schemas: SchemaGateway,
    sender: Arc<dyn NotificationSender>,
    recorder: Arc<dyn Recorder>,
}

impl PipelineRunner {
    pub fn new(
        templates: Arc<dyn TemplateStorage>,
        destinations: Arc<dyn DestinationStorage>,
        credentials: CredentialResolver,
        schemas: SchemaGateway,
        sender: Arc<dyn NotificationSender>,
        recorder: Arc<dyn Recorder>,
    ) -> Self {
        Self {
            templates,
            destinations,
            credentials,
            schemas,
            sender,
            recorder,
        }
    }

    pub async fn process_webhook(&self, request: WebhookRequest) -> RunOutcome {
        let Some(event) = request.into_event() else {
            info!("Webhook is not about a database page, ignoring");
            return RunOutcome::NoDatabase;
        };
        self.process_event(event).await
    }

    /// Runs one page event through matching, rendering and delivery.
    ///
    /// Stages that cannot continue end the run early with a log line; delivery
    /// failures are isolated per template.
    #[instrument(skip_all, fields(database_id = %event.database_id, page_id = %event.page_id))]
    pub async fn process_event(&self, event: PageEvent) -> RunOutcome {
        let event_id = Uuid::now_v7();

        let templates = match self.templates.list_by_database(&event.database_id).await {
            Ok(templates) if !templates.is_empty() => templates,
            Ok(_) => {
                info!("No templates for database");
                return RunOutcome::NoTemplates;
            }
            Err(err) => {
                error!(error = %err, "Failed to load templates");
                return RunOutcome::NoTemplates;
            }
        };
        debug!(templates = templates.len(), "Loaded templates");

        let Some(token) = self.credentials.resolve_token(&templates).await else {
            warn!("No usable credential for database, cannot read its schema");
            return RunOutcome::NoCredential;
        };

        let schema = match self.schemas.get_schema(&event.database_id, &token).await {
            Ok(Some(schema)) => schema,
            Ok(None) => {
                warn!("Database not found or not shared with the integration");
                return RunOutcome::SchemaUnavailable;
            }
            Err(err) => {
                error!(error = %err, "Failed to fetch database schema");
                return RunOutcome::SchemaUnavailable;
            }
        };

        let matched = find_matching_templates(&event.properties, &templates, &schema);
        if matched.is_empty() {
            info!("No templates matched");
            return RunOutcome::NoMatches;
        }
        info!(matched = matched.len(), "Templates matched");

        let messages: Vec<(&Template, String)> = matched
            .into_iter()
            .map(|template| {
                let content = render(
                    &template.body,
                    &event.properties,
                    &schema,
                    event.url.as_deref(),
                );
                (template, content)
            })
            .collect();

        let (mut sent, mut failed) = (0, 0);
        for (template, content) in messages {
            match self.dispatch(template, content).await {
                Ok(()) => {
                    self.recorder
                        .record_message_sent(event_id, template.id, template.destination_id);
                    sent += 1;
                }
                Err(err) => {
                    self.recorder.record_message_failed(
                        event_id,
                        template.id,
                        template.destination_id,
                        &err.to_string(),
                    );
                    failed += 1;
                }
            }
        }

        RunOutcome::Completed { sent, failed }
    }

    async fn dispatch(&self, template: &Template, content: String) -> Result<(), EngineError> {
        let destination = self
            .destinations
            .find_by_id(template.destination_id, template.owner_id)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!("destination {}", template.destination_id))
            })?;

        self.sender
            .send(&destination.webhook_url, &NotificationPayload { content })
            .await
    }
}
