use axum::routing::post;
use axum::{Extension, Json, Router};
use notirelay_core::pipeline::runner::PipelineRunner;
use notirelay_core::pipeline::WebhookRequest;
use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, warn};

#[derive(Clone)]
pub struct HttpIngestExtensions {
    pub(crate) runner: Arc<PipelineRunner>,
}

#[derive(Serialize)]
struct Acknowledgement {
    message: &'static str,
}

pub async fn start(bind: SocketAddr, ext: HttpIngestExtensions) -> anyhow::Result<()> {
    // Bind now to surface address errors before serving
    let listener = TcpListener::bind(bind).await?;
    tokio::spawn(async {
        if let Err(err) = axum::serve(listener, router(ext)).await {
            error!(error = %err, "HTTP ingest server stopped");
        }
    });
    Ok(())
}

pub(crate) fn router(ext: HttpIngestExtensions) -> Router {
    Router::new()
        .route("/webhook/notion", post(notion_webhook))
        .layer(Extension(ext))
}

/// Acknowledges immediately; the event is processed in its own task.
async fn notion_webhook(
    Extension(ext): Extension<HttpIngestExtensions>,
    Json(body): Json<Value>,
) -> Json<Acknowledgement> {
    match serde_json::from_value::<WebhookRequest>(body) {
        Ok(request) => {
            tokio::spawn(async move {
                let outcome = ext.runner.process_webhook(request).await;
                debug!(?outcome, "Webhook processed");
            });
        }
        Err(err) => warn!(error = %err, "Webhook body does not look like a Notion page event"),
    }

    Json(Acknowledgement {
        message: "Webhook received",
    })
}
