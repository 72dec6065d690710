//! Application state shared across all request handlers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::airlock::{AirlockStore, SqliteAirlockStore};
use crate::assessment::{AssessmentStore, SqliteAssessmentStore};
use crate::common::config::AppConfig;
use crate::mediator::{MediatorService, ModelSelection, OpenAiProvider};

/// Shared application state.
pub struct AppState {
    /// Mediator pipeline.
    pub mediator: MediatorService,
    /// Quiz responses and counts.
    pub assessments: Arc<dyn AssessmentStore>,
    /// Couple conversation log.
    pub airlock: Arc<dyn AirlockStore>,
    /// Upper bound on one mediator exchange.
    pub reply_timeout: Duration,
}

impl AppState {
    /// Assemble state from already-built parts.
    #[must_use]
    pub fn new(
        mediator: MediatorService,
        assessments: Arc<dyn AssessmentStore>,
        airlock: Arc<dyn AirlockStore>,
        reply_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            mediator,
            assessments,
            airlock,
            reply_timeout,
        })
    }

    /// Build the provider and open both stores from configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built or a store cannot be opened.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Arc<Self>> {
        let provider = OpenAiProvider::new(&config.mediator)
            .context("failed to build the chat provider")?;
        let mediator = MediatorService::new(
            Arc::new(provider),
            ModelSelection::from(&config.mediator),
        );

        let assessments = SqliteAssessmentStore::new(&config.storage)
            .await
            .context("failed to open the assessment store")?;
        let airlock = SqliteAirlockStore::new(&config.storage)
            .await
            .context("failed to open the airlock store")?;

        tracing::info!(
            db = %config.storage.sqlite_path.display(),
            primary = %config.mediator.primary_model,
            fallback = %config.mediator.fallback_model,
            "Application state ready"
        );

        Ok(Self::new(
            mediator,
            Arc::new(assessments),
            Arc::new(airlock),
            config.server.reply_timeout(),
        ))
    }
}
