//! Shared application state injected into every Axum handler.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use quill_stream::{FragmentStream, OpenAiSource, ScriptedSource, SourceError, TokenSource};

use crate::config::Config;
use crate::db::sqlite::SqliteStore;

/// Reply emitted by the scripted backend when no API key is configured.
const SIMULATED_REPLY: &str = "# Hello!\n\nThis reply comes from the built-in \
simulated model, streamed fragment by fragment just like a real one. Set \
`QUILL_OPENAI_API_KEY` to talk to an actual completion endpoint.\n\n\
- streaming works\n- cancellation works\n- persistence works\n";

/// Fragment width used when chunking the simulated reply.
const SIMULATED_CHUNK_CHARS: usize = 12;

/// The token source selected at startup.
///
/// Dispatch is a plain enum rather than a trait object because
/// [`TokenSource`] returns `impl Future` from its method.
pub enum ModelBackend {
    OpenAi(OpenAiSource),
    Scripted(ScriptedSource),
}

impl ModelBackend {
    pub fn from_config(config: &Config) -> Self {
        match &config.openai_api_key {
            Some(key) => ModelBackend::OpenAi(OpenAiSource::new(&config.openai_base_url, key)),
            None => ModelBackend::Scripted(
                ScriptedSource::from_text(SIMULATED_REPLY, SIMULATED_CHUNK_CHARS)
                    .with_delay(Duration::from_millis(config.simulated_delay_ms)),
            ),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ModelBackend::OpenAi(_) => "openai",
            ModelBackend::Scripted(_) => "simulated",
        }
    }
}

impl TokenSource for ModelBackend {
    async fn generate(
        &self,
        prompt: &str,
        model_id: &str,
        cancel: watch::Receiver<bool>,
    ) -> Result<FragmentStream, SourceError> {
        match self {
            ModelBackend::OpenAi(source) => source.generate(prompt, model_id, cancel).await,
            ModelBackend::Scripted(source) => source.generate(prompt, model_id, cancel).await,
        }
    }
}

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Persistent chat store; also the streaming pipeline's gateway.
    pub store: Arc<SqliteStore>,
    /// The configured token source.
    pub backend: Arc<ModelBackend>,
}
