//! Provider gateway.
//!
//! A [`Gateway`] accepts a [`GenerationRequest`], resolves the provider configured
//! for its task kind, runs it and returns a [`GenerationResult`]. Only three error
//! kinds leave [`Gateway::generate`]: `InvalidRequest`, `ProviderUnavailable` and
//! `ProviderError`. The gateway never logs; callers decide how to report.

mod fallback;
mod provider;
pub mod providers;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use fallback::{generate_with_fallback, Attempt, FallbackOutcome, FallbackPolicy};
pub use provider::{Provider, ProviderFactory};
pub use providers::DefaultFactory;
pub use types::{
    GenerationOptions, GenerationRequest, GenerationResult, Length, MediaAsset, MediaData,
    MediaFormat, Output, Payload, ProviderId, ResultMetadata, Scene, TaskKind, VideoLayout,
    VideoScript, MAX_AUDIO_BYTES, MAX_IMAGE_COUNT, MAX_VIDEO_SECONDS,
};

use crate::config::{GatewayConfig, ProviderConfig};
use crate::error::{MuseError, Result};
use std::sync::Arc;

/// Dispatches requests to the provider configured for each task kind.
#[derive(Clone)]
pub struct Gateway {
    config: Arc<GatewayConfig>,
    factory: Arc<dyn ProviderFactory>,
}

impl Gateway {
    /// Gateway backed by the real providers.
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_factory(config, Arc::new(DefaultFactory))
    }

    pub fn with_factory(config: GatewayConfig, factory: Arc<dyn ProviderFactory>) -> Self {
        Self {
            config: Arc::new(config),
            factory,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// A gateway with `kind` re-pointed to `provider`. `self` is unchanged.
    pub fn with_provider(&self, kind: TaskKind, provider: ProviderConfig) -> Result<Self> {
        Ok(Self {
            config: Arc::new(self.config.with_provider(kind, provider)?),
            factory: Arc::clone(&self.factory),
        })
    }

    /// Run one request against the configured provider.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        request.validate()?;

        let config = self.config.for_kind(request.kind());
        let provider_id = config.provider;

        if !config.is_ready() {
            let var = provider_id.credential_env().unwrap_or("credential");
            return Err(MuseError::unavailable(
                provider_id,
                format!("{} is not set", var),
            ));
        }

        let provider = self
            .factory
            .build(request.kind(), config)
            .map_err(|e| e.into_gateway_error(provider_id))?;

        let options = config.merged_options(request.options());
        let timeout = request.timeout().unwrap_or(config.timeout);

        match tokio::time::timeout(timeout, provider.generate(request, &options)).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(e.into_gateway_error(provider_id)),
            Err(_) => Err(MuseError::provider(
                provider_id,
                format!("no response within {:.1}s", timeout.as_secs_f64()),
            )),
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
