//! The seam between the gateway and concrete back-ends.

use super::{GenerationOptions, GenerationRequest, GenerationResult, ProviderId, TaskKind};
use crate::config::ProviderConfig;
use crate::error::Result;
use async_trait::async_trait;

/// One generative back-end bound to a model and credential.
#[async_trait]
pub trait Provider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn model(&self) -> &str;

    /// Run one request. `options` are the request options merged over the
    /// provider defaults.
    async fn generate(
        &self,
        request: &GenerationRequest,
        options: &GenerationOptions,
    ) -> Result<GenerationResult>;
}

/// Builds providers from configuration.
pub trait ProviderFactory: Send + Sync {
    fn build(&self, kind: TaskKind, config: &ProviderConfig) -> Result<Box<dyn Provider>>;
}
