//! Client construction for OpenAI-compatible APIs (OpenAI, DeepSeek).

use crate::config::Credential;
use crate::error::{MuseError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;
use url::Url;

/// Create a client for an OpenAI-compatible endpoint.
///
/// The HTTP timeout bounds each individual call; `base_url` of `None` means api.openai.com.
pub fn create_client(
    credential: &Credential,
    base_url: Option<&Url>,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| MuseError::Config(format!("failed to create HTTP client: {}", e)))?;

    let mut config = OpenAIConfig::new().with_api_key(credential.expose());
    if let Some(url) = base_url {
        config = config.with_api_base(api_base(url));
    }

    Ok(Client::with_config(config).with_http_client(http_client))
}

/// `Url` always carries a trailing slash; async-openai appends paths starting with one.
fn api_base(url: &Url) -> String {
    url.as_str().trim_end_matches('/').to_string()
}
