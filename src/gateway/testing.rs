//! Scripted providers for tests, plus a loopback HTTP stub for the real ones.

use super::{
    GenerationOptions, GenerationRequest, GenerationResult, MediaAsset, MediaFormat, Output,
    Payload, Provider, ProviderFactory, ProviderId, TaskKind,
};
use crate::config::{Credentials, GatewayConfig, ProviderConfig, Settings};
use crate::error::{MuseError, Result};
use crate::transcription::{Transcript, TranscriptSegment};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Gateway configuration with every credential present and default settings.
pub fn fake_config() -> GatewayConfig {
    let creds = Credentials::default()
        .with_key(ProviderId::DeepSeek, "ds-test")
        .with_key(ProviderId::OpenAi, "sk-test")
        .with_key(ProviderId::Anthropic, "ant-test");
    let mut settings = Settings::default();
    settings.video.ffmpeg_path = "ffmpeg-not-used-in-tests".to_string();
    GatewayConfig::from_settings(&settings, &creds).expect("default settings resolve")
}

/// What a fake provider does when called.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Transcript(Transcript),
    ProviderError(String),
    Unavailable(String),
    /// An error outside the gateway kinds.
    Stray(String),
    /// Never answers.
    Hang,
}

impl Reply {
    pub fn text(s: impl Into<String>) -> Self {
        Reply::Text(s.into())
    }

    pub fn transcript(text: &str) -> Self {
        Reply::Transcript(
            Transcript::new(
                "fake.mp3",
                vec![
                    TranscriptSegment::new(0.0, 2.0, text),
                    TranscriptSegment::new(2.0, 4.0, "and that is all"),
                ],
            )
            .with_language("en"),
        )
    }
}

/// A recorded provider invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub provider: ProviderId,
    pub kind: TaskKind,
    pub payload: Payload,
    pub options: GenerationOptions,
}

type Script = Arc<Mutex<HashMap<ProviderId, VecDeque<Reply>>>>;

/// Factory whose providers answer from a per-provider script.
///
/// Replies are consumed in order; the last one repeats. Without a script a
/// provider answers with a default output for the task kind.
#[derive(Default)]
pub struct FakeFactory {
    script: Script,
    calls: Arc<Mutex<Vec<Call>>>,
    builds: AtomicUsize,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, provider: ProviderId, reply: Reply) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry(provider)
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl ProviderFactory for FakeFactory {
    fn build(&self, _kind: TaskKind, config: &ProviderConfig) -> Result<Box<dyn Provider>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeProvider {
            id: config.provider,
            model: config.model.clone(),
            script: Arc::clone(&self.script),
            calls: Arc::clone(&self.calls),
        }))
    }
}

struct FakeProvider {
    id: ProviderId,
    model: String,
    script: Script,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl FakeProvider {
    fn next_reply(&self) -> Option<Reply> {
        let mut script = self.script.lock().unwrap();
        let queue = script.get_mut(&self.id)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        options: &GenerationOptions,
    ) -> Result<GenerationResult> {
        self.calls.lock().unwrap().push(Call {
            provider: self.id,
            kind: request.kind(),
            payload: request.payload().clone(),
            options: options.clone(),
        });

        let output = match self.next_reply() {
            Some(Reply::Text(text)) => Output::Text(text),
            Some(Reply::Transcript(t)) => Output::Transcript(t),
            Some(Reply::ProviderError(msg)) => return Err(MuseError::provider(self.id, msg)),
            Some(Reply::Unavailable(msg)) => return Err(MuseError::unavailable(self.id, msg)),
            Some(Reply::Stray(msg)) => return Err(MuseError::Output(msg)),
            Some(Reply::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            None => default_output(request, options),
        };

        Ok(GenerationResult::new(request, self.id, &self.model, output))
    }
}

fn default_output(request: &GenerationRequest, options: &GenerationOptions) -> Output {
    match request.kind() {
        TaskKind::Text => Output::Text(format!("generated: {}", request.prompt().unwrap_or(""))),
        TaskKind::Transcription => match Reply::transcript("hello from the recording") {
            Reply::Transcript(t) => Output::Transcript(t),
            _ => unreachable!(),
        },
        TaskKind::Image => Output::Images(
            (0..options.count.unwrap_or(1))
                .map(|_| MediaAsset::from_bytes(MediaFormat::Png, b"\x89PNG fake".to_vec()))
                .collect(),
        ),
        TaskKind::Video => Output::Video(MediaAsset::from_bytes(MediaFormat::Mp4, b"fake mp4".to_vec())),
    }
}

/// Serve `router` on a loopback port and return its base URL.
pub async fn serve_stub(router: axum::Router) -> url::Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    url::Url::parse(&format!("http://{}", addr)).unwrap()
}

/// A loopback URL nothing listens on.
pub async fn closed_port_url() -> url::Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    url::Url::parse(&format!("http://{}", addr)).unwrap()
}
