//! Browser UI server.
//!
//! Serves a single page with one form per operation, a JSON API behind it and
//! the output tree under `/outputs`.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::{ErrorKind, MuseError};
use crate::gateway::TaskKind;
use crate::studio::{
    AudioRequest, ArticleRequest, ChapterRequest, ImageRequest, OptimizeRequest, OutlineRequest,
    Studio, SummaryKind, VideoRequest,
};
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, FromRequest, Multipart, Request, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info};

const INDEX_HTML: &str = include_str!("index.html");

/// Uploads are capped by the transcription API; leave room for the form fields.
const MAX_UPLOAD_BYTES: usize = 26 * 1024 * 1024;

/// Shared application state.
struct AppState {
    studio: Studio,
}

/// Run the browser UI server.
pub async fn run_serve(host: &str, port: u16, studio: Studio, settings: &Settings) -> anyhow::Result<()> {
    let output_dir = settings.output_dir();
    std::fs::create_dir_all(&output_dir)?;

    let app = router(studio);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Muse Studio");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    Output::kv("Outputs", &output_dir.display().to_string());
    println!();
    Output::info("Press Ctrl+C to stop the server.");
    info!(%addr, "Server started");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(studio: Studio) -> Router {
    let outputs = ServeDir::new(studio.store().root());
    let state = Arc::new(AppState { studio });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route("/api/article", post(article))
        .route("/api/novel", post(novel))
        .route("/api/outline", post(outline))
        .route("/api/video", post(video))
        .route("/api/image", post(image))
        .route("/api/prompt", post(prompt))
        .route("/api/audio", post(audio))
        .nest_service("/outputs", outputs)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

// === Errors ===

/// A studio error rendered as `{"error", "kind"}` with a matching status.
struct ApiError(MuseError);

impl From<MuseError> for ApiError {
    fn from(err: MuseError) -> Self {
        Self(err)
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::ProviderUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::ProviderError => StatusCode::BAD_GATEWAY,
        ErrorKind::Other => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            error!(%kind, "Request failed: {}", self.0);
        }
        (
            status,
            Json(json!({ "error": self.0.to_string(), "kind": kind.to_string() })),
        )
            .into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

/// `Json` whose rejections use the API error envelope.
struct ApiJson<T>(T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| MuseError::InvalidRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

// === Handlers ===

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Serialize)]
struct KindStatus {
    kind: TaskKind,
    provider: String,
    model: String,
    credential: bool,
}

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.studio.gateway().config();
    let kinds: Vec<KindStatus> = TaskKind::ALL
        .iter()
        .map(|kind| {
            let provider = config.for_kind(*kind);
            KindStatus {
                kind: *kind,
                provider: provider.provider.to_string(),
                model: provider.model.clone(),
                credential: provider.is_ready(),
            }
        })
        .collect();
    let fallback: Vec<String> = state
        .studio
        .text_fallback()
        .alternates()
        .iter()
        .map(|c| c.provider.to_string())
        .collect();

    Json(json!({ "providers": kinds, "text_fallback": fallback }))
}

async fn article(State(state): State<Arc<AppState>>, ApiJson(req): ApiJson<ArticleRequest>) -> ApiResult {
    let article = state.studio.write_article(&req).await?;
    let url = file_url(&state.studio, &article.path);
    Ok(Json(json!({ "article": article, "url": url })))
}

async fn novel(State(state): State<Arc<AppState>>, ApiJson(req): ApiJson<ChapterRequest>) -> ApiResult {
    let chapter = state.studio.write_chapter(&req).await?;
    let url = file_url(&state.studio, &chapter.path);
    Ok(Json(json!({ "article": chapter, "url": url })))
}

async fn outline(State(state): State<Arc<AppState>>, ApiJson(req): ApiJson<OutlineRequest>) -> ApiResult {
    let outline = state.studio.write_outline(&req).await?;
    let url = file_url(&state.studio, &outline.path);
    Ok(Json(json!({ "article": outline, "url": url })))
}

async fn video(State(state): State<Arc<AppState>>, ApiJson(req): ApiJson<VideoRequest>) -> ApiResult {
    let report = state.studio.generate_video(&req).await?;
    let url = file_url(&state.studio, &report.video_path);
    let script_url = file_url(&state.studio, &report.script_path);
    Ok(Json(json!({ "video": report, "url": url, "script_url": script_url })))
}

async fn image(State(state): State<Arc<AppState>>, ApiJson(req): ApiJson<ImageRequest>) -> ApiResult {
    let report = state.studio.generate_image(&req).await?;
    let urls: Vec<Option<String>> = report.paths.iter().map(|p| file_url(&state.studio, p)).collect();
    Ok(Json(json!({ "image": report, "urls": urls })))
}

async fn prompt(State(state): State<Arc<AppState>>, ApiJson(req): ApiJson<OptimizeRequest>) -> ApiResult {
    let report = state.studio.optimize_prompt(&req).await?;
    let url = file_url(&state.studio, &report.path);
    Ok(Json(json!({ "optimization": report, "url": url })))
}

async fn audio(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> ApiResult {
    let mut upload = None;
    let mut language = None;
    let mut summary = SummaryKind::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let name = field.file_name().unwrap_or("upload.mp3").to_string();
                let bytes = field.bytes().await.map_err(bad_form)?;
                upload = Some((name, bytes));
            }
            "language" => {
                let value = field.text().await.map_err(bad_form)?;
                language = Some(value).filter(|v| !v.trim().is_empty());
            }
            "summary" => {
                let value = field.text().await.map_err(bad_form)?;
                if !value.trim().is_empty() {
                    summary = value.parse().map_err(MuseError::InvalidRequest)?;
                }
            }
            _ => {}
        }
    }

    let (name, bytes) = upload.ok_or_else(|| MuseError::InvalidRequest("missing 'file' field".to_string()))?;
    let extension = Path::new(&name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp3")
        .to_string();
    let file = tempfile::Builder::new()
        .prefix(&upload_stem(&name))
        .suffix(&format!(".{}", extension))
        .tempfile()
        .map_err(MuseError::from)?;
    tokio::fs::write(file.path(), &bytes).await.map_err(MuseError::from)?;

    let request = AudioRequest {
        path: file.path().to_path_buf(),
        language,
        summary,
    };
    let report = state.studio.process_audio(&request).await?;
    let url = file_url(&state.studio, &report.path);
    Ok(Json(json!({ "audio": report, "url": url })))
}

fn bad_form(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError(MuseError::InvalidRequest(format!("bad upload: {}", err)))
}

/// Uploaded file name without extension, made safe for a temp file prefix.
fn upload_stem(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    format!("{}_", crate::output_store::slugify(stem))
}

/// URL of a saved artifact under `/outputs`.
fn file_url(studio: &Studio, path: &Path) -> Option<String> {
    let relative = studio.store().relative(path)?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(format!("/outputs/{}", parts.join("/")))
}
