//! HTTP API over the pipeline and the session draft.

use crate::draft::{Draft, Session, SourceKind};
use crate::error::{FetchError, GenerationError};
use crate::extract::Category;
use crate::generate::{generate_from_story, GenerativeBackend};
use crate::pipeline::Pipeline;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Reply};

/// Shared state
pub struct AppState {
    pub pipeline: Pipeline,
    pub backend: Arc<dyn GenerativeBackend>,
    pub story_timeout: Duration,
    pub session: Mutex<Session>,
}

impl AppState {
    pub fn new(
        pipeline: Pipeline,
        backend: Arc<dyn GenerativeBackend>,
        story_timeout: Duration,
    ) -> Self {
        Self {
            pipeline,
            backend,
            story_timeout,
            session: Mutex::new(Session::new()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateUrlRequest {
    pub url: String,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateStoryRequest {
    pub story: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveDraftRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
struct DraftView<'a> {
    text: &'a str,
    source_kind: SourceKind,
    source_value: &'a str,
    stats: &'a BTreeMap<Category, usize>,
    scenario_counts: &'a BTreeMap<Category, usize>,
    saved: bool,
}

impl<'a> From<&'a Draft> for DraftView<'a> {
    fn from(draft: &'a Draft) -> Self {
        Self {
            text: &draft.text,
            source_kind: draft.source_kind,
            source_value: &draft.source_value,
            stats: &draft.stats,
            scenario_counts: &draft.scenario_counts,
            saved: draft.saved,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

fn error_reply(status: StatusCode, message: impl Into<String>) -> Response {
    warp::reply::with_status(
        warp::reply::json(&ErrorBody {
            status: "error",
            message: message.into(),
        }),
        status,
    )
    .into_response()
}

/// All routes, ready to hand to `warp::serve`.
pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
    let health = warp::path!("health")
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({ "status": "ok" })));

    let state_filter = warp::any().map(move || state.clone());

    let generate_url = warp::path!("generate" / "url")
        .and(warp::post())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(handle_generate_url);

    let generate_story = warp::path!("generate" / "story")
        .and(warp::post())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(handle_generate_story);

    let get_draft = warp::path!("draft")
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(handle_get_draft);

    let save_draft = warp::path!("draft")
        .and(warp::put())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(handle_save_draft);

    let export_draft = warp::path!("draft" / "export")
        .and(warp::get())
        .and(state_filter)
        .and_then(handle_export_draft);

    health
        .or(generate_url)
        .or(generate_story)
        .or(get_draft)
        .or(save_draft)
        .or(export_draft)
}

fn parse_categories(names: &[String]) -> Result<BTreeSet<Category>, String> {
    names
        .iter()
        .map(|name| name.parse::<Category>().map_err(|e| e.to_string()))
        .collect()
}

async fn handle_generate_url(
    req: GenerateUrlRequest,
    state: Arc<AppState>,
) -> Result<Response, warp::Rejection> {
    log::info!("Received URL generation request: {}", req.url);

    let enabled = match &req.categories {
        Some(names) => match parse_categories(names) {
            Ok(enabled) => enabled,
            Err(e) => return Ok(error_reply(StatusCode::BAD_REQUEST, e)),
        },
        None => state.pipeline.default_categories(),
    };

    match state.pipeline.run(&req.url, &enabled).await {
        Ok(report) => {
            if report.has_scenarios() {
                state.session.lock().await.install(Draft::from_report(&report));
            }
            Ok(warp::reply::json(&report).into_response())
        }
        Err(e) => {
            let status = match e {
                FetchError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
                FetchError::NavigationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_GATEWAY,
            };
            Ok(error_reply(status, e.to_string()))
        }
    }
}

async fn handle_generate_story(
    req: GenerateStoryRequest,
    state: Arc<AppState>,
) -> Result<Response, warp::Rejection> {
    log::info!("Received user story generation request ({} chars)", req.story.len());

    match generate_from_story(state.backend.as_ref(), &req.story, state.story_timeout).await {
        Ok(text) => {
            let draft = Draft::from_story(&req.story, text);
            let body = warp::reply::json(&DraftView::from(&draft)).into_response();
            state.session.lock().await.install(draft);
            Ok(body)
        }
        Err(e @ GenerationError::Malformed(_)) if req.story.trim().is_empty() => {
            Ok(error_reply(StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(e) => {
            log::error!("User story generation failed: {}", e);
            Ok(error_reply(StatusCode::BAD_GATEWAY, e.to_string()))
        }
    }
}

async fn handle_get_draft(state: Arc<AppState>) -> Result<Response, warp::Rejection> {
    let session = state.session.lock().await;
    match session.draft() {
        Some(draft) => Ok(warp::reply::json(&DraftView::from(draft)).into_response()),
        None => Ok(error_reply(StatusCode::NOT_FOUND, "no draft in this session")),
    }
}

async fn handle_save_draft(
    req: SaveDraftRequest,
    state: Arc<AppState>,
) -> Result<Response, warp::Rejection> {
    let mut session = state.session.lock().await;
    match session.draft_mut() {
        Ok(draft) => {
            draft.save(req.text);
            Ok(warp::reply::json(&DraftView::from(&*draft)).into_response())
        }
        Err(e) => Ok(error_reply(StatusCode::NOT_FOUND, e.to_string())),
    }
}

async fn handle_export_draft(state: Arc<AppState>) -> Result<Response, warp::Rejection> {
    let session = state.session.lock().await;
    match session.export() {
        Ok(document) => {
            let reply = warp::reply::with_header(
                document.content,
                "content-type",
                "text/plain; charset=utf-8",
            );
            let reply = warp::reply::with_header(
                reply,
                "content-disposition",
                format!("attachment; filename=\"{}\"", document.file_name),
            );
            Ok(reply.into_response())
        }
        Err(e) => Ok(error_reply(StatusCode::NOT_FOUND, e.to_string())),
    }
}
