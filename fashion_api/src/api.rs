use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::Uri;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use fashion_common::color::{self, ColorSample};
use fashion_common::detection::{BackendKind, DetectionBackend, RawDetection};
use fashion_common::pipeline::{CandidateItem, FashionAnalyzer, FashionOutcome, ItemAnalysis};
use fashion_common::session::SessionStore;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::error::ApiError;
use crate::imaging::decode_image;

/// Candidates waiting for the caller to pick one.
pub struct PendingSelection {
    image: Arc<RgbImage>,
    candidates: Vec<CandidateItem>,
}

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<FashionAnalyzer>,
    pub backend: Arc<Mutex<Box<dyn DetectionBackend>>>,
    pub backend_kind: BackendKind,
    pub sessions: Arc<SessionStore<PendingSelection>>,
    pub started: Instant,
}

impl AppState {
    pub fn new(backend: Box<dyn DetectionBackend>, config: &ServiceConfig) -> Self {
        Self {
            analyzer: Arc::new(FashionAnalyzer::new(config.analyzer_settings())),
            backend_kind: backend.kind(),
            backend: Arc::new(Mutex::new(backend)),
            sessions: Arc::new(SessionStore::with_capacity(
                config.session_ttl(),
                config.max_sessions,
            )),
            started: Instant::now(),
        }
    }

    /// Runs the detector. Must be called off the async runtime.
    fn detect(&self, image: &RgbImage) -> Result<Vec<RawDetection>, ApiError> {
        let mut backend = self
            .backend
            .lock()
            .map_err(|_| ApiError::Unavailable("detector lock poisoned".into()))?;
        let detections = backend.detect(image)?;
        debug!("{} raw detections", detections.len());
        Ok(detections)
    }
}

#[derive(Debug, Deserialize)]
struct ImageRequest {
    image: Option<String>,
    /// Fewer clusters and a higher share threshold, for quick previews.
    #[serde(default)]
    fast: bool,
}

impl ImageRequest {
    fn decode(&self) -> Result<RgbImage, ApiError> {
        let encoded = self
            .image
            .as_deref()
            .ok_or_else(|| ApiError::BadRequest("No image data provided".into()))?;
        decode_image(encoded)
    }
}

#[derive(Debug, Deserialize)]
struct FashionRequest {
    image: Option<String>,
    session_id: Option<Uuid>,
    /// A number, a numeric string or a one element list.
    item_selection: Option<Value>,
}

#[derive(Debug, Serialize)]
struct ColorView<'a> {
    name: &'a str,
    rgb: [u8; 3],
    hex: String,
    percentage: f32,
}

impl<'a> From<&'a ColorSample> for ColorView<'a> {
    fn from(c: &'a ColorSample) -> Self {
        Self {
            name: &c.name,
            rgb: c.rgb,
            hex: c.hex(),
            percentage: c.percentage,
        }
    }
}

fn parse_selection(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        Value::Array(items) if items.len() == 1 => parse_selection(&items[0]),
        _ => None,
    }
}

async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("Analysis task failed")?
}

pub fn create_router(state: AppState, config: &ServiceConfig) -> Router {
    let routes = Router::new()
        .route("/health", get(health_check))
        .route("/test", get(test_endpoint))
        .route("/models", get(models))
        .route("/detect-clothing", post(detect_clothing))
        .route("/analyze-colors", post(analyze_colors))
        .route("/analyze-fashion", post(analyze_fashion));

    let app = match config.route_prefix() {
        Some(prefix) => Router::new().nest(&prefix, routes),
        None => routes,
    };

    app.fallback(not_found)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "Fashion analysis backend",
        "backend": state.backend_kind,
        "segmentation_available": state.backend_kind.provides_masks(),
        "active_sessions": state.sessions.len(),
        "session_ttl_secs": state.sessions.ttl().as_secs(),
        "uptime_secs": state.started.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn test_endpoint(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "Fashion analysis backend is working!",
        "backend": state.backend_kind,
        "capabilities": {
            "fashion_classification": "Clothing type identification",
            "style_mapping": "21 style categories",
            "color_analysis": "Percentage-based color detection",
            "multiple_items": "Handle multiple clothing items",
            "user_feedback": "Interactive item selection",
        },
    }))
}

async fn models(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "detection_backend": state.backend_kind,
        "segmentation_available": state.backend_kind.provides_masks(),
        "color_method": "k-means++ clustering with CSS3 color names",
        "attribute_method": "rule-based heuristics",
    }))
}

async fn detect_clothing(
    State(state): State<AppState>,
    payload: Result<Json<ImageRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload?;
    let backend = state.backend_kind;

    let items = blocking(move || {
        let image = req.decode()?;
        let raw = state.detect(&image)?;
        Ok(state.analyzer.detect_items(&image, raw))
    })
    .await?;
    info!("Found {} clothing items", items.len());

    Ok(Json(json!({
        "success": true,
        "backend": backend,
        "total_items": items.len(),
        "items": items,
    })))
}

async fn analyze_colors(
    State(state): State<AppState>,
    payload: Result<Json<ImageRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload?;
    let fast = req.fast;

    let colors = blocking(move || {
        let image = req.decode()?;
        Ok(state.analyzer.dominant_colors(&image, req.fast))
    })
    .await?;
    info!("Analyzed {} dominant colors (fast: {fast})", colors.len());

    let views: Vec<ColorView<'_>> = colors.iter().map(ColorView::from).collect();
    Ok(Json(json!({
        "success": true,
        "dominant_colors": views,
        "description": color::describe_colors(&colors),
        "analysis_method": if fast { "k-means++ clustering (fast)" } else { "k-means++ clustering" },
    })))
}

async fn analyze_fashion(
    State(state): State<AppState>,
    payload: Result<Json<FashionRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload?;

    if let Some(session_id) = req.session_id {
        return select_item(state, session_id, req.item_selection.as_ref()).await;
    }

    let encoded = req
        .image
        .ok_or_else(|| ApiError::BadRequest("No image data provided".into()))?;
    let worker = state.clone();
    let (image, outcome) = blocking(move || {
        let image = decode_image(&encoded)?;
        let raw = worker.detect(&image)?;
        let outcome = worker.analyzer.analyze(&image, raw);
        Ok((image, outcome))
    })
    .await?;

    match outcome {
        FashionOutcome::MultipleItems(candidates) => {
            let items: Vec<_> = candidates.iter().map(CandidateItem::descriptor).collect();
            let session_id = state.sessions.insert(PendingSelection {
                image: Arc::new(image),
                candidates,
            });
            info!("{} items detected, awaiting selection in session {session_id}", items.len());
            Ok(Json(json!({
                "success": true,
                "multiple_items": true,
                "session_id": session_id,
                "message": "Multiple clothing items detected. Please select which item to analyze:",
                "items": items,
                "instruction": "Send another request with 'session_id' and 'item_selection': [item_id] to analyze the specific item.",
            })))
        }
        FashionOutcome::Single(analysis) | FashionOutcome::WholeImage(analysis) => {
            Ok(Json(analysis_response(&analysis, state.backend_kind)))
        }
    }
}

async fn select_item(
    state: AppState,
    session_id: Uuid,
    selection: Option<&Value>,
) -> Result<Json<Value>, ApiError> {
    let selection = selection
        .ok_or_else(|| ApiError::BadRequest("item_selection is required with session_id".into()))?;
    // A malformed selection leaves the session in place for a retry.
    let item_id = parse_selection(selection).ok_or_else(|| {
        ApiError::BadRequest("Invalid item selection. Please provide a number.".into())
    })?;
    let pending = state
        .sessions
        .take(&session_id)
        .ok_or(ApiError::SessionExpired(session_id))?;

    let analyzer = state.analyzer.clone();
    let analysis = blocking(move || {
        Ok(analyzer.analyze_selected(&pending.image, item_id, &pending.candidates)?)
    })
    .await?;
    info!("Analyzed selected item {item_id} ({})", analysis.detected_as);

    Ok(Json(analysis_response(&analysis, state.backend_kind)))
}

fn analysis_response(analysis: &ItemAnalysis, backend: BackendKind) -> Value {
    let colors: Vec<ColorView<'_>> = analysis.colors.iter().map(ColorView::from).collect();
    let mut response = json!({
        "success": true,
        "clothing_type": analysis.clothing_type,
        "applicable_styles": analysis.applicable_styles,
        "colors": colors,
        "color_description": analysis.color_description,
        "attributes": analysis.attributes,
        "detection_details": {
            "detected_as": analysis.detected_as,
            "confidence": analysis.confidence,
            "bounding_box": analysis.bounding_box,
            "backend": backend,
        },
    });
    if let (Some(note), Some(obj)) = (&analysis.note, response.as_object_mut()) {
        obj.insert("note".to_string(), json!(note));
    }
    response
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

pub async fn serve(state: AppState, config: &ServiceConfig) -> anyhow::Result<()> {
    let sessions = state.sessions.clone();
    let sweep_every = config.session_sweep_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_every);
        loop {
            ticker.tick().await;
            let purged = sessions.purge_expired();
            if purged > 0 {
                debug!("Purged {purged} expired selection sessions");
            }
        }
    });

    let app = create_router(state, config);
    let addr = config.bind_addr();
    info!(
        "Fashion API listening on {addr}{}",
        config.route_prefix().unwrap_or_default()
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}
