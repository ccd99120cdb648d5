//! PII detection HTTP API
//!
//! Routes:
//! - `POST /v1/detect` - detect PII, optionally returning masked text
//! - `POST /v1/mask` - mask PII and return only the masked text
//! - `POST /v1/sanitize` - prepare a prompt before it is sent to a language model
//! - `POST /v1/batch` - independent detect requests processed together
//! - `GET /v1/types` - catalogue of supported types
//!
//! Scans run on the blocking pool under the configured request timeout.
//! Responses and logs carry spans, types and counts; matched values never
//! leave the process.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    routing::{get, post},
};
use piishield_observability::{Metrics, Outcome};
use piishield_pii::{Configuration, DetectionError, MaskingStrategy, PIIShield, PIIType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::ServerSettings;
use crate::error::{ApiError, ApiResult};

/// Shared state for the API routes
#[derive(Clone)]
pub struct AppState {
    shield: Arc<PIIShield>,
    config: Arc<Configuration>,
    metrics: Arc<Metrics>,
    request_timeout: Duration,
    batch_size_limit: usize,
    max_body_bytes: usize,
}

impl AppState {
    pub fn new(
        shield: Arc<PIIShield>,
        config: Configuration,
        metrics: Arc<Metrics>,
        settings: &ServerSettings,
    ) -> Self {
        Self {
            shield,
            config: Arc::new(config),
            metrics,
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            batch_size_limit: settings.batch_size_limit,
            max_body_bytes: settings.max_body_bytes,
        }
    }

    /// Server configuration narrowed by per-request overrides
    fn request_config(
        &self,
        threshold: Option<f32>,
        detect_types: Option<&[String]>,
        strategies: &BTreeMap<String, String>,
    ) -> ApiResult<Configuration> {
        let mut config = (*self.config).clone();

        if let Some(threshold) = threshold {
            config = config.with_threshold(threshold);
        }

        if let Some(names) = detect_types {
            let requested = names
                .iter()
                .map(|name| name.parse::<PIIType>())
                .collect::<Result<Vec<_>, _>>()?;
            config = config.with_only(
                requested
                    .into_iter()
                    .filter(|pii_type| self.config.is_enabled(*pii_type)),
            );
        }

        for (pii_type, strategy) in strategies {
            config = config.with_named_strategy(pii_type, strategy)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Run `work` on the blocking pool
    async fn spawn_scan<T, F>(&self, work: F) -> ApiResult<T>
    where
        F: FnOnce(&PIIShield) -> Result<T, DetectionError> + Send + 'static,
        T: Send + 'static,
    {
        let shield = self.shield.clone();
        tokio::task::spawn_blocking(move || work(&shield))
            .await
            .map_err(|join_error| {
                ApiError::Internal(format!("detection task failed: {}", join_error))
            })?
            .map_err(ApiError::from)
    }

    /// Fail with a timeout error once the request deadline passes
    async fn with_timeout<T>(&self, work: impl Future<Output = ApiResult<T>>) -> ApiResult<T> {
        tokio::time::timeout(self.request_timeout, work)
            .await
            .map_err(|_| ApiError::Timeout(self.request_timeout.as_secs()))?
    }

    /// Record metrics and log metadata for a finished request
    fn finish<T>(&self, endpoint: &str, started: Instant, result: &ApiResult<T>) {
        let elapsed = started.elapsed();
        let outcome = match result {
            Ok(_) => Outcome::Success,
            Err(err) => {
                warn!(endpoint, status = err.status().as_u16(), "request failed: {}", err);
                err.outcome()
            }
        };
        self.metrics
            .record_request(endpoint, outcome, elapsed.as_secs_f64());
    }

    fn record_scan(&self, endpoint: &str, text_len: usize, matches: &[MatchSummary]) {
        self.metrics.record_text_size(text_len);

        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for m in matches {
            *counts.entry(m.pii_type.label()).or_insert(0) += 1;
        }
        debug!(endpoint, text_len, pii_count = matches.len(), types = ?counts, "scan complete");
        self.metrics.record_detections(counts);
    }
}

#[derive(Deserialize)]
pub struct DetectRequest {
    pub text: String,

    #[serde(default)]
    pub confidence_threshold: Option<f32>,

    /// Restrict detection to these types
    #[serde(default)]
    pub detect_types: Option<Vec<String>>,

    /// Type label to strategy name
    #[serde(default)]
    pub strategies: BTreeMap<String, String>,

    /// Include the masked text in the response
    #[serde(default)]
    pub mask: bool,
}

#[derive(Deserialize)]
pub struct MaskRequest {
    pub text: String,

    #[serde(default)]
    pub confidence_threshold: Option<f32>,

    #[serde(default)]
    pub strategies: BTreeMap<String, String>,
}

#[derive(Deserialize)]
pub struct SanitizeRequest {
    pub prompt: String,

    #[serde(default = "default_true")]
    pub auto_mask: bool,
}

/// One final match, without the matched value
#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub pii_type: PIIType,
    pub start: usize,
    pub end: usize,
    pub confidence: f32,
    pub validated: bool,
    pub masked_value: String,
}

#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub pii_found: bool,
    pub pii_count: usize,
    pub matches: Vec<MatchSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masked_text: Option<String>,
    pub processing_time_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct MaskResponse {
    pub masked_text: String,
    pub pii_count: usize,
    pub processing_time_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct SanitizeResponse {
    pub sanitized_prompt: String,
    pub pii_detected: bool,
    pub pii_count: usize,
    /// False when PII was found and left in place
    pub ai_ready: bool,
    pub warnings: Vec<String>,
    pub processing_time_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct TypeInfo {
    pub pii_type: PIIType,
    pub name: &'static str,
    pub description: &'static str,
    pub base_confidence: f32,
    pub requires_validation: bool,
    pub default_strategy: MaskingStrategy,
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct TypesResponse {
    pub supported_types: Vec<TypeInfo>,
}

/// Create the API router
pub fn router(state: AppState) -> Router {
    let body_limit = state.max_body_bytes;

    Router::new()
        .route("/v1/detect", post(detect))
        .route("/v1/mask", post(mask))
        .route("/v1/sanitize", post(sanitize))
        .route("/v1/batch", post(batch))
        .route("/v1/types", get(types))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Detect, mask and summarize one text
pub(crate) fn scan(
    shield: &PIIShield,
    text: &str,
    config: &Configuration,
) -> Result<(Vec<MatchSummary>, String), DetectionError> {
    let outcome = shield.detect_and_mask(text, config)?;
    let matches = outcome
        .matches
        .iter()
        .zip(outcome.masked_values)
        .map(|(m, masked_value)| MatchSummary {
            pii_type: m.pii_type,
            start: m.start,
            end: m.end,
            confidence: m.confidence,
            validated: m.validated,
            masked_value,
        })
        .collect();

    Ok((matches, outcome.masked_text))
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

async fn detect_one(state: &AppState, request: DetectRequest) -> ApiResult<DetectResponse> {
    let started = Instant::now();
    let config = state.request_config(
        request.confidence_threshold,
        request.detect_types.as_deref(),
        &request.strategies,
    )?;

    let text = request.text;
    let text_len = text.len();
    let (matches, masked_text) = state
        .spawn_scan(move |shield| scan(shield, &text, &config))
        .await?;
    state.record_scan("detect", text_len, &matches);

    Ok(DetectResponse {
        pii_found: !matches.is_empty(),
        pii_count: matches.len(),
        matches,
        masked_text: request.mask.then_some(masked_text),
        processing_time_ms: elapsed_ms(started),
    })
}

async fn detect(
    State(state): State<AppState>,
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> ApiResult<Json<DetectResponse>> {
    let started = Instant::now();
    let result = match payload {
        Ok(Json(request)) => state.with_timeout(detect_one(&state, request)).await,
        Err(rejection) => Err(rejection.into()),
    };
    state.finish("detect", started, &result);
    result.map(Json)
}

async fn mask_one(state: &AppState, request: MaskRequest) -> ApiResult<MaskResponse> {
    let started = Instant::now();
    let config = state.request_config(request.confidence_threshold, None, &request.strategies)?;

    let text = request.text;
    let text_len = text.len();
    let (matches, masked_text) = state
        .spawn_scan(move |shield| scan(shield, &text, &config))
        .await?;
    state.record_scan("mask", text_len, &matches);

    Ok(MaskResponse {
        masked_text,
        pii_count: matches.len(),
        processing_time_ms: elapsed_ms(started),
    })
}

async fn mask(
    State(state): State<AppState>,
    payload: Result<Json<MaskRequest>, JsonRejection>,
) -> ApiResult<Json<MaskResponse>> {
    let started = Instant::now();
    let result = match payload {
        Ok(Json(request)) => state.with_timeout(mask_one(&state, request)).await,
        Err(rejection) => Err(rejection.into()),
    };
    state.finish("mask", started, &result);
    result.map(Json)
}

async fn sanitize_one(state: &AppState, request: SanitizeRequest) -> ApiResult<SanitizeResponse> {
    let started = Instant::now();
    let config = (*state.config).clone();

    let prompt = request.prompt;
    let text_len = prompt.len();
    let (matches, masked, prompt) = state
        .spawn_scan(move |shield| {
            let (matches, masked) = scan(shield, &prompt, &config)?;
            Ok((matches, masked, prompt))
        })
        .await?;
    state.record_scan("sanitize", text_len, &matches);

    let mut warnings = Vec::new();
    if !matches.is_empty() {
        let mut labels: Vec<&str> = matches.iter().map(|m| m.pii_type.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        warnings.push(format!(
            "Detected {} PII instances: {}",
            matches.len(),
            labels.join(", ")
        ));
    }

    let masked_applied = request.auto_mask && !matches.is_empty();
    if masked_applied {
        warnings.push("PII has been automatically masked".to_string());
    }

    Ok(SanitizeResponse {
        sanitized_prompt: if request.auto_mask { masked } else { prompt },
        pii_detected: !matches.is_empty(),
        pii_count: matches.len(),
        ai_ready: matches.is_empty() || masked_applied,
        warnings,
        processing_time_ms: elapsed_ms(started),
    })
}

async fn sanitize(
    State(state): State<AppState>,
    payload: Result<Json<SanitizeRequest>, JsonRejection>,
) -> ApiResult<Json<SanitizeResponse>> {
    let started = Instant::now();
    let result = match payload {
        Ok(Json(request)) => state.with_timeout(sanitize_one(&state, request)).await,
        Err(rejection) => Err(rejection.into()),
    };
    state.finish("sanitize", started, &result);
    result.map(Json)
}

async fn batch_all(
    state: &AppState,
    requests: Vec<DetectRequest>,
) -> ApiResult<Vec<DetectResponse>> {
    if requests.len() > state.batch_size_limit {
        return Err(ApiError::InvalidRequest(format!(
            "batch of {} requests exceeds the limit of {}",
            requests.len(),
            state.batch_size_limit
        )));
    }
    state.metrics.record_batch(requests.len());

    let results = futures::future::join_all(
        requests
            .into_iter()
            .map(|request| detect_one(state, request)),
    )
    .await;

    results
        .into_iter()
        .enumerate()
        .map(|(index, result)| result.map_err(|err| prefix_index(index, err)))
        .collect()
}

async fn batch(
    State(state): State<AppState>,
    payload: Result<Json<Vec<DetectRequest>>, JsonRejection>,
) -> ApiResult<Json<Vec<DetectResponse>>> {
    let started = Instant::now();
    // One deadline covers every text in the batch
    let result = match payload {
        Ok(Json(requests)) => state.with_timeout(batch_all(&state, requests)).await,
        Err(rejection) => Err(rejection.into()),
    };
    state.finish("batch", started, &result);
    result.map(Json)
}

fn prefix_index(index: usize, err: ApiError) -> ApiError {
    match err {
        ApiError::PayloadTooLarge(msg) => ApiError::PayloadTooLarge(format!("[{}] {}", index, msg)),
        ApiError::InvalidRequest(msg) => ApiError::InvalidRequest(format!("[{}] {}", index, msg)),
        other => other,
    }
}

async fn types(State(state): State<AppState>) -> Json<TypesResponse> {
    let supported_types = state
        .shield
        .registry()
        .list_patterns()
        .iter()
        .map(|definition| TypeInfo {
            pii_type: definition.pii_type,
            name: definition.pii_type.display_name(),
            description: definition.description,
            base_confidence: definition.base_confidence,
            requires_validation: definition.requires_validation,
            default_strategy: state
                .config
                .strategy_override(definition.pii_type)
                .unwrap_or(definition.default_strategy),
            enabled: state.config.is_enabled(definition.pii_type),
        })
        .collect();

    Json(TypesResponse { supported_types })
}

fn default_true() -> bool {
    true
}
