//! Serving container HTTP surface: `GET /ping` and `POST /invocations`.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use llmops_core::{GenerationParameters, InferenceRequest, InferenceResponse, CONTENT_TYPE_JSON};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::InferenceConfig;
use crate::error::{InferenceError, InferenceResult};
use crate::generator::create_loader;
use crate::model::{ModelSlot, ModelState};

/// Shared server state. Read-only once the model is loaded.
#[derive(Debug)]
pub struct AppState {
    pub model: Arc<ModelSlot>,
    pub generation: GenerationParameters,
    pub max_new_tokens: u32,
}

impl AppState {
    /// State for `config` around an existing model slot.
    #[must_use]
    pub fn new(config: &InferenceConfig, model: Arc<ModelSlot>) -> Self {
        Self {
            model,
            generation: config.generation.clone(),
            max_new_tokens: config.limits.max_new_tokens,
        }
    }
}

/// Build the router.
pub fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/invocations", post(invocations))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Bind, start loading the model, and serve until cancelled.
pub async fn run(config: InferenceConfig, cancel: CancellationToken) -> InferenceResult<()> {
    let loader = create_loader(&config.model)?;
    let model = Arc::new(ModelSlot::new());
    let state = Arc::new(AppState::new(&config, model.clone()));
    let app = router(state, config.limits.max_body_bytes);

    let addr = config.server.bind_address;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, backend = ?config.model.backend, "inference server listening");

    // Liveness must answer while the model loads.
    tokio::spawn(async move { model.initialize(loader).await });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    info!("inference server shutdown complete");
    Ok(())
}

/// Liveness: ready only once the model has loaded.
async fn ping(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let model_state = state.model.state();
    let status = match model_state {
        ModelState::Ready => StatusCode::OK,
        ModelState::Loading | ModelState::Failed => StatusCode::SERVICE_UNAVAILABLE,
    };
    (
        status,
        Json(serde_json::json!({ "status": model_state.as_str() })),
    )
}

/// Generate text for one prompt.
async fn invocations(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, InferenceError> {
    check_content_type(&headers)?;
    check_accept(&headers)?;

    let request: InferenceRequest = serde_json::from_slice(&body)
        .map_err(|e| InferenceError::invalid_request(e.to_string()))?;
    if request.inputs.trim().is_empty() {
        return Err(InferenceError::invalid_request("inputs must not be empty"));
    }

    let parameters = state.generation.apply(&request.effective_overrides());
    parameters
        .validate(state.max_new_tokens)
        .map_err(|e| InferenceError::invalid_request(e.to_string()))?;

    let generator = state.model.generator()?;

    debug!(
        prompt_chars = request.inputs.len(),
        max_new_tokens = parameters.max_new_tokens,
        "generating"
    );
    let generated_text = generator
        .generate(&request.inputs, &parameters)
        .await
        .inspect_err(|e| warn!(error = %e, "generation failed"))?;

    Ok(Json(InferenceResponse { generated_text }))
}

/// The request body must be JSON; media-type parameters are allowed.
fn check_content_type(headers: &HeaderMap) -> InferenceResult<()> {
    let Some(value) = headers.get(header::CONTENT_TYPE) else {
        return Err(InferenceError::UnsupportedMediaType(
            "missing content type".to_owned(),
        ));
    };
    let value = value.to_str().unwrap_or_default();
    if essence(value).eq_ignore_ascii_case(CONTENT_TYPE_JSON) {
        Ok(())
    } else {
        Err(InferenceError::UnsupportedMediaType(value.to_owned()))
    }
}

/// An `Accept` header, when present, must admit JSON.
fn check_accept(headers: &HeaderMap) -> InferenceResult<()> {
    let Some(value) = headers.get(header::ACCEPT) else {
        return Ok(());
    };
    let value = value.to_str().unwrap_or_default();
    let admits_json = value.split(',').map(essence).any(|range| {
        range.is_empty()
            || range == "*/*"
            || range.eq_ignore_ascii_case("application/*")
            || range.eq_ignore_ascii_case(CONTENT_TYPE_JSON)
    });
    if admits_json {
        Ok(())
    } else {
        Err(InferenceError::NotAcceptable(value.to_owned()))
    }
}

/// Media type without parameters: `application/json; charset=utf-8` → `application/json`.
fn essence(value: &str) -> &str {
    value.split(';').next().unwrap_or_default().trim()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::generator::{EchoGenerator, TextGenerator};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Records every call and answers with a fixed text.
    #[derive(Debug, Default)]
    struct RecordingGenerator {
        calls: AtomicUsize,
        last_parameters: Mutex<Option<GenerationParameters>>,
    }

    #[async_trait]
    impl TextGenerator for RecordingGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            parameters: &GenerationParameters,
        ) -> InferenceResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_parameters.lock().unwrap() = Some(parameters.clone());
            Ok("summary".to_owned())
        }
    }

    fn app_with(model: ModelSlot) -> Router {
        let config = InferenceConfig::default();
        let state = Arc::new(AppState::new(&config, Arc::new(model)));
        router(state, config.limits.max_body_bytes)
    }

    fn invocation(content_type: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/invocations")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn ping_is_unavailable_while_loading() {
        let app = app_with(ModelSlot::new());
        let response = app
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["status"], "loading");
    }

    #[tokio::test]
    async fn ping_is_ok_once_loaded() {
        let app = app_with(ModelSlot::ready(Arc::new(EchoGenerator)));
        let response = app
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ready");
    }

    #[tokio::test]
    async fn text_plain_is_rejected_before_the_model() {
        let generator = Arc::new(RecordingGenerator::default());
        let app = app_with(ModelSlot::ready(generator.clone()));

        let response = app
            .oneshot(invocation("text/plain", r#"{"inputs": "hello"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn json_with_charset_is_accepted() {
        let app = app_with(ModelSlot::ready(Arc::new(EchoGenerator)));
        let response = app
            .oneshot(invocation(
                "application/json; charset=utf-8",
                r#"{"inputs": "hello there"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            CONTENT_TYPE_JSON
        );
        assert_eq!(json_body(response).await["generated_text"], "hello there");
    }

    #[tokio::test]
    async fn unacceptable_accept_is_rejected() {
        let app = app_with(ModelSlot::ready(Arc::new(EchoGenerator)));
        let mut request = invocation(CONTENT_TYPE_JSON, r#"{"inputs": "hello"}"#);
        request
            .headers_mut()
            .insert(header::ACCEPT, "text/html".parse().unwrap());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
    }

    #[tokio::test]
    async fn malformed_bodies_are_bad_requests() {
        for body in [
            r#"{"prompt": "hello"}"#,
            r#"{"inputs": 42}"#,
            r#"{"inputs": "   "}"#,
            r#"{"inputs": "hi", "max_new_tokens": 0}"#,
            r#"{"inputs": "hi", "parameters": {"top_p": 1.5}}"#,
            "not json",
        ] {
            let app = app_with(ModelSlot::ready(Arc::new(EchoGenerator)));
            let response = app.oneshot(invocation(CONTENT_TYPE_JSON, body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        }
    }

    #[tokio::test]
    async fn invocation_before_load_is_unavailable() {
        let app = app_with(ModelSlot::new());
        let response = app
            .oneshot(invocation(CONTENT_TYPE_JSON, r#"{"inputs": "hello"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn request_parameters_override_defaults() {
        let generator = Arc::new(RecordingGenerator::default());
        let app = app_with(ModelSlot::ready(generator.clone()));

        let response = app
            .oneshot(invocation(
                CONTENT_TYPE_JSON,
                r#"{"inputs": "hi", "max_new_tokens": 512, "temperature": 0.7}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["generated_text"], "summary");

        let used = generator.last_parameters.lock().unwrap().clone().unwrap();
        assert_eq!(used.max_new_tokens, 512);
        assert!((used.temperature - 0.7).abs() < f32::EPSILON);
        assert!((used.top_p - 0.9).abs() < f32::EPSILON);
        assert!((used.repetition_penalty - 1.2).abs() < f32::EPSILON);
    }

    #[test]
    fn essence_strips_parameters() {
        assert_eq!(essence("application/json; charset=utf-8"), "application/json");
        assert_eq!(essence(" text/plain "), "text/plain");
    }
}
