//! Chat HTTP surface: the page, a JSON generate call and a health check.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use llmops_core::{EndpointInvoker, InferenceRequest, InferenceResponse};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ChatConfig;
use crate::error::{ChatError, ChatResult};

const INDEX_HTML: &str = include_str!("static/index.html");

/// Shared server state.
pub struct AppState {
    pub invoker: Arc<dyn EndpointInvoker>,
    pub endpoint_name: String,
}

/// Body of `POST /api/generate`.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
}

/// Build the router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/generate", post(generate))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve until cancelled.
pub async fn run(
    config: ChatConfig,
    invoker: Arc<dyn EndpointInvoker>,
    cancel: CancellationToken,
) -> ChatResult<()> {
    let state = Arc::new(AppState {
        invoker,
        endpoint_name: config.endpoint.name.clone(),
    });
    let app = router(state);

    let addr = config.server.bind_address;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, endpoint = %config.endpoint.name, "chat server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    info!("chat server shutdown complete");
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// Forward one prompt to the endpoint.
async fn generate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<InferenceResponse>, ChatError> {
    if request.prompt.trim().is_empty() {
        return Err(ChatError::invalid_request("prompt must not be empty"));
    }

    debug!(prompt_chars = request.prompt.len(), "forwarding prompt");
    let response = state
        .invoker
        .invoke(&state.endpoint_name, &InferenceRequest::new(request.prompt))
        .await
        .inspect_err(|e| warn!(endpoint = %state.endpoint_name, error = %e, "invocation failed"))?;

    Ok(Json(response))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use llmops_core::{CoreError, CoreResult};
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct FakeInvoker {
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl EndpointInvoker for FakeInvoker {
        async fn invoke(
            &self,
            endpoint_name: &str,
            request: &InferenceRequest,
        ) -> CoreResult<InferenceResponse> {
            self.prompts.lock().unwrap().push(request.inputs.clone());
            if self.fail {
                return Err(CoreError::invoke(endpoint_name, "ValidationError: not found"));
            }
            Ok(InferenceResponse {
                generated_text: format!("answer to {}", request.inputs),
            })
        }
    }

    fn app(invoker: Arc<FakeInvoker>) -> Router {
        router(Arc::new(AppState {
            invoker,
            endpoint_name: "stablelm-3b-endpoint".to_owned(),
        }))
    }

    fn generate_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/generate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn index_serves_page() {
        let response = app(Arc::default())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let page = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(page.contains("StableLM-3B | AWS SageMaker"));
        assert!(page.contains("/api/generate"));
    }

    #[tokio::test]
    async fn health_is_ok() {
        let response = app(Arc::default())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn prompt_is_forwarded() {
        let invoker = Arc::new(FakeInvoker::default());
        let response = app(invoker.clone())
            .oneshot(generate_request(r#"{"prompt": "What is attention?"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["generated_text"],
            "answer to What is attention?"
        );
        assert_eq!(*invoker.prompts.lock().unwrap(), vec!["What is attention?"]);
    }

    #[tokio::test]
    async fn empty_prompt_is_bad_request() {
        let invoker = Arc::new(FakeInvoker::default());
        let response = app(invoker.clone())
            .oneshot(generate_request(r#"{"prompt": "  "}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "invalid_request");
        assert!(invoker.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn endpoint_failure_is_bad_gateway() {
        let invoker = Arc::new(FakeInvoker {
            fail: true,
            ..Default::default()
        });
        let response = app(invoker)
            .oneshot(generate_request(r#"{"prompt": "hello"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["error"], "endpoint_error");
        assert_eq!(body["message"], "The model endpoint could not answer");
    }
}
