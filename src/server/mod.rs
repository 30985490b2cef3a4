//! HTTP Service
//!
//! - `POST /grade`: run one grading request
//! - `GET /health`: liveness plus the configured provider and model
//!
//! Input errors answer 400, everything else that produced a grading outcome
//! answers 200 with `success` telling completed runs from failed ones.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::grading::BatchOrchestrator;
use crate::types::{GradeResponse, GraderError, GradingOutcome, GradingRequest, Result};

#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<BatchOrchestrator>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub provider: String,
    pub model: String,
}

pub fn router(orchestrator: Arc<BatchOrchestrator>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/grade", post(grade))
        .with_state(AppState { orchestrator })
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider = state.orchestrator.provider();
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "Code grading service is running".to_string(),
        provider: provider.name().to_string(),
        model: provider.model().to_string(),
    })
}

async fn grade(
    State(state): State<AppState>,
    Json(request): Json<GradingRequest>,
) -> (StatusCode, Json<GradeResponse>) {
    info!(
        "Grade request for {} ({} batch(es))",
        request.github_link,
        request.rubric.batches.len()
    );

    let outcome = state
        .orchestrator
        .run(&request.github_link, &request.rubric)
        .await;

    (status_for(&outcome), Json(outcome.to_response()))
}

fn status_for(outcome: &GradingOutcome) -> StatusCode {
    match outcome.error() {
        Some(error) if error.is_input_error() => {
            warn!("Rejected grade request: {}", error);
            StatusCode::BAD_REQUEST
        }
        Some(error) if error.is_acquisition_error() => {
            warn!("Repository acquisition failed: {}", error);
            StatusCode::OK
        }
        Some(error) => {
            error!("Grading failed: {}", error);
            StatusCode::OK
        }
        None => StatusCode::OK,
    }
}

/// Serve on an already-bound listener until `shutdown` resolves
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    orchestrator: Arc<BatchOrchestrator>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(orchestrator))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| GraderError::Server(e.to_string()))
}

/// Bind `addr` and serve until Ctrl-C
pub async fn serve(addr: &str, orchestrator: Arc<BatchOrchestrator>) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| GraderError::Server(format!("failed to bind {}: {}", addr, e)))?;
    let local_addr = listener.local_addr()?;
    info!("Listening on http://{}", local_addr);

    serve_with_shutdown(listener, orchestrator, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutting down");
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::prompt::PromptTemplate;
    use crate::ai::provider::{LlmProvider, LlmResponse};
    use crate::grading::GradingInvoker;
    use crate::types::BatchStatus;
    use crate::workspace::{BatchLoader, RepositoryFetcher, Workspace};
    use async_trait::async_trait;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::sync::oneshot;

    struct OneFileFetcher;

    #[async_trait]
    impl RepositoryFetcher for OneFileFetcher {
        async fn fetch(&self, source_reference: &str) -> Result<Workspace> {
            if source_reference.contains("missing") {
                return Err(GraderError::FetchFailed {
                    stderr: "repository not found".to_string(),
                });
            }
            if !source_reference.contains("github.com") {
                return Err(GraderError::InvalidReference(source_reference.to_string()));
            }
            let workspace = Workspace::create_in(None)?;
            std::fs::write(workspace.root().join("main.py"), "print('hello')")?;
            Ok(workspace)
        }

        fn name(&self) -> &str {
            "one-file"
        }
    }

    struct FixedProvider;

    #[async_trait]
    impl LlmProvider for FixedProvider {
        async fn generate(&self, _prompt: &str) -> Result<LlmResponse> {
            Ok(LlmResponse::content_only(
                r#"{"rubric_score": "3/4", "hundred_point_score": 75, "review": "Solid."}"#,
            ))
        }

        fn name(&self) -> &str {
            "fixed"
        }

        fn model(&self) -> &str {
            "fixed-model"
        }
    }

    fn orchestrator() -> Arc<BatchOrchestrator> {
        let invoker = GradingInvoker::new(
            Arc::new(FixedProvider),
            PromptTemplate::default(),
            Duration::from_secs(5),
        );
        Arc::new(BatchOrchestrator::new(
            Arc::new(OneFileFetcher),
            invoker,
            BatchLoader::default(),
        ))
    }

    async fn spawn_service() -> (SocketAddr, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
        let orchestrator = orchestrator();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind should succeed");
        let addr = listener.local_addr().expect("local_addr should succeed");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _ = serve_with_shutdown(listener, orchestrator, async {
                let _ = shutdown_rx.await;
            })
            .await;
        });

        (addr, shutdown_tx, handle)
    }

    async fn post_grade(addr: SocketAddr, body: serde_json::Value) -> (u16, serde_json::Value) {
        let response = reqwest::Client::new()
            .post(format!("http://{}/grade", addr))
            .json(&body)
            .send()
            .await
            .expect("request should succeed");
        let status = response.status().as_u16();
        (status, response.json().await.expect("json body"))
    }

    #[test]
    fn test_router_builds_with_grade_route() {
        let app: Router = router(orchestrator());
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn test_health() {
        let (addr, shutdown, task) = spawn_service().await;

        let health: HealthResponse = reqwest::get(format!("http://{}/health", addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        shutdown.send(()).ok();
        let _ = task.await;

        assert_eq!(health.status, "healthy");
        assert_eq!(health.provider, "fixed");
        assert_eq!(health.model, "fixed-model");
    }

    #[tokio::test]
    async fn test_grade_completed() {
        let (addr, shutdown, task) = spawn_service().await;

        let (status, body) = post_grade(
            addr,
            serde_json::json!({
                "github_link": "https://github.com/org/repo",
                "rubric": {"rubric": "Prints a greeting", "batches": [["main.py"], ["absent.py"]]}
            }),
        )
        .await;

        shutdown.send(()).ok();
        let _ = task.await;

        assert_eq!(status, 200);
        let response: GradeResponse = serde_json::from_value(body).unwrap();
        match response {
            GradeResponse::Completed {
                success,
                analysis,
                error,
            } => {
                assert!(success);
                assert!(error.is_none());
                assert_eq!(analysis.len(), 2);
                assert_eq!(analysis[0].status, BatchStatus::Success);
                assert_eq!(analysis[0].hundred_point_score, Some(75));
                assert_eq!(analysis[1].status, BatchStatus::Failure);
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_grade_acquisition_failure_is_200() {
        let (addr, shutdown, task) = spawn_service().await;

        let (status, body) = post_grade(
            addr,
            serde_json::json!({
                "github_link": "https://github.com/org/missing",
                "rubric": {"rubric": "Anything", "batches": [["main.py"]]}
            }),
        )
        .await;

        shutdown.send(()).ok();
        let _ = task.await;

        assert_eq!(status, 200);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Git clone failed: repository not found");
        assert_eq!(body["batch_results"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_grade_input_errors_are_400() {
        let (addr, shutdown, task) = spawn_service().await;

        let (empty_rubric_status, empty_rubric_body) = post_grade(
            addr,
            serde_json::json!({
                "github_link": "https://github.com/org/repo",
                "rubric": {"rubric": "  ", "batches": [["main.py"]]}
            }),
        )
        .await;
        let (bad_link_status, _) = post_grade(
            addr,
            serde_json::json!({
                "github_link": "https://example.com/org/repo",
                "rubric": {"rubric": "Anything", "batches": [["main.py"]]}
            }),
        )
        .await;

        shutdown.send(()).ok();
        let _ = task.await;

        assert_eq!(empty_rubric_status, 400);
        assert_eq!(empty_rubric_body["success"], false);
        assert_eq!(bad_link_status, 400);
    }
}
