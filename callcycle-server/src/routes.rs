//! HTTP route handlers.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use callcycle::core::types::{InsightRecord, ScriptState};
use callcycle::cycle::run_cycle;
use callcycle::io::script_store::ScriptStore;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use crate::state::AppState;

/// Build the router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/script", get(get_script))
        .route("/run_simulation_cycle", post(run_simulation_cycle))
}

/// Failure reported as `{"detail": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct CycleResponse {
    pub message: &'static str,
    pub analysis: InsightRecord,
    pub next_script: ScriptState,
}

async fn health() -> &'static str {
    "ok"
}

/// GET /script - current script state (defaults when none is saved).
async fn get_script(State(state): State<AppState>) -> Result<Json<ScriptState>, ApiError> {
    let store = ScriptStore::new(state.paths().script_path, state.config.scripts.clone());
    let script = tokio::task::spawn_blocking(move || store.load())
        .await
        .map_err(|err| ApiError::internal(format!("script load task failed: {err}")))?
        .map_err(|err| ApiError::internal(format!("{err:#}")))?;
    Ok(Json(script))
}

/// POST /run_simulation_cycle - run one full cycle and return its insights.
pub async fn run_simulation_cycle(
    State(state): State<AppState>,
) -> Result<Json<CycleResponse>, ApiError> {
    // The guard moves into the blocking task: a dropped request must not
    // release the lock while its cycle is still running.
    let guard = Arc::clone(&state.cycle_lock).lock_owned().await;
    let root = state.project_dir.clone();
    let config = state.config.clone();
    let adapters = state.adapters.clone();

    let result = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        run_cycle(&root, &config, &adapters)
    })
    .await
    .map_err(|err| ApiError::internal(format!("simulation cycle failed: {err}")))?;

    match result {
        Ok(outcome) => {
            info!(outcome = %outcome.analysis.call_outcome, "simulation cycle complete");
            Ok(Json(CycleResponse {
                message: "Simulation cycle complete.",
                analysis: outcome.analysis,
                next_script: outcome.next_script,
            }))
        }
        Err(err) => {
            error!(stage = err.stage.as_str(), "simulation cycle failed");
            Err(ApiError::internal(err.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use callcycle::cycle::Adapters;
    use callcycle::io::config::CallcycleConfig;
    use callcycle::io::synthesis::Synthesizer;
    use callcycle::test_support::{ScriptedAnalyzer, insight, scripted_adapters};
    use tower::ServiceExt;

    /// Synthesizer that sleeps and records how many calls overlap.
    struct SlowSynthesizer {
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl Synthesizer for SlowSynthesizer {
        fn synthesize(&self, _text: &str, output_path: &Path) -> anyhow::Result<()> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(300));
            self.active.fetch_sub(1, Ordering::SeqCst);
            std::fs::write(output_path, b"ID3")?;
            Ok(())
        }
    }

    fn app_state(dir: &std::path::Path, analyzer: ScriptedAnalyzer) -> AppState {
        AppState::new(
            dir.to_path_buf(),
            CallcycleConfig::default(),
            scripted_adapters(analyzer),
        )
    }

    #[tokio::test]
    async fn cycle_returns_analysis_and_next_script() {
        let temp = tempfile::tempdir().expect("tempdir");
        let state = app_state(
            temp.path(),
            ScriptedAnalyzer::returning(vec![insight("neutral", "understood", "rejection")]),
        );

        let Json(body) = run_simulation_cycle(State(state.clone()))
            .await
            .expect("cycle");
        assert_eq!(body.message, "Simulation cycle complete.");
        assert_eq!(body.analysis.call_outcome, "rejection");
        assert_eq!(body.next_script.cta, state.config.scripts.yes_no_cta);

        let value = serde_json::to_value(&body).expect("json");
        let keys: Vec<&str> = value
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys.len(), 3);
        assert!(value.get("analysis").is_some());
        assert!(value.get("next_script").is_some());
    }

    #[tokio::test]
    async fn cycle_failure_maps_to_server_error_detail() {
        let temp = tempfile::tempdir().expect("tempdir");
        let state = app_state(temp.path(), ScriptedAnalyzer::failing("model overloaded"));

        let err = run_simulation_cycle(State(state)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.detail,
            "simulation cycle failed: analysis failed: model overloaded"
        );
    }

    #[tokio::test]
    async fn script_endpoint_reports_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let state = app_state(temp.path(), ScriptedAnalyzer::returning(Vec::new()));

        let Json(script) = get_script(State(state.clone())).await.expect("script");
        assert_eq!(script, ScriptState::from_defaults(&state.config.scripts));
    }

    #[tokio::test]
    async fn dropped_request_keeps_cycle_lock_until_cycle_ends() {
        let temp = tempfile::tempdir().expect("tempdir");
        let peak = Arc::new(AtomicUsize::new(0));
        let adapters = Adapters {
            synthesizer: Box::new(SlowSynthesizer {
                active: Arc::new(AtomicUsize::new(0)),
                peak: Arc::clone(&peak),
            }),
            ..scripted_adapters(ScriptedAnalyzer::returning(vec![
                insight("neutral", "understood", "rejection"),
                insight("positive", "understood", "success"),
            ]))
        };
        let state = AppState::new(
            temp.path().to_path_buf(),
            CallcycleConfig::default(),
            adapters,
        );

        // The client gives up while the first cycle is still synthesizing.
        let first = tokio::time::timeout(
            Duration::from_millis(50),
            run_simulation_cycle(State(state.clone())),
        )
        .await;
        assert!(first.is_err());

        let Json(body) = run_simulation_cycle(State(state))
            .await
            .expect("second cycle");
        assert_eq!(body.message, "Simulation cycle complete.");
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn router_serves_cycle_and_failure_detail() {
        let temp = tempfile::tempdir().expect("tempdir");
        let app = router().with_state(app_state(
            temp.path(),
            ScriptedAnalyzer::new(vec![
                Ok(insight("neutral", "confused", "follow_up")),
                Err("model overloaded".to_string()),
            ]),
        ));
        let request = || {
            Request::builder()
                .method("POST")
                .uri("/run_simulation_cycle")
                .body(Body::empty())
                .expect("request")
        };

        let response = app.clone().oneshot(request()).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(value["message"], "Simulation cycle complete.");
        assert_eq!(value["analysis"]["call_outcome"], "follow_up");
        assert_eq!(
            value["next_script"]["intro"],
            CallcycleConfig::default().scripts.simple_intro.as_str()
        );

        let response = app.oneshot(request()).await.expect("response");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(
            value,
            json!({ "detail": "simulation cycle failed: analysis failed: model overloaded" })
        );
    }
}
