use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
};
use case_flow::{InMemoryStateStore, StateStore};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::adapters::{
    LegalAnalysisClient, MedicalConsultationClient, MetadataPrefillClient, ScoringClient,
    TextExtractor, UnstructuredOcrClient,
};
use crate::config::AppConfig;
use crate::models::{
    AnalysisInput, AnalysisState, AnalyzeCaseRequest, Case, CasePrefill, ConsultationRequest,
    CreateCaseRequest, MedicalOpinion, PrefillRequest, UpdateCaseStatusRequest,
    UpdateRiskScoreRequest,
};
use crate::orchestrator::AnalysisOrchestrator;
use crate::registry::CaseRegistry;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "case_id": id
        })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<CaseRegistry>,
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub consultant: Arc<MedicalConsultationClient>,
    pub prefill: Arc<MetadataPrefillClient>,
}

pub fn create_app(config: AppConfig) -> Router {
    build_router(create_app_state(config))
}

fn create_app_state(config: AppConfig) -> AppState {
    let store: Arc<dyn StateStore<AnalysisState>> = Arc::new(InMemoryStateStore::new());
    let extractor: Arc<dyn TextExtractor> =
        Arc::new(UnstructuredOcrClient::new(config.unstructured_api_key));

    let analyst = Arc::new(LegalAnalysisClient::new(config.openrouter_api_key.clone()));
    let scorer = Arc::new(ScoringClient::new(config.openrouter_api_key.clone()));
    let orchestrator = Arc::new(AnalysisOrchestrator::new(
        store,
        extractor.clone(),
        analyst,
        scorer,
    ));

    let consultant = Arc::new(MedicalConsultationClient::new(
        config.openrouter_api_key.clone(),
    ));
    let prefill = Arc::new(MetadataPrefillClient::new(
        config.openrouter_api_key,
        extractor,
    ));

    AppState {
        registry: Arc::new(CaseRegistry::with_demo_cases()),
        orchestrator,
        consultant,
        prefill,
    }
}

fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/cases", get(list_cases).post(create_case))
        .route("/cases/{case_id}", get(get_case))
        .route("/cases/{case_id}/status", put(update_case_status))
        .route("/cases/{case_id}/risk-score", put(update_risk_score))
        .route(
            "/cases/{case_id}/analysis",
            post(start_case_analysis)
                .get(get_case_analysis)
                .delete(reset_case_analysis),
        )
        .route("/consultation", post(request_consultation))
        .route("/prefill", post(prefill_case_form))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Accident Case Analysis Service",
        "version": "1.0.0",
        "description": "AI-assisted draft assessment of workplace accident cases",
        "endpoints": {
            "GET /cases": "List cases",
            "POST /cases": "Register a new case",
            "POST /cases/{case_id}/analysis": "Start document analysis for a case",
            "GET /cases/{case_id}/analysis": "Current analysis state",
            "DELETE /cases/{case_id}/analysis": "Reset analysis state",
            "POST /consultation": "Request a medical consultation opinion",
            "POST /prefill": "Pre-fill the new-case form from one document",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn list_cases(State(state): State<AppState>) -> Json<Vec<Case>> {
    Json(state.registry.list())
}

async fn create_case(
    State(state): State<AppState>,
    Json(request): Json<CreateCaseRequest>,
) -> ApiResult<Case> {
    if request.applicant_name.trim().is_empty() {
        return Err(bad_request_error("Applicant name is required"));
    }
    Ok(Json(state.registry.create(request)))
}

async fn get_case(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> ApiResult<Case> {
    state
        .registry
        .get(&case_id)
        .map(Json)
        .ok_or_else(|| not_found_error("Case not found", &case_id))
}

async fn update_case_status(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
    Json(request): Json<UpdateCaseStatusRequest>,
) -> ApiResult<Case> {
    state
        .registry
        .set_status(&case_id, request.status)
        .map(Json)
        .ok_or_else(|| not_found_error("Case not found", &case_id))
}

async fn update_risk_score(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
    Json(request): Json<UpdateRiskScoreRequest>,
) -> ApiResult<Case> {
    if request.risk_score > 100 {
        return Err(bad_request_error("Risk score must be between 0 and 100"));
    }
    state
        .registry
        .set_risk_score(&case_id, request.risk_score)
        .map(Json)
        .ok_or_else(|| not_found_error("Case not found", &case_id))
}

/// Accepts the upload, validates it, and runs the pipeline in the
/// background. Clients follow progress through `GET .../analysis`.
async fn start_case_analysis(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
    Json(request): Json<AnalyzeCaseRequest>,
) -> ApiResult<Value> {
    if state.registry.get(&case_id).is_none() {
        return Err(not_found_error("Case not found", &case_id));
    }

    let input = AnalysisInput::from_parts(request.files, request.text_input)
        .map_err(|e| bad_request_error(&e.to_string()))?;

    info!(case_id = %case_id, "Accepted analysis request");

    let orchestrator = state.orchestrator.clone();
    let id = case_id.clone();
    tokio::spawn(async move {
        // failures are recorded in the case's analysis state
        let _ = orchestrator.start(&id, input).await;
    });

    Ok(Json(json!({
        "case_id": case_id,
        "status": "started",
        "message": "Case analysis started"
    })))
}

async fn get_case_analysis(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> Json<AnalysisState> {
    Json(state.orchestrator.state(&case_id).await)
}

async fn reset_case_analysis(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> Json<Value> {
    state.orchestrator.reset(&case_id).await;
    Json(json!({
        "case_id": case_id,
        "status": "reset"
    }))
}

async fn request_consultation(
    State(state): State<AppState>,
    Json(request): Json<ConsultationRequest>,
) -> ApiResult<MedicalOpinion> {
    if request.question.trim().is_empty() {
        return Err(bad_request_error("Consultation question cannot be empty"));
    }

    match state
        .consultant
        .consult(&request.question, &request.context)
        .await
    {
        Ok(opinion) => Ok(Json(opinion)),
        Err(e) => {
            error!(error = %e, "Medical consultation failed");
            Err(internal_error("Medical consultation failed", &e.to_string()))
        }
    }
}

async fn prefill_case_form(
    State(state): State<AppState>,
    Json(request): Json<PrefillRequest>,
) -> ApiResult<CasePrefill> {
    match state.prefill.prefill(&request.file).await {
        Ok(prefill) => Ok(Json(prefill)),
        Err(e) => {
            error!(file = %request.file.name, error = %e, "Form pre-fill failed");
            Err(internal_error("Form pre-fill failed", &e.to_string()))
        }
    }
}
