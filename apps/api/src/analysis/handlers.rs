//! Axum route handlers for the Analysis API. Both routes sit behind `require_auth`.

use axum::{
    extract::{Multipart, State},
    Extension, Json,
};
use tracing::{debug, info, warn};

use crate::analysis::document::extract_resume_text;
use crate::analysis::models::{AnalysisRequest, AnalysisResult};
use crate::auth::Credential;
use crate::errors::AppError;
use crate::state::AppState;

/// POST /api/v1/analyze
///
/// Analyzes a resume against a job description. Pipeline failures come back
/// as `{"success": false, ...}` with status 200.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Extension(credential): Extension<Credential>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<AnalysisResult>, AppError> {
    validate(&request)?;
    Ok(Json(run_analysis(&state, &credential, request).await))
}

/// POST /api/v1/analyze/upload
///
/// Multipart variant: `resume` file (PDF or text) plus a `job_description` field.
pub async fn handle_analyze_upload(
    State(state): State<AppState>,
    Extension(credential): Extension<Credential>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResult>, AppError> {
    let mut resume_text = None;
    let mut job_description = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resume" => {
                let content_type = field.content_type().map(str::to_string);
                let file_name = field.file_name().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read resume: {e}")))?;
                resume_text = Some(
                    extract_resume_text(data, content_type.as_deref(), file_name.as_deref())
                        .await?,
                );
            }
            "job_description" => {
                job_description = Some(field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read job_description: {e}"))
                })?);
            }
            _ => {}
        }
    }

    let request = AnalysisRequest {
        resume_text: resume_text
            .ok_or_else(|| AppError::Validation("resume file is required".to_string()))?,
        job_description: job_description
            .ok_or_else(|| AppError::Validation("job_description is required".to_string()))?,
    };

    validate(&request)?;
    Ok(Json(run_analysis(&state, &credential, request).await))
}

fn validate(request: &AnalysisRequest) -> Result<(), AppError> {
    if request.resume_text.trim().is_empty() {
        return Err(AppError::Validation("resume_text cannot be empty".to_string()));
    }
    if request.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }
    Ok(())
}

async fn run_analysis(
    state: &AppState,
    credential: &Credential,
    request: AnalysisRequest,
) -> AnalysisResult {
    let subject = credential.subject().unwrap_or("<unknown>");
    info!("Running analysis for {subject}");
    if let Some(expires_at) = credential.expires_at() {
        debug!("Credential for {subject} expires at {expires_at}");
    }

    let result = state.analyzer.analyze(&request).await;
    match result.analysis() {
        Some(analysis) => info!(
            "Analysis for {subject} succeeded: compatibility_score={}",
            analysis.compatibility_score
        ),
        None => warn!(
            "Analysis for {subject} failed (raw output returned: {})",
            result.raw_model_output().is_some()
        ),
    }
    result
}
