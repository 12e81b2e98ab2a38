//! Analysis pipeline: prompt → Gemini (with retry) → parse.
//!
//! Retries belong to the transport phase only. Once text comes back, parsing
//! runs exactly once; unparseable text is handed back raw as a degraded
//! result rather than an error.

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::analysis::models::{AnalysisRequest, AnalysisResult, ModelOutput};
use crate::analysis::prompts::build_analysis_prompt;
use crate::llm_client::{GeminiClient, LlmError};

const UNPARSEABLE_OUTPUT: &str = "Model output could not be parsed as an analysis";

/// Anything that can turn a resume / job description pair into an analysis.
///
/// Carried in `AppState` as `Arc<dyn Analyzer>`.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> AnalysisResult;
}

pub struct AnalysisPipeline {
    llm: GeminiClient,
}

impl AnalysisPipeline {
    pub fn new(llm: GeminiClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Analyzer for AnalysisPipeline {
    async fn analyze(&self, request: &AnalysisRequest) -> AnalysisResult {
        let prompt = build_analysis_prompt(&request.resume_text, &request.job_description);

        let response = match self.llm.generate(&prompt).await {
            Ok(response) => response,
            Err(e) => return AnalysisResult::failure(e.to_string()),
        };

        let Some(raw) = response.text() else {
            error!("Gemini returned no text in the first candidate");
            return AnalysisResult::failure(LlmError::EmptyResponse.to_string());
        };

        debug!("Gemini raw output:\n{raw}");
        let result = parse_analysis(raw);
        if result.is_success() {
            info!("Analysis parsed successfully");
        }
        result
    }
}

/// Parses model text into an analysis, falling back to the raw text on failure.
pub fn parse_analysis(raw: &str) -> AnalysisResult {
    match serde_json::from_str::<ModelOutput>(&strip_json_fences(raw)) {
        Ok(output) => AnalysisResult::Success {
            analysis: output.into_record(),
        },
        Err(e) => {
            warn!("JSON parsing failed ({e}). Returning raw model output.");
            AnalysisResult::Failure {
                error: UNPARSEABLE_OUTPUT.to_string(),
                raw_model_output: Some(raw.to_string()),
            }
        }
    }
}

/// Removes every ```json / ``` marker, wherever the model put them.
fn strip_json_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}
