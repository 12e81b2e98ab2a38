use serde::{Deserialize, Serialize, Serializer};
use serde_json::Number;

/// Resume / job description pair submitted for analysis. No length checks at this layer.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRequest {
    pub resume_text: String,
    pub job_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingSkills {
    pub from_resume_for_job_description: Vec<String>,
    pub from_job_description_for_resume: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletImprovement {
    pub original_summary: String,
    pub suggested_bullets: Vec<String>,
    pub reasoning: String,
}

/// Fixed-shape compatibility analysis. Every field is required when parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub resume_skills: Vec<String>,
    pub job_description_skills: Vec<String>,
    pub missing_skills: MissingSkills,
    pub ats_optimized_bullet_point_improvements: Vec<BulletImprovement>,
    pub ats_optimization_tips: Vec<String>,
    /// Kept as the model's literal (`72` stays `72`); no range is enforced.
    pub compatibility_score: Number,
    pub overall_assessment: String,
}

/// Outcome of one analysis. Never an `Err`: callers discriminate on the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisResult {
    Success {
        analysis: AnalysisRecord,
    },
    Failure {
        error: String,
        /// Unparsed model text, present when the call succeeded but parsing did not.
        raw_model_output: Option<String>,
    },
}

impl AnalysisResult {
    pub fn failure(error: impl Into<String>) -> Self {
        AnalysisResult::Failure {
            error: error.into(),
            raw_model_output: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisResult::Success { .. })
    }

    pub fn analysis(&self) -> Option<&AnalysisRecord> {
        match self {
            AnalysisResult::Success { analysis } => Some(analysis),
            AnalysisResult::Failure { .. } => None,
        }
    }

    pub fn raw_model_output(&self) -> Option<&str> {
        match self {
            AnalysisResult::Failure {
                raw_model_output, ..
            } => raw_model_output.as_deref(),
            AnalysisResult::Success { .. } => None,
        }
    }
}

#[derive(Serialize)]
struct ResultBody<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis: Option<&'a AnalysisRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw_model_output: Option<&'a str>,
}

impl Serialize for AnalysisResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let body = match self {
            AnalysisResult::Success { analysis } => ResultBody {
                success: true,
                analysis: Some(analysis),
                error: None,
                raw_model_output: None,
            },
            AnalysisResult::Failure {
                error,
                raw_model_output,
            } => ResultBody {
                success: false,
                analysis: None,
                error: Some(error),
                raw_model_output: raw_model_output.as_deref(),
            },
        };
        body.serialize(serializer)
    }
}

/// What the model is asked to return. A bare record is accepted as well.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ModelOutput {
    Envelope { analysis: AnalysisRecord },
    Bare(AnalysisRecord),
}

impl ModelOutput {
    pub(crate) fn into_record(self) -> AnalysisRecord {
        match self {
            ModelOutput::Envelope { analysis } | ModelOutput::Bare(analysis) => analysis,
        }
    }
}
