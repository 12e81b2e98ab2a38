use crate::llm_client::prompts::STRICT_JSON_INSTRUCTION;

const ANALYZER_ROLE: &str = "You are an ATS resume analyzer.";

/// Response schema the model must follow, field for field.
pub const ANALYSIS_SCHEMA: &str = r#"{
  "success": true,
  "analysis": {
    "resume_skills": [],
    "job_description_skills": [],
    "missing_skills": {
      "from_resume_for_job_description": [],
      "from_job_description_for_resume": []
    },
    "ats_optimized_bullet_point_improvements": [
      {
        "original_summary": "",
        "suggested_bullets": [],
        "reasoning": ""
      }
    ],
    "ats_optimization_tips": [],
    "compatibility_score": 0,
    "overall_assessment": ""
  }
}"#;

/// Builds the analysis prompt. Both texts are embedded verbatim.
pub fn build_analysis_prompt(resume_text: &str, job_description: &str) -> String {
    format!(
        "{ANALYZER_ROLE}\n\n\
         {STRICT_JSON_INSTRUCTION}\n\n\
         Use this exact schema:\n\n\
         {ANALYSIS_SCHEMA}\n\n\
         Resume:\n\
         {resume_text}\n\n\
         Job Description:\n\
         {job_description}\n"
    )
}
