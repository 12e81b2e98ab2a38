// Resume / job description compatibility analysis.
// All Gemini calls go through llm_client; this module owns the prompt and the result schema.

pub mod document;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod prompts;
