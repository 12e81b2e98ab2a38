use std::sync::Arc;

use crate::analysis::pipeline::Analyzer;
use crate::auth::AuthGate;

/// Shared application state injected into all route handlers via Axum extractors.
/// Everything here is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthGate>,
    /// Default: `AnalysisPipeline` backed by Gemini.
    pub analyzer: Arc<dyn Analyzer>,
}
