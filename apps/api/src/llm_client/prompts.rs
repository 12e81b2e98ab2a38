// Cross-cutting prompt fragments.
// Feature modules keep their own prompts.rs and pull shared pieces from here.

/// Instruction block that forbids anything but a bare JSON document.
pub const STRICT_JSON_INSTRUCTION: &str = "Return STRICT JSON only.
Do not wrap in markdown.
Do not include backticks.
Do not include explanations.";
