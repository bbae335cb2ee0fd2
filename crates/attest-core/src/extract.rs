//! Best-effort recovery of a JSON object from free-form model text.
//!
//! The completion service is untrusted and frequently wraps its JSON in
//! prose or code fences. This is a deliberately lossy contract: any parse
//! failure yields `None`, and callers degrade to a locally computed
//! summary instead of failing the run. Kept behind this module seam so a
//! schema-constrained completion mode could replace it.

use crate::model::ModelReply;
use regex::Regex;

pub fn extract(text: &str) -> Option<ModelReply> {
    let stripped = strip_code_fences(text);
    let re = Regex::new(r"\{[\s\S]*\}").ok()?;
    let candidate = re.find(&stripped)?;
    let mut reply: ModelReply = serde_json::from_str(candidate.as_str()).ok()?;
    for s in &mut reply.suggestions {
        s.confidence = s.confidence.clamp(0.0, 1.0);
    }
    Some(reply)
}

fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "\n").replace("```", "\n")
}
