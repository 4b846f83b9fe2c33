//! Two-party transcript composition.

/// Compose the transcript handed to analysis.
///
/// Always two lines: the agent placeholder first, then the callee's
/// transcribed reply with surrounding whitespace trimmed.
pub fn compose_transcript(agent_placeholder: &str, farmer_text: &str) -> String {
    format!("Agent: {agent_placeholder}\nFarmer: {}", farmer_text.trim())
}
