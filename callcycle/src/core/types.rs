//! Shared deterministic types for the script and its analysis.
//!
//! These types define the contracts between the store, the external
//! adapters, and the adaptation engine. They must not depend on I/O.

use serde::{Deserialize, Serialize};

/// The three-part call script driving the next synthesized call.
///
/// All three fields are always present; the store substitutes defaults for
/// any that are missing on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptState {
    pub intro: String,
    pub benefits: String,
    pub cta: String,
}

impl ScriptState {
    /// Initial script built from the configured default variants.
    pub fn from_defaults(variants: &ScriptVariants) -> Self {
        Self {
            intro: variants.default_intro.clone(),
            benefits: variants.default_benefits.clone(),
            cta: variants.default_cta.clone(),
        }
    }

    /// Full spoken text: intro, benefits, and call-to-action joined by spaces.
    pub fn full_text(&self) -> String {
        format!("{} {} {}", self.intro, self.benefits, self.cta)
    }
}

/// Default and alternate script texts.
///
/// Passed explicitly into the store (for first-run defaults) and into the
/// adaptation engine (for the fallback variants).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptVariants {
    /// Initial intro text.
    pub default_intro: String,
    /// Fallback intro used after the callee was confused by the opening.
    pub simple_intro: String,
    /// Initial benefits text.
    pub default_benefits: String,
    /// Initial call-to-action text.
    pub default_cta: String,
    /// Fallback call-to-action used after the callee ignored the question.
    pub yes_no_cta: String,
}

impl Default for ScriptVariants {
    fn default() -> Self {
        Self {
            default_intro: "Hello, I am calling from the Farmer Support Program about a new \
                            crop protection plan available in your area."
                .to_string(),
            simple_intro: "Hello! I have good news for farmers like you. Can I take one minute?"
                .to_string(),
            default_benefits: "The plan covers crop losses from drought, flood and pests, and \
                               the premium is subsidised so you pay only a small share."
                .to_string(),
            default_cta: "Would you like me to share more details so you can consider enrolling?"
                .to_string(),
            yes_no_cta: "Shall I register you for the plan today, yes or no?".to_string(),
        }
    }
}

impl ScriptVariants {
    /// Returns `(name, value)` pairs in declaration order.
    pub fn entries(&self) -> [(&'static str, &str); 5] {
        [
            ("default_intro", self.default_intro.as_str()),
            ("simple_intro", self.simple_intro.as_str()),
            ("default_benefits", self.default_benefits.as_str()),
            ("default_cta", self.default_cta.as_str()),
            ("yes_no_cta", self.yes_no_cta.as_str()),
        ]
    }
}

/// Structured insights extracted from one call transcript.
///
/// Field values come from a language model and are treated as opaque text:
/// the adaptation rules compare against known values but never reject
/// unknown ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightRecord {
    /// Emotion in the callee's tone: `positive`, `neutral`, or `negative`.
    pub farmer_sentiment: String,
    /// Signs of curiosity, confusion, or disinterest.
    pub interest_level: String,
    /// Whether the opening was understood: `understood` or `confused`.
    pub intro_clarity: String,
    /// Concerns raised by the callee, in the order they came up.
    pub objections: Vec<String>,
    /// Outcome of the call: `success`, `rejection`, or `follow_up`.
    pub call_outcome: String,
}
