//! Deterministic script adaptation rules.
//!
//! Rules run in a fixed order against a copy of the current script. Later
//! rules may overwrite fields touched by earlier ones; there is no conflict
//! resolution beyond sequential application. Every rule is evaluated on every
//! call and reports a [`RuleVerdict`], so rules that match but intentionally
//! leave the script alone stay distinguishable from rules that did not match.

use serde::Serialize;

use crate::core::types::{InsightRecord, ScriptState, ScriptVariants};

/// The adaptation rules, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Confused opening: switch to the simple intro.
    IntroClarity,
    /// Negative sentiment: observed only, reserved for synthesis tone control.
    NegativeSentiment,
    /// Neither success nor follow-up: switch to the yes/no call-to-action.
    IgnoredCallToAction,
    /// Follow-up requested: observed only, reserved for a callback list.
    FollowUpRequested,
}

impl Rule {
    pub const ORDER: [Rule; 4] = [
        Rule::IntroClarity,
        Rule::NegativeSentiment,
        Rule::IgnoredCallToAction,
        Rule::FollowUpRequested,
    ];

    /// Human-readable action taken when the rule matches.
    pub fn action(self) -> &'static str {
        match self {
            Rule::IntroClarity => "intro was confusing, switching to simpler opening",
            Rule::NegativeSentiment => {
                "negative sentiment detected, next call should use a softer tone"
            }
            Rule::IgnoredCallToAction => {
                "call-to-action was ignored, switching to a direct yes/no question"
            }
            Rule::FollowUpRequested => "callee requested a follow-up, flagged for callback",
        }
    }
}

/// Result of evaluating one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleVerdict {
    /// Condition matched and the script was mutated.
    Applied,
    /// Condition matched; the rule has no effect on the script.
    Observed,
    /// Condition did not match.
    NotMatched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuleEvaluation {
    pub rule: Rule,
    pub verdict: RuleVerdict,
}

/// Output of [`AdaptationEngine::adapt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adaptation {
    /// Script for the next cycle. Always carries all three fields.
    pub next: ScriptState,
    /// One entry per rule, in [`Rule::ORDER`].
    pub evaluations: Vec<RuleEvaluation>,
}

impl Adaptation {
    pub fn verdict(&self, rule: Rule) -> Option<RuleVerdict> {
        self.evaluations
            .iter()
            .find(|evaluation| evaluation.rule == rule)
            .map(|evaluation| evaluation.verdict)
    }
}

/// Pure rule engine holding the fallback script variants.
#[derive(Debug, Clone)]
pub struct AdaptationEngine {
    variants: ScriptVariants,
}

impl AdaptationEngine {
    pub fn new(variants: ScriptVariants) -> Self {
        Self { variants }
    }

    /// Map `(current, insight)` to the next script state.
    pub fn adapt(&self, current: &ScriptState, insight: &InsightRecord) -> Adaptation {
        let mut next = current.clone();
        let evaluations = Rule::ORDER
            .iter()
            .map(|&rule| RuleEvaluation {
                rule,
                verdict: self.apply(rule, &mut next, insight),
            })
            .collect();
        Adaptation { next, evaluations }
    }

    fn apply(&self, rule: Rule, script: &mut ScriptState, insight: &InsightRecord) -> RuleVerdict {
        match rule {
            Rule::IntroClarity => {
                if insight.intro_clarity == "confused" {
                    script.intro = self.variants.simple_intro.clone();
                    RuleVerdict::Applied
                } else {
                    RuleVerdict::NotMatched
                }
            }
            Rule::NegativeSentiment => {
                if insight.farmer_sentiment == "negative" {
                    RuleVerdict::Observed
                } else {
                    RuleVerdict::NotMatched
                }
            }
            Rule::IgnoredCallToAction => {
                // Substring match: any outcome mentioning success or follow_up keeps the CTA.
                let outcome = insight.call_outcome.as_str();
                if !outcome.contains("success") && !outcome.contains("follow_up") {
                    script.cta = self.variants.yes_no_cta.clone();
                    RuleVerdict::Applied
                } else {
                    RuleVerdict::NotMatched
                }
            }
            Rule::FollowUpRequested => {
                if insight.call_outcome == "follow_up" {
                    RuleVerdict::Observed
                } else {
                    RuleVerdict::NotMatched
                }
            }
        }
    }
}
