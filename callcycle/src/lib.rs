//! Iterative outbound-call simulation loop.
//!
//! Each cycle synthesizes the current call script, transcribes the other
//! party's reply, extracts structured insights from the transcript, and
//! rewrites the script for the next call using a fixed rule table. The
//! architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (script state, insight records,
//!   adaptation rules). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config, state file, speech
//!   synthesis, transcription, language-model analysis). Each external
//!   service sits behind a trait so tests can script it.
//!
//! [`cycle`] sequences core logic with I/O to implement one end-to-end pass.

pub mod core;
pub mod cycle;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
