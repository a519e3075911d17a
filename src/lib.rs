//! Ranks the next actions an automated app explorer should take on one
//! screen, given the screen's UI hierarchy document.
//!
//! `tree` parses and enriches the document, `score` and `candidate` pick what
//! is worth acting on, and `guidance` asks the popup detector, ranking oracle
//! and test data generator (`collab`) before assembling the final list.

pub mod candidate;
pub mod cli;
pub mod collab;
pub mod guidance;
pub mod input;
pub mod score;
pub mod trace;
pub mod tree;

pub use guidance::guidance_model::{GuidanceOutcome, GuidanceRequest, RankedAction};
pub use guidance::orchestrator::Prioritizer;
pub use tree::builder::build_tree;
