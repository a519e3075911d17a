use std::collections::HashSet;
use std::thread;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::candidate::candidate_model::Candidate;
use crate::candidate::filter::filter_candidates;
use crate::collab::datagen::{DataGenerationRequest, DataGenerator, interpret_data_generation_response};
use crate::collab::mock::Unconfigured;
use crate::collab::oracle::{OracleCandidate, RankingOracle, RankingRequest, parse_ranking_response};
use crate::collab::popup::{
    DEFAULT_POPUP_TEST_CASE, PopupDetector, PopupRequest, interpret_popup_response,
    popup_to_ranked_action,
};
use crate::guidance::error::GuidanceError;
use crate::guidance::guidance_model::{GuidanceOutcome, GuidanceRequest, RankedAction, RankingStrategy};
use crate::guidance::merger::merge_generated_data;
use crate::trace::{
    logger::TraceLogger,
    trace::{Stage, TraceEvent},
};
use crate::tree::builder::build_tree;
use crate::tree::tree_model::{NodeId, UiTree};

pub const POPUP_EXPLANATION: &str =
    "Pop up is identified, so need to close the popup to perform any further actions.";
pub const READING_ORDER_EXPLANATION: &str =
    "Ranking was unavailable, so actions are ordered top-to-bottom, left-to-right.";
pub const NO_CANDIDATES_EXPLANATION: &str = "No actionable elements were found on the screen.";

// ============================================================================
// Prioritizer
// ============================================================================

/// Turns one screen into an ordered list of next actions.
///
/// The popup check gates everything else. Without a popup, ranking and test
/// data generation run side by side on scoped threads and are both joined
/// before their results are merged. A failing collaborator only disables its
/// own feature.
pub struct Prioritizer {
    popup: Box<dyn PopupDetector>,
    oracle: Box<dyn RankingOracle>,
    data: Box<dyn DataGenerator>,
    tracer: TraceLogger,
}

impl Prioritizer {
    pub fn new(
        popup: Box<dyn PopupDetector>,
        oracle: Box<dyn RankingOracle>,
        data: Box<dyn DataGenerator>,
    ) -> Self {
        Self {
            popup,
            oracle,
            data,
            tracer: TraceLogger::disabled(),
        }
    }

    /// No collaborators at all: candidates come back in reading order.
    pub fn offline() -> Self {
        Self::new(
            Box::new(Unconfigured::new("popup detector")),
            Box::new(Unconfigured::new("ranking oracle")),
            Box::new(Unconfigured::new("test data generator")),
        )
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn seek_guidance(&self, request: &GuidanceRequest) -> Result<GuidanceOutcome, GuidanceError> {
        let request_id = request.request_id.as_str();

        info!(request_id, "parsing UI hierarchy");
        let tree = build_tree(&request.document)?;
        info!(request_id, nodes = tree.len(), "UI tree built");
        self.tracer.log(
            &TraceEvent::now(request_id, Stage::TreeBuilt)
                .with_detail(format!("{} nodes", tree.len()))
                .with_fingerprint(&request.document),
        );

        if let Some(action) = self.check_for_popup(request) {
            let outcome = GuidanceOutcome {
                ranked_actions: vec![action],
                explanation: POPUP_EXPLANATION.to_string(),
                strategy: RankingStrategy::Popup,
            };
            self.trace_completed(request_id, &outcome);
            return Ok(outcome);
        }

        let (ranking, generated) = thread::scope(|scope| {
            let ranking = scope.spawn(|| self.prioritize(request, &tree));
            let generated = scope.spawn(|| self.generate_test_data(request));
            (ranking.join(), generated.join())
        });

        let mut outcome = ranking.unwrap_or_else(|_| {
            error!(request_id, "ranking branch panicked; using reading order");
            reading_order_outcome(filter_candidates(&tree, tree.nodes()))
        });

        let generated = generated.unwrap_or_else(|_| {
            error!(request_id, "test data branch panicked; no generated data attached");
            None
        });

        if let Some(fields) = generated {
            let field_count = fields.len();
            let ranked = std::mem::take(&mut outcome.ranked_actions);
            outcome.ranked_actions = merge_generated_data(request_id, ranked, fields);

            let attached = outcome
                .ranked_actions
                .iter()
                .filter(|a| a.generated_data.is_some())
                .count();
            info!(request_id, fields = field_count, attached, "generated data merged");
            self.tracer.log(
                &TraceEvent::now(request_id, Stage::Merge)
                    .with_outcome("merged")
                    .with_detail(format!("{} of {} fields attached", attached, field_count)),
            );
        }

        self.trace_completed(request_id, &outcome);
        Ok(outcome)
    }

    /// The single close-popup action, if the detector found a popup.
    fn check_for_popup(&self, request: &GuidanceRequest) -> Option<RankedAction> {
        let request_id = request.request_id.as_str();
        let popup_request = PopupRequest {
            document: &request.document,
            document_url: request.document_url.as_deref(),
            image: request.image.as_deref(),
            image_url: request.image_url.as_deref(),
            test_case_description: DEFAULT_POPUP_TEST_CASE,
        };

        let started = Instant::now();
        let verdict = self
            .popup
            .detect(&popup_request)
            .and_then(|response| interpret_popup_response(&response));
        let elapsed = started.elapsed();
        info!(request_id, elapsed_ms = elapsed.as_millis() as u64, "popup check finished");

        let trace = TraceEvent::now(request_id, Stage::PopupCheck).with_elapsed(elapsed);
        match verdict {
            Ok(Some(metadata)) => {
                info!(request_id, "popup detected");
                self.tracer.log(&trace.with_outcome("detected"));
                Some(popup_to_ranked_action(&metadata))
            }
            Ok(None) => {
                debug!(request_id, "no popup on screen");
                self.tracer.log(&trace.with_outcome("clear"));
                None
            }
            Err(e) => {
                warn!(request_id, error = %e, "popup detection unavailable; continuing without it");
                self.tracer
                    .log(&trace.with_outcome("unavailable").with_detail(&e));
                None
            }
        }
    }

    /// Rank candidates with the oracle, or in reading order when it cannot help.
    fn prioritize(&self, request: &GuidanceRequest, tree: &UiTree) -> GuidanceOutcome {
        let request_id = request.request_id.as_str();
        let candidates = filter_candidates(tree, tree.nodes());
        info!(request_id, candidates = candidates.len(), "candidates selected");

        if candidates.is_empty() {
            return GuidanceOutcome {
                ranked_actions: Vec::new(),
                explanation: NO_CANDIDATES_EXPLANATION.to_string(),
                strategy: RankingStrategy::NoCandidates,
            };
        }

        let ranking_request = RankingRequest {
            request_id,
            screen_context: "",
            image: request.image.as_deref(),
            candidates: candidates.iter().map(OracleCandidate::from).collect(),
            history: &request.history,
            user_prompt: &request.user_prompt,
        };

        let started = Instant::now();
        let answer = self
            .oracle
            .rank(&ranking_request)
            .and_then(|raw| parse_ranking_response(&raw));
        let trace = TraceEvent::now(request_id, Stage::Ranking).with_elapsed(started.elapsed());

        match answer {
            Ok(ranking) => {
                let ranked_actions = rank_by_oracle(tree, &ranking.node_ids);
                if !ranked_actions.is_empty() {
                    info!(request_id, ranked = ranked_actions.len(), "oracle ranking applied");
                    self.tracer.log(&trace.with_outcome("oracle"));
                    return GuidanceOutcome {
                        ranked_actions,
                        explanation: ranking.explanation,
                        strategy: RankingStrategy::Oracle,
                    };
                }
                warn!(request_id, "oracle ranking referenced no known nodes; using reading order");
                self.tracer
                    .log(&trace.with_outcome("reading_order").with_detail("no known node ids"));
            }
            Err(e) => {
                warn!(request_id, error = %e, "ranking oracle unavailable; using reading order");
                self.tracer
                    .log(&trace.with_outcome("reading_order").with_detail(&e));
            }
        }

        reading_order_outcome(candidates)
    }

    /// Generated fields, when the generator says they are required.
    fn generate_test_data(&self, request: &GuidanceRequest) -> Option<Vec<Value>> {
        let request_id = request.request_id.as_str();
        let data_request = DataGenerationRequest {
            document: &request.document,
            document_url: request.document_url.as_deref(),
            image: request.image.as_deref(),
            image_url: request.image_url.as_deref(),
            config: &request.config,
        };

        let started = Instant::now();
        let answer = self
            .data
            .generate(&data_request)
            .and_then(|response| interpret_data_generation_response(&response));
        let trace = TraceEvent::now(request_id, Stage::DataGeneration).with_elapsed(started.elapsed());

        match answer {
            Ok(Some(fields)) => {
                info!(request_id, fields = fields.len(), "test data generated");
                self.tracer.log(&trace.with_outcome("required"));
                Some(fields)
            }
            Ok(None) => {
                debug!(request_id, "test data not required");
                self.tracer.log(&trace.with_outcome("not_required"));
                None
            }
            Err(e) => {
                warn!(request_id, error = %e, "test data generator unavailable; no data attached");
                self.tracer
                    .log(&trace.with_outcome("unavailable").with_detail(&e));
                None
            }
        }
    }

    fn trace_completed(&self, request_id: &str, outcome: &GuidanceOutcome) {
        info!(
            request_id,
            strategy = ?outcome.strategy,
            actions = outcome.ranked_actions.len(),
            "guidance ready"
        );
        self.tracer.log(
            &TraceEvent::now(request_id, Stage::Completed)
                .with_outcome(format!("{:?}", outcome.strategy))
                .with_detail(format!("{} actions", outcome.ranked_actions.len())),
        );
    }
}

// ============================================================================
// Ordering
// ============================================================================

/// Actions for the oracle's ids, in the oracle's order. Unknown and repeated
/// ids are skipped and do not consume a rank.
pub fn rank_by_oracle(tree: &UiTree, node_ids: &[NodeId]) -> Vec<RankedAction> {
    let mut seen = HashSet::new();
    let mut ranked_actions = Vec::new();

    for &id in node_ids {
        let Some(node) = tree.node(id) else {
            debug!(node_id = id, "oracle referenced an unknown node");
            continue;
        };
        if !seen.insert(id) {
            continue;
        }
        let rank = ranked_actions.len() + 1;
        ranked_actions.push(RankedAction::from_candidate(&Candidate::from_node(node), rank));
    }

    ranked_actions
}

/// Stable sort by top edge, then left edge.
pub fn sort_reading_order(candidates: &mut [Candidate]) {
    candidates.sort_by_key(|c| c.bounds.reading_order_key());
}

pub fn reading_order_actions(mut candidates: Vec<Candidate>) -> Vec<RankedAction> {
    sort_reading_order(&mut candidates);
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| RankedAction::from_candidate(c, i + 1))
        .collect()
}

fn reading_order_outcome(candidates: Vec<Candidate>) -> GuidanceOutcome {
    if candidates.is_empty() {
        return GuidanceOutcome {
            ranked_actions: Vec::new(),
            explanation: NO_CANDIDATES_EXPLANATION.to_string(),
            strategy: RankingStrategy::NoCandidates,
        };
    }

    GuidanceOutcome {
        ranked_actions: reading_order_actions(candidates),
        explanation: READING_ORDER_EXPLANATION.to_string(),
        strategy: RankingStrategy::ReadingOrder,
    }
}
