mod common;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use action_prioritizer::{
    Prioritizer,
    candidate::candidate_model::Candidate,
    collab::mock::{MockDataGenerator, MockOracle, MockPopupDetector, Unconfigured},
    guidance::{
        error::GuidanceError,
        guidance_model::{GuidanceResponse, RankingStrategy},
        orchestrator::{
            NO_CANDIDATES_EXPLANATION, POPUP_EXPLANATION, READING_ORDER_EXPLANATION,
            rank_by_oracle, reading_order_actions, sort_reading_order,
        },
    },
    trace::{logger::TraceLogger, trace::document_fingerprint},
    tree::{bounds::Bounds, builder::build_tree},
};
use common::fixtures::{
    CountingDataGenerator, CountingOracle, RecordingOracle, leaf, login_screen, request, screen,
};
use serde_json::{Value, json};

fn node_ids(outcome: &action_prioritizer::GuidanceOutcome) -> Vec<Option<usize>> {
    outcome.ranked_actions.iter().map(|a| a.node_id).collect()
}

fn ranks(outcome: &action_prioritizer::GuidanceOutcome) -> Vec<usize> {
    outcome.ranked_actions.iter().map(|a| a.rank).collect()
}

fn prioritizer(oracle_answer: Option<&str>) -> Prioritizer {
    let oracle = match oracle_answer {
        Some(answer) => MockOracle::answering(answer),
        None => MockOracle::unavailable(),
    };
    Prioritizer::new(
        Box::new(MockPopupDetector::clear()),
        Box::new(oracle),
        Box::new(MockDataGenerator::not_required()),
    )
}

// =========================================================================
// Popup gate
// =========================================================================

#[test]
fn popup_short_circuits_ranking_and_data_generation() {
    let (oracle, oracle_calls) = CountingOracle::new(Some(r#"{"ranked_actions": [6]}"#));
    let (data, data_calls) = CountingDataGenerator::new(json!({
        "status": "success",
        "agent_response": { "data_generation_required": true, "fields": [] }
    }));
    let prioritizer = Prioritizer::new(
        Box::new(MockPopupDetector::detected(json!({
            "text": "Close",
            "resource-id": "com.app:id/dismiss",
            "bounds": "[900,100][1000,200]"
        }))),
        Box::new(oracle),
        Box::new(data),
    );

    let outcome = prioritizer.seek_guidance(&request(&login_screen())).unwrap();

    assert_eq!(outcome.strategy, RankingStrategy::Popup);
    assert_eq!(outcome.explanation, POPUP_EXPLANATION);
    assert_eq!(outcome.ranked_actions.len(), 1);
    assert_eq!(outcome.ranked_actions[0].rank, 1);
    assert_eq!(outcome.ranked_actions[0].description, "Close");
    assert_eq!(outcome.ranked_actions[0].bounds, Bounds::new(900, 100, 1000, 200));
    assert_eq!(oracle_calls.load(Ordering::SeqCst), 0, "oracle not consulted");
    assert_eq!(data_calls.load(Ordering::SeqCst), 0, "generator not consulted");
}

#[test]
fn failed_popup_check_does_not_block_ranking() {
    let prioritizer = Prioritizer::new(
        Box::new(Unconfigured::new("popup detector")),
        Box::new(MockOracle::answering(r#"{"ranked_actions": [6, 3]}"#)),
        Box::new(MockDataGenerator::not_required()),
    );

    let outcome = prioritizer.seek_guidance(&request(&login_screen())).unwrap();

    assert_eq!(outcome.strategy, RankingStrategy::Oracle);
    assert_eq!(node_ids(&outcome), vec![Some(6), Some(3)]);
}

#[test]
fn popup_answer_without_element_is_ignored() {
    let prioritizer = Prioritizer::new(
        Box::new(MockPopupDetector {
            response: json!({ "status": "success", "agent_response": { "popup_detection": true } }),
        }),
        Box::new(MockOracle::unavailable()),
        Box::new(MockDataGenerator::not_required()),
    );

    let outcome = prioritizer.seek_guidance(&request(&login_screen())).unwrap();
    assert_eq!(outcome.strategy, RankingStrategy::ReadingOrder);
}

// =========================================================================
// Oracle ranking
// =========================================================================

#[test]
fn oracle_order_is_followed_and_unknown_ids_skipped() {
    let prioritizer = prioritizer(Some(
        r#"{"ranked_actions": [7, 3, 99], "explanation": "Recover the password first."}"#,
    ));

    let outcome = prioritizer.seek_guidance(&request(&login_screen())).unwrap();

    assert_eq!(outcome.strategy, RankingStrategy::Oracle);
    assert_eq!(node_ids(&outcome), vec![Some(7), Some(3)]);
    assert_eq!(ranks(&outcome), vec![1, 2], "unknown id does not consume a rank");
    assert_eq!(outcome.explanation, "Recover the password first.");
    assert_eq!(outcome.ranked_actions[0].description, "Forgot password?");
}

#[test]
fn duplicate_oracle_ids_are_ranked_once() {
    let tree = build_tree(&login_screen()).unwrap();
    let ranked = rank_by_oracle(&tree, &[4, 4, 3, 4]);

    let ids: Vec<Option<usize>> = ranked.iter().map(|a| a.node_id).collect();
    assert_eq!(ids, vec![Some(4), Some(3)]);
    assert_eq!(ranked[1].rank, 2);
}

#[test]
fn fenced_oracle_answer_is_accepted() {
    let prioritizer = prioritizer(Some("```json\n{\"ranked_actions\": [\"6\"], \"explanation\": \"log in\"}\n```"));

    let outcome = prioritizer.seek_guidance(&request(&login_screen())).unwrap();

    assert_eq!(outcome.strategy, RankingStrategy::Oracle);
    assert_eq!(node_ids(&outcome), vec![Some(6)]);
}

#[test]
fn oracle_only_sees_candidates() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let prioritizer = Prioritizer::new(
        Box::new(MockPopupDetector::clear()),
        Box::new(RecordingOracle {
            seen: seen.clone(),
            response: r#"{"ranked_actions": [3]}"#.to_string(),
        }),
        Box::new(MockDataGenerator::not_required()),
    );

    prioritizer.seek_guidance(&request(&login_screen())).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![3, 4, 5, 6, 7]);
}

// =========================================================================
// Reading-order fallback
// =========================================================================

#[test]
fn unavailable_oracle_falls_back_to_reading_order() {
    let outcome = prioritizer(None)
        .seek_guidance(&request(&login_screen()))
        .unwrap();

    assert_eq!(outcome.strategy, RankingStrategy::ReadingOrder);
    assert_eq!(outcome.explanation, READING_ORDER_EXPLANATION);
    assert_eq!(
        node_ids(&outcome),
        vec![Some(3), Some(4), Some(5), Some(6), Some(7)]
    );
    assert_eq!(ranks(&outcome), vec![1, 2, 3, 4, 5]);
}

#[test]
fn malformed_oracle_answers_fall_back_to_reading_order() {
    for answer in [
        "Press the login button.",
        r#"{"explanation": "no list"}"#,
        r#"{"ranked_actions": [42, 99]}"#,
        r#"{"ranked_actions": []}"#,
    ] {
        let outcome = prioritizer(Some(answer))
            .seek_guidance(&request(&login_screen()))
            .unwrap();
        assert_eq!(
            outcome.strategy,
            RankingStrategy::ReadingOrder,
            "answer {:?}",
            answer
        );
        assert_eq!(outcome.ranked_actions.len(), 5);
    }
}

#[test]
fn ranking_of_only_unknown_ids_uses_reading_order() {
    let outcome = prioritizer(Some(r#"{"ranked_actions": [42, 99], "explanation": "ghosts"}"#))
        .seek_guidance(&request(&login_screen()))
        .unwrap();

    assert_eq!(outcome.strategy, RankingStrategy::ReadingOrder);
    assert_eq!(outcome.explanation, READING_ORDER_EXPLANATION);
    assert_eq!(ranks(&outcome), vec![1, 2, 3, 4, 5]);
}

#[test]
fn offline_prioritizer_uses_reading_order() {
    let outcome = Prioritizer::offline()
        .seek_guidance(&request(&login_screen()))
        .unwrap();

    assert_eq!(outcome.strategy, RankingStrategy::ReadingOrder);
    assert!(outcome.ranked_actions.iter().all(|a| a.generated_data.is_none()));
}

#[test]
fn reading_order_is_top_then_left() {
    let document = screen(&[
        leaf("android.widget.Button", "bottom", "[0,500][10,510]"),
        leaf("android.widget.Button", "top right", "[300,100][310,110]"),
        leaf("android.widget.Button", "top left", "[0,100][10,110]"),
        leaf("android.widget.Button", "middle", "[50,300][60,310]"),
    ]);
    let tree = build_tree(&document).unwrap();
    let candidates: Vec<Candidate> = tree.nodes()[1..].iter().map(Candidate::from_node).collect();

    let actions = reading_order_actions(candidates);
    let descriptions: Vec<&str> = actions.iter().map(|a| a.description.as_str()).collect();

    assert_eq!(descriptions, vec!["top left", "top right", "middle", "bottom"]);
    assert_eq!(actions.iter().map(|a| a.rank).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
}

#[test]
fn reading_order_sort_is_stable_and_idempotent() {
    let document = screen(&[
        leaf("android.widget.Button", "first", "[0,100][10,110]"),
        leaf("android.widget.Button", "second", "[0,100][10,110]"),
        leaf("android.widget.Button", "above", "[0,0][10,10]"),
    ]);
    let tree = build_tree(&document).unwrap();
    let mut candidates: Vec<Candidate> =
        tree.nodes()[1..].iter().map(Candidate::from_node).collect();

    sort_reading_order(&mut candidates);
    let once: Vec<usize> = candidates.iter().map(|c| c.node_id).collect();
    sort_reading_order(&mut candidates);
    let twice: Vec<usize> = candidates.iter().map(|c| c.node_id).collect();

    assert_eq!(once, vec![3, 1, 2], "equal positions keep document order");
    assert_eq!(once, twice);
}

// =========================================================================
// No candidates
// =========================================================================

#[test]
fn screen_without_candidates_skips_the_oracle() {
    let (oracle, oracle_calls) = CountingOracle::new(Some(r#"{"ranked_actions": [1]}"#));
    let prioritizer = Prioritizer::new(
        Box::new(MockPopupDetector::clear()),
        Box::new(oracle),
        Box::new(MockDataGenerator::not_required()),
    );
    let document = r#"<hierarchy><android.widget.TextView text="Loading" /></hierarchy>"#;

    let outcome = prioritizer.seek_guidance(&request(document)).unwrap();

    assert_eq!(outcome.strategy, RankingStrategy::NoCandidates);
    assert_eq!(outcome.explanation, NO_CANDIDATES_EXPLANATION);
    assert!(outcome.ranked_actions.is_empty());
    assert_eq!(oracle_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn malformed_document_is_an_error() {
    let result = prioritizer(None).seek_guidance(&request("<hierarchy><oops></hierarchy>"));
    assert!(matches!(result, Err(GuidanceError::Parse(_))));
}

// =========================================================================
// Test data
// =========================================================================

#[test]
fn generated_data_is_attached_by_bounds() {
    let prioritizer = Prioritizer::new(
        Box::new(MockPopupDetector::clear()),
        Box::new(MockOracle::answering(r#"{"ranked_actions": [3, 4, 6]}"#)),
        Box::new(MockDataGenerator::with_fields(json!([
            { "metadata": { "bounds": "[40,400][1040,520]" }, "value": "qa.user@example.com" },
            { "metadata": { "bounds": "[40,560][1040,680]" }, "value": "S3cret!pass" }
        ]))),
    );

    let outcome = prioritizer.seek_guidance(&request(&login_screen())).unwrap();

    assert_eq!(outcome.strategy, RankingStrategy::Oracle);
    assert_eq!(
        outcome.ranked_actions[0].generated_data,
        Some(json!({ "value": "qa.user@example.com" }))
    );
    assert_eq!(
        outcome.ranked_actions[1].generated_data,
        Some(json!({ "value": "S3cret!pass" }))
    );
    assert_eq!(outcome.ranked_actions[2].generated_data, None, "Login has no data");
}

#[test]
fn generator_failure_only_drops_generated_data() {
    let with_data = Prioritizer::new(
        Box::new(MockPopupDetector::clear()),
        Box::new(MockOracle::answering(r#"{"ranked_actions": [3, 4]}"#)),
        Box::new(Unconfigured::new("test data generator")),
    );
    let outcome = with_data.seek_guidance(&request(&login_screen())).unwrap();

    assert_eq!(outcome.strategy, RankingStrategy::Oracle);
    assert_eq!(node_ids(&outcome), vec![Some(3), Some(4)]);
    assert!(outcome.ranked_actions.iter().all(|a| a.generated_data.is_none()));
}

#[test]
fn generator_runs_alongside_ranking() {
    let (data, data_calls) = CountingDataGenerator::new(json!({
        "status": "success",
        "agent_response": { "data_generation_required": false }
    }));
    let prioritizer = Prioritizer::new(
        Box::new(MockPopupDetector::clear()),
        Box::new(MockOracle::unavailable()),
        Box::new(data),
    );

    prioritizer.seek_guidance(&request(&login_screen())).unwrap();
    assert_eq!(data_calls.load(Ordering::SeqCst), 1);
}

// =========================================================================
// Response envelope and trace
// =========================================================================

#[test]
fn response_envelope_shape() {
    let outcome = prioritizer(Some(r#"{"ranked_actions": [6], "explanation": "log in"}"#))
        .seek_guidance(&request(&login_screen()))
        .unwrap();
    let response = GuidanceResponse::success("abc", outcome);
    let value = serde_json::to_value(&response).unwrap();

    assert_eq!(value["request_id"], json!("abc"));
    assert_eq!(value["status"], json!("success"));
    assert_eq!(value["agent_response"]["explanation"], json!("log in"));
    let first = &value["agent_response"]["ranked_actions"][0];
    assert_eq!(first["node_id"], json!(6));
    assert_eq!(first["rank"], json!(1));
    assert_eq!(first["bounds"]["top"], json!(860));
    assert!(first.get("generated_data").is_none(), "absent data is omitted");
}

#[test]
fn trace_file_records_each_stage() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let path = file.path().to_str().unwrap().to_string();
    let document = login_screen();

    let tracer = TraceLogger::new(&path);
    assert!(tracer.is_enabled());
    let outcome = prioritizer(None)
        .with_tracer(tracer)
        .seek_guidance(&request(&document))
        .unwrap();
    assert_eq!(outcome.strategy, RankingStrategy::ReadingOrder);

    let content = std::fs::read_to_string(&path).unwrap();
    let events: Vec<Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let stages: Vec<&str> = events.iter().filter_map(|e| e["stage"].as_str()).collect();

    assert_eq!(stages.first(), Some(&"tree_built"));
    assert_eq!(stages.get(1), Some(&"popup_check"));
    assert!(stages.contains(&"ranking"));
    assert!(stages.contains(&"data_generation"));
    assert_eq!(stages.last(), Some(&"completed"));
    assert!(events.iter().all(|e| e["request_id"] == json!("test-request")));
    assert_eq!(
        events[0]["document_fingerprint"],
        json!(document_fingerprint(&document))
    );
    assert_eq!(document_fingerprint(&document).len(), 40);
}
