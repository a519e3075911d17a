use serde_json::{Map, Value};
use tracing::info;

use crate::candidate::filter::filter_candidates;
use crate::cli::config::{PrioritizeArgs, Settings};
use crate::collab::datagen::DataGenerator;
use crate::collab::http::HttpAgentClient;
use crate::collab::mock::Unconfigured;
use crate::collab::oracle::{OllamaOracle, RankingOracle};
use crate::collab::popup::PopupDetector;
use crate::guidance::error::GuidanceError;
use crate::guidance::guidance_model::{GuidanceRequest, GuidanceResponse, new_request_id};
use crate::guidance::orchestrator::Prioritizer;
use crate::input::loader::{is_remote, load_document, load_image, validate_base64};
use crate::trace::logger::TraceLogger;
use crate::tree::builder::build_tree;

// ============================================================================
// prioritize subcommand
// ============================================================================

pub fn cmd_prioritize(
    args: &PrioritizeArgs,
    settings: &Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = build_request(args)?;
    let prioritizer = build_prioritizer(settings)?;

    let outcome = prioritizer.seek_guidance(&request)?;
    let response = GuidanceResponse::success(&request.request_id, outcome);
    let output_content = serde_json::to_string_pretty(&response).map_err(|source| {
        GuidanceError::Json {
            context: "serializing response".to_string(),
            source,
        }
    })?;

    match args.output.as_deref() {
        Some(path) => {
            std::fs::write(path, &output_content).map_err(|source| GuidanceError::Io {
                context: format!("writing {}", path),
                source,
            })?;
            info!(request_id = %request.request_id, path, "response written");
        }
        None => println!("{}", output_content),
    }

    Ok(())
}

/// Assemble a `GuidanceRequest` from CLI arguments, loading every referenced file.
pub fn build_request(args: &PrioritizeArgs) -> Result<GuidanceRequest, GuidanceError> {
    let request_id = args.request_id.clone().unwrap_or_else(new_request_id);
    info!(request_id = %request_id, "request processing starts");

    let xml = args.xml.as_deref().ok_or(GuidanceError::MissingDocument)?;
    let document = load_document(xml)?;

    let image = match (&args.image_base64, &args.image) {
        (Some(inline), _) => {
            validate_base64(inline)?;
            Some(inline.trim().to_string())
        }
        (None, Some(location)) => load_image(&request_id, location),
        (None, None) => None,
    };

    let history = match args.history.as_deref() {
        Some(path) => read_json::<Vec<Value>>(path)?,
        None => Vec::new(),
    };

    let config = match args.config_data.as_deref() {
        Some(path) => read_json::<Map<String, Value>>(path)?,
        None => Map::new(),
    };

    Ok(GuidanceRequest {
        request_id,
        document,
        document_url: Some(xml.to_string()).filter(|x| is_remote(x)),
        image,
        image_url: args.image.clone().filter(|x| is_remote(x)),
        user_prompt: args.user_prompt.clone(),
        history,
        config,
    })
}

// ============================================================================
// tree subcommand
// ============================================================================

pub fn cmd_tree(xml: &str, candidates_only: bool) -> Result<(), Box<dyn std::error::Error>> {
    let document = load_document(xml)?;
    let tree = build_tree(&document)?;

    let json_error = |source: serde_json::Error| GuidanceError::Json {
        context: "serializing tree".to_string(),
        source,
    };
    let output_content = if candidates_only {
        let candidates = filter_candidates(&tree, tree.nodes());
        serde_json::to_string_pretty(&candidates).map_err(json_error)?
    } else {
        serde_json::to_string_pretty(&tree).map_err(json_error)?
    };

    println!("{}", output_content);
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Wire collaborators from resolved settings. Anything without an endpoint
/// is left unconfigured and degrades at request time.
pub fn build_prioritizer(settings: &Settings) -> Result<Prioritizer, Box<dyn std::error::Error>> {
    let popup: Box<dyn PopupDetector> = match settings.popup_url.as_deref() {
        Some(url) => Box::new(HttpAgentClient::new(url, settings.collaborator_timeout)?),
        None => Box::new(Unconfigured::new("popup detector")),
    };

    let data: Box<dyn DataGenerator> = match settings.data_generator_url.as_deref() {
        Some(url) => Box::new(HttpAgentClient::new(url, settings.collaborator_timeout)?),
        None => Box::new(Unconfigured::new("test data generator")),
    };

    let oracle: Box<dyn RankingOracle> = match settings.oracle_backend.as_str() {
        "none" => Box::new(Unconfigured::new("ranking oracle")),
        _ => Box::new(OllamaOracle::new(
            &settings.ollama_endpoint,
            &settings.ollama_model,
            settings.oracle_timeout,
        )),
    };

    let tracer = match settings.trace_path.as_deref() {
        Some(path) => TraceLogger::new(path),
        None => TraceLogger::disabled(),
    };

    Ok(Prioritizer::new(popup, oracle, data).with_tracer(tracer))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, GuidanceError> {
    let content = std::fs::read_to_string(path).map_err(|source| GuidanceError::Io {
        context: format!("reading {}", path),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| GuidanceError::Json {
        context: format!("parsing {}", path),
        source,
    })
}
