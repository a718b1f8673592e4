//! Classify command implementation.

use anyhow::Result;
use serde::Serialize;

use dropquery_types::ModelTag;
use dropquery_types::endpoints::{MatchKind, classify_url, is_post_like};

use crate::cli::OutputFormat;
use crate::format::to_json;
use crate::util::write_output;

#[derive(Debug, Serialize, PartialEq)]
struct Classification {
    url: String,
    method: String,
    counted: bool,
    model: Option<ModelTag>,
    matched_by: Option<&'static str>,
}

fn classify(url: &str, method: &str) -> Classification {
    let hit = classify_url(url);
    Classification {
        url: url.to_string(),
        method: method.to_uppercase(),
        counted: hit.is_some() && is_post_like(method),
        model: hit.map(|h| h.model),
        matched_by: hit.map(|h| match h.kind {
            MatchKind::KnownEndpoint => "known-endpoint",
            MatchKind::PathPattern => "path-pattern",
        }),
    }
}

pub fn cmd_classify(url: &str, method: &str, format: OutputFormat) -> Result<()> {
    let result = classify(url, method);
    let content = match format {
        OutputFormat::Json => to_json(&result)?,
        OutputFormat::Text | OutputFormat::Csv => match (result.model, result.matched_by) {
            (Some(model), Some(kind)) if result.counted => {
                format!("counted: {} ({})\n", model, kind)
            }
            (Some(model), Some(kind)) => format!(
                "not counted: {} request to {} endpoint ({})\n",
                result.method, model, kind
            ),
            _ => "not counted: not an AI endpoint\n".to_string(),
        },
    };
    write_output(None, &content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_endpoint_post() {
        let result = classify("https://chatgpt.com/backend-api/conversation", "post");
        assert!(result.counted);
        assert_eq!(result.model, Some(ModelTag::ChatGpt));
        assert_eq!(result.matched_by, Some("known-endpoint"));
        assert_eq!(result.method, "POST");
    }

    #[test]
    fn test_get_is_not_counted() {
        let result = classify("https://chatgpt.com/backend-api/conversation", "GET");
        assert!(!result.counted);
        assert_eq!(result.model, Some(ModelTag::ChatGpt));
    }

    #[test]
    fn test_unrelated_url() {
        let result = classify("https://example.org/index.html", "POST");
        assert!(!result.counted);
        assert_eq!(result.model, None);
        assert_eq!(result.matched_by, None);
    }
}
