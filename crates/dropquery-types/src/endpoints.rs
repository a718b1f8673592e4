//! Curated AI endpoint tables and URL classification.
//!
//! Endpoint matching is case-insensitive substring matching against the full
//! URL. Model attribution only looks at the host: a needle must equal one of
//! its `.`/`-` separated tokens, or be a domain suffix when it contains a dot.
//!
//! # Example
//!
//! ```
//! use dropquery_types::{ModelTag, endpoints};
//!
//! let hit = endpoints::classify_request(
//!     "https://chatgpt.com/backend-api/conversation",
//!     "POST",
//! );
//! assert_eq!(hit, Some(ModelTag::ChatGpt));
//!
//! // GET requests are never queries.
//! assert_eq!(
//!     endpoints::classify_request("https://api.openai.com/v1/chat/completions", "GET"),
//!     None,
//! );
//! ```

use crate::model::ModelTag;

/// A known AI API endpoint: host substring plus optional path substring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownEndpoint {
    pub host: &'static str,
    pub path: Option<&'static str>,
}

impl KnownEndpoint {
    const fn host(host: &'static str) -> Self {
        Self { host, path: None }
    }

    const fn at(host: &'static str, path: &'static str) -> Self {
        Self {
            host,
            path: Some(path),
        }
    }

    /// Whether the lowercased `url` hits this endpoint.
    #[must_use]
    pub fn matches(&self, url_lower: &str) -> bool {
        url_lower.contains(self.host) && self.path.is_none_or(|path| url_lower.contains(path))
    }
}

/// Chat completion APIs and conversation endpoints of well-known assistants.
pub const KNOWN_ENDPOINTS: &[KnownEndpoint] = &[
    KnownEndpoint::at("api.openai.com", "/v1/"),
    KnownEndpoint::at("chatgpt.com", "/backend-api/conversation"),
    KnownEndpoint::at("chatgpt.com", "/backend-anon/conversation"),
    KnownEndpoint::host("generativelanguage.googleapis.com"),
    KnownEndpoint::at("gemini.google.com", "streamgenerate"),
    KnownEndpoint::at("api.anthropic.com", "/v1/messages"),
    KnownEndpoint::at("claude.ai", "/completion"),
    KnownEndpoint::host("api.perplexity.ai"),
    KnownEndpoint::at("perplexity.ai", "perplexity_ask"),
    KnownEndpoint::at("copilot.microsoft.com", "/c/api/"),
    KnownEndpoint::host("api.cohere.ai"),
    KnownEndpoint::host("api-inference.huggingface.co"),
    KnownEndpoint::host("api.stability.ai"),
    KnownEndpoint::host("api.replicate.com"),
    KnownEndpoint::host("api.together.xyz"),
    KnownEndpoint::host("api.groq.com"),
    KnownEndpoint::host("api.mistral.ai"),
    KnownEndpoint::at("poe.com", "/api/gql_post"),
];

/// Generic AI API path shapes, used when no known endpoint matched.
pub const GENERIC_PATH_PATTERNS: &[&str] = &[
    "/api/chat",
    "/api/completion",
    "/api/generate",
    "/v1/chat/completions",
    "/v1/completions",
    "/v1/messages",
    "/v1/chat",
    "/v1/generate",
    "/backend-api/conversation",
    "/backend-anon/conversation",
    "/ai/",
    "/llm/",
    "/gpt/",
];

/// Priority-ordered host → model rules. First rule with a matching needle wins.
pub const MODEL_RULES: &[(&[&str], ModelTag)] = &[
    (&["openai", "chatgpt"], ModelTag::ChatGpt),
    (&["gemini", "bard", "google", "googleapis"], ModelTag::Gemini),
    (&["claude", "anthropic"], ModelTag::Claude),
    (&["perplexity"], ModelTag::Perplexity),
    (&["copilot", "microsoft"], ModelTag::Copilot),
    (&["cohere"], ModelTag::Cohere),
    (&["huggingface"], ModelTag::HuggingFace),
    (&["stability"], ModelTag::Stability),
    (&["replicate"], ModelTag::Replicate),
    (&["together"], ModelTag::Together),
    (&["groq"], ModelTag::Groq),
    (&["mistral"], ModelTag::Mistral),
    (&["character"], ModelTag::Character),
    (&["you.com"], ModelTag::You),
    (&["poe"], ModelTag::Poe),
];

/// Hosts whose pages are AI chat interfaces.
pub const KNOWN_AI_HOSTS: &[&str] = &[
    "chatgpt.com",
    "openai.com",
    "gemini.google.com",
    "bard.google.com",
    "ai.google.dev",
    "claude.ai",
    "anthropic.com",
    "perplexity.ai",
    "copilot.microsoft.com",
    "bing.com",
    "character.ai",
    "you.com",
    "poe.com",
    "cohere.com",
    "huggingface.co",
    "stability.ai",
    "replicate.com",
    "together.ai",
    "groq.com",
    "mistral.ai",
];

/// How a URL was recognized as an AI request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    KnownEndpoint,
    PathPattern,
}

/// Result of classifying a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointMatch {
    pub model: ModelTag,
    pub kind: MatchKind,
}

/// Host part of an absolute URL or bare host, without userinfo or port.
/// Relative paths have no host.
fn host_of(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(i) => &url[i + 3..],
        None if url.starts_with('/') => return "",
        None => url,
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let host = authority.rsplit('@').next().unwrap_or("");
    host.split(':').next().unwrap_or("")
}

fn host_matches(host: &str, needle: &str) -> bool {
    if needle.contains('.') {
        host == needle || host.strip_suffix(needle).is_some_and(|rest| rest.ends_with('.'))
    } else {
        host.split(['.', '-']).any(|token| token == needle)
    }
}

/// Infer the model from the host of a URL or from a bare host.
///
/// Unmatched input maps to [`ModelTag::AiService`].
#[must_use]
pub fn model_from_url(url: &str) -> ModelTag {
    let lower = url.to_lowercase();
    let host = host_of(&lower);
    MODEL_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| host_matches(host, needle)))
        .map_or(ModelTag::AiService, |(_, model)| *model)
}

/// Check a URL against the known-endpoint table, then the generic patterns.
///
/// Ignores the request method; see [`classify_request`].
#[must_use]
pub fn classify_url(url: &str) -> Option<EndpointMatch> {
    let lower = url.to_lowercase();
    let kind = if KNOWN_ENDPOINTS.iter().any(|ep| ep.matches(&lower)) {
        MatchKind::KnownEndpoint
    } else if GENERIC_PATH_PATTERNS.iter().any(|p| lower.contains(p)) {
        MatchKind::PathPattern
    } else {
        return None;
    };
    Some(EndpointMatch {
        model: model_from_url(&lower),
        kind,
    })
}

/// Whether `method` is one that can carry a prompt.
#[must_use]
pub fn is_post_like(method: &str) -> bool {
    method.trim().eq_ignore_ascii_case("POST")
}

/// Classify an outgoing request: `Some(model)` when it is a POST to an AI
/// endpoint.
#[must_use]
pub fn classify_request(url: &str, method: &str) -> Option<ModelTag> {
    if !is_post_like(method) {
        return None;
    }
    classify_url(url).map(|hit| hit.model)
}

/// Whether `host` belongs to a known AI chat service.
#[must_use]
pub fn is_known_ai_host(host: &str) -> bool {
    let lower = host.to_lowercase();
    KNOWN_AI_HOSTS.iter().any(|domain| lower.contains(domain))
}

/// Whether `host` is a search engine that may render AI answer panels.
///
/// Matches any `google.<tld>` host (except Google's AI chat hosts) and Bing.
#[must_use]
pub fn is_search_host(host: &str) -> bool {
    let lower = host.to_lowercase();
    let labels: Vec<&str> = lower.split('.').collect();
    if labels.iter().any(|label| *label == "bing") {
        return true;
    }
    labels.iter().any(|label| *label == "google")
        && !lower.starts_with("gemini.")
        && !lower.starts_with("bard.")
        && !lower.starts_with("ai.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chatgpt_conversation_endpoint() {
        let hit = classify_url("https://chatgpt.com/backend-api/conversation").unwrap();
        assert_eq!(hit.model, ModelTag::ChatGpt);
        assert_eq!(hit.kind, MatchKind::KnownEndpoint);
    }

    #[test]
    fn test_known_endpoint_requires_path_when_given() {
        // Static asset on a known host with a required path does not match
        assert_eq!(classify_url("https://claude.ai/static/app.js"), None);
        assert!(classify_url("https://claude.ai/api/organizations/1/chat_conversations/2/completion").is_some());
    }

    #[test]
    fn test_generic_path_pattern() {
        let hit = classify_url("https://example.org/api/chat").unwrap();
        assert_eq!(hit.kind, MatchKind::PathPattern);
        assert_eq!(hit.model, ModelTag::AiService);
    }

    #[test]
    fn test_path_pattern_uses_model_table() {
        let hit = classify_url("https://mistral-proxy.example/v1/chat/completions").unwrap();
        assert_eq!(hit.model, ModelTag::Mistral);
    }

    #[test]
    fn test_unrelated_url() {
        assert_eq!(classify_url("https://example.org/index.html"), None);
    }

    #[test]
    fn test_classify_request_requires_post() {
        let url = "https://api.anthropic.com/v1/messages";
        assert_eq!(classify_request(url, "POST"), Some(ModelTag::Claude));
        assert_eq!(classify_request(url, "post"), Some(ModelTag::Claude));
        assert_eq!(classify_request(url, "GET"), None);
    }

    #[test]
    fn test_model_priority_first_match_wins() {
        // "google" rule comes before "claude", so the google host wins
        assert_eq!(
            model_from_url("https://claude-mirror.google.com/x"),
            ModelTag::Gemini
        );
        assert_eq!(model_from_url("https://openai.anthropic.example"), ModelTag::ChatGpt);
        assert_eq!(
            model_from_url("https://generativelanguage.googleapis.com/v1beta"),
            ModelTag::Gemini
        );
        assert_eq!(model_from_url("https://api.together.xyz/v1"), ModelTag::Together);
        assert_eq!(model_from_url("https://you.com/search"), ModelTag::You);
        assert_eq!(model_from_url("https://example.org"), ModelTag::AiService);
    }

    #[test]
    fn test_model_ignores_path_and_query() {
        assert_eq!(
            model_from_url("https://shop.example.org/gemini?utm_source=google"),
            ModelTag::AiService
        );
        assert_eq!(model_from_url("/api/chat?model=claude"), ModelTag::AiService);
        assert_eq!(model_from_url("https://user@api.mistral.ai:443/v1"), ModelTag::Mistral);
    }

    #[test]
    fn test_model_needs_whole_host_token() {
        let hit = classify_url("https://poetry.example.org/api/chat").unwrap();
        assert_eq!(hit.model, ModelTag::AiService);
        assert_eq!(model_from_url("characterdesign.example"), ModelTag::AiService);
        assert_eq!(model_from_url("notyou.com"), ModelTag::AiService);
        assert_eq!(model_from_url("poe.com"), ModelTag::Poe);
        assert_eq!(model_from_url("www.you.com"), ModelTag::You);
        assert_eq!(model_from_url("beta.character.ai"), ModelTag::Character);
    }

    #[test]
    fn test_model_from_url_case_insensitive() {
        assert_eq!(model_from_url("HTTPS://API.OPENAI.COM"), ModelTag::ChatGpt);
    }

    #[test]
    fn test_known_ai_hosts() {
        assert!(is_known_ai_host("chatgpt.com"));
        assert!(is_known_ai_host("www.perplexity.ai"));
        assert!(is_known_ai_host("Claude.AI"));
        assert!(!is_known_ai_host("example.org"));
    }

    #[test]
    fn test_search_hosts() {
        assert!(is_search_host("www.google.com"));
        assert!(is_search_host("google.co.uk"));
        assert!(is_search_host("www.bing.com"));
        assert!(!is_search_host("gemini.google.com"));
        assert!(!is_search_host("example.org"));
    }
}
