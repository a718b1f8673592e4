//! WebAssembly bindings for the DropQuery browser extension.
//!
//! Exposes the pieces the extension's JavaScript calls directly: volume
//! formatting, request classification, the prompt heuristic, the per-model
//! volume table and the throttle gate.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use dropquery_types::endpoints::{MatchKind, classify_url, is_post_like, model_from_url};
use dropquery_types::lexical;
use dropquery_types::{DisplayUnit, ModelTag, ParseError, ThrottleGate, VolumeEstimates};

/// Initialize the WASM module (called automatically)
#[wasm_bindgen(start)]
pub fn init() {
    log("DropQuery WASM module initialized");
}

/// Log a message to the browser console
#[wasm_bindgen]
pub fn log(message: &str) {
    web_sys::console::log_1(&message.into());
}

fn parse_unit(unit: &str) -> Result<DisplayUnit, ParseError> {
    unit.parse()
}

/// Format a volume in ml for display, e.g. `formatVolume(1500, "ml")` is
/// `"1.5 L"`.
#[wasm_bindgen(js_name = formatVolume)]
pub fn format_volume(volume_ml: f64, unit: &str) -> Result<String, JsError> {
    let unit = parse_unit(unit).map_err(|e| JsError::new(&e.to_string()))?;
    Ok(dropquery_types::format_volume(volume_ml, unit))
}

/// The unit after `unit` in the ml → gallons → ounces cycle.
#[wasm_bindgen(js_name = nextUnit)]
pub fn next_unit(unit: &str) -> Result<String, JsError> {
    let unit = parse_unit(unit).map_err(|e| JsError::new(&e.to_string()))?;
    Ok(unit.next().as_str().to_string())
}

/// Model tag for a counted request, or `undefined`.
#[wasm_bindgen(js_name = classifyRequest)]
pub fn classify_request(url: &str, method: &str) -> Option<String> {
    dropquery_types::endpoints::classify_request(url, method).map(|model| model.as_str().to_string())
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Classification {
    counted: bool,
    model: Option<ModelTag>,
    matched_by: Option<&'static str>,
}

fn classification(url: &str, method: &str) -> Classification {
    let hit = classify_url(url);
    Classification {
        counted: hit.is_some() && is_post_like(method),
        model: hit.map(|h| h.model),
        matched_by: hit.map(|h| match h.kind {
            MatchKind::KnownEndpoint => "known-endpoint",
            MatchKind::PathPattern => "path-pattern",
        }),
    }
}

/// Full classification as JSON: `{counted, model, matchedBy}`.
#[wasm_bindgen(js_name = explainRequest)]
pub fn explain_request(url: &str, method: &str) -> Result<String, JsError> {
    serde_json::to_string(&classification(url, method)).map_err(|e| JsError::new(&e.to_string()))
}

/// Model tag inferred from a URL or host; `"ai-service"` when unknown.
#[wasm_bindgen(js_name = modelFromUrl)]
pub fn model_from_url_js(url: &str) -> String {
    model_from_url(url).as_str().to_string()
}

/// Whether typed text looks like a prompt to an assistant.
#[wasm_bindgen(js_name = isLikelyAiQuery)]
pub fn is_likely_ai_query(text: &str, page_has_chat_marker: bool) -> bool {
    lexical::is_likely_ai_query(text, page_has_chat_marker)
}

/// Estimated ml for one query to `model`. Unknown names use the default.
#[wasm_bindgen(js_name = estimateVolume)]
pub fn estimate_volume(model: &str) -> f64 {
    VolumeEstimates::default().estimate(ModelTag::parse_lenient(model))
}

/// The full default estimate table as JSON.
#[wasm_bindgen(js_name = volumeTable)]
pub fn volume_table() -> Result<String, JsError> {
    serde_json::to_string(&VolumeEstimates::default()).map_err(|e| JsError::new(&e.to_string()))
}

/// Collapses near-simultaneous detections into one.
#[wasm_bindgen]
pub struct Throttle {
    gate: ThrottleGate,
}

#[wasm_bindgen]
impl Throttle {
    /// Gate with a window in ms; the default window when omitted.
    #[wasm_bindgen(constructor)]
    pub fn new(window_ms: Option<u32>) -> Throttle {
        let gate = match window_ms {
            Some(ms) => ThrottleGate::with_window_ms(u64::from(ms)),
            None => ThrottleGate::default(),
        };
        Throttle { gate }
    }

    /// Admit a detection at `timestamp_ms` (epoch ms).
    pub fn admit(&mut self, timestamp_ms: f64) -> bool {
        self.gate.admit(to_ms(timestamp_ms))
    }

    /// Admit a detection happening now.
    #[wasm_bindgen(js_name = admitNow)]
    pub fn admit_now(&mut self) -> bool {
        self.admit(js_sys::Date::now())
    }

    pub fn reset(&mut self) {
        self.gate.reset();
    }

    #[wasm_bindgen(getter, js_name = windowMs)]
    pub fn window_ms(&self) -> f64 {
        self.gate.window().as_millis() as f64
    }
}

fn to_ms(timestamp_ms: f64) -> u64 {
    if timestamp_ms.is_finite() && timestamp_ms > 0.0 {
        timestamp_ms as u64
    } else {
        0
    }
}
