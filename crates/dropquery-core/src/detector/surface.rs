//! AI answer panels on search result pages.

use std::collections::BTreeSet;

use dropquery_types::ModelTag;
use dropquery_types::endpoints::{is_search_host, model_from_url};

use super::page::{NodeId, PageEvent, PageModel};
use super::selector::{RuleTable, Selector};
use super::{DetectError, Detection, Detector, DetectorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AnswerPanel;

fn rules() -> RuleTable<AnswerPanel> {
    RuleTable::new()
        .rule(Selector::any().text_contains("ai overview"), AnswerPanel)
        .rule(Selector::any().attr_contains("aria-label", "ai overview"), AnswerPanel)
        .rule(Selector::any().attr_contains("data-attrid", "ai_overview"), AnswerPanel)
        .rule(Selector::tag("cib-serp"), AnswerPanel)
        .rule(Selector::any().attr_contains("class", "b_copilot"), AnswerPanel)
        .rule(Selector::any().attr_contains("data-tag", "copilot-answer"), AnswerPanel)
}

/// Fires once per AI answer panel inserted into a search page.
#[derive(Debug, Clone)]
pub struct SurfaceDetector {
    rules: RuleTable<AnswerPanel>,
    seen: BTreeSet<NodeId>,
}

impl Default for SurfaceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceDetector {
    pub fn new() -> Self {
        Self {
            rules: rules(),
            seen: BTreeSet::new(),
        }
    }

    fn model(host: &str) -> ModelTag {
        if host.split('.').any(|label| label == "bing") {
            ModelTag::Copilot
        } else {
            model_from_url(host)
        }
    }
}

impl Detector for SurfaceDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Surface
    }

    fn applies_to(&self, host: &str) -> bool {
        is_search_host(host)
    }

    fn observe(&mut self, event: &PageEvent, page: &PageModel) -> Result<Vec<Detection>, DetectError> {
        let PageEvent::NodesAdded { nodes } = event else {
            return Ok(Vec::new());
        };

        let model = Self::model(page.host());
        let mut detections = Vec::new();
        for (id, _) in self.rules.scan(nodes, page) {
            let inside_seen = page.ancestors(id).iter().any(|a| self.seen.contains(a));
            if inside_seen {
                continue;
            }
            if self.seen.insert(id) {
                detections.push(Detection::new(model));
            }
        }
        Ok(detections)
    }

    fn reset(&mut self) {
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::page::ElementSnapshot;

    fn observe(detector: &mut SurfaceDetector, page: &mut PageModel, nodes: Vec<ElementSnapshot>) -> Vec<Detection> {
        let event = PageEvent::NodesAdded { nodes };
        page.apply(&event).unwrap();
        detector.observe(&event, page).unwrap()
    }

    fn page_at(url: &str) -> PageModel {
        let mut page = PageModel::new();
        page.apply(&PageEvent::Navigated {
            url: url.to_string(),
        })
        .unwrap();
        page
    }

    #[test]
    fn test_search_hosts_only() {
        let detector = SurfaceDetector::new();
        assert!(detector.applies_to("www.google.com"));
        assert!(detector.applies_to("www.google.co.uk"));
        assert!(detector.applies_to("www.bing.com"));
        assert!(!detector.applies_to("gemini.google.com"));
        assert!(!detector.applies_to("example.org"));
    }

    #[test]
    fn test_google_ai_overview() {
        let mut detector = SurfaceDetector::new();
        let mut page = page_at("https://www.google.com/search?q=rust");
        let detections = observe(
            &mut detector,
            &mut page,
            vec![
                ElementSnapshot::new(1, "div").attr("data-attrid", "SrpGenSum ai_overview"),
                ElementSnapshot::new(2, "h2").text("AI Overview").parent(1),
            ],
        );
        assert_eq!(detections, vec![Detection::new(ModelTag::Gemini)]);
    }

    #[test]
    fn test_bing_copilot_answer() {
        let mut detector = SurfaceDetector::new();
        let mut page = page_at("https://www.bing.com/search?q=rust");
        let detections = observe(
            &mut detector,
            &mut page,
            vec![ElementSnapshot::new(1, "div").attr("class", "b_copilot_answer")],
        );
        assert_eq!(detections, vec![Detection::new(ModelTag::Copilot)]);
    }

    #[test]
    fn test_panel_counted_once() {
        let mut detector = SurfaceDetector::new();
        let mut page = page_at("https://www.google.com/search?q=rust");
        let panel = ElementSnapshot::new(1, "div").attr("aria-label", "AI Overview");
        assert_eq!(observe(&mut detector, &mut page, vec![panel.clone()]).len(), 1);
        assert!(observe(&mut detector, &mut page, vec![panel]).is_empty());
    }

    #[test]
    fn test_plain_results_ignored() {
        let mut detector = SurfaceDetector::new();
        let mut page = page_at("https://www.google.com/search?q=rust");
        let detections = observe(
            &mut detector,
            &mut page,
            vec![ElementSnapshot::new(1, "div").attr("class", "g").text("The Rust book")],
        );
        assert!(detections.is_empty());
    }
}
