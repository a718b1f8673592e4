//! Conversation-turn detection from inserted nodes.

use std::collections::BTreeSet;

use dropquery_types::endpoints::model_from_url;

use super::page::{NodeId, PageEvent, PageModel};
use super::selector::{RuleTable, Selector};
use super::{DetectError, Detection, Detector, DetectorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UserTurn;

fn rules() -> RuleTable<UserTurn> {
    RuleTable::new()
        .rule(
            Selector::any().attr_eq("data-message-author-role", "user"),
            UserTurn,
        )
        .rule(
            Selector::any()
                .attr_starts_with("data-testid", "conversation-turn")
                .attr_eq("data-turn", "user"),
            UserTurn,
        )
        .rule(
            Selector::any()
                .attr_starts_with("data-testid", "conversation-turn")
                .attr_contains("class", "user"),
            UserTurn,
        )
        .rule(Selector::any().attr_contains("class", "user-message"), UserTurn)
}

/// Fires once per inserted user turn.
///
/// A node is counted at most once per page, and a node nested inside an
/// already counted turn is not counted again.
#[derive(Debug, Clone)]
pub struct MutationDetector {
    rules: RuleTable<UserTurn>,
    seen: BTreeSet<NodeId>,
}

impl Default for MutationDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl MutationDetector {
    pub fn new() -> Self {
        Self {
            rules: rules(),
            seen: BTreeSet::new(),
        }
    }

    pub fn seen(&self) -> usize {
        self.seen.len()
    }
}

impl Detector for MutationDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Mutation
    }

    fn applies_to(&self, _host: &str) -> bool {
        true
    }

    fn observe(&mut self, event: &PageEvent, page: &PageModel) -> Result<Vec<Detection>, DetectError> {
        let PageEvent::NodesAdded { nodes } = event else {
            return Ok(Vec::new());
        };

        let model = model_from_url(page.host());
        let mut detections = Vec::new();
        for (id, _) in self.rules.scan(nodes, page) {
            let nested = page.ancestors(id).iter().any(|a| self.seen.contains(a));
            if self.seen.insert(id) && !nested {
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
    use dropquery_types::ModelTag;

    fn added(detector: &mut MutationDetector, page: &mut PageModel, nodes: Vec<ElementSnapshot>) -> usize {
        let event = PageEvent::NodesAdded { nodes };
        page.apply(&event).unwrap();
        detector.observe(&event, page).unwrap().len()
    }

    fn chatgpt_page() -> PageModel {
        let mut page = PageModel::new();
        page.apply(&PageEvent::Navigated {
            url: "https://chatgpt.com/c/abc".to_string(),
        })
        .unwrap();
        page
    }

    #[test]
    fn test_user_turn_signatures() {
        let mut detector = MutationDetector::new();
        let mut page = chatgpt_page();
        let count = added(
            &mut detector,
            &mut page,
            vec![
                ElementSnapshot::new(1, "div").attr("data-message-author-role", "user"),
                ElementSnapshot::new(2, "div").attr("data-message-author-role", "assistant"),
                ElementSnapshot::new(3, "article")
                    .attr("data-testid", "conversation-turn-4")
                    .attr("data-turn", "user"),
                ElementSnapshot::new(4, "div").attr("class", "msg user-message"),
            ],
        );
        assert_eq!(count, 3);
    }

    #[test]
    fn test_same_node_counted_once() {
        let mut detector = MutationDetector::new();
        let mut page = chatgpt_page();
        let turn = ElementSnapshot::new(1, "div").attr("data-message-author-role", "user");
        assert_eq!(added(&mut detector, &mut page, vec![turn.clone()]), 1);
        assert_eq!(added(&mut detector, &mut page, vec![turn]), 0);
        assert_eq!(detector.seen(), 1);
    }

    #[test]
    fn test_nested_turn_not_double_counted() {
        let mut detector = MutationDetector::new();
        let mut page = chatgpt_page();
        let count = added(
            &mut detector,
            &mut page,
            vec![
                ElementSnapshot::new(1, "article")
                    .attr("data-testid", "conversation-turn-1")
                    .attr("class", "turn user"),
                ElementSnapshot::new(2, "div")
                    .attr("data-message-author-role", "user")
                    .parent(1),
            ],
        );
        assert_eq!(count, 1);
    }

    #[test]
    fn test_model_from_host() {
        let mut detector = MutationDetector::new();
        let mut page = chatgpt_page();
        let event = PageEvent::NodesAdded {
            nodes: vec![ElementSnapshot::new(1, "div").attr("data-message-author-role", "user")],
        };
        page.apply(&event).unwrap();
        assert_eq!(
            detector.observe(&event, &page).unwrap(),
            vec![Detection::new(ModelTag::ChatGpt)]
        );
    }

    #[test]
    fn test_reset_forgets_seen_nodes() {
        let mut detector = MutationDetector::new();
        let mut page = chatgpt_page();
        let turn = ElementSnapshot::new(1, "div").attr("data-message-author-role", "user");
        added(&mut detector, &mut page, vec![turn.clone()]);
        detector.reset();
        assert_eq!(added(&mut detector, &mut page, vec![turn]), 1);
    }
}
