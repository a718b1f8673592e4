//! DOM heuristics for sites not known to host an AI chat.
//!
//! Only inputs inserted after navigation are tracked: embedded chat widgets
//! mount late, while search boxes and login forms are usually present from
//! the start.

use std::collections::BTreeSet;

use dropquery_types::endpoints::{is_known_ai_host, is_search_host, model_from_url};
use dropquery_types::lexical::is_likely_ai_query;

use super::page::{NodeId, PageEvent, PageModel};
use super::selector::{RuleTable, Selector};
use super::{DetectError, Detection, Detector, DetectorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChatInput;

fn rules() -> RuleTable<ChatInput> {
    let mut table = RuleTable::new();
    for word in ["message", "chat", "ask", "prompt"] {
        table = table.rule(Selector::any().attr_contains("placeholder", word), ChatInput);
    }
    table
        .rule(
            Selector::any()
                .attr_eq("contenteditable", "true")
                .attr_eq("role", "textbox"),
            ChatInput,
        )
        .rule(Selector::any().attr_contains("class", "chat-input"), ChatInput)
        .rule(Selector::any().attr_contains("class", "message-input"), ChatInput)
}

/// Fires on Enter (without Shift) or form submit from a tracked input when
/// the text passes the lexical classifier.
#[derive(Debug, Clone)]
pub struct GenericDomDetector {
    rules: RuleTable<ChatInput>,
    tracked: BTreeSet<NodeId>,
}

impl Default for GenericDomDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl GenericDomDetector {
    pub fn new() -> Self {
        Self {
            rules: rules(),
            tracked: BTreeSet::new(),
        }
    }

    pub fn tracked(&self) -> &BTreeSet<NodeId> {
        &self.tracked
    }

    fn qualifies(page: &PageModel, id: NodeId) -> bool {
        let text = page.text_of(id).trim();
        !text.is_empty() && is_likely_ai_query(text, page.has_chat_marker())
    }
}

impl Detector for GenericDomDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::GenericDom
    }

    fn applies_to(&self, host: &str) -> bool {
        !is_known_ai_host(host) && !is_search_host(host)
    }

    fn observe(&mut self, event: &PageEvent, page: &PageModel) -> Result<Vec<Detection>, DetectError> {
        let fired = match event {
            PageEvent::NodesAdded { nodes } => {
                self.tracked
                    .extend(self.rules.scan(nodes, page).into_iter().map(|(id, _)| id));
                false
            }
            PageEvent::NodesRemoved { ids } => {
                for id in ids {
                    self.tracked.remove(id);
                }
                false
            }
            PageEvent::KeyDown { target, key, shift } => {
                key == "Enter" && !*shift && self.tracked.contains(target) && Self::qualifies(page, *target)
            }
            PageEvent::Submit { form } => self
                .tracked
                .iter()
                .any(|id| page.form_of(*id) == Some(*form) && Self::qualifies(page, *id)),
            _ => false,
        };

        Ok(if fired {
            vec![Detection::new(model_from_url(page.host()))]
        } else {
            Vec::new()
        })
    }

    fn reset(&mut self) {
        self.tracked.clear();
    }
}
