//! DOM heuristics for known AI chat sites.
//!
//! Tracks prompt inputs and send controls. Controls are re-resolved from the
//! whole page after every mutation batch, since chat UIs re-render them
//! freely.

use std::collections::BTreeSet;

use dropquery_types::ModelTag;
use dropquery_types::endpoints::{is_known_ai_host, is_search_host, model_from_url};

use super::page::{NodeId, PageEvent, PageModel};
use super::selector::{RuleTable, Selector};
use super::{DetectError, Detection, Detector, DetectorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Input,
    SendControl,
}

fn rules() -> RuleTable<Role> {
    let mut table = RuleTable::new()
        .rule(Selector::tag("textarea"), Role::Input)
        .rule(
            Selector::any()
                .attr_eq("contenteditable", "true")
                .attr_eq("role", "textbox"),
            Role::Input,
        )
        .rule(
            Selector::any()
                .attr_eq("contenteditable", "true")
                .attr_contains("class", "prosemirror"),
            Role::Input,
        );
    for attr in ["aria-label", "title", "data-testid"] {
        for word in ["send", "submit"] {
            table = table.rule(
                Selector::tag("button").attr_contains(attr, word),
                Role::SendControl,
            );
        }
    }
    table.rule(
        Selector::tag("button").attr_eq("type", "submit").in_form(),
        Role::SendControl,
    )
}

/// Fires on Enter (without Shift), a send-control click or a form submit,
/// each only when the prompt text is non-empty.
#[derive(Debug, Clone)]
pub struct StructuredDomDetector {
    rules: RuleTable<Role>,
    inputs: BTreeSet<NodeId>,
    send_controls: BTreeSet<NodeId>,
    last_input: Option<NodeId>,
}

impl Default for StructuredDomDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl StructuredDomDetector {
    pub fn new() -> Self {
        Self {
            rules: rules(),
            inputs: BTreeSet::new(),
            send_controls: BTreeSet::new(),
            last_input: None,
        }
    }

    pub fn inputs(&self) -> &BTreeSet<NodeId> {
        &self.inputs
    }

    pub fn send_controls(&self) -> &BTreeSet<NodeId> {
        &self.send_controls
    }

    fn resolve(&mut self, page: &PageModel) {
        self.inputs.clear();
        self.send_controls.clear();
        for (id, role) in self.rules.scan(page.elements(), page) {
            match role {
                Role::Input => self.inputs.insert(id),
                Role::SendControl => self.send_controls.insert(id),
            };
        }
        if self.last_input.is_some_and(|id| !self.inputs.contains(&id)) {
            self.last_input = None;
        }
    }

    fn has_text(page: &PageModel, id: NodeId) -> bool {
        !page.text_of(id).trim().is_empty()
    }

    fn model(page: &PageModel) -> ModelTag {
        model_from_url(page.host())
    }

    /// Input a click on `control` would send: one in the same form, else the
    /// last one typed into, else any tracked input.
    fn input_for(&self, control: NodeId, page: &PageModel) -> Option<NodeId> {
        if let Some(form) = page.form_of(control)
            && let Some(id) = self
                .inputs
                .iter()
                .copied()
                .find(|id| page.form_of(*id) == Some(form))
        {
            return Some(id);
        }
        self.last_input.or_else(|| self.inputs.iter().next().copied())
    }

    fn is_send_control(&self, target: NodeId, page: &PageModel) -> Option<NodeId> {
        if self.send_controls.contains(&target) {
            return Some(target);
        }
        page.ancestors(target)
            .into_iter()
            .find(|a| self.send_controls.contains(a))
    }
}

impl Detector for StructuredDomDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::StructuredDom
    }

    fn applies_to(&self, host: &str) -> bool {
        is_known_ai_host(host) && !is_search_host(host)
    }

    fn observe(&mut self, event: &PageEvent, page: &PageModel) -> Result<Vec<Detection>, DetectError> {
        let fired = match event {
            PageEvent::NodesAdded { .. } | PageEvent::NodesRemoved { .. } => {
                self.resolve(page);
                false
            }
            PageEvent::Input { target, .. } => {
                if self.inputs.contains(target) {
                    self.last_input = Some(*target);
                }
                false
            }
            PageEvent::KeyDown { target, key, shift } => {
                key == "Enter"
                    && !*shift
                    && self.inputs.contains(target)
                    && Self::has_text(page, *target)
            }
            PageEvent::Click { target } => self
                .is_send_control(*target, page)
                .and_then(|control| self.input_for(control, page))
                .is_some_and(|input| Self::has_text(page, input)),
            PageEvent::Submit { form } => self
                .inputs
                .iter()
                .any(|id| page.form_of(*id) == Some(*form) && Self::has_text(page, *id)),
            PageEvent::Navigated { .. } | PageEvent::Request { .. } => false,
        };

        Ok(if fired {
            vec![Detection::new(Self::model(page))]
        } else {
            Vec::new()
        })
    }

    fn reset(&mut self) {
        self.inputs.clear();
        self.send_controls.clear();
        self.last_input = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::page::ElementSnapshot;

    struct Harness {
        page: PageModel,
        detector: StructuredDomDetector,
    }

    impl Harness {
        fn new(url: &str) -> Self {
            let mut h = Self {
                page: PageModel::new(),
                detector: StructuredDomDetector::new(),
            };
            h.send(PageEvent::Navigated {
                url: url.to_string(),
            });
            h.send(PageEvent::NodesAdded {
                nodes: vec![
                    ElementSnapshot::new(1, "form"),
                    ElementSnapshot::new(2, "textarea").parent(1),
                    ElementSnapshot::new(3, "button")
                        .attr("data-testid", "send-button")
                        .parent(1),
                    ElementSnapshot::new(4, "svg").parent(3),
                    ElementSnapshot::new(5, "button").attr("aria-label", "Copy"),
                ],
            });
            h
        }

        fn send(&mut self, event: PageEvent) -> Vec<Detection> {
            self.page.apply(&event).unwrap();
            self.detector.observe(&event, &self.page).unwrap()
        }

        fn type_text(&mut self, text: &str) {
            self.send(PageEvent::Input {
                target: NodeId(2),
                value: text.to_string(),
            });
        }
    }

    fn enter(shift: bool) -> PageEvent {
        PageEvent::KeyDown {
            target: NodeId(2),
            key: "Enter".to_string(),
            shift,
        }
    }

    #[test]
    fn test_applies_to_known_hosts_only() {
        let detector = StructuredDomDetector::new();
        assert!(detector.applies_to("chatgpt.com"));
        assert!(detector.applies_to("claude.ai"));
        assert!(!detector.applies_to("www.bing.com"));
        assert!(!detector.applies_to("example.org"));
    }

    #[test]
    fn test_resolves_inputs_and_controls() {
        let h = Harness::new("https://chatgpt.com/");
        assert!(h.detector.inputs().contains(&NodeId(2)));
        assert_eq!(
            h.detector.send_controls().iter().copied().collect::<Vec<_>>(),
            vec![NodeId(3)]
        );
    }

    #[test]
    fn test_enter_fires_with_text() {
        let mut h = Harness::new("https://chatgpt.com/");
        assert!(h.send(enter(false)).is_empty());
        h.type_text("   ");
        assert!(h.send(enter(false)).is_empty());
        h.type_text("hello there");
        assert!(h.send(enter(true)).is_empty());
        assert_eq!(h.send(enter(false)), vec![Detection::new(ModelTag::ChatGpt)]);
    }

    #[test]
    fn test_click_on_control_child_fires() {
        let mut h = Harness::new("https://claude.ai/new");
        h.type_text("summarize this");
        assert_eq!(
            h.send(PageEvent::Click { target: NodeId(4) }),
            vec![Detection::new(ModelTag::Claude)]
        );
        assert!(h.send(PageEvent::Click { target: NodeId(5) }).is_empty());
    }

    #[test]
    fn test_submit_requires_text() {
        let mut h = Harness::new("https://gemini.google.com/app");
        assert!(h.send(PageEvent::Submit { form: NodeId(1) }).is_empty());
        h.type_text("hi");
        assert_eq!(
            h.send(PageEvent::Submit { form: NodeId(1) }),
            vec![Detection::new(ModelTag::Gemini)]
        );
    }

    #[test]
    fn test_rerendered_send_control_is_picked_up() {
        let mut h = Harness::new("https://chatgpt.com/");
        h.type_text("hello");
        h.send(PageEvent::NodesRemoved {
            ids: vec![NodeId(3), NodeId(4)],
        });
        assert!(h.send(PageEvent::Click { target: NodeId(3) }).is_empty());
        h.send(PageEvent::NodesAdded {
            nodes: vec![ElementSnapshot::new(7, "button")
                .attr("aria-label", "Send prompt")
                .parent(1)],
        });
        assert_eq!(h.send(PageEvent::Click { target: NodeId(7) }).len(), 1);
    }
}
