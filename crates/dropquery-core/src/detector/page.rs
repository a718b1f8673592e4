//! Typed model of the page the detectors watch.
//!
//! A browser bridge serializes DOM and network activity into [`PageEvent`]s;
//! [`PageModel`] folds them into a snapshot of the live elements so
//! detectors can resolve forms, ancestors and input text.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use url::Url;

use dropquery_types::lexical::suggests_chat_interface;

use super::DetectError;

/// Stable identity of a DOM node for the lifetime of a page.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One element as it looked when inserted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub id: NodeId,
    /// Tag name; compared case-insensitively.
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Own text content.
    #[serde(default)]
    pub text: String,
    /// Owning form, when the element is a form control.
    #[serde(default)]
    pub form: Option<NodeId>,
    #[serde(default)]
    pub parent: Option<NodeId>,
}

impl ElementSnapshot {
    /// Element with a tag and nothing else.
    pub fn new(id: u64, tag: &str) -> Self {
        Self {
            id: NodeId(id),
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    /// Add an attribute.
    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Set the text content.
    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    /// Set the parent.
    #[must_use]
    pub fn parent(mut self, parent: u64) -> Self {
        self.parent = Some(NodeId(parent));
        self
    }

    /// Set the owning form.
    #[must_use]
    pub fn form(mut self, form: u64) -> Self {
        self.form = Some(NodeId(form));
        self
    }

    /// Attribute value by case-insensitive name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .or_else(|| {
                self.attributes
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }

    /// Whether the tag equals `tag`, ignoring case.
    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }
}

/// How a request was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    Fetch,
    Xhr,
    /// `navigator.sendBeacon`; has no observable response.
    Beacon,
    /// Seen by the extension's request observer.
    Extension,
}

/// Something that happened on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageEvent {
    /// The top-level document changed.
    Navigated { url: String },
    /// A network request completed (or, for beacons, was sent).
    Request {
        url: String,
        method: String,
        transport: Transport,
        #[serde(default)]
        status: Option<u16>,
    },
    /// A mutation batch inserted these elements.
    NodesAdded { nodes: Vec<ElementSnapshot> },
    /// A mutation batch removed these elements.
    NodesRemoved { ids: Vec<NodeId> },
    /// The value of a text control changed.
    Input { target: NodeId, value: String },
    KeyDown {
        target: NodeId,
        key: String,
        #[serde(default)]
        shift: bool,
    },
    Click { target: NodeId },
    Submit { form: NodeId },
}

/// Live state of the current page.
#[derive(Debug, Clone, Default)]
pub struct PageModel {
    url: Option<Url>,
    nodes: HashMap<NodeId, ElementSnapshot>,
    values: HashMap<NodeId, String>,
}

impl PageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the model.
    ///
    /// Navigation drops every known element. Input on an unknown node is an
    /// error and leaves the model unchanged.
    pub fn apply(&mut self, event: &PageEvent) -> Result<(), DetectError> {
        match event {
            PageEvent::Navigated { url } => {
                let parsed = Url::parse(url).map_err(|e| DetectError::InvalidUrl {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;
                self.url = Some(parsed);
                self.nodes.clear();
                self.values.clear();
            }
            PageEvent::NodesAdded { nodes } => {
                for node in nodes {
                    let mut node = node.clone();
                    node.tag.make_ascii_lowercase();
                    self.nodes.insert(node.id, node);
                }
            }
            PageEvent::NodesRemoved { ids } => {
                for id in ids {
                    self.nodes.remove(id);
                    self.values.remove(id);
                }
            }
            PageEvent::Input { target, value } => {
                if !self.nodes.contains_key(target) {
                    return Err(DetectError::UnknownNode(*target));
                }
                self.values.insert(*target, value.clone());
            }
            PageEvent::Request { .. }
            | PageEvent::KeyDown { .. }
            | PageEvent::Click { .. }
            | PageEvent::Submit { .. } => {}
        }
        Ok(())
    }

    /// Lowercased host of the current page, or `""` before navigation.
    pub fn host(&self) -> &str {
        self.url.as_ref().and_then(Url::host_str).unwrap_or("")
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementSnapshot> {
        self.nodes.get(&id)
    }

    pub fn elements(&self) -> impl Iterator<Item = &ElementSnapshot> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Current text of a control: the typed value, else its text content.
    pub fn text_of(&self, id: NodeId) -> &str {
        self.values
            .get(&id)
            .map(String::as_str)
            .or_else(|| self.nodes.get(&id).map(|n| n.text.as_str()))
            .unwrap_or("")
    }

    /// Parent chain of `id`, nearest first. Stops at unknown nodes and cycles.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get(&id).and_then(|n| n.parent);
        while let Some(parent) = current {
            if parent == id || chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            current = self.nodes.get(&parent).and_then(|n| n.parent);
        }
        chain
    }

    /// Owning form: the explicit form reference, else the nearest `<form>`
    /// ancestor.
    pub fn form_of(&self, id: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(&id)?;
        node.form.or_else(|| {
            self.ancestors(id)
                .into_iter()
                .find(|a| self.nodes.get(a).is_some_and(|n| n.is("form")))
        })
    }

    /// Whether some element's class or id suggests a chat interface.
    pub fn has_chat_marker(&self) -> bool {
        self.nodes.values().any(|n| {
            suggests_chat_interface(n.attribute("class"), n.attribute("id"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> PageModel {
        let mut page = PageModel::new();
        page.apply(&PageEvent::Navigated {
            url: "https://Chat.Example.org/c/1".to_string(),
        })
        .unwrap();
        page.apply(&PageEvent::NodesAdded {
            nodes: vec![
                ElementSnapshot::new(1, "FORM"),
                ElementSnapshot::new(2, "div").parent(1),
                ElementSnapshot::new(3, "textarea").parent(2),
                ElementSnapshot::new(4, "button").form(1),
            ],
        })
        .unwrap();
        page
    }

    #[test]
    fn test_snapshot_builder_fills_defaults() {
        let snapshot = ElementSnapshot::new(7, "TEXTAREA");
        assert_eq!(snapshot.id, NodeId(7));
        assert_eq!(snapshot.tag, "textarea");
        assert!(snapshot.attributes.is_empty());
        assert_eq!(snapshot.parent, None);
        assert_eq!(ElementSnapshot::default().id, NodeId(0));

        let parsed: ElementSnapshot = serde_json::from_str(r#"{"id":7,"tag":"textarea"}"#).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_host_is_lowercased() {
        assert_eq!(page().host(), "chat.example.org");
        assert_eq!(PageModel::new().host(), "");
    }

    #[test]
    fn test_form_resolution() {
        let page = page();
        assert_eq!(page.form_of(NodeId(3)), Some(NodeId(1)));
        assert_eq!(page.form_of(NodeId(4)), Some(NodeId(1)));
        assert_eq!(page.form_of(NodeId(1)), None);
        assert_eq!(page.ancestors(NodeId(3)), vec![NodeId(2), NodeId(1)]);
    }

    #[test]
    fn test_input_and_removal() {
        let mut page = page();
        page.apply(&PageEvent::Input {
            target: NodeId(3),
            value: "hello".to_string(),
        })
        .unwrap();
        assert_eq!(page.text_of(NodeId(3)), "hello");

        page.apply(&PageEvent::NodesRemoved {
            ids: vec![NodeId(3)],
        })
        .unwrap();
        assert_eq!(page.text_of(NodeId(3)), "");
        assert!(matches!(
            page.apply(&PageEvent::Input {
                target: NodeId(3),
                value: "x".to_string()
            }),
            Err(DetectError::UnknownNode(NodeId(3)))
        ));
    }

    #[test]
    fn test_navigation_clears_nodes() {
        let mut page = page();
        page.apply(&PageEvent::Navigated {
            url: "https://other.example.org/".to_string(),
        })
        .unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn test_bad_url_is_rejected() {
        let mut page = page();
        let err = page
            .apply(&PageEvent::Navigated {
                url: "not a url".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, DetectError::InvalidUrl { .. }));
        assert_eq!(page.host(), "chat.example.org");
    }

    #[test]
    fn test_parent_cycle_terminates() {
        let mut page = PageModel::new();
        page.apply(&PageEvent::NodesAdded {
            nodes: vec![
                ElementSnapshot::new(1, "div").parent(2),
                ElementSnapshot::new(2, "div").parent(1),
            ],
        })
        .unwrap();
        assert_eq!(page.ancestors(NodeId(1)), vec![NodeId(2)]);
    }

    #[test]
    fn test_chat_marker() {
        let mut page = page();
        assert!(!page.has_chat_marker());
        page.apply(&PageEvent::NodesAdded {
            nodes: vec![ElementSnapshot::new(9, "div").attr("class", "chat-container")],
        })
        .unwrap();
        assert!(page.has_chat_marker());
    }

    #[test]
    fn test_event_json_shape() {
        let event: PageEvent = serde_json::from_str(
            r#"{"type":"key_down","target":3,"key":"Enter"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            PageEvent::KeyDown {
                target: NodeId(3),
                key: "Enter".to_string(),
                shift: false
            }
        );
        let event: PageEvent = serde_json::from_str(
            r#"{"type":"request","url":"https://a.b/","method":"POST","transport":"beacon"}"#,
        )
        .unwrap();
        assert!(matches!(event, PageEvent::Request { status: None, .. }));
    }
}
