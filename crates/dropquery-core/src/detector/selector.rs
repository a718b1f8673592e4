//! Declarative element selectors and role tables.
//!
//! Detectors describe the elements they care about as `(Selector, role)`
//! rules in a [`RuleTable`] and evaluate the table against each mutation
//! batch. All string comparisons ignore ASCII case.

use super::page::{ElementSnapshot, NodeId, PageModel};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    Tag(String),
    AttrExists(String),
    AttrEquals(String, String),
    AttrContains(String, String),
    AttrStartsWith(String, String),
    TextContains(String),
    InForm,
}

/// Conjunction of element conditions.
///
/// ```
/// use dropquery_core::detector::page::{ElementSnapshot, PageModel};
/// use dropquery_core::detector::selector::Selector;
///
/// let send = Selector::tag("button").attr_contains("aria-label", "send");
/// let button = ElementSnapshot::new(1, "button").attr("aria-label", "Send prompt");
/// assert!(send.matches(&button, &PageModel::new()));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    conditions: Vec<Condition>,
}

impl Selector {
    /// Matches every element.
    pub fn any() -> Self {
        Self::default()
    }

    /// Matches elements with this tag.
    pub fn tag(tag: &str) -> Self {
        Self::any().and(Condition::Tag(tag.to_ascii_lowercase()))
    }

    fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn attr(self, name: &str) -> Self {
        self.and(Condition::AttrExists(name.to_ascii_lowercase()))
    }

    #[must_use]
    pub fn attr_eq(self, name: &str, value: &str) -> Self {
        self.and(Condition::AttrEquals(
            name.to_ascii_lowercase(),
            value.to_ascii_lowercase(),
        ))
    }

    #[must_use]
    pub fn attr_contains(self, name: &str, needle: &str) -> Self {
        self.and(Condition::AttrContains(
            name.to_ascii_lowercase(),
            needle.to_ascii_lowercase(),
        ))
    }

    #[must_use]
    pub fn attr_starts_with(self, name: &str, prefix: &str) -> Self {
        self.and(Condition::AttrStartsWith(
            name.to_ascii_lowercase(),
            prefix.to_ascii_lowercase(),
        ))
    }

    /// Own text content contains `needle`.
    #[must_use]
    pub fn text_contains(self, needle: &str) -> Self {
        self.and(Condition::TextContains(needle.to_ascii_lowercase()))
    }

    /// Element belongs to a form.
    #[must_use]
    pub fn in_form(self) -> Self {
        self.and(Condition::InForm)
    }

    pub fn matches(&self, element: &ElementSnapshot, page: &PageModel) -> bool {
        let attr = |name: &str| element.attribute(name).map(str::to_ascii_lowercase);
        self.conditions.iter().all(|condition| match condition {
            Condition::Tag(tag) => element.is(tag),
            Condition::AttrExists(name) => element.attribute(name).is_some(),
            Condition::AttrEquals(name, value) => attr(name).is_some_and(|v| v == *value),
            Condition::AttrContains(name, needle) => {
                attr(name).is_some_and(|v| v.contains(needle.as_str()))
            }
            Condition::AttrStartsWith(name, prefix) => {
                attr(name).is_some_and(|v| v.starts_with(prefix.as_str()))
            }
            Condition::TextContains(needle) => element
                .text
                .to_ascii_lowercase()
                .contains(needle.as_str()),
            Condition::InForm => page.form_of(element.id).is_some(),
        })
    }
}

/// Ordered `(selector, role)` rules.
#[derive(Debug, Clone)]
pub struct RuleTable<R> {
    rules: Vec<(Selector, R)>,
}

impl<R> Default for RuleTable<R> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<R: Copy + PartialEq> RuleTable<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule.
    #[must_use]
    pub fn rule(mut self, selector: Selector, role: R) -> Self {
        self.rules.push((selector, role));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Role of the first matching rule.
    pub fn role_of(&self, element: &ElementSnapshot, page: &PageModel) -> Option<R> {
        self.rules
            .iter()
            .find(|(selector, _)| selector.matches(element, page))
            .map(|(_, role)| *role)
    }

    /// Whether any rule for `role` matches.
    pub fn has_role(&self, element: &ElementSnapshot, page: &PageModel, role: R) -> bool {
        self.rules
            .iter()
            .any(|(selector, r)| *r == role && selector.matches(element, page))
    }

    /// Classify a batch of elements, skipping those no rule matches.
    pub fn scan<'a>(
        &self,
        elements: impl IntoIterator<Item = &'a ElementSnapshot>,
        page: &PageModel,
    ) -> Vec<(NodeId, R)> {
        elements
            .into_iter()
            .filter_map(|el| self.role_of(el, page).map(|role| (el.id, role)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::page::PageEvent;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Role {
        Input,
        Send,
    }

    fn table() -> RuleTable<Role> {
        RuleTable::new()
            .rule(Selector::tag("textarea"), Role::Input)
            .rule(
                Selector::any()
                    .attr_eq("contenteditable", "true")
                    .attr_eq("role", "textbox"),
                Role::Input,
            )
            .rule(Selector::tag("button").attr_contains("aria-label", "send"), Role::Send)
            .rule(Selector::tag("button").attr_eq("type", "submit").in_form(), Role::Send)
    }

    #[test]
    fn test_case_insensitive_matching() {
        let page = PageModel::new();
        let el = ElementSnapshot::new(1, "DIV")
            .attr("ContentEditable", "TRUE")
            .attr("role", "textbox");
        assert_eq!(table().role_of(&el, &page), Some(Role::Input));
    }

    #[test]
    fn test_in_form_condition() {
        let mut page = PageModel::new();
        let form = ElementSnapshot::new(1, "form");
        let inside = ElementSnapshot::new(2, "button").attr("type", "submit").parent(1);
        let outside = ElementSnapshot::new(3, "button").attr("type", "submit");
        page.apply(&PageEvent::NodesAdded {
            nodes: vec![form, inside.clone(), outside.clone()],
        })
        .unwrap();
        assert!(table().has_role(&inside, &page, Role::Send));
        assert!(!table().has_role(&outside, &page, Role::Send));
    }

    #[test]
    fn test_scan_batch() {
        let page = PageModel::new();
        let batch = [
            ElementSnapshot::new(1, "textarea"),
            ElementSnapshot::new(2, "span"),
            ElementSnapshot::new(3, "button").attr("aria-label", "Send message"),
        ];
        assert_eq!(
            table().scan(&batch, &page),
            vec![(NodeId(1), Role::Input), (NodeId(3), Role::Send)]
        );
    }

    #[test]
    fn test_text_and_prefix_conditions() {
        let page = PageModel::new();
        let el = ElementSnapshot::new(1, "div")
            .attr("data-testid", "conversation-turn-3")
            .text("AI Overview");
        assert!(Selector::any()
            .attr_starts_with("data-testid", "conversation-turn")
            .matches(&el, &page));
        assert!(Selector::any().text_contains("ai overview").matches(&el, &page));
        assert!(!Selector::any().attr("aria-label").matches(&el, &page));
    }
}
