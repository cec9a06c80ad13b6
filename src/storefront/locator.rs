//! Element locators
//!
//! A locator combines optional criteria (role + accessible name, own text,
//! placeholder, aria-label, tag) and may be scoped to the descendants of
//! another locator's matches. Name, text, placeholder and label criteria
//! match case-insensitive substrings unless `exact` is set.

use std::fmt;

use serde::Deserialize;

use super::dom::{normalize, Element, Role};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Locator {
    pub role: Option<Role>,
    pub name: Option<String>,
    #[serde(default)]
    pub exact: bool,
    pub text: Option<String>,
    pub placeholder: Option<String>,
    pub label: Option<String>,
    pub tag: Option<String>,
    /// Only search inside elements matched by this locator
    pub within: Option<Box<Locator>>,
}

impl Locator {
    pub fn role(role: Role, name: &str) -> Self {
        Self {
            role: Some(role),
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn placeholder(placeholder: &str) -> Self {
        Self {
            placeholder: Some(placeholder.to_string()),
            ..Self::default()
        }
    }

    pub fn tag(tag: &str) -> Self {
        Self {
            tag: Some(tag.to_string()),
            ..Self::default()
        }
    }

    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    pub fn within(mut self, scope: Locator) -> Self {
        self.within = Some(Box::new(scope));
        self
    }

    /// All matches in document order
    pub fn resolve<'a>(&self, root: &'a Element) -> Vec<&'a Element> {
        let candidates: Vec<&'a Element> = match &self.within {
            Some(scope) => scope
                .resolve(root)
                .into_iter()
                .flat_map(|s| s.children.iter().flat_map(|c| c.descendants()))
                .collect(),
            None => root.descendants(),
        };
        candidates.into_iter().filter(|e| self.matches(e)).collect()
    }

    fn matches(&self, element: &Element) -> bool {
        if let Some(role) = self.role {
            if element.role != role {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if element.tag != tag.as_str() {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if !text_matches(&element.accessible_name(), name, self.exact) {
                return false;
            }
        }
        if let Some(text) = &self.text {
            if element.text.is_empty() || !text_matches(&element.text, text, self.exact) {
                return false;
            }
        }
        if let Some(placeholder) = &self.placeholder {
            match &element.placeholder {
                Some(p) if text_matches(p, placeholder, self.exact) => {}
                _ => return false,
            }
        }
        if let Some(label) = &self.label {
            match &element.label {
                Some(l) if text_matches(l, label, self.exact) => {}
                _ => return false,
            }
        }
        true
    }
}

fn text_matches(haystack: &str, needle: &str, exact: bool) -> bool {
    let haystack = normalize(haystack);
    let needle = normalize(needle);
    if exact {
        haystack == needle
    } else {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(role) = &self.role {
            parts.push(format!("role={:?}", role).to_lowercase());
        }
        if let Some(name) = &self.name {
            parts.push(format!("name=\"{}\"", name));
        }
        if let Some(text) = &self.text {
            parts.push(format!("text=\"{}\"", text));
        }
        if let Some(placeholder) = &self.placeholder {
            parts.push(format!("placeholder=\"{}\"", placeholder));
        }
        if let Some(label) = &self.label {
            parts.push(format!("label=\"{}\"", label));
        }
        if let Some(tag) = &self.tag {
            parts.push(format!("tag={}", tag));
        }
        if self.exact {
            parts.push("exact".to_string());
        }
        let own = format!("[{}]", parts.join(" "));
        match &self.within {
            Some(scope) => write!(f, "{} >> {}", scope, own),
            None => f.write_str(&own),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storefront::dom::{button, cell, div, link, paragraph, row, Action, Element};

    fn page() -> Element {
        div([
            Element::new("nav", Role::Navigation)
                .label("Global")
                .child(link("Franchise", Action::Navigate("/franchise-dashboard".into()))),
            paragraph("So you want a piece of the pie?"),
            link("login", Action::LoginThen("/franchise-dashboard".into())),
            link("Login", Action::Navigate("/login".into())),
            Element::new("table", Role::Table).child(row([
                cell("north"),
                cell("0 ₿"),
                cell("").child(button("Close", Action::Navigate("/".into()))),
            ])),
            Element::new("footer", Role::Generic)
                .child(link("Franchise", Action::Navigate("/franchise-dashboard".into()))),
        ])
    }

    #[test]
    fn test_within_scopes_search() {
        let root = page();
        let all = Locator::role(Role::Link, "Franchise").resolve(&root);
        assert_eq!(all.len(), 2);

        let scoped = Locator::role(Role::Link, "Franchise")
            .within(Locator {
                label: Some("Global".to_string()),
                ..Locator::default()
            })
            .resolve(&root);
        assert_eq!(scoped.len(), 1);
    }

    #[test]
    fn test_exact_name_is_case_sensitive() {
        let root = page();
        assert_eq!(Locator::role(Role::Link, "login").resolve(&root).len(), 2);
        let exact = Locator::role(Role::Link, "login").exact().resolve(&root);
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].text, "login");
    }

    #[test]
    fn test_text_matches_own_text_only() {
        let root = page();
        let matches = Locator::text("So you want a piece of the").resolve(&root);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].tag, "p");
    }

    #[test]
    fn test_row_then_button() {
        let root = page();
        let buttons = Locator {
            role: Some(Role::Button),
            ..Locator::default()
        }
        .within(Locator::role(Role::Row, "north 0 ₿ Close"))
        .resolve(&root);
        assert_eq!(buttons.len(), 1);
    }

    #[test]
    fn test_display() {
        let locator = Locator::role(Role::Button, "Login");
        assert_eq!(locator.to_string(), "[role=button name=\"Login\"]");
    }
}
