//! Rendered element tree
//!
//! Pages render to a tree of [`Element`]s carrying the ARIA role, accessible
//! name inputs (label, text, placeholder) and the interaction each element
//! triggers. Locators and assertions run against this tree.

use serde::Deserialize;

/// ARIA role of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Button,
    Cell,
    Columnheader,
    Combobox,
    Form,
    Generic,
    Heading,
    Img,
    Link,
    Main,
    Navigation,
    Paragraph,
    Row,
    Rowgroup,
    Table,
    Textbox,
}

/// Form fields the storefront keeps values for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Email,
    Password,
    Store,
    FranchiseName,
    FranchiseAdminEmail,
    StoreName,
}

/// What clicking an element does
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Navigate(String),
    /// Navigate to a login page and return to the given path afterwards
    LoginThen(String),
    AddPizza(u64),
    Checkout,
    Login,
    Register,
    PayNow,
    Verify,
    OpenCreateStore(u64),
    CreateStore,
    OpenCloseStore { franchise_id: u64, store_id: u64 },
    ConfirmCloseStore,
    OpenCreateFranchise,
    CreateFranchise,
    OpenCloseFranchise(u64),
    ConfirmCloseFranchise,
}

#[derive(Debug, Clone)]
pub struct Element {
    pub tag: &'static str,
    pub role: Role,
    /// `aria-label`
    pub label: Option<String>,
    /// Text directly inside this element
    pub text: String,
    pub placeholder: Option<String>,
    pub value: Option<String>,
    pub field: Option<Field>,
    pub action: Option<Action>,
    /// `(value, label)` pairs of a select
    pub options: Vec<(String, String)>,
    pub disabled: bool,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: &'static str, role: Role) -> Self {
        Self {
            tag,
            role,
            label: None,
            text: String::new(),
            placeholder: None,
            value: None,
            field: None,
            action: None,
            options: Vec::new(),
            disabled: false,
            children: Vec::new(),
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn value(mut self, value: Option<String>) -> Self {
        self.value = value;
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.field = Some(field);
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn options(mut self, options: Vec<(String, String)>) -> Self {
        self.options = options;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    /// Whitespace-normalized text of this element and its descendants
    pub fn text_content(&self) -> String {
        let mut parts = Vec::new();
        self.collect_text(&mut parts);
        normalize(&parts.join(" "))
    }

    fn collect_text(&self, parts: &mut Vec<String>) {
        if !self.text.is_empty() {
            parts.push(self.text.clone());
        }
        for child in &self.children {
            child.collect_text(parts);
        }
    }

    /// Accessible name: aria-label, then placeholder for inputs, then text
    pub fn accessible_name(&self) -> String {
        if let Some(label) = &self.label {
            return normalize(label);
        }
        if self.role == Role::Textbox {
            if let Some(placeholder) = &self.placeholder {
                return normalize(placeholder);
            }
        }
        self.text_content()
    }

    /// Depth-first iterator over this element and all descendants
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        self.walk(&mut out);
        out
    }

    fn walk<'a>(&'a self, out: &mut Vec<&'a Element>) {
        out.push(self);
        for child in &self.children {
            child.walk(out);
        }
    }
}

/// Collapse runs of whitespace and trim
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn div(children: impl IntoIterator<Item = Element>) -> Element {
    Element::new("div", Role::Generic).children(children)
}

pub fn heading(tag: &'static str, text: impl Into<String>) -> Element {
    Element::new(tag, Role::Heading).text(text)
}

pub fn paragraph(text: impl Into<String>) -> Element {
    Element::new("p", Role::Paragraph).text(text)
}

pub fn button(text: impl Into<String>, action: Action) -> Element {
    Element::new("button", Role::Button).text(text).action(action)
}

pub fn link(text: impl Into<String>, action: Action) -> Element {
    Element::new("a", Role::Link).text(text).action(action)
}

pub fn input(placeholder: &str, field: Field, value: Option<String>) -> Element {
    Element::new("input", Role::Textbox)
        .placeholder(placeholder)
        .field(field)
        .value(value)
}

pub fn cell(text: impl Into<String>) -> Element {
    Element::new("td", Role::Cell).text(text)
}

pub fn header_cell(text: impl Into<String>) -> Element {
    Element::new("th", Role::Columnheader).text(text)
}

pub fn row(cells: impl IntoIterator<Item = Element>) -> Element {
    Element::new("tr", Role::Row).children(cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_content_joins_descendants() {
        let r = row([
            cell("north"),
            cell("0 ₿"),
            cell("").child(button("Close", Action::Navigate("/".to_string()))),
        ]);
        assert_eq!(r.text_content(), "north 0 ₿ Close");
        assert_eq!(r.accessible_name(), "north 0 ₿ Close");
    }

    #[test]
    fn test_textbox_name_falls_back_to_placeholder() {
        let field = input("Email address", Field::Email, None);
        assert_eq!(field.accessible_name(), "Email address");
    }

    #[test]
    fn test_label_wins() {
        let nav = Element::new("nav", Role::Navigation)
            .label("Global")
            .child(link("Franchise", Action::Navigate("/franchise-dashboard".to_string())));
        assert_eq!(nav.accessible_name(), "Global");
        assert_eq!(nav.descendants().len(), 2);
    }
}
