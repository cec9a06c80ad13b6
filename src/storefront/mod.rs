//! Headless storefront
//!
//! A deterministic model of the pizza web UI: it keeps the same session,
//! cart and dashboard state, issues the same HTTP calls for each navigation
//! and interaction, and renders each page as an element tree that locators
//! can query. Scenarios drive it the way a browser test drives the real UI.

pub mod api;
pub mod dom;
pub mod format;
pub mod locator;
pub mod model;
mod pages;

use std::collections::HashMap;
use std::sync::Arc;

use crate::common::{Error, Result};
use crate::mock::Transport;

pub use api::PizzaApi;
pub use dom::{Action, Element, Field, Role};
pub use locator::Locator;

use model::{Franchise, OrderItem, OrderRequest, OrderResponse, Pizza, User};

/// Logged-in user and their bearer token
#[derive(Debug, Clone)]
struct Session {
    user: User,
    token: String,
}

#[derive(Debug, Clone, Default)]
struct Cart {
    items: Vec<OrderItem>,
    store_id: Option<String>,
}

/// Target of a create/close dialog and where to go afterwards
#[derive(Debug, Clone)]
struct Pending {
    franchise_id: u64,
    store_id: Option<u64>,
    back: String,
}

/// Pages the storefront can show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Page {
    Home,
    Menu,
    Payment,
    Delivery,
    Login,
    Register,
    Logout,
    DinerDashboard,
    FranchiseDashboard,
    CreateStore,
    CloseStore,
    AdminDashboard,
    CreateFranchise,
    CloseFranchise,
    About,
    History,
    Docs,
    NotFound,
}

impl Page {
    fn for_path(path: &str) -> Self {
        match path {
            "/" => Self::Home,
            "/menu" => Self::Menu,
            "/payment" => Self::Payment,
            "/delivery" => Self::Delivery,
            "/login" | "/payment/login" | "/franchise-dashboard/login" => Self::Login,
            "/register" => Self::Register,
            "/logout" => Self::Logout,
            "/diner-dashboard" => Self::DinerDashboard,
            "/franchise-dashboard" => Self::FranchiseDashboard,
            "/franchise-dashboard/create-store" => Self::CreateStore,
            "/franchise-dashboard/close-store" | "/admin-dashboard/close-store" => Self::CloseStore,
            "/admin-dashboard" => Self::AdminDashboard,
            "/admin-dashboard/create-franchise" => Self::CreateFranchise,
            "/admin-dashboard/close-franchise" => Self::CloseFranchise,
            "/about" => Self::About,
            "/history" => Self::History,
            "/docs" => Self::Docs,
            _ => Self::NotFound,
        }
    }
}

/// The headless storefront
pub struct Storefront {
    api: PizzaApi,
    path: String,
    session: Option<Session>,
    menu: Vec<Pizza>,
    franchises: Vec<Franchise>,
    my_franchises: Vec<Franchise>,
    cart: Cart,
    form: HashMap<Field, String>,
    return_to: Option<String>,
    pending: Option<Pending>,
    last_order: Option<OrderResponse>,
    verification: Option<String>,
    notice: Option<String>,
    view: Element,
}

impl Storefront {
    /// A storefront sending API calls through `transport` to `api_base`
    pub fn new(transport: Arc<dyn Transport>, api_base: &str) -> Self {
        let mut storefront = Self {
            api: PizzaApi::new(transport, api_base),
            path: "/".to_string(),
            session: None,
            menu: Vec::new(),
            franchises: Vec::new(),
            my_franchises: Vec::new(),
            cart: Cart::default(),
            form: HashMap::new(),
            return_to: None,
            pending: None,
            last_order: None,
            verification: None,
            notice: None,
            view: dom::div([]),
        };
        storefront.rerender();
        storefront
    }

    /// Current path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current rendered page
    pub fn view(&self) -> &Element {
        &self.view
    }

    /// Bearer token of the logged-in user
    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    fn owned_token(&self) -> Option<String> {
        self.token().map(str::to_string)
    }

    fn require_token(&self, action: &str) -> Result<String> {
        self.owned_token()
            .ok_or_else(|| Error::TestAssertion(format!("cannot {} without a logged-in user", action)))
    }

    /// Build the page for the current path and state
    pub fn render(&self) -> Element {
        self.render_page(Page::for_path(&self.path))
    }

    fn rerender(&mut self) {
        self.view = self.render();
    }

    /// Turn a backend error into a notice on the page
    ///
    /// Only HTTP error statuses are absorbed; contract violations and
    /// transport failures still fail the caller.
    fn absorb<T>(&mut self, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(Error::Api { status, message, .. }) => {
                tracing::debug!(status, %message, "Backend error shown on page");
                self.notice = Some(message);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Navigate to a path, loading whatever data the page needs
    pub async fn goto(&mut self, path: &str) -> Result<()> {
        let path = normalize_path(path);
        tracing::debug!(%path, "Navigate");
        self.notice = None;
        self.path = path;

        if Page::for_path(&self.path) == Page::Logout {
            self.logout().await?;
            self.path = "/".to_string();
        }

        match Page::for_path(&self.path) {
            Page::Menu => {
                let token = self.owned_token();
                let menu = self.api.menu(token.as_deref()).await;
                if let Some(menu) = self.absorb(menu)? {
                    self.menu = menu;
                }
                let franchises = self.api.franchises(token.as_deref()).await;
                if let Some(franchises) = self.absorb(franchises)? {
                    self.franchises = franchises;
                }
            }
            Page::FranchiseDashboard => {
                if let Some(session) = self.session.clone() {
                    let mine = self.api.user_franchises(session.user.id, &session.token).await;
                    if let Some(mine) = self.absorb(mine)? {
                        self.my_franchises = mine;
                    }
                }
            }
            Page::AdminDashboard => {
                let admin_token = self
                    .session
                    .as_ref()
                    .filter(|s| s.user.is_admin())
                    .map(|s| s.token.clone());
                if let Some(token) = admin_token {
                    let all = self.api.franchises(Some(&token)).await;
                    if let Some(all) = self.absorb(all)? {
                        self.franchises = all;
                    }
                }
            }
            _ => {}
        }

        self.rerender();
        Ok(())
    }

    async fn logout(&mut self) -> Result<()> {
        if let Some(session) = self.session.take() {
            let result = self.api.logout(&session.token).await;
            self.absorb(result)?;
            tracing::debug!(user = %session.user.email, "Logged out");
        }
        self.cart = Cart::default();
        Ok(())
    }

    fn find(&self, locator: &Locator) -> Result<&Element> {
        locator
            .resolve(&self.view)
            .into_iter()
            .next()
            .ok_or_else(|| Error::ElementNotFound(format!("{} on {}", locator, self.path)))
    }

    /// Click the first element matching the locator
    pub async fn click(&mut self, locator: &Locator) -> Result<()> {
        let action = {
            let element = self.find(locator)?;
            if element.disabled {
                return Err(Error::not_interactive(locator, "be clicked while disabled"));
            }
            element.action.clone()
        };

        match action {
            Some(action) => self.perform(action).await,
            None => Ok(()),
        }
    }

    /// Type into a text input
    pub fn fill(&mut self, locator: &Locator, value: &str) -> Result<()> {
        let field = {
            let element = self.find(locator)?;
            match (element.role, element.field) {
                (Role::Textbox, Some(field)) => field,
                _ => return Err(Error::not_interactive(locator, "be filled")),
            }
        };
        self.form.insert(field, value.to_string());
        self.rerender();
        Ok(())
    }

    /// Press a key while an element is focused
    ///
    /// Focus moves have no effect on the model, so only the target's
    /// presence is checked.
    pub fn press(&mut self, locator: &Locator, key: &str) -> Result<()> {
        self.find(locator)?;
        if key.is_empty() {
            return Err(Error::Config("press requires a key".to_string()));
        }
        tracing::trace!(%locator, key, "Press");
        Ok(())
    }

    /// Choose an option of a select by value or label
    pub fn select_option(&mut self, locator: &Locator, choice: &str) -> Result<()> {
        let value = {
            let element = self.find(locator)?;
            if element.role != Role::Combobox {
                return Err(Error::not_interactive(locator, "select an option"));
            }
            element
                .options
                .iter()
                .find(|(value, label)| value == choice || label == choice)
                .map(|(value, _)| value.clone())
                .ok_or_else(|| {
                    Error::TestAssertion(format!("{} has no option '{}'", locator, choice))
                })?
        };
        self.cart.store_id = (!value.is_empty()).then_some(value);
        self.rerender();
        Ok(())
    }

    async fn perform(&mut self, action: Action) -> Result<()> {
        tracing::debug!(?action, path = %self.path, "Perform");
        match action {
            Action::Navigate(path) => self.goto(&path).await,
            Action::LoginThen(path) => {
                let login = format!("{}/login", path.trim_end_matches('/'));
                self.return_to = Some(path);
                self.goto(&login).await
            }
            Action::AddPizza(menu_id) => {
                let pizza = self
                    .menu
                    .iter()
                    .find(|p| p.id == menu_id)
                    .ok_or_else(|| Error::Internal(format!("pizza {} is not on the menu", menu_id)))?;
                self.cart.items.push(OrderItem {
                    menu_id,
                    description: pizza.title.clone(),
                    price: pizza.price,
                });
                self.rerender();
                Ok(())
            }
            Action::Checkout => {
                if self.session.is_some() {
                    self.goto("/payment").await
                } else {
                    self.return_to = Some("/payment".to_string());
                    self.goto("/payment/login").await
                }
            }
            Action::Login => self.submit_login().await,
            Action::Register => self.submit_register().await,
            Action::PayNow => self.pay().await,
            Action::Verify => self.verify().await,
            Action::OpenCreateStore(franchise_id) => {
                self.pending = Some(Pending {
                    franchise_id,
                    store_id: None,
                    back: "/franchise-dashboard".to_string(),
                });
                self.goto("/franchise-dashboard/create-store").await
            }
            Action::CreateStore => {
                let pending = self.pending_dialog()?;
                let token = self.require_token("create a store")?;
                let name = self.field(Field::StoreName);
                let result = self.api.create_store(pending.franchise_id, &name, &token).await;
                self.finish_dialog(result, &pending.back).await
            }
            Action::OpenCloseStore {
                franchise_id,
                store_id,
            } => {
                let back = dashboard_of(&self.path);
                self.pending = Some(Pending {
                    franchise_id,
                    store_id: Some(store_id),
                    back: back.clone(),
                });
                self.goto(&format!("{}/close-store", back)).await
            }
            Action::ConfirmCloseStore => {
                let pending = self.pending_dialog()?;
                let token = self.require_token("close a store")?;
                let store_id = pending
                    .store_id
                    .ok_or_else(|| Error::Internal("no store selected".to_string()))?;
                let result = self.api.close_store(pending.franchise_id, store_id, &token).await;
                self.finish_dialog(result, &pending.back).await
            }
            Action::OpenCreateFranchise => self.goto("/admin-dashboard/create-franchise").await,
            Action::CreateFranchise => {
                let token = self.require_token("create a franchise")?;
                let name = self.field(Field::FranchiseName);
                let email = self.field(Field::FranchiseAdminEmail);
                let result = self.api.create_franchise(&name, &email, &token).await;
                self.finish_dialog(result, "/admin-dashboard").await
            }
            Action::OpenCloseFranchise(franchise_id) => {
                self.pending = Some(Pending {
                    franchise_id,
                    store_id: None,
                    back: "/admin-dashboard".to_string(),
                });
                self.goto("/admin-dashboard/close-franchise").await
            }
            Action::ConfirmCloseFranchise => {
                let pending = self.pending_dialog()?;
                let token = self.require_token("close a franchise")?;
                let result = self.api.close_franchise(pending.franchise_id, &token).await;
                self.finish_dialog(result, &pending.back).await
            }
        }
    }

    fn field(&self, field: Field) -> String {
        self.form.get(&field).cloned().unwrap_or_default()
    }

    fn pending_dialog(&self) -> Result<Pending> {
        self.pending
            .clone()
            .ok_or_else(|| Error::Internal("dialog opened without a target".to_string()))
    }

    /// Leave a dialog on success, stay on it with a notice on failure
    async fn finish_dialog<T>(&mut self, result: Result<T>, back: &str) -> Result<()> {
        match self.absorb(result)? {
            Some(_) => {
                self.form.clear();
                self.pending = None;
                self.goto(back).await
            }
            None => {
                self.rerender();
                Ok(())
            }
        }
    }

    async fn submit_login(&mut self) -> Result<()> {
        let email = self.field(Field::Email);
        let password = self.field(Field::Password);
        let result = self.api.login(&email, &password).await;
        match self.absorb(result)? {
            Some(auth) => {
                tracing::debug!(user = %auth.user.email, "Logged in");
                self.session = Some(Session {
                    user: auth.user,
                    token: auth.token,
                });
                self.form.clear();
                let next = self.return_to.take().unwrap_or_else(|| "/".to_string());
                self.goto(&next).await
            }
            None => {
                self.rerender();
                Ok(())
            }
        }
    }

    async fn submit_register(&mut self) -> Result<()> {
        let name = self.field(Field::Name);
        let email = self.field(Field::Email);
        let password = self.field(Field::Password);
        let result = self.api.register(&name, &email, &password).await;
        match self.absorb(result)? {
            Some(auth) => {
                self.session = Some(Session {
                    user: auth.user,
                    token: auth.token,
                });
                self.form.clear();
                self.goto("/").await
            }
            None => {
                self.rerender();
                Ok(())
            }
        }
    }

    async fn pay(&mut self) -> Result<()> {
        let token = self.require_token("pay")?;
        let store_id = self
            .cart
            .store_id
            .clone()
            .ok_or_else(|| Error::not_interactive("Pay now", "be used without a store"))?;
        let franchise_id = self
            .franchises
            .iter()
            .find(|f| f.stores.iter().any(|s| s.id.to_string() == store_id))
            .map(|f| f.id)
            .ok_or_else(|| Error::Internal(format!("store {} belongs to no franchise", store_id)))?;

        let order = OrderRequest {
            items: self.cart.items.clone(),
            store_id,
            franchise_id,
        };
        let result = self.api.order(&order, &token).await;
        match self.absorb(result)? {
            Some(confirmation) => {
                tracing::debug!(order = confirmation.order.id, "Order placed");
                self.last_order = Some(confirmation);
                self.verification = None;
                self.cart.items.clear();
                self.goto("/delivery").await
            }
            None => {
                self.rerender();
                Ok(())
            }
        }
    }

    async fn verify(&mut self) -> Result<()> {
        let token = self.require_token("verify an order")?;
        let jwt = self
            .last_order
            .as_ref()
            .map(|o| o.jwt.clone())
            .ok_or_else(|| Error::Internal("no order to verify".to_string()))?;
        let result = self.api.verify(&jwt, &token).await;
        if let Some(response) = self.absorb(result)? {
            self.verification = Some(if response.message.is_empty() {
                "valid".to_string()
            } else {
                response.message
            });
        }
        self.rerender();
        Ok(())
    }

    /// Pass if at least one element matches
    pub fn expect_visible(&self, locator: &Locator) -> Result<()> {
        if locator.resolve(&self.view).is_empty() {
            return Err(Error::TestAssertion(format!(
                "expected {} to be visible on {}",
                locator, self.path
            )));
        }
        Ok(())
    }

    /// Pass if no element matches
    pub fn expect_hidden(&self, locator: &Locator) -> Result<()> {
        let count = locator.resolve(&self.view).len();
        if count > 0 {
            return Err(Error::TestAssertion(format!(
                "expected {} to be hidden on {}, found {}",
                locator, self.path, count
            )));
        }
        Ok(())
    }

    /// Pass if some matching element's text contains `expected`
    pub fn expect_text(&self, locator: &Locator, expected: &str) -> Result<()> {
        let matches = locator.resolve(&self.view);
        if matches.is_empty() {
            return Err(Error::ElementNotFound(format!("{} on {}", locator, self.path)));
        }
        let expected = dom::normalize(expected);
        if matches.iter().any(|e| e.text_content().contains(&expected)) {
            return Ok(());
        }
        let actual: Vec<String> = matches.iter().map(|e| e.text_content()).collect();
        Err(Error::TestAssertion(format!(
            "expected {} to contain \"{}\", got {:?}",
            locator, expected, actual
        )))
    }
}

fn normalize_path(path: &str) -> String {
    let path = crate::mock::message::strip_query(path);
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    if path.len() > 1 {
        path.trim_end_matches('/').to_string()
    } else {
        path
    }
}

/// Dashboard a close-store dialog returns to
fn dashboard_of(path: &str) -> String {
    if path.starts_with("/admin-dashboard") {
        "/admin-dashboard".to_string()
    } else {
        "/franchise-dashboard".to_string()
    }
}
