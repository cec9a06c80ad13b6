//! Page rendering

use super::dom::{
    button, cell, div, header_cell, heading, input, link, paragraph, row, Action, Element, Field,
    Role,
};
use super::format::{format_price, format_total};
use super::model::Franchise;
use super::{Page, Storefront};

const API_DOCS: &[(&str, &str, &str)] = &[
    ("POST", "/api/auth", "Register a new user"),
    ("PUT", "/api/auth", "Login existing user"),
    ("DELETE", "/api/auth", "Logout a user"),
    ("GET", "/api/order/menu", "Get the pizza menu"),
    ("GET", "/api/order", "Get the orders for the authenticated user"),
    ("POST", "/api/order", "Create a order for the authenticated user"),
    ("POST", "/api/order/verify", "Verify a pizza order JWT"),
    ("GET", "/api/franchise", "List all the franchises"),
    ("GET", "/api/franchise/:userId", "List a user's franchises"),
    ("POST", "/api/franchise", "Create a new franchise"),
    ("DELETE", "/api/franchise/:franchiseId", "Delete a franchise"),
    ("POST", "/api/franchise/:franchiseId/store", "Create a new franchise store"),
    ("DELETE", "/api/franchise/:franchiseId/store/:storeId", "Delete a store"),
];

fn main_section(children: impl IntoIterator<Item = Element>) -> Element {
    Element::new("main", Role::Main).children(children)
}

fn table(
    head: impl IntoIterator<Item = Element>,
    body: impl IntoIterator<Item = Element>,
) -> Element {
    Element::new("table", Role::Table)
        .child(Element::new("thead", Role::Rowgroup).child(row(head)))
        .child(Element::new("tbody", Role::Rowgroup).children(body))
}

fn navigate(path: &str) -> Action {
    Action::Navigate(path.to_string())
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}

impl Storefront {
    pub(super) fn render_page(&self, page: Page) -> Element {
        let mut content = Vec::new();
        if let Some(notice) = &self.notice {
            content.push(paragraph(format!("⚠️ {}", notice)).label("notice"));
        }
        content.extend(match page {
            Page::Home => self.home(),
            Page::Menu => self.menu_page(),
            Page::Payment => self.payment(),
            Page::Delivery => self.delivery(),
            Page::Login => self.login(),
            Page::Register => self.register(),
            Page::DinerDashboard => self.diner_dashboard(),
            Page::FranchiseDashboard => self.franchise_dashboard(),
            Page::CreateStore => self.create_store(),
            Page::CloseStore => self.close_store(),
            Page::AdminDashboard => self.admin_dashboard(),
            Page::CreateFranchise => self.create_franchise(),
            Page::CloseFranchise => self.close_franchise(),
            Page::About => about(),
            Page::History => history(),
            Page::Docs => docs(),
            Page::Logout | Page::NotFound => not_found(),
        });

        div([self.header(), main_section(content), footer()])
    }

    fn header(&self) -> Element {
        let mut nav = Element::new("nav", Role::Navigation)
            .label("Global")
            .child(link("JWT Pizza", navigate("/")))
            .child(link("Order", navigate("/menu")))
            .child(link("Franchise", navigate("/franchise-dashboard")));

        match self.user() {
            Some(user) => {
                if user.is_admin() {
                    nav = nav.child(link("Admin", navigate("/admin-dashboard")));
                }
                nav = nav
                    .child(link("Logout", navigate("/logout")))
                    .child(link(user.initials(), navigate("/diner-dashboard")));
            }
            None => {
                nav = nav
                    .child(link("Login", navigate("/login")))
                    .child(link("Register", navigate("/register")));
            }
        }

        Element::new("header", Role::Generic).child(nav)
    }

    fn home(&self) -> Vec<Element> {
        vec![
            heading("h2", "The web's best pizza"),
            button("Order now", navigate("/menu")),
            paragraph(
                "Pizza is an absolute delight that brings joy to people of all ages. \
                 Order a pie and taste the difference a verified order makes.",
            ),
        ]
    }

    fn menu_page(&self) -> Vec<Element> {
        let mut options = vec![(String::new(), "choose store".to_string())];
        options.extend(
            self.franchises
                .iter()
                .flat_map(|f| f.stores.iter())
                .map(|s| (s.id.to_string(), s.name.clone())),
        );

        let count = self.cart.items.len();
        let ready = count > 0 && self.cart.store_id.is_some();
        let form = Element::new("form", Role::Form)
            .child(
                Element::new("select", Role::Combobox)
                    .field(Field::Store)
                    .options(options)
                    .value(self.cart.store_id.clone()),
            )
            .child(paragraph(format!("Selected pizzas: {}", count)))
            .child(button("Checkout", Action::Checkout).disabled(!ready));

        let pizzas = self.menu.iter().map(|pizza| {
            link("", Action::AddPizza(pizza.id))
                .child(Element::new("img", Role::Img).text("Image Description"))
                .child(heading("h3", pizza.title.clone()))
                .child(paragraph(pizza.description.clone()))
        });

        vec![
            heading("h2", "Awesome is a click away"),
            paragraph(
                "Pick your store and pizzas from below. Remember to order extra for a midnight party.",
            ),
            form,
            div(pizzas),
        ]
    }

    fn payment(&self) -> Vec<Element> {
        let count = self.cart.items.len();
        let rows = self
            .cart
            .items
            .iter()
            .map(|item| row([cell(item.description.clone()), cell(format_price(item.price))]));
        let total = format_total(self.cart.items.iter().map(|item| &item.price));

        let table = table([header_cell("Pie"), header_cell("Price")], rows).child(
            Element::new("tfoot", Role::Rowgroup)
                .child(row([cell(plural(count, "pie")), cell(total)])),
        );

        vec![
            heading("h2", "So worth it"),
            paragraph(format!("Send me those {} right now!", plural(count, "pizza"))),
            table,
            button("Pay now", Action::PayNow).disabled(count == 0),
            button("Cancel", navigate("/menu")),
        ]
    }

    fn delivery(&self) -> Vec<Element> {
        let Some(confirmation) = &self.last_order else {
            return not_found();
        };
        let order = &confirmation.order;
        let mut content = vec![
            heading("h2", "Here is your JWT Pizza!"),
            paragraph(format!("order ID: {}", order.id)),
            paragraph(format!("pie count: {}", order.items.len())),
            paragraph(format!(
                "total: {}",
                format_total(order.items.iter().map(|item| &item.price))
            )),
            button("Verify", Action::Verify),
            button("Order more", navigate("/menu")),
        ];
        if let Some(verification) = &self.verification {
            content.push(heading("h3", "JWT Pizza - valid"));
            content.push(paragraph(verification.clone()));
        }
        content
    }

    fn value(&self, field: Field) -> Option<String> {
        self.form.get(&field).cloned()
    }

    fn login(&self) -> Vec<Element> {
        vec![
            heading("h2", "Welcome back"),
            Element::new("form", Role::Form)
                .child(input("Email address", Field::Email, self.value(Field::Email)))
                .child(input("Password", Field::Password, self.value(Field::Password)))
                .child(button("Login", Action::Login)),
            paragraph("Are you new? Register instead."),
        ]
    }

    fn register(&self) -> Vec<Element> {
        vec![
            heading("h2", "Welcome to the party"),
            Element::new("form", Role::Form)
                .child(input("Full name", Field::Name, self.value(Field::Name)))
                .child(input("Email address", Field::Email, self.value(Field::Email)))
                .child(input("Password", Field::Password, self.value(Field::Password)))
                .child(button("Register", Action::Register)),
            paragraph("Already have an account? Login instead."),
        ]
    }

    fn diner_dashboard(&self) -> Vec<Element> {
        let Some(user) = self.user() else {
            return not_found();
        };
        let roles: Vec<&str> = user.roles.iter().map(|r| r.role.as_str()).collect();
        vec![
            heading("h2", "Your pizza kitchen"),
            paragraph(format!("name: {}", user.name)),
            paragraph(format!("email: {}", user.email)),
            paragraph(format!("role: {}", roles.join(", "))),
        ]
    }

    fn franchise_dashboard(&self) -> Vec<Element> {
        let Some(franchise) = self.my_franchises.first() else {
            return self.franchise_pitch();
        };

        let rows = franchise.stores.iter().map(|store| {
            row([
                cell(store.name.clone()),
                cell(format_price(store.total_revenue)),
                cell("").child(button(
                    "Close",
                    Action::OpenCloseStore {
                        franchise_id: franchise.id,
                        store_id: store.id,
                    },
                )),
            ])
        });

        vec![
            heading("h2", franchise.name.clone()),
            paragraph(
                "Everything you need to run an JWT Pizza franchise. Your gonna make a lot of money!",
            ),
            table(
                [
                    header_cell("Name"),
                    header_cell("Revenue"),
                    header_cell("Action"),
                ],
                rows,
            ),
            button("Create store", Action::OpenCreateStore(franchise.id)),
        ]
    }

    fn franchise_pitch(&self) -> Vec<Element> {
        let mut call_to_action = paragraph("If you are already a franchisee, please");
        if self.session.is_none() {
            call_to_action = call_to_action
                .child(link("login", Action::LoginThen("/franchise-dashboard".to_string())))
                .child(Element::new("span", Role::Generic).text("using your franchise account"));
        }
        vec![
            heading("h2", "So you want a piece of the pie?"),
            call_to_action,
            paragraph(
                "Call now 800-555-5555 to start your own franchise. \
                 Owning a franchise is a great way to build a lasting legacy.",
            ),
        ]
    }

    /// Franchise and store named by the open dialog
    fn pending_names(&self) -> (String, String) {
        let Some(pending) = &self.pending else {
            return (String::new(), String::new());
        };
        let franchise = self
            .my_franchises
            .iter()
            .chain(self.franchises.iter())
            .find(|f| f.id == pending.franchise_id);
        let store = franchise.and_then(|f| {
            pending
                .store_id
                .and_then(|sid| f.stores.iter().find(|s| s.id == sid))
        });
        (
            franchise.map(|f| f.name.clone()).unwrap_or_default(),
            store.map(|s| s.name.clone()).unwrap_or_default(),
        )
    }

    fn create_store(&self) -> Vec<Element> {
        vec![
            heading("h2", "Create store"),
            Element::new("form", Role::Form)
                .child(input("store name", Field::StoreName, self.value(Field::StoreName)))
                .child(button("Create", Action::CreateStore))
                .child(button("Cancel", navigate("/franchise-dashboard"))),
        ]
    }

    fn close_store(&self) -> Vec<Element> {
        let (franchise, store) = self.pending_names();
        let back = self
            .pending
            .as_ref()
            .map(|p| p.back.clone())
            .unwrap_or_else(|| "/franchise-dashboard".to_string());
        vec![
            heading("h2", "Sorry to see you go"),
            paragraph(format!(
                "Are you sure you want to close the {} store {}? This cannot be restored. \
                 All outstanding revenue will not be refunded.",
                franchise, store
            )),
            button("Close", Action::ConfirmCloseStore),
            button("Cancel", Action::Navigate(back)),
        ]
    }

    fn admin_dashboard(&self) -> Vec<Element> {
        if !self.user().is_some_and(|u| u.is_admin()) {
            return not_found();
        }

        let rows = self.franchises.iter().flat_map(franchise_rows);
        vec![
            heading("h2", "Mama Ricci's kitchen"),
            heading("h3", "Franchises"),
            table(
                [
                    header_cell("Franchise"),
                    header_cell("Franchisee"),
                    header_cell("Store"),
                    header_cell("Revenue"),
                    header_cell("Action"),
                ],
                rows,
            ),
            button("Add Franchise", Action::OpenCreateFranchise),
        ]
    }

    fn create_franchise(&self) -> Vec<Element> {
        if !self.user().is_some_and(|u| u.is_admin()) {
            return not_found();
        }
        vec![
            heading("h2", "Create franchise"),
            Element::new("form", Role::Form)
                .child(input(
                    "franchise name",
                    Field::FranchiseName,
                    self.value(Field::FranchiseName),
                ))
                .child(input(
                    "franchisee admin email",
                    Field::FranchiseAdminEmail,
                    self.value(Field::FranchiseAdminEmail),
                ))
                .child(button("Create", Action::CreateFranchise))
                .child(button("Cancel", navigate("/admin-dashboard"))),
        ]
    }

    fn close_franchise(&self) -> Vec<Element> {
        let (franchise, _) = self.pending_names();
        vec![
            heading("h2", "Sorry to see you go"),
            paragraph(format!(
                "Are you sure you want to close the {} franchise? This will close all associated \
                 stores and cannot be restored. All outstanding revenue will not be refunded.",
                franchise
            )),
            button("Close", Action::ConfirmCloseFranchise),
            button("Cancel", navigate("/admin-dashboard")),
        ]
    }
}

fn franchise_rows(franchise: &Franchise) -> Vec<Element> {
    let admins: Vec<String> = franchise
        .admins
        .iter()
        .map(|a| a.name.clone().unwrap_or_else(|| a.email.clone()))
        .collect();

    let mut rows = vec![row([
        cell(franchise.name.clone()),
        cell(admins.join(", ")),
        cell(""),
        cell(""),
        cell("").child(button("Close", Action::OpenCloseFranchise(franchise.id))),
    ])];
    rows.extend(franchise.stores.iter().map(|store| {
        row([
            cell(""),
            cell(""),
            cell(store.name.clone()),
            cell(format_price(store.total_revenue)),
            cell("").child(button(
                "Close",
                Action::OpenCloseStore {
                    franchise_id: franchise.id,
                    store_id: store.id,
                },
            )),
        ])
    }));
    rows
}

fn footer() -> Element {
    Element::new("footer", Role::Generic)
        .child(
            Element::new("nav", Role::Navigation)
                .label("Info")
                .child(link("Franchise", navigate("/franchise-dashboard")))
                .child(link("About", navigate("/about")))
                .child(link("History", navigate("/history"))),
        )
        .child(paragraph("© 2024 JWT Pizza LTD. All rights reserved."))
}

fn about() -> Vec<Element> {
    vec![
        heading("h2", "The secret sauce"),
        paragraph(
            "At JWT Pizza, our amazing employees are the secret behind our delicious pizzas. \
             They are passionate about their craft and spend every waking moment dreaming \
             about how to make our pizzas even better.",
        ),
        heading("h3", "Our employees"),
        paragraph("JWT Pizza is home to over 100 of the best pizza makers in the world."),
    ]
}

fn history() -> Vec<Element> {
    vec![
        heading("h2", "Mama Rucci, my my"),
        paragraph(
            "It all started in Mama Ricci's kitchen. She would delight all of the cousins \
             with a hot pie in any style they could think of.",
        ),
        paragraph(
            "Pizza has come a long way since then, and the JWT Pizza kitchen now signs \
             every order it bakes.",
        ),
    ]
}

fn docs() -> Vec<Element> {
    let rows = API_DOCS.iter().map(|(method, path, description)| {
        row([cell(*method), cell(*path), cell(*description)])
    });
    vec![
        heading("h2", "JWT Pizza API"),
        table(
            [
                header_cell("Method"),
                header_cell("Path"),
                header_cell("Description"),
            ],
            rows,
        ),
    ]
}

fn not_found() -> Vec<Element> {
    vec![
        heading("h2", "Oops"),
        paragraph("It looks like we have dropped a pizza on the floor. Please try another page."),
    ]
}
