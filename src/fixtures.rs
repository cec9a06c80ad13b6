//! In-memory pizza service
//!
//! A small stateful fake of the pizza backend and the root page, exposed as
//! a [`MockRouter`]. `serve` puts it behind HTTP so the load driver can run
//! against a local target; tests use it directly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{json, Value};

use crate::common::Result;
use crate::mock::{from_fn, ApiRequest, ApiResponse, Method, MockRouter, RouteAction};

const ROOT_PAGE: &str = "<!doctype html><html lang=\"en\"><head><title>JWT Pizza</title></head>\
<body><div id=\"root\"></div></body></html>";

#[derive(Debug, Clone)]
struct Account {
    id: u64,
    name: String,
    email: String,
    password: String,
    roles: Value,
}

impl Account {
    fn public(&self) -> Value {
        json!({ "id": self.id, "name": self.name, "email": self.email, "roles": self.roles })
    }

    fn is_admin(&self) -> bool {
        self.roles
            .as_array()
            .is_some_and(|roles| roles.iter().any(|r| r["role"] == "admin"))
    }
}

#[derive(Debug, Clone)]
struct StoreRecord {
    id: u64,
    name: String,
    revenue: f64,
}

#[derive(Debug, Clone)]
struct FranchiseRecord {
    id: u64,
    name: String,
    admin_emails: Vec<String>,
    stores: Vec<StoreRecord>,
}

#[derive(Debug, Default)]
struct ServiceData {
    accounts: Vec<Account>,
    /// Token to account id
    sessions: HashMap<String, u64>,
    franchises: Vec<FranchiseRecord>,
    orders: HashMap<u64, Value>,
    next_id: u64,
}

impl ServiceData {
    fn seeded() -> Self {
        let mut data = Self {
            next_id: 100,
            ..Self::default()
        };
        data.accounts = vec![
            Account {
                id: 1,
                name: "常用名字".to_string(),
                email: "a@jwt.com".to_string(),
                password: "admin".to_string(),
                roles: json!([{ "role": "admin" }]),
            },
            Account {
                id: 2,
                name: "pizza diner".to_string(),
                email: "d@jwt.com".to_string(),
                password: "diner".to_string(),
                roles: json!([{ "role": "diner" }]),
            },
            Account {
                id: 3,
                name: "pizza franchisee".to_string(),
                email: "f@jwt.com".to_string(),
                password: "franchisee".to_string(),
                roles: json!([{ "role": "diner" }, { "role": "franchisee", "objectId": 1 }]),
            },
        ];
        data.franchises = vec![FranchiseRecord {
            id: 1,
            name: "pizzaPocket".to_string(),
            admin_emails: vec!["f@jwt.com".to_string()],
            stores: vec![StoreRecord {
                id: 1,
                name: "SLC".to_string(),
                revenue: 0.0,
            }],
        }];
        data
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn account_for(&self, request: &ApiRequest) -> Option<&Account> {
        let token = request
            .header_value("authorization")?
            .strip_prefix("Bearer ")?;
        let id = *self.sessions.get(token)?;
        self.accounts.iter().find(|a| a.id == id)
    }

    fn franchise_json(&self, franchise: &FranchiseRecord) -> Value {
        let admins: Vec<Value> = franchise
            .admin_emails
            .iter()
            .map(|email| match self.accounts.iter().find(|a| &a.email == email) {
                Some(a) => json!({ "id": a.id, "name": a.name, "email": a.email }),
                None => json!({ "email": email }),
            })
            .collect();
        let stores: Vec<Value> = franchise
            .stores
            .iter()
            .map(|s| json!({ "id": s.id, "name": s.name, "totalRevenue": s.revenue }))
            .collect();
        json!({ "id": franchise.id, "name": franchise.name, "admins": admins, "stores": stores })
    }
}

fn menu() -> Value {
    json!([
        { "id": 1, "title": "Veggie", "image": "pizza1.png", "price": 0.0038, "description": "A garden of delight" },
        { "id": 2, "title": "Pepperoni", "image": "pizza2.png", "price": 0.0042, "description": "Spicy treat" },
        { "id": 3, "title": "Margarita", "image": "pizza3.png", "price": 0.0042, "description": "Essential classic" },
        { "id": 4, "title": "Crusty", "image": "pizza4.png", "price": 0.0028, "description": "A dry mouthed favorite" },
        { "id": 5, "title": "Charred Leopard", "image": "pizza5.png", "price": 0.0099, "description": "For those with a darker side" }
    ])
}

fn error(status: u16, message: &str) -> RouteAction {
    RouteAction::Fulfill(ApiResponse::json(&json!({ "message": message })).with_status(status))
}

/// JSON request body, or the 400 the service answers unparsable bodies with
fn json_body(request: &ApiRequest) -> std::result::Result<Value, RouteAction> {
    request.json_body().map_err(|_| error(400, "invalid JSON"))
}

fn ok(value: Value) -> RouteAction {
    RouteAction::Fulfill(ApiResponse::json(&value))
}

/// Numeric path segment at `index` (`/api/franchise/4` has 4 at index 3)
fn segment_id(request: &ApiRequest, index: usize) -> Option<u64> {
    request.path().split('/').nth(index)?.parse().ok()
}

#[derive(Clone)]
struct PizzaService {
    data: Arc<Mutex<ServiceData>>,
}

impl PizzaService {
    fn data(&self) -> MutexGuard<'_, ServiceData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn login(&self, request: &ApiRequest) -> Result<RouteAction> {
        let body = match json_body(request) {
            Ok(body) => body,
            Err(rejected) => return Ok(rejected),
        };
        let mut data = self.data();
        let account = data
            .accounts
            .iter()
            .find(|a| body["email"] == a.email.as_str() && body["password"] == a.password.as_str())
            .cloned();
        let Some(account) = account else {
            return Ok(error(404, "unknown user"));
        };
        let token = format!("tok-{}-{}", account.id, data.next_id());
        data.sessions.insert(token.clone(), account.id);
        Ok(ok(json!({ "user": account.public(), "token": token })))
    }

    fn register(&self, request: &ApiRequest) -> Result<RouteAction> {
        let body = match json_body(request) {
            Ok(body) => body,
            Err(rejected) => return Ok(rejected),
        };
        let (Some(name), Some(email), Some(password)) = (
            body["name"].as_str(),
            body["email"].as_str(),
            body["password"].as_str(),
        ) else {
            return Ok(error(400, "name, email, and password are required"));
        };
        let mut data = self.data();
        let id = data.next_id();
        let account = Account {
            id,
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            roles: json!([{ "role": "diner" }]),
        };
        let token = format!("tok-{}-{}", id, data.next_id());
        data.sessions.insert(token.clone(), id);
        let user = account.public();
        data.accounts.push(account);
        Ok(ok(json!({ "user": user, "token": token })))
    }

    fn logout(&self, request: &ApiRequest) -> Result<RouteAction> {
        let mut data = self.data();
        if data.account_for(request).is_none() {
            return Ok(error(401, "unauthorized"));
        }
        let token = request
            .header_value("authorization")
            .and_then(|h| h.strip_prefix("Bearer "))
            .unwrap_or_default()
            .to_string();
        data.sessions.remove(&token);
        Ok(ok(json!({ "message": "logout successful" })))
    }

    fn franchises(&self) -> Result<RouteAction> {
        let data = self.data();
        let all: Vec<Value> = data.franchises.iter().map(|f| data.franchise_json(f)).collect();
        Ok(ok(Value::Array(all)))
    }

    fn user_franchises(&self, request: &ApiRequest) -> Result<RouteAction> {
        let data = self.data();
        let (Some(account), Some(user_id)) = (data.account_for(request), segment_id(request, 3))
        else {
            return Ok(error(401, "unauthorized"));
        };
        if account.id != user_id && !account.is_admin() {
            return Ok(ok(json!([])));
        }
        let email = data
            .accounts
            .iter()
            .find(|a| a.id == user_id)
            .map(|a| a.email.clone())
            .unwrap_or_default();
        let mine: Vec<Value> = data
            .franchises
            .iter()
            .filter(|f| f.admin_emails.contains(&email))
            .map(|f| data.franchise_json(f))
            .collect();
        Ok(ok(Value::Array(mine)))
    }

    fn create_franchise(&self, request: &ApiRequest) -> Result<RouteAction> {
        let body = match json_body(request) {
            Ok(body) => body,
            Err(rejected) => return Ok(rejected),
        };
        let mut data = self.data();
        if !data.account_for(request).is_some_and(Account::is_admin) {
            return Ok(error(403, "unable to create a franchise"));
        }
        let Some(name) = body["name"].as_str() else {
            return Ok(error(400, "franchise name is required"));
        };
        let admin_emails: Vec<String> = body["admins"]
            .as_array()
            .map(|admins| {
                admins
                    .iter()
                    .filter_map(|a| a["email"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        if let Some(unknown) = admin_emails
            .iter()
            .find(|email| !data.accounts.iter().any(|a| &a.email == *email))
        {
            return Ok(error(404, &format!("unknown user for franchise admin {} provided", unknown)));
        }
        let franchise = FranchiseRecord {
            id: data.next_id(),
            name: name.to_string(),
            admin_emails,
            stores: Vec::new(),
        };
        let created = data.franchise_json(&franchise);
        data.franchises.push(franchise);
        Ok(ok(created))
    }

    fn close_franchise(&self, request: &ApiRequest) -> Result<RouteAction> {
        let mut data = self.data();
        if !data.account_for(request).is_some_and(Account::is_admin) {
            return Ok(error(403, "unable to delete a franchise"));
        }
        let id = segment_id(request, 3);
        data.franchises.retain(|f| Some(f.id) != id);
        Ok(ok(json!({ "message": "franchise deleted" })))
    }

    /// Whether the caller may manage stores of a franchise
    fn may_manage(data: &ServiceData, request: &ApiRequest, franchise_id: u64) -> bool {
        let Some(account) = data.account_for(request) else {
            return false;
        };
        account.is_admin()
            || data
                .franchises
                .iter()
                .any(|f| f.id == franchise_id && f.admin_emails.contains(&account.email))
    }

    fn create_store(&self, request: &ApiRequest) -> Result<RouteAction> {
        let body = match json_body(request) {
            Ok(body) => body,
            Err(rejected) => return Ok(rejected),
        };
        let mut data = self.data();
        let Some(franchise_id) = segment_id(request, 3) else {
            return Ok(error(404, "unknown franchise"));
        };
        if !Self::may_manage(&data, request, franchise_id) {
            return Ok(error(403, "unable to create a store"));
        }
        let name = body["name"].as_str().unwrap_or_default().to_string();
        let id = data.next_id();
        let Some(franchise) = data.franchises.iter_mut().find(|f| f.id == franchise_id) else {
            return Ok(error(404, "unknown franchise"));
        };
        franchise.stores.push(StoreRecord {
            id,
            name: name.clone(),
            revenue: 0.0,
        });
        Ok(ok(json!({ "id": id, "franchiseId": franchise_id, "name": name })))
    }

    fn close_store(&self, request: &ApiRequest) -> Result<RouteAction> {
        let mut data = self.data();
        let (Some(franchise_id), Some(store_id)) = (segment_id(request, 3), segment_id(request, 5))
        else {
            return Ok(error(404, "unknown store"));
        };
        if !Self::may_manage(&data, request, franchise_id) {
            return Ok(error(403, "unable to delete a store"));
        }
        if let Some(franchise) = data.franchises.iter_mut().find(|f| f.id == franchise_id) {
            franchise.stores.retain(|s| s.id != store_id);
        }
        Ok(ok(json!({ "message": "store deleted" })))
    }

    fn order(&self, request: &ApiRequest) -> Result<RouteAction> {
        let body = match json_body(request) {
            Ok(body) => body,
            Err(rejected) => return Ok(rejected),
        };
        let mut data = self.data();
        if data.account_for(request).is_none() {
            return Ok(error(401, "unauthorized"));
        }
        let Some(items) = body["items"].as_array().cloned() else {
            return Ok(error(400, "order requires items"));
        };
        let total: f64 = items.iter().filter_map(|i| i["price"].as_f64()).sum();
        let store_id = body["storeId"]
            .as_str()
            .and_then(|s| s.parse::<u64>().ok())
            .or_else(|| body["storeId"].as_u64());
        if let Some(store) = data
            .franchises
            .iter_mut()
            .flat_map(|f| f.stores.iter_mut())
            .find(|s| Some(s.id) == store_id)
        {
            store.revenue += total;
        }

        let id = data.next_id();
        let order = json!({
            "id": id,
            "franchiseId": body["franchiseId"],
            "storeId": body["storeId"],
            "items": items,
        });
        data.orders.insert(id, order.clone());
        Ok(ok(json!({ "order": order, "jwt": format!("jwt-order-{}", id) })))
    }

    fn verify(&self, request: &ApiRequest) -> Result<RouteAction> {
        let body = match json_body(request) {
            Ok(body) => body,
            Err(rejected) => return Ok(rejected),
        };
        let data = self.data();
        let order = body["jwt"]
            .as_str()
            .and_then(|jwt| jwt.strip_prefix("jwt-order-"))
            .and_then(|id| id.parse::<u64>().ok())
            .and_then(|id| data.orders.get(&id));
        match order {
            Some(order) => Ok(ok(json!({ "message": "valid", "payload": order }))),
            None => Ok(error(400, "invalid")),
        }
    }
}

/// Mock router serving the root page and the pizza API from memory
pub fn pizza_service() -> Result<MockRouter> {
    let service = PizzaService {
        data: Arc::new(Mutex::new(ServiceData::seeded())),
    };
    let mut router = MockRouter::new();

    router.route(
        "http*://*/",
        Some(Method::GET),
        from_fn(|_, _| {
            Ok(RouteAction::Fulfill(ApiResponse {
                status: 200,
                headers: vec![("content-type".to_string(), "text/html".to_string())],
                body: ROOT_PAGE.as_bytes().to_vec(),
            }))
        }),
    )?;

    let s = service.clone();
    router.route("*/**/api/auth", Some(Method::PUT), from_fn(move |req, _| s.login(req)))?;
    let s = service.clone();
    router.route("*/**/api/auth", Some(Method::POST), from_fn(move |req, _| s.register(req)))?;
    let s = service.clone();
    router.route("*/**/api/auth", Some(Method::DELETE), from_fn(move |req, _| s.logout(req)))?;

    router.route("*/**/api/order/menu", Some(Method::GET), from_fn(|_, _| Ok(ok(menu()))))?;
    let s = service.clone();
    router.route("*/**/api/order/verify", Some(Method::POST), from_fn(move |req, _| s.verify(req)))?;
    let s = service.clone();
    router.route("*/**/api/order", Some(Method::POST), from_fn(move |req, _| s.order(req)))?;

    let s = service.clone();
    router.route("*/**/api/franchise", Some(Method::GET), from_fn(move |_, _| s.franchises()))?;
    let s = service.clone();
    router.route(
        "*/**/api/franchise",
        Some(Method::POST),
        from_fn(move |req, _| s.create_franchise(req)),
    )?;
    let s = service.clone();
    router.route(
        "*/**/api/franchise/*",
        Some(Method::GET),
        from_fn(move |req, _| s.user_franchises(req)),
    )?;
    let s = service.clone();
    router.route(
        "*/**/api/franchise/*",
        Some(Method::DELETE),
        from_fn(move |req, _| s.close_franchise(req)),
    )?;
    let s = service.clone();
    router.route(
        "*/**/api/franchise/*/store",
        Some(Method::POST),
        from_fn(move |req, _| s.create_store(req)),
    )?;
    let s = service;
    router.route(
        "*/**/api/franchise/*/store/*",
        Some(Method::DELETE),
        from_fn(move |req, _| s.close_store(req)),
    )?;

    Ok(router)
}
