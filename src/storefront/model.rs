//! Pizza service payloads

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct UserRole {
    pub role: String,
    #[serde(rename = "objectId", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<UserRole>,
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.role == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role("admin")
    }

    /// Initials shown in the header, e.g. "KC" for "Kai Chen"
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .flat_map(char::to_uppercase)
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Pizza {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub image: String,
    pub price: f64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Store {
    pub id: u64,
    pub name: String,
    #[serde(rename = "totalRevenue", default)]
    pub total_revenue: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FranchiseAdmin {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Franchise {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub admins: Vec<FranchiseAdmin>,
    #[serde(default)]
    pub stores: Vec<Store>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateFranchiseRequest {
    pub name: String,
    pub admins: Vec<FranchiseAdmin>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateStoreRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct OrderItem {
    #[serde(rename = "menuId")]
    pub menu_id: u64,
    pub description: String,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub items: Vec<OrderItem>,
    #[serde(rename = "storeId")]
    pub store_id: String,
    #[serde(rename = "franchiseId")]
    pub franchise_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: u64,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderResponse {
    pub order: Order,
    pub jwt: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_request_wire_shape() {
        let request = OrderRequest {
            items: vec![OrderItem {
                menu_id: 1,
                description: "Veggie".to_string(),
                price: 0.0038,
            }],
            store_id: "4".to_string(),
            franchise_id: 2,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "items": [{ "menuId": 1, "description": "Veggie", "price": 0.0038 }],
                "storeId": "4",
                "franchiseId": 2
            })
        );
    }

    #[test]
    fn test_user_roles() {
        let user: User = serde_json::from_value(json!({
            "id": 3, "name": "Kai Chen", "email": "d@jwt.com", "roles": [{ "role": "diner" }]
        }))
        .unwrap();
        assert!(!user.is_admin());
        assert_eq!(user.initials(), "KC");
    }

    #[test]
    fn test_franchise_defaults() {
        let franchise: Franchise =
            serde_json::from_value(json!({ "id": 4, "name": "topSpot" })).unwrap();
        assert!(franchise.stores.is_empty());
        assert!(franchise.admins.is_empty());
    }
}
