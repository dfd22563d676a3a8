use serde::{Deserialize, Serialize};

/// Marketplace order snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderMagento {
    pub order_id: String,
    #[serde(default)]
    pub courses: Vec<ItemMagento>,
}

/// Course line item of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMagento {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub price: f64,
}

/// Marketplace user snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMagento {
    pub user_id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl UserMagento {
    /// True when the user carries a non-blank phone number
    pub fn has_phone(&self) -> bool {
        self.phone
            .as_deref()
            .map(|p| !p.trim().is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(phone: Option<&str>) -> UserMagento {
        UserMagento {
            user_id: "u1".to_string(),
            full_name: None,
            email: None,
            phone: phone.map(str::to_string),
        }
    }

    #[test]
    fn test_has_phone() {
        assert!(user(Some("0123456789")).has_phone());
        assert!(!user(Some("   ")).has_phone());
        assert!(!user(Some("")).has_phone());
        assert!(!user(None).has_phone());
    }

    #[test]
    fn test_order_without_courses_deserializes() {
        let order: OrderMagento = serde_json::from_str(r#"{"order_id":"o1"}"#).unwrap();
        assert!(order.courses.is_empty());
    }
}
