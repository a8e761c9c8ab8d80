//! Caller identity as resolved by the external identity provider.
//!
//! The engine trusts these values and performs no authentication itself.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{RestaurantId, UserId};

/// Staff or guest role attached to every request and realtime subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Waiter,
    Cashier,
    KitchenStaff,
    Customer,
}

impl Role {
    /// All roles, in declaration order.
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::Manager,
        Role::Waiter,
        Role::Cashier,
        Role::KitchenStaff,
        Role::Customer,
    ];

    /// Returns the wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Waiter => "waiter",
            Role::Cashier => "cashier",
            Role::KitchenStaff => "kitchen_staff",
            Role::Customer => "customer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name.
#[derive(Debug, Clone, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Resolved caller: who, in which role, for which restaurant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
    pub restaurant_id: RestaurantId,
}

impl Identity {
    /// Creates a new identity.
    pub fn new(user_id: impl Into<UserId>, role: Role, restaurant_id: RestaurantId) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            restaurant_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_wire_names() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("chef".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_snake_case() {
        let json = serde_json::to_string(&Role::KitchenStaff).unwrap();
        assert_eq!(json, "\"kitchen_staff\"");
    }
}
