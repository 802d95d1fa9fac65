//! Cart ownership scope.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Storage key used for the anonymous cart.
pub const GUEST_CART_KEY: &str = "cart_guest";

/// Who owns the active cart: an anonymous visitor or a signed-in user.
///
/// Exactly one cart exists per identity; switching identity replaces the
/// whole cart rather than merging two.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum Identity {
    /// Not signed in.
    #[default]
    Guest,
    /// Signed-in user.
    User(UserId),
}

impl Identity {
    /// Build an identity from an optional current user.
    #[must_use]
    pub fn from_user(user: Option<UserId>) -> Self {
        user.map_or(Self::Guest, Self::User)
    }

    /// Whether this is the anonymous identity.
    #[must_use]
    pub const fn is_guest(&self) -> bool {
        matches!(self, Self::Guest)
    }

    /// The signed-in user, if any.
    #[must_use]
    pub const fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Guest => None,
            Self::User(id) => Some(id),
        }
    }

    /// Key under which this identity's cart is persisted.
    ///
    /// ```
    /// use emporium_core::{Identity, UserId};
    ///
    /// assert_eq!(Identity::Guest.storage_key(), "cart_guest");
    /// assert_eq!(Identity::User(UserId::new("42")).storage_key(), "cart_user_42");
    /// ```
    #[must_use]
    pub fn storage_key(&self) -> String {
        match self {
            Self::Guest => GUEST_CART_KEY.to_owned(),
            Self::User(id) => format!("cart_user_{id}"),
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Guest => f.write_str("guest"),
            Self::User(id) => write!(f, "user:{id}"),
        }
    }
}
