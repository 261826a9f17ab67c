//! Authenticated caller identity.
//!
//! A [`Principal`] is built once at the trust boundary from verified token
//! claims. Everything downstream reads roles from it instead of looking at
//! raw claim strings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    DistrictAdmin,
    User,
}

impl Role {
    /// Maps the role spellings seen in issued tokens onto [`Role`].
    ///
    /// Accepts any case, an optional `ROLE_` prefix, and `-` or space as a
    /// separator. Unknown roles map to `None`.
    pub fn normalize(raw: &str) -> Option<Role> {
        let upper = raw.trim().to_uppercase().replace(['-', ' '], "_");
        let name = upper.strip_prefix("ROLE_").unwrap_or(upper.as_str());
        match name {
            "ADMIN" | "SUPER_ADMIN" | "SYSTEM_ADMIN" => Some(Role::Admin),
            "DISTRICT_ADMIN" | "DISTRICTADMIN" => Some(Role::DistrictAdmin),
            "USER" => Some(Role::User),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "ADMIN"),
            Role::DistrictAdmin => write!(f, "DISTRICT_ADMIN"),
            Role::User => write!(f, "USER"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: i64,
    pub district_id: Option<i64>,
    pub roles: BTreeSet<Role>,
}

impl Principal {
    pub fn new(user_id: i64, district_id: Option<i64>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            user_id,
            district_id,
            roles: roles.into_iter().collect(),
        }
    }

    /// Builds a principal from raw role strings, dropping unrecognised ones.
    pub fn from_raw_roles<'a>(
        user_id: i64,
        district_id: Option<i64>,
        raw_roles: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let roles = raw_roles
            .into_iter()
            .filter_map(|raw| {
                let role = Role::normalize(raw);
                if role.is_none() {
                    tracing::debug!(role = %raw, "Ignoring unrecognised role claim");
                }
                role
            })
            .collect();
        Self {
            user_id,
            district_id,
            roles,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}
