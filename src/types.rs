/// Shared types used across the codebase

use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error raised when an identifier from a path segment or token claim is malformed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} id: {value}")]
pub struct InvalidId {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a typed integer identifier backed by an `INTEGER` column.
///
/// Ids are parsed once at the HTTP boundary (path segments, JSON bodies, JWT
/// claims) and flow through the services without further coercion. Both
/// `FromStr` and `Deserialize` reject non-positive values.
macro_rules! typed_id {
    ($name:ident, $kind:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub i32);

        impl $name {
            pub const fn get(self) -> i32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let raw = i32::deserialize(deserializer)?;
                if raw > 0 {
                    Ok(Self(raw))
                } else {
                    Err(de::Error::custom(InvalidId {
                        kind: $kind,
                        value: raw.to_string(),
                    }))
                }
            }
        }

        impl FromStr for $name {
            type Err = InvalidId;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().parse::<i32>() {
                    Ok(v) if v > 0 => Ok(Self(v)),
                    _ => Err(InvalidId {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

typed_id!(CompanyId, "company");
typed_id!(AccountId, "account");
typed_id!(MenuId, "menu");
typed_id!(RoleId, "role");

/// The headquarters company; never deleted or moved
pub const ROOT_COMPANY_ID: CompanyId = CompanyId(1);

/// The built-in super-administrator account; never mutated through the API
pub const PROTECTED_ACCOUNT_ID: AccountId = AccountId(1);
