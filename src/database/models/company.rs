use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::tree::TreeNode;
use crate::types::CompanyId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub parent_id: Option<CompanyId>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl TreeNode for Company {
    type Id = CompanyId;
    type Key = CompanyId;

    fn node_id(&self) -> CompanyId {
        self.id
    }

    fn parent_id(&self) -> Option<CompanyId> {
        self.parent_id
    }

    fn sort_key(&self) -> CompanyId {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCompany {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<CompanyId>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Partial update; `parent_id: null` moves the company to the top level
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCompany {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub parent_id: Option<Option<CompanyId>>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_distinguishes_null_parent_from_missing() {
        let missing: UpdateCompany = serde_json::from_str(r#"{"name":"X"}"#).unwrap();
        assert_eq!(missing.parent_id, None);

        let cleared: UpdateCompany = serde_json::from_str(r#"{"parent_id":null}"#).unwrap();
        assert_eq!(cleared.parent_id, Some(None));

        let moved: UpdateCompany = serde_json::from_str(r#"{"parent_id":4}"#).unwrap();
        assert_eq!(moved.parent_id, Some(Some(CompanyId(4))));
    }
}
