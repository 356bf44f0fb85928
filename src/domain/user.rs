use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CompanyId;

pub type UserId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserRole {
    /// Prepares management reports
    Accountant,
    /// Handles registry filings and address changes
    CorporateSecretary,
    /// Company officer; last resort for corporate work, sole owner of strike-offs
    Director,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Accountant => "accountant",
            UserRole::CorporateSecretary => "corporateSecretary",
            UserRole::Director => "director",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "accountant" => Some(UserRole::Accountant),
            "corporateSecretary" => Some(UserRole::CorporateSecretary),
            "director" => Some(UserRole::Director),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: UserRole,
    pub company_id: CompanyId,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>, role: UserRole, company_id: CompanyId) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            role,
            company_id,
            created_at: Utc::now(),
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}
