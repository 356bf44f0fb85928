use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CompanyId, UserId};

pub type TicketId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TicketType {
    ManagementReport,
    StrikeOff,
    RegistrationAddressChange,
    Other,
}

impl TicketType {
    pub const ALL: [TicketType; 4] = [
        TicketType::ManagementReport,
        TicketType::StrikeOff,
        TicketType::RegistrationAddressChange,
        TicketType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketType::ManagementReport => "managementReport",
            TicketType::StrikeOff => "strikeOff",
            TicketType::RegistrationAddressChange => "registrationAddressChange",
            TicketType::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl std::fmt::Display for TicketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TicketCategory {
    Accounting,
    Management,
    Corporate,
}

impl TicketCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketCategory::Accounting => "accounting",
            TicketCategory::Management => "management",
            TicketCategory::Corporate => "corporate",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "accounting" => Some(TicketCategory::Accounting),
            "management" => Some(TicketCategory::Management),
            "corporate" => Some(TicketCategory::Corporate),
            _ => None,
        }
    }
}

impl std::fmt::Display for TicketCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TicketStatus {
    Open,
    Resolved,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::Resolved => "resolved",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(TicketStatus::Open),
            "resolved" => Some(TicketStatus::Resolved),
            _ => None,
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub ticket_type: TicketType,
    pub category: TicketCategory,
    pub status: TicketStatus,
    pub company_id: CompanyId,
    pub assignee_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// A freshly opened ticket. The category is whatever the assignment
    /// rule for `ticket_type` says.
    pub fn open(
        ticket_type: TicketType,
        category: TicketCategory,
        company_id: CompanyId,
        assignee_id: UserId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticket_type,
            category,
            status: TicketStatus::Open,
            company_id,
            assignee_id,
            created_at: Utc::now(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == TicketStatus::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_type_roundtrip() {
        for t in TicketType::ALL {
            assert_eq!(TicketType::from_str(t.as_str()), Some(t));
        }
    }

    #[test]
    fn test_ticket_type_rejects_unknown() {
        assert_eq!(TicketType::from_str(""), None);
        assert_eq!(TicketType::from_str("strikeoff"), None);
        assert_eq!(TicketType::from_str("refund"), None);
    }

    #[test]
    fn test_status_and_category_roundtrip() {
        for s in [TicketStatus::Open, TicketStatus::Resolved] {
            assert_eq!(TicketStatus::from_str(s.as_str()), Some(s));
        }
        for c in [
            TicketCategory::Accounting,
            TicketCategory::Management,
            TicketCategory::Corporate,
        ] {
            assert_eq!(TicketCategory::from_str(c.as_str()), Some(c));
        }
    }

    #[test]
    fn test_new_ticket_is_open() {
        let ticket = Ticket::open(
            TicketType::Other,
            TicketCategory::Corporate,
            Uuid::new_v4(),
            Uuid::new_v4(),
        );
        assert!(ticket.is_open());
    }

    #[test]
    fn test_ticket_serializes_camel_case_type() {
        let json = serde_json::to_value(TicketType::RegistrationAddressChange).unwrap();
        assert_eq!(json, "registrationAddressChange");
    }
}
