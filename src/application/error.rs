use thiserror::Error;

use crate::domain::UserRole;

#[derive(Error, Debug)]
pub enum AppError {
    /// The request itself is malformed; nothing was read or written.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Company not found: {0}")]
    CompanyNotFound(String),

    #[error("Ticket not found: {0}")]
    TicketNotFound(String),

    #[error("Company {company_id} already has an open {ticket_type} ticket")]
    DuplicateTicket {
        company_id: String,
        ticket_type: String,
    },

    #[error("Multiple users with role {role} ({count}). Cannot create a ticket")]
    AmbiguousAssignee { role: UserRole, count: usize },

    #[error("Cannot find a suitable assignee with role {}", roles_list(.roles))]
    NoAssignee { roles: Vec<UserRole> },

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    /// Duplicate tickets and assignee problems are conflicts with the
    /// company's current state rather than bad input.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            AppError::DuplicateTicket { .. }
                | AppError::AmbiguousAssignee { .. }
                | AppError::NoAssignee { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::CompanyNotFound(_) | AppError::TicketNotFound(_)
        )
    }
}

fn roles_list(roles: &[UserRole]) -> String {
    roles
        .iter()
        .map(UserRole::as_str)
        .collect::<Vec<_>>()
        .join(" or ")
}
