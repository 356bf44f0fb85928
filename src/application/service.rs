use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{
    apply_step, rule_for, Company, CompanyId, StepOutcome, Ticket, TicketId, TicketStatus,
    TicketType, User, UserRole,
};
use crate::storage::{Repository, TicketFilter};

use super::AppError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 20;

/// Application service for companies, users and tickets.
/// This is the primary interface for any client (CLI, API, etc.).
#[derive(Clone)]
pub struct TicketService {
    repo: Repository,
}

/// Query for listing tickets
#[derive(Debug, Clone)]
pub struct TicketQuery {
    pub page: u32,
    pub limit: u32,
    pub status: Option<TicketStatus>,
    pub ticket_type: Option<TicketType>,
    pub company_id: Option<CompanyId>,
}

impl Default for TicketQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            status: None,
            ticket_type: None,
            company_id: None,
        }
    }
}

/// One page of tickets plus the total number of matches
#[derive(Debug, Clone, Serialize)]
pub struct TicketPage {
    pub items: Vec<Ticket>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
}

impl TicketService {
    /// Create a new ticket service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Company operations
    // ========================

    pub async fn create_company(&self, name: &str) -> Result<Company, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("company name is required".to_string()));
        }

        let company = Company::new(name);
        self.repo.save_company(&company).await?;
        info!(company_id = %company.id, name = %company.name, "Created company");
        Ok(company)
    }

    pub async fn get_company(&self, id: CompanyId) -> Result<Company, AppError> {
        self.repo
            .get_company(id)
            .await?
            .ok_or_else(|| AppError::CompanyNotFound(id.to_string()))
    }

    pub async fn list_companies(&self) -> Result<Vec<Company>, AppError> {
        Ok(self.repo.list_companies().await?)
    }

    // ========================
    // User operations
    // ========================

    pub async fn create_user(
        &self,
        name: &str,
        role: UserRole,
        company_id: CompanyId,
    ) -> Result<User, AppError> {
        let company = self.get_company(company_id).await?;
        let user = User::new(name.trim(), role, company.id);
        self.repo.save_user(&user).await?;
        info!(user_id = %user.id, %role, company_id = %company.id, "Created user");
        Ok(user)
    }

    pub async fn list_users(&self, company_id: CompanyId) -> Result<Vec<User>, AppError> {
        let company = self.get_company(company_id).await?;
        Ok(self.repo.list_users(company.id).await?)
    }

    // ========================
    // Ticket operations
    // ========================

    /// Create a ticket for a company and assign it.
    ///
    /// The type is validated before anything is read. Then, in order: the
    /// company must exist, a unique-per-company type must not already be
    /// open, exactly one assignee must be resolved by the type's role rule,
    /// a strike-off resolves the company's other open tickets, and finally
    /// the ticket is stored.
    ///
    /// None of this runs in a transaction, so two concurrent requests for
    /// the same company can both pass the checks.
    pub async fn create_ticket(
        &self,
        ticket_type: &str,
        company_id: CompanyId,
    ) -> Result<Ticket, AppError> {
        let ticket_type = parse_ticket_type(ticket_type)?;
        let rule = rule_for(ticket_type);

        let company = self.get_company(company_id).await?;

        if rule.unique_open_per_company {
            if let Some(existing) = self.repo.find_open_ticket(company.id, ticket_type).await? {
                debug!(existing = %existing.id, "Rejecting duplicate ticket");
                return Err(AppError::DuplicateTicket {
                    company_id: company.id.to_string(),
                    ticket_type: ticket_type.to_string(),
                });
            }
        }

        let assignee = self.resolve_assignee(company.id, ticket_type).await?;

        if rule.resolves_open_tickets {
            let resolved = self
                .repo
                .resolve_open_tickets(company.id, ticket_type)
                .await?;
            info!(company_id = %company.id, resolved, "Resolved open tickets for strike-off");
        }

        let ticket = Ticket::open(ticket_type, rule.category, company.id, assignee.id);
        self.repo.save_ticket(&ticket).await?;

        info!(
            ticket_id = %ticket.id,
            ticket_type = %ticket.ticket_type,
            category = %ticket.category,
            assignee_id = %ticket.assignee_id,
            "Created ticket"
        );
        Ok(ticket)
    }

    /// Walk the type's role steps until one yields exactly one user.
    async fn resolve_assignee(
        &self,
        company_id: CompanyId,
        ticket_type: TicketType,
    ) -> Result<User, AppError> {
        let rule = rule_for(ticket_type);

        for step in rule.steps {
            let candidates = self
                .repo
                .list_users_with_role(company_id, step.role)
                .await?;

            match apply_step(step, &candidates) {
                StepOutcome::Assigned(user) => return Ok(user.clone()),
                StepOutcome::Ambiguous { role, count } => {
                    return Err(AppError::AmbiguousAssignee { role, count });
                }
                StepOutcome::Vacant => {
                    debug!(role = %step.role, "No user with role, trying next");
                }
            }
        }

        Err(AppError::NoAssignee {
            roles: rule.steps.iter().map(|s| s.role).collect(),
        })
    }

    pub async fn get_ticket(&self, id: TicketId) -> Result<Ticket, AppError> {
        self.repo
            .get_ticket(id)
            .await?
            .ok_or_else(|| AppError::TicketNotFound(id.to_string()))
    }

    /// List tickets page by page. Pages start at 1.
    pub async fn list_tickets(&self, query: TicketQuery) -> Result<TicketPage, AppError> {
        if query.page < 1 {
            return Err(AppError::Validation("page must be at least 1".to_string()));
        }
        if query.limit < 1 {
            return Err(AppError::Validation("limit must be at least 1".to_string()));
        }

        let filter = TicketFilter {
            status: query.status,
            ticket_type: query.ticket_type,
            company_id: query.company_id,
        };
        let offset = u64::from(query.page - 1) * u64::from(query.limit);

        let items = self.repo.list_tickets(&filter, query.limit, offset).await?;
        let total = self.repo.count_tickets(&filter).await?;

        Ok(TicketPage {
            items,
            page: query.page,
            limit: query.limit,
            total,
        })
    }
}

fn parse_ticket_type(raw: &str) -> Result<TicketType, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::Validation("ticket type is required".to_string()));
    }
    TicketType::from_str(raw).ok_or_else(|| {
        AppError::Validation(format!(
            "invalid ticket type '{}'; expected one of: {}",
            raw,
            TicketType::ALL.map(|t| t.as_str()).join(", ")
        ))
    })
}
