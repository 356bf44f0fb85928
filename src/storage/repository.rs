use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Company, CompanyId, Ticket, TicketCategory, TicketId, TicketStatus, TicketType, User, UserRole,
};

use super::MIGRATION_001_INITIAL;

/// Optional filters for ticket queries. `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub ticket_type: Option<TicketType>,
    pub company_id: Option<CompanyId>,
}

/// Repository for persisting and querying companies, users and tickets.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Company operations
    // ========================

    pub async fn save_company(&self, company: &Company) -> Result<()> {
        sqlx::query("INSERT INTO companies (id, name, created_at) VALUES (?, ?, ?)")
            .bind(company.id.to_string())
            .bind(&company.name)
            .bind(timestamp(company.created_at))
            .execute(&self.pool)
            .await
            .context("Failed to save company")?;
        Ok(())
    }

    pub async fn get_company(&self, id: CompanyId) -> Result<Option<Company>> {
        let row = sqlx::query("SELECT id, name, created_at FROM companies WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch company")?;

        row.as_ref().map(Self::row_to_company).transpose()
    }

    pub async fn list_companies(&self) -> Result<Vec<Company>> {
        let rows = sqlx::query("SELECT id, name, created_at FROM companies ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list companies")?;

        rows.iter().map(Self::row_to_company).collect()
    }

    fn row_to_company(row: &sqlx::sqlite::SqliteRow) -> Result<Company> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Company {
            id: Uuid::parse_str(&id_str).context("Invalid company ID")?,
            name: row.get("name"),
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    // ========================
    // User operations
    // ========================

    pub async fn save_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, role, company_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.company_id.to_string())
        .bind(timestamp(user.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save user")?;
        Ok(())
    }

    /// All users of a company, oldest first.
    pub async fn list_users(&self, company_id: CompanyId) -> Result<Vec<User>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, role, company_id, created_at
            FROM users
            WHERE company_id = ?
            ORDER BY created_at
            "#,
        )
        .bind(company_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list users")?;

        rows.iter().map(Self::row_to_user).collect()
    }

    /// Users of a company holding `role`, most recently created first.
    pub async fn list_users_with_role(
        &self,
        company_id: CompanyId,
        role: UserRole,
    ) -> Result<Vec<User>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, role, company_id, created_at
            FROM users
            WHERE company_id = ? AND role = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(company_id.to_string())
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list users by role")?;

        rows.iter().map(Self::row_to_user).collect()
    }

    fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
        let id_str: String = row.get("id");
        let role_str: String = row.get("role");
        let company_id_str: String = row.get("company_id");
        let created_at_str: String = row.get("created_at");

        Ok(User {
            id: Uuid::parse_str(&id_str).context("Invalid user ID")?,
            name: row.get("name"),
            role: UserRole::from_str(&role_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid user role: {}", role_str))?,
            company_id: Uuid::parse_str(&company_id_str).context("Invalid company ID")?,
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    // ========================
    // Ticket operations
    // ========================

    pub async fn save_ticket(&self, ticket: &Ticket) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tickets (id, ticket_type, category, status, company_id, assignee_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(ticket.id.to_string())
        .bind(ticket.ticket_type.as_str())
        .bind(ticket.category.as_str())
        .bind(ticket.status.as_str())
        .bind(ticket.company_id.to_string())
        .bind(ticket.assignee_id.to_string())
        .bind(timestamp(ticket.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save ticket")?;
        Ok(())
    }

    pub async fn get_ticket(&self, id: TicketId) -> Result<Option<Ticket>> {
        let row = sqlx::query(
            r#"
            SELECT id, ticket_type, category, status, company_id, assignee_id, created_at
            FROM tickets
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch ticket")?;

        row.as_ref().map(Self::row_to_ticket).transpose()
    }

    /// The open ticket of `ticket_type` for a company, if any.
    pub async fn find_open_ticket(
        &self,
        company_id: CompanyId,
        ticket_type: TicketType,
    ) -> Result<Option<Ticket>> {
        let row = sqlx::query(
            r#"
            SELECT id, ticket_type, category, status, company_id, assignee_id, created_at
            FROM tickets
            WHERE company_id = ? AND ticket_type = ? AND status = ?
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(company_id.to_string())
        .bind(ticket_type.as_str())
        .bind(TicketStatus::Open.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up open ticket")?;

        row.as_ref().map(Self::row_to_ticket).transpose()
    }

    /// Resolve every open ticket of a company except those of `keep_type`.
    /// Returns the number of tickets changed.
    pub async fn resolve_open_tickets(
        &self,
        company_id: CompanyId,
        keep_type: TicketType,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE tickets SET status = ? WHERE company_id = ? AND status = ? AND ticket_type <> ?",
        )
        .bind(TicketStatus::Resolved.as_str())
        .bind(company_id.to_string())
        .bind(TicketStatus::Open.as_str())
        .bind(keep_type.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to resolve open tickets")?;

        Ok(result.rows_affected())
    }

    /// One page of tickets matching the filter, oldest first.
    pub async fn list_tickets(
        &self,
        filter: &TicketFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<Ticket>> {
        let mut query = String::from(
            "SELECT id, ticket_type, category, status, company_id, assignee_id, created_at FROM tickets WHERE 1=1",
        );
        push_filter_clauses(&mut query, filter);
        query.push_str(" ORDER BY created_at, id LIMIT ? OFFSET ?");

        let company_id_str = filter.company_id.map(|id| id.to_string());

        let mut sql_query = sqlx::query(&query);
        if let Some(status) = filter.status {
            sql_query = sql_query.bind(status.as_str());
        }
        if let Some(ticket_type) = filter.ticket_type {
            sql_query = sql_query.bind(ticket_type.as_str());
        }
        if let Some(ref cid) = company_id_str {
            sql_query = sql_query.bind(cid);
        }
        // SQLite integers are signed; offsets beyond i64 cannot match anything anyway.
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);

        let rows = sql_query
            .bind(i64::from(limit))
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list tickets")?;

        rows.iter().map(Self::row_to_ticket).collect()
    }

    /// Number of tickets matching the filter.
    pub async fn count_tickets(&self, filter: &TicketFilter) -> Result<i64> {
        let mut query = String::from("SELECT COUNT(*) as count FROM tickets WHERE 1=1");
        push_filter_clauses(&mut query, filter);

        let company_id_str = filter.company_id.map(|id| id.to_string());

        let mut sql_query = sqlx::query(&query);
        if let Some(status) = filter.status {
            sql_query = sql_query.bind(status.as_str());
        }
        if let Some(ticket_type) = filter.ticket_type {
            sql_query = sql_query.bind(ticket_type.as_str());
        }
        if let Some(ref cid) = company_id_str {
            sql_query = sql_query.bind(cid);
        }

        let row = sql_query
            .fetch_one(&self.pool)
            .await
            .context("Failed to count tickets")?;

        Ok(row.get("count"))
    }

    fn row_to_ticket(row: &sqlx::sqlite::SqliteRow) -> Result<Ticket> {
        let id_str: String = row.get("id");
        let type_str: String = row.get("ticket_type");
        let category_str: String = row.get("category");
        let status_str: String = row.get("status");
        let company_id_str: String = row.get("company_id");
        let assignee_id_str: String = row.get("assignee_id");
        let created_at_str: String = row.get("created_at");

        Ok(Ticket {
            id: Uuid::parse_str(&id_str).context("Invalid ticket ID")?,
            ticket_type: TicketType::from_str(&type_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid ticket type: {}", type_str))?,
            category: TicketCategory::from_str(&category_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid ticket category: {}", category_str))?,
            status: TicketStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid ticket status: {}", status_str))?,
            company_id: Uuid::parse_str(&company_id_str).context("Invalid company ID")?,
            assignee_id: Uuid::parse_str(&assignee_id_str).context("Invalid assignee ID")?,
            created_at: parse_timestamp(&created_at_str)?,
        })
    }
}

/// Append the WHERE clauses for `filter`. Bind order: status, type, company.
fn push_filter_clauses(query: &mut String, filter: &TicketFilter) {
    if filter.status.is_some() {
        query.push_str(" AND status = ?");
    }
    if filter.ticket_type.is_some() {
        query.push_str(" AND ticket_type = ?");
    }
    if filter.company_id.is_some() {
        query.push_str(" AND company_id = ?");
    }
}

// Fixed-width so that ORDER BY on the text column is chronological.
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid timestamp: {}", s))?
        .with_timezone(&Utc))
}
