// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use backoffice::application::TicketService;
use backoffice::domain::{Company, User, UserRole};
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(TicketService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = TicketService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Create a company staffed with the given roles, in creation order.
pub async fn staffed_company(
    service: &TicketService,
    roles: &[UserRole],
) -> Result<(Company, Vec<User>)> {
    let company = service.create_company("Acme Pte Ltd").await?;
    let mut users = Vec::new();
    for (i, role) in roles.iter().enumerate() {
        let user = service
            .create_user(&format!("{} {}", role, i + 1), *role, company.id)
            .await?;
        users.push(user);
    }
    Ok((company, users))
}

/// Write a ledger batch file into `dir`.
pub fn write_ledger(dir: &Path, name: &str, rows: &[&str]) -> Result<()> {
    let mut contents = rows.join("\n");
    contents.push('\n');
    std::fs::write(dir.join(name), contents)?;
    Ok(())
}
