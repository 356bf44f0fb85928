use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::{
    ReportRunner, ReportScope, TicketQuery, TicketService, DEFAULT_LIMIT, DEFAULT_PAGE,
};
use crate::domain::{Ticket, TicketStatus, TicketType, UserRole};
use crate::io::LedgerSnapshot;

/// Backoffice - support tickets and ledger reports
#[derive(Parser)]
#[command(name = "backoffice")]
#[command(about = "Support ticket assignment and ledger report generation")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "backoffice.db", global = true)]
    pub database: String,

    /// Directory holding the ledger CSV batches
    #[arg(long, default_value = "ledger", global = true)]
    pub input_dir: PathBuf,

    /// Directory the reports are written to
    #[arg(long, default_value = "out", global = true)]
    pub output_dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Company management commands
    #[command(subcommand)]
    Company(CompanyCommands),

    /// User management commands
    #[command(subcommand)]
    User(UserCommands),

    /// Ticket commands
    #[command(subcommand)]
    Ticket(TicketCommands),

    /// Ledger report commands
    #[command(subcommand)]
    Report(ReportCommands),
}

#[derive(Subcommand)]
pub enum CompanyCommands {
    /// Create a new company
    Create {
        /// Company name
        name: String,
    },

    /// List all companies
    List,
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user for a company
    Create {
        /// User name
        name: String,

        /// Role: accountant, corporateSecretary, director
        #[arg(short, long)]
        role: String,

        /// Company ID
        #[arg(short, long)]
        company: String,
    },

    /// List the users of a company
    List {
        /// Company ID
        #[arg(short, long)]
        company: String,
    },
}

#[derive(Subcommand)]
pub enum TicketCommands {
    /// Create and assign a ticket
    Create {
        /// Ticket type: managementReport, strikeOff, registrationAddressChange, other
        #[arg(short = 't', long = "type", default_value = "")]
        ticket_type: String,

        /// Company ID
        #[arg(short, long)]
        company: String,

        /// Print the ticket as JSON
        #[arg(long)]
        json: bool,
    },

    /// List tickets
    List {
        /// Page number, starting at 1
        #[arg(long, default_value_t = DEFAULT_PAGE)]
        page: u32,

        /// Tickets per page
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: u32,

        /// Filter by status: open, resolved
        #[arg(long)]
        status: Option<String>,

        /// Filter by ticket type
        #[arg(short = 't', long = "type")]
        ticket_type: Option<String>,

        /// Filter by company ID
        #[arg(short, long)]
        company: Option<String>,

        /// Print the page as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Generate reports from the ledger files
    Run {
        /// Reports to generate: accounts, yearly, fs (default: all)
        scopes: Vec<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                TicketService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Company(cmd) => {
                let service = TicketService::connect(&self.database).await?;
                run_company_command(&service, cmd).await?;
            }

            Commands::User(cmd) => {
                let service = TicketService::connect(&self.database).await?;
                run_user_command(&service, cmd).await?;
            }

            Commands::Ticket(cmd) => {
                let service = TicketService::connect(&self.database).await?;
                run_ticket_command(&service, cmd).await?;
            }

            Commands::Report(ReportCommands::Run { scopes }) => {
                run_report_command(&self.input_dir, &self.output_dir, &scopes).await?;
            }
        }

        Ok(())
    }
}

async fn run_company_command(service: &TicketService, cmd: CompanyCommands) -> Result<()> {
    match cmd {
        CompanyCommands::Create { name } => {
            let company = service.create_company(&name).await?;
            println!("Created company: {} ({})", company.name, company.id);
        }

        CompanyCommands::List => {
            let companies = service.list_companies().await?;
            if companies.is_empty() {
                println!("No companies found.");
            } else {
                println!("{:<38} {:<30}", "ID", "NAME");
                println!("{}", "-".repeat(68));
                for company in companies {
                    println!("{:<38} {:<30}", company.id, company.name);
                }
            }
        }
    }
    Ok(())
}

async fn run_user_command(service: &TicketService, cmd: UserCommands) -> Result<()> {
    match cmd {
        UserCommands::Create {
            name,
            role,
            company,
        } => {
            let role = UserRole::from_str(&role).ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid role '{}'. Valid roles: accountant, corporateSecretary, director",
                    role
                )
            })?;
            let company_id = parse_id(&company)?;

            let user = service.create_user(&name, role, company_id).await?;
            println!("Created user: {} ({}, {})", user.name, user.role, user.id);
        }

        UserCommands::List { company } => {
            let users = service.list_users(parse_id(&company)?).await?;
            if users.is_empty() {
                println!("No users found.");
            } else {
                println!("{:<38} {:<20} {:<20}", "ID", "NAME", "ROLE");
                println!("{}", "-".repeat(78));
                for user in users {
                    println!("{:<38} {:<20} {:<20}", user.id, user.name, user.role);
                }
            }
        }
    }
    Ok(())
}

async fn run_ticket_command(service: &TicketService, cmd: TicketCommands) -> Result<()> {
    match cmd {
        TicketCommands::Create {
            ticket_type,
            company,
            json,
        } => {
            let company_id = parse_id(&company)?;
            let ticket = service.create_ticket(&ticket_type, company_id).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&ticket)?);
            } else {
                println!(
                    "Created ticket: {} ({}, {}) assigned to {}",
                    ticket.id, ticket.ticket_type, ticket.category, ticket.assignee_id
                );
            }
        }

        TicketCommands::List {
            page,
            limit,
            status,
            ticket_type,
            company,
            json,
        } => {
            let status = status
                .map(|s| {
                    TicketStatus::from_str(&s).ok_or_else(|| {
                        anyhow::anyhow!("Invalid status '{}'. Valid: open, resolved", s)
                    })
                })
                .transpose()?;
            let ticket_type = ticket_type
                .map(|t| {
                    TicketType::from_str(&t)
                        .ok_or_else(|| anyhow::anyhow!("Invalid ticket type '{}'", t))
                })
                .transpose()?;
            let company_id = company.as_deref().map(parse_id).transpose()?;

            let result = service
                .list_tickets(TicketQuery {
                    page,
                    limit,
                    status,
                    ticket_type,
                    company_id,
                })
                .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else if result.items.is_empty() {
                println!("No tickets found.");
            } else {
                print_ticket_table(&result.items);
                println!(
                    "Page {} ({} per page), {} ticket(s) total",
                    result.page, result.limit, result.total
                );
            }
        }
    }
    Ok(())
}

fn print_ticket_table(tickets: &[Ticket]) {
    println!(
        "{:<38} {:<26} {:<11} {:<9} {:<38}",
        "ID", "TYPE", "CATEGORY", "STATUS", "ASSIGNEE"
    );
    println!("{}", "-".repeat(126));
    for ticket in tickets {
        println!(
            "{:<38} {:<26} {:<11} {:<9} {:<38}",
            ticket.id, ticket.ticket_type, ticket.category, ticket.status, ticket.assignee_id
        );
    }
}

async fn run_report_command(
    input_dir: &std::path::Path,
    output_dir: &std::path::Path,
    scopes: &[String],
) -> Result<()> {
    let scopes = if scopes.is_empty() {
        ReportScope::ALL.to_vec()
    } else {
        scopes
            .iter()
            .map(|s| {
                ReportScope::from_str(s).ok_or_else(|| {
                    anyhow::anyhow!("Unknown report '{}'. Valid: accounts, yearly, fs", s)
                })
            })
            .collect::<Result<Vec<_>>>()?
    };

    let snapshot = Arc::new(
        LedgerSnapshot::load_async(input_dir)
            .await
            .with_context(|| format!("Failed to load ledger from {}", input_dir.display()))?,
    );
    println!(
        "Loaded {} entries from {} file(s), {} row(s) skipped, at {}",
        snapshot.entries.len(),
        snapshot.files.len(),
        snapshot.skipped,
        snapshot.loaded_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let runner = ReportRunner::new(output_dir);

    let handles: Vec<_> = scopes
        .into_iter()
        .map(|scope| runner.trigger(scope, Arc::clone(&snapshot)))
        .collect();

    let mut failed = 0;
    for handle in handles {
        let scope = handle.scope();
        let state = handle.wait().await;
        if state.is_error() {
            failed += 1;
        }
        println!(
            "{:<10} {:<40} {}",
            scope,
            runner.output_path(scope).display(),
            state
        );
    }

    if failed > 0 {
        anyhow::bail!("{} report(s) failed", failed);
    }
    Ok(())
}

fn parse_id(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s.trim()).with_context(|| format!("Invalid ID '{}' (expected UUID)", s))
}
