// Application layer - use cases and orchestration.
// Ticket creation and listing go through `TicketService`; ledger reports
// run through `ReportRunner` over an explicitly loaded `LedgerSnapshot`.

pub mod error;
pub mod reporting;
pub mod service;

pub use error::*;
pub use reporting::*;
pub use service::*;
