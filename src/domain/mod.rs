mod assignment;
mod company;
mod ledger;
mod money;
mod ticket;
mod user;

pub use assignment::*;
pub use company::*;
pub use ledger::*;
pub use money::*;
pub use ticket::*;
pub use user::*;
