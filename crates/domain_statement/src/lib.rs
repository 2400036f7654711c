//! Statement Engine
//!
//! Periodically snapshots an account's invoices into statements. Owns the
//! frequency settings (with cycle-boundary transitions and history), the
//! gap-filling rule for missed runs, and the strict partitioning of each
//! statement's invoice set by the payment method active when the invoice
//! was created.

pub mod settings;
pub mod statement;
pub mod ports;
pub mod error;

pub use settings::{StatementFrequency, StatementSettings};
pub use statement::{generate_statements, missing_periods, period_for, Statement, StatementPeriod};
pub use ports::StatementStore;
pub use error::StatementError;
