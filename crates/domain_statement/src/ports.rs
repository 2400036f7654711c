//! Statement persistence port

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{AccountId, DomainPort, PortError};

use crate::settings::StatementSettings;
use crate::statement::Statement;

/// Persisted statement state
#[async_trait]
pub trait StatementStore: DomainPort {
    /// The settings row in force for the account on the given date
    async fn settings_on(
        &self,
        account_id: AccountId,
        date: NaiveDate,
    ) -> Result<Option<StatementSettings>, PortError>;

    async fn save_settings(&self, settings: &StatementSettings) -> Result<(), PortError>;

    /// End date of the account's most recent statement, if any
    async fn latest_statement_end(
        &self,
        account_id: AccountId,
    ) -> Result<Option<NaiveDate>, PortError>;

    /// Statements whose due date falls on or before the given date and
    /// which have not yet been through overdue handling
    async fn statements_due_by(&self, date: NaiveDate) -> Result<Vec<Statement>, PortError>;

    async fn save_statement(&self, statement: &Statement) -> Result<(), PortError>;
}
