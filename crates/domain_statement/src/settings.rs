//! Statement settings with frequency-transition history
//!
//! Settings rows are append-only: changing frequency closes the current
//! row at the end of its running cycle and opens a new row from the next
//! cycle start. EFT accounts always report monthly.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use core_kernel::temporal::{month_end, week_start};
use core_kernel::AccountId;

use crate::error::StatementError;

/// Statement cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl StatementFrequency {
    /// The default cadence for new accounts
    pub fn default_frequency() -> Self {
        StatementFrequency::Weekly
    }

    /// Last day of the cycle containing `date`
    pub fn cycle_end(&self, date: NaiveDate) -> NaiveDate {
        match self {
            StatementFrequency::Daily => date,
            StatementFrequency::Weekly => week_start(date) + Duration::days(6),
            StatementFrequency::Monthly => month_end(date),
        }
    }
}

/// One row of an account's statement-settings history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementSettings {
    pub account_id: AccountId,
    pub frequency: StatementFrequency,
    /// First day this row is in force
    pub from_date: NaiveDate,
    /// Last day this row is in force; None while current
    pub to_date: Option<NaiveDate>,
    /// Statement notifications enabled for the account
    pub notification_enabled: bool,
    /// Addresses statements and due notices go to
    pub recipients: Vec<String>,
}

impl StatementSettings {
    pub fn new(account_id: AccountId, frequency: StatementFrequency, from_date: NaiveDate) -> Self {
        Self {
            account_id,
            frequency,
            from_date,
            to_date: None,
            notification_enabled: false,
            recipients: Vec::new(),
        }
    }

    pub fn is_current_on(&self, date: NaiveDate) -> bool {
        date >= self.from_date && self.to_date.map_or(true, |end| date <= end)
    }

    /// Closes this row at the end of the cycle containing `today` and
    /// returns the successor row starting the following day
    ///
    /// # Errors
    ///
    /// Returns [`StatementError::SettingsClosed`] when this row has
    /// already been closed.
    pub fn change_frequency(
        &mut self,
        new_frequency: StatementFrequency,
        today: NaiveDate,
    ) -> Result<StatementSettings, StatementError> {
        if self.to_date.is_some() {
            return Err(StatementError::SettingsClosed(self.account_id.to_string()));
        }
        let cycle_end = self.frequency.cycle_end(today);
        self.to_date = Some(cycle_end);

        let mut next = StatementSettings::new(
            self.account_id,
            new_frequency,
            cycle_end + Duration::days(1),
        );
        next.notification_enabled = self.notification_enabled;
        next.recipients = self.recipients.clone();
        Ok(next)
    }

    /// Applies the EFT onboarding side effects: monthly cadence, statement
    /// notifications on, and a backfilled recipient list when none exists
    pub fn enable_for_eft(&mut self, admin_emails: Vec<String>) {
        self.notification_enabled = true;
        if self.recipients.is_empty() {
            self.recipients = admin_emails;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_cycle_end_per_frequency() {
        // 2024-07-11 is a Thursday
        let day = date(2024, 7, 11);
        assert_eq!(StatementFrequency::Daily.cycle_end(day), day);
        assert_eq!(StatementFrequency::Weekly.cycle_end(day), date(2024, 7, 14));
        assert_eq!(StatementFrequency::Monthly.cycle_end(day), date(2024, 7, 31));
    }

    #[test]
    fn test_frequency_change_closes_at_cycle_boundary() {
        let mut current = StatementSettings::new(
            AccountId::new(),
            StatementFrequency::Weekly,
            date(2024, 7, 1),
        );
        let next = current
            .change_frequency(StatementFrequency::Monthly, date(2024, 7, 11))
            .unwrap();

        assert_eq!(current.to_date, Some(date(2024, 7, 14)));
        assert_eq!(next.from_date, date(2024, 7, 15));
        assert_eq!(next.frequency, StatementFrequency::Monthly);

        // a second change on the closed row is refused
        assert!(current
            .change_frequency(StatementFrequency::Daily, date(2024, 7, 12))
            .is_err());
    }

    #[test]
    fn test_eft_enablement_backfills_recipients() {
        let mut settings = StatementSettings::new(
            AccountId::new(),
            StatementFrequency::Monthly,
            date(2024, 7, 1),
        );
        settings.enable_for_eft(vec!["admin@example.com".to_string()]);
        assert!(settings.notification_enabled);
        assert_eq!(settings.recipients.len(), 1);

        // existing recipients are kept
        settings.enable_for_eft(vec!["other@example.com".to_string()]);
        assert_eq!(settings.recipients, vec!["admin@example.com".to_string()]);
    }
}
