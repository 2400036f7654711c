//! Statement generation
//!
//! A statement snapshots one account's invoices for one period under one
//! payment method. Invoice sets are partitioned strictly by the payment
//! method active at invoice-creation time: an account that changed method
//! mid-period produces one statement per method, never a combined one.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, InvoiceId, StatementId};
use domain_ledger::{Invoice, PaymentMethod};

use crate::settings::StatementFrequency;

/// Days after a statement period closes before payment falls due
const DUE_DAYS: i64 = 30;

/// One statement period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementPeriod {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
}

/// Computes the period that a statement run on `run_date` covers
///
/// A run covers the cycle that *ended* immediately before the run date:
/// daily covers yesterday, weekly the Monday-Sunday week just finished,
/// monthly the previous calendar month.
pub fn period_for(frequency: StatementFrequency, run_date: NaiveDate) -> StatementPeriod {
    match frequency {
        StatementFrequency::Daily => {
            let day = run_date - Duration::days(1);
            StatementPeriod { from_date: day, to_date: day }
        }
        StatementFrequency::Weekly => {
            let end = core_kernel::temporal::week_start(run_date) - Duration::days(1);
            StatementPeriod {
                from_date: end - Duration::days(6),
                to_date: end,
            }
        }
        StatementFrequency::Monthly => {
            let end = core_kernel::temporal::month_start(run_date) - Duration::days(1);
            StatementPeriod {
                from_date: core_kernel::temporal::month_start(end),
                to_date: end,
            }
        }
    }
}

/// A generated statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub id: StatementId,
    pub account_id: AccountId,
    pub frequency: StatementFrequency,
    /// The single payment method whose invoices this statement carries
    pub payment_method: PaymentMethod,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    /// Date payment of the statement falls due
    pub due_date: NaiveDate,
    /// Set on the cycle-closing statement generated by a method change
    pub is_interim: bool,
    pub invoice_ids: Vec<InvoiceId>,
}

impl Statement {
    fn new(
        account_id: AccountId,
        frequency: StatementFrequency,
        payment_method: PaymentMethod,
        period: StatementPeriod,
        is_interim: bool,
        invoice_ids: Vec<InvoiceId>,
    ) -> Self {
        Self {
            id: StatementId::new_v7(),
            account_id,
            frequency,
            payment_method,
            from_date: period.from_date,
            to_date: period.to_date,
            due_date: period.to_date + Duration::days(DUE_DAYS),
            is_interim,
            invoice_ids,
        }
    }

    pub fn contains(&self, invoice_id: InvoiceId) -> bool {
        self.invoice_ids.contains(&invoice_id)
    }
}

/// Generates the statements for one account and period
///
/// Invoices are bucketed by their own payment method (the method active
/// when each was created); one statement is produced per non-empty
/// bucket. Invoices created outside the period are excluded.
pub fn generate_statements(
    account_id: AccountId,
    frequency: StatementFrequency,
    period: StatementPeriod,
    invoices: &[Invoice],
    is_interim: bool,
) -> Vec<Statement> {
    let mut buckets: Vec<(PaymentMethod, Vec<InvoiceId>)> = Vec::new();

    for invoice in invoices {
        let created = invoice.created_at.date_naive();
        if created < period.from_date || created > period.to_date {
            continue;
        }
        match buckets.iter_mut().find(|(m, _)| *m == invoice.payment_method) {
            Some((_, ids)) => ids.push(invoice.id),
            None => buckets.push((invoice.payment_method, vec![invoice.id])),
        }
    }

    buckets
        .into_iter()
        .map(|(method, ids)| {
            Statement::new(account_id, frequency, method, period, is_interim, ids)
        })
        .collect()
}

/// Fills the gap between the last generated statement and the current run
///
/// Returns the periods that were missed (oldest first), each one cycle
/// long, ending with the period the current run would normally cover.
/// Used when a scheduler outage skipped runs.
pub fn missing_periods(
    frequency: StatementFrequency,
    last_statement_end: Option<NaiveDate>,
    run_date: NaiveDate,
) -> Vec<StatementPeriod> {
    let current = period_for(frequency, run_date);
    let mut periods = vec![current];

    if let Some(last_end) = last_statement_end {
        // walk backwards one cycle at a time until we meet the last statement
        while periods.last().unwrap().from_date > last_end + Duration::days(1) {
            let prior_end = periods.last().unwrap().from_date - Duration::days(1);
            periods.push(period_ending(frequency, prior_end));
            if periods.len() > 120 {
                // runaway guard for corrupt dates
                break;
            }
        }
    }

    periods.reverse();
    periods
}

/// The one-cycle period that ends on the given day
fn period_ending(frequency: StatementFrequency, end: NaiveDate) -> StatementPeriod {
    let from_date = match frequency {
        StatementFrequency::Daily => end,
        StatementFrequency::Weekly => end - Duration::days(6),
        StatementFrequency::Monthly => core_kernel::temporal::month_start(end),
    };
    StatementPeriod { from_date, to_date: end }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Money;
    use domain_ledger::CorpType;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(account_id: AccountId, method: PaymentMethod) -> Invoice {
        Invoice::new(
            account_id,
            method,
            CorpType::new("CP"),
            Money::cad(dec!(20.00)),
            Money::cad(dec!(0)),
            Money::cad(dec!(0)),
        )
    }

    #[test]
    fn test_period_for_monthly_covers_previous_month() {
        let period = period_for(StatementFrequency::Monthly, date(2024, 8, 1));
        assert_eq!(period.from_date, date(2024, 7, 1));
        assert_eq!(period.to_date, date(2024, 7, 31));
    }

    #[test]
    fn test_period_for_weekly_covers_previous_week() {
        // 2024-07-15 is a Monday
        let period = period_for(StatementFrequency::Weekly, date(2024, 7, 15));
        assert_eq!(period.from_date, date(2024, 7, 8));
        assert_eq!(period.to_date, date(2024, 7, 14));
    }

    #[test]
    fn test_statements_partition_by_payment_method() {
        let account_id = AccountId::new();
        let invoices = vec![
            invoice(account_id, PaymentMethod::Pad),
            invoice(account_id, PaymentMethod::Eft),
            invoice(account_id, PaymentMethod::Pad),
        ];

        let today = chrono::Utc::now().date_naive();
        let period = StatementPeriod {
            from_date: today - Duration::days(1),
            to_date: today + Duration::days(1),
        };
        let statements = generate_statements(
            account_id,
            StatementFrequency::Monthly,
            period,
            &invoices,
            false,
        );

        assert_eq!(statements.len(), 2);
        for statement in &statements {
            // no statement mixes methods
            let methods: Vec<_> = invoices
                .iter()
                .filter(|i| statement.contains(i.id))
                .map(|i| i.payment_method)
                .collect();
            assert!(methods.iter().all(|m| *m == statement.payment_method));
        }
        let pad = statements.iter().find(|s| s.payment_method == PaymentMethod::Pad).unwrap();
        assert_eq!(pad.invoice_ids.len(), 2);
    }

    #[test]
    fn test_due_date_trails_period_end() {
        let account_id = AccountId::new();
        let period = StatementPeriod {
            from_date: date(2024, 7, 1),
            to_date: date(2024, 7, 31),
        };
        let invoices = vec![];
        let statements =
            generate_statements(account_id, StatementFrequency::Monthly, period, &invoices, false);
        assert!(statements.is_empty());

        let statement = Statement::new(
            account_id,
            StatementFrequency::Monthly,
            PaymentMethod::Eft,
            period,
            false,
            vec![],
        );
        assert_eq!(statement.due_date, date(2024, 8, 30));
    }

    #[test]
    fn test_missing_periods_fill_gap() {
        // last statement ended June 30, run on Sept 1: July and August missing
        let periods = missing_periods(
            StatementFrequency::Monthly,
            Some(date(2024, 6, 30)),
            date(2024, 9, 1),
        );
        assert_eq!(periods.len(), 2);
        assert_eq!(periods[0].from_date, date(2024, 7, 1));
        assert_eq!(periods[0].to_date, date(2024, 7, 31));
        assert_eq!(periods[1].from_date, date(2024, 8, 1));
        assert_eq!(periods[1].to_date, date(2024, 8, 31));
    }

    #[test]
    fn test_no_gap_returns_single_period() {
        let periods = missing_periods(
            StatementFrequency::Monthly,
            Some(date(2024, 7, 31)),
            date(2024, 9, 1),
        );
        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].from_date, date(2024, 8, 1));
    }
}
