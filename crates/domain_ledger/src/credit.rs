//! Credits and their application to invoices
//!
//! Two pools exist: account-level [`Credit`] rows (credit memos, overpayment
//! credits) and short-name [`EftCredit`] rows fed by matched bank deposits.
//! EFT credit application is strictly oldest-created-first; consuming a
//! credit decrements `remaining_amount` in the same step that records the
//! [`EftCreditInvoiceLink`], so a re-run against the same rows applies
//! nothing twice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, CreditId, EftCreditId, EftCreditLinkId, InvoiceId, Money, ShortNameId};

use crate::error::LedgerError;
use crate::invoice::{Invoice, InvoiceStatus};

/// An account-level credit (credit memo or reconciled overpayment)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credit {
    pub id: CreditId,
    pub account_id: AccountId,
    pub amount: Money,
    pub remaining_amount: Money,
    /// True when backed by a fiscal-system credit memo
    pub is_credit_memo: bool,
    /// Fiscal-system document number, when one exists
    pub cfs_identifier: Option<String>,
    pub created_on: DateTime<Utc>,
}

impl Credit {
    pub fn new(account_id: AccountId, amount: Money, is_credit_memo: bool) -> Self {
        Self {
            id: CreditId::new_v7(),
            account_id,
            amount,
            remaining_amount: amount,
            is_credit_memo,
            cfs_identifier: None,
            created_on: Utc::now(),
        }
    }

    pub fn with_cfs_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.cfs_identifier = Some(identifier.into());
        self
    }
}

/// A pooled EFT deposit credit owned by a short name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EftCredit {
    pub id: EftCreditId,
    pub short_name_id: ShortNameId,
    /// Set once the short name has been linked to a billing account
    pub account_id: Option<AccountId>,
    pub amount: Money,
    pub remaining_amount: Money,
    pub created_on: DateTime<Utc>,
}

impl EftCredit {
    pub fn new(short_name_id: ShortNameId, amount: Money, created_on: DateTime<Utc>) -> Self {
        Self {
            id: EftCreditId::new_v7(),
            short_name_id,
            account_id: None,
            amount,
            remaining_amount: amount,
            created_on,
        }
    }

    pub fn linked_to(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    /// Consumes up to `requested`, returning the amount actually taken
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::CreditExhausted`] if the resulting remaining
    /// amount would fall below zero.
    pub fn consume(&mut self, requested: Money) -> Result<Money, LedgerError> {
        let take = self.remaining_amount.min(&requested)?;
        let next = self.remaining_amount.checked_sub(&take)?;
        if next.is_negative() {
            return Err(LedgerError::CreditExhausted(self.id.to_string()));
        }
        self.remaining_amount = next;
        Ok(take)
    }
}

/// Status of one credit-to-invoice application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EftCreditLinkStatus {
    Pending,
    Completed,
    PendingRefund,
    Refunded,
}

/// Records the (possibly partial) application of one credit to one invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EftCreditInvoiceLink {
    pub id: EftCreditLinkId,
    pub eft_credit_id: EftCreditId,
    pub invoice_id: InvoiceId,
    pub status: EftCreditLinkStatus,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
}

impl EftCreditInvoiceLink {
    pub fn new(eft_credit_id: EftCreditId, invoice_id: InvoiceId, amount: Money) -> Self {
        Self {
            id: EftCreditLinkId::new_v7(),
            eft_credit_id,
            invoice_id,
            status: EftCreditLinkStatus::Pending,
            amount,
            created_at: Utc::now(),
        }
    }

    pub fn complete(&mut self) {
        self.status = EftCreditLinkStatus::Completed;
    }

    pub fn mark_pending_refund(&mut self) {
        self.status = EftCreditLinkStatus::PendingRefund;
    }

    pub fn mark_refunded(&mut self) {
        self.status = EftCreditLinkStatus::Refunded;
    }
}

/// Result of applying credits to an invoice
#[derive(Debug)]
pub struct CreditApplication {
    /// One link per credit consumed, in consumption order
    pub links: Vec<EftCreditInvoiceLink>,
    /// Total applied to the invoice
    pub applied: Money,
}

/// Applies EFT credits to an invoice, oldest credit first
///
/// Walks the credits in `created_on` order, consuming `remaining_amount`
/// until the invoice balance reaches zero or the credits are exhausted.
/// If the balance reaches zero the invoice moves to PAID with the payment
/// date set; if credits run out first it moves to PARTIAL. Applying zero
/// (no credits with remaining funds, or an already-settled invoice) leaves
/// the invoice untouched.
pub fn apply_eft_credits(
    invoice: &mut Invoice,
    credits: &mut [EftCredit],
    now: DateTime<Utc>,
) -> Result<CreditApplication, LedgerError> {
    let mut balance = invoice.balance();
    let mut links = Vec::new();
    let mut applied = Money::zero(invoice.total.currency());

    // FIFO by deposit date, ties broken by id for determinism
    let mut order: Vec<usize> = (0..credits.len()).collect();
    order.sort_by_key(|&i| (credits[i].created_on, credits[i].id));

    for index in order {
        if balance.is_zero() || balance.is_negative() {
            break;
        }
        let credit = &mut credits[index];
        if !credit.remaining_amount.is_positive() {
            continue;
        }

        let taken = credit.consume(balance)?;
        balance = balance.checked_sub(&taken)?;
        applied = applied.checked_add(&taken)?;
        links.push(EftCreditInvoiceLink::new(credit.id, invoice.id, taken));
    }

    if applied.is_positive() {
        invoice.paid = invoice.paid.checked_add(&applied)?;
        if invoice.balance().is_zero() {
            invoice.payment_date = Some(now);
            invoice.transition_to(InvoiceStatus::Paid)?;
        } else if invoice.status != InvoiceStatus::Partial {
            invoice.transition_to(InvoiceStatus::Partial)?;
        }
    }

    Ok(CreditApplication { links, applied })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::codes::{CorpType, PaymentMethod};
    use chrono::Duration;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    proptest! {
        /// Consumed total always equals min(invoice balance, available credit),
        /// and earlier credits are exhausted before later ones are touched.
        #[test]
        fn fifo_conservation(
            total_cents in 1i64..500_000i64,
            amounts in proptest::collection::vec(0i64..200_000i64, 1..8)
        ) {
            let mut invoice = Invoice::new(
                AccountId::new(),
                PaymentMethod::Eft,
                CorpType::new("CP"),
                Money::from_minor(total_cents, core_kernel::Currency::CAD),
                Money::cad(Decimal::ZERO),
                Money::cad(Decimal::ZERO),
            );

            let base = Utc::now();
            let short_name = ShortNameId::new();
            let mut pool: Vec<EftCredit> = amounts
                .iter()
                .enumerate()
                .map(|(i, &cents)| EftCredit::new(
                    short_name,
                    Money::from_minor(cents, core_kernel::Currency::CAD),
                    base + Duration::seconds(i as i64),
                ))
                .collect();

            let available: Decimal = pool.iter().map(|c| c.remaining_amount.amount()).sum();
            let balance_before = invoice.balance().amount();

            let result = apply_eft_credits(&mut invoice, &mut pool, Utc::now()).unwrap();

            let expected = balance_before.min(available);
            prop_assert_eq!(result.applied.amount(), expected);

            // FIFO: once any credit retains funds, no later credit was touched
            let mut seen_retained = false;
            for credit in &pool {
                if seen_retained {
                    prop_assert_eq!(credit.remaining_amount, credit.amount);
                }
                if credit.remaining_amount.is_positive() {
                    seen_retained = true;
                }
            }
        }
    }
}
