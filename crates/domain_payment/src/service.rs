//! The payment-system capability trait and shared behavior
//!
//! Method-specific services implement [`PaymentSystemService`]; the shared
//! rules every variant relies on - payment-blocker checks, the
//! payment-completed event hook, the credit-memo refund flow - live here as
//! free functions so no variant carries hidden base-class state.

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use domain_account::{BankDetails, CfsAccount, CfsAccountStatus, PaymentAccount};
use domain_ledger::{
    Credit, Invoice, InvoiceReference, InvoiceStatus, PaymentMethod, PaymentSystem, Refund,
};

use crate::context::PaymentContext;
use crate::error::{classify_fiscal_error, PaymentError};
use crate::ports::{
    ContactInfo, CreditMemoRequest, EmailMessage, LedgerEvent, NotificationTemplate,
    ReceiptResult,
};

/// Capability interface implemented per payment method
#[async_trait]
pub trait PaymentSystemService: Send + Sync {
    /// The context this service operates with
    fn context(&self) -> &PaymentContext;

    /// Static descriptor: the payment method this service settles
    fn payment_method(&self) -> PaymentMethod;

    /// Static descriptor: the back office that settles the money
    fn payment_system(&self) -> PaymentSystem;

    /// The status a new invoice starts in for this method
    fn default_invoice_status(&self) -> InvoiceStatus;

    /// Provisions the local fiscal-account row for this method
    ///
    /// Returns `None` for methods with no fiscal customer profile. The
    /// returned row is PENDING; the account-creation batch job performs
    /// the fiscal-side provisioning. Idempotent: callers reuse an
    /// existing effective row with unchanged bank details.
    async fn create_account(
        &self,
        account: &PaymentAccount,
        _contact: &ContactInfo,
        bank_details: Option<&BankDetails>,
    ) -> Result<Option<CfsAccount>, PaymentError> {
        if !self.payment_method().requires_fiscal_profile() {
            return Ok(None);
        }
        let mut row = CfsAccount::pending(account.id, self.payment_method());
        if let Some(details) = bank_details {
            row = row.with_bank_details(details.clone());
        }
        Ok(Some(row))
    }

    /// Creates (or defers) the fiscal invoice for a new ledger invoice
    ///
    /// Every implementation checks payment blockers first. Deferred
    /// methods return `None`: their fiscal invoices are batched later.
    async fn create_invoice(
        &self,
        account: &PaymentAccount,
        invoice: &mut Invoice,
    ) -> Result<Option<InvoiceReference>, PaymentError>;

    /// Retrieves the settlement receipt for an invoice, when one exists
    async fn get_receipt(
        &self,
        invoice: &Invoice,
    ) -> Result<Option<ReceiptResult>, PaymentError> {
        let reference = self
            .context()
            .ledger
            .references_for_invoice(invoice.id)
            .await
            .map_err(PaymentError::Store)?;
        let Some(reference) = reference.into_iter().last() else {
            return Ok(None);
        };
        self.context()
            .fiscal
            .get_receipt(&reference.invoice_number)
            .await
            .map_err(classify_fiscal_error)
    }

    /// Processes a refund request and returns the status the invoice
    /// should move to
    ///
    /// The caller persists the returned status; implementations only
    /// mutate rows they own (credits, payments, fiscal documents).
    async fn process_refund(
        &self,
        invoice: &mut Invoice,
        account: &mut PaymentAccount,
        refund: &Refund,
    ) -> Result<InvoiceStatus, PaymentError>;

    /// Hook run after an invoice reaches a terminal success state
    ///
    /// Publishes the payment-completed event, at most once per invoice:
    /// callers invoke it only on the transition into the terminal state.
    async fn complete_post_invoice(
        &self,
        invoice: &Invoice,
        _reference: Option<&InvoiceReference>,
    ) -> Result<(), PaymentError> {
        release_payment(self.context(), invoice).await;
        Ok(())
    }
}

/// Fails with [`PaymentError::Blocked`] when the account has unresolved
/// NSF or overdue state
///
/// Runs before any fiscal-system call on every invoice-creation path.
pub async fn ensure_no_payment_blockers(
    ctx: &PaymentContext,
    account: &PaymentAccount,
) -> Result<(), PaymentError> {
    if let Some(cfs) = ctx
        .accounts
        .effective_cfs_account(account.id)
        .await
        .map_err(PaymentError::Store)?
    {
        if cfs.status == CfsAccountStatus::Freeze {
            return Err(PaymentError::Blocked {
                account: account.id.to_string(),
                reason: "account is frozen by NSF handling".to_string(),
            });
        }
    }

    let overdue = ctx
        .ledger
        .account_invoices_by_status(account.id, &[InvoiceStatus::Overdue])
        .await
        .map_err(PaymentError::Store)?;
    if !overdue.is_empty() {
        return Err(PaymentError::Blocked {
            account: account.id.to_string(),
            reason: format!("{} overdue invoices outstanding", overdue.len()),
        });
    }
    Ok(())
}

/// Publishes the payment-completed event for a settled invoice
///
/// Corp types configured out of notification are skipped. Publish
/// failures are logged and surfaced to error tracking by the bus adapter;
/// they never fail the settlement.
pub async fn release_payment(ctx: &PaymentContext, invoice: &Invoice) {
    if ctx
        .config
        .notification_excluded_corp_types
        .iter()
        .any(|c| c == invoice.corp_type.as_str())
    {
        info!(invoice_id = %invoice.id, corp_type = %invoice.corp_type, "payment event excluded for corp type");
        return;
    }
    let event = LedgerEvent::PaymentCompleted {
        invoice_id: invoice.id,
        account_id: invoice.account_id,
        corp_type: invoice.corp_type.as_str().to_string(),
    };
    if let Err(err) = ctx.events.publish(event).await {
        warn!(invoice_id = %invoice.id, error = %err, "payment completed event publish failed");
    }
}

/// Publishes the payment-reversed event, honoring the feature gate
pub async fn release_reversal(ctx: &PaymentContext, invoice: &Invoice) {
    if !ctx.config.enable_reversed_events {
        return;
    }
    let event = LedgerEvent::PaymentReversed {
        invoice_id: invoice.id,
        account_id: invoice.account_id,
    };
    if let Err(err) = ctx.events.publish(event).await {
        warn!(invoice_id = %invoice.id, error = %err, "payment reversed event publish failed");
    }
}

/// The credit-memo refund flow shared by PAD and online banking
///
/// Creates a credit memo in the fiscal system, books a local credit with
/// `remaining_amount = refund amount`, raises the account's aggregate
/// credit balance and notifies the account admins. Returns CREDITED when
/// the whole invoice was consumed, PAID when a partial refund left the
/// invoice settled.
pub async fn refund_as_credit_memo(
    ctx: &PaymentContext,
    invoice: &Invoice,
    account: &mut PaymentAccount,
    refund: &Refund,
) -> Result<InvoiceStatus, PaymentError> {
    let references = ctx
        .ledger
        .references_for_invoice(invoice.id)
        .await
        .map_err(PaymentError::Store)?;
    let reference = references.into_iter().last().ok_or_else(|| {
        PaymentError::Unsupported {
            method: invoice.payment_method.to_string(),
            operation: "credit memo without a fiscal invoice reference".to_string(),
        }
    })?;

    let cfs = ctx
        .accounts
        .effective_cfs_account(account.id)
        .await
        .map_err(PaymentError::Store)?
        .ok_or_else(|| PaymentError::Unsupported {
            method: invoice.payment_method.to_string(),
            operation: "credit memo without a fiscal account".to_string(),
        })?;

    let memo = ctx
        .fiscal
        .create_credit_memo(CreditMemoRequest {
            account_number: cfs.cfs_account.clone().unwrap_or_default(),
            site_number: cfs.cfs_site.clone().unwrap_or_default(),
            invoice_number: reference.invoice_number.clone(),
            amount: refund.amount,
            gl_lines: Vec::new(),
        })
        .await
        .map_err(classify_fiscal_error)?;

    let credit = Credit::new(account.id, refund.amount, true)
        .with_cfs_identifier(memo.credit_memo_number.clone());
    ctx.ledger
        .save_credit(&credit)
        .await
        .map_err(PaymentError::Store)?;

    account.add_credit(refund.amount)?;
    ctx.accounts
        .save_account(account)
        .await
        .map_err(PaymentError::Store)?;

    if let Err(err) = ctx
        .events
        .publish(LedgerEvent::CreditAdded {
            account_id: account.id,
            amount: refund.amount,
        })
        .await
    {
        warn!(account_id = %account.id, error = %err, "credit added event publish failed");
    }

    let recipients = ctx
        .org
        .admin_emails(&account.auth_account_id)
        .await
        .unwrap_or_default();
    if !recipients.is_empty() {
        let message = EmailMessage {
            template: NotificationTemplate::CreditAdded,
            recipients,
            params: json!({
                "accountName": account.name,
                "creditMemoNumber": memo.credit_memo_number,
                "amount": refund.amount.amount(),
            }),
        };
        if let Err(err) = ctx.mailer.send(message).await {
            warn!(account_id = %account.id, error = %err, "credit added mail send failed");
        }
    }

    if refund.amount == invoice.total {
        Ok(InvoiceStatus::Credited)
    } else {
        Ok(InvoiceStatus::Paid)
    }
}
