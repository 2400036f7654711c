//! Electronic funds transfer service
//!
//! EFT money arrives as pooled bank deposits matched to a short name and
//! held as credits. Invoices are not settled at creation time; the EFT
//! batch job applies the account's credits oldest-first via
//! [`EftService::apply_credit`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use core_kernel::Money;
use domain_account::PaymentAccount;
use domain_ledger::{
    apply_eft_credits, Invoice, InvoiceReference, InvoiceStatus, Payment, PaymentMethod,
    PaymentSystem, Receipt, Refund,
};

use crate::context::PaymentContext;
use crate::error::PaymentError;
use crate::service::{ensure_no_payment_blockers, PaymentSystemService};

pub struct EftService {
    ctx: PaymentContext,
}

impl EftService {
    pub fn new(ctx: PaymentContext) -> Self {
        Self { ctx }
    }

    fn invoice_number(invoice: &Invoice) -> String {
        format!("EFT{}", &invoice.id.as_uuid().simple().to_string()[..10].to_uppercase())
    }

    /// Applies the account's EFT credits to the invoice, oldest first
    ///
    /// Consuming a credit decrements its remaining amount in the same pass
    /// that records the credit link, so a re-run against the same rows
    /// applies nothing twice. A full application settles the invoice and
    /// fires the post-invoice hook; a partial one leaves it PARTIAL.
    /// Returns the amount applied.
    pub async fn apply_credit(
        &self,
        invoice: &mut Invoice,
        now: DateTime<Utc>,
    ) -> Result<Money, PaymentError> {
        let mut credits = self
            .ctx
            .ledger
            .eft_credits_for_account(invoice.account_id)
            .await
            .map_err(PaymentError::Store)?;

        let application = apply_eft_credits(invoice, &mut credits, now)?;
        if application.applied.is_zero() {
            return Ok(application.applied);
        }

        for credit in &credits {
            self.ctx
                .ledger
                .save_eft_credit(credit)
                .await
                .map_err(PaymentError::Store)?;
        }
        for link in &application.links {
            let mut link = link.clone();
            if invoice.status == InvoiceStatus::Paid {
                link.complete();
            }
            self.ctx
                .ledger
                .save_eft_credit_link(&link)
                .await
                .map_err(PaymentError::Store)?;
        }

        let invoice_number = Self::invoice_number(invoice);
        let payment = Payment::completed(
            invoice.account_id,
            PaymentMethod::Eft,
            PaymentSystem::Fiscal,
            invoice_number.clone(),
            invoice.total,
            application.applied,
            now,
        )
        .with_receipt_number(invoice_number.clone());
        self.ctx
            .ledger
            .save_payment(&payment)
            .await
            .map_err(PaymentError::Store)?;

        // reuse the active reference from an earlier partial application
        let mut reference = match self
            .ctx
            .ledger
            .active_reference_for_number(&invoice_number)
            .await
            .map_err(PaymentError::Store)?
        {
            Some(existing) => existing,
            None => InvoiceReference::new(invoice.id, invoice_number.clone()),
        };
        if invoice.status == InvoiceStatus::Paid {
            reference.complete()?;
        }
        self.ctx
            .ledger
            .save_reference(&reference)
            .await
            .map_err(PaymentError::Store)?;

        let receipt = Receipt::new(invoice.id, invoice_number, application.applied, now);
        self.ctx
            .ledger
            .save_receipt(&receipt)
            .await
            .map_err(PaymentError::Store)?;

        self.ctx
            .ledger
            .save_invoice(invoice)
            .await
            .map_err(PaymentError::Store)?;

        if invoice.status == InvoiceStatus::Paid {
            self.complete_post_invoice(invoice, Some(&reference)).await?;
        }

        Ok(application.applied)
    }
}

#[async_trait]
impl PaymentSystemService for EftService {
    fn context(&self) -> &PaymentContext {
        &self.ctx
    }

    fn payment_method(&self) -> PaymentMethod {
        PaymentMethod::Eft
    }

    fn payment_system(&self) -> PaymentSystem {
        PaymentSystem::Fiscal
    }

    fn default_invoice_status(&self) -> InvoiceStatus {
        InvoiceStatus::Approved
    }

    async fn create_invoice(
        &self,
        account: &PaymentAccount,
        _invoice: &mut Invoice,
    ) -> Result<Option<InvoiceReference>, PaymentError> {
        ensure_no_payment_blockers(&self.ctx, account).await?;
        // settlement waits for matched deposits; the EFT job applies credits
        Ok(None)
    }

    async fn process_refund(
        &self,
        invoice: &mut Invoice,
        _account: &mut PaymentAccount,
        refund: &Refund,
    ) -> Result<InvoiceStatus, PaymentError> {
        if !matches!(invoice.status, InvoiceStatus::Paid | InvoiceStatus::Partial) {
            return Err(PaymentError::Unsupported {
                method: self.payment_method().to_string(),
                operation: format!("refund of {} invoice", invoice.status),
            });
        }
        self.ctx
            .ledger
            .save_refund(refund)
            .await
            .map_err(PaymentError::Store)?;
        // money returns through the short-name refund flow; GL poll confirms
        Ok(InvoiceStatus::RefundRequested)
    }
}
