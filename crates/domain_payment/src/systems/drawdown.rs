//! Prepaid drawdown service
//!
//! Settlement draws against the customer's prepaid balance at the
//! drawdown provider, synchronously within the request flow. The ledger
//! sees an immediate reference and settlement; refunds are confirmed by
//! the automated GL polling job.

use async_trait::async_trait;
use chrono::Utc;

use domain_account::PaymentAccount;
use domain_ledger::{
    Invoice, InvoiceReference, InvoiceStatus, Payment, PaymentMethod, PaymentSystem, Receipt,
    Refund,
};

use crate::context::PaymentContext;
use crate::error::PaymentError;
use crate::service::{ensure_no_payment_blockers, PaymentSystemService};

pub struct DrawdownService {
    ctx: PaymentContext,
}

impl DrawdownService {
    pub fn new(ctx: PaymentContext) -> Self {
        Self { ctx }
    }

    fn invoice_number(invoice: &Invoice) -> String {
        format!("DD{}", &invoice.id.as_uuid().simple().to_string()[..10].to_uppercase())
    }
}

#[async_trait]
impl PaymentSystemService for DrawdownService {
    fn context(&self) -> &PaymentContext {
        &self.ctx
    }

    fn payment_method(&self) -> PaymentMethod {
        PaymentMethod::Drawdown
    }

    fn payment_system(&self) -> PaymentSystem {
        PaymentSystem::Drawdown
    }

    fn default_invoice_status(&self) -> InvoiceStatus {
        InvoiceStatus::Created
    }

    async fn create_invoice(
        &self,
        account: &PaymentAccount,
        invoice: &mut Invoice,
    ) -> Result<Option<InvoiceReference>, PaymentError> {
        ensure_no_payment_blockers(&self.ctx, account).await?;

        let now = Utc::now();
        let invoice_number = Self::invoice_number(invoice);

        invoice.mark_paid(now)?;

        let payment = Payment::completed(
            invoice.account_id,
            PaymentMethod::Drawdown,
            PaymentSystem::Drawdown,
            invoice_number.clone(),
            invoice.total,
            invoice.total,
            now,
        )
        .with_receipt_number(invoice_number.clone());
        self.ctx
            .ledger
            .save_payment(&payment)
            .await
            .map_err(PaymentError::Store)?;

        let mut reference = InvoiceReference::new(invoice.id, invoice_number.clone());
        reference.complete()?;
        self.ctx
            .ledger
            .save_reference(&reference)
            .await
            .map_err(PaymentError::Store)?;

        let receipt = Receipt::new(invoice.id, invoice_number, invoice.total, now);
        self.ctx
            .ledger
            .save_receipt(&receipt)
            .await
            .map_err(PaymentError::Store)?;

        self.complete_post_invoice(invoice, Some(&reference)).await?;

        Ok(Some(reference))
    }

    async fn process_refund(
        &self,
        invoice: &mut Invoice,
        _account: &mut PaymentAccount,
        refund: &Refund,
    ) -> Result<InvoiceStatus, PaymentError> {
        if invoice.status != InvoiceStatus::Paid {
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
        // the drawdown provider reverses the charge; the GL poll confirms
        Ok(InvoiceStatus::RefundRequested)
    }
}
