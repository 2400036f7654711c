//! Direct pay (credit card) service
//!
//! Settlement happens synchronously through the payment-gateway redirect
//! flow, so invoice creation returns a locally generated reference
//! immediately; nothing is batched. Refunds are requested against the
//! gateway and confirmed asynchronously by the GL polling job.

use async_trait::async_trait;

use domain_account::PaymentAccount;
use domain_ledger::{
    Invoice, InvoiceReference, InvoiceStatus, PaymentMethod, PaymentSystem, Refund,
};

use crate::context::PaymentContext;
use crate::error::PaymentError;
use crate::service::{ensure_no_payment_blockers, PaymentSystemService};

pub struct DirectPayService {
    ctx: PaymentContext,
}

impl DirectPayService {
    pub fn new(ctx: PaymentContext) -> Self {
        Self { ctx }
    }

    /// The reference number the gateway settles under
    fn reference_number(invoice: &Invoice) -> String {
        format!("REG{}", &invoice.id.as_uuid().simple().to_string()[..10].to_uppercase())
    }
}

#[async_trait]
impl PaymentSystemService for DirectPayService {
    fn context(&self) -> &PaymentContext {
        &self.ctx
    }

    fn payment_method(&self) -> PaymentMethod {
        PaymentMethod::DirectPay
    }

    fn payment_system(&self) -> PaymentSystem {
        PaymentSystem::Fiscal
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

        let reference = InvoiceReference::new(invoice.id, Self::reference_number(invoice));
        self.ctx
            .ledger
            .save_reference(&reference)
            .await
            .map_err(PaymentError::Store)?;
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
        // gateway reversal is confirmed later by the GL polling job
        Ok(InvoiceStatus::RefundRequested)
    }
}
