//! Electronic journal voucher service
//!
//! Government-to-government settlement: no bank transaction exists.
//! Invoices wait as APPROVED until the EJV payment job writes them into a
//! journal-voucher file; refunds reverse through a later JV entry.

use async_trait::async_trait;

use domain_account::PaymentAccount;
use domain_ledger::{
    Invoice, InvoiceReference, InvoiceStatus, PaymentMethod, PaymentSystem, Refund,
};

use crate::context::PaymentContext;
use crate::error::PaymentError;
use crate::service::{ensure_no_payment_blockers, PaymentSystemService};

pub struct EjvService {
    ctx: PaymentContext,
}

impl EjvService {
    pub fn new(ctx: PaymentContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl PaymentSystemService for EjvService {
    fn context(&self) -> &PaymentContext {
        &self.ctx
    }

    fn payment_method(&self) -> PaymentMethod {
        PaymentMethod::Ejv
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
        // the EJV payment job writes approved invoices into the next file
        Ok(None)
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
        // the reversal JV is issued by the disbursement job once the
        // original entry completes
        Ok(InvoiceStatus::RefundRequested)
    }
}
