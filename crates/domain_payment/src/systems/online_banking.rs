//! Online banking service
//!
//! The customer pushes money from their bank against a fiscal invoice
//! created by the batch job (one per purchase). Refunds of paid invoices
//! settle as credit memos, the same as PAD.

use async_trait::async_trait;

use domain_account::PaymentAccount;
use domain_ledger::{
    Invoice, InvoiceReference, InvoiceStatus, PaymentMethod, PaymentSystem, Refund,
};

use crate::context::PaymentContext;
use crate::error::PaymentError;
use crate::service::{
    ensure_no_payment_blockers, refund_as_credit_memo, PaymentSystemService,
};

pub struct OnlineBankingService {
    ctx: PaymentContext,
}

impl OnlineBankingService {
    pub fn new(ctx: PaymentContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl PaymentSystemService for OnlineBankingService {
    fn context(&self) -> &PaymentContext {
        &self.ctx
    }

    fn payment_method(&self) -> PaymentMethod {
        PaymentMethod::OnlineBanking
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
        _invoice: &mut Invoice,
    ) -> Result<Option<InvoiceReference>, PaymentError> {
        ensure_no_payment_blockers(&self.ctx, account).await?;
        // one fiscal invoice per purchase, created by the batch job
        Ok(None)
    }

    async fn process_refund(
        &self,
        invoice: &mut Invoice,
        account: &mut PaymentAccount,
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
        refund_as_credit_memo(&self.ctx, invoice, account, refund).await
    }
}
