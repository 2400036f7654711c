//! Internal settlement service
//!
//! Staff transactions and routing-slip-backed filings settle inside this
//! ledger. A slip-backed invoice draws the slip down immediately when the
//! balance covers it; staff transactions without a slip settle at zero
//! movement.

use async_trait::async_trait;
use chrono::Utc;

use domain_account::PaymentAccount;
use domain_ledger::{
    Invoice, InvoiceReference, InvoiceStatus, Payment, PaymentMethod, PaymentSystem, Receipt,
    Refund, RoutingSlipStatus,
};

use crate::context::PaymentContext;
use crate::error::PaymentError;
use crate::service::{ensure_no_payment_blockers, PaymentSystemService};

pub struct InternalService {
    ctx: PaymentContext,
}

impl InternalService {
    pub fn new(ctx: PaymentContext) -> Self {
        Self { ctx }
    }

    fn invoice_number(invoice: &Invoice) -> String {
        format!("INT{}", &invoice.id.as_uuid().simple().to_string()[..10].to_uppercase())
    }
}

#[async_trait]
impl PaymentSystemService for InternalService {
    fn context(&self) -> &PaymentContext {
        &self.ctx
    }

    fn payment_method(&self) -> PaymentMethod {
        PaymentMethod::Internal
    }

    fn payment_system(&self) -> PaymentSystem {
        PaymentSystem::Internal
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

        if let Some(slip_number) = invoice.routing_slip_number.clone() {
            let mut slip = self
                .ctx
                .ledger
                .routing_slip_by_number(&slip_number)
                .await
                .map_err(PaymentError::Store)?
                .ok_or_else(|| {
                    PaymentError::Store(core_kernel::PortError::not_found(
                        "RoutingSlip",
                        &slip_number,
                    ))
                })?;

            if slip.status == RoutingSlipStatus::Nsf {
                return Err(PaymentError::Blocked {
                    account: account.id.to_string(),
                    reason: format!("routing slip {} is NSF", slip_number),
                });
            }
            if !slip.has_balance_for(invoice.total) {
                // insufficient pooled funds: wait as APPROVED
                invoice.transition_to(InvoiceStatus::Approved)?;
                return Ok(None);
            }

            slip.apply_payment(invoice.total)?;
            self.ctx
                .ledger
                .save_routing_slip(&slip)
                .await
                .map_err(PaymentError::Store)?;
        }

        invoice.mark_paid(now)?;

        let payment = Payment::completed(
            invoice.account_id,
            PaymentMethod::Internal,
            PaymentSystem::Internal,
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

        // money goes straight back onto the slip; no external confirmation
        if let Some(slip_number) = invoice.routing_slip_number.clone() {
            if let Some(mut slip) = self
                .ctx
                .ledger
                .routing_slip_by_number(&slip_number)
                .await
                .map_err(PaymentError::Store)?
            {
                slip.remaining_amount = slip
                    .remaining_amount
                    .checked_add(&refund.amount)
                    .map_err(domain_ledger::LedgerError::from)?;
                if slip.status == RoutingSlipStatus::Complete
                    && slip.remaining_amount.is_positive()
                {
                    slip.status = RoutingSlipStatus::Active;
                }
                self.ctx
                    .ledger
                    .save_routing_slip(&slip)
                    .await
                    .map_err(PaymentError::Store)?;
            }
        }

        Ok(InvoiceStatus::Refunded)
    }
}
