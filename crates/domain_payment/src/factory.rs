//! Payment-system factory
//!
//! Maps a payment-method code to its concrete service. The set of
//! variants is closed; adding a method means adding a variant here and
//! nowhere else.

use std::sync::Arc;

use domain_ledger::PaymentMethod;

use crate::context::PaymentContext;
use crate::service::PaymentSystemService;
use crate::systems::{
    DirectPayService, DrawdownService, EftService, EjvService, InternalService,
    OnlineBankingService, PadService,
};

/// Resolves the concrete payment-system service for a payment method
pub fn payment_system_for(
    method: PaymentMethod,
    ctx: PaymentContext,
) -> Arc<dyn PaymentSystemService> {
    match method {
        PaymentMethod::DirectPay => Arc::new(DirectPayService::new(ctx)),
        PaymentMethod::Pad => Arc::new(PadService::new(ctx)),
        PaymentMethod::OnlineBanking => Arc::new(OnlineBankingService::new(ctx)),
        PaymentMethod::Eft => Arc::new(EftService::new(ctx)),
        PaymentMethod::Internal => Arc::new(InternalService::new(ctx)),
        PaymentMethod::Ejv => Arc::new(EjvService::new(ctx)),
        PaymentMethod::Drawdown => Arc::new(DrawdownService::new(ctx)),
    }
}
