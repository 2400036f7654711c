//! Shared context handed to every payment-system service

use std::sync::Arc;

use crate::ports::{
    AccountStore, DisbursementStore, DistributionStore, EventPublisherPort, FiscalSystemPort,
    LedgerStore, NotificationPort, OrgServicePort,
};

/// Behavior toggles for the payment layer
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Corp types excluded from payment-completed notifications
    pub notification_excluded_corp_types: Vec<String>,
    /// Gates publication of PAYMENT_REVERSED events
    pub enable_reversed_events: bool,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            notification_excluded_corp_types: Vec::new(),
            enable_reversed_events: true,
        }
    }
}

/// The ports and configuration a payment-system service operates with
///
/// No shared mutable state lives here; every service call reads and writes
/// through the stores.
#[derive(Clone)]
pub struct PaymentContext {
    pub fiscal: Arc<dyn FiscalSystemPort>,
    pub ledger: Arc<dyn LedgerStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub distributions: Arc<dyn DistributionStore>,
    pub disbursements: Arc<dyn DisbursementStore>,
    pub events: Arc<dyn EventPublisherPort>,
    pub mailer: Arc<dyn NotificationPort>,
    pub org: Arc<dyn OrgServicePort>,
    pub config: PaymentConfig,
}
