//! Fully wired in-memory harness
//!
//! One call builds a payment context (and the pieces tests assert on)
//! backed entirely by the in-memory adapters.

use std::sync::Arc;

use domain_payment::{PaymentConfig, PaymentContext};

use crate::memory::{InMemoryStores, MockFiscalSystem, RecordingMailer, RecordingPublisher, StaticOrgService};

/// The wired context plus handles to the pieces tests inspect
pub struct TestHarness {
    pub ctx: PaymentContext,
    pub stores: Arc<InMemoryStores>,
    pub fiscal: Arc<MockFiscalSystem>,
    pub events: Arc<RecordingPublisher>,
    pub mailer: Arc<RecordingMailer>,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(PaymentConfig::default())
    }

    pub fn with_config(config: PaymentConfig) -> Self {
        let stores = Arc::new(InMemoryStores::new());
        let fiscal = Arc::new(MockFiscalSystem::new());
        let events = Arc::new(RecordingPublisher::new());
        let mailer = Arc::new(RecordingMailer::new());

        let ctx = PaymentContext {
            fiscal: fiscal.clone(),
            ledger: stores.clone(),
            accounts: stores.clone(),
            distributions: stores.clone(),
            disbursements: stores.clone(),
            events: events.clone(),
            mailer: mailer.clone(),
            org: Arc::new(StaticOrgService::default()),
            config,
        };

        Self {
            ctx,
            stores,
            fiscal,
            events,
            mailer,
        }
    }
}
