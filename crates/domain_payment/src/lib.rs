//! PaymentSystemService abstraction
//!
//! A capability interface implemented once per payment method. The
//! interface is deliberately small - account provisioning, invoice
//! creation, receipt retrieval, refund processing and the post-settlement
//! hook - and every method-specific behavior lives entirely inside its
//! variant. A factory maps a payment-method code to the concrete service.
//!
//! All external collaborators (the fiscal back office, persisted stores,
//! the event bus, the mailer, the org service) are consumed through the
//! port traits in [`ports`]; error classification between transient fiscal
//! faults and business rejections happens at this boundary.

pub mod ports;
pub mod context;
pub mod error;
pub mod service;
pub mod systems;
pub mod factory;

pub use context::{PaymentContext, PaymentConfig};
pub use error::PaymentError;
pub use ports::{
    AccountStore, ContactInfo, CreditMemoRequest, CreditMemoResponse, DisbursementStore,
    DistributionStore, EmailMessage, EventPublisherPort, FiscalCustomerProfile,
    FiscalInvoiceRequest, FiscalInvoiceResponse, FiscalSystemPort, LedgerEvent, LedgerStore,
    NotificationPort, NotificationTemplate, OrgServicePort, ReceiptResult, RefundGlStatus,
    RefundPostingState,
};
pub use service::{
    ensure_no_payment_blockers, refund_as_credit_memo, release_payment, release_reversal,
    PaymentSystemService,
};
pub use factory::payment_system_for;
