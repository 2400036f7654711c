//! Core Kernel - Foundational types and utilities for the payment ledger
//!
//! This crate provides the fundamental building blocks used across all domain modules:
//! - Money types with precise decimal arithmetic
//! - Temporal types for statement periods and day boundaries
//! - A controllable clock for batch jobs and deterministic tests
//! - Strongly-typed identifiers and common port abstractions

pub mod money;
pub mod temporal;
pub mod clock;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use money::{Money, Currency, MoneyError};
pub use temporal::{ValidPeriod, Timezone, TemporalError};
pub use clock::Clock;
pub use identifiers::{
    AccountId, CfsAccountId, InvoiceId, InvoiceReferenceId, PaymentId, ReceiptId,
    LineItemId, RefundId, RefundLineId, CreditId, EftCreditId, EftCreditLinkId,
    ShortNameId, RoutingSlipId, DistributionCodeId, StatementId, EjvFileId,
    EjvHeaderId, EjvLinkId, DisbursementId,
};
pub use error::CoreError;
pub use ports::{PortError, DomainPort};
