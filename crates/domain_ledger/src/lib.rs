//! Ledger Primitives
//!
//! This crate holds the pure ledger entities of the payment backend and the
//! status state machines that govern them. Nothing here performs I/O; batch
//! jobs and payment-method services mutate these entities and persist them
//! through store ports defined elsewhere.
//!
//! # Entities
//!
//! - **Invoice** - one billable transaction, with a validated lifecycle
//!   across creation, settlement, refund and disbursement
//! - **InvoiceReference** - the fiscal-system invoice number bound to an
//!   invoice; exactly one effective row per invoice number
//! - **Payment / Receipt** - money movement and proof of funds
//! - **Refund / RefundPartialLine** - refund requests with per-fee-type
//!   ceilings
//! - **Credit / EftCredit / EftCreditInvoiceLink** - pooled pre-paid funds
//!   and their strictly FIFO application to invoices
//! - **RoutingSlip** - cash/cheque pooled funds with parent/child linking
//!   and NSF handling

pub mod codes;
pub mod invoice;
pub mod invoice_reference;
pub mod payment;
pub mod receipt;
pub mod line_item;
pub mod refund;
pub mod credit;
pub mod routing_slip;
pub mod error;

pub use codes::{PaymentMethod, PaymentSystem, DisbursementStatus, CorpType};
pub use invoice::{Invoice, InvoiceStatus};
pub use invoice_reference::{InvoiceReference, InvoiceReferenceStatus};
pub use payment::{Payment, PaymentStatus};
pub use receipt::Receipt;
pub use line_item::{PaymentLineItem, LineItemStatus};
pub use refund::{Refund, RefundPartialLine, RefundLineType, validate_partial_refund};
pub use credit::{Credit, EftCredit, EftCreditInvoiceLink, EftCreditLinkStatus, apply_eft_credits, CreditApplication};
pub use routing_slip::{RoutingSlip, RoutingSlipStatus};
pub use error::LedgerError;
