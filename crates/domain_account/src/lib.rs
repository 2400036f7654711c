//! Account Lifecycle Manager
//!
//! Owns the billing identity for an external auth account: the
//! [`PaymentAccount`], its append-only history of [`CfsAccount`] rows on the
//! fiscal side, and the rules that govern moving between payment methods -
//! PAD activation gating, fiscal-profile provisioning, interim-statement
//! triggers and deletion guards.

pub mod payment_account;
pub mod cfs_account;
pub mod lifecycle;
pub mod request;
pub mod error;

pub use payment_account::PaymentAccount;
pub use cfs_account::{CfsAccount, CfsAccountStatus, BankDetails};
pub use lifecycle::{plan_method_change, apply_method_change, ensure_deletable, MethodChangePlan};
pub use request::{AccountRequest, PaymentInfo};
pub use error::AccountError;
