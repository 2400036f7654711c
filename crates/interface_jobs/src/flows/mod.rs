//! Operational flows invoked by the account-maintenance surface

pub mod payment_method_change;

pub use payment_method_change::switch_payment_method;
