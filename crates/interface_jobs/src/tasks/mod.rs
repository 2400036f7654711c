//! The scheduled tasks

pub mod create_accounts;
pub mod activate_pad;
pub mod create_invoices;
pub mod refund_confirmation;
pub mod ejv_disbursement;
pub mod apply_eft_credits;
pub mod generate_statements;
pub mod statement_due;
pub mod routing_slip_nsf;
