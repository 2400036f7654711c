//! Distribution / GL Coding
//!
//! Maps invoice line items to the general-ledger account strings the fiscal
//! system posts against. Every downstream integration (fiscal invoices,
//! credit memos, journal vouchers) consumes the
//! client / responsibility-centre / service-line / STOB / project-code
//! quintuple defined here.

pub mod code;
pub mod gl_line;
pub mod ejv;
pub mod error;

pub use code::{DistributionCode, GlCoding, RevenueSweep};
pub use gl_line::{GlLine, build_gl_lines};
pub use ejv::{EjvFile, EjvHeader, EjvLink, EjvLinkTarget, PartnerDisbursement};
pub use error::DistributionError;
