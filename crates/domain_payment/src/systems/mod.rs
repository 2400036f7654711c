//! Per-method payment-system services

pub mod direct_pay;
pub mod pad;
pub mod online_banking;
pub mod eft;
pub mod internal;
pub mod ejv;
pub mod drawdown;

pub use direct_pay::DirectPayService;
pub use pad::PadService;
pub use online_banking::OnlineBankingService;
pub use eft::EftService;
pub use internal::InternalService;
pub use ejv::EjvService;
pub use drawdown::DrawdownService;
