//! Ports to the external collaborators
//!
//! Narrow interfaces for everything outside the core: the fiscal back
//! office, the persisted stores, the event bus, the mail dispatcher and
//! the org service. Implementations live outside this workspace; the
//! in-memory adapters used by tests live in `test_utils`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, DistributionCodeId, DomainPort, InvoiceId, Money, PortError};
use domain_account::{BankDetails, CfsAccount, CfsAccountStatus, PaymentAccount};
use domain_distribution::{DistributionCode, EjvFile, EjvHeader, EjvLink, GlLine, PartnerDisbursement};
use domain_ledger::{
    Credit, DisbursementStatus, EftCredit, EftCreditInvoiceLink, Invoice, InvoiceReference,
    InvoiceStatus, Payment, PaymentMethod, Receipt, Refund, RoutingSlip, RoutingSlipStatus,
};

/// Contact details used when provisioning a fiscal customer profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    pub email: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
}

/// The fiscal system's customer/party/site triple
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiscalCustomerProfile {
    pub party_number: String,
    pub account_number: String,
    pub site_number: String,
}

/// Request body for a fiscal invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiscalInvoiceRequest {
    pub account_number: String,
    pub site_number: String,
    pub invoice_number: String,
    pub total: Money,
    pub gl_lines: Vec<GlLine>,
}

/// Fiscal invoice creation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiscalInvoiceResponse {
    pub invoice_number: String,
    pub reference_number: String,
}

/// Request body for a fiscal credit memo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditMemoRequest {
    pub account_number: String,
    pub site_number: String,
    pub invoice_number: String,
    pub amount: Money,
    pub gl_lines: Vec<GlLine>,
}

/// Credit memo creation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditMemoResponse {
    pub credit_memo_number: String,
}

/// A receipt as reported by the fiscal system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptResult {
    pub receipt_number: String,
    pub receipt_date: DateTime<Utc>,
    pub amount: Money,
}

/// GL posting state of a refund, as the fiscal system reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundPostingState {
    /// Posted, money not yet confirmed out
    Paid,
    /// Fully processed
    Complete,
    /// Rejected or declined by the GL
    Declined,
}

/// Refund GL status response
///
/// `state = None` models the ambiguous/empty fiscal response; callers must
/// not transition on it. A manually processed refund reports `Complete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundGlStatus {
    pub state: Option<RefundPostingState>,
    /// Per-line GL rejection message, when any line was rejected
    pub gl_error: Option<String>,
}

/// Synchronous client to the fiscal back office
#[async_trait]
pub trait FiscalSystemPort: DomainPort {
    async fn create_customer_profile(
        &self,
        account: &PaymentAccount,
        contact: &ContactInfo,
    ) -> Result<FiscalCustomerProfile, PortError>;

    /// Creates a site under the profile; PAD sites carry bank details
    async fn create_site(
        &self,
        profile: &FiscalCustomerProfile,
        bank_details: Option<&BankDetails>,
    ) -> Result<String, PortError>;

    async fn create_invoice(
        &self,
        request: FiscalInvoiceRequest,
    ) -> Result<FiscalInvoiceResponse, PortError>;

    async fn create_credit_memo(
        &self,
        request: CreditMemoRequest,
    ) -> Result<CreditMemoResponse, PortError>;

    async fn create_receipt(
        &self,
        invoice_number: &str,
        receipt_number: &str,
        amount: Money,
    ) -> Result<ReceiptResult, PortError>;

    async fn reverse_receipt(&self, receipt_number: &str) -> Result<(), PortError>;

    /// Adjusts a fiscal invoice down (line cancellation, consolidation)
    async fn adjust_invoice(&self, invoice_number: &str, amount: Money) -> Result<(), PortError>;

    async fn get_receipt(&self, invoice_number: &str) -> Result<Option<ReceiptResult>, PortError>;

    async fn get_refund_status(&self, invoice_number: &str) -> Result<RefundGlStatus, PortError>;

    /// Uploads a built journal-voucher file
    async fn upload_journal_voucher(&self, file_ref: &str, content: &str)
        -> Result<(), PortError>;

    /// Reports whether an uploaded JV batch has been accepted into the GL
    async fn get_journal_voucher_status(
        &self,
        file_ref: &str,
    ) -> Result<Option<DisbursementStatus>, PortError>;
}

/// Persisted ledger state
///
/// The minimal query/save surface the services and batch jobs need. Saves
/// may refuse with [`PortError::Conflict`] when another run already
/// advanced the row; jobs treat that as "already processed".
#[async_trait]
pub trait LedgerStore: DomainPort {
    async fn invoice(&self, id: InvoiceId) -> Result<Invoice, PortError>;
    async fn invoices_by_status(
        &self,
        status: InvoiceStatus,
        method: Option<PaymentMethod>,
    ) -> Result<Vec<Invoice>, PortError>;
    async fn account_invoices_by_status(
        &self,
        account_id: AccountId,
        statuses: &[InvoiceStatus],
    ) -> Result<Vec<Invoice>, PortError>;
    async fn save_invoice(&self, invoice: &Invoice) -> Result<(), PortError>;

    async fn active_reference_for_number(
        &self,
        invoice_number: &str,
    ) -> Result<Option<InvoiceReference>, PortError>;
    async fn references_for_invoice(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<InvoiceReference>, PortError>;
    async fn save_reference(&self, reference: &InvoiceReference) -> Result<(), PortError>;

    async fn save_payment(&self, payment: &Payment) -> Result<(), PortError>;
    async fn payments_for_invoice_number(
        &self,
        invoice_number: &str,
    ) -> Result<Vec<Payment>, PortError>;

    async fn save_receipt(&self, receipt: &Receipt) -> Result<(), PortError>;
    async fn delete_receipts_for_invoice(&self, invoice_id: InvoiceId) -> Result<(), PortError>;

    async fn refund_for_invoice(&self, invoice_id: InvoiceId) -> Result<Option<Refund>, PortError>;
    async fn save_refund(&self, refund: &Refund) -> Result<(), PortError>;

    async fn save_credit(&self, credit: &Credit) -> Result<(), PortError>;
    async fn eft_credits_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<EftCredit>, PortError>;
    async fn save_eft_credit(&self, credit: &EftCredit) -> Result<(), PortError>;
    async fn save_eft_credit_link(&self, link: &EftCreditInvoiceLink) -> Result<(), PortError>;

    async fn routing_slip_by_number(
        &self,
        number: &str,
    ) -> Result<Option<RoutingSlip>, PortError>;
    async fn invoices_for_routing_slip(&self, number: &str) -> Result<Vec<Invoice>, PortError>;
    async fn routing_slips_by_status(
        &self,
        status: RoutingSlipStatus,
    ) -> Result<Vec<RoutingSlip>, PortError>;
    async fn save_routing_slip(&self, slip: &RoutingSlip) -> Result<(), PortError>;
}

/// Persisted account state
#[async_trait]
pub trait AccountStore: DomainPort {
    async fn account(&self, id: AccountId) -> Result<PaymentAccount, PortError>;
    /// All accounts, optionally narrowed to one payment method
    async fn accounts_by_method(
        &self,
        method: Option<PaymentMethod>,
    ) -> Result<Vec<PaymentAccount>, PortError>;
    async fn save_account(&self, account: &PaymentAccount) -> Result<(), PortError>;

    async fn effective_cfs_account(
        &self,
        account_id: AccountId,
    ) -> Result<Option<CfsAccount>, PortError>;
    async fn cfs_accounts_by_status(
        &self,
        status: CfsAccountStatus,
    ) -> Result<Vec<CfsAccount>, PortError>;
    async fn save_cfs_account(&self, cfs_account: &CfsAccount) -> Result<(), PortError>;
}

/// Persisted distribution-code reference data
#[async_trait]
pub trait DistributionStore: DomainPort {
    /// The full code table; a small reference set, fetched whole
    async fn distribution_codes(
        &self,
    ) -> Result<HashMap<DistributionCodeId, DistributionCode>, PortError>;
    async fn save_distribution_code(&self, code: &DistributionCode) -> Result<(), PortError>;
}

/// Persisted disbursement artifacts
#[async_trait]
pub trait DisbursementStore: DomainPort {
    async fn disbursements_by_status(
        &self,
        status: DisbursementStatus,
    ) -> Result<Vec<PartnerDisbursement>, PortError>;
    async fn disbursements_for_invoice(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<PartnerDisbursement>, PortError>;
    async fn save_disbursement(&self, row: &PartnerDisbursement) -> Result<(), PortError>;

    async fn save_ejv_file(&self, file: &EjvFile) -> Result<(), PortError>;
    async fn save_ejv_header(&self, header: &EjvHeader) -> Result<(), PortError>;
    async fn save_ejv_link(&self, link: &EjvLink) -> Result<(), PortError>;
}

/// Typed events published to downstream subscribers
///
/// Delivery is at-least-once; consumers deduplicate. Publish failures are
/// logged and surfaced to error tracking rather than retried inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    PaymentCompleted {
        invoice_id: InvoiceId,
        account_id: AccountId,
        corp_type: String,
    },
    PaymentReversed {
        invoice_id: InvoiceId,
        account_id: AccountId,
    },
    PaymentMethodChanged {
        account_id: AccountId,
        from: PaymentMethod,
        to: PaymentMethod,
    },
    AccountLocked {
        account_id: AccountId,
        reason: String,
    },
    AccountUnlocked {
        account_id: AccountId,
    },
    CreditAdded {
        account_id: AccountId,
        amount: Money,
    },
    ActivityLog {
        account_id: AccountId,
        action: String,
    },
}

/// Event bus port
#[async_trait]
pub trait EventPublisherPort: DomainPort {
    async fn publish(&self, event: LedgerEvent) -> Result<(), PortError>;
}

/// Templated notification kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTemplate {
    CreditAdded,
    RefundPending,
    NsfLock,
    StatementReminder,
    StatementDue,
    StatementOverdue,
    AccountProvisioningFailed,
    PaymentMethodConfirmed,
    JobFailure,
}

/// A fire-and-forget templated email
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub template: NotificationTemplate,
    pub recipients: Vec<String>,
    pub params: serde_json::Value,
}

/// Mail dispatcher port
#[async_trait]
pub trait NotificationPort: DomainPort {
    async fn send(&self, message: EmailMessage) -> Result<(), PortError>;
}

/// Identity/org service port
#[async_trait]
pub trait OrgServicePort: DomainPort {
    /// Contact addresses for the account's administrators
    async fn admin_emails(&self, auth_account_id: &str) -> Result<Vec<String>, PortError>;
}
