//! In-memory port adapters
//!
//! Every port gets a thread-safe in-memory implementation, plus a mock
//! fiscal system with scriptable behavior and call counters, a recording
//! event publisher and a recording mailer.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use core_kernel::{
    AccountId, CreditId, DisbursementId, DistributionCodeId, DomainPort, InvoiceId, Money,
    PortError,
};
use domain_account::{BankDetails, CfsAccount, CfsAccountStatus, PaymentAccount};
use domain_distribution::{
    DistributionCode, EjvFile, EjvHeader, EjvLink, PartnerDisbursement,
};
use domain_ledger::{
    Credit, DisbursementStatus, EftCredit, EftCreditInvoiceLink, Invoice, InvoiceReference,
    InvoiceStatus, Payment, PaymentMethod, Receipt, Refund, RoutingSlip, RoutingSlipStatus,
};
use domain_payment::{
    AccountStore, ContactInfo, CreditMemoRequest, CreditMemoResponse, DisbursementStore,
    DistributionStore, EmailMessage, EventPublisherPort, FiscalCustomerProfile,
    FiscalInvoiceRequest, FiscalInvoiceResponse, FiscalSystemPort, LedgerEvent, LedgerStore,
    NotificationPort, OrgServicePort, ReceiptResult, RefundGlStatus,
};
use domain_statement::{Statement, StatementSettings, StatementStore};

/// Shared in-memory persistence backing every store trait
#[derive(Default)]
pub struct InMemoryStores {
    pub invoices: Mutex<HashMap<InvoiceId, Invoice>>,
    pub references: Mutex<Vec<InvoiceReference>>,
    pub payments: Mutex<Vec<Payment>>,
    pub receipts: Mutex<Vec<Receipt>>,
    pub refunds: Mutex<Vec<Refund>>,
    pub credits: Mutex<HashMap<CreditId, Credit>>,
    pub eft_credits: Mutex<Vec<EftCredit>>,
    pub eft_links: Mutex<Vec<EftCreditInvoiceLink>>,
    pub routing_slips: Mutex<HashMap<String, RoutingSlip>>,
    pub accounts: Mutex<HashMap<AccountId, PaymentAccount>>,
    pub cfs_accounts: Mutex<Vec<CfsAccount>>,
    pub distribution_codes: Mutex<HashMap<DistributionCodeId, DistributionCode>>,
    pub disbursements: Mutex<HashMap<DisbursementId, PartnerDisbursement>>,
    pub ejv_files: Mutex<Vec<EjvFile>>,
    pub ejv_headers: Mutex<Vec<EjvHeader>>,
    pub ejv_links: Mutex<Vec<EjvLink>>,
    pub statements: Mutex<Vec<Statement>>,
    pub statement_settings: Mutex<Vec<StatementSettings>>,
}

impl InMemoryStores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an invoice directly
    pub fn put_invoice(&self, invoice: Invoice) {
        self.invoices.lock().unwrap().insert(invoice.id, invoice);
    }

    pub fn put_account(&self, account: PaymentAccount) {
        self.accounts.lock().unwrap().insert(account.id, account);
    }

    pub fn put_cfs_account(&self, cfs: CfsAccount) {
        self.cfs_accounts.lock().unwrap().push(cfs);
    }

    pub fn put_eft_credit(&self, credit: EftCredit) {
        self.eft_credits.lock().unwrap().push(credit);
    }

    pub fn put_routing_slip(&self, slip: RoutingSlip) {
        self.routing_slips.lock().unwrap().insert(slip.number.clone(), slip);
    }

    pub fn put_distribution_code(&self, code: DistributionCode) {
        self.distribution_codes.lock().unwrap().insert(code.id, code);
    }

    pub fn put_disbursement(&self, row: PartnerDisbursement) {
        self.disbursements.lock().unwrap().insert(row.id, row);
    }

    pub fn put_statement(&self, statement: Statement) {
        self.statements.lock().unwrap().push(statement);
    }

    pub fn put_statement_settings(&self, settings: StatementSettings) {
        self.statement_settings.lock().unwrap().push(settings);
    }

    pub fn invoice(&self, id: InvoiceId) -> Option<Invoice> {
        self.invoices.lock().unwrap().get(&id).cloned()
    }

    /// Synchronous status query for assertions
    pub fn invoices_with_status(&self, status: InvoiceStatus) -> Vec<Invoice> {
        self.invoices
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.status == status)
            .cloned()
            .collect()
    }

    /// Synchronous CFS status query for assertions
    pub fn cfs_accounts_by_status_sync(&self, status: CfsAccountStatus) -> Vec<CfsAccount> {
        self.cfs_accounts
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.status == status)
            .cloned()
            .collect()
    }
}

impl DomainPort for InMemoryStores {}

#[async_trait]
impl LedgerStore for InMemoryStores {
    async fn invoice(&self, id: InvoiceId) -> Result<Invoice, PortError> {
        self.invoices
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Invoice", id))
    }

    async fn invoices_by_status(
        &self,
        status: InvoiceStatus,
        method: Option<PaymentMethod>,
    ) -> Result<Vec<Invoice>, PortError> {
        let mut rows: Vec<Invoice> = self
            .invoices
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.status == status && method.map_or(true, |m| i.payment_method == m))
            .cloned()
            .collect();
        rows.sort_by_key(|i| i.id);
        Ok(rows)
    }

    async fn account_invoices_by_status(
        &self,
        account_id: AccountId,
        statuses: &[InvoiceStatus],
    ) -> Result<Vec<Invoice>, PortError> {
        let mut rows: Vec<Invoice> = self
            .invoices
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.account_id == account_id && statuses.contains(&i.status))
            .cloned()
            .collect();
        rows.sort_by_key(|i| i.id);
        Ok(rows)
    }

    async fn save_invoice(&self, invoice: &Invoice) -> Result<(), PortError> {
        self.invoices
            .lock()
            .unwrap()
            .insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn active_reference_for_number(
        &self,
        invoice_number: &str,
    ) -> Result<Option<InvoiceReference>, PortError> {
        Ok(self
            .references
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.invoice_number == invoice_number && r.is_active())
            .cloned())
    }

    async fn references_for_invoice(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<InvoiceReference>, PortError> {
        Ok(self
            .references
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.invoice_id == invoice_id)
            .cloned()
            .collect())
    }

    async fn save_reference(&self, reference: &InvoiceReference) -> Result<(), PortError> {
        let mut references = self.references.lock().unwrap();
        match references.iter_mut().find(|r| r.id == reference.id) {
            Some(existing) => *existing = reference.clone(),
            None => references.push(reference.clone()),
        }
        Ok(())
    }

    async fn save_payment(&self, payment: &Payment) -> Result<(), PortError> {
        let mut payments = self.payments.lock().unwrap();
        match payments.iter_mut().find(|p| p.id == payment.id) {
            Some(existing) => *existing = payment.clone(),
            None => payments.push(payment.clone()),
        }
        Ok(())
    }

    async fn payments_for_invoice_number(
        &self,
        invoice_number: &str,
    ) -> Result<Vec<Payment>, PortError> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.invoice_number == invoice_number)
            .cloned()
            .collect())
    }

    async fn save_receipt(&self, receipt: &Receipt) -> Result<(), PortError> {
        self.receipts.lock().unwrap().push(receipt.clone());
        Ok(())
    }

    async fn delete_receipts_for_invoice(&self, invoice_id: InvoiceId) -> Result<(), PortError> {
        self.receipts
            .lock()
            .unwrap()
            .retain(|r| r.invoice_id != invoice_id);
        Ok(())
    }

    async fn refund_for_invoice(&self, invoice_id: InvoiceId) -> Result<Option<Refund>, PortError> {
        Ok(self
            .refunds
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.invoice_id == invoice_id)
            .cloned())
    }

    async fn save_refund(&self, refund: &Refund) -> Result<(), PortError> {
        let mut refunds = self.refunds.lock().unwrap();
        match refunds.iter_mut().find(|r| r.id == refund.id) {
            Some(existing) => *existing = refund.clone(),
            None => refunds.push(refund.clone()),
        }
        Ok(())
    }

    async fn save_credit(&self, credit: &Credit) -> Result<(), PortError> {
        self.credits
            .lock()
            .unwrap()
            .insert(credit.id, credit.clone());
        Ok(())
    }

    async fn eft_credits_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<EftCredit>, PortError> {
        Ok(self
            .eft_credits
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.account_id == Some(account_id))
            .cloned()
            .collect())
    }

    async fn save_eft_credit(&self, credit: &EftCredit) -> Result<(), PortError> {
        let mut credits = self.eft_credits.lock().unwrap();
        match credits.iter_mut().find(|c| c.id == credit.id) {
            Some(existing) => *existing = credit.clone(),
            None => credits.push(credit.clone()),
        }
        Ok(())
    }

    async fn save_eft_credit_link(&self, link: &EftCreditInvoiceLink) -> Result<(), PortError> {
        self.eft_links.lock().unwrap().push(link.clone());
        Ok(())
    }

    async fn routing_slip_by_number(
        &self,
        number: &str,
    ) -> Result<Option<RoutingSlip>, PortError> {
        Ok(self.routing_slips.lock().unwrap().get(number).cloned())
    }

    async fn invoices_for_routing_slip(&self, number: &str) -> Result<Vec<Invoice>, PortError> {
        Ok(self
            .invoices
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.routing_slip_number.as_deref() == Some(number))
            .cloned()
            .collect())
    }

    async fn routing_slips_by_status(
        &self,
        status: RoutingSlipStatus,
    ) -> Result<Vec<RoutingSlip>, PortError> {
        Ok(self
            .routing_slips
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.status == status)
            .cloned()
            .collect())
    }

    async fn save_routing_slip(&self, slip: &RoutingSlip) -> Result<(), PortError> {
        self.routing_slips
            .lock()
            .unwrap()
            .insert(slip.number.clone(), slip.clone());
        Ok(())
    }
}

#[async_trait]
impl AccountStore for InMemoryStores {
    async fn account(&self, id: AccountId) -> Result<PaymentAccount, PortError> {
        self.accounts
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("PaymentAccount", id))
    }

    async fn accounts_by_method(
        &self,
        method: Option<PaymentMethod>,
    ) -> Result<Vec<PaymentAccount>, PortError> {
        let mut rows: Vec<PaymentAccount> = self
            .accounts
            .lock()
            .unwrap()
            .values()
            .filter(|a| method.map_or(true, |m| a.payment_method == m))
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.id);
        Ok(rows)
    }

    async fn save_account(&self, account: &PaymentAccount) -> Result<(), PortError> {
        self.accounts
            .lock()
            .unwrap()
            .insert(account.id, account.clone());
        Ok(())
    }

    async fn effective_cfs_account(
        &self,
        account_id: AccountId,
    ) -> Result<Option<CfsAccount>, PortError> {
        Ok(self
            .cfs_accounts
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.account_id == account_id && c.is_effective())
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn cfs_accounts_by_status(
        &self,
        status: CfsAccountStatus,
    ) -> Result<Vec<CfsAccount>, PortError> {
        Ok(self
            .cfs_accounts
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.status == status)
            .cloned()
            .collect())
    }

    async fn save_cfs_account(&self, cfs_account: &CfsAccount) -> Result<(), PortError> {
        let mut rows = self.cfs_accounts.lock().unwrap();
        match rows.iter_mut().find(|c| c.id == cfs_account.id) {
            Some(existing) => *existing = cfs_account.clone(),
            None => rows.push(cfs_account.clone()),
        }
        Ok(())
    }
}

#[async_trait]
impl DistributionStore for InMemoryStores {
    async fn distribution_codes(
        &self,
    ) -> Result<HashMap<DistributionCodeId, DistributionCode>, PortError> {
        Ok(self.distribution_codes.lock().unwrap().clone())
    }

    async fn save_distribution_code(&self, code: &DistributionCode) -> Result<(), PortError> {
        self.distribution_codes
            .lock()
            .unwrap()
            .insert(code.id, code.clone());
        Ok(())
    }
}

#[async_trait]
impl DisbursementStore for InMemoryStores {
    async fn disbursements_by_status(
        &self,
        status: DisbursementStatus,
    ) -> Result<Vec<PartnerDisbursement>, PortError> {
        let mut rows: Vec<PartnerDisbursement> = self
            .disbursements
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.status == status)
            .cloned()
            .collect();
        rows.sort_by_key(|d| d.id);
        Ok(rows)
    }

    async fn disbursements_for_invoice(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<PartnerDisbursement>, PortError> {
        Ok(self
            .disbursements
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.invoice_id == invoice_id)
            .cloned()
            .collect())
    }

    async fn save_disbursement(&self, row: &PartnerDisbursement) -> Result<(), PortError> {
        self.disbursements.lock().unwrap().insert(row.id, row.clone());
        Ok(())
    }

    async fn save_ejv_file(&self, file: &EjvFile) -> Result<(), PortError> {
        self.ejv_files.lock().unwrap().push(file.clone());
        Ok(())
    }

    async fn save_ejv_header(&self, header: &EjvHeader) -> Result<(), PortError> {
        self.ejv_headers.lock().unwrap().push(header.clone());
        Ok(())
    }

    async fn save_ejv_link(&self, link: &EjvLink) -> Result<(), PortError> {
        self.ejv_links.lock().unwrap().push(link.clone());
        Ok(())
    }
}

#[async_trait]
impl StatementStore for InMemoryStores {
    async fn settings_on(
        &self,
        account_id: AccountId,
        date: NaiveDate,
    ) -> Result<Option<StatementSettings>, PortError> {
        Ok(self
            .statement_settings
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.account_id == account_id && s.is_current_on(date))
            .cloned())
    }

    async fn save_settings(&self, settings: &StatementSettings) -> Result<(), PortError> {
        let mut rows = self.statement_settings.lock().unwrap();
        match rows
            .iter_mut()
            .find(|s| s.account_id == settings.account_id && s.from_date == settings.from_date)
        {
            Some(existing) => *existing = settings.clone(),
            None => rows.push(settings.clone()),
        }
        Ok(())
    }

    async fn latest_statement_end(
        &self,
        account_id: AccountId,
    ) -> Result<Option<NaiveDate>, PortError> {
        Ok(self
            .statements
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.account_id == account_id)
            .map(|s| s.to_date)
            .max())
    }

    async fn statements_due_by(&self, date: NaiveDate) -> Result<Vec<Statement>, PortError> {
        Ok(self
            .statements
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.due_date <= date)
            .cloned()
            .collect())
    }

    async fn save_statement(&self, statement: &Statement) -> Result<(), PortError> {
        let mut rows = self.statements.lock().unwrap();
        match rows.iter_mut().find(|s| s.id == statement.id) {
            Some(existing) => *existing = statement.clone(),
            None => rows.push(statement.clone()),
        }
        Ok(())
    }
}

/// Scriptable mock of the fiscal back office
#[derive(Default)]
pub struct MockFiscalSystem {
    /// Counts create_invoice calls; idempotency assertions read this
    pub invoice_calls: Mutex<usize>,
    pub profile_calls: Mutex<usize>,
    pub credit_memo_calls: Mutex<usize>,
    pub uploads: Mutex<Vec<(String, String)>>,
    /// Scripted refund GL responses keyed by invoice number
    pub refund_statuses: Mutex<HashMap<String, RefundGlStatus>>,
    /// Scripted JV batch statuses keyed by file ref
    pub jv_statuses: Mutex<HashMap<String, DisbursementStatus>>,
    /// Reject the next site creation as a bad bank account
    pub reject_bank_account: Mutex<bool>,
    /// Fail every call as a connection error
    pub unavailable: Mutex<bool>,
}

impl MockFiscalSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_refund_status(&self, invoice_number: &str, status: RefundGlStatus) {
        self.refund_statuses
            .lock()
            .unwrap()
            .insert(invoice_number.to_string(), status);
    }

    pub fn script_jv_status(&self, file_ref: &str, status: DisbursementStatus) {
        self.jv_statuses
            .lock()
            .unwrap()
            .insert(file_ref.to_string(), status);
    }

    pub fn set_reject_bank_account(&self, reject: bool) {
        *self.reject_bank_account.lock().unwrap() = reject;
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    pub fn invoice_call_count(&self) -> usize {
        *self.invoice_calls.lock().unwrap()
    }

    fn check_available(&self) -> Result<(), PortError> {
        if *self.unavailable.lock().unwrap() {
            return Err(PortError::connection("fiscal system unreachable"));
        }
        Ok(())
    }
}

impl DomainPort for MockFiscalSystem {}

#[async_trait]
impl FiscalSystemPort for MockFiscalSystem {
    async fn create_customer_profile(
        &self,
        account: &PaymentAccount,
        _contact: &ContactInfo,
    ) -> Result<FiscalCustomerProfile, PortError> {
        self.check_available()?;
        *self.profile_calls.lock().unwrap() += 1;
        Ok(FiscalCustomerProfile {
            party_number: format!("P-{}", account.auth_account_id),
            account_number: format!("A-{}", account.auth_account_id),
            site_number: format!("S-{}", account.auth_account_id),
        })
    }

    async fn create_site(
        &self,
        profile: &FiscalCustomerProfile,
        _bank_details: Option<&BankDetails>,
    ) -> Result<String, PortError> {
        self.check_available()?;
        if *self.reject_bank_account.lock().unwrap() {
            return Err(PortError::rejected(
                "fiscal",
                "INVALID_BANK_ACCOUNT",
                "bank account failed validation",
            ));
        }
        Ok(profile.site_number.clone())
    }

    async fn create_invoice(
        &self,
        request: FiscalInvoiceRequest,
    ) -> Result<FiscalInvoiceResponse, PortError> {
        self.check_available()?;
        *self.invoice_calls.lock().unwrap() += 1;
        Ok(FiscalInvoiceResponse {
            invoice_number: request.invoice_number.clone(),
            reference_number: format!("REF-{}", request.invoice_number),
        })
    }

    async fn create_credit_memo(
        &self,
        request: CreditMemoRequest,
    ) -> Result<CreditMemoResponse, PortError> {
        self.check_available()?;
        *self.credit_memo_calls.lock().unwrap() += 1;
        Ok(CreditMemoResponse {
            credit_memo_number: format!("CM-{}", request.invoice_number),
        })
    }

    async fn create_receipt(
        &self,
        _invoice_number: &str,
        receipt_number: &str,
        amount: Money,
    ) -> Result<ReceiptResult, PortError> {
        self.check_available()?;
        Ok(ReceiptResult {
            receipt_number: receipt_number.to_string(),
            receipt_date: Utc::now(),
            amount,
        })
    }

    async fn reverse_receipt(&self, _receipt_number: &str) -> Result<(), PortError> {
        self.check_available()
    }

    async fn adjust_invoice(&self, _invoice_number: &str, _amount: Money) -> Result<(), PortError> {
        self.check_available()
    }

    async fn get_receipt(&self, _invoice_number: &str) -> Result<Option<ReceiptResult>, PortError> {
        self.check_available()?;
        Ok(None)
    }

    async fn get_refund_status(&self, invoice_number: &str) -> Result<RefundGlStatus, PortError> {
        self.check_available()?;
        Ok(self
            .refund_statuses
            .lock()
            .unwrap()
            .get(invoice_number)
            .cloned()
            .unwrap_or(RefundGlStatus {
                state: None,
                gl_error: None,
            }))
    }

    async fn upload_journal_voucher(
        &self,
        file_ref: &str,
        content: &str,
    ) -> Result<(), PortError> {
        self.check_available()?;
        self.uploads
            .lock()
            .unwrap()
            .push((file_ref.to_string(), content.to_string()));
        Ok(())
    }

    async fn get_journal_voucher_status(
        &self,
        file_ref: &str,
    ) -> Result<Option<DisbursementStatus>, PortError> {
        self.check_available()?;
        Ok(self.jv_statuses.lock().unwrap().get(file_ref).copied())
    }
}

/// Records every published event
#[derive(Default)]
pub struct RecordingPublisher {
    pub events: Mutex<Vec<LedgerEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count_matching(&self, predicate: impl Fn(&LedgerEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| predicate(e)).count()
    }
}

impl DomainPort for RecordingPublisher {}

#[async_trait]
impl EventPublisherPort for RecordingPublisher {
    async fn publish(&self, event: LedgerEvent) -> Result<(), PortError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Records every sent mail
#[derive(Default)]
pub struct RecordingMailer {
    pub messages: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<EmailMessage> {
        self.messages.lock().unwrap().clone()
    }
}

impl DomainPort for RecordingMailer {}

#[async_trait]
impl NotificationPort for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), PortError> {
        self.messages.lock().unwrap().push(message);
        Ok(())
    }
}

/// Serves a fixed admin contact list for every account
pub struct StaticOrgService {
    pub admins: Vec<String>,
}

impl Default for StaticOrgService {
    fn default() -> Self {
        Self {
            admins: vec!["admin@example.com".to_string()],
        }
    }
}

impl DomainPort for StaticOrgService {}

#[async_trait]
impl OrgServicePort for StaticOrgService {
    async fn admin_emails(&self, _auth_account_id: &str) -> Result<Vec<String>, PortError> {
        Ok(self.admins.clone())
    }
}
