//! Test Data Builders
//!
//! Builder patterns for constructing test data with sensible defaults.
//! Tests specify only the relevant fields and take defaults for the rest.

use chrono::{DateTime, Utc};
use fake::faker::company::en::CompanyName;
use fake::Fake;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{AccountId, Money, ShortNameId};
use domain_account::PaymentAccount;
use domain_ledger::{
    CorpType, EftCredit, Invoice, InvoiceStatus, PaymentLineItem, PaymentMethod,
};

/// Builder for test invoices
pub struct TestInvoiceBuilder {
    account_id: AccountId,
    payment_method: PaymentMethod,
    corp_type: CorpType,
    total: Decimal,
    service_fees: Decimal,
    status: Option<InvoiceStatus>,
    line_items: Vec<PaymentLineItem>,
    routing_slip_number: Option<String>,
}

impl Default for TestInvoiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestInvoiceBuilder {
    pub fn new() -> Self {
        Self {
            account_id: AccountId::new(),
            payment_method: PaymentMethod::DirectPay,
            corp_type: CorpType::new("BEN"),
            total: dec!(31.50),
            service_fees: dec!(1.50),
            status: None,
            line_items: Vec::new(),
            routing_slip_number: None,
        }
    }

    pub fn for_account(mut self, account_id: AccountId) -> Self {
        self.account_id = account_id;
        self
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }

    pub fn with_corp_type(mut self, corp_type: impl Into<String>) -> Self {
        self.corp_type = CorpType::new(corp_type);
        self
    }

    pub fn with_total(mut self, total: Decimal) -> Self {
        self.total = total;
        self
    }

    pub fn with_status(mut self, status: InvoiceStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_line_item(mut self, item: PaymentLineItem) -> Self {
        self.line_items.push(item);
        self
    }

    pub fn against_routing_slip(mut self, number: impl Into<String>) -> Self {
        self.routing_slip_number = Some(number.into());
        self
    }

    pub fn build(self) -> Invoice {
        let mut invoice = Invoice::new(
            self.account_id,
            self.payment_method,
            self.corp_type,
            Money::cad(self.total),
            Money::cad(self.service_fees),
            Money::cad(dec!(0)),
        );
        invoice.routing_slip_number = self.routing_slip_number;
        for item in self.line_items {
            invoice.add_line_item(item);
        }
        if let Some(status) = self.status {
            // tests may start mid-lifecycle
            invoice.status = status;
        }
        invoice
    }
}

/// Builder for test payment accounts
pub struct TestAccountBuilder {
    auth_account_id: String,
    name: String,
    payment_method: PaymentMethod,
}

impl Default for TestAccountBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAccountBuilder {
    pub fn new() -> Self {
        Self {
            auth_account_id: format!("auth-{}", (1000..9999).fake::<u32>()),
            name: CompanyName().fake(),
            payment_method: PaymentMethod::Pad,
        }
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn build(self) -> PaymentAccount {
        PaymentAccount::new(self.auth_account_id, self.name, self.payment_method)
    }
}

/// Builds an EFT credit linked to an account, created at a fixed instant
pub fn eft_credit(
    short_name: ShortNameId,
    account_id: AccountId,
    amount: Decimal,
    created_on: DateTime<Utc>,
) -> EftCredit {
    EftCredit::new(short_name, Money::cad(amount), created_on).linked_to(account_id)
}

/// A plain filing line item with the given fees
pub fn line_item(filing: Decimal, service: Decimal, priority: Decimal) -> PaymentLineItem {
    PaymentLineItem::new("Test filing", Money::cad(filing))
        .with_service_fee(Money::cad(service))
        .with_priority_fee(Money::cad(priority))
}
