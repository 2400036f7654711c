//! Strongly-typed identifiers for domain entities
//!
//! Using newtype wrappers around UUIDs provides type safety and prevents
//! accidental mixing of different identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates a new time-ordered identifier (v7)
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Strip prefix if present
                let uuid_str = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(uuid_str)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

// Account domain identifiers
define_id!(AccountId, "ACC");
define_id!(CfsAccountId, "CFS");

// Ledger domain identifiers
define_id!(InvoiceId, "INV");
define_id!(InvoiceReferenceId, "INVREF");
define_id!(PaymentId, "PAY");
define_id!(ReceiptId, "RCPT");
define_id!(LineItemId, "LINE");
define_id!(RefundId, "RFND");
define_id!(RefundLineId, "RFNDL");
define_id!(CreditId, "CRED");
define_id!(EftCreditId, "EFTC");
define_id!(EftCreditLinkId, "EFTL");
define_id!(ShortNameId, "SHRT");
define_id!(RoutingSlipId, "RS");

// Distribution / disbursement identifiers
define_id!(DistributionCodeId, "DIST");
define_id!(EjvFileId, "EJVF");
define_id!(EjvHeaderId, "EJVH");
define_id!(EjvLinkId, "EJVL");
define_id!(DisbursementId, "DISB");

// Statement identifiers
define_id!(StatementId, "STMT");
