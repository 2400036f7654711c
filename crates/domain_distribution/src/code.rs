//! Distribution codes
//!
//! A distribution code is a time-bounded GL coding template. Changing the
//! coding of a code already referenced by settled invoices does not rewrite
//! history: affected invoices are flagged for a revenue-update sweep and a
//! batch job re-posts them against the new coding.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{DistributionCodeId, ValidPeriod};

use crate::error::DistributionError;

/// The five GL account segments the fiscal system posts against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlCoding {
    pub client: String,
    pub responsibility_centre: String,
    pub service_line: String,
    pub stob: String,
    pub project_code: String,
}

impl GlCoding {
    pub fn new(
        client: impl Into<String>,
        responsibility_centre: impl Into<String>,
        service_line: impl Into<String>,
        stob: impl Into<String>,
        project_code: impl Into<String>,
    ) -> Result<Self, DistributionError> {
        let coding = Self {
            client: client.into(),
            responsibility_centre: responsibility_centre.into(),
            service_line: service_line.into(),
            stob: stob.into(),
            project_code: project_code.into(),
        };
        coding.validate()?;
        Ok(coding)
    }

    fn validate(&self) -> Result<(), DistributionError> {
        for (segment, value) in [
            ("client", &self.client),
            ("responsibility_centre", &self.responsibility_centre),
            ("service_line", &self.service_line),
            ("stob", &self.stob),
            ("project_code", &self.project_code),
        ] {
            if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(DistributionError::InvalidSegment {
                    segment: segment.to_string(),
                    message: "must be non-empty and alphanumeric".to_string(),
                });
            }
        }
        Ok(())
    }

    /// The dotted account string the fiscal system expects
    pub fn account_string(&self) -> String {
        format!(
            "{}.{}.{}.{}.{}.000000.0000",
            self.client, self.responsibility_centre, self.service_line, self.stob, self.project_code
        )
    }
}

/// A GL coding template with optional fee and disbursement companions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionCode {
    pub id: DistributionCodeId,
    pub name: String,
    pub coding: GlCoding,
    /// Coding used for the service-fee share of a line
    pub service_fee_distribution_id: Option<DistributionCodeId>,
    /// Coding used when disbursing the partner share
    pub disbursement_distribution_id: Option<DistributionCodeId>,
    /// Excludes this code's invoices from journal-voucher disbursement
    pub stop_ejv: bool,
    /// When this template is in force
    pub validity: ValidPeriod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DistributionCode {
    pub fn new(name: impl Into<String>, coding: GlCoding, effective_from: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: DistributionCodeId::new_v7(),
            name: name.into(),
            coding,
            service_fee_distribution_id: None,
            disbursement_distribution_id: None,
            stop_ejv: false,
            validity: ValidPeriod::from(effective_from),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_service_fee_distribution(mut self, id: DistributionCodeId) -> Self {
        self.service_fee_distribution_id = Some(id);
        self
    }

    pub fn with_disbursement_distribution(mut self, id: DistributionCodeId) -> Self {
        self.disbursement_distribution_id = Some(id);
        self
    }

    /// True when the template is in force at the given instant
    pub fn is_effective_at(&self, at: DateTime<Utc>) -> bool {
        self.validity.contains(at)
    }

    /// Replaces the GL coding and reports whether a revenue sweep is needed
    ///
    /// A sweep is required when the account segments changed while settled
    /// invoices already reference this code; the caller flags those
    /// invoices UPDATE_REVENUE_ACCOUNT and the distribution batch job
    /// re-posts them.
    pub fn update_coding(&mut self, coding: GlCoding, has_references: bool) -> RevenueSweep {
        if coding == self.coding {
            return RevenueSweep::NotRequired;
        }
        self.coding = coding;
        self.updated_at = Utc::now();
        if has_references {
            RevenueSweep::Required
        } else {
            RevenueSweep::NotRequired
        }
    }

    /// Closes the validity window, retiring the template
    pub fn retire(&mut self, end: DateTime<Utc>) -> Result<(), DistributionError> {
        self.validity.close(end).map_err(|_| DistributionError::InvalidSegment {
            segment: "validity".to_string(),
            message: "end must fall after start".to_string(),
        })?;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Whether mutating a distribution code requires re-posting referenced
/// invoices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevenueSweep {
    Required,
    NotRequired,
}

/// Picks the code effective on the given local date from a history list
pub fn effective_on<'a>(
    codes: &'a [DistributionCode],
    date: NaiveDate,
) -> Result<&'a DistributionCode, DistributionError> {
    let at = date
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc();
    codes
        .iter()
        .find(|code| code.is_effective_at(at))
        .ok_or_else(|| {
            let name = codes.first().map(|c| c.name.clone()).unwrap_or_default();
            DistributionError::NotEffective(name, date)
        })
}
