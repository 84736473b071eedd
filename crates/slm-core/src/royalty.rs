//! Royalty aggregation — decoding Manager contract history and dashboard totals
//!
//! A Manager contract reports its royalty history as a flat `uint256[]` of
//! `(amount, issued_at_unix_secs, paid_flag)` triples. This module turns
//! those into records and computes the figures the dashboard shows: paid and
//! unpaid totals, per-license breakdowns and a cumulative daily timeline.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoyaltyRecord {
    pub amount: u128,
    pub issued_at: DateTime<Utc>,
    pub paid: bool,
}

/// Decode `getRoyaltyHistoryLegacyDapp()` output
///
/// Fails when the length is not a multiple of three, a timestamp is out of
/// range, or a paid flag is neither 0 nor 1.
pub fn decode_legacy_history(values: &[u128]) -> Result<Vec<RoyaltyRecord>> {
    if values.len() % 3 != 0 {
        return Err(Error::ParseError(format!(
            "royalty history has {} values, expected a multiple of 3",
            values.len()
        )));
    }

    values
        .chunks_exact(3)
        .map(|triple| {
            let secs = i64::try_from(triple[1])
                .ok()
                .and_then(|s| Utc.timestamp_opt(s, 0).single())
                .ok_or_else(|| {
                    Error::ParseError(format!("royalty timestamp {} out of range", triple[1]))
                })?;
            let paid = match triple[2] {
                0 => false,
                1 => true,
                other => {
                    return Err(Error::ParseError(format!(
                        "royalty paid flag must be 0 or 1, got {}",
                        other
                    )))
                }
            };
            Ok(RoyaltyRecord {
                amount: triple[0],
                issued_at: secs,
                paid,
            })
        })
        .collect()
}

/// One Manager contract as read on a poll tick
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerSnapshot {
    pub manager_address: String,
    pub licensor: String,
    pub licensee: String,
    pub is_active: bool,
    pub royalties: Vec<RoyaltyRecord>,
}

impl ManagerSnapshot {
    pub fn paid(&self) -> u128 {
        saturating_total(self.royalties.iter().filter(|r| r.paid).map(|r| r.amount))
    }

    pub fn unpaid(&self) -> u128 {
        saturating_total(self.royalties.iter().filter(|r| !r.paid).map(|r| r.amount))
    }

    /// Running total of issued royalties in time order
    pub fn cumulative_series(&self) -> Vec<(DateTime<Utc>, u128)> {
        let mut records: Vec<&RoyaltyRecord> = self.royalties.iter().collect();
        records.sort_by_key(|r| r.issued_at);
        let mut total = 0u128;
        records
            .into_iter()
            .map(|r| {
                total = total.saturating_add(r.amount);
                (r.issued_at, total)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRoyalty {
    pub manager_address: String,
    pub licensee: String,
    pub is_active: bool,
    pub paid: u128,
    pub unpaid: u128,
    pub payments: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    /// Issued on this day, across all licenses
    pub amount: u128,
    pub cumulative: u128,
}

/// Dashboard totals across all Manager contracts
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoyaltySummary {
    pub total_paid: u128,
    pub total_unpaid: u128,
    pub active_licenses: usize,
    pub total_licenses: usize,
    pub per_license: Vec<LicenseRoyalty>,
    pub timeline: Vec<TimelinePoint>,
}

pub fn summarize(managers: &[ManagerSnapshot]) -> RoyaltySummary {
    let mut daily: BTreeMap<NaiveDate, u128> = BTreeMap::new();
    for record in managers.iter().flat_map(|m| &m.royalties) {
        let day = daily.entry(record.issued_at.date_naive()).or_insert(0);
        *day = day.saturating_add(record.amount);
    }

    let mut cumulative = 0u128;
    let timeline = daily
        .into_iter()
        .map(|(date, amount)| {
            cumulative = cumulative.saturating_add(amount);
            TimelinePoint {
                date,
                amount,
                cumulative,
            }
        })
        .collect();

    let per_license: Vec<LicenseRoyalty> = managers
        .iter()
        .map(|m| LicenseRoyalty {
            manager_address: m.manager_address.clone(),
            licensee: m.licensee.clone(),
            is_active: m.is_active,
            paid: m.paid(),
            unpaid: m.unpaid(),
            payments: m.royalties.len(),
        })
        .collect();

    RoyaltySummary {
        total_paid: saturating_total(per_license.iter().map(|l| l.paid)),
        total_unpaid: saturating_total(per_license.iter().map(|l| l.unpaid)),
        active_licenses: managers.iter().filter(|m| m.is_active).count(),
        total_licenses: managers.len(),
        per_license,
        timeline,
    }
}

// Amounts come straight from chain data; clamp instead of overflowing.
fn saturating_total(amounts: impl Iterator<Item = u128>) -> u128 {
    amounts.fold(0u128, u128::saturating_add)
}
