//! # Attendance Ledger
//!
//! Per-enrollment, per-session presence records.
//!
//! Marking is an upsert: a second mark for the same `(enrollment, date)`
//! overwrites rather than duplicates, so exactly one record exists per
//! session. Percentages are reported in basis points; **zero recorded
//! sessions yield an explicit "no data" (`None`), never 0%** — that
//! policy is pinned by the tests below.

use crate::EnrollmentId;
use crate::primitives::PERCENT_SCALE_BP;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate attendance for one enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSummary {
    /// Sessions marked present.
    pub present: u32,
    /// Total recorded sessions.
    pub total: u32,
    /// `present / total` in basis points (10000 = 100%).
    pub percent_bp: u32,
}

/// The attendance ledger for all enrollments.
#[derive(Debug, Clone, Default)]
pub struct AttendanceLedger {
    /// EnrollmentId -> session date -> present.
    records: BTreeMap<EnrollmentId, BTreeMap<NaiveDate, bool>>,
}

impl AttendanceLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert the presence record for one session.
    pub fn mark(&mut self, enrollment: EnrollmentId, date: NaiveDate, present: bool) {
        self.records.entry(enrollment).or_default().insert(date, present);
    }

    /// Attendance summary for an enrollment.
    ///
    /// Returns `None` when no sessions have been recorded (explicit
    /// "no data"), avoiding a division by zero.
    #[must_use]
    pub fn summary(&self, enrollment: EnrollmentId) -> Option<AttendanceSummary> {
        let sessions = self.records.get(&enrollment)?;
        if sessions.is_empty() {
            return None;
        }
        let total = sessions.len() as u32;
        let present = sessions.values().filter(|&&p| p).count() as u32;
        let percent_bp =
            ((u64::from(present) * u64::from(PERCENT_SCALE_BP)) / u64::from(total)) as u32;
        Some(AttendanceSummary {
            present,
            total,
            percent_bp,
        })
    }

    /// Session records for an enrollment in date order.
    pub fn records_for(
        &self,
        enrollment: EnrollmentId,
    ) -> impl Iterator<Item = (NaiveDate, bool)> + '_ {
        self.records
            .get(&enrollment)
            .into_iter()
            .flat_map(|sessions| sessions.iter().map(|(&date, &present)| (date, present)))
    }

    /// Drop all records for an enrollment (cascade on enrollment removal).
    pub fn remove_enrollment(&mut self, enrollment: EnrollmentId) {
        self.records.remove(&enrollment);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).expect("valid date")
    }

    #[test]
    fn second_mark_for_same_date_overwrites() {
        let mut ledger = AttendanceLedger::new();
        let e = EnrollmentId(1);

        ledger.mark(e, date(1), true);
        ledger.mark(e, date(1), false);

        let records: Vec<_> = ledger.records_for(e).collect();
        assert_eq!(records, vec![(date(1), false)]);

        let summary = ledger.summary(e).expect("summary");
        assert_eq!(summary.total, 1);
        assert_eq!(summary.present, 0);
    }

    #[test]
    fn percentage_in_basis_points() {
        let mut ledger = AttendanceLedger::new();
        let e = EnrollmentId(1);

        ledger.mark(e, date(1), true);
        ledger.mark(e, date(2), true);
        ledger.mark(e, date(3), false);

        let summary = ledger.summary(e).expect("summary");
        assert_eq!(summary.present, 2);
        assert_eq!(summary.total, 3);
        // 2/3 = 66.66% -> 6666 bp, truncated.
        assert_eq!(summary.percent_bp, 6666);
    }

    /// Pinned policy: zero recorded sessions is explicit "no data",
    /// not a 0% figure.
    #[test]
    fn zero_sessions_is_no_data() {
        let ledger = AttendanceLedger::new();
        assert_eq!(ledger.summary(EnrollmentId(1)), None);
    }

    #[test]
    fn full_attendance_is_ten_thousand_bp() {
        let mut ledger = AttendanceLedger::new();
        let e = EnrollmentId(1);
        ledger.mark(e, date(1), true);
        ledger.mark(e, date(2), true);
        assert_eq!(ledger.summary(e).expect("summary").percent_bp, 10000);
    }

    #[test]
    fn remove_enrollment_cascades_records() {
        let mut ledger = AttendanceLedger::new();
        let e = EnrollmentId(1);
        ledger.mark(e, date(1), true);
        ledger.remove_enrollment(e);
        assert_eq!(ledger.summary(e), None);
        assert_eq!(ledger.records_for(e).count(), 0);
    }

    #[test]
    fn records_are_independent_per_enrollment() {
        let mut ledger = AttendanceLedger::new();
        ledger.mark(EnrollmentId(1), date(1), true);
        ledger.mark(EnrollmentId(2), date(1), false);

        assert_eq!(ledger.summary(EnrollmentId(1)).expect("a").present, 1);
        assert_eq!(ledger.summary(EnrollmentId(2)).expect("b").present, 0);
    }
}
