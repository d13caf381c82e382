use core::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use clinicore_core::{DayRange, DomainError, DomainResult};

/// Kind of numbered document. The prefix keys the per-day counter, so
/// sequences for different kinds never collide.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    MedicalRecord,
    Bill,
}

impl DocumentKind {
    pub fn prefix(self) -> &'static str {
        match self {
            DocumentKind::MedicalRecord => "MRN",
            DocumentKind::Bill => "BILL",
        }
    }

    fn from_prefix(s: &str) -> Option<Self> {
        match s {
            "MRN" => Some(DocumentKind::MedicalRecord),
            "BILL" => Some(DocumentKind::Bill),
            _ => None,
        }
    }
}

/// A parsed document number: kind, issue day, and 1-based sequence.
///
/// Rendered as `PREFIX-YYYYMMDD-NNNN`. Sequences are zero-padded to four
/// digits; the ten-thousandth-and-later numbers of a day render unpadded
/// rather than truncated.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DocumentNumber {
    kind: DocumentKind,
    date: NaiveDate,
    sequence: u32,
}

impl DocumentNumber {
    pub fn new(kind: DocumentKind, date: NaiveDate, sequence: u32) -> DomainResult<Self> {
        if sequence == 0 {
            return Err(DomainError::validation("document sequence starts at 1"));
        }
        Ok(Self {
            kind,
            date,
            sequence,
        })
    }

    /// Number for a given day window (the common allocation path).
    pub fn for_day(kind: DocumentKind, day: &DayRange, sequence: u32) -> DomainResult<Self> {
        Self::new(kind, day.date(), sequence)
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl core::fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}-{}-{:04}",
            self.kind.prefix(),
            self.date.format("%Y%m%d"),
            self.sequence
        )
    }
}

impl Serialize for DocumentNumber {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DocumentNumber {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl FromStr for DocumentNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '-');
        let (prefix, date, seq) = match (parts.next(), parts.next(), parts.next()) {
            (Some(p), Some(d), Some(n)) => (p, d, n),
            _ => {
                return Err(DomainError::invalid_id(format!(
                    "document number must be PREFIX-YYYYMMDD-NNNN: {s}"
                )));
            }
        };

        let kind = DocumentKind::from_prefix(prefix)
            .ok_or_else(|| DomainError::invalid_id(format!("unknown document prefix: {prefix}")))?;

        if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::invalid_id(format!(
                "document date must be 8 digits: {date}"
            )));
        }
        let date = NaiveDate::parse_from_str(date, "%Y%m%d")
            .map_err(|e| DomainError::invalid_id(format!("document date: {e}")))?;

        if seq.is_empty() || !seq.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::invalid_id(format!(
                "document sequence must be digits: {seq}"
            )));
        }
        let sequence: u32 = seq
            .parse()
            .map_err(|e| DomainError::invalid_id(format!("document sequence: {e}")))?;

        Self::new(kind, date, sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn renders_zero_padded() {
        let n = DocumentNumber::new(DocumentKind::MedicalRecord, day(2025, 3, 14), 1).unwrap();
        assert_eq!(n.to_string(), "MRN-20250314-0001");

        let n = DocumentNumber::new(DocumentKind::Bill, day(2025, 3, 14), 412).unwrap();
        assert_eq!(n.to_string(), "BILL-20250314-0412");
    }

    #[test]
    fn large_sequences_render_unpadded() {
        let n = DocumentNumber::new(DocumentKind::Bill, day(2025, 3, 14), 10_001).unwrap();
        assert_eq!(n.to_string(), "BILL-20250314-10001");
        assert_eq!(n.to_string().parse::<DocumentNumber>().unwrap(), n);
    }

    #[test]
    fn zero_sequence_is_rejected() {
        assert!(DocumentNumber::new(DocumentKind::Bill, day(2025, 3, 14), 0).is_err());
    }

    #[test]
    fn parse_rejects_malformed_numbers() {
        for bad in [
            "MRN-20250314",          // missing sequence
            "XYZ-20250314-0001",     // unknown prefix
            "MRN-2025031-0001",      // short date
            "MRN-20251340-0001",     // impossible date
            "MRN-20250314-",         // empty sequence
            "MRN-20250314-00a1",     // non-digit sequence
            "MRN-20250314-0000",     // zero sequence
            "mrn-20250314-0001",     // prefix is case-sensitive
        ] {
            assert!(bad.parse::<DocumentNumber>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn consecutive_sequences_differ_by_one() {
        let first = DocumentNumber::new(DocumentKind::MedicalRecord, day(2025, 3, 14), 7).unwrap();
        let second = DocumentNumber::new(DocumentKind::MedicalRecord, day(2025, 3, 14), 8).unwrap();
        assert_eq!(second.sequence(), first.sequence() + 1);
        assert_eq!(first.date(), second.date());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn format_parse_round_trip(
                kind_is_mrn: bool,
                days_from_epoch in 0i64..40_000,
                sequence in 1u32..1_000_000,
            ) {
                let kind = if kind_is_mrn {
                    DocumentKind::MedicalRecord
                } else {
                    DocumentKind::Bill
                };
                let date = NaiveDate::from_num_days_from_ce_opt(719_163 + days_from_epoch as i32)
                    .unwrap();
                let n = DocumentNumber::new(kind, date, sequence).unwrap();
                let parsed: DocumentNumber = n.to_string().parse().unwrap();
                prop_assert_eq!(parsed, n);
            }
        }
    }
}
