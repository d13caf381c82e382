use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clinicore_core::{DomainError, DomainResult, RecordId};
use clinicore_records::PatientId;

/// Vitals-reading identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VitalsId(pub RecordId);

impl VitalsId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for VitalsId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// One set of vital signs.
///
/// Units are integer throughout: pressures in mmHg, temperature in tenths of
/// a degree Celsius, weight in grams, height in millimetres. All fields are
/// optional; present fields are sanity-bounded at recording time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VitalsReading {
    pub id: VitalsId,
    pub patient_id: PatientId,
    pub recorded_at: DateTime<Utc>,
    pub systolic_mmhg: Option<u16>,
    pub diastolic_mmhg: Option<u16>,
    pub heart_rate_bpm: Option<u16>,
    pub temperature_tenths_c: Option<u16>,
    pub weight_grams: Option<u32>,
    pub height_mm: Option<u32>,
}

impl VitalsReading {
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        id: VitalsId,
        patient_id: PatientId,
        recorded_at: DateTime<Utc>,
        systolic_mmhg: Option<u16>,
        diastolic_mmhg: Option<u16>,
        heart_rate_bpm: Option<u16>,
        temperature_tenths_c: Option<u16>,
        weight_grams: Option<u32>,
        height_mm: Option<u32>,
    ) -> DomainResult<Self> {
        check_range("systolic pressure", systolic_mmhg, 40, 300)?;
        check_range("diastolic pressure", diastolic_mmhg, 20, 200)?;
        check_range("heart rate", heart_rate_bpm, 20, 300)?;
        check_range("temperature", temperature_tenths_c, 250, 450)?;
        check_range("weight", weight_grams, 200, 500_000)?;
        check_range("height", height_mm, 200, 2_800)?;

        if let (Some(sys), Some(dia)) = (systolic_mmhg, diastolic_mmhg) {
            if dia >= sys {
                return Err(DomainError::validation(
                    "diastolic pressure must be below systolic",
                ));
            }
        }

        Ok(Self {
            id,
            patient_id,
            recorded_at,
            systolic_mmhg,
            diastolic_mmhg,
            heart_rate_bpm,
            temperature_tenths_c,
            weight_grams,
            height_mm,
        })
    }
}

fn check_range<T: PartialOrd + core::fmt::Display>(
    what: &str,
    value: Option<T>,
    min: T,
    max: T,
) -> DomainResult<()> {
    if let Some(v) = value {
        if v < min || v > max {
            return Err(DomainError::validation(format!(
                "{what} out of range ({min}..={max})"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sys: Option<u16>, dia: Option<u16>) -> DomainResult<VitalsReading> {
        VitalsReading::record(
            VitalsId::new(RecordId::new()),
            PatientId::new(RecordId::new()),
            Utc::now(),
            sys,
            dia,
            Some(72),
            Some(368),
            Some(70_000),
            Some(1_750),
        )
    }

    #[test]
    fn plausible_reading_is_accepted() {
        assert!(record(Some(120), Some(80)).is_ok());
    }

    #[test]
    fn out_of_range_pressure_is_rejected() {
        assert!(record(Some(320), Some(80)).is_err());
        assert!(record(Some(120), Some(10)).is_err());
    }

    #[test]
    fn inverted_pressures_are_rejected() {
        assert!(record(Some(80), Some(120)).is_err());
    }

    #[test]
    fn absent_fields_are_fine() {
        assert!(record(None, None).is_ok());
    }
}
