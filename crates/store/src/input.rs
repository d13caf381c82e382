//! Write inputs and read models for store operations.
//!
//! Routes parse DTOs into these; the store validates through the domain
//! constructors and returns full domain values.

use chrono::{DateTime, NaiveDate, Utc};

use clinicore_billing::{BillId, BillLine};
use clinicore_clinical::{LabOrderId, PrescriptionId, VisitId, VitalsId};
use clinicore_core::{Money, ProviderId};
use clinicore_pharmacy::{BatchId, MedicineId};
use clinicore_records::{Demographics, EnrollmentId, PatientId, ProgramId};
use clinicore_scheduling::AppointmentId;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct NewPatient {
    pub id: PatientId,
    pub owner: ProviderId,
    pub name: String,
    pub demographics: Demographics,
}

#[derive(Debug, Clone, Default)]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub demographics: Option<Demographics>,
}

#[derive(Debug, Clone)]
pub struct NewProgram {
    pub id: ProgramId,
    pub owner: ProviderId,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProgramUpdate {
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewEnrollment {
    pub id: EnrollmentId,
    pub patient_id: PatientId,
    pub program_id: ProgramId,
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub id: AppointmentId,
    pub patient_id: PatientId,
    pub owner: ProviderId,
    pub scheduled_for: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewVisit {
    pub id: VisitId,
    pub patient_id: PatientId,
    pub owner: ProviderId,
    pub occurred_at: DateTime<Utc>,
    pub chief_complaint: String,
    pub notes: Option<String>,
    pub diagnosis: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewVitals {
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

#[derive(Debug, Clone)]
pub struct NewPrescription {
    pub id: PrescriptionId,
    pub patient_id: PatientId,
    pub owner: ProviderId,
    pub medicine_id: MedicineId,
    pub quantity: u32,
    pub dosage: String,
}

#[derive(Debug, Clone)]
pub struct NewLabOrder {
    pub id: LabOrderId,
    pub patient_id: PatientId,
    pub owner: ProviderId,
    pub test_name: String,
}

#[derive(Debug, Clone)]
pub struct NewMedicine {
    pub id: MedicineId,
    pub name: String,
    pub generic_name: Option<String>,
    pub form: Option<String>,
    pub unit_price: Money,
    pub reorder_level: u32,
}

#[derive(Debug, Clone, Default)]
pub struct MedicineUpdate {
    pub name: Option<String>,
    pub unit_price: Option<Money>,
    pub reorder_level: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct NewBatch {
    pub id: BatchId,
    pub medicine_id: MedicineId,
    pub batch_number: String,
    pub quantity: u32,
    pub expiry_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct NewBill {
    pub id: BillId,
    pub patient_id: PatientId,
    pub owner: ProviderId,
    pub lines: Vec<BillLine>,
    pub discount_percent: u8,
    pub notes: Option<String>,
}

/// Dashboard summary for one provider and one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsSummary {
    pub patients_total: u64,
    pub appointments_today: u64,
    pub visits_today: u64,
    pub open_lab_orders: u64,
    pub pending_bills: u64,
    pub revenue_today: Money,
    pub low_stock_medicines: u64,
}
