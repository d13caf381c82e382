//! Request DTOs, parse helpers, and JSON mapping.
//!
//! Ids, timestamps, and enums arrive as strings and are parsed here with
//! 400 responses on failure; required-but-absent fields surface as domain
//! validation errors rather than serde rejections, so every 400 carries the
//! uniform `{ "error", "message" }` body.

use axum::http::StatusCode;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use clinicore_billing::{Bill, Payment};
use clinicore_clinical::{LabOrder, Prescription, Visit, VitalsReading};
use clinicore_core::RecordId;
use clinicore_pharmacy::{Medicine, MedicineBatch};
use clinicore_records::{Enrollment, Patient, Program, Sex};
use clinicore_scheduling::Appointment;
use clinicore_store::AnalyticsSummary;

use crate::app::errors;

// -------------------------
// Parse helpers
// -------------------------

pub fn parse_id(s: &str, what: &str) -> Result<RecordId, axum::response::Response> {
    s.parse().map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            format!("invalid {what}"),
        )
    })
}

pub fn parse_rfc3339(s: &str, what: &str) -> Result<DateTime<Utc>, axum::response::Response> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_timestamp",
                format!("{what} must be RFC3339"),
            )
        })
}

pub fn parse_date(s: &str, what: &str) -> Result<NaiveDate, axum::response::Response> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_date",
            format!("{what} must be YYYY-MM-DD"),
        )
    })
}

/// Parse a status/enum string by its serde name (e.g. "IN_PROGRESS").
pub fn parse_enum<T: DeserializeOwned>(
    s: &str,
    what: &str,
) -> Result<T, axum::response::Response> {
    serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_status",
            format!("unknown {what}: {s}"),
        )
    })
}

pub fn required<T>(value: Option<T>, what: &str) -> Result<T, axum::response::Response> {
    value.ok_or_else(|| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            format!("{what} is required"),
        )
    })
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreatePatientRequest {
    pub name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<Sex>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// PUT semantics: the demographics block is replaced wholesale with the
/// fields provided here; an absent `name` keeps the current one.
#[derive(Debug, Deserialize)]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<Sex>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProgramRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProgramRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEnrollmentRequest {
    pub patient_id: Option<String>,
    pub program_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Option<String>,
    /// RFC3339.
    pub scheduled_for: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetLabOrderStatusRequest {
    pub status: Option<String>,
    pub result: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateVisitRequest {
    pub patient_id: Option<String>,
    /// RFC3339; defaults to now.
    pub occurred_at: Option<String>,
    pub chief_complaint: Option<String>,
    pub notes: Option<String>,
    pub diagnosis: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateVitalsRequest {
    pub patient_id: Option<String>,
    /// RFC3339; defaults to now.
    pub recorded_at: Option<String>,
    pub systolic_mmhg: Option<u16>,
    pub diastolic_mmhg: Option<u16>,
    pub heart_rate_bpm: Option<u16>,
    pub temperature_tenths_c: Option<u16>,
    pub weight_grams: Option<u32>,
    pub height_mm: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePrescriptionRequest {
    pub patient_id: Option<String>,
    pub medicine_id: Option<String>,
    pub quantity: Option<u32>,
    pub dosage: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLabOrderRequest {
    pub patient_id: Option<String>,
    pub test_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMedicineRequest {
    pub name: Option<String>,
    pub generic_name: Option<String>,
    pub form: Option<String>,
    pub unit_price_cents: Option<i64>,
    pub reorder_level: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMedicineRequest {
    pub name: Option<String>,
    pub unit_price_cents: Option<i64>,
    pub reorder_level: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBatchRequest {
    pub medicine_id: Option<String>,
    pub batch_number: Option<String>,
    pub quantity: Option<u32>,
    /// YYYY-MM-DD.
    pub expiry_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BillLineRequest {
    pub description: Option<String>,
    pub quantity: Option<u32>,
    pub unit_price_cents: Option<i64>,
    /// One of CONSULTATION, PROCEDURE, MEDICATION, LAB_TEST, OTHER.
    pub item_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBillRequest {
    pub patient_id: Option<String>,
    pub lines: Option<Vec<BillLineRequest>>,
    pub discount_percent: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordPaymentRequest {
    pub amount_cents: Option<i64>,
    /// One of CASH, CARD, MOBILE_MONEY, INSURANCE.
    pub method: Option<String>,
}

/// Common list filters; ids are parsed in the routes.
#[derive(Debug, Default, Deserialize)]
pub struct ListFilter {
    pub patient_id: Option<String>,
    pub program_id: Option<String>,
    pub medicine_id: Option<String>,
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn patient_to_json(p: &Patient) -> serde_json::Value {
    serde_json::json!({
        "id": p.id.to_string(),
        "mrn": p.mrn.to_string(),
        "name": p.name,
        "date_of_birth": p.demographics.date_of_birth,
        "sex": p.demographics.sex,
        "phone": p.demographics.phone,
        "email": p.demographics.email,
        "address": p.demographics.address,
        "created_at": p.created_at.to_rfc3339(),
        "updated_at": p.updated_at.to_rfc3339(),
    })
}

pub fn program_to_json(p: &Program) -> serde_json::Value {
    serde_json::json!({
        "id": p.id.to_string(),
        "name": p.name,
        "description": p.description,
        "active": p.active,
        "created_at": p.created_at.to_rfc3339(),
        "updated_at": p.updated_at.to_rfc3339(),
    })
}

pub fn enrollment_to_json(e: &Enrollment) -> serde_json::Value {
    serde_json::json!({
        "id": e.id.to_string(),
        "patient_id": e.patient_id.to_string(),
        "program_id": e.program_id.to_string(),
        "enrolled_at": e.enrolled_at.to_rfc3339(),
    })
}

pub fn appointment_to_json(a: &Appointment) -> serde_json::Value {
    serde_json::json!({
        "id": a.id.to_string(),
        "patient_id": a.patient_id.to_string(),
        "scheduled_for": a.scheduled_for.to_rfc3339(),
        "reason": a.reason,
        "status": a.status,
        "created_at": a.created_at.to_rfc3339(),
        "updated_at": a.updated_at.to_rfc3339(),
    })
}

pub fn visit_to_json(v: &Visit) -> serde_json::Value {
    serde_json::json!({
        "id": v.id.to_string(),
        "patient_id": v.patient_id.to_string(),
        "occurred_at": v.occurred_at.to_rfc3339(),
        "chief_complaint": v.chief_complaint,
        "notes": v.notes,
        "diagnosis": v.diagnosis,
        "created_at": v.created_at.to_rfc3339(),
    })
}

pub fn vitals_to_json(v: &VitalsReading) -> serde_json::Value {
    serde_json::json!({
        "id": v.id.to_string(),
        "patient_id": v.patient_id.to_string(),
        "recorded_at": v.recorded_at.to_rfc3339(),
        "systolic_mmhg": v.systolic_mmhg,
        "diastolic_mmhg": v.diastolic_mmhg,
        "heart_rate_bpm": v.heart_rate_bpm,
        "temperature_tenths_c": v.temperature_tenths_c,
        "weight_grams": v.weight_grams,
        "height_mm": v.height_mm,
    })
}

pub fn prescription_to_json(p: &Prescription) -> serde_json::Value {
    serde_json::json!({
        "id": p.id.to_string(),
        "patient_id": p.patient_id.to_string(),
        "medicine_id": p.medicine_id.to_string(),
        "quantity": p.quantity,
        "dosage": p.dosage,
        "status": p.status,
        "created_at": p.created_at.to_rfc3339(),
        "updated_at": p.updated_at.to_rfc3339(),
    })
}

pub fn lab_order_to_json(o: &LabOrder) -> serde_json::Value {
    serde_json::json!({
        "id": o.id.to_string(),
        "patient_id": o.patient_id.to_string(),
        "test_name": o.test_name,
        "status": o.status,
        "result": o.result,
        "created_at": o.created_at.to_rfc3339(),
        "updated_at": o.updated_at.to_rfc3339(),
    })
}

pub fn medicine_to_json(m: &Medicine) -> serde_json::Value {
    serde_json::json!({
        "id": m.id.to_string(),
        "name": m.name,
        "generic_name": m.generic_name,
        "form": m.form,
        "unit_price_cents": m.unit_price.cents(),
        "reorder_level": m.reorder_level,
        "stock_on_hand": m.stock_on_hand,
        "below_reorder_level": m.is_below_reorder_level(),
        "created_at": m.created_at.to_rfc3339(),
        "updated_at": m.updated_at.to_rfc3339(),
    })
}

pub fn batch_to_json(b: &MedicineBatch) -> serde_json::Value {
    serde_json::json!({
        "id": b.id.to_string(),
        "medicine_id": b.medicine_id.to_string(),
        "batch_number": b.batch_number,
        "quantity": b.quantity,
        "expiry_date": b.expiry_date,
        "received_at": b.received_at.to_rfc3339(),
    })
}

pub fn bill_to_json(b: &Bill) -> serde_json::Value {
    serde_json::json!({
        "id": b.id.to_string(),
        "number": b.number.to_string(),
        "patient_id": b.patient_id.to_string(),
        "lines": b.lines.iter().map(|l| serde_json::json!({
            "description": l.description,
            "quantity": l.quantity,
            "unit_price_cents": l.unit_price.cents(),
            "item_type": l.item_type,
            "line_total_cents": l.line_total.cents(),
        })).collect::<Vec<_>>(),
        "subtotal_cents": b.totals.subtotal.cents(),
        "discount_percent": b.totals.discount_percent,
        "discount_cents": b.totals.discount.cents(),
        "tax_cents": b.totals.tax.cents(),
        "total_cents": b.totals.total.cents(),
        "notes": b.notes,
        "status": b.status,
        "paid_amount_cents": b.paid_amount.cents(),
        "outstanding_cents": b.outstanding().cents(),
        "paid_at": b.paid_at.map(|t| t.to_rfc3339()),
        "last_payment_method": b.last_payment_method,
        "created_at": b.created_at.to_rfc3339(),
        "updated_at": b.updated_at.to_rfc3339(),
    })
}

pub fn payment_to_json(p: &Payment) -> serde_json::Value {
    serde_json::json!({
        "id": p.id.to_string(),
        "bill_id": p.bill_id.to_string(),
        "amount_cents": p.amount.cents(),
        "method": p.method,
        "recorded_at": p.recorded_at.to_rfc3339(),
    })
}

pub fn analytics_to_json(s: &AnalyticsSummary) -> serde_json::Value {
    serde_json::json!({
        "patients_total": s.patients_total,
        "appointments_today": s.appointments_today,
        "visits_today": s.visits_today,
        "open_lab_orders": s.open_lab_orders,
        "pending_bills": s.pending_bills,
        "revenue_today_cents": s.revenue_today.cents(),
        "low_stock_medicines": s.low_stock_medicines,
    })
}
