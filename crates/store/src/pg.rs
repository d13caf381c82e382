//! Postgres backend.
//!
//! Same operation surface as [`crate::MemStore`], with the durability
//! concerns handled here:
//!
//! - Document numbers come from an atomic counter row
//!   (`INSERT … ON CONFLICT … DO UPDATE … RETURNING`), so two requests can
//!   never mint the same sequence even under concurrency. The `UNIQUE`
//!   constraints on `patients.mrn` and `bills.number` are a backstop.
//! - Multi-step writes (bill + counter, dispense + stock decrement,
//!   batch + stock increment, payment + payment row) each run in one
//!   transaction; mutated rows are locked with `FOR UPDATE`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{PgConnection, Row};

use clinicore_billing::{Bill, BillId, BillLine, BillStatus, BillTotals, Payment, PaymentMethod};
use clinicore_clinical::{
    LabOrder, LabOrderId, LabOrderStatus, Prescription, PrescriptionId, Visit, VisitId, VitalsId,
    VitalsReading,
};
use clinicore_core::{DayRange, DomainError, Money, ProviderId, RecordId};
use clinicore_numbering::{DocumentKind, DocumentNumber};
use clinicore_pharmacy::{BatchId, Medicine, MedicineBatch, MedicineId};
use clinicore_records::{Enrollment, EnrollmentId, Patient, PatientId, Program, ProgramId};
use clinicore_scheduling::{Appointment, AppointmentId, AppointmentStatus};

use crate::error::{Access, OwnedResource, StoreError, StoreResult};
use crate::input::{
    AnalyticsSummary, MedicineUpdate, NewAppointment, NewBatch, NewBill, NewEnrollment,
    NewLabOrder, NewMedicine, NewPatient, NewPrescription, NewProgram, NewVisit, NewVitals,
    PatientUpdate, ProgramUpdate,
};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Postgres store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Run embedded migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    // ── capability check ────────────────────────────────────────────────

    pub async fn access(
        &self,
        resource: OwnedResource,
        id: RecordId,
        provider: ProviderId,
    ) -> StoreResult<Access> {
        let table = match resource {
            OwnedResource::Patient => "patients",
            OwnedResource::Program => "programs",
            OwnedResource::Appointment => "appointments",
            OwnedResource::Visit => "visits",
            OwnedResource::Prescription => "prescriptions",
            OwnedResource::LabOrder => "lab_orders",
            OwnedResource::Bill => "bills",
        };
        let sql = format!("SELECT owner FROM {table} WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            None => Access::NotFound,
            Some(row) => {
                let owner = ProviderId::from_uuid(row.try_get("owner")?);
                if owner == provider {
                    Access::Granted
                } else {
                    Access::Denied
                }
            }
        })
    }

    // ── patients ────────────────────────────────────────────────────────

    pub async fn patient_create(
        &self,
        new: NewPatient,
        now: DateTime<Utc>,
    ) -> StoreResult<Patient> {
        let mut tx = self.pool.begin().await?;

        let day = DayRange::containing(now);
        let seq = next_sequence(&mut tx, DocumentKind::MedicalRecord, &day).await?;
        let mrn = DocumentNumber::for_day(DocumentKind::MedicalRecord, &day, seq)
            .map_err(StoreError::Domain)?;

        let patient = Patient::register(new.id, mrn, new.owner, &new.name, new.demographics, now)?;

        sqlx::query(
            r#"
            INSERT INTO patients (id, mrn, owner, name, demographics, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*patient.id.0.as_uuid())
        .bind(patient.mrn.to_string())
        .bind(*patient.owner.as_uuid())
        .bind(&patient.name)
        .bind(to_json(&patient.demographics)?)
        .bind(patient.created_at)
        .bind(patient.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_err(e, "duplicate medical record number"))?;

        tx.commit().await?;
        Ok(patient)
    }

    pub async fn patient_list(&self, owner: ProviderId) -> StoreResult<Vec<Patient>> {
        let rows = sqlx::query(
            "SELECT * FROM patients WHERE owner = $1 ORDER BY created_at DESC",
        )
        .bind(*owner.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(patient_from_row).collect()
    }

    pub async fn patient_get(&self, id: PatientId) -> StoreResult<Patient> {
        let row = sqlx::query("SELECT * FROM patients WHERE id = $1")
            .bind(*id.0.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        patient_from_row(&row)
    }

    pub async fn patient_update(
        &self,
        id: PatientId,
        update: PatientUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<Patient> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT * FROM patients WHERE id = $1 FOR UPDATE")
            .bind(*id.0.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound)?;
        let mut patient = patient_from_row(&row)?;
        patient.update(update.name.as_deref(), update.demographics, now)?;

        sqlx::query(
            "UPDATE patients SET name = $2, demographics = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(*id.0.as_uuid())
        .bind(&patient.name)
        .bind(to_json(&patient.demographics)?)
        .bind(patient.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(patient)
    }

    pub async fn patient_delete(&self, id: PatientId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM patients WHERE id = $1")
            .bind(*id.0.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ── programs ────────────────────────────────────────────────────────

    pub async fn program_create(
        &self,
        new: NewProgram,
        now: DateTime<Utc>,
    ) -> StoreResult<Program> {
        let program = Program::create(new.id, new.owner, &new.name, new.description, now)?;
        sqlx::query(
            r#"
            INSERT INTO programs (id, owner, name, description, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*program.id.0.as_uuid())
        .bind(*program.owner.as_uuid())
        .bind(&program.name)
        .bind(&program.description)
        .bind(program.active)
        .bind(program.created_at)
        .bind(program.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(program)
    }

    pub async fn program_list(&self, owner: ProviderId) -> StoreResult<Vec<Program>> {
        let rows = sqlx::query(
            "SELECT * FROM programs WHERE owner = $1 ORDER BY created_at DESC",
        )
        .bind(*owner.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(program_from_row).collect()
    }

    pub async fn program_get(&self, id: ProgramId) -> StoreResult<Program> {
        let row = sqlx::query("SELECT * FROM programs WHERE id = $1")
            .bind(*id.0.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        program_from_row(&row)
    }

    pub async fn program_update(
        &self,
        id: ProgramId,
        update: ProgramUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<Program> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT * FROM programs WHERE id = $1 FOR UPDATE")
            .bind(*id.0.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound)?;
        let mut program = program_from_row(&row)?;
        program.update(
            update.name.as_deref(),
            update.description,
            update.active,
            now,
        )?;

        sqlx::query(
            "UPDATE programs SET name = $2, description = $3, active = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(*id.0.as_uuid())
        .bind(&program.name)
        .bind(&program.description)
        .bind(program.active)
        .bind(program.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(program)
    }

    pub async fn program_delete(&self, id: ProgramId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM programs WHERE id = $1")
            .bind(*id.0.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ── enrollments ─────────────────────────────────────────────────────

    pub async fn enrollment_create(
        &self,
        new: NewEnrollment,
        now: DateTime<Utc>,
    ) -> StoreResult<Enrollment> {
        let enrollment = Enrollment::new(new.id, new.patient_id, new.program_id, now);
        sqlx::query(
            r#"
            INSERT INTO enrollments (id, patient_id, program_id, enrolled_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(*enrollment.id.0.as_uuid())
        .bind(*enrollment.patient_id.0.as_uuid())
        .bind(*enrollment.program_id.0.as_uuid())
        .bind(enrollment.enrolled_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_err(e, "patient is already enrolled in this program"))?;
        Ok(enrollment)
    }

    pub async fn enrollment_list(
        &self,
        owner: ProviderId,
        patient: Option<PatientId>,
        program: Option<ProgramId>,
    ) -> StoreResult<Vec<Enrollment>> {
        let rows = sqlx::query(
            r#"
            SELECT e.* FROM enrollments e
            JOIN patients p ON p.id = e.patient_id
            WHERE p.owner = $1
              AND ($2::uuid IS NULL OR e.patient_id = $2)
              AND ($3::uuid IS NULL OR e.program_id = $3)
            ORDER BY e.enrolled_at DESC
            "#,
        )
        .bind(*owner.as_uuid())
        .bind(patient.map(|p| *p.0.as_uuid()))
        .bind(program.map(|p| *p.0.as_uuid()))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(enrollment_from_row).collect()
    }

    pub async fn enrollment_get(&self, id: EnrollmentId) -> StoreResult<Enrollment> {
        let row = sqlx::query("SELECT * FROM enrollments WHERE id = $1")
            .bind(*id.0.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        enrollment_from_row(&row)
    }

    pub async fn enrollment_delete(&self, id: EnrollmentId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM enrollments WHERE id = $1")
            .bind(*id.0.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ── appointments ────────────────────────────────────────────────────

    pub async fn appointment_create(
        &self,
        new: NewAppointment,
        now: DateTime<Utc>,
    ) -> StoreResult<Appointment> {
        let appointment = Appointment::book(
            new.id,
            new.patient_id,
            new.owner,
            new.scheduled_for,
            new.reason,
            now,
        );
        sqlx::query(
            r#"
            INSERT INTO appointments
                (id, patient_id, owner, scheduled_for, reason, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(*appointment.id.0.as_uuid())
        .bind(*appointment.patient_id.0.as_uuid())
        .bind(*appointment.owner.as_uuid())
        .bind(appointment.scheduled_for)
        .bind(&appointment.reason)
        .bind(enum_str(&appointment.status)?)
        .bind(appointment.created_at)
        .bind(appointment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_err(e, "duplicate appointment"))?;
        Ok(appointment)
    }

    pub async fn appointment_list(
        &self,
        owner: ProviderId,
        patient: Option<PatientId>,
    ) -> StoreResult<Vec<Appointment>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM appointments
            WHERE owner = $1 AND ($2::uuid IS NULL OR patient_id = $2)
            ORDER BY scheduled_for ASC
            "#,
        )
        .bind(*owner.as_uuid())
        .bind(patient.map(|p| *p.0.as_uuid()))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(appointment_from_row).collect()
    }

    pub async fn appointment_get(&self, id: AppointmentId) -> StoreResult<Appointment> {
        let row = sqlx::query("SELECT * FROM appointments WHERE id = $1")
            .bind(*id.0.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        appointment_from_row(&row)
    }

    pub async fn appointment_set_status(
        &self,
        id: AppointmentId,
        status: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<Appointment> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT * FROM appointments WHERE id = $1 FOR UPDATE")
            .bind(*id.0.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound)?;
        let mut appointment = appointment_from_row(&row)?;
        appointment.transition(status, now)?;

        sqlx::query("UPDATE appointments SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(*id.0.as_uuid())
            .bind(enum_str(&appointment.status)?)
            .bind(appointment.updated_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(appointment)
    }

    pub async fn appointment_delete(&self, id: AppointmentId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(*id.0.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ── visits ──────────────────────────────────────────────────────────

    pub async fn visit_create(&self, new: NewVisit, now: DateTime<Utc>) -> StoreResult<Visit> {
        let visit = Visit::document(
            new.id,
            new.patient_id,
            new.owner,
            new.occurred_at,
            &new.chief_complaint,
            new.notes,
            new.diagnosis,
            now,
        )?;
        sqlx::query(
            r#"
            INSERT INTO visits
                (id, patient_id, owner, occurred_at, chief_complaint, notes, diagnosis, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(*visit.id.0.as_uuid())
        .bind(*visit.patient_id.0.as_uuid())
        .bind(*visit.owner.as_uuid())
        .bind(visit.occurred_at)
        .bind(&visit.chief_complaint)
        .bind(&visit.notes)
        .bind(&visit.diagnosis)
        .bind(visit.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_err(e, "duplicate visit"))?;
        Ok(visit)
    }

    pub async fn visit_list(
        &self,
        owner: ProviderId,
        patient: Option<PatientId>,
    ) -> StoreResult<Vec<Visit>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM visits
            WHERE owner = $1 AND ($2::uuid IS NULL OR patient_id = $2)
            ORDER BY occurred_at DESC
            "#,
        )
        .bind(*owner.as_uuid())
        .bind(patient.map(|p| *p.0.as_uuid()))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(visit_from_row).collect()
    }

    pub async fn visit_get(&self, id: VisitId) -> StoreResult<Visit> {
        let row = sqlx::query("SELECT * FROM visits WHERE id = $1")
            .bind(*id.0.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        visit_from_row(&row)
    }

    // ── vitals ──────────────────────────────────────────────────────────

    pub async fn vitals_record(&self, new: NewVitals) -> StoreResult<VitalsReading> {
        let reading = VitalsReading::record(
            new.id,
            new.patient_id,
            new.recorded_at,
            new.systolic_mmhg,
            new.diastolic_mmhg,
            new.heart_rate_bpm,
            new.temperature_tenths_c,
            new.weight_grams,
            new.height_mm,
        )?;
        sqlx::query(
            r#"
            INSERT INTO vitals
                (id, patient_id, recorded_at, systolic_mmhg, diastolic_mmhg,
                 heart_rate_bpm, temperature_tenths_c, weight_grams, height_mm)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(*reading.id.0.as_uuid())
        .bind(*reading.patient_id.0.as_uuid())
        .bind(reading.recorded_at)
        .bind(reading.systolic_mmhg.map(i64::from))
        .bind(reading.diastolic_mmhg.map(i64::from))
        .bind(reading.heart_rate_bpm.map(i64::from))
        .bind(reading.temperature_tenths_c.map(i64::from))
        .bind(reading.weight_grams.map(i64::from))
        .bind(reading.height_mm.map(i64::from))
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_err(e, "duplicate vitals reading"))?;
        Ok(reading)
    }

    pub async fn vitals_list(&self, patient: PatientId) -> StoreResult<Vec<VitalsReading>> {
        let rows = sqlx::query(
            "SELECT * FROM vitals WHERE patient_id = $1 ORDER BY recorded_at DESC",
        )
        .bind(*patient.0.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(vitals_from_row).collect()
    }

    // ── prescriptions ───────────────────────────────────────────────────

    pub async fn prescription_create(
        &self,
        new: NewPrescription,
        now: DateTime<Utc>,
    ) -> StoreResult<Prescription> {
        let prescription = Prescription::order(
            new.id,
            new.patient_id,
            new.owner,
            new.medicine_id,
            new.quantity,
            &new.dosage,
            now,
        )?;
        sqlx::query(
            r#"
            INSERT INTO prescriptions
                (id, patient_id, owner, medicine_id, quantity, dosage, status,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(*prescription.id.0.as_uuid())
        .bind(*prescription.patient_id.0.as_uuid())
        .bind(*prescription.owner.as_uuid())
        .bind(*prescription.medicine_id.0.as_uuid())
        .bind(i64::from(prescription.quantity))
        .bind(&prescription.dosage)
        .bind(enum_str(&prescription.status)?)
        .bind(prescription.created_at)
        .bind(prescription.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_err(e, "duplicate prescription"))?;
        Ok(prescription)
    }

    /// `owner: None` lists clinic-wide (dispensing staff).
    pub async fn prescription_list(
        &self,
        owner: Option<ProviderId>,
        patient: Option<PatientId>,
    ) -> StoreResult<Vec<Prescription>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM prescriptions
            WHERE ($1::uuid IS NULL OR owner = $1)
              AND ($2::uuid IS NULL OR patient_id = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner.map(|o| *o.as_uuid()))
        .bind(patient.map(|p| *p.0.as_uuid()))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(prescription_from_row).collect()
    }

    pub async fn prescription_get(&self, id: PrescriptionId) -> StoreResult<Prescription> {
        let row = sqlx::query("SELECT * FROM prescriptions WHERE id = $1")
            .bind(*id.0.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        prescription_from_row(&row)
    }

    /// Dispense: flip the order and decrement stock in one transaction.
    pub async fn prescription_dispense(
        &self,
        id: PrescriptionId,
        now: DateTime<Utc>,
    ) -> StoreResult<Prescription> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT * FROM prescriptions WHERE id = $1 FOR UPDATE")
            .bind(*id.0.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound)?;
        let mut prescription = prescription_from_row(&row)?;

        let row = sqlx::query("SELECT * FROM medicines WHERE id = $1 FOR UPDATE")
            .bind(*prescription.medicine_id.0.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::Domain(DomainError::validation("medicine does not exist")))?;
        let mut medicine = medicine_from_row(&row)?;

        prescription.dispense(now)?;
        medicine.dispense(prescription.quantity, now)?;

        sqlx::query("UPDATE prescriptions SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(*id.0.as_uuid())
            .bind(enum_str(&prescription.status)?)
            .bind(prescription.updated_at)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE medicines SET stock_on_hand = $2, updated_at = $3 WHERE id = $1")
            .bind(*medicine.id.0.as_uuid())
            .bind(i64::from(medicine.stock_on_hand))
            .bind(medicine.updated_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(prescription)
    }

    pub async fn prescription_cancel(
        &self,
        id: PrescriptionId,
        now: DateTime<Utc>,
    ) -> StoreResult<Prescription> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT * FROM prescriptions WHERE id = $1 FOR UPDATE")
            .bind(*id.0.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound)?;
        let mut prescription = prescription_from_row(&row)?;
        prescription.cancel(now)?;

        sqlx::query("UPDATE prescriptions SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(*id.0.as_uuid())
            .bind(enum_str(&prescription.status)?)
            .bind(prescription.updated_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(prescription)
    }

    // ── lab orders ──────────────────────────────────────────────────────

    pub async fn lab_order_create(
        &self,
        new: NewLabOrder,
        now: DateTime<Utc>,
    ) -> StoreResult<LabOrder> {
        let order = LabOrder::order(new.id, new.patient_id, new.owner, &new.test_name, now)?;
        sqlx::query(
            r#"
            INSERT INTO lab_orders
                (id, patient_id, owner, test_name, status, result, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(*order.id.0.as_uuid())
        .bind(*order.patient_id.0.as_uuid())
        .bind(*order.owner.as_uuid())
        .bind(&order.test_name)
        .bind(enum_str(&order.status)?)
        .bind(&order.result)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_err(e, "duplicate lab order"))?;
        Ok(order)
    }

    pub async fn lab_order_list(
        &self,
        owner: ProviderId,
        patient: Option<PatientId>,
    ) -> StoreResult<Vec<LabOrder>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM lab_orders
            WHERE owner = $1 AND ($2::uuid IS NULL OR patient_id = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(*owner.as_uuid())
        .bind(patient.map(|p| *p.0.as_uuid()))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(lab_order_from_row).collect()
    }

    pub async fn lab_order_get(&self, id: LabOrderId) -> StoreResult<LabOrder> {
        let row = sqlx::query("SELECT * FROM lab_orders WHERE id = $1")
            .bind(*id.0.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        lab_order_from_row(&row)
    }

    pub async fn lab_order_set_status(
        &self,
        id: LabOrderId,
        status: LabOrderStatus,
        result: Option<String>,
        now: DateTime<Utc>,
    ) -> StoreResult<LabOrder> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT * FROM lab_orders WHERE id = $1 FOR UPDATE")
            .bind(*id.0.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound)?;
        let mut order = lab_order_from_row(&row)?;
        order.transition(status, result, now)?;

        sqlx::query(
            "UPDATE lab_orders SET status = $2, result = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(*id.0.as_uuid())
        .bind(enum_str(&order.status)?)
        .bind(&order.result)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(order)
    }

    // ── medicines ───────────────────────────────────────────────────────

    pub async fn medicine_create(
        &self,
        new: NewMedicine,
        now: DateTime<Utc>,
    ) -> StoreResult<Medicine> {
        let medicine = Medicine::create(
            new.id,
            &new.name,
            new.generic_name,
            new.form,
            new.unit_price,
            new.reorder_level,
            now,
        )?;
        sqlx::query(
            r#"
            INSERT INTO medicines
                (id, name, generic_name, form, unit_price_cents, reorder_level,
                 stock_on_hand, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(*medicine.id.0.as_uuid())
        .bind(&medicine.name)
        .bind(&medicine.generic_name)
        .bind(&medicine.form)
        .bind(medicine.unit_price.cents())
        .bind(i64::from(medicine.reorder_level))
        .bind(i64::from(medicine.stock_on_hand))
        .bind(medicine.created_at)
        .bind(medicine.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_err(e, "duplicate medicine"))?;
        Ok(medicine)
    }

    pub async fn medicine_list(&self) -> StoreResult<Vec<Medicine>> {
        let rows = sqlx::query("SELECT * FROM medicines ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(medicine_from_row).collect()
    }

    pub async fn medicine_get(&self, id: MedicineId) -> StoreResult<Medicine> {
        let row = sqlx::query("SELECT * FROM medicines WHERE id = $1")
            .bind(*id.0.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        medicine_from_row(&row)
    }

    pub async fn medicine_update(
        &self,
        id: MedicineId,
        update: MedicineUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<Medicine> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT * FROM medicines WHERE id = $1 FOR UPDATE")
            .bind(*id.0.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound)?;
        let mut medicine = medicine_from_row(&row)?;
        medicine.update(
            update.name.as_deref(),
            update.unit_price,
            update.reorder_level,
            now,
        )?;

        sqlx::query(
            r#"
            UPDATE medicines
            SET name = $2, unit_price_cents = $3, reorder_level = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(*id.0.as_uuid())
        .bind(&medicine.name)
        .bind(medicine.unit_price.cents())
        .bind(i64::from(medicine.reorder_level))
        .bind(medicine.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(medicine)
    }

    // ── batches ─────────────────────────────────────────────────────────

    /// Persist the batch and add its quantity to stock in one transaction.
    pub async fn batch_receive(
        &self,
        new: NewBatch,
        now: DateTime<Utc>,
    ) -> StoreResult<MedicineBatch> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT * FROM medicines WHERE id = $1 FOR UPDATE")
            .bind(*new.medicine_id.0.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::Domain(DomainError::validation("medicine does not exist")))?;
        let mut medicine = medicine_from_row(&row)?;

        let batch = MedicineBatch::receive(
            new.id,
            new.medicine_id,
            &new.batch_number,
            new.quantity,
            new.expiry_date,
            now,
        )?;
        medicine.receive(new.quantity, now)?;

        sqlx::query(
            r#"
            INSERT INTO medicine_batches
                (id, medicine_id, batch_number, quantity, expiry_date, received_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(*batch.id.0.as_uuid())
        .bind(*batch.medicine_id.0.as_uuid())
        .bind(&batch.batch_number)
        .bind(i64::from(batch.quantity))
        .bind(batch.expiry_date)
        .bind(batch.received_at)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE medicines SET stock_on_hand = $2, updated_at = $3 WHERE id = $1")
            .bind(*medicine.id.0.as_uuid())
            .bind(i64::from(medicine.stock_on_hand))
            .bind(medicine.updated_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(batch)
    }

    pub async fn batch_list(&self, medicine: Option<MedicineId>) -> StoreResult<Vec<MedicineBatch>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM medicine_batches
            WHERE ($1::uuid IS NULL OR medicine_id = $1)
            ORDER BY received_at DESC
            "#,
        )
        .bind(medicine.map(|m| *m.0.as_uuid()))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(batch_from_row).collect()
    }

    // ── bills ───────────────────────────────────────────────────────────

    /// Issue a bill: allocate the day's bill number and persist in one
    /// transaction.
    pub async fn bill_create(&self, new: NewBill, now: DateTime<Utc>) -> StoreResult<Bill> {
        let mut tx = self.pool.begin().await?;

        let day = DayRange::containing(now);
        let seq = next_sequence(&mut tx, DocumentKind::Bill, &day).await?;
        let number =
            DocumentNumber::for_day(DocumentKind::Bill, &day, seq).map_err(StoreError::Domain)?;

        let bill = Bill::issue(
            new.id,
            number,
            new.patient_id,
            new.owner,
            new.lines,
            new.discount_percent,
            new.notes,
            now,
        )?;

        sqlx::query(
            r#"
            INSERT INTO bills
                (id, number, patient_id, owner, lines, subtotal_cents, discount_percent,
                 discount_cents, tax_cents, total_cents, notes, status, paid_amount_cents,
                 paid_at, last_payment_method, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(*bill.id.0.as_uuid())
        .bind(bill.number.to_string())
        .bind(*bill.patient_id.0.as_uuid())
        .bind(*bill.owner.as_uuid())
        .bind(to_json(&bill.lines)?)
        .bind(bill.totals.subtotal.cents())
        .bind(i64::from(bill.totals.discount_percent))
        .bind(bill.totals.discount.cents())
        .bind(bill.totals.tax.cents())
        .bind(bill.totals.total.cents())
        .bind(&bill.notes)
        .bind(enum_str(&bill.status)?)
        .bind(bill.paid_amount.cents())
        .bind(bill.paid_at)
        .bind(match &bill.last_payment_method {
            Some(m) => Some(enum_str(m)?),
            None => None,
        })
        .bind(bill.created_at)
        .bind(bill.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_err(e, "duplicate bill number"))?;

        tx.commit().await?;
        Ok(bill)
    }

    pub async fn bill_list(
        &self,
        owner: ProviderId,
        patient: Option<PatientId>,
    ) -> StoreResult<Vec<Bill>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM bills
            WHERE owner = $1 AND ($2::uuid IS NULL OR patient_id = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(*owner.as_uuid())
        .bind(patient.map(|p| *p.0.as_uuid()))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(bill_from_row).collect()
    }

    pub async fn bill_get(&self, id: BillId) -> StoreResult<Bill> {
        let row = sqlx::query("SELECT * FROM bills WHERE id = $1")
            .bind(*id.0.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        bill_from_row(&row)
    }

    pub async fn bill_payments(&self, id: BillId) -> StoreResult<Vec<Payment>> {
        // Distinguish "no payments yet" from "no such bill".
        let exists = sqlx::query("SELECT 1 AS one FROM bills WHERE id = $1")
            .bind(*id.0.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(StoreError::NotFound);
        }

        let rows = sqlx::query(
            "SELECT * FROM payments WHERE bill_id = $1 ORDER BY recorded_at ASC",
        )
        .bind(*id.0.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(payment_from_row).collect()
    }

    /// Record a payment: bill update and payment row in one transaction.
    pub async fn bill_record_payment(
        &self,
        id: BillId,
        amount: Money,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> StoreResult<Bill> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT * FROM bills WHERE id = $1 FOR UPDATE")
            .bind(*id.0.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound)?;
        let mut bill = bill_from_row(&row)?;
        bill.record_payment(amount, method, now)?;

        sqlx::query(
            r#"
            UPDATE bills
            SET status = $2, paid_amount_cents = $3, paid_at = $4,
                last_payment_method = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(*id.0.as_uuid())
        .bind(enum_str(&bill.status)?)
        .bind(bill.paid_amount.cents())
        .bind(bill.paid_at)
        .bind(match &bill.last_payment_method {
            Some(m) => Some(enum_str(m)?),
            None => None,
        })
        .bind(bill.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO payments (id, bill_id, amount_cents, method, recorded_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(*RecordId::new().as_uuid())
        .bind(*id.0.as_uuid())
        .bind(amount.cents())
        .bind(enum_str(&method)?)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(bill)
    }

    pub async fn bill_cancel(&self, id: BillId, now: DateTime<Utc>) -> StoreResult<Bill> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT * FROM bills WHERE id = $1 FOR UPDATE")
            .bind(*id.0.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound)?;
        let mut bill = bill_from_row(&row)?;
        bill.cancel(now)?;

        sqlx::query("UPDATE bills SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(*id.0.as_uuid())
            .bind(enum_str(&bill.status)?)
            .bind(bill.updated_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(bill)
    }

    // ── analytics ───────────────────────────────────────────────────────

    pub async fn analytics(
        &self,
        owner: ProviderId,
        day: DayRange,
    ) -> StoreResult<AnalyticsSummary> {
        let owner_uuid = *owner.as_uuid();

        let patients_total = count_scalar(
            sqlx::query("SELECT COUNT(*) AS n FROM patients WHERE owner = $1")
                .bind(owner_uuid)
                .fetch_one(&self.pool)
                .await?,
        )?;
        let appointments_today = count_scalar(
            sqlx::query(
                r#"
                SELECT COUNT(*) AS n FROM appointments
                WHERE owner = $1 AND scheduled_for >= $2 AND scheduled_for < $3
                "#,
            )
            .bind(owner_uuid)
            .bind(day.start())
            .bind(day.end())
            .fetch_one(&self.pool)
            .await?,
        )?;
        let visits_today = count_scalar(
            sqlx::query(
                r#"
                SELECT COUNT(*) AS n FROM visits
                WHERE owner = $1 AND occurred_at >= $2 AND occurred_at < $3
                "#,
            )
            .bind(owner_uuid)
            .bind(day.start())
            .bind(day.end())
            .fetch_one(&self.pool)
            .await?,
        )?;
        let open_lab_orders = count_scalar(
            sqlx::query(
                "SELECT COUNT(*) AS n FROM lab_orders WHERE owner = $1 AND status IN ($2, $3)",
            )
            .bind(owner_uuid)
            .bind(enum_str(&LabOrderStatus::Ordered)?)
            .bind(enum_str(&LabOrderStatus::InProgress)?)
            .fetch_one(&self.pool)
            .await?,
        )?;
        let pending_bills = count_scalar(
            sqlx::query(
                "SELECT COUNT(*) AS n FROM bills WHERE owner = $1 AND status IN ($2, $3)",
            )
            .bind(owner_uuid)
            .bind(enum_str(&BillStatus::Pending)?)
            .bind(enum_str(&BillStatus::Partial)?)
            .fetch_one(&self.pool)
            .await?,
        )?;

        let revenue_row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(p.amount_cents), 0) AS n
            FROM payments p
            JOIN bills b ON b.id = p.bill_id
            WHERE b.owner = $1 AND p.recorded_at >= $2 AND p.recorded_at < $3
            "#,
        )
        .bind(owner_uuid)
        .bind(day.start())
        .bind(day.end())
        .fetch_one(&self.pool)
        .await?;
        let revenue_cents: i64 = revenue_row.try_get("n")?;

        let low_stock_medicines = count_scalar(
            sqlx::query("SELECT COUNT(*) AS n FROM medicines WHERE stock_on_hand < reorder_level")
                .fetch_one(&self.pool)
                .await?,
        )?;

        Ok(AnalyticsSummary {
            patients_total,
            appointments_today,
            visits_today,
            open_lab_orders,
            pending_bills,
            revenue_today: Money::from_cents(revenue_cents.max(0))
                .map_err(|e| StoreError::Database(e.to_string()))?,
            low_stock_medicines,
        })
    }
}

// ── helpers ─────────────────────────────────────────────────────────────

/// Allocate the next sequence for `(kind, day)` atomically.
async fn next_sequence(
    tx: &mut PgConnection,
    kind: DocumentKind,
    day: &DayRange,
) -> StoreResult<u32> {
    let row = sqlx::query(
        r#"
        INSERT INTO day_sequences (kind, day, last_value)
        VALUES ($1, $2, 1)
        ON CONFLICT (kind, day)
        DO UPDATE SET last_value = day_sequences.last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(kind.prefix())
    .bind(day.date())
    .fetch_one(&mut *tx)
    .await?;
    let value: i64 = row.try_get("last_value")?;
    u32::try_from(value).map_err(|_| StoreError::Database("day sequence overflow".to_string()))
}

fn map_write_err(e: sqlx::Error, conflict_msg: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        match db.kind() {
            sqlx::error::ErrorKind::UniqueViolation => {
                return StoreError::Conflict(conflict_msg.to_string());
            }
            sqlx::error::ErrorKind::ForeignKeyViolation => {
                return StoreError::Domain(DomainError::validation(
                    "referenced record does not exist",
                ));
            }
            _ => {}
        }
    }
    e.into()
}

fn to_json<T: Serialize>(value: &T) -> StoreResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| StoreError::Database(e.to_string()))
}

fn from_json<T: DeserializeOwned>(value: serde_json::Value) -> StoreResult<T> {
    serde_json::from_value(value).map_err(|e| StoreError::Database(format!("corrupt row: {e}")))
}

/// Serde name of a plain string-enum value (status columns).
fn enum_str<T: Serialize>(value: &T) -> StoreResult<String> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => Ok(s),
        _ => Err(StoreError::Database("enum did not serialize to a string".to_string())),
    }
}

fn enum_parse<T: DeserializeOwned>(s: &str) -> StoreResult<T> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|e| StoreError::Database(format!("corrupt enum column: {e}")))
}

fn money_col(row: &PgRow, col: &str) -> StoreResult<Money> {
    let cents: i64 = row.try_get(col)?;
    Money::from_cents(cents).map_err(|_| StoreError::Database(format!("negative {col} in row")))
}

fn u32_col(row: &PgRow, col: &str) -> StoreResult<u32> {
    let v: i64 = row.try_get(col)?;
    u32::try_from(v).map_err(|_| StoreError::Database(format!("{col} out of range")))
}

fn u8_col(row: &PgRow, col: &str) -> StoreResult<u8> {
    let v: i64 = row.try_get(col)?;
    u8::try_from(v).map_err(|_| StoreError::Database(format!("{col} out of range")))
}

fn opt_u16_col(row: &PgRow, col: &str) -> StoreResult<Option<u16>> {
    let v: Option<i64> = row.try_get(col)?;
    v.map(|v| u16::try_from(v).map_err(|_| StoreError::Database(format!("{col} out of range"))))
        .transpose()
}

fn opt_u32_col(row: &PgRow, col: &str) -> StoreResult<Option<u32>> {
    let v: Option<i64> = row.try_get(col)?;
    v.map(|v| u32::try_from(v).map_err(|_| StoreError::Database(format!("{col} out of range"))))
        .transpose()
}

fn document_number_col(row: &PgRow, col: &str) -> StoreResult<DocumentNumber> {
    let s: String = row.try_get(col)?;
    s.parse()
        .map_err(|e: DomainError| StoreError::Database(format!("corrupt {col}: {e}")))
}

// ── row mappers ─────────────────────────────────────────────────────────

fn patient_from_row(row: &PgRow) -> StoreResult<Patient> {
    Ok(Patient {
        id: PatientId::new(RecordId::from_uuid(row.try_get("id")?)),
        mrn: document_number_col(row, "mrn")?,
        owner: ProviderId::from_uuid(row.try_get("owner")?),
        name: row.try_get("name")?,
        demographics: from_json(row.try_get("demographics")?)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn program_from_row(row: &PgRow) -> StoreResult<Program> {
    Ok(Program {
        id: ProgramId::new(RecordId::from_uuid(row.try_get("id")?)),
        owner: ProviderId::from_uuid(row.try_get("owner")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn enrollment_from_row(row: &PgRow) -> StoreResult<Enrollment> {
    Ok(Enrollment {
        id: EnrollmentId::new(RecordId::from_uuid(row.try_get("id")?)),
        patient_id: PatientId::new(RecordId::from_uuid(row.try_get("patient_id")?)),
        program_id: ProgramId::new(RecordId::from_uuid(row.try_get("program_id")?)),
        enrolled_at: row.try_get("enrolled_at")?,
    })
}

fn appointment_from_row(row: &PgRow) -> StoreResult<Appointment> {
    let status: String = row.try_get("status")?;
    Ok(Appointment {
        id: AppointmentId::new(RecordId::from_uuid(row.try_get("id")?)),
        patient_id: PatientId::new(RecordId::from_uuid(row.try_get("patient_id")?)),
        owner: ProviderId::from_uuid(row.try_get("owner")?),
        scheduled_for: row.try_get("scheduled_for")?,
        reason: row.try_get("reason")?,
        status: enum_parse(&status)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn visit_from_row(row: &PgRow) -> StoreResult<Visit> {
    Ok(Visit {
        id: VisitId::new(RecordId::from_uuid(row.try_get("id")?)),
        patient_id: PatientId::new(RecordId::from_uuid(row.try_get("patient_id")?)),
        owner: ProviderId::from_uuid(row.try_get("owner")?),
        occurred_at: row.try_get("occurred_at")?,
        chief_complaint: row.try_get("chief_complaint")?,
        notes: row.try_get("notes")?,
        diagnosis: row.try_get("diagnosis")?,
        created_at: row.try_get("created_at")?,
    })
}

fn vitals_from_row(row: &PgRow) -> StoreResult<VitalsReading> {
    Ok(VitalsReading {
        id: VitalsId::new(RecordId::from_uuid(row.try_get("id")?)),
        patient_id: PatientId::new(RecordId::from_uuid(row.try_get("patient_id")?)),
        recorded_at: row.try_get("recorded_at")?,
        systolic_mmhg: opt_u16_col(row, "systolic_mmhg")?,
        diastolic_mmhg: opt_u16_col(row, "diastolic_mmhg")?,
        heart_rate_bpm: opt_u16_col(row, "heart_rate_bpm")?,
        temperature_tenths_c: opt_u16_col(row, "temperature_tenths_c")?,
        weight_grams: opt_u32_col(row, "weight_grams")?,
        height_mm: opt_u32_col(row, "height_mm")?,
    })
}

fn prescription_from_row(row: &PgRow) -> StoreResult<Prescription> {
    let status: String = row.try_get("status")?;
    Ok(Prescription {
        id: PrescriptionId::new(RecordId::from_uuid(row.try_get("id")?)),
        patient_id: PatientId::new(RecordId::from_uuid(row.try_get("patient_id")?)),
        owner: ProviderId::from_uuid(row.try_get("owner")?),
        medicine_id: MedicineId::new(RecordId::from_uuid(row.try_get("medicine_id")?)),
        quantity: u32_col(row, "quantity")?,
        dosage: row.try_get("dosage")?,
        status: enum_parse(&status)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn lab_order_from_row(row: &PgRow) -> StoreResult<LabOrder> {
    let status: String = row.try_get("status")?;
    Ok(LabOrder {
        id: LabOrderId::new(RecordId::from_uuid(row.try_get("id")?)),
        patient_id: PatientId::new(RecordId::from_uuid(row.try_get("patient_id")?)),
        owner: ProviderId::from_uuid(row.try_get("owner")?),
        test_name: row.try_get("test_name")?,
        status: enum_parse(&status)?,
        result: row.try_get("result")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn medicine_from_row(row: &PgRow) -> StoreResult<Medicine> {
    Ok(Medicine {
        id: MedicineId::new(RecordId::from_uuid(row.try_get("id")?)),
        name: row.try_get("name")?,
        generic_name: row.try_get("generic_name")?,
        form: row.try_get("form")?,
        unit_price: money_col(row, "unit_price_cents")?,
        reorder_level: u32_col(row, "reorder_level")?,
        stock_on_hand: u32_col(row, "stock_on_hand")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn batch_from_row(row: &PgRow) -> StoreResult<MedicineBatch> {
    Ok(MedicineBatch {
        id: BatchId::new(RecordId::from_uuid(row.try_get("id")?)),
        medicine_id: MedicineId::new(RecordId::from_uuid(row.try_get("medicine_id")?)),
        batch_number: row.try_get("batch_number")?,
        quantity: u32_col(row, "quantity")?,
        expiry_date: row.try_get("expiry_date")?,
        received_at: row.try_get("received_at")?,
    })
}

fn bill_from_row(row: &PgRow) -> StoreResult<Bill> {
    let status: String = row.try_get("status")?;
    let method: Option<String> = row.try_get("last_payment_method")?;
    let lines: Vec<BillLine> = from_json(row.try_get("lines")?)?;

    Ok(Bill {
        id: BillId::new(RecordId::from_uuid(row.try_get("id")?)),
        number: document_number_col(row, "number")?,
        patient_id: PatientId::new(RecordId::from_uuid(row.try_get("patient_id")?)),
        owner: ProviderId::from_uuid(row.try_get("owner")?),
        lines,
        totals: BillTotals {
            subtotal: money_col(row, "subtotal_cents")?,
            discount_percent: u8_col(row, "discount_percent")?,
            discount: money_col(row, "discount_cents")?,
            tax: money_col(row, "tax_cents")?,
            total: money_col(row, "total_cents")?,
        },
        notes: row.try_get("notes")?,
        status: enum_parse(&status)?,
        paid_amount: money_col(row, "paid_amount_cents")?,
        paid_at: row.try_get("paid_at")?,
        last_payment_method: method.as_deref().map(enum_parse).transpose()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn payment_from_row(row: &PgRow) -> StoreResult<Payment> {
    let method: String = row.try_get("method")?;
    Ok(Payment {
        id: RecordId::from_uuid(row.try_get("id")?),
        bill_id: BillId::new(RecordId::from_uuid(row.try_get("bill_id")?)),
        amount: money_col(row, "amount_cents")?,
        method: enum_parse(&method)?,
        recorded_at: row.try_get("recorded_at")?,
    })
}

fn count_scalar(row: PgRow) -> StoreResult<u64> {
    let n: i64 = row.try_get("n")?;
    u64::try_from(n).map_err(|_| StoreError::Database("negative count".to_string()))
}
