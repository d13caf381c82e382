//! Backend selection and dispatch.
//!
//! `AppServices` is an enum over the two store backends. Dev and tests run
//! in-memory; production sets `USE_PERSISTENT_STORE=true` and
//! `DATABASE_URL` to run on Postgres (migrations run at startup).

use chrono::{DateTime, Utc};

use clinicore_billing::{Bill, BillId, Payment, PaymentMethod};
use clinicore_clinical::{
    LabOrder, LabOrderId, LabOrderStatus, Prescription, PrescriptionId, Visit, VisitId,
    VitalsReading,
};
use clinicore_core::{DayRange, Money, ProviderId, RecordId};
use clinicore_pharmacy::{Medicine, MedicineBatch, MedicineId};
use clinicore_records::{Enrollment, EnrollmentId, Patient, PatientId, Program, ProgramId};
use clinicore_scheduling::{Appointment, AppointmentId, AppointmentStatus};
use clinicore_store::{
    Access, AnalyticsSummary, MedicineUpdate, MemStore, NewAppointment, NewBatch, NewBill,
    NewEnrollment, NewLabOrder, NewMedicine, NewPatient, NewPrescription, NewProgram, NewVisit,
    NewVitals, OwnedResource, PatientUpdate, PgStore, ProgramUpdate, StoreResult,
};

pub enum AppServices {
    Mem(MemStore),
    Pg(PgStore),
}

pub async fn build_services() -> anyhow::Result<AppServices> {
    let use_persistent = std::env::var("USE_PERSISTENT_STORE")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if use_persistent {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set when USE_PERSISTENT_STORE=true"))?;
        let store = PgStore::connect(&database_url)
            .await
            .map_err(|e| anyhow::anyhow!("failed to connect to Postgres: {e}"))?;
        store
            .migrate()
            .await
            .map_err(|e| anyhow::anyhow!("failed to run migrations: {e}"))?;
        tracing::info!("store backend: postgres");
        Ok(AppServices::Pg(store))
    } else {
        tracing::info!("store backend: in-memory");
        Ok(AppServices::Mem(MemStore::new()))
    }
}

/// Forward one call to whichever backend is active.
macro_rules! on_store {
    ($self:expr, $s:ident => $call:expr) => {
        match $self {
            AppServices::Mem($s) => $call,
            AppServices::Pg($s) => $call,
        }
    };
}

impl AppServices {
    pub async fn access(
        &self,
        resource: OwnedResource,
        id: RecordId,
        provider: ProviderId,
    ) -> StoreResult<Access> {
        on_store!(self, s => s.access(resource, id, provider).await)
    }

    // patients

    pub async fn patient_create(
        &self,
        new: NewPatient,
        now: DateTime<Utc>,
    ) -> StoreResult<Patient> {
        on_store!(self, s => s.patient_create(new, now).await)
    }

    pub async fn patient_list(&self, owner: ProviderId) -> StoreResult<Vec<Patient>> {
        on_store!(self, s => s.patient_list(owner).await)
    }

    pub async fn patient_get(&self, id: PatientId) -> StoreResult<Patient> {
        on_store!(self, s => s.patient_get(id).await)
    }

    pub async fn patient_update(
        &self,
        id: PatientId,
        update: PatientUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<Patient> {
        on_store!(self, s => s.patient_update(id, update, now).await)
    }

    pub async fn patient_delete(&self, id: PatientId) -> StoreResult<()> {
        on_store!(self, s => s.patient_delete(id).await)
    }

    // programs

    pub async fn program_create(
        &self,
        new: NewProgram,
        now: DateTime<Utc>,
    ) -> StoreResult<Program> {
        on_store!(self, s => s.program_create(new, now).await)
    }

    pub async fn program_list(&self, owner: ProviderId) -> StoreResult<Vec<Program>> {
        on_store!(self, s => s.program_list(owner).await)
    }

    pub async fn program_get(&self, id: ProgramId) -> StoreResult<Program> {
        on_store!(self, s => s.program_get(id).await)
    }

    pub async fn program_update(
        &self,
        id: ProgramId,
        update: ProgramUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<Program> {
        on_store!(self, s => s.program_update(id, update, now).await)
    }

    pub async fn program_delete(&self, id: ProgramId) -> StoreResult<()> {
        on_store!(self, s => s.program_delete(id).await)
    }

    // enrollments

    pub async fn enrollment_create(
        &self,
        new: NewEnrollment,
        now: DateTime<Utc>,
    ) -> StoreResult<Enrollment> {
        on_store!(self, s => s.enrollment_create(new, now).await)
    }

    pub async fn enrollment_list(
        &self,
        owner: ProviderId,
        patient: Option<PatientId>,
        program: Option<ProgramId>,
    ) -> StoreResult<Vec<Enrollment>> {
        on_store!(self, s => s.enrollment_list(owner, patient, program).await)
    }

    pub async fn enrollment_get(&self, id: EnrollmentId) -> StoreResult<Enrollment> {
        on_store!(self, s => s.enrollment_get(id).await)
    }

    pub async fn enrollment_delete(&self, id: EnrollmentId) -> StoreResult<()> {
        on_store!(self, s => s.enrollment_delete(id).await)
    }

    // appointments

    pub async fn appointment_create(
        &self,
        new: NewAppointment,
        now: DateTime<Utc>,
    ) -> StoreResult<Appointment> {
        on_store!(self, s => s.appointment_create(new, now).await)
    }

    pub async fn appointment_list(
        &self,
        owner: ProviderId,
        patient: Option<PatientId>,
    ) -> StoreResult<Vec<Appointment>> {
        on_store!(self, s => s.appointment_list(owner, patient).await)
    }

    pub async fn appointment_get(&self, id: AppointmentId) -> StoreResult<Appointment> {
        on_store!(self, s => s.appointment_get(id).await)
    }

    pub async fn appointment_set_status(
        &self,
        id: AppointmentId,
        status: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<Appointment> {
        on_store!(self, s => s.appointment_set_status(id, status, now).await)
    }

    pub async fn appointment_delete(&self, id: AppointmentId) -> StoreResult<()> {
        on_store!(self, s => s.appointment_delete(id).await)
    }

    // visits

    pub async fn visit_create(&self, new: NewVisit, now: DateTime<Utc>) -> StoreResult<Visit> {
        on_store!(self, s => s.visit_create(new, now).await)
    }

    pub async fn visit_list(
        &self,
        owner: ProviderId,
        patient: Option<PatientId>,
    ) -> StoreResult<Vec<Visit>> {
        on_store!(self, s => s.visit_list(owner, patient).await)
    }

    pub async fn visit_get(&self, id: VisitId) -> StoreResult<Visit> {
        on_store!(self, s => s.visit_get(id).await)
    }

    // vitals

    pub async fn vitals_record(&self, new: NewVitals) -> StoreResult<VitalsReading> {
        on_store!(self, s => s.vitals_record(new).await)
    }

    pub async fn vitals_list(&self, patient: PatientId) -> StoreResult<Vec<VitalsReading>> {
        on_store!(self, s => s.vitals_list(patient).await)
    }

    // prescriptions

    pub async fn prescription_create(
        &self,
        new: NewPrescription,
        now: DateTime<Utc>,
    ) -> StoreResult<Prescription> {
        on_store!(self, s => s.prescription_create(new, now).await)
    }

    pub async fn prescription_list(
        &self,
        owner: Option<ProviderId>,
        patient: Option<PatientId>,
    ) -> StoreResult<Vec<Prescription>> {
        on_store!(self, s => s.prescription_list(owner, patient).await)
    }

    pub async fn prescription_get(&self, id: PrescriptionId) -> StoreResult<Prescription> {
        on_store!(self, s => s.prescription_get(id).await)
    }

    pub async fn prescription_dispense(
        &self,
        id: PrescriptionId,
        now: DateTime<Utc>,
    ) -> StoreResult<Prescription> {
        on_store!(self, s => s.prescription_dispense(id, now).await)
    }

    pub async fn prescription_cancel(
        &self,
        id: PrescriptionId,
        now: DateTime<Utc>,
    ) -> StoreResult<Prescription> {
        on_store!(self, s => s.prescription_cancel(id, now).await)
    }

    // lab orders

    pub async fn lab_order_create(
        &self,
        new: NewLabOrder,
        now: DateTime<Utc>,
    ) -> StoreResult<LabOrder> {
        on_store!(self, s => s.lab_order_create(new, now).await)
    }

    pub async fn lab_order_list(
        &self,
        owner: ProviderId,
        patient: Option<PatientId>,
    ) -> StoreResult<Vec<LabOrder>> {
        on_store!(self, s => s.lab_order_list(owner, patient).await)
    }

    pub async fn lab_order_get(&self, id: LabOrderId) -> StoreResult<LabOrder> {
        on_store!(self, s => s.lab_order_get(id).await)
    }

    pub async fn lab_order_set_status(
        &self,
        id: LabOrderId,
        status: LabOrderStatus,
        result: Option<String>,
        now: DateTime<Utc>,
    ) -> StoreResult<LabOrder> {
        on_store!(self, s => s.lab_order_set_status(id, status, result, now).await)
    }

    // medicines

    pub async fn medicine_create(
        &self,
        new: NewMedicine,
        now: DateTime<Utc>,
    ) -> StoreResult<Medicine> {
        on_store!(self, s => s.medicine_create(new, now).await)
    }

    pub async fn medicine_list(&self) -> StoreResult<Vec<Medicine>> {
        on_store!(self, s => s.medicine_list().await)
    }

    pub async fn medicine_get(&self, id: MedicineId) -> StoreResult<Medicine> {
        on_store!(self, s => s.medicine_get(id).await)
    }

    pub async fn medicine_update(
        &self,
        id: MedicineId,
        update: MedicineUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<Medicine> {
        on_store!(self, s => s.medicine_update(id, update, now).await)
    }

    // batches

    pub async fn batch_receive(
        &self,
        new: NewBatch,
        now: DateTime<Utc>,
    ) -> StoreResult<MedicineBatch> {
        on_store!(self, s => s.batch_receive(new, now).await)
    }

    pub async fn batch_list(&self, medicine: Option<MedicineId>) -> StoreResult<Vec<MedicineBatch>> {
        on_store!(self, s => s.batch_list(medicine).await)
    }

    // bills

    pub async fn bill_create(&self, new: NewBill, now: DateTime<Utc>) -> StoreResult<Bill> {
        on_store!(self, s => s.bill_create(new, now).await)
    }

    pub async fn bill_list(
        &self,
        owner: ProviderId,
        patient: Option<PatientId>,
    ) -> StoreResult<Vec<Bill>> {
        on_store!(self, s => s.bill_list(owner, patient).await)
    }

    pub async fn bill_get(&self, id: BillId) -> StoreResult<Bill> {
        on_store!(self, s => s.bill_get(id).await)
    }

    pub async fn bill_payments(&self, id: BillId) -> StoreResult<Vec<Payment>> {
        on_store!(self, s => s.bill_payments(id).await)
    }

    pub async fn bill_record_payment(
        &self,
        id: BillId,
        amount: Money,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> StoreResult<Bill> {
        on_store!(self, s => s.bill_record_payment(id, amount, method, now).await)
    }

    pub async fn bill_cancel(&self, id: BillId, now: DateTime<Utc>) -> StoreResult<Bill> {
        on_store!(self, s => s.bill_cancel(id, now).await)
    }

    // analytics

    pub async fn analytics(
        &self,
        owner: ProviderId,
        day: DayRange,
    ) -> StoreResult<AnalyticsSummary> {
        on_store!(self, s => s.analytics(owner, day).await)
    }
}
