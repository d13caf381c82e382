//! In-memory backend (dev/test).
//!
//! A single `Mutex` over plain maps. Every operation takes the lock once, so
//! the count-free day-sequence allocation and the multi-step writes are
//! trivially atomic here; the Postgres backend gets the same guarantees from
//! transactions.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};

use clinicore_billing::{Bill, BillId, BillStatus, Payment, PaymentMethod};
use clinicore_clinical::{
    LabOrder, LabOrderId, LabOrderStatus, Prescription, PrescriptionId, Visit, VisitId,
    VitalsReading,
};
use clinicore_core::{DayRange, DomainError, Money, ProviderId, RecordId};
use clinicore_numbering::{DocumentKind, DocumentNumber};
use clinicore_pharmacy::{Medicine, MedicineBatch, MedicineId};
use clinicore_records::{Enrollment, EnrollmentId, Patient, PatientId, Program, ProgramId};
use clinicore_scheduling::{Appointment, AppointmentId, AppointmentStatus};

use crate::error::{Access, OwnedResource, StoreError, StoreResult};
use crate::input::{
    AnalyticsSummary, MedicineUpdate, NewAppointment, NewBatch, NewBill, NewEnrollment,
    NewLabOrder, NewMedicine, NewPatient, NewPrescription, NewProgram, NewVisit, NewVitals,
    PatientUpdate, ProgramUpdate,
};

#[derive(Default)]
struct State {
    patients: HashMap<RecordId, Patient>,
    programs: HashMap<RecordId, Program>,
    enrollments: HashMap<RecordId, Enrollment>,
    appointments: HashMap<RecordId, Appointment>,
    visits: HashMap<RecordId, Visit>,
    vitals: HashMap<RecordId, VitalsReading>,
    prescriptions: HashMap<RecordId, Prescription>,
    lab_orders: HashMap<RecordId, LabOrder>,
    medicines: HashMap<RecordId, Medicine>,
    batches: HashMap<RecordId, MedicineBatch>,
    bills: HashMap<RecordId, Bill>,
    payments: Vec<Payment>,
    sequences: HashMap<(DocumentKind, NaiveDate), u32>,
}

/// In-memory store.
#[derive(Default)]
pub struct MemStore {
    state: Mutex<State>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("store mutex poisoned")
    }

    /// Next sequence for `(kind, day)` assuming the caller commits the write;
    /// only call with the lock held and bump via `commit_sequence`.
    fn peek_sequence(state: &State, kind: DocumentKind, day: &DayRange) -> u32 {
        state
            .sequences
            .get(&(kind, day.date()))
            .copied()
            .unwrap_or(0)
            + 1
    }

    fn commit_sequence(state: &mut State, kind: DocumentKind, day: &DayRange, value: u32) {
        state.sequences.insert((kind, day.date()), value);
    }

    // ── capability check ────────────────────────────────────────────────

    pub async fn access(
        &self,
        resource: OwnedResource,
        id: RecordId,
        provider: ProviderId,
    ) -> StoreResult<Access> {
        let state = self.lock();
        let owner = match resource {
            OwnedResource::Patient => state.patients.get(&id).map(|p| p.owner),
            OwnedResource::Program => state.programs.get(&id).map(|p| p.owner),
            OwnedResource::Appointment => state.appointments.get(&id).map(|a| a.owner),
            OwnedResource::Visit => state.visits.get(&id).map(|v| v.owner),
            OwnedResource::Prescription => state.prescriptions.get(&id).map(|p| p.owner),
            OwnedResource::LabOrder => state.lab_orders.get(&id).map(|o| o.owner),
            OwnedResource::Bill => state.bills.get(&id).map(|b| b.owner),
        };
        Ok(match owner {
            None => Access::NotFound,
            Some(o) if o == provider => Access::Granted,
            Some(_) => Access::Denied,
        })
    }

    // ── patients ────────────────────────────────────────────────────────

    pub async fn patient_create(
        &self,
        new: NewPatient,
        now: DateTime<Utc>,
    ) -> StoreResult<Patient> {
        let mut state = self.lock();
        let day = DayRange::containing(now);
        let seq = Self::peek_sequence(&state, DocumentKind::MedicalRecord, &day);
        let mrn = DocumentNumber::for_day(DocumentKind::MedicalRecord, &day, seq)
            .map_err(StoreError::Domain)?;

        let patient = Patient::register(
            new.id,
            mrn,
            new.owner,
            &new.name,
            new.demographics,
            now,
        )?;

        Self::commit_sequence(&mut state, DocumentKind::MedicalRecord, &day, seq);
        state.patients.insert(new.id.0, patient.clone());
        Ok(patient)
    }

    pub async fn patient_list(&self, owner: ProviderId) -> StoreResult<Vec<Patient>> {
        let state = self.lock();
        let mut out: Vec<Patient> = state
            .patients
            .values()
            .filter(|p| p.owner == owner)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    pub async fn patient_get(&self, id: PatientId) -> StoreResult<Patient> {
        self.lock()
            .patients
            .get(&id.0)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    pub async fn patient_update(
        &self,
        id: PatientId,
        update: PatientUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<Patient> {
        let mut state = self.lock();
        let patient = state.patients.get_mut(&id.0).ok_or(StoreError::NotFound)?;
        patient.update(update.name.as_deref(), update.demographics, now)?;
        Ok(patient.clone())
    }

    pub async fn patient_delete(&self, id: PatientId) -> StoreResult<()> {
        let mut state = self.lock();
        if state.patients.remove(&id.0).is_none() {
            return Err(StoreError::NotFound);
        }
        // Mirror the Postgres ON DELETE CASCADE behavior.
        state.enrollments.retain(|_, e| e.patient_id != id);
        state.appointments.retain(|_, a| a.patient_id != id);
        state.visits.retain(|_, v| v.patient_id != id);
        state.vitals.retain(|_, v| v.patient_id != id);
        state.prescriptions.retain(|_, p| p.patient_id != id);
        state.lab_orders.retain(|_, o| o.patient_id != id);
        let removed_bills: Vec<RecordId> = state
            .bills
            .iter()
            .filter(|(_, b)| b.patient_id == id)
            .map(|(k, _)| *k)
            .collect();
        for bill_id in &removed_bills {
            state.bills.remove(bill_id);
        }
        state
            .payments
            .retain(|p| !removed_bills.contains(&p.bill_id.0));
        Ok(())
    }

    // ── programs ────────────────────────────────────────────────────────

    pub async fn program_create(
        &self,
        new: NewProgram,
        now: DateTime<Utc>,
    ) -> StoreResult<Program> {
        let program = Program::create(new.id, new.owner, &new.name, new.description, now)?;
        self.lock().programs.insert(new.id.0, program.clone());
        Ok(program)
    }

    pub async fn program_list(&self, owner: ProviderId) -> StoreResult<Vec<Program>> {
        let state = self.lock();
        let mut out: Vec<Program> = state
            .programs
            .values()
            .filter(|p| p.owner == owner)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    pub async fn program_get(&self, id: ProgramId) -> StoreResult<Program> {
        self.lock()
            .programs
            .get(&id.0)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    pub async fn program_update(
        &self,
        id: ProgramId,
        update: ProgramUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<Program> {
        let mut state = self.lock();
        let program = state.programs.get_mut(&id.0).ok_or(StoreError::NotFound)?;
        program.update(
            update.name.as_deref(),
            update.description,
            update.active,
            now,
        )?;
        Ok(program.clone())
    }

    pub async fn program_delete(&self, id: ProgramId) -> StoreResult<()> {
        let mut state = self.lock();
        if state.programs.remove(&id.0).is_none() {
            return Err(StoreError::NotFound);
        }
        state.enrollments.retain(|_, e| e.program_id != id);
        Ok(())
    }

    // ── enrollments ─────────────────────────────────────────────────────

    pub async fn enrollment_create(
        &self,
        new: NewEnrollment,
        now: DateTime<Utc>,
    ) -> StoreResult<Enrollment> {
        let mut state = self.lock();
        if !state.patients.contains_key(&new.patient_id.0) {
            return Err(DomainError::validation("patient does not exist").into());
        }
        if !state.programs.contains_key(&new.program_id.0) {
            return Err(DomainError::validation("program does not exist").into());
        }
        if state
            .enrollments
            .values()
            .any(|e| e.patient_id == new.patient_id && e.program_id == new.program_id)
        {
            return Err(StoreError::Conflict(
                "patient is already enrolled in this program".to_string(),
            ));
        }
        let enrollment = Enrollment::new(new.id, new.patient_id, new.program_id, now);
        state.enrollments.insert(new.id.0, enrollment.clone());
        Ok(enrollment)
    }

    pub async fn enrollment_list(
        &self,
        owner: ProviderId,
        patient: Option<PatientId>,
        program: Option<ProgramId>,
    ) -> StoreResult<Vec<Enrollment>> {
        let state = self.lock();
        let mut out: Vec<Enrollment> = state
            .enrollments
            .values()
            .filter(|e| {
                state
                    .patients
                    .get(&e.patient_id.0)
                    .is_some_and(|p| p.owner == owner)
            })
            .filter(|e| patient.is_none_or(|p| e.patient_id == p))
            .filter(|e| program.is_none_or(|p| e.program_id == p))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.enrolled_at.cmp(&a.enrolled_at));
        Ok(out)
    }

    pub async fn enrollment_get(&self, id: EnrollmentId) -> StoreResult<Enrollment> {
        self.lock()
            .enrollments
            .get(&id.0)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    pub async fn enrollment_delete(&self, id: EnrollmentId) -> StoreResult<()> {
        let mut state = self.lock();
        state
            .enrollments
            .remove(&id.0)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    // ── appointments ────────────────────────────────────────────────────

    pub async fn appointment_create(
        &self,
        new: NewAppointment,
        now: DateTime<Utc>,
    ) -> StoreResult<Appointment> {
        let mut state = self.lock();
        if !state.patients.contains_key(&new.patient_id.0) {
            return Err(DomainError::validation("patient does not exist").into());
        }
        let appointment = Appointment::book(
            new.id,
            new.patient_id,
            new.owner,
            new.scheduled_for,
            new.reason,
            now,
        );
        state.appointments.insert(new.id.0, appointment.clone());
        Ok(appointment)
    }

    pub async fn appointment_list(
        &self,
        owner: ProviderId,
        patient: Option<PatientId>,
    ) -> StoreResult<Vec<Appointment>> {
        let state = self.lock();
        let mut out: Vec<Appointment> = state
            .appointments
            .values()
            .filter(|a| a.owner == owner)
            .filter(|a| patient.is_none_or(|p| a.patient_id == p))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.scheduled_for.cmp(&b.scheduled_for));
        Ok(out)
    }

    pub async fn appointment_get(&self, id: AppointmentId) -> StoreResult<Appointment> {
        self.lock()
            .appointments
            .get(&id.0)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    pub async fn appointment_set_status(
        &self,
        id: AppointmentId,
        status: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<Appointment> {
        let mut state = self.lock();
        let appointment = state
            .appointments
            .get_mut(&id.0)
            .ok_or(StoreError::NotFound)?;
        appointment.transition(status, now)?;
        Ok(appointment.clone())
    }

    pub async fn appointment_delete(&self, id: AppointmentId) -> StoreResult<()> {
        self.lock()
            .appointments
            .remove(&id.0)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    // ── visits ──────────────────────────────────────────────────────────

    pub async fn visit_create(&self, new: NewVisit, now: DateTime<Utc>) -> StoreResult<Visit> {
        let mut state = self.lock();
        if !state.patients.contains_key(&new.patient_id.0) {
            return Err(DomainError::validation("patient does not exist").into());
        }
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
        state.visits.insert(new.id.0, visit.clone());
        Ok(visit)
    }

    pub async fn visit_list(
        &self,
        owner: ProviderId,
        patient: Option<PatientId>,
    ) -> StoreResult<Vec<Visit>> {
        let state = self.lock();
        let mut out: Vec<Visit> = state
            .visits
            .values()
            .filter(|v| v.owner == owner)
            .filter(|v| patient.is_none_or(|p| v.patient_id == p))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        Ok(out)
    }

    pub async fn visit_get(&self, id: VisitId) -> StoreResult<Visit> {
        self.lock()
            .visits
            .get(&id.0)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    // ── vitals ──────────────────────────────────────────────────────────

    pub async fn vitals_record(&self, new: NewVitals) -> StoreResult<VitalsReading> {
        let mut state = self.lock();
        if !state.patients.contains_key(&new.patient_id.0) {
            return Err(DomainError::validation("patient does not exist").into());
        }
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
        state.vitals.insert(new.id.0, reading.clone());
        Ok(reading)
    }

    pub async fn vitals_list(&self, patient: PatientId) -> StoreResult<Vec<VitalsReading>> {
        let state = self.lock();
        let mut out: Vec<VitalsReading> = state
            .vitals
            .values()
            .filter(|v| v.patient_id == patient)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(out)
    }

    // ── prescriptions ───────────────────────────────────────────────────

    pub async fn prescription_create(
        &self,
        new: NewPrescription,
        now: DateTime<Utc>,
    ) -> StoreResult<Prescription> {
        let mut state = self.lock();
        if !state.patients.contains_key(&new.patient_id.0) {
            return Err(DomainError::validation("patient does not exist").into());
        }
        if !state.medicines.contains_key(&new.medicine_id.0) {
            return Err(DomainError::validation("medicine does not exist").into());
        }
        let prescription = Prescription::order(
            new.id,
            new.patient_id,
            new.owner,
            new.medicine_id,
            new.quantity,
            &new.dosage,
            now,
        )?;
        state.prescriptions.insert(new.id.0, prescription.clone());
        Ok(prescription)
    }

    /// `owner: None` lists clinic-wide (dispensing staff).
    pub async fn prescription_list(
        &self,
        owner: Option<ProviderId>,
        patient: Option<PatientId>,
    ) -> StoreResult<Vec<Prescription>> {
        let state = self.lock();
        let mut out: Vec<Prescription> = state
            .prescriptions
            .values()
            .filter(|p| owner.is_none_or(|o| p.owner == o))
            .filter(|p| patient.is_none_or(|pt| p.patient_id == pt))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    pub async fn prescription_get(&self, id: PrescriptionId) -> StoreResult<Prescription> {
        self.lock()
            .prescriptions
            .get(&id.0)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    /// Dispense: flips the prescription and decrements stock as one unit.
    /// Any failure leaves both untouched.
    pub async fn prescription_dispense(
        &self,
        id: PrescriptionId,
        now: DateTime<Utc>,
    ) -> StoreResult<Prescription> {
        let mut state = self.lock();

        let prescription = state
            .prescriptions
            .get(&id.0)
            .cloned()
            .ok_or(StoreError::NotFound)?;
        let medicine = state
            .medicines
            .get(&prescription.medicine_id.0)
            .cloned()
            .ok_or_else(|| StoreError::Domain(DomainError::validation("medicine does not exist")))?;

        let mut prescription = prescription;
        let mut medicine = medicine;
        prescription.dispense(now)?;
        medicine.dispense(prescription.quantity, now)?;

        state.prescriptions.insert(id.0, prescription.clone());
        state.medicines.insert(medicine.id.0, medicine);
        Ok(prescription)
    }

    pub async fn prescription_cancel(
        &self,
        id: PrescriptionId,
        now: DateTime<Utc>,
    ) -> StoreResult<Prescription> {
        let mut state = self.lock();
        let prescription = state
            .prescriptions
            .get_mut(&id.0)
            .ok_or(StoreError::NotFound)?;
        prescription.cancel(now)?;
        Ok(prescription.clone())
    }

    // ── lab orders ──────────────────────────────────────────────────────

    pub async fn lab_order_create(
        &self,
        new: NewLabOrder,
        now: DateTime<Utc>,
    ) -> StoreResult<LabOrder> {
        let mut state = self.lock();
        if !state.patients.contains_key(&new.patient_id.0) {
            return Err(DomainError::validation("patient does not exist").into());
        }
        let order = LabOrder::order(new.id, new.patient_id, new.owner, &new.test_name, now)?;
        state.lab_orders.insert(new.id.0, order.clone());
        Ok(order)
    }

    pub async fn lab_order_list(
        &self,
        owner: ProviderId,
        patient: Option<PatientId>,
    ) -> StoreResult<Vec<LabOrder>> {
        let state = self.lock();
        let mut out: Vec<LabOrder> = state
            .lab_orders
            .values()
            .filter(|o| o.owner == owner)
            .filter(|o| patient.is_none_or(|p| o.patient_id == p))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    pub async fn lab_order_get(&self, id: LabOrderId) -> StoreResult<LabOrder> {
        self.lock()
            .lab_orders
            .get(&id.0)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    pub async fn lab_order_set_status(
        &self,
        id: LabOrderId,
        status: LabOrderStatus,
        result: Option<String>,
        now: DateTime<Utc>,
    ) -> StoreResult<LabOrder> {
        let mut state = self.lock();
        let order = state.lab_orders.get_mut(&id.0).ok_or(StoreError::NotFound)?;
        order.transition(status, result, now)?;
        Ok(order.clone())
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
        self.lock().medicines.insert(new.id.0, medicine.clone());
        Ok(medicine)
    }

    pub async fn medicine_list(&self) -> StoreResult<Vec<Medicine>> {
        let state = self.lock();
        let mut out: Vec<Medicine> = state.medicines.values().cloned().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    pub async fn medicine_get(&self, id: MedicineId) -> StoreResult<Medicine> {
        self.lock()
            .medicines
            .get(&id.0)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    pub async fn medicine_update(
        &self,
        id: MedicineId,
        update: MedicineUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<Medicine> {
        let mut state = self.lock();
        let medicine = state.medicines.get_mut(&id.0).ok_or(StoreError::NotFound)?;
        medicine.update(
            update.name.as_deref(),
            update.unit_price,
            update.reorder_level,
            now,
        )?;
        Ok(medicine.clone())
    }

    // ── batches ─────────────────────────────────────────────────────────

    /// Persist the batch and add its quantity to stock as one unit.
    pub async fn batch_receive(
        &self,
        new: NewBatch,
        now: DateTime<Utc>,
    ) -> StoreResult<MedicineBatch> {
        let mut state = self.lock();
        let medicine = state
            .medicines
            .get(&new.medicine_id.0)
            .cloned()
            .ok_or_else(|| StoreError::Domain(DomainError::validation("medicine does not exist")))?;

        let batch = MedicineBatch::receive(
            new.id,
            new.medicine_id,
            &new.batch_number,
            new.quantity,
            new.expiry_date,
            now,
        )?;
        let mut medicine = medicine;
        medicine.receive(new.quantity, now)?;

        state.medicines.insert(medicine.id.0, medicine);
        state.batches.insert(new.id.0, batch.clone());
        Ok(batch)
    }

    pub async fn batch_list(&self, medicine: Option<MedicineId>) -> StoreResult<Vec<MedicineBatch>> {
        let state = self.lock();
        let mut out: Vec<MedicineBatch> = state
            .batches
            .values()
            .filter(|b| medicine.is_none_or(|m| b.medicine_id == m))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        Ok(out)
    }

    // ── bills ───────────────────────────────────────────────────────────

    /// Issue a bill: allocate the day's bill number and persist as one unit.
    pub async fn bill_create(&self, new: NewBill, now: DateTime<Utc>) -> StoreResult<Bill> {
        let mut state = self.lock();
        if !state.patients.contains_key(&new.patient_id.0) {
            return Err(DomainError::validation("patient does not exist").into());
        }

        let day = DayRange::containing(now);
        let seq = Self::peek_sequence(&state, DocumentKind::Bill, &day);
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

        Self::commit_sequence(&mut state, DocumentKind::Bill, &day, seq);
        state.bills.insert(new.id.0, bill.clone());
        Ok(bill)
    }

    pub async fn bill_list(
        &self,
        owner: ProviderId,
        patient: Option<PatientId>,
    ) -> StoreResult<Vec<Bill>> {
        let state = self.lock();
        let mut out: Vec<Bill> = state
            .bills
            .values()
            .filter(|b| b.owner == owner)
            .filter(|b| patient.is_none_or(|p| b.patient_id == p))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    pub async fn bill_get(&self, id: BillId) -> StoreResult<Bill> {
        self.lock()
            .bills
            .get(&id.0)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    pub async fn bill_payments(&self, id: BillId) -> StoreResult<Vec<Payment>> {
        let state = self.lock();
        if !state.bills.contains_key(&id.0) {
            return Err(StoreError::NotFound);
        }
        let mut out: Vec<Payment> = state
            .payments
            .iter()
            .filter(|p| p.bill_id == id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));
        Ok(out)
    }

    /// Record a payment and its row as one unit.
    pub async fn bill_record_payment(
        &self,
        id: BillId,
        amount: Money,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> StoreResult<Bill> {
        let mut state = self.lock();
        let bill = state.bills.get_mut(&id.0).ok_or(StoreError::NotFound)?;
        bill.record_payment(amount, method, now)?;
        let bill = bill.clone();
        state
            .payments
            .push(Payment::new(RecordId::new(), id, amount, method, now));
        Ok(bill)
    }

    pub async fn bill_cancel(&self, id: BillId, now: DateTime<Utc>) -> StoreResult<Bill> {
        let mut state = self.lock();
        let bill = state.bills.get_mut(&id.0).ok_or(StoreError::NotFound)?;
        bill.cancel(now)?;
        Ok(bill.clone())
    }

    // ── analytics ───────────────────────────────────────────────────────

    pub async fn analytics(
        &self,
        owner: ProviderId,
        day: DayRange,
    ) -> StoreResult<AnalyticsSummary> {
        let state = self.lock();

        let patients_total = state.patients.values().filter(|p| p.owner == owner).count();
        let appointments_today = state
            .appointments
            .values()
            .filter(|a| a.owner == owner && day.contains(a.scheduled_for))
            .count();
        let visits_today = state
            .visits
            .values()
            .filter(|v| v.owner == owner && day.contains(v.occurred_at))
            .count();
        let open_lab_orders = state
            .lab_orders
            .values()
            .filter(|o| {
                o.owner == owner
                    && matches!(o.status, LabOrderStatus::Ordered | LabOrderStatus::InProgress)
            })
            .count();
        let pending_bills = state
            .bills
            .values()
            .filter(|b| {
                b.owner == owner && matches!(b.status, BillStatus::Pending | BillStatus::Partial)
            })
            .count();

        let mut revenue_cents: i64 = 0;
        for payment in &state.payments {
            if !day.contains(payment.recorded_at) {
                continue;
            }
            let owned = state
                .bills
                .get(&payment.bill_id.0)
                .is_some_and(|b| b.owner == owner);
            if owned {
                revenue_cents += payment.amount.cents();
            }
        }

        let low_stock_medicines = state
            .medicines
            .values()
            .filter(|m| m.is_below_reorder_level())
            .count();

        Ok(AnalyticsSummary {
            patients_total: patients_total as u64,
            appointments_today: appointments_today as u64,
            visits_today: visits_today as u64,
            open_lab_orders: open_lab_orders as u64,
            pending_bills: pending_bills as u64,
            revenue_today: Money::from_cents(revenue_cents).unwrap_or(Money::ZERO),
            low_stock_medicines: low_stock_medicines as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinicore_billing::{BillLine, ItemType};
    use clinicore_pharmacy::BatchId;
    use clinicore_records::Demographics;

    fn new_patient(owner: ProviderId, name: &str) -> NewPatient {
        NewPatient {
            id: PatientId::new(RecordId::new()),
            owner,
            name: name.to_string(),
            demographics: Demographics::default(),
        }
    }

    fn line(qty: u32, cents: i64) -> BillLine {
        BillLine::new(
            "consultation",
            qty,
            Money::from_cents(cents).unwrap(),
            ItemType::Consultation,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn mrn_sequences_are_consecutive_within_a_day() {
        let store = MemStore::new();
        let owner = ProviderId::new();
        let now = Utc::now();

        let first = store
            .patient_create(new_patient(owner, "Jane"), now)
            .await
            .unwrap();
        let second = store
            .patient_create(new_patient(owner, "John"), now)
            .await
            .unwrap();

        assert_eq!(first.mrn.sequence(), 1);
        assert_eq!(second.mrn.sequence(), first.mrn.sequence() + 1);
        assert_eq!(
            first.mrn.to_string(),
            format!("MRN-{}-0001", DayRange::containing(now).yyyymmdd())
        );
    }

    #[tokio::test]
    async fn failed_registration_does_not_burn_a_sequence() {
        let store = MemStore::new();
        let owner = ProviderId::new();
        let now = Utc::now();

        assert!(store.patient_create(new_patient(owner, "  "), now).await.is_err());

        let p = store
            .patient_create(new_patient(owner, "Jane"), now)
            .await
            .unwrap();
        assert_eq!(p.mrn.sequence(), 1);
    }

    #[tokio::test]
    async fn bill_and_mrn_counters_are_independent() {
        let store = MemStore::new();
        let owner = ProviderId::new();
        let now = Utc::now();

        let patient = store
            .patient_create(new_patient(owner, "Jane"), now)
            .await
            .unwrap();

        let bill = store
            .bill_create(
                NewBill {
                    id: BillId::new(RecordId::new()),
                    patient_id: patient.id,
                    owner,
                    lines: vec![line(1, 5_000)],
                    discount_percent: 0,
                    notes: None,
                },
                now,
            )
            .await
            .unwrap();

        // The patient already consumed MRN sequence 1; the bill still starts
        // its own sequence at 1.
        assert_eq!(bill.number.sequence(), 1);
        assert!(bill.number.to_string().starts_with("BILL-"));
    }

    #[tokio::test]
    async fn access_distinguishes_missing_from_foreign_rows() {
        let store = MemStore::new();
        let owner = ProviderId::new();
        let stranger = ProviderId::new();
        let now = Utc::now();

        let patient = store
            .patient_create(new_patient(owner, "Jane"), now)
            .await
            .unwrap();

        assert_eq!(
            store
                .access(OwnedResource::Patient, patient.id.0, owner)
                .await
                .unwrap(),
            Access::Granted
        );
        assert_eq!(
            store
                .access(OwnedResource::Patient, patient.id.0, stranger)
                .await
                .unwrap(),
            Access::Denied
        );
        assert_eq!(
            store
                .access(OwnedResource::Patient, RecordId::new(), owner)
                .await
                .unwrap(),
            Access::NotFound
        );
    }

    #[tokio::test]
    async fn dispense_decrements_stock_atomically() {
        let store = MemStore::new();
        let owner = ProviderId::new();
        let now = Utc::now();

        let patient = store
            .patient_create(new_patient(owner, "Jane"), now)
            .await
            .unwrap();
        let medicine = store
            .medicine_create(
                NewMedicine {
                    id: MedicineId::new(RecordId::new()),
                    name: "Amoxicillin 500mg".to_string(),
                    generic_name: None,
                    form: None,
                    unit_price: Money::from_cents(250).unwrap(),
                    reorder_level: 5,
                },
                now,
            )
            .await
            .unwrap();
        store
            .batch_receive(
                NewBatch {
                    id: BatchId::new(RecordId::new()),
                    medicine_id: medicine.id,
                    batch_number: "LOT-1".to_string(),
                    quantity: 30,
                    expiry_date: NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
                },
                now,
            )
            .await
            .unwrap();

        let rx = store
            .prescription_create(
                NewPrescription {
                    id: PrescriptionId::new(RecordId::new()),
                    patient_id: patient.id,
                    owner,
                    medicine_id: medicine.id,
                    quantity: 21,
                    dosage: "1 tds".to_string(),
                },
                now,
            )
            .await
            .unwrap();

        store.prescription_dispense(rx.id, now).await.unwrap();
        assert_eq!(store.medicine_get(medicine.id).await.unwrap().stock_on_hand, 9);

        // A second prescription larger than remaining stock fails and leaves
        // both the order and the stock untouched.
        let rx2 = store
            .prescription_create(
                NewPrescription {
                    id: PrescriptionId::new(RecordId::new()),
                    patient_id: patient.id,
                    owner,
                    medicine_id: medicine.id,
                    quantity: 10,
                    dosage: "1 tds".to_string(),
                },
                now,
            )
            .await
            .unwrap();
        assert!(store.prescription_dispense(rx2.id, now).await.is_err());
        assert_eq!(store.medicine_get(medicine.id).await.unwrap().stock_on_hand, 9);
        assert_eq!(
            store.prescription_get(rx2.id).await.unwrap().status,
            clinicore_clinical::PrescriptionStatus::Ordered
        );
    }

    #[tokio::test]
    async fn payments_feed_todays_revenue() {
        let store = MemStore::new();
        let owner = ProviderId::new();
        let now = Utc::now();

        let patient = store
            .patient_create(new_patient(owner, "Jane"), now)
            .await
            .unwrap();
        let bill = store
            .bill_create(
                NewBill {
                    id: BillId::new(RecordId::new()),
                    patient_id: patient.id,
                    owner,
                    lines: vec![line(2, 5_000), line(1, 3_000)],
                    discount_percent: 10,
                    notes: None,
                },
                now,
            )
            .await
            .unwrap();
        assert_eq!(bill.totals.total.cents(), 13_455);

        store
            .bill_record_payment(
                bill.id,
                Money::from_cents(5_000).unwrap(),
                PaymentMethod::Cash,
                now,
            )
            .await
            .unwrap();

        let summary = store.analytics(owner, DayRange::containing(now)).await.unwrap();
        assert_eq!(summary.revenue_today.cents(), 5_000);
        assert_eq!(summary.pending_bills, 1);

        let payments = store.bill_payments(bill.id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount.cents(), 5_000);
    }

    #[tokio::test]
    async fn duplicate_enrollment_conflicts() {
        let store = MemStore::new();
        let owner = ProviderId::new();
        let now = Utc::now();

        let patient = store
            .patient_create(new_patient(owner, "Jane"), now)
            .await
            .unwrap();
        let program = store
            .program_create(
                NewProgram {
                    id: ProgramId::new(RecordId::new()),
                    owner,
                    name: "Hypertension".to_string(),
                    description: None,
                },
                now,
            )
            .await
            .unwrap();

        let enrollment = NewEnrollment {
            id: EnrollmentId::new(RecordId::new()),
            patient_id: patient.id,
            program_id: program.id,
        };
        store.enrollment_create(enrollment.clone(), now).await.unwrap();

        let dup = NewEnrollment {
            id: EnrollmentId::new(RecordId::new()),
            ..enrollment
        };
        assert!(matches!(
            store.enrollment_create(dup, now).await,
            Err(StoreError::Conflict(_))
        ));
    }
}
