use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clinicore_core::{DomainError, DomainResult, ProviderId, RecordId};
use clinicore_records::PatientId;

/// Appointment identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppointmentId(pub RecordId);

impl AppointmentId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Appointment lifecycle.
///
/// Legal moves: Scheduled → Waiting | Cancelled, Waiting → InProgress |
/// Cancelled, InProgress → Completed. Completed and Cancelled are terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Scheduled,
    Waiting,
    InProgress,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Scheduled, Waiting)
                | (Scheduled, Cancelled)
                | (Waiting, InProgress)
                | (Waiting, Cancelled)
                | (InProgress, Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }
}

/// A booked appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: PatientId,
    pub owner: ProviderId,
    pub scheduled_for: DateTime<Utc>,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn book(
        id: AppointmentId,
        patient_id: PatientId,
        owner: ProviderId,
        scheduled_for: DateTime<Utc>,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            patient_id,
            owner,
            scheduled_for,
            reason,
            status: AppointmentStatus::Scheduled,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `next`, rejecting anything outside the transition table.
    pub fn transition(&mut self, next: AppointmentStatus, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invariant(format!(
                "cannot move appointment from {:?} to {:?}",
                self.status, next
            )));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booked() -> Appointment {
        Appointment::book(
            AppointmentId::new(RecordId::new()),
            PatientId::new(RecordId::new()),
            ProviderId::new(),
            Utc::now(),
            Some("follow-up".to_string()),
            Utc::now(),
        )
    }

    #[test]
    fn happy_path_runs_to_completed() {
        let mut a = booked();
        a.transition(AppointmentStatus::Waiting, Utc::now()).unwrap();
        a.transition(AppointmentStatus::InProgress, Utc::now()).unwrap();
        a.transition(AppointmentStatus::Completed, Utc::now()).unwrap();
        assert!(a.status.is_terminal());
    }

    #[test]
    fn cannot_skip_the_waiting_room() {
        let mut a = booked();
        let err = a
            .transition(AppointmentStatus::InProgress, Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(a.status, AppointmentStatus::Scheduled);
    }

    #[test]
    fn terminal_states_reject_everything() {
        let mut a = booked();
        a.transition(AppointmentStatus::Cancelled, Utc::now()).unwrap();
        for next in [
            AppointmentStatus::Scheduled,
            AppointmentStatus::Waiting,
            AppointmentStatus::InProgress,
            AppointmentStatus::Completed,
        ] {
            assert!(a.transition(next, Utc::now()).is_err());
        }
    }

    #[test]
    fn in_progress_cannot_be_cancelled() {
        let mut a = booked();
        a.transition(AppointmentStatus::Waiting, Utc::now()).unwrap();
        a.transition(AppointmentStatus::InProgress, Utc::now()).unwrap();
        assert!(a.transition(AppointmentStatus::Cancelled, Utc::now()).is_err());
    }
}
