use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AppointmentStatus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Which timestamp an appointment listing is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentSortKey {
    #[default]
    ScheduledAt,
    CreatedAt,
}

impl AppointmentSortKey {
    pub fn column(self) -> &'static str {
        match self {
            Self::ScheduledAt => "scheduled_at",
            Self::CreatedAt => "created_at",
        }
    }
}

/// Bounds on `scheduled_at`. Exclusive and inclusive variants both occur:
/// the patient dashboard splits at `> now` / `<= now`, the doctor
/// dashboard at `>= now` / `< now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBound {
    After(NaiveDateTime),
    AtOrAfter(NaiveDateTime),
    Before(NaiveDateTime),
    AtOrBefore(NaiveDateTime),
}

#[derive(Debug, Default)]
pub struct AppointmentFilter {
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub bound: Option<TimeBound>,
    pub sort_by: AppointmentSortKey,
    pub order: SortOrder,
    pub limit: Option<u32>,
}

impl AppointmentFilter {
    pub fn for_doctor(doctor_id: Uuid) -> Self {
        Self {
            doctor_id: Some(doctor_id),
            ..Default::default()
        }
    }

    pub fn for_patient(patient_id: Uuid) -> Self {
        Self {
            patient_id: Some(patient_id),
            ..Default::default()
        }
    }

    pub fn bounded(mut self, bound: TimeBound) -> Self {
        self.bound = Some(bound);
        self
    }

    pub fn ordered(mut self, sort_by: AppointmentSortKey, order: SortOrder) -> Self {
        self.sort_by = sort_by;
        self.order = order;
        self
    }

    pub fn with_status(mut self, status: AppointmentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn limited(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Default)]
pub struct DoctorFilter {
    pub available_only: bool,
    pub specialization: Option<String>,
}
