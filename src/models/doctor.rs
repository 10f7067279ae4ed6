use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub account_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub is_available: bool,
}

impl DoctorProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Editable doctor fields, as submitted by an administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorDraft {
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub contact_number: String,
    pub email: String,
    pub is_available: bool,
    pub account_id: Option<Uuid>,
}
