use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{BloodGroup, Gender};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub id: Uuid,
    pub account_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Option<Gender>,
    pub blood_group: Option<BloodGroup>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub registered_at: NaiveDateTime,
}

impl PatientProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Age in whole years on the given day.
    pub fn age_on(&self, today: NaiveDate) -> i32 {
        let dob = self.date_of_birth;
        let mut age = today.year() - dob.year();
        if (today.month(), today.day()) < (dob.month(), dob.day()) {
            age -= 1;
        }
        age
    }
}

/// Editable patient fields (self-service profile form and admin form).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDraft {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Option<Gender>,
    pub blood_group: Option<BloodGroup>,
    pub contact_number: String,
    pub email: String,
    pub address: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(dob: NaiveDate) -> PatientProfile {
        PatientProfile {
            id: Uuid::new_v4(),
            account_id: None,
            first_name: "Ada".into(),
            last_name: "Okafor".into(),
            date_of_birth: dob,
            gender: Some(Gender::Female),
            blood_group: None,
            contact_number: None,
            email: None,
            address: None,
            registered_at: NaiveDate::from_ymd_opt(2026, 1, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn full_name_joins_parts() {
        let p = patient(NaiveDate::from_ymd_opt(1990, 5, 20).unwrap());
        assert_eq!(p.full_name(), "Ada Okafor");
    }

    #[test]
    fn age_counts_birthday_boundary() {
        let p = patient(NaiveDate::from_ymd_opt(1990, 5, 20).unwrap());
        assert_eq!(p.age_on(NaiveDate::from_ymd_opt(2026, 5, 19).unwrap()), 35);
        assert_eq!(p.age_on(NaiveDate::from_ymd_opt(2026, 5, 20).unwrap()), 36);
    }
}
