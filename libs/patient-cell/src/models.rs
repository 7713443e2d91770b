use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use shared_database::Record;
use shared_models::dates;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, deserialize_with = "dates::option_date")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub gov_card_no: Option<String>,
    #[serde(default)]
    pub insurance_no: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePatientRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, deserialize_with = "dates::option_date")]
    pub date_of_birth: Option<NaiveDate>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub gov_card_no: Option<String>,
    pub insurance_no: Option<String>,
    pub address: Option<String>,
}

impl Record for Patient {
    const COLLECTION: &'static str = "Patient";
    const ID_FIELD: &'static str = "patient_id";
    const LABEL: &'static str = "Patient";
    type Create = CreatePatientRequest;

    fn from_create(id: i64, request: CreatePatientRequest) -> Self {
        Self {
            patient_id: id,
            first_name: request.first_name,
            last_name: request.last_name,
            date_of_birth: request.date_of_birth,
            phone: request.phone,
            email: request.email,
            gov_card_no: request.gov_card_no,
            insurance_no: request.insurance_no,
            address: request.address,
        }
    }

    fn id(&self) -> i64 {
        self.patient_id
    }

    fn validate(request: &CreatePatientRequest) -> Result<(), String> {
        if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
            return Err("first_name and last_name are required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientNameQuery {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}
