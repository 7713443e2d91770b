use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use shared_database::Record;
use shared_models::dates;

// ==============================================================================
// VISITS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visit {
    pub visit_id: i64,
    pub patient_id: i64,
    pub staff_id: i64,
    #[serde(default)]
    pub appointment_id: Option<i64>,
    pub visit_type: String,
    #[serde(deserialize_with = "dates::datetime")]
    pub start_time: NaiveDateTime,
    #[serde(default, deserialize_with = "dates::option_datetime")]
    pub end_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Visit {
    /// A visit stays active until it has an end time.
    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateVisitRequest {
    pub patient_id: i64,
    pub staff_id: i64,
    pub appointment_id: Option<i64>,
    pub visit_type: String,
    #[serde(deserialize_with = "dates::datetime")]
    pub start_time: NaiveDateTime,
    #[serde(default, deserialize_with = "dates::option_datetime")]
    pub end_time: Option<NaiveDateTime>,
    pub notes: Option<String>,
}

impl Record for Visit {
    const COLLECTION: &'static str = "Visit";
    const ID_FIELD: &'static str = "visit_id";
    const LABEL: &'static str = "Visit";
    type Create = CreateVisitRequest;

    fn from_create(id: i64, request: CreateVisitRequest) -> Self {
        Self {
            visit_id: id,
            patient_id: request.patient_id,
            staff_id: request.staff_id,
            appointment_id: request.appointment_id,
            visit_type: request.visit_type,
            start_time: request.start_time,
            end_time: request.end_time,
            notes: request.notes,
        }
    }

    fn id(&self) -> i64 {
        self.visit_id
    }

    fn validate(request: &CreateVisitRequest) -> Result<(), String> {
        match request.end_time {
            Some(end) if end < request.start_time => {
                Err("end_time must not be before start_time".to_string())
            }
            _ => Ok(()),
        }
    }
}

pub const VISIT_DIAGNOSIS_COLLECTION: &str = "VisitDiagnosis";
pub const VISIT_PROCEDURE_COLLECTION: &str = "VisitProcedure";

/// Links a diagnosis to a visit; keyed by the pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitDiagnosis {
    pub visit_id: i64,
    pub diagnosis_id: i64,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddVisitDiagnosisRequest {
    pub diagnosis_id: i64,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitProcedure {
    pub visit_id: i64,
    pub procedure_id: i64,
    #[serde(default)]
    pub fee: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddVisitProcedureRequest {
    pub procedure_id: i64,
    pub fee: Option<f64>,
}

// ==============================================================================
// CATALOGS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    pub diagnosis_id: i64,
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDiagnosisRequest {
    pub code: String,
    pub description: String,
}

impl Record for Diagnosis {
    const COLLECTION: &'static str = "Diagnosis";
    const ID_FIELD: &'static str = "diagnosis_id";
    const LABEL: &'static str = "Diagnosis";
    type Create = CreateDiagnosisRequest;

    fn from_create(id: i64, request: CreateDiagnosisRequest) -> Self {
        Self {
            diagnosis_id: id,
            code: request.code,
            description: request.description,
        }
    }

    fn id(&self) -> i64 {
        self.diagnosis_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Procedure {
    pub procedure_id: i64,
    pub code: String,
    pub description: String,
    #[serde(default)]
    pub default_fee: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProcedureRequest {
    pub code: String,
    pub description: String,
    pub default_fee: Option<f64>,
}

impl Record for Procedure {
    const COLLECTION: &'static str = "Procedure";
    const ID_FIELD: &'static str = "procedure_id";
    const LABEL: &'static str = "Procedure";
    type Create = CreateProcedureRequest;

    fn from_create(id: i64, request: CreateProcedureRequest) -> Self {
        Self {
            procedure_id: id,
            code: request.code,
            description: request.description,
            default_fee: request.default_fee,
        }
    }

    fn id(&self) -> i64 {
        self.procedure_id
    }

    fn validate(request: &CreateProcedureRequest) -> Result<(), String> {
        match request.default_fee {
            Some(fee) if fee < 0.0 => Err("default_fee must not be negative".to_string()),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drug {
    pub drug_id: i64,
    pub brand_name: String,
    #[serde(default)]
    pub generic_name: Option<String>,
    #[serde(default)]
    pub strength: Option<String>,
    #[serde(default)]
    pub form: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDrugRequest {
    pub brand_name: String,
    pub generic_name: Option<String>,
    pub strength: Option<String>,
    pub form: Option<String>,
}

impl Record for Drug {
    const COLLECTION: &'static str = "Drug";
    const ID_FIELD: &'static str = "drug_id";
    const LABEL: &'static str = "Drug";
    type Create = CreateDrugRequest;

    fn from_create(id: i64, request: CreateDrugRequest) -> Self {
        Self {
            drug_id: id,
            brand_name: request.brand_name,
            generic_name: request.generic_name,
            strength: request.strength,
            form: request.form,
        }
    }

    fn id(&self) -> i64 {
        self.drug_id
    }
}

// ==============================================================================
// PRESCRIPTIONS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub prescription_id: i64,
    pub visit_id: i64,
    #[serde(default)]
    pub patient_id: Option<i64>,
    pub drug_id: i64,
    pub dosage_instruction: String,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default, deserialize_with = "dates::option_datetime")]
    pub dispensed_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub dispensed_by: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePrescriptionRequest {
    pub visit_id: i64,
    pub patient_id: Option<i64>,
    pub drug_id: i64,
    pub dosage_instruction: String,
    pub quantity: Option<i64>,
    #[serde(default, deserialize_with = "dates::option_datetime")]
    pub dispensed_at: Option<NaiveDateTime>,
    pub dispensed_by: Option<i64>,
}

impl Record for Prescription {
    const COLLECTION: &'static str = "Prescription";
    const ID_FIELD: &'static str = "prescription_id";
    const LABEL: &'static str = "Prescription";
    type Create = CreatePrescriptionRequest;

    fn from_create(id: i64, request: CreatePrescriptionRequest) -> Self {
        Self {
            prescription_id: id,
            visit_id: request.visit_id,
            patient_id: request.patient_id,
            drug_id: request.drug_id,
            dosage_instruction: request.dosage_instruction,
            quantity: request.quantity,
            dispensed_at: request.dispensed_at,
            dispensed_by: request.dispensed_by,
        }
    }

    fn id(&self) -> i64 {
        self.prescription_id
    }

    fn validate(request: &CreatePrescriptionRequest) -> Result<(), String> {
        match request.quantity {
            Some(quantity) if quantity <= 0 => Err("quantity must be positive".to_string()),
            _ => Ok(()),
        }
    }
}

/// Row of the prescription picker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrescriptionSummary {
    pub prescription_id: i64,
    pub patient_name: String,
    pub drug_name: String,
    pub dosage: String,
    pub dispensed_at: Option<NaiveDateTime>,
}

// ==============================================================================
// LAB TESTS & DELIVERIES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabTestOrder {
    pub labtest_id: i64,
    pub visit_id: i64,
    #[serde(default)]
    pub ordered_by: Option<i64>,
    pub test_name: String,
    #[serde(deserialize_with = "dates::datetime")]
    pub ordered_at: NaiveDateTime,
    #[serde(default, deserialize_with = "dates::option_datetime")]
    pub result_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub result_value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLabTestRequest {
    pub visit_id: i64,
    pub ordered_by: Option<i64>,
    pub test_name: String,
    #[serde(default, deserialize_with = "dates::option_datetime")]
    pub ordered_at: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "dates::option_datetime")]
    pub result_at: Option<NaiveDateTime>,
    pub result_value: Option<String>,
}

impl Record for LabTestOrder {
    const COLLECTION: &'static str = "LabTestOrder";
    const ID_FIELD: &'static str = "labtest_id";
    const LABEL: &'static str = "Lab test";
    type Create = CreateLabTestRequest;

    fn from_create(id: i64, request: CreateLabTestRequest) -> Self {
        Self {
            labtest_id: id,
            visit_id: request.visit_id,
            ordered_by: request.ordered_by,
            test_name: request.test_name,
            ordered_at: request.ordered_at.unwrap_or_else(|| Utc::now().naive_utc()),
            result_at: request.result_at,
            result_value: request.result_value,
        }
    }

    fn id(&self) -> i64 {
        self.labtest_id
    }

    fn validate(request: &CreateLabTestRequest) -> Result<(), String> {
        match (request.ordered_at, request.result_at) {
            (Some(ordered), Some(result)) if result < ordered => {
                Err("result_at must not be before ordered_at".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub delivery_id: i64,
    pub visit_id: i64,
    pub performed_by: i64,
    #[serde(default, deserialize_with = "dates::option_datetime")]
    pub delivered_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeliveryRequest {
    pub visit_id: i64,
    pub performed_by: i64,
    #[serde(default, deserialize_with = "dates::option_datetime")]
    pub delivered_at: Option<NaiveDateTime>,
    pub outcome: Option<String>,
    pub notes: Option<String>,
}

impl Record for Delivery {
    const COLLECTION: &'static str = "Delivery";
    const ID_FIELD: &'static str = "delivery_id";
    const LABEL: &'static str = "Delivery";
    type Create = CreateDeliveryRequest;

    fn from_create(id: i64, request: CreateDeliveryRequest) -> Self {
        Self {
            delivery_id: id,
            visit_id: request.visit_id,
            performed_by: request.performed_by,
            delivered_at: request.delivered_at,
            outcome: request.outcome,
            notes: request.notes,
        }
    }

    fn id(&self) -> i64 {
        self.delivery_id
    }
}

/// A delivery together with the visit it happened in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryEntry {
    #[serde(flatten)]
    pub delivery: Delivery,
    #[serde(default)]
    pub patient_id: Option<i64>,
    #[serde(default, deserialize_with = "dates::option_datetime")]
    pub visit_start_time: Option<NaiveDateTime>,
}

// ==============================================================================
// RECOVERY
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryStay {
    pub stay_id: i64,
    pub patient_id: i64,
    #[serde(default)]
    pub visit_id: Option<i64>,
    #[serde(deserialize_with = "dates::datetime")]
    pub admit_time: NaiveDateTime,
    #[serde(default, deserialize_with = "dates::option_datetime")]
    pub discharge_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub discharged_by: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecoveryStayRequest {
    pub patient_id: i64,
    pub visit_id: Option<i64>,
    #[serde(deserialize_with = "dates::datetime")]
    pub admit_time: NaiveDateTime,
    #[serde(default, deserialize_with = "dates::option_datetime")]
    pub discharge_time: Option<NaiveDateTime>,
    pub discharged_by: Option<i64>,
    pub notes: Option<String>,
}

impl Record for RecoveryStay {
    const COLLECTION: &'static str = "RecoveryStay";
    const ID_FIELD: &'static str = "stay_id";
    const LABEL: &'static str = "Recovery stay";
    type Create = CreateRecoveryStayRequest;

    fn from_create(id: i64, request: CreateRecoveryStayRequest) -> Self {
        Self {
            stay_id: id,
            patient_id: request.patient_id,
            visit_id: request.visit_id,
            admit_time: request.admit_time,
            discharge_time: request.discharge_time,
            discharged_by: request.discharged_by,
            notes: request.notes,
        }
    }

    fn id(&self) -> i64 {
        self.stay_id
    }

    fn validate(request: &CreateRecoveryStayRequest) -> Result<(), String> {
        check_discharge(request.admit_time, request.discharge_time)
    }
}

pub fn check_discharge(admit: NaiveDateTime, discharge: Option<NaiveDateTime>) -> Result<(), String> {
    match discharge {
        Some(discharge) if discharge < admit => {
            Err("discharge_time must not be before admit_time".to_string())
        }
        _ => Ok(()),
    }
}

/// Fields a stay may change after admission. Anything else in the body is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRecoveryStayRequest {
    #[serde(
        default,
        deserialize_with = "dates::option_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub discharge_time: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discharged_by: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryObservation {
    pub observation_id: i64,
    pub stay_id: i64,
    #[serde(deserialize_with = "dates::datetime")]
    pub observed_at: NaiveDateTime,
    #[serde(default)]
    pub observed_by: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateObservationRequest {
    pub stay_id: i64,
    #[serde(deserialize_with = "dates::datetime")]
    pub observed_at: NaiveDateTime,
    pub observed_by: Option<i64>,
    pub notes: Option<String>,
}

impl Record for RecoveryObservation {
    const COLLECTION: &'static str = "RecoveryObservation";
    const ID_FIELD: &'static str = "observation_id";
    const LABEL: &'static str = "Recovery observation";
    type Create = CreateObservationRequest;

    fn from_create(id: i64, request: CreateObservationRequest) -> Self {
        Self {
            observation_id: id,
            stay_id: request.stay_id,
            observed_at: request.observed_at,
            observed_by: request.observed_by,
            notes: request.notes,
        }
    }

    fn id(&self) -> i64 {
        self.observation_id
    }
}
