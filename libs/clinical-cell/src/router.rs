use std::sync::Arc;

use axum::{middleware, routing::{get, post}, Router};

use shared_config::AppConfig;
use shared_utils::{
    crud::{create_record, crud_routes, get_record, list_records},
    extractor::auth_middleware,
};

use crate::handlers::*;
use crate::models::*;

pub fn clinical_routes(config: Arc<AppConfig>) -> Router {
    crud_routes::<Visit>("/visits")
        .route("/visits/patient/{patient_id}", get(get_patient_visits))
        .route("/visits/{id}/diagnoses", post(add_visit_diagnosis).get(get_visit_diagnoses))
        .route("/visits/{id}/diagnoses/{diagnosis_id}", axum::routing::delete(remove_visit_diagnosis))
        .route("/visits/{id}/procedures", post(add_visit_procedure).get(get_visit_procedures))
        .route("/visits/{id}/procedures/{procedure_id}", axum::routing::delete(remove_visit_procedure))
        // Catalogs
        .route("/diagnoses", post(create_record::<Diagnosis>).get(list_records::<Diagnosis>))
        .route("/diagnoses/{id}", get(get_record::<Diagnosis>))
        .route("/diagnoses/search/{code}", get(search_diagnoses))
        .route("/procedures", post(create_record::<Procedure>).get(list_records::<Procedure>))
        .route("/procedures/{id}", get(get_record::<Procedure>))
        .route("/drugs", post(create_record::<Drug>).get(list_records::<Drug>))
        .route("/drugs/{id}", get(get_record::<Drug>))
        .route("/drugs/search/{name}", get(search_drugs))
        // Prescriptions
        .route("/prescriptions", post(create_record::<Prescription>))
        .route("/prescriptions/all", get(list_recent_prescriptions))
        .route("/prescriptions/{id}", get(get_record::<Prescription>))
        .route("/prescriptions/{id}/details", get(get_prescription_details))
        .route("/prescriptions/visit/{visit_id}", get(get_visit_prescriptions))
        // Lab tests
        .route("/lab-tests", post(create_record::<LabTestOrder>))
        .route("/lab-tests/today", get(get_lab_tests_today))
        .route("/lab-tests/{id}", get(get_record::<LabTestOrder>))
        .route("/lab-tests/visit/{visit_id}", get(get_visit_lab_tests))
        .route("/lab-tests/date/{date}", get(get_lab_tests_by_date))
        // Deliveries
        .route("/deliveries", post(create_record::<Delivery>))
        .route("/deliveries/today", get(get_deliveries_today))
        .route("/deliveries/visit/{visit_id}", get(get_visit_delivery))
        .route("/deliveries/date/{date}", get(get_deliveries_by_date))
        // Recovery
        .route("/recovery-stays", post(create_record::<RecoveryStay>))
        .route("/recovery-stays/{id}", get(get_record::<RecoveryStay>).put(update_recovery_stay))
        .route("/recovery-observations", post(create_record::<RecoveryObservation>))
        .route("/recovery-observations/stay/{stay_id}", get(get_stay_observations))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
