use super::common::*;

use crate::pipeline::domain::{JobId, PipelineStage};
use crate::pipeline::edit::ValidationError;
use crate::pipeline::intake::{ApplicationIntake, IntakeError};
use crate::pipeline::stage::TransitionMode;

#[tokio::test]
async fn posting_exposes_the_public_job_view() {
    let intake = ApplicationIntake::new(seeded_store());

    let posting = intake
        .posting(&JobId("job-a1".to_string()))
        .await
        .expect("job exists");

    assert_eq!(posting.title, "Backend Engineer");
    assert_eq!(posting.location.as_deref(), Some("Stockholm"));
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let intake = ApplicationIntake::new(seeded_store());
    let missing = JobId("job-gone".to_string());

    assert_eq!(
        intake.posting(&missing).await,
        Err(IntakeError::JobNotFound(missing.clone()))
    );
    assert_eq!(
        intake
            .submit(&missing, contact("Erik", "erik@exempel.se"))
            .await
            .err(),
        Some(IntakeError::JobNotFound(missing))
    );
}

#[tokio::test]
async fn submission_validates_contact_fields() {
    let intake = ApplicationIntake::new(seeded_store());

    let error = intake
        .submit(&JobId("job-a1".to_string()), contact("", "erik@exempel.se"))
        .await
        .expect_err("name missing");

    assert_eq!(error, IntakeError::Validation(ValidationError::MissingName));
}

#[tokio::test]
async fn applications_are_owned_by_the_job_owner_and_visible_to_them() {
    let store = seeded_store();
    let intake = ApplicationIntake::new(store.clone());

    let receipt = intake
        .submit(
            &JobId("job-b2".to_string()),
            contact(" Sofia Ek ", "sofia.ek@exempel.se"),
        )
        .await
        .expect("application stored");

    assert_eq!(receipt.job_title, "Office Manager");
    assert_eq!(receipt.candidate.name, "Sofia Ek");
    assert_eq!(receipt.candidate.stage, PipelineStage::Applied);
    assert_eq!(receipt.candidate.owner.0, OWNER_B);

    let service = service_for(store, TransitionMode::WriteThenPatch);
    let mut dashboard = service.dashboard(owner_b());
    dashboard.reload().await.expect("load");
    let entry = dashboard
        .working_set()
        .get(&receipt.candidate.id)
        .expect("new applicant is loaded");
    assert_eq!(entry.job_title_label(), "Office Manager");

    let mut other = service.dashboard(owner_a());
    other.reload().await.expect("load");
    assert!(!other.working_set().contains(&receipt.candidate.id));
}

#[tokio::test]
async fn store_failure_on_submit_is_a_write_failure() {
    let store = FaultyStore::seeded();
    store.fail_writes(true);
    let intake = ApplicationIntake::new(store);

    let error = intake
        .submit(
            &JobId("job-a1".to_string()),
            contact("Erik", "erik@exempel.se"),
        )
        .await
        .expect_err("store rejects writes");

    assert!(matches!(error, IntakeError::Write(_)));
}
