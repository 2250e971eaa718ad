use super::common::*;
use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::pipeline::domain::{OperatorRole, PipelineStage};
use crate::pipeline::router::operator_from_headers;
use crate::pipeline::{pipeline_router, TransitionMode, OPERATOR_ID_HEADER, OPERATOR_ROLE_HEADER};

fn get(uri: &str, operator: Option<(&str, &str)>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some((id, role)) = operator {
        builder = builder
            .header(OPERATOR_ID_HEADER, id)
            .header(OPERATOR_ROLE_HEADER, role);
    }
    builder.body(Body::empty()).unwrap()
}

fn send(method: &str, uri: &str, operator: Option<(&str, &str)>, payload: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some((id, role)) = operator {
        builder = builder
            .header(OPERATOR_ID_HEADER, id)
            .header(OPERATOR_ROLE_HEADER, role);
    }
    builder
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap()
}

const OWNER: Option<(&str, &str)> = Some((OWNER_A, "customer"));
const ADMIN: Option<(&str, &str)> = Some(("admin-1", "admin"));

fn column_names(body: &Value, stage: &str) -> Vec<String> {
    body["pipeline"]["view"]["rows"]
        .as_array()
        .expect("board columns")
        .iter()
        .find(|column| column["stage"] == stage)
        .expect("column present")["cards"]
        .as_array()
        .expect("cards")
        .iter()
        .map(|card| card["name"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn identity_headers_map_to_operators() {
    let mut headers = HeaderMap::new();
    assert_eq!(operator_from_headers(&headers), None);

    headers.insert(OPERATOR_ID_HEADER, "  ".parse().unwrap());
    assert_eq!(operator_from_headers(&headers), None);

    headers.insert(OPERATOR_ID_HEADER, "owner-a".parse().unwrap());
    let operator = operator_from_headers(&headers).expect("operator");
    assert_eq!(operator.role, OperatorRole::Owner);

    headers.insert(OPERATOR_ROLE_HEADER, "admin".parse().unwrap());
    let operator = operator_from_headers(&headers).expect("operator");
    assert_eq!(operator.role, OperatorRole::Administrator);
}

#[tokio::test]
async fn pipeline_requires_an_operator() {
    let response = router_for(seeded_store())
        .oneshot(get("/api/v1/pipeline", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn pipeline_returns_the_filtered_table_for_the_operator() {
    let response = router_for(seeded_store())
        .oneshot(get("/api/v1/pipeline?q=erik&job=all", OWNER))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["pipeline"]["total"], 3);
    assert_eq!(body["pipeline"]["visible"], 1);
    assert_eq!(body["pipeline"]["view"]["mode"], "table");
    assert_eq!(body["pipeline"]["view"]["rows"][0]["name"], "Erik Andersson");
    assert_eq!(body["pipeline"]["scope"]["kind"], "owned");
    assert_eq!(body["notifications"], json!([]));
}

#[tokio::test]
async fn unknown_view_is_rejected() {
    let response = router_for(seeded_store())
        .oneshot(get("/api/v1/pipeline?view=grid", OWNER))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn drag_and_drop_moves_a_card_on_the_board() {
    let router = router_for(seeded_store());

    let response = router
        .clone()
        .oneshot(send(
            "POST",
            "/api/v1/pipeline/drag",
            OWNER,
            json!({ "candidate_id": "cand-erik" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["pipeline"]["dragging"], "cand-erik");

    let response = router
        .clone()
        .oneshot(send(
            "POST",
            "/api/v1/pipeline/drop",
            OWNER,
            json!({ "stage": "interview" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["transition"]["from"], "applied");
    assert_eq!(body["transition"]["to"], "interview");
    assert_eq!(body["notifications"][0]["level"], "success");
    assert_eq!(body["pipeline"]["dragging"], Value::Null);

    let response = router
        .oneshot(get("/api/v1/pipeline?view=board&q=", OWNER))
        .await
        .unwrap();
    let body = read_json_body(response).await;
    assert_eq!(
        column_names(&body, "interview"),
        vec!["Erik Andersson", "Lars Nilsson"]
    );
    assert!(column_names(&body, "applied").is_empty());
    assert!(column_names(&body, "offer").is_empty());
}

#[tokio::test]
async fn failed_drop_reports_a_transition_failure() {
    let store = FaultyStore::seeded();
    let router = router_for(store.clone());

    router
        .clone()
        .oneshot(send(
            "POST",
            "/api/v1/pipeline/drag",
            OWNER,
            json!({ "candidate_id": "cand-erik" }),
        ))
        .await
        .unwrap();

    store.fail_writes(true);
    let response = router
        .clone()
        .oneshot(send(
            "POST",
            "/api/v1/pipeline/drop",
            OWNER,
            json!({ "stage": "offer" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = read_json_body(response).await;
    assert_eq!(body["kind"], "transition_failure");
    assert_eq!(body["notifications"][0]["level"], "error");

    let response = router
        .oneshot(get("/api/v1/pipeline?view=board", OWNER))
        .await
        .unwrap();
    let body = read_json_body(response).await;
    assert_eq!(column_names(&body, "applied"), vec!["Erik Andersson"]);
}

#[tokio::test]
async fn stage_route_validates_the_target() {
    let router = router_for(seeded_store());

    let response = router
        .clone()
        .oneshot(send(
            "POST",
            "/api/v1/pipeline/candidates/cand-erik/stage",
            OWNER,
            json!({ "stage": "archived" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = router
        .oneshot(send(
            "POST",
            "/api/v1/pipeline/candidates/cand-maria/stage",
            OWNER,
            json!({ "stage": "offer" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stage_route_reloads_a_failed_board_before_writing() {
    let store = FaultyStore::seeded();
    let router = router_for(store.clone());
    let move_erik = || {
        send(
            "POST",
            "/api/v1/pipeline/candidates/cand-erik/stage",
            OWNER,
            json!({ "stage": "offer" }),
        )
    };

    let response = router
        .clone()
        .oneshot(get("/api/v1/pipeline", OWNER))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    store.fail_reads(true);
    let response = router
        .clone()
        .oneshot(get("/api/v1/pipeline", OWNER))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = router.clone().oneshot(move_erik()).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = read_json_body(response).await;
    assert_eq!(body["kind"], "load_failure");
    assert_eq!(store.update_calls(), 0);

    store.fail_reads(false);
    let response = router.oneshot(move_erik()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["pipeline"]["state"], "ready");
    assert_eq!(body["notifications"][0]["level"], "success");
    assert_eq!(store.stage_of(&erik()).await, PipelineStage::Offer);
}

#[tokio::test]
async fn ending_a_session_drops_its_filters() {
    let service = service_for(seeded_store(), TransitionMode::WriteThenPatch);
    let router = pipeline_router(service.clone());

    let response = router
        .clone()
        .oneshot(get("/api/v1/pipeline?q=erik", OWNER))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(service.session_count(), 1);

    let response = router
        .clone()
        .oneshot(send("DELETE", "/api/v1/pipeline/session", OWNER, json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(service.session_count(), 0);

    let response = router
        .oneshot(get("/api/v1/pipeline", OWNER))
        .await
        .unwrap();
    let body = read_json_body(response).await;
    assert_eq!(body["pipeline"]["query"], "");
    assert_eq!(body["pipeline"]["visible"], 3);
}

#[tokio::test]
async fn edit_route_saves_or_reports_validation_errors() {
    let router = router_for(seeded_store());

    let response = router
        .clone()
        .oneshot(send(
            "PUT",
            "/api/v1/pipeline/candidates/cand-anna",
            OWNER,
            json!({ "name": "Anna Svensson", "email": "not-an-email" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["kind"], "validation_failure");

    let response = router
        .oneshot(send(
            "PUT",
            "/api/v1/pipeline/candidates/cand-anna",
            OWNER,
            json!({
                "name": "Anna Svensson",
                "email": "anna@exempel.se",
                "linkedin_url": "https://linkedin.com/in/anna",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["candidate"]["email"], "anna@exempel.se");
    assert_eq!(body["candidate"]["profile_url"], "https://linkedin.com/in/anna");
    assert_eq!(body["candidate"]["stage"], "screening");
}

#[tokio::test]
async fn manual_add_creates_an_applied_candidate() {
    let router = router_for(seeded_store());

    let response = router
        .oneshot(send(
            "POST",
            "/api/v1/jobs/job-a2/candidates",
            OWNER,
            json!({ "name": "Karin Lund", "email": "karin.lund@exempel.se" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["candidate"]["stage"], "applied");
    assert_eq!(body["candidate"]["owner"], OWNER_A);
    assert_eq!(body["pipeline"]["total"], 4);
}

#[tokio::test]
async fn jobs_routes_list_create_and_guard_foreign_updates() {
    let router = router_for(seeded_store());

    let response = router
        .clone()
        .oneshot(send(
            "POST",
            "/api/v1/jobs",
            OWNER,
            json!({ "title": "Site Reliability Engineer", "location": "Göteborg" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    let job_id = body["job"]["id"].as_str().expect("job id").to_string();
    assert_eq!(
        body["apply_url"],
        format!("http://jobs.test/apply/{job_id}")
    );

    let response = router
        .clone()
        .oneshot(get("/api/v1/jobs", OWNER))
        .await
        .unwrap();
    let body = read_json_body(response).await;
    let jobs = body["jobs"].as_array().expect("jobs");
    assert_eq!(jobs.len(), 3);
    assert_eq!(jobs[0]["id"], job_id);
    assert_eq!(jobs[0]["candidate_count"], 0);

    let response = router
        .oneshot(send(
            "PUT",
            "/api/v1/jobs/job-b1",
            OWNER,
            json!({ "title": "Hijacked" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn job_status_and_stats_routes() {
    let router = router_for(seeded_store());

    let response = router
        .clone()
        .oneshot(send(
            "POST",
            "/api/v1/jobs/job-a1/status",
            ADMIN,
            json!({ "status": "closed" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(get("/api/v1/stats", ADMIN))
        .await
        .unwrap();
    let body = read_json_body(response).await;
    assert_eq!(body["stats"]["total_jobs"], 4);
    assert_eq!(body["stats"]["open_jobs"], 3);
    assert_eq!(body["stats"]["total_candidates"], 4);
}

#[tokio::test]
async fn job_board_is_scoped_to_one_visible_job() {
    let router = router_for(seeded_store());

    let response = router
        .clone()
        .oneshot(get("/api/v1/jobs/job-a1/pipeline?view=board", OWNER))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["pipeline"]["job"]["title"], "Backend Engineer");
    assert_eq!(body["pipeline"]["total"], 2);

    let response = router
        .oneshot(get("/api/v1/jobs/job-b1/pipeline", OWNER))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn public_intake_needs_no_identity() {
    let router = router_for(seeded_store());

    let response = router
        .clone()
        .oneshot(get("/api/v1/apply/job-gone", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json_body(response).await;
    assert_eq!(body["kind"], "not_found");

    let response = router
        .clone()
        .oneshot(get("/api/v1/apply/job-a1", None))
        .await
        .unwrap();
    let body = read_json_body(response).await;
    assert_eq!(body["job"]["title"], "Backend Engineer");

    let response = router
        .clone()
        .oneshot(send(
            "POST",
            "/api/v1/apply/job-a1",
            None,
            json!({ "name": "Sofia Ek", "email": "sofia.ek@exempel.se" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["application"]["candidate"]["owner"], OWNER_A);
    assert_eq!(body["application"]["candidate"]["stage"], "applied");

    let response = router
        .oneshot(get("/api/v1/pipeline?q=sofia", OWNER))
        .await
        .unwrap();
    let body = read_json_body(response).await;
    assert_eq!(body["pipeline"]["visible"], 1);
}
