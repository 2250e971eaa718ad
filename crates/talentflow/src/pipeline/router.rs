use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::dashboard::{DashboardSnapshot, LoadState, PipelineDashboard};
use super::domain::{
    CandidateFields, CandidateId, Job, JobFields, JobId, JobStatus, Operator, OperatorRole,
};
use super::error::PipelineError;
use super::filter::JobSelection;
use super::jobs::JobSummary;
use super::notify::Notification;
use super::presenter::ViewMode;
use super::service::{DashboardHandle, PipelineService};
use super::store::PipelineStore;

pub const OPERATOR_ID_HEADER: &str = "x-operator-id";
pub const OPERATOR_ROLE_HEADER: &str = "x-operator-role";

/// Router builder exposing the pipeline dashboard, job catalog, and public intake endpoints.
pub fn pipeline_router<S>(service: Arc<PipelineService<S>>) -> Router
where
    S: PipelineStore + 'static,
{
    Router::new()
        .route("/api/v1/pipeline", get(pipeline_handler::<S>))
        .route("/api/v1/pipeline/session", delete(end_session_handler::<S>))
        .route("/api/v1/pipeline/drag", post(begin_drag_handler::<S>))
        .route("/api/v1/pipeline/drag/cancel", post(cancel_drag_handler::<S>))
        .route("/api/v1/pipeline/drop", post(drop_handler::<S>))
        .route(
            "/api/v1/pipeline/candidates/:candidate_id",
            put(edit_handler::<S>),
        )
        .route(
            "/api/v1/pipeline/candidates/:candidate_id/stage",
            post(stage_handler::<S>),
        )
        .route(
            "/api/v1/jobs",
            get(list_jobs_handler::<S>).post(create_job_handler::<S>),
        )
        .route("/api/v1/jobs/:job_id", put(update_job_handler::<S>))
        .route("/api/v1/jobs/:job_id/status", post(job_status_handler::<S>))
        .route("/api/v1/jobs/:job_id/pipeline", get(job_board_handler::<S>))
        .route(
            "/api/v1/jobs/:job_id/candidates",
            post(manual_add_handler::<S>),
        )
        .route("/api/v1/stats", get(stats_handler::<S>))
        .route(
            "/api/v1/apply/:job_id",
            get(posting_handler::<S>).post(apply_handler::<S>),
        )
        .with_state(service)
}

/// Reads the session identity fact. A missing or blank operator id is unauthenticated; an
/// unrecognised role claim falls back to owner.
pub(crate) fn operator_from_headers(headers: &HeaderMap) -> Option<Operator> {
    let id = headers
        .get(OPERATOR_ID_HEADER)?
        .to_str()
        .ok()?
        .trim();
    if id.is_empty() {
        return None;
    }
    let role = headers
        .get(OPERATOR_ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map_or(OperatorRole::Owner, OperatorRole::from_claim);
    Some(Operator::new(id, role))
}

fn unauthenticated() -> Response {
    let payload = json!({
        "error": format!("missing {OPERATOR_ID_HEADER} header"),
    });
    (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
}

pub(crate) fn pipeline_failure(error: PipelineError, notifications: Vec<Notification>) -> Response {
    let payload = json!({
        "error": error.to_string(),
        "kind": error.kind(),
        "notifications": notifications,
    });
    (error.status_code(), Json(payload)).into_response()
}

#[derive(Serialize)]
struct SessionBody {
    #[serde(flatten)]
    result: Value,
    pipeline: DashboardSnapshot,
    notifications: Vec<Notification>,
}

fn session_response<S>(
    dashboard: &mut PipelineDashboard<S>,
    status: StatusCode,
    result: Value,
) -> Response
where
    S: PipelineStore + ?Sized,
{
    let notifications = dashboard.drain_notifications();
    match dashboard.snapshot() {
        Ok(pipeline) => {
            let body = SessionBody {
                result,
                pipeline,
                notifications,
            };
            (status, Json(body)).into_response()
        }
        Err(error) => pipeline_failure(error, notifications),
    }
}

/// The operator's session, holding a successful load and the identity of this request.
async fn loaded_session<S>(
    service: &PipelineService<S>,
    operator: &Operator,
) -> Result<DashboardHandle<S>, Response>
where
    S: PipelineStore + 'static,
{
    let session = service.session(operator);
    let needs_load = {
        let dashboard = session.lock().await;
        dashboard.operator() != operator
            || matches!(dashboard.state(), LoadState::Idle | LoadState::Failed(_))
    };

    if needs_load {
        if let Err(error) = service.refresh(&session, operator).await {
            let notifications = session.lock().await.drain_notifications();
            return Err(pipeline_failure(error, notifications));
        }
    }
    Ok(session)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PipelineParams {
    pub q: Option<String>,
    pub job: Option<String>,
    pub view: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DragRequest {
    pub candidate_id: CandidateId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StageRequest {
    pub stage: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JobStatusRequest {
    pub status: JobStatus,
}

#[derive(Debug, Serialize)]
struct JobListing {
    #[serde(flatten)]
    summary: JobSummary,
    apply_url: String,
}

async fn render_pipeline<S>(
    service: &PipelineService<S>,
    operator: &Operator,
    params: PipelineParams,
    focus: Option<JobId>,
) -> Response
where
    S: PipelineStore + 'static,
{
    let view = match params.view.as_deref().map(ViewMode::parse) {
        Some(None) => {
            let payload = json!({ "error": "view must be 'table' or 'board'" });
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
        }
        Some(mode) => mode,
        None => None,
    };

    let session = service.session(operator);
    {
        let mut dashboard = session.lock().await;
        dashboard.focus_job(focus);
        if let Some(query) = params.q {
            dashboard.set_query(query);
        }
        if let Some(job) = params.job {
            dashboard.set_job_filter(JobSelection::parse(&job));
        }
        if let Some(mode) = view {
            dashboard.set_view(mode);
        }
    }

    let refreshed = service.refresh(&session, operator).await;

    let mut dashboard = session.lock().await;
    match refreshed {
        Ok(_) => session_response(&mut dashboard, StatusCode::OK, json!({})),
        Err(error) => {
            let notifications = dashboard.drain_notifications();
            pipeline_failure(error, notifications)
        }
    }
}

pub(crate) async fn pipeline_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    headers: HeaderMap,
    Query(params): Query<PipelineParams>,
) -> Response
where
    S: PipelineStore + 'static,
{
    let Some(operator) = operator_from_headers(&headers) else {
        return unauthenticated();
    };
    render_pipeline(&service, &operator, params, None).await
}

pub(crate) async fn job_board_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
    Query(params): Query<PipelineParams>,
) -> Response
where
    S: PipelineStore + 'static,
{
    let Some(operator) = operator_from_headers(&headers) else {
        return unauthenticated();
    };
    render_pipeline(&service, &operator, params, Some(JobId(job_id))).await
}

pub(crate) async fn end_session_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: PipelineStore + 'static,
{
    let Some(operator) = operator_from_headers(&headers) else {
        return unauthenticated();
    };
    service.end_session(&operator.id);
    StatusCode::NO_CONTENT.into_response()
}

pub(crate) async fn begin_drag_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    headers: HeaderMap,
    Json(request): Json<DragRequest>,
) -> Response
where
    S: PipelineStore + 'static,
{
    let Some(operator) = operator_from_headers(&headers) else {
        return unauthenticated();
    };
    let session = match loaded_session(&service, &operator).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    let mut dashboard = session.lock().await;
    dashboard.begin_drag(request.candidate_id.clone());
    session_response(
        &mut dashboard,
        StatusCode::OK,
        json!({ "dragging": request.candidate_id }),
    )
}

pub(crate) async fn cancel_drag_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: PipelineStore + 'static,
{
    let Some(operator) = operator_from_headers(&headers) else {
        return unauthenticated();
    };
    let session = match loaded_session(&service, &operator).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    let mut dashboard = session.lock().await;
    let cancelled = dashboard.cancel_drag();
    session_response(
        &mut dashboard,
        StatusCode::OK,
        json!({ "cancelled": cancelled }),
    )
}

pub(crate) async fn drop_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    headers: HeaderMap,
    Json(request): Json<StageRequest>,
) -> Response
where
    S: PipelineStore + 'static,
{
    let Some(operator) = operator_from_headers(&headers) else {
        return unauthenticated();
    };
    let session = match loaded_session(&service, &operator).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    let mut dashboard = session.lock().await;
    match dashboard.drop_on_stage(&request.stage).await {
        Ok(transition) => session_response(
            &mut dashboard,
            StatusCode::OK,
            json!({ "transition": transition }),
        ),
        Err(error) => {
            let notifications = dashboard.drain_notifications();
            pipeline_failure(error, notifications)
        }
    }
}

pub(crate) async fn stage_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    headers: HeaderMap,
    Path(candidate_id): Path<String>,
    Json(request): Json<StageRequest>,
) -> Response
where
    S: PipelineStore + 'static,
{
    let Some(operator) = operator_from_headers(&headers) else {
        return unauthenticated();
    };
    let session = match loaded_session(&service, &operator).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    let candidate_id = CandidateId(candidate_id);
    let mut dashboard = session.lock().await;
    match dashboard.move_candidate(&candidate_id, &request.stage).await {
        Ok(transition) => session_response(
            &mut dashboard,
            StatusCode::OK,
            json!({ "transition": transition }),
        ),
        Err(error) => {
            let notifications = dashboard.drain_notifications();
            pipeline_failure(error, notifications)
        }
    }
}

pub(crate) async fn edit_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    headers: HeaderMap,
    Path(candidate_id): Path<String>,
    Json(fields): Json<CandidateFields>,
) -> Response
where
    S: PipelineStore + 'static,
{
    let Some(operator) = operator_from_headers(&headers) else {
        return unauthenticated();
    };
    let session = match loaded_session(&service, &operator).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    let candidate_id = CandidateId(candidate_id);
    let mut dashboard = session.lock().await;
    let opened = dashboard
        .open_edit(&candidate_id)
        .map(|edit| *edit.draft_mut() = fields);
    if let Err(error) = opened {
        return pipeline_failure(error, dashboard.drain_notifications());
    }

    match dashboard.submit_edit().await {
        Ok(candidate) => session_response(
            &mut dashboard,
            StatusCode::OK,
            json!({ "candidate": candidate }),
        ),
        Err(error) => {
            let notifications = dashboard.drain_notifications();
            pipeline_failure(error, notifications)
        }
    }
}

pub(crate) async fn manual_add_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
    Json(fields): Json<CandidateFields>,
) -> Response
where
    S: PipelineStore + 'static,
{
    let Some(operator) = operator_from_headers(&headers) else {
        return unauthenticated();
    };
    let session = match loaded_session(&service, &operator).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    let mut dashboard = session.lock().await;
    *dashboard.open_new(JobId(job_id)).draft_mut() = fields;

    match dashboard.submit_edit().await {
        Ok(candidate) => session_response(
            &mut dashboard,
            StatusCode::CREATED,
            json!({ "candidate": candidate }),
        ),
        Err(error) => {
            let notifications = dashboard.drain_notifications();
            pipeline_failure(error, notifications)
        }
    }
}

pub(crate) async fn list_jobs_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: PipelineStore + 'static,
{
    let Some(operator) = operator_from_headers(&headers) else {
        return unauthenticated();
    };

    match service.list_jobs(&operator).await {
        Ok(summaries) => {
            let jobs: Vec<JobListing> = summaries
                .into_iter()
                .map(|summary| JobListing {
                    apply_url: service.apply_link(&summary.job.id),
                    summary,
                })
                .collect();
            let payload = json!({
                "jobs": jobs,
                "notifications": Vec::<Notification>::new(),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => {
            let notification = Notification::error(error.to_string());
            pipeline_failure(error, vec![notification])
        }
    }
}

pub(crate) async fn create_job_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    headers: HeaderMap,
    Json(fields): Json<JobFields>,
) -> Response
where
    S: PipelineStore + 'static,
{
    let Some(operator) = operator_from_headers(&headers) else {
        return unauthenticated();
    };

    match service.create_job(&operator, fields).await {
        Ok(job) => {
            let payload = json!({
                "apply_url": service.apply_link(&job.id),
                "notifications": [Notification::success(format!("Created job {}", job.title))],
                "job": job,
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(error) => {
            let notification = Notification::error(error.to_string());
            pipeline_failure(error, vec![notification])
        }
    }
}

pub(crate) async fn update_job_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
    Json(fields): Json<JobFields>,
) -> Response
where
    S: PipelineStore + 'static,
{
    let Some(operator) = operator_from_headers(&headers) else {
        return unauthenticated();
    };

    let result = service
        .update_job(&operator, &JobId(job_id), fields)
        .await;
    job_write_response(result, "Updated job")
}

pub(crate) async fn job_status_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
    Json(request): Json<JobStatusRequest>,
) -> Response
where
    S: PipelineStore + 'static,
{
    let Some(operator) = operator_from_headers(&headers) else {
        return unauthenticated();
    };

    let result = service
        .set_job_status(&operator, &JobId(job_id), request.status)
        .await;
    job_write_response(result, "Updated status of job")
}

fn job_write_response(result: Result<Job, PipelineError>, verb: &str) -> Response {
    match result {
        Ok(job) => {
            let payload = json!({
                "notifications": [Notification::success(format!("{verb} {}", job.title))],
                "job": job,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => {
            let notification = Notification::error(error.to_string());
            pipeline_failure(error, vec![notification])
        }
    }
}

pub(crate) async fn stats_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: PipelineStore + 'static,
{
    let Some(operator) = operator_from_headers(&headers) else {
        return unauthenticated();
    };

    match service.stats(&operator).await {
        Ok(stats) => (StatusCode::OK, Json(json!({ "stats": stats }))).into_response(),
        Err(error) => {
            let notification = Notification::error(error.to_string());
            pipeline_failure(error, vec![notification])
        }
    }
}

pub(crate) async fn posting_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    Path(job_id): Path<String>,
) -> Response
where
    S: PipelineStore + 'static,
{
    match service.posting(&JobId(job_id)).await {
        Ok(posting) => (StatusCode::OK, Json(json!({ "job": posting }))).into_response(),
        Err(error) => pipeline_failure(error, Vec::new()),
    }
}

pub(crate) async fn apply_handler<S>(
    State(service): State<Arc<PipelineService<S>>>,
    Path(job_id): Path<String>,
    Json(form): Json<CandidateFields>,
) -> Response
where
    S: PipelineStore + 'static,
{
    match service.apply(&JobId(job_id), form).await {
        Ok(receipt) => {
            let payload = json!({
                "notifications": [Notification::success(format!(
                    "Application for {} received",
                    receipt.job_title
                ))],
                "application": receipt,
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(error) => {
            let notification = Notification::error(error.to_string());
            pipeline_failure(error, vec![notification])
        }
    }
}
