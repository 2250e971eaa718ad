use chrono::{DateTime, Duration, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use talentflow::config::PipelineConfig;
use talentflow::pipeline::{
    Candidate, CandidateFields, InMemoryStore, Job, JobId, JobStatus, Operator, OperatorId,
    OperatorRole, PipelineService, PipelineStage, TransitionMode, DEFAULT_SESSION_LIMIT,
};

pub(crate) type ApiService = PipelineService<InMemoryStore>;

pub(crate) const DEMO_OWNER: &str = "acme-recruiting";
pub(crate) const DEMO_OTHER_OWNER: &str = "nordic-talent";
pub(crate) const DEMO_ADMIN: &str = "ops-admin";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn build_service(config: &PipelineConfig) -> Arc<ApiService> {
    let store = if config.seed_demo {
        seeded_store(Utc::now())
    } else {
        InMemoryStore::new()
    };
    Arc::new(
        PipelineService::new(
            Arc::new(store),
            config.transition_mode,
            config.public_url.clone(),
        )
        .with_session_limit(config.max_sessions),
    )
}

pub(crate) fn demo_service(mode: TransitionMode) -> Arc<ApiService> {
    build_service(&PipelineConfig {
        transition_mode: mode,
        seed_demo: true,
        public_url: "http://127.0.0.1:3000".to_string(),
        max_sessions: DEFAULT_SESSION_LIMIT,
    })
}

pub(crate) fn demo_operator(admin: bool) -> Operator {
    if admin {
        Operator::new(DEMO_ADMIN, OperatorRole::Administrator)
    } else {
        Operator::new(DEMO_OWNER, OperatorRole::Owner)
    }
}

pub(crate) fn parse_role(raw: &str) -> Result<OperatorRole, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "admin" | "administrator" => Ok(OperatorRole::Administrator),
        "owner" | "customer" => Ok(OperatorRole::Owner),
        other => Err(format!("unknown role '{other}' (expected owner or admin)")),
    }
}

fn demo_job(
    id: &str,
    owner: &str,
    title: &str,
    department: &str,
    created_at: DateTime<Utc>,
) -> Job {
    Job {
        id: JobId(id.to_string()),
        owner: OperatorId(owner.to_string()),
        title: title.to_string(),
        department: Some(department.to_string()),
        location: Some("Stockholm".to_string()),
        description: None,
        status: JobStatus::Open,
        created_at,
    }
}

fn demo_candidate(
    job: &Job,
    name: &str,
    stage: PipelineStage,
    created_at: DateTime<Utc>,
) -> Candidate {
    let fields = CandidateFields {
        name: name.to_string(),
        email: format!("{}@exempel.se", name.to_lowercase().replace(' ', ".")),
        ..CandidateFields::default()
    };
    let mut candidate = Candidate::for_job(job, fields, created_at);
    candidate.stage = stage;
    candidate
}

/// Three jobs for the demo owner, one for a second tenant, and candidates spread over every stage.
pub(crate) fn demo_records(now: DateTime<Utc>) -> (Vec<Job>, Vec<Candidate>) {
    let days_ago = |days: i64| now - Duration::days(days);

    let backend = demo_job(
        "job-backend",
        DEMO_OWNER,
        "Backend Engineer",
        "Engineering",
        days_ago(30),
    );
    let designer = demo_job(
        "job-designer",
        DEMO_OWNER,
        "Product Designer",
        "Design",
        days_ago(21),
    );
    let mut support = demo_job(
        "job-support",
        DEMO_OWNER,
        "Support Specialist",
        "Customer Care",
        days_ago(45),
    );
    support.status = JobStatus::Closed;
    let analyst = demo_job(
        "job-analyst",
        DEMO_OTHER_OWNER,
        "Data Analyst",
        "Finance",
        days_ago(14),
    );

    let seeds = [
        (&backend, "Erik Andersson", PipelineStage::Applied, 1),
        (&designer, "Anna Svensson", PipelineStage::Screening, 2),
        (&backend, "Lars Nilsson", PipelineStage::Interview, 4),
        (&backend, "Sara Lindqvist", PipelineStage::Offer, 9),
        (&support, "Johan Berg", PipelineStage::Hired, 20),
        (&designer, "Emma Holm", PipelineStage::Rejected, 12),
        (&analyst, "Maria Ek", PipelineStage::Applied, 3),
    ];
    let candidates = seeds
        .into_iter()
        .map(|(job, name, stage, age)| demo_candidate(job, name, stage, days_ago(age)))
        .collect();

    (vec![backend, designer, support, analyst], candidates)
}

pub(crate) fn seeded_store(now: DateTime<Utc>) -> InMemoryStore {
    let (jobs, candidates) = demo_records(now);
    InMemoryStore::with_records(jobs, candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_candidates_belong_to_their_job_owner() {
        let (jobs, candidates) = demo_records(Utc::now());
        for candidate in &candidates {
            let job = jobs
                .iter()
                .find(|job| job.id == candidate.job_id)
                .expect("candidate job seeded");
            assert_eq!(candidate.owner, job.owner);
        }
        for stage in PipelineStage::ordered() {
            assert!(candidates.iter().any(|candidate| candidate.stage == stage));
        }
    }

    #[test]
    fn role_parser_accepts_known_roles() {
        assert_eq!(parse_role("Admin"), Ok(OperatorRole::Administrator));
        assert_eq!(parse_role("owner"), Ok(OperatorRole::Owner));
        assert!(parse_role("recruiter").is_err());
    }

    #[tokio::test]
    async fn seeded_service_scopes_demo_data() {
        let service = demo_service(TransitionMode::WriteThenPatch);

        let mut owner = service.dashboard(demo_operator(false));
        owner.reload().await.expect("owner load");
        assert_eq!(owner.working_set().len(), 6);

        let mut admin = service.dashboard(demo_operator(true));
        admin.reload().await.expect("admin load");
        assert_eq!(admin.working_set().len(), 7);
    }
}
