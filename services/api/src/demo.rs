use crate::infra::{demo_operator, demo_service, parse_role};
use clap::Args;
use talentflow::error::AppError;
use talentflow::pipeline::{
    write_table_csv, CandidateFields, CandidateId, InMemoryStore, JobSelection, Operator,
    OperatorRole, PipelineDashboard, PipelineStage, TableRow, TransitionMode,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Run the walk-through as an administrator with cross-tenant visibility.
    #[arg(long)]
    pub(crate) admin: bool,
    /// Stage transition strategy: write_then_patch or optimistic.
    #[arg(long, value_parser = parse_mode, default_value = "write_then_patch")]
    pub(crate) mode: TransitionMode,
    /// Skip the public application intake portion of the demo.
    #[arg(long)]
    pub(crate) skip_intake: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// Operator id whose pipeline is exported
    #[arg(long)]
    pub(crate) operator: String,
    /// Operator role: owner or admin
    #[arg(long, value_parser = parse_role, default_value = "owner")]
    pub(crate) role: OperatorRole,
    /// Free-text search over candidate name and email
    #[arg(long)]
    pub(crate) q: Option<String>,
    /// Job id to restrict to, or "all"
    #[arg(long)]
    pub(crate) job: Option<String>,
}

fn parse_mode(raw: &str) -> Result<TransitionMode, String> {
    TransitionMode::parse(raw)
        .ok_or_else(|| format!("unknown mode '{raw}' (expected write_then_patch or optimistic)"))
}

pub(crate) async fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let rows = export_rows(args).await?;
    let stdout = std::io::stdout();
    write_table_csv(&rows, stdout.lock())?;
    Ok(())
}

async fn export_rows(args: ExportArgs) -> Result<Vec<TableRow>, AppError> {
    let ExportArgs {
        operator,
        role,
        q,
        job,
    } = args;

    let service = demo_service(TransitionMode::default());
    let mut dashboard = service.dashboard(Operator::new(operator, role));
    dashboard.reload().await?;

    if let Some(query) = q {
        dashboard.set_query(query);
    }
    if let Some(job) = job {
        dashboard.set_job_filter(JobSelection::parse(&job));
    }
    Ok(dashboard.presenter().table())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        admin,
        mode,
        skip_intake,
    } = args;

    let service = demo_service(mode);
    let operator = demo_operator(admin);

    println!("Talentflow pipeline demo");
    println!(
        "Operator {} ({}) | transition mode {:?}",
        operator.id,
        operator.role.label(),
        service.transition_mode()
    );

    let mut dashboard = service.dashboard(operator.clone());
    dashboard.reload().await?;
    let scope_label = if dashboard.scope().restrict_to_owner() {
        "owned"
    } else {
        "global"
    };
    println!(
        "Loaded {} candidates across {} jobs ({} scope)",
        dashboard.working_set().len(),
        dashboard.job_options().len(),
        scope_label
    );
    render_board(&dashboard);

    println!("\nSearch \"erik\"");
    dashboard.set_query("erik");
    for row in dashboard.presenter().table() {
        println!("- {} | {} | {}", row.name, row.job_title, row.stage_label);
    }
    dashboard.set_query("");

    let first_applied = dashboard
        .presenter()
        .column(PipelineStage::Applied)
        .first()
        .map(|entry| entry.candidate.id.clone());

    if let Some(candidate_id) = first_applied {
        println!("\nDrag {} to Interview", candidate_label(&dashboard, &candidate_id));
        dashboard.begin_drag(candidate_id.clone());
        if let Err(err) = dashboard.drop_on_stage("interview").await {
            println!("  Drop failed ({}): {}", err.kind().label(), err);
        }
        print_notifications(&mut dashboard);

        println!(
            "\nDrop {} on an unknown column",
            candidate_label(&dashboard, &candidate_id)
        );
        dashboard.begin_drag(candidate_id.clone());
        match dashboard.drop_on_stage("archived").await {
            Ok(Some(receipt)) => println!("  Unexpectedly moved to {}", receipt.to.label()),
            Ok(None) => println!("  Nothing was being dragged"),
            Err(err) => println!("  Drop rejected ({}): {}", err.kind().label(), err),
        }
        print_notifications(&mut dashboard);
        render_board(&dashboard);

        println!("\nEdit {}", candidate_label(&dashboard, &candidate_id));
        let session = dashboard.open_edit(&candidate_id)?;
        session.draft_mut().phone = Some("+46 70 555 01 23".to_string());
        match dashboard.submit_edit().await {
            Ok(candidate) => println!(
                "  Saved phone {} (stage stays {})",
                candidate.phone.as_deref().unwrap_or("-"),
                candidate.stage.label()
            ),
            Err(err) => println!("  Edit failed ({}): {}", err.kind().label(), err),
        }
        print_notifications(&mut dashboard);
    }

    if !skip_intake {
        if let Some(job) = dashboard.job_options().first().cloned() {
            println!("\nPublic application for {}", job.title);
            println!("  Share link: {}", service.apply_link(&job.id));

            let form = CandidateFields {
                name: "Karin Lund".to_string(),
                email: "karin.lund@exempel.se".to_string(),
                ..CandidateFields::default()
            };
            match service.apply(&job.id, form).await {
                Ok(receipt) => println!(
                    "  Received {} -> stage {}, owner {}",
                    receipt.candidate.name,
                    receipt.candidate.stage.label(),
                    receipt.candidate.owner
                ),
                Err(err) => println!("  Application rejected ({}): {}", err.kind().label(), err),
            }

            dashboard.reload().await?;
            println!(
                "  Pipeline now holds {} candidates",
                dashboard.working_set().len()
            );
        }
    }

    let stats = service.stats(&operator).await?;
    println!("\nDashboard statistics");
    println!(
        "- {} jobs ({} open) | {} candidates | {} hired",
        stats.total_jobs, stats.open_jobs, stats.total_candidates, stats.hired_candidates
    );

    Ok(())
}

fn candidate_label(dashboard: &PipelineDashboard<InMemoryStore>, id: &CandidateId) -> String {
    dashboard
        .working_set()
        .get(id)
        .map(|entry| entry.candidate.name.clone())
        .unwrap_or_else(|| id.to_string())
}

fn print_notifications(dashboard: &mut PipelineDashboard<InMemoryStore>) {
    for notification in dashboard.drain_notifications() {
        println!("  [{:?}] {}", notification.level, notification.message);
    }
}

fn render_board(dashboard: &PipelineDashboard<InMemoryStore>) {
    println!("\nBoard");
    for column in dashboard.presenter().board() {
        let names: Vec<&str> = column.cards.iter().map(|card| card.name.as_str()).collect();
        println!(
            "- {} ({}): {}",
            column.stage_label,
            column.count,
            if names.is_empty() {
                "-".to_string()
            } else {
                names.join(", ")
            }
        );
    }
}
