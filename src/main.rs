use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use guarantee_engine::config::AppConfig;
use guarantee_engine::error::AppError;
use guarantee_engine::identity::{identity_router, Argon2Hasher, IdentityResolver, PersonalData};
use guarantee_engine::lifecycle::{
    lifecycle_router, AccountId, Actor, ActorRole, AgencyId, GuaranteeSubmission,
    LifecycleService, PropertySnapshot, TenantSnapshot,
};
use guarantee_engine::notify::{HttpWebhookClient, NotificationDispatcher};
use guarantee_engine::telemetry;

mod infra;

use infra::{
    InMemoryAuditLog, InMemoryGuaranteeRepository, InMemoryTenantAccounts, OutboundSender,
    ProfileSources,
};

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Guarantee Lifecycle Engine",
    about = "Run the rental guarantee lifecycle service from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk one guarantee request through the full lifecycle and print
    /// the audit trail
    Demo,
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Demo => run_demo(),
    }
}

type AppLifecycleService = LifecycleService<
    InMemoryGuaranteeRepository,
    InMemoryAuditLog,
    NotificationDispatcher<ProfileSources, OutboundSender>,
>;

fn build_lifecycle_service(
    accounts: Arc<InMemoryTenantAccounts>,
    sender: OutboundSender,
    endpoint: String,
) -> Arc<AppLifecycleService> {
    let sources = Arc::new(ProfileSources::new(accounts));
    let notifier = Arc::new(NotificationDispatcher::new(
        sources,
        Arc::new(sender),
        endpoint,
    ));
    Arc::new(LifecycleService::new(
        Arc::new(InMemoryGuaranteeRepository::default()),
        Arc::new(InMemoryAuditLog::default()),
        notifier,
    ))
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let sender = match &config.webhook.url {
        Some(_) => OutboundSender::Http(HttpWebhookClient::new(config.webhook.timeout())?),
        None => OutboundSender::Disabled,
    };
    let endpoint = config.webhook.url.clone().unwrap_or_default();

    let accounts = Arc::new(InMemoryTenantAccounts::default());
    let lifecycle = build_lifecycle_service(accounts.clone(), sender, endpoint);
    let resolver = Arc::new(IdentityResolver::new(accounts, Arc::new(Argon2Hasher)));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(lifecycle_router(lifecycle))
        .merge(identity_router(resolver))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "guarantee lifecycle engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_demo() -> Result<(), AppError> {
    let accounts = Arc::new(InMemoryTenantAccounts::default());
    let lifecycle = build_lifecycle_service(
        accounts.clone(),
        OutboundSender::Disabled,
        String::new(),
    );
    let resolver = Arc::new(IdentityResolver::new(accounts, Arc::new(Argon2Hasher)));

    let agency = Actor {
        id: Some(AccountId("acct-agency-01".to_string())),
        display_name: "Imob Prime".to_string(),
        role: ActorRole::RealtyAgency,
    };
    let analyst = Actor {
        id: Some(AccountId("acct-analyst-01".to_string())),
        display_name: "Ana Lima".to_string(),
        role: ActorRole::Analyst,
    };
    let finance = Actor {
        id: Some(AccountId("acct-finance-01".to_string())),
        display_name: "Paulo Reis".to_string(),
        role: ActorRole::Finance,
    };

    let submission = GuaranteeSubmission {
        tenant: TenantSnapshot {
            name: "Marina Duarte".to_string(),
            national_id: "123.456.789-09".to_string(),
            email: "marina@example.com".to_string(),
            phone: "+55 11 98888-0000".to_string(),
            monthly_income: 5400.0,
            address: "Rua das Laranjeiras 120, São Paulo".to_string(),
        },
        property: PropertySnapshot {
            property_type: "apartment".to_string(),
            rent_value: 1800.0,
            address: "Av. Paulista 900, São Paulo".to_string(),
            lease_months: 30,
        },
        agency_id: AgencyId("agency-007".to_string()),
        created_by: AccountId("acct-agency-01".to_string()),
    };

    println!("Guarantee lifecycle demo");

    let record = lifecycle
        .submit(submission, &agency)
        .map_err(demo_failure)?;
    let id = record.request.id.clone();
    println!("- submitted as {} ({})", id.0, record.request.status.label());

    let resolved = resolver
        .resolve_or_create(PersonalData {
            name: record.request.tenant.name.clone(),
            email: record.request.tenant.email.clone(),
            national_id: record.request.tenant.national_id.clone(),
            phone: record.request.tenant.phone.clone(),
        })
        .map_err(demo_failure)?;
    println!(
        "- tenant resolved to account {} (new: {})",
        resolved.account.id.0, resolved.is_new
    );
    lifecycle
        .link_tenant_account(&id, &analyst, resolved.account.id)
        .map_err(demo_failure)?;

    lifecycle
        .set_review_terms(&id, &analyst, Some(720), Some(10.0))
        .map_err(demo_failure)?;
    println!("- review terms set: score 720, rate 10%");

    let steps: Vec<guarantee_engine::lifecycle::TransitionOutcome> = vec![
        lifecycle
            .approve(&id, &analyst, None, Some("stable income".to_string()))
            .map_err(demo_failure)?,
        lifecycle.send_to_finance(&id, &agency).map_err(demo_failure)?,
        lifecycle
            .attach_payment_link(&id, &finance, "https://pay.example.com/demo")
            .map_err(demo_failure)?,
        lifecycle.confirm_payment(&id, &finance).map_err(demo_failure)?,
        lifecycle.send_for_signature(&id, &finance).map_err(demo_failure)?,
        lifecycle
            .activate(&id, &Actor::automation())
            .map_err(demo_failure)?,
    ];
    for step in &steps {
        println!("- {}: {}", step.status, step.summary);
    }

    let record = lifecycle.get(&id).map_err(demo_failure)?;
    println!("- final status: {}", record.request.status.label());

    println!("\nAudit trail ({})", Utc::now().format("%Y-%m-%d"));
    for entry in lifecycle.audit_trail(&id).map_err(demo_failure)? {
        let details = entry
            .details
            .map(|detail| format!(" ({detail})"))
            .unwrap_or_default();
        println!(
            "- {} | {} | {}{}",
            entry.created_at.format("%H:%M:%S"),
            entry.actor_display_name,
            entry.action,
            details
        );
    }

    Ok(())
}

fn demo_failure<E: std::fmt::Display>(err: E) -> AppError {
    AppError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        err.to_string(),
    ))
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
