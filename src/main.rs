use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fittrack::config::{self, Config, StoreBackend};
use fittrack::jobs::reminder::{ReminderJob, ReminderScheduler};
use fittrack::models::notification::Page;
use fittrack::models::preferences::{NewUser, Preferences};
use fittrack::store::memory::MemoryStore;
use fittrack::store::postgres::PgStore;
use fittrack::{api, AppState};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse arguments before touching the environment so --help always works.
    let args = cli::Cli::parse();
    let cfg = config::load()?;
    init_tracing(cfg.json_logs)?;

    let result = match args.command {
        Some(cli::Commands::Serve { port, no_reminders }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port, !no_reminders).await
        }
        Some(cli::Commands::Reminders { command }) => {
            let state = build_state(cfg).await?;
            handle_reminder_command(command, &state).await
        }
        Some(cli::Commands::User { command }) => {
            let state = build_state(cfg).await?;
            handle_user_command(command, &state).await
        }
        Some(cli::Commands::Notifications { command }) => {
            let state = build_state(cfg).await?;
            handle_notification_command(command, &state).await
        }
        None => {
            let port = cfg.port;
            run_server(cfg, port, true).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

fn init_tracing(json_logs: bool) -> anyhow::Result<()> {
    // Export spans over OTLP only when an endpoint is configured.
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::{trace as sdktrace, Resource};

    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "fittrack"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .context("failed to install OpenTelemetry tracer")?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "fittrack=debug,tower_http=debug".into()),
        ))
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .with(telemetry_layer)
        .init();
    Ok(())
}

async fn build_state(cfg: Config) -> anyhow::Result<Arc<AppState>> {
    let state = match cfg.store {
        StoreBackend::Postgres => {
            tracing::info!("Connecting to database...");
            let db = PgStore::connect(&cfg.database_url).await?;

            tracing::info!("Running migrations...");
            db.migrate().await?;
            AppState::with_store(db, cfg)
        }
        StoreBackend::Memory => {
            tracing::warn!("FITTRACK_STORE=memory: data is not persisted across restarts");
            AppState::with_store(MemoryStore::new(), cfg)
        }
    };
    Ok(Arc::new(state))
}

fn reminder_job(state: &AppState) -> ReminderJob {
    ReminderJob::new(
        state.notifications.clone(),
        state.users.clone(),
        state.config.reminder_schedule(),
        state.config.reminder_message.clone(),
    )
}

async fn run_server(cfg: Config, port: u16, reminders: bool) -> anyhow::Result<()> {
    let state = build_state(cfg).await?;

    if reminders {
        let job = Arc::new(reminder_job(&state));
        let schedule = job.schedule();
        ReminderScheduler::new(job).spawn();
        tracing::info!(
            at = %schedule.at,
            zone = ?schedule.zone,
            next_run = %schedule.next_fire_after(Utc::now()),
            "Reminder scheduler started"
        );
    }

    let app = api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("FitTrack API listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn handle_reminder_command(
    cmd: cli::ReminderCommands,
    state: &Arc<AppState>,
) -> anyhow::Result<()> {
    let job = reminder_job(state);
    match cmd {
        cli::ReminderCommands::Run => {
            let summary = job.tick(Utc::now()).await?;
            println!(
                "Reminder pass complete:\n  Created: {}\n  Skipped: {}\n  Failed:  {}",
                summary.created, summary.skipped, summary.failed
            );
        }
        cli::ReminderCommands::Next => {
            println!("Next reminder run: {}", job.schedule().next_fire_after(Utc::now()));
        }
    }
    Ok(())
}

async fn handle_user_command(cmd: cli::UserCommands, state: &Arc<AppState>) -> anyhow::Result<()> {
    match cmd {
        cli::UserCommands::Create {
            name,
            email,
            no_notifications,
        } => {
            let user = NewUser {
                name: name.clone(),
                email: email.clone(),
                preferences: Preferences {
                    notifications: !no_notifications,
                    ..Preferences::default()
                },
            };
            let id = state.users.create_user(&user).await?;
            println!(
                "User created:\n  Name:          {}\n  Email:         {}\n  Notifications: {}\n  ID:            {}",
                name, email, !no_notifications, id
            );
        }
    }
    Ok(())
}

async fn handle_notification_command(
    cmd: cli::NotificationCommands,
    state: &Arc<AppState>,
) -> anyhow::Result<()> {
    match cmd {
        cli::NotificationCommands::List { user_id, limit } => {
            let user_id = uuid::Uuid::parse_str(&user_id).context("Invalid user_id")?;
            let rows = state
                .notifications
                .list(user_id, Page::new(limit, None))
                .await?;
            if rows.is_empty() {
                println!("No notifications found.");
                return Ok(());
            }

            println!("{:<38} {:<10} {:<6} {:<20} MESSAGE", "ID", "TYPE", "READ", "DATE");
            for n in rows {
                println!(
                    "{:<38} {:<10} {:<6} {:<20} {}",
                    n.id,
                    n.r#type,
                    n.is_read,
                    n.date.format("%Y-%m-%d %H:%M"),
                    n.message
                );
            }
        }
    }
    Ok(())
}
