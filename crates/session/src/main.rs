//! Operator CLI: inspect or change the locally persisted portal session.

mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use assist_auth::Credentials;
use assist_notify::{InMemoryNotificationChannel, NotificationChannel, Notifier};
use assist_session::{
    ClientFactory, HttpCredentialService, NoopNavigator, SessionConfig, SessionEngine,
    SessionParts, SessionSnapshot,
};
use assist_store::FileStore;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    assist_observability::init();

    let config = SessionConfig::from_env().context("invalid ASSIST_* configuration")?;

    let store = match &config.store_path {
        Some(path) => FileStore::new(path.clone()),
        None => FileStore::open_default().context("failed to resolve session store path")?,
    };
    tracing::info!(path = ?store.path(), "using session store");

    let clients = ClientFactory::from_config(&config).context("failed to build HTTP client")?;
    let service = HttpCredentialService::new(clients.http().clone(), &config);

    let channel = Arc::new(InMemoryNotificationChannel::new());
    let toasts = channel.subscribe();

    let engine = SessionEngine::new(
        config,
        SessionParts {
            service: Arc::new(service),
            store: Arc::new(store),
            notifier: Notifier::new(channel),
            navigator: Arc::new(NoopNavigator),
            clients,
        },
    );

    match cli.into_command() {
        Command::Status => engine.initialize().await,
        Command::Login { email, password } => {
            engine.login(Credentials::email_password(email, password)).await;
        }
        Command::Logout => engine.logout(),
    }

    for toast in toasts.drain() {
        eprintln!("[{}] {}", toast.severity, toast.message);
    }
    print_snapshot(&engine.snapshot());
    Ok(())
}

fn print_snapshot(snapshot: &SessionSnapshot) {
    match &snapshot.user {
        Some(user) => {
            println!("user:  {} <{}>", user.display_name(), user.email);
            println!("role:  {}", snapshot.role_label());
            println!("phase: {:?}", snapshot.phase);
            println!("web:   {}", join(snapshot.access.web.iter()));
            println!("lms:   {}", join(snapshot.access.lms.iter()));
        }
        None => println!("logged out"),
    }
}

fn join<T: ToString>(items: impl Iterator<Item = T>) -> String {
    let items: Vec<String> = items.map(|i| i.to_string()).collect();
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}
