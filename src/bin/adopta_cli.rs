//!
//! adopta CLI binary
//! ------------------
//! Drives the client session core from a terminal: log in against the marketplace API,
//! inspect the persisted session, and check which screens the current user may open.

use std::env;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use adopta::config::ClientConfig;
use adopta::identity::{Guard, GuardDecision, InitOutcome, Screen};
use adopta::Client;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--config <file>] <command>\n\nCommands:\n  login <email> <password>   authenticate and persist the session\n  logout                     clear the persisted session\n  whoami                     print the current user\n  status                     print session and unread-notification state\n  guard <screen>             evaluate the route guard for a screen\n                             (listings | profile | adoption | foundation | admin)\n\nEnvironment:\n  ADOPTA_API_URL, ADOPTA_STORAGE_DIR, ADOPTA_NOTIFY_INTERVAL_SECS,\n  ADOPTA_TRUST_CACHED_SESSION, ADOPTA_SIGN_IN_ROUTE, ADOPTA_HOME_ROUTE, RUST_LOG"
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("invalid RUST_LOG filter")?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.first().cloned().unwrap_or_else(|| "adopta_cli".to_string());
    if !args.is_empty() { args.remove(0); }

    let config = if args.first().map(|a| a == "--config").unwrap_or(false) {
        let path = args.get(1).cloned().ok_or_else(|| anyhow!("--config needs a file"))?;
        args.drain(0..2);
        ClientConfig::load(&path)?
    } else {
        ClientConfig::from_env()?
    };
    let Some(command) = args.first().cloned() else {
        print_usage(&program);
        return Ok(());
    };
    if command == "-h" || command == "--help" {
        print_usage(&program);
        return Ok(());
    }

    info!(
        target: "adopta",
        "adopta starting: api='{}', storage_dir='{}', trust_cached_session={}",
        config.api_base_url, config.storage_dir.display(), config.trust_cached_session
    );
    let client = Client::open(config)?;

    let outcome = client.session.initialize().await;
    if outcome == InitOutcome::Rejected {
        eprintln!("stored session was rejected by the server; please log in again");
    }

    match command.as_str() {
        "login" => {
            let email = args.get(1).ok_or_else(|| anyhow!("login needs <email> <password>"))?;
            let password = args.get(2).ok_or_else(|| anyhow!("login needs <email> <password>"))?;
            let resp = client.auth.login(email, password).await?;
            let session = client.session.login(resp);
            if let Some(u) = session.user() {
                println!("logged in as {} <{}> roles={}", u.nombre, u.email, join_roles(u));
            }
        }
        "logout" => {
            client.session.logout();
            println!("logged out");
        }
        "whoami" => match client.session.session().user() {
            Some(u) => println!("{} <{}> id={} roles={}", u.nombre, u.email, u.id, join_roles(u)),
            None => println!("not logged in"),
        },
        "status" => {
            let s = client.session.session();
            println!("initialized: {}", s.is_initialized());
            println!("logged_in: {}", s.is_logged_in());
            println!("admin: {}", client.session.is_admin());
            if s.is_logged_in() && client.session.is_polling() {
                // first poll fires immediately; give it a moment to land
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            match client.session.unread_count() {
                Some(u) => println!("unread_notifications: {} (at {})", u.count, u.refreshed_at.to_rfc3339()),
                None => println!("unread_notifications: -"),
            }
        }
        "guard" => {
            let name = args.get(1).ok_or_else(|| anyhow!("guard needs a screen name"))?;
            let screen = Screen::parse(name).ok_or_else(|| anyhow!("unknown screen '{}'", name))?;
            let mut watch = client.session.guard_watch(Guard::for_screen(screen));
            match watch.settled().await {
                Some(GuardDecision::Render) => println!("render"),
                Some(GuardDecision::Redirect { to, reason }) => println!("redirect {} ({:?})", to, reason),
                Some(GuardDecision::Loading) | None => println!("loading"),
            }
        }
        other => {
            print_usage(&program);
            return Err(anyhow!("unknown command '{}'", other));
        }
    }

    client.session.dispose();
    Ok(())
}

fn join_roles(u: &adopta::identity::UserIdentity) -> String {
    u.roles.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(",")
}
