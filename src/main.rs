// Re-export SDK modules so binary-internal modules can use crate::api:: and crate::error::
pub(crate) use bcq::{api, error};

mod config;
mod picker;

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bcq::cache::complete::{people_candidates, project_candidates};
use bcq::cache::refresh::Refresher;
use bcq::cache::Store;
use bcq::refs::{self, Reference};
use bcq::resolve::dock::resolve_dock_tool;
use bcq::resolve::{Resolved, Resolver};
use bcq::{nav, BasecampClient};

use config::AppConfig;
use error::{BcqError, ErrorReport, Result};
use picker::TerminalPrompter;

const USAGE: &str = "Usage:
  bcq url <url>                     Parse a URL or ID into its parts
  bcq open <url>                    Show the view a URL opens in the terminal client
  bcq resolve project <name|id>     Resolve a project name to its ID
  bcq resolve person <name|email|id|me>
  bcq dock <project> <tool> [id]    Resolve a dock tool (chat, todoset, ...) to its ID
  bcq completion projects [prefix]   Complete project IDs from the cache
  bcq completion people [prefix]    Complete person IDs from the cache
  bcq completion refresh            Refresh cached projects and people
  bcq completion status             Show completion cache status
  bcq completion clear              Delete the completion cache
  bcq accounts                      Refresh and list accounts";

#[derive(Serialize)]
struct Output<'a, T: Serialize> {
    ok: bool,
    data: &'a T,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

fn print_ok<T: Serialize>(data: &T, summary: impl Into<Option<String>>) {
    print_json(&Output {
        ok: true,
        data,
        summary: summary.into(),
    });
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("BCQ_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn config_path() -> PathBuf {
    AppConfig::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.toml")
}

fn load_config() -> Result<AppConfig> {
    let path = config_path();
    if !path.exists() {
        match AppConfig::write_default(&path) {
            Ok(()) => info!(path = %path.display(), "created default config"),
            Err(e) => warn!(error = %e, path = %path.display(), "could not write default config"),
        }
    }
    AppConfig::load_from_path(&path)
}

fn client(config: &AppConfig) -> Result<Arc<BasecampClient>> {
    config.validate()?;
    Ok(Arc::new(BasecampClient::with_urls(
        &config.account.base_url,
        &config.account.launchpad_url,
        &config.account.id,
        &config.account.access_token,
    )))
}

/// Cancels the returned token on Ctrl-C.
fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });
    cancel
}

#[tokio::main]
async fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let code = match run(&args).await {
        Ok(()) => 0,
        Err(e) => {
            print_json(&ErrorReport::from(&e));
            e.exit_code()
        }
    };
    std::process::exit(code);
}

async fn run(args: &[String]) -> Result<()> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        [] | ["help"] | ["--help"] | ["-h"] => {
            println!("{}", USAGE);
            Ok(())
        }
        ["url", input] => cmd_url(input),
        ["open", input] => cmd_open(input),
        ["completion", "status"] => cmd_status(&load_config()?),
        ["completion", "clear"] => {
            let store = Store::from_env();
            store.clear()?;
            print_ok(&json!({ "path": store.path() }), "Completion cache cleared".to_string());
            Ok(())
        }
        ["completion", "refresh"] => cmd_refresh(&load_config()?).await,
        ["completion", "projects"] => cmd_complete(Kind::Project, ""),
        ["completion", "projects", prefix] => cmd_complete(Kind::Project, prefix),
        ["completion", "people"] => cmd_complete(Kind::Person, ""),
        ["completion", "people", prefix] => cmd_complete(Kind::Person, prefix),
        ["accounts"] => cmd_accounts(&load_config()?).await,
        ["resolve", "project", token] => cmd_resolve(&load_config()?, Kind::Project, token).await,
        ["resolve", "person", token] => cmd_resolve(&load_config()?, Kind::Person, token).await,
        ["dock", project, tool] => cmd_dock(&load_config()?, project, tool, None).await,
        ["dock", project, tool, id] => cmd_dock(&load_config()?, project, tool, Some(*id)).await,
        _ => Err(BcqError::Usage(format!(
            "Unknown command: bcq {}\n\n{}",
            args.join(" "),
            USAGE
        ))),
    }
}

fn cmd_url(input: &str) -> Result<()> {
    match refs::parse(input)? {
        Reference::Id(id) => print_ok(&json!({ "id": id }), format!("ID {}", id)),
        Reference::Url(reference) => {
            let summary = reference.summary();
            print_ok(&reference, summary);
        }
    }
    Ok(())
}

fn cmd_open(input: &str) -> Result<()> {
    let (view, scope) = nav::resolve(input)?;
    let data = json!({
        "view": view,
        "global": view.is_global(),
        "scope": scope,
    });
    print_ok(&data, format!("Open {} view", view.as_str()));
    Ok(())
}

fn cmd_status(config: &AppConfig) -> Result<()> {
    let status = Store::from_env().status(config.cache.max_age())?;
    let summary = format!(
        "{} projects, {} people, {} accounts{}",
        status.projects,
        status.people,
        status.accounts,
        if status.stale { " (stale)" } else { "" }
    );
    print_ok(&status, summary);
    Ok(())
}

async fn cmd_refresh(config: &AppConfig) -> Result<()> {
    let client = client(config)?;
    let store = Arc::new(Store::from_env());
    let refresher =
        Refresher::new(store.clone(), client).with_timeout(config.cache.refresh_timeout());

    let result = refresher.refresh_all(&cancel_on_interrupt()).await;
    if let Some(e) = result.error() {
        return Err(e);
    }

    let report = result.report(&store.load()?, &store);
    let summary = report.summary.clone();
    print_ok(&report, summary);
    Ok(())
}

async fn cmd_accounts(config: &AppConfig) -> Result<()> {
    let client = client(config)?;
    let store = Arc::new(Store::from_env());
    let refresher =
        Refresher::new(store.clone(), client).with_timeout(config.cache.refresh_timeout());

    let count = refresher.refresh_accounts(&cancel_on_interrupt()).await?;
    let accounts = store.load()?.accounts;
    print_ok(&accounts, format!("{} accounts", count));
    Ok(())
}

#[derive(Clone, Copy)]
enum Kind {
    Project,
    Person,
}

/// Cache-only, so it stays fast enough for shell completion and needs no
/// config or credentials.
fn cmd_complete(kind: Kind, prefix: &str) -> Result<()> {
    let cache = Store::from_env().load()?;
    let candidates = match kind {
        Kind::Project => project_candidates(&cache, prefix),
        Kind::Person => people_candidates(&cache, prefix),
    };
    print_ok(&candidates, format!("{} candidates", candidates.len()));
    Ok(())
}

async fn cmd_resolve(config: &AppConfig, kind: Kind, token: &str) -> Result<()> {
    let client = client(config)?;
    let store = Arc::new(Store::from_env());

    // Warm a stale cache alongside the lookup; the resolver itself never waits on it.
    let refresher =
        Refresher::new(store.clone(), client.clone()).with_timeout(config.cache.refresh_timeout());
    let warming = refresher.refresh_if_stale(config.cache.max_age());

    let resolver = Resolver::new(&store, &*client)
        .with_prompter(&TerminalPrompter)
        .with_current_user(config.user_id());
    let resolved = match kind {
        Kind::Project => resolver.resolve_project(token).await,
        Kind::Person => resolver.resolve_person(token).await,
    };

    if let Some(handle) = warming {
        if let Err(e) = handle.await {
            warn!(error = %e, "background completion refresh did not finish");
        }
    }

    let resolved = resolved?;
    let summary = describe(&resolved);
    print_ok(&resolved, summary);
    Ok(())
}

fn describe(resolved: &Resolved) -> String {
    if resolved.name.is_empty() {
        format!("ID {}", resolved.id)
    } else {
        format!("{} (ID: {})", resolved.name, resolved.id)
    }
}

async fn cmd_dock(
    config: &AppConfig,
    project: &str,
    tool: &str,
    explicit_id: Option<&str>,
) -> Result<()> {
    let client = client(config)?;
    let store = Store::from_env();

    let project_id = refs::extract_project_id(project);
    let project = Resolver::new(&store, &*client)
        .with_prompter(&TerminalPrompter)
        .resolve_project(&project_id)
        .await?;

    let id = resolve_dock_tool(&*client, &project.id, tool, explicit_id).await?;
    let data = json!({
        "project_id": project.id,
        "tool": tool,
        "id": id,
    });
    print_ok(&data, format!("{} {} in project {}", tool, id, project.id));
    Ok(())
}
