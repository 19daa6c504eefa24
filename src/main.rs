use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;

use datapulse::ai::{AiBridge, PanelOutcome};
use datapulse::api::{ApiClient, Chart, ChartKey, PromptType};
use datapulse::config::Config;
use datapulse::controllers::{SectionController, StatsController};
use datapulse::dashboard::Dashboard;
use datapulse::logging::{log, obj, v_str, Domain, Level};
use datapulse::page::PageHandle;
use datapulse::session::SessionContext;
use datapulse::upload::{UploadFlow, UploadOutcome};

const USAGE: &str = "usage:
  datapulse upload <file> <session-name>
  datapulse dashboard <session-id> [--summary]
  datapulse explain <session-id> <missing|stats|overview|chart:<key>>
  datapulse files
  datapulse key set <provider> <key>
  datapulse key check <provider>";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let client = ApiClient::http(&cfg.base_url)
        .with_context(|| format!("invalid DATAPULSE_BASE_URL {}", cfg.base_url))?;
    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[("base_url", v_str(&cfg.base_url)), ("provider", v_str(&cfg.provider))]),
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    let argv: Vec<&str> = args.iter().map(String::as_str).collect();
    match argv.as_slice() {
        ["upload", file, session_name] => upload(&client, file, session_name).await,
        ["dashboard", session_id, rest @ ..] => {
            dashboard(&client, &cfg, session_id, rest.contains(&"--summary")).await
        }
        ["explain", session_id, what] => explain(&client, &cfg, session_id, what).await,
        ["files"] => files(&client).await,
        ["key", "set", provider, key] => {
            let resp = client.save_key(provider, key).await?;
            println!("{}", resp.message);
            Ok(())
        }
        ["key", "check", provider] => {
            let exists = client.has_key(provider).await?;
            println!("{}: {}", provider, if exists { "stored" } else { "missing" });
            Ok(())
        }
        _ => bail!("{USAGE}"),
    }
}

async fn upload(client: &ApiClient, file: &str, session_name: &str) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file))?;
    let file_name = Path::new(file)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file);

    let flow = UploadFlow::new(client.clone(), PageHandle::upload());
    match flow.upload(file_name, bytes, session_name).await {
        UploadOutcome::Redirect { session_id, location } => {
            println!("session_id: {}", session_id);
            println!("results: {}", location);
            Ok(())
        }
        UploadOutcome::Failed(message) => bail!(message),
    }
}

async fn dashboard(client: &ApiClient, cfg: &Config, session_id: &str, summary: bool) -> Result<()> {
    let page = PageHandle::dashboard();
    let ctx = SessionContext::new();
    let dashboard = Dashboard::new(client.clone(), page.clone(), ctx.clone());

    let report = dashboard.start(session_id).await;
    if let Some(location) = report.redirect() {
        for alert in page.alerts() {
            eprintln!("{}", alert);
        }
        bail!("redirected to {}", location);
    }

    if summary {
        let ai = AiBridge::new(client.clone(), page.clone(), ctx)
            .with_api_key(cfg.api_key.clone())
            .with_provider(cfg.provider.clone());
        ai.generate_summary().await;
    }

    page.write_html(&cfg.out_file, &format!("Results: {}", session_id))
        .await
        .with_context(|| format!("failed to write {}", cfg.out_file))?;
    println!("overview: {}", report.overview.as_str());
    println!("stats: {}", report.stats.as_str());
    println!("visualizations: {}", report.visualizations.as_str());
    println!("written: {}", cfg.out_file);
    Ok(())
}

async fn explain(client: &ApiClient, cfg: &Config, session_id: &str, what: &str) -> Result<()> {
    let page = PageHandle::dashboard();
    let ctx = SessionContext::new();
    ctx.record_session(session_id);

    // Every context slice comes from the stats snapshot.
    let stats = StatsController::new(client.clone(), page.clone(), ctx.clone());
    stats.load(session_id).await;

    let ai = AiBridge::new(client.clone(), page.clone(), ctx)
        .with_api_key(cfg.api_key.clone())
        .with_provider(cfg.provider.clone());

    let (outcome, target) = match what.strip_prefix("chart:") {
        Some(key) => {
            let chart = Chart {
                key: ChartKey::parse(key),
                src: String::new(),
            };
            (ai.explain_chart(&chart).await, chart.key.panel_id())
        }
        None => {
            let prompt = PromptType::parse(what).ok_or_else(|| anyhow!("{USAGE}"))?;
            let target = match prompt {
                PromptType::Missing => datapulse::page::AI_MISSING,
                PromptType::Stats => datapulse::page::AI_STATS,
                _ => datapulse::page::AI_CONTENT,
            };
            (ai.explain_section(prompt).await, target.to_string())
        }
    };

    match outcome {
        PanelOutcome::Failed(message) => bail!(message),
        _ => {
            println!("{}", page.html(&target).unwrap_or_default());
            Ok(())
        }
    }
}

async fn files(client: &ApiClient) -> Result<()> {
    for f in client.list_files().await? {
        println!("{}\t{}\t{}\t{}", f.session_id, f.name, f.filename, f.date);
    }
    Ok(())
}
