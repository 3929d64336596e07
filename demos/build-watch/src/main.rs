//! Build watch demo
//!
//! Submits one wrapper build to a running gateway and follows it until the
//! provider reports a terminal status.
//!
//! Usage: build-watch [GATEWAY_URL] [WEBSITE_URL] [APP_NAME] [PACKAGE] [apk|aab]

use anyhow::{Context, Result};
use appbuild::{BuildRequest, BuildType};
use buildclient::{poll_until_terminal, ClientError, GatewayClient, PollConfig, PollOutcome};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let gateway = args.next().unwrap_or_else(|| "http://127.0.0.1:8080".to_string());
    let website = args.next().unwrap_or_else(|| "https://example.com".to_string());
    let app_name = args.next().unwrap_or_else(|| "Example".to_string());
    let package = args.next().unwrap_or_else(|| "com.example.app".to_string());
    let build_type: BuildType = args
        .next()
        .unwrap_or_else(|| "apk".to_string())
        .parse()
        .context("build type must be apk or aab")?;

    println!("╔════════════════════════════════════════════════╗");
    println!("║  Mobixy - Build Watch                          ║");
    println!("╚════════════════════════════════════════════════╝\n");

    let client = GatewayClient::new(gateway);

    println!("📦 Step 1: Submit build");
    println!("   ───────────────────");
    let req = BuildRequest::new(&website, &app_name, &package, build_type);
    let started = match client.start_build(&req).await {
        Ok(started) => started,
        Err(ClientError::Validation(errors)) => {
            for e in &errors {
                println!("   ✗ {e}");
            }
            anyhow::bail!("build request rejected");
        }
        Err(e) => return Err(e).context("submit failed"),
    };
    println!("   Gateway: {}", client.base_url());
    println!("   Build ID: {}", started.build_id);
    println!("   Provider job: {}", started.provider_job_id);
    println!("   Status: {}\n", started.status);

    println!("⏳ Step 2: Follow status (ctrl-c to stop)");
    println!("   ─────────────────────────────────────");
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let mut seen_logs = 0;
    let config = PollConfig::default();
    let outcome = poll_until_terminal(&client, &started.build_id, &config, &cancel, |view| {
        for log in view.logs.iter().skip(seen_logs) {
            println!("   [{}] {}", log.timestamp.format("%H:%M:%S"), log.message);
        }
        seen_logs = view.logs.len();
        if let Some(reason) = &view.unavailable_reason {
            println!("   ⚠️  status unavailable: {reason}");
        }
    })
    .await?;
    println!();

    match outcome {
        PollOutcome::Terminal(view) => {
            println!("✓ Build {} in {}", view.status, view.duration.as_deref().unwrap_or("?"));
            if let Some(url) = view.download_url {
                println!("   Download: {url}");
            }
            if let Some(url) = view.provider_detail_url {
                println!("   Details: {url}");
            }
        }
        PollOutcome::Exhausted { last } => {
            let status = last.map(|v| v.status.to_string()).unwrap_or_else(|| "unknown".into());
            println!("✗ Gave up waiting; last status: {status}");
        }
        PollOutcome::Cancelled { .. } => println!("Stopped."),
    }

    Ok(())
}
