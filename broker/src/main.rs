// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use credential_broker::application::Application;
use credential_broker::configuration::BrokerOptions;
use credential_broker::lifecycle::LifecycleMonitor;
use credential_broker::settings::Settings;
use credential_broker::tokens::TokenStore;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let started_at = Instant::now();
    println!("[broker] init");

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        // this needs to be set to remove duplicated information in the log.
        .with_current_span(false)
        // this needs to be set to false, otherwise ANSI color codes will
        // show up in a confusing manner in container logs.
        .with_ansi(false)
        // disabling time is handy because the log collector adds the ingestion time.
        .without_time()
        // remove the name of the function from every log entry
        .with_target(false)
        .init();

    // get configuration options from the command line and environment variables
    let options = BrokerOptions::parse();

    tracing::info!("[broker] {:?}", &options);

    let settings = Settings::load(
        &options.config_file,
        &options.secrets_file,
        options.secret_key.as_deref(),
    )
    .context("failed to load settings")?;

    let tokens = Arc::new(TokenStore::new(&options.token_dir));
    if options.skip_token_generation {
        tracing::warn!("[broker] skipping token generation");
        tokens
            .reuse_existing()
            .context("--skip-token-generation needs token files left by a previous run")?;
    } else {
        tokens
            .generate_all()
            .with_context(|| format!("failed to generate tokens in {}", tokens.dir().display()))?;
    }

    let (_stop_tx, stop_rx) = watch::channel(false);
    let monitor = LifecycleMonitor::starting_at(
        tokens.clone(),
        started_at,
        options.ttl(),
        options.poll_interval(),
    );
    let monitor = tokio::spawn(monitor.run(stop_rx));

    let application = Application::build(
        &options.bind_host(&settings.server),
        options.bind_port(&settings.server),
        tokens,
        settings.database_password.clone(),
    )
    .await?;

    tokio::select! {
        result = application.run_until_stopped() => {
            result.context("server error")
        }
        reason = monitor => {
            let code = match reason {
                Ok(Some(reason)) => {
                    tracing::info!("[broker] exiting: {}", reason);
                    0
                }
                Ok(None) => {
                    tracing::warn!("[broker] lifecycle monitor stopped");
                    0
                }
                Err(err) => {
                    tracing::error!("[broker] lifecycle monitor failed: {:?}", err);
                    1
                }
            };
            // in-flight requests are dropped without draining
            std::process::exit(code);
        }
    }
}
