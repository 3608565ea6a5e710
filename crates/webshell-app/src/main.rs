// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Webshell — native shell hosting a remote web page with device capabilities
//
// Entry point. Initialises logging and backend services, then drives one
// bridge session over stdin/stdout.

mod console;
mod services;

use std::sync::{Arc, Mutex};

use tokio::io::BufReader;

use webshell_host::store::lock_store;

use console::ConsoleOutput;
use services::app_services::AppServices;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Webshell starting");

    let bridge = webshell_bridge::platform_bridge();
    let services = match AppServices::init(bridge.clone()) {
        Ok(services) => services,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialise app services; using in-memory store");
            match AppServices::fallback(bridge) {
                Ok(services) => services,
                Err(e) => {
                    tracing::error!(error = %e, "in-memory store unavailable");
                    std::process::exit(1);
                }
            }
        }
    };

    let store = services.store().clone();
    match tokio::task::spawn_blocking(move || lock_store(&store).device_id()).await {
        Ok(Ok(device_id)) => tracing::info!(
            %device_id,
            data_dir = %services.data_dir().display(),
            "install ready"
        ),
        Ok(Err(e)) => tracing::warn!(error = %e, "install id unavailable"),
        Err(e) => tracing::warn!(error = %e, "install id lookup aborted"),
    }

    let output: ConsoleOutput = Arc::new(Mutex::new(Box::new(std::io::stdout())));
    let input = BufReader::new(tokio::io::stdin());
    if let Err(e) = console::run(&services, input, Arc::clone(&output)).await {
        tracing::error!(error = %e, "session ended with an error");
        console::report_failure(&output, &e);
        std::process::exit(1);
    }
}
