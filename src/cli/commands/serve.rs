//! `prlink serve`: run the webhook receiver and the event dispatcher.

use anyhow::{anyhow, Result};
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

use crate::adapters::http::{WebhookHttpConfig, WebhookHttpServer};
use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::services::{DispatcherConfig, EventDispatcher, LabelReactor};

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Host to bind (overrides server.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides server.port)
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[derive(Debug, Serialize)]
pub struct ServeOutput {
    pub address: String,
    pub events_processed: u64,
}

impl CommandOutput for ServeOutput {
    fn to_human(&self) -> String {
        format!(
            "Webhook receiver on {} stopped after {} event(s).",
            self.address, self.events_processed
        )
    }
}

pub async fn execute(args: ServeArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::build(config).await?;

    let mut http_config = WebhookHttpConfig::from(&config.server);
    if let Some(host) = args.host {
        http_config.host = host;
    }
    if let Some(port) = args.port {
        http_config.port = port;
    }
    let address = format!("{}:{}", http_config.host, http_config.port);

    let dispatcher = EventDispatcher::new(ctx.event_bus.clone(), DispatcherConfig::default());
    dispatcher
        .register(Arc::new(LabelReactor::new(
            ctx.records.clone(),
            config.label_rules.clone(),
            &config.event_prefix,
        )))
        .await;
    let dispatch_handle = dispatcher.start();

    tracing::info!(
        address = %address,
        namespace = %config.namespace,
        rules = config.label_rules.len(),
        "Starting webhook receiver"
    );

    let server = WebhookHttpServer::new(ctx.orchestrator.clone(), ctx.event_bus.clone(), http_config);
    let served = server
        .serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for ctrl-c: {}", e);
            }
            tracing::info!("Shutdown signal received");
        })
        .await;

    dispatcher.stop();
    if let Err(e) = dispatch_handle.await {
        tracing::warn!("Event dispatcher task ended abnormally: {}", e);
    }
    served.map_err(|e| anyhow!("Webhook server failed: {e}"))?;

    output(
        &ServeOutput {
            address,
            events_processed: dispatcher.events_processed(),
        },
        json_mode,
    );
    Ok(())
}
