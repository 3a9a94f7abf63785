use std::{process::ExitCode, sync::Arc};

use anyhow::Context;
use chrono::Utc;

use ntb_core::{
    config::Config,
    formatting::ResponseFormatter,
    handlers::{self, Services},
    lifecycle::{shutdown_signal, Exit, LifecycleManager, StopPolicy},
    lookup::{LookupClient, NumberLookup, RetryPolicy},
    messaging::port::{MessagingPort, PollingOptions, UpdateTransport},
    ports::UserStore,
    router::LoggingErrorSink,
    security::InMemoryRateLimiter,
    store::{DirectBroadcaster, InMemoryUserStore},
};
use ntb_telegram::{bot_from_config, TelegramMessenger, TelegramTransport};

fn build_services(
    cfg: Arc<Config>,
    messenger: Arc<dyn MessagingPort>,
) -> anyhow::Result<Arc<Services>> {
    let lookup: Arc<dyn NumberLookup> =
        Arc::new(LookupClient::from_config(&cfg).context("building lookup client")?);
    let vehicle_lookup = LookupClient::vehicle_from_config(&cfg)
        .context("building vehicle lookup client")?
        .map(|c| Arc::new(c) as Arc<dyn NumberLookup>);

    let users: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new(cfg.admin_id));
    let limits = Arc::new(InMemoryRateLimiter::new(
        cfg.rate_limit_requests,
        cfg.rate_limit_window,
    ));
    let broadcaster = Arc::new(DirectBroadcaster::new(users.clone(), messenger.clone()));

    Ok(Arc::new(Services {
        retry: RetryPolicy::from_config(&cfg),
        formatter: ResponseFormatter::new(cfg.attribution.clone()),
        messenger,
        lookup,
        vehicle_lookup,
        users,
        limits,
        broadcaster,
        started_at: Utc::now(),
        cfg,
    }))
}

#[tokio::main]
async fn main() -> ExitCode {
    let mut lifecycle = LifecycleManager::new(StopPolicy::default());

    let cfg = match lifecycle.configure(Config::load) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(Exit::Failed.code());
        }
    };

    if let Err(e) = ntb_core::logging::init("ntb", &cfg) {
        eprintln!("failed to initialise logging: {e}");
        return ExitCode::from(lifecycle.fail_setup(&e).code());
    }

    let wired = bot_from_config(&cfg)
        .context("building telegram client")
        .and_then(|bot| {
            let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
            let svc = build_services(cfg.clone(), messenger)?;
            Ok((Arc::new(TelegramTransport::new(bot)), svc))
        });
    let (transport, svc) = match wired {
        Ok(parts) => parts,
        Err(e) => return ExitCode::from(lifecycle.fail_setup(&format!("{e:#}")).code()),
    };

    // A failed deleteWebhook is logged and tolerated; an error here is a lifecycle fault.
    if let Err(e) = lifecycle.clear_webhook(transport.as_ref()).await {
        return ExitCode::from(lifecycle.fail_setup(&e).code());
    }
    transport.announce().await;

    let router = match lifecycle.register_handlers(Arc::new(LoggingErrorSink), |table| {
        handlers::register_all(table, svc)
    }) {
        Ok(router) => router,
        // Registration errors already left the lifecycle stopped.
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            return ExitCode::from(Exit::Failed.code());
        }
    };

    let transport: Arc<dyn UpdateTransport> = transport;
    let exit = lifecycle
        .poll_until_shutdown(transport, router, PollingOptions::default(), shutdown_signal())
        .await;
    ExitCode::from(exit.code())
}
