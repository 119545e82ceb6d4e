use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

mod archive;
mod collector;
mod config;
mod exposition;
mod handlers;
mod routes;
mod scheduler;
mod snmp;

use archive::ArchiveWriter;
use collector::{CollectorOptions, SwitchCollector};
use config::{AppConfig, Settings};
use handlers::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("disco=info".parse()?))
        .init();

    let config = AppConfig::load(Settings::parse())?;
    config.debug_config();
    let settings = &config.settings;

    let client = snmp::create_v2c_client(
        &settings.target,
        settings.community.as_bytes(),
        settings.snmp_timeout(),
        settings.connection.retries,
    )
    .await?;

    let collector = Arc::new(
        SwitchCollector::new(
            Arc::new(client),
            &config.metrics,
            CollectorOptions::from_config(&config),
            ArchiveWriter::new(&settings.datadir),
        )
        .await
        .context("Не удалось подготовить коллектор")?,
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    let stop_tx = Arc::new(stop_tx);

    let collect_task = tokio::spawn(scheduler::run_collect_loop(
        Arc::clone(&collector),
        settings.collect_period(),
        stop_rx.clone(),
        Arc::clone(&stop_tx),
    ));
    let flush_task = tokio::spawn(scheduler::run_flush_loop(
        Arc::clone(&collector),
        settings.write_period(),
        stop_rx.clone(),
    ));

    let listener = TcpListener::bind(&settings.listen_address)
        .await
        .context(format!("Не удалось занять адрес {}", settings.listen_address))?;
    tracing::info!(address = %settings.listen_address, "Слушаем /metrics");

    let router = routes::create_router(AppState {
        collector: Arc::clone(&collector),
    });
    let mut server_stop = stop_rx.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = server_stop.wait_for(|stop| *stop).await;
            })
            .await
    });

    let mut stopped = stop_rx.clone();
    tokio::select! {
        _ = shutdown_signal() => tracing::info!("Получен сигнал остановки"),
        _ = stopped.wait_for(|stop| *stop) => {}
    }
    stop_tx.send_replace(true);

    server.await?.context("HTTP сервер завершился с ошибкой")?;
    flush_task.await?;
    collect_task.await??;

    tracing::info!("Остановлено");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Не удалось подписаться на Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Не удалось подписаться на SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
