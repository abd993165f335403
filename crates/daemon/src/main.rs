// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! rfarmd: render dispatch controller.
//!
//! Partitions frames into pixel spans, farms them out to remote render
//! workers, and assembles the results into per-frame output files.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use anyhow::Context;
use clap::Parser;
use rfarm_adapters::{NoopFramebuffer, RshLauncher};
use rfarm_core::{DispatchConfig, SystemClock};
use rfarm_daemon::controller::Controller;
use rfarm_daemon::event::Event;
use rfarm_daemon::{listener, rcfile};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::info;

/// How often configured hosts are (re)started.
const LAUNCH_INTERVAL: Duration = Duration::from_secs(600);
/// Idle dispatch cadence: tardy checks and frame retirement.
const TICK_INTERVAL: Duration = Duration::from_secs(30);
/// Default listen port.
const DEFAULT_PORT: u16 = 4446;

/// Render dispatch controller.
#[derive(Debug, Parser)]
#[command(name = "rfarmd", version)]
struct Args {
    /// Listen port for worker connections.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Address launched workers dial back to.
    #[arg(long, default_value = "localhost")]
    advertise: String,

    /// Run without operator input and exit when the work drains.
    #[arg(short, long)]
    batch: bool,

    /// Append logs to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Default frame width in pixels.
    #[arg(short, long, default_value_t = 512)]
    width: u32,

    /// Default frame height in pixels.
    #[arg(short = 'n', long, default_value_t = 512)]
    height: u32,

    /// Remote shell used to start workers.
    #[arg(long, default_value = "rsh")]
    rsh: String,

    /// Model database to load at startup.
    db: Option<PathBuf>,

    /// Objects to render from the database.
    objects: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = setup_logging(args.log_file.as_deref())?;

    let config = DispatchConfig {
        width: args.width,
        height: args.height,
        ..DispatchConfig::default()
    };

    // Process-fatal: without the listen port there is nothing to do.
    let socket = TcpListener::bind(("0.0.0.0", args.port))
        .await
        .with_context(|| format!("cannot bind port {}", args.port))?;
    info!(port = args.port, "listening for workers");

    let connections = listener::new_connections();
    let (event_tx, mut events) = mpsc::channel::<Event>(256);
    tokio::spawn(listener::run_listener(
        socket,
        connections.clone(),
        event_tx.clone(),
    ));

    let mut controller = Controller::new(
        config,
        connections,
        Box::new(RshLauncher::new(args.rsh)),
        Box::new(NoopFramebuffer),
        SystemClock,
        args.advertise,
        args.port,
    );

    if let Some(db) = args.db {
        controller.dispatcher.load_model(db, args.objects);
    }

    if let Some(rc) = rcfile::find() {
        info!(path = %rc.display(), "reading startup commands");
        controller
            .run_command(&format!("read {}", rc.display()))
            .await;
    }

    if args.batch {
        controller.detach();
    } else {
        spawn_operator_input(event_tx);
    }

    let mut launch_timer = tokio::time::interval(LAUNCH_INTERVAL);
    let mut tick_timer = tokio::time::interval(TICK_INTERVAL);
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        tokio::select! {
            maybe = events.recv() => {
                match maybe {
                    Some(event) => controller.handle_event(event).await,
                    None => break,
                }
            }
            _ = launch_timer.tick() => controller.start_servers().await,
            _ = tick_timer.tick() => controller.tick().await,
            _ = sigterm.recv() => {
                info!("SIGTERM received");
                controller.handle_event(Event::OperatorEof).await;
            }
            _ = sigint.recv() => {
                info!("SIGINT received");
                controller.handle_event(Event::OperatorEof).await;
            }
        }
        if controller.shutdown_requested() {
            break;
        }
    }

    info!("controller stopped");
    Ok(())
}

/// Read operator lines from stdin, joining trailing-backslash
/// continuations, and feed them into the event channel.
fn spawn_operator_input(events: mpsc::Sender<Event>) {
    tokio::spawn(async move {
        let stdin = tokio::io::stdin();
        let mut lines = tokio::io::BufReader::new(stdin).lines();
        let mut pending = String::new();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(stripped) = line.strip_suffix('\\') {
                        pending.push_str(stripped);
                        continue;
                    }
                    pending.push_str(&line);
                    let full = std::mem::take(&mut pending);
                    if events.send(Event::Operator { line: full }).await.is_err() {
                        return;
                    }
                }
                Ok(None) => {
                    let _ = events.send(Event::OperatorEof).await;
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "operator input error");
                    let _ = events.send(Event::OperatorEof).await;
                    return;
                }
            }
        }
    });
}

fn setup_logging(
    log_file: Option<&Path>,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_file {
        Some(path) => {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let name = path.file_name().context("log file needs a file name")?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
            Ok(None)
        }
    }
}
