// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-oriented operator command interpreter.
//!
//! One command per line, argument counts enforced. Reports go to stdout;
//! diagnostics go to the log.

use crate::controller::Controller;
use rfarm_core::{ActivationPolicy, Clock, Host, HostName, Provisioning};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Interpreter errors surfaced to the operator log.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("cannot read {path}: {source}")]
    Script {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("bad number: {0}")]
    BadNumber(String),

    #[error("{0}")]
    Invalid(String),
}

fn number(text: &str) -> Result<u32, CommandError> {
    text.parse()
        .map_err(|_| CommandError::BadNumber(text.to_string()))
}

/// Execute one operator command line.
pub async fn execute<C: Clock>(
    controller: &mut Controller<C>,
    line: &str,
) -> Result<(), CommandError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(());
    }
    let parts: Vec<&str> = line.split_whitespace().collect();
    let (cmd, args) = (parts[0], &parts[1..]);
    match cmd {
        "load" => {
            let [db, objects @ ..] = args else {
                return Err(CommandError::Usage("load <file> <object>..."));
            };
            if objects.is_empty() {
                return Err(CommandError::Usage("load <file> <object>..."));
            }
            controller.dispatcher.load_model(
                PathBuf::from(db),
                objects.iter().map(|o| o.to_string()).collect(),
            );
            Ok(())
        }
        "read" => {
            let [path] = args else {
                return Err(CommandError::Usage("read <file>"));
            };
            read_script(controller, Path::new(path)).await
        }
        "file" => {
            let [base] = args else {
                return Err(CommandError::Usage("file <basename>"));
            };
            controller.dispatcher.set_base_name(base.to_string());
            Ok(())
        }
        "mat" => {
            let (path, frame) = match args {
                [path] => (path, 0),
                [path, frame] => (path, number(frame)?),
                _ => return Err(CommandError::Usage("mat <file> [frame]")),
            };
            let script = read_to_string(Path::new(path))?;
            controller.dispatcher.add_frame(frame, script);
            Ok(())
        }
        "movie" => {
            let [path, start, end] = args else {
                return Err(CommandError::Usage("movie <file> <start> <end>"));
            };
            let (start, end) = (number(start)?, number(end)?);
            if start > end {
                return Err(CommandError::Invalid(format!(
                    "movie start {start} after end {end}"
                )));
            }
            let script = read_to_string(Path::new(path))?;
            for frame in start..=end {
                controller
                    .dispatcher
                    .add_frame(frame, format!("{script}\nframe {frame};"));
            }
            Ok(())
        }
        "add" => {
            if args.is_empty() {
                return Err(CommandError::Usage("add <host>..."));
            }
            for name in args {
                let name = HostName::new(*name);
                if controller.dispatcher.hosts().get(&name).is_none() {
                    controller.dispatcher.hosts_mut().set(Host {
                        name: name.clone(),
                        policy: ActivationPolicy::Always,
                        provisioning: Provisioning::ConvertDb,
                        remote_dir: PathBuf::from("/tmp"),
                    });
                }
                info!(host = %name, "host added");
            }
            controller.start_servers().await;
            Ok(())
        }
        "drop" => {
            let [name] = args else {
                return Err(CommandError::Usage("drop <host>"));
            };
            let effects = controller.dispatcher.drop_host(&HostName::new(*name));
            controller.apply(effects).await;
            Ok(())
        }
        "restart" => {
            let effects = match args {
                [] => controller.dispatcher.restart_all(),
                [name] => controller.dispatcher.restart_host(&HostName::new(*name)),
                _ => return Err(CommandError::Usage("restart [host]")),
            };
            controller.apply(effects).await;
            Ok(())
        }
        "go" => {
            expect_no_args(args, "go")?;
            controller.dispatcher.go();
            Ok(())
        }
        "stop" => {
            expect_no_args(args, "stop")?;
            controller.dispatcher.stop();
            Ok(())
        }
        "reset" => {
            expect_no_args(args, "reset")?;
            controller.dispatcher.reset();
            Ok(())
        }
        "frames" => {
            expect_no_args(args, "frames")?;
            println!("{}", controller.dispatcher.frame_report());
            Ok(())
        }
        "stat" => {
            expect_no_args(args, "stat")?;
            println!("{}", controller.dispatcher.worker_report());
            Ok(())
        }
        "host" => match args {
            [] => {
                println!("{}", controller.dispatcher.host_report());
                Ok(())
            }
            [name, policy, provisioning, path] => {
                let policy = match *policy {
                    "always" => ActivationPolicy::Always,
                    "night" => ActivationPolicy::OffPeak,
                    "passive" => ActivationPolicy::Passive,
                    other => {
                        return Err(CommandError::Invalid(format!("unknown policy: {other}")))
                    }
                };
                let provisioning = match *provisioning {
                    "cd" => Provisioning::CdOnly,
                    "convert" => Provisioning::ConvertDb,
                    other => {
                        return Err(CommandError::Invalid(format!(
                            "unknown provisioning: {other}"
                        )))
                    }
                };
                controller.dispatcher.hosts_mut().set(Host {
                    name: HostName::new(*name),
                    policy,
                    provisioning,
                    remote_dir: PathBuf::from(path),
                });
                Ok(())
            }
            _ => Err(CommandError::Usage(
                "host [<name> always|night|passive cd|convert <path>]",
            )),
        },
        "opt" => {
            if args.is_empty() {
                return Err(CommandError::Usage("opt <suboption>..."));
            }
            let effects = controller.dispatcher.broadcast_options(args.join(" "));
            controller.apply(effects).await;
            Ok(())
        }
        "detach" => {
            expect_no_args(args, "detach")?;
            controller.detach();
            Ok(())
        }
        "wait" => {
            expect_no_args(args, "wait")?;
            controller.begin_wait();
            Ok(())
        }
        "attach" => {
            // Optional device name; the sink is wired at startup.
            if args.len() > 1 {
                return Err(CommandError::Usage("attach [fb]"));
            }
            controller.dispatcher.set_fb_attached(true);
            Ok(())
        }
        "release" => {
            expect_no_args(args, "release")?;
            controller.dispatcher.set_fb_attached(false);
            Ok(())
        }
        "clear" => {
            expect_no_args(args, "clear")?;
            if let Err(e) = controller.fb.clear().await {
                return Err(CommandError::Invalid(e.to_string()));
            }
            Ok(())
        }
        "print" => match args {
            [] => {
                println!(
                    "worker logging is {}",
                    if controller.dispatcher.worker_logging() {
                        "on"
                    } else {
                        "off"
                    }
                );
                Ok(())
            }
            [value] => {
                let on = match *value {
                    "0" => false,
                    "1" => true,
                    other => return Err(CommandError::BadNumber(other.to_string())),
                };
                let effects = controller.dispatcher.set_worker_logging(on);
                controller.apply(effects).await;
                Ok(())
            }
            _ => Err(CommandError::Usage("print [0|1]")),
        },
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn expect_no_args(args: &[&str], usage: &'static str) -> Result<(), CommandError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandError::Usage(usage))
    }
}

fn read_to_string(path: &Path) -> Result<String, CommandError> {
    std::fs::read_to_string(path).map_err(|source| CommandError::Script {
        path: path.to_path_buf(),
        source,
    })
}

/// Execute a command script, honoring trailing-backslash continuation.
async fn read_script<C: Clock>(
    controller: &mut Controller<C>,
    path: &Path,
) -> Result<(), CommandError> {
    let text = read_to_string(path)?;
    let mut pending = String::new();
    for raw in text.lines() {
        if let Some(stripped) = raw.strip_suffix('\\') {
            pending.push_str(stripped);
            continue;
        }
        pending.push_str(raw);
        let line = std::mem::take(&mut pending);
        Box::pin(controller.run_command(&line)).await;
    }
    Ok(())
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
