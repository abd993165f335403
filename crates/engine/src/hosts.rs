// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Known remote hosts and the periodic auto-start pass.

use crate::dispatch::Dispatcher;
use crate::effect::Effect;
use chrono::{Datelike, Timelike};
use indexmap::IndexMap;
use rfarm_adapters::{DbConvert, LaunchRequest};
use rfarm_core::{ActivationPolicy, Host, HostName, Provisioning, WorkerId};
use tracing::{debug, info};

/// Registry of known hosts, in registration order.
#[derive(Debug, Default)]
pub struct HostRegistry {
    hosts: IndexMap<HostName, Host>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a host entry.
    pub fn set(&mut self, host: Host) {
        self.hosts.insert(host.name.clone(), host);
    }

    pub fn get(&self, name: &HostName) -> Option<&Host> {
        self.hosts.get(name)
    }

    /// Look up a host, registering an unknown peer as a passive volunteer.
    pub fn resolve(&mut self, name: &HostName) -> &Host {
        self.hosts
            .entry(name.clone())
            .or_insert_with(|| Host::volunteer(name.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl Dispatcher {
    /// Periodic host pass: launch missing workers whose policy wants them
    /// running, and retire off-peak workers inside the peak window.
    ///
    /// `wall` is the local wall clock; `controller` and `port` are what the
    /// launched worker dials back to.
    pub fn start_servers<T: Datelike + Timelike>(
        &mut self,
        wall: &T,
        controller: &str,
        port: u16,
    ) -> Vec<Effect> {
        let mut out = Vec::new();
        let hosts: Vec<Host> = self.hosts.iter().cloned().collect();
        for host in hosts {
            let live = self.workers.values().any(|w| w.host == host.name);
            let wanted = host.policy.qualifies(wall);
            if live && !wanted && host.policy == ActivationPolicy::OffPeak {
                // Planned, policy-driven eviction.
                let ids: Vec<WorkerId> = self
                    .workers
                    .values()
                    .filter(|w| w.host == host.name)
                    .map(|w| w.id.clone())
                    .collect();
                for id in ids {
                    info!(host = %host.name, "peak hours; releasing worker");
                    self.drop_worker(id, "peak hours on off-peak host", &mut out);
                }
            } else if !live && wanted {
                let convert = match host.provisioning {
                    Provisioning::ConvertDb => {
                        let Some(model) = &self.model else {
                            debug!(host = %host.name, "no model loaded; launch deferred");
                            continue;
                        };
                        let remote_db = model
                            .db_path
                            .file_name()
                            .map(std::path::PathBuf::from)
                            .unwrap_or_else(|| std::path::PathBuf::from("model.db"));
                        Some(DbConvert {
                            local_db: model.db_path.clone(),
                            remote_db,
                        })
                    }
                    Provisioning::CdOnly => None,
                };
                info!(host = %host.name, "launching worker");
                out.push(Effect::Launch {
                    request: LaunchRequest {
                        host: host.name.clone(),
                        controller: controller.to_string(),
                        port,
                        remote_dir: host.remote_dir.clone(),
                        convert,
                    },
                });
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "hosts_tests.rs"]
mod tests;
