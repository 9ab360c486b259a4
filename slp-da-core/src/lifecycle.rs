//
// Copyright (c) The SLP Directory Agent Contributors
//
// SPDX-License-Identifier: MIT
//

//! Top-level orchestration: wires the cache, DA bindings, and periodic
//! tasks together and owns the start/stop sequence (§5, §9
//! "Global/shutdown hook").

use std::sync::Arc;
use std::time::Duration;

use crate::cache::ServiceInfoCache;
use crate::da_info::DirectoryAgentInfo;
use crate::debug::Debug;
use crate::error::ERR_SUCCESS;
use crate::handlers::DaBindings;
use crate::message::DaAdvert;
use crate::tasks::{self, IntervalTask};

/// Where boot/shutdown and unsolicited DAAdverts are broadcast (§4.5).
/// Transport (multicast UDP) is an external collaborator (§1);
/// implementations serialize and send `advert` to the configured
/// multicast group.
pub trait AdvertSink: Send + Sync {
    fn broadcast(&self, advert: DaAdvert);
}

/// Owns one DA's lifecycle: boot/shutdown advert, unsolicited advert
/// interval, and purge interval. Does not own the network servers or
/// the dispatcher loop itself — those are assembled by the daemon
/// around this object and the cache/bindings it's given (§1 "external
/// collaborators").
pub struct DirectoryAgent {
    cache: Arc<ServiceInfoCache>,
    bindings: Arc<DaBindings>,
    sink: Arc<dyn AdvertSink>,
    advertisement_period: Duration,
    purge_period: Duration,
    unsolicited_advert: Option<IntervalTask>,
    purger: Option<IntervalTask>,
    running: bool,
}

impl DirectoryAgent {
    pub fn new(
        cache: Arc<ServiceInfoCache>,
        bindings: Arc<DaBindings>,
        sink: Arc<dyn AdvertSink>,
        advertisement_period: Duration,
        purge_period: Duration,
    ) -> DirectoryAgent {
        DirectoryAgent {
            cache,
            bindings,
            sink,
            advertisement_period,
            purge_period,
            unsolicited_advert: None,
            purger: None,
            running: false,
        }
    }

    pub fn cache(&self) -> &Arc<ServiceInfoCache> {
        &self.cache
    }

    pub fn bindings(&self) -> &Arc<DaBindings> {
        &self.bindings
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Emits the boot DAAdvert for every binding and starts the
    /// unsolicited-advert and purger intervals (§4.5). Idempotent.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        Debug::InstanceStart.log();

        for da in self.bindings.values() {
            self.sink.broadcast(advert(da, da.boot_time));
            Debug::BootAdvert(&da.address).log();
        }

        let bindings = self.bindings.clone();
        let sink = self.sink.clone();
        self.unsolicited_advert = tasks::unsolicited_advert(self.advertisement_period, move || {
            let bindings = bindings.clone();
            let sink = sink.clone();
            async move {
                for da in bindings.values() {
                    sink.broadcast(advert(da, da.boot_time));
                    Debug::UnsolicitedAdvert(&da.address).log();
                }
            }
        });

        let cache = self.cache.clone();
        self.purger = tasks::purger(self.purge_period, move || {
            let cache = cache.clone();
            async move {
                cache.purge();
            }
        });

        self.running = true;
    }

    /// Cancels the scheduler, emits the shutdown DAAdvert for every
    /// binding, and marks the agent stopped (§5 "Cancellation &
    /// shutdown"). Idempotent; swallows nothing because there's
    /// nothing fallible left to swallow once the tasks are dropped.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.unsolicited_advert = None;
        self.purger = None;

        for da in self.bindings.values() {
            self.sink.broadcast(advert(da, 0));
            Debug::ShutdownAdvert(&da.address).log();
        }

        Debug::InstanceStop.log();
        self.running = false;
    }
}

impl Drop for DirectoryAgent {
    fn drop(&mut self) {
        self.stop();
    }
}

fn advert(da: &DirectoryAgentInfo, boot_time: u32) -> DaAdvert {
    DaAdvert {
        xid: 0,
        language: da.language.clone(),
        error_code: ERR_SUCCESS,
        url: da.service_url().as_str().to_string(),
        scopes: da.scopes.clone(),
        attributes: da.attributes.clone(),
        boot_time,
    }
}
