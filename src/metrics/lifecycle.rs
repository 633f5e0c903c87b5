//! Per-channel gauge registration that follows the set of bonded channels.
//!
//! Each downstream channel gets one [`ChannelCollector`] carrying three gauges
//! labelled with the channel id. The collector reads the live channel table
//! every time it is sampled, so registration never snapshots values.

use crate::error::{ExporterError, Result};
use crate::metrics::diff::ChannelDiff;
use crate::scrape::status::{DownstreamChannel, DownstreamTable};
use parking_lot::RwLock;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Gauge, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Metric namespace shared by every exported family.
pub const NAMESPACE: &str = "arris";
/// Subsystem for downstream channel families.
pub const DOWNSTREAM_SUBSYSTEM: &str = "downstream";
/// Label carrying the device-assigned channel id.
pub const CHANNEL_LABEL: &str = "channel";

fn channel_opts(id: u32, name: &str, help: &str) -> Opts {
    Opts::new(name, help)
        .namespace(NAMESPACE)
        .subsystem(DOWNSTREAM_SUBSYSTEM)
        .const_label(CHANNEL_LABEL, id.to_string())
}

/// Live view of one downstream channel.
#[derive(Clone)]
pub struct ChannelCollector {
    id: u32,
    source: DownstreamTable,
    power: Gauge,
    corrected: IntGauge,
    uncorrectables: IntGauge,
}

impl ChannelCollector {
    pub fn new(id: u32, source: DownstreamTable) -> Result<Self> {
        Ok(Self {
            id,
            source,
            power: Gauge::with_opts(channel_opts(
                id,
                "power",
                "Power, in dBmV, of the downstream channel.",
            ))?,
            corrected: IntGauge::with_opts(channel_opts(
                id,
                "corrected",
                "Codewords corrected on the downstream channel.",
            ))?,
            uncorrectables: IntGauge::with_opts(channel_opts(
                id,
                "uncorrectables",
                "Uncorrectable codewords on the downstream channel.",
            ))?,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }
}

impl Collector for ChannelCollector {
    fn desc(&self) -> Vec<&Desc> {
        let mut descs = self.power.desc();
        descs.extend(self.corrected.desc());
        descs.extend(self.uncorrectables.desc());
        descs
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let table = self.source.read();
        let Some(channel) = table.get(&self.id) else {
            return Vec::new();
        };

        self.power.set(channel.power);
        self.corrected.set(channel.corrected);
        self.uncorrectables.set(channel.uncorrectables);
        drop(table);

        let mut families = self.power.collect();
        families.extend(self.corrected.collect());
        families.extend(self.uncorrectables.collect());
        families
    }
}

/// Ids whose registration state actually changed during one sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub registered: Vec<u32>,
    pub unregistered: Vec<u32>,
}

/// Keeps the registry's per-channel collectors in step with the channel set.
pub struct ChannelMetrics {
    registry: Registry,
    collectors: RwLock<BTreeMap<u32, ChannelCollector>>,
}

impl Default for ChannelMetrics {
    fn default() -> Self {
        Self::new(Registry::new())
    }
}

impl ChannelMetrics {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            collectors: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Ids that currently have gauges registered.
    pub fn registered(&self) -> Vec<u32> {
        self.collectors.read().keys().copied().collect()
    }

    /// Unregister vanished channels, then register new ones, as one batch.
    ///
    /// Gathering is blocked for the duration, so a scrape observes the
    /// registry either before or after the batch.
    pub fn apply(&self, diff: &ChannelDiff, source: &DownstreamTable) -> SyncOutcome {
        let mut collectors = self.collectors.write();
        self.apply_locked(&mut collectors, diff, source)
    }

    /// Swap in a freshly scraped channel table and apply `diff` under the
    /// same lock, so no gather sees the new table with the old registrations.
    pub fn publish(
        &self,
        source: &DownstreamTable,
        channels: BTreeMap<u32, DownstreamChannel>,
        diff: &ChannelDiff,
    ) -> SyncOutcome {
        let mut collectors = self.collectors.write();
        *source.write() = channels;
        self.apply_locked(&mut collectors, diff, source)
    }

    fn apply_locked(
        &self,
        collectors: &mut BTreeMap<u32, ChannelCollector>,
        diff: &ChannelDiff,
        source: &DownstreamTable,
    ) -> SyncOutcome {
        let mut outcome = SyncOutcome::default();

        for &id in &diff.removed {
            match self.unregister_locked(collectors, id) {
                Ok(true) => outcome.unregistered.push(id),
                Ok(false) => debug!(id, "channel was not registered"),
                Err(e) => warn!(id, error = %e, "failed to unregister channel gauges"),
            }
        }

        for &id in &diff.added {
            match self.register_locked(collectors, id, source) {
                Ok(true) => outcome.registered.push(id),
                Ok(false) => debug!(id, "channel already registered"),
                Err(e) => warn!(id, error = %e, "failed to register channel gauges"),
            }
        }

        if !outcome.registered.is_empty() || !outcome.unregistered.is_empty() {
            info!(
                registered = ?outcome.registered,
                unregistered = ?outcome.unregistered,
                "downstream channel gauges updated"
            );
        }
        outcome
    }

    /// Register gauges for `id`. Returns false when they already exist.
    pub fn register(&self, id: u32, source: &DownstreamTable) -> Result<bool> {
        let mut collectors = self.collectors.write();
        self.register_locked(&mut collectors, id, source)
    }

    /// Unregister gauges for `id`. Returns false when none were registered.
    pub fn unregister(&self, id: u32) -> Result<bool> {
        let mut collectors = self.collectors.write();
        self.unregister_locked(&mut collectors, id)
    }

    /// Sample every registered collector. Holds the read lock so the channel
    /// table cannot be swapped mid-gather.
    pub fn gather(&self) -> Vec<MetricFamily> {
        let _collectors = self.collectors.read();
        self.registry.gather()
    }

    /// Render the current metric set in the Prometheus text format.
    pub fn encode(&self) -> Result<String> {
        let families = self.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| ExporterError::web_server_error(format!("metrics not UTF-8: {e}")))
    }

    fn register_locked(
        &self,
        collectors: &mut BTreeMap<u32, ChannelCollector>,
        id: u32,
        source: &DownstreamTable,
    ) -> Result<bool> {
        if collectors.contains_key(&id) {
            return Ok(false);
        }

        let collector = ChannelCollector::new(id, source.clone())?;
        match self.registry.register(Box::new(collector.clone())) {
            Ok(()) => {
                collectors.insert(id, collector);
                Ok(true)
            }
            Err(prometheus::Error::AlreadyReg) => {
                collectors.insert(id, collector);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn unregister_locked(
        &self,
        collectors: &mut BTreeMap<u32, ChannelCollector>,
        id: u32,
    ) -> Result<bool> {
        let Some(collector) = collectors.remove(&id) else {
            return Ok(false);
        };
        self.registry.unregister(Box::new(collector))?;
        Ok(true)
    }
}
