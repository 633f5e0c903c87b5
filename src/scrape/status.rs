//! Connection status page of the SURFboard SB8200.
//!
//! [`Status`] wraps a [`Page`] and adds the device-specific steps: the startup
//! procedure table plus the downstream and upstream bonded channel tables.
//! Channel tables are replaced wholesale after each successful extraction and
//! the downstream id set drives gauge registration.

use crate::error::{ExporterError, Result};
use crate::metrics::diff::ChannelDiff;
use crate::metrics::lifecycle::{ChannelMetrics, SyncOutcome};
use crate::scrape::fields;
use crate::scrape::html;
use crate::scrape::page::{Extractor, Page, ScrapeReport};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Document path of the status page.
pub const DEFAULT_PAGE: &str = "cmconnectionstatus.html";

const STARTUP_ANCHOR: &str = "Startup Procedure";
const DOWNSTREAM_ANCHOR: &str = "Downstream Bonded Channels";
const UPSTREAM_ANCHOR: &str = "Upstream Bonded Channels";

/// Title row plus column heading row at the top of each channel table.
const CHANNEL_TABLE_HEADER_ROWS: usize = 2;
/// Row positions inside the startup procedure table.
const ACQUIRE_DOWNSTREAM_ROW: usize = 2;
const CONNECTIVITY_ROW: usize = 3;

/// Shared downstream channel table, read by the gauges at sample time.
pub type DownstreamTable = Arc<RwLock<BTreeMap<u32, DownstreamChannel>>>;
/// Shared upstream channel table.
pub type UpstreamTable = Arc<RwLock<BTreeMap<u32, UpstreamChannel>>>;

/// One row of the downstream bonded channels table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownstreamChannel {
    pub id: u32,
    pub locked: String,
    pub modulation: String,
    /// Center frequency in Hz
    pub frequency: i64,
    /// Receive power in dBmV
    pub power: f64,
    /// Signal to noise ratio in dB
    pub snr: f64,
    pub corrected: i64,
    pub uncorrectables: i64,
}

impl DownstreamChannel {
    /// Build a record from the row's cells. Only the id is mandatory.
    pub fn from_cells(cells: &[String]) -> Result<Self> {
        let id = fields::parse_channel_id(cell(cells, 0))?;
        Ok(Self {
            id,
            locked: cell(cells, 1).to_string(),
            modulation: cell(cells, 2).to_string(),
            frequency: lenient(cells, 3, fields::parse_frequency),
            power: lenient(cells, 4, fields::parse_decibels),
            snr: lenient(cells, 5, fields::parse_decibels),
            corrected: lenient(cells, 6, fields::parse_count),
            uncorrectables: lenient(cells, 7, fields::parse_count),
        })
    }
}

/// One row of the upstream bonded channels table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamChannel {
    pub id: u32,
    /// Position of the row in the table as numbered by the device
    pub channel: u32,
    pub locked: String,
    pub channel_type: String,
    /// Center frequency in Hz
    pub frequency: i64,
    /// Channel width in Hz
    pub width: i64,
    /// Transmit power in dBmV
    pub power: f64,
}

impl UpstreamChannel {
    /// Build a record from the row's cells. The id lives in the second column.
    pub fn from_cells(cells: &[String]) -> Result<Self> {
        let id = fields::parse_channel_id(cell(cells, 1))?;
        Ok(Self {
            id,
            channel: fields::parse_channel_id(cell(cells, 0)).unwrap_or_default(),
            locked: cell(cells, 2).to_string(),
            channel_type: cell(cells, 3).to_string(),
            frequency: lenient(cells, 4, fields::parse_frequency),
            width: lenient(cells, 5, fields::parse_frequency),
            power: lenient(cells, 6, fields::parse_decibels),
        })
    }
}

fn cell(cells: &[String], index: usize) -> &str {
    cells.get(index).map(String::as_str).unwrap_or_default()
}

fn lenient<T: Default>(cells: &[String], index: usize, parse: fn(&str) -> Result<T>) -> T {
    parse(cell(cells, index)).unwrap_or_else(|e| {
        debug!(column = index, error = %e, "cell left at default");
        T::default()
    })
}

/// Owned, serializable copy of the latest readings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub model: String,
    pub host: String,
    pub page: String,
    pub acquired_downstream_channel: i64,
    pub downstream_channel_status: String,
    pub connectivity: String,
    pub connectivity_comment: String,
    pub downstream: BTreeMap<u32, DownstreamChannel>,
    pub upstream: BTreeMap<u32, UpstreamChannel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scrape: Option<DateTime<Utc>>,
}

/// Live status of the modem, updated in place once per poll cycle.
pub struct Status {
    page: Page,
    pub acquired_downstream_channel: i64,
    pub downstream_channel_status: String,
    pub connectivity: String,
    pub connectivity_comment: String,
    downstream: DownstreamTable,
    upstream: UpstreamTable,
    downstream_channels: Option<BTreeSet<u32>>,
    upstream_channels: Option<BTreeSet<u32>>,
    metrics: Arc<ChannelMetrics>,
    last_sync: SyncOutcome,
    last_scrape: Option<DateTime<Utc>>,
}

impl Default for Status {
    fn default() -> Self {
        Self::new(Arc::new(ChannelMetrics::default()))
    }
}

impl Status {
    /// Status page at the default location, registering gauges on `metrics`.
    pub fn new(metrics: Arc<ChannelMetrics>) -> Self {
        Self::with_page(Page::new(), metrics)
    }

    pub fn with_page(page: Page, metrics: Arc<ChannelMetrics>) -> Self {
        let mut status = Self {
            page,
            acquired_downstream_channel: 0,
            downstream_channel_status: String::new(),
            connectivity: String::new(),
            connectivity_comment: String::new(),
            downstream: Arc::new(RwLock::new(BTreeMap::new())),
            upstream: Arc::new(RwLock::new(BTreeMap::new())),
            downstream_channels: None,
            upstream_channels: None,
            metrics,
            last_sync: SyncOutcome::default(),
            last_scrape: None,
        };
        status.finalize();
        status
    }

    /// Fill page defaults and install the status steps after the model step.
    fn finalize(&mut self) {
        if self.page.path.is_empty() {
            self.page.path = DEFAULT_PAGE.to_string();
        }
        self.page.finalize();

        let chain = self.page.extractors_mut();
        for step in [Extractor::Startup, Extractor::Downstream, Extractor::Upstream] {
            if !chain.steps().contains(&step) {
                chain.append([step]);
            }
        }
        trace!(steps = ?self.page.extractors().steps(), "status finalized");
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    pub fn model(&self) -> &str {
        &self.page.model
    }

    pub fn host(&self) -> &str {
        &self.page.host
    }

    pub fn path(&self) -> &str {
        &self.page.path
    }

    pub fn url(&self) -> String {
        self.page.url()
    }

    pub fn metrics(&self) -> &Arc<ChannelMetrics> {
        &self.metrics
    }

    /// Handle to the live downstream table.
    pub fn downstream_table(&self) -> &DownstreamTable {
        &self.downstream
    }

    /// Ids seen in the last successful downstream extraction.
    pub fn downstream_channels(&self) -> Option<&BTreeSet<u32>> {
        self.downstream_channels.as_ref()
    }

    pub fn upstream_channels(&self) -> Option<&BTreeSet<u32>> {
        self.upstream_channels.as_ref()
    }

    /// Gauge changes made by the most recent downstream extraction.
    pub fn last_sync(&self) -> &SyncOutcome {
        &self.last_sync
    }

    pub fn last_scrape(&self) -> Option<DateTime<Utc>> {
        self.last_scrape
    }

    /// Parse `body` and run the chain over it.
    pub fn scrape_body(&mut self, body: &str) -> Result<ScrapeReport> {
        let doc = html::parse_document(body)?;
        Ok(self.scrape(&doc))
    }

    /// Run every step in order. A failing step never stops later ones.
    pub fn scrape(&mut self, doc: &Html) -> ScrapeReport {
        let mut report = ScrapeReport::default();
        for step in self.page.extractors().steps().to_vec() {
            let ok = match step {
                Extractor::Model => self.page.extract_model(doc),
                Extractor::Startup => self.extract_startup(doc),
                Extractor::Downstream => self.extract_downstream(doc),
                Extractor::Upstream => self.extract_upstream(doc),
            };
            if !ok {
                debug!(step = %step, "extraction step failed");
            }
            report.record(step, ok);
        }
        self.last_scrape = Some(Utc::now());
        report
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            model: self.page.model.clone(),
            host: self.page.host.clone(),
            page: self.page.path.clone(),
            acquired_downstream_channel: self.acquired_downstream_channel,
            downstream_channel_status: self.downstream_channel_status.clone(),
            connectivity: self.connectivity.clone(),
            connectivity_comment: self.connectivity_comment.clone(),
            downstream: self.downstream.read().clone(),
            upstream: self.upstream.read().clone(),
            last_scrape: self.last_scrape,
        }
    }

    fn table_rows<'a>(doc: &'a Html, anchor: &str) -> Result<Vec<ElementRef<'a>>> {
        let table = html::find_table(doc, anchor)?
            .ok_or_else(|| ExporterError::anchor_error(anchor))?;
        html::rows(table)
    }

    fn anchored_rows<'a>(doc: &'a Html, anchor: &str) -> Option<Vec<ElementRef<'a>>> {
        match Self::table_rows(doc, anchor) {
            Ok(rows) => Some(rows),
            Err(e @ ExporterError::Anchor(_)) => {
                trace!(error = %e, "step skipped");
                None
            }
            Err(e) => {
                warn!(anchor, error = %e, "table lookup failed");
                None
            }
        }
    }

    fn extract_startup(&mut self, doc: &Html) -> bool {
        let Some(rows) = Self::anchored_rows(doc, STARTUP_ANCHOR) else {
            return false;
        };

        let acquired = self.acquired_downstream_channel(&rows);
        let connectivity = self.connectivity_status(&rows);
        acquired && connectivity
    }

    fn acquired_downstream_channel(&mut self, rows: &[ElementRef<'_>]) -> bool {
        let Some(row) = rows.get(ACQUIRE_DOWNSTREAM_ROW) else {
            trace!("downstream acquisition row not found");
            return false;
        };
        let cells = html::cells(*row);

        match fields::parse_frequency(cell(&cells, 1)) {
            Ok(hz) => self.acquired_downstream_channel = hz,
            Err(e) => debug!(error = %e, "acquired downstream frequency left unchanged"),
        }
        self.downstream_channel_status = cell(&cells, 2).to_string();
        true
    }

    fn connectivity_status(&mut self, rows: &[ElementRef<'_>]) -> bool {
        let Some(row) = rows.get(CONNECTIVITY_ROW) else {
            trace!("connectivity row not found");
            return false;
        };
        let cells = html::cells(*row);

        self.connectivity = cell(&cells, 1).to_string();
        self.connectivity_comment = cell(&cells, 2).to_string();
        true
    }

    fn extract_downstream(&mut self, doc: &Html) -> bool {
        let Some(rows) = Self::anchored_rows(doc, DOWNSTREAM_ANCHOR) else {
            return false;
        };

        let mut channels = BTreeMap::new();
        for (index, row) in rows.iter().enumerate().skip(CHANNEL_TABLE_HEADER_ROWS) {
            match DownstreamChannel::from_cells(&html::cells(*row)) {
                Ok(channel) => {
                    channels.insert(channel.id, channel);
                }
                Err(e) => warn!(index, error = %e, "unable to parse downstream row id"),
            }
        }

        let current: BTreeSet<u32> = channels.keys().copied().collect();
        let diff = ChannelDiff::between(self.downstream_channels.as_ref(), &current);

        self.last_sync = self.metrics.publish(&self.downstream, channels, &diff);
        self.downstream_channels = Some(current);
        true
    }

    fn extract_upstream(&mut self, doc: &Html) -> bool {
        let Some(rows) = Self::anchored_rows(doc, UPSTREAM_ANCHOR) else {
            return false;
        };

        let mut channels = BTreeMap::new();
        for (index, row) in rows.iter().enumerate().skip(CHANNEL_TABLE_HEADER_ROWS) {
            match UpstreamChannel::from_cells(&html::cells(*row)) {
                Ok(channel) => {
                    channels.insert(channel.id, channel);
                }
                Err(e) => warn!(index, error = %e, "unable to parse upstream row id"),
            }
        }

        let current: BTreeSet<u32> = channels.keys().copied().collect();
        let diff = ChannelDiff::between(self.upstream_channels.as_ref(), &current);
        if !diff.is_empty() {
            info!(added = ?diff.added, removed = ?diff.removed, "upstream channels changed");
        }

        *self.upstream.write() = channels;
        self.upstream_channels = Some(current);
        true
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.snapshot()) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{:?}", self.snapshot()),
        }
    }
}
