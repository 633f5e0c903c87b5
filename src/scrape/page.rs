//! The page model: document identity plus an ordered chain of extraction steps.

use crate::error::{ExporterError, Result};
use crate::scrape::html;
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

/// Address of the modem's management interface on the cable side.
pub const DEFAULT_HOST: &str = "http://192.168.100.1";

/// One extraction step. The set is closed; each variant knows its own name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Extractor {
    /// Reads the model number from the page banner
    Model,
    /// Reads the "Startup Procedure" table
    Startup,
    /// Reads the "Downstream Bonded Channels" table
    Downstream,
    /// Reads the "Upstream Bonded Channels" table
    Upstream,
}

impl Extractor {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Startup => "startup",
            Self::Downstream => "downstream",
            Self::Upstream => "upstream",
        }
    }
}

impl fmt::Display for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered, mutable sequence of steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorChain<S> {
    steps: Vec<S>,
}

impl<S> Default for ExtractorChain<S> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<S: Clone + fmt::Debug> ExtractorChain<S> {
    pub fn new(steps: impl IntoIterator<Item = S>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
        }
    }

    /// Add steps to the end of the chain.
    pub fn append(&mut self, steps: impl IntoIterator<Item = S>) {
        self.steps.extend(steps);
        trace!(len = self.steps.len(), "extractors appended");
    }

    /// Remove the step at `index`, keeping the relative order of the rest.
    pub fn remove(&mut self, index: usize) -> Result<S> {
        let len = self.steps.len();
        if index >= len {
            return Err(ExporterError::Chain { index, len });
        }
        let removed = self.steps.remove(index);
        trace!(index, len = self.steps.len(), "extractor removed");
        Ok(removed)
    }

    /// Remove a batch of steps by their current indices.
    ///
    /// Indices are validated up front, de-duplicated and removed from the
    /// highest downward, so each removal leaves the remaining indices valid.
    /// On error the chain is untouched.
    pub fn remove_many(&mut self, indices: &[usize]) -> Result<Vec<S>> {
        let len = self.steps.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(ExporterError::Chain { index, len });
        }

        let mut ordered = indices.to_vec();
        ordered.sort_unstable_by(|a, b| b.cmp(a));
        ordered.dedup();

        let mut removed = Vec::with_capacity(ordered.len());
        for index in ordered {
            removed.push(self.remove(index)?);
        }
        debug!(indices = ?indices, "extractors removed");
        Ok(removed)
    }

    pub fn steps(&self) -> &[S] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Per-step outcomes of one scrape, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrapeReport {
    pub outcomes: Vec<(Extractor, bool)>,
}

impl ScrapeReport {
    pub fn record(&mut self, step: Extractor, ok: bool) {
        self.outcomes.push((step, ok));
    }

    /// True when every step succeeded.
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(|(_, ok)| *ok)
    }

    pub fn outcome(&self, step: Extractor) -> Option<bool> {
        self.outcomes
            .iter()
            .rev()
            .find(|(s, _)| *s == step)
            .map(|(_, ok)| *ok)
    }

    pub fn failed(&self) -> Vec<Extractor> {
        self.outcomes
            .iter()
            .filter(|(_, ok)| !ok)
            .map(|(s, _)| *s)
            .collect()
    }
}

/// A document source and the steps that pull data out of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Model number reported by the device
    pub model: String,
    /// Scheme and host of the device, e.g. `http://192.168.100.1`
    pub host: String,
    /// Path of the document relative to `host`
    pub path: String,
    #[serde(skip)]
    extractors: ExtractorChain<Extractor>,
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    pub fn new() -> Self {
        let mut page = Self {
            model: String::new(),
            host: String::new(),
            path: String::new(),
            extractors: ExtractorChain::default(),
        };
        page.finalize();
        page
    }

    /// Page for a specific host and path.
    pub fn with_location(host: impl Into<String>, path: impl Into<String>) -> Self {
        let mut page = Self::new();
        page.host = host.into();
        page.path = path.into();
        page.finalize();
        page
    }

    /// Fill defaults. Guarantees the chain holds at least the model step.
    pub fn finalize(&mut self) {
        if self.host.is_empty() {
            self.host = DEFAULT_HOST.to_string();
        }
        if self.extractors.is_empty() {
            self.extractors.append([Extractor::Model]);
        }
    }

    /// Full URL of the document.
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.host.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }

    pub fn extractors(&self) -> &ExtractorChain<Extractor> {
        &self.extractors
    }

    pub fn extractors_mut(&mut self) -> &mut ExtractorChain<Extractor> {
        &mut self.extractors
    }

    /// Run the chain against `doc`. A bare page only understands the model step;
    /// any other step is recorded as failed.
    pub fn scrape(&mut self, doc: &Html) -> ScrapeReport {
        let mut report = ScrapeReport::default();
        for step in self.extractors.steps().to_vec() {
            let ok = match step {
                Extractor::Model => self.extract_model(doc),
                other => {
                    debug!(step = %other, "step not supported by a bare page");
                    false
                }
            };
            report.record(step, ok);
        }
        trace!(page = %self, success = report.success(), "page scraped");
        report
    }

    /// Read the model number banner.
    pub fn extract_model(&mut self, doc: &Html) -> bool {
        match html::first_text(doc, "span#thisModelNumberIs") {
            Ok(Some(model)) => {
                self.model = model;
                true
            }
            Ok(None) => {
                trace!("model number not found");
                false
            }
            Err(e) => {
                debug!(error = %e, "model lookup failed");
                false
            }
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}
