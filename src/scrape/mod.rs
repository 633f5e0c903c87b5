//! Extraction of structured readings from the modem's status page.
//!
//! A [`Page`] identifies a document and owns an ordered [`ExtractorChain`].
//! [`Status`] builds on a page with the SB8200 connection status steps.

pub mod fields;
pub mod html;
pub mod page;
pub mod status;

// Re-export commonly used items
pub use fields::{parse_decibels, parse_frequency};
pub use page::{Extractor, ExtractorChain, Page, ScrapeReport};
pub use status::{DownstreamChannel, Status, StatusSnapshot, UpstreamChannel};
