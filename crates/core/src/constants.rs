//! Constants used throughout the lab core crate.
//!
//! This module contains tax, naming, and configuration defaults to ensure
//! consistency across the codebase and make maintenance easier.

/// GST rate applied to every quotation.
pub const GST_RATE: f64 = 0.18;

/// GST rate as a whole percentage, as printed on quotation documents.
pub const GST_PERCENT: u32 = 18;

/// Multiplier that turns a pre-tax amount into a tax-inclusive amount.
pub const GST_INCLUSIVE_FACTOR: f64 = 1.18;

/// Study type whose selections are read from `selectedStudies` instead of `selectedGuidelines`.
pub const MICROBIOLOGY_STUDY_TYPE: &str = "Microbiology & Virology Study";

/// Line item name used when a microbiology item has no studies selected.
pub const MICROBIOLOGY_FALLBACK_NAME: &str = "Microbiology Testing";

/// Line item name used when an item has neither a selection nor a study type.
pub const UNNAMED_STUDY_NAME: &str = "Unnamed Study";

/// Default prefix for issued quotation numbers.
pub const DEFAULT_QUOTATION_PREFIX: &str = "QT";

/// Default directory for uploaded verification documents.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Default public base URL under which uploaded files are served.
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3000/files";
