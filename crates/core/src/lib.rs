//! # Lab Core
//!
//! Core business logic for the laboratory services portal.
//!
//! This crate contains pure quotation and order-tracking rules:
//! - Line-item pricing under the base-amount and grand-total GST conventions
//! - Current-stage and per-checkpoint derivation from fulfilment timestamps
//! - Quotation numbers and the quotation document handed to the PDF service
//!
//! Nothing here holds state between calls or performs network I/O. Callers pass snapshots of
//! order data in and receive plain records back.
//!
//! **No API concerns**: HTTP serving, uploads and CLI parsing belong in `api-rest`,
//! `lab_files` and `lab-cli`.

pub mod config;
pub mod constants;
pub mod error;
pub mod order;
pub mod pricing;
pub mod quotation;
pub mod stages;
pub mod validation;

pub use config::CoreConfig;
pub use constants::*;
pub use error::{PortalError, PortalResult};
pub use order::{CheckpointValue, ChronologyAnomaly, OrderItem, OrderStatus, Selection};
pub use pricing::{
    BaseAmountQuote, CartGroupQuote, GrandTotalSplit, LineItem, PricedItem,
    price_cart_group, price_from_base_amount, price_from_grand_total,
};
pub use quotation::{Customer, DocumentProduct, DocumentSummary, QuotationDocument, QuotationNumber};
pub use stages::{Checkpoint, CheckpointStatus, Stage, StageView, derive_stage_view};

use catalog::{GuidelineCatalog, GuidelineEntry};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

/// Quotation and tracking operations bound to a resolved configuration and catalog.
///
/// Cheap to clone; the configuration and catalog are shared.
#[derive(Clone, Debug)]
pub struct PortalService {
    cfg: Arc<CoreConfig>,
    catalog: Arc<GuidelineCatalog>,
}

impl PortalService {
    /// Creates a new `PortalService`.
    ///
    /// # Arguments
    /// * `cfg` - Configuration resolved at startup
    /// * `catalog` - Guideline catalog resolved at startup (see [`config::resolve_catalog`])
    pub fn new(cfg: Arc<CoreConfig>, catalog: Arc<GuidelineCatalog>) -> Self {
        Self { cfg, catalog }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn catalog(&self) -> &GuidelineCatalog {
        &self.catalog
    }

    /// Catalog lookup keyed by `(category, study)`.
    pub fn lookup_guideline(&self, category: &str, study: &str) -> Option<&GuidelineEntry> {
        self.catalog.lookup(category, study)
    }

    /// Single-item preview; the item amount excludes GST.
    pub fn preview_item(&self, item: &OrderItem) -> PortalResult<BaseAmountQuote> {
        price_from_base_amount(item)
    }

    /// Cart-group breakdown; item amounts include GST.
    pub fn price_cart(&self, items: &[OrderItem]) -> PortalResult<CartGroupQuote> {
        price_cart_group(items)
    }

    /// Tracking view for an order status snapshot.
    ///
    /// Timeline anomalies are logged and returned alongside the view; they never change it.
    pub fn track(&self, status: &OrderStatus) -> (StageView, Vec<ChronologyAnomaly>) {
        let anomalies = status.chronology_anomalies();
        for anomaly in &anomalies {
            tracing::warn!("order status anomaly: {:?}", anomaly);
        }
        (derive_stage_view(status), anomalies)
    }

    /// Issue a new quotation number with the configured prefix and today's date.
    pub fn issue_quotation_number(&self) -> PortalResult<QuotationNumber> {
        QuotationNumber::issue(self.cfg.quotation_prefix(), self.today())
    }

    /// Quotation document for one item, issuing a number if none is supplied.
    pub fn item_document(
        &self,
        customer: Customer,
        item: &OrderItem,
        quotation_number: Option<String>,
    ) -> PortalResult<QuotationDocument> {
        let number = self.number_or_issue(quotation_number)?;
        QuotationDocument::for_item(customer, item, number, self.today())
    }

    /// Combined quotation document for a cart group, issuing a number if none is supplied.
    pub fn cart_document(
        &self,
        customer: Customer,
        items: &[OrderItem],
        quotation_number: Option<String>,
    ) -> PortalResult<QuotationDocument> {
        let number = self.number_or_issue(quotation_number)?;
        QuotationDocument::for_cart_group(customer, items, number, self.today())
    }

    fn number_or_issue(&self, quotation_number: Option<String>) -> PortalResult<QuotationNumber> {
        match quotation_number.filter(|n| !n.trim().is_empty()) {
            Some(existing) => QuotationNumber::parse(&existing),
            None => self.issue_quotation_number(),
        }
    }

    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> PortalService {
        let cfg = CoreConfig::from_values(None, None, Some("LAB".into()), None).expect("config");
        let catalog = config::resolve_catalog(&cfg).expect("catalog");
        PortalService::new(Arc::new(cfg), Arc::new(catalog))
    }

    #[test]
    fn issues_numbers_with_configured_prefix() {
        let number = service().issue_quotation_number().expect("issue");
        assert!(number.as_str().starts_with("LAB-"));
    }

    #[test]
    fn keeps_supplied_quotation_number() {
        let item = OrderItem {
            quotation_number: "QT-9".into(),
            study_type: "Invitro Study".into(),
            base_amount: 1000.0,
            number_of_samples: 1,
            selected_guidelines: Vec::new(),
            selected_studies: Vec::new(),
            order_status: None,
        };
        let customer = Customer {
            name: "N".into(),
            organisation: None,
            email: "n@example.com".into(),
            phone: None,
            address: None,
        };

        let svc = service();
        let doc = svc
            .item_document(customer.clone(), &item, Some("QT-9".into()))
            .expect("document");
        assert_eq!(doc.quotation_number.as_str(), "QT-9");

        let doc = svc
            .item_document(customer, &item, Some("  ".into()))
            .expect("document");
        assert!(doc.quotation_number.as_str().starts_with("LAB-"));
    }

    #[test]
    fn looks_up_builtin_guidelines() {
        let svc = service();
        let entry = svc
            .lookup_guideline("Microbiology & Virology Study", "Zone of Inhibition (ZOI)")
            .expect("entry");
        assert!(entry.price > 0.0);
    }

    #[test]
    fn track_derives_view_from_snapshot() {
        let status = OrderStatus {
            order_approved: Some("2024-01-10".into()),
            ..OrderStatus::default()
        };
        let (view, anomalies) = service().track(&status);
        assert_eq!(view.current_stage, Stage::Procurement);
        assert!(anomalies.iter().any(|a| matches!(a, ChronologyAnomaly::Gap { .. })));
    }

    #[test]
    fn track_accepts_non_string_checkpoint_values() {
        let status = OrderStatus::parse(r#"{"delivered": 1704067200000}"#).expect("parse");
        let (view, anomalies) = service().track(&status);
        assert_eq!(view.current_stage, Stage::Delivery);
        assert!(anomalies
            .iter()
            .any(|a| matches!(a, ChronologyAnomaly::MalformedTimestamp { .. })));

        let status = OrderStatus::parse(
            r#"{"documentVerification": true, "orderApproved": "2024-01-01"}"#,
        )
        .expect("parse");
        assert_eq!(service().track(&status).0.current_stage, Stage::Procurement);
    }
}
