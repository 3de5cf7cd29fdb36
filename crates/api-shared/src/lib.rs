//! # API Shared
//!
//! Shared request and response definitions for the lab portal APIs.
//!
//! Contains:
//! - Wire types for the REST endpoints, with OpenAPI schemas
//! - Shared services like `HealthService`
//!
//! Used by `api-rest`; the `lab` CLI serialises the `lab-core` records directly.

pub mod health;

pub use health::HealthService;

use catalog::{CatalogCategory, GuidelineEntry};
use lab_core::{ChronologyAnomaly, Customer, OrderItem, StageView};
use lab_files::UploadOutcome;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct CatalogRes {
    pub categories: Vec<CatalogCategory>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct GuidelineRes {
    pub category: String,
    pub entry: GuidelineEntry,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EstimateReq {
    pub category: String,
    pub studies: Vec<String>,
    pub number_of_samples: i64,
}

/// Items of one cart group. Amounts include GST.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CartReq {
    pub items: Vec<OrderItem>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct StageRes {
    pub view: StageView,
    /// Timeline oddities; reported only, the view is derived regardless.
    pub anomalies: Vec<ChronologyAnomaly>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemDocumentReq {
    pub customer: Customer,
    pub item: OrderItem,
    /// Existing number to print; a new one is issued when absent or blank.
    #[serde(default)]
    pub quotation_number: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartDocumentReq {
    pub customer: Customer,
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub quotation_number: Option<String>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct UploadRes {
    pub data: Vec<UploadOutcome>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeleteRes {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_reports_alive() {
        let res = HealthService::check_health();
        assert!(res.ok);
        assert!(!res.message.is_empty());
    }

    #[test]
    fn document_request_accepts_portal_json() {
        let req: ItemDocumentReq = serde_json::from_value(serde_json::json!({
            "customer": { "name": "Dr. A. Rao", "email": "a.rao@example.com" },
            "item": {
                "studyType": "Toxicity Study",
                "amount": 2500,
                "numberOfSamples": 2,
                "selectedGuidelines": ["OECD 423"]
            }
        }))
        .expect("request");

        assert!(req.quotation_number.is_none());
        assert_eq!(req.item.base_amount, 2500.0);
        assert_eq!(req.item.selected_guidelines, vec!["OECD 423".to_string()]);
    }
}
