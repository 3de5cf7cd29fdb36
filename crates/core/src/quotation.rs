//! Quotation numbers and quotation documents.
//!
//! A [`QuotationDocument`] is the structured payload handed to the external PDF service. It is
//! built from one item (base-amount convention) or from a cart group (grand-total convention);
//! see [`crate::pricing`] for the arithmetic.

use crate::order::OrderItem;
use crate::pricing::{price_cart_group, price_from_base_amount, LineItem};
use crate::validation::validate_quotation_prefix;
use crate::{PortalError, PortalResult};
use chrono::NaiveDate;
use lab_types::{NonEmptyText, SampleCount};
use serde::{Deserialize, Serialize};

/// Human-facing quotation identifier. Immutable once issued.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct QuotationNumber(NonEmptyText);

impl QuotationNumber {
    /// Issue a new number of the form `PREFIX-YYYYMMDD-XXXXXXXX`.
    ///
    /// The suffix is the first eight hex digits of a random v4 UUID, upper-cased.
    pub fn issue(prefix: &str, date: NaiveDate) -> PortalResult<Self> {
        validate_quotation_prefix(prefix)?;

        let random = uuid::Uuid::new_v4().simple().to_string();
        let number = format!(
            "{}-{}-{}",
            prefix,
            date.format("%Y%m%d"),
            random[..8].to_uppercase()
        );

        NonEmptyText::new(number)
            .map(Self)
            .map_err(|e| PortalError::InvalidQuotationNumber(e.to_string()))
    }

    /// Accept an existing number as issued elsewhere.
    ///
    /// Numbers are opaque once issued, so only emptiness is checked.
    pub fn parse(input: &str) -> PortalResult<Self> {
        NonEmptyText::new(input)
            .map(Self)
            .map_err(|_| PortalError::InvalidQuotationNumber("quotation number is empty".into()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for QuotationNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Customer block printed at the top of a quotation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub name: String,
    #[serde(default)]
    pub organisation: Option<String>,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// One product row on the document.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct DocumentProduct {
    pub study_type: String,
    pub name: String,
    pub qty: SampleCount,
    pub unit_price: f64,
    pub total_price: f64,
}

/// Totals block of the document.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub sub_total: f64,
    pub gst_percent: u32,
    pub gst_amount: f64,
    pub grand_total: f64,
}

/// Payload for the PDF generation service.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct QuotationDocument {
    pub quotation_number: QuotationNumber,
    pub issued_on: NaiveDate,
    pub customer: Customer,
    pub products: Vec<DocumentProduct>,
    pub summary: DocumentSummary,
}

impl QuotationDocument {
    /// Document for a single item whose amount excludes GST.
    pub fn for_item(
        customer: Customer,
        item: &OrderItem,
        quotation_number: QuotationNumber,
        issued_on: NaiveDate,
    ) -> PortalResult<Self> {
        let quote = price_from_base_amount(item)?;

        Ok(Self {
            quotation_number,
            issued_on,
            customer,
            products: products_for(&item.study_type, &quote.line_items),
            summary: DocumentSummary {
                sub_total: quote.sub_total,
                gst_percent: quote.gst_percent,
                gst_amount: quote.gst_amount,
                grand_total: quote.grand_total,
            },
        })
    }

    /// Combined document for a cart group whose amounts include GST.
    ///
    /// The printed subtotal is the recomputed sum of line items, while GST and the grand total
    /// come from the summed item amounts.
    pub fn for_cart_group(
        customer: Customer,
        items: &[OrderItem],
        quotation_number: QuotationNumber,
        issued_on: NaiveDate,
    ) -> PortalResult<Self> {
        let quote = price_cart_group(items)?;

        let products = quote
            .items
            .iter()
            .flat_map(|priced| products_for(&priced.study_type, &priced.line_items))
            .collect();

        Ok(Self {
            quotation_number,
            issued_on,
            customer,
            products,
            summary: DocumentSummary {
                sub_total: quote.document_sub_total,
                gst_percent: quote.gst_percent,
                gst_amount: quote.totals.gst_amount,
                grand_total: quote.totals.grand_total,
            },
        })
    }
}

fn products_for(study_type: &str, line_items: &[LineItem]) -> Vec<DocumentProduct> {
    line_items
        .iter()
        .map(|line| DocumentProduct {
            study_type: study_type.to_string(),
            name: line.name.clone(),
            qty: line.qty,
            unit_price: line.unit_price,
            total_price: line.total_price,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> Customer {
        Customer {
            name: "Dr. A. Rao".into(),
            organisation: Some("Rao Textiles".into()),
            email: "a.rao@example.com".into(),
            phone: None,
            address: None,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date")
    }

    fn item(amount: f64, samples: i64, guidelines: &[&str]) -> OrderItem {
        OrderItem {
            quotation_number: "QT-20240315-1A2B3C4D".into(),
            study_type: "Invitro Study".into(),
            base_amount: amount,
            number_of_samples: samples,
            selected_guidelines: guidelines.iter().map(|s| s.to_string()).collect(),
            selected_studies: Vec::new(),
            order_status: None,
        }
    }

    #[test]
    fn issues_numbers_with_prefix_date_and_suffix() {
        let number = QuotationNumber::issue("QT", date()).expect("issue");
        let parts: Vec<&str> = number.as_str().split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "QT");
        assert_eq!(parts[1], "20240315");
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn issued_numbers_differ() {
        let a = QuotationNumber::issue("QT", date()).expect("issue");
        let b = QuotationNumber::issue("QT", date()).expect("issue");
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_bad_prefix_and_empty_number() {
        assert!(matches!(
            QuotationNumber::issue("qt", date()),
            Err(PortalError::InvalidInput(_))
        ));
        assert!(matches!(
            QuotationNumber::parse("  "),
            Err(PortalError::InvalidQuotationNumber(_))
        ));
        assert_eq!(
            QuotationNumber::parse(" QT-1 ").expect("parse").as_str(),
            "QT-1"
        );
    }

    #[test]
    fn item_document_uses_base_amount_convention() {
        let number = QuotationNumber::parse("QT-1").expect("number");
        let doc = QuotationDocument::for_item(customer(), &item(100.5, 1, &[]), number, date())
            .expect("document");

        assert_eq!(doc.products.len(), 1);
        assert_eq!(doc.products[0].name, "Invitro Study");
        assert_eq!(doc.summary.sub_total, 100.5);
        assert_eq!(doc.summary.gst_amount, 18.0);
        assert_eq!(doc.summary.grand_total, 119.0);
        assert_eq!(doc.summary.gst_percent, 18);
    }

    #[test]
    fn cart_document_prints_recomputed_subtotal() {
        let number = QuotationNumber::parse("QT-2").expect("number");
        let items = vec![item(1000.0, 7, &["a", "b", "c"]), item(590.0, 2, &["d"])];

        let doc = QuotationDocument::for_cart_group(customer(), &items, number, date())
            .expect("document");

        assert_eq!(doc.products.len(), 4);
        // 48 * 7 * 3 + 295 * 2
        assert_eq!(doc.summary.sub_total, 1008.0 + 590.0);
        assert_eq!(doc.summary.grand_total, 1590.0);
        assert_eq!(doc.summary.gst_amount, 1590.0 - (1590.0_f64 / 1.18).round());
    }

    #[test]
    fn serialises_summary_for_pdf_service() {
        let number = QuotationNumber::parse("QT-3").expect("number");
        let doc = QuotationDocument::for_item(customer(), &item(4000.0, 4, &[]), number, date())
            .expect("document");
        let json = serde_json::to_value(&doc).expect("serialise");

        assert_eq!(json["quotationNumber"], "QT-3");
        assert_eq!(json["issuedOn"], "2024-03-15");
        assert_eq!(json["summary"]["subTotal"], 4000.0);
        assert_eq!(json["summary"]["gstPercent"], 18);
        assert_eq!(json["products"][0]["unitPrice"], 1000.0);
        assert_eq!(json["customer"]["organisation"], "Rao Textiles");
    }
}
