//! Quotation pricing.
//!
//! Two base-amount conventions are in use and are deliberately kept apart:
//!
//! - [`price_from_base_amount`]: the item amount excludes GST. GST and the grand total are each
//!   rounded independently, so `amount + gst` need not equal the grand total. Used for
//!   single-item previews and quotations.
//! - [`price_from_grand_total`] / [`price_cart_group`]: the amount already includes GST. The
//!   subtotal is backed out by dividing by 1.18 and GST is the residual, so the two always add
//!   up to the grand total. Used when a cart group is downloaded as one document.
//!
//! Line items are derived the same way under both conventions, by splitting the item amount
//! evenly across the selected names and then across samples. All divisions round to the
//! nearest whole currency unit, halves away from zero.

use crate::constants::{
    GST_INCLUSIVE_FACTOR, GST_PERCENT, GST_RATE, MICROBIOLOGY_FALLBACK_NAME, UNNAMED_STUDY_NAME,
};
use crate::order::{OrderItem, Selection};
use crate::validation::validate_amount;
use crate::{PortalError, PortalResult};
use lab_types::SampleCount;
use serde::Serialize;

/// One priced row of a quotation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub name: String,
    pub qty: SampleCount,
    pub unit_price: f64,
    pub total_price: f64,
}

/// Convention B result for a single item.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct BaseAmountQuote {
    pub line_items: Vec<LineItem>,
    pub sub_total: f64,
    pub gst_percent: u32,
    pub gst_amount: f64,
    pub grand_total: f64,
}

/// Convention A split of a tax-inclusive total.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct GrandTotalSplit {
    pub sub_total: f64,
    pub gst_amount: f64,
    pub grand_total: f64,
}

/// Line items of one item within a cart group.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PricedItem {
    pub quotation_number: String,
    pub study_type: String,
    pub line_items: Vec<LineItem>,
}

/// Convention A result for a group of cart items.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CartGroupQuote {
    pub items: Vec<PricedItem>,

    /// Split of the summed item amounts.
    pub totals: GrandTotalSplit,

    /// `Σ unitPrice × qty` over every line item. Printed as the document subtotal and not
    /// reconciled with `totals.sub_total`; the two can differ by rounding.
    pub document_sub_total: f64,

    pub gst_percent: u32,
}

impl LineItem {
    /// `unit_price × qty`, the amount a line contributes to a recomputed subtotal.
    pub fn extended_price(&self) -> f64 {
        self.unit_price * self.qty.as_f64()
    }
}

/// Split `base` into line items according to `selection`.
///
/// Named selections get `round(base / k)` per name and `round(that / samples)` per sample.
/// Without names the item becomes a single line priced at `round(base / samples)` per sample.
pub fn decompose(selection: Selection<'_>, base: f64, samples: SampleCount) -> Vec<LineItem> {
    match selection {
        Selection::Studies(names) | Selection::Guidelines(names) if !names.is_empty() => {
            let price_per_name = (base / names.len() as f64).round();
            let unit_price = (price_per_name / samples.as_f64()).round();

            names
                .iter()
                .map(|name| LineItem {
                    name: name.clone(),
                    qty: samples,
                    unit_price,
                    total_price: price_per_name,
                })
                .collect()
        }
        Selection::Studies(_) => vec![single_line(MICROBIOLOGY_FALLBACK_NAME, base, samples)],
        Selection::Guidelines(_) => vec![single_line(UNNAMED_STUDY_NAME, base, samples)],
        Selection::None { study_type } => {
            let name = if study_type.trim().is_empty() {
                tracing::debug!("item has no selection and no study type");
                UNNAMED_STUDY_NAME
            } else {
                study_type.trim()
            };
            vec![single_line(name, base, samples)]
        }
    }
}

fn single_line(name: &str, base: f64, samples: SampleCount) -> LineItem {
    LineItem {
        name: name.to_string(),
        qty: samples,
        unit_price: (base / samples.as_f64()).round(),
        total_price: base.round(),
    }
}

/// Line items for `item`, using its amount as the base.
///
/// # Errors
///
/// Returns `PortalError::InvalidQuantity` for a sample count below 1 and
/// `PortalError::InvalidAmount` for a negative or non-finite amount.
pub fn line_items(item: &OrderItem) -> PortalResult<Vec<LineItem>> {
    let samples = item.sample_count()?;
    let base = validate_amount(item.base_amount)?;
    Ok(decompose(item.selection(), base, samples))
}

/// Price one item whose amount excludes GST.
///
/// # Errors
///
/// Same as [`line_items`].
pub fn price_from_base_amount(item: &OrderItem) -> PortalResult<BaseAmountQuote> {
    let line_items = line_items(item)?;
    let amount = item.base_amount;

    let quote = BaseAmountQuote {
        line_items,
        sub_total: amount,
        gst_percent: GST_PERCENT,
        gst_amount: (amount * GST_RATE).round(),
        grand_total: (amount * GST_INCLUSIVE_FACTOR).round(),
    };

    tracing::debug!(
        "priced item {} from base amount {}: gst {}, total {}",
        item.quotation_number,
        amount,
        quote.gst_amount,
        quote.grand_total
    );

    Ok(quote)
}

/// Split a GST-inclusive total into subtotal and GST.
///
/// # Errors
///
/// Returns `PortalError::InvalidAmount` for a negative or non-finite total.
pub fn price_from_grand_total(grand_total: f64) -> PortalResult<GrandTotalSplit> {
    let grand_total = validate_amount(grand_total)?;
    let sub_total = (grand_total / GST_INCLUSIVE_FACTOR).round();

    Ok(GrandTotalSplit {
        sub_total,
        gst_amount: grand_total - sub_total,
        grand_total,
    })
}

/// Price a group of cart items whose amounts include GST.
///
/// # Errors
///
/// Returns `PortalError::EmptyCartGroup` for an empty slice, otherwise the first item error
/// from [`line_items`].
pub fn price_cart_group(items: &[OrderItem]) -> PortalResult<CartGroupQuote> {
    if items.is_empty() {
        return Err(PortalError::EmptyCartGroup);
    }

    let mut priced = Vec::with_capacity(items.len());
    let mut grand_total = 0.0;
    for item in items {
        let line_items = line_items(item)?;
        grand_total += item.base_amount;
        priced.push(PricedItem {
            quotation_number: item.quotation_number.clone(),
            study_type: item.study_type.clone(),
            line_items,
        });
    }

    let totals = price_from_grand_total(grand_total)?;
    let document_sub_total = priced
        .iter()
        .flat_map(|item| item.line_items.iter())
        .map(LineItem::extended_price)
        .sum();

    if document_sub_total != totals.sub_total {
        tracing::debug!(
            "cart group document subtotal {} differs from amount-derived subtotal {}",
            document_sub_total,
            totals.sub_total
        );
    }

    Ok(CartGroupQuote {
        items: priced,
        totals,
        document_sub_total,
        gst_percent: GST_PERCENT,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MICROBIOLOGY_STUDY_TYPE;

    fn item(study_type: &str, amount: f64, samples: i64, guidelines: &[&str]) -> OrderItem {
        OrderItem {
            quotation_number: "QT-20240101-0000AAAA".into(),
            study_type: study_type.into(),
            base_amount: amount,
            number_of_samples: samples,
            selected_guidelines: guidelines.iter().map(|s| s.to_string()).collect(),
            selected_studies: Vec::new(),
            order_status: None,
        }
    }

    fn samples(n: i64) -> SampleCount {
        SampleCount::new(n).expect("valid sample count")
    }

    #[test]
    fn splits_amount_evenly_across_names() {
        let names: Vec<String> = ["ZOI", "MIC", "MBC"].iter().map(|s| s.to_string()).collect();
        let lines = decompose(Selection::Studies(&names), 7500.0, samples(1));

        assert_eq!(lines.len(), 3);
        for line in &lines {
            assert_eq!(line.total_price, 2500.0);
            assert_eq!(line.unit_price, 2500.0);
            assert_eq!(line.qty.get(), 1);
        }
        assert_eq!(lines[2].name, "MBC");
    }

    #[test]
    fn per_name_sum_is_rounded_share_times_count() {
        let names: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let lines = decompose(Selection::Guidelines(&names), 1000.0, samples(1));

        let sum: f64 = lines.iter().map(|l| l.total_price).sum();
        assert_eq!(sum, 333.0 * 3.0);
        assert!((1000.0 - sum).abs() <= (names.len() - 1) as f64);
    }

    #[test]
    fn unit_price_divides_by_samples() {
        let names = vec!["Cytotoxicity (ISO 10993-5)".to_string()];
        let lines = decompose(Selection::Guidelines(&names), 7000.0, samples(3));

        assert_eq!(lines[0].total_price, 7000.0);
        assert_eq!(lines[0].unit_price, 2333.0);
        assert_eq!(lines[0].qty.get(), 3);
    }

    #[test]
    fn rounds_halves_away_from_zero() {
        let names: Vec<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let lines = decompose(Selection::Guidelines(&names), 5.0, samples(1));
        assert_eq!(lines[0].total_price, 3.0);

        let lines = decompose(Selection::None { study_type: "X" }, 5.0, samples(2));
        assert_eq!(lines[0].unit_price, 3.0);
    }

    #[test]
    fn falls_back_to_study_type_line() {
        let quote = price_from_base_amount(&item("X", 4000.0, 4, &[])).expect("price");

        assert_eq!(quote.line_items.len(), 1);
        let line = &quote.line_items[0];
        assert_eq!(line.name, "X");
        assert_eq!(line.qty.get(), 4);
        assert_eq!(line.unit_price, 1000.0);
    }

    #[test]
    fn microbiology_without_studies_uses_fixed_name() {
        let mut micro = item(MICROBIOLOGY_STUDY_TYPE, 3000.0, 2, &["ignored guideline"]);
        micro.selected_studies.clear();

        let lines = line_items(&micro).expect("line items");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].name, MICROBIOLOGY_FALLBACK_NAME);
        assert_eq!(lines[0].unit_price, 1500.0);
    }

    #[test]
    fn missing_selection_and_study_type_is_unnamed() {
        let lines = line_items(&item("   ", 900.0, 3, &[])).expect("line items");
        assert_eq!(lines[0].name, UNNAMED_STUDY_NAME);
        assert_eq!(lines[0].unit_price, 300.0);
    }

    #[test]
    fn zero_samples_is_invalid_quantity() {
        let err = price_from_base_amount(&item("X", 4000.0, 0, &[])).expect_err("zero samples");
        assert!(matches!(err, PortalError::InvalidQuantity(_)));

        let err = price_cart_group(&[item("X", 4000.0, 0, &[])]).expect_err("zero samples");
        assert!(matches!(err, PortalError::InvalidQuantity(_)));
    }

    #[test]
    fn negative_amount_is_rejected() {
        let err = price_from_base_amount(&item("X", -1.0, 1, &[])).expect_err("negative");
        assert!(matches!(err, PortalError::InvalidAmount(_)));
        assert!(price_from_grand_total(f64::NAN).is_err());
    }

    #[test]
    fn base_amount_convention_rounds_gst_and_total_independently() {
        let quote = price_from_base_amount(&item("X", 100.5, 1, &[])).expect("price");

        assert_eq!(quote.gst_percent, 18);
        assert_eq!(quote.gst_amount, 18.0);
        assert_eq!(quote.grand_total, 119.0);
        assert_ne!(quote.sub_total + quote.gst_amount, quote.grand_total);
    }

    #[test]
    fn base_amount_convention_whole_amounts() {
        let quote = price_from_base_amount(&item("X", 10000.0, 1, &["a"])).expect("price");
        assert_eq!(quote.sub_total, 10000.0);
        assert_eq!(quote.gst_amount, 1800.0);
        assert_eq!(quote.grand_total, 11800.0);
    }

    #[test]
    fn grand_total_convention_adds_up_exactly() {
        for grand_total in (0..5000).map(|n| n as f64 * 7.0).chain([0.5, 1.0, 99.99, 118.0]) {
            let split = price_from_grand_total(grand_total).expect("split");
            assert_eq!(
                split.sub_total + split.gst_amount,
                split.grand_total,
                "grand total {grand_total}"
            );
        }

        let split = price_from_grand_total(11800.0).expect("split");
        assert_eq!(split.sub_total, 10000.0);
        assert_eq!(split.gst_amount, 1800.0);
    }

    #[test]
    fn cart_group_sums_amounts_and_recomputes_document_subtotal() {
        let items = vec![
            item("Invitro Study", 1000.0, 7, &["a", "b", "c"]),
            item("Toxicity Study", 2360.0, 1, &[]),
        ];

        let quote = price_cart_group(&items).expect("price cart");

        assert_eq!(quote.totals.grand_total, 3360.0);
        assert_eq!(quote.totals.sub_total, (3360.0_f64 / 1.18).round());
        assert_eq!(quote.items.len(), 2);
        assert_eq!(quote.items[0].line_items.len(), 3);

        // 1000 / 3 -> 333 per name, / 7 -> 48 per sample; 48 * 7 * 3 = 1008, plus 2360.
        assert_eq!(quote.document_sub_total, 1008.0 + 2360.0);
        assert_ne!(quote.document_sub_total, quote.totals.sub_total);
    }

    #[test]
    fn empty_cart_group_is_rejected() {
        assert!(matches!(
            price_cart_group(&[]),
            Err(PortalError::EmptyCartGroup)
        ));
    }

    #[test]
    fn serialises_with_portal_names() {
        let quote = price_from_base_amount(&item("X", 4000.0, 4, &[])).expect("price");
        let json = serde_json::to_value(&quote).expect("serialise");

        assert_eq!(json["grandTotal"], 4720.0);
        assert_eq!(json["lineItems"][0]["unitPrice"], 1000.0);
        assert_eq!(json["lineItems"][0]["qty"], 4);
    }
}
