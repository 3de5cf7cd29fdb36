//! Guideline catalog wire models, translation helpers and lookups.
//!
//! Responsibilities:
//! - Define public domain-level types for catalog entries
//! - Define a strict wire model for the YAML catalog file
//! - Validate structure (unique names, finite non-negative prices)
//! - Answer `(category, study)` lookups by linear scan over the table

use crate::{CatalogError, CatalogResult};
use lab_types::{NonEmptyText, SampleCount};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Catalog shipped with the crate.
const BUILTIN_CATALOG_YAML: &str = include_str!("../data/guidelines.yaml");

// ============================================================================
// Public domain-level types
// ============================================================================

/// A single orderable guideline or study and its list price.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GuidelineEntry {
    /// Display name, also the lookup key within its category.
    pub name: NonEmptyText,

    /// Price per sample, excluding GST.
    pub price: f64,

    /// Expected turnaround, free text (for example "7 working days").
    pub duration: String,

    /// Accepted deviation of the result, free text.
    pub deviation: String,
}

/// A study category together with its guidelines.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CatalogCategory {
    pub name: NonEmptyText,
    pub studies: Vec<GuidelineEntry>,
}

/// Catalog-derived base amount for a selection of studies.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    /// Sum of `price × samples` over the selected studies, excluding GST.
    pub base_amount: f64,

    /// The entries that contributed, in selection order.
    pub entries: Vec<GuidelineEntry>,
}

/// Read-only guideline catalog.
#[derive(Clone, Debug, PartialEq)]
pub struct GuidelineCatalog {
    categories: Vec<CatalogCategory>,
}

impl GuidelineCatalog {
    /// Parse a catalog from YAML text.
    ///
    /// This uses `serde_path_to_error` to surface the path to the failing field (for example
    /// `categories[0].studies[2].price`) when the YAML does not match the wire schema.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if:
    /// - the YAML does not match the wire schema or carries unknown keys,
    /// - a name is empty or duplicated within its scope,
    /// - a price is negative or not finite.
    pub fn parse(yaml_text: &str) -> CatalogResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

        let wire = match serde_path_to_error::deserialize::<_, CatalogWire>(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(CatalogError::Translation(format!(
                    "Guideline catalog schema mismatch at {path}: {source}"
                )));
            }
        };

        wire_to_domain(wire)
    }

    /// Load and parse a catalog file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the file cannot be read, or any error from [`Self::parse`].
    pub fn load(path: &Path) -> CatalogResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let catalog = Self::parse(&text)?;
        tracing::info!(
            "loaded guideline catalog from {} ({} categories)",
            path.display(),
            catalog.categories.len()
        );
        Ok(catalog)
    }

    /// The catalog compiled into this crate.
    ///
    /// # Errors
    ///
    /// Only fails if the embedded YAML is malformed, which the crate's tests guard against.
    pub fn builtin() -> CatalogResult<Self> {
        Self::parse(BUILTIN_CATALOG_YAML)
    }

    /// Render the catalog as YAML text in the same wire format [`Self::parse`] accepts.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Translation`] if serialisation fails.
    pub fn render(&self) -> CatalogResult<String> {
        let wire = domain_to_wire(self);
        serde_yaml::to_string(&wire)
            .map_err(|e| CatalogError::Translation(format!("Failed to serialize catalog: {e}")))
    }

    pub fn categories(&self) -> &[CatalogCategory] {
        &self.categories
    }

    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    /// Studies listed under `category`, or `None` if the category is unknown.
    pub fn studies(&self, category: &str) -> Option<&[GuidelineEntry]> {
        self.find_category(category).map(|c| c.studies.as_slice())
    }

    /// Look up the entry for `study` under `category`.
    pub fn lookup(&self, category: &str, study: &str) -> Option<&GuidelineEntry> {
        self.find_category(category)?
            .studies
            .iter()
            .find(|entry| entry.name.as_str() == study.trim())
    }

    /// Base amount for running every study in `names` on `samples` samples.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownCategory`] or [`CatalogError::UnknownStudy`] when a key is
    /// not in the table, and [`CatalogError::InvalidInput`] for an empty selection.
    pub fn estimate<S: AsRef<str>>(
        &self,
        category: &str,
        names: &[S],
        samples: SampleCount,
    ) -> CatalogResult<Estimate> {
        if names.is_empty() {
            return Err(CatalogError::InvalidInput(
                "at least one study must be selected".into(),
            ));
        }

        let category_entry = self
            .find_category(category)
            .ok_or_else(|| CatalogError::UnknownCategory(category.to_string()))?;

        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let entry = category_entry
                .studies
                .iter()
                .find(|entry| entry.name.as_str() == name.trim())
                .ok_or_else(|| CatalogError::UnknownStudy {
                    category: category.to_string(),
                    study: name.to_string(),
                })?;
            entries.push(entry.clone());
        }

        let base_amount = entries
            .iter()
            .map(|entry| entry.price * samples.as_f64())
            .sum();

        Ok(Estimate {
            base_amount,
            entries,
        })
    }

    fn find_category(&self, category: &str) -> Option<&CatalogCategory> {
        self.categories
            .iter()
            .find(|c| c.name.as_str() == category.trim())
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct CatalogWire {
    pub categories: Vec<CategoryWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct CategoryWire {
    pub name: String,
    pub studies: Vec<StudyWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct StudyWire {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub deviation: String,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn wire_to_domain(wire: CatalogWire) -> CatalogResult<GuidelineCatalog> {
    let mut categories: Vec<CatalogCategory> = Vec::with_capacity(wire.categories.len());

    for category in wire.categories {
        let name = NonEmptyText::new(&category.name)
            .map_err(|_| CatalogError::InvalidInput("category name cannot be empty".into()))?;

        if categories.iter().any(|c| c.name == name) {
            return Err(CatalogError::InvalidInput(format!(
                "duplicate category: {name}"
            )));
        }

        let mut studies: Vec<GuidelineEntry> = Vec::with_capacity(category.studies.len());
        for study in category.studies {
            let study_name = NonEmptyText::new(&study.name).map_err(|_| {
                CatalogError::InvalidInput(format!("study name cannot be empty in '{name}'"))
            })?;

            if studies.iter().any(|s| s.name == study_name) {
                return Err(CatalogError::InvalidInput(format!(
                    "duplicate study '{study_name}' in '{name}'"
                )));
            }

            if !study.price.is_finite() || study.price < 0.0 {
                return Err(CatalogError::InvalidInput(format!(
                    "price for '{study_name}' must be a non-negative number"
                )));
            }

            studies.push(GuidelineEntry {
                name: study_name,
                price: study.price,
                duration: study.duration,
                deviation: study.deviation,
            });
        }

        categories.push(CatalogCategory { name, studies });
    }

    Ok(GuidelineCatalog { categories })
}

fn domain_to_wire(catalog: &GuidelineCatalog) -> CatalogWire {
    CatalogWire {
        categories: catalog
            .categories
            .iter()
            .map(|category| CategoryWire {
                name: category.name.to_string(),
                studies: category
                    .studies
                    .iter()
                    .map(|study| StudyWire {
                        name: study.name.to_string(),
                        price: study.price,
                        duration: study.duration.clone(),
                        deviation: study.deviation.clone(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"categories:
  - name: "Microbiology & Virology Study"
    studies:
      - name: "Zone of Inhibition (ZOI)"
        price: 2500
        duration: "7 working days"
        deviation: "Not applicable"
      - name: "Minimum Inhibitory Concentration (MIC)"
        price: 4500
        duration: "10 working days"
        deviation: "± 1 dilution"
  - name: "Invitro Study"
    studies:
      - name: "Cytotoxicity (ISO 10993-5)"
        price: 15000
        duration: "3 weeks"
        deviation: "± 10% viability"
"#;

    fn samples(n: i64) -> SampleCount {
        SampleCount::new(n).expect("valid sample count")
    }

    #[test]
    fn builtin_catalog_parses() {
        let catalog = GuidelineCatalog::builtin().expect("builtin catalog");
        assert!(catalog
            .category_names()
            .contains(&"Microbiology & Virology Study"));
        assert!(catalog
            .lookup("Invitro Study", "Cytotoxicity (ISO 10993-5)")
            .is_some());
    }

    #[test]
    fn lookup_returns_price_duration_and_deviation() {
        let catalog = GuidelineCatalog::parse(SAMPLE).expect("parse yaml");
        let entry = catalog
            .lookup("Microbiology & Virology Study", "Zone of Inhibition (ZOI)")
            .expect("entry exists");

        assert_eq!(entry.price, 2500.0);
        assert_eq!(entry.duration, "7 working days");
        assert_eq!(entry.deviation, "Not applicable");
    }

    #[test]
    fn lookup_misses_unknown_keys() {
        let catalog = GuidelineCatalog::parse(SAMPLE).expect("parse yaml");
        assert!(catalog.lookup("Toxicity Study", "anything").is_none());
        assert!(catalog.lookup("Invitro Study", "Zone of Inhibition (ZOI)").is_none());
    }

    #[test]
    fn round_trips_sample_yaml() {
        let catalog = GuidelineCatalog::parse(SAMPLE).expect("parse yaml");
        let output = catalog.render().expect("render catalog");
        let reparsed = GuidelineCatalog::parse(&output).expect("reparse yaml");
        assert_eq!(catalog, reparsed);
    }

    #[test]
    fn strict_validation_rejects_unknown_keys() {
        let input = SAMPLE.replace("        deviation: \"Not applicable\"", "        discount: 10");

        let err = GuidelineCatalog::parse(&input).expect_err("should reject unknown key");
        match err {
            CatalogError::Translation(msg) => {
                assert!(msg.contains("discount"));
            }
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn strict_validation_reports_path_of_wrong_type() {
        let input = SAMPLE.replace("price: 4500", "price: \"a lot\"");

        let err = GuidelineCatalog::parse(&input).expect_err("should reject wrong type");
        match err {
            CatalogError::Translation(msg) => {
                assert!(msg.contains("categories[0].studies[1].price"), "{msg}");
            }
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_duplicate_study_names() {
        let input = SAMPLE.replace(
            "Minimum Inhibitory Concentration (MIC)",
            "Zone of Inhibition (ZOI)",
        );

        let err = GuidelineCatalog::parse(&input).expect_err("should reject duplicate");
        assert!(matches!(err, CatalogError::InvalidInput(msg) if msg.contains("duplicate study")));
    }

    #[test]
    fn rejects_negative_price() {
        let input = SAMPLE.replace("price: 15000", "price: -1");

        let err = GuidelineCatalog::parse(&input).expect_err("should reject negative price");
        assert!(matches!(err, CatalogError::InvalidInput(_)));
    }

    #[test]
    fn estimate_sums_prices_times_samples() {
        let catalog = GuidelineCatalog::parse(SAMPLE).expect("parse yaml");
        let estimate = catalog
            .estimate(
                "Microbiology & Virology Study",
                &["Zone of Inhibition (ZOI)", "Minimum Inhibitory Concentration (MIC)"],
                samples(3),
            )
            .expect("estimate");

        assert_eq!(estimate.base_amount, (2500.0 + 4500.0) * 3.0);
        assert_eq!(estimate.entries.len(), 2);
        assert_eq!(estimate.entries[1].name.as_str(), "Minimum Inhibitory Concentration (MIC)");
    }

    #[test]
    fn estimate_rejects_unknown_study() {
        let catalog = GuidelineCatalog::parse(SAMPLE).expect("parse yaml");
        let err = catalog
            .estimate("Invitro Study", &["Ames Test"], samples(1))
            .expect_err("unknown study");

        match err {
            CatalogError::UnknownStudy { category, study } => {
                assert_eq!(category, "Invitro Study");
                assert_eq!(study, "Ames Test");
            }
            other => panic!("expected UnknownStudy, got {other:?}"),
        }
    }

    #[test]
    fn estimate_rejects_unknown_category_and_empty_selection() {
        let catalog = GuidelineCatalog::parse(SAMPLE).expect("parse yaml");

        assert!(matches!(
            catalog.estimate("Toxicity Study", &["x"], samples(1)),
            Err(CatalogError::UnknownCategory(_))
        ));
        assert!(matches!(
            catalog.estimate::<&str>("Invitro Study", &[], samples(1)),
            Err(CatalogError::InvalidInput(_))
        ));
    }

    #[test]
    fn load_reads_override_file() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("catalog.yaml");
        std::fs::write(&path, SAMPLE).expect("write catalog");

        let catalog = GuidelineCatalog::load(&path).expect("load catalog");
        assert_eq!(catalog.categories().len(), 2);

        let missing = GuidelineCatalog::load(&dir.path().join("missing.yaml"));
        assert!(matches!(missing, Err(CatalogError::Io(_))));
    }
}
