//! Order items and fulfilment status as received from the portal.
//!
//! These records are produced elsewhere (cart finalisation, back-office updates) and are only
//! interpreted here; nothing in this crate mutates them.

use crate::constants::MICROBIOLOGY_STUDY_TYPE;
use crate::stages::{Checkpoint, Stage};
use crate::{PortalError, PortalResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use lab_types::SampleCount;
use serde::{Deserialize, Serialize};

/// One quoted or purchased study configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(default)]
    pub quotation_number: String,

    #[serde(default)]
    pub study_type: String,

    /// Priced amount for this item. Whether GST is included depends on the call site.
    #[serde(alias = "amount")]
    pub base_amount: f64,

    /// Raw count as supplied; validated when the item is priced.
    pub number_of_samples: i64,

    #[serde(default)]
    pub selected_guidelines: Vec<String>,

    #[serde(default)]
    pub selected_studies: Vec<String>,

    #[serde(default)]
    pub order_status: Option<OrderStatus>,
}

/// Which list drives line-item decomposition for an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection<'a> {
    /// Microbiology items; the list may be empty.
    Studies(&'a [String]),
    /// Any other study type with at least one guideline selected.
    Guidelines(&'a [String]),
    /// Nothing selected; the item is priced as one line named after its study type.
    None { study_type: &'a str },
}

impl OrderItem {
    /// The selection that drives decomposition, chosen by the study-type discriminator.
    pub fn selection(&self) -> Selection<'_> {
        if self.study_type.trim() == MICROBIOLOGY_STUDY_TYPE {
            Selection::Studies(&self.selected_studies)
        } else if !self.selected_guidelines.is_empty() {
            Selection::Guidelines(&self.selected_guidelines)
        } else {
            Selection::None {
                study_type: &self.study_type,
            }
        }
    }

    /// Validated sample count.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::InvalidQuantity` when `number_of_samples` is below 1.
    pub fn sample_count(&self) -> PortalResult<SampleCount> {
        Ok(SampleCount::new(self.number_of_samples)?)
    }

    /// Parse a JSON array of order items.
    pub fn parse_list(json: &str) -> PortalResult<Vec<OrderItem>> {
        serde_json::from_str(json).map_err(PortalError::Deserialization)
    }
}

/// Structured form of a checkpoint value, as written by the document-verification step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StructuredTimestamp {
    #[serde(default)]
    pub datetime: Option<String>,

    /// Anything else stored alongside the timestamp (uploaded file references and the like).
    #[serde(flatten)]
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A checkpoint value that may be stored either as a bare timestamp or as an object.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CheckpointValue {
    #[default]
    Absent,
    Raw(String),
    Structured(StructuredTimestamp),
}

impl CheckpointValue {
    /// Effective timestamp: `datetime` for the structured form, the scalar otherwise.
    pub fn timestamp(&self) -> Option<&str> {
        match self {
            CheckpointValue::Absent => None,
            CheckpointValue::Raw(value) => Some(value),
            CheckpointValue::Structured(structured) => structured.datetime.as_deref(),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, CheckpointValue::Absent)
    }
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum CheckpointValueWire {
    Raw(String),
    Structured(StructuredTimestamp),
    Other(serde_json::Value),
}

impl Serialize for CheckpointValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            CheckpointValue::Absent => serializer.serialize_none(),
            CheckpointValue::Raw(value) => serializer.serialize_str(value),
            CheckpointValue::Structured(structured) => structured.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for CheckpointValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(match Option::<CheckpointValueWire>::deserialize(deserializer)? {
            None => CheckpointValue::Absent,
            Some(CheckpointValueWire::Raw(value)) => CheckpointValue::Raw(value),
            Some(CheckpointValueWire::Structured(structured)) => {
                CheckpointValue::Structured(structured)
            }
            Some(CheckpointValueWire::Other(value)) => CheckpointValue::Raw(value.to_string()),
        })
    }
}

/// Fulfilment timestamps. Every field is optional and populated by back-office staff as the
/// order progresses.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct OrderStatus {
    #[serde(deserialize_with = "lenient_timestamp")]
    pub protocol_request: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub protocol_acceptance: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub order_booked: Option<String>,
    #[serde(skip_serializing_if = "CheckpointValue::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub document_verification: CheckpointValue,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub order_approved: Option<String>,

    #[serde(deserialize_with = "lenient_timestamp")]
    pub procurement_protocol_request: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub procurement_protocol_acceptance: Option<String>,

    #[serde(deserialize_with = "lenient_timestamp")]
    pub technical_project_initiated: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub technical_in_progress: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub technical_in_review: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub technical_finance_approval: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub technical_draft_report: Option<String>,

    #[serde(deserialize_with = "lenient_timestamp")]
    pub delivery_final_report: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub delivered: Option<String>,
}

/// Accepts any non-null JSON value as a stored timestamp. Non-string values are kept as
/// their JSON text so they still count as present and are reported as malformed.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(value)) => Some(value),
        Some(other) => Some(other.to_string()),
    })
}

/// Something odd about the timestamps of one stage. Reported, never corrected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChronologyAnomaly {
    /// Present but not a recognisable date. Still counts as completed.
    MalformedTimestamp { checkpoint: Checkpoint, value: String },
    /// Earlier than the closest preceding present checkpoint in the same stage.
    OutOfOrder {
        checkpoint: Checkpoint,
        previous: Checkpoint,
    },
    /// Present while an earlier checkpoint in the same stage is absent.
    Gap {
        checkpoint: Checkpoint,
        missing: Checkpoint,
    },
}

impl OrderStatus {
    /// Parse an `OrderStatus` from JSON text.
    pub fn parse(json: &str) -> PortalResult<Self> {
        serde_json::from_str(json).map_err(PortalError::Deserialization)
    }

    /// Effective timestamp of `checkpoint`, after normalising `documentVerification`.
    pub fn timestamp(&self, checkpoint: Checkpoint) -> Option<&str> {
        match checkpoint {
            Checkpoint::ProtocolRequest => self.protocol_request.as_deref(),
            Checkpoint::ProtocolAcceptance => self.protocol_acceptance.as_deref(),
            Checkpoint::OrderBooked => self.order_booked.as_deref(),
            Checkpoint::DocumentVerification => self.document_verification.timestamp(),
            Checkpoint::OrderApproved => self.order_approved.as_deref(),
            Checkpoint::ProcurementProtocolRequest => self.procurement_protocol_request.as_deref(),
            Checkpoint::ProcurementProtocolAcceptance => {
                self.procurement_protocol_acceptance.as_deref()
            }
            Checkpoint::TechnicalProjectInitiated => self.technical_project_initiated.as_deref(),
            Checkpoint::TechnicalInProgress => self.technical_in_progress.as_deref(),
            Checkpoint::TechnicalInReview => self.technical_in_review.as_deref(),
            Checkpoint::TechnicalFinanceApproval => self.technical_finance_approval.as_deref(),
            Checkpoint::TechnicalDraftReport => self.technical_draft_report.as_deref(),
            Checkpoint::DeliveryFinalReport => self.delivery_final_report.as_deref(),
            Checkpoint::Delivered => self.delivered.as_deref(),
        }
    }

    /// Presence check only; any stored value counts, parseable or not.
    pub fn is_present(&self, checkpoint: Checkpoint) -> bool {
        self.timestamp(checkpoint).is_some()
    }

    /// Walk every stage and report malformed, out-of-order and gapped timestamps.
    pub fn chronology_anomalies(&self) -> Vec<ChronologyAnomaly> {
        let mut anomalies = Vec::new();

        for stage in Stage::ALL {
            let mut last_parsed: Option<(Checkpoint, DateTime<Utc>)> = None;
            let mut first_missing: Option<Checkpoint> = None;

            for &checkpoint in stage.checkpoints() {
                let Some(raw) = self.timestamp(checkpoint) else {
                    first_missing.get_or_insert(checkpoint);
                    continue;
                };

                if let Some(missing) = first_missing {
                    anomalies.push(ChronologyAnomaly::Gap {
                        checkpoint,
                        missing,
                    });
                }

                match parse_timestamp(raw) {
                    Some(instant) => {
                        if let Some((previous, previous_instant)) = last_parsed {
                            if instant < previous_instant {
                                anomalies.push(ChronologyAnomaly::OutOfOrder {
                                    checkpoint,
                                    previous,
                                });
                            }
                        }
                        last_parsed = Some((checkpoint, instant));
                    }
                    None => anomalies.push(ChronologyAnomaly::MalformedTimestamp {
                        checkpoint,
                        value: raw.to_string(),
                    }),
                }
            }
        }

        anomalies
    }
}

/// Parse an ISO-8601 instant, a naive date-time, or a bare date (taken as midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
