//! Order-stage derivation.
//!
//! Fulfilment is tracked as four coarse stages, each an ordered list of named checkpoints.
//! Nothing about progress is stored: every call re-derives the view from the current
//! [`OrderStatus`] snapshot.
//!
//! Two independent rules are applied:
//! - The *current stage* is picked by a fixed priority over four checkpoints (see
//!   [`current_stage`]). It is not chronological, so `technicalDraftReport` alone already
//!   selects [`Stage::Delivery`].
//! - Within each stage, checkpoints are classified by a local run rule (see
//!   [`checkpoint_statuses`]): completed ones from the start, then at most one current, then
//!   future.
//!
//! The two rules can disagree, for example a delivery-stage order whose order-stage list still
//! has a current checkpoint. Both results are reported as derived.

use crate::order::OrderStatus;
use serde::{Deserialize, Serialize};

/// Coarse fulfilment phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Order,
    Procurement,
    Technical,
    Delivery,
}

impl Stage {
    /// Stages in pipeline order.
    pub const ALL: [Stage; 4] = [
        Stage::Order,
        Stage::Procurement,
        Stage::Technical,
        Stage::Delivery,
    ];

    /// Checkpoints belonging to this stage, in order.
    pub fn checkpoints(self) -> &'static [Checkpoint] {
        use Checkpoint::*;
        match self {
            Stage::Order => &[
                ProtocolRequest,
                ProtocolAcceptance,
                OrderBooked,
                DocumentVerification,
                OrderApproved,
            ],
            Stage::Procurement => &[ProcurementProtocolRequest, ProcurementProtocolAcceptance],
            Stage::Technical => &[
                TechnicalProjectInitiated,
                TechnicalInProgress,
                TechnicalInReview,
                TechnicalFinanceApproval,
                TechnicalDraftReport,
            ],
            Stage::Delivery => &[DeliveryFinalReport, Delivered],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Order => "Order",
            Stage::Procurement => "Procurement",
            Stage::Technical => "Technical",
            Stage::Delivery => "Delivery",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A named fulfilment milestone. Serialised with the portal's field names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub enum Checkpoint {
    ProtocolRequest,
    ProtocolAcceptance,
    OrderBooked,
    DocumentVerification,
    OrderApproved,
    ProcurementProtocolRequest,
    ProcurementProtocolAcceptance,
    TechnicalProjectInitiated,
    TechnicalInProgress,
    TechnicalInReview,
    TechnicalFinanceApproval,
    TechnicalDraftReport,
    DeliveryFinalReport,
    Delivered,
}

impl Checkpoint {
    pub fn stage(self) -> Stage {
        use Checkpoint::*;
        match self {
            ProtocolRequest | ProtocolAcceptance | OrderBooked | DocumentVerification
            | OrderApproved => Stage::Order,
            ProcurementProtocolRequest | ProcurementProtocolAcceptance => Stage::Procurement,
            TechnicalProjectInitiated | TechnicalInProgress | TechnicalInReview
            | TechnicalFinanceApproval | TechnicalDraftReport => Stage::Technical,
            DeliveryFinalReport | Delivered => Stage::Delivery,
        }
    }

    pub fn label(self) -> &'static str {
        use Checkpoint::*;
        match self {
            ProtocolRequest => "Protocol Request",
            ProtocolAcceptance => "Protocol Acceptance",
            OrderBooked => "Order Booked",
            DocumentVerification => "Document Verification",
            OrderApproved => "Order Approved",
            ProcurementProtocolRequest => "Protocol Request",
            ProcurementProtocolAcceptance => "Protocol Acceptance",
            TechnicalProjectInitiated => "Project Initiated",
            TechnicalInProgress => "In Progress",
            TechnicalInReview => "In Review",
            TechnicalFinanceApproval => "Finance Approval",
            TechnicalDraftReport => "Draft Report",
            DeliveryFinalReport => "Final Report",
            Delivered => "Delivered",
        }
    }
}

/// Tri-state progress of one checkpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum CheckpointStatus {
    Completed,
    Current,
    Future,
}

/// One checkpoint in a derived view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CheckpointProgress {
    pub checkpoint: Checkpoint,
    pub label: String,
    pub status: CheckpointStatus,
    pub timestamp: Option<String>,
}

/// One stage with its classified checkpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct StageProgress {
    pub stage: Stage,
    pub label: String,
    pub checkpoints: Vec<CheckpointProgress>,
}

/// Full derived tracking view for an order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct StageView {
    pub current_stage: Stage,
    pub stages: Vec<StageProgress>,
}

impl StageView {
    pub fn stage(&self, stage: Stage) -> Option<&StageProgress> {
        self.stages.iter().find(|progress| progress.stage == stage)
    }

    /// Status of a single checkpoint in this view.
    pub fn status_of(&self, checkpoint: Checkpoint) -> Option<CheckpointStatus> {
        self.stage(checkpoint.stage())?
            .checkpoints
            .iter()
            .find(|progress| progress.checkpoint == checkpoint)
            .map(|progress| progress.status)
    }
}

/// Select the current stage by fixed priority; the first matching rule wins.
pub fn current_stage(status: &OrderStatus) -> Stage {
    if status.is_present(Checkpoint::Delivered)
        || status.is_present(Checkpoint::TechnicalDraftReport)
    {
        Stage::Delivery
    } else if status.is_present(Checkpoint::ProcurementProtocolAcceptance) {
        Stage::Technical
    } else if status.is_present(Checkpoint::OrderApproved) {
        Stage::Procurement
    } else {
        Stage::Order
    }
}

/// Classify an ordered list of checkpoints from their presence flags.
///
/// A checkpoint is completed when present, current when absent but preceded by a completed
/// checkpoint (or first in the list), and future otherwise.
pub fn checkpoint_statuses(presence: &[bool]) -> Vec<CheckpointStatus> {
    let mut statuses = Vec::with_capacity(presence.len());
    let mut previous_completed = true;

    for &completed in presence {
        let status = if completed {
            CheckpointStatus::Completed
        } else if previous_completed {
            CheckpointStatus::Current
        } else {
            CheckpointStatus::Future
        };
        statuses.push(status);
        previous_completed = completed;
    }

    statuses
}

/// Derive the current stage and every checkpoint's status from a status snapshot.
pub fn derive_stage_view(status: &OrderStatus) -> StageView {
    let current = current_stage(status);

    let stages = Stage::ALL
        .iter()
        .map(|&stage| {
            let checkpoints = stage.checkpoints();
            let presence: Vec<bool> = checkpoints
                .iter()
                .map(|&checkpoint| status.is_present(checkpoint))
                .collect();

            let progress = checkpoints
                .iter()
                .zip(checkpoint_statuses(&presence))
                .map(|(&checkpoint, checkpoint_status)| CheckpointProgress {
                    checkpoint,
                    label: checkpoint.label().to_string(),
                    status: checkpoint_status,
                    timestamp: status.timestamp(checkpoint).map(str::to_string),
                })
                .collect();

            StageProgress {
                stage,
                label: stage.label().to_string(),
                checkpoints: progress,
            }
        })
        .collect();

    tracing::debug!("derived order stage {}", current);

    StageView {
        current_stage: current,
        stages,
    }
}
