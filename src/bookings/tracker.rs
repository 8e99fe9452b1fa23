// Booking action log
// Append-only timeline of every mutation; entries are built here and only ever inserted

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::calculator::PricedLine;
use super::models::{Booking, BulkAction, MutationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TrackerAction {
    Create,
    StatusChange,
    PaymentUpdate,
    AgentChange,
    UpdateItems,
    UpdateDiscounts,
    UpdateAddress,
    UpdateSchedule,
    AddRemark,
    UploadDocument,
    BulkUpdate,
    Reschedule,
    Cancel,
    Verification,
    IncentiveBatch,
    Update,
}

impl From<MutationKind> for TrackerAction {
    fn from(kind: MutationKind) -> Self {
        match kind {
            MutationKind::UpdateStatus => TrackerAction::StatusChange,
            MutationKind::UpdateAgent => TrackerAction::AgentChange,
            MutationKind::UpdatePayment => TrackerAction::PaymentUpdate,
            MutationKind::UpdateSchedule => TrackerAction::UpdateSchedule,
            MutationKind::UpdateAddress => TrackerAction::UpdateAddress,
            MutationKind::UpdateItems => TrackerAction::UpdateItems,
            MutationKind::UpdateDiscounts => TrackerAction::UpdateDiscounts,
            MutationKind::AddRemark => TrackerAction::AddRemark,
            MutationKind::UploadDocument => TrackerAction::UploadDocument,
        }
    }
}

/// One audit entry; `actor_id` is None for system-authored entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TrackerEntry {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: TrackerAction,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl TrackerEntry {
    pub fn record(
        booking_id: Uuid,
        actor_id: Option<Uuid>,
        action: TrackerAction,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            actor_id,
            action,
            notes: notes.into(),
            created_at: Utc::now(),
        }
    }

    pub fn system(booking_id: Uuid, action: TrackerAction, notes: impl Into<String>) -> Self {
        Self::record(booking_id, None, action, notes)
    }
}

/// Label for a partial update, derived by diffing the booking before and after
///
/// Status changes win over payment changes, which win over agent changes;
/// otherwise the requested mutation kind is used, or `update` without one.
pub fn classify(
    requested: Option<MutationKind>,
    before: &Booking,
    after: &Booking,
    agents_changed: bool,
) -> TrackerAction {
    if before.status != after.status {
        TrackerAction::StatusChange
    } else if before.payment_status != after.payment_status {
        TrackerAction::PaymentUpdate
    } else if agents_changed {
        TrackerAction::AgentChange
    } else {
        requested.map(TrackerAction::from).unwrap_or(TrackerAction::Update)
    }
}

/// Bulk entry note: remarks, then the applied actions on one line
pub fn bulk_note(remarks: &str, actions: &[BulkAction]) -> String {
    let applied = actions
        .iter()
        .map(BulkAction::as_str)
        .collect::<Vec<_>>()
        .join(",");
    format!("{}\n- {}", remarks, applied)
}

/// System note written when a booking is verified
pub fn verification_note(lines: &[PricedLine], final_amount: Decimal) -> String {
    let mut note = String::from("Booking verified with items:");
    for line in lines {
        note.push_str(&format!(
            "\n- {} ({}) base {} offer {} patient {}",
            line.product_name, line.product_type, line.base_price, line.offer_price, line.patient
        ));
    }
    note.push_str(&format!("\nFinal amount: {}", final_amount));
    note
}
