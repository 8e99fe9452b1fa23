// Incentive batches: payouts to staff credited against a booking

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::validation::{validate_non_blank, validate_positive_amount};

use super::error::{BookingError, BookingResult};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IncentiveEntryRequest {
    pub user: Uuid,
    pub amount: Decimal,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct IncentiveBatchRequest {
    #[validate(length(min = 1, message = "At least one entry is required"))]
    pub entries: Vec<IncentiveEntryRequest>,
    #[validate(custom = "validate_non_blank")]
    pub remarks: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct IncentiveEntry {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub note: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Check the whole batch before anything is written; returns the batch total
///
/// `already_recorded` is the sum of earlier batches; together they may not exceed
/// the booking's final amount.
pub fn validate_batch(
    final_amount: Decimal,
    already_recorded: Decimal,
    entries: &[IncentiveEntryRequest],
) -> BookingResult<Decimal> {
    if entries.is_empty() {
        return Err(BookingError::validation("entries", "At least one entry is required"));
    }
    if let Some(entry) = entries
        .iter()
        .find(|entry| validate_positive_amount(&entry.amount).is_err())
    {
        return Err(BookingError::validation(
            "amount",
            format!("Incentive for user {} must be greater than zero", entry.user),
        ));
    }

    let batch_total = entries
        .iter()
        .try_fold(Decimal::ZERO, |sum, entry| sum.checked_add(entry.amount));
    let total = batch_total.and_then(|batch| batch.checked_add(already_recorded));
    match (batch_total, total) {
        (Some(batch_total), Some(total)) if total <= final_amount => Ok(batch_total),
        (_, total) => Err(BookingError::IncentiveLimitExceeded {
            total: total.unwrap_or(Decimal::MAX),
            final_amount,
        }),
    }
}

pub fn build_entries(
    booking_id: Uuid,
    created_by: Uuid,
    entries: Vec<IncentiveEntryRequest>,
) -> Vec<IncentiveEntry> {
    let now = Utc::now();
    entries
        .into_iter()
        .map(|entry| IncentiveEntry {
            id: Uuid::new_v4(),
            booking_id,
            user_id: entry.user,
            amount: entry.amount,
            note: entry.note,
            created_by,
            created_at: now,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(amount: Decimal) -> IncentiveEntryRequest {
        IncentiveEntryRequest {
            user: Uuid::new_v4(),
            amount,
            note: None,
        }
    }

    #[test]
    fn test_batch_within_final_amount() {
        let total = validate_batch(dec!(400), Decimal::ZERO, &[entry(dec!(150)), entry(dec!(250))]).unwrap();
        assert_eq!(total, dec!(400));
    }

    #[test]
    fn test_batch_over_final_amount() {
        let err = validate_batch(dec!(400), Decimal::ZERO, &[entry(dec!(300)), entry(dec!(100.01))]).unwrap_err();
        assert!(matches!(err, BookingError::IncentiveLimitExceeded { total, .. } if total == dec!(400.01)));
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let err = validate_batch(dec!(400), Decimal::ZERO, &[entry(dec!(10)), entry(dec!(0))]).unwrap_err();
        assert!(matches!(err, BookingError::Validation { field, .. } if field == "amount"));
    }

    #[test]
    fn test_empty_batch_rejected() {
        assert!(validate_batch(dec!(400), Decimal::ZERO, &[]).is_err());
    }

    #[test]
    fn test_earlier_batches_count_towards_limit() {
        let total = validate_batch(dec!(400), dec!(300), &[entry(dec!(100))]).unwrap();
        assert_eq!(total, dec!(100));

        let err = validate_batch(dec!(400), dec!(300), &[entry(dec!(100.01))]).unwrap_err();
        assert!(matches!(err, BookingError::IncentiveLimitExceeded { total, .. } if total == dec!(400.01)));
    }

    #[test]
    fn test_overflowing_batch_exceeds_limit() {
        let err = validate_batch(dec!(400), Decimal::ZERO, &[entry(Decimal::MAX), entry(Decimal::MAX)])
            .unwrap_err();
        assert!(matches!(err, BookingError::IncentiveLimitExceeded { .. }));
    }
}
