// Post-save synchronisation
//
// Runs on the working copy just before it is committed: derives customer_status,
// applies the payment-success transition and picks the notification to enqueue.
// The notification itself goes through the outbox, so dispatch happens after commit.

use crate::notifications::NotificationAction;
use crate::payments::BookingPayment;

use super::models::{Booking, BookingStatus, CustomerStatus, PaymentStatus};

/// Reconcile derived fields and choose the notification for this save
///
/// `before` is None for a newly created booking, which always notifies.
pub fn post_save_sync(before: Option<&Booking>, after: &mut Booking) -> Option<NotificationAction> {
    let Some(before) = before else {
        after.customer_status = after.status.customer_status();
        return Some(NotificationAction::BookingCreated);
    };

    let payment_changed = before.payment_status != after.payment_status;

    if payment_changed && after.payment_status == PaymentStatus::Success {
        if !after.status.is_terminal() {
            after.status = BookingStatus::PaymentCollected;
            after.customer_status = CustomerStatus::PaymentCollected;
        }
        return Some(NotificationAction::PaymentSuccess);
    }

    after.customer_status = after.status.customer_status();

    if payment_changed && after.payment_status == PaymentStatus::Failed {
        return Some(NotificationAction::PaymentFailed);
    }

    let changed = before.status != after.status
        || payment_changed
        || before.customer_status != after.customer_status;

    changed.then_some(NotificationAction::BookingUpdated)
}

/// Copy payment status and method from the latest payment record
///
/// Returns whether anything changed; a second call with the same record is a no-op.
pub fn sync_from_latest_payment(booking: &mut Booking, latest: Option<&BookingPayment>) -> bool {
    let Some(latest) = latest else {
        return false;
    };

    let changed = booking.payment_status != latest.status
        || booking.payment_method != Some(latest.method);

    booking.payment_status = latest.status;
    booking.payment_method = Some(latest.method);

    changed
}
