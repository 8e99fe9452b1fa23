use crate::bookings::{BookingError, BookingResult, BookingStatus};

/// Rules for moving a booking between workflow statuses
pub struct StatusMachine;

impl StatusMachine {
    /// Check whether a manual status update is allowed
    ///
    /// # Valid Transitions
    /// - Open, Rescheduled → Verified
    /// - Verified → RootManager, FieldAgentAssigned, PaymentCollected
    /// - Within {RootManager, FieldAgentAssigned, PaymentCollected}, and any of them → SampleCollected
    /// - SampleCollected → ReportUploaded
    /// - ReportUploaded → HealthManagerAssigned, DietitianAssigned, Completed
    /// - Within {HealthManagerAssigned, DietitianAssigned}, and either → Completed
    /// - Any non-terminal status → Open, Cancelled
    /// - Any status → Same status (idempotent)
    pub fn is_valid_transition(from: BookingStatus, to: BookingStatus) -> bool {
        use BookingStatus::*;

        if from == to {
            return true;
        }
        if from.is_terminal() {
            return false;
        }

        match (from, to) {
            (_, Open) | (_, Cancelled) => true,

            (Open, Verified) | (Rescheduled, Verified) => true,

            (Verified, RootManager | FieldAgentAssigned | PaymentCollected) => true,
            (
                RootManager | FieldAgentAssigned | PaymentCollected,
                RootManager | FieldAgentAssigned | PaymentCollected | SampleCollected,
            ) => true,

            (SampleCollected, ReportUploaded) => true,

            (ReportUploaded, HealthManagerAssigned | DietitianAssigned | Completed) => true,
            (
                HealthManagerAssigned | DietitianAssigned,
                HealthManagerAssigned | DietitianAssigned | Completed,
            ) => true,

            _ => false,
        }
    }

    /// Manual transition checked against the graph
    pub fn transition(from: BookingStatus, to: BookingStatus) -> BookingResult<BookingStatus> {
        if from.is_terminal() && from != to {
            return Err(BookingError::BookingClosed(from));
        }
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(BookingError::InvalidTransition { from, to })
        }
    }

    /// System-driven transition; bypasses the graph but never reopens a closed booking
    pub fn force(from: BookingStatus, to: BookingStatus) -> BookingResult<BookingStatus> {
        if from.is_terminal() && from != to {
            return Err(BookingError::BookingClosed(from));
        }
        Ok(to)
    }
}
