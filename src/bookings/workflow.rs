// Booking working copy
//
// Every mutation is applied to a draft first. Nothing touches storage until the
// draft is turned into a change set, so a rejected step leaves the stored
// booking exactly as it was.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::coupons::NewRedemption;
use crate::notifications::OutboxEvent;
use crate::payments::{BookingPayment, PaymentLink};

use super::calculator::{CalculationResult, PricedLine};
use super::error::{BookingError, BookingResult};
use super::incentives::IncentiveEntry;
use super::models::{
    AssignedUser, Booking, BookingItem, BookingStatus, CustomerStatus, MutationKind,
    PaymentMethod, PaymentStatus, UserAccount,
};
use super::role_policy::RoleStatusPolicy;
use super::status_machine::StatusMachine;
use super::store::BookingChangeSet;
use super::sync::{post_save_sync, sync_from_latest_payment};
use super::tracker::{classify, verification_note, TrackerAction, TrackerEntry};

/// `dp` + YYMMDD + 4-digit sequence within the day
pub fn format_ref_id(date: NaiveDate, sequence: i64) -> String {
    format!("{}{:04}", ref_prefix(date), sequence)
}

pub fn ref_prefix(date: NaiveDate) -> String {
    format!("dp{}", date.format("%y%m%d"))
}

/// Which status a schedule edit leaves the booking in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleMode {
    /// Staff edit from the CRM: back to open
    Crm,
    /// Customer self-service and bulk edits: rescheduled, customer sees registered
    Reschedule,
}

pub struct BookingDraft {
    original: Option<Booking>,
    pub booking: Booking,
    pub items: Vec<BookingItem>,
    pub assignments: Vec<AssignedUser>,
    items_replaced: bool,
    assignments_changed: bool,
    new_payment: Option<BookingPayment>,
    updated_payment: Option<BookingPayment>,
    redemption: Option<NewRedemption>,
    entries: Vec<TrackerEntry>,
    incentives: Vec<IncentiveEntry>,
    generate_invoice: bool,
}

/// A finished draft: the writes plus the side effects to run after commit
pub struct PreparedCommit {
    pub changes: BookingChangeSet,
    pub generate_invoice: bool,
}

impl BookingDraft {
    /// Draft over an existing booking
    pub fn load(booking: Booking, items: Vec<BookingItem>, assignments: Vec<AssignedUser>) -> Self {
        Self {
            original: Some(booking.clone()),
            booking,
            items,
            assignments,
            items_replaced: false,
            assignments_changed: false,
            new_payment: None,
            updated_payment: None,
            redemption: None,
            entries: Vec::new(),
            incentives: Vec::new(),
            generate_invoice: false,
        }
    }

    /// Draft for a booking that does not exist yet
    pub fn create(booking: Booking) -> Self {
        let mut draft = Self::load(booking, Vec::new(), Vec::new());
        draft.original = None;
        draft
    }

    pub fn is_new(&self) -> bool {
        self.original.is_none()
    }

    /// Reject stale writers before any work is done
    pub fn check_version(&self, expected: Option<i32>) -> BookingResult<()> {
        match expected {
            Some(version) if version != self.booking.version => {
                Err(BookingError::ConcurrentModification)
            }
            _ => Ok(()),
        }
    }

    /// Terminal bookings only accept remarks and documents
    pub fn ensure_mutable(&self, kind: Option<MutationKind>) -> BookingResult<()> {
        let allowed = kind.map(|k| k.allowed_when_closed()).unwrap_or(false);
        if self.booking.status.is_terminal() && !allowed {
            return Err(BookingError::BookingClosed(self.booking.status));
        }
        Ok(())
    }

    /// Current lines at their stored prices, including replacements made in this draft
    pub fn lines(&self) -> BookingResult<Vec<PricedLine>> {
        self.items.iter().map(PricedLine::from_item).collect()
    }

    pub fn apply_calculation(&mut self, result: &CalculationResult, replace_items: bool) {
        self.booking.apply_totals(result);

        if replace_items {
            let now = Utc::now();
            let booking_id = self.booking.id;
            self.items = result
                .items
                .iter()
                .map(|line| {
                    let product = line.product();
                    let (lab_test_id, profile_id, package_id) = match product.kind {
                        crate::catalog::ProductKind::LabTest => (Some(product.id), None, None),
                        crate::catalog::ProductKind::LabProfile => (None, Some(product.id), None),
                        crate::catalog::ProductKind::LabPackage => (None, None, Some(product.id)),
                    };
                    BookingItem {
                        id: Uuid::new_v4(),
                        booking_id,
                        patient_id: line.patient,
                        lab_test_id,
                        profile_id,
                        package_id,
                        product_name: line.product_name.clone(),
                        base_price: line.base_price,
                        offer_price: line.offer_price,
                        created_at: now,
                    }
                })
                .collect();
            self.items_replaced = true;
        }
    }

    pub fn redeem(&mut self, redemption: NewRedemption) {
        self.redemption = Some(redemption);
    }

    /// System-driven status change, graph not consulted
    pub fn force_status(&mut self, to: BookingStatus) -> BookingResult<()> {
        self.booking.status = StatusMachine::force(self.booking.status, to)?;
        Ok(())
    }

    /// Manual status update checked against the transition graph
    pub fn set_status(&mut self, to: BookingStatus) -> BookingResult<()> {
        let from = self.booking.status;
        self.booking.status = StatusMachine::transition(from, to)?;

        if to == BookingStatus::Verified && from != BookingStatus::Verified {
            self.booking.initial_amount = self.booking.final_amount;
            let note = verification_note(&self.lines()?, self.booking.final_amount);
            self.entries
                .push(TrackerEntry::system(self.booking.id, TrackerAction::Verification, note));
        }
        if to == BookingStatus::SampleCollected && from != BookingStatus::SampleCollected {
            self.generate_invoice = true;
        }
        Ok(())
    }

    pub fn set_address(&mut self, address_id: Uuid) -> BookingResult<()> {
        self.booking.address_id = Some(address_id);
        self.force_status(BookingStatus::Open)
    }

    pub fn set_schedule(
        &mut self,
        date: NaiveDate,
        time_slot: String,
        mode: ScheduleMode,
    ) -> BookingResult<()> {
        self.booking.scheduled_date = Some(date);
        self.booking.scheduled_time_slot = Some(time_slot);
        match mode {
            ScheduleMode::Crm => self.force_status(BookingStatus::Open),
            ScheduleMode::Reschedule => {
                self.force_status(BookingStatus::Rescheduled)?;
                self.booking.customer_status = CustomerStatus::Registered;
                Ok(())
            }
        }
    }

    pub fn cancel(&mut self) -> BookingResult<()> {
        self.force_status(BookingStatus::Cancelled)?;
        self.booking.customer_status = CustomerStatus::Cancelled;
        Ok(())
    }

    /// Attach agents, keeping one occupant per role
    ///
    /// Agents whose role appears in the policy move the booking to that role's
    /// status; when several do, the last one wins.
    pub fn assign_agents(
        &mut self,
        agents: &[UserAccount],
        policy: &RoleStatusPolicy,
    ) -> BookingResult<()> {
        let before: Vec<Uuid> = self.assignments.iter().map(|a| a.user_id).collect();
        let mut forced = None;

        for agent in agents {
            if let Some(role) = agent.role_name.as_deref() {
                self.assignments
                    .retain(|existing| existing.user_id == agent.id || !existing.has_role(role));
                if let Some(status) = policy.status_for(role) {
                    forced = Some(status);
                }
            }
            if !self.assignments.iter().any(|a| a.user_id == agent.id) {
                self.assignments.push(agent.as_assigned());
            }
        }

        let after: Vec<Uuid> = self.assignments.iter().map(|a| a.user_id).collect();
        if before != after {
            self.assignments_changed = true;
        }
        if let Some(status) = forced {
            self.force_status(status)?;
        }
        Ok(())
    }

    /// Cash, UPI or card handed to the field agent: settled immediately
    pub fn record_in_person_payment(
        &mut self,
        method: PaymentMethod,
        collected_by: Uuid,
        remarks: &str,
    ) -> BookingResult<()> {
        let mut payment = BookingPayment::new(
            self.booking.id,
            Some(collected_by),
            self.booking.final_amount,
            PaymentStatus::Success,
            method,
        );
        payment.remarks = Some(remarks.to_string());

        self.booking.payment_status = PaymentStatus::Success;
        self.booking.payment_method = Some(method);
        self.force_status(BookingStatus::PaymentCollected)?;
        self.new_payment = Some(payment);
        Ok(())
    }

    /// Payment link issued; success arrives later through the gateway
    pub fn record_online_payment(
        &mut self,
        method: PaymentMethod,
        requested_status: Option<PaymentStatus>,
        link: PaymentLink,
        gateway_response: serde_json::Value,
        initiated_by: Uuid,
    ) {
        let mut payment = BookingPayment::new(
            self.booking.id,
            Some(initiated_by),
            self.booking.final_amount,
            PaymentStatus::Initiated,
            method,
        );
        payment.payment_link = Some(link.short_url);
        payment.gateway_order_id = Some(link.id);
        payment.gateway_response = Some(gateway_response);
        payment.remarks = Some("Payment link created via gateway".to_string());

        self.booking.payment_status = requested_status.unwrap_or(PaymentStatus::Initiated);
        self.booking.payment_method = Some(method);
        self.new_payment = Some(payment);
    }

    /// Store an updated payment record and resync the booking from the latest one
    ///
    /// Returns whether the booking's payment fields changed.
    pub fn apply_payment_record(
        &mut self,
        updated: BookingPayment,
        latest: Option<BookingPayment>,
    ) -> bool {
        let latest = match latest {
            Some(latest) if latest.id != updated.id => latest,
            _ => updated.clone(),
        };
        self.updated_payment = Some(updated);
        sync_from_latest_payment(&mut self.booking, Some(&latest))
    }

    pub fn sync_payment(&mut self, latest: Option<&BookingPayment>) -> bool {
        sync_from_latest_payment(&mut self.booking, latest)
    }

    pub fn add_incentives(&mut self, incentives: Vec<IncentiveEntry>) {
        self.incentives.extend(incentives);
    }

    pub fn log(&mut self, actor: Option<Uuid>, action: TrackerAction, notes: impl Into<String>) {
        self.entries
            .push(TrackerEntry::record(self.booking.id, actor, action, notes));
    }

    /// Label for a partial update from the changes made so far
    pub fn classify(&self, requested: Option<MutationKind>) -> TrackerAction {
        match &self.original {
            Some(original) => classify(requested, original, &self.booking, self.assignments_changed),
            None => TrackerAction::Create,
        }
    }

    /// True when the draft would write anything beyond what was loaded
    pub fn has_changes(&self) -> bool {
        self.original.as_ref() != Some(&self.booking)
            || self.items_replaced
            || self.assignments_changed
            || self.new_payment.is_some()
            || self.updated_payment.is_some()
            || !self.entries.is_empty()
            || !self.incentives.is_empty()
    }

    /// Run the post-save sync and package every write into one change set
    pub fn prepare(mut self) -> PreparedCommit {
        let notification = post_save_sync(self.original.as_ref(), &mut self.booking);
        self.booking.updated_at = Utc::now();

        let expected_version = self.original.as_ref().map(|original| original.version);
        let booking_id = self.booking.id;
        let mut changes = BookingChangeSet::new(self.booking, expected_version);

        if self.items_replaced {
            changes.replace_items = Some(self.items);
        }
        if self.assignments_changed {
            changes.replace_assignments = Some(self.assignments);
        }
        changes.new_payment = self.new_payment;
        changes.updated_payment = self.updated_payment;
        changes.redemption = self.redemption.map(NewRedemption::into_redemption);
        changes.entries = self.entries;
        changes.incentives = self.incentives;
        if let Some(action) = notification {
            changes.events.push(OutboxEvent::new(booking_id, action));
        }

        PreparedCommit {
            changes,
            generate_invoice: self.generate_invoice,
        }
    }
}
