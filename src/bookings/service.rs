// Booking service
//
// Orchestrates every booking operation: load a draft, apply the requested
// mutation through the calculator and state machine, then commit the resulting
// change set in one transaction. Invoice generation runs after the commit and
// never fails the request.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::auth::AuthenticatedUser;
use crate::catalog::ProductCatalog;
use crate::coupons::{CouponEvaluator, CouponStore, CouponUsage, NewRedemption};
use crate::invoice::InvoiceGenerator;
use crate::payments::{
    map_gateway_status, BookingPayment, GatewayWebhookPayload, PaymentContact, PaymentGateway,
};

use super::calculator::{BookingCalculator, CalculationResult, ClientTotals};
use super::error::{BookingError, BookingResult};
use super::incentives::{build_entries, validate_batch, IncentiveBatchRequest, IncentiveEntry};
use super::models::{
    Booking, BookingDetail, BookingMutationRequest, BookingStatus, BulkAction,
    BulkUpdateRequest, CalculationRequest, ClientAction, ClientBookingRequest,
    CreateBookingRequest, ItemRequest, MutationKind, UserAccount,
};
use super::role_policy::CachedRolePolicy;
use super::store::BookingStore;
use super::tracker::{bulk_note, TrackerAction, TrackerEntry};
use super::workflow::{format_ref_id, ref_prefix, BookingDraft, PreparedCommit, ScheduleMode};

pub struct BookingService {
    store: Arc<dyn BookingStore>,
    coupons: Arc<dyn CouponStore>,
    calculator: BookingCalculator,
    role_policy: Arc<CachedRolePolicy>,
    gateway: Arc<dyn PaymentGateway>,
    invoices: Arc<dyn InvoiceGenerator>,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        catalog: Arc<dyn ProductCatalog>,
        coupons: Arc<dyn CouponStore>,
        role_policy: Arc<CachedRolePolicy>,
        gateway: Arc<dyn PaymentGateway>,
        invoices: Arc<dyn InvoiceGenerator>,
    ) -> Self {
        Self {
            calculator: BookingCalculator::new(catalog, coupons.clone()),
            store,
            coupons,
            role_policy,
            gateway,
            invoices,
        }
    }

    /// Price a prospective booking without persisting anything
    pub async fn preview(&self, request: CalculationRequest) -> BookingResult<CalculationResult> {
        request.validate().map_err(invalid)?;
        self.calculator
            .calculate(&request.client_totals(), &request.items, request.coupon)
            .await
    }

    pub async fn create(
        &self,
        actor: &AuthenticatedUser,
        request: CreateBookingRequest,
    ) -> BookingResult<BookingDetail> {
        request.validate().map_err(invalid)?;

        let owner = match request.user {
            Some(user) if user != actor.user_id && !actor.is_staff => {
                return Err(BookingError::Forbidden(
                    "Only staff can create bookings for other users".to_string(),
                ))
            }
            Some(user) => user,
            None => actor.user_id,
        };
        if owner != actor.user_id && self.store.find_user(owner).await?.is_none() {
            return Err(BookingError::not_found("user", owner));
        }

        let result = self
            .calculator
            .calculate(&request.client_totals(), &request.items, request.coupon)
            .await?;

        let today = Utc::now().date_naive();
        let sequence = self.store.count_ref_prefix(&ref_prefix(today)).await? + 1;
        let mut booking = Booking::new(owner, format_ref_id(today, sequence));
        booking.address_id = request.address;
        booking.scheduled_date = request.scheduled_date;
        booking.scheduled_time_slot = request.scheduled_time_slot;
        booking.remarks = request.remarks;

        let mut draft = BookingDraft::create(booking);
        self.apply_coupon(&mut draft, &result).await?;
        draft.apply_calculation(&result, true);
        draft.log(
            Some(actor.user_id),
            TrackerAction::Create,
            "Booking created with validated totals and coupon",
        );

        let booking = self.commit(draft).await?;
        info!(
            "Created booking {} for user {} (final amount {})",
            booking.ref_id, booking.user_id, booking.final_amount
        );
        self.detail(booking).await
    }

    pub async fn get(&self, actor: &AuthenticatedUser, id: Uuid) -> BookingResult<BookingDetail> {
        let booking = self.find(id).await?;
        ensure_access(actor, &booking)?;
        self.detail(booking).await
    }

    /// CRM partial update: exactly one mutation per request
    pub async fn mutate(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
        request: BookingMutationRequest,
    ) -> BookingResult<BookingDetail> {
        request.validate().map_err(invalid)?;

        let mut draft = self.load_draft(id).await?;
        draft.check_version(request.expected_version)?;
        draft.ensure_mutable(Some(request.action_type))?;

        match request.action_type {
            MutationKind::UpdateStatus => {
                let status = request
                    .status
                    .ok_or_else(|| BookingError::validation("status", "Status is required for this action"))?;
                draft.set_status(status)?;
            }
            MutationKind::UpdateAgent => {
                let ids = request
                    .agents
                    .as_deref()
                    .filter(|ids| !ids.is_empty())
                    .ok_or_else(|| BookingError::validation("agents", "At least one agent is required"))?;
                let agents = self.load_agents(ids).await?;
                let policy = self.role_policy.current().await?;
                draft.assign_agents(&agents, &policy)?;
            }
            MutationKind::UpdatePayment => {
                self.update_payment(&mut draft, actor, &request).await?;
            }
            MutationKind::UpdateSchedule => {
                let (date, slot) =
                    require_schedule(request.scheduled_date, request.scheduled_time_slot.as_deref())?;
                draft.set_schedule(date, slot, ScheduleMode::Crm)?;
            }
            MutationKind::UpdateAddress => {
                let address = request
                    .address
                    .ok_or_else(|| BookingError::validation("address", "Address is required"))?;
                draft.set_address(address)?;
            }
            MutationKind::UpdateItems => {
                let items = request.items.as_deref().unwrap_or_default();
                self.replace_items(&mut draft, items, request.coupon, &request.client_totals())
                    .await?;
            }
            MutationKind::UpdateDiscounts => {
                self.update_discounts(&mut draft, request.coupon, &request.client_totals())
                    .await?;
            }
            MutationKind::AddRemark | MutationKind::UploadDocument => {}
        }

        let action = draft.classify(Some(request.action_type));
        let remarks = request.remarks.trim();
        let notes = match (&request.action_type, request.document_url.as_deref()) {
            (MutationKind::UploadDocument, Some(url)) => format!("{}\n{}", remarks, url),
            _ => remarks.to_string(),
        };
        draft.log(Some(actor.user_id), action, notes);

        let booking = self.commit(draft).await?;
        info!(
            "Booking {} updated by {}: {:?} (status {})",
            booking.ref_id, actor.user_id, action, booking.status
        );
        self.detail(booking).await
    }

    /// Several edits applied in a fixed order, committed together
    pub async fn bulk_update(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
        request: BulkUpdateRequest,
    ) -> BookingResult<BookingDetail> {
        request.validate().map_err(invalid)?;

        let mut actions = request.actions.clone();
        actions.sort();
        actions.dedup();

        let mut draft = self.load_draft(id).await?;
        draft.check_version(request.expected_version)?;
        draft.ensure_mutable(None)?;

        let client = request.client_totals();
        for action in &actions {
            match action {
                BulkAction::UpdateItems => {
                    let items = request.items.as_deref().unwrap_or_default();
                    self.replace_items(&mut draft, items, request.coupon, &client)
                        .await?;
                }
                BulkAction::UpdateDiscounts => {
                    self.update_discounts(&mut draft, request.coupon, &client).await?;
                }
                BulkAction::UpdateAddress => {
                    let address = request
                        .address
                        .ok_or_else(|| BookingError::validation("address", "Address is required"))?;
                    draft.set_address(address)?;
                }
                BulkAction::UpdateSchedule => {
                    let (date, slot) = require_schedule(
                        request.scheduled_date,
                        request.scheduled_time_slot.as_deref(),
                    )?;
                    draft.set_schedule(date, slot, ScheduleMode::Reschedule)?;
                }
            }
        }

        draft.log(
            Some(actor.user_id),
            TrackerAction::BulkUpdate,
            bulk_note(request.remarks.trim(), &actions),
        );

        let booking = self.commit(draft).await?;
        info!("Booking {} bulk updated by {}", booking.ref_id, actor.user_id);
        self.detail(booking).await
    }

    /// Customer self-service: reschedule or cancel an owned booking
    pub async fn client_action(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
        request: ClientBookingRequest,
    ) -> BookingResult<BookingDetail> {
        let mut draft = self.load_draft(id).await?;
        if draft.booking.user_id != actor.user_id {
            return Err(BookingError::Forbidden(
                "You can only manage your own bookings".to_string(),
            ));
        }
        draft.ensure_mutable(None)?;

        let remarks = request
            .remarks
            .as_deref()
            .map(str::trim)
            .filter(|remarks| !remarks.is_empty());

        match request.action {
            ClientAction::Reschedule => {
                let (date, slot) =
                    require_schedule(request.scheduled_date, request.scheduled_time_slot.as_deref())?;
                draft.set_schedule(date, slot, ScheduleMode::Reschedule)?;
                draft.log(
                    Some(actor.user_id),
                    TrackerAction::Reschedule,
                    remarks.unwrap_or("Client rescheduled booking."),
                );
            }
            ClientAction::Cancel => {
                draft.cancel()?;
                draft.log(
                    Some(actor.user_id),
                    TrackerAction::Cancel,
                    remarks.unwrap_or("Client cancelled booking."),
                );
            }
        }

        let booking = self.commit(draft).await?;
        info!("Client {} applied {:?} to booking {}", actor.user_id, request.action, booking.ref_id);
        self.detail(booking).await
    }

    /// Record a batch of staff incentives, all or nothing
    pub async fn add_incentives(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
        request: IncentiveBatchRequest,
    ) -> BookingResult<Vec<IncentiveEntry>> {
        request.validate().map_err(invalid)?;

        let mut draft = self.load_draft(id).await?;
        if draft.booking.status == BookingStatus::Cancelled {
            return Err(BookingError::BookingClosed(BookingStatus::Cancelled));
        }

        let already_recorded = self.store.incentive_total(id).await?;
        let total = validate_batch(draft.booking.final_amount, already_recorded, &request.entries)?;
        for entry in &request.entries {
            if self.store.find_user(entry.user).await?.is_none() {
                return Err(BookingError::not_found("user", entry.user));
            }
        }

        let notes = format!(
            "{}\n- {} entries, total {}",
            request.remarks.trim(),
            request.entries.len(),
            total
        );
        let entries = build_entries(draft.booking.id, actor.user_id, request.entries);
        draft.add_incentives(entries.clone());
        draft.log(Some(actor.user_id), TrackerAction::IncentiveBatch, notes);

        let booking = self.commit(draft).await?;
        info!(
            "Recorded {} incentives (total {}) on booking {}",
            entries.len(),
            total,
            booking.ref_id
        );
        Ok(entries)
    }

    /// Audit timeline, newest first
    pub async fn actions(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
    ) -> BookingResult<Vec<TrackerEntry>> {
        let booking = self.find(id).await?;
        ensure_access(actor, &booking)?;
        self.store.find_actions(id).await
    }

    /// Apply a signed gateway callback to the matching payment record
    pub async fn handle_gateway_webhook(
        &self,
        payload: GatewayWebhookPayload,
    ) -> BookingResult<Booking> {
        let stored = self
            .store
            .find_payment_by_gateway_order(&payload.order_id)
            .await?
            .ok_or_else(|| BookingError::not_found("payment", &payload.order_id))?;

        let mut updated = stored.clone();
        updated.status = map_gateway_status(&payload.status);
        if payload.payment_id.is_some() {
            updated.gateway_payment_id = payload.payment_id;
        }

        debug!(
            "Gateway webhook for order {}: {} -> {}",
            payload.order_id, stored.status, updated.status
        );
        self.apply_payment_update(stored, updated).await
    }

    /// Pull the latest payment's status from the gateway and sync the booking
    pub async fn refresh_payment(&self, id: Uuid) -> BookingResult<Booking> {
        let stored = self
            .store
            .latest_payment(id)
            .await?
            .ok_or_else(|| BookingError::not_found("payment", id))?;
        let order_id = stored.gateway_order_id.clone().ok_or_else(|| {
            BookingError::validation("payment", "Latest payment was not made through the gateway")
        })?;

        let status = self
            .gateway
            .fetch_link_status(&order_id)
            .await
            .map_err(|err| BookingError::PaymentGateway(format!("{:#}", err)))?;

        let mut updated = stored.clone();
        updated.status = status.status;
        if status.gateway_payment_id.is_some() {
            updated.gateway_payment_id = status.gateway_payment_id;
        }
        updated.gateway_response = Some(status.raw);

        self.apply_payment_update(stored, updated).await
    }

    /// Copy the latest payment's status onto the booking; commits nothing when already in sync
    pub async fn sync_payment(&self, id: Uuid) -> BookingResult<Booking> {
        let mut draft = self.load_draft(id).await?;
        let latest = self.store.latest_payment(id).await?;
        if !draft.sync_payment(latest.as_ref()) {
            debug!("Booking {} already in sync with its latest payment", id);
            return Ok(draft.booking);
        }
        self.commit(draft).await
    }

    async fn apply_payment_update(
        &self,
        stored: BookingPayment,
        updated: BookingPayment,
    ) -> BookingResult<Booking> {
        let mut draft = self.load_draft(updated.booking_id).await?;
        let latest = self.store.latest_payment(updated.booking_id).await?;

        if stored == updated {
            if !draft.sync_payment(latest.as_ref()) {
                return Ok(draft.booking);
            }
        } else {
            draft.apply_payment_record(updated, latest);
        }

        let booking = self.commit(draft).await?;
        info!(
            "Booking {} payment synced: {} (status {})",
            booking.ref_id, booking.payment_status, booking.status
        );
        Ok(booking)
    }

    async fn update_payment(
        &self,
        draft: &mut BookingDraft,
        actor: &AuthenticatedUser,
        request: &BookingMutationRequest,
    ) -> BookingResult<()> {
        let method = request
            .payment_method
            .ok_or_else(|| BookingError::validation("payment_method", "Payment method is required"))?;

        if method.is_in_person() {
            return draft.record_in_person_payment(method, actor.user_id, request.remarks.trim());
        }

        let amount = draft.booking.final_amount;
        if amount <= Decimal::ZERO {
            return Err(BookingError::validation(
                "amount",
                "Online payment amount must be greater than zero",
            ));
        }

        let contact = match self.store.find_user(draft.booking.user_id).await? {
            Some(owner) => PaymentContact {
                name: owner.full_name(),
                contact: owner.mobile.clone().unwrap_or_default(),
                email: owner.email,
            },
            None => PaymentContact::default(),
        };

        let (link, raw) = self
            .gateway
            .create_payment_link(draft.booking.id, amount, &contact)
            .await
            .map_err(|err| BookingError::PaymentGateway(format!("{:#}", err)))?;

        draft.record_online_payment(method, request.payment_status, link, raw, actor.user_id);
        Ok(())
    }

    async fn replace_items(
        &self,
        draft: &mut BookingDraft,
        items: &[ItemRequest],
        coupon: Option<Uuid>,
        client: &ClientTotals,
    ) -> BookingResult<()> {
        if items.is_empty() {
            return Err(BookingError::validation(
                "items",
                "At least one booking item is required",
            ));
        }

        let result = self.calculator.calculate(client, items, coupon).await?;
        self.apply_coupon(draft, &result).await?;
        draft.apply_calculation(&result, true);
        draft.force_status(BookingStatus::Open)
    }

    /// Re-run discounts against the prices already captured on the items
    async fn update_discounts(
        &self,
        draft: &mut BookingDraft,
        coupon: Option<Uuid>,
        client: &ClientTotals,
    ) -> BookingResult<()> {
        let lines = draft.lines()?;
        let result = self
            .calculator
            .recalculate_snapshot(client, lines, coupon)
            .await?;
        self.apply_coupon(draft, &result).await?;
        draft.apply_calculation(&result, false);
        Ok(())
    }

    /// Check limits for the owner and stage a redemption unless this booking already holds one
    async fn apply_coupon(
        &self,
        draft: &mut BookingDraft,
        result: &CalculationResult,
    ) -> BookingResult<()> {
        let Some(coupon) = &result.coupon else {
            return Ok(());
        };
        let owner = draft.booking.user_id;
        let booking_id = draft.booking.id;

        let usage = CouponUsage {
            global: self
                .coupons
                .count_redemptions(coupon.id, None, Some(booking_id))
                .await?,
            per_user: self
                .coupons
                .count_redemptions(coupon.id, Some(owner), Some(booking_id))
                .await?,
        };
        CouponEvaluator::check_eligibility(coupon, usage)?;

        let already_redeemed =
            !draft.is_new() && self.coupons.has_redemption(coupon.id, owner, booking_id).await?;
        if !already_redeemed {
            draft.redeem(NewRedemption {
                coupon_id: coupon.id,
                user_id: owner,
                booking_id,
            });
        }
        Ok(())
    }

    async fn load_agents(&self, ids: &[Uuid]) -> BookingResult<Vec<UserAccount>> {
        let mut agents = Vec::with_capacity(ids.len());
        for id in ids {
            let agent = self
                .store
                .find_user(*id)
                .await?
                .ok_or(BookingError::AgentNotFound(*id))?;
            if agent.role_name.as_deref().map(str::trim).unwrap_or_default().is_empty() {
                return Err(BookingError::validation(
                    "agents",
                    format!("Agent {} has no role", id),
                ));
            }
            agents.push(agent);
        }
        Ok(agents)
    }

    async fn find(&self, id: Uuid) -> BookingResult<Booking> {
        self.store
            .find_booking(id)
            .await?
            .ok_or_else(|| BookingError::not_found("booking", id))
    }

    async fn load_draft(&self, id: Uuid) -> BookingResult<BookingDraft> {
        let booking = self.find(id).await?;
        let items = self.store.find_items(id).await?;
        let assignments = self.store.find_assignments(id).await?;
        Ok(BookingDraft::load(booking, items, assignments))
    }

    async fn detail(&self, booking: Booking) -> BookingResult<BookingDetail> {
        let items = self.store.find_items(booking.id).await?;
        let assigned_users = self.store.find_assignments(booking.id).await?;
        Ok(BookingDetail {
            booking,
            items,
            assigned_users,
        })
    }

    async fn commit(&self, draft: BookingDraft) -> BookingResult<Booking> {
        let PreparedCommit {
            changes,
            generate_invoice,
        } = draft.prepare();
        let booking = self.store.commit(changes).await?;

        if generate_invoice {
            if let Err(err) = self.invoices.generate(booking.id).await {
                warn!("Invoice generation failed for booking {}: {:#}", booking.ref_id, err);
            }
        }
        Ok(booking)
    }
}

fn ensure_access(actor: &AuthenticatedUser, booking: &Booking) -> BookingResult<()> {
    if actor.is_staff || booking.user_id == actor.user_id {
        Ok(())
    } else {
        Err(BookingError::Forbidden(
            "You do not have access to this booking".to_string(),
        ))
    }
}

fn require_schedule(
    date: Option<NaiveDate>,
    time_slot: Option<&str>,
) -> BookingResult<(NaiveDate, String)> {
    match (date, time_slot.map(str::trim).filter(|slot| !slot.is_empty())) {
        (Some(date), Some(slot)) => Ok((date, slot.to_string())),
        _ => Err(BookingError::validation(
            "schedule",
            "Both date and time slot are required",
        )),
    }
}

/// First failing field of a request, reported as a validation error
fn invalid(errors: ValidationErrors) -> BookingError {
    let field = errors
        .field_errors()
        .keys()
        .next()
        .map(|field| field.to_string())
        .unwrap_or_else(|| "request".to_string());
    BookingError::validation(field, errors.to_string())
}
