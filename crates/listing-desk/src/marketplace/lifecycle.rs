use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::domain::{
    Actor, Listing, ListingDraft, ListingEdit, ListingId, ListingStatus, ModerationDecision,
    ModerationResult, ModerationStatus, Report, Role,
};
use super::moderation::ModerationEngine;
use super::repository::{
    ListingStore, NewPayment, Payment, PaymentRecorder, PaymentStatus, PaymentTotals, PaymentType,
};
use super::service::{update_charging, update_listing, void_orphaned_fee, MarketplaceError};
use crate::config::FeeSchedule;

static LISTING_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_listing_id() -> ListingId {
    let id = LISTING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ListingId(format!("lst-{id:06}"))
}

/// Owns the listing status machine: submission, manual review, publication and closure.
pub struct ListingLifecycleService<S, P> {
    listings: Arc<S>,
    payments: Arc<P>,
    moderation: ModerationEngine,
    fees: FeeSchedule,
}

impl<S, P> ListingLifecycleService<S, P>
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
{
    pub fn new(
        listings: Arc<S>,
        payments: Arc<P>,
        moderation: ModerationEngine,
        fees: FeeSchedule,
    ) -> Self {
        Self {
            listings,
            payments,
            moderation,
            fees,
        }
    }

    pub fn moderation(&self) -> &ModerationEngine {
        &self.moderation
    }

    /// Create a listing, moderate it synchronously and charge the posting fee.
    ///
    /// The posting fee is recorded whatever the moderation outcome, and before the listing
    /// is stored; a failed store write voids it again.
    pub fn submit(&self, actor: &Actor, draft: ListingDraft) -> Result<Listing, MarketplaceError> {
        if !actor.role.is_authenticated() || actor.role == Role::System {
            return Err(MarketplaceError::not_authorized("submit a listing", actor));
        }
        validate_draft(&draft)?;

        let now = Utc::now();
        let mut listing = Listing {
            id: next_listing_id(),
            seller_id: actor.id.clone(),
            responsible_broker_id: None,
            title: draft.title,
            description: draft.description,
            property_type: draft.property_type,
            transaction: draft.transaction,
            price: draft.price,
            area: draft.area,
            bedrooms: draft.bedrooms,
            bathrooms: draft.bathrooms,
            city: draft.city,
            district: draft.district,
            address: draft.address,
            images: draft.images,
            status: ListingStatus::Draft,
            moderation: ModerationResult::default(),
            rejection_reason: None,
            broker_requests: Vec::new(),
            reports: Vec::new(),
            pushed_at: None,
            created_at: now,
            updated_at: now,
        };

        listing.status = ListingStatus::PendingModeration;
        let existing = self.listings.list()?;
        listing.moderation = self.moderation.run(&listing, &existing);
        listing.status = match listing.moderation.decision {
            ModerationDecision::Approved => ListingStatus::Approved,
            ModerationDecision::Rejected => ListingStatus::Rejected,
            ModerationDecision::NeedReview => ListingStatus::PendingModeration,
        };

        let fee = self.payments.record(NewPayment {
            payment_type: PaymentType::PostListing,
            amount: self.fees.post_listing,
            listing_id: listing.id.clone(),
            user_id: Some(actor.id.clone()),
            broker_id: None,
            status: PaymentStatus::Paid,
            description: format!("Posting fee for listing {}", listing.id),
            settles: None,
        })?;
        if let Err(err) = self.listings.save(listing.clone()) {
            let err = MarketplaceError::from(err);
            void_orphaned_fee(self.payments.as_ref(), &fee, &err);
            return Err(err);
        }

        info!(
            listing_id = %listing.id,
            seller = %actor.id,
            status = listing.status.label(),
            risk_score = listing.moderation.risk_score,
            "listing submitted"
        );
        Ok(listing)
    }

    pub fn get(&self, id: &ListingId) -> Result<Listing, MarketplaceError> {
        self.listings
            .get(id)?
            .ok_or_else(|| MarketplaceError::ListingNotFound(id.clone()))
    }

    pub fn published(&self) -> Result<Vec<Listing>, MarketplaceError> {
        Ok(self
            .listings
            .list()?
            .into_iter()
            .filter(Listing::is_published)
            .collect())
    }

    /// Listings waiting for an admin decision, oldest first.
    pub fn review_queue(&self, actor: &Actor) -> Result<Vec<Listing>, MarketplaceError> {
        require_role(actor, Role::Admin, "view the review queue")?;
        let mut queue: Vec<Listing> = self
            .listings
            .list()?
            .into_iter()
            .filter(|listing| listing.status == ListingStatus::PendingModeration)
            .collect();
        queue.sort_by_key(|listing| listing.updated_at);
        Ok(queue)
    }

    pub fn approve(&self, actor: &Actor, id: &ListingId) -> Result<Listing, MarketplaceError> {
        require_role(actor, Role::Admin, "approve a listing")?;
        let listing = update_listing(self.listings.as_ref(), id, |listing| {
            require_status(listing, ListingStatus::PendingModeration, "approve")?;

            let now = Utc::now();
            listing.status = ListingStatus::Approved;
            listing.moderation.status = ModerationStatus::ManuallyApproved;
            listing.moderation.decision = ModerationDecision::Approved;
            listing.moderation.reviewed_by = Some(actor.id.clone());
            listing.moderation.reviewed_at = Some(now);
            listing.updated_at = now;
            Ok(listing.clone())
        })?;

        info!(listing_id = %listing.id, reviewer = %actor.id, "listing manually approved");
        Ok(listing)
    }

    pub fn reject(
        &self,
        actor: &Actor,
        id: &ListingId,
        reason: &str,
    ) -> Result<Listing, MarketplaceError> {
        require_role(actor, Role::Admin, "reject a listing")?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(MarketplaceError::ValidationFailed(
                "a rejection reason is required".to_string(),
            ));
        }
        let listing = update_listing(self.listings.as_ref(), id, |listing| {
            require_status(listing, ListingStatus::PendingModeration, "reject")?;

            let now = Utc::now();
            listing.status = ListingStatus::Rejected;
            listing.moderation.status = ModerationStatus::ManuallyRejected;
            listing.moderation.decision = ModerationDecision::Rejected;
            listing.moderation.reviewed_by = Some(actor.id.clone());
            listing.moderation.reviewed_at = Some(now);
            listing.rejection_reason = Some(reason.to_string());
            listing.updated_at = now;
            Ok(listing.clone())
        })?;

        info!(listing_id = %listing.id, reviewer = %actor.id, reason, "listing manually rejected");
        Ok(listing)
    }

    /// `approved -> active`.
    pub fn activate(&self, actor: &Actor, id: &ListingId) -> Result<Listing, MarketplaceError> {
        self.advance(
            actor,
            id,
            "activate",
            ListingStatus::Approved,
            ListingStatus::Active,
            true,
        )
    }

    /// `active -> done`.
    pub fn complete(&self, actor: &Actor, id: &ListingId) -> Result<Listing, MarketplaceError> {
        self.advance(
            actor,
            id,
            "complete",
            ListingStatus::Active,
            ListingStatus::Done,
            false,
        )
    }

    /// `active -> cancelled`.
    pub fn cancel(&self, actor: &Actor, id: &ListingId) -> Result<Listing, MarketplaceError> {
        self.advance(
            actor,
            id,
            "cancel",
            ListingStatus::Active,
            ListingStatus::Cancelled,
            false,
        )
    }

    fn advance(
        &self,
        actor: &Actor,
        id: &ListingId,
        action: &'static str,
        from: ListingStatus,
        to: ListingStatus,
        admin_allowed: bool,
    ) -> Result<Listing, MarketplaceError> {
        let admin = admin_allowed && actor.role == Role::Admin;
        let listing = update_listing(self.listings.as_ref(), id, |listing| {
            if !admin && !listing.can_be_operated_by(&actor.id) {
                return Err(MarketplaceError::not_authorized(action, actor));
            }
            require_status(listing, from, action)?;

            listing.status = to;
            listing.updated_at = Utc::now();
            Ok(listing.clone())
        })?;
        info!(listing_id = %listing.id, actor = %actor.id, status = to.label(), "listing status advanced");
        Ok(listing)
    }

    /// Apply an owner or broker edit. Any change to title, description or images re-runs
    /// moderation and sends the listing back to `pending_moderation`.
    pub fn edit(
        &self,
        actor: &Actor,
        id: &ListingId,
        edit: ListingEdit,
    ) -> Result<Listing, MarketplaceError> {
        let existing = self.listings.list()?;

        let (listing, content_changed) = update_listing(self.listings.as_ref(), id, |listing| {
            if !listing.can_be_operated_by(&actor.id) {
                return Err(MarketplaceError::not_authorized("edit a listing", actor));
            }
            if listing.status.is_terminal() {
                return Err(MarketplaceError::InvalidTransition {
                    action: "edit",
                    status: listing.status,
                });
            }
            validate_edit(&edit)?;

            let content_changed = edit.changes_content_of(listing);
            edit.apply_to(listing);

            if content_changed {
                let mut review = self.moderation.run(listing, &existing);
                review.status = ModerationStatus::NeedReview;
                review.decision = ModerationDecision::NeedReview;
                listing.moderation = review;
                listing.status = ListingStatus::PendingModeration;
            }
            listing.updated_at = Utc::now();
            Ok((listing.clone(), content_changed))
        })?;

        info!(
            listing_id = %listing.id,
            actor = %actor.id,
            remoderated = content_changed,
            status = listing.status.label(),
            "listing edited"
        );
        Ok(listing)
    }

    /// Append an abuse report; the status is left as is.
    pub fn report(
        &self,
        actor: &Actor,
        id: &ListingId,
        reason: &str,
    ) -> Result<Listing, MarketplaceError> {
        if !actor.role.is_authenticated() {
            return Err(MarketplaceError::not_authorized("report a listing", actor));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(MarketplaceError::ValidationFailed(
                "a report reason is required".to_string(),
            ));
        }
        let listing = update_listing(self.listings.as_ref(), id, |listing| {
            listing.reports.push(Report {
                reporter_id: actor.id.clone(),
                reason: reason.to_string(),
                created_at: Utc::now(),
            });
            Ok(listing.clone())
        })?;

        info!(listing_id = %listing.id, reporter = %actor.id, reports = listing.reports.len(), "listing reported");
        Ok(listing)
    }

    /// Bump a published listing and charge the push fee. The listing is only bumped once
    /// the fee is on the ledger.
    pub fn push(
        &self,
        actor: &Actor,
        id: &ListingId,
    ) -> Result<(Listing, Payment), MarketplaceError> {
        let (listing, payment) = update_charging(
            self.listings.as_ref(),
            self.payments.as_ref(),
            id,
            |listing, charged| {
                if !listing.can_be_operated_by(&actor.id) {
                    return Err(MarketplaceError::not_authorized("push a listing", actor));
                }
                if !listing.is_published() {
                    return Err(MarketplaceError::InvalidTransition {
                        action: "push",
                        status: listing.status,
                    });
                }

                let payment = self.payments.record(NewPayment {
                    payment_type: PaymentType::PushListing,
                    amount: self.fees.push_listing,
                    listing_id: listing.id.clone(),
                    user_id: Some(actor.id.clone()),
                    broker_id: listing.responsible_broker_id.clone(),
                    status: PaymentStatus::Paid,
                    description: format!("Push fee for listing {}", listing.id),
                    settles: None,
                })?;
                *charged = Some(payment.clone());

                let now = Utc::now();
                listing.pushed_at = Some(now);
                listing.updated_at = now;
                Ok((listing.clone(), payment))
            },
        )?;

        info!(listing_id = %listing.id, actor = %actor.id, "listing pushed");
        Ok((listing, payment))
    }

    /// Ledger entries for one listing, visible to its owner, broker or an admin.
    pub fn payments_for(
        &self,
        actor: &Actor,
        id: &ListingId,
    ) -> Result<Vec<Payment>, MarketplaceError> {
        let listing = self.get(id)?;
        if actor.role != Role::Admin && !listing.can_be_operated_by(&actor.id) {
            return Err(MarketplaceError::not_authorized("view listing payments", actor));
        }
        Ok(self.payments.for_listing(id)?)
    }

    /// Totals of PAID entries per payment type.
    pub fn revenue_summary(
        &self,
        actor: &Actor,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BTreeMap<PaymentType, PaymentTotals>, MarketplaceError> {
        require_role(actor, Role::Admin, "view revenue")?;
        if start > end {
            return Err(MarketplaceError::ValidationFailed(
                "range start must not be after its end".to_string(),
            ));
        }
        Ok(self.payments.sum_by_type_in_range(start, end)?)
    }
}

fn require_role(actor: &Actor, role: Role, action: &'static str) -> Result<(), MarketplaceError> {
    if actor.role == role {
        Ok(())
    } else {
        Err(MarketplaceError::not_authorized(action, actor))
    }
}

fn require_status(
    listing: &Listing,
    expected: ListingStatus,
    action: &'static str,
) -> Result<(), MarketplaceError> {
    if listing.status == expected {
        Ok(())
    } else {
        Err(MarketplaceError::InvalidTransition {
            action,
            status: listing.status,
        })
    }
}

fn validate_draft(draft: &ListingDraft) -> Result<(), MarketplaceError> {
    let mut missing = Vec::new();
    if draft.price.trim().is_empty() {
        missing.push("price");
    }
    if !(draft.area.is_finite() && draft.area > 0.0) {
        missing.push("area");
    }
    if draft.city.trim().is_empty() {
        missing.push("city");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MarketplaceError::ValidationFailed(format!(
            "missing or invalid fields: {}",
            missing.join(", ")
        )))
    }
}

fn validate_edit(edit: &ListingEdit) -> Result<(), MarketplaceError> {
    if edit.price.as_deref().is_some_and(|price| price.trim().is_empty()) {
        return Err(MarketplaceError::ValidationFailed(
            "price cannot be blank".to_string(),
        ));
    }
    if edit
        .area
        .is_some_and(|area| !(area.is_finite() && area > 0.0))
    {
        return Err(MarketplaceError::ValidationFailed(
            "area must be a positive number".to_string(),
        ));
    }
    if edit.city.as_deref().is_some_and(|city| city.trim().is_empty()) {
        return Err(MarketplaceError::ValidationFailed(
            "city cannot be blank".to_string(),
        ));
    }
    Ok(())
}
