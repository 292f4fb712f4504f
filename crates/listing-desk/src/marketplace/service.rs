use std::sync::Arc;

use tracing::{error, warn};

use super::domain::{Actor, BrokerRequestId, Listing, ListingId, ListingStatus, UserId};
use super::lifecycle::ListingLifecycleService;
use super::moderation::ModerationEngine;
use super::recommendation::RecommendationService;
use super::repository::{
    void_payment, ListingStore, ListingStoreError, Payment, PaymentError, PaymentRecorder,
    PreferenceStore, PreferenceStoreError,
};
use super::takeover::BrokerTakeoverService;
use crate::config::MarketplaceConfig;

/// Error raised by the marketplace services. Every guard failure leaves stored records
/// untouched.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error("listing {0} not found")]
    ListingNotFound(ListingId),
    #[error("broker request {0} not found")]
    BrokerRequestNotFound(BrokerRequestId),
    #[error("cannot {action} while listing is {status}")]
    InvalidTransition {
        action: &'static str,
        status: ListingStatus,
    },
    #[error("{actor} is not allowed to {action}")]
    NotAuthorized { action: &'static str, actor: String },
    #[error("already resolved: {0}")]
    AlreadyResolved(String),
    #[error("listing {listing_id} is already managed by broker {broker_id}")]
    AlreadyManaged {
        listing_id: ListingId,
        broker_id: UserId,
    },
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    #[error(transparent)]
    Store(#[from] ListingStoreError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Preferences(#[from] PreferenceStoreError),
}

impl MarketplaceError {
    pub(crate) fn not_authorized(action: &'static str, actor: &Actor) -> Self {
        Self::NotAuthorized {
            action,
            actor: actor.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ListingNotFound(_) | Self::BrokerRequestNotFound(_)
        )
    }

    /// Workflow already moved past the requested step; callers refresh rather than alert.
    pub fn is_benign_conflict(&self) -> bool {
        matches!(self, Self::AlreadyResolved(_) | Self::AlreadyManaged { .. })
    }
}

/// Runs `apply` through the store's atomic update; an unknown id is `ListingNotFound`.
pub(crate) fn update_listing<S, T, F>(
    listings: &S,
    id: &ListingId,
    apply: F,
) -> Result<T, MarketplaceError>
where
    S: ListingStore,
    F: FnOnce(&mut Listing) -> Result<T, MarketplaceError>,
{
    listings
        .update(id, apply)?
        .ok_or_else(|| MarketplaceError::ListingNotFound(id.clone()))
}

/// [`update_listing`] for updates that charge a fee. `apply` parks the recorded fee in its
/// second argument; when the update fails afterwards the fee is voided.
pub(crate) fn update_charging<S, P, T, F>(
    listings: &S,
    payments: &P,
    id: &ListingId,
    apply: F,
) -> Result<T, MarketplaceError>
where
    S: ListingStore,
    P: PaymentRecorder,
    F: FnOnce(&mut Listing, &mut Option<Payment>) -> Result<T, MarketplaceError>,
{
    let mut charged = None;
    let outcome = update_listing(listings, id, |listing| apply(listing, &mut charged));
    if let (Err(cause), Some(fee)) = (&outcome, charged.as_ref()) {
        void_orphaned_fee(payments, fee, cause);
    }
    outcome
}

/// Records a FAILED entry against a fee whose listing write did not land.
pub(crate) fn void_orphaned_fee<P>(payments: &P, fee: &Payment, cause: &MarketplaceError)
where
    P: PaymentRecorder,
{
    match void_payment(payments, fee) {
        Ok(void) => warn!(
            listing_id = %fee.listing_id,
            payment_id = %fee.id.0,
            void_id = %void.id.0,
            error = %cause,
            "listing write failed; fee voided"
        ),
        Err(err) => error!(
            listing_id = %fee.listing_id,
            payment_id = %fee.id.0,
            error = %err,
            cause = %cause,
            "listing write failed and the fee could not be voided"
        ),
    }
}

/// Composes the lifecycle, takeover and recommendation services over shared collaborators.
pub struct MarketplaceDesk<S, P, F> {
    lifecycle: ListingLifecycleService<S, P>,
    takeover: BrokerTakeoverService<S, P>,
    recommendations: RecommendationService<S, F>,
}

impl<S, P, F> MarketplaceDesk<S, P, F>
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    pub fn new(
        listings: Arc<S>,
        payments: Arc<P>,
        preferences: Arc<F>,
        config: &MarketplaceConfig,
    ) -> Self {
        let engine = ModerationEngine::new(config.moderation.clone());
        Self {
            lifecycle: ListingLifecycleService::new(
                listings.clone(),
                payments.clone(),
                engine,
                config.fees,
            ),
            takeover: BrokerTakeoverService::new(
                listings.clone(),
                payments,
                config.fees.takeover,
            ),
            recommendations: RecommendationService::new(listings, preferences),
        }
    }

    pub fn lifecycle(&self) -> &ListingLifecycleService<S, P> {
        &self.lifecycle
    }

    pub fn takeover(&self) -> &BrokerTakeoverService<S, P> {
        &self.takeover
    }

    pub fn recommendations(&self) -> &RecommendationService<S, F> {
        &self.recommendations
    }
}
