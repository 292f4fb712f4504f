use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{
    Actor, BrokerRequest, BrokerRequestId, BrokerRequestStatus, Listing, ListingId, Role, UserId,
};
use super::repository::{
    ListingStore, NewPayment, Payment, PaymentRecorder, PaymentStatus, PaymentType,
};
use super::service::{update_charging, update_listing, MarketplaceError};

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> BrokerRequestId {
    let id = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    BrokerRequestId(format!("brq-{id:06}"))
}

/// Broker's answer to a takeover request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TakeoverResponse {
    Accept,
    Reject,
}

/// Hands responsibility for a listing from its seller to a broker.
///
/// Every step checks its guards and writes inside one atomic store update, so of two
/// brokers racing to accept only the first attaches.
pub struct BrokerTakeoverService<S, P> {
    listings: Arc<S>,
    payments: Arc<P>,
    takeover_fee: u64,
}

impl<S, P> BrokerTakeoverService<S, P>
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
{
    pub fn new(listings: Arc<S>, payments: Arc<P>, takeover_fee: u64) -> Self {
        Self {
            listings,
            payments,
            takeover_fee,
        }
    }

    /// Seller asks `broker_id` to take the listing over.
    pub fn request(
        &self,
        actor: &Actor,
        listing_id: &ListingId,
        broker_id: UserId,
        seller_name: &str,
    ) -> Result<BrokerRequest, MarketplaceError> {
        let request = update_listing(self.listings.as_ref(), listing_id, |listing| {
            if !listing.is_owned_by(&actor.id) {
                return Err(MarketplaceError::not_authorized(
                    "request a broker takeover",
                    actor,
                ));
            }
            if listing.status.is_terminal() {
                return Err(MarketplaceError::InvalidTransition {
                    action: "request a broker takeover",
                    status: listing.status,
                });
            }
            if let Some(current) = &listing.responsible_broker_id {
                return Err(MarketplaceError::AlreadyManaged {
                    listing_id: listing.id.clone(),
                    broker_id: current.clone(),
                });
            }
            if broker_id.0.trim().is_empty() || broker_id == listing.seller_id {
                return Err(MarketplaceError::ValidationFailed(
                    "takeover must name a broker other than the seller".to_string(),
                ));
            }

            let seller_name = match seller_name.trim() {
                "" => actor.id.0.clone(),
                name => name.to_string(),
            };
            let request = BrokerRequest {
                id: next_request_id(),
                broker_id,
                status: BrokerRequestStatus::Pending,
                requested_at: Utc::now(),
                responded_at: None,
                seller_name,
                fee_payment: None,
                fee_settled_at: None,
            };
            listing.broker_requests.push(request.clone());
            Ok(request)
        })?;

        info!(
            listing_id = %listing_id,
            request_id = %request.id,
            broker = %request.broker_id,
            "broker takeover requested"
        );
        Ok(request)
    }

    /// Named broker accepts or declines. Acceptance attaches the broker and records a
    /// PENDING takeover fee; sibling requests are left pending.
    pub fn respond(
        &self,
        actor: &Actor,
        listing_id: &ListingId,
        request_id: &BrokerRequestId,
        response: TakeoverResponse,
    ) -> Result<Listing, MarketplaceError> {
        let listing = update_charging(
            self.listings.as_ref(),
            self.payments.as_ref(),
            listing_id,
            |listing, charged| {
                let request = listing
                    .broker_request(request_id)
                    .ok_or_else(|| MarketplaceError::BrokerRequestNotFound(request_id.clone()))?;
                if request.broker_id != actor.id {
                    return Err(MarketplaceError::not_authorized(
                        "respond to this takeover request",
                        actor,
                    ));
                }
                if request.status != BrokerRequestStatus::Pending {
                    return Err(MarketplaceError::AlreadyResolved(format!(
                        "broker request {} is {}",
                        request_id,
                        request.status.label()
                    )));
                }

                let now = Utc::now();
                match response {
                    TakeoverResponse::Reject => {
                        if let Some(request) = listing.broker_request_mut(request_id) {
                            request.status = BrokerRequestStatus::Rejected;
                            request.responded_at = Some(now);
                        }
                    }
                    TakeoverResponse::Accept => {
                        self.accept(actor, listing, request_id, charged)?;
                    }
                }
                listing.updated_at = now;
                Ok(listing.clone())
            },
        )?;

        info!(
            listing_id = %listing_id,
            request_id = %request_id,
            broker = %actor.id,
            response = ?response,
            "broker takeover answered"
        );
        Ok(listing)
    }

    fn accept(
        &self,
        actor: &Actor,
        listing: &mut Listing,
        request_id: &BrokerRequestId,
        charged: &mut Option<Payment>,
    ) -> Result<(), MarketplaceError> {
        if listing.status.is_terminal() {
            return Err(MarketplaceError::InvalidTransition {
                action: "accept a takeover",
                status: listing.status,
            });
        }
        if let Some(current) = &listing.responsible_broker_id {
            warn!(
                listing_id = %listing.id,
                request_id = %request_id,
                current = %current,
                "takeover accept lost to an earlier broker"
            );
            return Err(MarketplaceError::AlreadyManaged {
                listing_id: listing.id.clone(),
                broker_id: current.clone(),
            });
        }

        let fee = self.payments.record(NewPayment {
            payment_type: PaymentType::TakeoverFee,
            amount: self.takeover_fee,
            listing_id: listing.id.clone(),
            user_id: Some(listing.seller_id.clone()),
            broker_id: Some(actor.id.clone()),
            status: PaymentStatus::Pending,
            description: format!("Takeover fee for listing {}", listing.id),
            settles: None,
        })?;

        let now = Utc::now();
        if let Some(request) = listing.broker_request_mut(request_id) {
            request.status = BrokerRequestStatus::Accepted;
            request.responded_at = Some(now);
            request.fee_payment = Some(fee.id.clone());
        }
        listing.responsible_broker_id = Some(actor.id.clone());
        *charged = Some(fee);
        Ok(())
    }

    /// Settles the attached broker's PENDING takeover fee with a PAID entry. From here on
    /// the broker holds full operating rights.
    ///
    /// A retry after a failed listing write reuses the PAID entry already in the ledger.
    pub fn confirm_payment(
        &self,
        actor: &Actor,
        listing_id: &ListingId,
    ) -> Result<Payment, MarketplaceError> {
        if actor.role != Role::System {
            return Err(MarketplaceError::not_authorized(
                "confirm a takeover payment",
                actor,
            ));
        }

        let (paid, broker_id) = update_listing(self.listings.as_ref(), listing_id, |listing| {
            let unconfirmable = MarketplaceError::InvalidTransition {
                action: "confirm a takeover payment",
                status: listing.status,
            };
            let Some(request) = listing.active_takeover() else {
                return Err(unconfirmable);
            };
            if request.fee_settled_at.is_some() {
                return Err(MarketplaceError::AlreadyResolved(format!(
                    "takeover fee for request {} is already paid",
                    request.id
                )));
            }
            let request_id = request.id.clone();
            let broker_id = request.broker_id.clone();
            let Some(pending_id) = request.fee_payment.clone() else {
                return Err(unconfirmable);
            };

            let entries = self.payments.for_listing(listing_id)?;
            let pending = entries
                .iter()
                .find(|payment| payment.id == pending_id)
                .ok_or_else(|| {
                    MarketplaceError::ValidationFailed(format!(
                        "pending takeover fee {} is missing from the ledger",
                        pending_id.0
                    ))
                })?;
            let settled = entries.iter().find(|payment| {
                payment.status == PaymentStatus::Paid
                    && payment.settles.as_ref() == Some(&pending_id)
            });

            let paid = match settled {
                Some(existing) => existing.clone(),
                None => self.payments.record(NewPayment {
                    payment_type: PaymentType::TakeoverFee,
                    amount: pending.amount,
                    listing_id: listing.id.clone(),
                    user_id: pending.user_id.clone(),
                    broker_id: Some(broker_id.clone()),
                    status: PaymentStatus::Paid,
                    description: format!("Takeover fee confirmed for listing {}", listing.id),
                    settles: Some(pending_id.clone()),
                })?,
            };

            let now = Utc::now();
            if let Some(request) = listing.broker_request_mut(&request_id) {
                request.fee_settled_at = Some(now);
            }
            listing.updated_at = now;
            Ok((paid, broker_id))
        })?;

        info!(listing_id = %listing_id, broker = %broker_id, "takeover fee confirmed");
        Ok(paid)
    }

    /// Seller detaches the broker. The accepted request keeps its status for the audit trail.
    pub fn unassign(
        &self,
        actor: &Actor,
        listing_id: &ListingId,
    ) -> Result<Listing, MarketplaceError> {
        let (listing, previous) = update_listing(self.listings.as_ref(), listing_id, |listing| {
            if !listing.is_owned_by(&actor.id) {
                return Err(MarketplaceError::not_authorized("unassign the broker", actor));
            }
            let Some(previous) = listing.responsible_broker_id.take() else {
                return Err(MarketplaceError::AlreadyResolved(format!(
                    "listing {listing_id} has no responsible broker"
                )));
            };
            listing.updated_at = Utc::now();
            Ok((listing.clone(), previous))
        })?;

        info!(listing_id = %listing_id, broker = %previous, "broker unassigned");
        Ok(listing)
    }
}
