use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Listing, ListingId, PaymentId, UserId, UserPreferences};

/// Listing persistence. `save` is a full-record upsert.
pub trait ListingStore: Send + Sync {
    fn get(&self, id: &ListingId) -> Result<Option<Listing>, ListingStoreError>;
    fn list(&self) -> Result<Vec<Listing>, ListingStoreError>;
    fn save(&self, listing: Listing) -> Result<(), ListingStoreError>;

    /// Atomic read-modify-write of one listing. `apply` runs on a working copy while the
    /// record is held exclusively; the copy replaces the stored record only when `apply`
    /// returns `Ok`. Yields `Ok(None)` when the id does not resolve.
    ///
    /// `apply` must not call back into the store.
    fn update<T, E, F>(&self, id: &ListingId, apply: F) -> Result<Option<T>, E>
    where
        F: FnOnce(&mut Listing) -> Result<T, E>,
        E: From<ListingStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ListingStoreError {
    #[error("listing store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    PostListing,
    PushListing,
    BrokerFee,
    TakeoverFee,
}

impl PaymentType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::PostListing => "post_listing",
            Self::PushListing => "push_listing",
            Self::BrokerFee => "broker_fee",
            Self::TakeoverFee => "takeover_fee",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Paid,
    Pending,
    Failed,
}

/// Entry handed to the recorder; id and date are assigned on record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPayment {
    pub payment_type: PaymentType,
    pub amount: u64,
    pub listing_id: ListingId,
    pub user_id: Option<UserId>,
    pub broker_id: Option<UserId>,
    pub status: PaymentStatus,
    pub description: String,
    /// Earlier entry this one settles: a PAID entry confirms a PENDING one, a FAILED entry
    /// voids it.
    pub settles: Option<PaymentId>,
}

/// Immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub payment_type: PaymentType,
    pub amount: u64,
    pub listing_id: ListingId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker_id: Option<UserId>,
    pub status: PaymentStatus,
    pub date: DateTime<Utc>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settles: Option<PaymentId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTotals {
    pub count: u64,
    pub total: u64,
}

/// Append-only payment ledger.
pub trait PaymentRecorder: Send + Sync {
    fn record(&self, payment: NewPayment) -> Result<Payment, PaymentError>;
    fn for_listing(&self, listing_id: &ListingId) -> Result<Vec<Payment>, PaymentError>;
    /// Totals per type of PAID entries dated within `[start, end]`.
    fn sum_by_type_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BTreeMap<PaymentType, PaymentTotals>, PaymentError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment ledger unavailable: {0}")]
    Unavailable(String),
}

/// Buyer preference profiles keyed by buyer id.
pub trait PreferenceStore: Send + Sync {
    fn put(&self, buyer: &UserId, preferences: UserPreferences)
        -> Result<(), PreferenceStoreError>;
    fn get(&self, buyer: &UserId) -> Result<Option<UserPreferences>, PreferenceStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PreferenceStoreError {
    #[error("preference store unavailable: {0}")]
    Unavailable(String),
}

/// Folds PAID entries into per-type totals; shared by ledger implementations.
///
/// A FAILED entry that `settles` another voids it, so a voided PAID entry is not counted.
pub fn summarize_paid<'a, I>(
    payments: I,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> BTreeMap<PaymentType, PaymentTotals>
where
    I: IntoIterator<Item = &'a Payment>,
{
    let payments: Vec<&Payment> = payments.into_iter().collect();
    let voided: HashSet<&PaymentId> = payments
        .iter()
        .copied()
        .filter(|payment| payment.status == PaymentStatus::Failed)
        .filter_map(|payment| payment.settles.as_ref())
        .collect();

    let mut totals: BTreeMap<PaymentType, PaymentTotals> = BTreeMap::new();
    for payment in payments {
        if payment.status != PaymentStatus::Paid
            || voided.contains(&payment.id)
            || payment.date < start
            || payment.date > end
        {
            continue;
        }
        let entry = totals.entry(payment.payment_type).or_default();
        entry.count += 1;
        entry.total = entry.total.saturating_add(payment.amount);
    }
    totals
}

/// Appends a FAILED entry voiding `entry`, for a charge whose listing write never landed.
pub fn void_payment<P>(payments: &P, entry: &Payment) -> Result<Payment, PaymentError>
where
    P: PaymentRecorder + ?Sized,
{
    payments.record(NewPayment {
        payment_type: entry.payment_type,
        amount: entry.amount,
        listing_id: entry.listing_id.clone(),
        user_id: entry.user_id.clone(),
        broker_id: entry.broker_id.clone(),
        status: PaymentStatus::Failed,
        description: format!("Void of {}: listing was not updated", entry.id.0),
        settles: Some(entry.id.clone()),
    })
}
