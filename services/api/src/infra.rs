use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use listing_desk::config::MarketplaceConfig;
use listing_desk::marketplace::{
    summarize_paid, Listing, ListingId, ListingStore, ListingStoreError, MarketplaceDesk,
    NewPayment, Payment, PaymentError, PaymentId, PaymentRecorder, PaymentTotals, PaymentType,
    PreferenceStore, PreferenceStoreError, UserId, UserPreferences,
};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type InMemoryDesk =
    MarketplaceDesk<InMemoryListingStore, InMemoryPaymentLedger, InMemoryPreferenceStore>;

pub(crate) struct InMemoryCollaborators {
    pub(crate) listings: Arc<InMemoryListingStore>,
    pub(crate) payments: Arc<InMemoryPaymentLedger>,
    pub(crate) preferences: Arc<InMemoryPreferenceStore>,
}

pub(crate) fn in_memory_desk(config: &MarketplaceConfig) -> (InMemoryDesk, InMemoryCollaborators) {
    let collaborators = InMemoryCollaborators {
        listings: Arc::new(InMemoryListingStore::default()),
        payments: Arc::new(InMemoryPaymentLedger::default()),
        preferences: Arc::new(InMemoryPreferenceStore::default()),
    };
    let desk = MarketplaceDesk::new(
        collaborators.listings.clone(),
        collaborators.payments.clone(),
        collaborators.preferences.clone(),
        config,
    );
    (desk, collaborators)
}

/// Listing store keeping insertion order, which recommendation tie-breaks rely on.
#[derive(Default, Clone)]
pub(crate) struct InMemoryListingStore {
    records: Arc<Mutex<Vec<Listing>>>,
}

impl ListingStore for InMemoryListingStore {
    fn get(&self, id: &ListingId) -> Result<Option<Listing>, ListingStoreError> {
        let guard = self.records.lock().expect("listing store mutex poisoned");
        Ok(guard.iter().find(|listing| &listing.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<Listing>, ListingStoreError> {
        let guard = self.records.lock().expect("listing store mutex poisoned");
        Ok(guard.clone())
    }

    fn save(&self, listing: Listing) -> Result<(), ListingStoreError> {
        let mut guard = self.records.lock().expect("listing store mutex poisoned");
        match guard.iter_mut().find(|existing| existing.id == listing.id) {
            Some(existing) => *existing = listing,
            None => guard.push(listing),
        }
        Ok(())
    }

    fn update<T, E, F>(&self, id: &ListingId, apply: F) -> Result<Option<T>, E>
    where
        F: FnOnce(&mut Listing) -> Result<T, E>,
        E: From<ListingStoreError>,
    {
        let mut guard = self.records.lock().expect("listing store mutex poisoned");
        let Some(stored) = guard.iter_mut().find(|listing| &listing.id == id) else {
            return Ok(None);
        };
        let mut working = stored.clone();
        let value = apply(&mut working)?;
        *stored = working;
        Ok(Some(value))
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryPaymentLedger {
    sequence: Arc<AtomicU64>,
    entries: Arc<Mutex<Vec<Payment>>>,
}

impl InMemoryPaymentLedger {
    pub(crate) fn entries(&self) -> Vec<Payment> {
        self.entries.lock().expect("ledger mutex poisoned").clone()
    }
}

impl PaymentRecorder for InMemoryPaymentLedger {
    fn record(&self, payment: NewPayment) -> Result<Payment, PaymentError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let recorded = Payment {
            id: PaymentId(format!("pay-{id:06}")),
            payment_type: payment.payment_type,
            amount: payment.amount,
            listing_id: payment.listing_id,
            user_id: payment.user_id,
            broker_id: payment.broker_id,
            status: payment.status,
            date: Utc::now(),
            description: payment.description,
            settles: payment.settles,
        };
        self.entries
            .lock()
            .expect("ledger mutex poisoned")
            .push(recorded.clone());
        Ok(recorded)
    }

    fn for_listing(&self, listing_id: &ListingId) -> Result<Vec<Payment>, PaymentError> {
        let guard = self.entries.lock().expect("ledger mutex poisoned");
        Ok(guard
            .iter()
            .filter(|payment| &payment.listing_id == listing_id)
            .cloned()
            .collect())
    }

    fn sum_by_type_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BTreeMap<PaymentType, PaymentTotals>, PaymentError> {
        let guard = self.entries.lock().expect("ledger mutex poisoned");
        Ok(summarize_paid(guard.iter(), start, end))
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryPreferenceStore {
    profiles: Arc<Mutex<HashMap<UserId, UserPreferences>>>,
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn put(
        &self,
        buyer: &UserId,
        preferences: UserPreferences,
    ) -> Result<(), PreferenceStoreError> {
        let mut guard = self.profiles.lock().expect("preference mutex poisoned");
        guard.insert(buyer.clone(), preferences);
        Ok(())
    }

    fn get(&self, buyer: &UserId) -> Result<Option<UserPreferences>, PreferenceStoreError> {
        let guard = self.profiles.lock().expect("preference mutex poisoned");
        Ok(guard.get(buyer).cloned())
    }
}
