use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::config::MarketplaceConfig;
use crate::marketplace::domain::{
    Actor, Listing, ListingDraft, ListingId, ListingStatus, ModerationResult, PaymentId,
    PropertyType, Role, TransactionKind, UserId, UserPreferences,
};
use crate::marketplace::repository::{
    summarize_paid, ListingStore, ListingStoreError, NewPayment, Payment, PaymentError,
    PaymentRecorder, PaymentTotals, PaymentType, PreferenceStore, PreferenceStoreError,
};
use crate::marketplace::service::MarketplaceDesk;

pub(super) const RICH_DESCRIPTION: &str = "Căn hộ 2 phòng ngủ, ban công hướng Đông Nam, sổ hồng chính chủ. \
     Gần trường học, chợ và công viên, nội thất đầy đủ, dọn vào ở ngay.";

pub(super) type TestDesk = MarketplaceDesk<MemoryListingStore, MemoryLedger, MemoryPreferences>;

pub(super) fn seller() -> Actor {
    Actor::new("seller-1", Role::Seller)
}

pub(super) fn other_seller() -> Actor {
    Actor::new("seller-2", Role::Seller)
}

pub(super) fn admin() -> Actor {
    Actor::new("admin-1", Role::Admin)
}

pub(super) fn broker(id: &str) -> Actor {
    Actor::new(id, Role::Broker)
}

pub(super) fn buyer() -> Actor {
    Actor::new("buyer-1", Role::User)
}

pub(super) fn system() -> Actor {
    Actor::new("payment-gateway", Role::System)
}

pub(super) fn guest() -> Actor {
    Actor::new("anonymous", Role::Guest)
}

fn images(count: usize) -> Vec<String> {
    (1..=count)
        .map(|index| format!("https://cdn.example.vn/listing/{index}.jpg"))
        .collect()
}

/// Scores zero on every moderation rule.
pub(super) fn clean_draft() -> ListingDraft {
    ListingDraft {
        title: "Căn hộ 2PN view sông Hồng".to_string(),
        description: RICH_DESCRIPTION.to_string(),
        property_type: PropertyType::Apartment,
        transaction: TransactionKind::Buy,
        price: "3 tỷ".to_string(),
        area: 60.0,
        bedrooms: Some(2),
        bathrooms: Some(2),
        city: "Hà Nội".to_string(),
        district: "Tây Hồ".to_string(),
        address: "12 Xuân Diệu, Tây Hồ, Hà Nội".to_string(),
        images: images(3),
    }
}

/// No images: exactly 20 points, the lower review boundary.
pub(super) fn review_draft() -> ListingDraft {
    ListingDraft {
        title: "Nhà phố mặt tiền Cầu Giấy".to_string(),
        images: Vec::new(),
        ..clean_draft()
    }
}

/// Short title, short description and no images: far above the rejection threshold.
pub(super) fn rejected_draft() -> ListingDraft {
    ListingDraft {
        title: "Bán gấp".to_string(),
        description: "Liên hệ ngay".to_string(),
        images: Vec::new(),
        ..clean_draft()
    }
}

pub(super) fn listing_fixture(id: &str, seller: &str, title: &str) -> Listing {
    let now = Utc::now();
    let draft = clean_draft();
    Listing {
        id: ListingId(id.to_string()),
        seller_id: UserId(seller.to_string()),
        responsible_broker_id: None,
        title: title.to_string(),
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
    }
}

pub(super) fn hanoi_apartment_preferences() -> UserPreferences {
    UserPreferences {
        transaction: Some(TransactionKind::Buy),
        property_types: vec![PropertyType::Apartment],
        cities: vec!["Hà Nội".to_string()],
        price_range: Some("1-5 tỷ".to_string()),
        min_area: Some(50.0),
        min_bedrooms: None,
    }
}

pub(super) fn build_desk() -> (
    TestDesk,
    Arc<MemoryListingStore>,
    Arc<MemoryLedger>,
    Arc<MemoryPreferences>,
) {
    let listings = Arc::new(MemoryListingStore::default());
    let ledger = Arc::new(MemoryLedger::default());
    let preferences = Arc::new(MemoryPreferences::default());
    let desk = MarketplaceDesk::new(
        listings.clone(),
        ledger.clone(),
        preferences.clone(),
        &MarketplaceConfig::default(),
    );
    (desk, listings, ledger, preferences)
}

/// Submits a clean draft for `owner` and returns the auto-approved listing.
pub(super) fn approved_listing(desk: &TestDesk, owner: &Actor) -> Listing {
    let listing = desk
        .lifecycle()
        .submit(owner, clean_draft())
        .expect("submission succeeds");
    assert_eq!(listing.status, ListingStatus::Approved);
    listing
}

pub(super) fn active_listing(desk: &TestDesk, owner: &Actor) -> Listing {
    let listing = approved_listing(desk, owner);
    desk.lifecycle()
        .activate(owner, &listing.id)
        .expect("activation succeeds")
}

#[derive(Default, Clone)]
pub(super) struct MemoryListingStore {
    records: Arc<Mutex<Vec<Listing>>>,
}

impl MemoryListingStore {
    pub(super) fn insert(&self, listing: Listing) {
        self.save(listing).expect("memory store accepts writes");
    }
}

impl ListingStore for MemoryListingStore {
    fn get(&self, id: &ListingId) -> Result<Option<Listing>, ListingStoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.iter().find(|listing| &listing.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<Listing>, ListingStoreError> {
        Ok(self.records.lock().expect("store mutex poisoned").clone())
    }

    fn save(&self, listing: Listing) -> Result<(), ListingStoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
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
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let Some(stored) = guard.iter_mut().find(|listing| &listing.id == id) else {
            return Ok(None);
        };
        let mut working = stored.clone();
        let value = apply(&mut working)?;
        *stored = working;
        Ok(Some(value))
    }
}

/// Serves reads from the wrapped store but loses every write, after running the update.
#[derive(Default, Clone)]
pub(super) struct CommitFailingStore {
    pub(super) inner: MemoryListingStore,
}

impl ListingStore for CommitFailingStore {
    fn get(&self, id: &ListingId) -> Result<Option<Listing>, ListingStoreError> {
        self.inner.get(id)
    }

    fn list(&self) -> Result<Vec<Listing>, ListingStoreError> {
        self.inner.list()
    }

    fn save(&self, _listing: Listing) -> Result<(), ListingStoreError> {
        Err(ListingStoreError::Unavailable("commit lost".to_string()))
    }

    fn update<T, E, F>(&self, id: &ListingId, apply: F) -> Result<Option<T>, E>
    where
        F: FnOnce(&mut Listing) -> Result<T, E>,
        E: From<ListingStoreError>,
    {
        let Some(mut working) = self.inner.get(id)? else {
            return Ok(None);
        };
        apply(&mut working)?;
        Err(ListingStoreError::Unavailable("commit lost".to_string()).into())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryLedger {
    entries: Arc<Mutex<Vec<Payment>>>,
}

impl MemoryLedger {
    pub(super) fn entries(&self) -> Vec<Payment> {
        self.entries.lock().expect("ledger mutex poisoned").clone()
    }

    pub(super) fn of_type(&self, payment_type: PaymentType) -> Vec<Payment> {
        self.entries()
            .into_iter()
            .filter(|payment| payment.payment_type == payment_type)
            .collect()
    }
}

impl PaymentRecorder for MemoryLedger {
    fn record(&self, payment: NewPayment) -> Result<Payment, PaymentError> {
        let mut guard = self.entries.lock().expect("ledger mutex poisoned");
        let recorded = Payment {
            id: PaymentId(format!("pay-{:06}", guard.len() + 1)),
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
        guard.push(recorded.clone());
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
pub(super) struct MemoryPreferences {
    profiles: Arc<Mutex<HashMap<UserId, UserPreferences>>>,
}

impl PreferenceStore for MemoryPreferences {
    fn put(
        &self,
        buyer: &UserId,
        preferences: UserPreferences,
    ) -> Result<(), PreferenceStoreError> {
        self.profiles
            .lock()
            .expect("preferences mutex poisoned")
            .insert(buyer.clone(), preferences);
        Ok(())
    }

    fn get(&self, buyer: &UserId) -> Result<Option<UserPreferences>, PreferenceStoreError> {
        Ok(self
            .profiles
            .lock()
            .expect("preferences mutex poisoned")
            .get(buyer)
            .cloned())
    }
}

pub(super) struct UnavailableStore;

impl ListingStore for UnavailableStore {
    fn get(&self, _id: &ListingId) -> Result<Option<Listing>, ListingStoreError> {
        Err(ListingStoreError::Unavailable("database offline".to_string()))
    }

    fn list(&self) -> Result<Vec<Listing>, ListingStoreError> {
        Err(ListingStoreError::Unavailable("database offline".to_string()))
    }

    fn save(&self, _listing: Listing) -> Result<(), ListingStoreError> {
        Err(ListingStoreError::Unavailable("database offline".to_string()))
    }

    fn update<T, E, F>(&self, _id: &ListingId, _apply: F) -> Result<Option<T>, E>
    where
        F: FnOnce(&mut Listing) -> Result<T, E>,
        E: From<ListingStoreError>,
    {
        Err(ListingStoreError::Unavailable("database offline".to_string()).into())
    }
}

/// Ledger that refuses every write.
#[derive(Default)]
pub(super) struct OfflineLedger;

impl PaymentRecorder for OfflineLedger {
    fn record(&self, _payment: NewPayment) -> Result<Payment, PaymentError> {
        Err(PaymentError::Unavailable("gateway timeout".to_string()))
    }

    fn for_listing(&self, _listing_id: &ListingId) -> Result<Vec<Payment>, PaymentError> {
        Ok(Vec::new())
    }

    fn sum_by_type_in_range(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<BTreeMap<PaymentType, PaymentTotals>, PaymentError> {
        Ok(BTreeMap::new())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
