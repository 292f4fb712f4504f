//! End-to-end marketplace scenarios driven through the public desk facade and router.

mod common {
    use std::collections::{BTreeMap, HashMap};
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Utc};

    use listing_desk::config::MarketplaceConfig;
    use listing_desk::marketplace::{
        summarize_paid, Listing, ListingId, ListingStore, ListingStoreError, MarketplaceDesk,
        NewPayment, Payment, PaymentError, PaymentId, PaymentRecorder, PaymentTotals,
        PaymentType, PreferenceStore, PreferenceStoreError, UserId, UserPreferences,
    };

    pub type Desk = MarketplaceDesk<Listings, Ledger, Profiles>;

    pub fn desk() -> (Desk, Arc<Ledger>) {
        let ledger = Arc::new(Ledger::default());
        let desk = MarketplaceDesk::new(
            Arc::new(Listings::default()),
            ledger.clone(),
            Arc::new(Profiles::default()),
            &MarketplaceConfig::default(),
        );
        (desk, ledger)
    }

    #[derive(Default)]
    pub struct Listings {
        records: Mutex<HashMap<ListingId, Listing>>,
        order: Mutex<Vec<ListingId>>,
    }

    impl ListingStore for Listings {
        fn get(&self, id: &ListingId) -> Result<Option<Listing>, ListingStoreError> {
            Ok(self.records.lock().expect("store poisoned").get(id).cloned())
        }

        fn list(&self) -> Result<Vec<Listing>, ListingStoreError> {
            let records = self.records.lock().expect("store poisoned");
            let order = self.order.lock().expect("store poisoned");
            Ok(order.iter().filter_map(|id| records.get(id).cloned()).collect())
        }

        fn save(&self, listing: Listing) -> Result<(), ListingStoreError> {
            let mut records = self.records.lock().expect("store poisoned");
            if !records.contains_key(&listing.id) {
                self.order
                    .lock()
                    .expect("store poisoned")
                    .push(listing.id.clone());
            }
            records.insert(listing.id.clone(), listing);
            Ok(())
        }

        fn update<T, E, F>(&self, id: &ListingId, apply: F) -> Result<Option<T>, E>
        where
            F: FnOnce(&mut Listing) -> Result<T, E>,
            E: From<ListingStoreError>,
        {
            let mut records = self.records.lock().expect("store poisoned");
            let Some(stored) = records.get_mut(id) else {
                return Ok(None);
            };
            let mut working = stored.clone();
            let value = apply(&mut working)?;
            *stored = working;
            Ok(Some(value))
        }
    }

    #[derive(Default)]
    pub struct Ledger {
        entries: Mutex<Vec<Payment>>,
    }

    impl Ledger {
        pub fn entries(&self) -> Vec<Payment> {
            self.entries.lock().expect("ledger poisoned").clone()
        }
    }

    impl PaymentRecorder for Ledger {
        fn record(&self, payment: NewPayment) -> Result<Payment, PaymentError> {
            let mut entries = self.entries.lock().expect("ledger poisoned");
            let recorded = Payment {
                id: PaymentId(format!("pay-{:06}", entries.len() + 1)),
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
            entries.push(recorded.clone());
            Ok(recorded)
        }

        fn for_listing(&self, listing_id: &ListingId) -> Result<Vec<Payment>, PaymentError> {
            Ok(self
                .entries()
                .into_iter()
                .filter(|payment| &payment.listing_id == listing_id)
                .collect())
        }

        fn sum_by_type_in_range(
            &self,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<BTreeMap<PaymentType, PaymentTotals>, PaymentError> {
            Ok(summarize_paid(&self.entries(), start, end))
        }
    }

    #[derive(Default)]
    pub struct Profiles {
        profiles: Mutex<HashMap<UserId, UserPreferences>>,
    }

    impl PreferenceStore for Profiles {
        fn put(
            &self,
            buyer: &UserId,
            preferences: UserPreferences,
        ) -> Result<(), PreferenceStoreError> {
            self.profiles
                .lock()
                .expect("profiles poisoned")
                .insert(buyer.clone(), preferences);
            Ok(())
        }

        fn get(&self, buyer: &UserId) -> Result<Option<UserPreferences>, PreferenceStoreError> {
            Ok(self
                .profiles
                .lock()
                .expect("profiles poisoned")
                .get(buyer)
                .cloned())
        }
    }
}

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use tower::ServiceExt;

use listing_desk::marketplace::{
    marketplace_router, parse_listing_drafts, Actor, ListingStatus, PaymentStatus, PaymentType,
    PropertyType, Role, TakeoverResponse, TransactionKind, UserPreferences,
};

const SEED_CSV: &str = "\
title,description,property_type,transaction,price,area,bedrooms,bathrooms,city,district,address,images
Căn hộ 3PN Times City,\"Căn hộ góc 3 phòng ngủ tầng trung, ban công Đông Nam, sổ hồng lâu dài. Nội thất cao cấp, tiện ích nội khu đầy đủ.\",apartment,buy,4.2 tỷ,98,3,2,Hà Nội,Hai Bà Trưng,458 Minh Khai,a.jpg|b.jpg|c.jpg
Cho thuê văn phòng Quận 1,Sàn văn phòng 120m2 mặt tiền đường lớn.,office,rent,45 triệu,120,,2,Hồ Chí Minh,Quận 1,12 Lê Lợi,d.jpg
Bán gấp,Lừa đảo,land,buy,1 tỷ,100,,,Đà Nẵng,,,
";

#[test]
fn imported_listings_flow_through_moderation_and_takeover() {
    let (desk, ledger) = common::desk();
    let seller = Actor::new("seller-7", Role::Seller);
    let broker = Actor::new("broker-3", Role::Broker);
    let gateway = Actor::new("payments", Role::System);
    let admin = Actor::new("admin-1", Role::Admin);

    let drafts = parse_listing_drafts(SEED_CSV.as_bytes()).expect("seed parses");
    let submitted: Vec<_> = drafts
        .into_iter()
        .map(|draft| desk.lifecycle().submit(&seller, draft).expect("submits"))
        .collect();

    let statuses: Vec<ListingStatus> = submitted.iter().map(|listing| listing.status).collect();
    assert_eq!(
        statuses,
        vec![
            ListingStatus::Approved,
            ListingStatus::Approved,
            ListingStatus::Rejected
        ]
    );

    let flagship = &submitted[0];
    let request = desk
        .takeover()
        .request(&seller, &flagship.id, broker.id.clone(), "Anh Minh")
        .expect("takeover requested");
    desk.takeover()
        .respond(&broker, &flagship.id, &request.id, TakeoverResponse::Accept)
        .expect("broker accepts");
    desk.takeover()
        .confirm_payment(&gateway, &flagship.id)
        .expect("gateway confirms");

    let managed = desk
        .lifecycle()
        .activate(&broker, &flagship.id)
        .expect("broker activates");
    assert_eq!(managed.status, ListingStatus::Active);
    assert!(managed.broker_has_full_rights());

    let takeover_entries: Vec<_> = ledger
        .entries()
        .into_iter()
        .filter(|payment| payment.payment_type == PaymentType::TakeoverFee)
        .map(|payment| payment.status)
        .collect();
    assert_eq!(
        takeover_entries,
        vec![PaymentStatus::Pending, PaymentStatus::Paid]
    );

    let totals = desk
        .lifecycle()
        .revenue_summary(
            &admin,
            Utc::now() - Duration::minutes(5),
            Utc::now() + Duration::minutes(5),
        )
        .expect("summary");
    assert_eq!(totals[&PaymentType::PostListing].count, 3);
    assert_eq!(totals[&PaymentType::TakeoverFee].count, 1);
}

#[test]
fn buyer_sees_best_matches_first() {
    let (desk, _) = common::desk();
    let seller = Actor::new("seller-7", Role::Seller);
    let buyer = Actor::new("buyer-9", Role::User);

    for draft in parse_listing_drafts(SEED_CSV.as_bytes()).expect("seed parses") {
        desk.lifecycle().submit(&seller, draft).expect("submits");
    }

    desk.recommendations()
        .save_preferences(
            &buyer,
            UserPreferences {
                transaction: Some(TransactionKind::Buy),
                property_types: vec![PropertyType::Apartment, PropertyType::Land],
                cities: vec!["Hà Nội".to_string(), "Đà Nẵng".to_string()],
                price_range: Some("3-5 tỷ".to_string()),
                min_area: Some(80.0),
                min_bedrooms: Some(2),
            },
        )
        .expect("profile saved");

    let ranked = desk
        .recommendations()
        .recommend_for(&buyer, 10)
        .expect("ranked");

    // The rejected Đà Nẵng plot never surfaces; the office only clears the minimum area.
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].listing.city, "Hà Nội");
    assert_eq!(ranked[0].score, 100);
    assert!(ranked[1].score < ranked[0].score);
}

#[tokio::test]
async fn router_serves_published_listings() {
    let (desk, _) = common::desk();
    let seller = Actor::new("seller-7", Role::Seller);
    for draft in parse_listing_drafts(SEED_CSV.as_bytes()).expect("seed parses") {
        desk.lifecycle().submit(&seller, draft).expect("submits");
    }
    let router = marketplace_router(Arc::new(desk));

    let response = router
        .oneshot(
            Request::get("/api/v1/listings")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body");
    let listings: Vec<serde_json::Value> = serde_json::from_slice(&body).expect("json");
    assert_eq!(listings.len(), 2);
}
