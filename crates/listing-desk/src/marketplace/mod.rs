//! Listing moderation, lifecycle, broker takeover and buyer recommendations.

pub mod domain;
pub mod import;
pub mod lifecycle;
pub mod moderation;
pub mod price;
pub mod recommendation;
pub mod repository;
pub mod router;
pub mod service;
pub mod takeover;

#[cfg(test)]
mod tests;

pub use domain::{
    Actor, BrokerRequest, BrokerRequestId, BrokerRequestStatus, Listing, ListingDraft,
    ListingEdit, ListingId, ListingStatus, ModerationDecision, ModerationResult,
    ModerationStatus, PaymentId, PropertyType, Report, Role, TransactionKind, UserId,
    UserPreferences,
};
pub use import::{load_listing_drafts, parse_listing_drafts, ImportError};
pub use lifecycle::ListingLifecycleService;
pub use moderation::{ModerationConfig, ModerationEngine};
pub use price::{parse_price, PriceRange};
pub use recommendation::{Recommendation, RecommendationEngine, RecommendationService};
pub use repository::{
    summarize_paid, void_payment, ListingStore, ListingStoreError, NewPayment, Payment,
    PaymentError, PaymentRecorder, PaymentStatus, PaymentTotals, PaymentType, PreferenceStore,
    PreferenceStoreError,
};
pub use router::marketplace_router;
pub use service::{MarketplaceDesk, MarketplaceError};
pub use takeover::{BrokerTakeoverService, TakeoverResponse};
