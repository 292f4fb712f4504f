//! Ranks published listings against a buyer's preference profile.

mod scoring;

pub use scoring::{
    AREA_POINTS, BEDROOM_POINTS, CITY_POINTS, DESCRIPTION_RICHNESS_POINTS,
    IMAGE_RICHNESS_POINTS, MAX_SCORE, PARTIAL_LOCATION_POINTS, PRICE_POINTS,
    PROPERTY_TYPE_POINTS, TRANSACTION_POINTS,
};

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::domain::{Actor, Listing, UserPreferences};
use super::repository::{ListingStore, PreferenceStore};
use super::service::MarketplaceError;

/// A ranked candidate. `reasons` is descriptive only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub listing: Listing,
    pub score: u8,
    pub reasons: Vec<String>,
}

/// Full-scan scorer; holds no index or cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationEngine;

impl RecommendationEngine {
    pub fn score(&self, listing: &Listing, preferences: &UserPreferences) -> u8 {
        scoring::score_listing(listing, preferences).0
    }

    /// Scores every published candidate, drops zero scores and keeps the best `top_n`.
    /// Equal scores keep their input order.
    pub fn recommend<I>(
        &self,
        preferences: &UserPreferences,
        listings: I,
        top_n: usize,
    ) -> Vec<Recommendation>
    where
        I: IntoIterator<Item = Listing>,
    {
        let mut ranked: Vec<Recommendation> = listings
            .into_iter()
            .filter(Listing::is_published)
            .filter_map(|listing| {
                let (score, reasons) = scoring::score_listing(&listing, preferences);
                (score > 0).then_some(Recommendation {
                    listing,
                    score,
                    reasons,
                })
            })
            .collect();

        ranked.sort_by(|left, right| right.score.cmp(&left.score));
        ranked.truncate(top_n);
        ranked
    }
}

/// Stores buyer profiles and answers ranked queries against the listing store.
pub struct RecommendationService<S, F> {
    listings: Arc<S>,
    preferences: Arc<F>,
    engine: RecommendationEngine,
}

impl<S, F> RecommendationService<S, F>
where
    S: ListingStore + 'static,
    F: PreferenceStore + 'static,
{
    pub fn new(listings: Arc<S>, preferences: Arc<F>) -> Self {
        Self {
            listings,
            preferences,
            engine: RecommendationEngine,
        }
    }

    /// Replaces the buyer's profile.
    pub fn save_preferences(
        &self,
        actor: &Actor,
        preferences: UserPreferences,
    ) -> Result<UserPreferences, MarketplaceError> {
        if !actor.role.is_authenticated() {
            return Err(MarketplaceError::not_authorized("save preferences", actor));
        }
        self.preferences.put(&actor.id, preferences.clone())?;
        debug!(buyer = %actor.id, "buyer preferences saved");
        Ok(preferences)
    }

    pub fn preferences_for(&self, actor: &Actor) -> Result<UserPreferences, MarketplaceError> {
        self.preferences.get(&actor.id)?.ok_or_else(|| {
            MarketplaceError::ValidationFailed(format!("no saved preferences for {}", actor.id))
        })
    }

    /// Ranks against the buyer's stored profile.
    pub fn recommend_for(
        &self,
        actor: &Actor,
        top_n: usize,
    ) -> Result<Vec<Recommendation>, MarketplaceError> {
        let preferences = self.preferences_for(actor)?;
        self.recommend_with(&preferences, top_n)
    }

    /// Ranks against an ad-hoc profile without storing it.
    pub fn recommend_with(
        &self,
        preferences: &UserPreferences,
        top_n: usize,
    ) -> Result<Vec<Recommendation>, MarketplaceError> {
        let candidates = self.listings.list()?;
        let ranked = self.engine.recommend(preferences, candidates, top_n);
        debug!(returned = ranked.len(), top_n, "recommendations ranked");
        Ok(ranked)
    }
}
