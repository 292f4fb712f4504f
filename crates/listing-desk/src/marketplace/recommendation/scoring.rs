use super::super::domain::{Listing, UserPreferences};
use super::super::price::{parse_price, PriceRange};

pub const CITY_POINTS: u32 = 30;
pub const PARTIAL_LOCATION_POINTS: u32 = 25;
pub const PROPERTY_TYPE_POINTS: u32 = 20;
pub const TRANSACTION_POINTS: u32 = 15;
pub const PRICE_POINTS: u32 = 20;
pub const AREA_POINTS: u32 = 10;
pub const BEDROOM_POINTS: u32 = 5;
pub const IMAGE_RICHNESS_POINTS: u32 = 5;
pub const DESCRIPTION_RICHNESS_POINTS: u32 = 5;
pub const MAX_SCORE: u32 = 100;

pub(crate) const RICH_IMAGE_COUNT: usize = 3;
pub(crate) const RICH_DESCRIPTION_CHARS: usize = 100;

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Additive match score capped at [`MAX_SCORE`], with the reasons that contributed.
pub(crate) fn score_listing(listing: &Listing, preferences: &UserPreferences) -> (u8, Vec<String>) {
    let mut points = 0;
    let mut reasons = Vec::new();

    let city = normalize(&listing.city);
    let preferred_cities: Vec<String> = preferences
        .cities
        .iter()
        .map(|city| normalize(city))
        .filter(|city| !city.is_empty())
        .collect();

    if preferred_cities.iter().any(|preferred| preferred == &city) {
        points += CITY_POINTS;
        reasons.push(format!("located in {}", listing.city.trim()));
    } else {
        let address = normalize(&listing.address);
        if let Some(token) = preferred_cities
            .iter()
            .find(|preferred| address.contains(preferred.as_str()))
        {
            points += PARTIAL_LOCATION_POINTS;
            reasons.push(format!("address mentions {token}"));
        }
    }

    if preferences.property_types.contains(&listing.property_type) {
        points += PROPERTY_TYPE_POINTS;
        reasons.push(format!("property type {}", listing.property_type.label()));
    }

    if preferences.transaction == Some(listing.transaction) {
        points += TRANSACTION_POINTS;
        reasons.push(format!("for {}", listing.transaction.label()));
    }

    if let Some(range) = preferences.price_range.as_deref().and_then(PriceRange::parse) {
        if range.fits(parse_price(&listing.price)) {
            points += PRICE_POINTS;
            reasons.push(format!("price {} within budget", listing.price.trim()));
        }
    }

    if let Some(min_area) = preferences.min_area {
        if listing.area >= min_area {
            points += AREA_POINTS;
            reasons.push(format!("{} m² meets minimum {} m²", listing.area, min_area));
        }
    }

    if let Some(min_bedrooms) = preferences.min_bedrooms {
        if listing.bedrooms.is_some_and(|bedrooms| bedrooms >= min_bedrooms) {
            points += BEDROOM_POINTS;
            reasons.push(format!("at least {min_bedrooms} bedroom(s)"));
        }
    }

    if listing.images.len() >= RICH_IMAGE_COUNT {
        points += IMAGE_RICHNESS_POINTS;
        reasons.push("detailed photo set".to_string());
    }

    if listing.description.trim().chars().count() >= RICH_DESCRIPTION_CHARS {
        points += DESCRIPTION_RICHNESS_POINTS;
        reasons.push("detailed description".to_string());
    }

    (points.min(MAX_SCORE) as u8, reasons)
}
