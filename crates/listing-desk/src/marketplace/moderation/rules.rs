use super::super::domain::Listing;
use super::config::ModerationConfig;

pub(crate) const TITLE_MIN_CHARS: usize = 10;
pub(crate) const DESCRIPTION_MIN_CHARS: usize = 50;
pub(crate) const RECOMMENDED_IMAGES: usize = 3;

pub(crate) const SHORT_TITLE_PENALTY: u32 = 15;
pub(crate) const SHORT_DESCRIPTION_PENALTY: u32 = 10;
pub(crate) const NO_IMAGES_PENALTY: u32 = 20;
pub(crate) const FEW_IMAGES_PENALTY: u32 = 5;
pub(crate) const FORBIDDEN_WORD_PENALTY: u32 = 20;
pub(crate) const DUPLICATE_PENALTY: u32 = 15;

/// Unclamped penalties plus the human-readable trail explaining them.
#[derive(Debug, Default)]
pub(crate) struct RiskTally {
    pub raw_score: u32,
    pub flags: Vec<String>,
    pub suggestions: Vec<String>,
}

impl RiskTally {
    fn penalize(&mut self, penalty: u32, flag: Option<String>, suggestion: Option<&str>) {
        self.raw_score += penalty;
        if let Some(flag) = flag {
            self.flags.push(flag);
        }
        if let Some(suggestion) = suggestion {
            self.suggestions.push(suggestion.to_string());
        }
    }
}

pub(crate) fn assess(
    listing: &Listing,
    existing: &[Listing],
    config: &ModerationConfig,
) -> RiskTally {
    let mut tally = RiskTally::default();
    let title = listing.title.trim();
    let description = listing.description.trim();

    if title.chars().count() < TITLE_MIN_CHARS {
        tally.penalize(SHORT_TITLE_PENALTY, Some("title too short".to_string()), None);
    }

    if description.chars().count() < DESCRIPTION_MIN_CHARS {
        tally.penalize(
            SHORT_DESCRIPTION_PENALTY,
            Some("description too short".to_string()),
            Some("Describe the property in more detail: layout, legal status, nearby amenities."),
        );
    }

    match listing.images.len() {
        0 => tally.penalize(
            NO_IMAGES_PENALTY,
            Some("needs at least one image".to_string()),
            None,
        ),
        count if count < RECOMMENDED_IMAGES => tally.penalize(
            FEW_IMAGES_PENALTY,
            None,
            Some("Add at least 3 photos so buyers can judge the property."),
        ),
        _ => {}
    }

    let haystack = format!("{title} {description}").to_lowercase();
    for word in config.forbidden_words() {
        if haystack.contains(word.as_str()) {
            tally.penalize(
                FORBIDDEN_WORD_PENALTY,
                Some(format!("forbidden word: {word}")),
                None,
            );
        }
    }

    if !title.is_empty() && has_duplicate_title(listing, existing) {
        tally.penalize(
            DUPLICATE_PENALTY,
            Some("duplicate from same seller".to_string()),
            None,
        );
    }

    tally
}

fn has_duplicate_title(listing: &Listing, existing: &[Listing]) -> bool {
    let title = listing.title.trim();
    existing.iter().any(|other| {
        other.id != listing.id && other.seller_id == listing.seller_id && other.title.trim() == title
    })
}
