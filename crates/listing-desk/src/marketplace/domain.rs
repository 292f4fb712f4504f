use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier wrapper for listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListingId(pub String);

/// Identifier for any marketplace user (seller, broker, buyer, admin).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrokerRequestId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(pub String);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for BrokerRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Apartment,
    House,
    Land,
    Office,
}

impl PropertyType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Apartment => "apartment",
            Self::House => "house",
            Self::Land => "land",
            Self::Office => "office",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "apartment" => Some(Self::Apartment),
            "house" => Some(Self::House),
            "land" => Some(Self::Land),
            "office" => Some(Self::Office),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Buy,
    Rent,
}

impl TransactionKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Rent => "rent",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "buy" | "sale" => Some(Self::Buy),
            "rent" => Some(Self::Rent),
            _ => None,
        }
    }
}

/// Listing lifecycle:
/// `draft -> pending_moderation -> {approved | rejected}`, `approved -> active`,
/// `active -> {done | cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Draft,
    PendingModeration,
    Approved,
    Rejected,
    Active,
    Done,
    Cancelled,
}

impl ListingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingModeration => "pending_moderation",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Active => "active",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Done | Self::Cancelled)
    }

    pub const fn is_published(self) -> bool {
        matches!(self, Self::Approved | Self::Active)
    }

    /// The moderation decision a listing in this status must carry.
    pub const fn expected_decision(self) -> ModerationDecision {
        match self {
            Self::Draft | Self::PendingModeration => ModerationDecision::NeedReview,
            Self::Rejected => ModerationDecision::Rejected,
            Self::Approved | Self::Active | Self::Done | Self::Cancelled => {
                ModerationDecision::Approved
            }
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    Pending,
    NeedReview,
    AutoApproved,
    AutoRejected,
    ManuallyApproved,
    ManuallyRejected,
}

impl ModerationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::NeedReview => "need_review",
            Self::AutoApproved => "auto_approved",
            Self::AutoRejected => "auto_rejected",
            Self::ManuallyApproved => "manually_approved",
            Self::ManuallyRejected => "manually_rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModerationDecision {
    Approved,
    Rejected,
    NeedReview,
}

impl ModerationDecision {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::NeedReview => "NEED_REVIEW",
        }
    }
}

/// Risk assessment embedded in its listing. Overwritten wholesale on every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationResult {
    pub status: ModerationStatus,
    pub decision: ModerationDecision,
    pub risk_score: u8,
    pub flags: Vec<String>,
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Default for ModerationResult {
    fn default() -> Self {
        Self {
            status: ModerationStatus::Pending,
            decision: ModerationDecision::NeedReview,
            risk_score: 0,
            flags: Vec::new(),
            suggestions: Vec::new(),
            reviewed_by: None,
            reviewed_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl BrokerRequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

/// Proposal that a broker take responsibility for a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerRequest {
    pub id: BrokerRequestId,
    pub broker_id: UserId,
    pub status: BrokerRequestStatus,
    pub requested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
    pub seller_name: String,
    /// Pending `takeover_fee` entry recorded when the request was accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_payment: Option<PaymentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_settled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub reporter_id: UserId,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// A property advertisement together with its embedded moderation, takeover and report
/// records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub seller_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible_broker_id: Option<UserId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub property_type: PropertyType,
    pub transaction: TransactionKind,
    pub price: String,
    pub area: f64,
    #[serde(default)]
    pub bedrooms: Option<u8>,
    #[serde(default)]
    pub bathrooms: Option<u8>,
    pub city: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub status: ListingStatus,
    #[serde(default)]
    pub moderation: ModerationResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub broker_requests: Vec<BrokerRequest>,
    #[serde(default)]
    pub reports: Vec<Report>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pushed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Visibility condition used by recommendations.
    pub fn is_published(&self) -> bool {
        self.status.is_published() && self.moderation.decision != ModerationDecision::Rejected
    }

    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.seller_id == user
    }

    pub fn is_managed_by(&self, user: &UserId) -> bool {
        self.responsible_broker_id.as_ref() == Some(user)
    }

    /// Owner or the currently attached broker.
    pub fn can_be_operated_by(&self, user: &UserId) -> bool {
        self.is_owned_by(user) || self.is_managed_by(user)
    }

    pub fn status_matches_moderation(&self) -> bool {
        self.status.expected_decision() == self.moderation.decision
    }

    pub fn broker_request(&self, id: &BrokerRequestId) -> Option<&BrokerRequest> {
        self.broker_requests.iter().find(|request| &request.id == id)
    }

    pub fn broker_request_mut(&mut self, id: &BrokerRequestId) -> Option<&mut BrokerRequest> {
        self.broker_requests
            .iter_mut()
            .find(|request| &request.id == id)
    }

    /// Accepted request belonging to the currently attached broker, if any.
    pub fn active_takeover(&self) -> Option<&BrokerRequest> {
        let broker = self.responsible_broker_id.as_ref()?;
        self.broker_requests
            .iter()
            .rev()
            .find(|request| {
                &request.broker_id == broker && request.status == BrokerRequestStatus::Accepted
            })
    }

    /// True once the attached broker's takeover fee has been settled.
    pub fn broker_has_full_rights(&self) -> bool {
        self.active_takeover()
            .map(|request| request.fee_settled_at.is_some())
            .unwrap_or(false)
    }
}

/// Seller-supplied content for a new listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub property_type: PropertyType,
    pub transaction: TransactionKind,
    pub price: String,
    pub area: f64,
    #[serde(default)]
    pub bedrooms: Option<u8>,
    #[serde(default)]
    pub bathrooms: Option<u8>,
    pub city: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
    pub price: Option<String>,
    pub area: Option<f64>,
    pub bedrooms: Option<u8>,
    pub bathrooms: Option<u8>,
    pub property_type: Option<PropertyType>,
    pub transaction: Option<TransactionKind>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub address: Option<String>,
}

impl ListingEdit {
    /// Whether applying the edit would change moderated content (title, description, images).
    pub fn changes_content_of(&self, listing: &Listing) -> bool {
        self.title
            .as_ref()
            .is_some_and(|title| title != &listing.title)
            || self
                .description
                .as_ref()
                .is_some_and(|description| description != &listing.description)
            || self
                .images
                .as_ref()
                .is_some_and(|images| images != &listing.images)
    }

    pub(crate) fn apply_to(self, listing: &mut Listing) {
        if let Some(title) = self.title {
            listing.title = title;
        }
        if let Some(description) = self.description {
            listing.description = description;
        }
        if let Some(images) = self.images {
            listing.images = images;
        }
        if let Some(price) = self.price {
            listing.price = price;
        }
        if let Some(area) = self.area {
            listing.area = area;
        }
        if let Some(bedrooms) = self.bedrooms {
            listing.bedrooms = Some(bedrooms);
        }
        if let Some(bathrooms) = self.bathrooms {
            listing.bathrooms = Some(bathrooms);
        }
        if let Some(property_type) = self.property_type {
            listing.property_type = property_type;
        }
        if let Some(transaction) = self.transaction {
            listing.transaction = transaction;
        }
        if let Some(city) = self.city {
            listing.city = city;
        }
        if let Some(district) = self.district {
            listing.district = district;
        }
        if let Some(address) = self.address {
            listing.address = address;
        }
    }
}

/// Buyer's standing search profile. One per buyer; a later save overwrites it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    pub transaction: Option<TransactionKind>,
    pub property_types: Vec<PropertyType>,
    pub cities: Vec<String>,
    /// "min-max" with a currency-scale word, e.g. "1-5 tỷ".
    pub price_range: Option<String>,
    pub min_area: Option<f64>,
    pub min_bedrooms: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Guest,
    User,
    Seller,
    Broker,
    Admin,
    /// Internal callers such as the payment gateway callback.
    System,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::User => "user",
            Self::Seller => "seller",
            Self::Broker => "broker",
            Self::Admin => "admin",
            Self::System => "system",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "guest" => Some(Self::Guest),
            "user" => Some(Self::User),
            "seller" => Some(Self::Seller),
            "broker" => Some(Self::Broker),
            "admin" => Some(Self::Admin),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    pub const fn is_authenticated(self) -> bool {
        !matches!(self, Self::Guest)
    }
}

/// Already-resolved caller identity supplied by the surrounding application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId(id.into()),
            role,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.role.label())
    }
}
