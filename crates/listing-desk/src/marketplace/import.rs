//! Bulk listing drafts from CSV exports.
//!
//! Expected header: `title, description, property_type, transaction, price, area, bedrooms,
//! bathrooms, city, district, address, images`, with `images` separated by `|`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::domain::{ListingDraft, PropertyType, TransactionKind};

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { row: usize, message: String },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read listing export: {}", err),
            ImportError::Csv(err) => write!(f, "invalid listing CSV data: {}", err),
            ImportError::InvalidRow { row, message } => {
                write!(f, "listing row {}: {}", row, message)
            }
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::InvalidRow { .. } => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub fn load_listing_drafts(path: impl AsRef<Path>) -> Result<Vec<ListingDraft>, ImportError> {
    let file = File::open(path)?;
    parse_listing_drafts(file)
}

/// Rows are numbered from 1, excluding the header.
pub fn parse_listing_drafts<R: Read>(reader: R) -> Result<Vec<ListingDraft>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut drafts = Vec::new();

    for (index, record) in csv_reader.deserialize::<ListingRow>().enumerate() {
        let row = record?;
        drafts.push(row.into_draft(index + 1)?);
    }

    Ok(drafts)
}

#[derive(Debug, Deserialize)]
struct ListingRow {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    property_type: String,
    transaction: String,
    price: String,
    area: f64,
    #[serde(default)]
    bedrooms: Option<u8>,
    #[serde(default)]
    bathrooms: Option<u8>,
    city: String,
    #[serde(default)]
    district: String,
    #[serde(default)]
    address: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    images: Option<String>,
}

impl ListingRow {
    fn into_draft(self, row: usize) -> Result<ListingDraft, ImportError> {
        let property_type =
            PropertyType::parse(&self.property_type).ok_or_else(|| ImportError::InvalidRow {
                row,
                message: format!("unknown property type '{}'", self.property_type),
            })?;
        let transaction =
            TransactionKind::parse(&self.transaction).ok_or_else(|| ImportError::InvalidRow {
                row,
                message: format!("unknown transaction '{}'", self.transaction),
            })?;

        let images = self
            .images
            .as_deref()
            .map(|raw| {
                raw.split('|')
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(ListingDraft {
            title: self.title,
            description: self.description,
            property_type,
            transaction,
            price: self.price,
            area: self.area,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            city: self.city,
            district: self.district,
            address: self.address,
            images,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
