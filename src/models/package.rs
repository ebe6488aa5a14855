use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

/// Structured package price. Stored as `{amount, currency}`; legacy documents
/// that still carry a formatted display string ("₦2,500,000") are parsed on
/// the way in, and a string that cannot be parsed is an explicit error.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Price {
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PriceParseError {
    #[error("unparsable package price: {0:?}")]
    Unparsable(String),

    #[error("negative package price: {0}")]
    Negative(f64),
}

impl Price {
    pub fn new(amount: f64, currency: impl Into<String>) -> Self {
        Price {
            amount,
            currency: currency.into(),
        }
    }

    /// Parse a human-formatted price string such as "₦2,500,000" or
    /// "$1,200.50". The currency is taken from the leading symbol,
    /// defaulting to NGN.
    pub fn parse_display(raw: &str) -> Result<Price, PriceParseError> {
        let trimmed = raw.trim();

        let currency = if trimmed.starts_with('₦') || trimmed.contains("NGN") {
            "NGN"
        } else if trimmed.starts_with('$') || trimmed.contains("USD") {
            "USD"
        } else if trimmed.starts_with('€') || trimmed.contains("EUR") {
            "EUR"
        } else if trimmed.starts_with('£') || trimmed.contains("GBP") {
            "GBP"
        } else {
            "NGN"
        };

        let digits: String = trimmed
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        if digits.is_empty() || !digits.chars().any(|c| c.is_ascii_digit()) {
            return Err(PriceParseError::Unparsable(raw.to_string()));
        }

        let amount: f64 = digits
            .parse()
            .map_err(|_| PriceParseError::Unparsable(raw.to_string()))?;

        Ok(Price::new(amount, currency))
    }

    pub fn validate(&self) -> Result<(), PriceParseError> {
        if self.amount < 0.0 || !self.amount.is_finite() {
            return Err(PriceParseError::Negative(self.amount));
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum PriceRepr {
            Structured { amount: f64, currency: String },
            Display(String),
        }

        match PriceRepr::deserialize(deserializer)? {
            PriceRepr::Structured { amount, currency } => Ok(Price { amount, currency }),
            PriceRepr::Display(raw) => {
                Price::parse_display(&raw).map_err(serde::de::Error::custom)
            }
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TourPackage {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub price: Price,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime>,
    #[serde(default)]
    pub updated_at: Option<DateTime>,
}

/// Read-only denormalized fields attached to booking responses for display.
/// Never stored on the booking itself.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PackageSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub duration: Option<String>,
    pub rating: Option<f64>,
    pub image: Option<String>,
}

impl TourPackage {
    pub fn summary(&self) -> PackageSummary {
        PackageSummary {
            id: self.id,
            title: self.title.clone(),
            category: self.category.clone(),
            location: self.location.clone(),
            duration: self.duration.clone(),
            rating: self.rating,
            image: self.image.clone(),
        }
    }
}
