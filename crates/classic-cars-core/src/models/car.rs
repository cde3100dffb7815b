use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::utils::{format_mileage, format_price};

/// Prefix of identifiers generated by the demo-mode store.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Prefix of identifiers assigned to bundled seed entries.
pub const SEED_ID_PREFIX: &str = "mock-";

/// Image used when a car is created without one.
pub const DEFAULT_IMAGE_URL: &str = "./imgs/classic-cars.jpg";

/// Oldest accepted model year.
pub const MIN_YEAR: i32 = 1900;

/// True for ids that only ever live in local storage and must not be
/// looked up remotely.
pub fn is_local_id(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX) || id.starts_with(SEED_ID_PREFIX)
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field must not be blank: {0}")]
    Blank(&'static str),

    #[error("Year must be between {min} and {max} (got {year})")]
    YearOutOfRange { year: i32, min: i32, max: i32 },

    #[error("Price must be a positive number")]
    InvalidPrice,

    #[error("Image URL is not valid: {0}")]
    InvalidImageUrl(String),
}

/// Descriptive fields of a car. Every field is optional so the same type
/// serves as a full record body and as a partial update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(
        default,
        deserialize_with = "deserialize_mileage",
        skip_serializing_if = "Option::is_none"
    )]
    pub mileage: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    // Older records use "image"
    #[serde(default, alias = "image", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Mileage arrives as any JSON number; fractions round to the nearest km.
fn deserialize_mileage<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<f64>::deserialize(deserializer)? {
        None => Ok(None),
        Some(km) if km.is_finite() && km >= 0.0 => Ok(Some(km.round() as u64)),
        Some(km) => Err(serde::de::Error::custom(format!(
            "mileage must be a non-negative number, got {}",
            km
        ))),
    }
}

impl CarDetails {
    /// Overwrite every field that is present in `patch`.
    pub fn merge(&mut self, patch: &CarDetails) {
        fn take<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        }

        take(&mut self.brand, &patch.brand);
        take(&mut self.model, &patch.model);
        take(&mut self.year, &patch.year);
        take(&mut self.color, &patch.color);
        take(&mut self.price, &patch.price);
        take(&mut self.mileage, &patch.mileage);
        take(&mut self.description, &patch.description);
        take(&mut self.image_url, &patch.image_url);
    }

    /// Check a payload for creation: all core fields must be present.
    pub fn validate_new(&self, current_year: i32) -> Result<(), ValidationError> {
        if self.brand.is_none() {
            return Err(ValidationError::MissingField("brand"));
        }
        if self.model.is_none() {
            return Err(ValidationError::MissingField("model"));
        }
        if self.year.is_none() {
            return Err(ValidationError::MissingField("year"));
        }
        if self.color.is_none() {
            return Err(ValidationError::MissingField("color"));
        }
        if self.price.is_none() {
            return Err(ValidationError::MissingField("price"));
        }
        if self.mileage.is_none() {
            return Err(ValidationError::MissingField("mileage"));
        }
        self.validate_present(current_year)
    }

    /// Check only the fields that are set, as for a partial update.
    pub fn validate_present(&self, current_year: i32) -> Result<(), ValidationError> {
        let required_text = [
            ("brand", &self.brand),
            ("model", &self.model),
            ("color", &self.color),
        ];
        for (name, value) in required_text {
            if let Some(text) = value {
                if text.trim().is_empty() {
                    return Err(ValidationError::Blank(name));
                }
            }
        }

        if let Some(year) = self.year {
            let max = current_year + 1;
            if !(MIN_YEAR..=max).contains(&year) {
                return Err(ValidationError::YearOutOfRange {
                    year,
                    min: MIN_YEAR,
                    max,
                });
            }
        }

        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                return Err(ValidationError::InvalidPrice);
            }
        }

        if let Some(ref image_url) = self.image_url {
            let trimmed = image_url.trim();
            let is_default = trimmed == DEFAULT_IMAGE_URL;
            if !trimmed.is_empty() && !is_default && url::Url::parse(trimmed).is_err() {
                return Err(ValidationError::InvalidImageUrl(trimmed.to_string()));
            }
        }

        Ok(())
    }

    /// Trim text fields and replace a blank image with the default one.
    pub fn normalized_for_create(mut self) -> Self {
        self.trim_text();
        if self.image_url.as_deref().map_or(true, str::is_empty) {
            self.image_url = Some(DEFAULT_IMAGE_URL.to_string());
        }
        self
    }

    pub fn trim_text(&mut self) {
        for field in [
            &mut self.brand,
            &mut self.model,
            &mut self.color,
            &mut self.description,
            &mut self.image_url,
        ] {
            if let Some(value) = field {
                let trimmed = value.trim();
                if trimmed.len() != value.len() {
                    *value = trimmed.to_string();
                }
            }
        }
    }
}

/// A catalog entry.
///
/// The API and older local data carry the identifier under `id`, `_id`, or
/// both, sometimes as a number. Deserialisation collapses them into the one
/// canonical `id`; only `id` is written back out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredCar")]
pub struct Car {
    pub id: String,
    #[serde(flatten)]
    pub details: CarDetails,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct StoredCar {
    #[serde(default)]
    id: Option<RawId>,
    #[serde(rename = "_id", default)]
    legacy_id: Option<RawId>,
    #[serde(rename = "createdAt", default)]
    created_at: Option<String>,
    #[serde(rename = "updatedAt", default)]
    updated_at: Option<String>,
    #[serde(flatten)]
    details: CarDetails,
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

impl TryFrom<StoredCar> for Car {
    type Error = String;

    fn try_from(raw: StoredCar) -> Result<Self, Self::Error> {
        // An empty `id` does not shadow a usable `_id`
        let non_empty = |raw_id: Option<RawId>| {
            raw_id
                .map(RawId::into_string)
                .filter(|id| !id.is_empty())
        };
        let id = non_empty(raw.id)
            .or_else(|| non_empty(raw.legacy_id))
            .ok_or_else(|| "car record has neither `id` nor `_id`".to_string())?;

        Ok(Car {
            id,
            details: raw.details,
            created_at: parse_timestamp(raw.created_at),
            updated_at: parse_timestamp(raw.updated_at),
        })
    }
}

impl Car {
    pub fn new(id: impl Into<String>, details: CarDetails) -> Self {
        Self {
            id: id.into(),
            details,
            created_at: None,
            updated_at: None,
        }
    }

    /// "1965 Ford Mustang", skipping whatever is missing.
    pub fn title(&self) -> String {
        let parts: Vec<String> = [
            self.details.year.map(|y| y.to_string()),
            self.details.brand.clone(),
            self.details.model.clone(),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect();

        if parts.is_empty() {
            format!("Car {}", self.id)
        } else {
            parts.join(" ")
        }
    }

    pub fn display_price(&self) -> String {
        self.details
            .price
            .map(format_price)
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn display_mileage(&self) -> String {
        self.details
            .mileage
            .map(format_mileage)
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn is_local(&self) -> bool {
        is_local_id(&self.id)
    }
}
