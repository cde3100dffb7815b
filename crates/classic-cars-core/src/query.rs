//! Search and ordering over the loaded car list.
//!
//! Both operations are pure: they borrow the records and never touch
//! storage or the network.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::models::Car;
use crate::utils::{cmp_ignore_case, contains_ignore_case};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Year,
    Brand,
    Model,
    Color,
    Price,
    Mileage,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Year => "year",
            SortField::Brand => "brand",
            SortField::Model => "model",
            SortField::Color => "color",
            SortField::Price => "price",
            SortField::Mileage => "mileage",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// A single field/direction pair, written as `"price-desc"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub field: SortField,
    pub direction: SortDirection,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SortParseError {
    #[error("Unknown sort field: {0} (expected year, brand, model, color, price or mileage)")]
    UnknownField(String),

    #[error("Unknown sort direction: {0} (expected asc or desc)")]
    UnknownDirection(String),
}

impl FromStr for SortOrder {
    type Err = SortParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = s.trim().split_once('-').unwrap_or((s.trim(), "asc"));

        let field = match field.to_ascii_lowercase().as_str() {
            "year" => SortField::Year,
            "brand" => SortField::Brand,
            "model" => SortField::Model,
            "color" => SortField::Color,
            "price" => SortField::Price,
            "mileage" => SortField::Mileage,
            other => return Err(SortParseError::UnknownField(other.to_string())),
        };

        let direction = match direction.to_ascii_lowercase().as_str() {
            "asc" => SortDirection::Ascending,
            "desc" => SortDirection::Descending,
            other => return Err(SortParseError::UnknownDirection(other.to_string())),
        };

        Ok(SortOrder { field, direction })
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.direction {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        };
        write!(f, "{}-{}", self.field.as_str(), direction)
    }
}

enum SortKey<'a> {
    Text(&'a str),
    Number(f64),
}

fn sort_key(car: &Car, field: SortField) -> Option<SortKey<'_>> {
    let d = &car.details;
    match field {
        SortField::Year => d.year.map(|y| SortKey::Number(y as f64)),
        SortField::Brand => d.brand.as_deref().map(SortKey::Text),
        SortField::Model => d.model.as_deref().map(SortKey::Text),
        SortField::Color => d.color.as_deref().map(SortKey::Text),
        SortField::Price => d.price.map(SortKey::Number),
        SortField::Mileage => d.mileage.map(|m| SortKey::Number(m as f64)),
    }
}

fn compare_keys(a: &SortKey<'_>, b: &SortKey<'_>) -> Ordering {
    match (a, b) {
        (SortKey::Text(a), SortKey::Text(b)) => cmp_ignore_case(a, b),
        (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
        // A field always yields the same key kind
        _ => Ordering::Equal,
    }
}

/// Text a search term is matched against.
fn searchable_text(car: &Car) -> String {
    let d = &car.details;
    [
        d.brand.clone(),
        d.model.clone(),
        d.year.map(|y| y.to_string()),
        d.color.clone(),
        d.description.clone(),
        d.price.map(|p| p.to_string()),
        d.mileage.map(|m| m.to_string()),
    ]
    .into_iter()
    .flatten()
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Cars whose text contains `term`, ignoring case. A blank term keeps all.
pub fn filter_cars<'a>(cars: &'a [Car], term: &str) -> Vec<&'a Car> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return cars.iter().collect();
    }
    cars.iter()
        .filter(|car| contains_ignore_case(&searchable_text(car), &term))
        .collect()
}

/// Stable sort; cars without a value for the field go last in both directions.
pub fn sort_cars(cars: &mut [&Car], order: SortOrder) {
    cars.sort_by(|a, b| {
        match (sort_key(a, order.field), sort_key(b, order.field)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(ka), Some(kb)) => {
                let cmp = compare_keys(&ka, &kb);
                match order.direction {
                    SortDirection::Ascending => cmp,
                    SortDirection::Descending => cmp.reverse(),
                }
            }
        }
    });
}

/// Filter then sort, the view shown to the user.
pub fn apply_filters_and_sort<'a>(
    cars: &'a [Car],
    term: &str,
    order: Option<SortOrder>,
) -> Vec<&'a Car> {
    let mut result = filter_cars(cars, term);
    if let Some(order) = order {
        sort_cars(&mut result, order);
    }
    result
}
