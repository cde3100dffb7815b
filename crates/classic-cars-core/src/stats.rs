//! Summary figures over the loaded catalog.

use serde::Serialize;

use crate::models::Car;

/// Aggregates ignore missing, zero and negative values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogStats {
    pub total: usize,
    pub average_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub average_year: i32,
    pub total_mileage: u64,
    pub average_mileage: u64,
}

impl CatalogStats {
    pub fn from_cars<'a>(cars: impl IntoIterator<Item = &'a Car>) -> Self {
        let cars: Vec<&Car> = cars.into_iter().collect();
        if cars.is_empty() {
            return Self::default();
        }

        let prices: Vec<f64> = cars
            .iter()
            .filter_map(|c| c.details.price)
            .filter(|p| *p > 0.0)
            .collect();
        let years: Vec<i32> = cars
            .iter()
            .filter_map(|c| c.details.year)
            .filter(|y| *y > 0)
            .collect();
        let mileages: Vec<u64> = cars
            .iter()
            .filter_map(|c| c.details.mileage)
            .filter(|m| *m > 0)
            .collect();

        let (average_price, min_price, max_price) = if prices.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let sum: f64 = prices.iter().sum();
            (
                sum / prices.len() as f64,
                prices.iter().copied().fold(f64::INFINITY, f64::min),
                prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            )
        };

        let average_year = if years.is_empty() {
            0
        } else {
            let sum: i64 = years.iter().map(|y| *y as i64).sum();
            (sum as f64 / years.len() as f64).round() as i32
        };

        let total_mileage: u64 = mileages.iter().sum();
        let average_mileage = if mileages.is_empty() {
            0
        } else {
            (total_mileage as f64 / mileages.len() as f64).round() as u64
        };

        Self {
            total: cars.len(),
            average_price,
            min_price,
            max_price,
            average_year,
            total_mileage,
            average_mileage,
        }
    }
}
