//! JSON and CSV export of a car list.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::models::Car;

/// Byte order mark so spreadsheet tools detect UTF-8.
const UTF8_BOM: char = '\u{feff}';

const CSV_HEADERS: [&str; 8] = [
    "Year",
    "Brand",
    "Model",
    "Color",
    "Price (EUR)",
    "Mileage",
    "Description",
    "Image URL",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn default_filename(&self) -> &'static str {
        match self {
            ExportFormat::Json => "classic-cars.json",
            ExportFormat::Csv => "classic-cars.csv",
        }
    }

    /// Render `cars`, or `None` when there is nothing to export.
    pub fn render(&self, cars: &[&Car]) -> Result<Option<String>> {
        if cars.is_empty() {
            return Ok(None);
        }
        match self {
            ExportFormat::Json => to_json(cars).map(Some),
            ExportFormat::Csv => Ok(to_csv(cars)),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(anyhow::anyhow!("Unknown export format: {}", other)),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "JSON"),
            ExportFormat::Csv => write!(f, "CSV"),
        }
    }
}

pub fn to_json(cars: &[&Car]) -> Result<String> {
    serde_json::to_string_pretty(cars).context("Failed to serialize cars to JSON")
}

fn csv_cell(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn csv_row<I: IntoIterator<Item = String>>(cells: I) -> String {
    cells
        .into_iter()
        .map(|c| csv_cell(&c))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn to_csv(cars: &[&Car]) -> Option<String> {
    if cars.is_empty() {
        return None;
    }

    let mut lines = Vec::with_capacity(cars.len() + 1);
    lines.push(csv_row(CSV_HEADERS.iter().map(|h| h.to_string())));

    for car in cars {
        let d = &car.details;
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        lines.push(csv_row([
            d.year.map(|y| y.to_string()).unwrap_or_default(),
            text(&d.brand),
            text(&d.model),
            text(&d.color),
            d.price.map(|p| p.to_string()).unwrap_or_default(),
            d.mileage.map(|m| m.to_string()).unwrap_or_default(),
            text(&d.description),
            text(&d.image_url),
        ]));
    }

    let mut out = String::new();
    out.push(UTF8_BOM);
    out.push_str(&lines.join("\n"));
    Some(out)
}
