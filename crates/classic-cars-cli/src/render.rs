//! Plain-text output for the terminal.

use classic_cars_core::cache::CacheStats;
use classic_cars_core::stats::CatalogStats;
use classic_cars_core::utils::{format_mileage, format_number, format_price, truncate_string};
use classic_cars_core::Car;

const ID_WIDTH: usize = 26;
const TITLE_WIDTH: usize = 34;
const COLOR_WIDTH: usize = 12;

pub fn print_car_table(cars: &[&Car]) {
    if cars.is_empty() {
        println!("No cars found.");
        return;
    }

    println!(
        "{:<idw$} {:<tw$} {:<cw$} {:>12} {:>12}",
        "ID",
        "CAR",
        "COLOR",
        "PRICE",
        "MILEAGE",
        idw = ID_WIDTH,
        tw = TITLE_WIDTH,
        cw = COLOR_WIDTH,
    );
    for car in cars {
        println!(
            "{:<idw$} {:<tw$} {:<cw$} {:>12} {:>12}",
            truncate_string(&car.id, ID_WIDTH),
            truncate_string(&car.title(), TITLE_WIDTH),
            truncate_string(car.details.color.as_deref().unwrap_or("-"), COLOR_WIDTH),
            car.display_price(),
            car.display_mileage(),
            idw = ID_WIDTH,
            tw = TITLE_WIDTH,
            cw = COLOR_WIDTH,
        );
    }
    println!("\n{} car(s)", cars.len());
}

pub fn print_car_details(car: &Car) {
    let d = &car.details;
    let field = |v: Option<&str>| v.unwrap_or("-").to_string();

    println!("{}", car.title());
    println!("  ID:          {}", car.id);
    println!("  Color:       {}", field(d.color.as_deref()));
    println!("  Price:       {}", car.display_price());
    println!("  Mileage:     {}", car.display_mileage());
    println!("  Image:       {}", field(d.image_url.as_deref()));
    if let Some(created) = car.created_at {
        println!("  Created:     {}", created.format("%Y-%m-%d %H:%M"));
    }
    if let Some(updated) = car.updated_at {
        println!("  Updated:     {}", updated.format("%Y-%m-%d %H:%M"));
    }
    if let Some(ref description) = d.description {
        println!("\n{}", description);
    }
}

pub fn print_stats(stats: &CatalogStats) {
    println!("Cars:             {}", format_number(stats.total as u64));
    if stats.total == 0 {
        return;
    }
    println!("Average price:    {}", format_price(stats.average_price));
    println!("Price range:      {} - {}", format_price(stats.min_price), format_price(stats.max_price));
    println!("Average year:     {}", stats.average_year);
    println!("Total mileage:    {}", format_mileage(stats.total_mileage));
    println!("Average mileage:  {}", format_mileage(stats.average_mileage));
}

pub fn print_cache_stats(stats: &CacheStats) {
    let state = match (stats.exists, stats.is_valid) {
        (false, _) => "empty",
        (true, true) => "valid",
        (true, false) => "expired",
    };
    println!("Cache:       {}", state);
    println!("Updated:     {}", stats.age_display());
    println!("Max age:     {}s", stats.max_age_seconds);
}
