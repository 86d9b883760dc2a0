/// Grams per avoirdupois pound.
pub const GRAMS_PER_POUND: f64 = 453.59237;

/// Grams per avoirdupois ounce.
pub const GRAMS_PER_OUNCE: f64 = 28.34952;

/// Grams per kilogram.
pub const GRAMS_PER_KILOGRAM: f64 = 1000.0;

/// Convert a weight expressed in `unit` to grams, the canonical unit for
/// every comparison in the engine.
///
/// Unknown unit symbols are treated as already canonical and the value is
/// returned unchanged.
pub fn to_grams(value: f64, unit: &str) -> f64 {
    match unit.trim().to_ascii_lowercase().as_str() {
        "g" | "gram" | "grams" => value,
        "kg" | "kilogram" | "kilograms" => value * GRAMS_PER_KILOGRAM,
        "lb" | "lbs" | "pound" | "pounds" => value * GRAMS_PER_POUND,
        "oz" | "ounce" | "ounces" => value * GRAMS_PER_OUNCE,
        _ => value,
    }
}
