//! Converts an arbitrary beverage (ABV% and volume) into standard drinks.

use crate::types::DEFAULT_STD_DRINK_GRAMS;

/// Density of ethanol in g/mL
pub const ETHANOL_DENSITY: f64 = 0.789;

/// Standard drinks (10 g each) in `volume_ml` of a beverage at `abv_percent`
pub fn to_standard_drinks(abv_percent: f64, volume_ml: f64) -> f64 {
    to_standard_drinks_with(abv_percent, volume_ml, DEFAULT_STD_DRINK_GRAMS)
}

/// Same as [`to_standard_drinks`] for regions with a different standard drink
pub fn to_standard_drinks_with(abv_percent: f64, volume_ml: f64, std_drink_grams: f64) -> f64 {
    if !(abv_percent.is_finite() && volume_ml.is_finite() && std_drink_grams.is_finite()) {
        return 0.0;
    }
    if abv_percent < 0.0 || volume_ml < 0.0 || std_drink_grams <= 0.0 {
        return 0.0;
    }
    let grams = volume_ml * abv_percent * ETHANOL_DENSITY / 100.0;
    grams / std_drink_grams
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glass_of_wine() {
        let drinks = to_standard_drinks(12.0, 150.0);
        assert!((drinks - 1.4202).abs() < 1e-4, "got {}", drinks);
    }

    #[test]
    fn test_pint_of_beer() {
        // 500 ml at 5% is just under two standard drinks
        let drinks = to_standard_drinks(5.0, 500.0);
        assert!((drinks - 1.9725).abs() < 1e-4);
    }

    #[test]
    fn test_other_region_standard() {
        let nl = to_standard_drinks(40.0, 35.0);
        let us = to_standard_drinks_with(40.0, 35.0, 14.0);
        assert!(nl > us);
        assert!((nl * 10.0 - us * 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_nonsense_input_is_zero() {
        assert_eq!(to_standard_drinks(f64::NAN, 150.0), 0.0);
        assert_eq!(to_standard_drinks(12.0, -1.0), 0.0);
        assert_eq!(to_standard_drinks_with(12.0, 150.0, 0.0), 0.0);
        assert_eq!(to_standard_drinks(0.0, 330.0), 0.0);
    }
}
