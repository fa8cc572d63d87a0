//! Beverage catalog.
//!
//! Built-in beverage types carry the standard-drink multiplier used by the
//! planner. Custom drinks from the config file are converted from their ABV
//! and volume and merged on top.

use crate::config::CustomBeverage;
use crate::converter::to_standard_drinks_with;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fallback type for anything the catalog does not know
pub const OTHER_ID: &str = "other";

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<BeverageCatalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static BeverageCatalog {
    &DEFAULT_CATALOG
}

/// One kind of drink
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BeverageDefinition {
    pub id: String,
    /// Display label used on drink moments
    pub name: String,
    /// Standard drinks per glass
    pub multiplier: f64,
    pub abv_percent: Option<f64>,
    pub volume_ml: Option<f64>,
    pub builtin: bool,
}

#[derive(Clone, Debug, Default)]
pub struct BeverageCatalog {
    pub beverages: HashMap<String, BeverageDefinition>,
}

/// Builds the catalog with the built-in beverage types
pub fn build_default_catalog() -> BeverageCatalog {
    let mut beverages = HashMap::new();

    for (id, name, multiplier, abv, volume) in [
        ("wine", "Wijn", 1.2, 12.0, 150.0),
        ("beer", "Bier", 0.8, 5.0, 250.0),
        ("cocktail", "Cocktail", 1.5, 20.0, 100.0),
        (OTHER_ID, "Overig", 1.0, 40.0, 35.0),
    ] {
        beverages.insert(
            id.to_string(),
            BeverageDefinition {
                id: id.to_string(),
                name: name.to_string(),
                multiplier,
                abv_percent: Some(abv),
                volume_ml: Some(volume),
                builtin: true,
            },
        );
    }

    BeverageCatalog { beverages }
}

impl BeverageCatalog {
    /// Default catalog extended with the user's custom drinks
    pub fn with_custom(custom: &[CustomBeverage], std_drink_grams: f64) -> Self {
        let mut catalog = build_default_catalog();
        for drink in custom {
            let multiplier = to_standard_drinks_with(drink.abv_percent, drink.volume_ml, std_drink_grams);
            tracing::debug!(
                "Custom beverage {} ({}% x {} ml) = {:.2} standard drinks",
                drink.id,
                drink.abv_percent,
                drink.volume_ml,
                multiplier
            );
            catalog.beverages.insert(
                drink.id.clone(),
                BeverageDefinition {
                    id: drink.id.clone(),
                    name: drink.name.clone(),
                    multiplier,
                    abv_percent: Some(drink.abv_percent),
                    volume_ml: Some(drink.volume_ml),
                    builtin: false,
                },
            );
        }
        catalog
    }

    pub fn get(&self, id: &str) -> Option<&BeverageDefinition> {
        self.beverages.get(id)
    }

    /// Standard drinks per glass; unknown types count as one
    pub fn multiplier(&self, id: &str) -> f64 {
        match self.get(id) {
            Some(def) => def.multiplier,
            None => {
                tracing::debug!("Unknown beverage type {:?}, counting as {}", id, OTHER_ID);
                self.get(OTHER_ID).map(|d| d.multiplier).unwrap_or(1.0)
            }
        }
    }

    pub fn label(&self, id: &str) -> String {
        self.get(id)
            .map(|d| d.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Sorted ids, for listing
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.beverages.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Check the catalog for unusable definitions
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.beverages.contains_key(OTHER_ID) {
            errors.push(format!("Fallback beverage '{}' missing", OTHER_ID));
        }

        for (key, def) in &self.beverages {
            if key != &def.id {
                errors.push(format!("Beverage key {} does not match id {}", key, def.id));
            }
            if def.id.trim().is_empty() {
                errors.push("Beverage with empty id".to_string());
            }
            if !(def.multiplier.is_finite() && def.multiplier > 0.0) {
                errors.push(format!(
                    "Beverage {} has unusable multiplier {}",
                    def.id, def.multiplier
                ));
            }
        }

        errors.sort();
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_multipliers() {
        let catalog = build_default_catalog();
        assert_eq!(catalog.multiplier("wine"), 1.2);
        assert_eq!(catalog.multiplier("beer"), 0.8);
        assert_eq!(catalog.multiplier("cocktail"), 1.5);
        assert_eq!(catalog.multiplier("other"), 1.0);
    }

    #[test]
    fn test_unknown_type_counts_as_other() {
        let catalog = get_default_catalog();
        assert_eq!(catalog.multiplier("mead"), 1.0);
        assert_eq!(catalog.label("mead"), "mead");
        assert_eq!(catalog.label("wine"), "Wijn");
    }

    #[test]
    fn test_custom_drink_uses_converter() {
        let custom = vec![CustomBeverage {
            id: "ipa".into(),
            name: "IPA".into(),
            abv_percent: 6.5,
            volume_ml: 330.0,
        }];
        let catalog = BeverageCatalog::with_custom(&custom, 10.0);
        let ipa = catalog.get("ipa").unwrap();
        assert!(!ipa.builtin);
        assert!((ipa.multiplier - 1.6924).abs() < 1e-3);
        assert!(catalog.validate().is_empty());
    }

    #[test]
    fn test_validate_flags_zero_strength_custom_drink() {
        let custom = vec![CustomBeverage {
            id: "alcohol_free".into(),
            name: "0.0".into(),
            abv_percent: 0.0,
            volume_ml: 330.0,
        }];
        let catalog = BeverageCatalog::with_custom(&custom, 10.0);
        let errors = catalog.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("alcohol_free"));
    }

    #[test]
    fn test_default_catalog_validates() {
        let errors = get_default_catalog().validate();
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }
}
