//! Pipeline configuration

use serde::{Deserialize, Serialize};

/// Year house age is measured against. Fixed so results are reproducible.
pub const DEFAULT_REFERENCE_YEAR: i64 = 2025;

/// Multiplier for the per-area price proxy feature
pub const DEFAULT_PRICE_PER_SQM_MULTIPLIER: f64 = 1000.0;

/// City-part values the training side one-hot encoded
pub const DEFAULT_CITY_PART_BUCKETS: [i64; 7] = [3, 4, 5, 6, 7, 9, 10];

/// Configuration for feature derivation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Year used to compute `AgeOfHouse`
    #[serde(default = "default_reference_year")]
    pub reference_year: i64,

    /// Constant applied to `squareMeters` for `PricePerSqm`
    #[serde(default = "default_price_multiplier")]
    pub price_per_sqm_multiplier: f64,

    /// Recognized `cityPartRange` buckets, one `CityPart_<n>` flag each
    #[serde(default = "default_city_part_buckets")]
    pub city_part_buckets: Vec<i64>,
}

fn default_reference_year() -> i64 {
    DEFAULT_REFERENCE_YEAR
}

fn default_price_multiplier() -> f64 {
    DEFAULT_PRICE_PER_SQM_MULTIPLIER
}

fn default_city_part_buckets() -> Vec<i64> {
    DEFAULT_CITY_PART_BUCKETS.to_vec()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reference_year: default_reference_year(),
            price_per_sqm_multiplier: default_price_multiplier(),
            city_part_buckets: default_city_part_buckets(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: PipelineConfig = serde_json::from_str(r#"{"reference_year": 2030}"#).unwrap();
        assert_eq!(config.reference_year, 2030);
        assert_eq!(config.price_per_sqm_multiplier, DEFAULT_PRICE_PER_SQM_MULTIPLIER);
        assert_eq!(config.city_part_buckets, vec![3, 4, 5, 6, 7, 9, 10]);
    }
}
