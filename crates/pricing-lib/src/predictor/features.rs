//! Feature derivation for ML inference
//!
//! Computes secondary features from a property record: house age,
//! a garage-or-storage indicator, a per-area price proxy, and one-hot
//! flags for the recognized city-part buckets. Derivation is pure; the
//! same record always yields the same feature set.

use crate::config::PipelineConfig;
use crate::models::{DerivedFeatureSet, PropertyRecord, RawField};

pub const AGE_OF_HOUSE: &str = "AgeOfHouse";
pub const HAS_GARAGE_OR_STORAGE: &str = "HasGarageOrStorage";
pub const PRICE_PER_SQM: &str = "PricePerSqm";
pub const CITY_PART_PREFIX: &str = "CityPart_";

/// Column name of a city-part one-hot flag
pub fn city_part_column(bucket: i64) -> String {
    format!("{}{}", CITY_PART_PREFIX, bucket)
}

/// Derives the full feature set the artifact may have been trained on
#[derive(Debug, Clone)]
pub struct FeatureDeriver {
    reference_year: i64,
    price_per_sqm_multiplier: f64,
    city_part_buckets: Vec<i64>,
}

impl FeatureDeriver {
    pub fn new(config: &PipelineConfig) -> Self {
        let mut buckets = config.city_part_buckets.clone();
        buckets.sort_unstable();
        buckets.dedup();
        Self {
            reference_year: config.reference_year,
            price_per_sqm_multiplier: config.price_per_sqm_multiplier,
            city_part_buckets: buckets,
        }
    }

    pub fn reference_year(&self) -> i64 {
        self.reference_year
    }

    pub fn city_part_buckets(&self) -> &[i64] {
        &self.city_part_buckets
    }

    /// Raw fields first, then computed columns, then city-part flags
    pub fn derive(&self, record: &PropertyRecord) -> DerivedFeatureSet {
        let mut set =
            DerivedFeatureSet::with_capacity(RawField::ALL.len() + 3 + self.city_part_buckets.len());

        for (field, value) in record.fields() {
            set.push(field.name(), value);
        }

        set.push(AGE_OF_HOUSE, self.house_age(record));
        set.push(HAS_GARAGE_OR_STORAGE, self.garage_or_storage(record));
        set.push(PRICE_PER_SQM, self.price_proxy(record));

        // Values outside the bucket set leave every flag at zero
        for &bucket in &self.city_part_buckets {
            let hot = if record.city_part_range == bucket { 1.0 } else { 0.0 };
            set.push(city_part_column(bucket), hot);
        }

        set
    }

    fn house_age(&self, record: &PropertyRecord) -> f64 {
        // i64 subtraction can overflow on saturated years
        self.reference_year as f64 - record.made as f64
    }

    fn garage_or_storage(&self, record: &PropertyRecord) -> f64 {
        if record.garage > 0 || record.has_storage_room {
            1.0
        } else {
            0.0
        }
    }

    fn price_proxy(&self, record: &PropertyRecord) -> f64 {
        record.square_meters as f64 * self.price_per_sqm_multiplier
    }
}

impl Default for FeatureDeriver {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}
