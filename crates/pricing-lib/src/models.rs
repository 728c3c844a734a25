//! Core data models for the pricing pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of value a raw field carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Integer,
    Boolean,
}

/// Recognized raw input fields, in the order the property form presents them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RawField {
    SquareMeters,
    NumberOfRooms,
    HasYard,
    HasPool,
    Floors,
    CityCode,
    CityPartRange,
    NumPrevOwners,
    Made,
    IsNewBuilt,
    HasStormProtector,
    Basement,
    Attic,
    Garage,
    HasStorageRoom,
    HasGuestRoom,
}

impl RawField {
    /// All raw fields in canonical order
    pub const ALL: [RawField; 16] = [
        RawField::SquareMeters,
        RawField::NumberOfRooms,
        RawField::HasYard,
        RawField::HasPool,
        RawField::Floors,
        RawField::CityCode,
        RawField::CityPartRange,
        RawField::NumPrevOwners,
        RawField::Made,
        RawField::IsNewBuilt,
        RawField::HasStormProtector,
        RawField::Basement,
        RawField::Attic,
        RawField::Garage,
        RawField::HasStorageRoom,
        RawField::HasGuestRoom,
    ];

    /// Column name used by the trained artifact
    pub fn name(self) -> &'static str {
        match self {
            RawField::SquareMeters => "squareMeters",
            RawField::NumberOfRooms => "numberOfRooms",
            RawField::HasYard => "hasYard",
            RawField::HasPool => "hasPool",
            RawField::Floors => "floors",
            RawField::CityCode => "cityCode",
            RawField::CityPartRange => "cityPartRange",
            RawField::NumPrevOwners => "numPrevOwners",
            RawField::Made => "made",
            RawField::IsNewBuilt => "isNewBuilt",
            RawField::HasStormProtector => "hasStormProtector",
            RawField::Basement => "basement",
            RawField::Attic => "attic",
            RawField::Garage => "garage",
            RawField::HasStorageRoom => "hasStorageRoom",
            RawField::HasGuestRoom => "hasGuestRoom",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            RawField::HasYard
            | RawField::HasPool
            | RawField::IsNewBuilt
            | RawField::HasStormProtector
            | RawField::HasStorageRoom
            | RawField::HasGuestRoom => FieldKind::Boolean,
            _ => FieldKind::Integer,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }
}

impl fmt::Display for RawField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single caller-supplied value, as it arrives over JSON
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Number(v as f64)
    }
}

/// Raw field map submitted by the caller, keyed by field name
pub type RawInput = BTreeMap<String, FieldValue>;

/// Canonical property description with every raw field present
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRecord {
    pub square_meters: i64,
    pub number_of_rooms: i64,
    pub has_yard: bool,
    pub has_pool: bool,
    pub floors: i64,
    pub city_code: i64,
    pub city_part_range: i64,
    pub num_prev_owners: i64,
    pub made: i64,
    pub is_new_built: bool,
    pub has_storm_protector: bool,
    pub basement: i64,
    pub attic: i64,
    pub garage: i64,
    pub has_storage_room: bool,
    pub has_guest_room: bool,
}

impl PropertyRecord {
    /// Numeric value of a raw field; booleans encode as 0/1
    pub fn value(&self, field: RawField) -> f64 {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        match field {
            RawField::SquareMeters => self.square_meters as f64,
            RawField::NumberOfRooms => self.number_of_rooms as f64,
            RawField::HasYard => flag(self.has_yard),
            RawField::HasPool => flag(self.has_pool),
            RawField::Floors => self.floors as f64,
            RawField::CityCode => self.city_code as f64,
            RawField::CityPartRange => self.city_part_range as f64,
            RawField::NumPrevOwners => self.num_prev_owners as f64,
            RawField::Made => self.made as f64,
            RawField::IsNewBuilt => flag(self.is_new_built),
            RawField::HasStormProtector => flag(self.has_storm_protector),
            RawField::Basement => self.basement as f64,
            RawField::Attic => self.attic as f64,
            RawField::Garage => self.garage as f64,
            RawField::HasStorageRoom => flag(self.has_storage_room),
            RawField::HasGuestRoom => flag(self.has_guest_room),
        }
    }

    /// Raw fields in canonical order as (field, numeric value)
    pub fn fields(&self) -> impl Iterator<Item = (RawField, f64)> + '_ {
        RawField::ALL.iter().map(move |&f| (f, self.value(f)))
    }

    /// Convert back into a raw field map
    pub fn to_raw_input(&self) -> RawInput {
        self.fields()
            .map(|(field, value)| {
                let v = match field.kind() {
                    FieldKind::Boolean => FieldValue::Bool(value != 0.0),
                    FieldKind::Integer => FieldValue::Number(value),
                };
                (field.name().to_string(), v)
            })
            .collect()
    }
}

/// Property record plus computed features, in insertion order
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DerivedFeatureSet {
    columns: Vec<(String, f64)>,
}

impl DerivedFeatureSet {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: f64) {
        self.columns.push((name.into(), value));
    }

    /// Look up a column by name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| *value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Column names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_field_names_round_trip() {
        for field in RawField::ALL {
            assert_eq!(RawField::from_name(field.name()), Some(field));
        }
        assert_eq!(RawField::from_name("lotSize"), None);
    }

    #[test]
    fn test_field_value_untagged_json() {
        let input: RawInput =
            serde_json::from_str(r#"{"hasYard": true, "squareMeters": 120}"#).unwrap();
        assert_eq!(input["hasYard"], FieldValue::Bool(true));
        assert_eq!(input["squareMeters"], FieldValue::Number(120.0));
    }

    #[test]
    fn test_property_record_serializes_with_raw_names() {
        let record = PropertyRecord {
            square_meters: 100,
            number_of_rooms: 3,
            has_yard: true,
            has_pool: false,
            floors: 1,
            city_code: 75000,
            city_part_range: 5,
            num_prev_owners: 1,
            made: 2000,
            is_new_built: false,
            has_storm_protector: false,
            basement: 0,
            attic: 0,
            garage: 0,
            has_storage_room: false,
            has_guest_room: false,
        };
        let json = serde_json::to_value(&record).unwrap();
        for field in RawField::ALL {
            assert!(json.get(field.name()).is_some(), "missing {}", field);
        }
        assert_eq!(record.value(RawField::HasYard), 1.0);
        assert_eq!(record.to_raw_input().len(), RawField::ALL.len());
    }

    #[test]
    fn test_derived_feature_set_keeps_insertion_order() {
        let mut set = DerivedFeatureSet::with_capacity(2);
        set.push("b", 2.0);
        set.push("a", 1.0);
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(set.get("a"), Some(1.0));
        assert!(!set.contains("c"));
    }
}
