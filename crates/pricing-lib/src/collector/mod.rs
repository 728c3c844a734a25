//! Input collection
//!
//! Turns the caller's raw field map into a canonical [`PropertyRecord`].
//! Range checks belong to the form layer (see [`domain`]); the collector
//! only requires that every recognized field is present and well-typed.

pub mod domain;

pub use domain::{FieldDomain, FIELD_DOMAINS};

use crate::error::PipelineError;
use crate::models::{FieldKind, FieldValue, PropertyRecord, RawField, RawInput};
use tracing::debug;

/// Builds property records from raw field maps
#[derive(Debug, Clone, Copy, Default)]
pub struct InputCollector;

impl InputCollector {
    pub fn new() -> Self {
        Self
    }

    /// Collect a complete record, failing if any recognized field is absent
    pub fn collect(&self, input: &RawInput) -> Result<PropertyRecord, PipelineError> {
        let missing: Vec<String> = RawField::ALL
            .iter()
            .filter(|f| !input.contains_key(f.name()))
            .map(|f| f.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::IncompleteInput { missing });
        }

        for key in input.keys() {
            if RawField::from_name(key).is_none() {
                debug!(field = %key, "Ignoring unrecognized input field");
            }
        }

        let int = |field: RawField| integer_value(field, &input[field.name()]);
        let flag = |field: RawField| boolean_value(field, &input[field.name()]);

        Ok(PropertyRecord {
            square_meters: int(RawField::SquareMeters)?,
            number_of_rooms: int(RawField::NumberOfRooms)?,
            has_yard: flag(RawField::HasYard)?,
            has_pool: flag(RawField::HasPool)?,
            floors: int(RawField::Floors)?,
            city_code: int(RawField::CityCode)?,
            city_part_range: int(RawField::CityPartRange)?,
            num_prev_owners: int(RawField::NumPrevOwners)?,
            made: int(RawField::Made)?,
            is_new_built: flag(RawField::IsNewBuilt)?,
            has_storm_protector: flag(RawField::HasStormProtector)?,
            basement: int(RawField::Basement)?,
            attic: int(RawField::Attic)?,
            garage: int(RawField::Garage)?,
            has_storage_room: flag(RawField::HasStorageRoom)?,
            has_guest_room: flag(RawField::HasGuestRoom)?,
        })
    }
}

fn integer_value(field: RawField, value: &FieldValue) -> Result<i64, PipelineError> {
    debug_assert_eq!(field.kind(), FieldKind::Integer);
    match *value {
        FieldValue::Number(n) if n.is_finite() && n.fract() == 0.0 => Ok(n as i64),
        FieldValue::Number(n) => Err(invalid(field, format!("expected an integer, got {}", n))),
        FieldValue::Bool(_) => Err(invalid(field, "expected an integer, got a boolean")),
    }
}

fn boolean_value(field: RawField, value: &FieldValue) -> Result<bool, PipelineError> {
    debug_assert_eq!(field.kind(), FieldKind::Boolean);
    match *value {
        FieldValue::Bool(b) => Ok(b),
        // Checkbox values sometimes arrive already encoded as 0/1
        FieldValue::Number(n) if n == 0.0 => Ok(false),
        FieldValue::Number(n) if n == 1.0 => Ok(true),
        FieldValue::Number(n) => Err(invalid(field, format!("expected a boolean, got {}", n))),
    }
}

fn invalid(field: RawField, reason: impl Into<String>) -> PipelineError {
    PipelineError::InvalidInput {
        field: field.name().to_string(),
        reason: reason.into(),
    }
}
