//! Input domains for each raw field
//!
//! These mirror the constraints of the property form widgets. They are
//! enforced by whichever layer owns the form (the HTTP service, the CLI),
//! never by the collector itself. `step` is advisory.

use crate::error::PipelineError;
use crate::models::{FieldKind, PropertyRecord, RawField};
use serde::Serialize;

/// Range, step and default for a raw field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDomain {
    pub field: &'static str,
    pub kind: FieldKind,
    pub min: i64,
    pub max: i64,
    pub step: i64,
    pub default: i64,
}

const fn int(field: &'static str, min: i64, max: i64, step: i64, default: i64) -> FieldDomain {
    FieldDomain { field, kind: FieldKind::Integer, min, max, step, default }
}

const fn flag(field: &'static str) -> FieldDomain {
    FieldDomain { field, kind: FieldKind::Boolean, min: 0, max: 1, step: 1, default: 0 }
}

/// Domains in canonical field order
pub const FIELD_DOMAINS: [FieldDomain; 16] = [
    int("squareMeters", 50, 99_999, 10, 50),
    int("numberOfRooms", 1, 100, 1, 3),
    flag("hasYard"),
    flag("hasPool"),
    int("floors", 1, 100, 1, 1),
    int("cityCode", 1000, 99_999, 100, 75_000),
    int("cityPartRange", 1, 10, 1, 5),
    int("numPrevOwners", 0, 10, 1, 1),
    int("made", 1990, 2026, 1, 2000),
    flag("isNewBuilt"),
    flag("hasStormProtector"),
    int("basement", 0, 10_000, 1, 0),
    int("attic", 0, 10_000, 1, 0),
    int("garage", 0, 1000, 1, 0),
    flag("hasStorageRoom"),
    flag("hasGuestRoom"),
];

/// Domain of a single raw field
pub fn domain(field: RawField) -> FieldDomain {
    // FIELD_DOMAINS shares RawField::ALL ordering
    let index = RawField::ALL
        .iter()
        .position(|&f| f == field)
        .unwrap_or_default();
    FIELD_DOMAINS[index]
}

impl FieldDomain {
    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Record populated with every widget's default value
pub fn default_record() -> PropertyRecord {
    let d = |field: RawField| domain(field).default;
    let b = |field: RawField| domain(field).default != 0;
    PropertyRecord {
        square_meters: d(RawField::SquareMeters),
        number_of_rooms: d(RawField::NumberOfRooms),
        has_yard: b(RawField::HasYard),
        has_pool: b(RawField::HasPool),
        floors: d(RawField::Floors),
        city_code: d(RawField::CityCode),
        city_part_range: d(RawField::CityPartRange),
        num_prev_owners: d(RawField::NumPrevOwners),
        made: d(RawField::Made),
        is_new_built: b(RawField::IsNewBuilt),
        has_storm_protector: b(RawField::HasStormProtector),
        basement: d(RawField::Basement),
        attic: d(RawField::Attic),
        garage: d(RawField::Garage),
        has_storage_room: b(RawField::HasStorageRoom),
        has_guest_room: b(RawField::HasGuestRoom),
    }
}

/// Check every integer field against its domain; reports the first violation
pub fn check(record: &PropertyRecord) -> Result<(), PipelineError> {
    for (field, value) in record.fields() {
        let domain = domain(field);
        if domain.kind == FieldKind::Boolean {
            continue;
        }
        let value = value as i64;
        if !domain.contains(value) {
            return Err(PipelineError::InvalidInput {
                field: field.name().to_string(),
                reason: format!(
                    "{} is outside the allowed range [{}, {}]",
                    value, domain.min, domain.max
                ),
            });
        }
    }
    Ok(())
}
