//! Schema reconciliation
//!
//! Aligns a derived feature set to the ordered column list an artifact was
//! trained on. Columns the artifact expects but the pipeline cannot derive
//! are zero-filled; derived columns the artifact does not expect are dropped.

use crate::error::PipelineError;
use crate::models::{DerivedFeatureSet, RawField};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Ordered feature names declared by a loaded artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Arc<[String]>,
}

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> Self {
        Self { names: names.into() }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Schema descriptor captured once when an artifact is accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSchema {
    Declared(FeatureSchema),
    Undeclared,
}

impl ArtifactSchema {
    /// A missing or empty name list both mean "no declared schema"
    pub fn from_names(names: Option<Vec<String>>) -> Self {
        match names {
            Some(names) if !names.is_empty() => ArtifactSchema::Declared(FeatureSchema::new(names)),
            _ => ArtifactSchema::Undeclared,
        }
    }

    pub fn declared(&self) -> Option<&FeatureSchema> {
        match self {
            ArtifactSchema::Declared(schema) => Some(schema),
            ArtifactSchema::Undeclared => None,
        }
    }
}

/// How a vector's column order was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileMode {
    /// Full reconciliation against the artifact's declared schema
    Schema,
    /// Raw fields in canonical order; the artifact declared no schema
    FieldOrder,
}

/// Ordered numeric row ready for the artifact's scaler
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledVector {
    values: Vec<f64>,
    mode: ReconcileMode,
    filled: Vec<String>,
}

impl ReconciledVector {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn mode(&self) -> ReconcileMode {
        self.mode
    }

    /// Schema columns that were absent from the derived set and zero-filled
    pub fn filled_columns(&self) -> &[String] {
        &self.filled
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Aligns derived features to an artifact schema
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaReconciler;

impl SchemaReconciler {
    pub fn new() -> Self {
        Self
    }

    /// Reconcile against the artifact schema, degrading to raw field order
    /// when none is declared
    pub fn reconcile(&self, derived: &DerivedFeatureSet, schema: &ArtifactSchema) -> ReconciledVector {
        match self.reconcile_strict(derived, schema) {
            Ok(vector) => vector,
            Err(err) => {
                warn!(error = %err, "Using raw field order for feature vector");
                self.field_order(derived)
            }
        }
    }

    /// Reconcile against the artifact schema, failing when none is declared
    pub fn reconcile_strict(
        &self,
        derived: &DerivedFeatureSet,
        schema: &ArtifactSchema,
    ) -> Result<ReconciledVector, PipelineError> {
        match schema {
            ArtifactSchema::Declared(schema) => Ok(self.align(derived, schema)),
            ArtifactSchema::Undeclared => Err(PipelineError::SchemaUnavailable),
        }
    }

    /// Align to a declared schema: one value per schema name, in schema order
    pub fn align(&self, derived: &DerivedFeatureSet, schema: &FeatureSchema) -> ReconciledVector {
        let mut filled = Vec::new();
        let values: Vec<f64> = schema
            .names()
            .iter()
            .map(|name| match derived.get(name) {
                Some(value) => value,
                None => {
                    filled.push(name.clone());
                    0.0
                }
            })
            .collect();

        let dropped = derived
            .names()
            .filter(|name| !schema.names().iter().any(|s| s == name))
            .count();

        debug!(
            columns = values.len(),
            filled = filled.len(),
            dropped = dropped,
            "Reconciled feature vector against artifact schema"
        );

        ReconciledVector {
            values,
            mode: ReconcileMode::Schema,
            filled,
        }
    }

    /// Raw fields only, in canonical order
    pub fn field_order(&self, derived: &DerivedFeatureSet) -> ReconciledVector {
        let values = RawField::ALL
            .iter()
            .map(|field| derived.get(field.name()).unwrap_or(0.0))
            .collect();
        ReconciledVector {
            values,
            mode: ReconcileMode::FieldOrder,
            filled: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::domain::default_record;
    use crate::predictor::features::FeatureDeriver;

    fn derived() -> DerivedFeatureSet {
        FeatureDeriver::default().derive(&default_record())
    }

    fn schema(names: &[&str]) -> ArtifactSchema {
        ArtifactSchema::from_names(Some(names.iter().map(|s| s.to_string()).collect()))
    }

    #[test]
    fn test_length_and_order_match_schema() {
        let names = ["AgeOfHouse", "squareMeters", "CityPart_5", "floors"];
        let vector = SchemaReconciler::new()
            .reconcile_strict(&derived(), &schema(&names))
            .unwrap();

        assert_eq!(vector.len(), names.len());
        assert_eq!(vector.values(), &[25.0, 50.0, 1.0, 1.0]);
        assert_eq!(vector.mode(), ReconcileMode::Schema);
    }

    #[test]
    fn test_missing_column_zero_filled() {
        let vector = SchemaReconciler::new()
            .reconcile_strict(&derived(), &schema(&["squareMeters", "CityPart_8", "hasYard"]))
            .unwrap();

        assert_eq!(vector.values(), &[50.0, 0.0, 0.0]);
        assert_eq!(vector.filled_columns(), &["CityPart_8".to_string()]);
    }

    #[test]
    fn test_extra_columns_dropped() {
        let vector = SchemaReconciler::new()
            .reconcile_strict(&derived(), &schema(&["made"]))
            .unwrap();
        assert_eq!(vector.values(), &[2000.0]);
    }

    #[test]
    fn test_duplicate_schema_names_repeat_value() {
        let vector = SchemaReconciler::new()
            .reconcile_strict(&derived(), &schema(&["made", "made"]))
            .unwrap();
        assert_eq!(vector.values(), &[2000.0, 2000.0]);
    }

    #[test]
    fn test_undeclared_schema_is_unavailable() {
        let err = SchemaReconciler::new()
            .reconcile_strict(&derived(), &ArtifactSchema::Undeclared)
            .unwrap_err();
        assert_eq!(err, PipelineError::SchemaUnavailable);
    }

    #[test]
    fn test_undeclared_schema_falls_back_to_field_order() {
        let vector = SchemaReconciler::new().reconcile(&derived(), &ArtifactSchema::Undeclared);
        assert_eq!(vector.mode(), ReconcileMode::FieldOrder);
        assert_eq!(vector.len(), RawField::ALL.len());
        assert_eq!(vector.values()[0], 50.0);
        assert_eq!(vector.values()[8], 2000.0);
    }

    #[test]
    fn test_empty_names_are_undeclared() {
        assert_eq!(ArtifactSchema::from_names(Some(vec![])), ArtifactSchema::Undeclared);
        assert_eq!(ArtifactSchema::from_names(None), ArtifactSchema::Undeclared);
    }

    #[test]
    fn test_reconciliation_is_deterministic() {
        let schema = schema(&["PricePerSqm", "unknown", "hasPool", "CityPart_10"]);
        let reconciler = SchemaReconciler::new();
        let a = reconciler.reconcile(&derived(), &schema);
        let b = reconciler.reconcile(&derived(), &schema);
        let bits = |v: &ReconciledVector| v.values().iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }
}
