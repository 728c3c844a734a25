//! Feature scaling transforms
//!
//! Scalers are read from JSON files exported at training time. Each may
//! carry the ordered feature names it was fitted on; those names become the
//! artifact's feature schema.

use super::Scaler;
use anyhow::{bail, Result};
use serde::Deserialize;
use tract_onnx::prelude::tract_ndarray::{Array1, Array2, Axis};

/// Serialized scaler description
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerSpec {
    /// `(x - mean) / scale`
    Standard {
        mean: Vec<f64>,
        scale: Vec<f64>,
        feature_names: Option<Vec<String>>,
    },
    /// `x * scale + min`
    MinMax {
        min: Vec<f64>,
        scale: Vec<f64>,
        feature_names: Option<Vec<String>>,
    },
    /// Pass-through
    Identity {
        feature_names: Option<Vec<String>>,
        n_features: Option<usize>,
    },
}

impl ScalerSpec {
    /// Validate the description and build the scaler
    pub fn build(self) -> Result<Box<dyn Scaler>> {
        match self {
            ScalerSpec::Standard { mean, scale, feature_names } => {
                check_lengths("mean", &mean, &scale, feature_names.as_deref())?;
                // A zero scale means a constant training column; leave it unscaled
                let scale: Vec<f64> = scale.into_iter().map(|s| if s == 0.0 { 1.0 } else { s }).collect();
                Ok(Box::new(StandardScaler {
                    mean: Array1::from(mean),
                    scale: Array1::from(scale),
                    feature_names,
                }))
            }
            ScalerSpec::MinMax { min, scale, feature_names } => {
                check_lengths("min", &min, &scale, feature_names.as_deref())?;
                Ok(Box::new(MinMaxScaler {
                    min: Array1::from(min),
                    scale: Array1::from(scale),
                    feature_names,
                }))
            }
            ScalerSpec::Identity { feature_names, n_features } => {
                let width = match (&feature_names, n_features) {
                    (Some(names), Some(n)) if !names.is_empty() && names.len() != n => {
                        bail!("n_features is {} but {} feature names were given", n, names.len())
                    }
                    (Some(names), _) if !names.is_empty() => Some(names.len()),
                    (_, n) => n,
                };
                Ok(Box::new(IdentityScaler { feature_names, width }))
            }
        }
    }
}

fn check_lengths(
    offset_name: &str,
    offset: &[f64],
    scale: &[f64],
    feature_names: Option<&[String]>,
) -> Result<()> {
    if offset.is_empty() {
        bail!("{} must not be empty", offset_name);
    }
    if offset.len() != scale.len() {
        bail!(
            "{} has {} entries but scale has {}",
            offset_name,
            offset.len(),
            scale.len()
        );
    }
    if let Some(names) = feature_names {
        if !names.is_empty() && names.len() != offset.len() {
            bail!(
                "{} feature names given for a scaler fitted on {} features",
                names.len(),
                offset.len()
            );
        }
    }
    if offset.iter().chain(scale).any(|v| !v.is_finite()) {
        bail!("scaler parameters must be finite");
    }
    Ok(())
}

fn check_width(kind: &str, expected: usize, input: &Array2<f64>) -> Result<()> {
    if input.ncols() != expected {
        bail!(
            "X has {} features, but {} is expecting {} features as input",
            input.ncols(),
            kind,
            expected
        );
    }
    Ok(())
}

/// Standardizes each column to zero mean and unit variance
#[derive(Debug, Clone)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
    feature_names: Option<Vec<String>>,
}

impl Scaler for StandardScaler {
    fn kind(&self) -> &'static str {
        "standard"
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn input_width(&self) -> Option<usize> {
        Some(self.mean.len())
    }

    fn transform(&self, input: &Array2<f64>) -> Result<Array2<f64>> {
        check_width("StandardScaler", self.mean.len(), input)?;
        let mut out = input.clone();
        for mut row in out.axis_iter_mut(Axis(0)) {
            row -= &self.mean;
            row /= &self.scale;
        }
        Ok(out)
    }
}

/// Rescales each column using fitted min/scale terms
#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    min: Array1<f64>,
    scale: Array1<f64>,
    feature_names: Option<Vec<String>>,
}

impl Scaler for MinMaxScaler {
    fn kind(&self) -> &'static str {
        "min_max"
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn input_width(&self) -> Option<usize> {
        Some(self.min.len())
    }

    fn transform(&self, input: &Array2<f64>) -> Result<Array2<f64>> {
        check_width("MinMaxScaler", self.min.len(), input)?;
        let mut out = input.clone();
        for mut row in out.axis_iter_mut(Axis(0)) {
            row *= &self.scale;
            row += &self.min;
        }
        Ok(out)
    }
}

/// Leaves features untouched; used for models trained on raw values
#[derive(Debug, Clone)]
pub struct IdentityScaler {
    feature_names: Option<Vec<String>>,
    width: Option<usize>,
}

impl Scaler for IdentityScaler {
    fn kind(&self) -> &'static str {
        "identity"
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn input_width(&self) -> Option<usize> {
        self.width
    }

    fn transform(&self, input: &Array2<f64>) -> Result<Array2<f64>> {
        if let Some(width) = self.width {
            check_width("IdentityScaler", width, input)?;
        }
        Ok(input.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[f64]) -> Array2<f64> {
        Array2::from_shape_vec((1, values.len()), values.to_vec()).unwrap()
    }

    fn parse(json: &str) -> Result<Box<dyn Scaler>> {
        serde_json::from_str::<ScalerSpec>(json).unwrap().build()
    }

    #[test]
    fn test_standard_scaler_transform() {
        let scaler = parse(r#"{"kind":"standard","mean":[10.0,2.0],"scale":[5.0,0.0]}"#).unwrap();
        let out = scaler.transform(&row(&[20.0, 3.0])).unwrap();
        assert_eq!(out.row(0).to_vec(), vec![2.0, 1.0]);
        assert!(scaler.feature_names().is_none());
        assert_eq!(scaler.input_width(), Some(2));
    }

    #[test]
    fn test_zero_scale_only_centers_constant_column() {
        let scaler = parse(r#"{"kind":"standard","mean":[1.0,4.0],"scale":[0.0,2.0]}"#).unwrap();
        let out = scaler.transform(&row(&[3.0, 8.0])).unwrap();
        assert_eq!(out, row(&[2.0, 2.0]));
    }

    #[test]
    fn test_min_max_scaler_transform() {
        let scaler = parse(
            r#"{"kind":"min_max","min":[-1.0],"scale":[0.5],"feature_names":["squareMeters"]}"#,
        )
        .unwrap();
        let out = scaler.transform(&row(&[4.0])).unwrap();
        assert_eq!(out[[0, 0]], 1.0);
        assert_eq!(scaler.feature_names().unwrap(), &["squareMeters".to_string()]);
    }

    #[test]
    fn test_dimension_mismatch_is_an_error() {
        let scaler = parse(r#"{"kind":"standard","mean":[0.0,0.0],"scale":[1.0,1.0]}"#).unwrap();
        let err = scaler.transform(&row(&[1.0, 2.0, 3.0])).unwrap_err();
        assert!(err.to_string().contains("expecting 2 features"));
    }

    #[test]
    fn test_inconsistent_lengths_rejected() {
        assert!(parse(r#"{"kind":"standard","mean":[0.0],"scale":[1.0,1.0]}"#).is_err());
        assert!(parse(
            r#"{"kind":"standard","mean":[0.0],"scale":[1.0],"feature_names":["a","b"]}"#
        )
        .is_err());
        assert!(parse(r#"{"kind":"identity","feature_names":["a"],"n_features":2}"#).is_err());
    }

    #[test]
    fn test_identity_scaler_width_from_names() {
        let scaler = parse(r#"{"kind":"identity","feature_names":["a","b"]}"#).unwrap();
        assert_eq!(scaler.input_width(), Some(2));
        let out = scaler.transform(&row(&[7.0, 8.0])).unwrap();
        assert_eq!(out, row(&[7.0, 8.0]));
    }
}
