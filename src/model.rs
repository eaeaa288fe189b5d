use crate::bundle::{BundleFile, CategoryEncoder, ModelSpec};
use crate::error::{BundleError, InferenceError, Result};
use crate::forest::TreeEnsemble;
use crate::schema::{self, FeatureKind, FEATURES};
use crate::types::{CanonicalRow, FeatureValue};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Anything that turns an encoded feature row into a fare.
pub trait Regressor: Send + Sync {
    fn kind(&self) -> &'static str;

    fn predict(&self, x: &[f32]) -> std::result::Result<f64, InferenceError>;
}

impl Regressor for TreeEnsemble {
    fn kind(&self) -> &'static str {
        "forest"
    }

    fn predict(&self, x: &[f32]) -> std::result::Result<f64, InferenceError> {
        self.eval(x)
    }
}

/// Loaded bundle: feature order, one encoder slot per column (in schema
/// order) and the model. Read-only once built.
pub struct Predictor {
    name: Option<String>,
    format_version: u32,
    features: Vec<String>,
    encoders: Vec<Option<CategoryEncoder>>,
    model: Box<dyn Regressor>,
}

impl Predictor {
    pub fn load(path: &Path) -> Result<Self> {
        let bundle = BundleFile::read(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_bundle(bundle, base_dir)
    }

    pub fn from_bundle(bundle: BundleFile, base_dir: &Path) -> Result<Self> {
        bundle.check_header()?;

        let model: Box<dyn Regressor> = match bundle.model {
            ModelSpec::Forest(ensemble) => {
                ensemble.validate(FEATURES.len())?;
                Box::new(ensemble)
            }
            ModelSpec::Torchscript { path } => load_torchscript(&base_dir.join(path))?,
        };

        let mut p = Self::with_regressor(bundle.encoders, model)?;
        p.name = bundle.name;
        p.format_version = bundle.format_version;
        Ok(p)
    }

    /// Builds a predictor around any regressor, checking that every
    /// categorical column has an encoder and no other column does.
    pub fn with_regressor(
        mut encoders: BTreeMap<String, CategoryEncoder>,
        model: Box<dyn Regressor>,
    ) -> Result<Self> {
        let mut slots = Vec::with_capacity(FEATURES.len());
        for f in FEATURES {
            let enc = encoders.remove(f.name);
            match (f.kind, enc) {
                (FeatureKind::Categorical, None) => {
                    return Err(BundleError::MissingEncoder(f.name.to_string()))
                }
                (FeatureKind::Numeric, Some(_)) => {
                    return Err(BundleError::UnexpectedEncoder(f.name.to_string()))
                }
                (_, enc) => slots.push(enc),
            }
        }
        if let Some(extra) = encoders.into_keys().next() {
            return Err(BundleError::UnexpectedEncoder(extra));
        }

        Ok(Self {
            name: None,
            format_version: crate::bundle::FORMAT_VERSION,
            features: schema::feature_names(),
            encoders: slots,
            model,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn model_kind(&self) -> &'static str {
        self.model.kind()
    }

    /// Lays the row out in feature order and encodes each cell.
    pub fn encode(&self, row: &CanonicalRow) -> std::result::Result<Vec<f32>, InferenceError> {
        let mut x = Vec::with_capacity(self.features.len());
        for (name, enc) in self.features.iter().zip(&self.encoders) {
            match (row.value(name), enc) {
                (Some(FeatureValue::Text(v)), Some(enc)) => {
                    if !enc.knows(v) {
                        debug!(feature = %name, value = v, "unseen category, using default code");
                    }
                    x.push(enc.encode_or_default(v));
                }
                (Some(FeatureValue::Number(v)), None) => x.push(v as f32),
                // Column and encoder disagree; the row cannot be laid out.
                _ => break,
            }
        }

        if x.len() != self.features.len() {
            return Err(InferenceError::ShapeMismatch { got: x.len(), expected: self.features.len() });
        }
        Ok(x)
    }

    /// Runs the model on an encoded row and checks the output is usable.
    pub fn infer(&self, x: &[f32]) -> std::result::Result<f64, InferenceError> {
        if x.len() != self.features.len() {
            return Err(InferenceError::ShapeMismatch { got: x.len(), expected: self.features.len() });
        }
        let y = self.model.predict(x)?;
        if !y.is_finite() {
            return Err(InferenceError::NonFinite(y));
        }
        Ok(y)
    }

    pub fn predict(&self, row: &CanonicalRow) -> std::result::Result<f64, InferenceError> {
        self.infer(&self.encode(row)?)
    }

    /// Forward pass on an all-zero row, run once before serving.
    pub fn warmup(&self) -> std::result::Result<f64, InferenceError> {
        self.infer(&vec![0.0; self.features.len()])
    }

    /// A location is known when it is in the column's vocabulary and does
    /// not carry an explicit "unknown" marker. Empty vocabularies accept
    /// everything.
    pub fn location_known(&self, column: &str, value: &str) -> bool {
        if value.to_lowercase().contains("unknown") {
            return false;
        }
        let enc = schema::position(column).and_then(|i| self.encoders.get(i)).and_then(Option::as_ref);
        match enc {
            Some(enc) if !enc.categories.is_empty() => enc.knows(value),
            _ => true,
        }
    }

    pub fn all_locations_known(&self, row: &CanonicalRow) -> bool {
        schema::LOCATION_FEATURES.iter().all(|col| match row.value(col) {
            Some(FeatureValue::Text(v)) => self.location_known(col, v),
            _ => false,
        })
    }
}

#[cfg(feature = "torch")]
fn load_torchscript(path: &Path) -> Result<Box<dyn Regressor>> {
    Ok(Box::new(crate::torch::TorchScriptRegressor::load(path, FEATURES.len())?))
}

#[cfg(not(feature = "torch"))]
fn load_torchscript(path: &Path) -> Result<Box<dyn Regressor>> {
    Err(BundleError::BackendUnavailable(format!(
        "{} is a TorchScript model; rebuild with the `torch` feature",
        path.display()
    )))
}
