//! On-disk model bundle: feature order, category encoders and the model,
//! versioned and validated as one unit.

use crate::error::{BundleError, Result};
use crate::forest::TreeEnsemble;
use crate::schema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

/// Category → numeric code for one column, with a code for unseen values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CategoryEncoder {
    pub categories: BTreeMap<String, f32>,
    #[serde(default)]
    pub default: f32,
}

impl CategoryEncoder {
    pub fn encode(&self, value: &str) -> Option<f32> {
        self.categories.get(value).copied()
    }

    pub fn encode_or_default(&self, value: &str) -> f32 {
        self.encode(value).unwrap_or(self.default)
    }

    pub fn knows(&self, value: &str) -> bool {
        self.categories.contains_key(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModelSpec {
    Forest(TreeEnsemble),
    /// Path is resolved against the bundle's directory.
    Torchscript { path: PathBuf },
}

impl ModelSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            ModelSpec::Forest(_) => "forest",
            ModelSpec::Torchscript { .. } => "torchscript",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BundleFile {
    pub format_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub features: Vec<String>,
    pub encoders: BTreeMap<String, CategoryEncoder>,
    pub model: ModelSpec,
}

impl BundleFile {
    /// Stamps the canonical feature order and current version on a model.
    pub fn pack(
        name: Option<String>,
        encoders: BTreeMap<String, CategoryEncoder>,
        model: ModelSpec,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            name,
            features: schema::feature_names(),
            encoders,
            model,
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path).map_err(|source| BundleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&txt)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let txt = serde_json::to_string_pretty(self)?;
        fs::write(path, txt).map_err(|source| BundleError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Version and feature order checks. Model structure is checked when the
    /// model is built.
    pub fn check_header(&self) -> Result<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(BundleError::UnsupportedVersion {
                found: self.format_version,
                supported: FORMAT_VERSION,
            });
        }
        if let Some(index) = schema::first_mismatch(&self.features) {
            return Err(BundleError::FeatureOrder {
                index,
                expected: schema::FEATURES.get(index).map(|f| f.name.to_string()),
                found: self.features.get(index).cloned(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::{Aggregation, Node, Tree};

    fn tiny_model() -> ModelSpec {
        ModelSpec::Forest(TreeEnsemble {
            aggregation: Aggregation::Mean,
            base_score: 0.0,
            trees: vec![Tree { nodes: vec![Node::leaf(1000.0)] }],
        })
    }

    #[test]
    fn packed_bundle_passes_header_check() {
        let b = BundleFile::pack(Some("demo".into()), BTreeMap::new(), tiny_model());
        assert_eq!(b.format_version, FORMAT_VERSION);
        assert!(b.check_header().is_ok());
    }

    #[test]
    fn wrong_version_is_refused() {
        let mut b = BundleFile::pack(None, BTreeMap::new(), tiny_model());
        b.format_version = 7;
        assert!(matches!(
            b.check_header(),
            Err(BundleError::UnsupportedVersion { found: 7, supported: FORMAT_VERSION })
        ));
    }

    #[test]
    fn reordered_features_are_refused() {
        let mut b = BundleFile::pack(None, BTreeMap::new(), tiny_model());
        b.features.swap(0, 11);
        match b.check_header() {
            Err(BundleError::FeatureOrder { index, expected, found }) => {
                assert_eq!(index, 0);
                assert_eq!(expected.as_deref(), Some("pluie"));
                assert_eq!(found.as_deref(), Some("distance_km"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn model_kind_is_tagged() {
        let json = serde_json::to_value(tiny_model()).unwrap();
        assert_eq!(json["kind"], "forest");
        let ts: ModelSpec = serde_json::from_str(r#"{"kind":"torchscript","path":"fare.pt"}"#).unwrap();
        assert_eq!(ts.kind(), "torchscript");
    }

    #[test]
    fn write_then_read_keeps_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        let mut encoders = BTreeMap::new();
        encoders.insert(
            "pluie".to_string(),
            CategoryEncoder { categories: [("oui".to_string(), 1.0)].into_iter().collect(), default: 0.0 },
        );
        let b = BundleFile::pack(Some("rf".into()), encoders, tiny_model());
        b.write(&path).unwrap();
        assert_eq!(BundleFile::read(&path).unwrap(), b);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = BundleFile::read(Path::new("/nonexistent/bundle.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/bundle.json"));
    }

    #[test]
    fn encoder_falls_back_to_default() {
        let enc = CategoryEncoder {
            categories: [("Mvan".to_string(), 3.0)].into_iter().collect(),
            default: -1.0,
        };
        assert_eq!(enc.encode_or_default("Mvan"), 3.0);
        assert_eq!(enc.encode_or_default("Bastos"), -1.0);
        assert!(!enc.knows("mvan"));
    }
}
