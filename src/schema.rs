/// How a column is handed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    /// Goes through a category encoder from the bundle.
    Categorical,
    /// Passed through as a float.
    Numeric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub kind: FeatureKind,
}

const fn cat(name: &'static str) -> FeatureSpec {
    FeatureSpec { name, kind: FeatureKind::Categorical }
}

/// Authoritative column order. The model only sees positions, so a bundle is
/// accepted only if its feature list equals this one exactly.
pub const FEATURES: [FeatureSpec; 12] = [
    cat("pluie"),
    cat("etat_route"),
    cat("heure"),
    cat("jour_semaine"),
    cat("jour_ferie"),
    cat("bagages"),
    cat("routes_larges"),
    cat("routes_travaux"),
    cat("accident"),
    cat("depart_osm"),
    cat("destination_osm"),
    FeatureSpec { name: "distance_km", kind: FeatureKind::Numeric },
];

/// Columns checked against the location vocabulary for the advisory.
pub const LOCATION_FEATURES: [&str; 2] = ["depart_osm", "destination_osm"];

pub fn feature_names() -> Vec<String> {
    FEATURES.iter().map(|f| f.name.to_string()).collect()
}

pub fn position(name: &str) -> Option<usize> {
    FEATURES.iter().position(|f| f.name == name)
}

/// Returns the first index where `names` departs from the canonical order,
/// or `None` when they match.
pub fn first_mismatch(names: &[String]) -> Option<usize> {
    let n = names.len().max(FEATURES.len());
    (0..n).find(|&i| names.get(i).map(String::as_str) != FEATURES.get(i).map(|f| f.name))
}
