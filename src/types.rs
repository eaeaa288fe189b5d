use crate::error::ValidationError;
use crate::normalize::{self, RawToken};
use serde::{Deserialize, Serialize};

/// Road condition is a closed set; anything else fails deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoadCondition {
    Bonne,
    Moyenne,
    Mauvaise,
}

impl RoadCondition {
    pub fn as_str(self) -> &'static str {
        match self {
            RoadCondition::Bonne => "bonne",
            RoadCondition::Moyenne => "moyenne",
            RoadCondition::Mauvaise => "mauvaise",
        }
    }
}

/// Trip as submitted to `POST /predict`. Unknown keys are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct TripRequest {
    pub pluie: RawToken,
    pub etat_route: RoadCondition,
    pub heure: RawToken,
    pub jour_semaine: RawToken,
    pub jour_ferie: RawToken,
    pub bagages: RawToken,
    pub routes_larges: RawToken,
    pub routes_travaux: RawToken,
    pub accident: RawToken,
    pub depart_osm: RawToken,
    pub destination_osm: RawToken,
    pub distance_km: RawToken,
}

impl TripRequest {
    /// Reduces every field to its canonical spelling. Fails only on distance.
    pub fn normalize(&self) -> Result<CanonicalRow, ValidationError> {
        Ok(CanonicalRow {
            pluie: normalize::yes_no("pluie", &self.pluie),
            etat_route: self.etat_route,
            heure: normalize::hour(&self.heure),
            jour_semaine: normalize::weekday(&self.jour_semaine),
            jour_ferie: normalize::yes_no("jour_ferie", &self.jour_ferie),
            bagages: normalize::yes_no("bagages", &self.bagages),
            routes_larges: normalize::yes_no("routes_larges", &self.routes_larges),
            routes_travaux: normalize::yes_no("routes_travaux", &self.routes_travaux),
            accident: normalize::yes_no("accident", &self.accident),
            depart_osm: normalize::location(&self.depart_osm),
            destination_osm: normalize::location(&self.destination_osm),
            distance_km: normalize::distance_km(&self.distance_km)?,
        })
    }
}

/// One cell of a canonical row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue<'a> {
    Text(&'a str),
    Number(f64),
}

/// A normalized trip. This is the only shape the model ever sees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRow {
    pub pluie: &'static str,
    pub etat_route: RoadCondition,
    pub heure: String,
    pub jour_semaine: String,
    pub jour_ferie: &'static str,
    pub bagages: &'static str,
    pub routes_larges: &'static str,
    pub routes_travaux: &'static str,
    pub accident: &'static str,
    pub depart_osm: String,
    pub destination_osm: String,
    pub distance_km: f64,
}

impl CanonicalRow {
    pub fn value(&self, name: &str) -> Option<FeatureValue<'_>> {
        use FeatureValue::{Number, Text};
        let v = match name {
            "pluie" => Text(self.pluie),
            "etat_route" => Text(self.etat_route.as_str()),
            "heure" => Text(&self.heure),
            "jour_semaine" => Text(&self.jour_semaine),
            "jour_ferie" => Text(self.jour_ferie),
            "bagages" => Text(self.bagages),
            "routes_larges" => Text(self.routes_larges),
            "routes_travaux" => Text(self.routes_travaux),
            "accident" => Text(self.accident),
            "depart_osm" => Text(&self.depart_osm),
            "destination_osm" => Text(&self.destination_osm),
            "distance_km" => Number(self.distance_km),
            _ => return None,
        };
        Some(v)
    }
}

// Response: field names are part of the public contract
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PredictionOut {
    pub prix_estime_fcfa: i64,
    pub prix_estime_range: String,
    pub message: String,
    pub lieux_connus: String,
}
