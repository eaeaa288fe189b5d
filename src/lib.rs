//! Taxi fare prediction service for Yaoundé.
//!
//! Requests are normalized into a [`types::CanonicalRow`], encoded in the
//! fixed order of [`schema::FEATURES`], and priced by the model held in a
//! [`model::Predictor`].

pub mod bundle;
pub mod config;
pub mod error;
pub mod forest;
pub mod model;
pub mod normalize;
pub mod quote;
pub mod schema;
pub mod server;
#[cfg(feature = "torch")]
pub mod torch;
pub mod types;
