// argus_core/src/lib.rs

//! Pure, framework-agnostic sensor core for a SLAM estimator.
//!
//! A [`sensor::Sensor`] couples a pose attachment (where its pose comes from)
//! with a calibration model (how it maps 3D geometry to raw measurements).
//! The only concrete model shipped here is the pin-hole camera in
//! [`models::perception::pinhole`].

pub mod abstractions;
pub mod error;
pub mod frames;
pub mod models;
pub mod pose;
pub mod prelude;
pub mod sensor;
pub mod types;
