// argus_calib/src/lib.rs

//! The calibration-fitting companion of `argus_core`: loads a pin-hole camera
//! description, fits its correction polynomial and reports how well
//! `correct(distort(p))` returns to `p` over the image.

pub mod cli;
pub mod config;
pub mod report;
