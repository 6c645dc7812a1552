// argus_core/tests/pinhole_sensor.rs

//! End-to-end scenarios for a pin-hole sensor: construction, configuration,
//! reconfiguration and the distort/correct round trip.

use argus_core::models::perception::correction::fit_model_correction;
use argus_core::prelude::*;
use approx::assert_abs_diff_eq;
use nalgebra::Vector4;

fn identity_sensor() -> PinholeSensor {
    PinholeSensor::with_gaussian_pose(FrameHandle(1), GaussianPose::identity(), PinholeModel::new())
}

#[test]
fn unconfigured_sensor_has_empty_calibration() {
    let sensor = identity_sensor();
    assert_eq!(sensor.type_tag(), "Pin-hole-camera");
    assert!(!sensor.model().is_configured());
    assert_eq!(sensor.model().image().dims(), (0, 0));
    assert!(sensor.model().distortion().is_empty());
    assert!(sensor.model().correction().is_empty());
}

#[test]
fn configure_without_distortion_gives_identity_mappings() {
    let mut sensor = identity_sensor();
    sensor
        .configure(&[500.0, 500.0, 320.0, 240.0], &[], &[], 640, 480)
        .unwrap();

    let model = sensor.model();
    assert_eq!(model.image_shape(), ImageShape::new(640, 480));
    assert_eq!(model.image().dims(), (640, 480));
    assert_eq!(model.intrinsic(), &Vector4::new(500.0, 500.0, 320.0, 240.0));

    for p in [
        NormalizedPoint::new(0.0, 0.0),
        NormalizedPoint::new(0.64, 0.48),
        NormalizedPoint::new(-0.3, 0.9),
    ] {
        assert_eq!(model.distort(&p), p);
        assert_eq!(model.correct(&p), p);
    }
}

#[test]
fn second_configure_wins() {
    let mut sensor = identity_sensor();
    sensor
        .configure(&[500.0, 500.0, 320.0, 240.0], &[-0.2, 0.05], &[0.2], 640, 480)
        .unwrap();
    sensor
        .configure(&[800.0, 800.0, 512.0, 384.0], &[], &[0.1, 0.2, 0.3], 1024, 768)
        .unwrap();

    let model = sensor.model();
    assert_eq!(model.image().dims(), (1024, 768));
    assert_eq!(model.intrinsic(), &Vector4::new(800.0, 800.0, 512.0, 384.0));
    assert!(model.distortion().is_empty());
    assert_eq!(model.correction(), &[0.1, 0.2, 0.3]);
}

#[test]
fn short_intrinsic_is_rejected_and_previous_calibration_survives() {
    let mut sensor = identity_sensor();
    sensor
        .configure(&[500.0, 500.0, 320.0, 240.0], &[-0.2], &[0.2], 640, 480)
        .unwrap();
    let before = sensor.model().parameters().clone();

    let err = sensor
        .configure(&[500.0, 500.0, 320.0], &[], &[], 320, 240)
        .unwrap_err();
    assert_eq!(
        err,
        SensorError::InvalidCalibrationShape {
            intrinsic_len: 3,
            width: 320,
            height: 240
        }
    );
    assert_eq!(sensor.model().parameters(), &before);
    assert_eq!(sensor.model().image().dims(), (640, 480));
}

#[test]
fn fitted_correction_round_trips_across_the_image() {
    let mut sensor = identity_sensor();
    let distortion = [-0.15, 0.02];
    sensor
        .configure(&[450.0, 450.0, 320.0, 240.0], &distortion, &[], 640, 480)
        .unwrap();

    let fit = fit_model_correction(sensor.model(), 3, 200).unwrap();
    sensor
        .configure(
            &[450.0, 450.0, 320.0, 240.0],
            &distortion,
            fit.coefficients.as_slice(),
            640,
            480,
        )
        .unwrap();

    let report = round_trip_report(sensor.model(), 25).unwrap();
    assert!(report.within(1e-4), "{report:?}");

    // A pixel projected through the distortion lands back on its ray.
    let v = SensorPoint::new(0.6, -0.4, 2.0);
    let u = sensor.model().project(&v).unwrap();
    let back = sensor.model().backproject(&u, v.z);
    assert_abs_diff_eq!(back, v, epsilon = 1e-3);
}
