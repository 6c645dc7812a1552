// argus_core/src/models/perception/pinhole.rs

use crate::error::SensorError;
use crate::models::perception::projection;
use crate::models::perception::SensorModel;
use crate::types::{NormalizedPoint, Pixel, SensorPoint};
use log::debug;
use nalgebra::{DMatrix, DVector, Matrix2x3, Vector4};
use serde::{Deserialize, Serialize};
use std::any::Any;

/// The tag every pin-hole sensor carries, used by estimators to pick the
/// matching observation model.
pub const PINHOLE_TYPE_TAG: &str = "Pin-hole-camera";

/// Number of intrinsic scalars: `[αu, αv, u0, v0]`.
pub const INTRINSIC_DIM: usize = 4;

/// Horizontal and vertical extent of the image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageShape {
    pub width: usize,
    pub height: usize,
}

impl ImageShape {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }
}

/// The raw measurement frame. `pixels` is stored row-major in image terms:
/// `height` rows by `width` columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    pub shape: ImageShape,
    pub pixels: DMatrix<u8>,
}

impl RawImage {
    /// A zero-filled frame of the given shape.
    pub fn new(shape: ImageShape) -> Self {
        Self {
            shape,
            pixels: DMatrix::zeros(shape.height, shape.width),
        }
    }

    /// `(width, height)` of the stored buffer.
    pub fn dims(&self) -> (usize, usize) {
        (self.pixels.ncols(), self.pixels.nrows())
    }
}

impl Default for RawImage {
    fn default() -> Self {
        Self::new(ImageShape::default())
    }
}

/// Intrinsic, distortion and correction parameters of a pin-hole camera.
#[derive(Debug, Clone, PartialEq)]
pub struct PinholeParameters {
    /// `[αu, αv, u0, v0]`.
    pub intrinsic: Vector4<f64>,
    /// Radial distortion coefficients, ideal → observed.
    pub distortion: DVector<f64>,
    /// Radial correction coefficients, observed → ideal (fitted approximation).
    pub correction: DVector<f64>,
}

impl Default for PinholeParameters {
    fn default() -> Self {
        Self {
            intrinsic: Vector4::zeros(),
            distortion: DVector::zeros(0),
            correction: DVector::zeros(0),
        }
    }
}

/// A pin-hole camera: calibration parameters plus the raw pixel buffer.
///
/// A freshly built model is unconfigured (zero intrinsic, no distortion or
/// correction, empty buffer) until [`PinholeModel::configure`] succeeds.
#[derive(Debug, Clone, Default)]
pub struct PinholeModel {
    parameters: PinholeParameters,
    image: RawImage,
}

impl PinholeModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every calibration parameter and resizes the pixel buffer.
    ///
    /// The call is all-or-nothing: the shape checks run before anything is
    /// touched, and the new parameter set and buffer are built completely
    /// before being swapped in. Prior buffer contents are discarded.
    /// Distortion and correction coefficients are not checked numerically.
    pub fn configure(
        &mut self,
        intrinsic: &[f64],
        distortion: &[f64],
        correction: &[f64],
        width: usize,
        height: usize,
    ) -> Result<(), SensorError> {
        if intrinsic.len() != INTRINSIC_DIM || width == 0 || height == 0 {
            return Err(SensorError::InvalidCalibrationShape {
                intrinsic_len: intrinsic.len(),
                width,
                height,
            });
        }

        let parameters = PinholeParameters {
            intrinsic: Vector4::from_column_slice(intrinsic),
            distortion: DVector::from_column_slice(distortion),
            correction: DVector::from_column_slice(correction),
        };
        let image = RawImage::new(ImageShape::new(width, height));

        self.parameters = parameters;
        self.image = image;

        debug!(
            "pin-hole configured: k = {:?}, {} distortion / {} correction coefficients, {}x{}",
            intrinsic,
            distortion.len(),
            correction.len(),
            width,
            height
        );
        Ok(())
    }

    /// Same as [`PinholeModel::configure`], from an already assembled parameter set.
    pub fn configure_with(
        &mut self,
        parameters: &PinholeParameters,
        shape: ImageShape,
    ) -> Result<(), SensorError> {
        self.configure(
            parameters.intrinsic.as_slice(),
            parameters.distortion.as_slice(),
            parameters.correction.as_slice(),
            shape.width,
            shape.height,
        )
    }

    // --- Accessors ---

    pub fn parameters(&self) -> &PinholeParameters {
        &self.parameters
    }

    pub fn intrinsic(&self) -> &Vector4<f64> {
        &self.parameters.intrinsic
    }

    pub fn distortion(&self) -> &[f64] {
        self.parameters.distortion.as_slice()
    }

    pub fn correction(&self) -> &[f64] {
        self.parameters.correction.as_slice()
    }

    pub fn image_shape(&self) -> ImageShape {
        self.image.shape
    }

    pub fn image(&self) -> &RawImage {
        &self.image
    }

    /// Mutable access to the pixel data, for the acquisition pipeline to fill.
    /// The buffer shape itself only changes through `configure`.
    pub fn pixels_mut(&mut self) -> &mut DMatrix<u8> {
        &mut self.image.pixels
    }

    /// True once a `configure` call has succeeded.
    pub fn is_configured(&self) -> bool {
        self.image.shape.width > 0 && self.image.shape.height > 0
    }

    // --- Projection contract ---

    /// Ideal normalized point → observed normalized point.
    pub fn distort(&self, up: &NormalizedPoint) -> NormalizedPoint {
        projection::distort_point(self.distortion(), up)
    }

    /// Observed normalized point → approximately ideal normalized point.
    pub fn correct(&self, dp: &NormalizedPoint) -> NormalizedPoint {
        projection::undistort_point(self.correction(), dp)
    }

    /// Projects a point expressed in the sensor frame to a pixel.
    /// `None` for points on or behind the image plane.
    pub fn project(&self, v: &SensorPoint) -> Option<Pixel> {
        if v.z <= 0.0 {
            return None;
        }
        Some(projection::project_point(self.intrinsic(), self.distortion(), v))
    }

    /// As [`PinholeModel::project`], with the 2x3 Jacobian `∂pixel/∂v`.
    pub fn project_with_jacobian(&self, v: &SensorPoint) -> Option<(Pixel, Matrix2x3<f64>)> {
        if v.z <= 0.0 {
            return None;
        }
        Some(projection::project_point_with_jacobian(
            self.intrinsic(),
            self.distortion(),
            v,
        ))
    }

    /// Back-projects a pixel to the sensor frame at the given depth.
    pub fn backproject(&self, u: &Pixel, depth: f64) -> SensorPoint {
        projection::backproject_pixel(self.intrinsic(), self.correction(), u, depth)
    }

    pub fn is_in_image(&self, u: &Pixel) -> bool {
        projection::is_in_image(u, &self.image.shape)
    }
}

impl SensorModel for PinholeModel {
    fn type_tag(&self) -> &'static str {
        PINHOLE_TYPE_TAG
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
