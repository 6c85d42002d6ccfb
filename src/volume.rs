/// Height-to-volume and rain-to-volume conversion.
///
/// Two geometries are supported:
///
/// - `linear`: a rigid tank with constant horizontal cross-section, so volume
///   grows proportionally with height.
/// - `oval`: a flexible bag whose cross-section keeps a constant circumference
///   of `2 * flat_width_mm`. As it fills, the sides bulge into two half-circles
///   of radius `h / 2` joined by a flat section, so the bag holds more water
///   per millimetre near the middle than a linear model predicts.
///
/// Both conversions are pure; the model is built once per aggregation from
/// the configuration read for that call.

use crate::model::{MonitorError, VolumeConfig, VolumeMethod};
use std::f64::consts::PI;

/// Cross-section area (mm²) of a bag of the given flat width filled to
/// `height_mm`.
///
/// `area(h) = π·r² + h·(flat_width − π·r)` with `r = h / 2`.
pub fn bag_cut_mm2(height_mm: f64, flat_width_mm: f64) -> f64 {
    let r_mm = height_mm / 2.0;
    PI * r_mm.powi(2) + height_mm * (flat_width_mm - PI * r_mm)
}

/// A validated [`VolumeConfig`], ready to convert readings.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeModel {
    config: VolumeConfig,
    /// Cached `bag_cut_mm2(max_height_mm)` for the oval method.
    full_cut_mm2: f64,
}

impl VolumeModel {
    /// Validates the geometry and builds the model.
    ///
    /// The oval approximation only grows monotonically while the bag is no
    /// taller than a full circle of its circumference, i.e.
    /// `max_height_mm <= 2 * flat_width_mm / π`; taller configurations are
    /// rejected.
    pub fn new(config: &VolumeConfig) -> Result<Self, MonitorError> {
        let positive = [
            ("max_height_mm", config.max_height_mm),
            ("max_volume_l", config.max_volume_l),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(MonitorError::Config(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        if !config.roof_area_m2.is_finite() || config.roof_area_m2 < 0.0 {
            return Err(MonitorError::Config(format!(
                "roof_area_m2 must not be negative, got {}",
                config.roof_area_m2
            )));
        }

        let full_cut_mm2 = match config.volume_method {
            VolumeMethod::Linear => 0.0,
            VolumeMethod::Oval => {
                if !config.flat_width_mm.is_finite() || config.flat_width_mm <= 0.0 {
                    return Err(MonitorError::Config(format!(
                        "flat_width_mm must be a positive number for the oval method, got {}",
                        config.flat_width_mm
                    )));
                }
                let round_diameter_mm = 2.0 * config.flat_width_mm / PI;
                if config.max_height_mm > round_diameter_mm {
                    return Err(MonitorError::Config(format!(
                        "max_height_mm {} exceeds the fully rounded diameter {:.0}mm \
                         of a bag {}mm wide",
                        config.max_height_mm, round_diameter_mm, config.flat_width_mm
                    )));
                }
                bag_cut_mm2(config.max_height_mm, config.flat_width_mm)
            }
        };

        Ok(Self {
            config: config.clone(),
            full_cut_mm2,
        })
    }

    pub fn config(&self) -> &VolumeConfig {
        &self.config
    }

    /// Stored volume in liters at the given fill height.
    pub fn volume_l(&self, height_mm: f64) -> f64 {
        let cfg = &self.config;
        match cfg.volume_method {
            VolumeMethod::Linear => height_mm * cfg.max_volume_l / cfg.max_height_mm,
            VolumeMethod::Oval => {
                bag_cut_mm2(height_mm, cfg.flat_width_mm) * cfg.max_volume_l / self.full_cut_mm2
            }
        }
    }

    /// Liters harvested from the roof for `rain_mm` of precipitation.
    pub fn rain_l(&self, rain_mm: f64) -> f64 {
        rain_l(&self.config, rain_mm)
    }
}

/// Validating one-shot conversion; prefer [`VolumeModel`] for many readings.
pub fn volume_l(config: &VolumeConfig, height_mm: f64) -> Result<f64, MonitorError> {
    Ok(VolumeModel::new(config)?.volume_l(height_mm))
}

/// Catchment area times depth: 1 mm of rain on 1 m² is 1 liter.
pub fn rain_l(config: &VolumeConfig, rain_mm: f64) -> f64 {
    rain_mm * config.roof_area_m2
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
