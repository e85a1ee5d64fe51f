use serde::Serialize;

use crate::config::{AzimuthPass, ElevationMode, SweepConfiguration};

/// Positioner start/finish targets for one point, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AngleWindow {
    pub az_start: f64,
    pub az_finish: f64,
    pub el_start: f64,
    pub el_finish: f64,
    pub pol_start: f64,
    pub pol_finish: f64,
    pub horn_start: f64,
    pub horn_finish: f64,
}

/// Computes the positioner window for a pointing angle.
///
/// The return pass of a bidirectional sweep mirrors the azimuth path. With
/// phi-coupled elevation the configured elevation range is replaced by a
/// single target `theta * sin(phi)` held within the turntable limit.
pub fn compute_window(
    direction_forward: bool,
    phi: f64,
    theta: f64,
    config: &SweepConfiguration,
) -> AngleWindow {
    let pos = &config.positioner;

    let (az_start, az_finish) = match config.strategy.azimuth {
        AzimuthPass::BothDirections if !direction_forward => (-pos.az_start, -pos.az_finish),
        AzimuthPass::BothDirections | AzimuthPass::OneWay => (pos.az_start, pos.az_finish),
    };

    let (el_start, el_finish) = match config.strategy.elevation {
        ElevationMode::Configured => (pos.el_start, pos.el_finish),
        ElevationMode::PhiCoupled => {
            let limit = pos.turntable_elevation_limit;
            let el = (theta * phi.to_radians().sin()).max(-limit).min(limit);
            (el, el)
        }
    };

    AngleWindow {
        az_start,
        az_finish,
        el_start,
        el_finish,
        pol_start: pos.pol_start,
        pol_finish: pos.pol_finish,
        horn_start: pos.horn_start,
        horn_finish: pos.horn_finish,
    }
}
