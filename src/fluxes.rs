//! Turbulent fluxes and surface-layer parameters
//!
//! Derived per bin from the rotated means and the second-order moments.
//! `wt` near zero makes the Obukhov length blow up; such bins carry ±inf or
//! NaN instead of failing.

use crate::aggregate::moment_name;
use crate::config::ChannelNames;
use crate::error::{EddyError, Result};
use crate::table::{BinTable, MomentTable};
use serde::{Deserialize, Serialize};

/// Physical constants of the flux formulas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FluxConstants {
    /// Surface pressure (Pa)
    pub pressure: f64,
    /// Specific gas constant of dry air (J/(kg·K))
    pub gas_constant: f64,
    /// Specific heat of air at constant pressure (J/(kg·K))
    pub heat_capacity: f64,
    /// Gravitational acceleration (m/s²)
    pub gravity: f64,
    /// von Kármán constant
    pub von_karman: f64,
}

impl Default for FluxConstants {
    fn default() -> Self {
        Self {
            pressure: 101_325.0,
            gas_constant: 287.0,
            heat_capacity: 1005.0,
            gravity: 9.8,
            von_karman: 0.4,
        }
    }
}

const KELVIN: f64 = 273.15;

/// Fluxes of one bin
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BinFluxes {
    /// Horizontal kinematic momentum flux `√(wu² + wv²)`
    pub wu_h: f64,
    /// Friction velocity
    pub u_star: f64,
    /// Air density (kg/m³)
    pub rho: f64,
    /// Sensible heat flux (W/m²)
    pub h: f64,
    /// Momentum flux (N/m²)
    pub tau: f64,
    /// Obukhov length (m)
    pub l: f64,
    /// Stability parameter `z / L`
    pub zeta: f64,
    /// Turbulent kinetic energy per unit mass
    pub tke: f64,
    /// Anisotropy `ww / (uu + vv + ww)`
    pub anisotropy: f64,
}

/// Second-order moments and mean temperature of one bin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluxInputs {
    pub wu: f64,
    pub wv: f64,
    pub wt: f64,
    pub uu: f64,
    pub vv: f64,
    pub ww: f64,
    /// Mean temperature (°C)
    pub t: f64,
}

impl BinFluxes {
    pub fn compute(m: &FluxInputs, height: f64, c: &FluxConstants) -> Self {
        let wu_h = (m.wu * m.wu + m.wv * m.wv).sqrt();
        let u_star = wu_h.sqrt();
        let kelvin = m.t + KELVIN;
        let rho = c.pressure / (c.gas_constant * kelvin);
        let l = -kelvin * u_star.powi(3) / (c.gravity * c.von_karman * m.wt);
        let variance = m.uu + m.vv + m.ww;

        Self {
            wu_h,
            u_star,
            rho,
            h: rho * c.heat_capacity * m.wt,
            tau: rho * wu_h,
            l,
            zeta: height / l,
            tke: variance / 2.0,
            anisotropy: m.ww / variance,
        }
    }
}

fn moment<'a>(moments: &'a MomentTable, a: &str, b: &str) -> Result<&'a [f64]> {
    moments.require(&moment_name(&[a, b]))
}

/// Per-bin flux table
///
/// Columns: `wu_h u_star rho H tau L zeta TKE A`.
///
/// # Errors
/// `UnsupportedInput` when the tables differ in row count or lack a moment
/// (`wu wv wt uu vv ww` over `names`) or the temperature mean.
pub fn flux_table(
    means: &BinTable,
    moments: &MomentTable,
    names: &ChannelNames,
    height: f64,
    constants: &FluxConstants,
) -> Result<BinTable> {
    if means.rows() != moments.rows() {
        return Err(EddyError::input(format!(
            "means have {} bins but moments have {}",
            means.rows(),
            moments.rows()
        )));
    }
    let (u, v, w, t) = (names.u.as_str(), names.v.as_str(), names.w.as_str(), names.t.as_str());
    let wu = moment(moments, w, u)?;
    let wv = moment(moments, w, v)?;
    let wt = moment(moments, w, t)?;
    let uu = moment(moments, u, u)?;
    let vv = moment(moments, v, v)?;
    let ww = moment(moments, w, w)?;
    let temperature = means.require(t)?;

    let rows: Vec<BinFluxes> = (0..means.rows())
        .map(|i| {
            let inputs = FluxInputs {
                wu: wu[i],
                wv: wv[i],
                wt: wt[i],
                uu: uu[i],
                vv: vv[i],
                ww: ww[i],
                t: temperature[i],
            };
            BinFluxes::compute(&inputs, height, constants)
        })
        .collect();

    let mut table = BinTable::new(means.lefts().to_vec());
    let columns: [(&str, fn(&BinFluxes) -> f64); 9] = [
        ("wu_h", |f| f.wu_h),
        ("u_star", |f| f.u_star),
        ("rho", |f| f.rho),
        ("H", |f| f.h),
        ("tau", |f| f.tau),
        ("L", |f| f.l),
        ("zeta", |f| f.zeta),
        ("TKE", |f| f.tke),
        ("A", |f| f.anisotropy),
    ];
    for (name, pick) in columns {
        table.push_column(name, rows.iter().map(pick).collect())?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> FluxInputs {
        FluxInputs {
            wu: -0.09,
            wv: 0.12,
            wt: 0.05,
            uu: 1.0,
            vv: 0.6,
            ww: 0.4,
            t: 15.0,
        }
    }

    #[test]
    fn test_bin_fluxes() {
        let f = BinFluxes::compute(&inputs(), 40.0, &FluxConstants::default());
        assert!((f.wu_h - 0.15).abs() < 1e-12);
        assert!((f.u_star - 0.15f64.sqrt()).abs() < 1e-12);

        let rho = 101_325.0 / (287.0 * 288.15);
        assert!((f.rho - rho).abs() < 1e-12);
        assert!((f.h - rho * 1005.0 * 0.05).abs() < 1e-9);
        assert!((f.tau - rho * 0.15).abs() < 1e-12);

        let l = -288.15 * 0.15f64.powf(1.5) / (9.8 * 0.4 * 0.05);
        assert!((f.l - l).abs() < 1e-9);
        assert!((f.zeta - 40.0 / l).abs() < 1e-12);
        assert!((f.tke - 1.0).abs() < 1e-12);
        assert!((f.anisotropy - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_zero_heat_flux_is_not_an_error() {
        let m = FluxInputs {
            wt: 0.0,
            ..inputs()
        };
        let f = BinFluxes::compute(&m, 40.0, &FluxConstants::default());
        assert!(f.l.is_infinite());
        assert_eq!(f.zeta, 0.0);
        assert_eq!(f.h, 0.0);
    }

    #[test]
    fn test_flux_table_columns() {
        let lefts = vec![0.0, 1800.0];
        let mut means = BinTable::new(lefts.clone());
        means.push_column("t", vec![15.0, f64::NAN]).unwrap();
        let mut moments = BinTable::new(lefts);
        for (name, value) in [
            ("wu", -0.09),
            ("wv", 0.12),
            ("wt", 0.05),
            ("uu", 1.0),
            ("vv", 0.6),
            ("ww", 0.4),
        ] {
            moments.push_column(name, vec![value, value]).unwrap();
        }

        let table = flux_table(
            &means,
            &moments,
            &ChannelNames::default(),
            40.0,
            &FluxConstants::default(),
        )
        .unwrap();
        assert_eq!(
            table.names(),
            vec!["wu_h", "u_star", "rho", "H", "tau", "L", "zeta", "TKE", "A"]
        );
        assert!((table.column("TKE").unwrap()[0] - 1.0).abs() < 1e-12);
        assert!(table.column("rho").unwrap()[1].is_nan());
    }

    #[test]
    fn test_flux_table_requires_moments() {
        let means = BinTable::new(vec![0.0]);
        let moments = BinTable::new(vec![0.0]);
        let result = flux_table(
            &means,
            &moments,
            &ChannelNames::default(),
            40.0,
            &FluxConstants::default(),
        );
        assert!(matches!(result, Err(EddyError::UnsupportedInput(_))));
    }
}
