//! Bundled approximate water/steam property backend.
//!
//! A saturation-curve fit with frozen heat capacities and an ideal-gas vapor
//! volume. The fit is calibrated near atmospheric pressure; it keeps every
//! property finite and monotone over the supported region, which is what the
//! network solver needs. It is not a substitute for a full formulation.
//!
//! Model:
//! - saturation curve: Antoine form `log10(p) = A − B/(T + C)`
//! - liquid enthalpy: frozen cp from the 273.15 K datum
//! - latent heat: linear fit `h_fg(T) = h_fg0 − k·(T − 273.15)`
//! - vapor volume: ideal gas with the specific gas constant of water
//! - two-phase properties: quality-weighted saturation branches

use crate::error::{SteamError, SteamResult};
use crate::table::SteamTable;
use crate::{SpecEnthalpy, SpecEntropy, SpecHeatCapacity, SpecVolume};

/// Supported pressure range [Pa].
const P_MIN: f64 = 700.0;
const P_MAX: f64 = 2.0e7;

/// Supported temperature range [K].
const T_MIN: f64 = 273.16;
const T_MAX: f64 = 640.0;

/// Antoine coefficients for water, pressure in mmHg and temperature in °C.
const ANTOINE_A: f64 = 8.14019;
const ANTOINE_B: f64 = 1810.94;
const ANTOINE_C: f64 = 244.485;
const MMHG_TO_PA: f64 = 133.322;

/// Frozen specific heat of liquid water [J/(kg·K)].
const CP_LIQ: f64 = 4_186.0;

/// Frozen specific heat of steam [J/(kg·K)].
const CP_VAP: f64 = 2_080.0;

/// Latent heat at 273.15 K [J/kg] and its linear temperature slope [J/(kg·K)].
const H_FG0: f64 = 2.501e6;
const H_FG_SLOPE: f64 = 2_361.0;

/// Specific gas constant of water vapor [J/(kg·K)].
const R_STEAM: f64 = 461.5;

/// Specific volume of liquid water [m³/kg], treated as incompressible.
const V_LIQ: f64 = 1.0e-3;

/// Enthalpy datum temperature [K].
const T_DATUM: f64 = 273.15;

/// Curve-fit water/steam property backend.
#[derive(Debug, Clone, Default)]
pub struct CurveFitTable;

impl CurveFitTable {
    pub fn new() -> Self {
        Self
    }

    fn check_pressure(p: f64) -> SteamResult<f64> {
        if !p.is_finite() || p <= 0.0 {
            return Err(SteamError::NonPhysical { what: "pressure" });
        }
        if !(P_MIN..=P_MAX).contains(&p) {
            return Err(SteamError::OutOfRange {
                what: "pressure",
                value: p,
            });
        }
        Ok(p)
    }

    fn check_temperature(t: f64) -> SteamResult<f64> {
        if !t.is_finite() || t <= 0.0 {
            return Err(SteamError::NonPhysical {
                what: "temperature",
            });
        }
        if !(T_MIN..=T_MAX).contains(&t) {
            return Err(SteamError::OutOfRange {
                what: "temperature",
                value: t,
            });
        }
        Ok(t)
    }

    fn check_enthalpy(h: f64) -> SteamResult<f64> {
        if !h.is_finite() {
            return Err(SteamError::NonPhysical { what: "enthalpy" });
        }
        Ok(h)
    }

    /// Latent heat of vaporization [J/kg] at temperature [K].
    fn h_fg(t: f64) -> f64 {
        (H_FG0 - H_FG_SLOPE * (t - T_DATUM)).max(0.0)
    }

    /// Saturated-vapor specific volume [m³/kg] at `(p, T_sat)`.
    fn v_vap(p: f64, t_sat: f64) -> f64 {
        R_STEAM * t_sat / p
    }
}

impl SteamTable for CurveFitTable {
    fn name(&self) -> &str {
        "curvefit"
    }

    fn t_sat_p(&self, p: f64) -> SteamResult<f64> {
        let p = Self::check_pressure(p)?;
        let p_mmhg = p / MMHG_TO_PA;
        let t_c = ANTOINE_B / (ANTOINE_A - p_mmhg.log10()) - ANTOINE_C;
        Ok(t_c + T_DATUM)
    }

    fn p_sat_t(&self, t: f64) -> SteamResult<f64> {
        let t = Self::check_temperature(t)?;
        let t_c = t - T_DATUM;
        let p_mmhg = 10f64.powf(ANTOINE_A - ANTOINE_B / (t_c + ANTOINE_C));
        Ok(p_mmhg * MMHG_TO_PA)
    }

    fn h_liq_p(&self, p: f64) -> SteamResult<SpecEnthalpy> {
        let t_sat = self.t_sat_p(p)?;
        Ok(CP_LIQ * (t_sat - T_DATUM))
    }

    fn h_steam_p(&self, p: f64) -> SteamResult<SpecEnthalpy> {
        let t_sat = self.t_sat_p(p)?;
        Ok(CP_LIQ * (t_sat - T_DATUM) + Self::h_fg(t_sat))
    }

    fn s_liq_p(&self, p: f64) -> SteamResult<SpecEntropy> {
        let t_sat = self.t_sat_p(p)?;
        Ok(CP_LIQ * (t_sat / T_DATUM).ln())
    }

    fn s_steam_p(&self, p: f64) -> SteamResult<SpecEntropy> {
        let t_sat = self.t_sat_p(p)?;
        Ok(CP_LIQ * (t_sat / T_DATUM).ln() + Self::h_fg(t_sat) / t_sat)
    }

    fn h_pt(&self, p: f64, t: f64) -> SteamResult<SpecEnthalpy> {
        let t = Self::check_temperature(t)?;
        let t_sat = self.t_sat_p(p)?;
        if t < t_sat {
            Ok(CP_LIQ * (t - T_DATUM))
        } else {
            Ok(self.h_steam_p(p)? + CP_VAP * (t - t_sat))
        }
    }

    fn t_ph(&self, p: f64, h: SpecEnthalpy) -> SteamResult<f64> {
        let h = Self::check_enthalpy(h)?;
        let t_sat = self.t_sat_p(p)?;
        let h_liq = self.h_liq_p(p)?;
        let h_vap = self.h_steam_p(p)?;
        if h <= h_liq {
            Ok((T_DATUM + h / CP_LIQ).max(T_MIN))
        } else if h >= h_vap {
            Ok(t_sat + (h - h_vap) / CP_VAP)
        } else {
            Ok(t_sat)
        }
    }

    fn s_ph(&self, p: f64, h: SpecEnthalpy) -> SteamResult<SpecEntropy> {
        let h = Self::check_enthalpy(h)?;
        let t_sat = self.t_sat_p(p)?;
        let h_liq = self.h_liq_p(p)?;
        let h_vap = self.h_steam_p(p)?;
        if h <= h_liq {
            let t = (T_DATUM + h / CP_LIQ).max(T_MIN);
            Ok(CP_LIQ * (t / T_DATUM).ln())
        } else if h >= h_vap {
            let t = t_sat + (h - h_vap) / CP_VAP;
            Ok(self.s_steam_p(p)? + CP_VAP * (t / t_sat).ln())
        } else {
            let x = (h - h_liq) / (h_vap - h_liq);
            Ok(self.s_liq_p(p)? + x * Self::h_fg(t_sat) / t_sat)
        }
    }

    fn x_ph(&self, p: f64, h: SpecEnthalpy) -> SteamResult<f64> {
        let h = Self::check_enthalpy(h)?;
        let h_liq = self.h_liq_p(p)?;
        let h_vap = self.h_steam_p(p)?;
        Ok(((h - h_liq) / (h_vap - h_liq)).clamp(0.0, 1.0))
    }

    fn c_ph(&self, p: f64, h: SpecEnthalpy) -> SteamResult<SpecHeatCapacity> {
        let h = Self::check_enthalpy(h)?;
        let h_liq = self.h_liq_p(p)?;
        if h < h_liq { Ok(CP_LIQ) } else { Ok(CP_VAP) }
    }

    fn v_ph(&self, p: f64, h: SpecEnthalpy) -> SteamResult<SpecVolume> {
        let h = Self::check_enthalpy(h)?;
        let t_sat = self.t_sat_p(p)?;
        let h_liq = self.h_liq_p(p)?;
        let h_vap = self.h_steam_p(p)?;
        if h <= h_liq {
            Ok(V_LIQ)
        } else if h >= h_vap {
            let t = t_sat + (h - h_vap) / CP_VAP;
            Ok(R_STEAM * t / p)
        } else {
            let x = (h - h_liq) / (h_vap - h_liq);
            Ok(V_LIQ + x * (Self::v_vap(p, t_sat) - V_LIQ))
        }
    }
}
