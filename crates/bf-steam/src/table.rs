//! The steam property oracle surface.

use crate::error::{SteamError, SteamResult};
use crate::{SpecEnthalpy, SpecEntropy, SpecHeatCapacity, SpecVolume};

/// Recognized property keys of the stringly lookup surface.
///
/// Backends may accept a superset; these are the keys the engine itself
/// relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// Saturation temperature from pressure.
    TSatP,
    /// Saturation pressure from temperature.
    PSatT,
    /// Saturated-liquid enthalpy from pressure.
    HLiqP,
    /// Saturated-vapor enthalpy from pressure.
    HSteamP,
    /// Saturated-liquid entropy from pressure.
    SLiqP,
    /// Saturated-vapor entropy from pressure.
    SSteamP,
    /// Enthalpy from pressure and temperature.
    HPt,
    /// Temperature from pressure and enthalpy.
    TPh,
    /// Entropy from pressure and enthalpy.
    SPh,
    /// Entropy from pressure and temperature.
    SPt,
    /// Vapor quality from pressure and enthalpy.
    XPh,
    /// Specific heat capacity from pressure and enthalpy.
    CPh,
    /// Specific volume from pressure and enthalpy.
    VPh,
}

impl PropertyKey {
    /// Parse a key name as it appears in lookup requests.
    pub fn parse(key: &str) -> SteamResult<Self> {
        Ok(match key {
            "TSat_p" => PropertyKey::TSatP,
            "pSat_T" => PropertyKey::PSatT,
            "hLiq_p" => PropertyKey::HLiqP,
            "hSteam_p" => PropertyKey::HSteamP,
            "sLiq_p" => PropertyKey::SLiqP,
            "sSteam_p" => PropertyKey::SSteamP,
            "h_pT" => PropertyKey::HPt,
            "T_ph" => PropertyKey::TPh,
            "s_ph" => PropertyKey::SPh,
            "s_pT" => PropertyKey::SPt,
            "x_ph" => PropertyKey::XPh,
            "c_ph" => PropertyKey::CPh,
            "v_ph" => PropertyKey::VPh,
            _ => {
                return Err(SteamError::UnknownKey {
                    key: key.to_string(),
                });
            }
        })
    }

    /// Number of scalar arguments the key expects.
    pub fn arity(self) -> usize {
        match self {
            PropertyKey::TSatP
            | PropertyKey::PSatT
            | PropertyKey::HLiqP
            | PropertyKey::HSteamP
            | PropertyKey::SLiqP
            | PropertyKey::SSteamP => 1,
            _ => 2,
        }
    }

    /// The canonical key name.
    pub fn name(self) -> &'static str {
        match self {
            PropertyKey::TSatP => "TSat_p",
            PropertyKey::PSatT => "pSat_T",
            PropertyKey::HLiqP => "hLiq_p",
            PropertyKey::HSteamP => "hSteam_p",
            PropertyKey::SLiqP => "sLiq_p",
            PropertyKey::SSteamP => "sSteam_p",
            PropertyKey::HPt => "h_pT",
            PropertyKey::TPh => "T_ph",
            PropertyKey::SPh => "s_ph",
            PropertyKey::SPt => "s_pT",
            PropertyKey::XPh => "x_ph",
            PropertyKey::CPh => "c_ph",
            PropertyKey::VPh => "v_ph",
        }
    }
}

/// Trait for steam property backends.
///
/// Implementations must be thread-safe (Send + Sync); the table is shared
/// read-only across the network. All pressures are absolute [Pa], all
/// temperatures [K].
pub trait SteamTable: Send + Sync {
    /// Backend name (for diagnostics).
    fn name(&self) -> &str;

    /// Saturation temperature [K] at pressure [Pa].
    fn t_sat_p(&self, p: f64) -> SteamResult<f64>;

    /// Saturation pressure [Pa] at temperature [K].
    fn p_sat_t(&self, t: f64) -> SteamResult<f64>;

    /// Saturated-liquid specific enthalpy [J/kg] at pressure [Pa].
    fn h_liq_p(&self, p: f64) -> SteamResult<SpecEnthalpy>;

    /// Saturated-vapor specific enthalpy [J/kg] at pressure [Pa].
    fn h_steam_p(&self, p: f64) -> SteamResult<SpecEnthalpy>;

    /// Saturated-liquid specific entropy [J/(kg·K)] at pressure [Pa].
    fn s_liq_p(&self, p: f64) -> SteamResult<SpecEntropy>;

    /// Saturated-vapor specific entropy [J/(kg·K)] at pressure [Pa].
    fn s_steam_p(&self, p: f64) -> SteamResult<SpecEntropy>;

    /// Specific enthalpy [J/kg] from pressure [Pa] and temperature [K].
    fn h_pt(&self, p: f64, t: f64) -> SteamResult<SpecEnthalpy>;

    /// Temperature [K] from pressure [Pa] and enthalpy [J/kg].
    fn t_ph(&self, p: f64, h: SpecEnthalpy) -> SteamResult<f64>;

    /// Specific entropy [J/(kg·K)] from pressure [Pa] and enthalpy [J/kg].
    fn s_ph(&self, p: f64, h: SpecEnthalpy) -> SteamResult<SpecEntropy>;

    /// Specific entropy [J/(kg·K)] from pressure [Pa] and temperature [K].
    fn s_pt(&self, p: f64, t: f64) -> SteamResult<SpecEntropy> {
        let h = self.h_pt(p, t)?;
        self.s_ph(p, h)
    }

    /// Vapor quality (0..=1) from pressure [Pa] and enthalpy [J/kg].
    ///
    /// Clamped: subcooled liquid reports 0, superheated vapor reports 1.
    fn x_ph(&self, p: f64, h: SpecEnthalpy) -> SteamResult<f64>;

    /// Specific heat capacity [J/(kg·K)] from pressure [Pa] and enthalpy [J/kg].
    fn c_ph(&self, p: f64, h: SpecEnthalpy) -> SteamResult<SpecHeatCapacity>;

    /// Specific volume [m³/kg] from pressure [Pa] and enthalpy [J/kg].
    fn v_ph(&self, p: f64, h: SpecEnthalpy) -> SteamResult<SpecVolume>;

    /// The stringly lookup surface: `(key, args…) -> f64`.
    ///
    /// Dispatches to the typed methods; backends may extend the key set by
    /// overriding.
    fn prop(&self, key: &str, args: &[f64]) -> SteamResult<f64> {
        let parsed = PropertyKey::parse(key)?;
        if args.len() != parsed.arity() {
            return Err(SteamError::Arity {
                key: parsed.name(),
                expected: parsed.arity(),
                got: args.len(),
            });
        }
        match parsed {
            PropertyKey::TSatP => self.t_sat_p(args[0]),
            PropertyKey::PSatT => self.p_sat_t(args[0]),
            PropertyKey::HLiqP => self.h_liq_p(args[0]),
            PropertyKey::HSteamP => self.h_steam_p(args[0]),
            PropertyKey::SLiqP => self.s_liq_p(args[0]),
            PropertyKey::SSteamP => self.s_steam_p(args[0]),
            PropertyKey::HPt => self.h_pt(args[0], args[1]),
            PropertyKey::TPh => self.t_ph(args[0], args[1]),
            PropertyKey::SPh => self.s_ph(args[0], args[1]),
            PropertyKey::SPt => self.s_pt(args[0], args[1]),
            PropertyKey::XPh => self.x_ph(args[0], args[1]),
            PropertyKey::CPh => self.c_ph(args[0], args[1]),
            PropertyKey::VPh => self.v_ph(args[0], args[1]),
        }
    }
}
