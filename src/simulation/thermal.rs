//! Single-zone lumped-capacitance house model.
//!
//! Each step sums four heat flows into the house (conduction through the
//! envelope, air exchange, solar gain through the south window and HVAC) and
//! turns the net energy into a temperature change via the building's heat
//! capacity.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::hvac::{ControlContext, HvacControl, HvacMode};
use super::weather::{WeatherPoint, WeatherSeries};
use crate::domain::HomeCharacteristics;

pub const JOULES_PER_KWH: f64 = 3.6e6;
/// Heat capacity of air per unit volume (J/(m³·K))
pub const AIR_VOLUMETRIC_HEAT_CAPACITY: f64 = 1200.0;
/// Solar gain left when curtains are drawn
pub const CURTAIN_SOLAR_FACTOR: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStep {
    pub timestamp: DateTime<FixedOffset>,
    /// Indoor temperature after this step
    pub indoor_temp_c: f64,
    pub outdoor_temp_c: f64,
    pub irradiance_w_m2: f64,
    /// Outdoor minus indoor at the start of the step
    pub temperature_difference_c: f64,
    pub conduction_j: f64,
    pub air_change_j: f64,
    pub radiant_j: f64,
    pub hvac_j: f64,
    pub hvac_mode: HvacMode,
    pub net_energy_j: f64,
    pub delta_t_c: f64,
    /// Electricity drawn by the HVAC equipment
    pub hvac_energy_kwh: f64,
}

/// Advance the house by one step of `dt_seconds` starting at `indoor_temp_c`.
pub fn calculate_next_timestep(
    home: &HomeCharacteristics,
    indoor_temp_c: f64,
    weather: &WeatherPoint,
    dt_seconds: f64,
    control: &dyn HvacControl,
) -> SimulationStep {
    let outdoor = weather.temp_air_c;
    let temperature_difference_c = outdoor - indoor_temp_c;

    let conduction_w =
        temperature_difference_c * home.surface_area_sq_m() / home.wall_insulation_r_value_si();
    let conduction_j = conduction_w * dt_seconds;

    let exchanged_air_cu_m = dt_seconds * home.building_volume_cu_m() * home.ach_natural() / 3600.0;
    let air_change_j = temperature_difference_c * exchanged_air_cu_m * AIR_VOLUMETRIC_HEAT_CAPACITY;

    let mut radiant_j = home.south_facing_window_size_sq_m
        * home.window_solar_heat_gain_coefficient
        * weather.window_irradiance_w_m2
        * dt_seconds;
    if home.can_close_curtains && indoor_temp_c > home.cooling_setpoint_c {
        radiant_j *= CURTAIN_SOLAR_FACTOR;
    }

    let hvac_mode = control.decide(&ControlContext {
        home,
        timestamp: weather.timestamp.naive_local(),
        indoor_temp_c,
        outdoor_temp_c: outdoor,
    });
    let hvac_j = hvac_mode.direction() * home.hvac_capacity_w * dt_seconds;

    let net_energy_j = conduction_j + air_change_j + radiant_j + hvac_j;
    let delta_t_c = net_energy_j / home.building_heat_capacity_j_per_k();

    SimulationStep {
        timestamp: weather.timestamp,
        indoor_temp_c: indoor_temp_c + delta_t_c,
        outdoor_temp_c: outdoor,
        irradiance_w_m2: weather.window_irradiance_w_m2,
        temperature_difference_c,
        conduction_j,
        air_change_j,
        radiant_j,
        hvac_j,
        hvac_mode,
        net_energy_j,
        delta_t_c,
        hvac_energy_kwh: hvac_j.abs() / (JOULES_PER_KWH * home.hvac_overall_system_efficiency),
    }
}

/// Runs a home through a weather series with a fixed step length.
#[derive(Debug, Clone, Copy)]
pub struct ThermalSimulator {
    dt_seconds: f64,
}

impl ThermalSimulator {
    pub fn new(step_minutes: u32) -> Self {
        Self {
            dt_seconds: f64::from(step_minutes) * 60.0,
        }
    }

    pub fn dt_seconds(&self) -> f64 {
        self.dt_seconds
    }

    /// One step per weather point, starting at the heating setpoint.
    pub fn run(
        &self,
        home: &HomeCharacteristics,
        weather: &WeatherSeries,
        control: &dyn HvacControl,
    ) -> Vec<SimulationStep> {
        let mut indoor = home.heating_setpoint_c;
        let mut steps = Vec::with_capacity(weather.len());
        for point in weather.points() {
            let step = calculate_next_timestep(home, indoor, point, self.dt_seconds, control);
            indoor = step.indoor_temp_c;
            steps.push(step);
        }
        steps
    }
}

impl Default for ThermalSimulator {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Energy flows summed over one calendar month, in MJ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyEnergyBalance {
    /// First day of the month
    pub month: NaiveDate,
    pub conduction_mj: f64,
    pub air_change_mj: f64,
    pub radiant_mj: f64,
    pub hvac_mj: f64,
}

pub fn monthly_energy_balance(steps: &[SimulationStep]) -> Vec<MonthlyEnergyBalance> {
    let mut months: BTreeMap<NaiveDate, [f64; 4]> = BTreeMap::new();
    for step in steps {
        let local = step.timestamp.date_naive();
        let Some(month) = local.with_day(1) else {
            continue;
        };
        let sums = months.entry(month).or_insert([0.0; 4]);
        sums[0] += step.conduction_j;
        sums[1] += step.air_change_j;
        sums[2] += step.radiant_j;
        sums[3] += step.hvac_j;
    }
    months
        .into_iter()
        .map(|(month, [conduction, air, radiant, hvac])| MonthlyEnergyBalance {
            month,
            conduction_mj: conduction / 1e6,
            air_change_mj: air / 1e6,
            radiant_mj: radiant / 1e6,
            hvac_mj: hvac / 1e6,
        })
        .collect()
}
