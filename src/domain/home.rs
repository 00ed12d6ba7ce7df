//! Home envelope and HVAC characteristics for the single-zone thermal model.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Conversion from imperial R-value (ft²·°F·h/Btu) to SI (m²·K/W).
const R_IMPERIAL_PER_SI: f64 = 5.67;
/// Natural ACH is roughly ACH50 divided by this "LBL factor".
const LBL_FACTOR: f64 = 17.0;
/// Lumped heat capacity per m³ of conditioned volume (J/K/m³).
const HEAT_CAPACITY_PER_CU_M: f64 = 1e5;

/// Immutable description of a home.
///
/// All derived quantities are computed from the stored fields on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_setpoints"))]
pub struct HomeCharacteristics {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    /// Heat when indoor temperature falls below this (°C)
    pub heating_setpoint_c: f64,
    /// Cool when indoor temperature rises above this (°C)
    pub cooling_setpoint_c: f64,
    #[validate(range(min = 0.0))]
    pub hvac_capacity_w: f64,
    /// Delivered heat per unit of electricity; above 1 models a heat pump's COP
    #[validate(range(exclusive_min = 0.0))]
    pub hvac_overall_system_efficiency: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub conditioned_floor_area_sq_m: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub ceiling_height_m: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub wall_insulation_r_value_imperial: f64,
    /// Air changes per hour at 50 Pa (blower door)
    #[validate(range(min = 0.0))]
    pub ach50: f64,
    #[validate(range(min = 0.0))]
    pub south_facing_window_size_sq_m: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub window_solar_heat_gain_coefficient: f64,
    pub can_close_curtains: bool,
    pub smart_hvac_algorithm: bool,
}

fn validate_setpoints(home: &HomeCharacteristics) -> Result<(), ValidationError> {
    if home.heating_setpoint_c > home.cooling_setpoint_c {
        let mut err = ValidationError::new("setpoints");
        err.message = Some("heating setpoint must not exceed cooling setpoint".into());
        return Err(err);
    }
    Ok(())
}

impl HomeCharacteristics {
    /// Older home: R-11 walls, leaky envelope, resistive heat, no curtains.
    pub fn baseline_home(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            heating_setpoint_c: 20.0,
            cooling_setpoint_c: 22.0,
            hvac_capacity_w: 10_000.0,
            hvac_overall_system_efficiency: 1.0,
            conditioned_floor_area_sq_m: 200.0,
            ceiling_height_m: 3.0,
            wall_insulation_r_value_imperial: 11.0,
            ach50: 10.0,
            south_facing_window_size_sq_m: 10.0,
            window_solar_heat_gain_coefficient: 0.5,
            can_close_curtains: false,
            smart_hvac_algorithm: false,
        }
    }

    /// Retrofitted home: R-27 walls, tight envelope, heat pump, curtains.
    pub fn improved_home(latitude: f64, longitude: f64) -> Self {
        Self {
            hvac_overall_system_efficiency: 2.0,
            wall_insulation_r_value_imperial: 27.0,
            ach50: 1.5,
            can_close_curtains: true,
            ..Self::baseline_home(latitude, longitude)
        }
    }

    pub fn with_insulation(mut self, r_value_imperial: f64, ach50: f64) -> Self {
        self.wall_insulation_r_value_imperial = r_value_imperial;
        self.ach50 = ach50;
        self
    }

    pub fn with_setpoints(mut self, heating_c: f64, cooling_c: f64) -> Self {
        self.heating_setpoint_c = heating_c;
        self.cooling_setpoint_c = cooling_c;
        self
    }

    pub fn with_hvac_capacity(mut self, capacity_w: f64) -> Self {
        self.hvac_capacity_w = capacity_w;
        self
    }

    pub fn with_smart_control(mut self, enabled: bool) -> Self {
        self.smart_hvac_algorithm = enabled;
        self
    }

    pub fn building_volume_cu_m(&self) -> f64 {
        self.conditioned_floor_area_sq_m * self.ceiling_height_m
    }

    /// Perimeter of a one-story square footprint.
    pub fn building_perimeter_m(&self) -> f64 {
        self.conditioned_floor_area_sq_m.sqrt() * 4.0
    }

    /// Wall area plus roof area (roof ~= floor for one story); the floor is ignored.
    pub fn surface_area_sq_m(&self) -> f64 {
        self.building_perimeter_m() * self.ceiling_height_m + self.conditioned_floor_area_sq_m
    }

    pub fn ach_natural(&self) -> f64 {
        self.ach50 / LBL_FACTOR
    }

    pub fn wall_insulation_r_value_si(&self) -> f64 {
        self.wall_insulation_r_value_imperial / R_IMPERIAL_PER_SI
    }

    /// Energy needed to move the indoor temperature by 1 K (J/K).
    pub fn building_heat_capacity_j_per_k(&self) -> f64 {
        self.building_volume_cu_m() * HEAT_CAPACITY_PER_CU_M
    }
}
