//! Scenario comparison: several homes, one weather timeline, one grid.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};
use validator::Validate;

use super::hvac::{BasicControl, CarbonAwareControl, HvacControl, HvacMode};
use super::thermal::{monthly_energy_balance, MonthlyEnergyBalance, SimulationStep, ThermalSimulator};
use super::weather::WeatherSeries;
use super::{SimulationError, SimulationSettings};
use crate::domain::{clock_hour, HomeCharacteristics, IntensitySeries};

/// Simulate one home, choosing its control policy from its flags.
///
/// A home with `smart_hvac_algorithm` uses [`CarbonAwareControl`] when an
/// intensity series is available, and [`BasicControl`] otherwise.
pub fn model_one_house(
    home: &HomeCharacteristics,
    weather: &WeatherSeries,
    intensity: Option<&IntensitySeries>,
    settings: &SimulationSettings,
) -> Result<Vec<SimulationStep>, SimulationError> {
    home.validate().map_err(|source| SimulationError::InvalidHome {
        name: "home".to_string(),
        source,
    })?;
    if weather.is_empty() {
        return Err(SimulationError::EmptyWeather);
    }

    let simulator = ThermalSimulator::new(settings.step_minutes);
    let steps = match intensity.filter(|s| home.smart_hvac_algorithm && !s.is_empty()) {
        Some(series) => {
            let control = CarbonAwareControl::new(series, settings.comfort_slack_c, settings.lookahead_hours);
            simulator.run(home, weather, &control)
        }
        None => simulator.run(home, weather, &BasicControl),
    };
    Ok(steps)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracePoint {
    pub timestamp: DateTime<FixedOffset>,
    pub indoor_temp_c: f64,
    pub outdoor_temp_c: f64,
    pub hvac_mode: HvacMode,
    pub hvac_energy_kwh: f64,
    /// `None` when no intensity hour matched this step
    pub lbs_co2: Option<f64>,
    pub cumulative_lbs_co2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub control: String,
    pub total_hvac_kwh: f64,
    pub total_lbs_co2: f64,
    /// Steps with no intensity for their clock hour
    pub unmatched_steps: usize,
    /// Steps whose weather offset differs from the grid's
    pub timezone_mismatched_steps: usize,
    pub monthly: Vec<MonthlyEnergyBalance>,
    pub trace: Vec<TracePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDelta {
    pub name: String,
    /// Scenario minus baseline
    pub hvac_kwh: f64,
    pub lbs_co2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub baseline: String,
    pub scenarios: Vec<ScenarioResult>,
    pub differences: Vec<ScenarioDelta>,
}

impl ScenarioComparison {
    pub fn scenario(&self, name: &str) -> Option<&ScenarioResult> {
        self.scenarios.iter().find(|s| s.name == name)
    }
}

/// Runs homes against shared weather and intensity.
///
/// Steps are matched to intensity by local clock hour, ignoring timezones.
/// When either side knows its UTC offset and they disagree the step is still
/// joined, but counted and reported.
#[derive(Debug, Clone, Default)]
pub struct ScenarioComparator {
    settings: SimulationSettings,
    grid_timezone: Option<Tz>,
}

impl ScenarioComparator {
    pub fn new(settings: SimulationSettings) -> Self {
        Self {
            settings,
            grid_timezone: None,
        }
    }

    pub fn with_step_minutes(mut self, step_minutes: u32) -> Self {
        self.settings.step_minutes = step_minutes;
        self
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// Timezone of the grid data, used when it did not declare offsets itself.
    pub fn with_grid_timezone(mut self, tz: Option<Tz>) -> Self {
        self.grid_timezone = tz;
        self
    }

    fn grid_offset(&self, intensity: &IntensitySeries, hour: NaiveDateTime) -> Option<i32> {
        if let Some(offset) = intensity.declared_offsets.get(&hour) {
            return Some(*offset);
        }
        let tz = self.grid_timezone?;
        tz.offset_from_local_datetime(&hour)
            .earliest()
            .map(|o| o.fix().local_minus_utc())
    }

    /// Compare `homes` in order; the first is the baseline.
    pub fn compare(
        &self,
        homes: &[(String, HomeCharacteristics)],
        weather: &WeatherSeries,
        intensity: &IntensitySeries,
    ) -> Result<ScenarioComparison, SimulationError> {
        let Some((baseline, _)) = homes.first() else {
            return Err(SimulationError::NoScenarios);
        };
        let by_hour = intensity.by_hour();

        let mut scenarios = Vec::with_capacity(homes.len());
        for (name, home) in homes {
            let steps = model_one_house(home, weather, Some(intensity), &self.settings).map_err(|e| match e {
                SimulationError::InvalidHome { source, .. } => SimulationError::InvalidHome {
                    name: name.clone(),
                    source,
                },
                other => other,
            })?;
            let control = if home.smart_hvac_algorithm && !intensity.is_empty() {
                "carbon_aware"
            } else {
                "basic"
            };
            scenarios.push(self.join(name, control, &steps, intensity, &by_hour));
        }

        let base_kwh = scenarios[0].total_hvac_kwh;
        let base_lbs = scenarios[0].total_lbs_co2;
        let differences = scenarios
            .iter()
            .skip(1)
            .map(|s| ScenarioDelta {
                name: s.name.clone(),
                hvac_kwh: s.total_hvac_kwh - base_kwh,
                lbs_co2: s.total_lbs_co2 - base_lbs,
            })
            .collect();

        Ok(ScenarioComparison {
            baseline: baseline.clone(),
            scenarios,
            differences,
        })
    }

    fn join(
        &self,
        name: &str,
        control: &str,
        steps: &[SimulationStep],
        intensity: &IntensitySeries,
        by_hour: &BTreeMap<NaiveDateTime, f64>,
    ) -> ScenarioResult {
        let mut cumulative = 0.0;
        let mut total_kwh = 0.0;
        let mut unmatched = 0usize;
        let mut mismatched = 0usize;
        let mut trace = Vec::with_capacity(steps.len());

        for step in steps {
            let hour = clock_hour(step.timestamp.naive_local());
            let weather_offset = step.timestamp.offset().local_minus_utc();
            if matches!(self.grid_offset(intensity, hour), Some(grid) if grid != weather_offset) {
                mismatched += 1;
            }

            let lbs_co2 = by_hour.get(&hour).map(|lbs_per_kwh| step.hvac_energy_kwh * lbs_per_kwh);
            match lbs_co2 {
                Some(lbs) => cumulative += lbs,
                None => unmatched += 1,
            }
            total_kwh += step.hvac_energy_kwh;

            trace.push(TracePoint {
                timestamp: step.timestamp,
                indoor_temp_c: step.indoor_temp_c,
                outdoor_temp_c: step.outdoor_temp_c,
                hvac_mode: step.hvac_mode,
                hvac_energy_kwh: step.hvac_energy_kwh,
                lbs_co2,
                cumulative_lbs_co2: cumulative,
            });
        }

        if unmatched > 0 {
            warn!(scenario = name, unmatched, steps = steps.len(), "steps without grid intensity");
        }
        if mismatched > 0 {
            warn!(
                scenario = name,
                mismatched,
                "weather and grid UTC offsets differ; joined on local clock hour anyway"
            );
        }
        info!(
            scenario = name,
            control,
            total_hvac_kwh = total_kwh,
            total_lbs_co2 = cumulative,
            "scenario complete"
        );

        ScenarioResult {
            name: name.to_string(),
            control: control.to_string(),
            total_hvac_kwh: total_kwh,
            total_lbs_co2: cumulative,
            unmatched_steps: unmatched,
            timezone_mismatched_steps: mismatched,
            monthly: monthly_energy_balance(steps),
            trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HourlyIntensity;
    use crate::simulation::weather::WeatherPoint;
    use chrono::{Duration, NaiveDate};

    fn weather(offset_hours: i32, hours: i64, temp: f64) -> WeatherSeries {
        let tz = FixedOffset::east_opt(offset_hours * 3600).unwrap();
        let start = tz.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        WeatherSeries::new(
            (0..hours * 6)
                .map(|i| WeatherPoint {
                    timestamp: start + Duration::minutes(i * 10),
                    temp_air_c: temp,
                    window_irradiance_w_m2: 0.0,
                })
                .collect(),
        )
    }

    fn intensity(hours: u32, value: f64, offset: Option<i32>) -> IntensitySeries {
        let mut series = IntensitySeries::default();
        for h in 0..hours {
            let ts = NaiveDate::from_ymd_opt(2024, 1, 10)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap();
            series.hours.push(HourlyIntensity {
                timestamp: ts,
                total_usage_mwh: 1.0,
                total_emissions_lbs: value * 1000.0,
                lbs_co2_per_kwh: value,
            });
            if let Some(o) = offset {
                series.declared_offsets.insert(ts, o);
            }
        }
        series
    }

    fn homes() -> Vec<(String, HomeCharacteristics)> {
        vec![
            ("old".to_string(), HomeCharacteristics::baseline_home(44.6, -72.8)),
            ("new".to_string(), HomeCharacteristics::improved_home(44.6, -72.8)),
        ]
    }

    #[test]
    fn test_emissions_are_kwh_times_intensity() {
        let cmp = ScenarioComparator::default()
            .compare(&homes(), &weather(-5, 24, -5.0), &intensity(24, 0.8, None))
            .unwrap();

        let old = cmp.scenario("old").unwrap();
        assert_eq!(old.unmatched_steps, 0);
        assert!((old.total_lbs_co2 - old.total_hvac_kwh * 0.8).abs() < 1e-6);
        assert_eq!(old.trace.len(), 144);
        assert_eq!(old.trace.last().unwrap().cumulative_lbs_co2, old.total_lbs_co2);

        let new = cmp.scenario("new").unwrap();
        assert!(new.total_hvac_kwh < old.total_hvac_kwh);
        assert_eq!(cmp.baseline, "old");
        assert_eq!(cmp.differences.len(), 1);
        assert!(cmp.differences[0].lbs_co2 < 0.0);
    }

    #[test]
    fn test_unmatched_steps_contribute_nothing() {
        let cmp = ScenarioComparator::default()
            .compare(&homes()[..1], &weather(-5, 24, -5.0), &intensity(12, 1.0, None))
            .unwrap();
        let old = &cmp.scenarios[0];
        assert_eq!(old.unmatched_steps, 72);
        let matched_kwh: f64 = old.trace.iter().filter(|t| t.lbs_co2.is_some()).map(|t| t.hvac_energy_kwh).sum();
        assert!((old.total_lbs_co2 - matched_kwh).abs() < 1e-9);
    }

    #[test]
    fn test_timezone_mismatch_counted_not_fatal() {
        let cmp = ScenarioComparator::default()
            .compare(&homes()[..1], &weather(-5, 24, -5.0), &intensity(24, 1.0, Some(-8 * 3600)))
            .unwrap();
        assert_eq!(cmp.scenarios[0].timezone_mismatched_steps, 144);
        assert_eq!(cmp.scenarios[0].unmatched_steps, 0);

        let aligned = ScenarioComparator::default()
            .compare(&homes()[..1], &weather(-5, 24, -5.0), &intensity(24, 1.0, Some(-5 * 3600)))
            .unwrap();
        assert_eq!(aligned.scenarios[0].timezone_mismatched_steps, 0);
    }

    #[test]
    fn test_configured_grid_timezone_detects_mismatch() {
        let cmp = ScenarioComparator::default()
            .with_grid_timezone(Some(chrono_tz::America::Los_Angeles))
            .compare(&homes()[..1], &weather(-5, 2, -5.0), &intensity(24, 1.0, None))
            .unwrap();
        assert_eq!(cmp.scenarios[0].timezone_mismatched_steps, 12);
    }

    #[test]
    fn test_smart_home_uses_carbon_aware_control() {
        let homes = vec![(
            "smart".to_string(),
            HomeCharacteristics::baseline_home(44.6, -72.8).with_smart_control(true),
        )];
        let cmp = ScenarioComparator::default()
            .compare(&homes, &weather(-5, 24, -5.0), &intensity(24, 1.0, None))
            .unwrap();
        assert_eq!(cmp.scenarios[0].control, "carbon_aware");

        let steps = model_one_house(&homes[0].1, &weather(-5, 1, -5.0), None, &SimulationSettings::default()).unwrap();
        assert_eq!(steps.len(), 6);
    }

    #[test]
    fn test_invalid_home_named_in_error() {
        let homes = vec![(
            "broken".to_string(),
            HomeCharacteristics::baseline_home(44.6, -72.8).with_setpoints(25.0, 20.0),
        )];
        let err = ScenarioComparator::default()
            .compare(&homes, &weather(-5, 1, 0.0), &intensity(1, 1.0, None))
            .unwrap_err();
        assert!(matches!(err, SimulationError::InvalidHome { ref name, .. } if name == "broken"));
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let c = ScenarioComparator::default();
        assert!(matches!(
            c.compare(&[], &weather(-5, 1, 0.0), &intensity(1, 1.0, None)),
            Err(SimulationError::NoScenarios)
        ));
        assert!(matches!(
            c.compare(&homes(), &WeatherSeries::default(), &intensity(1, 1.0, None)),
            Err(SimulationError::EmptyWeather)
        ));
    }
}
