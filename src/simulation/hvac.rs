//! HVAC control policies.

use chrono::{Duration, NaiveDateTime};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::Display;

use crate::domain::{clock_hour, HomeCharacteristics, IntensitySeries};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HvacMode {
    Heating,
    Cooling,
    Off,
}

impl HvacMode {
    /// Sign of the heat the equipment adds to the house.
    pub fn direction(&self) -> f64 {
        match self {
            HvacMode::Heating => 1.0,
            HvacMode::Cooling => -1.0,
            HvacMode::Off => 0.0,
        }
    }
}

/// What a policy sees when deciding a step.
#[derive(Debug, Clone, Copy)]
pub struct ControlContext<'a> {
    pub home: &'a HomeCharacteristics,
    /// Local-clock time of the step
    pub timestamp: NaiveDateTime,
    /// Indoor temperature at the start of the step
    pub indoor_temp_c: f64,
    pub outdoor_temp_c: f64,
}

pub trait HvacControl: Send + Sync {
    fn decide(&self, ctx: &ControlContext<'_>) -> HvacMode;
    fn name(&self) -> &str;
}

fn thermostat(indoor_c: f64, heat_below_c: f64, cool_above_c: f64) -> HvacMode {
    if indoor_c < heat_below_c {
        HvacMode::Heating
    } else if indoor_c > cool_above_c {
        HvacMode::Cooling
    } else {
        HvacMode::Off
    }
}

/// Heat below the heating setpoint, cool above the cooling setpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicControl;

impl HvacControl for BasicControl {
    fn decide(&self, ctx: &ControlContext<'_>) -> HvacMode {
        thermostat(
            ctx.indoor_temp_c,
            ctx.home.heating_setpoint_c,
            ctx.home.cooling_setpoint_c,
        )
    }

    fn name(&self) -> &str {
        "basic"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PriceTier {
    Cheap,
    Average,
    Expensive,
}

/// Shifts HVAC load away from high-carbon hours.
///
/// Hours are split into terciles of grid intensity. In expensive hours the
/// comfort band widens by `comfort_slack_c` on both sides. In cheap hours with
/// an expensive hour coming up within `lookahead_hours`, the house is
/// pre-heated up to the cooling setpoint (when it is colder outside than the
/// heating setpoint) or pre-cooled down to the heating setpoint (when it is
/// hotter outside than the cooling setpoint). Everything else, including hours
/// without an intensity value, falls back to [`BasicControl`].
#[derive(Debug, Clone)]
pub struct CarbonAwareControl {
    tiers: BTreeMap<NaiveDateTime, PriceTier>,
    comfort_slack_c: f64,
    lookahead_hours: u32,
}

impl CarbonAwareControl {
    pub fn new(intensity: &IntensitySeries, comfort_slack_c: f64, lookahead_hours: u32) -> Self {
        let by_hour = intensity.by_hour();
        let mut sorted: Vec<OrderedFloat<f64>> = by_hour.values().copied().map(OrderedFloat).collect();
        sorted.sort();

        let tiers = if sorted.is_empty() {
            BTreeMap::new()
        } else {
            let cheap_below = sorted[sorted.len() / 3].into_inner();
            let expensive_above = sorted[(sorted.len() * 2) / 3].into_inner();
            by_hour
                .into_iter()
                .map(|(hour, v)| {
                    let tier = if v < cheap_below {
                        PriceTier::Cheap
                    } else if v > expensive_above || (v == expensive_above && expensive_above > cheap_below) {
                        PriceTier::Expensive
                    } else {
                        PriceTier::Average
                    };
                    (hour, tier)
                })
                .collect()
        };

        Self {
            tiers,
            comfort_slack_c,
            lookahead_hours,
        }
    }

    pub fn tier_at(&self, timestamp: NaiveDateTime) -> Option<PriceTier> {
        self.tiers.get(&clock_hour(timestamp)).copied()
    }

    fn expensive_ahead(&self, timestamp: NaiveDateTime) -> bool {
        let from = clock_hour(timestamp) + Duration::hours(1);
        let to = from + Duration::hours(i64::from(self.lookahead_hours));
        self.tiers
            .range(from..to)
            .any(|(_, tier)| *tier == PriceTier::Expensive)
    }
}

impl HvacControl for CarbonAwareControl {
    fn decide(&self, ctx: &ControlContext<'_>) -> HvacMode {
        let heat_sp = ctx.home.heating_setpoint_c;
        let cool_sp = ctx.home.cooling_setpoint_c;

        match self.tier_at(ctx.timestamp) {
            Some(PriceTier::Expensive) => thermostat(
                ctx.indoor_temp_c,
                heat_sp - self.comfort_slack_c,
                cool_sp + self.comfort_slack_c,
            ),
            Some(PriceTier::Cheap) if self.expensive_ahead(ctx.timestamp) => {
                if ctx.outdoor_temp_c < heat_sp && ctx.indoor_temp_c < cool_sp {
                    HvacMode::Heating
                } else if ctx.outdoor_temp_c > cool_sp && ctx.indoor_temp_c > heat_sp {
                    HvacMode::Cooling
                } else {
                    BasicControl.decide(ctx)
                }
            }
            _ => BasicControl.decide(ctx),
        }
    }

    fn name(&self) -> &str {
        "carbon_aware"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HourlyIntensity;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn ts(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn home() -> HomeCharacteristics {
        HomeCharacteristics::baseline_home(44.6, -72.8)
    }

    fn ctx(home: &HomeCharacteristics, h: u32, indoor: f64, outdoor: f64) -> ControlContext<'_> {
        ControlContext {
            home,
            timestamp: ts(h),
            indoor_temp_c: indoor,
            outdoor_temp_c: outdoor,
        }
    }

    /// Hours 0-5 cheap, 6-11 average, 12-17 expensive.
    fn series() -> IntensitySeries {
        IntensitySeries {
            hours: (0..18)
                .map(|h| HourlyIntensity {
                    timestamp: ts(h),
                    total_usage_mwh: 1.0,
                    total_emissions_lbs: 0.0,
                    lbs_co2_per_kwh: match h {
                        0..=5 => 0.2,
                        6..=11 => 0.5,
                        _ => 1.0,
                    },
                })
                .collect(),
            declared_offsets: Default::default(),
        }
    }

    #[rstest]
    #[case(19.9, HvacMode::Heating)]
    #[case(20.0, HvacMode::Off)]
    #[case(22.0, HvacMode::Off)]
    #[case(22.1, HvacMode::Cooling)]
    fn test_basic_control(#[case] indoor: f64, #[case] expected: HvacMode) {
        let home = home();
        assert_eq!(BasicControl.decide(&ctx(&home, 0, indoor, 0.0)), expected);
    }

    #[test]
    fn test_equal_setpoints_only_off_at_setpoint() {
        let home = home().with_setpoints(21.0, 21.0);
        assert_eq!(BasicControl.decide(&ctx(&home, 0, 21.0, 0.0)), HvacMode::Off);
        assert_eq!(BasicControl.decide(&ctx(&home, 0, 20.99, 0.0)), HvacMode::Heating);
        assert_eq!(BasicControl.decide(&ctx(&home, 0, 21.01, 0.0)), HvacMode::Cooling);
    }

    #[test]
    fn test_tiers_from_terciles() {
        let control = CarbonAwareControl::new(&series(), 2.0, 6);
        assert_eq!(control.tier_at(ts(3)), Some(PriceTier::Cheap));
        assert_eq!(control.tier_at(ts(8)), Some(PriceTier::Average));
        assert_eq!(control.tier_at(ts(14)), Some(PriceTier::Expensive));
        assert_eq!(control.tier_at(ts(20)), None);
    }

    #[test]
    fn test_expensive_hours_widen_band() {
        let home = home();
        let control = CarbonAwareControl::new(&series(), 2.0, 6);
        assert_eq!(control.decide(&ctx(&home, 14, 18.5, -5.0)), HvacMode::Off);
        assert_eq!(control.decide(&ctx(&home, 14, 17.9, -5.0)), HvacMode::Heating);
        assert_eq!(BasicControl.decide(&ctx(&home, 14, 18.5, -5.0)), HvacMode::Heating);
    }

    #[test]
    fn test_cheap_hours_preheat_before_expensive() {
        let home = home();
        let control = CarbonAwareControl::new(&series(), 2.0, 6);
        // The first expensive hour is 7 hours after hour 5.
        assert_eq!(control.decide(&ctx(&home, 5, 21.0, -5.0)), HvacMode::Off);

        let control = CarbonAwareControl::new(&series(), 2.0, 8);
        assert_eq!(control.decide(&ctx(&home, 5, 21.0, -5.0)), HvacMode::Heating);
        assert_eq!(control.decide(&ctx(&home, 5, 22.0, -5.0)), HvacMode::Off);
    }

    #[test]
    fn test_cheap_hours_precool_in_heat() {
        let home = home();
        let control = CarbonAwareControl::new(&series(), 2.0, 8);
        assert_eq!(control.decide(&ctx(&home, 5, 21.0, 32.0)), HvacMode::Cooling);
        assert_eq!(control.decide(&ctx(&home, 5, 20.0, 32.0)), HvacMode::Off);
    }

    #[test]
    fn test_uniform_intensity_behaves_like_basic() {
        let mut flat = series();
        for h in &mut flat.hours {
            h.lbs_co2_per_kwh = 0.5;
        }
        let control = CarbonAwareControl::new(&flat, 2.0, 6);
        assert_eq!(control.tier_at(ts(14)), Some(PriceTier::Average));
        let home = home();
        assert_eq!(control.decide(&ctx(&home, 14, 19.0, -5.0)), HvacMode::Heating);
    }
}
