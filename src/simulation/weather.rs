//! Weather inputs for the thermal model.
//!
//! Real weather is passed in as explicit points. For demos and for requests
//! without weather, [`WeatherSeries::synthetic`] builds a series from a
//! clear-sky model and a seasonal + diurnal temperature profile.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::SimulationError;

const SOLAR_CONSTANT_W_M2: f64 = 1367.0;
/// Diffuse share of global horizontal irradiance reaching a vertical window
const VERTICAL_DIFFUSE_FACTOR: f64 = 0.05;

/// Outdoor conditions at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherPoint {
    pub timestamp: DateTime<FixedOffset>,
    pub temp_air_c: f64,
    /// Irradiance on the plane of a south-facing vertical window (W/m²)
    pub window_irradiance_w_m2: f64,
}

/// Time-ordered weather points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeatherSeries {
    points: Vec<WeatherPoint>,
}

impl WeatherSeries {
    /// Sorts by timestamp.
    pub fn new(mut points: Vec<WeatherPoint>) -> Self {
        points.sort_by_key(|p| p.timestamp);
        Self { points }
    }

    pub fn points(&self) -> &[WeatherPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Generate a synthetic series.
    pub fn synthetic(cfg: &SyntheticWeather) -> Result<Self, SimulationError> {
        if cfg.step_minutes == 0 {
            return Err(SimulationError::InvalidWeather("step must be positive".to_string()));
        }
        let offset = FixedOffset::east_opt(cfg.utc_offset_hours * 3600).ok_or_else(|| {
            SimulationError::InvalidWeather(format!("bad UTC offset {}h", cfg.utc_offset_hours))
        })?;
        let model = ClearSkyModel::new(cfg.latitude, cfg.longitude, cfg.utc_offset_hours);
        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let step = Duration::minutes(i64::from(cfg.step_minutes));
        let count = i64::from(cfg.days) * 24 * 60 / i64::from(cfg.step_minutes);
        let mut local = cfg.start.and_hms_opt(0, 0, 0).ok_or_else(|| {
            SimulationError::InvalidWeather("start date has no midnight".to_string())
        })?;

        let mut cloud = CloudCover::Clear;
        let mut cloud_minutes_left = 0i64;
        let mut points = Vec::with_capacity(count.max(0) as usize);

        for _ in 0..count {
            if cfg.clouds {
                if cloud_minutes_left <= 0 {
                    cloud = CloudCover::random(&mut rng);
                    cloud_minutes_left = rng.gen_range(60..=360);
                }
                cloud_minutes_left -= i64::from(cfg.step_minutes);
            }

            let noise = if cfg.temp_noise_c > 0.0 {
                rng.gen_range(-cfg.temp_noise_c..=cfg.temp_noise_c)
            } else {
                0.0
            };
            let timestamp = local.and_local_timezone(offset).single().ok_or_else(|| {
                SimulationError::InvalidWeather(format!("ambiguous local time {local}"))
            })?;

            points.push(WeatherPoint {
                timestamp,
                temp_air_c: cfg.temperature_at(local) + noise,
                window_irradiance_w_m2: model.south_window_irradiance(local)
                    * cloud.transmission_factor(),
            });
            local += step;
        }

        Ok(Self { points })
    }
}

/// Parameters for [`WeatherSeries::synthetic`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticWeather {
    pub latitude: f64,
    pub longitude: f64,
    /// Fixed offset of the generated timestamps
    pub utc_offset_hours: i32,
    pub start: NaiveDate,
    pub days: u32,
    pub step_minutes: u32,
    pub mean_temp_c: f64,
    /// Half the summer-winter swing
    pub seasonal_amplitude_c: f64,
    /// Half the day-night swing
    pub diurnal_amplitude_c: f64,
    pub coldest_day_of_year: u32,
    pub temp_noise_c: f64,
    pub clouds: bool,
    pub seed: Option<u64>,
}

impl SyntheticWeather {
    /// A year of 10-minute weather for a cold-winter inland location.
    pub fn year(latitude: f64, longitude: f64, year: i32) -> Self {
        Self {
            latitude,
            longitude,
            utc_offset_hours: -5,
            start: NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or_default(),
            days: 365,
            step_minutes: 10,
            mean_temp_c: 7.0,
            seasonal_amplitude_c: 14.0,
            diurnal_amplitude_c: 5.0,
            coldest_day_of_year: 20,
            temp_noise_c: 1.5,
            clouds: true,
            seed: Some(42),
        }
    }

    pub fn with_window(mut self, start: NaiveDate, days: u32) -> Self {
        self.start = start;
        self.days = days;
        self
    }

    pub fn with_utc_offset(mut self, hours: i32) -> Self {
        self.utc_offset_hours = hours;
        self
    }

    /// Deterministic: no noise, no clouds.
    pub fn clear_and_smooth(mut self) -> Self {
        self.temp_noise_c = 0.0;
        self.clouds = false;
        self
    }

    /// Warmest at 15:00, coldest on `coldest_day_of_year`.
    fn temperature_at(&self, local: NaiveDateTime) -> f64 {
        let day = local.ordinal() as f64;
        let hour = local.hour() as f64 + local.minute() as f64 / 60.0;
        let seasonal = (2.0 * PI * (day - self.coldest_day_of_year as f64) / 365.0).cos();
        let diurnal = (2.0 * PI * (hour - 15.0) / 24.0).cos();
        self.mean_temp_c - self.seasonal_amplitude_c * seasonal + self.diurnal_amplitude_c * diurnal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloudCover {
    Clear,
    PartlyCloudy,
    MostlyCloudy,
    Overcast,
}

impl CloudCover {
    fn transmission_factor(&self) -> f64 {
        match self {
            CloudCover::Clear => 1.0,
            CloudCover::PartlyCloudy => 0.7,
            CloudCover::MostlyCloudy => 0.4,
            CloudCover::Overcast => 0.15,
        }
    }

    fn random<R: Rng>(rng: &mut R) -> Self {
        match rng.gen_range(0..100) {
            0..=40 => CloudCover::Clear,
            41..=70 => CloudCover::PartlyCloudy,
            71..=85 => CloudCover::MostlyCloudy,
            _ => CloudCover::Overcast,
        }
    }
}

/// Clear-sky sun position and irradiance for a site.
pub struct ClearSkyModel {
    latitude_deg: f64,
    longitude_deg: f64,
    utc_offset_hours: i32,
}

impl ClearSkyModel {
    pub fn new(latitude_deg: f64, longitude_deg: f64, utc_offset_hours: i32) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            utc_offset_hours,
        }
    }

    /// `(elevation_deg, azimuth_deg)` for a local-clock time; azimuth from north.
    pub fn solar_position(&self, local: NaiveDateTime) -> (f64, f64) {
        let day_of_year = local.ordinal() as f64;
        let hour = local.hour() as f64 + local.minute() as f64 / 60.0;

        let declination = (23.45 * (360.0 / 365.0 * (day_of_year + 284.0)).to_radians().sin()).to_radians();
        let latitude = self.latitude_deg.to_radians();

        let solar_time = hour + self.longitude_deg / 15.0 - self.utc_offset_hours as f64;
        let hour_angle_deg = 15.0 * (solar_time - 12.0);
        let hour_angle = hour_angle_deg.to_radians();

        let elevation = (latitude.sin() * declination.sin()
            + latitude.cos() * declination.cos() * hour_angle.cos())
        .asin();

        let azimuth_cos = ((declination.sin() - latitude.sin() * elevation.sin())
            / (latitude.cos() * elevation.cos()))
        .clamp(-1.0, 1.0);
        let mut azimuth_deg = azimuth_cos.acos().to_degrees();
        // Afternoon sun is in the western sky.
        if hour_angle_deg > 0.0 {
            azimuth_deg = 360.0 - azimuth_deg;
        }

        (elevation.to_degrees(), azimuth_deg)
    }

    /// Beam irradiance normal to the sun, 0 below the horizon.
    fn direct_normal_irradiance(&self, elevation_deg: f64) -> f64 {
        if elevation_deg <= 0.0 {
            return 0.0;
        }
        let air_mass = if elevation_deg > 5.0 {
            1.0 / elevation_deg.to_radians().sin()
        } else {
            12.0 - elevation_deg / 5.0
        };
        SOLAR_CONSTANT_W_M2 * 0.7_f64.powf(air_mass.powf(0.678))
    }

    /// Global horizontal irradiance in W/m².
    pub fn clear_sky_irradiance(&self, local: NaiveDateTime) -> f64 {
        let (elevation_deg, _) = self.solar_position(local);
        self.direct_normal_irradiance(elevation_deg) * elevation_deg.to_radians().sin().max(0.0)
    }

    /// Beam plus diffuse irradiance on a vertical south-facing window.
    pub fn south_window_irradiance(&self, local: NaiveDateTime) -> f64 {
        let (elevation_deg, azimuth_deg) = self.solar_position(local);
        if elevation_deg <= 0.0 {
            return 0.0;
        }
        let dni = self.direct_normal_irradiance(elevation_deg);
        let incidence_cos =
            elevation_deg.to_radians().cos() * (azimuth_deg - 180.0).to_radians().cos();
        let ghi = self.clear_sky_irradiance(local);
        dni * incidence_cos.max(0.0) + ghi * VERTICAL_DIFFUSE_FACTOR
    }
}
