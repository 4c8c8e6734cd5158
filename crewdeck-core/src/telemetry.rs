use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded position sample. The pipeline never interprets these for
/// scoring or validation; they are stored in submission order and only
/// summarized for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_ft: f64,
    pub ground_speed_kt: f64,
    pub vertical_speed_fpm: f64,
}

/// Display stats derived from a sample track on read, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetrySummary {
    pub sample_count: usize,
    pub max_altitude_ft: f64,
    pub max_ground_speed_kt: f64,
}

impl TelemetrySummary {
    pub fn from_samples(samples: &[TelemetrySample]) -> Self {
        let mut max_altitude_ft = 0.0f64;
        let mut max_ground_speed_kt = 0.0f64;
        for sample in samples {
            max_altitude_ft = max_altitude_ft.max(sample.altitude_ft);
            max_ground_speed_kt = max_ground_speed_kt.max(sample.ground_speed_kt);
        }
        Self {
            sample_count: samples.len(),
            max_altitude_ft,
            max_ground_speed_kt,
        }
    }
}
