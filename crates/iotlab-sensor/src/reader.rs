//! ---
//! iotlab_section: "11-simulation"
//! iotlab_subsection: "module"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "Deterministic per-sensor value generation."
//! iotlab_version: "v0.1.0"
//! iotlab_owner: "tbd"
//! ---
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

/// Lower bound of a simulated reading (inclusive).
pub const MIN_VALUE: f64 = 10.0;
/// Upper bound of a simulated reading (inclusive).
pub const MAX_VALUE: f64 = 100.0;
const DECIMAL_SCALE: f64 = 100.0;

/// Value reported for a sensor together with the echoed identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SensorReading {
    #[schema(example = "temp01")]
    pub sensor_id: String,
    #[schema(example = 88.55, minimum = 10.0, maximum = 100.0)]
    pub value: f64,
}

/// Produces stable pseudo-random readings: every sensor id maps to one value in
/// `[MIN_VALUE, MAX_VALUE]`, rounded to two decimals, across calls and processes.
///
/// Each read seeds a fresh generator from the id alone, so readings never depend
/// on call order or on other sensors. The ChaCha8 stream is fixed across `rand`
/// releases, so published values hold across builds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorReader;

impl SensorReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read(&self, sensor_id: &str) -> SensorReading {
        SensorReading {
            sensor_id: sensor_id.to_owned(),
            value: self.value(sensor_id),
        }
    }

    pub fn value(&self, sensor_id: &str) -> f64 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed_for(sensor_id));
        let raw: f64 = rng.gen_range(MIN_VALUE..=MAX_VALUE);
        round_to_hundredths(raw)
    }
}

/// Stable 64-bit seed derived from the first eight bytes of SHA-256(sensor id).
pub fn seed_for(sensor_id: &str) -> u64 {
    let digest = Sha256::digest(sensor_id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

fn round_to_hundredths(value: f64) -> f64 {
    ((value * DECIMAL_SCALE).round() / DECIMAL_SCALE).clamp(MIN_VALUE, MAX_VALUE)
}
