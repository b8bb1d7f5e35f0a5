// Driver interface for a stepper that is commanded in whole moves
//
// The coil waveform lives behind this trait. A driver blocks in `step`
// until the requested pulses have physically been issued.

use std::time::Duration;

use crate::config::STEPS_PER_REVOLUTION;

#[derive(Debug, thiserror::Error)]
pub enum StepperError {
    #[error("Cannot step with speed set to 0 RPM")]
    ZeroSpeed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StepperError>;

pub trait StepperDriver {
    /// Set the speed used by subsequent moves
    fn set_speed(&mut self, rpm: u32) -> Result<()>;

    /// Issue `|steps|` pulses, negative steps turning left
    fn step(&mut self, steps: i32) -> Result<()>;
}

/// Wall-clock time a move of `steps` takes at `rpm`
///
/// # Arguments
/// * `steps` - Signed step count, only the magnitude matters
/// * `rpm` - Revolutions per minute, must be non-zero
pub fn step_duration(steps: i32, rpm: u32) -> Duration {
    if rpm == 0 {
        return Duration::ZERO;
    }
    let micros_per_step = 60_000_000u64 / (rpm as u64 * STEPS_PER_REVOLUTION as u64);
    Duration::from_micros(micros_per_step * steps.unsigned_abs() as u64)
}
