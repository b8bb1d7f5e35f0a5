// Simulated stepper: keeps the timing of a real 28BYJ-48 without the coils

use std::thread::sleep;
use tracing::debug;

use super::driver::{step_duration, Result, StepperDriver, StepperError};

pub struct SimulatedStepper {
    rpm: u32,
    steps_issued: i64,
    realtime: bool,
}

impl SimulatedStepper {
    /// Stepper that sleeps for the physical duration of every move
    pub fn new() -> Self {
        Self {
            rpm: 0,
            steps_issued: 0,
            realtime: true,
        }
    }

    /// Stepper that returns immediately (for tests and dry runs)
    pub fn instant() -> Self {
        Self {
            realtime: false,
            ..Self::new()
        }
    }

    /// Net signed steps issued since creation
    pub fn steps_issued(&self) -> i64 {
        self.steps_issued
    }
}

impl Default for SimulatedStepper {
    fn default() -> Self {
        Self::new()
    }
}

impl StepperDriver for SimulatedStepper {
    fn set_speed(&mut self, rpm: u32) -> Result<()> {
        self.rpm = rpm;
        Ok(())
    }

    fn step(&mut self, steps: i32) -> Result<()> {
        if self.rpm == 0 {
            return Err(StepperError::ZeroSpeed);
        }
        let duration = step_duration(steps, self.rpm);
        debug!("Stepping {} at {} RPM ({:?})", steps, self.rpm, duration);
        if self.realtime {
            sleep(duration);
        }
        self.steps_issued += steps as i64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_signed_steps() {
        let mut stepper = SimulatedStepper::instant();
        stepper.set_speed(12).unwrap();
        stepper.step(50).unwrap();
        stepper.step(-80).unwrap();
        assert_eq!(stepper.steps_issued(), -30);
    }

    #[test]
    fn test_zero_speed_rejected() {
        let mut stepper = SimulatedStepper::instant();
        assert!(matches!(stepper.step(10), Err(StepperError::ZeroSpeed)));
        assert_eq!(stepper.steps_issued(), 0);
    }
}
