// Stepper motor side of the controller
//
// Provides:
// - The driver trait the controller commands ("advance N steps at R RPM")
// - A timing-accurate simulated stepper for running without hardware

mod driver;
pub mod simulated;

pub use driver::{step_duration, StepperDriver, StepperError};
pub use simulated::SimulatedStepper;
