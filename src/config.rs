// Motion tunables, timing, serial defaults
use std::time::Duration;

// Step sizing (in motor steps)
pub const BASE_STEP_SIZE: i32 = 20;
pub const RAMP_FACTOR: i32 = 8; // extra steps per consecutive repeat
pub const MAX_STEP_SIZE: i32 = 100;

// Speeds for the 28BYJ-48 (it stalls above ~18 RPM)
pub const SPEED_SLOW_RPM: u32 = 12;
pub const SPEED_FAST_RPM: u32 = 18;

// Minimum time between accepted commands
pub const COMMAND_COOLDOWN: Duration = Duration::from_millis(30);

// Open-loop travel limits, steps from center
pub const MIN_POSITION: i32 = -1024;
pub const MAX_POSITION: i32 = 1024;

// Homing moves in chunks so a new command can interrupt it
pub const HOME_CHUNK_STEPS: i32 = 50;

// Startup wiggle
pub const SELF_TEST_STEPS: i32 = 50;
pub const SELF_TEST_PAUSE: Duration = Duration::from_millis(500);

pub const STEPS_PER_REVOLUTION: u32 = 2048;

// Serial defaults
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
pub const DEFAULT_BAUDRATE: u32 = 9600;

// Sleep between empty polls so the host loop doesn't spin a core
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Which command interpreter to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Profile {
    /// Ramping, travel limits and homing
    #[default]
    Full,
    /// Fixed step size, no limits, no homing
    Minimal,
}

/// What happens to the tracked position when a home is interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HomingPolicy {
    /// Always report the axis as centered once homing stops
    #[default]
    ForceZero,
    /// Keep the position reached by the steps actually issued
    TrackInterrupted,
}

/// Tunables owned by a controller instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub profile: Profile,
    pub homing: HomingPolicy,
    pub base_step_size: i32,
    pub ramp_factor: i32,
    pub max_step_size: i32,
    pub speed_slow_rpm: u32,
    pub speed_fast_rpm: u32,
    pub cooldown: Duration,
    pub min_position: i32,
    pub max_position: i32,
    pub home_chunk_steps: i32,
    pub self_test_steps: i32,
    pub self_test_pause: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            profile: Profile::Full,
            homing: HomingPolicy::ForceZero,
            base_step_size: BASE_STEP_SIZE,
            ramp_factor: RAMP_FACTOR,
            max_step_size: MAX_STEP_SIZE,
            speed_slow_rpm: SPEED_SLOW_RPM,
            speed_fast_rpm: SPEED_FAST_RPM,
            cooldown: COMMAND_COOLDOWN,
            min_position: MIN_POSITION,
            max_position: MAX_POSITION,
            home_chunk_steps: HOME_CHUNK_STEPS,
            self_test_steps: SELF_TEST_STEPS,
            self_test_pause: SELF_TEST_PAUSE,
        }
    }
}

impl ControllerConfig {
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_homing(mut self, homing: HomingPolicy) -> Self {
        self.homing = homing;
        self
    }

    /// Command letters this configuration accepts, as listed in the ready line
    pub fn accepted_commands(&self) -> &'static str {
        match self.profile {
            Profile::Full => "L/R/S/H/I",
            Profile::Minimal => "L/R/S/I",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = ControllerConfig::default();
        assert_eq!(config.profile, Profile::Full);
        assert_eq!(config.homing, HomingPolicy::ForceZero);
        assert_eq!(config.base_step_size, 20);
        assert_eq!(config.max_step_size, 100);
        assert_eq!(config.cooldown, Duration::from_millis(30));
        assert_eq!((config.min_position, config.max_position), (-1024, 1024));
    }

    #[test]
    fn test_accepted_commands_per_profile() {
        let full = ControllerConfig::default();
        assert_eq!(full.accepted_commands(), "L/R/S/H/I");

        let minimal = ControllerConfig::default().with_profile(Profile::Minimal);
        assert_eq!(minimal.accepted_commands(), "L/R/S/I");
    }
}
