// Motion controller: command gating, adaptive stepping, limits, homing
//
// One poll = at most one command. Bytes that arrive during the cooldown,
// or while a command is being handled, are thrown away so a flood of
// tracking corrections can never queue up behind a slow motor.

use std::thread::sleep;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{ControllerConfig, HomingPolicy, Profile};
use crate::link::{LinkError, SerialLink};
use crate::messages::{Command, Direction, Snapshot, Status};
use crate::motor::{StepperDriver, StepperError};

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    #[error("Stepper error: {0}")]
    Stepper(#[from] StepperError),
}

pub type Result<T> = std::result::Result<T, ControllerError>;

/// What a single poll of the link did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing was waiting
    Idle,
    /// Arrived inside the cooldown; `dropped` counts the command byte and the backlog
    Rejected { dropped: usize },
    /// Command was handled, then `drained` stale bytes were discarded
    Handled { command: Command, drained: usize },
}

/// Step size for a motion command preceded by `consecutive` identical ones
pub fn step_size_for(config: &ControllerConfig, consecutive: u32) -> i32 {
    if config.profile == Profile::Minimal || consecutive == 0 {
        return config.base_step_size;
    }
    let ramp = (consecutive.min(i32::MAX as u32) as i32).saturating_mul(config.ramp_factor);
    config
        .base_step_size
        .saturating_add(ramp)
        .min(config.max_step_size)
}

#[derive(Debug, Clone)]
struct ControllerState {
    position: i32,
    last_command: u8,
    consecutive: u32,
    last_accepted: Instant,
}

impl ControllerState {
    fn new() -> Self {
        Self {
            position: 0,
            last_command: Command::NEUTRAL,
            consecutive: 0,
            last_accepted: Instant::now(),
        }
    }
}

pub struct Controller<D: StepperDriver, L: SerialLink> {
    config: ControllerConfig,
    driver: D,
    link: L,
    state: ControllerState,
}

impl<D: StepperDriver, L: SerialLink> Controller<D, L> {
    pub fn new(config: ControllerConfig, driver: D, link: L) -> Self {
        Self {
            config,
            driver,
            link,
            state: ControllerState::new(),
        }
    }

    /// Reset state, wiggle the motor to prove the driver responds, announce readiness
    pub fn startup(&mut self) -> Result<()> {
        self.driver.set_speed(self.config.speed_slow_rpm)?;
        self.state = ControllerState::new();

        self.emit(Status::Banner)?;
        self.emit(Status::TestingStepper)?;

        info!(
            "Self-test: {} steps out and back at {} RPM",
            self.config.self_test_steps, self.config.speed_slow_rpm
        );
        self.driver.step(self.config.self_test_steps)?;
        sleep(self.config.self_test_pause);
        self.driver.step(-self.config.self_test_steps)?;

        self.emit(Status::MotorTestComplete)?;
        self.emit(Status::Ready {
            commands: self.config.accepted_commands(),
        })?;
        info!("Controller ready ({:?} profile)", self.config.profile);
        Ok(())
    }

    pub fn poll(&mut self) -> Result<PollOutcome> {
        self.poll_at(Instant::now())
    }

    /// Handle at most one pending command byte, using `now` as the read time
    pub fn poll_at(&mut self, now: Instant) -> Result<PollOutcome> {
        if !self.link.available()? {
            return Ok(PollOutcome::Idle);
        }

        let byte = self.link.read_byte()?;

        let elapsed = now.saturating_duration_since(self.state.last_accepted);
        if elapsed < self.config.cooldown {
            let dropped = 1 + self.link.drain()?;
            debug!(
                "Cooldown: dropped {} byte(s) {:?} after last command",
                dropped, elapsed
            );
            return Ok(PollOutcome::Rejected { dropped });
        }

        let command = self.handle(byte)?;
        self.state.last_accepted = now;

        let drained = self.link.drain()?;
        if drained > 0 {
            debug!("Discarded {} byte(s) received while busy", drained);
        }
        Ok(PollOutcome::Handled { command, drained })
    }

    /// Run one command byte, bypassing the cooldown gate
    pub fn handle(&mut self, byte: u8) -> Result<Command> {
        let command = Command::from(byte);

        // Only a repeated L or R ramps; compare before overwriting last_command
        if command.is_motion() && byte == self.state.last_command {
            self.state.consecutive = self.state.consecutive.saturating_add(1);
        } else {
            self.state.consecutive = 0;
        }

        match command {
            Command::Move(direction) => self.move_axis(direction)?,
            Command::Stop => self.emit(Status::Stopped)?,
            Command::Home if self.config.profile == Profile::Full => self.home()?,
            Command::Info => self.emit(Status::Info {
                position: self.state.position,
                min: self.config.min_position,
                max: self.config.max_position,
            })?,
            Command::Home | Command::Invalid(_) => {
                warn!("Invalid command byte 0x{:02X}", byte);
                self.emit(Status::InvalidCommand)?;
            }
        }

        self.state.last_command = byte;
        Ok(command)
    }

    /// Step size the next motion command will use
    pub fn calculate_step_size(&self) -> i32 {
        step_size_for(&self.config, self.state.consecutive)
    }

    fn move_axis(&mut self, direction: Direction) -> Result<()> {
        let steps = self.calculate_step_size();
        let rpm = if steps > self.config.base_step_size * 2 {
            self.config.speed_fast_rpm
        } else {
            self.config.speed_slow_rpm
        };
        let delta = direction.sign() * steps;
        let target = self.state.position.saturating_add(delta);

        if self.config.profile == Profile::Full
            && !(self.config.min_position..=self.config.max_position).contains(&target)
        {
            warn!(
                "{:?} limit reached at position {}",
                direction, self.state.position
            );
            return self.emit(Status::LimitReached(direction));
        }

        self.emit(Status::Moving {
            direction,
            steps,
            rpm,
        })?;
        self.driver.set_speed(rpm)?;
        self.driver.step(delta)?;
        self.state.position = target;
        info!(
            "Moved {:?} {} steps at {} RPM, position {}",
            direction, steps, rpm, target
        );

        self.emit(Status::Moved {
            direction,
            steps,
            position: target,
        })
    }

    /// Return to center in chunks, stopping early if a new byte arrives
    pub fn home(&mut self) -> Result<()> {
        self.emit(Status::Homing)?;
        info!("Homing from position {}", self.state.position);

        let chunk_size = self.config.home_chunk_steps;
        let mut remaining = -self.state.position;

        if remaining != 0 {
            self.driver.set_speed(self.config.speed_slow_rpm)?;
            while remaining != 0 {
                let chunk = if remaining.abs() > chunk_size {
                    chunk_size * remaining.signum()
                } else {
                    remaining
                };

                self.driver.step(chunk)?;
                remaining -= chunk;
                self.state.position += chunk;

                if self.link.available()? {
                    break;
                }
            }
        }

        self.state.consecutive = 0;

        if remaining != 0 && self.config.homing == HomingPolicy::TrackInterrupted {
            warn!(
                "Homing interrupted {} steps short, position {}",
                remaining, self.state.position
            );
            return self.emit(Status::HomeInterrupted {
                position: self.state.position,
            });
        }

        if remaining != 0 {
            warn!("Homing interrupted {} steps short", remaining);
        }
        self.state.position = 0;
        self.emit(Status::HomeComplete)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            position: self.state.position,
            last_command: self.state.last_command as char,
            consecutive: self.state.consecutive,
            min_position: self.config.min_position,
            max_position: self.config.max_position,
        }
    }

    pub fn position(&self) -> i32 {
        self.state.position
    }

    pub fn consecutive(&self) -> u32 {
        self.state.consecutive
    }

    pub fn last_command(&self) -> u8 {
        self.state.last_command
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    fn emit(&mut self, status: Status) -> Result<()> {
        self.link.write_line(&status.to_string())?;
        Ok(())
    }
}
