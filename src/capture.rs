//! Camera capture: device abstraction, session lifetime, and the booth
//! countdown.
//!
//! A [`CaptureSession`] owns the device stream for as long as the booth is
//! open and releases it when dropped, whichever way the booth is left.
//! Switching between the front and back camera stops the old stream before
//! the new one starts.
//!
//! The countdown is an explicit state machine, [`CountdownSequence`]:
//!
//! ```text
//! Idle → Countdown(n) → … → Countdown(1) → Capturing → Cooldown ─┐
//!          ▲                                                      │
//!          └────────────── more shots to take ────────────────────┤
//!                                                                 ▼
//!                                                  Finishing → Done
//! ```
//!
//! Every [`Step`] carries the delay until the next one: one second per count,
//! a 150 ms flash after the shutter, the rest of the 1.2 s pause between
//! shots, and 400 ms before the batch is handed over. [`run_booth`] drives
//! the machine on the tokio clock.

use crate::imaging::SourceImage;
use crate::imaging::layout::center_square;
use crate::types::{BorderPattern, CaptureMode};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub const TICK: Duration = Duration::from_secs(1);
pub const FLASH: Duration = Duration::from_millis(150);
/// Shutter to next countdown, flash included.
pub const COOLDOWN: Duration = Duration::from_millis(1200);
pub const FINISH: Duration = Duration::from_millis(400);
pub const TIMER_CHOICES: [u32; 3] = [3, 5, 10];

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Could not access camera. Please allow permissions.")]
    Permission,
    #[error("camera error: {0}")]
    Device(String),
    #[error("countdown must be one of 3, 5 or 10 seconds, got {0}")]
    InvalidTimer(u32),
}

impl CaptureError {
    /// Permission problems can be fixed by the user and retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CaptureError::Permission)
    }
}

/// Which camera to stream from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Front camera; snapshots are mirrored like the live view.
    #[default]
    User,
    Environment,
}

impl Facing {
    pub fn flipped(self) -> Self {
        match self {
            Facing::User => Facing::Environment,
            Facing::Environment => Facing::User,
        }
    }
}

/// A camera that can stream and hand out the current frame.
pub trait CaptureDevice: Send {
    fn start(&mut self, facing: Facing) -> Result<(), CaptureError>;
    fn stop(&mut self);
    fn grab_frame(&mut self) -> Result<RgbaImage, CaptureError>;
}

/// Centred square crop of `frame`, mirrored for the front camera.
pub fn snapshot_square(frame: &RgbaImage, facing: Facing) -> RgbaImage {
    let (x, y, side) = center_square(frame.width(), frame.height());
    let square = image::imageops::crop_imm(frame, x, y, side, side).to_image();
    match facing {
        Facing::User => image::imageops::flip_horizontal(&square),
        Facing::Environment => square,
    }
}

/// An open booth: the streaming device plus the user's booth settings.
///
/// The stream stops when the session is dropped.
pub struct CaptureSession<D: CaptureDevice> {
    device: D,
    facing: Facing,
    streaming: bool,
    muted: bool,
    timer: u32,
}

impl<D: CaptureDevice> CaptureSession<D> {
    /// Start streaming from `device`. On a permission error nothing is held
    /// and the caller may try again.
    #[instrument(skip(device))]
    pub fn open(mut device: D, facing: Facing) -> Result<Self, CaptureError> {
        device.start(facing)?;
        info!("camera stream started");
        Ok(Self {
            device,
            facing,
            streaming: true,
            muted: false,
            timer: TIMER_CHOICES[0],
        })
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn timer(&self) -> u32 {
        self.timer
    }

    pub fn set_timer(&mut self, seconds: u32) -> Result<(), CaptureError> {
        if !TIMER_CHOICES.contains(&seconds) {
            return Err(CaptureError::InvalidTimer(seconds));
        }
        self.timer = seconds;
        Ok(())
    }

    /// Swap cameras. The old stream is stopped first.
    pub fn switch_facing(&mut self) -> Result<(), CaptureError> {
        let next = self.facing.flipped();
        self.stop_stream();
        self.device.start(next)?;
        self.streaming = true;
        self.facing = next;
        debug!(?next, "switched camera");
        Ok(())
    }

    /// Restart the stream after an error.
    pub fn restart(&mut self) -> Result<(), CaptureError> {
        self.stop_stream();
        self.device.start(self.facing)?;
        self.streaming = true;
        Ok(())
    }

    /// Grab the current frame as a square photo.
    pub fn snapshot(&mut self) -> Result<SourceImage, CaptureError> {
        if !self.streaming {
            return Err(CaptureError::Device("camera is not streaming".into()));
        }
        let frame = self.device.grab_frame()?;
        if frame.width() == 0 || frame.height() == 0 {
            return Err(CaptureError::Device("camera returned an empty frame".into()));
        }
        Ok(SourceImage::from_rgba(snapshot_square(&frame, self.facing)))
    }

    fn stop_stream(&mut self) {
        if self.streaming {
            self.device.stop();
            self.streaming = false;
        }
    }
}

impl<D: CaptureDevice> Drop for CaptureSession<D> {
    fn drop(&mut self) {
        self.stop_stream();
    }
}

// =========================================================================
// Countdown state machine
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoothState {
    Idle,
    /// Seconds left on screen.
    Countdown(u32),
    /// Shutter fired, flash showing.
    Capturing,
    Cooldown,
    Finishing,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    Beep,
    Shutter,
}

/// One tick of the booth: the state just entered, what to do on entry, and
/// how long to wait before the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub state: BoothState,
    pub delay: Duration,
    pub cue: Option<SoundCue>,
    /// Take a snapshot on entering this step.
    pub capture: bool,
}

#[derive(Debug, Clone)]
pub struct CountdownSequence {
    timer: u32,
    shots: usize,
    taken: usize,
    muted: bool,
    state: BoothState,
}

impl CountdownSequence {
    pub fn new(timer: u32, mode: CaptureMode, muted: bool) -> Result<Self, CaptureError> {
        if !TIMER_CHOICES.contains(&timer) {
            return Err(CaptureError::InvalidTimer(timer));
        }
        Ok(Self {
            timer,
            shots: mode.shots(),
            taken: 0,
            muted,
            state: BoothState::Idle,
        })
    }

    pub fn state(&self) -> BoothState {
        self.state
    }

    pub fn taken(&self) -> usize {
        self.taken
    }

    fn step(&self, state: BoothState, delay: Duration, cue: Option<SoundCue>) -> Step {
        Step {
            state,
            delay,
            cue: if self.muted { None } else { cue },
            capture: state == BoothState::Capturing,
        }
    }

    /// Move to the next state. Returns `None` once the sequence is done.
    pub fn advance(&mut self) -> Option<Step> {
        let step = match self.state {
            BoothState::Idle => {
                self.step(BoothState::Countdown(self.timer), TICK, Some(SoundCue::Beep))
            }
            BoothState::Countdown(n) if n > 1 => {
                self.step(BoothState::Countdown(n - 1), TICK, Some(SoundCue::Beep))
            }
            BoothState::Countdown(_) => {
                self.taken += 1;
                self.step(BoothState::Capturing, FLASH, Some(SoundCue::Shutter))
            }
            BoothState::Capturing => self.step(BoothState::Cooldown, COOLDOWN - FLASH, None),
            BoothState::Cooldown if self.taken < self.shots => {
                self.step(BoothState::Countdown(self.timer), TICK, Some(SoundCue::Beep))
            }
            BoothState::Cooldown => self.step(BoothState::Finishing, FINISH, None),
            BoothState::Finishing => self.step(BoothState::Done, Duration::ZERO, None),
            BoothState::Done => return None,
        };
        self.state = step.state;
        Some(step)
    }
}

/// Photos from one booth run and the border the user picked.
#[derive(Debug, Clone)]
pub struct BoothResult {
    pub shots: Vec<SourceImage>,
    pub pattern: BorderPattern,
}

/// Border patterns are only offered for multi-shot strips.
pub fn effective_pattern(mode: CaptureMode, pattern: BorderPattern) -> BorderPattern {
    match mode {
        CaptureMode::Single => BorderPattern::None,
        CaptureMode::Triple | CaptureMode::Quad => pattern,
    }
}

/// Run a full booth sequence on `session`, calling `on_step` as each step
/// is entered (for countdown display and sounds).
#[instrument(skip(session, on_step))]
pub async fn run_booth<D, F>(
    session: &mut CaptureSession<D>,
    mode: CaptureMode,
    pattern: BorderPattern,
    mut on_step: F,
) -> Result<BoothResult, CaptureError>
where
    D: CaptureDevice,
    F: FnMut(&Step),
{
    let mut sequence = CountdownSequence::new(session.timer(), mode, session.muted())?;
    let mut shots = Vec::with_capacity(mode.shots());

    while let Some(step) = sequence.advance() {
        on_step(&step);
        if step.capture {
            match session.snapshot() {
                Ok(shot) => shots.push(shot),
                Err(e) => {
                    warn!(error = %e, taken = shots.len(), "snapshot failed, abandoning booth run");
                    return Err(e);
                }
            }
        }
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
    }

    info!(shots = shots.len(), "booth run complete");
    Ok(BoothResult {
        shots,
        pattern: effective_pattern(mode, pattern),
    })
}

// =========================================================================
// Still-frame device
// =========================================================================

/// A "camera" that serves frames from images, in order, looping.
///
/// Used by the CLI to run the booth from files, and by tests.
#[derive(Debug, Clone)]
pub struct StillFrameDevice {
    frames: Vec<RgbaImage>,
    next: usize,
    streaming: Option<Facing>,
}

impl StillFrameDevice {
    pub fn new(frames: Vec<RgbaImage>) -> Self {
        Self {
            frames,
            next: 0,
            streaming: None,
        }
    }

    pub fn from_paths<P: AsRef<Path> + Sync>(paths: &[P]) -> Result<Self, CaptureError> {
        let sources =
            crate::imaging::open_all(paths).map_err(|e| CaptureError::Device(e.to_string()))?;
        Ok(Self::new(
            sources.into_iter().map(|s| s.image().clone()).collect(),
        ))
    }

    pub fn streaming(&self) -> Option<Facing> {
        self.streaming
    }
}

impl CaptureDevice for StillFrameDevice {
    fn start(&mut self, facing: Facing) -> Result<(), CaptureError> {
        if self.frames.is_empty() {
            return Err(CaptureError::Device("no frames to serve".into()));
        }
        self.streaming = Some(facing);
        Ok(())
    }

    fn stop(&mut self) {
        self.streaming = None;
    }

    fn grab_frame(&mut self) -> Result<RgbaImage, CaptureError> {
        if self.streaming.is_none() {
            return Err(CaptureError::Device("stream not started".into()));
        }
        let frame = self.frames[self.next % self.frames.len()].clone();
        self.next += 1;
        Ok(frame)
    }
}
