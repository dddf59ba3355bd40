use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::chip8::Chip8;
use crate::config::Config;
use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH, TIMER_RATE};
use crate::error::{Error, Result};
use crate::schedule::Periodic;
use crate::state::{FrameBuffer, State};

/// Lifecycle of a `Coordinator`
///
/// ```text
/// Initial --start/restart--> Running <--pause/resume--> Paused
/// ```
/// `restart` from any state reloads the ROM and ends up `Running`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    Initial = 0,
    Running = 1,
    Paused = 2,
}

impl RunState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RunState::Running,
            2 => RunState::Paused,
            _ => RunState::Initial,
        }
    }
}

/// An immutable copy of the frame buffer, published whenever it changed since the last sample
#[derive(Clone, PartialEq, Eq)]
pub struct Frame(Arc<FrameBuffer>);

impl Frame {
    fn capture(frame_buffer: &FrameBuffer) -> Self {
        Frame(Arc::new(*frame_buffer))
    }

    /// Whether the pixel at (`x`, `y`) is lit
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.0[y % DISPLAY_HEIGHT][x % DISPLAY_WIDTH] == 1
    }
}

impl Deref for Frame {
    type Target = FrameBuffer;

    fn deref(&self) -> &FrameBuffer {
        &self.0
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let lit = self.0.iter().flatten().filter(|&&p| p == 1).count();
        write!(f, "Frame({} pixels lit)", lit)
    }
}

/// Edge notification that the sound timer just expired
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SoundTrigger;

/// The receiving ends of everything a `Coordinator` publishes.
/// Each channel has exactly one writer and is meant to have exactly one reader. Frames are
/// written by the built-in sampler when `Config::presentation_rate` is set, otherwise by
/// `Coordinator::sample`.
pub struct Outputs {
    pub frames: Receiver<Frame>,
    pub sounds: Receiver<SoundTrigger>,
    pub states: Receiver<RunState>,
}

/// Requests serialized onto the worker thread
enum Command {
    Restart(Option<Vec<u8>>),
    Pause,
    Resume,
    SetKey { key: u8, pressed: bool },
    Inspect(Sender<State>),
    Shutdown,
}

/// What the worker shares with the presentation sampler
struct Shared {
    run_state: AtomicU8,
    pending: Mutex<Option<Frame>>,
}

impl Shared {
    fn new() -> Self {
        Shared {
            run_state: AtomicU8::new(RunState::Initial as u8),
            pending: Mutex::new(None),
        }
    }

    fn run_state(&self) -> RunState {
        RunState::from_u8(self.run_state.load(Ordering::Acquire))
    }

    /// Replaces any unsampled frame, so redraws between two samples coalesce into one
    fn publish(&self, frame: Option<Frame>) {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = frame;
    }

    /// Sends the pending frame, if there is one and emulation is running
    fn sample(&self, frames: &Sender<Frame>) -> bool {
        if self.run_state() != RunState::Running {
            return false;
        }
        let frame = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match frame {
            Some(frame) => frames.send(frame).is_ok(),
            None => false,
        }
    }
}

/// Owns the `Chip8` and is the only thing that ever touches it.
/// Runs the instruction clock and the timers off two `Periodic`s on one thread.
struct Worker {
    chip8: Chip8,
    rom: Option<Vec<u8>>,
    run_state: RunState,
    cycle: Periodic,
    timer: Periodic,
    shared: Arc<Shared>,
    sounds: Sender<SoundTrigger>,
    states: Sender<RunState>,
}

impl Worker {
    fn new(
        config: &Config,
        shared: Arc<Shared>,
        sounds: Sender<SoundTrigger>,
        states: Sender<RunState>,
    ) -> Self {
        let chip8 = match config.seed {
            Some(seed) => Chip8::with_seed(seed),
            None => Chip8::new(),
        };
        Worker {
            chip8,
            rom: None,
            run_state: RunState::Initial,
            cycle: Periodic::new(config.cycle_rate),
            timer: Periodic::new(TIMER_RATE),
            shared,
            sounds,
            states,
        }
    }

    fn run(mut self, commands: Receiver<Command>) {
        loop {
            self.run_due(Instant::now());

            let command = match self.next_deadline() {
                Some(deadline) => {
                    match commands.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                    {
                        Ok(command) => command,
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match commands.recv() {
                    Ok(command) => command,
                    Err(_) => break,
                },
            };

            if !self.handle(command, Instant::now()) {
                break;
            }
        }
        self.suspend();
        log::info!("emulation worker stopped");
    }

    fn next_deadline(&self) -> Option<Instant> {
        match (self.cycle.deadline(), self.timer.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Applies one command. Returns false when the worker should stop.
    fn handle(&mut self, command: Command, now: Instant) -> bool {
        match command {
            Command::Restart(rom) => self.restart(rom, now),
            Command::Pause => {
                if self.run_state == RunState::Running {
                    self.suspend();
                    self.transition(RunState::Paused);
                }
            }
            Command::Resume => {
                if self.run_state == RunState::Paused {
                    self.resume(now);
                    self.transition(RunState::Running);
                }
            }
            Command::SetKey { key, pressed } => self.chip8.set_key(key, pressed),
            Command::Inspect(reply) => {
                reply.send(self.chip8.state().clone()).ok();
            }
            Command::Shutdown => return false,
        }
        true
    }

    fn restart(&mut self, rom: Option<Vec<u8>>, now: Instant) {
        if rom.is_some() {
            self.rom = rom;
        }
        if self.rom.is_none() {
            log::warn!("restart requested before any ROM was loaded");
            return;
        }

        self.suspend();
        let rom = self.rom.as_deref().unwrap_or_default();
        self.chip8.reset(rom);
        self.shared.publish(None);
        log::info!("loaded {} byte ROM", rom.len());
        self.resume(now);
        self.transition(RunState::Running);
    }

    fn suspend(&mut self) {
        self.cycle.suspend();
        self.timer.suspend();
    }

    fn resume(&mut self, now: Instant) {
        self.cycle.resume(now);
        self.timer.resume(now);
    }

    fn transition(&mut self, to: RunState) {
        if self.run_state == to {
            return;
        }
        log::info!("{:?} -> {:?}", self.run_state, to);
        self.run_state = to;
        self.shared.run_state.store(to as u8, Ordering::Release);
        self.states.send(to).ok();
    }

    /// Fires every cycle and timer tick that is due by `now`, earliest first
    fn run_due(&mut self, now: Instant) {
        while self.run_state == RunState::Running {
            let cycle = self.cycle.deadline().filter(|&d| d <= now);
            let timer = self.timer.deadline().filter(|&d| d <= now);
            match (cycle, timer) {
                (Some(c), Some(t)) if t < c => self.tick(now),
                (Some(_), _) => self.cycle(now),
                (None, Some(_)) => self.tick(now),
                (None, None) => break,
            }
        }
    }

    fn cycle(&mut self, now: Instant) {
        self.cycle.poll(now);
        match self.chip8.step() {
            Ok(_) => {
                if self.chip8.needs_redraw() {
                    self.shared
                        .publish(Some(Frame::capture(self.chip8.frame_buffer())));
                }
            }
            Err(e) => {
                log::error!("halting emulation: {}", e);
                self.suspend();
                self.transition(RunState::Paused);
            }
        }
    }

    fn tick(&mut self, now: Instant) {
        self.timer.poll(now);
        if self.chip8.tick_timers() {
            log::debug!("sound trigger");
            self.sounds.send(SoundTrigger).ok();
        }
    }
}

/// A periodic presentation sampler running on its own thread
struct Sampler {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// # Coordinator
/// Drives a Chip-8 at its instruction rate and its timers at 60Hz.
///
/// All emulator state lives on a dedicated worker thread. Every method here only enqueues a
/// request for that thread and returns immediately, so callers never wait on emulation and
/// requests are applied in the order they were made. Results come back on the channels in
/// `Outputs`:
/// - a `Frame` for every `sample` that found the screen changed since the previous sample
/// - a `SoundTrigger` whenever the sound timer expires
/// - the new `RunState` on every lifecycle transition
///
/// Dropping the coordinator stops the worker and the sampler and waits for both.
pub struct Coordinator {
    commands: Sender<Command>,
    shared: Arc<Shared>,
    frames: Sender<Frame>,
    worker: Option<JoinHandle<()>>,
    sampler: Option<Sampler>,
}

impl Coordinator {
    pub fn new(config: Config) -> Result<(Self, Outputs)> {
        config.validate()?;

        let (commands, command_rx) = mpsc::channel();
        let (frames, frame_rx) = mpsc::channel();
        let (sounds, sound_rx) = mpsc::channel();
        let (states, state_rx) = mpsc::channel();
        let shared = Arc::new(Shared::new());

        let worker = Worker::new(&config, Arc::clone(&shared), sounds, states);
        let worker = thread::Builder::new()
            .name("chip8-worker".into())
            .spawn(move || worker.run(command_rx))
            .map_err(|source| Error::Spawn {
                name: "worker",
                source,
            })?;

        let mut coordinator = Coordinator {
            commands,
            shared,
            frames,
            worker: Some(worker),
            sampler: None,
        };
        if let Some(hz) = config.presentation_rate {
            coordinator.sampler = Some(coordinator.spawn_sampler(hz)?);
        }

        let outputs = Outputs {
            frames: frame_rx,
            sounds: sound_rx,
            states: state_rx,
        };
        Ok((coordinator, outputs))
    }

    fn spawn_sampler(&self, hz: u32) -> Result<Sampler> {
        let stop = Arc::new(AtomicBool::new(false));
        let period = Duration::from_secs(1) / hz;
        let shared = Arc::clone(&self.shared);
        let frames = self.frames.clone();
        let stop_flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("chip8-sampler".into())
            .spawn(move || {
                while !stop_flag.load(Ordering::Relaxed) {
                    thread::sleep(period);
                    shared.sample(&frames);
                }
            })
            .map_err(|source| Error::Spawn {
                name: "sampler",
                source,
            })?;
        Ok(Sampler { stop, handle })
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            log::warn!("emulation worker is gone; dropping command");
        }
    }

    /// Loads `rom` and starts running it. Equivalent to `restart_with`.
    pub fn start(&self, rom: Vec<u8>) {
        self.restart_with(rom);
    }

    /// Resets the machine with `rom` and runs it, whatever state it was in
    pub fn restart_with(&self, rom: Vec<u8>) {
        self.send(Command::Restart(Some(rom)));
    }

    /// Resets the machine with the last ROM and runs it. Does nothing if no ROM was ever loaded.
    pub fn restart(&self) {
        self.send(Command::Restart(None));
    }

    /// Suspends the clock and timers; ignored unless running
    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    /// Picks up where `pause` left off; ignored unless paused
    pub fn resume(&self) {
        self.send(Command::Resume);
    }

    pub fn set_key(&self, key: u8, pressed: bool) {
        self.send(Command::SetKey { key, pressed });
    }

    /// The most recently applied lifecycle state
    pub fn state(&self) -> RunState {
        self.shared.run_state()
    }

    /// Publishes the latest frame if the screen changed since the last sample.
    /// Call this from the display's refresh signal. Returns whether a frame was sent.
    ///
    /// Does nothing when the built-in sampler is running.
    pub fn sample(&self) -> bool {
        if self.sampler.is_some() {
            return false;
        }
        self.shared.sample(&self.frames)
    }

    /// A copy of the machine state as of every request made so far.
    /// Unlike everything else here this waits for the worker to answer.
    pub fn snapshot(&self) -> Option<State> {
        let (reply, answer) = mpsc::channel();
        self.send(Command::Inspect(reply));
        answer.recv().ok()
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        if let Some(sampler) = self.sampler.take() {
            sampler.stop.store(true, Ordering::Relaxed);
            if sampler.handle.join().is_err() {
                log::error!("presentation sampler panicked");
            }
        }
        self.commands.send(Command::Shutdown).ok();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("emulation worker panicked");
            }
        }
    }
}
