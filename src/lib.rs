pub use chip8::Chip8;
pub use config::Config;
pub use constants::{CLOCK_SPEED, TIMER_RATE};
pub use coordinator::{Coordinator, Frame, Outputs, RunState, SoundTrigger};
pub use error::{Error, Result};
pub use instruction::{decode, disassemble, Disassembled, Disassembly, Instruction};
pub use state::{FrameBuffer, State};

mod chip8;
mod config;
pub mod constants;
mod coordinator;
mod error;
mod instruction;
mod operations;
mod schedule;
pub mod state;
