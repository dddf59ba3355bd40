use thiserror::Error;

/// Everything that can go wrong while running a ROM or setting up the coordinator
#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown opcode {word:#06X} at {pc:#05X}")]
    UnknownOpcode { word: u16, pc: u16 },

    #[error("stack overflow: call at {pc:#05X} with a full stack")]
    StackOverflow { pc: u16 },

    #[error("stack underflow: return at {pc:#05X} with an empty stack")]
    StackUnderflow { pc: u16 },

    #[error("{name} rate must be above 0 Hz, got {hz}")]
    InvalidRate { name: &'static str, hz: u32 },

    #[error("failed to spawn the {name} thread")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
