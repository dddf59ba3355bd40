use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, KEY_COUNT, MEMORY_SIZE, PROGRAM_START, REGISTER_COUNT,
    SPRITE_SHEET, STACK_SIZE,
};

/// A snapshot of the Chip8 internal state
///
/// ## CPU
/// Registers
/// - (v) 16 primary 8-bit registers (V0..VF)
///     - the first 15 (V0..VE) are general purpose registers
///     - the 16th (VF) doubles as the carry, borrow and collision flag
/// - (i) a 16-bit memory address register, only 12 bits of which are addressable
///
/// Counter
/// - (pc) a 16-bit program counter
///
/// Pointer
/// - (sp) an index into the stack, always the next free slot
///
/// Timers
/// - an 8-bit delay timer
/// - a sound timer that is `None` while inactive
///     - it fires the sound trigger once when a tick finds it at 0
///
/// ## Memory
/// - 16 slot stack of return addresses
/// - 4096 bytes of addressable memory
///     - 0x000..0x050 holds the sprite sheet
///     - 0x200.. holds the ROM
/// - 64x32 frame buffer of 0/1 pixels
///
/// ## Input
/// - pressed status of keys 0..F
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State {
    pub v: [u8; REGISTER_COUNT],
    pub i: u16,
    pub pc: u16,
    pub sp: u8,
    pub stack: [u16; STACK_SIZE],
    pub memory: [u8; MEMORY_SIZE],
    pub frame_buffer: FrameBuffer,
    pub keypad: [bool; KEY_COUNT],
    pub delay_timer: u8,
    pub sound_timer: Option<u8>,
    pub draw_flag: bool,
}

impl State {
    pub fn new() -> Self {
        let mut memory = [0; MEMORY_SIZE];
        memory[..SPRITE_SHEET.len()].copy_from_slice(&SPRITE_SHEET);

        State {
            v: [0; REGISTER_COUNT],
            i: 0,
            pc: PROGRAM_START,
            sp: 0,
            stack: [0; STACK_SIZE],
            memory,
            frame_buffer: [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
            keypad: [false; KEY_COUNT],
            delay_timer: 0,
            sound_timer: None,
            draw_flag: false,
        }
    }

    /// A freshly zeroed state with `rom` copied in at the program start address.
    /// Bytes that don't fit in memory are dropped.
    pub fn with_rom(rom: &[u8]) -> Self {
        let mut state = State::new();
        let start = PROGRAM_START as usize;
        let fits = rom.len().min(MEMORY_SIZE - start);
        if fits < rom.len() {
            log::warn!(
                "ROM is {} bytes but only {} fit in memory; truncating",
                rom.len(),
                fits
            );
        }
        state.memory[start..start + fits].copy_from_slice(&rom[..fits]);
        state
    }

    /// Reads a byte; addresses wrap at the end of memory.
    pub fn read(&self, addr: u16) -> u8 {
        self.memory[addr as usize % MEMORY_SIZE]
    }

    /// Writes a byte; addresses wrap at the end of memory.
    pub fn write(&mut self, addr: u16, value: u8) {
        self.memory[addr as usize % MEMORY_SIZE] = value;
    }

    /// Gets the opcode currently pointed at by the pc.
    /// Memory is stored as bytes, but opcodes are 16 bits so we combine two subsequent bytes.
    pub fn fetch(&self) -> u16 {
        u16::from_be_bytes([self.read(self.pc), self.read(self.pc.wrapping_add(1))])
    }

    /// The index of the lowest numbered key currently held down
    pub fn first_pressed_key(&self) -> Option<u8> {
        self.keypad.iter().position(|&pressed| pressed).map(|k| k as u8)
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

/// The FrameBuffer is indexed as [y][x]
pub type FrameBuffer = [[u8; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
