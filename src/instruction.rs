use std::fmt;

use crate::constants::PROGRAM_START;

/// # Instructions
///
/// Every 16-bit word decodes to exactly one `Instruction`. The most significant nibble picks a
/// broad category; categories `0x0`, `0x8`, `0xE` and `0xF` are further split by their low nibble
/// or low byte. Words that don't name an operation decode to `Unknown` rather than failing.
///
/// Operand naming follows the usual Chip-8 notation:
/// - `addr` a 12-bit address `[_nnn]`
/// - `kk` an 8-bit immediate `[__kk]`
/// - `x`, `y` register indices `[_x__]`, `[__y_]`
/// - `n` a 4-bit count `[___n]`, only used as a sprite height
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// `00E0` clear the display
    ClearScreen,
    /// `00EE` return from a subroutine
    Return,
    /// `1nnn` PC = addr
    Jump { addr: u16 },
    /// `2nnn` push the return address; PC = addr
    Call { addr: u16 },
    /// `3xkk` skip if Vx == kk
    SkipIfEqual { x: u8, kk: u8 },
    /// `4xkk` skip if Vx != kk
    SkipIfNotEqual { x: u8, kk: u8 },
    /// `5xy0` skip if Vx == Vy
    SkipIfRegistersEqual { x: u8, y: u8 },
    /// `6xkk` Vx = kk
    Load { x: u8, kk: u8 },
    /// `7xkk` Vx += kk, no carry
    Add { x: u8, kk: u8 },
    /// `8xy0` Vx = Vy
    Move { x: u8, y: u8 },
    /// `8xy1` Vx |= Vy
    Or { x: u8, y: u8 },
    /// `8xy2` Vx &= Vy
    And { x: u8, y: u8 },
    /// `8xy3` Vx ^= Vy
    Xor { x: u8, y: u8 },
    /// `8xy4` Vx += Vy; VF = carry
    AddRegisters { x: u8, y: u8 },
    /// `8xy5` Vx -= Vy; VF = !borrow
    Sub { x: u8, y: u8 },
    /// `8xy6` Vx >>= 1; VF = shifted out bit
    ShiftRight { x: u8 },
    /// `8xy7` Vx = Vy - Vx; VF = !borrow
    SubReversed { x: u8, y: u8 },
    /// `8xyE` Vx <<= 1; VF = shifted out bit
    ShiftLeft { x: u8 },
    /// `9xy0` skip if Vx != Vy
    SkipIfRegistersNotEqual { x: u8, y: u8 },
    /// `Annn` I = addr
    LoadIndex { addr: u16 },
    /// `Bnnn` PC = V0 + addr
    JumpOffset { addr: u16 },
    /// `Cxkk` Vx = random & kk
    Random { x: u8, kk: u8 },
    /// `Dxyn` draw an n-row sprite from memory[I] at (Vx, Vy)
    Draw { x: u8, y: u8, n: u8 },
    /// `Ex9E` skip if key Vx is pressed
    SkipIfPressed { x: u8 },
    /// `ExA1` skip if key Vx is not pressed
    SkipIfNotPressed { x: u8 },
    /// `Fx07` Vx = DT
    GetDelay { x: u8 },
    /// `Fx0A` wait for a key press and store it in Vx
    WaitKey { x: u8 },
    /// `Fx15` DT = Vx
    SetDelay { x: u8 },
    /// `Fx18` ST = Vx
    SetSound { x: u8 },
    /// `Fx1E` I += Vx
    AddIndex { x: u8 },
    /// `Fx29` I = address of the glyph for digit Vx
    LoadFont { x: u8 },
    /// `Fx33` memory[I..I+3] = bcd(Vx)
    StoreBcd { x: u8 },
    /// `Fx55` memory[I..=I+x] = V0..=Vx
    StoreRegisters { x: u8 },
    /// `Fx65` V0..=Vx = memory[I..=I+x]
    LoadRegisters { x: u8 },
    /// Any word that doesn't encode one of the above
    Unknown,
}

/// Decodes a single 16-bit word.
///
/// Total and side effect free: every possible word maps to some `Instruction`.
pub fn decode(word: u16) -> Instruction {
    use Instruction::*;

    let addr = word & 0x0FFF;
    let kk = (word & 0x00FF) as u8;
    let x = ((word & 0x0F00) >> 8) as u8;
    let y = ((word & 0x00F0) >> 4) as u8;
    let n = (word & 0x000F) as u8;

    match ((word >> 12) as u8, x, y, n) {
        (0x0, 0x0, 0xE, 0x0) => ClearScreen,
        (0x0, 0x0, 0xE, 0xE) => Return,
        (0x1, ..) => Jump { addr },
        (0x2, ..) => Call { addr },
        (0x3, ..) => SkipIfEqual { x, kk },
        (0x4, ..) => SkipIfNotEqual { x, kk },
        (0x5, ..) => SkipIfRegistersEqual { x, y },
        (0x6, ..) => Load { x, kk },
        (0x7, ..) => Add { x, kk },
        (0x8, .., 0x0) => Move { x, y },
        (0x8, .., 0x1) => Or { x, y },
        (0x8, .., 0x2) => And { x, y },
        (0x8, .., 0x3) => Xor { x, y },
        (0x8, .., 0x4) => AddRegisters { x, y },
        (0x8, .., 0x5) => Sub { x, y },
        (0x8, .., 0x6) => ShiftRight { x },
        (0x8, .., 0x7) => SubReversed { x, y },
        (0x8, .., 0xE) => ShiftLeft { x },
        (0x9, ..) => SkipIfRegistersNotEqual { x, y },
        (0xA, ..) => LoadIndex { addr },
        (0xB, ..) => JumpOffset { addr },
        (0xC, ..) => Random { x, kk },
        (0xD, ..) => Draw { x, y, n },
        (0xE, _, 0x9, 0xE) => SkipIfPressed { x },
        (0xE, _, 0xA, 0x1) => SkipIfNotPressed { x },
        (0xF, _, 0x0, 0x7) => GetDelay { x },
        (0xF, _, 0x0, 0xA) => WaitKey { x },
        (0xF, _, 0x1, 0x5) => SetDelay { x },
        (0xF, _, 0x1, 0x8) => SetSound { x },
        (0xF, _, 0x1, 0xE) => AddIndex { x },
        (0xF, _, 0x2, 0x9) => LoadFont { x },
        (0xF, _, 0x3, 0x3) => StoreBcd { x },
        (0xF, _, 0x5, 0x5) => StoreRegisters { x },
        (0xF, _, 0x6, 0x5) => LoadRegisters { x },
        _ => Unknown,
    }
}

impl From<u16> for Instruction {
    fn from(word: u16) -> Self {
        decode(word)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Instruction::*;

        match *self {
            ClearScreen => write!(f, "CLS"),
            Return => write!(f, "RET"),
            Jump { addr } => write!(f, "JP {:#05X}", addr),
            Call { addr } => write!(f, "CALL {:#05X}", addr),
            SkipIfEqual { x, kk } => write!(f, "SE V{:X}, {:#04X}", x, kk),
            SkipIfNotEqual { x, kk } => write!(f, "SNE V{:X}, {:#04X}", x, kk),
            SkipIfRegistersEqual { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            Load { x, kk } => write!(f, "LD V{:X}, {:#04X}", x, kk),
            Add { x, kk } => write!(f, "ADD V{:X}, {:#04X}", x, kk),
            Move { x, y } => write!(f, "LD V{:X}, V{:X}", x, y),
            Or { x, y } => write!(f, "OR V{:X}, V{:X}", x, y),
            And { x, y } => write!(f, "AND V{:X}, V{:X}", x, y),
            Xor { x, y } => write!(f, "XOR V{:X}, V{:X}", x, y),
            AddRegisters { x, y } => write!(f, "ADD V{:X}, V{:X}", x, y),
            Sub { x, y } => write!(f, "SUB V{:X}, V{:X}", x, y),
            ShiftRight { x } => write!(f, "SHR V{:X}", x),
            SubReversed { x, y } => write!(f, "SUBN V{:X}, V{:X}", x, y),
            ShiftLeft { x } => write!(f, "SHL V{:X}", x),
            SkipIfRegistersNotEqual { x, y } => write!(f, "SNE V{:X}, V{:X}", x, y),
            LoadIndex { addr } => write!(f, "LD I, {:#05X}", addr),
            JumpOffset { addr } => write!(f, "JP V0, {:#05X}", addr),
            Random { x, kk } => write!(f, "RND V{:X}, {:#04X}", x, kk),
            Draw { x, y, n } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            SkipIfPressed { x } => write!(f, "SKP V{:X}", x),
            SkipIfNotPressed { x } => write!(f, "SKNP V{:X}", x),
            GetDelay { x } => write!(f, "LD V{:X}, DT", x),
            WaitKey { x } => write!(f, "LD V{:X}, K", x),
            SetDelay { x } => write!(f, "LD DT, V{:X}", x),
            SetSound { x } => write!(f, "LD ST, V{:X}", x),
            AddIndex { x } => write!(f, "ADD I, V{:X}", x),
            LoadFont { x } => write!(f, "LD F, V{:X}", x),
            StoreBcd { x } => write!(f, "LD B, V{:X}", x),
            StoreRegisters { x } => write!(f, "LD [I], V{:X}", x),
            LoadRegisters { x } => write!(f, "LD V{:X}, [I]", x),
            Unknown => write!(f, "???"),
        }
    }
}

/// A single decoded word of a ROM, as produced by `disassemble`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Disassembled {
    /// Where the word would live once the ROM is loaded
    pub address: u16,
    pub word: u16,
    pub instruction: Instruction,
}

impl Disassembled {
    /// Human readable rendering of the instruction
    pub fn description(&self) -> String {
        self.instruction.to_string()
    }
}

impl fmt::Display for Disassembled {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:04X}  {:04X}  {}",
            self.address, self.word, self.instruction
        )
    }
}

/// Lazily walks a ROM two bytes at a time.
///
/// The iterator is `Clone`, so a saved copy can be used to restart a listing from any point.
#[derive(Debug, Clone)]
pub struct Disassembly<'a> {
    words: std::slice::ChunksExact<'a, u8>,
    address: u16,
}

impl<'a> Iterator for Disassembly<'a> {
    type Item = Disassembled;

    fn next(&mut self) -> Option<Self::Item> {
        let pair = self.words.next()?;
        let word = u16::from_be_bytes([pair[0], pair[1]]);
        let item = Disassembled {
            address: self.address,
            word,
            instruction: decode(word),
        };
        self.address = self.address.wrapping_add(2);
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.words.size_hint()
    }
}

impl ExactSizeIterator for Disassembly<'_> {}

/// Disassembles a ROM as it would be laid out in memory, starting at the program start address.
/// A trailing odd byte is ignored.
pub fn disassemble(rom: &[u8]) -> Disassembly<'_> {
    Disassembly {
        words: rom.chunks_exact(2),
        address: PROGRAM_START,
    }
}
