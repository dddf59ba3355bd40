use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::constants::KEY_COUNT;
use crate::error::{Error, Result};
use crate::instruction::{decode, Instruction};
use crate::operations::{self as ops, Flow};
use crate::state::{FrameBuffer, State};

/// # Chip-8
/// Chip-8 is a virtual machine and corresponding interpreted language.
///
/// Tracks:
///  - current `state`
///  - the random source used by `RND`
///
/// Supplies interfaces for:
/// - resetting with a rom
/// - pressing and releasing keys
/// - advancing the CPU one instruction at a time
/// - advancing its timers, independently of the CPU
/// - inspecting its frame buffer for rendering by some display
pub struct Chip8 {
    state: State,
    rng: StdRng,
}

impl Chip8 {
    pub fn new() -> Self {
        Chip8 {
            state: State::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a Chip-8 whose `RND` instruction produces a reproducible sequence
    pub fn with_seed(seed: u64) -> Self {
        Chip8 {
            state: State::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Throws away all state and loads a rom
    ///
    /// # Arguments
    /// * `rom` raw program bytes, copied into memory from 0x200
    pub fn reset(&mut self, rom: &[u8]) {
        self.state = State::with_rom(rom);
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.state.frame_buffer
    }

    /// Whether the last `step` changed the frame buffer
    pub fn needs_redraw(&self) -> bool {
        self.state.draw_flag
    }

    /// Set the pressed status of key
    ///
    /// # Arguments
    /// * `key` the index of the key on the hexadecimal keypad
    /// * `pressed` whether it is now held down
    pub fn set_key(&mut self, key: u8, pressed: bool) {
        match self.state.keypad.get_mut(key as usize) {
            Some(slot) => *slot = pressed,
            None => log::warn!(
                "ignoring key {:#04X}; the keypad only has {} keys",
                key,
                KEY_COUNT
            ),
        }
    }

    /// Advances the CPU by a single instruction
    /// - clears the draw flag
    /// - gets, decodes and executes the next opcode
    /// - moves the program counter on
    ///
    /// Returns the instruction that ran. An unknown opcode or a stack fault leaves the program
    /// counter where it was and is reported as an error.
    pub fn step(&mut self) -> Result<Instruction> {
        self.state.draw_flag = false;

        let pc = self.state.pc;
        let word = self.state.fetch();
        let instruction = decode(word);
        log::trace!("{:04X} {:04X} {}", pc, word, instruction);

        let flow = self.execute(instruction)?;
        self.state.pc = flow.apply(pc);
        Ok(instruction)
    }

    /// Counts both timers down by one; meant to be called at 60Hz
    /// - the delay timer stops at 0
    /// - the sound timer counts down to 0, then the next tick fires the sound trigger and
    ///   deactivates it
    ///
    /// Returns true when the sound trigger fired.
    pub fn tick_timers(&mut self) -> bool {
        if self.state.delay_timer > 0 {
            self.state.delay_timer -= 1;
        }

        match self.state.sound_timer {
            Some(0) => {
                self.state.sound_timer = None;
                true
            }
            Some(n) => {
                self.state.sound_timer = Some(n - 1);
                false
            }
            None => false,
        }
    }

    fn execute(&mut self, instruction: Instruction) -> Result<Flow> {
        use Instruction::*;

        let state = &mut self.state;
        let flow = match instruction {
            ClearScreen => ops::clr(state),
            Return => ops::rts(state)?,
            Jump { addr } => ops::jump(addr),
            Call { addr } => ops::call(state, addr)?,
            SkipIfEqual { x, kk } => ops::ske(state, x, kk),
            SkipIfNotEqual { x, kk } => ops::skne(state, x, kk),
            SkipIfRegistersEqual { x, y } => ops::skre(state, x, y),
            Load { x, kk } => ops::load(state, x, kk),
            Add { x, kk } => ops::add(state, x, kk),
            Move { x, y } => ops::mv(state, x, y),
            Or { x, y } => ops::or(state, x, y),
            And { x, y } => ops::and(state, x, y),
            Xor { x, y } => ops::xor(state, x, y),
            AddRegisters { x, y } => ops::addr(state, x, y),
            Sub { x, y } => ops::sub(state, x, y),
            ShiftRight { x } => ops::shr(state, x),
            SubReversed { x, y } => ops::subn(state, x, y),
            ShiftLeft { x } => ops::shl(state, x),
            SkipIfRegistersNotEqual { x, y } => ops::skrne(state, x, y),
            LoadIndex { addr } => ops::loadi(state, addr),
            JumpOffset { addr } => ops::jumpi(state, addr),
            Random { x, kk } => ops::rand(state, x, kk, &mut self.rng),
            Draw { x, y, n } => ops::draw(state, x, y, n),
            SkipIfPressed { x } => ops::skpr(state, x),
            SkipIfNotPressed { x } => ops::skup(state, x),
            GetDelay { x } => ops::moved(state, x),
            WaitKey { x } => ops::keyd(state, x),
            SetDelay { x } => ops::loads(state, x),
            SetSound { x } => ops::ld(state, x),
            AddIndex { x } => ops::addi(state, x),
            LoadFont { x } => ops::ldspr(state, x),
            StoreBcd { x } => ops::bcd(state, x),
            StoreRegisters { x } => ops::stor(state, x),
            LoadRegisters { x } => ops::read(state, x),
            Unknown => {
                return Err(Error::UnknownOpcode {
                    word: state.fetch(),
                    pc: state.pc,
                })
            }
        };
        Ok(flow)
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MEMORY_SIZE, SPRITE_SHEET};

    /// A Chip-8 with `program` loaded at 0x200
    fn chip8_with(program: &[u16]) -> Chip8 {
        let rom: Vec<u8> = program.iter().flat_map(|op| op.to_be_bytes()).collect();
        let mut chip8 = Chip8::with_seed(0);
        chip8.reset(&rom);
        chip8
    }

    fn run(chip8: &mut Chip8, steps: usize) {
        for _ in 0..steps {
            chip8.step().unwrap();
        }
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let mut chip8 = chip8_with(&[0x6A42, 0xA000, 0xD005, 0x2400]);
        run(&mut chip8, 4);
        chip8.state.delay_timer = 9;
        chip8.state.sound_timer = Some(9);
        chip8.set_key(0x3, true);

        chip8.reset(&[0x12, 0x34]);
        let state = chip8.state();
        assert_eq!(state.v, [0; 16]);
        assert_eq!(state.i, 0);
        assert_eq!(state.pc, 0x200);
        assert_eq!(state.sp, 0);
        assert_eq!(state.stack, [0; 16]);
        assert_eq!(state.delay_timer, 0);
        assert_eq!(state.sound_timer, None);
        assert_eq!(state.keypad, [false; 16]);
        assert!(!state.draw_flag);
        assert!(state.frame_buffer.iter().flatten().all(|&p| p == 0));
        assert_eq!(state.memory[..80], SPRITE_SHEET[..]);
        assert!(state.memory[80..0x200].iter().all(|&b| b == 0));
        assert_eq!(state.memory[0x200..0x202], [0x12, 0x34]);
        assert!(state.memory[0x202..MEMORY_SIZE].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_step_advances_pc() {
        let mut chip8 = chip8_with(&[0x00E0]);
        chip8.step().unwrap();
        assert_eq!(chip8.state.pc, 0x202);
    }

    #[test]
    fn test_step_returns_instruction() {
        let mut chip8 = chip8_with(&[0x6012]);
        assert_eq!(chip8.step().unwrap(), Instruction::Load { x: 0, kk: 0x12 });
    }

    #[test]
    fn test_unknown_opcode_is_an_error() {
        let mut chip8 = chip8_with(&[0x00E0, 0xFFFF]);
        chip8.step().unwrap();
        match chip8.step() {
            Err(Error::UnknownOpcode { word, pc }) => {
                assert_eq!(word, 0xFFFF);
                assert_eq!(pc, 0x202);
            }
            other => panic!("expected an unknown opcode error, got {:?}", other),
        }
        assert_eq!(chip8.state.pc, 0x202);
    }

    #[test]
    fn test_00e0_cls() {
        let mut chip8 = chip8_with(&[0x00E0]);
        chip8.state.frame_buffer[0][0] = 1;
        chip8.step().unwrap();
        assert_eq!(chip8.state.frame_buffer[0][0], 0);
        assert!(chip8.needs_redraw());
    }

    #[test]
    fn test_1nnn_jp() {
        let mut chip8 = chip8_with(&[0x1ABC]);
        chip8.step().unwrap();
        assert_eq!(chip8.state.pc, 0x0ABC);
    }

    #[test]
    fn test_2nnn_call_and_00ee_ret() {
        // 0x200 CALL 0x206; 0x202 LD V1, 0x01; 0x204 JP 0x204; 0x206 RET
        let mut chip8 = chip8_with(&[0x2206, 0x6101, 0x1204, 0x00EE]);
        chip8.step().unwrap();
        assert_eq!(chip8.state.pc, 0x206);
        assert_eq!(chip8.state.sp, 1);
        chip8.step().unwrap();
        assert_eq!(chip8.state.pc, 0x202);
        assert_eq!(chip8.state.sp, 0);
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x1], 0x01);
    }

    #[test]
    fn test_3xkk_se_skips() {
        let mut chip8 = chip8_with(&[0x6012, 0x3012]);
        run(&mut chip8, 2);
        assert_eq!(chip8.state.pc, 0x206);
    }

    #[test]
    fn test_3xkk_se_doesntskip() {
        let mut chip8 = chip8_with(&[0x3111]);
        chip8.step().unwrap();
        assert_eq!(chip8.state.pc, 0x202);
    }

    #[test]
    fn test_4xkk_sne_skips() {
        let mut chip8 = chip8_with(&[0x4111]);
        chip8.step().unwrap();
        assert_eq!(chip8.state.pc, 0x204);
    }

    #[test]
    fn test_5xy0_se_skips() {
        let mut chip8 = chip8_with(&[0x5120]);
        chip8.state.v[0x1] = 0x11;
        chip8.state.v[0x2] = 0x11;
        chip8.step().unwrap();
        assert_eq!(chip8.state.pc, 0x204);
    }

    #[test]
    fn test_9xy0_sne_doesntskip() {
        let mut chip8 = chip8_with(&[0x9120]);
        chip8.step().unwrap();
        assert_eq!(chip8.state.pc, 0x202);
    }

    #[test]
    fn test_7xkk_add_wraps_without_flag() {
        let mut chip8 = chip8_with(&[0x71FF]);
        chip8.state.v[0x1] = 0x02;
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x1], 0x01);
        assert_eq!(chip8.state.v[0xF], 0x0);
    }

    #[test]
    fn test_8xy1_8xy2_8xy3_bitwise() {
        let mut chip8 = chip8_with(&[0x8121, 0x8132, 0x8143]);
        chip8.state.v[0x1] = 0x6;
        chip8.state.v[0x2] = 0x3;
        chip8.state.v[0x3] = 0x5;
        chip8.state.v[0x4] = 0xF;
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x1], 0x7);
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x1], 0x5);
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x1], 0xA);
    }

    #[test]
    fn test_8xy4_add_carry() {
        let mut chip8 = chip8_with(&[0x8124]);
        chip8.state.v[0x1] = 0xFF;
        chip8.state.v[0x2] = 0x01;
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x1], 0x00);
        assert_eq!(chip8.state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xy4_add_nocarry() {
        let mut chip8 = chip8_with(&[0x8124]);
        chip8.state.v[0x1] = 0xEE;
        chip8.state.v[0x2] = 0x11;
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x1], 0xFF);
        assert_eq!(chip8.state.v[0xF], 0x0);
    }

    #[test]
    fn test_8xy5_sub_equal_operands_do_not_borrow() {
        let mut chip8 = chip8_with(&[0x8125]);
        chip8.state.v[0x1] = 0x11;
        chip8.state.v[0x2] = 0x11;
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x1], 0x00);
        assert_eq!(chip8.state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xy5_sub_borrow() {
        let mut chip8 = chip8_with(&[0x8125]);
        chip8.state.v[0x1] = 0x11;
        chip8.state.v[0x2] = 0x12;
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x1], 0xFF);
        assert_eq!(chip8.state.v[0xF], 0x0);
    }

    #[test]
    fn test_8xy7_subn_no_borrow() {
        let mut chip8 = chip8_with(&[0x8127]);
        chip8.state.v[0x1] = 0x01;
        chip8.state.v[0x2] = 0x02;
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x1], 0x01);
        assert_eq!(chip8.state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xy7_subn_reversed_underflow() {
        // V2 = V1 - V2 = 0x00 - 0x01
        let mut chip8 = chip8_with(&[0x8217]);
        chip8.state.v[0x2] = 0x01;
        chip8.state.v[0x1] = 0x00;
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x2], 0xFF);
        assert_eq!(chip8.state.v[0xF], 0x0);
    }

    #[test]
    fn test_8xy6_shr() {
        let mut chip8 = chip8_with(&[0x8106, 0x8106]);
        chip8.state.v[0x1] = 0x5;
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x1], 0x2);
        assert_eq!(chip8.state.v[0xF], 0x1);
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x1], 0x1);
        assert_eq!(chip8.state.v[0xF], 0x0);
    }

    #[test]
    fn test_8xye_shl() {
        let mut chip8 = chip8_with(&[0x810E, 0x810E]);
        chip8.state.v[0x1] = 0x81;
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x1], 0x02);
        assert_eq!(chip8.state.v[0xF], 0x1);
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x1], 0x04);
        assert_eq!(chip8.state.v[0xF], 0x0);
    }

    #[test]
    fn test_annn_ld_i() {
        let mut chip8 = chip8_with(&[0xA123]);
        chip8.step().unwrap();
        assert_eq!(chip8.state.i, 0x123);
    }

    #[test]
    fn test_bnnn_jp_v0() {
        let mut chip8 = chip8_with(&[0xB300]);
        chip8.state.v[0x0] = 0x10;
        chip8.step().unwrap();
        assert_eq!(chip8.state.pc, 0x310);
    }

    #[test]
    fn test_cxkk_rand_is_masked() {
        let mut chip8 = chip8_with(&[0xC10F, 0xC200]);
        run(&mut chip8, 2);
        assert_eq!(chip8.state.v[0x1] & 0xF0, 0);
        assert_eq!(chip8.state.v[0x2], 0);
    }

    #[test]
    fn test_cxkk_rand_is_reproducible() {
        let mut a = chip8_with(&[0xC1FF]);
        let mut b = chip8_with(&[0xC1FF]);
        a.step().unwrap();
        b.step().unwrap();
        assert_eq!(a.state.v[0x1], b.state.v[0x1]);
    }

    #[test]
    fn test_dxyn_draw_twice_erases_and_collides() {
        // I = glyph 0; draw it at (V0, V1) twice
        let mut chip8 = chip8_with(&[0xA000, 0xD015, 0xD015]);
        chip8.state.v[0x0] = 10;
        chip8.state.v[0x1] = 4;
        run(&mut chip8, 2);
        assert_eq!(chip8.state.v[0xF], 0);
        assert_eq!(chip8.state.frame_buffer[4][10..14], [1, 1, 1, 1]);
        assert_eq!(chip8.state.frame_buffer[5][10..14], [1, 0, 0, 1]);
        assert!(chip8.needs_redraw());

        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0xF], 1);
        assert!(chip8.state.frame_buffer.iter().flatten().all(|&p| p == 0));
        assert!(chip8.needs_redraw());
    }

    #[test]
    fn test_draw_flag_is_cleared_each_step() {
        let mut chip8 = chip8_with(&[0x00E0, 0x6000]);
        chip8.step().unwrap();
        assert!(chip8.needs_redraw());
        chip8.step().unwrap();
        assert!(!chip8.needs_redraw());
    }

    #[test]
    fn test_ex9e_skp() {
        let mut chip8 = chip8_with(&[0xE19E]);
        chip8.state.v[0x1] = 0xA;
        chip8.set_key(0xA, true);
        chip8.step().unwrap();
        assert_eq!(chip8.state.pc, 0x204);
    }

    #[test]
    fn test_exa1_sknp() {
        let mut chip8 = chip8_with(&[0xE1A1]);
        chip8.state.v[0x1] = 0xA;
        chip8.step().unwrap();
        assert_eq!(chip8.state.pc, 0x204);
    }

    #[test]
    fn test_set_key_ignores_out_of_range() {
        let mut chip8 = Chip8::new();
        chip8.set_key(0x10, true);
        assert_eq!(chip8.state.keypad, [false; 16]);
        chip8.set_key(0x0, true);
        chip8.set_key(0x0, false);
        assert_eq!(chip8.state.keypad, [false; 16]);
    }

    #[test]
    fn test_fx0a_waits_for_key() {
        let mut chip8 = chip8_with(&[0xF30A]);
        run(&mut chip8, 3);
        assert_eq!(chip8.state.pc, 0x200);
        chip8.set_key(0x7, true);
        chip8.step().unwrap();
        assert_eq!(chip8.state.pc, 0x202);
        assert_eq!(chip8.state.v[0x3], 0x7);
    }

    #[test]
    fn test_fx07_fx15_delay_timer() {
        let mut chip8 = chip8_with(&[0x6105, 0xF115, 0xF207]);
        run(&mut chip8, 2);
        assert_eq!(chip8.state.delay_timer, 5);
        chip8.tick_timers();
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x2], 4);
    }

    #[test]
    fn test_delay_timer_stops_at_zero() {
        let mut chip8 = Chip8::new();
        chip8.state.delay_timer = 1;
        chip8.tick_timers();
        chip8.tick_timers();
        assert_eq!(chip8.state.delay_timer, 0);
    }

    #[test]
    fn test_sound_timer_fires_once_after_reaching_zero() {
        let mut chip8 = chip8_with(&[0x6101, 0xF118]);
        run(&mut chip8, 2);
        assert_eq!(chip8.state.sound_timer, Some(1));
        assert!(!chip8.tick_timers());
        assert_eq!(chip8.state.sound_timer, Some(0));
        assert!(chip8.tick_timers());
        assert_eq!(chip8.state.sound_timer, None);
        assert!(!chip8.tick_timers());
        assert_eq!(chip8.state.sound_timer, None);
    }

    #[test]
    fn test_inactive_sound_timer_never_fires() {
        let mut chip8 = Chip8::new();
        assert!((0..10).all(|_| !chip8.tick_timers()));
    }

    #[test]
    fn test_fx1e_add_i() {
        let mut chip8 = chip8_with(&[0xF11E]);
        chip8.state.i = 0x100;
        chip8.state.v[0x1] = 0x20;
        chip8.step().unwrap();
        assert_eq!(chip8.state.i, 0x120);
        assert_eq!(chip8.state.v[0xF], 0);
    }

    #[test]
    fn test_fx29_ldspr() {
        let mut chip8 = chip8_with(&[0xF129]);
        chip8.state.v[0x1] = 0xB;
        chip8.step().unwrap();
        assert_eq!(chip8.state.i, 55);
    }

    #[test]
    fn test_fx33_bcd() {
        let mut chip8 = chip8_with(&[0xF133]);
        chip8.state.v[0x1] = 234;
        chip8.state.i = 0x300;
        chip8.step().unwrap();
        assert_eq!(chip8.state.memory[0x300..0x303], [2, 3, 4]);
        assert_eq!(chip8.state.i, 0x300);
    }

    #[test]
    fn test_fx55_stor_includes_vx() {
        let mut chip8 = chip8_with(&[0xF255]);
        chip8.state.v[0x0..0x4].copy_from_slice(&[1, 2, 3, 4]);
        chip8.state.i = 0x300;
        chip8.step().unwrap();
        assert_eq!(chip8.state.memory[0x300..0x304], [1, 2, 3, 0]);
        assert_eq!(chip8.state.i, 0x300);
    }

    #[test]
    fn test_fx65_read_includes_vx() {
        let mut chip8 = chip8_with(&[0xF265]);
        chip8.state.memory[0x300..0x304].copy_from_slice(&[1, 2, 3, 4]);
        chip8.state.i = 0x300;
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x0..0x4], [1, 2, 3, 0]);
        assert_eq!(chip8.state.i, 0x300);
    }
}
