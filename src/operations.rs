use rand::Rng;

use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH, GLYPH_SIZE, STACK_SIZE};
use crate::error::{Error, Result};
use crate::state::State;

/// What happens to the program counter once an operation has run
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Flow {
    /// pc += 2
    Next,
    /// pc += 4
    Skip,
    /// pc = addr
    Goto(u16),
    /// pc is left alone so the same instruction runs again
    Stay,
}

impl Flow {
    fn skip_if(condition: bool) -> Self {
        if condition {
            Flow::Skip
        } else {
            Flow::Next
        }
    }

    /// The program counter that follows `pc` under this flow
    pub fn apply(self, pc: u16) -> u16 {
        match self {
            Flow::Next => pc.wrapping_add(2),
            Flow::Skip => pc.wrapping_add(4),
            Flow::Goto(addr) => addr,
            Flow::Stay => pc,
        }
    }
}

/// clear
pub fn clr(state: &mut State) -> Flow {
    state.frame_buffer = [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
    state.draw_flag = true;
    Flow::Next
}

/// PC = STACK.pop()
pub fn rts(state: &mut State) -> Result<Flow> {
    if state.sp == 0 {
        return Err(Error::StackUnderflow { pc: state.pc });
    }
    state.sp -= 1;
    Ok(Flow::Goto(state.stack[state.sp as usize]))
}

/// PC = addr
pub fn jump(addr: u16) -> Flow {
    Flow::Goto(addr)
}

/// STACK.push(PC + 2); PC = addr
pub fn call(state: &mut State, addr: u16) -> Result<Flow> {
    if state.sp as usize >= STACK_SIZE {
        return Err(Error::StackOverflow { pc: state.pc });
    }
    state.stack[state.sp as usize] = state.pc.wrapping_add(2);
    state.sp += 1;
    Ok(Flow::Goto(addr))
}

/// if Vx == kk then pc += 2
pub fn ske(state: &State, x: u8, kk: u8) -> Flow {
    Flow::skip_if(state.v[x as usize] == kk)
}

/// if Vx != kk then pc += 2
pub fn skne(state: &State, x: u8, kk: u8) -> Flow {
    Flow::skip_if(state.v[x as usize] != kk)
}

/// if Vx == Vy then pc += 2
pub fn skre(state: &State, x: u8, y: u8) -> Flow {
    Flow::skip_if(state.v[x as usize] == state.v[y as usize])
}

/// if Vx != Vy then pc += 2
pub fn skrne(state: &State, x: u8, y: u8) -> Flow {
    Flow::skip_if(state.v[x as usize] != state.v[y as usize])
}

/// Vx = kk
pub fn load(state: &mut State, x: u8, kk: u8) -> Flow {
    state.v[x as usize] = kk;
    Flow::Next
}

/// Vx += kk
/// Add kk to Vx; allow for overflow but implicitly drop it
pub fn add(state: &mut State, x: u8, kk: u8) -> Flow {
    state.v[x as usize] = state.v[x as usize].wrapping_add(kk);
    Flow::Next
}

/// Vx = Vy
pub fn mv(state: &mut State, x: u8, y: u8) -> Flow {
    state.v[x as usize] = state.v[y as usize];
    Flow::Next
}

/// Vx |= Vy
pub fn or(state: &mut State, x: u8, y: u8) -> Flow {
    state.v[x as usize] |= state.v[y as usize];
    Flow::Next
}

/// Vx &= Vy
pub fn and(state: &mut State, x: u8, y: u8) -> Flow {
    state.v[x as usize] &= state.v[y as usize];
    Flow::Next
}

/// Vx ^= Vy
pub fn xor(state: &mut State, x: u8, y: u8) -> Flow {
    state.v[x as usize] ^= state.v[y as usize];
    Flow::Next
}

/// Vx += Vy; VF = overflow
/// The flag is written last so that VF as an operand still sees its old value.
pub fn addr(state: &mut State, x: u8, y: u8) -> Flow {
    let (res, over) = state.v[x as usize].overflowing_add(state.v[y as usize]);
    state.v[x as usize] = res;
    state.v[0xF] = over as u8;
    Flow::Next
}

/// Vx -= Vy; VF = !underflow
pub fn sub(state: &mut State, x: u8, y: u8) -> Flow {
    let (res, under) = state.v[x as usize].overflowing_sub(state.v[y as usize]);
    state.v[x as usize] = res;
    state.v[0xF] = !under as u8;
    Flow::Next
}

/// Vx = Vy - Vx; VF = !underflow
pub fn subn(state: &mut State, x: u8, y: u8) -> Flow {
    let (res, under) = state.v[y as usize].overflowing_sub(state.v[x as usize]);
    state.v[x as usize] = res;
    state.v[0xF] = !under as u8;
    Flow::Next
}

/// Vx >>= 1; VF = the bit shifted out
pub fn shr(state: &mut State, x: u8) -> Flow {
    let lsb = state.v[x as usize] & 0x1;
    state.v[x as usize] >>= 1;
    state.v[0xF] = lsb;
    Flow::Next
}

/// Vx <<= 1; VF = the bit shifted out
pub fn shl(state: &mut State, x: u8) -> Flow {
    let msb = state.v[x as usize] >> 7;
    state.v[x as usize] <<= 1;
    state.v[0xF] = msb;
    Flow::Next
}

/// I = addr
pub fn loadi(state: &mut State, addr: u16) -> Flow {
    state.i = addr;
    Flow::Next
}

/// PC = V0 + addr
pub fn jumpi(state: &State, addr: u16) -> Flow {
    Flow::Goto(u16::from(state.v[0x0]) + addr)
}

/// Vx = rand_byte & kk
pub fn rand(state: &mut State, x: u8, kk: u8, rng: &mut impl Rng) -> Flow {
    let rand_byte: u8 = rng.gen();
    state.v[x as usize] = rand_byte & kk;
    Flow::Next
}

/// draw_sprite(x=Vx y=Vy size=n)
/// XORs a sprite from memory i..n at position x, y on the FrameBuffer with wrapping.
/// Sets VF if any pixels were erased
pub fn draw(state: &mut State, x: u8, y: u8, n: u8) -> Flow {
    let origin_x = state.v[x as usize] as usize;
    let origin_y = state.v[y as usize] as usize;
    let mut collision = 0x0;

    for row in 0..n as usize {
        let sprite = state.read(state.i.wrapping_add(row as u16));
        let py = (origin_y + row) % DISPLAY_HEIGHT;
        for bit in 0..8 {
            let px = (origin_x + bit) % DISPLAY_WIDTH;
            let pixel_value = (sprite >> (7 - bit)) & 1;
            collision |= pixel_value & state.frame_buffer[py][px];
            state.frame_buffer[py][px] ^= pixel_value;
        }
    }

    state.v[0xF] = collision;
    state.draw_flag = true;
    Flow::Next
}

/// if Vx.pressed then pc += 2
pub fn skpr(state: &State, x: u8) -> Flow {
    Flow::skip_if(state.keypad[(state.v[x as usize] & 0xF) as usize])
}

/// if !Vx.pressed then pc += 2
pub fn skup(state: &State, x: u8) -> Flow {
    Flow::skip_if(!state.keypad[(state.v[x as usize] & 0xF) as usize])
}

/// Vx = DT
pub fn moved(state: &mut State, x: u8) -> Flow {
    state.v[x as usize] = state.delay_timer;
    Flow::Next
}

/// Vx = first pressed key
/// Polls rather than blocks: with nothing pressed the pc stays put and the
/// instruction is fetched again next cycle.
pub fn keyd(state: &mut State, x: u8) -> Flow {
    match state.first_pressed_key() {
        Some(key) => {
            state.v[x as usize] = key;
            Flow::Next
        }
        None => Flow::Stay,
    }
}

/// DT = Vx
pub fn loads(state: &mut State, x: u8) -> Flow {
    state.delay_timer = state.v[x as usize];
    Flow::Next
}

/// ST = Vx
pub fn ld(state: &mut State, x: u8) -> Flow {
    state.sound_timer = Some(state.v[x as usize]);
    Flow::Next
}

/// I += Vx; VF = I overflowed the 12-bit address space
pub fn addi(state: &mut State, x: u8) -> Flow {
    let i = state.i.wrapping_add(u16::from(state.v[x as usize]));
    state.v[0xF] = (i > 0x0FFF) as u8;
    state.i = i;
    Flow::Next
}

/// I = Vx * 5
/// Set I to the memory address of the sprite for Vx
/// See constants::SPRITE_SHEET for more details
pub fn ldspr(state: &mut State, x: u8) -> Flow {
    state.i = u16::from(state.v[x as usize]) * GLYPH_SIZE;
    Flow::Next
}

/// mem[I..I+3] = bcd(Vx)
/// Store BCD repr of Vx in memory starting at address i
pub fn bcd(state: &mut State, x: u8) -> Flow {
    let value = state.v[x as usize];
    let digits = [value / 100, value / 10 % 10, value % 10];
    for (offset, digit) in (0u16..).zip(digits) {
        state.write(state.i.wrapping_add(offset), digit);
    }
    Flow::Next
}

/// mem[I..=I+x] = V0..=Vx
pub fn stor(state: &mut State, x: u8) -> Flow {
    for reg in 0..=x {
        state.write(state.i.wrapping_add(u16::from(reg)), state.v[reg as usize]);
    }
    Flow::Next
}

/// V0..=Vx = mem[I..=I+x]
pub fn read(state: &mut State, x: u8) -> Flow {
    for reg in 0..=x {
        state.v[reg as usize] = state.read(state.i.wrapping_add(u16::from(reg)));
    }
    Flow::Next
}
