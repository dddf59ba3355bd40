use sdl2::keyboard::Keycode;

/// What a keyboard key means to the frontend
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Input {
    /// A key on the hexadecimal keypad
    Keypad(u8),
    TogglePause,
    Restart,
    Quit,
}

/// # Keymap
/// Chip-8 input is generated with a hexadecimal keypad.
///
/// This original layout is mapped to the left 4 alphanumeric columns.
/// ```text
/// |1|2|3|C|      |1|2|3|4|
/// |4|5|6|D|  ->  |Q|W|E|R|
/// |7|8|9|E|  ->  |A|S|D|F|
/// |A|0|B|F|      |Z|X|C|V|
/// ```
const KEYPAD: [[(Keycode, u8); 4]; 4] = [
    [(Keycode::Num1, 0x1), (Keycode::Num2, 0x2), (Keycode::Num3, 0x3), (Keycode::Num4, 0xC)],
    [(Keycode::Q, 0x4), (Keycode::W, 0x5), (Keycode::E, 0x6), (Keycode::R, 0xD)],
    [(Keycode::A, 0x7), (Keycode::S, 0x8), (Keycode::D, 0x9), (Keycode::F, 0xE)],
    [(Keycode::Z, 0xA), (Keycode::X, 0x0), (Keycode::C, 0xB), (Keycode::V, 0xF)],
];

pub fn input(key: Keycode) -> Option<Input> {
    match key {
        Keycode::P => Some(Input::TogglePause),
        Keycode::Backspace => Some(Input::Restart),
        Keycode::Escape => Some(Input::Quit),
        _ => KEYPAD
            .iter()
            .flatten()
            .find(|(code, _)| *code == key)
            .map(|&(_, index)| Input::Keypad(index)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypad_layout() {
        assert_eq!(input(Keycode::Num1), Some(Input::Keypad(0x1)));
        assert_eq!(input(Keycode::Num4), Some(Input::Keypad(0xC)));
        assert_eq!(input(Keycode::X), Some(Input::Keypad(0x0)));
        assert_eq!(input(Keycode::V), Some(Input::Keypad(0xF)));
    }

    #[test]
    fn test_every_keypad_key_is_mapped_once() {
        let mut indices: Vec<u8> = KEYPAD.iter().flatten().map(|&(_, i)| i).collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..16).collect::<Vec<u8>>());
    }

    #[test]
    fn test_controls() {
        assert_eq!(input(Keycode::P), Some(Input::TogglePause));
        assert_eq!(input(Keycode::Escape), Some(Input::Quit));
        assert_eq!(input(Keycode::Space), None);
    }
}
