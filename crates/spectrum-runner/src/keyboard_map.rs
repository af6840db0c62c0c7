//! Host keyboard → Spectrum keyboard matrix.
//!
//! The Spectrum keyboard is an 8×5 matrix of half-rows; the worker's
//! key commands carry a (row, mask) pair per physical key. Convenience
//! keys that don't exist on the Spectrum map to CAPS SHIFT combos
//! (backspace = CAPS+0, cursor keys = CAPS+5/6/7/8).
//!
//! | Row | Keys (bit 0-4)      | Row | Keys (bit 0-4)       |
//! |-----|---------------------|-----|----------------------|
//! | 0   | Shift, Z, X, C, V   | 4   | 0, 9, 8, 7, 6        |
//! | 1   | A, S, D, F, G       | 5   | P, O, I, U, Y        |
//! | 2   | Q, W, E, R, T       | 6   | Enter, L, K, J, H    |
//! | 3   | 1, 2, 3, 4, 5       | 7   | Space, Sym, M, N, B  |

use winit::keyboard::KeyCode;

const CAPS: (u8, u8) = (0, 0x01);
const SYM: (u8, u8) = (7, 0x02);

/// Map a host key to the Spectrum matrix positions it presses.
///
/// Returns an empty slice for unmapped keys.
#[must_use]
pub fn map_keycode(key: KeyCode) -> &'static [(u8, u8)] {
    match key {
        // Letters
        KeyCode::KeyA => &[(1, 0x01)],
        KeyCode::KeyB => &[(7, 0x10)],
        KeyCode::KeyC => &[(0, 0x08)],
        KeyCode::KeyD => &[(1, 0x04)],
        KeyCode::KeyE => &[(2, 0x04)],
        KeyCode::KeyF => &[(1, 0x08)],
        KeyCode::KeyG => &[(1, 0x10)],
        KeyCode::KeyH => &[(6, 0x10)],
        KeyCode::KeyI => &[(5, 0x04)],
        KeyCode::KeyJ => &[(6, 0x08)],
        KeyCode::KeyK => &[(6, 0x04)],
        KeyCode::KeyL => &[(6, 0x02)],
        KeyCode::KeyM => &[(7, 0x04)],
        KeyCode::KeyN => &[(7, 0x08)],
        KeyCode::KeyO => &[(5, 0x02)],
        KeyCode::KeyP => &[(5, 0x01)],
        KeyCode::KeyQ => &[(2, 0x01)],
        KeyCode::KeyR => &[(2, 0x08)],
        KeyCode::KeyS => &[(1, 0x02)],
        KeyCode::KeyT => &[(2, 0x10)],
        KeyCode::KeyU => &[(5, 0x08)],
        KeyCode::KeyV => &[(0, 0x10)],
        KeyCode::KeyW => &[(2, 0x02)],
        KeyCode::KeyX => &[(0, 0x04)],
        KeyCode::KeyY => &[(5, 0x10)],
        KeyCode::KeyZ => &[(0, 0x02)],

        // Digits
        KeyCode::Digit1 => &[(3, 0x01)],
        KeyCode::Digit2 => &[(3, 0x02)],
        KeyCode::Digit3 => &[(3, 0x04)],
        KeyCode::Digit4 => &[(3, 0x08)],
        KeyCode::Digit5 => &[(3, 0x10)],
        KeyCode::Digit6 => &[(4, 0x10)],
        KeyCode::Digit7 => &[(4, 0x08)],
        KeyCode::Digit8 => &[(4, 0x04)],
        KeyCode::Digit9 => &[(4, 0x02)],
        KeyCode::Digit0 => &[(4, 0x01)],

        KeyCode::Enter => &[(6, 0x01)],
        KeyCode::Space => &[(7, 0x01)],

        // Modifiers
        KeyCode::ShiftLeft => &[CAPS],
        KeyCode::ShiftRight | KeyCode::ControlLeft | KeyCode::ControlRight => &[SYM],

        // CAPS SHIFT combos
        KeyCode::Backspace => &[CAPS, (4, 0x01)], // CAPS + 0
        KeyCode::ArrowLeft => &[CAPS, (3, 0x10)], // CAPS + 5
        KeyCode::ArrowDown => &[CAPS, (4, 0x10)], // CAPS + 6
        KeyCode::ArrowUp => &[CAPS, (4, 0x08)],   // CAPS + 7
        KeyCode::ArrowRight => &[CAPS, (4, 0x04)], // CAPS + 8

        _ => &[],
    }
}
