//! Key event table: matrix position to keycode, plus the FN remap.
//!
//! The matrix is scanned one strobe line at a time, so a logical row is a
//! sense bit and a logical column is a strobe line. Modifier and FN
//! positions map to their own keycodes; the accumulator turns those into
//! modifier bits and the FN flag.

use crate::config::{COLS, ROWS};
use crate::keycode::Keycode;

/// Position is wired but has no key.
const ___: Keycode = Keycode::No;

/// Shorthand aliases for readability.
const ESC: Keycode = Keycode::Escape;
const BSP: Keycode = Keycode::Backspace;
const DEL: Keycode = Keycode::Delete;
const NUML: Keycode = Keycode::NumLock;
const TAB: Keycode = Keycode::Tab;
const PGUP: Keycode = Keycode::PageUp;
const PGDN: Keycode = Keycode::PageDown;
const CAPS: Keycode = Keycode::CapsLock;
const ENT: Keycode = Keycode::Enter;
const SPC: Keycode = Keycode::Space;
const PSCR: Keycode = Keycode::PrintScreen;
const LCTL: Keycode = Keycode::LCtrl;
const LSFT: Keycode = Keycode::LShift;
const LALT: Keycode = Keycode::LAlt;
const LGUI: Keycode = Keycode::LGui;
const RCTL: Keycode = Keycode::RCtrl;
const RSFT: Keycode = Keycode::RShift;
const RALT: Keycode = Keycode::RAlt;
const FN: Keycode = Keycode::Fn;

/// Base layer, `BASE[row][col]`.
#[rustfmt::skip]
pub static BASE: [[Keycode; COLS]; ROWS] = [
    // Row 0: number row
    [ESC, Keycode::N1, Keycode::N2, Keycode::N3, Keycode::N4, Keycode::N5, Keycode::N6, Keycode::N7,
     Keycode::N8, Keycode::N9, Keycode::N0, Keycode::Minus, Keycode::Equal, BSP, DEL, NUML],

    // Row 1: top letter row
    [TAB, Keycode::Q, Keycode::W, Keycode::E, Keycode::R, Keycode::T, Keycode::Y, Keycode::U,
     Keycode::I, Keycode::O, Keycode::P, Keycode::LBracket, Keycode::RBracket, Keycode::Backslash, PGUP, Keycode::Home],

    // Row 2: home row, column 9 is not populated
    [CAPS, Keycode::A, Keycode::S, Keycode::D, Keycode::F, Keycode::G, Keycode::H, Keycode::J,
     Keycode::K, ___, Keycode::L, Keycode::Semicolon, Keycode::Quote, ENT, PGDN, Keycode::End],

    // Row 3: bottom row
    [LSFT, ___, Keycode::Z, Keycode::X, Keycode::C, Keycode::V, Keycode::B, Keycode::N,
     Keycode::M, Keycode::Comma, Keycode::Dot, Keycode::Slash, ___, RSFT, Keycode::Up, PSCR],

    // Row 4: space bar row
    [LCTL, LGUI, LALT, ___, ___, ___, SPC, ___,
     ___, ___, RALT, FN, RCTL, Keycode::Left, Keycode::Down, Keycode::Right],
];

/// FN layer: the keycode produced when FN is held during the cycle.
pub fn fn_remap(code: Keycode) -> Keycode {
    match code {
        Keycode::Escape => Keycode::Grave,
        Keycode::Delete => Keycode::Insert,
        Keycode::NumLock => Keycode::ScrollLock,
        Keycode::PrintScreen => Keycode::Pause,
        Keycode::Enter => Keycode::EditorMode,
        other => other,
    }
}

/// A key table with its FN remap.
#[derive(Clone, Copy)]
pub struct Keymap<const R: usize, const C: usize> {
    table: &'static [[Keycode; C]; R],
    fn_remap: fn(Keycode) -> Keycode,
}

impl<const R: usize, const C: usize> Keymap<R, C> {
    pub const fn new(table: &'static [[Keycode; C]; R], fn_remap: fn(Keycode) -> Keycode) -> Self {
        Self { table, fn_remap }
    }

    /// Keycode at `(row, col)`. Positions outside the table are unmapped.
    pub fn map(&self, row: usize, col: usize) -> Keycode {
        self.table
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(Keycode::No)
    }

    /// Apply the FN layer to `code`.
    pub fn remap(&self, code: Keycode) -> Keycode {
        (self.fn_remap)(code)
    }
}

/// The keymap of this board.
pub static BOARD: Keymap<ROWS, COLS> = Keymap::new(&BASE, fn_remap);

/// Look up the keycode for a matrix position on this board.
pub fn map(row: usize, col: usize) -> Keycode {
    BOARD.map(row, col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_position_resolves() {
        let mut mapped = 0;
        for row in 0..ROWS + 2 {
            for col in 0..COLS + 2 {
                let kc = map(row, col);
                if row >= ROWS || col >= COLS {
                    assert_eq!(kc, Keycode::No);
                    continue;
                }
                assert!(
                    kc.is_no() || kc.is_modifier() || kc.is_fn() || kc.is_hid_key(),
                    "({}, {}) maps to {:?}",
                    row,
                    col,
                    kc
                );
                if !kc.is_no() {
                    mapped += 1;
                }
            }
        }
        // 16 + 16 + 15 + 14 + 10 populated switches
        assert_eq!(mapped, 71);
    }

    #[test]
    fn test_modifier_positions_are_independent() {
        // Each modifier position yields exactly its own code; nothing cascades
        // into the neighbouring column.
        assert_eq!(map(3, 0), Keycode::LShift);
        assert_eq!(map(3, 1), Keycode::No);
        assert_eq!(map(3, 13), Keycode::RShift);
        assert_eq!(map(3, 14), Keycode::Up);
        assert_eq!(map(4, 0), Keycode::LCtrl);
        assert_eq!(map(4, 1), Keycode::LGui);
        assert_eq!(map(4, 2), Keycode::LAlt);
        assert_eq!(map(4, 10), Keycode::RAlt);
        assert_eq!(map(4, 11), Keycode::Fn);
        assert_eq!(map(4, 12), Keycode::RCtrl);
        assert_eq!(map(4, 13), Keycode::Left);
    }

    #[test]
    fn test_known_positions() {
        assert_eq!(map(0, 0), Keycode::Escape);
        assert_eq!(map(1, 4), Keycode::R);
        assert_eq!(map(2, 9), Keycode::No);
        assert_eq!(map(2, 10), Keycode::L);
        assert_eq!(map(2, 13), Keycode::Enter);
        assert_eq!(map(4, 6), Keycode::Space);
    }

    #[test]
    fn test_fn_remap() {
        assert_eq!(fn_remap(Keycode::Escape), Keycode::Grave);
        assert_eq!(fn_remap(Keycode::Delete), Keycode::Insert);
        assert_eq!(fn_remap(Keycode::NumLock), Keycode::ScrollLock);
        assert_eq!(fn_remap(Keycode::PrintScreen), Keycode::Pause);
        assert_eq!(fn_remap(Keycode::Enter), Keycode::EditorMode);
        assert_eq!(fn_remap(Keycode::A), Keycode::A);
        assert_eq!(fn_remap(Keycode::LShift), Keycode::LShift);
    }
}
