use crate::accumulator::PressedSet;
use crate::keycode::{Keycode, ModifierMask};

/// Standard USB HID boot keyboard report (8 bytes).
/// Byte 0: modifier keys bitmask
/// Byte 1: reserved (0x00)
/// Bytes 2-7: up to 6 simultaneous keycodes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyboardReport {
    pub modifiers: u8,
    pub reserved: u8,
    pub keys: [u8; 6],
}

impl KeyboardReport {
    pub const fn empty() -> Self {
        Self {
            modifiers: 0,
            reserved: 0,
            keys: [0; 6],
        }
    }

    /// Report for a pressed set. Internal codes never reach the key array;
    /// keys past the sixth are dropped.
    pub fn from_keys<const N: usize>(keys: &PressedSet<N>, modifiers: ModifierMask) -> Self {
        let mut report = Self::empty();
        report.modifiers = modifiers.bits();
        let hid_keys = keys.codes().filter(|c| c.is_hid_key());
        for (slot, code) in report.keys.iter_mut().zip(hid_keys) {
            *slot = code as u8;
        }
        report
    }

    /// Report with one key and the given modifiers held.
    pub fn single(code: Keycode, modifiers: ModifierMask) -> Self {
        let mut report = Self::empty();
        report.modifiers = modifiers.bits();
        if code.is_hid_key() {
            report.keys[0] = code as u8;
        }
        report
    }

    pub fn as_bytes(&self) -> [u8; 8] {
        let k = self.keys;
        [self.modifiers, self.reserved, k[0], k[1], k[2], k[3], k[4], k[5]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::{KeyPos, PressedKey};

    fn set(codes: &[Keycode]) -> PressedSet<8> {
        let mut set = PressedSet::new();
        for (i, &code) in codes.iter().enumerate() {
            set.push(PressedKey { pos: KeyPos::new(0, i as u8), code });
        }
        set
    }

    #[test]
    fn test_report_bytes() {
        let mut mods = ModifierMask::EMPTY;
        mods.insert(Keycode::LShift);
        let report = KeyboardReport::from_keys(&set(&[Keycode::A, Keycode::N1]), mods);
        assert_eq!(report.as_bytes(), [0x02, 0, 0x04, 0x1E, 0, 0, 0, 0]);
    }

    #[test]
    fn test_internal_codes_filtered() {
        let report = KeyboardReport::from_keys(
            &set(&[Keycode::EditorMode, Keycode::B]),
            ModifierMask::EMPTY,
        );
        assert_eq!(report.keys, [0x05, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_more_than_six_keys_truncated() {
        let codes = [
            Keycode::A,
            Keycode::B,
            Keycode::C,
            Keycode::D,
            Keycode::E,
            Keycode::F,
            Keycode::G,
        ];
        let report = KeyboardReport::from_keys(&set(&codes), ModifierMask::EMPTY);
        assert_eq!(report.keys, [0x04, 0x05, 0x06, 0x07, 0x08, 0x09]);
    }

    #[test]
    fn test_single_key() {
        let report = KeyboardReport::single(Keycode::F24, ModifierMask::EMPTY);
        assert_eq!(report.as_bytes(), [0, 0, 0x73, 0, 0, 0, 0, 0]);
    }
}
