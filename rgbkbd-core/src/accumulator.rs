//! Modifier and layer accumulator.
//!
//! Collects the key events of one scan cycle: modifier bits, the FN flag and
//! up to `N` ordinary keys in scan order. The FN remap is applied when the
//! cycle is finished, so FN works no matter where it sits in the scan order.

use heapless::Vec;

use crate::keycode::{Keycode, ModifierMask};

/// Logical matrix position: `row` is the sense bit, `col` the strobe line.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyPos {
    pub row: u8,
    pub col: u8,
}

impl KeyPos {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }
}

/// An ordinary key detected in a scan cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PressedKey {
    pub pos: KeyPos,
    pub code: Keycode,
}

/// Keys detected in one scan cycle, in scan order, without duplicates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PressedSet<const N: usize> {
    keys: Vec<PressedKey, N>,
}

impl<const N: usize> PressedSet<N> {
    pub const fn new() -> Self {
        Self { keys: Vec::new() }
    }

    /// Add a key. Returns false if it was dropped: unmapped, already present
    /// or the set is full.
    pub fn push(&mut self, key: PressedKey) -> bool {
        if key.code.is_no() || self.contains(key.code) {
            return false;
        }
        self.keys.push(key).is_ok()
    }

    pub fn contains(&self, code: Keycode) -> bool {
        self.keys.iter().any(|k| k.code == code)
    }

    pub fn remove(&mut self, code: Keycode) -> bool {
        let before = self.keys.len();
        self.keys.retain(|k| k.code != code);
        self.keys.len() != before
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PressedKey> {
        self.keys.iter()
    }

    pub fn codes(&self) -> impl Iterator<Item = Keycode> + '_ {
        self.keys.iter().map(|k| k.code)
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }
}

/// Result of a completed scan cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleReport<const N: usize> {
    pub keys: PressedSet<N>,
    pub modifiers: ModifierMask,
}

pub struct Accumulator<const N: usize> {
    keys: PressedSet<N>,
    modifiers: ModifierMask,
    fn_held: bool,
}

impl<const N: usize> Accumulator<N> {
    pub const fn new() -> Self {
        Self {
            keys: PressedSet::new(),
            modifiers: ModifierMask::EMPTY,
            fn_held: false,
        }
    }

    /// Record a closed switch. `newly_pressed` is true when the switch was
    /// open in the previous cycle; ordinary keys are only reported then,
    /// modifiers and FN count for every cycle they are held.
    pub fn record(&mut self, pos: KeyPos, code: Keycode, newly_pressed: bool) {
        match code {
            Keycode::No => {}
            Keycode::Fn => self.fn_held = true,
            c if c.is_modifier() => self.modifiers.insert(c),
            c => {
                if newly_pressed {
                    // Past N keys the rest of the cycle is dropped
                    self.keys.push(PressedKey { pos, code: c });
                }
            }
        }
    }

    pub fn fn_held(&self) -> bool {
        self.fn_held
    }

    /// Close the cycle, applying `remap` to every key if FN was held, and
    /// start the next one empty.
    pub fn finish(&mut self, remap: impl Fn(Keycode) -> Keycode) -> CycleReport<N> {
        let keys = core::mem::take(&mut self.keys);
        let keys = if self.fn_held {
            let mut remapped = PressedSet::new();
            for key in keys.iter() {
                remapped.push(PressedKey {
                    pos: key.pos,
                    code: remap(key.code),
                });
            }
            remapped
        } else {
            keys
        };

        let report = CycleReport {
            keys,
            modifiers: self.modifiers,
        };
        self.modifiers = ModifierMask::EMPTY;
        self.fn_held = false;
        report
    }
}

impl<const N: usize> Default for Accumulator<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::fn_remap;

    fn pos(row: u8, col: u8) -> KeyPos {
        KeyPos::new(row, col)
    }

    #[test]
    fn test_keys_in_scan_order() {
        let mut acc = Accumulator::<6>::new();
        acc.record(pos(0, 3), Keycode::N3, true);
        acc.record(pos(1, 1), Keycode::Q, true);
        let report = acc.finish(fn_remap);
        let codes: std::vec::Vec<_> = report.keys.codes().collect();
        assert_eq!(codes, [Keycode::N3, Keycode::Q]);
        assert!(report.modifiers.is_empty());
    }

    #[test]
    fn test_held_key_not_repeated() {
        let mut acc = Accumulator::<6>::new();
        acc.record(pos(1, 1), Keycode::Q, false);
        assert!(acc.finish(fn_remap).keys.is_empty());
    }

    #[test]
    fn test_modifiers_are_level_triggered() {
        let mut acc = Accumulator::<6>::new();
        acc.record(pos(3, 0), Keycode::LShift, false);
        acc.record(pos(4, 0), Keycode::LCtrl, true);
        let report = acc.finish(fn_remap);
        assert!(report.keys.is_empty());
        assert_eq!(report.modifiers.bits(), 0x03);

        // Mask is cleared for the next cycle
        assert!(acc.finish(fn_remap).modifiers.is_empty());
    }

    #[test]
    fn test_unmapped_dropped() {
        let mut acc = Accumulator::<6>::new();
        acc.record(pos(2, 9), Keycode::No, true);
        assert!(acc.finish(fn_remap).keys.is_empty());
    }

    #[test]
    fn test_truncates_at_capacity() {
        let mut acc = Accumulator::<2>::new();
        acc.record(pos(1, 1), Keycode::Q, true);
        acc.record(pos(1, 2), Keycode::W, true);
        acc.record(pos(1, 3), Keycode::E, true);
        let report = acc.finish(fn_remap);
        assert_eq!(report.keys.len(), 2);
        assert!(!report.keys.contains(Keycode::E));
    }

    #[test]
    fn test_fn_applies_to_whole_cycle() {
        let mut acc = Accumulator::<6>::new();
        // Escape is scanned before FN, still remapped
        acc.record(pos(0, 0), Keycode::Escape, true);
        acc.record(pos(4, 11), Keycode::Fn, false);
        acc.record(pos(0, 14), Keycode::Delete, true);
        assert!(acc.fn_held());
        let report = acc.finish(fn_remap);
        let codes: std::vec::Vec<_> = report.keys.codes().collect();
        assert_eq!(codes, [Keycode::Grave, Keycode::Insert]);
        assert!(!acc.fn_held());
    }

    #[test]
    fn test_no_remap_without_fn() {
        let mut acc = Accumulator::<6>::new();
        acc.record(pos(0, 0), Keycode::Escape, true);
        acc.record(pos(2, 13), Keycode::Enter, true);
        let report = acc.finish(fn_remap);
        let codes: std::vec::Vec<_> = report.keys.codes().collect();
        assert_eq!(codes, [Keycode::Escape, Keycode::Enter]);
    }

    #[test]
    fn test_pressed_set_remove() {
        let mut set = PressedSet::<4>::new();
        assert!(set.push(PressedKey { pos: pos(0, 1), code: Keycode::N1 }));
        assert!(!set.push(PressedKey { pos: pos(0, 1), code: Keycode::N1 }));
        assert!(set.remove(Keycode::N1));
        assert!(!set.remove(Keycode::N1));
        assert!(set.is_empty());
    }
}
