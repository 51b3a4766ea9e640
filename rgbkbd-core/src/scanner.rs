//! Debounced matrix scanner.
//!
//! One strobe line is scanned per tick. Each line's sense bits are compared
//! with the snapshot taken for the same line one full cycle earlier, so a
//! switch can change state at most once per cycle: contact bounce shorter
//! than a cycle never shows up as a second press.

use crate::accumulator::{Accumulator, CycleReport, KeyPos};
use crate::keymap::Keymap;

/// Sense lines read while one strobe line is active; bit set = switch closed.
pub type SenseMask = u32;

/// Strobe/sense access to the switch matrix.
pub trait ScanLines {
    /// Activate strobe line `line`, deactivating the previous one.
    fn strobe(&mut self, line: usize);
    /// Read the sense lines of the active strobe line.
    fn read_sense(&mut self) -> SenseMask;
}

/// Scanner for `R` sense rows by `C` strobe lines, reporting up to `N` keys
/// per cycle. `R` must not exceed the width of [`SenseMask`].
pub struct Scanner<const R: usize, const C: usize, const N: usize> {
    keymap: Keymap<R, C>,
    /// Sense bits of every line from the previous cycle.
    previous: [SenseMask; C],
    line: usize,
    accumulator: Accumulator<N>,
}

impl<const R: usize, const C: usize, const N: usize> Scanner<R, C, N> {
    const SENSE_BITS: SenseMask = if R >= 32 { SenseMask::MAX } else { (1 << R) - 1 };

    pub const fn new(keymap: Keymap<R, C>) -> Self {
        Self {
            keymap,
            previous: [0; C],
            line: 0,
            accumulator: Accumulator::new(),
        }
    }

    /// Scan the next strobe line. Returns the cycle report after the last
    /// line of the matrix.
    pub fn tick(&mut self, lines: &mut impl ScanLines) -> Option<CycleReport<N>> {
        let line = self.line;
        lines.strobe(line);
        let sense = lines.read_sense() & Self::SENSE_BITS;
        let previous = self.previous[line];

        for row in 0..R {
            let bit = 1 << row;
            if sense & bit == 0 {
                continue;
            }
            let code = self.keymap.map(row, line);
            let pos = KeyPos::new(row as u8, line as u8);
            self.accumulator.record(pos, code, previous & bit == 0);
        }
        self.previous[line] = sense;

        self.line += 1;
        if self.line < C {
            return None;
        }

        self.line = 0;
        let keymap = self.keymap;
        Some(self.accumulator.finish(|code| keymap.remap(code)))
    }

    /// Strobe line scanned by the next tick.
    pub fn line(&self) -> usize {
        self.line
    }
}
