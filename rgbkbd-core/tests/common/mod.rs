#![allow(dead_code)]

use rgbkbd_core::{DriverLines, DriverPattern, HidTransport, Keycode, ModifierMask, PressedSet, ScanLines, SenseMask};

// Init logger for tests
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// Switch matrix with a fixed set of closed switches.
pub struct TestMatrix<const C: usize> {
    closed: [SenseMask; C],
    strobed: usize,
}

impl<const C: usize> TestMatrix<C> {
    pub fn new() -> Self {
        Self {
            closed: [0; C],
            strobed: 0,
        }
    }

    pub fn press(&mut self, row: usize, col: usize) {
        self.closed[col] |= 1 << row;
    }

    pub fn release(&mut self, row: usize, col: usize) {
        self.closed[col] &= !(1 << row);
    }

    pub fn release_all(&mut self) {
        self.closed = [0; C];
    }
}

impl<const C: usize> ScanLines for TestMatrix<C> {
    fn strobe(&mut self, line: usize) {
        self.strobed = line;
    }

    fn read_sense(&mut self) -> SenseMask {
        self.closed[self.strobed]
    }
}

/// What the host would have received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Report(Vec<Keycode>, u8),
    Single(Keycode),
}

#[derive(Default)]
pub struct TestHid {
    pub events: Vec<HostEvent>,
}

impl TestHid {
    pub fn reports(&self) -> Vec<(Vec<Keycode>, u8)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                HostEvent::Report(keys, mods) => Some((keys.clone(), *mods)),
                HostEvent::Single(_) => None,
            })
            .collect()
    }

    /// Reports that carried at least one key.
    pub fn typed(&self) -> Vec<Keycode> {
        self.reports().into_iter().flat_map(|(keys, _)| keys).collect()
    }
}

impl HidTransport for TestHid {
    fn send_report<const N: usize>(&mut self, keys: &PressedSet<N>, modifiers: ModifierMask) {
        self.events
            .push(HostEvent::Report(keys.codes().collect(), modifiers.bits()));
    }

    fn press_single_key(&mut self, code: Keycode, _modifiers: ModifierMask) {
        self.events.push(HostEvent::Single(code));
    }
}

/// LED driver lines that remember every pattern they were given.
#[derive(Default)]
pub struct TestDriver {
    pub patterns: Vec<DriverPattern>,
    pub energized: bool,
}

impl DriverLines for TestDriver {
    fn set_driver_lines(&mut self, pattern: &DriverPattern) {
        assert!(!self.energized, "two steps energized at once");
        self.energized = true;
        self.patterns.push(*pattern);
    }

    fn clear_driver_lines(&mut self) {
        self.energized = false;
    }
}
