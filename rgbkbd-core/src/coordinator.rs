//! Mode coordinator: routes each completed scan cycle to the host or to the
//! lighting editor.

use crate::accumulator::{CycleReport, PressedSet};
use crate::config::{IDLE_KEEPALIVE_TICKS, KEEPALIVE_KEY};
use crate::editor;
use crate::keycode::{Keycode, ModifierMask};
use crate::keymap::Keymap;
use crate::scanner::{ScanLines, Scanner};
use crate::shared::{touch_snapshot, SharedState};

/// Top-level keyboard mode.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Keys go to the host.
    #[default]
    NormalType,
    /// Keys configure the lighting.
    Editor,
}

/// USB HID keyboard endpoint. Delivery is best effort.
pub trait HidTransport {
    /// Report `keys` with `modifiers` held.
    fn send_report<const N: usize>(&mut self, keys: &PressedSet<N>, modifiers: ModifierMask);
    /// Press and release a single key.
    fn press_single_key(&mut self, code: Keycode, modifiers: ModifierMask);
}

pub struct Coordinator {
    mode: Mode,
    idle_ticks: u32,
    idle_limit: u32,
    last_modifiers: ModifierMask,
}

impl Coordinator {
    pub const fn new() -> Self {
        Self::with_idle_limit(IDLE_KEEPALIVE_TICKS)
    }

    /// Coordinator sending the keep-alive after `idle_limit` idle scan ticks.
    pub const fn with_idle_limit(idle_limit: u32) -> Self {
        Self {
            mode: Mode::NormalType,
            idle_ticks: 0,
            idle_limit,
            last_modifiers: ModifierMask::EMPTY,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn idle_ticks(&self) -> u32 {
        self.idle_ticks
    }

    /// Count one scan tick toward the idle keep-alive.
    pub fn on_scan_tick(&mut self, hid: &mut impl HidTransport) {
        if self.mode != Mode::NormalType {
            self.idle_ticks = 0;
            return;
        }
        self.idle_ticks += 1;
        if self.idle_ticks >= self.idle_limit {
            log::debug!("idle for {} ticks, sending keep-alive", self.idle_ticks);
            hid.press_single_key(KEEPALIVE_KEY, ModifierMask::EMPTY);
            self.idle_ticks = 0;
        }
    }

    /// Handle a completed scan cycle.
    pub fn on_cycle<const N: usize>(
        &mut self,
        report: CycleReport<N>,
        hid: &mut impl HidTransport,
        shared: &SharedState,
    ) {
        let CycleReport { mut keys, modifiers } = report;

        if !keys.is_empty() {
            shared.touches.post(touch_snapshot(&keys));
        }

        match self.mode {
            Mode::NormalType => {
                let enter_editor = keys.remove(Keycode::EditorMode);
                if enter_editor || !keys.is_empty() || modifiers != self.last_modifiers {
                    self.idle_ticks = 0;
                }
                self.last_modifiers = modifiers;

                hid.send_report(&keys, modifiers);

                if enter_editor {
                    self.switch(Mode::Editor, shared);
                }
            }
            Mode::Editor => {
                if editor::interpret(&keys, &shared.lighting) {
                    self.switch(Mode::NormalType, shared);
                }
            }
        }
    }

    fn switch(&mut self, mode: Mode, shared: &SharedState) {
        log::debug!("mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        self.idle_ticks = 0;
        self.last_modifiers = ModifierMask::EMPTY;
        shared.mode.set(mode);
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the scan tick owns.
pub struct Keyboard<const R: usize, const C: usize, const N: usize> {
    scanner: Scanner<R, C, N>,
    coordinator: Coordinator,
}

impl<const R: usize, const C: usize, const N: usize> Keyboard<R, C, N> {
    pub const fn new(keymap: Keymap<R, C>) -> Self {
        Self::with_coordinator(keymap, Coordinator::new())
    }

    pub const fn with_coordinator(keymap: Keymap<R, C>, coordinator: Coordinator) -> Self {
        Self {
            scanner: Scanner::new(keymap),
            coordinator,
        }
    }

    /// One scan tick: scan the next line and, after the last one, hand the
    /// cycle to the coordinator.
    pub fn tick(&mut self, lines: &mut impl ScanLines, hid: &mut impl HidTransport, shared: &SharedState) {
        self.coordinator.on_scan_tick(hid);
        if let Some(report) = self.scanner.tick(lines) {
            self.coordinator.on_cycle(report, hid, shared);
        }
    }

    pub fn mode(&self) -> Mode {
        self.coordinator.mode()
    }
}
