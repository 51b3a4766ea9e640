//! State shared between the scan tick and the LED tick.
//!
//! Both ticks run as interrupt handlers; every access goes through
//! `critical_section::with`, which restores the previous interrupt state on
//! exit.

use core::cell::{Cell, RefCell};

use critical_section::Mutex;
use heapless::Vec;

use crate::accumulator::{KeyPos, PressedSet};
use crate::config::MAX_KEYS;
use crate::coordinator::Mode;
use crate::lighting::LightingSettings;

/// A `Copy` value behind a critical section.
pub struct Shared<T: Copy> {
    inner: Mutex<Cell<T>>,
}

impl<T: Copy> Shared<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(Cell::new(value)),
        }
    }

    pub fn get(&self) -> T {
        critical_section::with(|cs| self.inner.borrow(cs).get())
    }

    pub fn set(&self, value: T) {
        critical_section::with(|cs| self.inner.borrow(cs).set(value));
    }

    /// Replace the value with `f(value)` atomically and return the new value.
    pub fn update(&self, f: impl FnOnce(T) -> T) -> T {
        critical_section::with(|cs| {
            let cell = self.inner.borrow(cs);
            let value = f(cell.get());
            cell.set(value);
            value
        })
    }
}

/// Single-slot mailbox. Posting overwrites an unread value.
pub struct Mailbox<T> {
    slot: Mutex<RefCell<Option<T>>>,
}

impl<T> Mailbox<T> {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(RefCell::new(None)),
        }
    }

    pub fn post(&self, value: T) {
        critical_section::with(|cs| {
            self.slot.borrow_ref_mut(cs).replace(value);
        });
    }

    pub fn take(&self) -> Option<T> {
        critical_section::with(|cs| self.slot.borrow_ref_mut(cs).take())
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Positions of the keys reported in one scan cycle.
pub type TouchSnapshot = Vec<KeyPos, MAX_KEYS>;

/// Snapshot the key positions of a pressed set for the LED tick.
pub fn touch_snapshot<const N: usize>(keys: &PressedSet<N>) -> TouchSnapshot {
    keys.iter().map(|k| k.pos).take(MAX_KEYS).collect()
}

/// Everything the two tick contexts exchange.
pub struct SharedState {
    /// Written by the scan tick, mirrored on the status LED.
    pub mode: Shared<Mode>,
    /// Written by the editor, read by the LED tick.
    pub lighting: Shared<LightingSettings>,
    /// Keys of the latest non-empty scan cycle, for touch lighting.
    pub touches: Mailbox<TouchSnapshot>,
}

impl SharedState {
    pub const fn new() -> Self {
        Self {
            mode: Shared::new(Mode::NormalType),
            lighting: Shared::new(LightingSettings::DEFAULT),
            touches: Mailbox::new(),
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
