//! Keyboard and lighting logic for the RGB keyboard.
//!
//! This crate is `no_std`-compatible so it can be used by both the AVR
//! firmware and the native CLI tool. Hardware access goes through the
//! [`ScanLines`], [`DriverLines`] and [`HidTransport`] traits.

#![cfg_attr(not(test), no_std)]

pub mod accumulator;
pub mod config;
pub mod coordinator;
pub mod editor;
pub mod error;
pub mod keycode;
pub mod keymap;
pub mod led;
pub mod lighting;
pub mod report;
pub mod scanner;
pub mod shared;

pub use accumulator::{CycleReport, KeyPos, PressedKey, PressedSet};
pub use coordinator::{Coordinator, HidTransport, Keyboard, Mode};
pub use error::ConfigError;
pub use keycode::{Keycode, ModifierMask};
pub use keymap::Keymap;
pub use led::{DriverLines, DriverPattern, LedAddress, LedConfig, LedGrid, Multiplexer, Rgb};
pub use lighting::{Animation, LightingEngine, LightingMode, LightingSettings};
pub use report::KeyboardReport;
pub use scanner::{ScanLines, Scanner, SenseMask};
pub use shared::{Mailbox, Shared, SharedState};

/// The scan-tick state of this board.
pub type BoardKeyboard = Keyboard<{ config::ROWS }, { config::COLS }, { config::MAX_KEYS }>;
/// The LED-tick state of this board.
pub type BoardLighting = LightingEngine<{ config::GRID_WIDTH }, { config::GRID_HEIGHT }>;
