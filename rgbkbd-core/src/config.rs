//! Board configuration: matrix and grid dimensions, tick periods and the LED
//! wiring table for the current hardware revision.

use crate::keycode::Keycode;
use crate::led::{LedAddress, LedConfig};

/// Sense lines read per strobe (logical rows).
pub const ROWS: usize = 5;
/// Strobed scan lines (logical columns).
pub const COLS: usize = 16;

/// Maximum number of ordinary keys in one HID report.
pub const MAX_KEYS: usize = 6;

/// LED grid width, one cell per key column.
pub const GRID_WIDTH: usize = 16;
/// LED grid height, one cell per key row.
pub const GRID_HEIGHT: usize = 5;

/// Cathode lines, selected one at a time through the decoder on PORTA.
pub const LED_STEPS: usize = 10;
/// RGB anodes per cathode. Each anode has a red, green and blue line.
pub const LED_ANODES: usize = 8;

/// LED tick period and dwell time of one multiplex step
/// (Timer2 CTC, 16 MHz / 128 / 188).
pub const LED_STEP_US: u32 = 1_504;
/// Longest refresh cycle that stays above the flicker-fusion threshold.
pub const MAX_REFRESH_US: u32 = 1_000_000 / 60;

/// Lighting ticks between wave moves (about one second).
pub const WAVE_INTERVAL: u16 = 62;
/// Lighting ticks between snake moves.
pub const SNAKE_INTERVAL: u16 = 6;
/// Per-tick fade applied to every channel in touch mode.
pub const TOUCH_DECAY: u8 = 16;

/// Scan ticks without activity before the keep-alive key is sent
/// (about four minutes at 1 kHz).
pub const IDLE_KEEPALIVE_TICKS: u32 = 240_000;
/// Key tapped by the idle keep-alive. F24 has no default binding.
pub const KEEPALIVE_KEY: Keycode = Keycode::F24;

const fn a(step: u8, anode: u8) -> Option<LedAddress> {
    Some(LedAddress { step, anode })
}

/// Physical wiring of every grid cell: `LED_ADDRESSES[y][x]`.
///
/// Revision B routes each cathode to eight consecutive LEDs of one
/// half-row.
#[rustfmt::skip]
pub static LED_ADDRESSES: [[Option<LedAddress>; GRID_WIDTH]; GRID_HEIGHT] = [
    [a(0, 0), a(0, 1), a(0, 2), a(0, 3), a(0, 4), a(0, 5), a(0, 6), a(0, 7),
     a(1, 0), a(1, 1), a(1, 2), a(1, 3), a(1, 4), a(1, 5), a(1, 6), a(1, 7)],
    [a(2, 0), a(2, 1), a(2, 2), a(2, 3), a(2, 4), a(2, 5), a(2, 6), a(2, 7),
     a(3, 0), a(3, 1), a(3, 2), a(3, 3), a(3, 4), a(3, 5), a(3, 6), a(3, 7)],
    [a(4, 0), a(4, 1), a(4, 2), a(4, 3), a(4, 4), a(4, 5), a(4, 6), a(4, 7),
     a(5, 0), a(5, 1), a(5, 2), a(5, 3), a(5, 4), a(5, 5), a(5, 6), a(5, 7)],
    [a(6, 0), a(6, 1), a(6, 2), a(6, 3), a(6, 4), a(6, 5), a(6, 6), a(6, 7),
     a(7, 0), a(7, 1), a(7, 2), a(7, 3), a(7, 4), a(7, 5), a(7, 6), a(7, 7)],
    [a(8, 0), a(8, 1), a(8, 2), a(8, 3), a(8, 4), a(8, 5), a(8, 6), a(8, 7),
     a(9, 0), a(9, 1), a(9, 2), a(9, 3), a(9, 4), a(9, 5), a(9, 6), a(9, 7)],
];

/// LED wiring and timing of this board, checked at startup.
pub static LED_CONFIG: LedConfig<GRID_WIDTH, GRID_HEIGHT> = LedConfig {
    addresses: &LED_ADDRESSES,
    steps: LED_STEPS as u8,
    anodes: LED_ANODES as u8,
    step_us: LED_STEP_US,
};
