//! Logical LED grid and the multiplex engine that projects it onto the
//! driver lines.
//!
//! The LEDs are common-cathode RGB parts. One cathode line ("step") is
//! selected at a time, and for that step the red, green and blue lines of
//! up to eight anodes are energized. Cycling through every step is one
//! refresh cycle.
//!
//! Intensity is rendered with 8-frame software PWM: the frame counter
//! advances once per refresh cycle and a channel is lit in frame `f` when
//! `f < (value + 1) * 8 / 256`. Fully on and fully off survive unchanged.

use crate::config::MAX_REFRESH_US;
use crate::error::ConfigError;

/// 8-bit-per-channel colour.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Rgb = Rgb::new(0, 0, 0);
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn is_off(self) -> bool {
        self == Rgb::OFF
    }

    /// Every channel reduced by `amount`, stopping at zero.
    pub fn fade(self, amount: u8) -> Self {
        Self {
            r: self.r.saturating_sub(amount),
            g: self.g.saturating_sub(amount),
            b: self.b.saturating_sub(amount),
        }
    }
}

/// `W` × `H` colours, indexed `(x, y)`.
///
/// Coordinates outside the grid are a programming error and panic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedGrid<const W: usize, const H: usize> {
    cells: [[Rgb; W]; H],
}

impl<const W: usize, const H: usize> LedGrid<W, H> {
    pub const fn new() -> Self {
        Self {
            cells: [[Rgb::OFF; W]; H],
        }
    }

    pub const fn width(&self) -> usize {
        W
    }

    pub const fn height(&self) -> usize {
        H
    }

    pub fn get(&self, x: usize, y: usize) -> Rgb {
        Self::check(x, y);
        self.cells[y][x]
    }

    pub fn set(&mut self, x: usize, y: usize, colour: Rgb) {
        Self::check(x, y);
        self.cells[y][x] = colour;
    }

    pub fn fill(&mut self, colour: Rgb) {
        for row in self.cells.iter_mut() {
            row.fill(colour);
        }
    }

    pub fn clear(&mut self) {
        self.fill(Rgb::OFF);
    }

    /// Apply `f` to every cell.
    pub fn map_cells(&mut self, mut f: impl FnMut(Rgb) -> Rgb) {
        for cell in self.cells.iter_mut().flat_map(|row| row.iter_mut()) {
            *cell = f(*cell);
        }
    }

    /// Every cell as `(x, y, colour)`, row by row.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, Rgb)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .flat_map(|(y, row)| row.iter().enumerate().map(move |(x, c)| (x, y, *c)))
    }

    fn check(x: usize, y: usize) {
        assert!(x < W && y < H, "LED ({}, {}) outside {}x{} grid", x, y, W, H);
    }
}

impl<const W: usize, const H: usize> Default for LedGrid<W, H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Where one RGB LED is wired: cathode step and anode index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LedAddress {
    pub step: u8,
    pub anode: u8,
}

/// Lines to energize while cathode `step` is selected. Bit `n` of each mask
/// is anode `n`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DriverPattern {
    pub step: u8,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl DriverPattern {
    pub const fn blank(step: u8) -> Self {
        Self {
            step,
            red: 0,
            green: 0,
            blue: 0,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.red | self.green | self.blue == 0
    }
}

/// Output lines of the LED matrix.
pub trait DriverLines {
    /// Select `pattern.step` and energize its anode lines.
    fn set_driver_lines(&mut self, pattern: &DriverPattern);
    /// De-energize every anode and cathode line.
    fn clear_driver_lines(&mut self);
}

/// Frames in one software PWM sequence.
pub const PWM_FRAMES: u8 = 8;

/// Rank of each frame in the PWM sequence, bit-reversed so the lit frames
/// of a partial intensity are spread out instead of forming one block.
const FRAME_ORDER: [u8; PWM_FRAMES as usize] = [0, 4, 2, 6, 1, 5, 3, 7];

/// Whether a channel of intensity `value` is lit in PWM frame `frame`.
pub fn channel_lit(value: u8, frame: u8) -> bool {
    let threshold = (value as u16 + 1) * PWM_FRAMES as u16 / 256;
    (FRAME_ORDER[(frame % PWM_FRAMES) as usize] as u16) < threshold
}

/// Wiring and timing of an LED matrix.
#[derive(Copy, Clone, Debug)]
pub struct LedConfig<const W: usize, const H: usize> {
    /// Driver address of every grid cell, `addresses[y][x]`.
    pub addresses: &'static [[Option<LedAddress>; W]; H],
    /// Cathode lines.
    pub steps: u8,
    /// Anodes per cathode, at most 8.
    pub anodes: u8,
    /// Dwell time of one step.
    pub step_us: u32,
}

impl<const W: usize, const H: usize> LedConfig<W, H> {
    /// Duration of one full refresh cycle.
    pub fn refresh_us(&self) -> u32 {
        self.steps as u32 * self.step_us
    }

    /// Full-grid refresh rate in Hz.
    pub fn refresh_hz(&self) -> u32 {
        match self.refresh_us() {
            0 => 0,
            us => 1_000_000 / us,
        }
    }

    /// Driver address of cell `(x, y)`. Panics outside the grid.
    pub fn address(&self, x: usize, y: usize) -> Option<LedAddress> {
        self.addresses[y][x]
    }

    /// Check that every cell is wired to a distinct LED that exists and
    /// that the whole grid refreshes fast enough to avoid flicker.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.check()
            .inspect_err(|e| log::warn!("LED configuration rejected: {}", e))
    }

    fn check(&self) -> Result<(), ConfigError> {
        let anodes = self.anodes.min(8);

        for (y, row) in self.addresses.iter().enumerate() {
            for (x, addr) in row.iter().enumerate() {
                let addr = addr.ok_or(ConfigError::MissingAddress { x, y })?;
                if addr.step >= self.steps {
                    return Err(ConfigError::StepOutOfRange {
                        x,
                        y,
                        step: addr.step,
                    });
                }
                if addr.anode >= anodes {
                    return Err(ConfigError::AnodeOutOfRange {
                        x,
                        y,
                        anode: addr.anode,
                    });
                }
                // Compare against every cell before this one
                let earlier = y * W + x;
                if let Some(i) = (0..earlier).find(|&i| self.address(i % W, i / W) == Some(addr)) {
                    return Err(ConfigError::DuplicateAddress {
                        first: (i % W, i / W),
                        second: (x, y),
                    });
                }
            }
        }

        let refresh_us = self.refresh_us();
        if refresh_us > MAX_REFRESH_US {
            return Err(ConfigError::RefreshTooSlow {
                refresh_us,
                limit_us: MAX_REFRESH_US,
            });
        }
        Ok(())
    }
}

/// Drives the LED matrix one step per call.
pub struct Multiplexer<const W: usize, const H: usize> {
    config: LedConfig<W, H>,
    /// Step rendered by the next call.
    step: u8,
    frame: u8,
}

impl<const W: usize, const H: usize> Multiplexer<W, H> {
    pub const fn new(config: LedConfig<W, H>) -> Self {
        Self {
            config,
            step: 0,
            frame: 0,
        }
    }

    pub fn config(&self) -> &LedConfig<W, H> {
        &self.config
    }

    /// True when the next call starts a new refresh cycle.
    pub fn at_cycle_start(&self) -> bool {
        self.step == 0
    }

    pub fn frame(&self) -> u8 {
        self.frame
    }

    /// Driver pattern of `step` for the current PWM frame.
    pub fn pattern(&self, grid: &LedGrid<W, H>, step: u8) -> DriverPattern {
        let mut pattern = DriverPattern::blank(step);
        for (x, y, colour) in grid.cells() {
            let addr = match self.config.address(x, y) {
                Some(addr) if addr.step == step => addr,
                _ => continue,
            };
            debug_assert!(addr.anode < 8, "anode {} of ({}, {}) has no line", addr.anode, x, y);
            let bit = 1 << addr.anode;
            if channel_lit(colour.r, self.frame) {
                pattern.red |= bit;
            }
            if channel_lit(colour.g, self.frame) {
                pattern.green |= bit;
            }
            if channel_lit(colour.b, self.frame) {
                pattern.blue |= bit;
            }
        }
        pattern
    }

    /// Render the next step: clear every line, then energize the lines of
    /// this step. They stay on until the next call.
    pub fn refresh_step(&mut self, grid: &LedGrid<W, H>, lines: &mut impl DriverLines) -> DriverPattern {
        let pattern = self.pattern(grid, self.step);
        lines.clear_driver_lines();
        lines.set_driver_lines(&pattern);

        self.step += 1;
        if self.step >= self.config.steps {
            self.step = 0;
            self.frame = (self.frame + 1) % PWM_FRAMES;
        }
        pattern
    }

    /// De-energize everything and restart at step 0.
    pub fn blank(&mut self, lines: &mut impl DriverLines) {
        lines.clear_driver_lines();
        self.step = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GRID_HEIGHT, GRID_WIDTH, LED_CONFIG};
    use std::vec::Vec;

    #[derive(Default)]
    struct RecordingLines {
        set: Vec<DriverPattern>,
        clears: usize,
        /// Lines currently energized
        active: Option<DriverPattern>,
    }

    impl DriverLines for RecordingLines {
        fn set_driver_lines(&mut self, pattern: &DriverPattern) {
            assert!(self.active.is_none(), "lines set without clearing");
            self.active = Some(*pattern);
            self.set.push(*pattern);
        }

        fn clear_driver_lines(&mut self) {
            self.active = None;
            self.clears += 1;
        }
    }

    type BoardGrid = LedGrid<GRID_WIDTH, GRID_HEIGHT>;

    #[test]
    fn test_pwm_thresholds() {
        for frame in 0..PWM_FRAMES {
            assert!(!channel_lit(0, frame));
            assert!(channel_lit(255, frame));
        }
        let lit = |v| (0..PWM_FRAMES).filter(|&f| channel_lit(v, f)).count();
        assert_eq!(lit(31), 1);
        assert_eq!(lit(127), 4);
        assert_eq!(lit(30), 0);
    }

    #[test]
    fn test_partial_intensity_never_blinks() {
        // Longest run of identical on/off frames over two PWM sequences
        let longest_run = |value: u8| {
            let lit: Vec<bool> = (0..2 * PWM_FRAMES).map(|f| channel_lit(value, f)).collect();
            let mut longest = 1;
            let mut run = 1;
            for pair in lit.windows(2) {
                run = if pair[0] == pair[1] { run + 1 } else { 1 };
                longest = longest.max(run);
            }
            longest
        };
        assert_eq!(longest_run(127), 1);
        for value in [63u8, 95, 127, 159, 191] {
            assert!(longest_run(value) <= 3, "value {} holds for {} frames", value, longest_run(value));
        }
    }

    #[test]
    fn test_half_intensity_alternates_per_refresh_cycle() {
        let mut grid = BoardGrid::new();
        grid.set(3, 1, Rgb::new(127, 0, 0));
        let step = LED_CONFIG.address(3, 1).unwrap().step;
        let mut mux = Multiplexer::new(LED_CONFIG);
        let mut lines = RecordingLines::default();
        for _ in 0..16 * LED_CONFIG.steps as usize {
            mux.refresh_step(&grid, &mut lines);
        }
        let cycles: Vec<bool> = lines
            .set
            .iter()
            .filter(|p| p.step == step)
            .map(|p| p.red != 0)
            .collect();
        assert_eq!(cycles.len(), 16);
        assert!(cycles.windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    #[should_panic]
    fn test_address_outside_grid_panics() {
        LED_CONFIG.address(GRID_WIDTH, 0);
    }

    #[test]
    #[should_panic]
    fn test_grid_out_of_range_panics() {
        let grid = BoardGrid::new();
        grid.get(GRID_WIDTH, 0);
    }

    #[test]
    fn test_fade_saturates() {
        assert_eq!(Rgb::new(20, 5, 0).fade(16), Rgb::new(4, 0, 0));
        assert!(Rgb::WHITE.fade(255).is_off());
    }

    #[test]
    fn test_board_config_is_valid() {
        assert_eq!(LED_CONFIG.validate(), Ok(()));
        assert_eq!(LED_CONFIG.refresh_us(), 15_040);
        assert_eq!(LED_CONFIG.refresh_hz(), 66);
    }

    #[test]
    fn test_binary_grid_round_trip() {
        let mut grid = BoardGrid::new();
        grid.set(0, 0, Rgb::RED);
        grid.set(9, 2, Rgb::new(255, 0, 255));
        grid.set(15, 4, Rgb::WHITE);
        grid.set(7, 3, Rgb::GREEN);

        let mut mux = Multiplexer::new(LED_CONFIG);
        let mut lines = RecordingLines::default();
        for _ in 0..LED_CONFIG.steps {
            mux.refresh_step(&grid, &mut lines);
        }
        assert_eq!(lines.set.len(), LED_CONFIG.steps as usize);
        assert_eq!(lines.clears, LED_CONFIG.steps as usize);

        let mut rebuilt = BoardGrid::new();
        for pattern in &lines.set {
            for (x, y, _) in grid.cells() {
                let addr = LED_CONFIG.address(x, y).unwrap();
                if addr.step != pattern.step {
                    continue;
                }
                let on = |mask: u8| if mask & (1 << addr.anode) != 0 { 255 } else { 0 };
                rebuilt.set(x, y, Rgb::new(on(pattern.red), on(pattern.green), on(pattern.blue)));
            }
        }
        assert_eq!(rebuilt, grid);
    }

    #[test]
    fn test_steps_wrap_and_advance_frame() {
        let grid = BoardGrid::new();
        let mut mux = Multiplexer::new(LED_CONFIG);
        let mut lines = RecordingLines::default();
        assert!(mux.at_cycle_start());
        for _ in 0..LED_CONFIG.steps {
            mux.refresh_step(&grid, &mut lines);
        }
        assert!(mux.at_cycle_start());
        assert_eq!(mux.frame(), 1);
        let steps: Vec<u8> = lines.set.iter().map(|p| p.step).collect();
        assert_eq!(steps, (0..LED_CONFIG.steps).collect::<Vec<_>>());
        assert!(lines.set.iter().all(|p| p.is_blank()));
    }

    #[test]
    fn test_half_intensity_lit_half_the_frames() {
        let mut grid = BoardGrid::new();
        grid.set(3, 1, Rgb::new(0, 0, 127));
        let mut mux = Multiplexer::new(LED_CONFIG);
        let mut lines = RecordingLines::default();
        for _ in 0..LED_CONFIG.steps as usize * PWM_FRAMES as usize {
            mux.refresh_step(&grid, &mut lines);
        }
        let lit = lines.set.iter().filter(|p| p.blue != 0).count();
        assert_eq!(lit, 4);
    }

    static MISSING: [[Option<LedAddress>; 2]; 1] =
        [[Some(LedAddress { step: 0, anode: 0 }), None]];
    static DUPLICATE: [[Option<LedAddress>; 2]; 2] = [
        [Some(LedAddress { step: 0, anode: 0 }), Some(LedAddress { step: 0, anode: 1 })],
        [Some(LedAddress { step: 1, anode: 0 }), Some(LedAddress { step: 0, anode: 1 })],
    ];
    static BAD_STEP: [[Option<LedAddress>; 1]; 1] = [[Some(LedAddress { step: 2, anode: 0 })]];
    static BAD_ANODE: [[Option<LedAddress>; 1]; 1] = [[Some(LedAddress { step: 0, anode: 8 })]];

    #[test]
    fn test_validate_errors() {
        let missing = LedConfig { addresses: &MISSING, steps: 2, anodes: 8, step_us: 1_000 };
        assert_eq!(missing.validate(), Err(ConfigError::MissingAddress { x: 1, y: 0 }));

        let duplicate = LedConfig { addresses: &DUPLICATE, steps: 2, anodes: 8, step_us: 1_000 };
        assert_eq!(
            duplicate.validate(),
            Err(ConfigError::DuplicateAddress { first: (1, 0), second: (1, 1) })
        );

        let bad_step = LedConfig { addresses: &BAD_STEP, steps: 2, anodes: 8, step_us: 1_000 };
        assert_eq!(
            bad_step.validate(),
            Err(ConfigError::StepOutOfRange { x: 0, y: 0, step: 2 })
        );

        let bad_anode = LedConfig { addresses: &BAD_ANODE, steps: 2, anodes: 8, step_us: 1_000 };
        assert_eq!(
            bad_anode.validate(),
            Err(ConfigError::AnodeOutOfRange { x: 0, y: 0, anode: 8 })
        );

        // Masks are 8 bits wide whatever the config claims
        let wide = LedConfig { addresses: &BAD_ANODE, steps: 2, anodes: 16, step_us: 1_000 };
        assert_eq!(
            wide.validate(),
            Err(ConfigError::AnodeOutOfRange { x: 0, y: 0, anode: 8 })
        );
        let slow = LedConfig { addresses: &BAD_STEP, steps: 12, anodes: 8, step_us: 1_504 };
        assert_eq!(
            slow.validate(),
            Err(ConfigError::RefreshTooSlow { refresh_us: 18_048, limit_us: MAX_REFRESH_US })
        );
    }
}
