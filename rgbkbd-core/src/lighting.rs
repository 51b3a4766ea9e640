//! Lighting modes and their per-tick animation.
//!
//! The animation runs once per refresh cycle, right before the multiplexer
//! renders step 0, so every refresh cycle shows one consistent frame.

use crate::accumulator::KeyPos;
use crate::config::{SNAKE_INTERVAL, TOUCH_DECAY, WAVE_INTERVAL};
use crate::led::{DriverLines, LedConfig, LedGrid, Multiplexer, Rgb};
use crate::shared::SharedState;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum LightingMode {
    /// Every LED shows the palette.
    #[default]
    Static,
    /// Pressed keys light up and fade out.
    Touch,
    /// A lit column sweeps toward the left edge.
    LeftWave,
    /// A lit column sweeps toward the right edge.
    RightWave,
    /// A single LED crawls through the grid column by column.
    Snake,
}

impl LightingMode {
    pub const ALL: [LightingMode; 5] = [
        LightingMode::Static,
        LightingMode::Touch,
        LightingMode::LeftWave,
        LightingMode::RightWave,
        LightingMode::Snake,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LightingMode::Static => "static",
            LightingMode::Touch => "touch",
            LightingMode::LeftWave => "left-wave",
            LightingMode::RightWave => "right-wave",
            LightingMode::Snake => "snake",
        }
    }
}

/// Lighting mode and the colour it paints with.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LightingSettings {
    pub mode: LightingMode,
    pub palette: Rgb,
}

impl LightingSettings {
    /// Power-on settings.
    pub const DEFAULT: LightingSettings = LightingSettings {
        mode: LightingMode::Static,
        palette: Rgb::WHITE,
    };
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    Static,
    Touch,
    Wave {
        x: usize,
        divider: u16,
    },
    Snake {
        x: usize,
        y: usize,
        down: bool,
        rightward: bool,
        divider: u16,
    },
}

impl State {
    fn initial(mode: LightingMode, width: usize) -> Self {
        match mode {
            LightingMode::Static => State::Static,
            LightingMode::Touch => State::Touch,
            LightingMode::LeftWave => State::Wave {
                x: width.saturating_sub(1),
                divider: 0,
            },
            LightingMode::RightWave => State::Wave { x: 0, divider: 0 },
            LightingMode::Snake => State::Snake {
                x: 0,
                y: 0,
                down: true,
                rightward: true,
                divider: 0,
            },
        }
    }
}

/// Count one tick; true once every `interval` ticks.
fn due(divider: &mut u16, interval: u16) -> bool {
    *divider += 1;
    if *divider >= interval {
        *divider = 0;
        true
    } else {
        false
    }
}

/// Lighting mode state machine for a `W` × `H` grid.
pub struct Animation<const W: usize, const H: usize> {
    settings: LightingSettings,
    state: State,
}

impl<const W: usize, const H: usize> Animation<W, H> {
    pub const fn new() -> Self {
        Self {
            settings: LightingSettings::DEFAULT,
            state: State::Static,
        }
    }

    pub fn settings(&self) -> LightingSettings {
        self.settings
    }

    /// Adopt new settings. A mode change restarts the animation on a dark
    /// grid; a palette change takes effect on the next tick.
    pub fn apply(&mut self, settings: LightingSettings, grid: &mut LedGrid<W, H>) {
        if settings.mode != self.settings.mode {
            log::debug!(
                "lighting mode {} -> {}",
                self.settings.mode.name(),
                settings.mode.name()
            );
            self.state = State::initial(settings.mode, W);
            grid.clear();
        }
        self.settings = settings;
    }

    /// Current position of the lit cell in snake mode.
    pub fn snake_head(&self) -> Option<(usize, usize)> {
        match self.state {
            State::Snake { x, y, .. } => Some((x, y)),
            _ => None,
        }
    }

    /// Current lit column in the wave modes.
    pub fn wave_column(&self) -> Option<usize> {
        match self.state {
            State::Wave { x, .. } => Some(x),
            _ => None,
        }
    }

    /// Advance the animation by one tick and redraw `grid`. `touches` holds
    /// the keys of the latest scan cycle, if one completed since the last
    /// tick.
    pub fn tick(&mut self, grid: &mut LedGrid<W, H>, touches: Option<&[KeyPos]>) {
        let palette = self.settings.palette;
        let leftward = self.settings.mode == LightingMode::LeftWave;

        match &mut self.state {
            State::Static => grid.fill(palette),
            State::Touch => {
                grid.map_cells(|c| c.fade(TOUCH_DECAY));
                for pos in touches.unwrap_or(&[]) {
                    let (x, y) = (pos.col as usize, pos.row as usize);
                    // Keys without an LED stay dark
                    if x < W && y < H {
                        grid.set(x, y, palette);
                    }
                }
            }
            State::Wave { x, divider } => {
                if due(divider, WAVE_INTERVAL) {
                    *x = match (leftward, *x) {
                        (true, 0) => W - 1,
                        (true, x) => x - 1,
                        (false, x) if x + 1 >= W => 0,
                        (false, x) => x + 1,
                    };
                }
                grid.clear();
                for y in 0..H {
                    grid.set(*x, y, palette);
                }
            }
            State::Snake {
                x,
                y,
                down,
                rightward,
                divider,
            } => {
                if due(divider, SNAKE_INTERVAL) {
                    let vertical = if *down { *y + 1 < H } else { *y > 0 };
                    if vertical {
                        if *down {
                            *y += 1;
                        } else {
                            *y -= 1;
                        }
                    } else {
                        // End of column: step sideways and turn around,
                        // bouncing off the outer columns.
                        *down = !*down;
                        if W > 1 {
                            if *rightward && *x + 1 >= W {
                                *rightward = false;
                            } else if !*rightward && *x == 0 {
                                *rightward = true;
                            }
                            if *rightward {
                                *x += 1;
                            } else {
                                *x -= 1;
                            }
                        }
                    }
                }
                grid.clear();
                grid.set(*x, *y, palette);
            }
        }
    }
}

impl<const W: usize, const H: usize> Default for Animation<W, H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the LED tick owns: the grid, its animation and the
/// multiplexer that displays it.
pub struct LightingEngine<const W: usize, const H: usize> {
    grid: LedGrid<W, H>,
    animation: Animation<W, H>,
    mux: Multiplexer<W, H>,
}

impl<const W: usize, const H: usize> LightingEngine<W, H> {
    pub const fn new(config: LedConfig<W, H>) -> Self {
        Self {
            grid: LedGrid::new(),
            animation: Animation::new(),
            mux: Multiplexer::new(config),
        }
    }

    /// One LED tick. At the start of a refresh cycle the shared settings and
    /// touches are picked up and the animation advances; then the next
    /// multiplex step is displayed.
    pub fn on_tick(&mut self, shared: &SharedState, lines: &mut impl DriverLines) {
        if self.mux.at_cycle_start() {
            self.animation.apply(shared.lighting.get(), &mut self.grid);
            let touches = shared.touches.take();
            self.animation.tick(&mut self.grid, touches.as_deref());
        }
        self.mux.refresh_step(&self.grid, lines);
    }

    pub fn grid(&self) -> &LedGrid<W, H> {
        &self.grid
    }

    /// Turn every LED off.
    pub fn blank(&mut self, lines: &mut impl DriverLines) {
        self.mux.blank(lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    type SmallAnim = Animation<4, 3>;
    type SmallGrid = LedGrid<4, 3>;

    fn settings(mode: LightingMode, palette: Rgb) -> LightingSettings {
        LightingSettings { mode, palette }
    }

    fn lit(grid: &SmallGrid) -> Vec<(usize, usize)> {
        grid.cells().filter(|(_, _, c)| !c.is_off()).map(|(x, y, _)| (x, y)).collect()
    }

    #[test]
    fn test_static_fills_palette() {
        let mut anim = SmallAnim::new();
        let mut grid = SmallGrid::new();
        anim.tick(&mut grid, None);
        assert!(grid.cells().all(|(_, _, c)| c == Rgb::WHITE));

        anim.apply(settings(LightingMode::Static, Rgb::BLUE), &mut grid);
        anim.tick(&mut grid, None);
        assert!(grid.cells().all(|(_, _, c)| c == Rgb::BLUE));
    }

    #[test]
    fn test_mode_change_clears_grid() {
        let mut anim = SmallAnim::new();
        let mut grid = SmallGrid::new();
        anim.tick(&mut grid, None);
        anim.apply(settings(LightingMode::Touch, Rgb::RED), &mut grid);
        assert!(lit(&grid).is_empty());
    }

    #[test]
    fn test_touch_lights_and_decays() {
        let mut anim = SmallAnim::new();
        let mut grid = SmallGrid::new();
        anim.apply(settings(LightingMode::Touch, Rgb::RED), &mut grid);

        anim.tick(&mut grid, Some(&[KeyPos::new(1, 2), KeyPos::new(4, 15)]));
        assert_eq!(grid.get(2, 1), Rgb::RED);
        assert_eq!(lit(&grid), vec![(2, 1)]);

        anim.tick(&mut grid, None);
        assert_eq!(grid.get(2, 1), Rgb::new(255 - TOUCH_DECAY, 0, 0));

        for _ in 0..255 / TOUCH_DECAY as usize + 1 {
            anim.tick(&mut grid, None);
        }
        assert!(lit(&grid).is_empty());
    }

    #[test]
    fn test_right_wave_wraps() {
        let mut anim = SmallAnim::new();
        let mut grid = SmallGrid::new();
        anim.apply(settings(LightingMode::RightWave, Rgb::GREEN), &mut grid);
        anim.tick(&mut grid, None);
        assert_eq!(lit(&grid), vec![(0, 0), (0, 1), (0, 2)]);

        let mut columns = vec![];
        for _ in 0..WAVE_INTERVAL as usize * 4 {
            anim.tick(&mut grid, None);
            columns.push(anim.wave_column().unwrap());
        }
        // Moves once every interval and wraps back to the left edge
        let moves: Vec<usize> = columns
            .iter()
            .skip(WAVE_INTERVAL as usize - 2)
            .step_by(WAVE_INTERVAL as usize)
            .copied()
            .collect();
        assert_eq!(moves, vec![1, 2, 3, 0]);
    }

    #[test]
    fn test_left_wave_moves_left() {
        let mut anim = SmallAnim::new();
        let mut grid = SmallGrid::new();
        anim.apply(settings(LightingMode::LeftWave, Rgb::GREEN), &mut grid);
        anim.tick(&mut grid, None);
        assert_eq!(anim.wave_column(), Some(3));
        for _ in 0..WAVE_INTERVAL {
            anim.tick(&mut grid, None);
        }
        assert_eq!(anim.wave_column(), Some(2));
        for _ in 0..WAVE_INTERVAL as usize * 2 {
            anim.tick(&mut grid, None);
        }
        assert_eq!(anim.wave_column(), Some(0));
        for _ in 0..WAVE_INTERVAL {
            anim.tick(&mut grid, None);
        }
        assert_eq!(anim.wave_column(), Some(3));
    }

    fn snake_path<const W: usize, const H: usize>(moves: usize) -> Vec<(usize, usize)> {
        let mut anim = Animation::<W, H>::new();
        let mut grid = LedGrid::<W, H>::new();
        anim.apply(settings(LightingMode::Snake, Rgb::WHITE), &mut grid);
        let mut path = vec![];
        anim.tick(&mut grid, None);
        path.push(anim.snake_head().unwrap());
        while path.len() < moves {
            for _ in 0..SNAKE_INTERVAL {
                anim.tick(&mut grid, None);
                let lit: Vec<_> = grid.cells().filter(|(_, _, c)| !c.is_off()).collect();
                assert_eq!(lit.len(), 1);
            }
            path.push(anim.snake_head().unwrap());
        }
        path
    }

    #[test]
    fn test_snake_serpentine_and_bounce() {
        let path = snake_path::<3, 2>(9);
        assert_eq!(
            path,
            vec![(0, 0), (0, 1), (1, 1), (1, 0), (2, 0), (2, 1), (1, 1), (1, 0), (0, 0)]
        );
    }

    #[test]
    fn test_snake_visits_every_cell_in_bounds() {
        let path = snake_path::<16, 5>(16 * 5 * 3);
        assert!(path.iter().all(|&(x, y)| x < 16 && y < 5));
        let first: HashSet<_> = path[..16 * 5].iter().copied().collect();
        assert_eq!(first.len(), 16 * 5);
    }

    #[test]
    fn test_single_column_snake() {
        let path = snake_path::<1, 3>(6);
        assert_eq!(path, vec![(0, 0), (0, 1), (0, 2), (0, 2), (0, 1), (0, 0)]);
    }
}
