//! Terminal preview of the lighting modes, running the same animation the
//! firmware runs on its LED tick.

use clap::ValueEnum;
use rgbkbd_core::config::{GRID_HEIGHT, GRID_WIDTH};
use rgbkbd_core::{Animation, KeyPos, LedGrid, LightingMode, LightingSettings, Rgb};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Static,
    Touch,
    LeftWave,
    RightWave,
    Snake,
}

impl From<ModeArg> for LightingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Static => LightingMode::Static,
            ModeArg::Touch => LightingMode::Touch,
            ModeArg::LeftWave => LightingMode::LeftWave,
            ModeArg::RightWave => LightingMode::RightWave,
            ModeArg::Snake => LightingMode::Snake,
        }
    }
}

/// The palette colours the editor can select.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PaletteArg {
    Red,
    Green,
    Blue,
    White,
    Off,
}

impl From<PaletteArg> for Rgb {
    fn from(palette: PaletteArg) -> Self {
        match palette {
            PaletteArg::Red => Rgb::RED,
            PaletteArg::Green => Rgb::GREEN,
            PaletteArg::Blue => Rgb::BLUE,
            PaletteArg::White => Rgb::WHITE,
            PaletteArg::Off => Rgb::OFF,
        }
    }
}

/// Parse a `col,row` key position.
pub fn parse_position(s: &str) -> Result<(u8, u8), String> {
    let (col, row) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `col,row`, got `{}`", s))?;
    let parse = |v: &str, max: usize| -> Result<u8, String> {
        let n: u8 = v.trim().parse().map_err(|e| format!("`{}`: {}", v, e))?;
        if (n as usize) < max {
            Ok(n)
        } else {
            Err(format!("{} is outside the {}x{} grid", n, GRID_WIDTH, GRID_HEIGHT))
        }
    };
    Ok((parse(col, GRID_WIDTH)?, parse(row, GRID_HEIGHT)?))
}

/// One character per LED, brighter cells get denser glyphs.
fn glyph(colour: Rgb) -> char {
    const RAMP: [char; 5] = ['.', '-', '+', '*', '#'];
    let level = colour.r.max(colour.g).max(colour.b);
    if level == 0 {
        RAMP[0]
    } else {
        RAMP[1 + level as usize * (RAMP.len() - 1) / 256]
    }
}

fn render(grid: &LedGrid<GRID_WIDTH, GRID_HEIGHT>) -> String {
    let mut out = String::with_capacity((GRID_WIDTH + 1) * GRID_HEIGHT);
    for y in 0..GRID_HEIGHT {
        out.extend((0..GRID_WIDTH).map(|x| glyph(grid.get(x, y))));
        out.push('\n');
    }
    out
}

/// Run `frames * ticks` lighting ticks and return every `ticks`-th frame.
/// The `touch` keys are pressed for the first tick only.
pub fn run(
    mode: LightingMode,
    palette: Rgb,
    touch: &[(u8, u8)],
    ticks: u32,
    frames: u32,
) -> Vec<String> {
    let mut grid = LedGrid::new();
    let mut animation = Animation::<GRID_WIDTH, GRID_HEIGHT>::new();
    animation.apply(LightingSettings { mode, palette }, &mut grid);

    let touches: Vec<KeyPos> = touch
        .iter()
        .map(|&(col, row)| KeyPos { row, col })
        .collect();
    log::debug!("preview {} with {} touched keys", mode.name(), touches.len());

    let mut out = Vec::with_capacity(frames as usize);
    let mut first = true;
    for _ in 0..frames {
        for _ in 0..ticks.max(1) {
            let posted = first.then_some(touches.as_slice());
            animation.tick(&mut grid, posted);
            first = false;
        }
        out.push(render(&grid));
    }
    out
}
