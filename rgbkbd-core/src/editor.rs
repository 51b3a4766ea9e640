//! Editor mode: keys reconfigure the lighting instead of typing.
//!
//! | Key       | Effect                      |
//! |-----------|-----------------------------|
//! | 1 .. 5    | static, touch, left wave, right wave, snake |
//! | R / G / B | paint red / green / blue    |
//! | W         | paint white                 |
//! | O         | lights off                  |
//! | Enter     | back to typing              |

use crate::accumulator::PressedSet;
use crate::keycode::Keycode;
use crate::led::Rgb;
use crate::lighting::{LightingMode, LightingSettings};
use crate::shared::Shared;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EditorCommand {
    SetMode(LightingMode),
    SetPalette(Rgb),
    Exit,
}

impl EditorCommand {
    /// The command bound to `code`, if any.
    pub fn from_keycode(code: Keycode) -> Option<Self> {
        let command = match code {
            Keycode::N1 => EditorCommand::SetMode(LightingMode::Static),
            Keycode::N2 => EditorCommand::SetMode(LightingMode::Touch),
            Keycode::N3 => EditorCommand::SetMode(LightingMode::LeftWave),
            Keycode::N4 => EditorCommand::SetMode(LightingMode::RightWave),
            Keycode::N5 => EditorCommand::SetMode(LightingMode::Snake),
            Keycode::R => EditorCommand::SetPalette(Rgb::RED),
            Keycode::G => EditorCommand::SetPalette(Rgb::GREEN),
            Keycode::B => EditorCommand::SetPalette(Rgb::BLUE),
            Keycode::W => EditorCommand::SetPalette(Rgb::WHITE),
            Keycode::O => EditorCommand::SetPalette(Rgb::OFF),
            Keycode::Enter => EditorCommand::Exit,
            _ => return None,
        };
        Some(command)
    }
}

/// Run the commands of one scan cycle in scan order, writing lighting
/// changes to `lighting`. Returns true if the cycle asked to leave editor
/// mode.
pub fn interpret<const N: usize>(keys: &PressedSet<N>, lighting: &Shared<LightingSettings>) -> bool {
    let mut exit = false;
    for command in keys.codes().filter_map(EditorCommand::from_keycode) {
        match command {
            EditorCommand::SetMode(mode) => {
                lighting.update(|s| LightingSettings { mode, ..s });
            }
            EditorCommand::SetPalette(palette) => {
                lighting.update(|s| LightingSettings { palette, ..s });
            }
            EditorCommand::Exit => exit = true,
        }
    }
    exit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::{KeyPos, PressedKey};

    fn keys(codes: &[Keycode]) -> PressedSet<6> {
        let mut set = PressedSet::new();
        for (i, &code) in codes.iter().enumerate() {
            set.push(PressedKey { pos: KeyPos::new(1, i as u8), code });
        }
        set
    }

    #[test]
    fn test_mode_and_palette_keys() {
        let lighting = Shared::new(LightingSettings::DEFAULT);
        assert!(!interpret(&keys(&[Keycode::N5, Keycode::R]), &lighting));
        assert_eq!(
            lighting.get(),
            LightingSettings {
                mode: LightingMode::Snake,
                palette: Rgb::RED
            }
        );
    }

    #[test]
    fn test_later_key_wins() {
        let lighting = Shared::new(LightingSettings::DEFAULT);
        interpret(&keys(&[Keycode::G, Keycode::O]), &lighting);
        assert_eq!(lighting.get().palette, Rgb::OFF);
    }

    #[test]
    fn test_unbound_keys_ignored() {
        let lighting = Shared::new(LightingSettings::DEFAULT);
        assert!(!interpret(&keys(&[Keycode::Q, Keycode::N9, Keycode::Space]), &lighting));
        assert_eq!(lighting.get(), LightingSettings::DEFAULT);
    }

    #[test]
    fn test_enter_exits() {
        let lighting = Shared::new(LightingSettings::DEFAULT);
        assert!(interpret(&keys(&[Keycode::N2, Keycode::Enter]), &lighting));
        assert_eq!(lighting.get().mode, LightingMode::Touch);
    }

    #[test]
    fn test_every_mode_reachable() {
        let bound: Vec<_> = [Keycode::N1, Keycode::N2, Keycode::N3, Keycode::N4, Keycode::N5]
            .into_iter()
            .filter_map(EditorCommand::from_keycode)
            .collect();
        let modes: Vec<_> = LightingMode::ALL.into_iter().map(EditorCommand::SetMode).collect();
        assert_eq!(bound, modes);
    }
}
