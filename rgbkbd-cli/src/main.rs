mod halfkay;
mod hex;
mod layout;
mod preview;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::time::Duration;

use preview::{ModeArg, PaletteArg};
use rgbkbd_core::config::{COLS, LED_CONFIG, ROWS};
use rgbkbd_core::keymap;

#[derive(Parser)]
#[command(name = "rgbkbd-cli")]
#[command(about = "RGB keyboard firmware flasher and layout tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Flash a .hex firmware file to Teensy via HalfKay bootloader
    Flash {
        /// Path to the Intel HEX firmware file
        firmware: String,
    },
    /// Detect if a Teensy is connected in bootloader mode
    Detect,
    /// Generate an HTML rendering of the keymap and LED wiring
    Layout {
        /// Output file path (default: layout.html)
        #[arg(short, long, default_value = "layout.html")]
        output: String,
    },
    /// Validate the LED wiring table and print the refresh timing
    Check,
    /// Run a lighting mode on the host and print its frames
    Preview {
        #[arg(long, value_enum, default_value_t = ModeArg::Snake)]
        mode: ModeArg,
        /// Lighting ticks between printed frames
        #[arg(long, default_value_t = 1)]
        ticks: u32,
        /// Number of frames to print
        #[arg(long, default_value_t = 8)]
        frames: u32,
        #[arg(long, value_enum, default_value_t = PaletteArg::White)]
        palette: PaletteArg,
        /// Key to press in touch mode, as `col,row`; may be repeated
        #[arg(long, value_parser = preview::parse_position)]
        touch: Vec<(u8, u8)>,
    },
}

/// Polls while the keyboard reboots into HalfKay.
const BOOTLOADER_WAIT: Duration = Duration::from_millis(100);
const BOOTLOADER_POLLS: u32 = 50;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Flash { firmware } => {
            let contents =
                fs::read_to_string(&firmware).with_context(|| format!("reading {}", firmware))?;
            let image = hex::FirmwareImage::parse(&contents).context("parsing Intel HEX file")?;

            println!(
                "Firmware: {} bytes at base address 0x{:05X}",
                image.data.len(),
                image.base
            );

            if !halfkay::detect()? {
                if !halfkay::reboot_to_bootloader()? {
                    bail!(
                        "Teensy bootloader not detected and keyboard not found. \
                         Press the reset button on the Teensy and try again."
                    );
                }
                println!("Rebooting keyboard into bootloader...");
                wait_for_bootloader()?;
            }

            halfkay::flash(&image)?;
        }
        Command::Detect => {
            if halfkay::detect()? {
                println!("Teensy bootloader detected (HalfKay mode).");
            } else if halfkay::detect_keyboard()? {
                println!("Keyboard firmware is running. `flash` will reboot it into the bootloader.");
            } else {
                println!("Teensy bootloader not detected.");
                println!("Press the reset button on the Teensy to enter bootloader mode.");
            }
        }
        Command::Layout { output } => {
            fs::write(&output, layout::generate_html())
                .with_context(|| format!("writing {}", output))?;
            println!("Layout written to {}", output);
        }
        Command::Check => check()?,
        Command::Preview {
            mode,
            ticks,
            frames,
            palette,
            touch,
        } => {
            let frames = preview::run(mode.into(), palette.into(), &touch, ticks, frames);
            for (i, frame) in frames.iter().enumerate() {
                println!("tick {}:\n{}", (i as u32 + 1) * ticks, frame);
            }
        }
    }

    Ok(())
}

fn wait_for_bootloader() -> Result<()> {
    for _ in 0..BOOTLOADER_POLLS {
        std::thread::sleep(BOOTLOADER_WAIT);
        if halfkay::detect()? {
            return Ok(());
        }
    }
    bail!("Teensy bootloader not detected after reboot. Press the reset button on the Teensy and try again.")
}

fn check() -> Result<()> {
    LED_CONFIG.validate().context("LED configuration is invalid")?;
    println!(
        "LED matrix: {} steps x {} anodes, {} us per step",
        LED_CONFIG.steps, LED_CONFIG.anodes, LED_CONFIG.step_us
    );
    println!(
        "Refresh cycle: {} us ({} Hz)",
        LED_CONFIG.refresh_us(),
        LED_CONFIG.refresh_hz()
    );

    // Every populated key sits over an LED, so touch mode can light it
    let dark: Vec<(usize, usize)> = (0..ROWS)
        .flat_map(|row| (0..COLS).map(move |col| (row, col)))
        .filter(|&(row, col)| !keymap::map(row, col).is_no() && LED_CONFIG.address(col, row).is_none())
        .collect();
    if !dark.is_empty() {
        bail!("keys without an LED address: {:?}", dark);
    }
    println!("All keys have an LED address.");
    Ok(())
}
