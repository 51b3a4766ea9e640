use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rusb::{Device, DeviceHandle, GlobalContext};
use std::time::Duration;

use crate::hex::FirmwareImage;

/// Teensy HalfKay bootloader USB identifiers.
const HALFKAY_VID: u16 = 0x16C0;
const HALFKAY_PID: u16 = 0x0478;

/// The running keyboard firmware.
const KEYBOARD_VID: u16 = 0x16C0;
const KEYBOARD_PID: u16 = 0x047C;

/// Vendor request the firmware answers by jumping to the bootloader.
const REQUEST_BOOTLOADER: u8 = 0xFF;

/// HalfKay block size on the Teensy++ 2.0 (AT90USB1286).
const BLOCK_SIZE: usize = 256;

/// Flash available below the 4KB HalfKay bootloader.
const FLASH_SIZE: u32 = 130_048;

/// USB control transfer timeout.
const USB_TIMEOUT: Duration = Duration::from_secs(2);

/// Delay after each block write to allow flash programming.
const BLOCK_WRITE_DELAY: Duration = Duration::from_millis(5);

fn find_device(vid: u16, pid: u16) -> Result<Option<Device<GlobalContext>>> {
    let devices = rusb::devices().context("failed to enumerate USB devices")?;
    for device in devices.iter() {
        let desc = device
            .device_descriptor()
            .context("failed to read device descriptor")?;
        if desc.vendor_id() == vid && desc.product_id() == pid {
            return Ok(Some(device));
        }
    }
    Ok(None)
}

/// Detect whether a Teensy in HalfKay bootloader mode is connected.
pub fn detect() -> Result<bool> {
    Ok(find_device(HALFKAY_VID, HALFKAY_PID)?.is_some())
}

/// Detect whether the keyboard firmware is running.
pub fn detect_keyboard() -> Result<bool> {
    Ok(find_device(KEYBOARD_VID, KEYBOARD_PID)?.is_some())
}

/// Ask a running keyboard to jump into its bootloader. Returns false if no
/// keyboard is connected.
pub fn reboot_to_bootloader() -> Result<bool> {
    let Some(device) = find_device(KEYBOARD_VID, KEYBOARD_PID)? else {
        return Ok(false);
    };
    let handle = device
        .open()
        .context("failed to open keyboard (may need root/sudo or udev rules)")?;
    log::debug!("sending bootloader request to keyboard");
    // The keyboard drops off the bus mid-transfer, so errors are expected
    let _ = handle.write_control(0x40, REQUEST_BOOTLOADER, 0, 0, &[], USB_TIMEOUT);
    Ok(true)
}

/// Open the Teensy HalfKay bootloader device.
fn open_device() -> Result<DeviceHandle<GlobalContext>> {
    let Some(device) = find_device(HALFKAY_VID, HALFKAY_PID)? else {
        bail!("Teensy bootloader not found. Press the reset button on the Teensy and try again.");
    };
    device
        .open()
        .context("failed to open Teensy bootloader (may need root/sudo or udev rules)")
}

/// HalfKay write buffer for the block at `address`. Teensy++ 2.0 takes the
/// address as bits 8..24, low byte first.
fn block_buffer(address: u32, block: &[u8]) -> Vec<u8> {
    let mut buf = vec![0xFF; 2 + BLOCK_SIZE];
    buf[0] = (address >> 8) as u8;
    buf[1] = (address >> 16) as u8;
    buf[2..2 + block.len()].copy_from_slice(block);
    buf
}

/// Flash a firmware image to the Teensy via the HalfKay protocol.
pub fn flash(image: &FirmwareImage) -> Result<()> {
    if image.end() > FLASH_SIZE {
        bail!(
            "firmware too large: {} bytes at offset 0x{:05X} exceeds {} byte flash",
            image.data.len(),
            image.base,
            FLASH_SIZE
        );
    }

    let handle = open_device()?;
    let blocks = image.blocks(BLOCK_SIZE);

    let pb = ProgressBar::new(blocks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} blocks")
            .context("invalid progress template")?
            .progress_chars("=> "),
    );
    pb.set_message("Flashing");

    for (address, block) in &blocks {
        write_block(&handle, &block_buffer(*address, block))
            .with_context(|| format!("failed to write block at address 0x{:05X}", address))?;
        std::thread::sleep(BLOCK_WRITE_DELAY);
        pb.inc(1);
    }

    pb.finish_with_message("Flashed");

    reboot(&handle);
    println!("Teensy rebooted. Firmware should be running.");

    Ok(())
}

/// Write a single block via HalfKay USB control transfer.
fn write_block(handle: &DeviceHandle<GlobalContext>, buf: &[u8]) -> Result<()> {
    // HalfKay uses HID SET_REPORT via control transfer
    // bmRequestType: 0x21 (host-to-device, class, interface)
    // bRequest: 0x09 (SET_REPORT)
    // wValue: 0x0200 (report type: output, report ID: 0)
    handle
        .write_control(0x21, 0x09, 0x0200, 0, buf, USB_TIMEOUT)
        .context("USB control transfer failed")?;
    Ok(())
}

/// Send the reboot command (a write to address 0xFFFFFF).
fn reboot(handle: &DeviceHandle<GlobalContext>) {
    let buf = block_buffer(0x00FF_FFFF, &[]);
    // The device disconnects immediately, so the transfer may fail
    let _ = handle.write_control(0x21, 0x09, 0x0200, 0, &buf, USB_TIMEOUT);
}
