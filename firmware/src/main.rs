//! RGB keyboard firmware for the AT90USB1286 (Teensy++ 2.0).
//!
//! Two timer interrupts do all the work:
//! - Timer0 (1 kHz) scans one strobe line of the key matrix per tick and,
//!   once per full cycle, sends a USB HID report or feeds the editor
//! - Timer2 (~665 Hz) displays one multiplex step of the RGB LED matrix and
//!   advances the lighting animation once per refresh cycle
//!
//! The main loop services USB control requests and, when the host asks for
//! it, blanks the LEDs and enters the bootloader.

#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]
#![feature(asm_experimental_arch)]

mod hid;
mod lines;

use core::cell::RefCell;

use avr_device::at90usb1286::Peripherals;
use avr_device::interrupt::{self, Mutex};

use hid::{HostLink, UsbKeyboard};
use lines::{LedLines, MatrixLines};
use rgbkbd_core::config::LED_CONFIG;
use rgbkbd_core::keymap::BOARD;
use rgbkbd_core::{BoardKeyboard, BoardLighting, SharedState};

/// State owned by the scan tick.
struct ScanContext {
    keyboard: BoardKeyboard,
    lines: MatrixLines,
}

/// State owned by the LED tick.
struct LedContext {
    lighting: BoardLighting,
    lines: LedLines,
}

static SHARED: SharedState = SharedState::new();
static USB: Mutex<RefCell<Option<UsbKeyboard>>> = Mutex::new(RefCell::new(None));
static SCAN: Mutex<RefCell<Option<ScanContext>>> = Mutex::new(RefCell::new(None));
static LEDS: Mutex<RefCell<Option<LedContext>>> = Mutex::new(RefCell::new(None));

/// Panic handler: on AVR we just loop forever.
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

/// Main entry point.
#[no_mangle]
pub extern "C" fn main() -> ! {
    let dp = unsafe { Peripherals::steal() };

    // Disable clock prescaler (CLKPR), run at the full 16MHz
    dp.CPU.clkpr.write(|w| w.clkpce().set_bit());
    dp.CPU.clkpr.write(|w| unsafe { w.bits(0) });

    // A bad wiring table would drive two LEDs from one line
    if LED_CONFIG.validate().is_err() {
        panic!("invalid LED configuration");
    }

    let mut usb = UsbKeyboard::new();
    usb.init(&dp);

    // Each tick context gets its own handle on the ports it drives
    let scan = ScanContext {
        keyboard: BoardKeyboard::new(BOARD),
        lines: MatrixLines::new(unsafe { Peripherals::steal() }),
    };
    let leds = LedContext {
        lighting: BoardLighting::new(LED_CONFIG),
        lines: LedLines::new(unsafe { Peripherals::steal() }),
    };

    interrupt::free(|cs| {
        USB.borrow(cs).replace(Some(usb));
        SCAN.borrow(cs).replace(Some(scan));
        LEDS.borrow(cs).replace(Some(leds));
    });

    init_timers(&dp);
    unsafe { interrupt::enable() };

    loop {
        let reboot = interrupt::free(|cs| {
            USB.borrow(cs)
                .borrow_mut()
                .as_mut()
                .is_some_and(|usb| usb.poll(&dp))
        });
        if reboot {
            // Dark matrix before the ports are released
            interrupt::free(|cs| {
                if let Some(leds) = LEDS.borrow(cs).borrow_mut().as_mut() {
                    leds.lighting.blank(&mut leds.lines);
                }
            });
            hid::jump_to_bootloader(&dp);
        }
    }
}

/// Timer0: CTC, 16MHz / 64 / 250 = 1 kHz scan tick.
/// Timer2: CTC, 16MHz / 128 / 188 = ~665 Hz LED tick.
fn init_timers(dp: &Peripherals) {
    dp.TC0.tccr0a.write(|w| unsafe { w.bits(0x02) }); // WGM01
    dp.TC0.ocr0a.write(|w| unsafe { w.bits(249) });
    dp.TC0.tccr0b.write(|w| unsafe { w.bits(0x03) }); // clk/64
    dp.TC0.timsk0.write(|w| unsafe { w.bits(0x02) }); // OCIE0A

    dp.TC2.tccr2a.write(|w| unsafe { w.bits(0x02) }); // WGM21
    dp.TC2.ocr2a.write(|w| unsafe { w.bits(187) });
    dp.TC2.tccr2b.write(|w| unsafe { w.bits(0x05) }); // clk/128
    dp.TC2.timsk2.write(|w| unsafe { w.bits(0x02) }); // OCIE2A
}

#[avr_device::interrupt(at90usb1286)]
fn TIMER0_COMPA() {
    let dp = unsafe { Peripherals::steal() };
    interrupt::free(|cs| {
        let mut scan = SCAN.borrow(cs).borrow_mut();
        let mut usb = USB.borrow(cs).borrow_mut();
        if let (Some(scan), Some(usb)) = (scan.as_mut(), usb.as_mut()) {
            let mut host = HostLink { usb, dp: &dp };
            scan.keyboard.tick(&mut scan.lines, &mut host, &SHARED);
        }
    });
}

#[avr_device::interrupt(at90usb1286)]
fn TIMER2_COMPA() {
    interrupt::free(|cs| {
        if let Some(leds) = LEDS.borrow(cs).borrow_mut().as_mut() {
            leds.lighting.on_tick(&SHARED, &mut leds.lines);
        }
    });
}
