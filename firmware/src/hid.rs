//! Boot-protocol USB keyboard on the AT90USB1286's device controller.
//!
//! Only what the host needs to enumerate a 6KRO keyboard is handled on the
//! control endpoint; everything else is stalled. Reports go out on EP1.

use avr_device::at90usb1286::Peripherals;

use rgbkbd_core::{HidTransport, KeyboardReport, Keycode, ModifierMask, PressedSet};

const CONTROL_EP: u8 = 0;
const REPORT_EP: u8 = 1;
const CONTROL_PACKET: usize = 64;
const REPORT_PACKET: u8 = 8;

/// UHWCON: UIMOD (device mode) | UVREGE (pad regulator).
const UHWCON_DEVICE: u8 = 0x81;
/// PLLCSR: PLLP2 | PLLP0 (16 MHz input) | PLLE.
const PLLCSR_16MHZ: u8 = 0x16;
const PLLCSR_PLOCK: u8 = 0x01;

/// Busy-wait after detaching so the host notices the disconnect.
const BOOTLOADER_JUMP_SPINS: u16 = 20_000;

/// Standard boot keyboard: modifier byte, reserved byte, 5 LED outputs and
/// six key slots.
#[rustfmt::skip]
static REPORT_DESCRIPTOR: [u8; 64] = [
    0x05, 0x01, 0x09, 0x06, 0xA1, 0x01,       // Generic Desktop / Keyboard / Application
    0x05, 0x07, 0x19, 0xE0, 0x29, 0xE7,       // Key codes LCtrl..RGui
    0x15, 0x00, 0x25, 0x01, 0x75, 0x01, 0x95, 0x08,
    0x81, 0x02,                               // 8 modifier bits
    0x95, 0x01, 0x75, 0x08, 0x81, 0x01,       // reserved byte
    0x95, 0x05, 0x75, 0x01, 0x05, 0x08, 0x19, 0x01, 0x29, 0x05,
    0x91, 0x02,                               // 5 LED outputs
    0x95, 0x01, 0x75, 0x03, 0x91, 0x01,       // LED padding
    0x95, 0x06, 0x75, 0x08, 0x15, 0x00, 0x26, 0xFF, 0x00,
    0x05, 0x07, 0x19, 0x00, 0x29, 0xFF, 0x81, 0x00, // 6 key slots
    0xC0,
];

#[rustfmt::skip]
static DEVICE_DESCRIPTOR: [u8; 18] = [
    18, 0x01,
    0x00, 0x02,                 // USB 2.0
    0, 0, 0,                    // class per interface
    CONTROL_PACKET as u8,
    0xC0, 0x16, 0x7C, 0x04,     // 16C0:047C
    0x01, 0x00,
    1, 2, 0,                    // manufacturer, product, no serial
    1,
];

#[rustfmt::skip]
static CONFIG_DESCRIPTOR: [u8; 34] = [
    // Configuration: one interface, bus powered, 500 mA for the LED matrix
    9, 0x02, 34, 0, 1, 1, 0, 0x80, 250,
    // Interface: HID boot keyboard
    9, 0x04, 0, 0, 1, 0x03, 0x01, 0x01, 0,
    // HID 1.11 with one report descriptor
    9, 0x21, 0x11, 0x01, 0, 1, 0x22, REPORT_DESCRIPTOR.len() as u8, 0,
    // EP1 IN, interrupt, polled every 1 ms
    7, 0x05, 0x80 | REPORT_EP, 0x03, REPORT_PACKET, 0, 1,
];

static LANGUAGES: [u8; 4] = [4, 0x03, 0x09, 0x04];
static MANUFACTURER: [u8; 8] = string_descriptor(b"RGB");
static PRODUCT: [u8; 26] = string_descriptor(b"RGB Keyboard");

/// UTF-16LE string descriptor for an ASCII string; `N` is `2 + 2 * len`.
const fn string_descriptor<const N: usize>(ascii: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out[0] = N as u8;
    out[1] = 0x03;
    let mut i = 0;
    while i < ascii.len() {
        out[2 + 2 * i] = ascii[i];
        i += 1;
    }
    out
}

/// Descriptor for a GET_DESCRIPTOR `wValue`.
fn descriptor(kind: u8, index: u8) -> Option<&'static [u8]> {
    Some(match (kind, index) {
        (0x01, _) => &DEVICE_DESCRIPTOR[..],
        (0x02, _) => &CONFIG_DESCRIPTOR[..],
        (0x03, 0) => &LANGUAGES[..],
        (0x03, 1) => &MANUFACTURER[..],
        (0x03, 2) => &PRODUCT[..],
        (0x22, _) => &REPORT_DESCRIPTOR[..],
        _ => return None,
    })
}

/// The 8-byte SETUP packet.
struct Setup {
    request_type: u8,
    request: u8,
    value: u16,
    length: u16,
}

impl Setup {
    fn read(dp: &Peripherals) -> Self {
        let mut raw = [0u8; 8];
        for byte in raw.iter_mut() {
            *byte = dp.USB_DEVICE.uedatx.read().bits();
        }
        Self {
            request_type: raw[0],
            request: raw[1],
            value: u16::from_le_bytes([raw[2], raw[3]]),
            length: u16::from_le_bytes([raw[6], raw[7]]),
        }
    }
}

enum EndpointKind {
    Control,
    InterruptIn,
}

/// USB device state.
pub struct UsbKeyboard {
    configured: bool,
    last_report: KeyboardReport,
}

impl UsbKeyboard {
    pub const fn new() -> Self {
        Self {
            configured: false,
            last_report: KeyboardReport::empty(),
        }
    }

    /// Start the PLL and attach to the bus.
    pub fn init(&mut self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        dp.USB_GLOBAL.uhwcon.write(|w| unsafe { w.bits(UHWCON_DEVICE) });
        dp.USB_GLOBAL.usbcon.write(|w| w.usbe().set_bit().otgpade().set_bit());

        // 16 MHz crystal, 48 MHz USB clock
        dp.PLL.pllcsr.write(|w| unsafe { w.bits(PLLCSR_16MHZ) });
        while dp.PLL.pllcsr.read().bits() & PLLCSR_PLOCK == 0 {}

        dp.USB_GLOBAL.usbcon.modify(|_, w| w.frzclk().clear_bit());
        usb.udcon.modify(|_, w| w.detach().clear_bit());
        usb.udien.write(|w| w.eorste().set_bit());

        self.configured = false;
    }

    /// Service bus resets and control requests. Called from the main loop.
    /// Returns true once the host has asked for the bootloader.
    pub fn poll(&mut self, dp: &Peripherals) -> bool {
        let usb = &dp.USB_DEVICE;

        if usb.udint.read().eorsti().bit_is_set() {
            usb.udint.modify(|_, w| w.eorsti().clear_bit());
            configure_endpoint(dp, CONTROL_EP, EndpointKind::Control);
            self.configured = false;
        }

        select_endpoint(dp, CONTROL_EP);
        if usb.ueintx.read().rxstpi().bit_is_set() {
            let setup = Setup::read(dp);
            usb.ueintx.modify(|_, w| w.rxstpi().clear_bit());
            return self.handle_setup(dp, &setup);
        }
        false
    }

    /// Queue `report` on EP1. Unchanged reports are dropped unless `force`
    /// is set; a busy endpoint drops the report after a bounded wait.
    pub fn send_report(&mut self, dp: &Peripherals, report: &KeyboardReport, force: bool) {
        if !self.configured || (!force && *report == self.last_report) {
            return;
        }

        let usb = &dp.USB_DEVICE;
        select_endpoint(dp, REPORT_EP);

        let mut spins = u16::MAX;
        while usb.ueintx.read().rwal().bit_is_clear() {
            spins -= 1;
            if spins == 0 {
                return;
            }
        }

        for byte in report.as_bytes() {
            usb.uedatx.write(|w| w.bits(byte));
        }
        usb.ueintx
            .modify(|_, w| w.fifocon().clear_bit().txini().clear_bit());

        self.last_report = *report;
    }

    fn handle_setup(&mut self, dp: &Peripherals, setup: &Setup) -> bool {
        let usb = &dp.USB_DEVICE;
        let [index, kind] = setup.value.to_le_bytes();

        match (setup.request_type, setup.request) {
            // GET_DESCRIPTOR, standard or HID class
            (0x80 | 0x81, 0x06) => match descriptor(kind, index) {
                Some(desc) => send_control(dp, desc, setup.length),
                None => stall(dp),
            },
            // SET_ADDRESS takes effect after the status stage
            (0x00, 0x05) => {
                ack(dp);
                while usb.ueintx.read().txini().bit_is_clear() {}
                usb.udaddr
                    .write(|w| w.uadd().bits(index & 0x7F).adden().set_bit());
            }
            // SET_CONFIGURATION
            (0x00, 0x09) => {
                ack(dp);
                configure_endpoint(dp, REPORT_EP, EndpointKind::InterruptIn);
                self.configured = true;
                self.last_report = KeyboardReport::empty();
            }
            // GET_CONFIGURATION
            (0x80, 0x08) => {
                while usb.ueintx.read().txini().bit_is_clear() {}
                usb.uedatx.write(|w| w.bits(self.configured as u8));
                ack(dp);
            }
            // HID SET_IDLE / SET_PROTOCOL: boot protocol only, no idle rate
            (0x21, 0x0A | 0x0B) => ack(dp),
            (0x40, 0xFF) => {
                ack(dp);
                return true;
            }
            _ => stall(dp),
        }
        false
    }
}

fn select_endpoint(dp: &Peripherals, ep: u8) {
    dp.USB_DEVICE.uenum.write(|w| w.bits(ep & 0x07));
}

fn configure_endpoint(dp: &Peripherals, ep: u8, kind: EndpointKind) {
    let usb = &dp.USB_DEVICE;
    select_endpoint(dp, ep);
    usb.ueconx.write(|w| w.epen().set_bit());
    match kind {
        // 64 bytes
        EndpointKind::Control => {
            usb.uecfg0x.write(|w| w.eptype().bits(0b00));
            usb.uecfg1x.write(|w| w.epsize().bits(0b011).alloc().set_bit());
        }
        // 8 bytes
        EndpointKind::InterruptIn => {
            usb.uecfg0x.write(|w| w.eptype().bits(0b11).epdir().set_bit());
            usb.uecfg1x.write(|w| w.epsize().bits(0b000).alloc().set_bit());
        }
    }
}

/// Complete the current control stage with an empty IN packet.
fn ack(dp: &Peripherals) {
    dp.USB_DEVICE.ueintx.modify(|_, w| w.txini().clear_bit());
}

fn stall(dp: &Peripherals) {
    dp.USB_DEVICE.ueconx.modify(|_, w| w.stallrq().set_bit());
}

/// Send `data` in control-sized packets, truncated to what the host asked
/// for, then wait for the host's status packet.
fn send_control(dp: &Peripherals, data: &[u8], requested: u16) {
    let usb = &dp.USB_DEVICE;
    let len = data.len().min(requested as usize);

    for packet in data[..len].chunks(CONTROL_PACKET) {
        while usb.ueintx.read().txini().bit_is_clear() {}
        for &byte in packet {
            usb.uedatx.write(|w| w.bits(byte));
        }
        ack(dp);
    }

    while usb.ueintx.read().rxouti().bit_is_clear() {}
    usb.ueintx.modify(|_, w| w.rxouti().clear_bit());
}

/// The USB keyboard as seen from the scan tick.
pub struct HostLink<'a> {
    pub usb: &'a mut UsbKeyboard,
    pub dp: &'a Peripherals,
}

impl HidTransport for HostLink<'_> {
    fn send_report<const N: usize>(&mut self, keys: &PressedSet<N>, modifiers: ModifierMask) {
        let report = KeyboardReport::from_keys(keys, modifiers);
        self.usb.send_report(self.dp, &report, false);
    }

    fn press_single_key(&mut self, code: Keycode, modifiers: ModifierMask) {
        let press = KeyboardReport::single(code, modifiers);
        self.usb.send_report(self.dp, &press, true);
        self.usb.send_report(self.dp, &KeyboardReport::empty(), true);
    }
}

macro_rules! zero {
    ($($reg:expr),+ $(,)?) => {
        $( $reg.write(|w| unsafe { w.bits(0) }); )+
    };
}

/// Detach from USB, quiesce every peripheral and enter HalfKay at 0x1FC00.
pub fn jump_to_bootloader(dp: &Peripherals) -> ! {
    avr_device::interrupt::disable();

    dp.USB_DEVICE.udcon.write(|w| w.detach().set_bit());
    dp.USB_GLOBAL.usbcon.write(|w| w.frzclk().set_bit());
    for _ in 0..BOOTLOADER_JUMP_SPINS {
        unsafe { core::arch::asm!("nop") };
    }

    zero!(
        dp.EXINT.eimsk,
        dp.SPI.spcr,
        dp.AC.acsr,
        dp.EEPROM.eecr,
        dp.ADC.adcsra,
        dp.TC0.timsk0,
        dp.TC1.timsk1,
        dp.TC2.timsk2,
        dp.TC3.timsk3,
        dp.USART1.ucsr1b,
        dp.TWI.twcr,
    );
    // LED anodes and cathode decoder off before the ports float
    zero!(
        dp.PORTA.porta, dp.PORTC.portc, dp.PORTD.portd, dp.PORTF.portf,
        dp.PORTB.portb, dp.PORTE.porte,
        dp.PORTA.ddra, dp.PORTB.ddrb, dp.PORTC.ddrc,
        dp.PORTD.ddrd, dp.PORTE.ddre, dp.PORTF.ddrf,
    );

    unsafe { core::arch::asm!("jmp 0x1FC00", options(noreturn)) }
}
