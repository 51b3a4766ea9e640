//! Port-level wiring of the switch matrix and the LED matrix.
//!
//! Pin mapping on the Teensy++ 2.0 (AT90USB1286):
//!   Scan strobe:  PB0-PB3 into a 4:16 decoder (selected line pulled low)
//!   Sense lines:  PB4, PB5, PB6, PE6, PE7 (inputs w/ pull-up, active low)
//!   LED cathode:  PA0-PA3 into the cathode decoder
//!   LED anodes:   red PORTC, green PORTD, blue PORTF (bit n = anode n)
//!   On-board LED: PD6 is green anode 6, so it only follows the matrix

use avr_device::at90usb1286::Peripherals;

use rgbkbd_core::{DriverLines, DriverPattern, ScanLines, SenseMask};

const STROBE_MASK: u8 = 0x0F;
const SENSE_MASK_B: u8 = 0x70;
const SENSE_MASK_E: u8 = 0xC0;
const CATHODE_MASK: u8 = 0x0F;

/// Short delay for the decoder outputs to settle (~5us at 16MHz).
#[inline(always)]
fn tiny_delay() {
    for _ in 0..20u8 {
        unsafe { core::arch::asm!("nop") };
    }
}

/// Strobe and sense lines of the switch matrix.
pub struct MatrixLines {
    dp: Peripherals,
}

impl MatrixLines {
    /// Configure the scan ports. Takes its own handle to the peripherals;
    /// it only touches PORTB and PORTE.
    pub fn new(dp: Peripherals) -> Self {
        // PB0-PB3: strobe outputs, PB4-PB6: inputs with pull-up
        dp.PORTB.ddrb.modify(|r, w| unsafe {
            w.bits((r.bits() | STROBE_MASK) & !SENSE_MASK_B)
        });
        dp.PORTB.portb.modify(|r, w| unsafe {
            w.bits((r.bits() & !STROBE_MASK) | SENSE_MASK_B)
        });
        // PE6-PE7: inputs with pull-up
        dp.PORTE.ddre.modify(|r, w| unsafe { w.bits(r.bits() & !SENSE_MASK_E) });
        dp.PORTE.porte.modify(|r, w| unsafe { w.bits(r.bits() | SENSE_MASK_E) });

        Self { dp }
    }
}

impl ScanLines for MatrixLines {
    fn strobe(&mut self, line: usize) {
        let line = line as u8 & STROBE_MASK;
        self.dp
            .PORTB
            .portb
            .modify(|r, w| unsafe { w.bits((r.bits() & !STROBE_MASK) | line) });
        tiny_delay();
    }

    fn read_sense(&mut self) -> SenseMask {
        let pinb = self.dp.PORTB.pinb.read().bits();
        let pine = self.dp.PORTE.pine.read().bits();

        // Sense 0-2 = PB4-PB6, sense 3-4 = PE6-PE7
        let raw = ((pinb & SENSE_MASK_B) >> 4) | ((pine & SENSE_MASK_E) >> 3);
        // Closed switches pull their line low
        (!raw & 0x1F) as SenseMask
    }
}

/// Cathode and anode lines of the LED matrix.
pub struct LedLines {
    dp: Peripherals,
}

impl LedLines {
    /// Configure the LED ports as outputs, everything off.
    pub fn new(dp: Peripherals) -> Self {
        dp.PORTA.ddra.write(|w| unsafe { w.bits(0xFF) });
        dp.PORTA.porta.write(|w| unsafe { w.bits(0x00) });
        dp.PORTC.ddrc.write(|w| unsafe { w.bits(0xFF) });
        dp.PORTC.portc.write(|w| unsafe { w.bits(0x00) });
        dp.PORTD.ddrd.write(|w| unsafe { w.bits(0xFF) });
        dp.PORTD.portd.write(|w| unsafe { w.bits(0x00) });
        dp.PORTF.ddrf.write(|w| unsafe { w.bits(0xFF) });
        dp.PORTF.portf.write(|w| unsafe { w.bits(0x00) });

        Self { dp }
    }
}

impl DriverLines for LedLines {
    fn set_driver_lines(&mut self, pattern: &DriverPattern) {
        let dp = &self.dp;
        dp.PORTA
            .porta
            .write(|w| unsafe { w.bits(pattern.step & CATHODE_MASK) });
        dp.PORTC.portc.write(|w| unsafe { w.bits(pattern.red) });
        dp.PORTD.portd.write(|w| unsafe { w.bits(pattern.green) });
        dp.PORTF.portf.write(|w| unsafe { w.bits(pattern.blue) });
    }

    fn clear_driver_lines(&mut self) {
        // Anodes first: the decoder keeps a cathode selected at any value
        let dp = &self.dp;
        dp.PORTC.portc.write(|w| unsafe { w.bits(0x00) });
        dp.PORTD.portd.write(|w| unsafe { w.bits(0x00) });
        dp.PORTF.portf.write(|w| unsafe { w.bits(0x00) });
        dp.PORTA.porta.write(|w| unsafe { w.bits(0x00) });
    }
}
