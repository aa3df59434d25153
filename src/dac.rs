// This file drives the external multi-channel DAC sitting behind the
// bit-banged bus. The channel-to-chip-select multiplexing is fixed by the
// board wiring; board-level groupings live in the mapping file.

use embedded_hal::digital::v2::OutputPin;

use crate::bus::DacBus;
use crate::mapping::DacSelectPins;
use crate::Channel;

pub const DAC_RESOLUTION: u16 = 4095;

// First frame byte before the sub-address bit is folded in: six command
// bits and a trailing fixed 0.
const COMMAND_BITS: u8 = 0b1100_0000;

impl Channel {
    // Two DAC packages share the bus; channel three lives at sub-address 0
    // on one of them, channels one and two at sub-address 1. Wiring fact,
    // reproduced exactly.
    fn dac_address(self) -> u8 {
        match self {
            Channel::Three => 0,
            _ => 1,
        }
    }
}

pub struct Dac<Cs1, Cs2> {
    cs1: Cs1,
    cs2: Cs2,
}

impl<Cs1: OutputPin, Cs2: OutputPin> Dac<Cs1, Cs2> {
    pub fn new(select: DacSelectPins<Cs1, Cs2>) -> Dac<Cs1, Cs2> {
        Dac {
            cs1: select.cs1,
            cs2: select.cs2,
        }
    }

    pub fn return_pins(self) -> DacSelectPins<Cs1, Cs2> {
        DacSelectPins {
            cs1: self.cs1,
            cs2: self.cs2,
        }
    }

    /// Write a 12-bit code to one output channel. The frame is three bytes,
    /// each followed by an unread acknowledge slot: the command/address
    /// byte, the code's high nibble, the code's low byte.
    pub fn write_count(&mut self, channel: Channel, count: u16, bus: &mut impl DacBus) {
        let count = count & DAC_RESOLUTION;

        match channel {
            Channel::Three => {
                self.cs1.set_high().ok();
                self.cs2.set_high().ok();
            }
            Channel::Two => {
                self.cs1.set_low().ok();
                self.cs2.set_high().ok();
            }
            Channel::One => {
                self.cs1.set_high().ok();
                self.cs2.set_low().ok();
            }
        }

        // A clock pulse delayed mid-frame corrupts the transfer with no way
        // to detect it, so the whole frame runs with interrupts masked.
        critical_section::with(|_| {
            bus.start_condition();
            bus.write_byte(COMMAND_BITS | (channel.dac_address() << 1));
            bus.write_byte((count >> 8) as u8);
            bus.write_byte(count as u8);
            bus.stop_condition();
        });
    }
}
