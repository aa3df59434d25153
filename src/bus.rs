// Software-driven two-wire write bus for the external DAC. There is no
// protocol controller behind this: every edge on the clock and data lines
// is produced here, one register write at a time. Write-only; the DAC's
// acknowledge slots are clocked but never read back.

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::OutputPin;

/// Half of one clock pulse, in microseconds. This is the timing contract
/// that satisfies the DAC's setup/hold requirements; do not shorten it.
pub const HALF_PULSE_MICROS: u16 = 5;

/// The bit-level operations a DAC frame is built from. Every frame is
/// exactly `start_condition`, a fixed run of `write_bit`/`release_ack`,
/// then `stop_condition`; partial frames are undefined and must not occur.
pub trait DacBus {
    fn start_condition(&mut self);
    fn write_bit(&mut self, bit: bool);
    /// Release the data line and clock once through the peripheral's
    /// acknowledge slot, without sampling it.
    fn release_ack(&mut self);
    fn stop_condition(&mut self);

    // MSB first, followed by the acknowledge slot.
    fn write_byte(&mut self, byte: u8) {
        for shift in (0..8).rev() {
            self.write_bit(byte & (1 << shift) != 0);
        }
        self.release_ack();
    }
}

/// Bit-banged implementation over two output lines and a microsecond delay
/// source. The caller must not assume any idle bus state beyond what
/// `start_condition` itself establishes.
pub struct BitBangBus<Clk, Dat, D> {
    clk: Clk,
    dat: Dat,
    delay: D,
}

impl<Clk: OutputPin, Dat: OutputPin, D: DelayUs<u16>> BitBangBus<Clk, Dat, D> {
    pub fn new(clk: Clk, dat: Dat, delay: D) -> BitBangBus<Clk, Dat, D> {
        BitBangBus { clk, dat, delay }
    }

    pub fn return_pins(self) -> (Clk, Dat, D) {
        (self.clk, self.dat, self.delay)
    }

    fn data_set(&mut self, bit: bool) {
        if bit {
            self.dat.set_high().ok();
        } else {
            self.dat.set_low().ok();
        }
    }

    fn pulse_clock(&mut self) {
        self.delay.delay_us(HALF_PULSE_MICROS);
        self.clk.set_high().ok();
        self.delay.delay_us(HALF_PULSE_MICROS);
        self.clk.set_low().ok();
    }
}

impl<Clk: OutputPin, Dat: OutputPin, D: DelayUs<u16>> DacBus for BitBangBus<Clk, Dat, D> {
    fn start_condition(&mut self) {
        self.dat.set_low().ok();
        self.delay.delay_us(HALF_PULSE_MICROS);
        self.clk.set_low().ok();
    }

    fn write_bit(&mut self, bit: bool) {
        self.data_set(bit);
        self.pulse_clock();
    }

    fn release_ack(&mut self) {
        self.dat.set_high().ok();
        self.pulse_clock();
    }

    fn stop_condition(&mut self) {
        self.clk.set_high().ok();
        self.delay.delay_us(HALF_PULSE_MICROS);
        self.dat.set_high().ok();
        self.delay.delay_us(HALF_PULSE_MICROS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{new_log, Event, LineRecorder, LoggedDelay, Wire};
    use embedded_hal_mock::delay::MockNoop;
    use embedded_hal_mock::pin::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    fn recording_bus() -> (
        BitBangBus<LineRecorder, LineRecorder, LoggedDelay>,
        crate::testing::Log,
    ) {
        let log = new_log();
        let bus = BitBangBus::new(
            LineRecorder::new(Wire::Clock, &log),
            LineRecorder::new(Wire::Data, &log),
            LoggedDelay::new(&log),
        );
        (bus, log)
    }

    fn level(wire: Wire, high: bool) -> Event {
        Event::Level { wire, high }
    }

    const WAIT: Event = Event::Wait {
        micros: HALF_PULSE_MICROS,
    };

    #[test]
    fn start_condition_drops_data_then_clock() {
        let (mut bus, log) = recording_bus();
        bus.start_condition();
        assert_eq!(
            log.borrow().as_slice(),
            &[level(Wire::Data, false), WAIT, level(Wire::Clock, false)]
        );
    }

    #[test]
    fn write_bit_sets_data_before_the_clock_pulse() {
        let (mut bus, log) = recording_bus();
        bus.write_bit(true);
        assert_eq!(
            log.borrow().as_slice(),
            &[
                level(Wire::Data, true),
                WAIT,
                level(Wire::Clock, true),
                WAIT,
                level(Wire::Clock, false),
            ]
        );
    }

    #[test]
    fn stop_condition_raises_clock_then_data() {
        let (mut bus, log) = recording_bus();
        bus.stop_condition();
        assert_eq!(
            log.borrow().as_slice(),
            &[
                level(Wire::Clock, true),
                WAIT,
                level(Wire::Data, true),
                WAIT,
            ]
        );
    }

    #[test]
    fn write_byte_is_msb_first_and_releases_the_ack_slot() {
        let (mut bus, log) = recording_bus();
        bus.write_byte(0b1010_0001);

        let data_levels: Vec<bool> = log
            .borrow()
            .iter()
            .filter_map(|event| match event {
                Event::Level {
                    wire: Wire::Data,
                    high,
                } => Some(*high),
                _ => None,
            })
            .collect();
        // Eight payload bits then the released (high) acknowledge slot
        assert_eq!(
            data_levels,
            vec![true, false, true, false, false, false, false, true, true]
        );

        let rising_edges = log
            .borrow()
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    Event::Level {
                        wire: Wire::Clock,
                        high: true
                    }
                )
            })
            .count();
        assert_eq!(rising_edges, 9);
    }

    #[test]
    fn bit_write_drives_mock_pins_in_order() {
        let clk = PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ]);
        let dat = PinMock::new(&[PinTransaction::set(PinState::Low)]);
        let mut clk_handle = clk.clone();
        let mut dat_handle = dat.clone();

        let mut bus = BitBangBus::new(clk, dat, MockNoop::new());
        bus.write_bit(false);

        clk_handle.done();
        dat_handle.done();
    }
}
