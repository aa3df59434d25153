// This file provides the high-level interface for one TN-04 node: the three
// sensed input channels, the three DAC-backed output channels, the RGB
// indicator, and the auxiliary sensors. Every read and write also updates
// the cached state snapshot consumed by the reporter.

use embedded_hal::digital::v2::{InputPin, OutputPin};
use embedded_hal::PwmPin;
use ufmt::uWrite;

use crate::bus::DacBus;
use crate::dac::Dac;
use crate::mapping::{
    dip_ladder, led_level_from_fraction, AuxPins, DacSelectPins, InputPins, LedPins,
    ADC_FULL_SCALE_COUNTS,
};
use crate::range::Range;
use crate::report;
use crate::{AnalogInput, Channel};

/// Last observed value for one input channel.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct InputState {
    pub value: f32,
    pub connected: bool,
}

/// Cached snapshot of everything the node has last seen or driven. Mutated
/// only by the corresponding accessor; read by the reporter.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct NodeState {
    pub colour: [u8; 3],
    pub inputs: [InputState; 3],
    pub outputs: [f32; 3],
    pub pot: f32,
    pub master: f32,
    pub master_sw: bool,
    pub dips: [bool; 3],
    pub sw: bool,
}

/// One TN-04 node. Owns its pins, its bus, and its cached state; there is
/// exactly one instance per physical device and no sharing between
/// instances.
pub struct Node<B, Cs1, Cs2, A1, S1, A2, S2, A3, S3, R, G, Bl, Pot, Dip, Ma, Ms, Sw> {
    bus: B,
    dac: Dac<Cs1, Cs2>,
    inputs: InputPins<A1, S1, A2, S2, A3, S3>,
    leds: LedPins<R, G, Bl>,
    aux: AuxPins<Pot, Dip, Ma, Ms, Sw>,
    range: Range,
    state: NodeState,
}

impl<B, Cs1, Cs2, A1, S1, A2, S2, A3, S3, R, G, Bl, Pot, Dip, Ma, Ms, Sw>
    Node<B, Cs1, Cs2, A1, S1, A2, S2, A3, S3, R, G, Bl, Pot, Dip, Ma, Ms, Sw>
where
    B: DacBus,
    Cs1: OutputPin,
    Cs2: OutputPin,
    A1: AnalogInput + InputPin,
    S1: InputPin,
    A2: AnalogInput + InputPin,
    S2: InputPin,
    A3: AnalogInput + InputPin,
    S3: InputPin,
    R: PwmPin<Duty = u8>,
    G: PwmPin<Duty = u8>,
    Bl: PwmPin<Duty = u8>,
    Pot: AnalogInput,
    Dip: AnalogInput,
    Ma: AnalogInput,
    Ms: InputPin,
    Sw: InputPin,
{
    // Construct a node over the unit range 0.0..1.0.
    pub fn new(
        bus: B,
        select: DacSelectPins<Cs1, Cs2>,
        inputs: InputPins<A1, S1, A2, S2, A3, S3>,
        leds: LedPins<R, G, Bl>,
        aux: AuxPins<Pot, Dip, Ma, Ms, Sw>,
    ) -> Self {
        Self::with_range(bus, select, inputs, leds, aux, Range::default())
    }

    pub fn with_range(
        bus: B,
        select: DacSelectPins<Cs1, Cs2>,
        inputs: InputPins<A1, S1, A2, S2, A3, S3>,
        leds: LedPins<R, G, Bl>,
        aux: AuxPins<Pot, Dip, Ma, Ms, Sw>,
        range: Range,
    ) -> Self {
        let mut node = Node {
            bus,
            dac: Dac::new(select),
            inputs,
            leds,
            aux,
            range,
            state: NodeState::default(),
        };
        node.leds.red.enable();
        node.leds.green.enable();
        node.leds.blue.enable();

        // Go through all the accessors once, so every cached field is
        // defined before first external use.
        for channel in Channel::ALL {
            node.analog_write(channel, node.range.min());
            node.analog_read(channel);
        }
        node.colour(0, 0, 0);
        node.dip1();
        node.dip2();
        node.dip3();
        node.master_read();
        node.master_sw();
        node.pot();
        node.sw();
        node
    }

    pub fn range(&self) -> Range {
        self.range
    }

    /// The cached snapshot of the node's last observed/driven values.
    pub fn state(&self) -> &NodeState {
        &self.state
    }

    // Check if an input is connected (sense line is active-low).
    pub fn is_connected(&mut self, channel: Channel) -> bool {
        let connected = match channel {
            Channel::Three => self.inputs.in3.sense.is_low().unwrap_or(false),
            Channel::Two => self.inputs.in2.sense.is_low().unwrap_or(false),
            Channel::One => self.inputs.in1.sense.is_low().unwrap_or(false),
        };
        self.state.inputs[channel.slot()].connected = connected;
        connected
    }

    /// Read the analog value from an input, rescaled into the range.
    /// Returns the range minimum, without touching the signal line, if the
    /// input is not connected.
    pub fn analog_read(&mut self, channel: Channel) -> f32 {
        let slot = channel.slot();
        let value = if self.is_connected(channel) {
            let raw = match channel {
                Channel::Three => self.inputs.in3.analog.read_counts(),
                Channel::Two => self.inputs.in2.analog.read_counts(),
                Channel::One => self.inputs.in1.analog.read_counts(),
            };
            self.range.from_counts(raw)
        } else {
            self.range.min()
        };
        self.state.inputs[slot].value = value;
        value
    }

    /// Write a value to an output channel, clipped into the range.
    pub fn analog_write(&mut self, channel: Channel, value: f32) {
        let value = self.range.clamp(value);
        let count = self.range.to_count(value);
        self.dac.write_count(channel, count, &mut self.bus);
        self.state.outputs[channel.slot()] = value;
    }

    /// Read an input's signal line as a digital level. Returns false if the
    /// input is not connected.
    pub fn digital_read(&mut self, channel: Channel) -> bool {
        let slot = channel.slot();
        let level = if self.is_connected(channel) {
            match channel {
                Channel::Three => self.inputs.in3.analog.is_high().unwrap_or(false),
                Channel::Two => self.inputs.in2.analog.is_high().unwrap_or(false),
                Channel::One => self.inputs.in1.analog.is_high().unwrap_or(false),
            }
        } else {
            false
        };
        self.state.inputs[slot].value = if level { 1.0 } else { 0.0 };
        level
    }

    // Drive an output to the range maximum (on) or minimum (off).
    pub fn digital_write(&mut self, channel: Channel, on: bool) {
        if on {
            self.analog_write(channel, self.range.max());
        } else {
            self.analog_write(channel, self.range.min());
        }
    }

    /// Set the status LED colour, one 8-bit level per leg. The LED legs are
    /// driven directly over PWM, not through the DAC.
    pub fn colour(&mut self, r: u8, g: u8, b: u8) {
        self.leds.red.set_duty(r);
        self.leds.green.set_duty(g);
        self.leds.blue.set_duty(b);
        self.state.colour = [r, g, b];
    }

    /// Set the status LED colour from 0.0..1.0 fractions; out-of-range
    /// fractions clip to full off/on.
    pub fn colour_f(&mut self, r: f32, g: f32, b: f32) {
        self.colour(
            led_level_from_fraction(r),
            led_level_from_fraction(g),
            led_level_from_fraction(b),
        );
    }

    // Position of the pot as a 0.0..1.0 fraction. No connection sensing.
    pub fn pot(&mut self) -> f32 {
        let fraction = self.aux.pot.read_counts() as f32 / ADC_FULL_SCALE_COUNTS as f32;
        self.state.pot = fraction;
        fraction
    }

    // Each DIP accessor re-samples the shared ladder line, so the three
    // bits are not guaranteed mutually consistent if the voltage moves
    // between calls. Callers that need an atomic view must read all three
    // within one quiet window.
    fn dip_code(&mut self) -> u8 {
        dip_ladder::decode(self.aux.dip.read_counts())
    }

    pub fn dip1(&mut self) -> bool {
        let on = self.dip_code() & 0b100 != 0;
        self.state.dips[0] = on;
        on
    }

    pub fn dip2(&mut self) -> bool {
        let on = self.dip_code() & 0b010 != 0;
        self.state.dips[1] = on;
        on
    }

    pub fn dip3(&mut self) -> bool {
        let on = self.dip_code() & 0b001 != 0;
        self.state.dips[2] = on;
        on
    }

    // True if the master controller is plugged in (sense line active-low).
    pub fn master_connected(&mut self) -> bool {
        self.aux.master_sense.is_low().unwrap_or(false)
    }

    /// Value of the master controller as a 0.0..1.0 fraction; 0.0 if no
    /// master is connected.
    pub fn master_read(&mut self) -> f32 {
        let value = if self.master_connected() {
            self.aux.master_analog.read_counts() as f32 / ADC_FULL_SCALE_COUNTS as f32
        } else {
            0.0
        };
        self.state.master = value;
        value
    }

    // State of the master switch (true is pressed).
    pub fn master_sw(&mut self) -> bool {
        let pressed = self.aux.master_sense.is_low().unwrap_or(false);
        self.state.master_sw = pressed;
        pressed
    }

    // State of the push switch (true is pressed).
    pub fn sw(&mut self) -> bool {
        let pressed = self.aux.switch.is_low().unwrap_or(false);
        self.state.sw = pressed;
        pressed
    }

    /// Print the cached state to a serial sink as one labelled line.
    pub fn print_state<W: uWrite>(&self, serial: &mut W) -> Result<(), W::Error> {
        report::print_state(serial, &self.state)
    }

    pub fn return_parts(
        self,
    ) -> (
        B,
        DacSelectPins<Cs1, Cs2>,
        InputPins<A1, S1, A2, S2, A3, S3>,
        LedPins<R, G, Bl>,
        AuxPins<Pot, Dip, Ma, Ms, Sw>,
    ) {
        (
            self.bus,
            self.dac.return_pins(),
            self.inputs,
            self.leds,
            self.aux,
        )
    }
}
