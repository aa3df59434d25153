// Host-side test doubles: recording output lines, settable input lines, and
// a frame-level bus recorder. These satisfy the same traits the hardware
// pins do, so the protocol and facade logic run unmodified against them.

use core::cell::RefCell;
use core::convert::Infallible;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::{InputPin, OutputPin};
use embedded_hal::PwmPin;

use crate::bus::DacBus;
use crate::mapping::{AuxPins, DacSelectPins, InputChannelPins, InputPins, LedPins};
use crate::node::Node;
use crate::range::Range;
use crate::AnalogInput;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Wire {
    Clock,
    Data,
    Cs1,
    Cs2,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Event {
    Level { wire: Wire, high: bool },
    Wait { micros: u16 },
}

pub type Log = Rc<RefCell<Vec<Event>>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Output line that appends every transition to a shared log, preserving
/// ordering across lines.
pub struct LineRecorder {
    wire: Wire,
    log: Log,
}

impl LineRecorder {
    pub fn new(wire: Wire, log: &Log) -> LineRecorder {
        LineRecorder {
            wire,
            log: Rc::clone(log),
        }
    }
}

impl OutputPin for LineRecorder {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(Event::Level {
            wire: self.wire,
            high: false,
        });
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(Event::Level {
            wire: self.wire,
            high: true,
        });
        Ok(())
    }
}

/// Delay source that logs the requested waits instead of sleeping.
pub struct LoggedDelay {
    log: Log,
}

impl LoggedDelay {
    pub fn new(log: &Log) -> LoggedDelay {
        LoggedDelay {
            log: Rc::clone(log),
        }
    }
}

impl DelayUs<u16> for LoggedDelay {
    fn delay_us(&mut self, us: u16) {
        self.log.borrow_mut().push(Event::Wait { micros: us });
    }
}

/// Digital input with an externally settable level and unlimited reads.
pub struct LevelPin {
    high: Rc<RefCell<bool>>,
}

impl LevelPin {
    pub fn new(high: bool) -> (LevelPin, Rc<RefCell<bool>>) {
        let level = Rc::new(RefCell::new(high));
        (
            LevelPin {
                high: Rc::clone(&level),
            },
            level,
        )
    }
}

impl InputPin for LevelPin {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(*self.high.borrow())
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(!*self.high.borrow())
    }
}

/// Analog line with externally settable counts. Digital reads of the same
/// line threshold at half scale, like a GPIO stage on an analog pin.
pub struct AnalogLine {
    counts: Rc<RefCell<u16>>,
}

impl AnalogLine {
    pub fn new(counts: u16) -> (AnalogLine, Rc<RefCell<u16>>) {
        let shared = Rc::new(RefCell::new(counts));
        (
            AnalogLine {
                counts: Rc::clone(&shared),
            },
            shared,
        )
    }
}

impl AnalogInput for AnalogLine {
    fn read_counts(&mut self) -> u16 {
        *self.counts.borrow()
    }
}

impl InputPin for AnalogLine {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(*self.counts.borrow() >= 512)
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(*self.counts.borrow() < 512)
    }
}

/// PWM leg that records its duty.
pub struct FakePwm {
    duty: Rc<RefCell<u8>>,
}

impl FakePwm {
    pub fn new() -> (FakePwm, Rc<RefCell<u8>>) {
        let duty = Rc::new(RefCell::new(0));
        (
            FakePwm {
                duty: Rc::clone(&duty),
            },
            duty,
        )
    }
}

impl PwmPin for FakePwm {
    type Duty = u8;

    fn disable(&mut self) {}

    fn enable(&mut self) {}

    fn get_duty(&self) -> u8 {
        *self.duty.borrow()
    }

    fn get_max_duty(&self) -> u8 {
        255
    }

    fn set_duty(&mut self, duty: u8) {
        *self.duty.borrow_mut() = duty;
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BusOp {
    Start,
    Bit(bool),
    Ack,
    Stop,
}

/// Bus double that records frame-level operations for shape assertions.
pub struct BusRecorder {
    ops: Rc<RefCell<Vec<BusOp>>>,
}

impl BusRecorder {
    pub fn new() -> (BusRecorder, Rc<RefCell<Vec<BusOp>>>) {
        let ops = Rc::new(RefCell::new(Vec::new()));
        (
            BusRecorder {
                ops: Rc::clone(&ops),
            },
            ops,
        )
    }
}

impl DacBus for BusRecorder {
    fn start_condition(&mut self) {
        self.ops.borrow_mut().push(BusOp::Start);
    }

    fn write_bit(&mut self, bit: bool) {
        self.ops.borrow_mut().push(BusOp::Bit(bit));
    }

    fn release_ack(&mut self) {
        self.ops.borrow_mut().push(BusOp::Ack);
    }

    fn stop_condition(&mut self) {
        self.ops.borrow_mut().push(BusOp::Stop);
    }
}

pub type TestNode = Node<
    BusRecorder,
    LineRecorder,
    LineRecorder,
    AnalogLine,
    LevelPin,
    AnalogLine,
    LevelPin,
    AnalogLine,
    LevelPin,
    FakePwm,
    FakePwm,
    FakePwm,
    AnalogLine,
    AnalogLine,
    AnalogLine,
    LevelPin,
    LevelPin,
>;

/// Shared handles into every fake a [`test_node`] owns.
pub struct NodeHandles {
    pub bus_ops: Rc<RefCell<Vec<BusOp>>>,
    pub select_log: Log,
    pub input_counts: [Rc<RefCell<u16>>; 3],
    pub input_sense: [Rc<RefCell<bool>>; 3],
    pub led_duties: [Rc<RefCell<u8>>; 3],
    pub pot_counts: Rc<RefCell<u16>>,
    pub dip_counts: Rc<RefCell<u16>>,
    pub master_counts: Rc<RefCell<u16>>,
    pub master_sense: Rc<RefCell<bool>>,
    pub switch_level: Rc<RefCell<bool>>,
}

// Build a fully faked node. Defaults: nothing plugged in, switches
// released, DIP ladder at full scale (all switches off), every analog line
// at zero counts.
pub fn test_node(range: Range) -> (TestNode, NodeHandles) {
    let (bus, bus_ops) = BusRecorder::new();
    let select_log = new_log();
    let select = DacSelectPins {
        cs1: LineRecorder::new(Wire::Cs1, &select_log),
        cs2: LineRecorder::new(Wire::Cs2, &select_log),
    };

    let (in1_analog, in1_counts) = AnalogLine::new(0);
    let (in2_analog, in2_counts) = AnalogLine::new(0);
    let (in3_analog, in3_counts) = AnalogLine::new(0);
    let (in1_sense, in1_level) = LevelPin::new(true);
    let (in2_sense, in2_level) = LevelPin::new(true);
    let (in3_sense, in3_level) = LevelPin::new(true);
    let inputs = InputPins {
        in1: InputChannelPins {
            analog: in1_analog,
            sense: in1_sense,
        },
        in2: InputChannelPins {
            analog: in2_analog,
            sense: in2_sense,
        },
        in3: InputChannelPins {
            analog: in3_analog,
            sense: in3_sense,
        },
    };

    let (red, red_duty) = FakePwm::new();
    let (green, green_duty) = FakePwm::new();
    let (blue, blue_duty) = FakePwm::new();
    let leds = LedPins { red, green, blue };

    let (pot, pot_counts) = AnalogLine::new(0);
    let (dip, dip_counts) = AnalogLine::new(1023);
    let (master_analog, master_counts) = AnalogLine::new(0);
    let (master_sense, master_level) = LevelPin::new(true);
    let (switch, switch_level) = LevelPin::new(true);
    let aux = AuxPins {
        pot,
        dip,
        master_analog,
        master_sense,
        switch,
    };

    let node = Node::with_range(bus, select, inputs, leds, aux, range);
    let handles = NodeHandles {
        bus_ops,
        select_log,
        input_counts: [in1_counts, in2_counts, in3_counts],
        input_sense: [in1_level, in2_level, in3_level],
        led_duties: [red_duty, green_duty, blue_duty],
        pot_counts,
        dip_counts,
        master_counts,
        master_sense: master_level,
        switch_level,
    };
    (node, handles)
}
