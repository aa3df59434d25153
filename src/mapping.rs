// This file acts as an abstraction layer for board-specific values: how the
// node's logical channels map onto physical lines, and the constants baked
// into the board's converters and the DIP switch resistor ladder. The
// mapping from logical channel to physical pin is data supplied at
// construction, not literals scattered through the drivers.

// Full-scale raw reading of the host's 10-bit ADC.
pub const ADC_FULL_SCALE_COUNTS: u16 = 1023;

// Full-scale PWM level for one LED leg.
pub const LED_LEVEL_MAX: u8 = 255;

/// Chip-select lines for the two DAC packages sharing the bus.
pub struct DacSelectPins<Cs1, Cs2> {
    pub cs1: Cs1,
    pub cs2: Cs2,
}

/// One input channel: the signal line plus its connection-sense line.
/// The signal line is also read digitally by `digital_read`, so it carries
/// both the analog and the digital input trait.
pub struct InputChannelPins<A, S> {
    pub analog: A,
    pub sense: S,
}

pub struct InputPins<A1, S1, A2, S2, A3, S3> {
    pub in1: InputChannelPins<A1, S1>,
    pub in2: InputChannelPins<A2, S2>,
    pub in3: InputChannelPins<A3, S3>,
}

/// The RGB status indicator, one PWM-capable leg per colour.
pub struct LedPins<R, G, B> {
    pub red: R,
    pub green: G,
    pub blue: B,
}

/// Everything that is not a numbered I/O channel: the potentiometer, the
/// shared DIP ladder line, the master controller's analog line and sense
/// line, and the push switch. The master sense line doubles as the master
/// switch input.
pub struct AuxPins<Pot, Dip, Ma, Ms, Sw> {
    pub pot: Pot,
    pub dip: Dip,
    pub master_analog: Ma,
    pub master_sense: Ms,
    pub switch: Sw,
}

// Convert a 0.0..1.0 fraction to an LED level. The cast saturates, so
// out-of-range fractions clamp to the ends.
pub fn led_level_from_fraction(fraction: f32) -> u8 {
    (fraction * LED_LEVEL_MAX as f32) as u8
}

pub mod dip_ladder {
    // The three DIP switches share one analog line through a resistor
    // ladder; each on/off combination produces a distinct voltage. Nominal
    // counts per combination: 000 -> 1023, 001 -> 768, 010 -> 682,
    // 100 -> 610, 011 -> 557, 101 -> 509, 110 -> 469, 111 -> 407. The
    // thresholds sit between neighbouring nominals.
    const THRESHOLDS: [(u16, u8); 7] = [
        (895, 0b000),
        (725, 0b001),
        (646, 0b010),
        (584, 0b100),
        (533, 0b011),
        (489, 0b101),
        (438, 0b110),
    ];

    /// Decode one raw sample of the ladder line into the 3-bit switch code.
    pub fn decode(raw: u16) -> u8 {
        for &(threshold, code) in THRESHOLDS.iter() {
            if raw > threshold {
                return code;
            }
        }
        0b111
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_decodes_one_count_above_each_threshold() {
        let cases = [
            (896, 0b000),
            (726, 0b001),
            (647, 0b010),
            (611, 0b100),
            (558, 0b011),
            (510, 0b101),
            (439, 0b110),
            (0, 0b111),
        ];
        for (raw, code) in cases {
            assert_eq!(dip_ladder::decode(raw), code, "raw = {}", raw);
        }
    }

    #[test]
    fn ladder_decodes_nominal_counts() {
        assert_eq!(dip_ladder::decode(1023), 0b000);
        assert_eq!(dip_ladder::decode(768), 0b001);
        assert_eq!(dip_ladder::decode(682), 0b010);
        assert_eq!(dip_ladder::decode(610), 0b100);
        assert_eq!(dip_ladder::decode(557), 0b011);
        assert_eq!(dip_ladder::decode(509), 0b101);
        assert_eq!(dip_ladder::decode(469), 0b110);
        assert_eq!(dip_ladder::decode(407), 0b111);
    }

    #[test]
    fn led_levels_saturate() {
        assert_eq!(led_level_from_fraction(0.0), 0);
        assert_eq!(led_level_from_fraction(0.5), 127);
        assert_eq!(led_level_from_fraction(1.0), 255);
        assert_eq!(led_level_from_fraction(1.5), 255);
        assert_eq!(led_level_from_fraction(-0.5), 0);
    }
}
