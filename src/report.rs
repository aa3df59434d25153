// Human-readable dump of the node's cached state: one comma-separated,
// labelled line per call. Debugging aid only; the shape is not a machine
// interface.

use ufmt::{uWrite, uwrite};

use crate::node::NodeState;

pub fn print_state<W: uWrite>(serial: &mut W, state: &NodeState) -> Result<(), W::Error> {
    uwrite!(serial, "RGB: ")?;
    for level in state.colour {
        uwrite!(serial, "{}, ", level)?;
    }
    uwrite!(serial, "Ins: ")?;
    for input in &state.inputs {
        write_fraction(serial, input.value)?;
        uwrite!(serial, ", ")?;
    }
    uwrite!(serial, "Outs: ")?;
    for value in state.outputs {
        write_fraction(serial, value)?;
        uwrite!(serial, ", ")?;
    }
    uwrite!(serial, "Pot: ")?;
    write_fraction(serial, state.pot)?;
    uwrite!(serial, ", Master: ")?;
    write_fraction(serial, state.master)?;
    uwrite!(serial, ", Master Sw: {}, DIPs: ", state.master_sw as u8)?;
    for dip in state.dips {
        uwrite!(serial, "{}, ", dip as u8)?;
    }
    uwrite!(serial, "Sw: {}\r\n", state.sw as u8)
}

// ufmt has no float support, so reals go out as three-decimal fixed point
// built with integer math.
fn write_fraction<W: uWrite>(serial: &mut W, value: f32) -> Result<(), W::Error> {
    let thousandths = libm::roundf(value * 1000.0) as i32;
    let (sign, magnitude) = if thousandths < 0 {
        ("-", -thousandths)
    } else {
        ("", thousandths)
    };
    uwrite!(
        serial,
        "{}{}.{}{}{}",
        sign,
        magnitude / 1000,
        (magnitude / 100) % 10,
        (magnitude / 10) % 10,
        magnitude % 10
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::InputState;

    struct StringWriter(String);

    impl uWrite for StringWriter {
        type Error = core::convert::Infallible;

        fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
            self.0.push_str(s);
            Ok(())
        }
    }

    fn render(state: &NodeState) -> String {
        let mut writer = StringWriter(String::new());
        print_state(&mut writer, state).unwrap();
        writer.0
    }

    #[test]
    fn blank_state_renders_all_fields() {
        assert_eq!(
            render(&NodeState::default()),
            "RGB: 0, 0, 0, Ins: 0.000, 0.000, 0.000, Outs: 0.000, 0.000, 0.000, \
             Pot: 0.000, Master: 0.000, Master Sw: 0, DIPs: 0, 0, 0, Sw: 0\r\n"
        );
    }

    #[test]
    fn values_render_as_three_decimal_fixed_point() {
        let state = NodeState {
            colour: [255, 0, 64],
            inputs: [
                InputState {
                    value: 0.5,
                    connected: true,
                },
                InputState::default(),
                InputState::default(),
            ],
            outputs: [1.0, 0.125, 0.0],
            pot: 0.25,
            master: 1.0,
            master_sw: true,
            dips: [true, false, true],
            sw: true,
        };
        assert_eq!(
            render(&state),
            "RGB: 255, 0, 64, Ins: 0.500, 0.000, 0.000, Outs: 1.000, 0.125, 0.000, \
             Pot: 0.250, Master: 1.000, Master Sw: 1, DIPs: 1, 0, 1, Sw: 1\r\n"
        );
    }

    #[test]
    fn negative_values_keep_their_sign() {
        let state = NodeState {
            outputs: [-0.5, 0.0, 0.0],
            ..NodeState::default()
        };
        assert!(render(&state).contains("Outs: -0.500, 0.000, 0.000"));
    }
}
