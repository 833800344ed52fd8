//! Simulated boards for the mock backend, so every command can be tried on a
//! host without adapters.

use device_registry::drivers::{ad5694, ads7828, dac7578, mcp23009, mpl115, tmp75};
use device_registry::SubsystemKind;
use i2c_transport::{MockBus, MockDevice};

fn hv_board(bus: MockBus) -> MockBus {
    let mut adc = MockDevice::new();
    for ch in 0..8u8 {
        let code = 0x0200 + 0x0100 * u16::from(ch);
        adc = adc.with_word(ads7828::command_byte(ch), code.swap_bytes());
    }
    let mut dac = MockDevice::new();
    for ch in 0..ad5694::CHANNELS {
        dac = dac.route_word(ad5694::write_command(ch), ad5694::readback_register(ch));
    }
    let io = MockDevice::new().with_byte(mcp23009::REG_GPIO, 0x01);
    bus.with_device(0x48, adc)
        .with_device(0x0c, dac)
        .with_device(0x20, io)
}

fn sensors_board(bus: MockBus) -> MockBus {
    let tmp = MockDevice::new().with_word(tmp75::REG_TEMP, 0x1900_u16.swap_bytes());
    let sht = MockDevice::new().with_raw_bytes(&[0x68, 0x50]);
    let mpl = MockDevice::new()
        .with_word(mpl115::REG_PADC, 0x6680_u16.swap_bytes())
        .with_word(mpl115::REG_TADC, 0x7EC0_u16.swap_bytes())
        .with_word(mpl115::REG_A0, 0x3ECE_u16.swap_bytes())
        .with_word(mpl115::REG_B1, 0xB3F9_u16.swap_bytes())
        .with_word(mpl115::REG_B2, 0xC517_u16.swap_bytes())
        .with_word(mpl115::REG_C12, 0x33C8_u16.swap_bytes());
    bus.with_device(0x48, tmp)
        .with_device(0x40, sht)
        .with_device(0x60, mpl)
}

fn prec_board(bus: MockBus) -> MockBus {
    let mut dac = MockDevice::new();
    for ch in 0..8u8 {
        dac = dac.route_word(dac7578::write_command(ch), dac7578::readback_register(ch));
    }
    bus.with_device(0x48, dac)
}

/// A mock adapter populated like a board of `kind`.
pub fn mock_bus(adapter: u8, kind: Option<SubsystemKind>) -> MockBus {
    let bus = MockBus::new(adapter);
    match kind {
        Some(SubsystemKind::Hv) => hv_board(bus),
        Some(SubsystemKind::Sensors) => sensors_board(bus),
        Some(SubsystemKind::Prec) => prec_board(bus),
        None => bus,
    }
}
