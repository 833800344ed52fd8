//! Raw register codes to physical quantities. Pure functions, no I/O.

use crate::ConversionError;

/// Linear converter channel: `raw * lsb * factor`.
pub fn scaled(raw: u16, lsb: f64, factor: f64) -> f64 {
    f64::from(raw) * lsb * factor
}

/// State of digital line `bit` in an I/O expander port value.
pub fn line_state(port: u16, bit: usize) -> bool {
    bit < 16 && port & (1 << bit) != 0
}

/// TMP75 temperature register at 12-bit resolution, in degrees Celsius.
///
/// The register is two's complement, left aligned; the shift must stay
/// arithmetic so negative temperatures keep their sign.
pub fn tmp75_celsius_12bit(register: u16) -> f64 {
    let sixteenths = (register as i16) >> 4;
    f64::from(sixteenths) * 0.0625
}

/// TMP75 temperature register at 9-bit resolution (0.5 C steps).
pub fn tmp75_celsius_9bit(register: u16) -> f64 {
    let halves = (register as i16) >> 7;
    f64::from(halves) * 0.5
}

/// Clear the two SHT21 status bits.
fn sht21_ticks(raw: u16) -> i32 {
    i32::from(raw & !0x0003)
}

/// SHT21 relative humidity in thousandths of a percent.
///
/// RH = -6 + 125 * S / 2^16, in integer fixed point.
pub fn sht21_humidity_milli_percent(raw: u16) -> i32 {
    ((15625 * sht21_ticks(raw)) >> 13) - 6000
}

/// Per-unit calibration words of an MPL115A2, as read from the part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mpl115Coefficients {
    /// 12 integer bits, 3 fractional bits
    pub a0: i16,
    /// 2 integer bits, 13 fractional bits
    pub b1: i16,
    /// 1 integer bit, 14 fractional bits
    pub b2: i16,
    /// 13 fractional bits, 9 zero pad
    pub c12: i16,
}

/// Compensated MPL115A2 pressure in kPa with 4 fractional bits (kPa * 16).
///
/// `padc` and `tadc` are the 10-bit conversion results (already shifted
/// down by 6).
pub fn mpl115_pressure_x16(
    c: Mpl115Coefficients,
    padc: u16,
    tadc: u16,
) -> Result<i32, ConversionError> {
    let overflow = || ConversionError::Overflow("mpl115 compensation");
    let padc = i32::from(padc);
    let tadc = i32::from(tadc);

    let c12_t = i32::from(c.c12).checked_mul(tadc).ok_or_else(overflow)?;
    let a1 = i32::from(c.b1).checked_add(c12_t >> 11).ok_or_else(overflow)?;
    let a0_shifted = i32::from(c.a0).checked_mul(1 << 10).ok_or_else(overflow)?;
    let y1 = a1
        .checked_mul(padc)
        .and_then(|v| v.checked_add(a0_shifted))
        .ok_or_else(overflow)?;
    let b2_t = i32::from(c.b2).checked_mul(tadc).ok_or_else(overflow)?;
    let pcomp = y1.checked_add(b2_t >> 1).ok_or_else(overflow)? >> 9;

    // map 0..=1023 onto 50..=115 kPa
    let span = pcomp.checked_mul(115 - 50).ok_or_else(overflow)? / 1023;
    span.checked_add(50 << 4).ok_or_else(overflow)
}

/// Pressure in kPa from the 4-fractional-bit fixed point value.
pub fn mpl115_kpa(x16: i32) -> f64 {
    f64::from(x16) / 16.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_scaled_adc_channel() {
        let lsb = 4.53 / 4096.0;
        assert!((scaled(2048, lsb, 2.0) - 4.53).abs() < 1e-9);
        assert_eq!(scaled(0, lsb, 400.0), 0.0);
    }

    #[test]
    fn test_line_state() {
        assert!(line_state(0x08, 3));
        assert!(!line_state(0x08, 2));
        assert!(!line_state(0xFFFF, 16));
    }

    #[test]
    fn test_tmp75_positive_and_negative() {
        assert_eq!(tmp75_celsius_12bit(0x1900), 25.0);
        assert_eq!(tmp75_celsius_12bit(0xE700), -25.0);
        assert_eq!(tmp75_celsius_12bit(0xFFF0), -0.0625);
        assert_eq!(tmp75_celsius_12bit(0x7D00), 125.0);
        assert_eq!(tmp75_celsius_12bit(0xD800), -40.0);
    }

    #[test]
    fn test_tmp75_9bit_keeps_sign() {
        assert_eq!(tmp75_celsius_9bit(0x1980), 25.5);
        assert_eq!(tmp75_celsius_9bit(0xFF80), -0.5);
    }

    #[test]
    fn test_sht21_datasheet_ticks() {
        // 0x6850 is the datasheet example word
        assert_eq!(sht21_humidity_milli_percent(0x6850), 44933);
        // status bits are ignored
        assert_eq!(
            sht21_humidity_milli_percent(0x6853),
            sht21_humidity_milli_percent(0x6850)
        );
        assert_eq!(sht21_humidity_milli_percent(0), -6000);
        assert_eq!(sht21_humidity_milli_percent(0xFFFF), 118992);
    }

    #[test]
    fn test_mpl115_datasheet_example() {
        let c = Mpl115Coefficients {
            a0: 0x3ECE,
            b1: 0xB3F9_u16 as i16,
            b2: 0xC517_u16 as i16,
            c12: 0x33C8,
        };
        let p = mpl115_pressure_x16(c, 0x6680 >> 6, 0x7EC0 >> 6).unwrap();
        assert_eq!(p, 1545);
        // datasheet: 96.59 kPa
        assert!((mpl115_kpa(p) - 96.59).abs() <= 0.0625);
    }

    #[test]
    fn test_mpl115_extreme_words_stay_in_range() {
        let c = Mpl115Coefficients {
            a0: i16::MIN,
            b1: i16::MIN,
            b2: i16::MIN,
            c12: i16::MIN,
        };
        assert!(mpl115_pressure_x16(c, 1023, 1023).is_ok());
        let c = Mpl115Coefficients {
            a0: i16::MAX,
            b1: i16::MAX,
            b2: i16::MAX,
            c12: i16::MAX,
        };
        assert!(mpl115_pressure_x16(c, 1023, 1023).is_ok());
    }

    proptest! {
        #[test]
        fn humidity_is_monotonic(a in any::<u16>(), b in any::<u16>()) {
            let (lo, hi) = if (a & !3) <= (b & !3) { (a, b) } else { (b, a) };
            prop_assert!(sht21_humidity_milli_percent(lo) <= sht21_humidity_milli_percent(hi));
        }
    }
}
