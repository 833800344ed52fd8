//! Physical quantities to raw register codes.

use crate::ConversionError;

/// Full scale of the 12-bit converters.
pub const CODE_MAX_12BIT: u16 = 0x0FFF;

const TMP75_MIN_C: f64 = -40.0;
const TMP75_MAX_C: f64 = 125.0;

/// Converter code for `value` given the physical value of one count,
/// rounding half up: `floor(value / scale + 0.5)`.
pub fn dac_code(value: f64, scale: f64) -> Result<u16, ConversionError> {
    if !value.is_finite() || !scale.is_finite() || scale <= 0.0 {
        return Err(ConversionError::NotFinite);
    }
    let max = f64::from(CODE_MAX_12BIT) * scale;
    let code = (value / scale + 0.5).floor();
    if value < 0.0 || code > f64::from(CODE_MAX_12BIT) {
        return Err(ConversionError::OutOfRange {
            value,
            min: 0.0,
            max,
        });
    }
    Ok(code as u16)
}

/// Left-align a 12-bit code the way the DACs expect it in their data word.
pub fn dac_word(code: u16) -> u16 {
    (code & CODE_MAX_12BIT) << 4
}

/// Inverse of [`dac_word`].
pub fn dac_word_code(word: u16) -> u16 {
    word >> 4
}

/// TMP75 register value at 12-bit resolution, clamped to the rated range.
pub fn tmp75_register_12bit(celsius: f64) -> u16 {
    let clamped = celsius.clamp(TMP75_MIN_C, TMP75_MAX_C);
    let sixteenths = (clamped * 16.0).round() as i16;
    (sixteenths << 4) as u16
}

/// TMP75 register value at 9-bit resolution from tenths of a degree,
/// used for the alarm limit registers.
pub fn tmp75_register_9bit(tenths: i32) -> u16 {
    let t = tenths.clamp(-400, 1250);
    let t = t + if t < 0 { -2 } else { 2 };
    ((t / 5) << 7) as i16 as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{tmp75_celsius_12bit, tmp75_celsius_9bit};
    use proptest::prelude::*;

    const LSB: f64 = 4.53 / 4096.0;

    #[test]
    fn test_dac_code_boundaries() {
        assert_eq!(dac_code(0.0, 2.0 * LSB), Ok(0));
        let max = f64::from(CODE_MAX_12BIT) * 2.0 * LSB;
        assert_eq!(dac_code(max, 2.0 * LSB), Ok(4095));
        assert!(matches!(
            dac_code(max + 2.0 * LSB, 2.0 * LSB),
            Err(ConversionError::OutOfRange { .. })
        ));
        assert!(dac_code(-0.1, 2.0 * LSB).is_err());
        assert_eq!(dac_code(f64::NAN, LSB), Err(ConversionError::NotFinite));
    }

    #[test]
    fn test_dac_code_rounds_half_up() {
        assert_eq!(dac_code(1.49, 1.0), Ok(1));
        assert_eq!(dac_code(1.5, 1.0), Ok(2));
        // legacy Vset conversion: 0.5 kV with factor 2
        assert_eq!(dac_code(0.5, 2.0 * LSB), Ok(226));
    }

    #[test]
    fn test_dac_word_stays_in_16_bits() {
        assert_eq!(dac_word(4095), 0xFFF0);
        assert_eq!(dac_word(0), 0);
        assert_eq!(dac_word_code(dac_word(1234)), 1234);
    }

    #[test]
    fn test_tmp75_register_clamps() {
        assert_eq!(tmp75_register_12bit(25.0), 0x1900);
        assert_eq!(tmp75_register_12bit(-25.0), 0xE700);
        assert_eq!(tmp75_register_12bit(200.0), 0x7D00);
        assert_eq!(tmp75_register_12bit(-80.0), 0xD800);
    }

    #[test]
    fn test_tmp75_register_9bit_limits() {
        assert_eq!(tmp75_celsius_9bit(tmp75_register_9bit(800)), 80.0);
        assert_eq!(tmp75_celsius_9bit(tmp75_register_9bit(-255)), -25.5);
        assert_eq!(tmp75_celsius_9bit(tmp75_register_9bit(2000)), 125.0);
    }

    proptest! {
        #[test]
        fn tmp75_round_trip_within_one_lsb(v in -40.0f64..=125.0) {
            let back = tmp75_celsius_12bit(tmp75_register_12bit(v));
            prop_assert!((back - v).abs() <= 0.0625);
        }

        #[test]
        fn dac_code_never_exceeds_12_bits(v in 0.0f64..=9.0) {
            let code = dac_code(v, 2.0 * LSB).unwrap();
            prop_assert!(code <= CODE_MAX_12BIT);
        }
    }
}
