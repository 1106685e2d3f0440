//! Register value codecs
//!
//! The controller stores temperatures in tenths of a degree as unsigned 16-bit
//! values. Anything above [`NEGATIVE_TEMPERATURE_THRESHOLD`] is a negative
//! temperature offset from 65535 (not two's complement: 65535 reads as 0.0).

/// Raw values above this are negative temperatures
pub const NEGATIVE_TEMPERATURE_THRESHOLD: u16 = 62803;

const TEMPERATURE_OFFSET: i32 = 65535;

/// Decode a raw temperature register into degrees Celsius (1 decimal)
pub fn decode_temperature(raw: u16) -> f64 {
    let signed = if raw > NEGATIVE_TEMPERATURE_THRESHOLD {
        i32::from(raw) - TEMPERATURE_OFFSET
    } else {
        i32::from(raw)
    };
    round_one_decimal(f64::from(signed) / 10.0)
}

/// Encode degrees Celsius into the controller's tenths representation
pub fn encode_temperature(celsius: f64) -> u16 {
    let tenths = (celsius * 10.0).round() as i32;
    let raw = if tenths < 0 {
        tenths + TEMPERATURE_OFFSET
    } else {
        tenths
    };
    raw.clamp(0, i32::from(u16::MAX)) as u16
}

/// Decode a version register: the decimal digits are the version components.
///
/// `150` becomes `"1.5.0"`, `270` becomes `"2.7.0"`, `0` becomes `"0.0.0"`.
pub fn decode_version(raw: u16) -> String {
    let digits = raw.to_string();
    let mut parts: Vec<String> = digits.chars().map(String::from).collect();
    while parts.len() < 3 {
        parts.push("0".to_string());
    }
    parts.join(".")
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
