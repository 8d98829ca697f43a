//! Turns provider text into a `MeasurementResult`.

use crate::domain::MeasurementResult;
use crate::extraction::RawExtraction;
use crate::images::ImageStoreError;
use thiserror::Error;
use uuid::Uuid;

const MAX_ECHOED_TEXT: usize = 64;

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("extraction text is not a finite number: {0:?}")]
    InvalidValue(String),
    #[error(transparent)]
    ImageStore(#[from] ImageStoreError),
}

/// Build the response for a successful extraction with a fresh v4 `measure_uuid`.
pub fn assemble(
    raw: &RawExtraction,
    image_url: String,
) -> Result<MeasurementResult, AssemblyError> {
    let measure_value = parse_measure_value(&raw.text)?;
    Ok(MeasurementResult {
        image_url,
        measure_value,
        measure_uuid: Uuid::new_v4(),
    })
}

/// Parse the leading decimal number of `text`, ignoring trailing units or prose.
///
/// `"123.45"` and `"123.45 m3"` both give `123.45`. Text without a leading
/// number, and NaN or infinite values, are errors.
pub fn parse_measure_value(text: &str) -> Result<f64, AssemblyError> {
    let number = leading_number(text);
    number
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AssemblyError::InvalidValue(echo(text)))
}

fn leading_number(text: &str) -> &str {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let len = bytes.len();
    let digits_from = |mut i: usize| {
        while i < len && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_end = digits_from(end);
    let mut digits = int_end - end;
    end = int_end;

    if end < len && bytes[end] == b'.' {
        let frac_end = digits_from(end + 1);
        if digits > 0 || frac_end > end + 1 {
            digits += frac_end - (end + 1);
            end = frac_end;
        }
    }
    if digits == 0 {
        return "";
    }

    if end < len && matches!(bytes[end], b'e' | b'E') {
        let mut exp = end + 1;
        if exp < len && matches!(bytes[exp], b'+' | b'-') {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    &s[..end]
}

fn echo(text: &str) -> String {
    text.chars().take(MAX_ECHOED_TEXT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_decimal() {
        assert_eq!(parse_measure_value("123.45").unwrap(), 123.45);
    }

    #[test]
    fn test_leading_number_with_units() {
        assert_eq!(parse_measure_value("  00742 m³").unwrap(), 742.0);
        assert_eq!(parse_measure_value("123.45\n").unwrap(), 123.45);
        assert_eq!(parse_measure_value("-3.5kWh").unwrap(), -3.5);
        assert_eq!(parse_measure_value(".5").unwrap(), 0.5);
        assert_eq!(parse_measure_value("7.").unwrap(), 7.0);
        assert_eq!(parse_measure_value("1.2e3 units").unwrap(), 1200.0);
        assert_eq!(parse_measure_value("12e").unwrap(), 12.0);
    }

    #[test]
    fn test_unparseable_text_is_error() {
        for text in ["", "   ", "no reading visible", "NaN", "inf", "Infinity", "-", "."] {
            assert!(
                matches!(parse_measure_value(text), Err(AssemblyError::InvalidValue(_))),
                "expected error for {:?}",
                text
            );
        }
    }

    #[test]
    fn test_overflow_is_error() {
        assert!(parse_measure_value("1e400").is_err());
    }

    #[test]
    fn test_error_echo_is_truncated() {
        let long = "x".repeat(500);
        match parse_measure_value(&long) {
            Err(AssemblyError::InvalidValue(echoed)) => {
                assert_eq!(echoed.len(), MAX_ECHOED_TEXT)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_assemble_mints_distinct_v4_uuids() {
        let raw = RawExtraction::new("10");
        let a = assemble(&raw, "https://img.test/a".to_string()).unwrap();
        let b = assemble(&raw, "https://img.test/a".to_string()).unwrap();
        assert_eq!(a.measure_value, 10.0);
        assert_eq!(a.image_url, "https://img.test/a");
        assert_eq!(a.measure_uuid.get_version_num(), 4);
        assert_ne!(a.measure_uuid, b.measure_uuid);
    }
}
