//! Extraction of card data from Track 2 Equivalent Data (`57`).
//!
//! The track is read as a string of hexadecimal digits, in which the first `d` separates the
//! PAN from the expiry date, the service code and the discretionary data.

use crate::tags;
use crate::tlv::{Tlv, TlvDb};

const SEPARATOR: char = 'd';

const DCVV_DIGITS: usize = 16;
const ATC_OFFSET: usize = 5 + 11;

/// Renders the track as lower-case digits and finds the separator.
/// Gives nothing if there is no separator, or if nothing comes before it.
fn digits(track2: &Tlv) -> Option<(String, usize)> {
    let digits = hex::encode(track2.value());

    match digits.find(SEPARATOR) {
        Some(0) | None => None,
        Some(separator) => Some((digits, separator)),
    }
}

/// Copies up to `count` digits from `src` at `from` into `dst` at `at`.
/// Digits missing from a short track are left as they are.
fn copy_digits(dst: &mut [u8], at: usize, src: &[u8], from: usize, count: usize) {
    let available = src.len().saturating_sub(from).min(count);
    if available > 0 {
        dst[at..at + available].copy_from_slice(&src[from..from + available]);
    }
}

/// Extracts the Application PAN (`5A`) from the digits before the separator.
pub fn extract_pan(track2: &Tlv) -> Option<TlvDb> {
    let (digits, separator) = digits(track2)?;

    let mut pan = digits[..separator].to_string();
    if pan.len() % 2 == 1 {
        pan.push('f');
    }

    let pan = hex::decode(pan).ok()?;

    Some(TlvDb::fixed(tags::APPLICATION_PAN, &pan))
}

/// Rebuilds the raw input block of the dCVV (`02`).
///
/// The 16 digits are the ATC found in the discretionary data, the first 5 digits of the PAN,
/// the expiry date (YYMM) and the service code, in this order.
pub fn extract_dcvv_raw(track2: &Tlv) -> Option<TlvDb> {
    let (digits, separator) = digits(track2)?;
    let src = digits.as_bytes();

    let mut dcvv = [b'0'; DCVV_DIGITS];
    copy_digits(&mut dcvv, 0, src, separator + ATC_OFFSET, 4);
    copy_digits(&mut dcvv, 4, &src[..separator], 0, 5);
    copy_digits(&mut dcvv, 9, src, separator + 1, 4);
    copy_digits(&mut dcvv, 13, src, separator + 5, 3);

    let dcvv = hex::decode(dcvv).ok()?;

    Some(TlvDb::fixed(tags::DCVV_RAW, &dcvv))
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    fn track2(value: &[u8]) -> TlvDb {
        TlvDb::fixed(tags::TRACK_2_EQUIVALENT_DATA, value)
    }

    fn first(db: &TlvDb) -> &Tlv {
        db.node(db.roots()[0])
    }

    const TRACK: [u8; 19] = hex!("4111111111111111D22011200000000000000F");

    #[test]
    fn test_extract_pan() {
        let db = track2(&TRACK);
        let pan = extract_pan(first(&db)).unwrap();

        let record = first(&pan);
        assert_eq!(record.tag(), tags::APPLICATION_PAN);
        assert_eq!(record.value(), &hex!("4111111111111111"));
    }

    #[test]
    fn test_extract_pan_odd_length() {
        let db = track2(&hex!("5413330089600011D25120"));
        let pan = extract_pan(first(&db)).unwrap();

        assert_eq!(first(&pan).value(), &hex!("5413330089600011"));

        let db = track2(&hex!("541333008960001D2512"));
        let pan = extract_pan(first(&db)).unwrap();

        assert_eq!(first(&pan).value(), &hex!("541333008960001F"));
    }

    #[test]
    fn test_extract_without_separator() {
        let db = track2(&hex!("41111111111111112201"));

        assert!(extract_pan(first(&db)).is_none());
        assert!(extract_dcvv_raw(first(&db)).is_none());
    }

    #[test]
    fn test_extract_separator_first() {
        let db = track2(&hex!("D4111111"));

        assert!(extract_pan(first(&db)).is_none());
        assert!(extract_dcvv_raw(first(&db)).is_none());
    }

    #[test]
    fn test_extract_dcvv_raw() {
        let db = track2(&hex!("4111111111111111D22011200000000012340F"));
        let dcvv = extract_dcvv_raw(first(&db)).unwrap();

        let record = first(&dcvv);
        assert_eq!(record.tag(), tags::DCVV_RAW);
        assert_eq!(record.value(), &hex!("1234411112201120"));

        let db = track2(&TRACK);
        let dcvv = extract_dcvv_raw(first(&db)).unwrap();

        assert_eq!(first(&dcvv).value(), &hex!("0000411112201120"));
    }

    #[test]
    fn test_extract_dcvv_raw_short_track() {
        // No discretionary data, and only part of the service code.
        let db = track2(&hex!("4111D22011"));
        let dcvv = extract_dcvv_raw(first(&db)).unwrap();

        assert_eq!(first(&dcvv).value(), &hex!("0000411102201100"));
    }
}
