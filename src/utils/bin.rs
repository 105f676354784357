/*
 * Binary buffer helpers: byte order mark detection, decoding of text files
 * into `String`, and fixed-width integer (de)serialization.
 */

use crate::error::{PlatformError, Result as PlatformResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Unknown,
    Ascii,
    Win1252,
    Utf8,
    Utf16Be,
    Utf16Le,
    Utf32Be,
    Utf32Le,
    Scsu,
    Bocu1,
}

/// Detected encoding and the size in bytes of its byte order mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodingInfo {
    pub encoding: Encoding,
    pub bom_size: usize,
}

// UTF-32 LE must be checked before UTF-16 LE, whose mark is its prefix.
const BOMS: [(&[u8], Encoding); 7] = [
    (&[0xEF, 0xBB, 0xBF], Encoding::Utf8),
    (&[0xFF, 0xFE, 0x00, 0x00], Encoding::Utf32Le),
    (&[0x00, 0x00, 0xFE, 0xFF], Encoding::Utf32Be),
    (&[0xFE, 0xFF], Encoding::Utf16Be),
    (&[0xFF, 0xFE], Encoding::Utf16Le),
    (&[0x0E, 0xFE, 0xFF], Encoding::Scsu),
    (&[0xFB, 0xEE, 0x28], Encoding::Bocu1),
];

// Code points of Windows-1252 bytes 0x80..=0x9F. Undefined bytes map to
// themselves, like the OS conversion does.
const WIN1252_HIGH: [u16; 32] = [
    0x20AC, 0x0081, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, 0x02C6, 0x2030, 0x0160, 0x2039,
    0x0152, 0x008D, 0x017D, 0x008F, 0x0090, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013, 0x2014,
    0x02DC, 0x2122, 0x0161, 0x203A, 0x0153, 0x009D, 0x017E, 0x0178,
];

/*
 * Guesses the encoding of a text buffer. Without a byte order mark, any
 * two-byte sequence typical of UTF-8 encoded Latin-1 letters means UTF-8;
 * otherwise bytes above 0x7F mean Windows-1252, and plain ASCII is left.
 */
pub fn guess_encoding(data: &[u8]) -> EncodingInfo {
    if let Some((bom, encoding)) = BOMS.iter().find(|(bom, _)| data.starts_with(bom)) {
        return EncodingInfo {
            encoding: *encoding,
            bom_size: bom.len(),
        };
    }

    let mut can_be_win1252 = false;
    for (i, &byte) in data.iter().enumerate() {
        if byte <= 0x7F {
            continue;
        }
        can_be_win1252 = true;
        if let Some(&next) = data.get(i + 1) {
            let utf8_pair = (byte == 0xC2 && (0xA1..=0xBF).contains(&next))
                || (byte == 0xC3 && (0x80..=0xBF).contains(&next));
            if utf8_pair {
                return EncodingInfo {
                    encoding: Encoding::Utf8,
                    bom_size: 0,
                };
            }
        }
    }
    EncodingInfo {
        encoding: if can_be_win1252 {
            Encoding::Win1252
        } else {
            Encoding::Ascii
        },
        bom_size: 0,
    }
}

/// Decodes a text buffer, guessing its encoding and skipping its byte order mark.
pub fn parse_str(data: &[u8]) -> PlatformResult<String> {
    if data.is_empty() {
        return Ok(String::new());
    }
    let info = guess_encoding(data);
    let body = &data[info.bom_size..];

    match info.encoding {
        Encoding::Unknown | Encoding::Ascii => {
            Ok(until_null(body).iter().map(|&b| char::from(b)).collect())
        }
        Encoding::Win1252 => Ok(until_null(body).iter().map(|&b| win1252_char(b)).collect()),
        Encoding::Utf8 => Ok(String::from_utf8_lossy(until_null(body)).into_owned()),
        Encoding::Utf16Be => Ok(decode_utf16(body, u16::from_be_bytes)),
        Encoding::Utf16Le => Ok(decode_utf16(body, u16::from_le_bytes)),
        Encoding::Utf32Be => Err(PlatformError::invalid_argument(
            "UTF-32 big endian: encoding not implemented.",
        )),
        Encoding::Utf32Le => Err(PlatformError::invalid_argument(
            "UTF-32 little endian: encoding not implemented.",
        )),
        Encoding::Scsu => Err(PlatformError::invalid_argument(
            "Standard compression scheme for Unicode: encoding not implemented.",
        )),
        Encoding::Bocu1 => Err(PlatformError::invalid_argument(
            "Binary ordered compression for Unicode: encoding not implemented.",
        )),
    }
}

fn until_null(data: &[u8]) -> &[u8] {
    match data.iter().position(|&b| b == 0) {
        Some(end) => &data[..end],
        None => data,
    }
}

fn win1252_char(byte: u8) -> char {
    let code = match byte {
        0x80..=0x9F => WIN1252_HIGH[usize::from(byte - 0x80)],
        other => u16::from(other),
    };
    char::from_u32(u32::from(code)).unwrap_or(char::REPLACEMENT_CHARACTER)
}

// A trailing odd byte is dropped.
fn decode_utf16(data: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

fn head<const N: usize>(data: &[u8]) -> Option<[u8; N]> {
    data.get(..N)?.try_into().ok()
}

pub fn parse_u16_be(data: &[u8]) -> Option<u16> {
    head(data).map(u16::from_be_bytes)
}

pub fn parse_u16_le(data: &[u8]) -> Option<u16> {
    head(data).map(u16::from_le_bytes)
}

pub fn parse_u32_be(data: &[u8]) -> Option<u32> {
    head(data).map(u32::from_be_bytes)
}

pub fn parse_u32_le(data: &[u8]) -> Option<u32> {
    head(data).map(u32::from_le_bytes)
}

/// Writes `n` into the first two bytes of `dest`.
///
/// # Panics
///
/// If `dest` is shorter than two bytes.
pub fn put_u16_be(n: u16, dest: &mut [u8]) {
    dest[..2].copy_from_slice(&n.to_be_bytes());
}

pub fn put_u16_le(n: u16, dest: &mut [u8]) {
    dest[..2].copy_from_slice(&n.to_le_bytes());
}

/// Writes `n` into the first four bytes of `dest`.
///
/// # Panics
///
/// If `dest` is shorter than four bytes.
pub fn put_u32_be(n: u32, dest: &mut [u8]) {
    dest[..4].copy_from_slice(&n.to_be_bytes());
}

pub fn put_u32_le(n: u32, dest: &mut [u8]) {
    dest[..4].copy_from_slice(&n.to_le_bytes());
}

/// Converts UTF-16 text, as received from the OS, into UTF-8 bytes.
pub fn str_to_utf8(text: &[u16]) -> Vec<u8> {
    String::from_utf16_lossy(text).into_bytes()
}
