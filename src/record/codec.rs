//! Slot codec
//!
//! Encodes one record into a fixed-size, position-independent byte slot and
//! back.
//!
//! ## Slot Format (278 bytes, little-endian)
//! ```text
//! ┌────────────┬────────┬──────────────────┬──────────────────┐
//! │ Status (2) │ Id (4) │ FirstName (120)  │ LastName (120)   │
//! ├────────────┴────────┴──┬───────────────┴┬─────────────────┤
//! │ Year (4) Month (4) Day (4) │ Workplace (2) │ Salary (16)  │
//! ├────────────────────────────┴───────────────┴──────────────┤
//! │ Department (2, one UTF-16 code unit)                       │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Names are UTF-8, left-padded with spaces to [`NAME_WIDTH`] bytes and
//! trimmed on decode. Salary is stored as four 32-bit words `lo, mid, hi,
//! flags`, where `flags` carries the scale in bits 16..=23 and the sign in
//! bit 31.

use bytes::{Buf, BufMut};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::error::{CabinetError, Result};

use super::Record;

/// Fixed width of each name field in bytes
pub const NAME_WIDTH: usize = 120;

/// Total slot size: status (2) + id (4) + names (240) + date (12)
/// + workplace (2) + salary (16) + department (2)
pub const SLOT_SIZE: usize = 2 + 4 + 2 * NAME_WIDTH + 12 + 2 + 16 + 2;

const SCALE_MASK: u32 = 0x00FF_0000;
const SCALE_SHIFT: u32 = 16;
const SIGN_MASK: u32 = 0x8000_0000;
const MAX_SCALE: u32 = 28;

/// Liveness flag stored in the first two bytes of every slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum SlotStatus {
    /// The slot holds a live record
    Live = 0,

    /// The slot was soft-deleted; its remaining bytes are meaningless
    Deleted = 1,
}

impl SlotStatus {
    fn from_raw(raw: i16) -> Result<Self> {
        match raw {
            0 => Ok(SlotStatus::Live),
            1 => Ok(SlotStatus::Deleted),
            other => Err(CabinetError::Codec(format!(
                "Unknown slot status: {}",
                other
            ))),
        }
    }

    /// Little-endian bytes of this status, for in-place status flips
    pub fn to_bytes(self) -> [u8; 2] {
        (self as i16).to_le_bytes()
    }
}

/// Encode a record into a slot with the given status
pub fn encode(status: SlotStatus, record: &Record) -> Result<[u8; SLOT_SIZE]> {
    let mut slot = [0u8; SLOT_SIZE];
    let mut buf = &mut slot[..];

    buf.put_i16_le(status as i16);
    buf.put_i32_le(record.id);
    put_name(&mut buf, &record.first_name)?;
    put_name(&mut buf, &record.last_name)?;
    put_date(&mut buf, record.date_of_birth);
    buf.put_i16_le(record.workplace_number);
    put_decimal(&mut buf, record.salary);
    put_department(&mut buf, record.department)?;

    debug_assert!(buf.is_empty());
    Ok(slot)
}

/// Decode a slot into its status and record
///
/// Callers must ignore the record when the status is `Deleted`.
pub fn decode(bytes: &[u8]) -> Result<(SlotStatus, Record)> {
    if bytes.len() < SLOT_SIZE {
        return Err(CabinetError::Codec(format!(
            "Incomplete slot: expected {} bytes, got {}",
            SLOT_SIZE,
            bytes.len()
        )));
    }

    let mut buf = &bytes[..SLOT_SIZE];

    let status = SlotStatus::from_raw(buf.get_i16_le())?;
    let id = buf.get_i32_le();
    let first_name = get_name(&mut buf)?;
    let last_name = get_name(&mut buf)?;
    let date_of_birth = get_date(&mut buf)?;
    let workplace_number = buf.get_i16_le();
    let salary = get_decimal(&mut buf)?;
    let department = get_department(&mut buf)?;

    let record = Record {
        id,
        first_name,
        last_name,
        date_of_birth,
        workplace_number,
        salary,
        department,
    };

    Ok((status, record))
}

/// Read only the status of a slot
pub fn read_status(bytes: &[u8]) -> Result<SlotStatus> {
    if bytes.len() < 2 {
        return Err(CabinetError::Codec("Slot too short for status".to_string()));
    }
    SlotStatus::from_raw(i16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Read only the id of a slot (without decoding the rest)
pub fn read_id(bytes: &[u8]) -> Result<i32> {
    if bytes.len() < 6 {
        return Err(CabinetError::Codec("Slot too short for id".to_string()));
    }
    Ok(i32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]))
}

// =============================================================================
// Field Helpers
// =============================================================================

fn put_name(buf: &mut &mut [u8], name: &str) -> Result<()> {
    let bytes = name.as_bytes();
    if bytes.len() > NAME_WIDTH {
        return Err(CabinetError::Codec(format!(
            "Name too long: {} bytes (max {})",
            bytes.len(),
            NAME_WIDTH
        )));
    }

    buf.put_bytes(b' ', NAME_WIDTH - bytes.len());
    buf.put_slice(bytes);
    Ok(())
}

fn get_name(buf: &mut &[u8]) -> Result<String> {
    let raw = &buf[..NAME_WIDTH];
    let name = std::str::from_utf8(raw)
        .map_err(|e| CabinetError::Codec(format!("Name is not valid UTF-8: {}", e)))?
        .trim_matches(' ')
        .to_string();
    buf.advance(NAME_WIDTH);
    Ok(name)
}

fn put_date(buf: &mut &mut [u8], date: NaiveDate) {
    buf.put_i32_le(date.year());
    buf.put_i32_le(date.month() as i32);
    buf.put_i32_le(date.day() as i32);
}

fn get_date(buf: &mut &[u8]) -> Result<NaiveDate> {
    let year = buf.get_i32_le();
    let month = buf.get_i32_le();
    let day = buf.get_i32_le();

    u32::try_from(month)
        .ok()
        .zip(u32::try_from(day).ok())
        .and_then(|(month, day)| NaiveDate::from_ymd_opt(year, month, day))
        .ok_or_else(|| {
            CabinetError::Codec(format!("Invalid date: {}-{}-{}", year, month, day))
        })
}

fn put_decimal(buf: &mut &mut [u8], value: Decimal) {
    let magnitude = value.mantissa().unsigned_abs();
    let lo = magnitude as u32;
    let mid = (magnitude >> 32) as u32;
    let hi = (magnitude >> 64) as u32;

    let mut flags = (value.scale() << SCALE_SHIFT) & SCALE_MASK;
    if value.is_sign_negative() {
        flags |= SIGN_MASK;
    }

    buf.put_u32_le(lo);
    buf.put_u32_le(mid);
    buf.put_u32_le(hi);
    buf.put_u32_le(flags);
}

fn get_decimal(buf: &mut &[u8]) -> Result<Decimal> {
    let lo = buf.get_u32_le();
    let mid = buf.get_u32_le();
    let hi = buf.get_u32_le();
    let flags = buf.get_u32_le();

    let scale = (flags & SCALE_MASK) >> SCALE_SHIFT;
    if scale > MAX_SCALE {
        return Err(CabinetError::Codec(format!(
            "Decimal scale out of range: {}",
            scale
        )));
    }
    let negative = flags & SIGN_MASK != 0;

    Ok(Decimal::from_parts(lo, mid, hi, negative, scale))
}

fn put_department(buf: &mut &mut [u8], department: char) -> Result<()> {
    let code = u16::try_from(u32::from(department)).map_err(|_| {
        CabinetError::Codec(format!(
            "Department '{}' does not fit in one UTF-16 code unit",
            department
        ))
    })?;
    buf.put_u16_le(code);
    Ok(())
}

fn get_department(buf: &mut &[u8]) -> Result<char> {
    let code = buf.get_u16_le();
    char::from_u32(u32::from(code))
        .ok_or_else(|| CabinetError::Codec(format!("Invalid department code: {:#06x}", code)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record {
            id: 7,
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            workplace_number: 12,
            salary: Decimal::new(-123456, 2),
            department: 'A',
        }
    }

    #[test]
    fn test_slot_size_is_278() {
        assert_eq!(SLOT_SIZE, 278);
    }

    #[test]
    fn test_names_are_left_padded() {
        let slot = encode(SlotStatus::Live, &sample()).unwrap();
        let first = &slot[6..6 + NAME_WIDTH];
        assert!(first[..NAME_WIDTH - 4].iter().all(|&b| b == b' '));
        assert_eq!(&first[NAME_WIDTH - 4..], b"John");
    }

    #[test]
    fn test_decimal_flags_layout() {
        let slot = encode(SlotStatus::Live, &sample()).unwrap();
        let flags = u32::from_le_bytes(slot[272..276].try_into().unwrap());
        assert_eq!(flags, SIGN_MASK | (2 << SCALE_SHIFT));
        let lo = u32::from_le_bytes(slot[260..264].try_into().unwrap());
        assert_eq!(lo, 123456);
    }

    #[test]
    fn test_status_and_id_peek() {
        let slot = encode(SlotStatus::Deleted, &sample()).unwrap();
        assert_eq!(read_status(&slot).unwrap(), SlotStatus::Deleted);
        assert_eq!(read_id(&slot).unwrap(), 7);
    }
}
