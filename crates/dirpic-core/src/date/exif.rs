use chrono::{NaiveDate, NaiveDateTime};
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, Seek};
use std::path::Path;

use anyhow::Context;

/// Capture-time tags, best first.
const DATE_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

/// Read the capture date from a container's EXIF block.
///
/// `Err` means the block could not be decoded at all (absent, corrupt or an
/// unsupported container). `Ok(None)` means the block was read but holds no
/// usable date; callers treat both the same way and fall back to the filename.
/// EXIF datetimes have no timezone info - they are local time as-is.
pub fn read_exif_date<R: BufRead + Seek>(reader: &mut R) -> Result<Option<NaiveDateTime>, exif::Error> {
    let data = Reader::new().read_from_container(reader)?;

    Ok(DATE_TAGS.iter().find_map(|tag| {
        let field = data.get_field(*tag, In::PRIMARY)?;
        match field.value {
            Value::Ascii(ref values) => values.first().and_then(|v| parse_exif_datetime(v)),
            _ => None,
        }
    }))
}

/// Open `path` and read its EXIF capture date.
pub fn read_exif_date_from_path(path: &Path) -> anyhow::Result<Option<NaiveDateTime>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let date = read_exif_date(&mut BufReader::new(file))
        .with_context(|| format!("decoding EXIF of {}", path.display()))?;
    Ok(date)
}

/// Zero-filled or out-of-range values ("0000:00:00 00:00:00") yield `None`.
fn parse_exif_datetime(raw: &[u8]) -> Option<NaiveDateTime> {
    let dt = exif::DateTime::from_ascii(raw).ok()?;
    NaiveDate::from_ymd_opt(dt.year.into(), dt.month.into(), dt.day.into())?
        .and_hms_opt(dt.hour.into(), dt.minute.into(), dt.second.into())
}

/// Minimal little-endian TIFF whose primary IFD carries a single DateTime tag.
#[cfg(test)]
pub(crate) fn tiff_with_datetime(value: &str) -> Vec<u8> {
    assert_eq!(value.len(), 19, "EXIF datetimes are 19 characters");
    let mut buf = Vec::new();
    buf.extend_from_slice(b"II*\0");
    buf.extend_from_slice(&8u32.to_le_bytes()); // IFD0 offset
    buf.extend_from_slice(&1u16.to_le_bytes()); // entry count
    buf.extend_from_slice(&0x0132u16.to_le_bytes()); // DateTime
    buf.extend_from_slice(&2u16.to_le_bytes()); // ASCII
    buf.extend_from_slice(&20u32.to_le_bytes()); // count incl. NUL
    buf.extend_from_slice(&26u32.to_le_bytes()); // value offset
    buf.extend_from_slice(&0u32.to_le_bytes()); // no next IFD
    buf.extend_from_slice(value.as_bytes());
    buf.push(0);
    buf
}
