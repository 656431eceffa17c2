//! Intel HEX emission (§6 "Output — HEX"), transcribed from
//! `img_write_hexfile`: ≤16 data bytes per record, two's-complement
//! checksum over every byte in the record (length, address, type,
//! data), and a terminating `:00000001FF` end-of-file record.

use super::image::Segment;

const MAX_RECORD_LEN: usize = 16;

fn checksum(bytes: &[u8]) -> u8 {
    let sum: u32 = bytes.iter().map(|&b| b as u32).sum();
    (!(sum as u8)).wrapping_add(1)
}

fn data_record(address: u16, data: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(4 + data.len());
    bytes.push(data.len() as u8);
    bytes.push((address >> 8) as u8);
    bytes.push((address & 0xFF) as u8);
    bytes.push(0x00); // record type: data
    bytes.extend_from_slice(data);
    bytes.push(checksum(&bytes));

    let mut line = String::with_capacity(1 + bytes.len() * 2);
    line.push(':');
    for b in bytes {
        line.push_str(&format!("{b:02X}"));
    }
    line
}

/// Render one segment's ranges as Intel HEX record lines, splitting
/// each range into ≤16-byte chunks (and splitting at the chunk
/// boundary even when a range doesn't start 16-byte aligned, matching
/// the original's handling of odd start addresses).
pub fn write_segment(segment: &Segment) -> Vec<String> {
    let mut lines = Vec::new();
    for range in &segment.ranges {
        let mut offset = 0usize;
        let mut address = range.start;
        while offset < range.bytes.len() {
            let chunk_len = MAX_RECORD_LEN.min(range.bytes.len() - offset);
            let chunk = &range.bytes[offset..offset + chunk_len];
            lines.push(data_record(address as u16, chunk));
            offset += chunk_len;
            address += chunk_len as u32;
        }
    }
    lines
}

/// Render a full `.hex` file for one segment, including the
/// end-of-file terminator record.
pub fn render(segment: &Segment) -> String {
    let mut lines = write_segment(segment);
    lines.push(":00000001FF".to_string());
    lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avr::image::Image;
    use crate::avr::image::Zone;

    #[test]
    fn single_byte_at_zero_matches_known_hex_line() {
        let mut image = Image::new();
        image.segment_mut(Zone::Text).write(&[0x00, 0x00]); // NOP
        let lines = write_segment(image.segment(Zone::Text));
        assert_eq!(lines, vec![":020000000000FE".to_string()]);
    }

    #[test]
    fn render_appends_eof_record() {
        let mut image = Image::new();
        image.segment_mut(Zone::Text).write(&[0xFF]);
        let out = render(image.segment(Zone::Text));
        assert!(out.trim_end().ends_with(":00000001FF"));
    }

    #[test]
    fn long_ranges_split_at_sixteen_bytes() {
        let mut image = Image::new();
        image.segment_mut(Zone::Text).write(&[0u8; 20]);
        let lines = write_segment(image.segment(Zone::Text));
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(":10")); // 16 = 0x10 data bytes
        assert!(lines[1].starts_with(":04")); // remaining 4 bytes
    }

    #[test]
    fn checksum_is_twos_complement_of_byte_sum() {
        // :02000000000000FE -> bytes 02 00 00 00 00 00, sum=2, ~2+1=0xFD+1=0xFE
        let bytes = [0x02, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(checksum(&bytes), 0xFE);
    }
}
