//! DBF file header layout.
//!
//! | Offset | Size | Field                          |
//! |--------|------|--------------------------------|
//! | 0      | 1    | signature/version              |
//! | 1      | 3    | last-modified date (YY, MM, DD)|
//! | 4      | 4    | record count (i32 LE)          |
//! | 8      | 2    | header length (u16 LE)         |
//! | 10     | 2    | record length (u16 LE)         |
//! | 12     | 20   | reserved                       |
//!
//! Field descriptors follow at offset 32, closed by `0x0D 0x00`.

use crate::error::{DbfError, Result};

/// Size of the fixed header block in bytes.
pub const HEADER_SIZE: usize = 32;
/// Signature byte for a plain dBASE III file without memo.
pub const DBF_SIGNATURE: u8 = 0x03;
/// Signature byte for a dBASE III file with a memo file.
pub const DBF_SIGNATURE_MEMO: u8 = 0x83;
/// Marker closing the field descriptor block.
pub const DESCRIPTOR_TERMINATOR: [u8; 2] = [0x0D, 0x00];
/// Byte written after the last record.
pub const END_OF_DATA: u8 = 0x1A;
/// File offset of the persisted record count.
pub const RECORD_COUNT_OFFSET: u64 = 4;

/// Deletion flag of an active record.
pub const RECORD_ACTIVE: u8 = b' ';
/// Deletion flag of a soft-deleted record.
pub const RECORD_DELETED: u8 = b'*';

/// In-memory copy of the 32-byte DBF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbfHeader {
    pub signature: u8,
    /// Year % 100, month, day
    pub date: [u8; 3],
    /// Number of records in the file
    pub rec_no: i32,
    /// Header plus descriptor block length
    pub length: u16,
    /// Record length, including the deletion flag
    pub rec_len: u16,
}

impl DbfHeader {
    pub fn new(date: [u8; 3], length: u16, rec_len: u16) -> Self {
        Self {
            signature: DBF_SIGNATURE,
            date,
            rec_no: 0,
            length,
            rec_len,
        }
    }

    /// Number of the last record, 0 when the file is empty.
    pub fn lastrec(&self) -> u32 {
        self.rec_no.max(0) as u32
    }

    /// File offset of 1-based record `record`, `None` for record 0.
    pub fn record_offset(&self, record: u32) -> Option<u64> {
        if record == 0 {
            return None;
        }
        Some(self.length as u64 + (record as u64 - 1) * self.rec_len as u64)
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0] = self.signature;
        out[1..4].copy_from_slice(&self.date);
        out[4..8].copy_from_slice(&self.rec_no.to_le_bytes());
        out[8..10].copy_from_slice(&self.length.to_le_bytes());
        out[10..12].copy_from_slice(&self.rec_len.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Result<Self> {
        let signature = bytes[0];
        if signature & 0x07 != DBF_SIGNATURE {
            return Err(DbfError::CorruptHeader(format!(
                "unsupported signature 0x{:02X}",
                signature
            )));
        }
        let rec_no = i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if rec_no < 0 {
            return Err(DbfError::CorruptHeader(format!(
                "negative record count {}",
                rec_no
            )));
        }

        Ok(Self {
            signature,
            date: [bytes[1], bytes[2], bytes[3]],
            rec_no,
            length: u16::from_le_bytes([bytes[8], bytes[9]]),
            rec_len: u16::from_le_bytes([bytes[10], bytes[11]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let mut header = DbfHeader::new([26, 10, 16], 98, 14);
        header.rec_no = 258;
        let bytes = header.encode();

        assert_eq!(bytes[0], 0x03);
        assert_eq!(&bytes[1..4], &[26, 10, 16]);
        assert_eq!(&bytes[4..8], &[2, 1, 0, 0]);
        assert_eq!(&bytes[8..10], &[98, 0]);
        assert_eq!(&bytes[10..12], &[14, 0]);
        assert!(bytes[12..].iter().all(|&b| b == 0));

        assert_eq!(DbfHeader::decode(&bytes).unwrap(), header);
    }

    #[test]
    fn test_record_offset() {
        let header = DbfHeader::new([0, 1, 1], 98, 14);
        assert_eq!(header.record_offset(0), None);
        assert_eq!(header.record_offset(1), Some(98));
        assert_eq!(header.record_offset(3), Some(98 + 2 * 14));
    }

    #[test]
    fn test_decode_accepts_memo_signature() {
        let mut bytes = DbfHeader::new([0, 1, 1], 66, 5).encode();
        bytes[0] = DBF_SIGNATURE_MEMO;
        assert_eq!(DbfHeader::decode(&bytes).unwrap().signature, 0x83);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0] = 0x30;
        assert!(matches!(
            DbfHeader::decode(&bytes),
            Err(DbfError::CorruptHeader(_))
        ));

        let mut bytes = DbfHeader::new([0, 1, 1], 66, 5).encode();
        bytes[4..8].copy_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(
            DbfHeader::decode(&bytes),
            Err(DbfError::CorruptHeader(_))
        ));
    }
}
