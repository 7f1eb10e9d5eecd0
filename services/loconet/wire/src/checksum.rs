//! LocoNet frame checksum.
//!
//! The checksum byte is the one's complement of the XOR of every byte before
//! it, so XOR-folding a complete frame from `0xFF` yields zero.

/// Compute the checksum byte for a message without its checksum.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0xff, |cs, byte| cs ^ byte)
}

/// Check that a complete frame (checksum included) folds to zero.
pub fn is_checksum_ok(frame: &[u8]) -> bool {
    !frame.is_empty() && checksum(frame) == 0
}

/// Append the checksum byte to a message.
pub fn append_checksum(data: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(data.len() + 1);
    frame.extend_from_slice(data);
    frame.push(checksum(data));
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_on_checksum() {
        assert_eq!(checksum(&[0x83]), 0x7c);
        assert_eq!(checksum(&[0x82]), 0x7d);
        assert_eq!(checksum(&[0xbb, 0x7f, 0x00]), 0x3b);
    }

    #[test]
    fn test_append_then_verify() {
        let payloads: [&[u8]; 4] = [
            &[0x83],
            &[0xa0, 0x01, 0x40],
            &[0xe5, 0x10, 0x7f, 0x7f, 0x7f, 0x40, 0x01, 0x02],
            &[0xed, 0x0b, 0x7f, 0x51, 0x1f, 0x01, 0x02, 0x03, 0x04, 0x05],
        ];
        for payload in payloads {
            let frame = append_checksum(payload);
            assert!(is_checksum_ok(&frame));
            assert_eq!(&frame[..frame.len() - 1], payload);
        }
    }

    #[test]
    fn test_corrupted_frame_rejected() {
        let mut frame = append_checksum(&[0xb0, 0x01, 0x30]);
        frame[1] ^= 0x01;
        assert!(!is_checksum_ok(&frame));
        assert!(!is_checksum_ok(&[]));
    }
}
