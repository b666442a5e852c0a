use std::net::Ipv4Addr;

/// Parse a dotted-decimal IPv4 address. Only the strict four-part form is
/// accepted; hostnames are never resolved.
pub fn parse_ipv4(dest: &str) -> Option<Ipv4Addr> {
    dest.parse().ok()
}

/// Internet checksum (RFC 1071) over `data`.
///
/// Returns `None` for an empty buffer. The caller must zero the checksum
/// field of the packet before calling this.
pub fn checksum(data: &[u8]) -> Option<u16> {
    if data.is_empty() {
        return None;
    }

    Some(fold(sum_be_words(data)))
}

/// Compute the checksum over `data` and store it big endian at byte
/// offset 2, where ICMP keeps it. The field is zeroed first.
///
/// Returns `None`, leaving `data` untouched, if it has no room for the field.
pub fn set_checksum(data: &mut [u8]) -> Option<()> {
    if data.len() < 4 {
        return None;
    }

    data[2] = 0;
    data[3] = 0;
    let sum = checksum(data)?;
    data[2..4].copy_from_slice(&sum.to_be_bytes());
    Some(())
}

/// A packet with its checksum in place sums to zero.
#[cfg(test)]
pub fn verify(data: &[u8]) -> bool {
    checksum(data) == Some(0)
}

fn fold(mut sum: u32) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum >> 16) + (sum & 0xFFFF);
    }

    !sum as u16 // The checksum field should be the ones complement of the sum
}

/// Sum all words (16 bit chunks) in the given data. Each word is treated as
/// big endian; a trailing odd byte is the high byte of a zero-padded word.
fn sum_be_words(data: &[u8]) -> u32 {
    data.chunks(2)
        .map(|word| match *word {
            [wh] => u16::from_be_bytes([wh, 0]),
            [wh, wl] => u16::from_be_bytes([wh, wl]),
            _ => unreachable!(),
        })
        .fold(0, |sum, w| sum.wrapping_add(w as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_has_no_checksum() {
        assert_eq!(checksum(&[]), None);
    }

    #[test]
    fn rfc1071_example() {
        // Words from RFC 1071 section 3: sum is 0x2ddf0, folded 0xddf2.
        let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(checksum(&data), Some(!0xddf2));
    }

    #[test]
    fn all_zero_buffer() {
        assert_eq!(checksum(&[0u8; 16]), Some(0xFFFF));
    }

    #[test]
    fn odd_length_pads_low_byte() {
        assert_eq!(checksum(&[0x12]), checksum(&[0x12, 0x00]));
        assert_eq!(checksum(&[0x12]), Some(!0x1200));
    }

    #[test]
    fn carries_are_folded() {
        // 0xFFFF + 0x0001 = 0x10000 -> 0x0001
        assert_eq!(checksum(&[0xFF, 0xFF, 0x00, 0x01]), Some(!0x0001));
    }

    #[test]
    fn echo_request_verifies_after_set() {
        let mut packet = [8u8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(set_checksum(&mut packet), Some(()));
        assert_eq!(&packet[2..4], &[0xF7, 0xFF]);
        assert!(verify(&packet));
    }

    #[test]
    fn set_checksum_ignores_stale_field() {
        let mut a = [8u8, 0, 0xAB, 0xCD, 0x04, 0xD2, 0x00, 0x07, 1, 2, 3];
        let mut b = a;
        b[2] = 0;
        b[3] = 0;
        set_checksum(&mut a);
        set_checksum(&mut b);
        assert_eq!(a, b);
        assert!(verify(&a));
    }

    #[test]
    fn set_checksum_needs_room_for_field() {
        let mut empty: [u8; 0] = [];
        assert_eq!(set_checksum(&mut empty), None);

        let mut short = [8u8, 0, 0xAA];
        assert_eq!(set_checksum(&mut short), None);
        assert_eq!(short, [8, 0, 0xAA]);

        let mut minimal = [8u8, 0, 0xAA, 0xBB];
        assert_eq!(set_checksum(&mut minimal), Some(()));
        assert_eq!(minimal, [8, 0, 0xF7, 0xFF]);
    }

    #[test]
    fn parses_dotted_decimal_only() {
        assert_eq!(parse_ipv4("127.0.0.1"), Some(Ipv4Addr::LOCALHOST));
        assert_eq!(parse_ipv4("10.0.0.2"), Some(Ipv4Addr::new(10, 0, 0, 2)));
        assert_eq!(parse_ipv4(" 10.0.0.2\n"), None);
        assert_eq!(parse_ipv4("127.1"), None);
        assert_eq!(parse_ipv4("256.0.0.1"), None);
        assert_eq!(parse_ipv4("localhost"), None);
        assert_eq!(parse_ipv4(""), None);
    }
}
