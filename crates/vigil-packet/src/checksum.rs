//! The internet checksum (RFC 1071) as used by `ICMPv4`.

/// The index of the 16-bit checksum word in an `ICMPv4` header.
const ICMP_CHECKSUM_WORD: usize = 1;

/// Calculate the RFC 1071 internet checksum of `data`.
///
/// All 16-bit big-endian words are summed with end-around carry and the one's
/// complement of the folded sum is returned. An odd trailing byte is the high
/// byte of a zero-padded word. The checksum of an empty buffer is `0xffff`.
#[must_use]
pub fn internet_checksum(data: &[u8]) -> u16 {
    finalize_checksum(sum_be_words(data, None))
}

/// Calculate the checksum for an `Ipv4` `ICMP` packet.
///
/// The checksum field of `data` is treated as zero regardless of its content.
#[must_use]
pub fn icmp_ipv4_checksum(data: &[u8]) -> u16 {
    finalize_checksum(sum_be_words(data, Some(ICMP_CHECKSUM_WORD)))
}

/// Returns true if `data`, with its checksum field in place, verifies.
#[must_use]
pub fn verify_checksum(data: &[u8]) -> bool {
    internet_checksum(data) == 0
}

fn sum_be_words(data: &[u8], ignore_word: Option<usize>) -> u64 {
    let mut words = data.chunks_exact(2);
    let mut sum = words
        .by_ref()
        .enumerate()
        .filter(|(i, _)| Some(*i) != ignore_word)
        .map(|(_, word)| u64::from(u16::from_be_bytes([word[0], word[1]])))
        .sum::<u64>();
    if let [last] = words.remainder() {
        sum += u64::from(*last) << 8;
    }
    sum
}

#[allow(clippy::cast_possible_truncation)]
const fn finalize_checksum(mut sum: u64) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum >> 16) + (sum & 0xffff);
    }
    !(sum as u16)
}
