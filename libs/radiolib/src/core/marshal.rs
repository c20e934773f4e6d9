// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Text encodings shared by the C boundary: list strings and
//! fixed-capacity, NUL-terminated output buffers.

/// Join `items` with `,`, escaping `\` as `\\` and `,` as `\,` inside an
/// element. Elements without either character come out verbatim.
pub fn encode_list<S: AsRef<str>>(items: &[S]) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        for c in item.as_ref().chars() {
            if c == '\\' || c == ',' {
                out.push('\\');
            }
            out.push(c);
        }
    }
    out
}

/// Inverse of [`encode_list`]. `count` disambiguates the empty string:
/// zero elements versus one empty element.
pub fn decode_list(encoded: &str, count: usize) -> Vec<String> {
    if count == 0 {
        return Vec::new();
    }
    let mut items = Vec::with_capacity(count);
    let mut current = String::new();
    let mut chars = encoded.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            ',' => items.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    items.push(current);
    items
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a
/// UTF-8 sequence.
pub fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Zero `buf` and copy as much of `s` as fits while leaving room for the
/// terminating NUL. Returns the number of bytes copied.
pub fn copy_str_into(buf: &mut [u8], s: &str) -> usize {
    let Some(room) = buf.len().checked_sub(1) else {
        return 0;
    };
    buf.fill(0);
    let text = truncate_utf8(s, room);
    buf[..text.len()].copy_from_slice(text.as_bytes());
    text.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_round_trip() {
        let cases: Vec<Vec<&str>> = vec![
            vec![],
            vec![""],
            vec!["RX2"],
            vec!["TX/RX", "RX2", "CAL"],
            vec!["a,b", r"c\d", "", r"\,"],
        ];
        for items in cases {
            let encoded = encode_list(&items);
            assert_eq!(decode_list(&encoded, items.len()), items, "{:?}", encoded);
        }
    }

    #[test]
    fn test_plain_lists_are_comma_joined() {
        assert_eq!(encode_list(&["internal", "external", "gpsdo"]), "internal,external,gpsdo");
        assert_eq!(encode_list::<&str>(&[]), "");
        assert_eq!(encode_list(&["a,b"]), r"a\,b");
    }

    #[test]
    fn test_copy_str_into() {
        let mut buf = [0xffu8; 6];
        assert_eq!(copy_str_into(&mut buf, "None"), 4);
        assert_eq!(&buf, b"None\0\0");

        assert_eq!(copy_str_into(&mut buf, "truncated"), 5);
        assert_eq!(&buf, b"trunc\0");

        let mut empty: [u8; 0] = [];
        assert_eq!(copy_str_into(&mut empty, "x"), 0);

        let mut one = [7u8; 1];
        assert_eq!(copy_str_into(&mut one, "x"), 0);
        assert_eq!(one, [0]);
    }

    #[test]
    fn test_truncation_respects_utf8() {
        // "é" is two bytes; a 3-byte budget cannot take the second one.
        let mut buf = [0u8; 4];
        assert_eq!(copy_str_into(&mut buf, "aéé"), 3);
        assert_eq!(std::str::from_utf8(&buf[..3]).unwrap(), "aé");
        assert_eq!(truncate_utf8("ééé", 3), "é");
    }
}
