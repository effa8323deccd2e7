//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! XOR checksum

/// Compute the two character checksum of `data`.
///
/// Every byte is folded into an accumulator with XOR, starting from zero. The result is
/// rendered as two lowercase hex digits, zero padded.
///
/// # Example
/// ```
/// use neam_codec::compute_check;
///
/// assert_eq!(compute_check(b"ab"), "03");
/// assert_eq!(compute_check(b""), "00");
/// ```
pub fn compute_check(data: &[u8]) -> String {
    let acc = data.iter().fold(0u8, |acc, byte| acc ^ byte);
    format!("{acc:02x}")
}

/// Check a transmitted checksum against the one computed over `data`.
///
/// Comparison is byte exact on the encoded form, so `"3F"` does not match `"3f"`.
pub fn check_code(data: &[u8], check: &[u8]) -> bool {
    compute_check(data).as_bytes() == check
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_compute_check_pads_small_values() {
        assert_eq!(compute_check(&[0x01]), "01");
        assert_eq!(compute_check(&[0x0f]), "0f");
        assert_eq!(compute_check(&[0x10]), "10");
        assert_eq!(compute_check(&[0xff, 0x0f]), "f0");
    }

    #[test]
    fn test_compute_check_is_xor_fold() {
        assert_eq!(compute_check(b"a"), "61");
        assert_eq!(compute_check(b"aa"), "00");
        assert_eq!(compute_check(b"abc"), format!("{:02x}", b'a' ^ b'b' ^ b'c'));
    }

    #[test]
    fn test_check_code_is_case_sensitive() {
        let data = [0x3f];
        assert!(check_code(&data, b"3f"));
        assert!(!check_code(&data, b"3F"));
        assert!(!check_code(&data, b"3e"));
        assert!(!check_code(&data, b"3"));
    }

    proptest! {
        #[test]
        fn prop_checksum_is_two_lowercase_hex_chars(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let code = compute_check(&data);
            prop_assert_eq!(code.len(), 2);
            prop_assert!(code.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
            prop_assert_eq!(compute_check(&data), code.clone());
            prop_assert!(check_code(&data, code.as_bytes()));
        }

        #[test]
        fn prop_checksum_matches_folded_byte(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let folded = data.iter().fold(0u8, |a, b| a ^ b);
            let code = compute_check(&data);
            prop_assert_eq!(u8::from_str_radix(&code, 16).unwrap(), folded);
        }
    }
}
