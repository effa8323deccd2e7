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

//! Header layout and self-declared length

use crate::consts::{DATA_TYPE_LEN, HEADER_LEN_FIELD_LEN, MIN_HEADER_LEN, TIME_FORMAT, TIME_LEN};
use crate::{CodecError, CodecResult, MessageType};
use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

/// Check the header's self-declared length.
///
/// The last four characters are read as a hexadecimal integer `L`; the header is valid iff its
/// length equals `L + 4`. The header is given without its trailing delimiter. Length is counted
/// in wire bytes, which coincides with characters for the ASCII headers devices send.
///
/// # Example
/// ```
/// use neam_codec::check_header_len;
///
/// // 4 + 7 + 19 + 4 = 34 bytes, 34 - 4 = 0x1e
/// assert!(check_header_len("bn01DEV00012024-01-01 00:00:00001e"));
/// assert!(!check_header_len("bn01DEV00012024-01-01 00:00:00001f"));
/// ```
pub fn check_header_len(header: impl AsRef<[u8]>) -> bool {
    declared_header_len(header.as_ref())
        .is_some_and(|declared| header.as_ref().len() == declared + HEADER_LEN_FIELD_LEN)
}

/// Like [`check_header_len`], but reports the mismatch as a [`CodecError`].
pub(crate) fn validate_header_len(header: &[u8]) -> CodecResult<()> {
    if check_header_len(header) {
        return Ok(());
    }
    let declared = header
        .len()
        .checked_sub(HEADER_LEN_FIELD_LEN)
        .map(|start| String::from_utf8_lossy(&header[start..]).into_owned());
    Err(CodecError::HeaderLengthMismatch {
        declared,
        actual: header.len(),
    })
}

fn declared_header_len(header: &[u8]) -> Option<usize> {
    let start = header.len().checked_sub(HEADER_LEN_FIELD_LEN)?;
    let field = &header[start..];
    if !field.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let field = std::str::from_utf8(field).ok()?;
    usize::from_str_radix(field, 16).ok()
}

/// Split a header into its fields. See [`ParsedHeader::parse`].
pub fn parse_header(header: &str) -> CodecResult<ParsedHeader> {
    ParsedHeader::parse(header)
}

/// A header split into its four fields.
///
/// `dataType(4) + MN(variable) + time(19) + length(4)`. The MN width is whatever remains after
/// the three fixed-width fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParsedHeader {
    /// Data type code, e.g. `bn01`
    pub data_type: String,
    /// Monitor (device) identifier
    pub mn: String,
    /// Timestamp as transmitted, `YYYY-MM-DD HH:MM:SS`
    pub time: String,
    /// Declared length field as transmitted (four hex characters)
    pub head_len: String,
}

impl ParsedHeader {
    /// Split a decoded header string into fields.
    ///
    /// Does not re-check the declared length; callers run [`check_header_len`] first. Headers
    /// too short to hold the fixed-width fields are rejected instead of sliced.
    pub fn parse(header: &str) -> CodecResult<Self> {
        let chars: Vec<char> = header.chars().collect();
        if chars.len() < MIN_HEADER_LEN {
            return Err(CodecError::MalformedHeader {
                reason: format!(
                    "{} characters, at least {} required",
                    chars.len(),
                    MIN_HEADER_LEN
                ),
            });
        }

        let mn_len = chars.len() - MIN_HEADER_LEN;
        let mn_end = DATA_TYPE_LEN + mn_len;
        let time_end = mn_end + TIME_LEN;

        Ok(Self {
            data_type: chars[..DATA_TYPE_LEN].iter().collect(),
            mn: chars[DATA_TYPE_LEN..mn_end].iter().collect(),
            time: chars[mn_end..time_end].iter().collect(),
            head_len: chars[time_end..].iter().collect(),
        })
    }

    /// The catalogued message type, if the data type code is known
    pub fn message_type(&self) -> Option<MessageType> {
        self.data_type.parse().ok()
    }

    /// Parse the timestamp field
    pub fn timestamp(&self) -> CodecResult<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.time, TIME_FORMAT).map_err(|e| {
            CodecError::MalformedHeader {
                reason: format!("invalid timestamp {:?}: {e}", self.time),
            }
        })
    }

    /// The declared length field as an integer
    pub fn declared_len(&self) -> Option<usize> {
        usize::from_str_radix(&self.head_len, 16).ok()
    }

    /// Total length in characters of the header these fields were split from
    pub fn len(&self) -> usize {
        [&self.data_type, &self.mn, &self.time, &self.head_len]
            .iter()
            .map(|field| field.chars().count())
            .sum()
    }

    /// Always false; a parsed header carries at least the fixed-width fields
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromStr for ParsedHeader {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ParsedHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}",
            self.data_type, self.mn, self.time, self.head_len
        )
    }
}
