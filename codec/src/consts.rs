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

//! Fixed constants of the NEAM protocol
//!
//! Field widths and delimiters belong to a single protocol version and are not configurable.

/// Width of the data type code at the start of a header.
pub const DATA_TYPE_LEN: usize = 4;

/// Width of the hexadecimal length field at the end of a header.
pub const HEADER_LEN_FIELD_LEN: usize = 4;

/// Width of the header timestamp.
pub const TIME_LEN: usize = 19;

/// Width of the transmitted checksum.
pub const CHECKSUM_LEN: usize = 2;

/// Terminates the header segment.
pub const HEADER_DELIMITER: &[u8] = b"@@@";

/// Terminates the body segment.
pub const BODY_DELIMITER: &[u8] = b"tek";

/// Terminates every frame.
pub const END_TAG: &[u8] = b"####";

/// `chrono` format string for header and acknowledgment timestamps (`YYYY-MM-DD HH:MM:SS`).
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Smallest header that can carry a data type, a timestamp and a length field.
pub const MIN_HEADER_LEN: usize = DATA_TYPE_LEN + TIME_LEN + HEADER_LEN_FIELD_LEN;
