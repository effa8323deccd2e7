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

//! Wire charset transcoding
//!
//! Devices speak GBK. Internally all text is UTF-8.

use crate::{CodecError, CodecResult};
use encoding_rs::GBK;
use std::borrow::Cow;

/// Decode wire bytes into text.
///
/// Malformed sequences are rejected rather than replaced.
pub fn decode_text(bytes: &[u8]) -> CodecResult<Cow<'_, str>> {
    GBK.decode_without_bom_handling_and_without_replacement(bytes)
        .ok_or_else(|| CodecError::Charset {
            reason: format!("{} bytes are not valid GBK", bytes.len()),
        })
}

/// Encode text into wire bytes.
///
/// Characters with no GBK representation are rejected.
pub fn encode_text(text: &str) -> CodecResult<Cow<'_, [u8]>> {
    let (bytes, _, had_errors) = GBK.encode(text);
    if had_errors {
        return Err(CodecError::Charset {
            reason: format!("{text:?} is not representable in GBK"),
        });
    }
    Ok(bytes)
}
