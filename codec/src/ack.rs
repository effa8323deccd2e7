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

//! Acknowledgment composition

use crate::consts::TIME_FORMAT;
use crate::{CodecResult, compute_check, encode_text};
use bytes::Bytes;
use chrono::{Local, NaiveDateTime};
use std::fmt;
use std::sync::Arc;

/// Source of the timestamp written into acknowledgments
pub trait Clock: Send + Sync {
    /// Current local wall-clock time
    fn now(&self) -> NaiveDateTime;
}

/// Wall-clock time in the server's local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Builds the acknowledgment sent back for every accepted message.
///
/// ```text
/// <received header>@@@<now>tek<checksum>####
/// ```
///
/// The checksum covers the text before it, delimiters included, computed over its UTF-8
/// bytes. The whole acknowledgment is then transcoded to GBK, so for an all-ASCII header the
/// checksum also matches the wire bytes.
#[derive(Clone)]
pub struct AckBuilder {
    clock: Arc<dyn Clock>,
}

impl AckBuilder {
    /// Create a builder reading time from `clock`
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Create a builder using the system clock
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    /// Create a builder frozen at `at`
    pub fn fixed(at: NaiveDateTime) -> Self {
        Self::new(Arc::new(FixedClock(at)))
    }

    /// Build the wire bytes acknowledging `header`.
    ///
    /// Fails only if the header holds characters GBK cannot represent.
    pub fn build(&self, header: &str) -> CodecResult<Bytes> {
        let now = self.clock.now().format(TIME_FORMAT);
        let mut text = format!("{header}@@@{now}tek");
        let code = compute_check(text.as_bytes());
        text.push_str(&code);
        text.push_str("####");

        let wire = encode_text(&text)?;
        Ok(Bytes::from(wire.into_owned()))
    }
}

impl Default for AckBuilder {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for AckBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AckBuilder")
            .field("now", &self.clock.now())
            .finish()
    }
}
