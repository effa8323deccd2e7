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

//! Catalogue of known data type codes

use std::fmt;
use std::str::FromStr;

/// Data type codes carried in the first four characters of a header.
///
/// The catalogue is informational; frames with codes outside it are still accepted and
/// acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// 30 second values, standard conditions
    Bn01,
    /// 30 second values, actual conditions
    Jr01,
    /// 5 minute averages, standard conditions
    Jz12,
    /// 5 minute averages, actual conditions
    Jr12,
    /// Hourly averages, standard conditions
    Jz16,
    /// Hourly averages, actual conditions
    Jr16,
    /// AQI daily averages, standard conditions
    Jz18,
    /// AQI daily averages, actual conditions
    Jr18,
    /// API daily averages, standard conditions
    Jz06,
    /// API daily averages, actual conditions
    Jr06,
    /// Meteorological daily averages
    Jz24,
    /// Greenhouse gas daily averages
    Jz25,
    /// Facility environment realtime data
    Jz31,
    /// Facility environment hourly data
    Jz33,
}

impl MessageType {
    /// Every catalogued type
    pub const ALL: [MessageType; 14] = [
        MessageType::Bn01,
        MessageType::Jr01,
        MessageType::Jz12,
        MessageType::Jr12,
        MessageType::Jz16,
        MessageType::Jr16,
        MessageType::Jz18,
        MessageType::Jr18,
        MessageType::Jz06,
        MessageType::Jr06,
        MessageType::Jz24,
        MessageType::Jz25,
        MessageType::Jz31,
        MessageType::Jz33,
    ];

    /// The four character wire code
    pub fn code(self) -> &'static str {
        match self {
            MessageType::Bn01 => "bn01",
            MessageType::Jr01 => "JR01",
            MessageType::Jz12 => "JZ12",
            MessageType::Jr12 => "JR12",
            MessageType::Jz16 => "JZ16",
            MessageType::Jr16 => "JR16",
            MessageType::Jz18 => "JZ18",
            MessageType::Jr18 => "JR18",
            MessageType::Jz06 => "JZ06",
            MessageType::Jr06 => "JR06",
            MessageType::Jz24 => "JZ24",
            MessageType::Jz25 => "JZ25",
            MessageType::Jz31 => "JZ31",
            MessageType::Jz33 => "JZ33",
        }
    }
}

impl FromStr for MessageType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageType::ALL
            .into_iter()
            .find(|kind| kind.code() == s)
            .ok_or(())
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
