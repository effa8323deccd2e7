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

//! # NEAM Protocol Codec
//!
//! This crate implements the wire format of the NEAM telemetry protocol spoken by field
//! monitoring devices (air quality stations, pollution sensors, environment monitors). Devices
//! push periodic readings over a plain TCP stream and the server answers every accepted reading
//! with an acknowledgment.
//!
//! ## Wire Format
//!
//! ```text
//! <header>@@@<body>tek<checksum:2><####>
//! ```
//!
//! - **Header**: `dataType(4) + MN(variable) + time(19, "YYYY-MM-DD HH:MM:SS") + length(4, hex)`.
//!   The trailing length field declares the header length minus the length field itself.
//! - **Checksum**: two lowercase hex digits, the XOR of every header and body byte including
//!   both delimiters.
//! - **End tag**: the literal `####`.
//! - **Charset**: text travels as GBK and is decoded to UTF-8 internally.
//!
//! There is no length prefix for the frame as a whole and no escaping. A payload that happens
//! to contain a delimiter terminates its segment early. This is a property of the protocol,
//! and the framer reproduces it exactly rather than attempting to repair it.
//!
//! ## Core Components
//!
//! - [`read_packet`]: the server-side read pipeline, pulling one validated [`NeamMessage`] off
//!   any [`tokio::io::AsyncRead`].
//! - [`read_delimited`]: the byte-at-a-time delimiter framer underneath it.
//! - [`compute_check`] / [`check_code`]: XOR checksum.
//! - [`ParsedHeader`], [`check_header_len`]: header layout and self-declared length.
//! - [`decode_text`] / [`encode_text`]: GBK transcoding.
//! - [`AckBuilder`]: acknowledgment composition with an injectable [`Clock`].
//! - [`DeviceCodec`]: a `tokio_util` codec for the device side of the conversation, encoding
//!   frames and decoding acknowledgments.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use neam_codec::{AckBuilder, read_packet};
//! use tokio::io::{AsyncWriteExt, BufReader};
//! use tokio::net::TcpStream;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let socket = TcpStream::connect("127.0.0.1:9999").await?;
//! let (read, mut write) = socket.into_split();
//! let mut reader = BufReader::new(read);
//!
//! let message = read_packet(&mut reader).await?;
//! let ack = AckBuilder::system().build(&message.header)?;
//! write.write_all(&ack).await?;
//! # Ok(())
//! # }
//! ```

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

mod ack;
mod charset;
mod checksum;
pub mod consts;
mod device;
mod framer;
mod header;
mod message_type;
mod packet;
mod result;

pub use self::ack::{AckBuilder, Clock, FixedClock, SystemClock};
pub use self::charset::{decode_text, encode_text};
pub use self::checksum::{check_code, compute_check};
pub use self::device::{DeviceCodec, NeamAck};
pub use self::framer::read_delimited;
pub use self::header::{ParsedHeader, check_header_len, parse_header};
pub use self::message_type::MessageType;
pub use self::packet::{NeamMessage, RawFrame, read_frame, read_packet};
pub use self::result::{CodecError, CodecResult};
