//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! A forensic decoder for Apple binary property list (bplist) documents.
//!
//! [`Decoder`] parses the version `00` wire format (and makes a best effort
//! on later versions) without ever aborting partway through a document:
//! anything it cannot make sense of becomes a sentinel value in the decoded
//! tree (see [`Value::is_sentinel`]) and sets [`Decoder::is_corrupt`], rather
//! than failing the whole parse. [`read_plist`] and [`read_plist_at`] add a
//! thin top-level dispatch between this decoder and an externally supplied
//! XML property list parser.

mod decoder;
mod dispatch;
mod document;
mod error;
mod options;
mod reader;
mod reshape;
mod value;

pub use decoder::Decoder;
pub use dispatch::{read_plist, read_plist_at, NoXmlFallback, XmlFallback};
pub use error::{FormatError, Result};
pub use options::{DecoderOptions, ZeroRefSizePolicy};
pub use reshape::{reshape, ReshapedValue};
pub use value::{Dict, Value};
