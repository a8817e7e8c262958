//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Decoder configuration.
//!
//! The bplist format specification leaves a handful of degenerate-input
//! behaviors unspecified (see the "Open Questions" in the design notes this
//! decoder was built against). Rather than hard-code one interpretation,
//! those are exposed here so a caller emulating a specific platform can switch
//! them, while the default favors flagging the document as corrupt.

/// What to do when a trailer declares `object_ref_size == 0`.
///
/// A zero-width reference cannot actually distinguish between object indices,
/// so every reference in every container would resolve to the same index.
/// That is almost certainly not what the document's author intended.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ZeroRefSizePolicy {
    /// Treat every reference as index zero, but mark the document corrupt.
    /// This is the default.
    TreatAsIndexZeroAndFlagCorrupt,
    /// Treat every reference as index zero without flagging corruption, for
    /// callers that need to match a specific platform's silent tolerance.
    TreatAsIndexZeroSilently,
}

impl Default for ZeroRefSizePolicy {
    fn default() -> Self {
        ZeroRefSizePolicy::TreatAsIndexZeroAndFlagCorrupt
    }
}

/// Configuration accepted by [`crate::decoder::Decoder`].
#[derive(Copy, Clone, Debug, Default)]
pub struct DecoderOptions {
    pub zero_ref_size_policy: ZeroRefSizePolicy,
}

impl DecoderOptions {
    pub fn new() -> Self {
        DecoderOptions::default()
    }
}
