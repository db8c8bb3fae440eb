// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::{InputBuf, OutputBuf, Result};

/// Call contract for serializer collaborators.
///
/// A serializer encodes values of `T` through the [`OutputBuf`] capability set and
/// decodes them through [`InputBuf`] - those two traits are the entire buffer surface
/// a serializer may depend on. How the buffer is pooled, sized and grown is none of
/// the serializer's business; it simply asks for a stream or a flat view and writes.
///
/// This crate defines only the contract. Concrete codecs (binary, compact, reflective)
/// live with their own wire-format logic and plug in by implementing this trait.
pub trait Serializer<T> {
    /// Encodes `value` into the output buffer.
    ///
    /// The serializer may write through the stream or the flat view, requesting
    /// growth via `as_flat_view(min_writable)` as needed. It must not call
    /// `complete()` - finishing the buffer belongs to the caller.
    ///
    /// # Errors
    ///
    /// Propagates buffer errors (growth failure, contract violations) and may add
    /// codec-specific failures.
    fn write_to(&self, value: &T, output: &mut impl OutputBuf) -> Result<()>;

    /// Decodes a value from the readable bytes of `input`.
    ///
    /// The serializer may consume the stream or the flat view - each at most once, per
    /// the [`InputBuf`] contract. It must not call `release()` - returning the storage
    /// belongs to the caller.
    ///
    /// # Errors
    ///
    /// Propagates buffer errors and may add codec-specific failures.
    fn read_from(&self, input: &mut impl InputBuf) -> Result<T>;
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    #![allow(
        clippy::cast_possible_truncation,
        reason = "Fine in test code, the values are constructed to fit"
    )]

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{AllocSite, Error, TransparentPool};

    /// A deliberately simple length-prefixed codec, just enough to exercise the
    /// contract end to end.
    #[derive(Debug)]
    struct LengthPrefixed;

    impl Serializer<Vec<u8>> for LengthPrefixed {
        fn write_to(&self, value: &Vec<u8>, output: &mut impl OutputBuf) -> Result<()> {
            let payload_len = u32::try_from(value.len()).map_err(|_| {
                Error::ContractViolation("payload exceeds the length prefix range".to_string())
            })?;

            let mut view = output.as_flat_view(Some(size_of::<u32>() + value.len()))?;
            view.put_num_be(payload_len);
            view.put_slice(value.as_slice());

            Ok(())
        }

        fn read_from(&self, input: &mut impl InputBuf) -> Result<Vec<u8>> {
            let bytes = input.as_flat_view()?;

            let (prefix, payload) = bytes.split_at(size_of::<u32>());
            let payload_len = u32::from_be_bytes(prefix.try_into().map_err(|_| {
                Error::ContractViolation("input shorter than the length prefix".to_string())
            })?);

            Ok(payload[..payload_len as usize].to_vec())
        }
    }

    #[test]
    fn round_trips_through_the_buffer_contract() {
        let mut site = AllocSite::new(TransparentPool::new());
        let codec = LengthPrefixed;

        let message: Vec<u8> = (0..=255).collect();

        let mut buf = site.output_buf().expect("transparent pool never fails");
        codec.write_to(&message, &mut buf).expect("encoding cannot fail");

        assert_eq!(buf.size(), size_of::<u32>() + message.len());

        let finished = buf.complete().expect("pooled completion cannot fail");

        let mut input = site.input_buf(finished);
        let decoded = codec.read_from(&mut input).expect("decoding cannot fail");

        assert_eq!(decoded, message);
        assert!(input.release());
    }
}
