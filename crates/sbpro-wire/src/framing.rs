//! Delimited framing for live connections.
//!
//! Every request is written as `<ms>payload</me>`. Responses are scanned for
//! the first complete `<ms>…</me>` span in the buffered byte stream, so a
//! response may arrive across any number of reads.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::FrameError;

/// Marker opening a live frame.
pub const BEGIN_MARKER: &[u8] = b"<ms>";

/// Marker closing a live frame.
pub const END_MARKER: &[u8] = b"</me>";

/// Wraps a payload in live frame markers.
#[must_use]
pub fn encode_frame(payload: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(BEGIN_MARKER.len() + payload.len() + END_MARKER.len());
    frame.extend_from_slice(BEGIN_MARKER);
    frame.extend_from_slice(payload.as_bytes());
    frame.extend_from_slice(END_MARKER);
    frame
}

/// Finds the first complete frame in `buf`.
///
/// Returns `(advance, payload)` where `advance` is the number of bytes
/// consumed (including anything before the begin marker). Returns `None`
/// when more bytes are needed. The end marker is only searched for after
/// the first begin marker, so a second begin marker before the first end
/// marker becomes part of the payload.
///
/// # Errors
///
/// Returns [`FrameError::UnexpectedEof`] if `at_eof` is set and no complete
/// frame is buffered.
pub fn scan_frame(buf: &[u8], at_eof: bool) -> Result<Option<(usize, &[u8])>, FrameError> {
    let need_more = || {
        if at_eof {
            Err(FrameError::UnexpectedEof)
        } else {
            Ok(None)
        }
    };

    let Some(begin) = find(buf, BEGIN_MARKER) else {
        return need_more();
    };
    let start = begin + BEGIN_MARKER.len();
    let Some(len) = find(&buf[start..], END_MARKER) else {
        return need_more();
    };
    let end = start + len;

    Ok(Some((end + END_MARKER.len(), &buf[start..end])))
}

#[inline]
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Offset where a search for `marker` resumes once `len` bytes were scanned.
#[inline]
fn resume_point(len: usize, marker: &[u8]) -> usize {
    len.saturating_sub(marker.len() - 1)
}

/// [`tokio_util::codec`] codec for live frames.
///
/// Decodes into UTF-8 payload strings and encodes `&str` payloads. Frames
/// are found the same way as [`scan_frame`], but the codec remembers how far
/// it has searched, so a frame arriving over many reads is scanned once.
#[derive(Debug, Clone, Default)]
pub struct DelimitedCodec {
    /// Offset just past the begin marker of the pending frame.
    start: Option<usize>,
    /// Offset where the next marker search resumes.
    next_index: usize,
}

impl DelimitedCodec {
    /// Creates a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            start: None,
            next_index: 0,
        }
    }

    fn take_frame(
        &mut self,
        src: &mut BytesMut,
        at_eof: bool,
    ) -> Result<Option<String>, FrameError> {
        let need_more = || {
            if at_eof {
                Err(FrameError::UnexpectedEof)
            } else {
                Ok(None)
            }
        };

        // The buffer was replaced or consumed elsewhere.
        if self.next_index > src.len() {
            self.start = None;
            self.next_index = 0;
        }

        let start = match self.start {
            Some(start) => start,
            None => {
                let Some(pos) = find(&src[self.next_index..], BEGIN_MARKER) else {
                    self.next_index = resume_point(src.len(), BEGIN_MARKER);
                    return need_more();
                };
                let start = self.next_index + pos + BEGIN_MARKER.len();
                self.start = Some(start);
                self.next_index = start;
                start
            }
        };

        let Some(len) = find(&src[self.next_index..], END_MARKER) else {
            self.next_index = resume_point(src.len(), END_MARKER).max(start);
            return need_more();
        };
        let end = self.next_index + len;

        let payload = src[start..end].to_vec();
        src.advance(end + END_MARKER.len());
        self.start = None;
        self.next_index = 0;
        String::from_utf8(payload)
            .map(Some)
            .map_err(|_| FrameError::NotUtf8)
    }
}

impl Decoder for DelimitedCodec {
    type Item = String;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.take_frame(src, false)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.take_frame(src, true)
    }
}

impl Encoder<&str> for DelimitedCodec {
    type Error = FrameError;

    fn encode(&mut self, payload: &str, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(BEGIN_MARKER.len() + payload.len() + END_MARKER.len());
        dst.put_slice(BEGIN_MARKER);
        dst.put_slice(payload.as_bytes());
        dst.put_slice(END_MARKER);
        Ok(())
    }
}
