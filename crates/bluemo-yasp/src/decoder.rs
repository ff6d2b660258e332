//! Offline stream decoder with per-code dispatch
//!
//! Feeds a byte stream (a downloaded flash image, or anything else made of
//! concatenated frames) through a [`FrameBuffer`] and hands every complete
//! frame to the handler registered for its response code. The split of the
//! input into chunks never changes what is dispatched.

use std::collections::HashMap;

use crate::error::YaspError;
use crate::message::Message;
use crate::protocol::{FrameBuffer, MsgCode};

type Handler<'a, S, E> = Box<dyn FnMut(&mut S, Message) -> Result<(), E> + 'a>;

/// Dispatching decoder over a framed byte stream
///
/// `S` is the state handlers mutate, `E` the error they return. YASP
/// decoding errors are converted into `E`.
///
/// # Example
///
/// ```
/// use bluemo_yasp::{Message, MsgCode, StreamDecoder, YaspError};
///
/// let mut decoder: StreamDecoder<'_, Vec<Message>, YaspError> = StreamDecoder::new();
/// decoder.set_default_msg_callback(MsgCode::RtcSync, |seen, msg| {
///     seen.push(msg);
///     Ok(())
/// });
///
/// let mut seen = Vec::new();
/// decoder.feed(&mut seen, &[0x01, 0x00, 0x88, 0x2A])?;
/// assert_eq!(seen, vec![Message::RtcSync { rtc_counter: vec![0x2A] }]);
/// # Ok::<(), YaspError>(())
/// ```
pub struct StreamDecoder<'a, S, E> {
    frames: FrameBuffer,
    handlers: HashMap<u8, Handler<'a, S, E>>,
    dispatched: u64,
    skipped: u64,
}

impl<'a, S, E: From<YaspError>> StreamDecoder<'a, S, E> {
    /// Create a decoder with no handlers
    pub fn new() -> Self {
        Self {
            frames: FrameBuffer::new(),
            handlers: HashMap::new(),
            dispatched: 0,
            skipped: 0,
        }
    }

    /// Register the handler for messages of class `code`
    ///
    /// Replaces any handler previously registered for the same class.
    pub fn set_default_msg_callback<F>(&mut self, code: MsgCode, handler: F)
    where
        F: FnMut(&mut S, Message) -> Result<(), E> + 'a,
    {
        self.handlers.insert(code.response_code(), Box::new(handler));
    }

    /// Buffer `chunk` and dispatch every frame it completes
    ///
    /// Returns the number of messages handed to handlers. Frames without a
    /// handler are skipped without decoding their payload.
    ///
    /// # Errors
    /// The first handler error, or `InvalidPayload` for a handled frame
    /// whose payload does not decode. Frames after the failing one stay
    /// buffered.
    pub fn feed(&mut self, state: &mut S, chunk: &[u8]) -> Result<usize, E> {
        self.frames.push(chunk);

        let mut count = 0;
        while let Some(frame) = self.frames.next_frame() {
            let Some(handler) = self.handlers.get_mut(&frame.code) else {
                log::trace!("yasp: no handler for 0x{:02X}, skipping", frame.code);
                self.skipped += 1;
                continue;
            };

            let msg = Message::decode(&frame)?;
            handler(state, msg)?;
            count += 1;
        }

        self.dispatched += count as u64;
        Ok(count)
    }

    /// Bytes buffered that do not form a complete frame
    pub fn pending(&self) -> &[u8] {
        self.frames.pending()
    }

    /// Messages dispatched so far
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Frames skipped so far because no handler was registered
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// End of input: report and drop any incomplete trailing frame
    ///
    /// Returns the number of trailing bytes discarded.
    pub fn finish(&mut self) -> usize {
        let trailing = self.frames.pending();
        let len = trailing.len();
        if len > 0 {
            if trailing.iter().all(|&b| b == 0xFF) {
                log::debug!("Ignoring {} bytes of erased padding at end of stream", len);
            } else {
                log::warn!("Discarding {} bytes of incomplete frame at end of stream", len);
            }
        }
        self.frames.clear();
        len
    }
}

impl<S, E: From<YaspError>> Default for StreamDecoder<'_, S, E> {
    fn default() -> Self {
        Self::new()
    }
}
