//! Stream processing utilities

use futures::stream::{self, Stream};
use std::collections::VecDeque;
use std::time::Duration;

use crate::stream_encoder::StreamEncoder;
use crate::types::{ChunkKind, StreamChunk};

/// Words per content frame
pub const DEFAULT_CHUNK_WORDS: usize = 10;

/// Delay after each content frame
pub const DEFAULT_PACING: Duration = Duration::from_millis(50);

/// Split text into groups of `size` whitespace-delimited words, each group
/// re-joined with single spaces. A size of zero is treated as one.
pub fn chunk_words(text: &str, size: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words.chunks(size.max(1)).map(|chunk| chunk.join(" ")).collect()
}

/// Whitespace-token count, the gateway's stand-in for a tokenizer
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Lazy, finite sequence of framed chunks for one encoded text
///
/// Frames are rendered on demand in three phases: the encoder's preamble,
/// one frame per content fragment, then the postamble. The last postamble
/// frame is marked terminal. The sequence cannot be restarted.
#[derive(Debug)]
pub struct FrameSequence {
    encoder: Box<dyn StreamEncoder>,
    preamble: VecDeque<String>,
    fragments: VecDeque<String>,
    postamble: Option<VecDeque<String>>,
    sequence: usize,
}

impl FrameSequence {
    /// Prepare the frames for `text`
    ///
    /// # Arguments
    /// * `encoder` - Wire format for this stream
    /// * `text` - Completed text to deliver
    /// * `chunk_words_per_frame` - Words carried by each content frame
    pub fn new(encoder: Box<dyn StreamEncoder>, text: &str, chunk_words_per_frame: usize) -> Self {
        let fragments = encoder.fragments(text, chunk_words_per_frame).into();
        let preamble = encoder.preamble().into();
        Self {
            encoder,
            preamble,
            fragments,
            postamble: None,
            sequence: 0,
        }
    }

    /// Name of the encoder driving this sequence
    pub fn encoder_name(&self) -> &str {
        self.encoder.name()
    }

    /// Content type of the encoded body
    pub fn content_type(&self) -> &str {
        self.encoder.content_type()
    }

    /// Whether content frames should be followed by a delay
    pub fn is_paced(&self) -> bool {
        self.encoder.is_paced()
    }

    fn emit(&mut self, kind: ChunkKind, payload: String, is_terminal: bool) -> StreamChunk {
        let chunk = StreamChunk {
            sequence: self.sequence,
            kind,
            payload,
            is_terminal,
        };
        self.sequence += 1;
        chunk
    }
}

impl Iterator for FrameSequence {
    type Item = StreamChunk;

    fn next(&mut self) -> Option<StreamChunk> {
        if let Some(frame) = self.preamble.pop_front() {
            return Some(self.emit(ChunkKind::Framing, frame, false));
        }

        if let Some(fragment) = self.fragments.pop_front() {
            let is_last = self.fragments.is_empty();
            let frame = self.encoder.frame(&fragment, is_last);
            return Some(self.emit(ChunkKind::Content, frame, false));
        }

        let encoder = &self.encoder;
        let postamble = self
            .postamble
            .get_or_insert_with(|| encoder.postamble().into());
        let frame = postamble.pop_front()?;
        let is_terminal = postamble.is_empty();
        Some(self.emit(ChunkKind::Framing, frame, is_terminal))
    }
}

/// Turn a frame sequence into an async stream that waits `delay` after every
/// content frame. Unpaced encoders and a zero delay emit back to back.
pub fn paced(frames: FrameSequence, delay: Duration) -> impl Stream<Item = StreamChunk> + Send {
    let delay = if frames.is_paced() { delay } else { Duration::ZERO };

    stream::unfold((frames, false), move |(mut frames, wait)| async move {
        if wait {
            tokio::time::sleep(delay).await;
        }
        let chunk = frames.next()?;
        let wait_next = chunk.is_content() && !delay.is_zero();
        Some((chunk, (frames, wait_next)))
    })
}
