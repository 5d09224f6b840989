//! Chunk framing for large broadcast payloads.
//!
//! A realtime provider caps message size, so a whole-pool snapshot is
//! split into fixed-size, ordered pieces before publishing:
//!
//! ```text
//! "{event}-chunk"  { stream_id, chunk_index: 0, total_chunks: 3, items: [..10] }
//! "{event}-chunk"  { stream_id, chunk_index: 1, total_chunks: 3, items: [..10] }
//! "{event}-chunk"  { stream_id, chunk_index: 2, total_chunks: 3, items: [..5]  }
//! "{event}-meta"   { stream_id, total_chunks: 3, total_items: 25, meta }
//! ```
//!
//! A consumer feeds chunks to a [`ChunkAssembler`] and applies the
//! payload only once every chunk of the stream has arrived. An empty
//! payload produces no chunks at all, only the trailer.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Items per chunk unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// One ordered piece of a chunked payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk<T> {
    pub stream_id: u64,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub items: Vec<T>,
}

/// The metadata message published after the last chunk of a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkTrailer<M> {
    pub stream_id: u64,
    pub total_chunks: usize,
    pub total_items: usize,
    pub meta: M,
}

/// Event name a chunk of `event` is published under.
pub fn chunk_event_name(event: &str) -> String {
    format!("{event}-chunk")
}

/// Event name the trailer of `event` is published under.
pub fn trailer_event_name(event: &str) -> String {
    format!("{event}-meta")
}

/// Splits `items` into chunks of at most `chunk_size` (minimum 1).
pub fn split_into_chunks<T: Clone>(stream_id: u64, items: &[T], chunk_size: usize) -> Vec<Chunk<T>> {
    let size = chunk_size.max(1);
    let total_chunks = items.len().div_ceil(size);
    items
        .chunks(size)
        .enumerate()
        .map(|(chunk_index, part)| Chunk {
            stream_id,
            chunk_index,
            total_chunks,
            items: part.to_vec(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// ChunkAssembler
// ---------------------------------------------------------------------------

/// Client-side reassembly of one chunk stream at a time.
#[derive(Debug)]
pub struct ChunkAssembler<T> {
    stream_id: Option<u64>,
    total_chunks: usize,
    parts: BTreeMap<usize, Vec<T>>,
    last_completed: Option<u64>,
}

impl<T> ChunkAssembler<T> {
    pub fn new() -> Self {
        Self {
            stream_id: None,
            total_chunks: 0,
            parts: BTreeMap::new(),
            last_completed: None,
        }
    }

    /// Buffers a chunk. Returns the full payload, in order, once
    /// `received == total_chunks`.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidMessage`] for a chunk from another stream
    /// while one is in progress, a disagreeing `total_chunks`, an index
    /// out of range, or a duplicate index.
    pub fn push(&mut self, chunk: Chunk<T>) -> Result<Option<Vec<T>>, ProtocolError> {
        let total_chunks = match self.stream_id {
            None => chunk.total_chunks,
            Some(current) if current != chunk.stream_id => {
                return Err(ProtocolError::InvalidMessage(format!(
                    "chunk for stream {} while stream {current} is incomplete",
                    chunk.stream_id
                )));
            }
            Some(_) if chunk.total_chunks != self.total_chunks => {
                return Err(ProtocolError::InvalidMessage(format!(
                    "chunk claims {} total chunks, stream started with {}",
                    chunk.total_chunks, self.total_chunks
                )));
            }
            Some(_) => self.total_chunks,
        };
        if chunk.chunk_index >= total_chunks {
            return Err(ProtocolError::InvalidMessage(format!(
                "chunk index {} out of range for {total_chunks} chunks",
                chunk.chunk_index
            )));
        }

        // Nothing above touched the buffer; a rejected chunk leaves it as it was.
        match self.parts.entry(chunk.chunk_index) {
            Entry::Occupied(_) => {
                return Err(ProtocolError::InvalidMessage(format!(
                    "duplicate chunk index {}",
                    chunk.chunk_index
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(chunk.items);
            }
        }
        self.stream_id = Some(chunk.stream_id);
        self.total_chunks = total_chunks;

        if self.parts.len() < self.total_chunks {
            return Ok(None);
        }
        let items = std::mem::take(&mut self.parts).into_values().flatten().collect();
        self.last_completed = self.stream_id.take();
        self.total_chunks = 0;
        Ok(Some(items))
    }

    /// Handles the trailer. A zero-chunk stream completes here with an
    /// empty payload; for any other stream the trailer only confirms
    /// that its chunks were all delivered.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidMessage`] if the trailer arrives before
    /// its stream's chunks are complete or names an unknown stream.
    pub fn finish<M>(&mut self, trailer: &ChunkTrailer<M>) -> Result<Option<Vec<T>>, ProtocolError> {
        if trailer.total_chunks == 0 {
            if self.stream_id.is_some() {
                return Err(ProtocolError::InvalidMessage(
                    "empty-stream trailer while a stream is incomplete".into(),
                ));
            }
            self.last_completed = Some(trailer.stream_id);
            return Ok(Some(Vec::new()));
        }
        if self.last_completed == Some(trailer.stream_id) {
            return Ok(None);
        }
        Err(ProtocolError::InvalidMessage(format!(
            "trailer for stream {} before its {} chunks arrived",
            trailer.stream_id, trailer.total_chunks
        )))
    }

    /// Drops the stream in progress, e.g. one whose remaining chunks will
    /// never arrive. The next chunk pushed starts a new stream.
    pub fn reset(&mut self) {
        self.stream_id = None;
        self.total_chunks = 0;
        self.parts.clear();
    }

    /// Number of chunks buffered for the stream in progress.
    pub fn received(&self) -> usize {
        self.parts.len()
    }
}

impl<T> Default for ChunkAssembler<T> {
    fn default() -> Self {
        Self::new()
    }
}
