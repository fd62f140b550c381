//! Splits file content into bounded-size, path-labelled text chunks.
//!
//! Content of at most `max_chunk_size` characters becomes one chunk,
//! `"File: {path}\n\n{content}"`. Longer content is accumulated line by line.
//! The accumulator is in `Leading` until the first chunk boundary and in
//! `Continuation` afterwards:
//!
//! | state        | line                              | action                         | next         |
//! |--------------|-----------------------------------|--------------------------------|--------------|
//! | Leading      | fits                              | append                         | Leading      |
//! | Leading      | boundary                          | flush, seed buffer with line   | Continuation |
//! | Continuation | skippable (`Discard` policy)      | drop line                      | Continuation |
//! | Continuation | fits                              | append                         | Continuation |
//! | Continuation | boundary                          | flush, seed buffer with line   | Continuation |
//!
//! A line is a boundary when appending it would exceed `max_chunk_size` and
//! the buffer already holds body text; a header-only buffer always accepts
//! the line, so a single oversized line overruns instead of producing an
//! empty chunk. Skippable lines trim-start with `import `, `//`, `/*` or `*`.
//! A trailing buffer without body text is dropped, unless nothing was flushed
//! before it: oversized blank-only content still yields one header-only chunk.

use serde::{Deserialize, Serialize};

use crate::fetcher::FileRecord;

/// Treatment of import and comment lines after the first chunk boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContinuationPolicy {
    #[default]
    Discard,
    Keep,
}

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Measured in characters.
    pub max_chunk_size: usize,
    pub max_chunks_per_file: usize,
    pub continuation_policy: ContinuationPolicy,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 4000,
            max_chunks_per_file: 3,
            continuation_policy: ContinuationPolicy::Discard,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub source_path: String,
    /// Zero-based position within the file.
    pub part_index: usize,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct ChunkedFile {
    pub chunks: Vec<Chunk>,
    /// Chunks dropped by `max_chunks_per_file`.
    pub truncated: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Leading,
    Continuation,
}

struct Accumulator<'a> {
    path: &'a str,
    config: &'a ChunkerConfig,
    phase: Phase,
    buffer: String,
    buffer_chars: usize,
    has_body: bool,
    flushed: Vec<String>,
}

impl<'a> Accumulator<'a> {
    fn new(path: &'a str, config: &'a ChunkerConfig) -> Self {
        let buffer = format!("File: {path}\n\n");
        Self {
            path,
            config,
            phase: Phase::Leading,
            buffer_chars: buffer.chars().count(),
            buffer,
            has_body: false,
            flushed: Vec::new(),
        }
    }

    fn is_skippable(line: &str) -> bool {
        let t = line.trim_start();
        t.starts_with("import ") || t.starts_with("//") || t.starts_with("/*") || t.starts_with('*')
    }

    fn step(&mut self, line: &str) {
        if self.phase == Phase::Continuation
            && self.config.continuation_policy == ContinuationPolicy::Discard
            && Self::is_skippable(line)
        {
            return;
        }

        let line_chars = line.chars().count();
        if self.has_body && self.buffer_chars + line_chars > self.config.max_chunk_size {
            self.flush();
            self.buffer = format!("File: {} (part {})\n\n", self.path, self.flushed.len() + 1);
            self.buffer_chars = self.buffer.chars().count();
            self.has_body = false;
            self.phase = Phase::Continuation;
        }
        self.append(line, line_chars);
    }

    fn append(&mut self, line: &str, line_chars: usize) {
        self.buffer.push_str(line);
        self.buffer.push('\n');
        self.buffer_chars += line_chars + 1;
        self.has_body |= !line.trim().is_empty();
    }

    fn flush(&mut self) {
        self.flushed.push(self.buffer.trim().to_owned());
    }

    fn finish(mut self) -> Vec<String> {
        if self.has_body || self.flushed.is_empty() {
            self.flush();
        }
        self.flushed
    }
}

/// Chunks one file. Pure; never fails.
#[must_use]
pub fn chunk_file(record: &FileRecord, config: &ChunkerConfig) -> ChunkedFile {
    let path = record.path.as_str();
    let content = record.content.as_str();

    let texts = if content.chars().count() <= config.max_chunk_size {
        vec![format!("File: {path}\n\n{content}")]
    } else {
        let mut acc = Accumulator::new(path, config);
        for line in content.split('\n') {
            acc.step(line);
        }
        acc.finish()
    };

    let keep = config.max_chunks_per_file.max(1);
    let truncated = texts.len().saturating_sub(keep);
    if truncated > 0 {
        tracing::debug!(path, truncated, "dropping chunks over per-file cap");
    }

    let chunks = texts
        .into_iter()
        .take(keep)
        .enumerate()
        .map(|(part_index, text)| Chunk {
            source_path: path.to_owned(),
            part_index,
            text,
        })
        .collect();

    ChunkedFile { chunks, truncated }
}
