//! Sliding time-windowed PCM buffer feeding the voice detector.
//!
//! Owned exclusively by the session scheduler. Chunks carry their arrival
//! time; every append evicts entries older than the window so the buffer
//! never holds more than the last few seconds of speech.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use super::{AudioChunk, AudioWindow};

struct BufferedChunk {
    chunk: AudioChunk,
    arrived_at: Instant,
}

/// Sliding window of recently received audio.
pub struct AudioBuffer {
    window: Duration,
    entries: VecDeque<BufferedChunk>,
    /// Set on the first-ever append; anchors the voice analysis cadence.
    started_at: Option<Instant>,
}

impl AudioBuffer {
    /// Creates a buffer retaining `window` of trailing audio.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: VecDeque::new(),
            started_at: None,
        }
    }

    /// Appends a chunk, evicting entries older than the window.
    pub fn append(&mut self, chunk: AudioChunk) {
        let now = Instant::now();
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.entries.push_back(BufferedChunk {
            chunk,
            arrived_at: now,
        });
        self.evict(now);
    }

    fn evict(&mut self, now: Instant) {
        while let Some(front) = self.entries.front() {
            if now.duration_since(front.arrived_at) > self.window {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// Concatenates the buffered PCM into an [`AudioWindow`].
    ///
    /// A window is assumed to carry one sample rate. When buffered chunks
    /// disagree, the most recent chunk's rate wins and chunks recorded at a
    /// different rate are left out.
    pub fn extract_window(&self) -> AudioWindow {
        let Some(last) = self.entries.back() else {
            return AudioWindow {
                samples: Vec::new(),
                sample_rate: 0,
                chunk_count: 0,
            };
        };
        let sample_rate = last.chunk.sample_rate;
        let mut samples = Vec::new();
        let mut chunk_count = 0;
        for entry in &self.entries {
            if entry.chunk.sample_rate == sample_rate {
                samples.extend_from_slice(&entry.chunk.samples);
                chunk_count += 1;
            }
        }
        AudioWindow {
            samples,
            sample_rate,
            chunk_count,
        }
    }

    /// When the first chunk was ever appended, if any.
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Whether the buffer currently holds any chunks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of buffered chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drops all buffered chunks. The cadence anchor is kept: analysis
    /// numbering continues from the first chunk of the session.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{self, Duration};

    fn chunk(value: f32, rate: u32) -> AudioChunk {
        AudioChunk::new(vec![value; 4], rate).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn append_sets_started_at_once() {
        let mut buffer = AudioBuffer::new(Duration::from_secs(5));
        assert!(buffer.started_at().is_none());

        buffer.append(chunk(0.1, 22_050));
        let started = buffer.started_at().unwrap();

        time::advance(Duration::from_secs(1)).await;
        buffer.append(chunk(0.2, 22_050));
        assert_eq!(buffer.started_at(), Some(started));
    }

    #[tokio::test(start_paused = true)]
    async fn old_entries_evicted_on_append() {
        let mut buffer = AudioBuffer::new(Duration::from_secs(5));
        buffer.append(chunk(0.1, 22_050));

        time::advance(Duration::from_secs(6)).await;
        buffer.append(chunk(0.2, 22_050));

        assert_eq!(buffer.len(), 1);
        let window = buffer.extract_window();
        assert!((window.samples[0] - 0.2).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_inside_window_are_kept() {
        let mut buffer = AudioBuffer::new(Duration::from_secs(5));
        buffer.append(chunk(0.1, 22_050));
        time::advance(Duration::from_secs(2)).await;
        buffer.append(chunk(0.2, 22_050));
        time::advance(Duration::from_secs(2)).await;
        buffer.append(chunk(0.3, 22_050));

        assert_eq!(buffer.len(), 3);
        let window = buffer.extract_window();
        assert_eq!(window.chunk_count, 3);
        assert_eq!(window.samples.len(), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn most_recent_rate_wins_on_heterogeneous_window() {
        let mut buffer = AudioBuffer::new(Duration::from_secs(5));
        buffer.append(chunk(0.1, 44_100));
        buffer.append(chunk(0.2, 22_050));
        buffer.append(chunk(0.3, 22_050));

        let window = buffer.extract_window();
        assert_eq!(window.sample_rate, 22_050);
        assert_eq!(window.chunk_count, 2);
        assert!((window.samples[0] - 0.2).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn extract_on_empty_buffer_is_empty() {
        let buffer = AudioBuffer::new(Duration::from_secs(5));
        let window = buffer.extract_window();
        assert!(window.is_empty());
        assert_eq!(window.chunk_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_keeps_cadence_anchor() {
        let mut buffer = AudioBuffer::new(Duration::from_secs(5));
        buffer.append(chunk(0.1, 22_050));
        let started = buffer.started_at();

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.started_at(), started);
    }
}
