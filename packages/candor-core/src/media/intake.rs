//! Per-session bounded intake queues for video frames and audio chunks.
//!
//! Producers (socket handlers) offer media without blocking; the session
//! scheduler drains on its own cadence. Both queues drop the *offered* item
//! when full: analysis runs every few seconds, so evicting an already-queued
//! frame to make room buys nothing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::time::Instant;

use super::{AudioChunk, VideoFrame};

/// Outcome of a non-blocking offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeStatus {
    /// Item was queued.
    Accepted,
    /// Queue was full; the offered item was discarded.
    Dropped,
    /// Intake was closed; the offered item was discarded.
    Closed,
}

/// Bounded drop-newest queues for one session's media streams.
///
/// Shared between the socket fan-in (offer side) and the session scheduler
/// (drain side). Dropped counts are metric-only; producers cannot observe
/// whether a specific item was used.
pub struct MediaIntake {
    video: Mutex<VecDeque<VideoFrame>>,
    audio: Mutex<VecDeque<AudioChunk>>,
    video_capacity: usize,
    audio_capacity: usize,
    closed: AtomicBool,
    /// When the last audio chunk was offered, regardless of drop outcome.
    last_audio_at: Mutex<Option<Instant>>,
    video_dropped: AtomicU64,
    audio_dropped: AtomicU64,
}

impl MediaIntake {
    /// Creates an intake with the given queue capacities.
    pub fn new(video_capacity: usize, audio_capacity: usize) -> Self {
        Self {
            video: Mutex::new(VecDeque::with_capacity(video_capacity)),
            audio: Mutex::new(VecDeque::with_capacity(audio_capacity)),
            video_capacity,
            audio_capacity,
            closed: AtomicBool::new(false),
            last_audio_at: Mutex::new(None),
            video_dropped: AtomicU64::new(0),
            audio_dropped: AtomicU64::new(0),
        }
    }

    /// Offers a video frame without blocking.
    ///
    /// When the queue is full the offered frame is discarded and no queued
    /// frame is evicted.
    pub fn offer_video(&self, frame: VideoFrame) -> IntakeStatus {
        if self.closed.load(Ordering::Acquire) {
            return IntakeStatus::Closed;
        }
        let mut queue = self.video.lock();
        if queue.len() >= self.video_capacity {
            self.video_dropped.fetch_add(1, Ordering::Relaxed);
            return IntakeStatus::Dropped;
        }
        queue.push_back(frame);
        IntakeStatus::Accepted
    }

    /// Offers an audio chunk without blocking.
    ///
    /// Updates the last-audio timestamp even when the chunk is dropped: the
    /// producer is demonstrably still speaking, so inactivity flushes must
    /// not fire.
    pub fn offer_audio(&self, chunk: AudioChunk) -> IntakeStatus {
        if self.closed.load(Ordering::Acquire) {
            return IntakeStatus::Closed;
        }
        *self.last_audio_at.lock() = Some(Instant::now());
        let mut queue = self.audio.lock();
        if queue.len() >= self.audio_capacity {
            self.audio_dropped.fetch_add(1, Ordering::Relaxed);
            return IntakeStatus::Dropped;
        }
        queue.push_back(chunk);
        IntakeStatus::Accepted
    }

    /// Removes and returns the most recent frame, discarding older ones.
    ///
    /// The scheduler never falls behind: intermediate frames are skipped
    /// rather than analyzed late.
    pub fn drain_latest_video(&self) -> Option<VideoFrame> {
        let mut queue = self.video.lock();
        let latest = queue.pop_back();
        queue.clear();
        latest
    }

    /// Removes and returns the most recent audio chunk, discarding older ones.
    pub fn drain_latest_audio(&self) -> Option<AudioChunk> {
        let mut queue = self.audio.lock();
        let latest = queue.pop_back();
        queue.clear();
        latest
    }

    /// Drains every queued audio chunk in arrival order.
    ///
    /// Used by the scheduler so that slow composite ticks do not silently
    /// shrink the voice window to a single chunk.
    pub fn drain_all_audio(&self) -> Vec<AudioChunk> {
        let mut queue = self.audio.lock();
        queue.drain(..).collect()
    }

    /// When audio was last offered, if ever.
    pub fn last_audio_at(&self) -> Option<Instant> {
        *self.last_audio_at.lock()
    }

    /// Closes the intake; subsequent offers return [`IntakeStatus::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.video.lock().clear();
        self.audio.lock().clear();
    }

    /// Whether the intake has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of frames discarded because the video queue was full.
    pub fn video_dropped(&self) -> u64 {
        self.video_dropped.load(Ordering::Relaxed)
    }

    /// Number of chunks discarded because the audio queue was full.
    pub fn audio_dropped(&self) -> u64 {
        self.audio_dropped.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn video_len(&self) -> usize {
        self.video.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tag: u8) -> VideoFrame {
        VideoFrame::from_rgb8(1, 1, vec![tag, tag, tag])
    }

    fn chunk(value: f32) -> AudioChunk {
        AudioChunk::new(vec![value; 8], 22_050).unwrap()
    }

    #[test]
    fn offer_accepts_until_capacity() {
        let intake = MediaIntake::new(2, 2);
        assert_eq!(intake.offer_video(frame(1)), IntakeStatus::Accepted);
        assert_eq!(intake.offer_video(frame(2)), IntakeStatus::Accepted);
        assert_eq!(intake.offer_video(frame(3)), IntakeStatus::Dropped);
        assert_eq!(intake.video_dropped(), 1);
    }

    #[test]
    fn drop_newest_keeps_queued_frames() {
        let intake = MediaIntake::new(2, 2);
        intake.offer_video(frame(1));
        intake.offer_video(frame(2));
        intake.offer_video(frame(3));

        // The queue still holds the first two frames; the third was discarded.
        assert_eq!(intake.video_len(), 2);
        let latest = intake.drain_latest_video().unwrap();
        assert_eq!(latest.pixels[0], 2);
    }

    #[test]
    fn saturation_burst_retains_capacity_and_drops_rest() {
        let intake = MediaIntake::new(10, 10);
        for i in 0..100u8 {
            intake.offer_video(frame(i));
        }
        assert_eq!(intake.video_len(), 10);
        assert_eq!(intake.video_dropped(), 90);

        // The newest retained frame is the last one that fit.
        let latest = intake.drain_latest_video().unwrap();
        assert_eq!(latest.pixels[0], 9);
    }

    #[test]
    fn drain_latest_discards_older_frames() {
        let intake = MediaIntake::new(5, 5);
        intake.offer_video(frame(1));
        intake.offer_video(frame(2));
        intake.offer_video(frame(3));

        let latest = intake.drain_latest_video().unwrap();
        assert_eq!(latest.pixels[0], 3);
        assert!(intake.drain_latest_video().is_none());
    }

    #[tokio::test]
    async fn drain_all_audio_preserves_arrival_order() {
        let intake = MediaIntake::new(5, 5);
        intake.offer_audio(chunk(0.1));
        intake.offer_audio(chunk(0.2));
        intake.offer_audio(chunk(0.3));

        let chunks = intake.drain_all_audio();
        assert_eq!(chunks.len(), 3);
        assert!((chunks[0].samples[0] - 0.1).abs() < 1e-6);
        assert!((chunks[2].samples[0] - 0.3).abs() < 1e-6);
        assert!(intake.drain_latest_audio().is_none());
    }

    #[tokio::test]
    async fn offer_audio_updates_last_audio_time_even_when_dropped() {
        let intake = MediaIntake::new(1, 1);
        assert!(intake.last_audio_at().is_none());
        intake.offer_audio(chunk(0.1));
        let first = intake.last_audio_at().unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert_eq!(intake.offer_audio(chunk(0.2)), IntakeStatus::Dropped);
        assert!(intake.last_audio_at().unwrap() > first);
    }

    #[tokio::test]
    async fn close_rejects_further_offers() {
        let intake = MediaIntake::new(2, 2);
        intake.offer_video(frame(1));
        intake.close();
        assert!(intake.is_closed());
        assert_eq!(intake.offer_video(frame(2)), IntakeStatus::Closed);
        assert_eq!(intake.offer_audio(chunk(0.1)), IntakeStatus::Closed);
        assert!(intake.drain_latest_video().is_none());
    }
}
