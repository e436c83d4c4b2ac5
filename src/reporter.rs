// Activity reporter
// Turns track-change observations into now-playing updates and scrobbles,
// applying the minimum-play-duration rule.

use crate::lastfm::{LastfmClient, LastfmError};
use crate::observer::Track;

/// The reporter's view of a scrobbling service.
///
/// The Last.fm client implements this; tests substitute a recording fake.
pub trait ScrobbleSink {
    /// Update "now playing" status
    fn now_playing(&self, track: &Track) -> Result<(), LastfmError>;

    /// Submit a scrobble with the play-start timestamp
    fn scrobble(&self, track: &Track, timestamp: i64) -> Result<(), LastfmError>;
}

impl ScrobbleSink for LastfmClient {
    fn now_playing(&self, track: &Track) -> Result<(), LastfmError> {
        self.update_now_playing(track)
    }

    fn scrobble(&self, track: &Track, timestamp: i64) -> Result<(), LastfmError> {
        self.submit_scrobble(track, timestamp)
    }
}

#[derive(Debug)]
struct PlayState {
    track: Track,
    started_at: i64,
    scrobbled: bool,
}

/// Consumes track observations and decides when to report them.
///
/// All timing flows through explicit epoch-second arguments so the decision
/// logic stays deterministic. Sink failures are logged and never interrupt
/// tracking; a failed now-playing update does not prevent the later scrobble
/// attempt for the same track.
pub struct ActivityReporter<S> {
    sink: S,
    threshold: i64,
    current: Option<PlayState>,
}

impl<S: ScrobbleSink> ActivityReporter<S> {
    pub fn new(sink: S, threshold_secs: u64) -> Self {
        Self {
            sink,
            threshold: threshold_secs as i64,
            current: None,
        }
    }

    /// Handles one observation pass.
    ///
    /// A track with the same (artist, title) identity as the current one is a
    /// continuation and does nothing. A different identity first gives the
    /// outgoing track its scrobble check, then reports the new one as now
    /// playing.
    pub fn on_track(&mut self, track: Track) {
        if let Some(state) = &self.current {
            if state.track.same_identity(&track) {
                return;
            }
        }

        let now = track.timestamp;
        self.maybe_scrobble(now);

        log::info!("New track: {} - {}", track.artist, track.title);
        if let Err(error) = self.sink.now_playing(&track) {
            log::warn!("Now playing update failed: {error}");
        }

        self.current = Some(PlayState {
            started_at: now,
            track,
            scrobbled: false,
        });
    }

    /// The deferred scrobble check, driven by the poll loop.
    ///
    /// Fires only while the track that started the clock is still current,
    /// which is what cancels stale checks after a track change.
    pub fn tick(&mut self, now: i64) {
        self.maybe_scrobble(now);
    }

    /// End-of-session flush: give the current track its final scrobble check
    /// and forget it.
    pub fn finish(&mut self, now: i64) {
        self.maybe_scrobble(now);
        self.current = None;
    }

    fn maybe_scrobble(&mut self, now: i64) {
        let Some(state) = &mut self.current else {
            return;
        };
        if state.scrobbled || now - state.started_at < self.threshold {
            return;
        }

        // Mark before submitting; the timer and end-of-session paths must
        // never double-submit, and there is no retry policy.
        state.scrobbled = true;
        log::info!(
            "Scrobbling: {} - {} (played {}s)",
            state.track.artist,
            state.track.title,
            now - state.started_at
        );
        if let Err(error) = self.sink.scrobble(&state.track, state.started_at) {
            log::warn!("Scrobble failed: {error}");
        }
    }
}
