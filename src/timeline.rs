//! Normalization of raw frame delays into a playable keyframe timeline.

use crate::{DecodedImage, FrameDelay, RepeatCount, TimelineOptions};
use thiserror::Error;

/// Errors that prevent a timeline from being built.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    /// Every frame failed to decode, or there were none
    #[error("No readable frames")]
    NoFrames,
    /// The container has no loop count, so loop semantics are unknown
    #[error("Missing loop count metadata")]
    MissingLoopCount,
    /// The frame delays add up to more than an `f64` can hold
    #[error("Total duration is not finite")]
    DurationOverflow,
}

/// An immutable, normalized animation timeline.
///
/// `key_times[i]` is the start of frame `i` as a fraction of `duration`.
/// The first key time is always `0.0` and the sequence never decreases.
#[derive(Clone, Debug)]
pub struct Timeline<B> {
    /// Decoded frames in display order
    frames: Vec<B>,
    /// Start of each frame as a fraction of the duration
    key_times: Vec<f64>,
    /// Sum of all resolved delays in seconds
    duration: f64,
    /// Container loop count, `0` meaning forever
    loop_count: u32,
}

impl<B> Timeline<B> {
    /// All frames in display order.
    #[inline]
    pub fn frames(&self) -> &[B] {
        &self.frames
    }

    /// Number of frames (always at least one).
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Normalized start offset of each frame.
    #[inline]
    pub fn key_times(&self) -> &[f64] {
        &self.key_times
    }

    /// Total duration in seconds.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Loop count from the container, `0` meaning forever.
    #[inline]
    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    /// Repeat count to hand to a driver.
    pub fn repeat_count(&self) -> RepeatCount {
        RepeatCount::from_loop_count(self.loop_count)
    }

    /// The first frame, shown when not animating.
    #[inline]
    pub fn poster_image(&self) -> &B {
        &self.frames[0]
    }

    /// Display time of a single frame in seconds.
    pub fn frame_delay(&self, index: usize) -> Option<f64> {
        let start = *self.key_times.get(index)?;
        let end = self.key_times.get(index + 1).copied().unwrap_or(1.0);
        Some((end - start) * self.duration)
    }
}

/// Builds [`Timeline`]s from decoder output.
///
/// ## Example
///
/// ```rust
/// use animated_frames::{DecodedImage, FrameDelay, RawFrame, TimelineBuilder};
///
/// let decoded = DecodedImage::new(
///     vec![
///         RawFrame::new("a", FrameDelay::exact(0.1)),
///         RawFrame::new("b", FrameDelay::exact(0.3)),
///     ],
///     Some(0),
/// );
///
/// let timeline = TimelineBuilder::new().build(decoded).unwrap();
/// assert_eq!(timeline.frame_count(), 2);
/// assert!((timeline.duration() - 0.4).abs() < 1e-9);
/// assert!((timeline.key_times()[1] - 0.25).abs() < 1e-9);
/// ```
#[derive(Clone, Debug, Default)]
pub struct TimelineBuilder {
    /// Delay floor and first-frame default
    options: TimelineOptions,
}

impl TimelineBuilder {
    /// Create a builder with the default 60 FPS delay floor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with custom options.
    pub fn with_options(options: TimelineOptions) -> Self {
        Self {
            options: options.sanitized(),
        }
    }

    /// Get the options in use.
    #[inline]
    pub fn options(&self) -> &TimelineOptions {
        &self.options
    }

    /// Pick the delay for one frame.
    ///
    /// Priority: exact delay, fallback delay, the previous frame's delay, then
    /// the configured default. The result is never below `min_frame_delay`.
    pub fn resolve_delay(&self, delay: &FrameDelay, previous: Option<f64>) -> f64 {
        let resolved = match (delay.unclamped, delay.clamped) {
            (Some(exact), _) if exact.is_finite() => exact,
            (_, Some(fallback)) if fallback.is_finite() => fallback,
            _ => previous.unwrap_or(self.options.default_frame_delay),
        };
        resolved.max(self.options.min_frame_delay)
    }

    /// Build a timeline, consuming the decoded frames.
    ///
    /// Frames without a bitmap are skipped and contribute no delay. Fails if
    /// the loop count is missing, no frame is readable, or the delays sum to
    /// a non-finite duration.
    pub fn build<B>(&self, decoded: DecodedImage<B>) -> Result<Timeline<B>, BuildError> {
        let loop_count = decoded
            .metadata
            .loop_count
            .ok_or(BuildError::MissingLoopCount)?;

        let mut frames = Vec::with_capacity(decoded.frames.len());
        let mut delays: Vec<f64> = Vec::with_capacity(decoded.frames.len());

        for (index, raw) in decoded.frames.into_iter().enumerate() {
            let Some(bitmap) = raw.bitmap else {
                tracing::debug!("Skipping frame {}: bitmap failed to decode", index);
                continue;
            };

            if !raw.delay.is_present() {
                tracing::debug!("Frame {} has no delay metadata", index);
            }

            delays.push(self.resolve_delay(&raw.delay, delays.last().copied()));
            frames.push(bitmap);
        }

        if frames.is_empty() {
            return Err(BuildError::NoFrames);
        }

        let mut accumulator = 0.0;
        let offsets: Vec<f64> = delays
            .iter()
            .map(|delay| {
                let offset = accumulator;
                accumulator += delay;
                offset
            })
            .collect();
        let duration = accumulator;
        if !duration.is_finite() {
            tracing::warn!("Frame delays of {} frames overflow the duration", delays.len());
            return Err(BuildError::DurationOverflow);
        }
        let key_times = offsets.into_iter().map(|offset| offset / duration).collect();

        Ok(Timeline {
            frames,
            key_times,
            duration,
            loop_count,
        })
    }
}
