//! The rendering collaborator that actually runs animation drivers.

use crate::Timeline;
use std::rc::Rc;

/// How many times a driver plays the full timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RepeatCount {
    /// Repeat until removed
    Forever,
    /// Play the timeline exactly this many times
    Times(u32),
}

impl RepeatCount {
    /// Map a container loop count, where `0` means forever.
    pub fn from_loop_count(loop_count: u32) -> Self {
        match loop_count {
            0 => RepeatCount::Forever,
            n => RepeatCount::Times(n),
        }
    }
}

/// How a driver moves between key times.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stepping {
    /// Hard cut to the next frame at each key time
    #[default]
    Discrete,
}

/// Everything a surface needs to install a driver.
#[derive(Debug)]
pub struct DriverConfig<B> {
    /// Frames, key times and duration to play
    timeline: Rc<Timeline<B>>,
    /// Number of passes before holding the last frame
    repeat: RepeatCount,
    /// Interpolation between key times
    stepping: Stepping,
}

impl<B> Clone for DriverConfig<B> {
    fn clone(&self) -> Self {
        Self {
            timeline: Rc::clone(&self.timeline),
            repeat: self.repeat,
            stepping: self.stepping,
        }
    }
}

impl<B> DriverConfig<B> {
    /// Create a discrete-stepping driver config for a timeline.
    pub fn new(timeline: Rc<Timeline<B>>) -> Self {
        let repeat = timeline.repeat_count();
        Self {
            timeline,
            repeat,
            stepping: Stepping::Discrete,
        }
    }

    /// The timeline being driven.
    #[inline]
    pub fn timeline(&self) -> &Rc<Timeline<B>> {
        &self.timeline
    }

    /// Frames in display order.
    #[inline]
    pub fn frames(&self) -> &[B] {
        self.timeline.frames()
    }

    /// Normalized start of each frame.
    #[inline]
    pub fn key_times(&self) -> &[f64] {
        self.timeline.key_times()
    }

    /// Duration of one pass in seconds.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.timeline.duration()
    }

    /// Number of passes to play.
    #[inline]
    pub fn repeat(&self) -> RepeatCount {
        self.repeat
    }

    /// How frames change at key times.
    #[inline]
    pub fn stepping(&self) -> Stepping {
        self.stepping
    }
}

/// Visibility properties of the view hosting the animation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Visibility {
    /// The view is explicitly hidden
    pub hidden: bool,
    /// Opacity (0.0 - 1.0)
    pub alpha: f32,
    /// The view is attached to a window or display surface
    pub attached: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            hidden: false,
            alpha: 1.0,
            attached: true,
        }
    }
}

impl Visibility {
    /// Check whether the view can actually be seen.
    #[inline]
    pub fn is_visible(&self) -> bool {
        !self.hidden && self.alpha > 0.0 && self.attached
    }
}

/// A rendering surface that can run one animation driver at a time.
///
/// Implemented by the UI layer. The controller guarantees that
/// `install_driver` is never called while a driver is installed.
pub trait PlaybackSurface<B> {
    /// Current visibility of the hosting view.
    fn visibility(&self) -> Visibility;

    /// Start presenting frames according to the driver config.
    fn install_driver(&mut self, driver: DriverConfig<B>);

    /// Stop the installed driver.
    fn remove_driver(&mut self);

    /// Index of the frame the driver is presenting right now, if known.
    fn presented_frame(&self) -> Option<usize>;

    /// Display a single frame without animating.
    fn show_static(&mut self, frame: &B);

    /// Display whatever the surface shows when it has nothing to animate.
    fn show_fallback(&mut self) {}
}
