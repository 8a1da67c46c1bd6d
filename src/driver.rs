//! Headless keyframe driver.
//!
//! A reference [`PlaybackSurface`] that advances frames from an explicit
//! clock instead of a compositor. Useful for tests, offscreen rendering and
//! toolkits without a native keyframe animation primitive.

use crate::{DriverConfig, PlaybackSurface, RepeatCount, Visibility};

/// Frame index presented at `elapsed` seconds under discrete stepping.
///
/// Within a pass the frame is the last one whose key time is at or before
/// the current fraction of the duration. Once a finite repeat count is used
/// up, the last frame is held.
pub fn frame_at(key_times: &[f64], duration: f64, repeat: RepeatCount, elapsed: f64) -> usize {
    if key_times.is_empty() || !duration.is_finite() || duration <= 0.0 {
        return 0;
    }

    let cycles = elapsed.max(0.0) / duration;
    if let RepeatCount::Times(n) = repeat {
        if cycles >= f64::from(n) {
            return key_times.len() - 1;
        }
    }

    let fraction = cycles.fract();
    key_times
        .partition_point(|&k| k <= fraction)
        .saturating_sub(1)
}

/// Elapsed-time state of one installed driver.
///
/// The caller advances it with `tick()`, typically once per display refresh.
#[derive(Clone, Debug)]
pub struct KeyframeClock<B> {
    /// Driver being played
    driver: DriverConfig<B>,
    /// Seconds since installation
    elapsed: f64,
    /// Frame index currently presented
    current_frame: usize,
}

impl<B> KeyframeClock<B> {
    /// Start a clock at the beginning of the timeline.
    pub fn new(driver: DriverConfig<B>) -> Self {
        Self {
            driver,
            elapsed: 0.0,
            current_frame: 0,
        }
    }

    /// Get the driver being played.
    #[inline]
    pub fn driver(&self) -> &DriverConfig<B> {
        &self.driver
    }

    /// Seconds since the driver was installed.
    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Index of the frame currently presented.
    #[inline]
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Advance by `dt` seconds.
    ///
    /// Returns true if the presented frame changed.
    pub fn tick(&mut self, dt: f64) -> bool {
        if self.is_finished() {
            return false;
        }

        self.elapsed += dt.max(0.0);
        let frame = frame_at(
            self.driver.key_times(),
            self.driver.duration(),
            self.driver.repeat(),
            self.elapsed,
        );
        let changed = frame != self.current_frame;
        self.current_frame = frame;
        changed
    }

    /// Check whether a finite repeat count has been played through.
    pub fn is_finished(&self) -> bool {
        match self.driver.repeat() {
            RepeatCount::Forever => false,
            RepeatCount::Times(n) => self.elapsed >= self.driver.duration() * f64::from(n),
        }
    }

    /// Rewind to the first frame.
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.current_frame = 0;
    }
}

/// In-memory [`PlaybackSurface`] driven by [`KeyframeClock`].
///
/// ## Example
///
/// ```rust
/// use animated_frames::{
///     AnimationController, AnimationState, DecodedImage, FrameDelay, HeadlessSurface,
///     LifecycleHub, RawFrame, TimelineBuilder,
/// };
/// use std::rc::Rc;
///
/// let decoded = DecodedImage::new(
///     vec![
///         RawFrame::new('a', FrameDelay::exact(0.5)),
///         RawFrame::new('b', FrameDelay::exact(0.5)),
///     ],
///     Some(0),
/// );
/// let timeline = Rc::new(TimelineBuilder::new().build(decoded).unwrap());
///
/// let mut controller = AnimationController::new(HeadlessSurface::new(), LifecycleHub::new());
/// controller.set_timeline(Some(timeline));
/// assert_eq!(controller.request_start(), AnimationState::Driving);
///
/// controller.surface_mut().advance(0.75);
/// assert_eq!(controller.surface().presented_image(), Some(&'b'));
/// ```
#[derive(Clone, Debug)]
pub struct HeadlessSurface<B> {
    /// Visibility reported to the controller
    visibility: Visibility,
    /// Installed driver, if any
    clock: Option<KeyframeClock<B>>,
    /// Frame shown while no driver is installed
    static_image: Option<B>,
    /// Number of `install_driver` calls
    installs: usize,
    /// Number of drivers actually removed
    removals: usize,
    /// Number of `show_fallback` calls
    fallbacks: usize,
}

impl<B> Default for HeadlessSurface<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> HeadlessSurface<B> {
    /// Create a visible, attached surface.
    pub fn new() -> Self {
        Self::with_visibility(Visibility::default())
    }

    /// Create a surface with the given visibility.
    pub fn with_visibility(visibility: Visibility) -> Self {
        Self {
            visibility,
            clock: None,
            static_image: None,
            installs: 0,
            removals: 0,
            fallbacks: 0,
        }
    }

    /// Replace the visibility reported to the controller.
    ///
    /// The controller only notices after `on_visibility_changed()`.
    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
    }

    /// Set the hidden flag.
    pub fn set_hidden(&mut self, hidden: bool) {
        self.visibility.hidden = hidden;
    }

    /// Set the opacity.
    pub fn set_alpha(&mut self, alpha: f32) {
        self.visibility.alpha = alpha;
    }

    /// Attach to or detach from a display.
    pub fn set_attached(&mut self, attached: bool) {
        self.visibility.attached = attached;
    }

    /// Advance the installed driver by `dt` seconds.
    ///
    /// Returns true if the presented frame changed.
    pub fn advance(&mut self, dt: f64) -> bool {
        self.clock.as_mut().map_or(false, |clock| clock.tick(dt))
    }

    /// Check if a driver is installed.
    #[inline]
    pub fn is_driving(&self) -> bool {
        self.clock.is_some()
    }

    /// Get the installed driver's clock.
    pub fn clock(&self) -> Option<&KeyframeClock<B>> {
        self.clock.as_ref()
    }

    /// The frame set by the last `show_static` call.
    pub fn static_image(&self) -> Option<&B> {
        self.static_image.as_ref()
    }

    /// What a viewer would see: the driven frame, else the static image.
    pub fn presented_image(&self) -> Option<&B> {
        match &self.clock {
            Some(clock) => clock.driver().frames().get(clock.current_frame()),
            None => self.static_image.as_ref(),
        }
    }

    /// Number of drivers installed so far.
    #[inline]
    pub fn install_count(&self) -> usize {
        self.installs
    }

    /// Number of drivers removed so far.
    #[inline]
    pub fn removal_count(&self) -> usize {
        self.removals
    }

    /// Number of times the fallback was requested.
    #[inline]
    pub fn fallback_count(&self) -> usize {
        self.fallbacks
    }
}

impl<B: Clone> PlaybackSurface<B> for HeadlessSurface<B> {
    fn visibility(&self) -> Visibility {
        self.visibility
    }

    fn install_driver(&mut self, driver: DriverConfig<B>) {
        if self.clock.is_some() {
            tracing::warn!("Installing a driver over an existing one");
        }
        self.installs += 1;
        self.clock = Some(KeyframeClock::new(driver));
    }

    fn remove_driver(&mut self) {
        if self.clock.take().is_some() {
            self.removals += 1;
        }
    }

    fn presented_frame(&self) -> Option<usize> {
        self.clock.as_ref().map(|clock| clock.current_frame())
    }

    fn show_static(&mut self, frame: &B) {
        self.static_image = Some(frame.clone());
    }

    fn show_fallback(&mut self) {
        self.fallbacks += 1;
    }
}
