//! Visibility-aware playback controller.

use crate::{DriverConfig, LifecycleSource, PlaybackSurface, SubscriptionId, Timeline, Visibility};
use std::rc::Rc;

/// Where the controller is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnimationState {
    /// Not asked to animate, or nothing to animate
    Idle,
    /// Asked to animate but some precondition is failing
    WantedNotDriving,
    /// A driver is installed on the surface
    Driving,
}

/// Snapshot of every external signal that gates playback.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Signals {
    /// Visibility of the hosting view
    pub visibility: Visibility,
    /// The application is in the foreground
    pub app_foreground: bool,
}

impl Default for Signals {
    fn default() -> Self {
        Self {
            visibility: Visibility::default(),
            app_foreground: true,
        }
    }
}

/// Check whether a driver may be installed (or kept).
///
/// All of these must hold: animation is wanted, a timeline is set, the view
/// is not hidden, has non-zero opacity, is attached to a display, and the
/// application is in the foreground.
pub fn is_eligible(wants_animation: bool, has_timeline: bool, signals: &Signals) -> bool {
    wants_animation && has_timeline && signals.visibility.is_visible() && signals.app_foreground
}

/// Playback bookkeeping owned by an [`AnimationController`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlaybackState {
    /// Start was requested and not yet stopped
    wants_animation: bool,
    /// A driver is installed on the surface
    is_driving: bool,
    /// Last observed external signals
    signals: Signals,
}

impl PlaybackState {
    /// Whether start was requested and not yet stopped.
    #[inline]
    pub fn wants_animation(&self) -> bool {
        self.wants_animation
    }

    /// Whether the surface has a driver installed.
    #[inline]
    pub fn is_driving(&self) -> bool {
        self.is_driving
    }

    /// Last observed visibility and foreground state.
    #[inline]
    pub fn signals(&self) -> &Signals {
        &self.signals
    }
}

/// Decides when an animated image should be running on its surface.
///
/// The controller never advances time itself. It installs a driver on the
/// [`PlaybackSurface`] when every precondition holds and removes it as soon as
/// one fails. All transitions are explicit method calls that return the new
/// [`AnimationState`].
///
/// Events carry no payload: the controller re-reads the surface's
/// visibility and the lifecycle source's foreground flag when notified.
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
/// let decoded = DecodedImage::new(vec![RawFrame::new(1u8, FrameDelay::NONE)], Some(0));
/// let timeline = Rc::new(TimelineBuilder::new().build(decoded).unwrap());
///
/// let mut controller = AnimationController::new(HeadlessSurface::new(), LifecycleHub::new());
/// controller.set_timeline(Some(timeline));
///
/// // Hidden views do not animate
/// controller.surface_mut().set_hidden(true);
/// controller.on_visibility_changed();
/// assert_eq!(controller.request_start(), AnimationState::WantedNotDriving);
///
/// controller.surface_mut().set_hidden(false);
/// assert_eq!(controller.on_visibility_changed(), AnimationState::Driving);
///
/// assert_eq!(controller.request_stop(), AnimationState::Idle);
/// assert_eq!(controller.surface().install_count(), 1);
/// assert_eq!(controller.surface().removal_count(), 1);
/// ```
pub struct AnimationController<B, R, S>
where
    R: PlaybackSurface<B>,
    S: LifecycleSource,
{
    /// Timeline to play, shared with installed drivers
    timeline: Option<Rc<Timeline<B>>>,
    /// Wish, driving flag and signal snapshot
    playback: PlaybackState,
    /// Rendering side that receives drivers
    surface: R,
    /// Source of foreground/background state
    lifecycle: S,
    /// Held while animation is wanted
    subscription: Option<SubscriptionId>,
}

impl<B, R, S> AnimationController<B, R, S>
where
    R: PlaybackSurface<B>,
    S: LifecycleSource,
{
    /// Create an idle controller without a timeline.
    pub fn new(surface: R, lifecycle: S) -> Self {
        let signals = Signals {
            visibility: surface.visibility(),
            app_foreground: lifecycle.is_foreground(),
        };
        Self {
            timeline: None,
            playback: PlaybackState {
                wants_animation: false,
                is_driving: false,
                signals,
            },
            surface,
            lifecycle,
            subscription: None,
        }
    }

    /// Get the current state.
    pub fn state(&self) -> AnimationState {
        if self.playback.is_driving {
            AnimationState::Driving
        } else if self.playback.wants_animation {
            AnimationState::WantedNotDriving
        } else {
            AnimationState::Idle
        }
    }

    /// Check if a driver is currently installed.
    #[inline]
    pub fn is_animating(&self) -> bool {
        self.playback.is_driving
    }

    /// Get the playback bookkeeping.
    #[inline]
    pub fn playback(&self) -> &PlaybackState {
        &self.playback
    }

    /// Get the current timeline, if any.
    #[inline]
    pub fn timeline(&self) -> Option<&Rc<Timeline<B>>> {
        self.timeline.as_ref()
    }

    /// Get the surface.
    #[inline]
    pub fn surface(&self) -> &R {
        &self.surface
    }

    /// Mutable access to the surface.
    ///
    /// Changing visibility through this does nothing until
    /// `on_visibility_changed()` is called.
    #[inline]
    pub fn surface_mut(&mut self) -> &mut R {
        &mut self.surface
    }

    /// Get the lifecycle source.
    #[inline]
    pub fn lifecycle(&self) -> &S {
        &self.lifecycle
    }

    /// Handle held while animation is wanted.
    #[inline]
    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.subscription
    }

    /// Evaluate eligibility against the current snapshot.
    pub fn is_eligible(&self) -> bool {
        is_eligible(
            self.playback.wants_animation,
            self.timeline.is_some(),
            &self.playback.signals,
        )
    }

    /// Replace the timeline.
    ///
    /// Setting the same timeline again is a no-op. A different timeline
    /// while driving swaps the driver. `None` while animation is wanted stops.
    pub fn set_timeline(&mut self, timeline: Option<Rc<Timeline<B>>>) -> AnimationState {
        let unchanged = match (&self.timeline, &timeline) {
            (Some(current), Some(new)) => Rc::ptr_eq(current, new),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            tracing::trace!("Timeline unchanged");
            return self.state();
        }

        if timeline.is_none() {
            if self.playback.wants_animation {
                self.request_stop();
            }
            self.timeline = None;
            return self.state();
        }

        if self.playback.is_driving {
            tracing::debug!("Swapping timeline while driving");
            self.end_animation();
        }
        self.timeline = timeline;
        self.refresh()
    }

    /// Ask for animation to run whenever possible.
    ///
    /// Without a timeline this only asks the surface to show its fallback.
    pub fn request_start(&mut self) -> AnimationState {
        if self.timeline.is_none() {
            tracing::debug!("Start requested without a timeline");
            self.surface.show_fallback();
            return self.state();
        }

        self.playback.wants_animation = true;
        if self.subscription.is_none() {
            self.subscription = Some(self.lifecycle.subscribe());
        }
        self.playback.signals = Signals {
            visibility: self.surface.visibility(),
            app_foreground: self.lifecycle.is_foreground(),
        };
        self.refresh()
    }

    /// Stop animating and release the lifecycle subscription.
    ///
    /// The surface keeps showing the frame that was on screen.
    pub fn request_stop(&mut self) -> AnimationState {
        self.playback.wants_animation = false;
        if let Some(id) = self.subscription.take() {
            self.lifecycle.unsubscribe(id);
        }
        if self.playback.is_driving {
            self.end_animation();
        }
        self.state()
    }

    /// Re-read the surface's visibility and react to it.
    pub fn on_visibility_changed(&mut self) -> AnimationState {
        self.playback.signals.visibility = self.surface.visibility();
        self.refresh()
    }

    /// Re-read the application's foreground state and react to it.
    ///
    /// Going to the background suspends without clearing the wish to
    /// animate. Coming back installs a fresh driver that starts from the
    /// first frame.
    pub fn on_app_state_changed(&mut self) -> AnimationState {
        self.playback.signals.app_foreground = self.lifecycle.is_foreground();
        if self.subscription.is_none() {
            tracing::trace!("Ignoring app state change while unsubscribed");
            return self.state();
        }
        self.refresh()
    }

    fn refresh(&mut self) -> AnimationState {
        match (self.is_eligible(), self.playback.is_driving) {
            (true, false) => self.begin_animation(),
            (false, true) => self.end_animation(),
            _ => tracing::trace!("Playback unchanged: {:?}", self.state()),
        }
        self.state()
    }

    fn begin_animation(&mut self) {
        let Some(timeline) = &self.timeline else {
            return;
        };

        let driver = DriverConfig::new(Rc::clone(timeline));
        tracing::debug!(
            "Installing driver: {} frames, {:.3}s, {:?}",
            driver.frames().len(),
            driver.duration(),
            driver.repeat()
        );
        self.playback.is_driving = true;
        self.surface.install_driver(driver);
    }

    fn end_animation(&mut self) {
        let presented = self.surface.presented_frame();
        self.surface.remove_driver();
        self.playback.is_driving = false;
        tracing::debug!("Removed driver, presented frame {:?}", presented);

        if let Some(timeline) = &self.timeline {
            let frame = presented
                .and_then(|index| timeline.frames().get(index))
                .unwrap_or_else(|| timeline.poster_image());
            self.surface.show_static(frame);
        }
    }
}

impl<B, R, S> Drop for AnimationController<B, R, S>
where
    R: PlaybackSurface<B>,
    S: LifecycleSource,
{
    fn drop(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.lifecycle.unsubscribe(id);
        }
        if self.playback.is_driving {
            self.surface.remove_driver();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AppState, DecodedImage, FrameDelay, LifecycleHub, RawFrame, TimelineBuilder};

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Install(usize),
        Remove,
        ShowStatic(u32),
        Fallback,
    }

    /// Surface that records every call and flags overlapping drivers.
    #[derive(Default)]
    struct Recorder {
        visibility: Visibility,
        calls: Vec<Call>,
        active: Option<DriverConfig<u32>>,
        presented: Option<usize>,
        overlapped: bool,
    }

    impl Recorder {
        fn installs(&self) -> usize {
            self.calls
                .iter()
                .filter(|c| matches!(c, Call::Install(_)))
                .count()
        }

        fn removes(&self) -> usize {
            self.calls.iter().filter(|c| **c == Call::Remove).count()
        }
    }

    impl PlaybackSurface<u32> for Recorder {
        fn visibility(&self) -> Visibility {
            self.visibility
        }

        fn install_driver(&mut self, driver: DriverConfig<u32>) {
            if self.active.is_some() {
                self.overlapped = true;
            }
            self.calls.push(Call::Install(driver.frames().len()));
            self.active = Some(driver);
        }

        fn remove_driver(&mut self) {
            self.active = None;
            self.calls.push(Call::Remove);
        }

        fn presented_frame(&self) -> Option<usize> {
            self.active.as_ref().and(self.presented)
        }

        fn show_static(&mut self, frame: &u32) {
            self.calls.push(Call::ShowStatic(*frame));
        }

        fn show_fallback(&mut self) {
            self.calls.push(Call::Fallback);
        }
    }

    type Hub = Rc<LifecycleHub>;
    type Ctrl = AnimationController<u32, Recorder, Hub>;

    fn timeline(frames: &[u32]) -> Rc<Timeline<u32>> {
        let raw = frames
            .iter()
            .map(|f| RawFrame::new(*f, FrameDelay::exact(0.1)))
            .collect();
        Rc::new(
            TimelineBuilder::new()
                .build(DecodedImage::new(raw, Some(0)))
                .unwrap(),
        )
    }

    fn controller() -> (Ctrl, Hub) {
        let hub = Rc::new(LifecycleHub::new());
        let controller = AnimationController::new(Recorder::default(), Rc::clone(&hub));
        (controller, hub)
    }

    /// Deliver a state change the way an event loop would.
    fn route(hub: &LifecycleHub, state: AppState, ctrls: &mut [&mut Ctrl]) -> usize {
        hub.notify(state, |id| {
            for ctrl in ctrls.iter_mut() {
                if ctrl.subscription() == Some(id) {
                    ctrl.on_app_state_changed();
                }
            }
        })
    }

    #[test]
    fn test_is_eligible() {
        let signals = Signals::default();
        assert!(is_eligible(true, true, &signals));
        assert!(!is_eligible(false, true, &signals));
        assert!(!is_eligible(true, false, &signals));

        let background = Signals {
            app_foreground: false,
            ..signals
        };
        assert!(!is_eligible(true, true, &background));

        let hidden = Signals {
            visibility: Visibility {
                hidden: true,
                ..Default::default()
            },
            ..signals
        };
        assert!(!is_eligible(true, true, &hidden));
    }

    #[test]
    fn test_start_hidden_then_reveal() {
        let (mut ctrl, hub) = controller();
        ctrl.set_timeline(Some(timeline(&[1, 2, 3])));
        ctrl.surface_mut().visibility.hidden = true;

        assert_eq!(ctrl.request_start(), AnimationState::WantedNotDriving);
        assert_eq!(ctrl.surface().installs(), 0);
        assert_eq!(hub.subscriber_count(), 1);

        ctrl.surface_mut().visibility.hidden = false;
        assert_eq!(ctrl.on_visibility_changed(), AnimationState::Driving);
        assert_eq!(ctrl.surface().installs(), 1);

        // Repeated signals do not reinstall
        assert_eq!(ctrl.on_visibility_changed(), AnimationState::Driving);
        assert_eq!(ctrl.request_start(), AnimationState::Driving);
        assert_eq!(ctrl.surface().installs(), 1);
        assert_eq!(hub.subscriber_count(), 1);

        assert_eq!(ctrl.request_stop(), AnimationState::Idle);
        assert_eq!(ctrl.surface().removes(), 1);
        assert_eq!(hub.subscriber_count(), 0);
        assert!(!ctrl.playback().wants_animation());
    }

    #[test]
    fn test_background_suspends_and_foreground_resumes() {
        let (mut ctrl, hub) = controller();
        ctrl.set_timeline(Some(timeline(&[1, 2])));
        assert_eq!(ctrl.request_start(), AnimationState::Driving);

        hub.set_state(AppState::Background);
        assert_eq!(ctrl.on_app_state_changed(), AnimationState::WantedNotDriving);
        assert_eq!(ctrl.surface().removes(), 1);
        assert!(ctrl.playback().wants_animation());

        // Visibility churn while backgrounded stays suspended
        assert_eq!(ctrl.on_visibility_changed(), AnimationState::WantedNotDriving);

        hub.set_state(AppState::Foreground);
        assert_eq!(ctrl.on_app_state_changed(), AnimationState::Driving);
        assert_eq!(ctrl.surface().installs(), 2);
        assert_eq!(ctrl.surface().removes(), 1);
    }

    #[test]
    fn test_app_state_ignored_when_not_wanted() {
        let (mut ctrl, hub) = controller();
        ctrl.set_timeline(Some(timeline(&[1, 2])));

        hub.set_state(AppState::Background);
        assert_eq!(ctrl.on_app_state_changed(), AnimationState::Idle);
        assert!(!ctrl.playback().signals().app_foreground);

        // Start while backgrounded waits for the foreground
        assert_eq!(ctrl.request_start(), AnimationState::WantedNotDriving);
        hub.set_state(AppState::Foreground);
        assert_eq!(ctrl.on_app_state_changed(), AnimationState::Driving);
        assert_eq!(ctrl.surface().installs(), 1);
    }

    #[test]
    fn test_swap_timeline_while_driving() {
        let (mut ctrl, _hub) = controller();
        let first = timeline(&[1, 2]);
        let second = timeline(&[7, 8, 9]);

        ctrl.set_timeline(Some(Rc::clone(&first)));
        ctrl.request_start();
        ctrl.surface_mut().calls.clear();

        assert_eq!(ctrl.set_timeline(Some(Rc::clone(&second))), AnimationState::Driving);
        assert_eq!(
            ctrl.surface().calls,
            vec![Call::Remove, Call::ShowStatic(1), Call::Install(3)]
        );
        assert!(!ctrl.surface().overlapped);

        let active = ctrl.surface().active.as_ref().unwrap();
        assert!(Rc::ptr_eq(active.timeline(), &second));
        assert_eq!(active.key_times(), second.key_times());
        assert_eq!(active.duration(), second.duration());
    }

    #[test]
    fn test_same_timeline_is_noop() {
        let (mut ctrl, _hub) = controller();
        let t = timeline(&[1, 2]);
        ctrl.set_timeline(Some(Rc::clone(&t)));
        ctrl.request_start();

        assert_eq!(ctrl.set_timeline(Some(Rc::clone(&t))), AnimationState::Driving);
        assert_eq!(ctrl.surface().calls, vec![Call::Install(2)]);
    }

    #[test]
    fn test_clearing_timeline_stops() {
        let (mut ctrl, hub) = controller();
        ctrl.set_timeline(Some(timeline(&[1, 2])));
        ctrl.request_start();

        assert_eq!(ctrl.set_timeline(None), AnimationState::Idle);
        assert_eq!(ctrl.surface().removes(), 1);
        assert!(ctrl.timeline().is_none());
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_timeline_set_while_waiting() {
        let (mut ctrl, _hub) = controller();
        ctrl.set_timeline(Some(timeline(&[1])));
        ctrl.surface_mut().visibility.attached = false;
        assert_eq!(ctrl.request_start(), AnimationState::WantedNotDriving);

        assert_eq!(
            ctrl.set_timeline(Some(timeline(&[4, 5]))),
            AnimationState::WantedNotDriving
        );
        assert_eq!(ctrl.surface().installs(), 0);

        ctrl.surface_mut().visibility.attached = true;
        assert_eq!(ctrl.on_visibility_changed(), AnimationState::Driving);
        assert_eq!(ctrl.surface().calls, vec![Call::Install(2)]);
    }

    #[test]
    fn test_start_without_timeline_shows_fallback() {
        let (mut ctrl, hub) = controller();
        assert_eq!(ctrl.request_start(), AnimationState::Idle);
        assert_eq!(ctrl.surface().calls, vec![Call::Fallback]);
        assert!(ctrl.subscription().is_none());
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_teardown_keeps_presented_frame() {
        let (mut ctrl, _hub) = controller();
        ctrl.set_timeline(Some(timeline(&[10, 20, 30])));
        ctrl.request_start();
        ctrl.surface_mut().presented = Some(2);

        ctrl.request_stop();
        assert_eq!(ctrl.surface().calls.last(), Some(&Call::ShowStatic(30)));
    }

    #[test]
    fn test_teardown_falls_back_to_poster() {
        let (mut ctrl, _hub) = controller();
        ctrl.set_timeline(Some(timeline(&[10, 20, 30])));
        ctrl.request_start();

        ctrl.surface_mut().visibility.alpha = 0.0;
        assert_eq!(ctrl.on_visibility_changed(), AnimationState::WantedNotDriving);
        assert_eq!(ctrl.surface().calls.last(), Some(&Call::ShowStatic(10)));

        ctrl.surface_mut().visibility.alpha = 0.5;
        assert_eq!(ctrl.on_visibility_changed(), AnimationState::Driving);
        assert_eq!(ctrl.surface().installs(), 2);
    }

    #[test]
    fn test_drop_releases_resources() {
        let hub = Rc::new(LifecycleHub::new());
        {
            let mut ctrl = AnimationController::new(Recorder::default(), Rc::clone(&hub));
            ctrl.set_timeline(Some(timeline(&[1, 2])));
            ctrl.request_start();
            assert_eq!(hub.subscriber_count(), 1);
        }
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_lifecycle_events_routed_by_subscription() {
        let hub = Rc::new(LifecycleHub::new());
        let mut started = AnimationController::new(Recorder::default(), Rc::clone(&hub));
        let mut idle = AnimationController::new(Recorder::default(), Rc::clone(&hub));
        started.set_timeline(Some(timeline(&[1, 2])));
        idle.set_timeline(Some(timeline(&[3, 4])));

        started.request_start();
        assert_eq!(hub.subscribers(), vec![started.subscription().unwrap()]);
        assert!(idle.subscription().is_none());

        assert_eq!(route(&hub, AppState::Background, &mut [&mut started, &mut idle]), 1);
        assert_eq!(started.state(), AnimationState::WantedNotDriving);
        assert_eq!(started.surface().removes(), 1);
        assert_eq!(idle.state(), AnimationState::Idle);
        assert!(idle.surface().calls.is_empty());

        assert_eq!(route(&hub, AppState::Foreground, &mut [&mut started, &mut idle]), 1);
        assert_eq!(started.state(), AnimationState::Driving);
        assert_eq!(started.surface().installs(), 2);
        assert!(idle.surface().calls.is_empty());
    }

    #[test]
    fn test_stop_during_delivery() {
        let (mut ctrl, hub) = controller();
        ctrl.set_timeline(Some(timeline(&[1, 2])));
        ctrl.request_start();

        hub.set_state(AppState::Background);
        for id in hub.subscribers() {
            if ctrl.subscription() == Some(id) {
                ctrl.on_app_state_changed();
                ctrl.request_stop();
            }
        }
        assert_eq!(ctrl.state(), AnimationState::Idle);
        assert_eq!(hub.subscriber_count(), 0);

        // Started while backgrounded, stopped from inside the hub's own walk
        assert_eq!(ctrl.request_start(), AnimationState::WantedNotDriving);
        let delivered = hub.notify(AppState::Foreground, |id| {
            if ctrl.subscription() == Some(id) {
                ctrl.request_stop();
            }
        });
        assert_eq!(delivered, 1);
        assert_eq!(ctrl.state(), AnimationState::Idle);
        assert_eq!(ctrl.surface().installs(), 1);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_drop_during_delivery() {
        let hub = Rc::new(LifecycleHub::new());
        let mut ctrls: Vec<Ctrl> = (0..2)
            .map(|_| {
                let mut ctrl = AnimationController::new(Recorder::default(), Rc::clone(&hub));
                ctrl.set_timeline(Some(timeline(&[1, 2])));
                ctrl.request_start();
                ctrl
            })
            .collect();
        assert_eq!(hub.subscriber_count(), 2);

        // The first delivery drops every controller, so the second is skipped
        let delivered = hub.notify(AppState::Background, |_| ctrls.clear());
        assert_eq!(delivered, 1);
        assert!(ctrls.is_empty());
        assert_eq!(hub.subscriber_count(), 0);
    }
}
