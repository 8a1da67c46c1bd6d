//! # animated-frames
//!
//! Timeline normalization and visibility-aware playback control for
//! animated images.
//!
//! This crate provides platform-agnostic logic for:
//! - Turning raw per-frame delays from a decoder into a normalized keyframe
//!   timeline with a loop count
//! - Deciding when an animation should run based on visibility, window
//!   attachment and application foreground state
//! - Installing and removing animation drivers on a rendering surface
//!   without leaking or duplicating them
//!
//! ## Features
//!
//! - `serde` - Enable serialization/deserialization for plain data types
//! - `toml` - Load [`TimelineOptions`] from TOML
//! - `gif` - Decode GIF files with the `image` crate
//!
//! ## Example
//!
//! ```rust,ignore
//! use animated_frames::{AnimationController, LifecycleHub, animated_image_from_gif};
//! use std::rc::Rc;
//!
//! // Decode and normalize
//! let timeline = animated_image_from_gif(&bytes).map(Rc::new);
//!
//! // Drive playback on your own surface
//! let mut controller = AnimationController::new(my_surface, LifecycleHub::new());
//! controller.set_timeline(timeline);
//! controller.request_start();
//!
//! // Later, from your event loop
//! controller.on_visibility_changed();
//! controller.on_app_state_changed();
//! ```

mod controller;
mod data;
#[cfg(feature = "gif")]
mod decoder;
pub mod driver;
mod error;
mod lifecycle;
mod options;
pub mod parser;
mod surface;
mod timeline;

pub use controller::{is_eligible, AnimationController, AnimationState, PlaybackState, Signals};
pub use data::{ContainerMetadata, DecodedImage, FrameDelay, RawFrame};
pub use driver::{HeadlessSurface, KeyframeClock};
pub use error::{DecodeError, Error, Result};
pub use lifecycle::{AppState, LifecycleHub, LifecycleSource, SubscriptionId};
pub use options::TimelineOptions;
pub use parser::{scan_gif, GifMetadata};
pub use surface::{DriverConfig, PlaybackSurface, RepeatCount, Stepping, Visibility};
pub use timeline::{BuildError, Timeline, TimelineBuilder};

#[cfg(feature = "gif")]
pub use decoder::{animated_image_from_gif, decode_gif, load_gif};
