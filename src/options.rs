//! Timeline tuning options, loadable from TOML.

/// Frames-per-second used for the delay floor and the first-frame default.
const DEFAULT_FPS: f64 = 60.0;

/// Tuning for delay resolution when building a timeline.
///
/// Both values are in seconds. Missing fields in a TOML file fall back to
/// the defaults, so partial files are fine.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TimelineOptions {
    /// Every resolved delay is raised to at least this value
    pub min_frame_delay: f64,
    /// Delay for a first frame with no delay metadata
    pub default_frame_delay: f64,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            min_frame_delay: 1.0 / DEFAULT_FPS,
            default_frame_delay: 1.0 / DEFAULT_FPS,
        }
    }
}

impl TimelineOptions {
    /// Parse options from a TOML string.
    ///
    /// ```toml
    /// min_frame_delay = 0.02
    /// default_frame_delay = 0.1
    /// ```
    #[cfg(feature = "toml")]
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Replace unusable values with the defaults.
    ///
    /// A delay must be finite and strictly positive or the timeline could end
    /// up with a zero duration.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let pick = |name: &str, value: f64, fallback: f64| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                tracing::warn!("Invalid {} {}, using {}", name, value, fallback);
                fallback
            }
        };

        Self {
            min_frame_delay: pick("min_frame_delay", self.min_frame_delay, defaults.min_frame_delay),
            default_frame_delay: pick(
                "default_frame_delay",
                self.default_frame_delay,
                defaults.default_frame_delay,
            ),
        }
    }
}
