//! Typed decoder output consumed by the timeline builder.

/// Delay metadata attached to a single decoded frame, in seconds.
///
/// Containers commonly carry two overlapping values: the exact delay stored
/// in the file and a "clamped" delay that applies the compatibility rule
/// browsers use for very short delays. Either may be missing.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameDelay {
    /// Exact delay as stored in the container
    pub unclamped: Option<f64>,
    /// Coarser fallback delay
    pub clamped: Option<f64>,
}

impl FrameDelay {
    /// No delay metadata at all.
    pub const NONE: FrameDelay = FrameDelay {
        unclamped: None,
        clamped: None,
    };

    /// Create a delay where both fields carry the same value.
    pub fn exact(seconds: f64) -> Self {
        Self {
            unclamped: Some(seconds),
            clamped: Some(seconds),
        }
    }

    /// Create a delay that only has the fallback field.
    pub fn clamped_only(seconds: f64) -> Self {
        Self {
            unclamped: None,
            clamped: Some(seconds),
        }
    }

    /// Check whether either field is present.
    #[inline]
    pub fn is_present(&self) -> bool {
        self.unclamped.is_some() || self.clamped.is_some()
    }
}

/// One decoded frame as handed over by a decoder.
///
/// `bitmap` is `None` when the decoder found the frame but could not
/// materialize its pixels.
#[derive(Clone, Debug)]
pub struct RawFrame<B> {
    /// Decoded pixels, if decoding succeeded
    pub bitmap: Option<B>,
    /// Delay metadata for this frame
    pub delay: FrameDelay,
}

impl<B> RawFrame<B> {
    /// Create a frame with a bitmap and delay metadata.
    pub fn new(bitmap: B, delay: FrameDelay) -> Self {
        Self {
            bitmap: Some(bitmap),
            delay,
        }
    }

    /// Create a frame whose bitmap failed to decode.
    pub fn failed(delay: FrameDelay) -> Self {
        Self {
            bitmap: None,
            delay,
        }
    }
}

/// Container-level metadata.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContainerMetadata {
    /// Loop count, `0` meaning forever. `None` when the container has no
    /// loop information.
    pub loop_count: Option<u32>,
}

/// Everything a decoder produces for one animated image.
#[derive(Clone, Debug)]
pub struct DecodedImage<B> {
    /// Frames in display order
    pub frames: Vec<RawFrame<B>>,
    /// Container-level metadata
    pub metadata: ContainerMetadata,
}

impl<B> DecodedImage<B> {
    /// Create decoded image data.
    pub fn new(frames: Vec<RawFrame<B>>, loop_count: Option<u32>) -> Self {
        Self {
            frames,
            metadata: ContainerMetadata { loop_count },
        }
    }

    /// Number of frames whose bitmap was decoded.
    pub fn readable_frames(&self) -> usize {
        self.frames.iter().filter(|f| f.bitmap.is_some()).count()
    }
}
