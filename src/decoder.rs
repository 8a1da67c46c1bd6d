//! GIF decoding backed by the `image` crate.

use crate::parser::scan_gif;
use crate::{DecodeError, DecodedImage, RawFrame, Result, Timeline, TimelineBuilder, TimelineOptions};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, RgbaImage};
use std::io::Cursor;

/// Decode a GIF into RGBA frames plus timing metadata.
///
/// Frames are composited onto the logical screen, so each bitmap is a full
/// picture. A frame whose pixels fail to decode is returned without a bitmap.
pub fn decode_gif(data: &[u8]) -> std::result::Result<DecodedImage<RgbaImage>, DecodeError> {
    let metadata = scan_gif(data)?;
    if metadata.frame_count() == 0 {
        return Err(DecodeError::NoReadableFrames);
    }

    let decoder = GifDecoder::new(Cursor::new(data))?;
    let mut bitmaps = decoder.into_frames().take(metadata.frame_count());

    let frames = metadata
        .frame_delays
        .iter()
        .enumerate()
        .map(|(index, delay)| match bitmaps.next() {
            Some(Ok(frame)) => RawFrame::new(frame.into_buffer(), *delay),
            Some(Err(e)) => {
                tracing::debug!("Failed to decode GIF frame {}: {}", index, e);
                RawFrame::failed(*delay)
            }
            None => RawFrame::failed(*delay),
        })
        .collect();

    Ok(DecodedImage::new(frames, metadata.loop_count))
}

/// Decode a GIF and build its timeline.
pub fn load_gif(data: &[u8], options: &TimelineOptions) -> Result<Timeline<RgbaImage>> {
    let decoded = decode_gif(data)?;
    let timeline = TimelineBuilder::with_options(*options).build(decoded)?;
    Ok(timeline)
}

/// Decode a GIF with default options, or `None` if it cannot be animated.
///
/// Callers should show a static placeholder when this returns `None`.
pub fn animated_image_from_gif(data: &[u8]) -> Option<Timeline<RgbaImage>> {
    match load_gif(data, &TimelineOptions::default()) {
        Ok(timeline) => Some(timeline),
        Err(e) => {
            tracing::debug!("No animation available: {}", e);
            None
        }
    }
}
