//! Container metadata scanning for GIF files.
//!
//! Only the block structure is walked; pixel data is skipped. This yields
//! the loop count and per-frame delays that pixel decoders tend to drop.

use crate::{DecodeError, FrameDelay};

const HEADER_SIZE: usize = 13;

const EXTENSION: u8 = 0x21;
const IMAGE_DESCRIPTOR: u8 = 0x2C;
const TRAILER: u8 = 0x3B;

const GRAPHIC_CONTROL: u8 = 0xF9;
const APPLICATION: u8 = 0xFF;

/// Application identifiers carrying a loop count.
const LOOP_EXTENSIONS: [&[u8; 11]; 2] = [b"NETSCAPE2.0", b"ANIMEXTS1.0"];

/// Delays at or below this many centiseconds are shown as 100ms by browsers.
const MIN_COMPATIBLE_DELAY_CS: u16 = 1;
const COMPATIBLE_DELAY: f64 = 0.1;

/// Metadata found in a GIF stream.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GifMetadata {
    /// Logical screen width
    pub width: u16,
    /// Logical screen height
    pub height: u16,
    /// Loop count from the application extension, `0` meaning forever
    pub loop_count: Option<u32>,
    /// Delay of each image, in stream order
    pub frame_delays: Vec<FrameDelay>,
}

impl GifMetadata {
    /// Number of images in the stream.
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frame_delays.len()
    }
}

/// Check for a `GIF87a` or `GIF89a` signature.
pub fn is_gif(data: &[u8]) -> bool {
    data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a")
}

/// Walk a GIF stream and collect its timing metadata.
///
/// A stream that stops early is accepted with whatever was read so far.
///
/// ## Example
///
/// ```rust
/// use animated_frames::parser::scan_gif;
///
/// let bytes = [
///     b'G', b'I', b'F', b'8', b'9', b'a',
///     1, 0, 1, 0, 0, 0, 0,                  // 1x1, no colour table
///     0x21, 0xF9, 4, 0, 10, 0, 0, 0,        // 100ms delay
///     0x2C, 0, 0, 0, 0, 1, 0, 1, 0, 0,      // image descriptor
///     2, 2, 0x4C, 0x01, 0,                  // image data
///     0x3B,
/// ];
///
/// let metadata = scan_gif(&bytes).unwrap();
/// assert_eq!(metadata.frame_count(), 1);
/// assert_eq!(metadata.frame_delays[0].unclamped, Some(0.1));
/// assert_eq!(metadata.loop_count, None);
/// ```
pub fn scan_gif(data: &[u8]) -> Result<GifMetadata, DecodeError> {
    if !is_gif(data) {
        return Err(DecodeError::UnrecognizedFormat);
    }
    if data.len() < HEADER_SIZE {
        return Err(DecodeError::Truncated {
            needed: HEADER_SIZE,
            actual: data.len(),
        });
    }

    let mut metadata = GifMetadata {
        width: u16::from_le_bytes([data[6], data[7]]),
        height: u16::from_le_bytes([data[8], data[9]]),
        ..Default::default()
    };

    let mut pos = HEADER_SIZE + color_table_len(data[10]);
    let mut pending_delay = None;

    loop {
        let Some(&byte) = data.get(pos) else {
            tracing::debug!("GIF stream ended without trailer at offset {}", pos);
            break;
        };

        let next = match byte {
            TRAILER => break,
            EXTENSION => {
                let Some(&label) = data.get(pos + 1) else {
                    break;
                };
                let body = pos + 2;
                match label {
                    GRAPHIC_CONTROL => {
                        if let Some(delay) = graphic_control_delay(data, body) {
                            pending_delay = Some(delay);
                        }
                    }
                    APPLICATION => {
                        if let Some(count) = application_loop_count(data, body) {
                            metadata.loop_count = Some(count);
                        }
                    }
                    _ => {}
                }
                skip_sub_blocks(data, body)
            }
            IMAGE_DESCRIPTOR => {
                let Some(&packed) = data.get(pos + 9) else {
                    break;
                };
                metadata
                    .frame_delays
                    .push(pending_delay.take().unwrap_or(FrameDelay::NONE));
                // Descriptor, local colour table, LZW minimum code size
                skip_sub_blocks(data, pos + 10 + color_table_len(packed) + 1)
            }
            _ => return Err(DecodeError::Malformed { offset: pos, byte }),
        };

        match next {
            Some(next) => pos = next,
            None => {
                tracing::debug!("GIF block at offset {} runs past the end", pos);
                break;
            }
        }
    }

    Ok(metadata)
}

/// Size of the colour table announced by a packed field.
fn color_table_len(packed: u8) -> usize {
    if packed & 0x80 != 0 {
        3 * (1usize << ((packed & 0x07) + 1))
    } else {
        0
    }
}

/// Skip a chain of data sub-blocks, returning the offset after the terminator.
fn skip_sub_blocks(data: &[u8], mut pos: usize) -> Option<usize> {
    loop {
        let size = *data.get(pos)? as usize;
        pos += 1;
        if size == 0 {
            return Some(pos);
        }
        pos += size;
    }
}

fn graphic_control_delay(data: &[u8], body: usize) -> Option<FrameDelay> {
    let block = data.get(body..body + 5)?;
    if block[0] < 4 {
        return None;
    }

    let centiseconds = u16::from_le_bytes([block[2], block[3]]);
    let exact = f64::from(centiseconds) / 100.0;
    let compatible = if centiseconds <= MIN_COMPATIBLE_DELAY_CS {
        COMPATIBLE_DELAY
    } else {
        exact
    };

    Some(FrameDelay {
        unclamped: Some(exact),
        clamped: Some(compatible),
    })
}

fn application_loop_count(data: &[u8], body: usize) -> Option<u32> {
    let header = data.get(body..body + 12)?;
    if header[0] != 11 || !LOOP_EXTENSIONS.iter().any(|id| header[1..] == id[..]) {
        return None;
    }

    let sub_block = data.get(body + 12..body + 16)?;
    if sub_block[0] < 3 || sub_block[1] != 1 {
        return None;
    }
    Some(u32::from(u16::from_le_bytes([sub_block[2], sub_block[3]])))
}
