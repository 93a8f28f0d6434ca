use std::path::Path;

use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling::{Context as Scaler, Flags};
use ffmpeg_next::util::frame::video::Video;

use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::shared::frame::Frame;

/// Streams the frames of a video file through ffmpeg.
///
/// Each call to `current_frame` decodes the next frame; there is no
/// wall-clock pacing, so a slow consumer plays the file slower rather
/// than skipping ahead.
pub struct VideoFileSource {
    state: Option<DecodeState>,
    frame_index: usize,
}

struct DecodeState {
    input: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: Scaler,
    stream_index: usize,
    flushing: bool,
}

// Safety: VideoFileSource is owned by a single pipeline thread at a time.
// The raw pointers inside ffmpeg types are never shared across threads.
unsafe impl Send for VideoFileSource {}

impl VideoFileSource {
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        ffmpeg_next::init().map_err(|e| CaptureError::Device(e.to_string()))?;
        let input = ffmpeg_next::format::input(path)
            .map_err(|e| CaptureError::Device(format!("{}: {e}", path.display())))?;

        let stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| CaptureError::Device("no video stream found".into()))?;
        let stream_index = stream.index();
        let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .and_then(|ctx| ctx.decoder().video())
            .map_err(|e| CaptureError::Decode(e.to_string()))?;

        let scaler = Scaler::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            Flags::BILINEAR,
        )
        .map_err(|e| CaptureError::Decode(e.to_string()))?;

        log::debug!(
            "opened {} ({}x{})",
            path.display(),
            decoder.width(),
            decoder.height()
        );

        Ok(Self {
            state: Some(DecodeState {
                input,
                decoder,
                scaler,
                stream_index,
                flushing: false,
            }),
            frame_index: 0,
        })
    }
}

impl DecodeState {
    fn try_receive(&mut self) -> Option<Result<(Vec<u8>, u32, u32), CaptureError>> {
        let mut decoded = Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return None;
        }
        let mut rgb = Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb) {
            return Some(Err(CaptureError::Decode(e.to_string())));
        }
        let (w, h) = (self.decoder.width(), self.decoder.height());
        Some(Ok((extract_rgb_pixels(&rgb, w, h), w, h)))
    }

    fn next_image(&mut self) -> Result<(Vec<u8>, u32, u32), CaptureError> {
        if let Some(result) = self.try_receive() {
            return result;
        }
        if self.flushing {
            return Err(CaptureError::EndOfStream);
        }
        loop {
            let next = self.input.packets().next();
            let Some((stream, packet)) = next else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                return self.try_receive().unwrap_or(Err(CaptureError::EndOfStream));
            };
            if stream.index() != self.stream_index {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            if let Some(result) = self.try_receive() {
                return result;
            }
        }
    }
}

impl FrameSource for VideoFileSource {
    fn current_frame(&mut self) -> Result<Frame, CaptureError> {
        let state = self.state.as_mut().ok_or(CaptureError::Closed)?;
        let (pixels, width, height) = state.next_image()?;
        let frame = Frame::new(pixels, width, height, 3, self.frame_index);
        self.frame_index += 1;
        Ok(frame)
    }

    fn close(&mut self) {
        self.state = None;
    }
}

fn extract_rgb_pixels(rgb: &Video, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb.stride(0);
    let data = rgb.data(0);
    let row_bytes = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}
