use crate::shared::frame::Frame;
use crate::video::domain::video_source::VideoSource;

/// Opened input with its decoder and RGB converter.
struct Stream {
    input: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
    flushing: bool,
}

/// Decodes frames from a file, network stream or capture URL via
/// ffmpeg-next (libavformat + libavcodec), converting each to RGB24.
///
/// Opening is deferred to the first readiness check and retried on every
/// later one, so a camera or stream that is not up yet simply keeps the
/// session waiting.
pub struct FfmpegVideoSource {
    url: String,
    stream: Option<Stream>,
    next_index: usize,
    ended: bool,
    stopped: bool,
}

// Safety: FfmpegVideoSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegVideoSource {}

impl FfmpegVideoSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream: None,
            next_index: 0,
            ended: false,
            stopped: false,
        }
    }

    fn open(&self) -> Result<Stream, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let input = ffmpeg_next::format::input(&self.url)?;
        let stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let stream_index = stream.index();

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;
        let width = decoder.width();
        let height = decoder.height();
        if width == 0 || height == 0 {
            return Err("Video stream has no frame size yet".into());
        }

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        Ok(Stream {
            input,
            decoder,
            scaler,
            stream_index,
            width,
            height,
            flushing: false,
        })
    }
}

impl Stream {
    fn try_receive(&mut self, index: usize) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&decoded, &mut rgb)?;
        let pixels = packed_rgb(&rgb, self.width, self.height);
        Ok(Some(Frame::new(pixels, self.width, self.height, index)))
    }

    /// Feeds packets until the decoder yields a frame or the input ends.
    fn decode_next(&mut self, index: usize) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if let Some(frame) = self.try_receive(index)? {
            return Ok(Some(frame));
        }
        if self.flushing {
            return Ok(None);
        }

        loop {
            let next = self.input.packets().next();
            let Some((stream, packet)) = next else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                return self.try_receive(index);
            };
            if stream.index() != self.stream_index {
                continue;
            }
            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Skipping undecodable packet: {e}");
                continue;
            }
            if let Some(frame) = self.try_receive(index)? {
                return Ok(Some(frame));
            }
        }
    }
}

impl VideoSource for FfmpegVideoSource {
    fn is_ready(&mut self) -> bool {
        if self.stopped || self.ended {
            return false;
        }
        if self.stream.is_some() {
            return true;
        }
        match self.open() {
            Ok(stream) => {
                log::info!(
                    "Opened video source {} ({}x{})",
                    self.url,
                    stream.width,
                    stream.height
                );
                self.stream = Some(stream);
                true
            }
            Err(e) => {
                log::debug!("Video source {} not ready: {e}", self.url);
                false
            }
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if self.stopped || self.ended {
            return Ok(None);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err("FfmpegVideoSource: not opened".into());
        };
        match stream.decode_next(self.next_index)? {
            Some(frame) => {
                self.next_index += 1;
                Ok(Some(frame))
            }
            None => {
                self.ended = true;
                Ok(None)
            }
        }
    }

    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.stopped = true;
        self.stream = None;
        Ok(())
    }
}

/// Copies an ffmpeg RGB24 frame into a tightly packed buffer, dropping the
/// per-row stride padding.
fn packed_rgb(rgb: &ffmpeg_next::util::frame::video::Video, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb.stride(0);
    let data = rgb.data(0);
    let row_bytes = width as usize * 3;
    (0..height as usize)
        .flat_map(|row| {
            let start = row * stride;
            data[start..start + row_bytes].iter().copied()
        })
        .collect()
}
