// Headless front-end: streams frames to an image-IO thread that writes PNGs

use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
    sync::mpsc,
    thread::{self, JoinHandle},
};

use plotters::prelude::*;
use tracing::{info, warn};

use crate::observers::{
    Frame, FramePacket, FrameSink,
    raster::{self, unpack_rgb},
};

/// Write one frame to `<frames_dir>/<filename>` as a PNG
pub fn image_save(
    frame: &Frame<'_>,
    filename: &str,
    frames_dir: &Path,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let raster = raster::rasterize(frame);

    let filename = frames_dir.join(filename);

    let root = BitMapBackend::new(&filename, (raster.width as u32, raster.height as u32))
        .into_drawing_area();
    root.fill(&BLACK)?;

    for y in 0..raster.height {
        for x in 0..raster.width {
            let (r, g, b) = unpack_rgb(raster.get(x, y));
            root.draw_pixel((x as i32, y as i32), &RGBColor(r, g, b))?;
        }
    }
    root.present()?;

    Ok(())
}

/// Receive frames until the sending side hangs up, saving each as `<index>.png`
pub fn image_io_loop(
    inbound_frames: mpsc::Receiver<FramePacket>,
    frames_dir: &Path,
) -> Result<usize, Box<dyn Error + Send + Sync>> {
    let mut saved = 0;

    while let Ok(inbound) = inbound_frames.recv() {
        image_save(
            &inbound.as_frame(),
            format!("{}.png", inbound.index).as_str(),
            frames_dir,
        )?;
        saved += 1;
    }

    Ok(saved)
}

/// A [`FrameSink`] that forwards every `save_every`-th frame to a background
/// image-IO thread.
pub struct ImageStream {
    sender: Option<mpsc::Sender<FramePacket>>,
    worker: Option<JoinHandle<Result<usize, Box<dyn Error + Send + Sync>>>>,
    save_every: usize,
}

impl ImageStream {
    /// Recreate `frames_dir` and spawn the image-IO thread
    pub fn start(
        frames_dir: &Path,
        save_every: usize,
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        if frames_dir.exists() {
            fs::remove_dir_all(frames_dir)?;
        }
        fs::create_dir_all(frames_dir)?;

        let (sender, receiver) = mpsc::channel();
        let frames_dir: PathBuf = frames_dir.to_path_buf();

        let worker = thread::spawn(move || image_io_loop(receiver, &frames_dir));

        Ok(ImageStream {
            sender: Some(sender),
            worker: Some(worker),
            save_every: save_every.max(1),
        })
    }

    /// Hang up and wait for the IO thread to drain. Returns the number of
    /// frames written.
    pub fn finish(mut self) -> Result<usize, Box<dyn Error + Send + Sync>> {
        self.sender.take();

        let Some(worker) = self.worker.take() else {
            return Ok(0);
        };

        let saved = worker
            .join()
            .map_err(|_| "image IO thread panicked")??;

        info!("Wrote {saved} frames");
        Ok(saved)
    }
}

impl FrameSink for ImageStream {
    fn present(&mut self, frame: &Frame<'_>) -> Result<(), Box<dyn Error + Send + Sync>> {
        if frame.index % self.save_every != 0 {
            return Ok(());
        }

        let Some(sender) = &self.sender else {
            return Err("image stream already finished".into());
        };

        if sender.send(FramePacket::from_frame(frame)).is_err() {
            warn!("Image IO thread hung up; dropping frame {}", frame.index);
            return Err("image IO thread stopped".into());
        }

        Ok(())
    }
}
