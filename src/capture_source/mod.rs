//! Screen capture: dynamic reconfiguration of what's captured and at what
//! rate, plus tile-hash dirty-rect reporting so the activity tracker sees
//! only what actually changed. Grounded in the teacher's `capture.rs` tile
//! diffing, ported from `scrap` onto `scap`.

use std::time::Duration;

use scap::capturer::{Capturer, Options};
use scap::frame::Frame;

use crate::engine::activity::DirtyRect;
use crate::error::CaptureError;

const TILE_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct CaptureParams {
    pub region: Option<CaptureRegion>,
    pub fps: u32,
    pub scale: f64,
}

impl Default for CaptureParams {
    fn default() -> Self {
        CaptureParams { region: None, fps: 60, scale: 1.0 }
    }
}

/// One captured frame: the full RGBA buffer plus the tiles that changed
/// since the previous one, for the activity tracker to consume directly.
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    pub dirty_rects: Vec<DirtyRect>,
}

/// The capture backend contract: resolution, region, frame rate, and color
/// depth can all change mid-session as the engine's decisions evolve.
pub trait FrameSource: Send {
    fn reconfigure(&mut self, params: CaptureParams) -> Result<(), CaptureError>;
    fn next_frame(&mut self) -> Result<CapturedFrame, CaptureError>;
}

struct TileDiffer {
    width: usize,
    height: usize,
    tile_hashes: Vec<u64>,
    tiles_x: usize,
    tiles_y: usize,
}

impl TileDiffer {
    fn new(width: usize, height: usize) -> Self {
        let tiles_x = width.div_ceil(TILE_SIZE);
        let tiles_y = height.div_ceil(TILE_SIZE);
        TileDiffer {
            width,
            height,
            tile_hashes: vec![0; tiles_x * tiles_y],
            tiles_x,
            tiles_y,
        }
    }

    /// Hashes each tile of `rgba` and returns the rects whose hash changed
    /// since the last call, marking everything dirty on the first call.
    fn diff(&mut self, rgba: &[u8]) -> Vec<DirtyRect> {
        let mut dirty = Vec::new();
        for ty in 0..self.tiles_y {
            for tx in 0..self.tiles_x {
                let x0 = tx * TILE_SIZE;
                let y0 = ty * TILE_SIZE;
                let x1 = (x0 + TILE_SIZE).min(self.width);
                let y1 = (y0 + TILE_SIZE).min(self.height);
                let hash = hash_tile(rgba, self.width, x0, y0, x1, y1);
                let idx = ty * self.tiles_x + tx;
                if self.tile_hashes[idx] != hash {
                    self.tile_hashes[idx] = hash;
                    dirty.push(DirtyRect { width: (x1 - x0) as u32, height: (y1 - y0) as u32 });
                }
            }
        }
        dirty
    }
}

fn hash_tile(rgba: &[u8], stride_px: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> u64 {
    use std::hash::Hasher;
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for y in y0..y1 {
        let row_start = (y * stride_px + x0) * 4;
        let row_end = (y * stride_px + x1) * 4;
        if row_end <= rgba.len() {
            hasher.write(&rgba[row_start..row_end]);
        }
    }
    hasher.finish()
}

pub struct ScapFrameSource {
    capturer: Capturer,
    differ: TileDiffer,
    width: u32,
    height: u32,
}

impl ScapFrameSource {
    pub fn new() -> Result<Self, CaptureError> {
        if !scap::is_supported() {
            return Err(CaptureError::Backend("screen capture not supported on this platform".to_string()));
        }
        let options = Options { fps: 60, show_cursor: true, ..Default::default() };
        let mut capturer = Capturer::build(options).map_err(|e| CaptureError::Backend(e.to_string()))?;
        capturer.start_capture();

        let (width, height) = capturer
            .get_output_frame_size()
            .map(|[w, h]| (w, h))
            .unwrap_or((1920, 1080));

        Ok(ScapFrameSource {
            capturer,
            differ: TileDiffer::new(width as usize, height as usize),
            width,
            height,
        })
    }
}

impl FrameSource for ScapFrameSource {
    fn reconfigure(&mut self, params: CaptureParams) -> Result<(), CaptureError> {
        self.capturer.stop_capture();
        let options = Options {
            fps: params.fps,
            show_cursor: true,
            ..Default::default()
        };
        self.capturer = Capturer::build(options).map_err(|e| CaptureError::Backend(e.to_string()))?;
        self.capturer.start_capture();
        if let Some((w, h)) = self.capturer.get_output_frame_size().map(|[w, h]| (w, h)) {
            self.width = w;
            self.height = h;
            self.differ = TileDiffer::new(w as usize, h as usize);
        }
        Ok(())
    }

    fn next_frame(&mut self) -> Result<CapturedFrame, CaptureError> {
        loop {
            match self.capturer.get_next_frame() {
                Ok(Frame::BGRx(frame)) => {
                    let rgba = bgrx_to_rgba(&frame.data);
                    let dirty_rects = self.differ.diff(&rgba);
                    return Ok(CapturedFrame { width: self.width, height: self.height, rgba, dirty_rects });
                }
                Ok(Frame::RGBx(frame)) => {
                    let dirty_rects = self.differ.diff(&frame.data);
                    return Ok(CapturedFrame { width: self.width, height: self.height, rgba: frame.data, dirty_rects });
                }
                Ok(_) => continue,
                Err(e) => {
                    if e.to_string().contains("WouldBlock") {
                        std::thread::sleep(Duration::from_millis(5));
                        continue;
                    }
                    return Err(CaptureError::Backend(e.to_string()));
                }
            }
        }
    }
}

fn bgrx_to_rgba(bgrx: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bgrx.len());
    for chunk in bgrx.chunks_exact(4) {
        out.extend_from_slice(&[chunk[2], chunk[1], chunk[0], 255]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_diff_marks_every_tile_dirty() {
        let mut differ = TileDiffer::new(128, 128);
        let frame = vec![10u8; 128 * 128 * 4];
        let dirty = differ.diff(&frame);
        assert_eq!(dirty.len(), 4);
    }

    #[test]
    fn identical_frame_reports_no_dirty_tiles() {
        let mut differ = TileDiffer::new(128, 128);
        let frame = vec![10u8; 128 * 128 * 4];
        differ.diff(&frame);
        let dirty = differ.diff(&frame);
        assert!(dirty.is_empty());
    }

    #[test]
    fn single_changed_tile_reports_one_rect() {
        let mut differ = TileDiffer::new(128, 128);
        let mut frame = vec![10u8; 128 * 128 * 4];
        differ.diff(&frame);
        for px in frame.iter_mut().take(4 * 10) {
            *px = 200;
        }
        let dirty = differ.diff(&frame);
        assert_eq!(dirty.len(), 1);
    }
}
</content>
