//! Live screen frame source backed by `xcap`.
//!
//! The primary monitor is grabbed in full and cropped to the requested
//! region, so region coordinates are in that monitor's pixel space. On
//! macOS the process needs Screen Recording permission; without it the
//! grab fails with a capture error rather than panicking.

use chrono::Local;
use image::DynamicImage;
use std::io::Cursor;
use xcap::Monitor;

use super::{CapturedFrame, FrameSource, Region};
use crate::error::{Error, Result};

/// Captures frames from the primary monitor
#[derive(Debug, Clone, Copy, Default)]
pub struct ScreenSource;

impl ScreenSource {
    pub fn new() -> Self {
        Self
    }
}

impl FrameSource for ScreenSource {
    fn grab(&mut self, region: Region) -> Result<CapturedFrame> {
        region.validate()?;

        let monitor = Monitor::all()
            .map_err(|e| Error::Capture(format!("failed to enumerate monitors: {}", e)))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Capture("no monitors found".into()))?;

        let full = monitor
            .capture_image()
            .map_err(|e| Error::Capture(format!("monitor capture failed: {}", e)))?;
        let full = DynamicImage::ImageRgba8(full);

        let (screen_w, screen_h) = (full.width(), full.height());
        if region.left < 0
            || region.top < 0
            || region.right as i64 > screen_w as i64
            || region.bottom as i64 > screen_h as i64
        {
            return Err(Error::Capture(format!(
                "region {} exceeds screen {}x{}",
                region, screen_w, screen_h
            )));
        }

        let cropped = full.crop_imm(
            region.left as u32,
            region.top as u32,
            region.width(),
            region.height(),
        );
        let taken_at = Local::now();

        let mut png_bytes = Vec::new();
        cropped.write_to(&mut Cursor::new(&mut png_bytes), image::ImageFormat::Png)?;

        Ok(CapturedFrame {
            png_bytes,
            width: cropped.width(),
            height: cropped.height(),
            taken_at,
        })
    }
}
