//! PNG decoding into converter input and frame screenshots.
//!
//! PNG rows are stored top first; [`RgbaImage`] is bottom row first, so rows
//! are reversed on the way in. [`Frame`]s are already top row first.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use png::{BitDepth, ColorType, Decoder, Encoder, Transformations};
use ppu_core::assets::RgbaImage;
use ppu_core::types::Frame;

/// Decode any 8/16-bit, paletted or grayscale PNG into RGBA.
pub fn decode_png(bytes: &[u8]) -> Result<RgbaImage> {
    let mut decoder = Decoder::new(bytes);
    decoder.set_transformations(Transformations::EXPAND | Transformations::STRIP_16);
    let mut reader = decoder.read_info().context("Invalid PNG header")?;

    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .context("Failed to decode PNG image data")?;

    let (width, height) = (info.width as usize, info.height as usize);
    let channels = info.color_type.samples();
    let mut rgba = Vec::with_capacity(width * height * 4);

    for y in (0..height).rev() {
        let start = y * info.line_size;
        let row = &buf[start..start + width * channels];
        for px in row.chunks_exact(channels) {
            let pixel = match info.color_type {
                ColorType::Grayscale => [px[0], px[0], px[0], 0xFF],
                ColorType::GrayscaleAlpha => [px[0], px[0], px[0], px[1]],
                ColorType::Rgb => [px[0], px[1], px[2], 0xFF],
                ColorType::Rgba => [px[0], px[1], px[2], px[3]],
                ColorType::Indexed => bail!("Paletted PNG was not expanded"),
            };
            rgba.extend_from_slice(&pixel);
        }
    }

    Ok(RgbaImage::from_rgba8(info.width, info.height, &rgba)?)
}

pub fn read_png<P: AsRef<Path>>(path: P) -> Result<RgbaImage> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("Cannot read {}", path.display()))?;
    decode_png(&bytes).with_context(|| format!("Cannot decode {}", path.display()))
}

/// Encode an ARGB frame as an 8-bit RGBA PNG.
pub fn encode_frame(frame: &Frame) -> Result<Vec<u8>> {
    let mut rgba = Vec::with_capacity(frame.pixels.len() * 4);
    for &argb in &frame.pixels {
        rgba.extend_from_slice(&[
            (argb >> 16) as u8,
            (argb >> 8) as u8,
            argb as u8,
            (argb >> 24) as u8,
        ]);
    }

    let mut out = Vec::new();
    {
        let mut encoder = Encoder::new(&mut out, frame.width, frame.height);
        encoder.set_color(ColorType::Rgba);
        encoder.set_depth(BitDepth::Eight);
        let mut writer = encoder.write_header().context("Failed to write PNG header")?;
        writer
            .write_image_data(&rgba)
            .context("Failed to write PNG image data")?;
    }
    Ok(out)
}

pub fn write_frame_png<P: AsRef<Path>>(path: P, frame: &Frame) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode_frame(frame)?;
    fs::write(path, bytes).with_context(|| format!("Cannot write {}", path.display()))
}
