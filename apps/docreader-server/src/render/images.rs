//! Image preparation for PDF embedding

use anyhow::{bail, Context, Result};
use image::{ColorType, ImageFormat};
use miniz_oxide::deflate::compress_to_vec_zlib;

/// Pixel data in the shape it will be written as an image XObject
#[derive(Debug, Clone)]
pub enum ImageStream {
    /// Baseline JPEG passed through with `DCTDecode`
    Jpeg { data: Vec<u8>, gray: bool },
    /// zlib-compressed 8-bit RGB plus an optional soft mask
    Flate { rgb: Vec<u8>, alpha: Option<Vec<u8>> },
}

#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    pub stream: ImageStream,
}

pub fn prepare(bytes: &[u8]) -> Result<PreparedImage> {
    let format = image::guess_format(bytes).context("Unrecognized image format")?;
    let decoded =
        image::load_from_memory_with_format(bytes, format).context("Failed to decode image")?;
    let (width, height) = (decoded.width(), decoded.height());
    if width == 0 || height == 0 {
        bail!("Image has no pixels");
    }

    if format == ImageFormat::Jpeg {
        match decoded.color() {
            ColorType::Rgb8 | ColorType::L8 => {
                return Ok(PreparedImage {
                    width,
                    height,
                    stream: ImageStream::Jpeg {
                        data: bytes.to_vec(),
                        gray: decoded.color() == ColorType::L8,
                    },
                })
            }
            _ => {}
        }
    }

    let rgba = decoded.to_rgba8();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }
    let opaque = alpha.iter().all(|&a| a == 255);

    Ok(PreparedImage {
        width,
        height,
        stream: ImageStream::Flate {
            rgb: compress_to_vec_zlib(&rgb, 6),
            alpha: (!opaque).then(|| compress_to_vec_zlib(&alpha, 6)),
        },
    })
}
