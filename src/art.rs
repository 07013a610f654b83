use std::{fs, io::Cursor, path::PathBuf};

use anyhow::{bail, Context};
use image::ImageFormat;
use tracing::debug;
use url::Url;

use crate::canvas::Bitmap;

/// Turns an album-art locator into pixels.
pub trait ArtResolver {
    /// Any failure yields `None`; the canvas then renders blank.
    fn resolve(&self, reference: &str) -> Option<Bitmap>;
}

impl<R: ArtResolver + ?Sized> ArtResolver for &R {
    fn resolve(&self, reference: &str) -> Option<Bitmap> {
        (**self).resolve(reference)
    }
}

/// Reads PNG art from `file://` locators, the form MPRIS players hand out
/// for cached cover images.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileArtResolver;

impl ArtResolver for FileArtResolver {
    fn resolve(&self, reference: &str) -> Option<Bitmap> {
        match load_art(reference) {
            Ok(bitmap) => Some(bitmap),
            Err(err) => {
                debug!(reference, "album art unavailable: {err:#}");
                None
            }
        }
    }
}

fn load_art(reference: &str) -> anyhow::Result<Bitmap> {
    let path = art_path(reference)?;
    let bytes = fs::read(&path)
        .with_context(|| format!("Failed to read art file: {}", path.display()))?;
    decode_art(&bytes)
}

fn art_path(reference: &str) -> anyhow::Result<PathBuf> {
    let url = Url::parse(reference).with_context(|| format!("Invalid art locator: {reference}"))?;
    if url.scheme() != "file" {
        bail!("Unsupported art scheme: {}", url.scheme());
    }
    url.to_file_path()
        .map_err(|()| anyhow::anyhow!("Art locator has no local path: {reference}"))
}

pub fn decode_art(bytes: &[u8]) -> anyhow::Result<Bitmap> {
    let image = image::load(Cursor::new(bytes), ImageFormat::Png)
        .context("Failed to decode album art")?;
    Ok(image.to_rgba16())
}
