//! Demo bootstrap: make sure the showcase container exists and holds
//! exactly one known object before the server starts accepting requests.
//!
//! The demo image is generated in code rather than shipped as a binary
//! asset; its exact pixels do not matter, only that it decodes and shows
//! the watermark clearly.

use crate::{models::object::ObjectRecord, services::store::BlobStore};
use anyhow::{Context, Result};
use bytes::Bytes;
use image::{Rgba, RgbaImage};
use std::io::Cursor;
use tracing::info;

/// Key of the object uploaded for the demonstration.
pub const SHOWCASE_OBJECT: &str = "test-object.png";

const DEMO_WIDTH: u32 = 480;
const DEMO_HEIGHT: u32 = 300;

/// Ensure the demo container exists, empty it, and upload a fresh
/// showcase object. Returns the uploaded object's metadata.
pub async fn seed_demo_content(store: &BlobStore, container: &str) -> Result<ObjectRecord> {
    store
        .create_container(container)
        .await
        .with_context(|| format!("creating container `{}`", container))?;
    store
        .empty_container(container)
        .await
        .with_context(|| format!("emptying container `{}`", container))?;

    let payload = demo_png().context("encoding demo image")?;
    let record = store
        .put_object(
            container,
            SHOWCASE_OBJECT,
            Some("image/png".into()),
            Bytes::from(payload),
        )
        .await
        .with_context(|| format!("uploading `{}`", SHOWCASE_OBJECT))?;

    info!(
        container,
        key = SHOWCASE_OBJECT,
        size = record.size_bytes,
        "seeded demo content"
    );
    Ok(record)
}

/// A simple two-axis gradient, encoded as PNG.
fn demo_png() -> Result<Vec<u8>> {
    let frame = RgbaImage::from_fn(DEMO_WIDTH, DEMO_HEIGHT, |x, y| {
        let r = (x * 255 / DEMO_WIDTH) as u8;
        let b = (y * 255 / DEMO_HEIGHT) as u8;
        Rgba([r, 90, b, 255])
    });
    let mut encoded = Vec::new();
    image::DynamicImage::ImageRgba8(frame)
        .write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Png)?;
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_image_encodes_and_decodes() {
        let payload = demo_png().unwrap();
        let decoded = image::load_from_memory(&payload).unwrap();
        assert_eq!(decoded.width(), DEMO_WIDTH);
        assert_eq!(decoded.height(), DEMO_HEIGHT);
    }
}
