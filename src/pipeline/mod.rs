//! Content pipeline sitting between backend bytes and client bytes.
//!
//! The identity stage passes the payload through as a stream without
//! buffering. The watermark stage necessarily buffers the whole object:
//! it decodes the payload into a frame, stamps the modification time
//! across it, and re-encodes to PNG. Input size is capped so an oversized
//! object fails cleanly instead of ballooning memory.

pub mod stamp;

use crate::models::object::ObjectRecord;
use bytes::Bytes;
use std::io::Cursor;
use thiserror::Error;
use tokio::{fs::File, io::AsyncReadExt};
use tokio_util::io::ReaderStream;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("object is {size} bytes, larger than the {limit}-byte transform cap")]
    TooLarge { size: i64, limit: usize },
    #[error("image transform failed: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What the pipeline hands back to the responder.
///
/// Either the untouched payload handle wrapped for streaming, or a fully
/// buffered transformed body plus the content type it now carries.
pub enum PipelineOutput {
    Stream(ReaderStream<File>),
    Buffered { body: Bytes, content_type: &'static str },
}

/// Transform stage selection, fixed at startup.
#[derive(Clone, Debug)]
pub enum ContentPipeline {
    /// Pass bytes through unchanged.
    Identity,
    /// Decode, stamp the modification time, re-encode as PNG.
    Watermark { max_input_bytes: usize },
}

impl ContentPipeline {
    /// Run the payload through the configured stage.
    ///
    /// The watermark path fails before any body byte reaches the client:
    /// the transformed body only exists once decode, stamp, and re-encode
    /// have all succeeded.
    pub async fn apply(
        &self,
        mut file: File,
        meta: &ObjectRecord,
    ) -> Result<PipelineOutput, PipelineError> {
        match self {
            ContentPipeline::Identity => Ok(PipelineOutput::Stream(ReaderStream::new(file))),
            ContentPipeline::Watermark { max_input_bytes } => {
                if meta.size_bytes > *max_input_bytes as i64 {
                    return Err(PipelineError::TooLarge {
                        size: meta.size_bytes,
                        limit: *max_input_bytes,
                    });
                }

                let mut raw = Vec::with_capacity(meta.size_bytes.max(0) as usize);
                file.read_to_end(&mut raw).await?;
                drop(file);

                let stamp_text = meta.last_modified.format("%Y-%m-%d %H:%M:%S UTC").to_string();
                let body = watermark_bytes(&raw, &stamp_text)?;
                Ok(PipelineOutput::Buffered {
                    body,
                    content_type: "image/png",
                })
            }
        }
    }
}

/// Decode, stamp, and re-encode a raster payload. CPU-bound and pure.
fn watermark_bytes(raw: &[u8], stamp_text: &str) -> Result<Bytes, PipelineError> {
    let mut frame = image::load_from_memory(raw)?.into_rgba8();
    stamp::place_text(&mut frame, stamp_text);

    let mut encoded = Vec::new();
    image::DynamicImage::ImageRgba8(frame)
        .write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Png)?;
    Ok(Bytes::from(encoded))
}
