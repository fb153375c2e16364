// survey-orchestrator-rs/src/imagery.rs
// Four-heading capture and horizontal panorama stitching

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::try_join_all;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbImage};
use tokio::io::AsyncWriteExt;
use vision_sdk::StreetViewClient;

use crate::context::RunContext;
use crate::error::CaptureError;
use crate::grid::SampleCoordinate;

/// Compass headings captured at every point, stitched left to right
pub const HEADINGS: [u16; 4] = [0, 90, 180, 270];

/// Anything that can produce one directional image for a coordinate
#[async_trait]
pub trait HeadingSource: Send + Sync {
    async fn fetch(&self, coordinate: SampleCoordinate, heading: u16) -> vision_sdk::Result<Bytes>;
}

#[async_trait]
impl HeadingSource for StreetViewClient {
    async fn fetch(&self, coordinate: SampleCoordinate, heading: u16) -> vision_sdk::Result<Bytes> {
        self.fetch_heading(coordinate.latitude, coordinate.longitude, f64::from(heading))
            .await
    }
}

/// A stitched panorama persisted to the results directory
#[derive(Debug, Clone)]
pub struct Panorama {
    /// File the panorama was written to
    pub path: PathBuf,

    /// Encoded JPEG, handed to the classifiers
    pub jpeg: Bytes,
}

/// Captures panoramas through a shared heading source
#[derive(Clone)]
pub struct ImageryFetcher {
    source: Arc<dyn HeadingSource>,
}

impl ImageryFetcher {
    pub fn new(source: Arc<dyn HeadingSource>) -> Self {
        Self { source }
    }

    /// Fetch all headings, stitch them and write the panorama
    ///
    /// Any failed heading fails the whole capture and no file is written.
    /// Repeated captures of one coordinate produce distinct files.
    pub async fn capture(&self, context: &RunContext, coordinate: SampleCoordinate) -> Result<Panorama, CaptureError> {
        let tiles = try_join_all(HEADINGS.iter().map(|&heading| async move {
            self.source
                .fetch(coordinate, heading)
                .await
                .map(|bytes| (heading, bytes))
                .map_err(|source| CaptureError::Fetch { heading, source })
        }))
        .await?;

        let jpeg = tokio::task::spawn_blocking(move || build_panorama(&tiles))
            .await
            .map_err(|e| CaptureError::Encode(format!("stitching task failed: {}", e)))??;

        if context.is_cancelled() {
            return Err(CaptureError::Cancelled);
        }

        let path = write_unique(context.results_dir(), &panorama_stem(coordinate), &jpeg).await?;
        log::debug!("Panorama for {} written to {}", coordinate, path.display());

        Ok(Panorama { path, jpeg })
    }
}

/// `LT{lat}LG{lon}` at six decimals with '.' replaced by '_'
pub fn panorama_stem(coordinate: SampleCoordinate) -> String {
    format!(
        "LT{:.6}LG{:.6}",
        coordinate.latitude, coordinate.longitude
    )
    .replace('.', "_")
}

/// Decode, stitch and encode the tiles entirely in memory
fn build_panorama(tiles: &[(u16, Bytes)]) -> Result<Bytes, CaptureError> {
    let decoded = tiles
        .iter()
        .map(|(heading, bytes)| {
            image::load_from_memory(bytes)
                .map(|img| img.to_rgb8())
                .map_err(|e| CaptureError::Decode {
                    heading: *heading,
                    message: e.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let panorama = stitch(&decoded)?;

    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(panorama)
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;

    Ok(Bytes::from(buffer.into_inner()))
}

/// Concatenate tiles horizontally, resizing any tile that differs from the first
pub fn stitch(tiles: &[RgbImage]) -> Result<RgbImage, CaptureError> {
    let first = tiles
        .first()
        .ok_or_else(|| CaptureError::Encode("no tiles to stitch".to_string()))?;
    let (width, height) = first.dimensions();

    let mut panorama = RgbImage::new(width * tiles.len() as u32, height);
    for (i, tile) in tiles.iter().enumerate() {
        let x = i64::from(width) * i as i64;
        if tile.dimensions() == (width, height) {
            imageops::replace(&mut panorama, tile, x, 0);
        } else {
            let resized = imageops::resize(tile, width, height, FilterType::Triangle);
            imageops::replace(&mut panorama, &resized, x, 0);
        }
    }

    Ok(panorama)
}

/// Create `{stem}.jpg`, or `{stem}_1.jpg`, `{stem}_2.jpg`... if taken
async fn write_unique(dir: &Path, stem: &str, bytes: &[u8]) -> Result<PathBuf, CaptureError> {
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("{}.jpg", stem)
        } else {
            format!("{}_{}.jpg", stem, attempt)
        };
        let path = dir.join(name);

        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(mut file) => {
                let written: std::io::Result<()> = async {
                    file.write_all(bytes).await?;
                    file.flush().await
                }
                .await;

                if let Err(source) = written {
                    let _ = tokio::fs::remove_file(&path).await;
                    return Err(CaptureError::Write { path, source });
                }
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(source) => return Err(CaptureError::Write { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CancelSignal;
    use crate::grid::GridSpec;
    use image::Rgb;
    use vision_sdk::ServiceError;

    fn jpeg_tile(width: u32, height: u32, shade: u8) -> Bytes {
        let tile = RgbImage::from_pixel(width, height, Rgb([shade, shade, shade]));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(tile)
            .write_to(&mut buffer, ImageFormat::Jpeg)
            .unwrap();
        Bytes::from(buffer.into_inner())
    }

    struct FakeSource {
        fail_heading: Option<u16>,
    }

    #[async_trait]
    impl HeadingSource for FakeSource {
        async fn fetch(&self, _coordinate: SampleCoordinate, heading: u16) -> vision_sdk::Result<Bytes> {
            if Some(heading) == self.fail_heading {
                return Err(ServiceError::not_found("ZERO_RESULTS"));
            }
            Ok(jpeg_tile(60, 30, (heading / 2) as u8))
        }
    }

    fn context(root: &Path) -> RunContext {
        let spec = GridSpec::new(SampleCoordinate::new(6.2442, -75.5812), 200.0, 100.0);
        RunContext::prepare(spec, root, CancelSignal::never()).unwrap()
    }

    fn jpg_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path.extension().map(|e| e == "jpg").unwrap_or(false))
            .collect()
    }

    #[tokio::test]
    async fn test_capture_writes_stitched_panorama() {
        let root = tempfile::tempdir().unwrap();
        let context = context(root.path());
        let fetcher = ImageryFetcher::new(Arc::new(FakeSource {
            fail_heading: None,
        }));

        let coordinate = SampleCoordinate::new(6.2442, -75.5812);
        let panorama = fetcher.capture(&context, coordinate).await.unwrap();

        assert_eq!(
            panorama.path.file_name().unwrap().to_string_lossy(),
            "LT6_244200LG-75_581200.jpg"
        );
        let written = image::open(&panorama.path).unwrap();
        assert_eq!((written.width(), written.height()), (240, 30));
        assert_eq!(std::fs::read(&panorama.path).unwrap(), panorama.jpeg.to_vec());
    }

    #[tokio::test]
    async fn test_capture_twice_never_overwrites() {
        let root = tempfile::tempdir().unwrap();
        let context = context(root.path());
        let fetcher = ImageryFetcher::new(Arc::new(FakeSource {
            fail_heading: None,
        }));

        let coordinate = SampleCoordinate::new(6.2442, -75.5812);
        let first = fetcher.capture(&context, coordinate).await.unwrap();
        let second = fetcher.capture(&context, coordinate).await.unwrap();

        assert_ne!(first.path, second.path);
        assert!(second.path.ends_with("LT6_244200LG-75_581200_1.jpg"));
        assert_eq!(jpg_files(context.results_dir()).len(), 2);
    }

    #[tokio::test]
    async fn test_single_heading_failure_leaves_no_file() {
        let root = tempfile::tempdir().unwrap();
        let context = context(root.path());
        let fetcher = ImageryFetcher::new(Arc::new(FakeSource {
            fail_heading: Some(180),
        }));

        let err = fetcher
            .capture(&context, SampleCoordinate::new(6.2442, -75.5812))
            .await
            .unwrap_err();

        assert!(matches!(err, CaptureError::Fetch { heading: 180, .. }));
        assert!(jpg_files(context.results_dir()).is_empty());
    }

    #[test]
    fn test_undecodable_tile_is_rejected() {
        let tiles = vec![(0, jpeg_tile(10, 10, 0)), (90, Bytes::from_static(b"<html>quota</html>"))];
        let err = build_panorama(&tiles).unwrap_err();
        assert!(matches!(err, CaptureError::Decode { heading: 90, .. }));
    }

    #[test]
    fn test_stitch_resizes_mismatched_tiles() {
        let tiles = vec![
            RgbImage::from_pixel(4, 2, Rgb([255, 0, 0])),
            RgbImage::from_pixel(8, 4, Rgb([0, 255, 0])),
        ];

        let panorama = stitch(&tiles).unwrap();
        assert_eq!(panorama.dimensions(), (8, 2));
        assert_eq!(panorama.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(panorama.get_pixel(5, 1), &Rgb([0, 255, 0]));
    }
}
