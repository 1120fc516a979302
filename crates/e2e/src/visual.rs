//! Visual regression against stored baseline screenshots

use std::path::{Path, PathBuf};

use image::{GenericImageView, Pixel, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};

/// Per-channel difference tolerated before a pixel counts as changed
const CHANNEL_TOLERANCE: i32 = 5;

/// Result of a visual comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualDiff {
    pub name: String,
    /// Whether the images match within the threshold
    pub matches: bool,
    /// Percentage of pixels that differ
    pub diff_percent: f64,
    pub diff_pixels: u64,
    pub total_pixels: u64,
    pub diff_image_path: Option<PathBuf>,
    /// The baseline did not exist and was created from this capture
    pub baseline_created: bool,
}

/// Configuration for visual testing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    pub baseline_dir: PathBuf,
    pub diff_dir: PathBuf,
    /// Allowed differing pixels, 0.0 - 100.0 percent
    pub threshold: f64,
    /// Create missing baselines from the current capture
    pub auto_update: bool,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            baseline_dir: PathBuf::from("test-results/baselines"),
            diff_dir: PathBuf::from("test-results/diffs"),
            threshold: 0.5,
            auto_update: false,
        }
    }
}

/// Pixel counts from comparing two images
pub struct PixelDiff {
    pub diff_pixels: u64,
    pub total_pixels: u64,
    /// Changed pixels in red, unchanged ones dimmed
    pub image: RgbaImage,
}

impl PixelDiff {
    pub fn percent(&self) -> f64 {
        if self.total_pixels == 0 {
            return 0.0;
        }
        (self.diff_pixels as f64 / self.total_pixels as f64) * 100.0
    }
}

/// Compare over the overlapping region; area outside the baseline counts as changed
pub fn compare_images(actual: &RgbaImage, baseline: &RgbaImage) -> PixelDiff {
    let (width, height) = actual.dimensions();
    let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255]));
    let mut diff_pixels = 0u64;
    let total_pixels = width as u64 * height as u64;

    let overlap_w = width.min(baseline.width());
    let overlap_h = height.min(baseline.height());
    diff_pixels += total_pixels - overlap_w as u64 * overlap_h as u64;

    for y in 0..overlap_h {
        for x in 0..overlap_w {
            let a = actual.get_pixel(x, y);
            if pixels_differ(a, baseline.get_pixel(x, y)) {
                diff_pixels += 1;
            } else {
                let c = a.channels();
                image.put_pixel(x, y, Rgba([c[0] / 2, c[1] / 2, c[2] / 2, 128]));
            }
        }
    }

    PixelDiff {
        diff_pixels,
        total_pixels,
        image,
    }
}

fn pixels_differ(a: &Rgba<u8>, b: &Rgba<u8>) -> bool {
    a.channels()
        .iter()
        .zip(b.channels())
        .any(|(x, y)| (*x as i32 - *y as i32).abs() > CHANNEL_TOLERANCE)
}

/// Baseline store and comparator
#[derive(Debug, Clone)]
pub struct VisualTester {
    config: VisualConfig,
}

impl VisualTester {
    pub fn new(config: VisualConfig) -> E2eResult<Self> {
        if !(0.0..=100.0).contains(&config.threshold) {
            return Err(E2eError::Config(format!(
                "visual threshold {} outside 0-100",
                config.threshold
            )));
        }
        std::fs::create_dir_all(&config.baseline_dir)?;
        std::fs::create_dir_all(&config.diff_dir)?;
        Ok(Self { config })
    }

    fn baseline_path(&self, name: &str) -> PathBuf {
        self.config.baseline_dir.join(format!("{}.png", name))
    }

    /// Compare the capture at `actual` against the baseline called `name`
    pub fn compare(&self, name: &str, actual: &Path, threshold: Option<f64>) -> E2eResult<VisualDiff> {
        let threshold = threshold.unwrap_or(self.config.threshold);
        let baseline_path = self.baseline_path(name);

        if !actual.exists() {
            return Err(E2eError::VisualRegression(format!(
                "capture not found: {}",
                actual.display()
            )));
        }

        if !baseline_path.exists() {
            if !self.config.auto_update {
                return Err(E2eError::BaselineNotFound(baseline_path.display().to_string()));
            }
            info!("Creating baseline for '{}' (auto-update enabled)", name);
            std::fs::copy(actual, &baseline_path)?;
            return Ok(VisualDiff {
                name: name.to_string(),
                matches: true,
                diff_percent: 0.0,
                diff_pixels: 0,
                total_pixels: 0,
                diff_image_path: None,
                baseline_created: true,
            });
        }

        let actual_img = image::open(actual)?;
        if hash_file(actual)? == hash_file(&baseline_path)? {
            debug!("'{}' matches its baseline byte for byte", name);
            let (w, h) = actual_img.dimensions();
            return Ok(VisualDiff {
                name: name.to_string(),
                matches: true,
                diff_percent: 0.0,
                diff_pixels: 0,
                total_pixels: w as u64 * h as u64,
                diff_image_path: None,
                baseline_created: false,
            });
        }

        let baseline_img = image::open(&baseline_path)?;
        if actual_img.dimensions() != baseline_img.dimensions() {
            warn!(
                "'{}' dimensions differ: actual {:?} vs baseline {:?}",
                name,
                actual_img.dimensions(),
                baseline_img.dimensions()
            );
        }

        let diff = compare_images(&actual_img.to_rgba8(), &baseline_img.to_rgba8());
        let diff_percent = diff.percent();
        let matches = diff_percent <= threshold;

        let diff_image_path = if diff.diff_pixels > 0 {
            let path = self.config.diff_dir.join(format!("{}-diff.png", name));
            diff.image.save(&path)?;
            Some(path)
        } else {
            None
        };

        if !matches {
            warn!(
                "Visual regression in '{}': {:.2}% pixels differ (threshold: {:.2}%)",
                name, diff_percent, threshold
            );
        }

        Ok(VisualDiff {
            name: name.to_string(),
            matches,
            diff_percent,
            diff_pixels: diff.diff_pixels,
            total_pixels: diff.total_pixels,
            diff_image_path,
            baseline_created: false,
        })
    }

    /// Replace the baseline called `name` with the capture at `actual`
    pub fn update_baseline(&self, name: &str, actual: &Path) -> E2eResult<()> {
        if !actual.exists() {
            return Err(E2eError::VisualRegression(format!(
                "cannot update baseline: capture not found: {}",
                actual.display()
            )));
        }
        std::fs::copy(actual, self.baseline_path(name))?;
        info!("Updated baseline for '{}'", name);
        Ok(())
    }

    pub fn list_baselines(&self) -> E2eResult<Vec<String>> {
        let mut baselines = Vec::new();
        for entry in std::fs::read_dir(&self.config.baseline_dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "png").unwrap_or(false) {
                if let Some(name) = path.file_stem() {
                    baselines.push(name.to_string_lossy().to_string());
                }
            }
        }
        baselines.sort();
        Ok(baselines)
    }

    /// Remove diff images from earlier runs
    pub fn clean_diffs(&self) -> E2eResult<usize> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.config.diff_dir)? {
            std::fs::remove_file(entry?.path())?;
            removed += 1;
        }
        Ok(removed)
    }
}

fn hash_file(path: &Path) -> E2eResult<String> {
    let data = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&data)))
}
