//! At-most-once storage of food-recognition responses
//!
//! Responses live at `{root}/{angle}/{dish}/{condition}.json`. A response is requested
//! only when that file does not exist yet; an existing file is never refreshed, whatever
//! its age. The service itself is a black box behind [`FoodAnalysisService`].

use crate::error::EvaluationError;
use crate::io::tables::ensure_parent_dir;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Image extensions picked up by [`ResultStore::collect`]
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// External image-analysis service
pub trait FoodAnalysisService {
    /// Analyze raw image bytes and return the JSON response
    fn analyze(&self, image: &[u8]) -> Result<serde_json::Value, EvaluationError>;
}

/// What happened to one image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Output already existed; the service was not called
    Skipped,
    /// Service called and response written
    Saved,
    /// Image unreadable or service call failed; nothing written
    Failed,
}

/// Counts from a [`ResultStore::collect`] run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionSummary {
    /// Images whose output already existed
    pub skipped: usize,
    /// Images analyzed and saved
    pub saved: usize,
    /// Images that could not be analyzed
    pub failed: usize,
}

/// Directory of stored responses
#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    /// Create a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Output path for an (angle, dish, condition) response
    pub fn path_for(&self, angle: &str, dish: &str, condition: &str) -> PathBuf {
        self.root
            .join(angle)
            .join(dish)
            .join(format!("{}.json", condition))
    }

    /// Analyze one image unless its response is already stored
    ///
    /// Service and image-read failures are logged and reported as
    /// `ProcessOutcome::Failed`; only a failure to write the response is an error.
    pub fn process_image<S: FoodAnalysisService + ?Sized>(
        &self,
        service: &S,
        image_path: &Path,
        angle: &str,
        dish: &str,
        condition: &str,
    ) -> Result<ProcessOutcome, EvaluationError> {
        let output = self.path_for(angle, dish, condition);
        if output.exists() {
            log::debug!("Skipping {}, response already stored", image_path.display());
            return Ok(ProcessOutcome::Skipped);
        }

        let bytes = match std::fs::read(image_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Cannot read image {}: {}", image_path.display(), e);
                return Ok(ProcessOutcome::Failed);
            }
        };

        let response = match service.analyze(&bytes) {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Failed to analyze {}: {}", image_path.display(), e);
                return Ok(ProcessOutcome::Failed);
            }
        };

        write_pretty_json(&response, &output)?;
        log::info!("Saved response to {}", output.display());
        Ok(ProcessOutcome::Saved)
    }

    /// Analyze every image under `{images_root}/{angle}/{dish}/` for the given angles
    ///
    /// The condition of an image is its file stem. Missing angle directories are
    /// skipped with a warning.
    pub fn collect<S: FoodAnalysisService + ?Sized>(
        &self,
        service: &S,
        images_root: &Path,
        angles: &[String],
    ) -> Result<CollectionSummary, EvaluationError> {
        let mut summary = CollectionSummary::default();

        for angle in angles {
            let angle_dir = images_root.join(angle);
            if !angle_dir.is_dir() {
                log::warn!("Image directory {} not found", angle_dir.display());
                continue;
            }

            let walker = WalkDir::new(&angle_dir)
                .min_depth(2)
                .max_depth(2)
                .sort_by_file_name();
            for entry in walker {
                let entry = entry?;
                if !entry.file_type().is_file() || !has_image_extension(entry.path()) {
                    continue;
                }
                let path = entry.path();
                let (Some(dish), Some(condition)) = (
                    path.parent()
                        .and_then(|p| p.file_name())
                        .and_then(|n| n.to_str()),
                    path.file_stem().and_then(|s| s.to_str()),
                ) else {
                    log::warn!("Skipping non-UTF-8 image path {}", path.display());
                    continue;
                };

                match self.process_image(service, path, angle, dish, condition)? {
                    ProcessOutcome::Skipped => summary.skipped += 1,
                    ProcessOutcome::Saved => summary.saved += 1,
                    ProcessOutcome::Failed => summary.failed += 1,
                }
            }
        }

        log::info!(
            "Collection finished: {} saved, {} skipped, {} failed",
            summary.saved,
            summary.skipped,
            summary.failed
        );
        Ok(summary)
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Write JSON with four-space indentation
fn write_pretty_json(value: &serde_json::Value, path: &Path) -> Result<(), EvaluationError> {
    ensure_parent_dir(path)?;
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer).map_err(|e| EvaluationError::MalformedData {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    std::fs::write(path, buffer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingService {
        calls: Cell<usize>,
        fail: bool,
    }

    impl CountingService {
        fn new(fail: bool) -> Self {
            Self {
                calls: Cell::new(0),
                fail,
            }
        }
    }

    impl FoodAnalysisService for CountingService {
        fn analyze(&self, image: &[u8]) -> Result<serde_json::Value, EvaluationError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(EvaluationError::Io("service unavailable".to_string()));
            }
            Ok(serde_json::json!({"items": [], "bytes": image.len()}))
        }
    }

    #[test]
    fn test_path_for() {
        let store = ResultStore::new("/data/results");
        assert_eq!(
            store.path_for("overhead", "dish_1", "rgb"),
            PathBuf::from("/data/results/overhead/dish_1/rgb.json")
        );
    }

    #[test]
    fn test_existing_output_is_never_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("rgb.png");
        std::fs::write(&image, b"png bytes").unwrap();

        let store = ResultStore::new(dir.path().join("results"));
        let service = CountingService::new(false);

        let first = store
            .process_image(&service, &image, "overhead", "dish_1", "rgb")
            .unwrap();
        assert_eq!(first, ProcessOutcome::Saved);
        let stored = std::fs::read_to_string(store.path_for("overhead", "dish_1", "rgb")).unwrap();
        assert!(stored.contains("    \"bytes\": 9"));

        let second = store
            .process_image(&service, &image, "overhead", "dish_1", "rgb")
            .unwrap();
        assert_eq!(second, ProcessOutcome::Skipped);
        assert_eq!(service.calls.get(), 1);
    }

    #[test]
    fn test_service_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("rgb.jpg");
        std::fs::write(&image, b"jpg").unwrap();

        let store = ResultStore::new(dir.path().join("results"));
        let service = CountingService::new(true);
        let outcome = store
            .process_image(&service, &image, "side_angle", "dish_2", "rgb")
            .unwrap();
        assert_eq!(outcome, ProcessOutcome::Failed);
        assert!(!store.path_for("side_angle", "dish_2", "rgb").exists());
    }

    #[test]
    fn test_collect_walks_images() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        for (angle, dish, file) in [
            ("overhead", "dish_1", "rgb.png"),
            ("overhead", "dish_1", "rgb_contrast_plus.JPG"),
            ("overhead", "dish_1", "notes.txt"),
            ("side_angle", "dish_1", "rgb.jpeg"),
        ] {
            let d = images.join(angle).join(dish);
            std::fs::create_dir_all(&d).unwrap();
            std::fs::write(d.join(file), b"img").unwrap();
        }

        let store = ResultStore::new(dir.path().join("results"));
        let service = CountingService::new(false);
        let angles = vec!["overhead".to_string(), "side_angle".to_string(), "top".to_string()];

        let summary = store.collect(&service, &images, &angles).unwrap();
        assert_eq!(summary.saved, 3);
        assert_eq!(summary.failed, 0);
        assert!(store.path_for("overhead", "dish_1", "rgb_contrast_plus").exists());

        let again = store.collect(&service, &images, &angles).unwrap();
        assert_eq!(again.saved, 0);
        assert_eq!(again.skipped, 3);
        assert_eq!(service.calls.get(), 3);
    }
}
