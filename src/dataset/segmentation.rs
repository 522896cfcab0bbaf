use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use image::GrayImage;
use tracing::{debug, warn};

use crate::dataset::sample::Sample;
use crate::error::{EvalError, Result};
use crate::math::tensor::Tensor;
use crate::network::segmentation::NetConfig;

pub const IMAGES_DIR: &str = "images";
pub const MASKS_DIR: &str = "masks";

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetOptions {
    /// 1 loads images as grayscale, 3 as RGB.
    pub in_channels: usize,
    /// 1 reads masks as foreground/background; more reads the mask value as
    /// a class index and one-hot encodes it.
    pub n_classes: usize,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        DatasetOptions { in_channels: 1, n_classes: 1 }
    }
}

impl From<&NetConfig> for DatasetOptions {
    /// Loads samples in the shape the model consumes and produces.
    fn from(config: &NetConfig) -> Self {
        DatasetOptions { in_channels: config.in_channels, n_classes: config.n_classes }
    }
}

/// Image/mask pairs under `<root>/images` and `<root>/masks`, matched by
/// file name and served in file-name order. Evaluation mode only: samples are
/// decoded as-is with no augmentation.
#[derive(Debug, Clone)]
pub struct SegmentationDataset {
    pairs: Vec<(PathBuf, PathBuf)>,
    options: DatasetOptions,
}

impl SegmentationDataset {
    pub fn open(root: impl AsRef<Path>, options: DatasetOptions) -> Result<SegmentationDataset> {
        let root = root.as_ref().to_path_buf();
        if !matches!(options.in_channels, 1 | 3) {
            return Err(EvalError::InvalidConfig(format!(
                "images can be loaded with 1 or 3 channels, not {}",
                options.in_channels
            )));
        }
        if options.n_classes == 0 {
            return Err(EvalError::InvalidConfig("n_classes must be at least 1".into()));
        }

        let images = list_images(&root.join(IMAGES_DIR))?;
        let mask_dir = root.join(MASKS_DIR);
        let masks: BTreeSet<PathBuf> = list_images(&mask_dir)?.into_iter().collect();

        let mut pairs = Vec::with_capacity(images.len());
        for image in images {
            let expected = match image.file_name() {
                Some(name) => mask_dir.join(name),
                None => continue,
            };
            if !masks.contains(&expected) {
                return Err(EvalError::MissingMask { image, expected });
            }
            pairs.push((image, expected));
        }

        let unused = masks.len() - pairs.len();
        if unused > 0 {
            warn!(root = %root.display(), unused, "masks without a matching image are ignored");
        }
        debug!(root = %root.display(), samples = pairs.len(), "opened segmentation dataset");

        Ok(SegmentationDataset { pairs, options })
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<Sample> {
        let (image_path, mask_path) = self.pairs.get(index).ok_or_else(|| {
            EvalError::shape("SegmentationDataset::get", &[self.pairs.len()], &[index])
        })?;

        let image = image::open(image_path).map_err(|source| EvalError::Image {
            path: image_path.clone(),
            source,
        })?;
        let mask = image::open(mask_path)
            .map_err(|source| EvalError::Image { path: mask_path.clone(), source })?
            .to_luma8();

        let (width, height) = (image.width() as usize, image.height() as usize);
        if (mask.width() as usize, mask.height() as usize) != (width, height) {
            return Err(EvalError::shape(
                "mask size",
                &[height, width],
                &[mask.height() as usize, mask.width() as usize],
            ));
        }

        let input = match self.options.in_channels {
            1 => chw_from_interleaved(image.to_luma8().as_raw(), 1, height, width)?,
            _ => chw_from_interleaved(image.to_rgb8().as_raw(), 3, height, width)?,
        };
        let target = encode_mask(&mask, mask_path, self.options.n_classes)?;
        let name = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Sample { input, target, name })
    }
}

/// Image files in `dir`, sorted by file name.
fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| EvalError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| EvalError::io(dir, e))?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if path.is_file() && is_image {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// HWC bytes → CHW tensor normalized to [0, 1].
fn chw_from_interleaved(raw: &[u8], channels: usize, height: usize, width: usize) -> Result<Tensor> {
    let plane = height * width;
    let mut data = vec![0.0; channels * plane];
    for (i, px) in raw.chunks_exact(channels).enumerate() {
        for (c, &v) in px.iter().enumerate() {
            data[c * plane + i] = v as f64 / 255.0;
        }
    }
    Tensor::from_vec(&[channels, height, width], data)
}

fn encode_mask(mask: &GrayImage, path: &Path, n_classes: usize) -> Result<Tensor> {
    let (height, width) = (mask.height() as usize, mask.width() as usize);
    let plane = height * width;
    let mut data = vec![0.0; n_classes * plane];
    for (i, px) in mask.pixels().enumerate() {
        let v = px.0[0];
        if n_classes == 1 {
            data[i] = if v > 127 { 1.0 } else { 0.0 };
        } else {
            let class = v as usize;
            if class >= n_classes {
                return Err(EvalError::InvalidLabel {
                    path: path.to_path_buf(),
                    value: v,
                    n_classes,
                });
            }
            data[class * plane + i] = 1.0;
        }
    }
    Tensor::from_vec(&[n_classes, height, width], data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    fn write_gray(path: &Path, w: u32, h: u32, f: impl Fn(u32, u32) -> u8) {
        GrayImage::from_fn(w, h, |x, y| Luma([f(x, y)])).save(path).unwrap();
    }

    fn layout() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(IMAGES_DIR)).unwrap();
        fs::create_dir_all(dir.path().join(MASKS_DIR)).unwrap();
        dir
    }

    #[test]
    fn pairs_are_sorted_by_name() {
        let dir = layout();
        for name in ["b.png", "a.png", "c.png"] {
            write_gray(&dir.path().join(IMAGES_DIR).join(name), 2, 2, |_, _| 0);
            write_gray(&dir.path().join(MASKS_DIR).join(name), 2, 2, |_, _| 0);
        }
        let ds = SegmentationDataset::open(dir.path(), DatasetOptions::default()).unwrap();
        let names: Vec<String> = (0..ds.len()).map(|i| ds.get(i).unwrap().name).collect();
        assert_eq!(names, vec!["a.png", "b.png", "c.png"]);
    }

    #[test]
    fn binary_mask_threshold() {
        let dir = layout();
        write_gray(&dir.path().join(IMAGES_DIR).join("x.png"), 3, 1, |x, _| (x * 100) as u8);
        write_gray(&dir.path().join(MASKS_DIR).join("x.png"), 3, 1, |x, _| [0, 127, 128][x as usize]);
        let ds = SegmentationDataset::open(dir.path(), DatasetOptions::default()).unwrap();
        let s = ds.get(0).unwrap();
        assert_eq!(s.target.data(), &[0.0, 0.0, 1.0]);
        assert_eq!(s.input.dims(), &[1, 1, 3]);
        assert_eq!(s.input.data()[1], 100.0 / 255.0);
    }

    #[test]
    fn multiclass_mask_is_one_hot() {
        let dir = layout();
        write_gray(&dir.path().join(IMAGES_DIR).join("x.png"), 3, 1, |_, _| 0);
        write_gray(&dir.path().join(MASKS_DIR).join("x.png"), 3, 1, |x, _| x as u8);
        let opts = DatasetOptions { in_channels: 1, n_classes: 3 };
        let s = SegmentationDataset::open(dir.path(), opts).unwrap().get(0).unwrap();
        assert_eq!(s.target.dims(), &[3, 1, 3]);
        assert_eq!(
            s.target.data(),
            &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]
        );

        let opts = DatasetOptions { in_channels: 1, n_classes: 2 };
        let err = SegmentationDataset::open(dir.path(), opts).unwrap().get(0);
        assert!(matches!(err, Err(EvalError::InvalidLabel { value: 2, .. })));
    }

    #[test]
    fn rgb_input_is_channel_first() {
        let dir = layout();
        RgbImage::from_fn(2, 1, |x, _| if x == 0 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) })
            .save(dir.path().join(IMAGES_DIR).join("x.png"))
            .unwrap();
        write_gray(&dir.path().join(MASKS_DIR).join("x.png"), 2, 1, |_, _| 0);
        let opts = DatasetOptions { in_channels: 3, n_classes: 1 };
        let s = SegmentationDataset::open(dir.path(), opts).unwrap().get(0).unwrap();
        assert_eq!(s.input.data(), &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn options_follow_model_config() {
        let config = NetConfig { in_channels: 3, ..NetConfig::with_classes(2) };
        assert_eq!(
            DatasetOptions::from(&config),
            DatasetOptions { in_channels: 3, n_classes: 2 }
        );
    }

    #[test]
    fn missing_mask_is_an_error() {
        let dir = layout();
        write_gray(&dir.path().join(IMAGES_DIR).join("x.png"), 2, 2, |_, _| 0);
        assert!(matches!(
            SegmentationDataset::open(dir.path(), DatasetOptions::default()),
            Err(EvalError::MissingMask { .. })
        ));
    }

    #[test]
    fn mismatched_mask_size_is_an_error() {
        let dir = layout();
        write_gray(&dir.path().join(IMAGES_DIR).join("x.png"), 2, 2, |_, _| 0);
        write_gray(&dir.path().join(MASKS_DIR).join("x.png"), 3, 2, |_, _| 0);
        let ds = SegmentationDataset::open(dir.path(), DatasetOptions::default()).unwrap();
        assert!(matches!(ds.get(0), Err(EvalError::ShapeMismatch { .. })));
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SegmentationDataset::open(dir.path().join("nope"), DatasetOptions::default()),
            Err(EvalError::Io { .. })
        ));
    }
}
