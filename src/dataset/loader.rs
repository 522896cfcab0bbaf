use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tracing::debug;

use crate::dataset::sample::{collate, Batch};
use crate::dataset::segmentation::SegmentationDataset;
use crate::error::{EvalError, Result};

/// Batches each worker may have in flight ahead of the consumer.
const PREFETCH_PER_WORKER: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    pub batch_size: usize,
    /// 0 loads on the calling thread.
    pub num_workers: usize,
    pub shuffle: bool,
    /// Seeds the shuffle; unused when `shuffle` is false.
    pub seed: u64,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        LoaderOptions { batch_size: 1, num_workers: 0, shuffle: false, seed: 0 }
    }
}

/// Splits a dataset into batches and yields them in a fixed order.
///
/// The last batch may be short. Worker threads only change *when* batches
/// are decoded, never the order in which they are delivered.
#[derive(Debug, Clone)]
pub struct DataLoader {
    dataset: Arc<SegmentationDataset>,
    options: LoaderOptions,
    order: Arc<Vec<usize>>,
}

impl DataLoader {
    pub fn new(dataset: Arc<SegmentationDataset>, options: LoaderOptions) -> Result<DataLoader> {
        if options.batch_size == 0 {
            return Err(EvalError::InvalidConfig("batch size must be at least 1".into()));
        }
        let mut order: Vec<usize> = (0..dataset.len()).collect();
        if options.shuffle {
            order.shuffle(&mut StdRng::seed_from_u64(options.seed));
        }
        Ok(DataLoader { dataset, options, order: Arc::new(order) })
    }

    /// Number of batches per pass.
    pub fn len(&self) -> usize {
        self.order.len().div_ceil(self.options.batch_size)
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of samples per pass.
    pub fn num_samples(&self) -> usize {
        self.order.len()
    }

    pub fn iter(&self) -> BatchIter {
        let total = self.len();
        let kind = if self.options.num_workers == 0 || total == 0 {
            IterKind::Inline
        } else {
            self.spawn_workers(total)
        };
        BatchIter { loader: self.clone(), kind, next: 0, total }
    }

    fn load(&self, batch_index: usize) -> Result<Batch> {
        load_batch(&self.dataset, &self.order, self.options.batch_size, batch_index)
    }

    fn spawn_workers(&self, total: usize) -> IterKind {
        let workers = self.options.num_workers.min(total);
        let window = workers * PREFETCH_PER_WORKER;
        let (job_tx, job_rx) = unbounded::<usize>();
        let (tx, rx) = bounded(window);
        let handles = (0..workers)
            .map(|worker| {
                let jobs = job_rx.clone();
                let tx = tx.clone();
                let dataset = self.dataset.clone();
                let order = self.order.clone();
                let batch_size = self.options.batch_size;
                thread::spawn(move || {
                    while let Ok(i) = jobs.recv() {
                        let batch = load_batch(&dataset, &order, batch_size, i);
                        if tx.send((i, batch)).is_err() {
                            break;
                        }
                    }
                    debug!(worker, "loader worker finished");
                })
            })
            .collect();

        let mut kind = IterKind::Workers {
            jobs: Some(job_tx),
            issued: 0,
            window,
            rx: Some(rx),
            pending: BTreeMap::new(),
            handles,
        };
        kind.issue_until(window, total);
        kind
    }
}

fn load_batch(
    dataset: &SegmentationDataset,
    order: &[usize],
    batch_size: usize,
    batch_index: usize,
) -> Result<Batch> {
    let start = batch_index * batch_size;
    let end = (start + batch_size).min(order.len());
    let samples = order[start..end]
        .iter()
        .map(|&i| dataset.get(i))
        .collect::<Result<Vec<_>>>()?;
    collate(samples)
}

enum IterKind {
    Inline,
    Workers {
        /// Dropped once every batch index has been handed out.
        jobs: Option<Sender<usize>>,
        /// Batch indices handed to workers so far.
        issued: usize,
        /// Most batches outstanding beyond the one being waited for.
        window: usize,
        rx: Option<Receiver<(usize, Result<Batch>)>>,
        /// Batches that arrived ahead of their turn; never more than `window`.
        pending: BTreeMap<usize, Result<Batch>>,
        handles: Vec<JoinHandle<()>>,
    },
}

impl IterKind {
    /// Hands out batch indices below `limit` (capped at `total`) that have
    /// not been issued yet.
    fn issue_until(&mut self, limit: usize, total: usize) {
        if let IterKind::Workers { jobs, issued, .. } = self {
            let limit = limit.min(total);
            while *issued < limit {
                let sent = jobs.as_ref().map_or(false, |tx| tx.send(*issued).is_ok());
                if !sent {
                    break;
                }
                *issued += 1;
            }
            if *issued >= total {
                jobs.take();
            }
        }
    }
}

pub struct BatchIter {
    loader: DataLoader,
    kind: IterKind,
    next: usize,
    total: usize,
}

impl Iterator for BatchIter {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total {
            return None;
        }
        let wanted = self.next;
        self.next += 1;

        if let IterKind::Workers { window, .. } = self.kind {
            // keep at most `window` batches queued behind the one being waited for
            self.kind.issue_until(wanted + 1 + window, self.total);
        }

        match &mut self.kind {
            IterKind::Inline => Some(self.loader.load(wanted)),
            IterKind::Workers { rx, pending, .. } => {
                if let Some(batch) = pending.remove(&wanted) {
                    return Some(batch);
                }
                let rx = rx.as_ref()?;
                loop {
                    match rx.recv() {
                        Ok((i, batch)) if i == wanted => return Some(batch),
                        Ok((i, batch)) => {
                            pending.insert(i, batch);
                        }
                        Err(_) => return Some(Err(EvalError::WorkerDisconnected { batch: wanted })),
                    }
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for BatchIter {}

impl Drop for BatchIter {
    fn drop(&mut self) {
        if let IterKind::Workers { jobs, rx, handles, .. } = &mut self.kind {
            // Closing both channels ends every worker's `recv` or `send`.
            drop(jobs.take());
            drop(rx.take());
            for handle in handles.drain(..) {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::segmentation::{DatasetOptions, IMAGES_DIR, MASKS_DIR};
    use image::{GrayImage, Luma};

    fn dataset(n: usize) -> (tempfile::TempDir, Arc<SegmentationDataset>) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(IMAGES_DIR)).unwrap();
        std::fs::create_dir_all(dir.path().join(MASKS_DIR)).unwrap();
        for i in 0..n {
            let name = format!("{i:03}.png");
            GrayImage::from_pixel(2, 2, Luma([i as u8]))
                .save(dir.path().join(IMAGES_DIR).join(&name))
                .unwrap();
            GrayImage::from_pixel(2, 2, Luma([0]))
                .save(dir.path().join(MASKS_DIR).join(&name))
                .unwrap();
        }
        let ds = SegmentationDataset::open(dir.path(), DatasetOptions::default()).unwrap();
        (dir, Arc::new(ds))
    }

    fn names(loader: &DataLoader) -> Vec<String> {
        loader
            .iter()
            .flat_map(|b| b.unwrap().names)
            .collect()
    }

    #[test]
    fn len_counts_short_last_batch() {
        let (_dir, ds) = dataset(5);
        let opts = LoaderOptions { batch_size: 2, ..LoaderOptions::default() };
        let loader = DataLoader::new(ds, opts).unwrap();
        assert_eq!(loader.len(), 3);
        let sizes: Vec<usize> = loader.iter().map(|b| b.unwrap().len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn workers_preserve_order() {
        let (_dir, ds) = dataset(9);
        let inline = DataLoader::new(ds.clone(), LoaderOptions { batch_size: 2, ..LoaderOptions::default() }).unwrap();
        let threaded = DataLoader::new(
            ds,
            LoaderOptions { batch_size: 2, num_workers: 4, ..LoaderOptions::default() },
        )
        .unwrap();
        assert_eq!(names(&inline), names(&threaded));
        assert_eq!(names(&threaded)[0], "000.png");
    }

    #[test]
    fn workers_stay_within_prefetch_window() {
        let (_dir, ds) = dataset(20);
        let opts = LoaderOptions { num_workers: 2, ..LoaderOptions::default() };
        let loader = DataLoader::new(ds, opts).unwrap();
        let window = 2 * PREFETCH_PER_WORKER;
        let mut it = loader.iter();
        for step in 0..5 {
            assert!(it.next().unwrap().is_ok());
            match &it.kind {
                IterKind::Workers { issued, pending, .. } => {
                    assert_eq!(*issued, step + 1 + window);
                    assert!(pending.len() <= window);
                }
                IterKind::Inline => panic!("expected worker threads"),
            }
        }
        assert_eq!(it.count(), 15);
    }

    #[test]
    fn shuffle_is_seeded() {
        let (_dir, ds) = dataset(8);
        let opts = LoaderOptions { shuffle: true, seed: 42, ..LoaderOptions::default() };
        let a = DataLoader::new(ds.clone(), opts).unwrap();
        let b = DataLoader::new(ds, opts).unwrap();
        assert_eq!(names(&a), names(&b));
    }

    #[test]
    fn empty_dataset_yields_nothing() {
        let (_dir, ds) = dataset(0);
        let opts = LoaderOptions { num_workers: 2, ..LoaderOptions::default() };
        let loader = DataLoader::new(ds, opts).unwrap();
        assert_eq!(loader.len(), 0);
        assert_eq!(loader.iter().count(), 0);
    }

    #[test]
    fn dropping_early_stops_workers() {
        let (_dir, ds) = dataset(12);
        let opts = LoaderOptions { num_workers: 3, ..LoaderOptions::default() };
        let loader = DataLoader::new(ds, opts).unwrap();
        let mut it = loader.iter();
        assert!(it.next().unwrap().is_ok());
        drop(it);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let (_dir, ds) = dataset(1);
        let opts = LoaderOptions { batch_size: 0, ..LoaderOptions::default() };
        assert!(DataLoader::new(ds, opts).is_err());
    }
}
