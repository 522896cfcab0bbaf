use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::math::tensor::TensorRecord;

/// Named parameter tensors of a model, ordered by name.
///
/// On disk this is a JSON object mapping each name to `{ shape, data }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateDict {
    entries: BTreeMap<String, TensorRecord>,
}

impl StateDict {
    pub fn insert(&mut self, key: String, record: TensorRecord) {
        self.entries.insert(key, record);
    }

    pub fn get(&self, key: &str) -> Option<&TensorRecord> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut TensorRecord> {
        self.entries.get_mut(key)
    }

    /// Looks up `key` and checks that its declared shape and payload both
    /// match `shape`.
    pub fn require(&self, key: &str, shape: &[usize]) -> Result<&TensorRecord> {
        let record = self
            .entries
            .get(key)
            .ok_or_else(|| EvalError::StateDict(format!("missing key `{key}`")))?;
        let numel: usize = shape.iter().product();
        if record.shape != shape || record.data.len() != numel {
            return Err(EvalError::StateDict(format!(
                "size mismatch for `{key}`: checkpoint has shape {:?} ({} values), model expects {:?}",
                record.shape,
                record.data.len(),
                shape
            )));
        }
        Ok(record)
    }

    /// Serializes the state dict to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| EvalError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self).map_err(|source| EvalError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        writer.flush().map_err(|e| EvalError::io(path, e))
    }

    /// Deserializes a state dict previously written by `save`.
    pub fn load(path: &Path) -> Result<StateDict> {
        let file = File::open(path).map_err(|e| EvalError::io(path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| EvalError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_reports_missing_and_mismatched() {
        let mut dict = StateDict::default();
        dict.insert("w".into(), TensorRecord { shape: vec![2], data: vec![1.0, 2.0] });

        assert!(dict.require("w", &[2]).is_ok());
        assert!(matches!(dict.require("w", &[3]), Err(EvalError::StateDict(_))));
        assert!(matches!(dict.require("b", &[2]), Err(EvalError::StateDict(_))));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_statedict.pth");
        let mut dict = StateDict::default();
        dict.insert("layers.0.bias".into(), TensorRecord { shape: vec![1], data: vec![0.25] });
        dict.save(&path).unwrap();
        assert_eq!(StateDict::load(&path).unwrap(), dict);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn save_reports_failed_flush() {
        // /dev/full accepts the open and fails the first real write
        let mut dict = StateDict::default();
        dict.insert("w".into(), TensorRecord { shape: vec![1], data: vec![1.0] });
        assert!(matches!(
            dict.save(Path::new("/dev/full")),
            Err(EvalError::Io { .. })
        ));
    }

    #[test]
    fn load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_statedict.pth");
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(StateDict::load(&path), Err(EvalError::Json { .. })));
    }
}
