//! SafeTensors weight loading utilities.
//!
//! The parameter bundle stores every tensor under its training-time name
//! (`embedding.weight`, `encoder.gru.weight_ih_l0_reverse`, ...). Layers ask
//! for tensors by name and expected shape; anything missing or mis-shaped is
//! reported as [`RejoinderError::ModelLoad`] naming the tensor.
//!
//! # Example
//!
//! ```ignore
//! use rejoinder_core::model::WeightLoader;
//!
//! let loader = WeightLoader::from_dir("/path/to/bundle".as_ref(), &Device::Cpu)?;
//! let embedding = loader.tensor("embedding.weight", &[vocab_size, hidden])?;
//! ```

use crate::error::{RejoinderError, Result};
use candle_core::{DType, Device, Tensor};
use safetensors::SafeTensors;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Weight loader for SafeTensors format.
pub struct WeightLoader {
    /// Loaded tensors indexed by name.
    tensors: HashMap<String, Tensor>,
}

impl WeightLoader {
    /// Create a new weight loader from a bundle directory.
    ///
    /// Loads all .safetensors files in the directory.
    pub fn from_dir(dir: &Path, device: &Device) -> Result<Self> {
        let mut tensors = HashMap::new();

        let mut safetensor_files: Vec<PathBuf> = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map_or(false, |e| e == "safetensors") {
                safetensor_files.push(path);
            }
        }

        // Sort for deterministic loading order
        safetensor_files.sort();

        if safetensor_files.is_empty() {
            return Err(RejoinderError::ModelLoad(format!(
                "no .safetensors files found in {}",
                dir.display()
            )));
        }

        for path in &safetensor_files {
            let file_tensors = Self::load_safetensors_file(path, device)?;
            debug!(file = %path.display(), tensors = file_tensors.len(), "loaded weights");
            tensors.extend(file_tensors);
        }

        Ok(Self { tensors })
    }

    /// Create a weight loader from tensors already in memory.
    pub fn from_tensors(tensors: HashMap<String, Tensor>) -> Self {
        Self { tensors }
    }

    /// Load tensors from a single safetensors file.
    fn load_safetensors_file(path: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
        let data = fs::read(path)?;
        let safetensors = SafeTensors::deserialize(&data).map_err(|e| {
            RejoinderError::ModelLoad(format!("failed to deserialize {}: {}", path.display(), e))
        })?;

        let mut tensors = HashMap::new();

        for (name, view) in safetensors.tensors() {
            let tensor = Self::view_to_tensor(&name, &view, device)?;
            tensors.insert(name.to_string(), tensor);
        }

        Ok(tensors)
    }

    /// Convert a SafeTensors view to an F32 Candle tensor.
    fn view_to_tensor(
        name: &str,
        view: &safetensors::tensor::TensorView,
        device: &Device,
    ) -> Result<Tensor> {
        let shape: Vec<usize> = view.shape().to_vec();
        let data = view.data();

        let tensor = match view.dtype() {
            safetensors::Dtype::F32 => {
                let values: Vec<f32> = bytemuck::pod_collect_to_vec(data);
                Tensor::from_vec(values, shape.as_slice(), device)?
            }
            safetensors::Dtype::F16 => {
                warn!(tensor = name, "up-casting f16 weights to f32");
                let values: Vec<half::f16> = bytemuck::pod_collect_to_vec(data);
                Tensor::from_vec(values, shape.as_slice(), device)?.to_dtype(DType::F32)?
            }
            safetensors::Dtype::BF16 => {
                warn!(tensor = name, "up-casting bf16 weights to f32");
                let values: Vec<half::bf16> = bytemuck::pod_collect_to_vec(data);
                Tensor::from_vec(values, shape.as_slice(), device)?.to_dtype(DType::F32)?
            }
            other => {
                return Err(RejoinderError::ModelLoad(format!(
                    "{}: unsupported dtype {:?}",
                    name, other
                )));
            }
        };

        Ok(tensor)
    }

    /// Get a tensor by name.
    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    /// Get a tensor by name and check its shape.
    pub fn tensor(&self, name: &str, shape: &[usize]) -> Result<Tensor> {
        let tensor = self
            .tensors
            .get(name)
            .ok_or_else(|| RejoinderError::ModelLoad(format!("missing tensor {}", name)))?;
        if tensor.dims() != shape {
            return Err(RejoinderError::ModelLoad(format!(
                "{}: expected shape {:?}, got {:?}",
                name,
                shape,
                tensor.dims()
            )));
        }
        Ok(tensor.to_dtype(DType::F32)?)
    }

    /// Get the number of loaded tensors.
    pub fn num_tensors(&self) -> usize {
        self.tensors.len()
    }

    /// Write every tensor to a single safetensors file.
    pub fn save(&self, path: &Path) -> Result<()> {
        candle_core::safetensors::save(&self.tensors, path)?;
        Ok(())
    }
}

impl std::fmt::Debug for WeightLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightLoader")
            .field("tensors", &self.tensors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loader_from_nonexistent_dir() {
        let result = WeightLoader::from_dir(Path::new("/nonexistent/path"), &Device::Cpu);
        assert!(result.is_err());
    }

    #[test]
    fn loader_empty_dir() {
        let temp_dir = std::env::temp_dir().join("rejoinder_test_empty");
        let _ = fs::create_dir_all(&temp_dir);

        let result = WeightLoader::from_dir(&temp_dir, &Device::Cpu);
        assert!(matches!(result, Err(RejoinderError::ModelLoad(_))));

        let _ = fs::remove_dir_all(&temp_dir);
    }

    #[test]
    fn missing_tensor_is_named() {
        let loader = WeightLoader::from_tensors(HashMap::new());
        match loader.tensor("decoder.out.bias", &[5]) {
            Err(RejoinderError::ModelLoad(msg)) => assert!(msg.contains("decoder.out.bias")),
            other => panic!("expected ModelLoad, got {:?}", other),
        }
    }

    #[test]
    fn shape_mismatch_is_named() {
        let mut tensors = HashMap::new();
        tensors.insert(
            "embedding.weight".to_string(),
            Tensor::zeros((4, 3), DType::F32, &Device::Cpu).unwrap(),
        );
        let loader = WeightLoader::from_tensors(tensors);
        match loader.tensor("embedding.weight", &[5, 3]) {
            Err(RejoinderError::ModelLoad(msg)) => {
                assert!(msg.contains("embedding.weight"));
                assert!(msg.contains("[5, 3]"));
            }
            other => panic!("expected ModelLoad, got {:?}", other),
        }
        assert!(loader.tensor("embedding.weight", &[4, 3]).is_ok());
    }

    #[test]
    fn save_and_reload_file() {
        let temp_dir = std::env::temp_dir().join("rejoinder_test_loader");
        let _ = fs::create_dir_all(&temp_dir);
        let path = temp_dir.join("weights.safetensors");

        let mut tensors = HashMap::new();
        tensors.insert(
            "decoder.out.bias".to_string(),
            Tensor::new(&[0.5f32, -1.0, 2.0], &Device::Cpu).unwrap(),
        );
        tensors.insert(
            "half.weight".to_string(),
            Tensor::new(&[1.0f32, 2.0], &Device::Cpu)
                .unwrap()
                .to_dtype(DType::F16)
                .unwrap(),
        );
        WeightLoader::from_tensors(tensors).save(&path).unwrap();

        let loader = WeightLoader::from_dir(&temp_dir, &Device::Cpu).unwrap();
        assert_eq!(loader.num_tensors(), 2);
        let bias: Vec<f32> = loader.tensor("decoder.out.bias", &[3]).unwrap().to_vec1().unwrap();
        assert_eq!(bias, vec![0.5, -1.0, 2.0]);
        let upcast = loader.get("half.weight").unwrap();
        assert_eq!(upcast.dtype(), DType::F32);

        let _ = fs::remove_dir_all(&temp_dir);
    }
}
