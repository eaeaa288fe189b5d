//! TorchScript backend, built with `--features torch`.

use crate::error::{BundleError, InferenceError};
use crate::model::Regressor;
use parking_lot::Mutex;
use std::path::Path;
use tch::{kind::Kind, CModule, Device, Tensor};

pub struct TorchScriptRegressor {
    module: Mutex<CModule>,
    device: Device,
    in_dim: usize,
}

impl TorchScriptRegressor {
    pub fn load(path: &Path, in_dim: usize) -> Result<Self, BundleError> {
        let device = Device::Cpu;
        let module = CModule::load_on_device(path, device)
            .map_err(|e| BundleError::Backend(format!("failed to load TorchScript {}: {e}", path.display())))?;

        // Probe output shape with a dummy forward; expect a single value
        let dummy = Tensor::zeros([1, in_dim as i64], (Kind::Float, device));
        let out = module
            .forward_ts(&[dummy])
            .map_err(|e| BundleError::Backend(format!("dummy forward failed: {e}")))?;
        let numel: i64 = out.size().iter().product();
        if numel != 1 {
            return Err(BundleError::Backend(format!("unexpected model output size: {:?}", out.size())));
        }

        Ok(Self { module: Mutex::new(module), device, in_dim })
    }
}

impl Regressor for TorchScriptRegressor {
    fn kind(&self) -> &'static str {
        "torchscript"
    }

    fn predict(&self, x: &[f32]) -> Result<f64, InferenceError> {
        if x.len() != self.in_dim {
            return Err(InferenceError::ShapeMismatch { got: x.len(), expected: self.in_dim });
        }

        let input = Tensor::from_slice(x)
            .reshape([1, self.in_dim as i64])
            .to_device(self.device);

        let out = self
            .module
            .lock()
            .forward_ts(&[input])
            .map_err(|e| InferenceError::Unavailable(e.to_string()))?;

        let numel: i64 = out.size().iter().product();
        if numel != 1 {
            return Err(InferenceError::ShapeMismatch { got: numel.max(0) as usize, expected: 1 });
        }
        Ok(out.reshape([1]).double_value(&[0]))
    }
}
