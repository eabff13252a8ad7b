//! Inference engine adapter for the pose model.
//!
//! [`EngineHandle`] owns the loaded model for the lifetime of the process.
//! The model's buffers are reused between runs, so every call goes through a
//! single mutex: at most one inference is in flight at a time. Callers on an
//! async runtime should invoke [`EngineHandle::detect`] from a blocking task.
//!
//! The runtime sits behind the [`PoseModel`] trait; [`OnnxPoseModel`] is the
//! production implementation.

mod onnx;

use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use ndarray::{Array4, ArrayView4};
use serde::Serialize;
use tracing::{debug, error, info};
use yogapose_config::ServerConfig;
use yogapose_core::{DetectionResult, PoseError, INPUT_SHAPE, OUTPUT_SHAPE};

pub use onnx::OnnxPoseModel;

/// Element type of a declared tensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    U8,
    I32,
    F32,
    Other(String),
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::U8 => f.write_str("u8"),
            ElementKind::I32 => f.write_str("i32"),
            ElementKind::F32 => f.write_str("f32"),
            ElementKind::Other(kind) => f.write_str(kind),
        }
    }
}

/// Declared tensor descriptor. Negative dimensions are dynamic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TensorSpec {
    pub name: String,
    pub shape: Vec<i64>,
    pub element: ElementKind,
}

impl TensorSpec {
    /// Whether a concrete shape fits this descriptor.
    pub fn accepts(&self, shape: &[usize]) -> bool {
        self.shape.len() == shape.len()
            && self
                .shape
                .iter()
                .zip(shape)
                .all(|(&declared, &actual)| declared < 0 || declared as usize == actual)
    }
}

impl fmt::Display for TensorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?} {}", self.name, self.shape, self.element)
    }
}

/// A loaded pose model: `[1, 256, 256, 3]` u8 in, `[1, 1, 17, 3]` f32 out.
pub trait PoseModel: Send {
    fn input_spec(&self) -> &TensorSpec;

    fn output_spec(&self) -> &TensorSpec;

    /// Runs the model synchronously, blocking the calling thread.
    fn infer(&mut self, input: ArrayView4<u8>) -> Result<Array4<f32>, PoseError>;
}

/// Summary of the loaded model for logs and health reports.
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub model: String,
    pub input: TensorSpec,
    pub output: TensorSpec,
}

/// Process-wide owner of the pose model.
pub struct EngineHandle {
    model: Mutex<Box<dyn PoseModel>>,
    info: EngineInfo,
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle").field("info", &self.info).finish()
    }
}

impl EngineHandle {
    /// Loads the ONNX model named by the configuration.
    pub fn initialize(config: &ServerConfig) -> Result<Self, PoseError> {
        let model = OnnxPoseModel::load(&config.model_path, config.intra_threads)?;
        Self::from_model(model, config.model_path.display().to_string())
    }

    /// Wraps an already-loaded model after checking its declared tensors.
    pub fn from_model(model: impl PoseModel + 'static, source: impl Into<String>) -> Result<Self, PoseError> {
        let input = model.input_spec().clone();
        let output = model.output_spec().clone();

        if !input.accepts(&INPUT_SHAPE) {
            return Err(PoseError::Engine(format!(
                "model input {} does not accept {:?}",
                input, INPUT_SHAPE
            )));
        }
        if matches!(input.element, ElementKind::Other(_)) {
            return Err(PoseError::Engine(format!("unsupported model input {}", input)));
        }
        if !output.accepts(&OUTPUT_SHAPE) || output.element != ElementKind::F32 {
            return Err(PoseError::Engine(format!(
                "model output {} is not f32 {:?}",
                output, OUTPUT_SHAPE
            )));
        }

        let info = EngineInfo {
            model: source.into(),
            input,
            output,
        };
        info!(model = %info.model, input = %info.input, output = %info.output, "Engine ready");

        Ok(Self {
            model: Mutex::new(Box::new(model)),
            info,
        })
    }

    pub fn info(&self) -> &EngineInfo {
        &self.info
    }

    /// Acquires the model lock, converting poison errors to engine errors.
    fn model_lock(&self) -> Result<MutexGuard<'_, Box<dyn PoseModel>>, PoseError> {
        self.model.lock().map_err(|e| {
            error!("Engine lock poisoned: {}", e);
            PoseError::Engine("engine lock error".into())
        })
    }

    /// Runs one inference. Blocks while another inference holds the lock.
    pub fn infer(&self, input: ArrayView4<u8>) -> Result<Array4<f32>, PoseError> {
        if input.shape() != &INPUT_SHAPE[..] {
            return Err(PoseError::shape("input", &INPUT_SHAPE, input.shape()));
        }

        let start = Instant::now();
        let output = {
            let mut model = self.model_lock()?;
            model.infer(input)?
        };
        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "Inference complete");

        if output.shape() != &OUTPUT_SHAPE[..] {
            return Err(PoseError::shape("output", &OUTPUT_SHAPE, output.shape()));
        }
        Ok(output)
    }

    /// Runs one inference and formats the keypoints.
    pub fn detect(&self, input: ArrayView4<u8>) -> Result<DetectionResult, PoseError> {
        let output = self.infer(input)?;
        let raw: Vec<f32> = output.iter().copied().collect();
        DetectionResult::from_raw(&raw)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use ndarray::Array4;
    use yogapose_core::{KeypointName, KEYPOINT_COUNT};

    use super::*;

    fn spec(name: &str, shape: &[i64], element: ElementKind) -> TensorSpec {
        TensorSpec {
            name: name.into(),
            shape: shape.to_vec(),
            element,
        }
    }

    /// Emits the mean input intensity as every coordinate and score.
    struct MeanModel {
        input: TensorSpec,
        output: TensorSpec,
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl MeanModel {
        fn new() -> Self {
            Self {
                input: spec("input", &[1, 256, 256, 3], ElementKind::U8),
                output: spec("output_0", &[1, 1, 17, 3], ElementKind::F32),
                active: Arc::new(AtomicUsize::new(0)),
                peak: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl PoseModel for MeanModel {
        fn input_spec(&self) -> &TensorSpec {
            &self.input
        }

        fn output_spec(&self) -> &TensorSpec {
            &self.output
        }

        fn infer(&mut self, input: ArrayView4<u8>) -> Result<Array4<f32>, PoseError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));

            let total: f64 = input.iter().map(|&v| f64::from(v)).sum();
            let mean = (total / input.len() as f64 / 255.0) as f32;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(Array4::from_elem((1, 1, KEYPOINT_COUNT, 3), mean))
        }
    }

    struct BadOutputModel(MeanModel);

    impl PoseModel for BadOutputModel {
        fn input_spec(&self) -> &TensorSpec {
            &self.0.input
        }

        fn output_spec(&self) -> &TensorSpec {
            &self.0.output
        }

        fn infer(&mut self, _input: ArrayView4<u8>) -> Result<Array4<f32>, PoseError> {
            Ok(Array4::zeros((1, 1, 16, 3)))
        }
    }

    #[test]
    fn detect_formats_model_output() {
        let engine = EngineHandle::from_model(MeanModel::new(), "mean").unwrap();
        let input = Array4::from_elem((1, 256, 256, 3), 255u8);

        let result = engine.detect(input.view()).unwrap();
        assert_eq!(result.keypoints.len(), 17);
        assert_eq!(result.keypoints[0].name, KeypointName::Nose);
        assert!((result.avg_score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn wrong_input_shape_is_rejected_before_the_model() {
        let engine = EngineHandle::from_model(MeanModel::new(), "mean").unwrap();
        let input = Array4::<u8>::zeros((1, 192, 192, 3));

        let err = engine.infer(input.view()).unwrap_err();
        assert_eq!(err, PoseError::shape("input", &[1, 256, 256, 3], &[1, 192, 192, 3]));
    }

    #[test]
    fn wrong_output_shape_is_reported() {
        let engine = EngineHandle::from_model(BadOutputModel(MeanModel::new()), "bad").unwrap();
        let input = Array4::<u8>::zeros((1, 256, 256, 3));

        let err = engine.infer(input.view()).unwrap_err();
        assert_eq!(err.kind(), "shape");
    }

    #[test]
    fn incompatible_declared_tensors_fail_construction() {
        let mut model = MeanModel::new();
        model.input = spec("input", &[1, 3, 256, 256], ElementKind::F32);
        assert!(EngineHandle::from_model(model, "nchw").is_err());

        let mut model = MeanModel::new();
        model.output = spec("output_0", &[1, 1, 17, 3], ElementKind::I32);
        assert!(EngineHandle::from_model(model, "int-out").is_err());
    }

    #[test]
    fn dynamic_dimensions_are_accepted() {
        let s = spec("input", &[-1, 256, 256, 3], ElementKind::I32);
        assert!(s.accepts(&[1, 256, 256, 3]));
        assert!(!s.accepts(&[1, 256, 256]));
        assert_eq!(s.to_string(), "input [-1, 256, 256, 3] i32");
    }

    #[test]
    fn concurrent_calls_are_serialized() {
        let model = MeanModel::new();
        let peak = Arc::clone(&model.peak);
        let engine = Arc::new(EngineHandle::from_model(model, "mean").unwrap());

        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    let input = Array4::from_elem((1, 256, 256, 3), i * 30);
                    let result = engine.detect(input.view()).unwrap();
                    (i, result.avg_score)
                })
            })
            .collect();

        for handle in handles {
            let (i, score) = handle.join().unwrap();
            assert!((score - (i as f32 * 30.0) / 255.0).abs() < 1e-4);
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn initialize_fails_for_missing_model() {
        let config = ServerConfig {
            model_path: "models/nope.onnx".into(),
            ..ServerConfig::default()
        };

        let err = EngineHandle::initialize(&config).unwrap_err();
        assert!(matches!(err, PoseError::Engine(ref msg) if msg.contains("models/nope.onnx")));
    }

    #[test]
    fn info_serializes_specs() {
        let engine = EngineHandle::from_model(MeanModel::new(), "models/mean.onnx").unwrap();
        let json = serde_json::to_value(engine.info()).unwrap();
        assert_eq!(json["model"], "models/mean.onnx");
        assert_eq!(json["input"]["element"], "u8");
        assert_eq!(json["output"]["shape"][2], 17);
    }
}
