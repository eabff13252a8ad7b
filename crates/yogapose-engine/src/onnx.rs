//! ONNX Runtime backed [`PoseModel`].

use std::path::Path;

use ndarray::{Array4, ArrayView4, Ix4};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::{DynValue, Tensor, ValueType};
use tracing::info;
use yogapose_core::PoseError;

use crate::{ElementKind, PoseModel, TensorSpec};

fn engine_err(context: &str, err: ort::Error) -> PoseError {
    PoseError::Engine(format!("{}: {}", context, err))
}

fn element_kind(ty: TensorElementType) -> ElementKind {
    match ty {
        TensorElementType::Uint8 => ElementKind::U8,
        TensorElementType::Int32 => ElementKind::I32,
        TensorElementType::Float32 => ElementKind::F32,
        other => ElementKind::Other(format!("{:?}", other).to_lowercase()),
    }
}

fn tensor_spec(name: &str, value_type: &ValueType) -> Result<TensorSpec, PoseError> {
    match value_type {
        ValueType::Tensor { ty, shape, .. } => Ok(TensorSpec {
            name: name.to_string(),
            shape: shape.iter().copied().collect(),
            element: element_kind(*ty),
        }),
        other => Err(PoseError::Engine(format!(
            "'{}' is not a tensor ({:?})",
            name, other
        ))),
    }
}

/// Model input converted to the element type the session declares.
#[derive(Debug, PartialEq)]
pub(crate) enum InputArray {
    U8(Array4<u8>),
    I32(Array4<i32>),
    F32(Array4<f32>),
}

/// Widens the `u8` frame to the declared input element type.
pub(crate) fn widen_input(input: ArrayView4<u8>, element: &ElementKind) -> Result<InputArray, PoseError> {
    match element {
        ElementKind::U8 => Ok(InputArray::U8(input.to_owned())),
        ElementKind::I32 => Ok(InputArray::I32(input.mapv(i32::from))),
        ElementKind::F32 => Ok(InputArray::F32(input.mapv(f32::from))),
        ElementKind::Other(kind) => Err(PoseError::Engine(format!(
            "unsupported input element type '{}'",
            kind
        ))),
    }
}

/// Single-session ONNX pose model.
pub struct OnnxPoseModel {
    session: Session,
    input: TensorSpec,
    output: TensorSpec,
}

impl std::fmt::Debug for OnnxPoseModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxPoseModel")
            .field("input", &self.input)
            .field("output", &self.output)
            .finish()
    }
}

impl OnnxPoseModel {
    /// Loads a model artifact and reads its first input and output descriptors.
    pub fn load(path: impl AsRef<Path>, intra_threads: usize) -> Result<Self, PoseError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PoseError::Engine(format!(
                "model file not found: {}",
                path.display()
            )));
        }
        info!(path = %path.display(), threads = intra_threads, "Loading ONNX model");

        let session = Session::builder()
            .map_err(|e| engine_err("session builder", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| engine_err("optimization level", e))?
            .with_intra_threads(intra_threads)
            .map_err(|e| engine_err("intra threads", e))?
            .commit_from_file(path)
            .map_err(|e| engine_err(&format!("failed to load model from {}", path.display()), e))?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| PoseError::Engine("model declares no inputs".into()))
            .and_then(|i| tensor_spec(&i.name, &i.input_type))?;
        let output = session
            .outputs
            .first()
            .ok_or_else(|| PoseError::Engine("model declares no outputs".into()))
            .and_then(|o| tensor_spec(&o.name, &o.output_type))?;

        info!(
            input = %input,
            output = %output,
            "Model loaded successfully"
        );

        Ok(Self { session, input, output })
    }

    fn input_value(&self, input: ArrayView4<u8>) -> Result<DynValue, PoseError> {
        let value = match widen_input(input, &self.input.element)? {
            InputArray::U8(array) => Tensor::from_array(array).map(|t| t.into_dyn()),
            InputArray::I32(array) => Tensor::from_array(array).map(|t| t.into_dyn()),
            InputArray::F32(array) => Tensor::from_array(array).map(|t| t.into_dyn()),
        };
        value.map_err(|e| engine_err("failed to build input tensor", e))
    }
}

impl PoseModel for OnnxPoseModel {
    fn input_spec(&self) -> &TensorSpec {
        &self.input
    }

    fn output_spec(&self) -> &TensorSpec {
        &self.output
    }

    fn infer(&mut self, input: ArrayView4<u8>) -> Result<Array4<f32>, PoseError> {
        let value = self.input_value(input)?;
        let input_name = self.input.name.clone();
        let output_name = self.output.name.clone();

        let outputs = self
            .session
            .run(ort::inputs![input_name.as_str() => value])
            .map_err(|e| engine_err("inference failed", e))?;

        let view = outputs[output_name.as_str()]
            .try_extract_array::<f32>()
            .map_err(|e| engine_err(&format!("failed to extract output '{}'", output_name), e))?;
        let actual = view.shape().to_vec();

        view.to_owned()
            .into_dimensionality::<Ix4>()
            .map_err(|_| PoseError::shape("output", &yogapose_core::OUTPUT_SHAPE, &actual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Array4<u8> {
        Array4::from_shape_fn((1, 2, 2, 3), |(_, y, x, c)| (y * 30 + x * 10 + c) as u8 + 200)
    }

    #[test]
    fn missing_model_file_is_an_engine_error() {
        let err = OnnxPoseModel::load("models/missing.onnx", 1).unwrap_err();
        assert_eq!(err.kind(), "engine");
        assert!(err.to_string().contains("models/missing.onnx"), "{}", err);
    }

    #[test]
    fn directory_is_not_a_model() {
        let dir = std::env::temp_dir();
        let err = OnnxPoseModel::load(&dir, 1).unwrap_err();
        assert_eq!(err.kind(), "engine");
    }

    #[test]
    fn u8_input_passes_through() {
        let input = frame();
        assert_eq!(
            widen_input(input.view(), &ElementKind::U8).unwrap(),
            InputArray::U8(input.clone())
        );
    }

    #[test]
    fn int_and_float_inputs_keep_pixel_values() {
        let input = frame();

        let InputArray::I32(ints) = widen_input(input.view(), &ElementKind::I32).unwrap() else {
            panic!("expected i32 input");
        };
        assert_eq!(ints.shape(), &[1, 2, 2, 3]);
        assert_eq!(ints[[0, 1, 1, 2]], 242);
        assert!(ints.iter().zip(input.iter()).all(|(&w, &v)| w == i32::from(v)));

        let InputArray::F32(floats) = widen_input(input.view(), &ElementKind::F32).unwrap() else {
            panic!("expected f32 input");
        };
        assert!(floats.iter().zip(input.iter()).all(|(&w, &v)| w == f32::from(v)));
        assert_eq!(floats[[0, 0, 0, 0]], 200.0);
    }

    #[test]
    fn unknown_element_type_is_rejected() {
        let err = widen_input(frame().view(), &ElementKind::Other("float16".into())).unwrap_err();
        assert_eq!(err.kind(), "engine");
        assert!(err.to_string().contains("float16"));
    }
}
