//! Neural Network inference.

use std::{ops::RangeInclusive, path::Path, sync::Arc};

use handctl_image::{Image, Resolution};
use tract_onnx::prelude::{
    tract_ndarray::{Array4, ArrayViewD},
    tvec, Framework, Graph, InferenceModelExt, SimplePlan, TValue, TVec, Tensor, TypedFact,
    TypedOp,
};

type Model = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A convolutional neural network (CNN) that operates on `[N, C, H, W]` image data.
///
/// Like the underlying [`NeuralNetwork`], this is a cheaply [`Clone`]able handle to the underlying
/// data.
#[derive(Clone)]
pub struct Cnn {
    nn: NeuralNetwork,
    input_res: Resolution,
    color_mapper: ColorMapper,
}

impl Cnn {
    /// Creates a CNN wrapper from a [`NeuralNetwork`].
    ///
    /// The network must have exactly one input of shape `[1, 3, H, W]`.
    pub fn new(nn: NeuralNetwork, color_mapper: ColorMapper) -> anyhow::Result<Self> {
        let input_res = Self::get_input_res(&nn)?;
        Ok(Self {
            nn,
            input_res,
            color_mapper,
        })
    }

    fn get_input_res(nn: &NeuralNetwork) -> anyhow::Result<Resolution> {
        if nn.num_inputs() != 1 {
            anyhow::bail!(
                "CNN network has to take exactly 1 input, this one takes {}",
                nn.num_inputs(),
            );
        }

        let tensor_shape = nn.input_shape(0)?;
        let (w, h) = match tensor_shape {
            [1, 3, h, w] => (*w, *h),
            _ => anyhow::bail!("invalid model input shape for NCHW CNN: {:?}", tensor_shape),
        };

        let (w, h): (u32, u32) = (w.try_into()?, h.try_into()?);
        Ok(Resolution::new(w, h))
    }

    /// Returns the expected input image size.
    #[inline]
    pub fn input_resolution(&self) -> Resolution {
        self.input_res
    }

    /// Runs the network on an input image, returning the estimated outputs.
    ///
    /// If the image does not have the network's input resolution, it will be stretched to fit.
    pub fn estimate(&self, image: &Image) -> anyhow::Result<Outputs> {
        let resized;
        let image = if image.resolution() == self.input_res {
            image
        } else {
            resized = image.crop_resize(image.rect(), self.input_res);
            &resized
        };

        self.nn.estimate(self.to_tensor(image))
    }

    fn to_tensor(&self, image: &Image) -> Tensor {
        let (h, w) = (
            self.input_res.height() as usize,
            self.input_res.width() as usize,
        );
        let pixel = |x: usize, y: usize| {
            let rgb = image.get(x as u32, y as u32).unwrap_or_default();
            self.color_mapper.map(rgb)
        };

        let array = Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| pixel(x, y)[c]);
        Tensor::from(array)
    }
}

/// Maps 8-bit color channels to the value range a network expects.
#[derive(Debug, Clone)]
pub struct ColorMapper {
    target_range: RangeInclusive<f32>,
}

impl ColorMapper {
    /// Creates a simple color mapper that uniformly maps sRGB values to `target_range`.
    ///
    /// Note that this operates on *non-linear* sRGB colors, but maps them linearly to the target
    /// range.
    pub fn linear(target_range: RangeInclusive<f32>) -> Self {
        assert!(target_range.end() > target_range.start());
        Self { target_range }
    }

    fn map(&self, rgb: [u8; 3]) -> [f32; 3] {
        let start = *self.target_range.start();
        let end = *self.target_range.end();

        let adjust_range = (end - start) / 255.0;
        rgb.map(|col| col as f32 * adjust_range + start)
    }
}

/// Neural network loader.
pub struct Loader {
    model_data: Vec<u8>,
    outputs: Option<Vec<usize>>,
}

impl Loader {
    fn new(data: Vec<u8>) -> Self {
        Self {
            model_data: data,
            outputs: None,
        }
    }

    /// Only compute the specified outputs during inference.
    ///
    /// This takes a list of network output indices. When called, the [`Outputs`] returned from
    /// [`NeuralNetwork::estimate`] will only contain the chosen output tensors, in the given order.
    pub fn with_output_selection<O>(mut self, outputs: O) -> Self
    where
        O: Into<Vec<usize>>,
    {
        self.outputs = Some(outputs.into());
        self
    }

    /// Loads and optimizes the network.
    ///
    /// Returns an error if the network data is malformed, if the network data is incomplete, or if
    /// the network uses unimplemented operations.
    pub fn load(self) -> anyhow::Result<NeuralNetwork> {
        let graph = tract_onnx::onnx()
            .model_for_read(&mut &*self.model_data)?
            .into_optimized()?;
        let outputs = graph.output_outlets()?;
        let selected_outputs = match self.outputs {
            Some(indices) => indices
                .iter()
                .map(|&i| {
                    outputs.get(i).copied().ok_or_else(|| {
                        anyhow::anyhow!(
                            "output {} selected, but the network only has {} outputs",
                            i,
                            outputs.len()
                        )
                    })
                })
                .collect::<anyhow::Result<Vec<_>>>()?,
            None => outputs.to_vec(),
        };
        let model = SimplePlan::new_for_outputs(graph, &selected_outputs)?;

        Ok(NeuralNetwork(Arc::new(model)))
    }
}

/// A neural network that can be used for inference.
///
/// This is a cheaply [`Clone`]able handle to the underlying network structures.
#[derive(Clone)]
pub struct NeuralNetwork(Arc<Model>);

impl NeuralNetwork {
    /// Loads a pre-trained model from an ONNX file path.
    ///
    /// The path must have a `.onnx` extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Loader> {
        Self::from_path_impl(path.as_ref())
    }

    fn from_path_impl(path: &Path) -> anyhow::Result<Loader> {
        match path.extension() {
            Some(ext) if ext == "onnx" => {}
            _ => anyhow::bail!(
                "neural network file '{}' must have `.onnx` extension",
                path.display()
            ),
        }

        let model_data = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("failed to read '{}': {}", path.display(), e))?;
        Ok(Loader::new(model_data))
    }

    /// Returns the number of input nodes of the network.
    pub fn num_inputs(&self) -> usize {
        self.0.model().inputs.len()
    }

    /// Returns the number of output nodes of the network.
    pub fn num_outputs(&self) -> usize {
        self.0.model().outputs.len()
    }

    /// Returns the tensor shape of input `index`.
    pub fn input_shape(&self, index: usize) -> anyhow::Result<&[usize]> {
        let fact = self.0.model().input_fact(index)?;
        fact.shape
            .as_concrete()
            .ok_or_else(|| anyhow::anyhow!("network input {} has a symbolic shape", index))
    }

    /// Runs the network on an input tensor, returning the estimated [`Outputs`].
    #[doc(alias = "infer")]
    pub fn estimate(&self, input: Tensor) -> anyhow::Result<Outputs> {
        let outputs = self.0.run(tvec![TValue::from_const(Arc::new(input))])?;
        Ok(Outputs { inner: outputs })
    }
}

/// The result of a neural network inference pass.
///
/// This is a list of tensors corresponding to the network's output nodes.
#[derive(Debug)]
pub struct Outputs {
    inner: TVec<TValue>,
}

impl Outputs {
    /// Returns the number of tensors in this inference output.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns a view of output tensor `index`, which must contain `f32`s.
    pub fn get(&self, index: usize) -> anyhow::Result<ArrayViewD<'_, f32>> {
        let tensor = self.inner.get(index).ok_or_else(|| {
            anyhow::anyhow!(
                "network output {} requested, but only {} outputs were computed",
                index,
                self.len()
            )
        })?;
        Ok(tensor.to_array_view::<f32>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_mapper() {
        let mapper = ColorMapper::linear(-1.0..=1.0);
        assert_eq!(mapper.map([0, 0, 0]), [-1.0, -1.0, -1.0]);
        assert_eq!(mapper.map([255, 255, 255]), [1.0, 1.0, 1.0]);

        let mapper = ColorMapper::linear(0.0..=1.0);
        assert_eq!(mapper.map([0, 0, 0]), [0.0, 0.0, 0.0]);
        assert_eq!(mapper.map([255, 0, 255]), [1.0, 0.0, 1.0]);
    }

    #[test]
    fn rejects_non_onnx_paths() {
        assert!(NeuralNetwork::from_path("hand_landmark.tflite").is_err());
    }

    #[test]
    fn rejects_missing_models() {
        assert!(NeuralNetwork::from_path("does/not/exist/hand_landmark.onnx").is_err());
    }
}
