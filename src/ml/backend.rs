//! Backend selection.
//!
//! Chosen at compile time through cargo features:
//!
//! - `ndarray` (default): CPU backend
//! - `wgpu`: GPU backend through Vulkan/Metal/DirectX
//!
//! Training always wraps the inner backend in `Autodiff`.

#[cfg(feature = "wgpu")]
pub use burn::backend::Wgpu as InnerBackend;

#[cfg(all(feature = "ndarray", not(feature = "wgpu")))]
pub use burn::backend::NdArray as InnerBackend;

#[cfg(not(any(feature = "ndarray", feature = "wgpu")))]
compile_error!("enable one of the `ndarray` or `wgpu` features");

/// Backend with autodiff support, used for training.
pub type TrainBackend = burn::backend::Autodiff<InnerBackend>;

/// Device shared by the training and inference backends.
pub type Device = <InnerBackend as burn::tensor::backend::Backend>::Device;

pub fn default_device() -> Device {
    let device = Device::default();
    tracing::debug!("Device initialized: {:?}", device);
    device
}
