//! Shader and pipeline creation inside a validation error scope
//!
//! wgpu reports invalid WGSL and mismatched pipeline layouts through the
//! uncaptured error handler, which panics by default. Creating them inside an
//! error scope turns those into a [`RenderError`] at startup.

use crate::context::RenderError;

/// Compile a WGSL module, returning the validation message on failure.
pub fn create_checked_shader(
    device: &wgpu::Device,
    label: &str,
    source: &str,
) -> Result<wgpu::ShaderModule, RenderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(RenderError::ShaderCompilation {
            label: label.to_string(),
            message: err.to_string(),
        }),
        None => Ok(module),
    }
}

/// Run a pipeline constructor and surface any validation error it raised.
pub fn create_checked_pipeline<T>(
    device: &wgpu::Device,
    label: &str,
    create: impl FnOnce() -> T,
) -> Result<T, RenderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = create();
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(RenderError::PipelineCreation {
            label: label.to_string(),
            message: err.to_string(),
        }),
        None => Ok(pipeline),
    }
}
