use std::{fmt, path::PathBuf};

use thiserror::Error;

use crate::renderer::hardware::ResourceState;

/// Programmable stages an engine can be asked to run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Pixel,
    Miss,
    ClosestHit,
    AnyHit,
}

/// Inputs an engine must have bound before it can draw or trace.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Binding {
    RenderTarget,
    VertexBuffer,
    IndexBuffer,
    ConstantBuffer,
    AccelerationStructure,
}

/// An engine operation was called before its setup was complete.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RenderError {
    #[error("{0} shader is not set")]
    MissingShader(ShaderStage),
    #[error("{0} is not bound")]
    MissingBinding(Binding),
}

#[derive(Error, Debug)]
pub enum AssetLoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse OBJ {path}: {source}")]
    Obj {
        path: PathBuf,
        #[source]
        source: wavefront_obj::ParseError,
    },
    #[error("Failed to parse material library {path}: {source}")]
    Mtl {
        path: PathBuf,
        #[source]
        source: wavefront_obj::ParseError,
    },
    #[error("Material {name} used by {path} is not defined")]
    UnknownMaterial { path: PathBuf, name: String },
    #[error("Failed to load texture {path}: {source}")]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Failures reported by the graphics device of the hardware renderer.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum NativeApiError {
    #[error("Graphics device was lost")]
    DeviceLost,
    #[error("Command allocator of frame {frame} is still in use by the GPU")]
    AllocatorInUse { frame: usize },
    #[error("Unknown buffer handle {0}")]
    UnknownBuffer(usize),
    #[error("Buffer of {size} bytes is not a whole number of {stride} byte elements")]
    MalformedUpload { size: usize, stride: usize },
    #[error("Buffer {0} is bound to a slot of a different kind")]
    BufferKindMismatch(usize),
    #[error("Back buffer {back_buffer} is not in the {expected:?} state")]
    WrongResourceState {
        back_buffer: usize,
        expected: ResourceState,
    },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    AssetLoad(#[from] AssetLoadError),
    #[error(transparent)]
    NativeApi(#[from] NativeApiError),
    #[error("Failed to write image: {0}")]
    Image(#[from] image::ImageError),
    #[error("Renderer used before init()")]
    NotInitialized,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShaderStage::Vertex => "Vertex",
            ShaderStage::Pixel => "Pixel",
            ShaderStage::Miss => "Miss",
            ShaderStage::ClosestHit => "Closest hit",
            ShaderStage::AnyHit => "Any hit",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Binding::RenderTarget => "Render target",
            Binding::VertexBuffer => "Vertex buffer",
            Binding::IndexBuffer => "Index buffer",
            Binding::ConstantBuffer => "Constant buffer",
            Binding::AccelerationStructure => "Acceleration structure",
        };
        f.write_str(name)
    }
}
