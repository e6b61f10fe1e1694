//! Error types shared across the renderer.
//!
//! Matrix derivation never fails, so everything here is either a rejected
//! configuration value, a GPU resource that could not be created, or a shadow
//! pass driven through its frame phases in the wrong order.

use thiserror::Error;

use crate::shadow::ShadowPhase;

/// A configuration value that would produce a degenerate matrix or resource.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("near clip ({near}) must be positive and below far clip ({far})")]
    InvalidClipPlanes { near: f32, far: f32 },
    #[error("aspect ratio must be positive and finite, got {0}")]
    InvalidAspectRatio(f32),
    #[error("field of view must lie in (0, pi) radians, got {0}")]
    InvalidFieldOfView(f32),
    #[error("orthographic width must be positive, got {0}")]
    InvalidOrthographicWidth(f32),
    #[error("shadow map resolution must be a non-zero power of two, got {0}")]
    InvalidShadowResolution(u32),
    #[error("shadow projection size must be positive, got {0}")]
    InvalidShadowProjection(f32),
    #[error("light direction must be non-zero")]
    ZeroLightDirection,
    #[error("no light at index {0}")]
    NoSuchLight(usize),
    #[error("light {0} is not directional and cannot cast the shadow")]
    NotDirectional(usize),
    #[error("no camera at index {0}")]
    NoSuchCamera(usize),
    #[error("light list is full ({0} lights)")]
    TooManyLights(usize),
}

/// A GPU object that could not be created or acquired.
#[derive(Error, Debug)]
pub enum GraphicsResourceError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("texture of {requested}x{requested} exceeds the device limit of {max}")]
    TextureTooLarge { requested: u32, max: u32 },
    #[error("surface reports no supported texture formats")]
    UnsupportedSurface,
    #[error("surface texture unavailable: {0}")]
    SurfaceLost(#[from] wgpu::SurfaceError),
}

/// Any failure while configuring or driving the shadow pass.
#[derive(Error, Debug)]
pub enum ShadowError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Resource(#[from] GraphicsResourceError),
    #[error(transparent)]
    State(#[from] ShadowStateError),
}

/// The shadow pass was driven out of order.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowStateError {
    #[error("shadow pass cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: ShadowPhase, to: ShadowPhase },
}

/// Anything that can stop the application shell.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("window creation failed: {0}")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Graphics(#[from] GraphicsResourceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
