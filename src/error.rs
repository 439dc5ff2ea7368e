// Error types for Orrery 3D

use std::path::PathBuf;

/// Errors raised while loading or validating the orbit descriptor table.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors that can occur while setting up the GPU.
#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error("surface error: {0}")]
    Surface(String),

    #[error("no suitable GPU adapter found")]
    AdapterNotFound,

    #[error("device error: {0}")]
    Device(String),
}

impl From<wgpu::CreateSurfaceError> for RendererError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        RendererError::Surface(e.to_string())
    }
}

impl From<wgpu::RequestDeviceError> for RendererError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        RendererError::Device(e.to_string())
    }
}

/// Texture load failures. Never fatal; the body keeps its fallback colour.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("texture task aborted: {0}")]
    Task(String),
}

/// Top-level startup error returned from `main`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Renderer(#[from] RendererError),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("window error: {0}")]
    Window(#[from] winit::error::OsError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_error_display() {
        assert_eq!(
            RendererError::AdapterNotFound.to_string(),
            "no suitable GPU adapter found"
        );
        assert_eq!(
            RendererError::Device("lost".into()).to_string(),
            "device error: lost"
        );
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::Invalid("no bodies".into());
        assert_eq!(err.to_string(), "invalid config: no bodies");
    }

    #[test]
    fn app_error_wraps_config_error_transparently() {
        let err: AppError = ConfigError::Invalid("duplicate body Earth".into()).into();
        assert_eq!(err.to_string(), "invalid config: duplicate body Earth");
    }

    #[test]
    fn asset_read_error_names_path() {
        let err = AssetError::Read {
            path: PathBuf::from("textures/earth.jpg"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("textures/earth.jpg"));
    }
}
