//! Renderer configuration.

/// Texture shown when nothing else is configured.
pub const DEFAULT_TEXTURE: &str = "sample_tex.png";

/// How long an upload may take before it is treated as lost (100 ms).
pub const DEFAULT_UPLOAD_TIMEOUT_NS: u64 = 100_000_000;

/// Background color around the quad.
pub const DEFAULT_CLEAR_COLOR: [f32; 4] = [0.5, 0.5, 0.5, 1.0];

/// Renderer configuration.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Application name reported to the driver.
    pub app_name: String,
    /// Enable Vulkan validation layers.
    pub validation: bool,
    /// Asset name of the encoded texture.
    pub texture: String,
    /// Asset name of the vertex stage SPIR-V.
    pub vertex_shader: String,
    /// Asset name of the fragment stage SPIR-V.
    pub fragment_shader: String,
    /// Clear color of every frame.
    pub clear_color: [f32; 4],
    /// Rebuild the swapchain on resize and when it goes out of date.
    pub handle_resize: bool,
    /// Upper bound on the upload fence wait, in nanoseconds.
    pub upload_timeout_ns: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            app_name: "quadview".to_string(),
            validation: cfg!(debug_assertions),
            texture: DEFAULT_TEXTURE.to_string(),
            vertex_shader: quadview_shaders::VERTEX_SHADER.to_string(),
            fragment_shader: quadview_shaders::FRAGMENT_SHADER.to_string(),
            clear_color: DEFAULT_CLEAR_COLOR,
            handle_resize: true,
            upload_timeout_ns: DEFAULT_UPLOAD_TIMEOUT_NS,
        }
    }
}

impl RendererConfig {
    /// Create a new config with the given application name.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Default::default()
        }
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Set the texture asset name.
    pub fn with_texture(mut self, name: impl Into<String>) -> Self {
        self.texture = name.into();
        self
    }

    /// Set the shader asset names.
    pub fn with_shaders(mut self, vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        self.vertex_shader = vertex.into();
        self.fragment_shader = fragment.into();
        self
    }

    /// Set the clear color.
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Enable or disable swapchain rebuilds.
    pub fn with_resize(mut self, handle_resize: bool) -> Self {
        self.handle_resize = handle_resize;
        self
    }

    /// Set the upload fence timeout.
    pub fn with_upload_timeout_ns(mut self, timeout_ns: u64) -> Self {
        self.upload_timeout_ns = timeout_ns;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RendererConfig::default();
        assert_eq!(config.texture, "sample_tex.png");
        assert_eq!(config.vertex_shader, "texture.vert.spv");
        assert_eq!(config.fragment_shader, "texture.frag.spv");
        assert_eq!(config.clear_color, [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(config.upload_timeout_ns, 100_000_000);
        assert!(config.handle_resize);
    }

    #[test]
    fn builder_overrides() {
        let config = RendererConfig::new("demo")
            .with_texture("other.png")
            .with_resize(false)
            .with_validation(true);
        assert_eq!(config.app_name, "demo");
        assert_eq!(config.texture, "other.png");
        assert!(!config.handle_resize);
        assert!(config.validation);
    }
}
