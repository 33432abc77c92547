//! Shader stages of the quadview renderer.
//!
//! The GLSL sources live in `shaders/`. With the `embed` feature they are compiled to
//! SPIR-V at build time and exposed as an in-memory asset source; otherwise the host is
//! expected to ship `texture.vert.spv` and `texture.frag.spv` next to its other assets.

/// Asset name of the vertex stage.
pub const VERTEX_SHADER: &str = "texture.vert.spv";

/// Asset name of the fragment stage.
pub const FRAGMENT_SHADER: &str = "texture.frag.spv";

/// GLSL source of the vertex stage.
pub const VERTEX_SOURCE: &str = include_str!("../shaders/texture.vert");

/// GLSL source of the fragment stage.
pub const FRAGMENT_SOURCE: &str = include_str!("../shaders/texture.frag");

/// Embedded SPIR-V shader bytecode.
#[cfg(feature = "embed")]
mod spirv_bytes {
    pub static TEXTURE_VERT: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/texture.vert.spv"));
    pub static TEXTURE_FRAG: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/texture.frag.spv"));
}

/// Both compiled stages under their asset names.
#[cfg(feature = "embed")]
pub fn embedded_assets() -> quadview_core::MemoryAssetSource {
    quadview_core::MemoryAssetSource::new()
        .with(VERTEX_SHADER, spirv_bytes::TEXTURE_VERT)
        .with(FRAGMENT_SHADER, spirv_bytes::TEXTURE_FRAG)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_interfaces_match() {
        // The vertex stage consumes both quad attributes and hands the UV on.
        assert!(VERTEX_SOURCE.contains("layout(location = 0) in vec3"));
        assert!(VERTEX_SOURCE.contains("layout(location = 1) in vec2"));
        assert!(FRAGMENT_SOURCE.contains("layout(binding = 0) uniform sampler2D"));
    }

    #[cfg(feature = "embed")]
    #[test]
    fn embedded_stages_are_spirv() {
        use quadview_core::AssetSource;

        let assets = embedded_assets();
        for name in [VERTEX_SHADER, FRAGMENT_SHADER] {
            let bytes = assets.read(name).unwrap();
            assert_eq!(bytes.len() % 4, 0);
            assert_eq!(
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
                0x0723_0203,
                "Invalid SPIR-V magic number"
            );
        }
    }
}
