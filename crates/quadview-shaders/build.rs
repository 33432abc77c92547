//! Build script to compile GLSL shaders to SPIR-V when the `embed` feature is on.

fn main() {
    // Rerun if shaders change
    println!("cargo:rerun-if-changed=shaders/");

    #[cfg(feature = "embed")]
    embed::compile_all();
}

#[cfg(feature = "embed")]
mod embed {
    use shaderc::{Compiler, ShaderKind};
    use std::env;
    use std::fs;
    use std::path::Path;

    pub fn compile_all() {
        let out_dir = env::var("OUT_DIR").unwrap();
        let shader_dir = Path::new("shaders");

        let compiler = Compiler::new().expect("Failed to create shader compiler");

        compile_shader(
            &compiler,
            shader_dir.join("texture.vert"),
            Path::new(&out_dir).join("texture.vert.spv"),
            ShaderKind::Vertex,
        );
        compile_shader(
            &compiler,
            shader_dir.join("texture.frag"),
            Path::new(&out_dir).join("texture.frag.spv"),
            ShaderKind::Fragment,
        );
    }

    fn compile_shader(
        compiler: &Compiler,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        kind: ShaderKind,
    ) {
        let input_path = input.as_ref();
        let output_path = output.as_ref();

        let source = fs::read_to_string(input_path)
            .unwrap_or_else(|e| panic!("Failed to read shader {:?}: {}", input_path, e));

        let file_name = input_path.file_name().unwrap().to_str().unwrap();

        let mut options =
            shaderc::CompileOptions::new().expect("Failed to create compile options");
        // The renderer only asks for a 1.1 instance.
        options.set_target_env(
            shaderc::TargetEnv::Vulkan,
            shaderc::EnvVersion::Vulkan1_1 as u32,
        );
        options.set_optimization_level(shaderc::OptimizationLevel::Performance);

        let result = compiler
            .compile_into_spirv(&source, kind, file_name, "main", Some(&options))
            .unwrap_or_else(|e| panic!("Failed to compile shader {:?}: {}", input_path, e));

        if result.get_num_warnings() > 0 {
            println!("cargo:warning=Shader warnings in {:?}:", input_path);
        }

        fs::write(output_path, result.as_binary_u8())
            .unwrap_or_else(|e| panic!("Failed to write shader {:?}: {}", output_path, e));
    }
}
