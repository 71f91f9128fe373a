// SPDX-FileCopyrightText: 2021 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::host::ContextGeneration;
use crate::uniform::UniformValue;
use glam::UVec2;
use std::fmt;

/// Which stage a shader is compiled for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    /// Vertex shader.
    Vertex,
    /// Fragment shader.
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        })
    }
}

/// Hint for how often a buffer is rewritten.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    /// Written once.
    Static,
    /// Rewritten often.
    Dynamic,
}

/// The subset of WebGL/WebGL2 that [`Renderer`][`crate::Renderer`] uses. Implemented in the
/// browser by `web::WebGl` and in tests by a recording mock.
///
/// Every call operates on the `TEXTURE_2D` and `ARRAY_BUFFER` targets; the draw calls always
/// draw triangles.
pub trait GraphicsContext {
    /// Compiled shader stage.
    type Shader;
    /// Linked program.
    type Program;
    /// Vertex buffer.
    type Buffer;
    /// 2D texture.
    type Texture;
    /// Resolved uniform location.
    type UniformLocation;
    /// Anything that can be uploaded into a texture.
    type Image: ?Sized;

    /// Which generation of WebGL this is.
    fn generation(&self) -> ContextGeneration;

    /// Creates an empty shader.
    fn create_shader(&self, stage: ShaderStage) -> Option<Self::Shader>;
    /// Sets the source of a shader.
    fn shader_source(&self, shader: &Self::Shader, source: &str);
    /// Compiles a shader.
    fn compile_shader(&self, shader: &Self::Shader);
    /// Returns true if the shader compiled.
    fn compile_status(&self, shader: &Self::Shader) -> bool;
    /// Compiler diagnostics.
    fn shader_info_log(&self, shader: &Self::Shader) -> Option<String>;
    /// Releases a shader.
    fn delete_shader(&self, shader: &Self::Shader);

    /// Creates an empty program.
    fn create_program(&self) -> Option<Self::Program>;
    /// Attaches a compiled shader.
    fn attach_shader(&self, program: &Self::Program, shader: &Self::Shader);
    /// Links a program.
    fn link_program(&self, program: &Self::Program);
    /// Returns true if the program linked.
    fn link_status(&self, program: &Self::Program) -> bool;
    /// Linker diagnostics.
    fn program_info_log(&self, program: &Self::Program) -> Option<String>;
    /// Releases a program.
    fn delete_program(&self, program: &Self::Program);
    /// Binds (or unbinds) a program for subsequent uniform writes and draws.
    fn use_program(&self, program: Option<&Self::Program>);
    /// Location of an active attribute.
    fn attrib_location(&self, program: &Self::Program, name: &str) -> Option<u32>;
    /// Location of an active uniform.
    fn uniform_location(&self, program: &Self::Program, name: &str)
        -> Option<Self::UniformLocation>;

    /// Creates an empty buffer.
    fn create_buffer(&self) -> Option<Self::Buffer>;
    /// Binds (or unbinds) the array buffer.
    fn bind_array_buffer(&self, buffer: Option<&Self::Buffer>);
    /// Replaces the contents of the bound array buffer.
    fn buffer_data(&self, data: &[f32], usage: BufferUsage);
    /// Releases a buffer.
    fn delete_buffer(&self, buffer: &Self::Buffer);
    /// Enables an attribute.
    fn enable_vertex_attrib_array(&self, location: u32);
    /// Points an attribute at the bound array buffer. `stride` and `offset` are in bytes.
    fn vertex_attrib_pointer(&self, location: u32, size: i32, stride: i32, offset: i32);
    /// Sets how many instances share one value of an attribute (0 means per vertex).
    fn vertex_attrib_divisor(&self, location: u32, divisor: u32);

    /// Writes a uniform of the bound program.
    fn uniform(&self, location: &Self::UniformLocation, value: UniformValue);

    /// Creates an empty texture.
    fn create_texture(&self) -> Option<Self::Texture>;
    /// Activates texture `unit` and binds `texture` to it.
    fn bind_texture(&self, unit: u32, texture: Option<&Self::Texture>);
    /// Sets `CLAMP_TO_EDGE` wrapping and `LINEAR` filtering on the bound texture.
    fn clamp_linear(&self);
    /// Uploads `image` into the bound texture, replacing previous contents.
    fn tex_image(&self, image: &Self::Image) -> Result<(), String>;
    /// Releases a texture.
    fn delete_texture(&self, texture: &Self::Texture);

    /// Sets the viewport to `(0, 0, size)`.
    fn viewport(&self, size: UVec2);
    /// Actual size of the drawing buffer, which may be smaller than the canvas.
    fn drawing_buffer_size(&self) -> UVec2;
    /// Draws `count` vertices as triangles.
    fn draw_triangles(&self, count: i32);
    /// Draws `count` vertices as triangles, `instances` times.
    fn draw_triangles_instanced(&self, count: i32, instances: i32);
}
