// SPDX-FileCopyrightText: 2021 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::context::{GraphicsContext, ShaderStage};
use crate::error::{Error, ResourceError};
use crate::options::RenderMode;

/// `uniform float u_time;` seconds since the renderer was created.
pub const TIME_UNIFORM: &str = "u_time";
/// `uniform vec2 u_resolution;` size of the drawing buffer in pixels.
pub const RESOLUTION_UNIFORM: &str = "u_resolution";
/// `vec2` clip space position of the fullscreen triangle.
pub const FULLSCREEN_ATTRIBUTE: &str = "a_position";
/// `vec2` position within the unit quad, `(0, 0)` to `(1, 1)`.
pub const INSTANCED_ATTRIBUTE: &str = "a_quad";

/// One triangle that covers clip space once clipped.
pub(crate) const FULLSCREEN_TRIANGLE: [f32; 6] = [-1.0, -1.0, 3.0, -1.0, -1.0, 3.0];

/// Two counter-clockwise triangles covering the unit square.
pub(crate) const UNIT_QUAD: [f32; 12] = [
    0.0, 0.0, 1.0, 0.0, 0.0, 1.0, //
    0.0, 1.0, 1.0, 0.0, 1.0, 1.0,
];

/// Vertices per instance.
pub(crate) const UNIT_QUAD_VERTICES: i32 = UNIT_QUAD.len() as i32 / 2;

const FULLSCREEN_VERTEX_100: &str = "attribute vec2 a_position;
void main() {
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

const FULLSCREEN_VERTEX_300: &str = "#version 300 es
in vec2 a_position;
void main() {
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

// a_rect is x, y, width, height in drawing buffer pixels, origin top left.
const INSTANCED_VERTEX_100: &str = "uniform vec2 u_resolution;
attribute vec2 a_quad;
attribute vec4 a_rect;
varying vec2 v_uv;
void main() {
    v_uv = a_quad;
    vec2 pixel = a_rect.xy + a_quad * a_rect.zw;
    vec2 clip = pixel / u_resolution * 2.0 - 1.0;
    gl_Position = vec4(clip.x, -clip.y, 0.0, 1.0);
}
";

const INSTANCED_VERTEX_300: &str = "#version 300 es
uniform vec2 u_resolution;
in vec2 a_quad;
in vec4 a_rect;
out vec2 v_uv;
void main() {
    v_uv = a_quad;
    vec2 pixel = a_rect.xy + a_quad * a_rect.zw;
    vec2 clip = pixel / u_resolution * 2.0 - 1.0;
    gl_Position = vec4(clip.x, -clip.y, 0.0, 1.0);
}
";

/// Returns true if `source` is GLSL ES 3.00.
fn is_glsl_300(source: &str) -> bool {
    source.trim_start().starts_with("#version 300 es")
}

/// Built-in vertex shader for `mode`, in the same GLSL version as `fragment` (both stages of a
/// program must agree).
pub(crate) fn default_vertex(mode: RenderMode, fragment: &str) -> &'static str {
    match (mode, is_glsl_300(fragment)) {
        (RenderMode::Fullscreen, false) => FULLSCREEN_VERTEX_100,
        (RenderMode::Fullscreen, true) => FULLSCREEN_VERTEX_300,
        (RenderMode::Instanced, false) => INSTANCED_VERTEX_100,
        (RenderMode::Instanced, true) => INSTANCED_VERTEX_300,
    }
}

/// A linked program and the two stages it was linked from.
pub(crate) struct Program<C: GraphicsContext> {
    pub program: C::Program,
    vert_shader: C::Shader,
    frag_shader: C::Shader,
}

impl<C: GraphicsContext> Program<C> {
    /// Compiles and links a program. On failure, everything created so far is released before
    /// the error is returned.
    pub fn new(gl: &C, vertex: &str, fragment: &str) -> Result<Self, Error> {
        let vert_shader = compile_shader(gl, ShaderStage::Vertex, vertex)?;
        let frag_shader = match compile_shader(gl, ShaderStage::Fragment, fragment) {
            Ok(s) => s,
            Err(e) => {
                gl.delete_shader(&vert_shader);
                return Err(e);
            }
        };

        match link_program(gl, &vert_shader, &frag_shader) {
            Ok(program) => Ok(Self {
                program,
                vert_shader,
                frag_shader,
            }),
            Err(e) => {
                gl.delete_shader(&vert_shader);
                gl.delete_shader(&frag_shader);
                Err(e)
            }
        }
    }

    /// Releases the program and its stages.
    pub fn delete(self, gl: &C) {
        gl.delete_program(&self.program);
        gl.delete_shader(&self.vert_shader);
        gl.delete_shader(&self.frag_shader);
    }
}

fn fmt_log(log: Option<String>) -> String {
    log.unwrap_or_default()
        .trim_end_matches('\x00')
        .trim_end()
        .to_owned()
}

/// compile_shader compiles either the vertex or fragment shader of a program.
fn compile_shader<C: GraphicsContext>(
    gl: &C,
    stage: ShaderStage,
    source: &str,
) -> Result<C::Shader, Error> {
    let shader = gl
        .create_shader(stage)
        .ok_or(ResourceError::Allocation("shader"))?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);

    if gl.compile_status(&shader) {
        Ok(shader)
    } else {
        let log = fmt_log(gl.shader_info_log(&shader));
        gl.delete_shader(&shader);
        Err(Error::Compile { stage, log })
    }
}

/// link_program links the two shaders to form a program.
fn link_program<C: GraphicsContext>(
    gl: &C,
    vert_shader: &C::Shader,
    frag_shader: &C::Shader,
) -> Result<C::Program, Error> {
    let program = gl
        .create_program()
        .ok_or(ResourceError::Allocation("program"))?;

    gl.attach_shader(&program, vert_shader);
    gl.attach_shader(&program, frag_shader);
    gl.link_program(&program);

    if gl.link_status(&program) {
        Ok(program)
    } else {
        let log = fmt_log(gl.program_info_log(&program));
        gl.delete_program(&program);
        Err(Error::Link(log))
    }
}
