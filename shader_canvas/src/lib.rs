// SPDX-FileCopyrightText: 2021 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

#![warn(missing_docs)]
#![crate_name = "shader_canvas"]

//! # Shader Canvas
//!
//! [`shader_canvas`][`crate`] renders a GLSL fragment shader onto a canvas with
//! [WebGL](https://rustwasm.github.io/wasm-bindgen/api/web_sys/struct.WebGlRenderingContext.html)/
//! [WebGL2](https://rustwasm.github.io/wasm-bindgen/api/web_sys/struct.WebGl2RenderingContext.html),
//! either covering the whole canvas or drawing one unit quad per instance so many UI elements can
//! be decorated with a single draw call.
//!
//! The [`Renderer`] only talks to the graphics API through [`GraphicsContext`] and to the page
//! through [`Host`]. In the browser, `web::ShaderCanvas` wires both up.

mod attribute;
mod context;
mod error;
mod host;
mod options;
mod renderer;
mod shader;
mod texture;
mod uniform;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use attribute::*;
pub use context::*;
pub use error::*;
pub use host::*;
pub use options::*;
pub use renderer::*;
pub use shader::{
    FULLSCREEN_ATTRIBUTE, INSTANCED_ATTRIBUTE, RESOLUTION_UNIFORM, TIME_UNIFORM,
};
pub use texture::*;
pub use uniform::*;
