// SPDX-FileCopyrightText: 2021 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::attribute::AttributeLayout;
use crate::host::SurfaceTarget;
use crate::uniform::UniformType;
use linear_map::LinearMap;
use serde::{Deserialize, Serialize};

/// How the fragment shader is drawn.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// One triangle covering the whole canvas.
    #[default]
    Fullscreen,
    /// One unit quad per instance. Requires WebGL2.
    Instanced,
}

/// GPU preference passed to `getContext`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerPreference {
    /// Let the browser decide.
    Default,
    /// Prefer the discrete GPU.
    #[default]
    HighPerformance,
    /// Prefer the integrated GPU.
    LowPower,
}

/// Attributes passed to `getContext`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContextAttributes {
    /// Canvas has an alpha channel.
    pub alpha: bool,
    /// Built in multisample antialiasing.
    pub antialias: bool,
    /// Colors are premultiplied by alpha.
    pub premultiplied_alpha: bool,
    /// Keep the drawing buffer between frames.
    pub preserve_drawing_buffer: bool,
    /// GPU preference.
    pub power_preference: PowerPreference,
}

impl Default for ContextAttributes {
    fn default() -> Self {
        Self {
            alpha: true,
            antialias: true,
            premultiplied_alpha: true,
            preserve_drawing_buffer: false,
            power_preference: PowerPreference::HighPerformance,
        }
    }
}

/// Called with the new CSS width and height whenever the canvas is resized.
pub type ResizeCallback = Box<dyn FnMut(f64, f64)>;

/// Everything needed to construct a [`Renderer`][`crate::Renderer`].
pub struct RendererOptions<S> {
    /// Canvas to draw on.
    pub target: SurfaceTarget<S>,
    /// GLSL fragment shader source.
    pub fragment: String,
    /// GLSL vertex shader source. Defaults to a built-in shader for `mode`.
    pub vertex: Option<String>,
    /// Fullscreen or instanced.
    pub mode: RenderMode,
    /// Required in instanced mode.
    pub num_instances: Option<u32>,
    /// Required in instanced mode.
    pub attributes: Option<AttributeLayout>,
    /// Custom uniforms, by name.
    pub uniforms: LinearMap<String, UniformType>,
    /// Called after the backing store is resized.
    pub on_resize: Option<ResizeCallback>,
    /// Passed to `getContext`.
    pub context_attributes: ContextAttributes,
}

impl<S> RendererOptions<S> {
    /// Options for drawing `fragment` over the whole canvas.
    pub fn fullscreen(fragment: impl Into<String>) -> Self {
        Self {
            target: SurfaceTarget::First,
            fragment: fragment.into(),
            vertex: None,
            mode: RenderMode::Fullscreen,
            num_instances: None,
            attributes: None,
            uniforms: LinearMap::new(),
            on_resize: None,
            context_attributes: ContextAttributes::default(),
        }
    }

    /// Options for drawing `fragment` on `num_instances` quads laid out by `attributes`.
    pub fn instanced(
        fragment: impl Into<String>,
        num_instances: u32,
        attributes: AttributeLayout,
    ) -> Self {
        Self {
            mode: RenderMode::Instanced,
            num_instances: Some(num_instances),
            attributes: Some(attributes),
            ..Self::fullscreen(fragment)
        }
    }

    /// Draws on this exact canvas.
    pub fn with_surface(mut self, surface: S) -> Self {
        self.target = SurfaceTarget::Surface(surface);
        self
    }

    /// Draws on the canvas with this id or selector.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.target = SurfaceTarget::Key(key.into());
        self
    }

    /// Replaces the built-in vertex shader.
    pub fn with_vertex(mut self, vertex: impl Into<String>) -> Self {
        self.vertex = Some(vertex.into());
        self
    }

    /// Declares a custom uniform.
    pub fn with_uniform(mut self, name: impl Into<String>, ty: UniformType) -> Self {
        self.uniforms.insert(name.into(), ty);
        self
    }

    /// Sets the resize callback.
    pub fn on_resize(mut self, callback: impl FnMut(f64, f64) + 'static) -> Self {
        self.on_resize = Some(Box::new(callback));
        self
    }

    /// Overrides the context attributes.
    pub fn with_context_attributes(mut self, attributes: ContextAttributes) -> Self {
        self.context_attributes = attributes;
        self
    }
}
