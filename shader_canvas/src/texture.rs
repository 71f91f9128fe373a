// SPDX-FileCopyrightText: 2021 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::context::GraphicsContext;

/// A texture that stays bound to one texture unit for the life of the renderer. Created by the
/// first [`Renderer::set_texture`][`crate::Renderer::set_texture`] of a sampler, then reused.
pub struct TextureBinding<C: GraphicsContext> {
    /// Texture unit, matching the sampler's [`UniformSlot::unit`][`crate::UniformSlot::unit`].
    pub unit: u32,
    pub(crate) texture: C::Texture,
}

impl<C: GraphicsContext> TextureBinding<C> {
    /// Allocates a texture for `unit`, binding it with the fixed clamp/linear sampling policy.
    pub(crate) fn new(gl: &C, unit: u32) -> Option<Self> {
        let texture = gl.create_texture()?;
        gl.bind_texture(unit, Some(&texture));
        gl.clamp_linear();
        Some(Self { unit, texture })
    }

    /// Replaces the contents with `image`.
    pub(crate) fn upload(&self, gl: &C, image: &C::Image) -> Result<(), String> {
        gl.bind_texture(self.unit, Some(&self.texture));
        gl.tex_image(image)
    }

    pub(crate) fn delete(self, gl: &C) {
        gl.delete_texture(&self.texture);
    }
}
