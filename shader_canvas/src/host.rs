// SPDX-FileCopyrightText: 2021 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::context::GraphicsContext;
use crate::options::ContextAttributes;
use glam::{DVec2, UVec2};
use std::fmt;

/// Generation of WebGL to request from the canvas.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContextGeneration {
    /// WebGL 1, no instancing.
    WebGl1,
    /// WebGL 2.
    WebGl2,
}

impl ContextGeneration {
    /// Name of context for the `getContext` call.
    pub fn context_name(self) -> &'static str {
        match self {
            Self::WebGl1 => "webgl",
            Self::WebGl2 => "webgl2",
        }
    }
}

impl fmt::Display for ContextGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::WebGl1 => "WebGL",
            Self::WebGl2 => "WebGL2",
        })
    }
}

/// Handle of a scheduled animation frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameRequest(pub i32);

/// The canvas being drawn on.
pub trait Surface {
    /// Displayed size in CSS pixels.
    fn client_size(&self) -> DVec2;
    /// Real pixels per CSS pixel.
    fn device_pixel_ratio(&self) -> f64;
    /// Size of the backing store in real pixels.
    fn size(&self) -> UVec2;
    /// Resizes the backing store.
    fn set_size(&self, size: UVec2);
}

/// Which canvas to draw on.
pub enum SurfaceTarget<S> {
    /// This exact canvas.
    Surface(S),
    /// The canvas with this id (or matching this selector).
    Key(String),
    /// The first canvas on the page.
    First,
}

impl<S> Default for SurfaceTarget<S> {
    fn default() -> Self {
        Self::First
    }
}

/// The page a [`Renderer`][`crate::Renderer`] lives in. Notifications the host observes after
/// [`Host::observe`] must be forwarded to the renderer's inbound methods:
///
/// | host event              | renderer method                                        |
/// |-------------------------|--------------------------------------------------------|
/// | animation frame         | [`frame`][`crate::Renderer::frame`]                    |
/// | canvas resized          | [`resize`][`crate::Renderer::resize`]                  |
/// | `webglcontextlost`      | [`context_lost`][`crate::Renderer::context_lost`]      |
/// | `webglcontextrestored`  | [`context_restored`][`crate::Renderer::context_restored`] |
pub trait Host {
    /// Canvas type.
    type Surface: Surface;
    /// Graphics context type.
    type Context: GraphicsContext;

    /// Finds a canvas by `key`, or the first canvas if `key` is [`None`].
    fn find_surface(&self, key: Option<&str>) -> Option<Self::Surface>;

    /// Acquires a context. Returns `Ok(None)` if the generation is unsupported and `Err` with a
    /// message if acquisition threw.
    fn create_context(
        &self,
        surface: &Self::Surface,
        generation: ContextGeneration,
        attributes: &ContextAttributes,
    ) -> Result<Option<Self::Context>, String>;

    /// Milliseconds on the same clock as [`Renderer::frame`][`crate::Renderer::frame`]
    /// timestamps.
    fn now(&self) -> f64;

    /// Schedules one animation frame.
    fn request_frame(&self) -> FrameRequest;

    /// Cancels a scheduled animation frame.
    fn cancel_frame(&self, request: FrameRequest);

    /// Starts forwarding resize and context loss/restoration notifications for `surface`.
    fn observe(&self, surface: &Self::Surface);

    /// Stops forwarding notifications for `surface`.
    fn unobserve(&self, surface: &Self::Surface);
}
