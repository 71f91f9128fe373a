// SPDX-FileCopyrightText: 2021 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::attribute::AttributeLayout;
use crate::context::{BufferUsage, GraphicsContext};
use crate::error::{Error, ResourceError, Result};
use crate::host::{ContextGeneration, FrameRequest, Host, Surface, SurfaceTarget};
use crate::options::{ContextAttributes, RenderMode, RendererOptions, ResizeCallback};
use crate::shader::{
    default_vertex, Program, FULLSCREEN_ATTRIBUTE, FULLSCREEN_TRIANGLE, INSTANCED_ATTRIBUTE,
    RESOLUTION_UNIFORM, TIME_UNIFORM, UNIT_QUAD, UNIT_QUAD_VERTICES,
};
use crate::texture::TextureBinding;
use crate::uniform::{UniformSlot, UniformValue, Uniforms};
use bytemuck::Pod;
use glam::{DVec2, UVec2};
use linear_map::LinearMap;
use log::{debug, warn};
use std::cell::RefCell;

type Location<H> = <<H as Host>::Context as GraphicsContext>::UniformLocation;

/// Whether a frame is scheduled.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameState {
    /// No frame scheduled.
    Idle,
    /// Exactly one frame scheduled.
    Running(FrameRequest),
    /// [`Renderer::dispose`] was called. Terminal.
    Disposed,
}

/// Buffers that feed the vertex shader.
enum Geometry<C: GraphicsContext> {
    Fullscreen {
        triangle: C::Buffer,
    },
    Instanced {
        quad: C::Buffer,
        instances: C::Buffer,
        num_instances: u32,
    },
}

impl<C: GraphicsContext> Geometry<C> {
    /// One triangle covering the canvas, bound to [`FULLSCREEN_ATTRIBUTE`].
    fn fullscreen(gl: &C, program: &C::Program) -> Result<Self> {
        let triangle = gl
            .create_buffer()
            .ok_or(ResourceError::Allocation("buffer"))?;
        gl.bind_array_buffer(Some(&triangle));
        gl.buffer_data(&FULLSCREEN_TRIANGLE, BufferUsage::Static);
        bind_attribute(gl, program, FULLSCREEN_ATTRIBUTE, 2);
        Ok(Self::Fullscreen { triangle })
    }

    /// A unit quad bound to [`INSTANCED_ATTRIBUTE`] plus an unallocated interleaved instance
    /// buffer described by `layout`.
    fn instanced(
        gl: &C,
        program: &C::Program,
        num_instances: u32,
        layout: &AttributeLayout,
    ) -> Result<Self> {
        let quad = gl
            .create_buffer()
            .ok_or(ResourceError::Allocation("buffer"))?;
        gl.bind_array_buffer(Some(&quad));
        gl.buffer_data(&UNIT_QUAD, BufferUsage::Static);
        bind_attribute(gl, program, INSTANCED_ATTRIBUTE, 2);

        let Some(instances) = gl.create_buffer() else {
            gl.delete_buffer(&quad);
            return Err(ResourceError::Allocation("buffer").into());
        };
        gl.bind_array_buffer(Some(&instances));

        // Unresolved attributes still take up space, so the caller's layout never shifts.
        let stride = layout.stride() as i32;
        for (name, desc, offset) in layout.offsets() {
            let Some(location) = gl.attrib_location(program, name) else {
                warn!("attribute {} does not exist or is not in use", name);
                continue;
            };
            gl.enable_vertex_attrib_array(location);
            gl.vertex_attrib_pointer(location, desc.size as i32, stride, offset as i32);
            if desc.instanced {
                gl.vertex_attrib_divisor(location, 1);
            }
        }

        Ok(Self::Instanced {
            quad,
            instances,
            num_instances,
        })
    }

    fn delete(self, gl: &C) {
        match self {
            Self::Fullscreen { triangle } => gl.delete_buffer(&triangle),
            Self::Instanced {
                quad, instances, ..
            } => {
                gl.delete_buffer(&quad);
                gl.delete_buffer(&instances);
            }
        }
    }
}

/// Points a tightly packed, per vertex attribute at the bound buffer.
fn bind_attribute<C: GraphicsContext>(gl: &C, program: &C::Program, name: &str, size: i32) {
    match gl.attrib_location(program, name) {
        Some(location) => {
            gl.enable_vertex_attrib_array(location);
            gl.vertex_attrib_pointer(location, size, 0, 0);
        }
        None => warn!("attribute {} does not exist or is not in use", name),
    }
}

/// Tries each allowed generation, newest first. Instancing requires WebGL2.
fn create_context<H: Host>(
    host: &H,
    surface: &H::Surface,
    mode: RenderMode,
    attributes: &ContextAttributes,
) -> Result<H::Context> {
    let generations: &[ContextGeneration] = match mode {
        RenderMode::Fullscreen => &[ContextGeneration::WebGl2, ContextGeneration::WebGl1],
        RenderMode::Instanced => &[ContextGeneration::WebGl2],
    };

    let mut error = None;
    for &generation in generations {
        match host.create_context(surface, generation, attributes) {
            Ok(Some(gl)) => return Ok(gl),
            Ok(None) => debug!("{} unsupported", generation),
            Err(e) => {
                debug!("error initializing {}: {}", generation, e);
                error = Some(e);
            }
        }
    }

    let oldest = generations
        .last()
        .copied()
        .unwrap_or(ContextGeneration::WebGl1);
    Err(ResourceError::Unsupported(error.unwrap_or_else(|| format!("{} unsupported", oldest))).into())
}

/// Draws a fragment shader onto a canvas, either fullscreen or once per instance.
///
/// Host notifications ([`frame`][`Self::frame`], [`resize`][`Self::resize`],
/// [`context_lost`][`Self::context_lost`], [`context_restored`][`Self::context_restored`])
/// must be forwarded by whoever owns the renderer; see [`Host`].
pub struct Renderer<H: Host> {
    host: H,
    surface: H::Surface,
    gl: H::Context,
    mode: RenderMode,
    layout: Option<AttributeLayout>,
    program: Option<Program<H::Context>>,
    geometry: Option<Geometry<H::Context>>,
    time_uniform: Option<Location<H>>,
    resolution_uniform: Option<Location<H>>,
    slots: LinearMap<String, UniformSlot<Location<H>>>,
    /// Keyed by texture unit.
    textures: LinearMap<u32, TextureBinding<H::Context>>,
    uniforms: Uniforms,
    state: FrameState,
    /// [`Host::now`] at construction.
    epoch: f64,
    frame_count: u64,
    context_lost: bool,
    on_resize: Option<ResizeCallback>,
}

impl<H: Host> Renderer<H> {
    /// Acquires a context on the target canvas, builds the program, sets up buffers for the
    /// mode, resolves uniforms, subscribes to host notifications and sizes the canvas. Nothing
    /// is left allocated if this fails.
    pub fn new(host: H, options: RendererOptions<H::Surface>) -> Result<Self> {
        let RendererOptions {
            target,
            fragment,
            vertex,
            mode,
            num_instances,
            attributes,
            uniforms: declared,
            on_resize,
            context_attributes,
        } = options;

        // Validate before touching the host.
        let instancing = match mode {
            RenderMode::Fullscreen => None,
            RenderMode::Instanced => {
                let num_instances = num_instances.filter(|&n| n > 0).ok_or_else(|| {
                    Error::Configuration("instanced mode requires num_instances".into())
                })?;
                let layout = attributes.ok_or_else(|| {
                    Error::Configuration("instanced mode requires attributes".into())
                })?;
                layout.validate()?;
                Some((num_instances, layout))
            }
        };

        let surface = match target {
            SurfaceTarget::Surface(surface) => Some(surface),
            SurfaceTarget::Key(key) => host.find_surface(Some(&key)),
            SurfaceTarget::First => host.find_surface(None),
        }
        .ok_or(ResourceError::SurfaceNotFound)?;

        let gl = create_context(&host, &surface, mode, &context_attributes)?;
        debug!("created {} context", gl.generation());

        let vertex = vertex
            .as_deref()
            .unwrap_or_else(|| default_vertex(mode, &fragment));
        let program = Program::new(&gl, vertex, &fragment)?;

        let geometry = match &instancing {
            None => Geometry::fullscreen(&gl, &program.program),
            Some((num_instances, layout)) => {
                Geometry::instanced(&gl, &program.program, *num_instances, layout)
            }
        };
        let geometry = match geometry {
            Ok(geometry) => geometry,
            Err(e) => {
                program.delete(&gl);
                return Err(e);
            }
        };

        let uniforms = Uniforms::default();
        let mut slots = LinearMap::new();
        let mut next_unit = 0;
        for (name, &ty) in declared.iter() {
            uniforms.declare(name, ty);
            let Some(location) = gl.uniform_location(&program.program, name) else {
                warn!("uniform {} does not exist or is not in use", name);
                continue;
            };
            let unit = ty.is_sampler().then(|| {
                let unit = next_unit;
                next_unit += 1;
                unit
            });
            slots.insert(name.clone(), UniformSlot { ty, location, unit });
        }

        // Standard uniforms are optional in the shader, so don't warn.
        let time_uniform = gl.uniform_location(&program.program, TIME_UNIFORM);
        let resolution_uniform = gl.uniform_location(&program.program, RESOLUTION_UNIFORM);

        let epoch = host.now();
        let mut renderer = Self {
            host,
            surface,
            gl,
            mode,
            layout: instancing.map(|(_, layout)| layout),
            program: Some(program),
            geometry: Some(geometry),
            time_uniform,
            resolution_uniform,
            slots,
            textures: LinearMap::new(),
            uniforms,
            state: FrameState::Idle,
            epoch,
            frame_count: 0,
            context_lost: false,
            on_resize,
        };

        renderer.host.observe(&renderer.surface);
        renderer.resize();
        Ok(renderer)
    }

    /// Starts the frame loop. Does nothing if already running or disposed.
    pub fn start(&mut self) {
        if self.state == FrameState::Idle {
            self.state = FrameState::Running(self.host.request_frame());
        }
    }

    /// Stops the frame loop, cancelling the scheduled frame. [`Renderer::start`] resumes it.
    pub fn stop(&mut self) {
        if let FrameState::Running(request) = self.state {
            self.host.cancel_frame(request);
            self.state = FrameState::Idle;
        }
    }

    /// Animation frame callback. `timestamp` is in milliseconds on the [`Host::now`] clock.
    /// Draws and schedules the next frame, unless the loop isn't running.
    pub fn frame(&mut self, timestamp: f64) {
        if !self.is_running() {
            return;
        }
        self.draw(timestamp);
        self.frame_count += 1;
        self.state = FrameState::Running(self.host.request_frame());
    }

    fn draw(&self, timestamp: f64) {
        let (Some(program), Some(geometry)) = (&self.program, &self.geometry) else {
            return;
        };
        let gl = &self.gl;
        gl.use_program(Some(&program.program));

        if let Some(location) = &self.time_uniform {
            let seconds = ((timestamp - self.epoch) * (1.0 / 1000.0)) as f32;
            gl.uniform(location, UniformValue::Float(seconds));
        }
        if let Some(location) = &self.resolution_uniform {
            let resolution = gl.drawing_buffer_size().as_vec2();
            gl.uniform(location, UniformValue::Vec2(resolution));
        }

        // Unset values keep whatever the program was last given.
        for (name, slot) in self.slots.iter() {
            if let Some(value) = self.uniforms.get(name) {
                gl.uniform(&slot.location, value);
            }
        }

        match geometry {
            Geometry::Fullscreen { .. } => gl.draw_triangles(3),
            Geometry::Instanced { num_instances, .. } => {
                gl.draw_triangles_instanced(UNIT_QUAD_VERTICES, *num_instances as i32)
            }
        }
    }

    /// Matches the backing store to the displayed size times the device pixel ratio. If it
    /// changed, resets the viewport and calls the resize callback with the displayed size.
    pub fn resize(&mut self) {
        if let Some(client) = self.resize_backing() {
            if let Some(on_resize) = &mut self.on_resize {
                on_resize(client.x, client.y);
            }
        }
    }

    /// Like [`Renderer::resize`] on a shared renderer, but calls the resize callback after the
    /// borrow is released so the callback can use the renderer (e.g. [`Renderer::set_data`]
    /// with new rects). Returns true if the backing store changed.
    pub fn resize_shared(renderer: &RefCell<Self>) -> bool {
        let (client, mut on_resize) = {
            let Ok(mut renderer) = renderer.try_borrow_mut() else {
                return false;
            };
            let Some(client) = renderer.resize_backing() else {
                return false;
            };
            (client, renderer.on_resize.take())
        };

        if let Some(callback) = &mut on_resize {
            callback(client.x, client.y);
        }

        // Put it back unless the callback disposed the renderer.
        if let Ok(mut renderer) = renderer.try_borrow_mut() {
            if !renderer.is_disposed() && renderer.on_resize.is_none() {
                renderer.on_resize = on_resize;
            }
        }
        true
    }

    /// Resizes the backing store, returning the displayed size if it changed.
    fn resize_backing(&mut self) -> Option<DVec2> {
        if self.is_disposed() {
            return None;
        }

        let client = self.surface.client_size().max(DVec2::ZERO);
        let ratio = self.surface.device_pixel_ratio();
        let size = UVec2::new(
            (client.x * ratio).round() as u32,
            (client.y * ratio).round() as u32,
        );
        if size == self.surface.size() {
            return None;
        }

        self.surface.set_size(size);
        self.gl.viewport(self.gl.drawing_buffer_size());
        Some(client)
    }

    /// The host lost the context. Stops the loop. The default handling (never restoring) must
    /// be suppressed by the host.
    pub fn context_lost(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.stop();
        self.context_lost = true;
        warn!("{} context lost", self.gl.generation());
    }

    /// The host restored the context. Resources are not recreated, so the renderer stays inert
    /// and must be replaced by a new one.
    pub fn context_restored(&mut self) {
        warn!(
            "{} context restored; resources were not recreated",
            self.gl.generation()
        );
    }

    /// Replaces the contents of the instance buffer with `data`, which should hold
    /// `num_instances * layout.stride_components()` floats in layout order. Does nothing unless
    /// instanced or if disposed.
    pub fn set_data(&mut self, data: &[f32]) {
        let Some(Geometry::Instanced {
            instances,
            num_instances,
            ..
        }) = &self.geometry
        else {
            return;
        };

        if cfg!(debug_assertions) {
            let expected = *num_instances as usize
                * self
                    .layout
                    .as_ref()
                    .map_or(0, AttributeLayout::stride_components);
            if data.len() != expected {
                debug!("instance data has {} floats, expected {}", data.len(), expected);
            }
        }

        self.gl.bind_array_buffer(Some(instances));
        self.gl.buffer_data(data, BufferUsage::Dynamic);
    }

    /// Like [`Renderer::set_data`] but takes structs of [`prim@f32`]s laid out like the
    /// attributes, e.g. `#[repr(C)]` + [`Pod`].
    pub fn set_instances<T: Pod>(&mut self, instances: &[T]) {
        match bytemuck::try_cast_slice::<T, f32>(instances) {
            Ok(data) => self.set_data(data),
            Err(e) => warn!("instances are not made of floats: {}", e),
        }
    }

    /// Uploads `image` into the texture sampled by the `sampler2D` uniform `name`, allocating
    /// the texture on first use. Does nothing if `name` isn't a resolved sampler or if disposed.
    pub fn set_texture(&mut self, name: &str, image: &<H::Context as GraphicsContext>::Image) {
        let Some(program) = &self.program else {
            return;
        };
        let Some((unit, location)) = self
            .slots
            .get(name)
            .and_then(|slot| Some((slot.unit?, &slot.location)))
        else {
            warn!("{} is not a sampler2D uniform", name);
            return;
        };

        let gl = &self.gl;
        if !self.textures.contains_key(&unit) {
            let Some(binding) = TextureBinding::new(gl, unit) else {
                warn!("could not create texture for {}", name);
                return;
            };
            self.textures.insert(unit, binding);

            // Point the sampler at its unit once; the texture stays bound there.
            gl.use_program(Some(&program.program));
            gl.uniform(location, UniformValue::Int(unit as i32));
        }

        if let Some(binding) = self.textures.get(&unit) {
            if let Err(e) = binding.upload(gl, image) {
                warn!("could not upload texture for {}: {}", name, e);
            }
        }
    }

    /// Stops the loop, unsubscribes from the host and releases every GPU object. Later calls to
    /// anything but accessors do nothing.
    pub fn dispose(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.stop();
        self.state = FrameState::Disposed;
        self.host.unobserve(&self.surface);

        let gl = &self.gl;
        for (_, binding) in self.textures.drain() {
            binding.delete(gl);
        }
        if let Some(geometry) = self.geometry.take() {
            geometry.delete(gl);
        }
        if let Some(program) = self.program.take() {
            program.delete(gl);
        }
        self.slots.clear();
        self.time_uniform = None;
        self.resolution_uniform = None;
    }

    /// Live uniform values. Clones share values with the renderer.
    pub fn uniforms(&self) -> Uniforms {
        self.uniforms.clone()
    }

    /// Resolved custom uniforms, in declaration order.
    pub fn uniform_slots(&self) -> impl Iterator<Item = (&str, &UniformSlot<Location<H>>)> {
        self.slots.iter().map(|(name, slot)| (name.as_str(), slot))
    }

    /// Fullscreen or instanced.
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Number of instances drawn, if instanced.
    pub fn num_instances(&self) -> Option<u32> {
        match &self.geometry {
            Some(Geometry::Instanced { num_instances, .. }) => Some(*num_instances),
            _ => None,
        }
    }

    /// Instance buffer layout, if instanced.
    pub fn layout(&self) -> Option<&AttributeLayout> {
        self.layout.as_ref()
    }

    /// Instance buffer stride in bytes, if instanced.
    pub fn stride(&self) -> Option<usize> {
        self.layout.as_ref().map(AttributeLayout::stride)
    }

    /// The canvas.
    pub fn surface(&self) -> &H::Surface {
        &self.surface
    }

    /// The context's WebGL generation.
    pub fn generation(&self) -> ContextGeneration {
        self.gl.generation()
    }

    /// Current frame loop state.
    pub fn frame_state(&self) -> FrameState {
        self.state
    }

    /// Returns true if a frame is scheduled.
    pub fn is_running(&self) -> bool {
        matches!(self.state, FrameState::Running(_))
    }

    /// Returns true after [`Renderer::dispose`].
    pub fn is_disposed(&self) -> bool {
        self.state == FrameState::Disposed
    }

    /// Returns true once the context was lost. Never resets.
    pub fn is_context_lost(&self) -> bool {
        self.context_lost
    }

    /// Frames drawn so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl<H: Host> Drop for Renderer<H> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeDesc;
    use crate::context::ShaderStage;
    use crate::mock::{Call, MockHost, MockImage, MockState};
    use crate::uniform::UniformType;
    use glam::{Vec2, Vec4};
    use std::cell::OnceCell;
    use std::rc::{Rc, Weak};

    const FRAGMENT: &str = "precision mediump float;
uniform float u_time;
uniform vec2 u_resolution;
void main() {
    gl_FragColor = vec4(gl_FragCoord.xy / u_resolution, sin(u_time), 1.0);
}
";

    const INSTANCED_FRAGMENT: &str = "#version 300 es
precision mediump float;
uniform float u_time;
in vec2 v_uv;
out vec4 color;
void main() {
    color = vec4(v_uv, sin(u_time), 1.0);
}
";

    const INSTANCED_VERTEX: &str = "#version 300 es
uniform vec2 u_resolution;
in vec2 a_quad;
in vec4 a_rect;
in vec4 a_color;
out vec2 v_uv;
void main() {
    v_uv = a_quad;
    gl_Position = vec4(a_rect.xy + a_quad * a_rect.zw + a_color.xy, 0.0, 1.0);
}
";

    fn fullscreen(state: &Rc<MockState>) -> Renderer<MockHost> {
        Renderer::new(MockHost::new(state), RendererOptions::fullscreen(FRAGMENT)).unwrap()
    }

    fn rects(num_instances: u32) -> RendererOptions<crate::mock::MockCanvas> {
        RendererOptions::instanced(
            INSTANCED_FRAGMENT,
            num_instances,
            AttributeLayout::new().with("a_rect", AttributeDesc::instanced(4)),
        )
    }

    #[test]
    fn test_instanced_requires_configuration() {
        let state = MockState::new();
        state.add_canvas("canvas", 800.0, 600.0);

        let mut missing_count = rects(3);
        missing_count.num_instances = None;
        let mut zero_count = rects(3);
        zero_count.num_instances = Some(0);
        let mut missing_attributes = rects(3);
        missing_attributes.attributes = None;

        for options in [missing_count, zero_count, missing_attributes] {
            let result = Renderer::new(MockHost::new(&state), options);
            assert!(matches!(result, Err(Error::Configuration(_))));
        }

        // Nothing was touched.
        assert_eq!(state.live_objects(), 0);
        assert!(state.calls().is_empty());
        assert!(!state.is_observed());
    }

    #[test]
    fn test_surface_not_found() {
        let state = MockState::new();
        let result = Renderer::new(MockHost::new(&state), RendererOptions::fullscreen(FRAGMENT));
        assert!(matches!(
            result,
            Err(Error::Resource(ResourceError::SurfaceNotFound))
        ));

        state.add_canvas("canvas", 800.0, 600.0);
        let result = Renderer::new(
            MockHost::new(&state),
            RendererOptions::fullscreen(FRAGMENT).with_key("missing"),
        );
        assert!(matches!(
            result,
            Err(Error::Resource(ResourceError::SurfaceNotFound))
        ));
    }

    #[test]
    fn test_surface_target() {
        let state = MockState::new();
        state.add_canvas("first", 100.0, 100.0);
        state.add_canvas("second", 200.0, 50.0);
        let explicit = crate::mock::MockCanvas::new(64.0, 32.0);

        let by_key = Renderer::new(
            MockHost::new(&state),
            RendererOptions::fullscreen(FRAGMENT).with_key("second"),
        )
        .unwrap();
        assert_eq!(by_key.surface().size(), UVec2::new(200, 50));

        let first = fullscreen(&state);
        assert_eq!(first.surface().size(), UVec2::new(100, 100));

        let surface = Renderer::new(
            MockHost::new(&state),
            RendererOptions::fullscreen(FRAGMENT).with_surface(explicit),
        )
        .unwrap();
        assert_eq!(surface.surface().size(), UVec2::new(64, 32));
    }

    #[test]
    fn test_context_generations() {
        let state = MockState::new();
        state.add_canvas("canvas", 800.0, 600.0);
        state.webgl2.set(false);

        // Fullscreen falls back to WebGL.
        let renderer = fullscreen(&state);
        assert_eq!(renderer.generation(), ContextGeneration::WebGl1);
        drop(renderer);

        // Instancing doesn't.
        match Renderer::new(MockHost::new(&state), rects(3)) {
            Err(Error::Resource(ResourceError::Unsupported(message))) => {
                assert_eq!(message, "WebGL2 unsupported")
            }
            _ => panic!("expected unsupported"),
        }

        state.webgl1.set(false);
        assert!(matches!(
            Renderer::new(MockHost::new(&state), RendererOptions::fullscreen(FRAGMENT)),
            Err(Error::Resource(ResourceError::Unsupported(_)))
        ));
        assert_eq!(state.live_objects(), 0);
    }

    #[test]
    fn test_compile_and_link_errors() {
        let state = MockState::new();
        state.add_canvas("canvas", 800.0, 600.0);

        let result = Renderer::new(
            MockHost::new(&state),
            RendererOptions::fullscreen("#error missing semicolon\nvoid main() {}"),
        );
        match result {
            Err(Error::Compile { stage, log }) => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(log.contains("missing semicolon"));
            }
            _ => panic!("expected compile error"),
        }

        state.fail_link.set(true);
        let result = Renderer::new(MockHost::new(&state), RendererOptions::fullscreen(FRAGMENT));
        assert!(matches!(result, Err(Error::Link(_))));

        assert_eq!(state.live_objects(), 0);
        assert!(!state.is_observed());
    }

    #[test]
    fn test_fullscreen_frame() {
        let state = MockState::new();
        state.add_canvas("canvas", 800.0, 600.0);
        let mut renderer = fullscreen(&state);
        assert_eq!(renderer.mode(), RenderMode::Fullscreen);
        assert!(state.is_observed());

        renderer.start();
        state.clear_calls();
        assert!(state.tick(&mut renderer, 16.0));

        assert_eq!(state.draws(), [Call::Draw { count: 3 }]);
        match state.uniform_writes(TIME_UNIFORM)[..] {
            [UniformValue::Float(time)] => assert!(time > 0.0),
            ref other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            state.uniform_writes(RESOLUTION_UNIFORM),
            [UniformValue::Vec2(Vec2::new(800.0, 600.0))]
        );
        assert_eq!(renderer.frame_count(), 1);
        assert!(state.frame_pending());
    }

    #[test]
    fn test_fullscreen_triangle_setup() {
        let state = MockState::new();
        state.add_canvas("canvas", 800.0, 600.0);
        let _renderer = fullscreen(&state);

        let calls = state.calls();
        assert!(calls.iter().any(|c| matches!(
            c,
            Call::BufferData {
                len: 6,
                usage: BufferUsage::Static,
                ..
            }
        )));
        assert!(calls.iter().any(|c| matches!(
            c,
            Call::AttribPointer {
                location: 0,
                size: 2,
                stride: 0,
                offset: 0,
                ..
            }
        )));
    }

    #[test]
    fn test_start_stop() {
        let state = MockState::new();
        state.add_canvas("canvas", 800.0, 600.0);
        let mut renderer = fullscreen(&state);

        // Not running until started.
        assert!(!state.tick(&mut renderer, 16.0));
        renderer.frame(5000.0);
        assert_eq!(renderer.frame_count(), 0);

        renderer.start();
        renderer.start();
        assert!(state.tick(&mut renderer, 16.0));
        assert!(state.tick(&mut renderer, 16.0));
        assert_eq!(renderer.frame_count(), 2);

        renderer.stop();
        assert!(!renderer.is_running());
        for _ in 0..5 {
            assert!(!state.tick(&mut renderer, 16.0));
        }
        assert_eq!(renderer.frame_count(), 2);

        // Resumable.
        renderer.start();
        assert!(state.tick(&mut renderer, 16.0));
        assert_eq!(renderer.frame_count(), 3);
    }

    #[test]
    fn test_dispose() {
        let state = MockState::new();
        state.add_canvas("canvas", 800.0, 600.0);
        let fragment =
            INSTANCED_FRAGMENT.replace("in vec2 v_uv;", "in vec2 v_uv;\nuniform sampler2D u_image;");
        let mut renderer = Renderer::new(
            MockHost::new(&state),
            RendererOptions::instanced(
                fragment,
                2,
                AttributeLayout::new().with("a_rect", AttributeDesc::instanced(4)),
            )
            .with_uniform("u_image", UniformType::Sampler2d),
        )
        .unwrap();
        renderer.start();
        renderer.set_texture("u_image", &MockImage(1));
        assert!(state.live_objects() > 0);

        renderer.dispose();
        assert!(renderer.is_disposed());
        assert_eq!(state.live_objects(), 0);
        assert!(!state.is_observed());
        assert!(!state.frame_pending());

        renderer.dispose();
        assert_eq!(state.live_objects(), 0);

        // Everything else is inert.
        state.clear_calls();
        renderer.start();
        renderer.set_data(&[0.0; 8]);
        renderer.set_texture("u_image", &MockImage(2));
        renderer.resize();
        renderer.frame(9000.0);
        assert!(!renderer.is_running());
        assert!(state.calls().is_empty());
        assert_eq!(state.live_objects(), 0);
    }

    #[test]
    fn test_drop_disposes() {
        let state = MockState::new();
        state.add_canvas("canvas", 800.0, 600.0);
        let mut renderer = fullscreen(&state);
        renderer.start();
        drop(renderer);
        assert_eq!(state.live_objects(), 0);
        assert!(!state.frame_pending());
    }

    #[test]
    fn test_stride_ignores_unresolved_attributes() {
        let state = MockState::new();
        state.add_canvas("canvas", 800.0, 600.0);
        let layout = AttributeLayout::new()
            .with("a_rect", AttributeDesc::instanced(4))
            .with("a_missing", AttributeDesc::instanced(2))
            .with("a_color", AttributeDesc::instanced(4));
        let renderer = Renderer::new(
            MockHost::new(&state),
            RendererOptions::instanced(INSTANCED_FRAGMENT, 2, layout).with_vertex(INSTANCED_VERTEX),
        )
        .unwrap();

        assert_eq!(renderer.stride(), Some((4 + 2 + 4) * 4));

        let pointers: Vec<_> = state
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::AttribPointer {
                    location,
                    size,
                    stride,
                    offset,
                    ..
                } => Some((location, size, stride, offset)),
                _ => None,
            })
            .collect();
        // a_quad, then a_rect and a_color keep their offsets around the hole.
        assert_eq!(pointers, [(0, 2, 0, 0), (1, 4, 40, 0), (2, 4, 40, 24)]);

        let divisors = state
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::AttribDivisor { divisor: 1, .. }))
            .count();
        assert_eq!(divisors, 2);
    }

    #[test]
    fn test_instanced_frame() {
        let state = MockState::new();
        state.add_canvas("canvas", 800.0, 600.0);
        let mut renderer = Renderer::new(MockHost::new(&state), rects(3)).unwrap();
        assert_eq!(renderer.stride(), Some(16));
        assert_eq!(renderer.num_instances(), Some(3));

        state.clear_calls();
        renderer.set_data(&[1.0; 12]);
        assert!(matches!(
            state.calls()[..],
            [Call::BufferData {
                buffer: Some(_),
                len: 12,
                usage: BufferUsage::Dynamic,
            }]
        ));

        renderer.start();
        assert!(state.tick(&mut renderer, 16.0));
        assert_eq!(
            state.draws(),
            [Call::DrawInstanced {
                count: 6,
                instances: 3
            }]
        );

        // Typed instances go to the same buffer.
        state.clear_calls();
        renderer.set_instances(&[Vec4::ONE; 3]);
        assert!(matches!(
            state.calls()[..],
            [Call::BufferData { len: 12, .. }]
        ));
    }

    #[test]
    fn test_set_data_fullscreen_is_noop() {
        let state = MockState::new();
        state.add_canvas("canvas", 800.0, 600.0);
        let mut renderer = fullscreen(&state);
        state.clear_calls();
        renderer.set_data(&[1.0; 12]);
        assert!(state.calls().is_empty());
        assert_eq!(renderer.num_instances(), None);
    }

    #[test]
    fn test_resize() {
        let state = MockState::new();
        let canvas = state.add_canvas("canvas", 800.0, 600.0);
        let sizes = Rc::new(RefCell::new(Vec::new()));
        let sizes_clone = Rc::clone(&sizes);

        let mut renderer = Renderer::new(
            MockHost::new(&state),
            RendererOptions::fullscreen(FRAGMENT)
                .on_resize(move |w, h| sizes_clone.borrow_mut().push((w, h))),
        )
        .unwrap();
        assert_eq!(canvas.size(), UVec2::new(800, 600));
        assert_eq!(*sizes.borrow(), [(800.0, 600.0)]);

        sizes.borrow_mut().clear();
        state.clear_calls();
        canvas.set_client_size(400.0, 300.0);
        renderer.resize();
        assert_eq!(canvas.size(), UVec2::new(400, 300));
        assert_eq!(state.calls(), [Call::Viewport(UVec2::new(400, 300))]);
        assert_eq!(*sizes.borrow(), [(400.0, 300.0)]);

        // Unchanged.
        state.clear_calls();
        renderer.resize();
        assert!(state.calls().is_empty());
        assert_eq!(sizes.borrow().len(), 1);

        // Backing store accounts for device pixel ratio, callback gets CSS pixels.
        canvas.set_device_pixel_ratio(2.0);
        renderer.resize();
        assert_eq!(canvas.size(), UVec2::new(800, 600));
        assert_eq!(*sizes.borrow(), [(400.0, 300.0), (400.0, 300.0)]);
    }

    #[test]
    fn test_resize_callback_can_set_data() {
        type Shared = Rc<RefCell<Renderer<MockHost>>>;

        let state = MockState::new();
        let canvas = state.add_canvas("canvas", 800.0, 600.0);
        let slot: Rc<OnceCell<Weak<RefCell<Renderer<MockHost>>>>> = Rc::default();
        let accepted = Rc::new(RefCell::new(Vec::new()));

        let callback_slot = Rc::clone(&slot);
        let callback_accepted = Rc::clone(&accepted);
        let options = rects(1).on_resize(move |width, height| {
            // Unset during construction.
            let Some(renderer) = callback_slot.get().and_then(Weak::upgrade) else {
                return;
            };
            let ok = match renderer.try_borrow_mut() {
                Ok(mut renderer) => {
                    renderer.set_data(&[0.0, 0.0, width as f32, height as f32]);
                    true
                }
                Err(_) => false,
            };
            callback_accepted.borrow_mut().push(ok);
        });

        let renderer: Shared = Rc::new(RefCell::new(
            Renderer::new(MockHost::new(&state), options).unwrap(),
        ));
        assert!(slot.set(Rc::downgrade(&renderer)).is_ok());

        state.clear_calls();
        canvas.set_client_size(400.0, 300.0);
        assert!(Renderer::resize_shared(&renderer));
        assert_eq!(*accepted.borrow(), [true]);
        assert!(state.calls().iter().any(|c| matches!(
            c,
            Call::BufferData {
                len: 4,
                usage: BufferUsage::Dynamic,
                ..
            }
        )));

        // Unchanged size, no callback.
        assert!(!Renderer::resize_shared(&renderer));
        assert_eq!(accepted.borrow().len(), 1);

        // The callback survives for the next resize.
        canvas.set_client_size(200.0, 100.0);
        assert!(Renderer::resize_shared(&renderer));
        assert_eq!(*accepted.borrow(), [true, true]);
    }

    #[test]
    fn test_uniform_values() {
        let state = MockState::new();
        state.add_canvas("canvas", 800.0, 600.0);
        let fragment = "precision mediump float;
uniform vec2 u_mouse;
uniform int u_mode;
void main() {}
";
        let mut renderer = Renderer::new(
            MockHost::new(&state),
            RendererOptions::fullscreen(fragment)
                .with_uniform("u_mouse", UniformType::Vec2)
                .with_uniform("u_mode", UniformType::Int)
                .with_uniform("u_missing", UniformType::Float),
        )
        .unwrap();

        let names: Vec<_> = renderer.uniform_slots().map(|(n, _)| n).collect();
        assert_eq!(names, ["u_mouse", "u_mode"]);

        let uniforms = renderer.uniforms();
        // Declared but not in the program: writable, never sent.
        uniforms.set_float("u_missing", 1.0).unwrap();

        renderer.start();
        state.tick(&mut renderer, 16.0);
        assert_eq!(
            state.uniform_writes("u_mouse"),
            [UniformValue::Vec2(Vec2::ZERO)]
        );

        uniforms.set_vec2("u_mouse", Vec2::new(10.0, 20.0)).unwrap();
        uniforms.set_int("u_mode", 2).unwrap();
        state.tick(&mut renderer, 16.0);
        assert_eq!(
            state.uniform_writes("u_mouse").last(),
            Some(&UniformValue::Vec2(Vec2::new(10.0, 20.0)))
        );
        assert_eq!(
            state.uniform_writes("u_mode").last(),
            Some(&UniformValue::Int(2))
        );

        // Cleared values aren't sent, so the program keeps the last one.
        state.clear_calls();
        uniforms.clear("u_mouse").unwrap();
        state.tick(&mut renderer, 16.0);
        assert!(state.uniform_writes("u_mouse").is_empty());
        assert_eq!(state.uniform_writes("u_mode"), [UniformValue::Int(2)]);
        assert!(state.uniform_writes("u_missing").is_empty());
    }

    #[test]
    fn test_set_texture() {
        let state = MockState::new();
        state.add_canvas("canvas", 800.0, 600.0);
        let fragment = "precision mediump float;
uniform sampler2D u_image;
uniform sampler2D u_mask;
uniform float u_amount;
void main() {}
";
        let mut renderer = Renderer::new(
            MockHost::new(&state),
            RendererOptions::fullscreen(fragment)
                .with_uniform("u_image", UniformType::Sampler2d)
                .with_uniform("u_amount", UniformType::Float)
                .with_uniform("u_mask", UniformType::Sampler2d),
        )
        .unwrap();

        let units: Vec<_> = renderer.uniform_slots().map(|(_, s)| s.unit).collect();
        assert_eq!(units, [Some(0), None, Some(1)]);
        assert_eq!(renderer.uniforms().get("u_image"), None);

        let live = state.live_objects();
        state.clear_calls();
        renderer.set_texture("u_image", &MockImage(1));
        assert_eq!(state.live_objects(), live + 1);
        assert_eq!(state.uniform_writes("u_image"), [UniformValue::Int(0)]);

        // Sampling policy is set once, right after the new texture is bound.
        let sampling = |state: &MockState| -> Vec<_> {
            state
                .calls()
                .into_iter()
                .filter(|c| matches!(c, Call::ClampLinear { .. }))
                .collect()
        };
        let calls = state.calls();
        let bound = calls
            .iter()
            .position(|c| {
                matches!(
                    c,
                    Call::BindTexture {
                        unit: 0,
                        texture: Some(_)
                    }
                )
            })
            .unwrap();
        let Call::BindTexture { texture, .. } = calls[bound] else {
            unreachable!();
        };
        assert_eq!(calls[bound + 1], Call::ClampLinear { texture });
        assert_eq!(sampling(&state).len(), 1);

        let uploads = |state: &MockState| -> Vec<_> {
            state
                .calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::TexImage { texture, image } => Some((texture, image)),
                    _ => None,
                })
                .collect()
        };

        // Reuses the texture.
        renderer.set_texture("u_image", &MockImage(2));
        assert_eq!(state.live_objects(), live + 1);
        let images = uploads(&state);
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].0, images[1].0);
        assert_eq!(images[1].1, MockImage(2));
        assert_eq!(sampling(&state).len(), 1);

        renderer.set_texture("u_mask", &MockImage(3));
        assert_eq!(state.live_objects(), live + 2);
        assert_eq!(state.uniform_writes("u_mask"), [UniformValue::Int(1)]);

        // Not samplers.
        state.clear_calls();
        renderer.set_texture("u_amount", &MockImage(4));
        renderer.set_texture("u_unknown", &MockImage(5));
        assert!(state.calls().is_empty());
        assert_eq!(state.live_objects(), live + 2);

        // Frames draw with the textures left bound to their units.
        renderer.start();
        state.tick(&mut renderer, 16.0);
        let calls = state.calls();
        assert!(calls.iter().any(|c| matches!(c, Call::Draw { .. })));
        assert!(!calls
            .iter()
            .any(|c| matches!(c, Call::BindTexture { .. } | Call::ClampLinear { .. })));
    }

    #[test]
    fn test_context_loss() {
        let state = MockState::new();
        state.add_canvas("canvas", 800.0, 600.0);
        let mut renderer = fullscreen(&state);
        renderer.start();
        assert!(state.tick(&mut renderer, 16.0));

        let live = state.live_objects();
        renderer.context_lost();
        assert!(renderer.is_context_lost());
        assert!(!renderer.is_running());
        assert!(!state.tick(&mut renderer, 16.0));

        // Not recreated.
        renderer.context_restored();
        assert!(!renderer.is_running());
        assert_eq!(state.live_objects(), live);
        assert!(renderer.is_context_lost());
    }
}
