// SPDX-FileCopyrightText: 2021 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! A [`Host`] and [`GraphicsContext`] that record what they're asked to do instead of drawing.
//! Shaders "compile" by scanning their declarations, so uniform and attribute lookups behave
//! like a real driver that strips nothing.

use crate::context::{BufferUsage, GraphicsContext, ShaderStage};
use crate::host::{ContextGeneration, FrameRequest, Host, Surface};
use crate::options::ContextAttributes;
use crate::renderer::Renderer;
use crate::uniform::UniformValue;
use glam::{dvec2, DVec2, UVec2};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

/// Id of a mock GPU object.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MockId(pub u32);

/// A resolved uniform, remembering its name so calls are readable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockUniform {
    /// Program it belongs to.
    pub program: MockId,
    /// Uniform name.
    pub name: String,
}

/// Stand-in for an image element.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MockImage(pub u32);

/// A recorded call.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    /// `useProgram`
    UseProgram(Option<MockId>),
    /// `bufferData` on the bound array buffer.
    BufferData {
        /// Bound buffer.
        buffer: Option<MockId>,
        /// Number of floats.
        len: usize,
        /// Usage hint.
        usage: BufferUsage,
    },
    /// `enableVertexAttribArray`
    EnableAttrib(u32),
    /// `vertexAttribPointer`
    AttribPointer {
        /// Attribute location.
        location: u32,
        /// Buffer bound at the time.
        buffer: Option<MockId>,
        /// Components.
        size: i32,
        /// Bytes.
        stride: i32,
        /// Bytes.
        offset: i32,
    },
    /// `vertexAttribDivisor`
    AttribDivisor {
        /// Attribute location.
        location: u32,
        /// Divisor.
        divisor: u32,
    },
    /// `uniform*`
    Uniform {
        /// Uniform name.
        name: String,
        /// Written value.
        value: UniformValue,
    },
    /// `activeTexture` + `bindTexture`
    BindTexture {
        /// Texture unit.
        unit: u32,
        /// Bound texture.
        texture: Option<MockId>,
    },
    /// Clamp to edge and linear filtering on the active unit's texture.
    ClampLinear {
        /// Texture bound to the active unit.
        texture: Option<MockId>,
    },
    /// `texImage2D`
    TexImage {
        /// Texture bound to the active unit.
        texture: Option<MockId>,
        /// Uploaded image.
        image: MockImage,
    },
    /// `viewport`
    Viewport(UVec2),
    /// `drawArrays`
    Draw {
        /// Vertices.
        count: i32,
    },
    /// `drawArraysInstanced`
    DrawInstanced {
        /// Vertices per instance.
        count: i32,
        /// Instances.
        instances: i32,
    },
}

struct MockShader {
    stage: ShaderStage,
    source: String,
    compiled: bool,
}

#[derive(Default)]
struct MockProgram {
    shaders: Vec<MockId>,
    attributes: Vec<String>,
    uniforms: Vec<String>,
}

struct CanvasState {
    client_size: Cell<DVec2>,
    device_pixel_ratio: Cell<f64>,
    size: Cell<UVec2>,
}

/// A canvas. Clones refer to the same canvas.
#[derive(Clone)]
pub struct MockCanvas(Rc<CanvasState>);

impl MockCanvas {
    /// A canvas displayed at `width` x `height` CSS pixels with the default 300x150 backing
    /// store.
    pub fn new(width: f64, height: f64) -> Self {
        Self(Rc::new(CanvasState {
            client_size: Cell::new(dvec2(width, height)),
            device_pixel_ratio: Cell::new(1.0),
            size: Cell::new(UVec2::new(300, 150)),
        }))
    }

    /// Changes the displayed size, as CSS layout would.
    pub fn set_client_size(&self, width: f64, height: f64) {
        self.0.client_size.set(dvec2(width, height));
    }

    /// Changes the device pixel ratio.
    pub fn set_device_pixel_ratio(&self, ratio: f64) {
        self.0.device_pixel_ratio.set(ratio);
    }
}

impl Surface for MockCanvas {
    fn client_size(&self) -> DVec2 {
        self.0.client_size.get()
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.0.device_pixel_ratio.get()
    }

    fn size(&self) -> UVec2 {
        self.0.size.get()
    }

    fn set_size(&self, size: UVec2) {
        self.0.size.set(size);
    }
}

/// Everything the mock host and context share with the test.
pub struct MockState {
    calls: RefCell<Vec<Call>>,
    next_id: Cell<u32>,
    live: RefCell<BTreeSet<MockId>>,
    shaders: RefCell<HashMap<MockId, MockShader>>,
    programs: RefCell<HashMap<MockId, MockProgram>>,
    canvases: RefCell<Vec<(String, MockCanvas)>>,
    now: Cell<f64>,
    next_frame: Cell<i32>,
    pending_frame: Cell<Option<FrameRequest>>,
    observed: Cell<bool>,
    /// Make every link fail.
    pub fail_link: Cell<bool>,
    /// Whether `getContext("webgl")` succeeds.
    pub webgl1: Cell<bool>,
    /// Whether `getContext("webgl2")` succeeds.
    pub webgl2: Cell<bool>,
}

impl MockState {
    /// Creates a state with no canvases, supporting both WebGL generations.
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            calls: Default::default(),
            next_id: Cell::new(1),
            live: Default::default(),
            shaders: Default::default(),
            programs: Default::default(),
            canvases: Default::default(),
            now: Cell::new(1000.0),
            next_frame: Cell::new(1),
            pending_frame: Cell::new(None),
            observed: Cell::new(false),
            fail_link: Cell::new(false),
            webgl1: Cell::new(true),
            webgl2: Cell::new(true),
        })
    }

    /// Adds a canvas that can be found by `key`.
    pub fn add_canvas(&self, key: &str, width: f64, height: f64) -> MockCanvas {
        let canvas = MockCanvas::new(width, height);
        self.canvases
            .borrow_mut()
            .push((key.to_owned(), canvas.clone()));
        canvas
    }

    /// Everything recorded so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Forgets everything recorded so far.
    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Recorded draw calls.
    pub fn draws(&self) -> Vec<Call> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Draw { .. } | Call::DrawInstanced { .. }))
            .cloned()
            .collect()
    }

    /// Values written to the uniform `name`, oldest first.
    pub fn uniform_writes(&self, name: &str) -> Vec<UniformValue> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Uniform { name: n, value } if n == name => Some(*value),
                _ => None,
            })
            .collect()
    }

    /// Number of shaders, programs, buffers and textures not yet deleted.
    pub fn live_objects(&self) -> usize {
        self.live.borrow().len()
    }

    /// Returns true if notifications are being forwarded.
    pub fn is_observed(&self) -> bool {
        self.observed.get()
    }

    /// Returns true if an animation frame is scheduled.
    pub fn frame_pending(&self) -> bool {
        self.pending_frame.get().is_some()
    }

    /// Advances the clock by `ms` and runs the scheduled animation frame, if any. Returns true
    /// if a frame ran.
    pub fn tick(&self, renderer: &mut Renderer<MockHost>, ms: f64) -> bool {
        self.now.set(self.now.get() + ms);
        if self.pending_frame.take().is_some() {
            renderer.frame(self.now.get());
            true
        } else {
            false
        }
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn alloc(&self) -> MockId {
        let id = MockId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.live.borrow_mut().insert(id);
        id
    }

    fn free(&self, id: MockId) {
        self.live.borrow_mut().remove(&id);
    }
}

/// Names declared by lines starting with one of `keywords`, e.g. `uniform highp vec2 u_mouse;`.
fn declarations<'a>(
    source: &'a str,
    keywords: &'static [&'static str],
) -> impl Iterator<Item = String> + 'a {
    source.lines().filter_map(move |line| {
        let mut tokens = line.split_ascii_whitespace();
        let first = tokens.next()?;
        if !keywords.iter().any(|k| *k == first) {
            return None;
        }
        tokens
            .last()
            .map(|name| name.trim_end_matches(';').to_owned())
    })
}

/// Records instead of drawing.
pub struct MockContext {
    state: Rc<MockState>,
    canvas: MockCanvas,
    generation: ContextGeneration,
    array_buffer: Cell<Option<MockId>>,
    textures: RefCell<HashMap<u32, MockId>>,
    active_unit: Cell<u32>,
}

impl MockContext {
    /// A WebGL2 context on a detached 300x150 canvas.
    pub fn webgl2(state: &Rc<MockState>) -> Self {
        Self::new(state, MockCanvas::new(300.0, 150.0), ContextGeneration::WebGl2)
    }

    fn new(state: &Rc<MockState>, canvas: MockCanvas, generation: ContextGeneration) -> Self {
        Self {
            state: Rc::clone(state),
            canvas,
            generation,
            array_buffer: Cell::new(None),
            textures: Default::default(),
            active_unit: Cell::new(0),
        }
    }
}

impl GraphicsContext for MockContext {
    type Shader = MockId;
    type Program = MockId;
    type Buffer = MockId;
    type Texture = MockId;
    type UniformLocation = MockUniform;
    type Image = MockImage;

    fn generation(&self) -> ContextGeneration {
        self.generation
    }

    fn create_shader(&self, stage: ShaderStage) -> Option<MockId> {
        let id = self.state.alloc();
        self.state.shaders.borrow_mut().insert(
            id,
            MockShader {
                stage,
                source: String::new(),
                compiled: false,
            },
        );
        Some(id)
    }

    fn shader_source(&self, shader: &MockId, source: &str) {
        if let Some(s) = self.state.shaders.borrow_mut().get_mut(shader) {
            s.source = source.to_owned();
        }
    }

    fn compile_shader(&self, shader: &MockId) {
        if let Some(s) = self.state.shaders.borrow_mut().get_mut(shader) {
            s.compiled = !s.source.contains("#error");
        }
    }

    fn compile_status(&self, shader: &MockId) -> bool {
        self.state
            .shaders
            .borrow()
            .get(shader)
            .map_or(false, |s| s.compiled)
    }

    fn shader_info_log(&self, shader: &MockId) -> Option<String> {
        let shaders = self.state.shaders.borrow();
        let s = shaders.get(shader)?;
        let (line, text) = s
            .source
            .lines()
            .enumerate()
            .find(|(_, l)| l.contains("#error"))?;
        Some(format!("ERROR: 0:{}: '{}'\n\x00", line + 1, text.trim()))
    }

    fn delete_shader(&self, shader: &MockId) {
        self.state.free(*shader);
    }

    fn create_program(&self) -> Option<MockId> {
        let id = self.state.alloc();
        self.state
            .programs
            .borrow_mut()
            .insert(id, MockProgram::default());
        Some(id)
    }

    fn attach_shader(&self, program: &MockId, shader: &MockId) {
        if let Some(p) = self.state.programs.borrow_mut().get_mut(program) {
            p.shaders.push(*shader);
        }
    }

    fn link_program(&self, program: &MockId) {
        let shaders = self.state.shaders.borrow();
        let mut programs = self.state.programs.borrow_mut();
        let Some(p) = programs.get_mut(program) else {
            return;
        };
        for id in &p.shaders {
            if let Some(s) = shaders.get(id) {
                if s.stage == ShaderStage::Vertex {
                    p.attributes
                        .extend(declarations(&s.source, &["attribute", "in"]));
                }
                p.uniforms.extend(declarations(&s.source, &["uniform"]));
            }
        }
    }

    fn link_status(&self, program: &MockId) -> bool {
        if self.state.fail_link.get() {
            return false;
        }
        let shaders = self.state.shaders.borrow();
        self.state
            .programs
            .borrow()
            .get(program)
            .map_or(false, |p| {
                p.shaders.len() == 2
                    && p.shaders
                        .iter()
                        .all(|id| shaders.get(id).map_or(false, |s| s.compiled))
            })
    }

    fn program_info_log(&self, _: &MockId) -> Option<String> {
        Some("Vertex and fragment shaders failed to link\x00".to_owned())
    }

    fn delete_program(&self, program: &MockId) {
        self.state.free(*program);
    }

    fn use_program(&self, program: Option<&MockId>) {
        self.state.record(Call::UseProgram(program.copied()));
    }

    fn attrib_location(&self, program: &MockId, name: &str) -> Option<u32> {
        self.state
            .programs
            .borrow()
            .get(program)?
            .attributes
            .iter()
            .position(|a| a == name)
            .map(|i| i as u32)
    }

    fn uniform_location(&self, program: &MockId, name: &str) -> Option<MockUniform> {
        self.state
            .programs
            .borrow()
            .get(program)?
            .uniforms
            .iter()
            .any(|u| u == name)
            .then(|| MockUniform {
                program: *program,
                name: name.to_owned(),
            })
    }

    fn create_buffer(&self) -> Option<MockId> {
        Some(self.state.alloc())
    }

    fn bind_array_buffer(&self, buffer: Option<&MockId>) {
        self.array_buffer.set(buffer.copied());
    }

    fn buffer_data(&self, data: &[f32], usage: BufferUsage) {
        self.state.record(Call::BufferData {
            buffer: self.array_buffer.get(),
            len: data.len(),
            usage,
        });
    }

    fn delete_buffer(&self, buffer: &MockId) {
        self.state.free(*buffer);
    }

    fn enable_vertex_attrib_array(&self, location: u32) {
        self.state.record(Call::EnableAttrib(location));
    }

    fn vertex_attrib_pointer(&self, location: u32, size: i32, stride: i32, offset: i32) {
        self.state.record(Call::AttribPointer {
            location,
            buffer: self.array_buffer.get(),
            size,
            stride,
            offset,
        });
    }

    fn vertex_attrib_divisor(&self, location: u32, divisor: u32) {
        self.state
            .record(Call::AttribDivisor { location, divisor });
    }

    fn uniform(&self, location: &MockUniform, value: UniformValue) {
        self.state.record(Call::Uniform {
            name: location.name.clone(),
            value,
        });
    }

    fn create_texture(&self) -> Option<MockId> {
        Some(self.state.alloc())
    }

    fn bind_texture(&self, unit: u32, texture: Option<&MockId>) {
        self.active_unit.set(unit);
        let mut textures = self.textures.borrow_mut();
        match texture {
            Some(t) => textures.insert(unit, *t),
            None => textures.remove(&unit),
        };
        self.state.record(Call::BindTexture {
            unit,
            texture: texture.copied(),
        });
    }

    fn clamp_linear(&self) {
        let texture = self.textures.borrow().get(&self.active_unit.get()).copied();
        self.state.record(Call::ClampLinear { texture });
    }

    fn tex_image(&self, image: &MockImage) -> Result<(), String> {
        let texture = self.textures.borrow().get(&self.active_unit.get()).copied();
        self.state.record(Call::TexImage {
            texture,
            image: *image,
        });
        Ok(())
    }

    fn delete_texture(&self, texture: &MockId) {
        self.state.free(*texture);
    }

    fn viewport(&self, size: UVec2) {
        self.state.record(Call::Viewport(size));
    }

    fn drawing_buffer_size(&self) -> UVec2 {
        self.canvas.size()
    }

    fn draw_triangles(&self, count: i32) {
        self.state.record(Call::Draw { count });
    }

    fn draw_triangles_instanced(&self, count: i32, instances: i32) {
        self.state.record(Call::DrawInstanced { count, instances });
    }
}

/// A page with the canvases added to its [`MockState`].
pub struct MockHost {
    state: Rc<MockState>,
}

impl MockHost {
    /// Creates a host sharing `state`.
    pub fn new(state: &Rc<MockState>) -> Self {
        Self {
            state: Rc::clone(state),
        }
    }
}

impl Host for MockHost {
    type Surface = MockCanvas;
    type Context = MockContext;

    fn find_surface(&self, key: Option<&str>) -> Option<MockCanvas> {
        let canvases = self.state.canvases.borrow();
        match key {
            Some(key) => canvases.iter().find(|(k, _)| k == key),
            None => canvases.first(),
        }
        .map(|(_, c)| c.clone())
    }

    fn create_context(
        &self,
        surface: &MockCanvas,
        generation: ContextGeneration,
        _: &ContextAttributes,
    ) -> Result<Option<MockContext>, String> {
        let supported = match generation {
            ContextGeneration::WebGl1 => self.state.webgl1.get(),
            ContextGeneration::WebGl2 => self.state.webgl2.get(),
        };
        Ok(supported.then(|| MockContext::new(&self.state, surface.clone(), generation)))
    }

    fn now(&self) -> f64 {
        self.state.now.get()
    }

    fn request_frame(&self) -> FrameRequest {
        debug_assert!(
            self.state.pending_frame.get().is_none(),
            "more than one frame scheduled"
        );
        let request = FrameRequest(self.state.next_frame.get());
        self.state.next_frame.set(request.0 + 1);
        self.state.pending_frame.set(Some(request));
        request
    }

    fn cancel_frame(&self, request: FrameRequest) {
        if self.state.pending_frame.get() == Some(request) {
            self.state.pending_frame.set(None);
        }
    }

    fn observe(&self, _: &MockCanvas) {
        self.state.observed.set(true);
    }

    fn unobserve(&self, _: &MockCanvas) {
        self.state.observed.set(false);
    }
}
