// SPDX-FileCopyrightText: 2021 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Browser bindings: [`WebGl`] and [`WebHost`] implement the renderer's seams with [`web_sys`],
//! and [`ShaderCanvas`] exposes a renderer to JavaScript.

use crate::attribute::AttributeLayout;
use crate::context::{BufferUsage, GraphicsContext, ShaderStage};
use crate::host::{ContextGeneration, FrameRequest, Host, Surface, SurfaceTarget};
use crate::options::{ContextAttributes, RenderMode, RendererOptions};
use crate::renderer::Renderer;
use crate::uniform::{UniformType, UniformValue, Uniforms};
use glam::{dvec2, DVec2, UVec2};
use js_sys::Function;
use linear_map::LinearMap;
use log::{warn, LevelFilter};
use serde::Deserialize;
use std::cell::{OnceCell, RefCell};
use std::rc::{Rc, Weak};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Event, HtmlCanvasElement, HtmlImageElement, ResizeObserver, WebGl2RenderingContext,
    WebGlBuffer, WebGlProgram, WebGlRenderingContext as Gl, WebGlShader, WebGlTexture,
    WebGlUniformLocation, Window,
};

/// A WebGL or WebGL2 context. The constants and most methods are shared, so both variants go
/// through the same code.
pub enum WebGl {
    /// `getContext("webgl")`, fullscreen only.
    V1(Gl),
    /// `getContext("webgl2")`.
    V2(WebGl2RenderingContext),
}

// Expands `$body` once per variant with `$gl` bound to the inner context.
macro_rules! gl {
    ($self:expr, $gl:ident => $body:expr) => {
        match $self {
            WebGl::V1($gl) => $body,
            WebGl::V2($gl) => $body,
        }
    };
}

/// Something that can be uploaded into a texture.
pub enum TextureSource {
    /// A loaded `<img>`.
    Image(HtmlImageElement),
    /// Another canvas, e.g. one drawn with a 2D context.
    Canvas(HtmlCanvasElement),
    /// Tightly packed RGBA8 pixels, row major, `size.x * size.y * 4` bytes.
    Pixels {
        /// Width and height.
        size: UVec2,
        /// Pixel data.
        rgba: Vec<u8>,
    },
}

impl GraphicsContext for WebGl {
    type Shader = WebGlShader;
    type Program = WebGlProgram;
    type Buffer = WebGlBuffer;
    type Texture = WebGlTexture;
    type UniformLocation = WebGlUniformLocation;
    type Image = TextureSource;

    fn generation(&self) -> ContextGeneration {
        match self {
            Self::V1(_) => ContextGeneration::WebGl1,
            Self::V2(_) => ContextGeneration::WebGl2,
        }
    }

    fn create_shader(&self, stage: ShaderStage) -> Option<WebGlShader> {
        let ty = match stage {
            ShaderStage::Vertex => Gl::VERTEX_SHADER,
            ShaderStage::Fragment => Gl::FRAGMENT_SHADER,
        };
        gl!(self, gl => gl.create_shader(ty))
    }

    fn shader_source(&self, shader: &WebGlShader, source: &str) {
        gl!(self, gl => gl.shader_source(shader, source))
    }

    fn compile_shader(&self, shader: &WebGlShader) {
        gl!(self, gl => gl.compile_shader(shader))
    }

    fn compile_status(&self, shader: &WebGlShader) -> bool {
        gl!(self, gl => gl.get_shader_parameter(shader, Gl::COMPILE_STATUS))
            .as_bool()
            .unwrap_or(false)
    }

    fn shader_info_log(&self, shader: &WebGlShader) -> Option<String> {
        gl!(self, gl => gl.get_shader_info_log(shader))
    }

    fn delete_shader(&self, shader: &WebGlShader) {
        gl!(self, gl => gl.delete_shader(Some(shader)))
    }

    fn create_program(&self) -> Option<WebGlProgram> {
        gl!(self, gl => gl.create_program())
    }

    fn attach_shader(&self, program: &WebGlProgram, shader: &WebGlShader) {
        gl!(self, gl => gl.attach_shader(program, shader))
    }

    fn link_program(&self, program: &WebGlProgram) {
        gl!(self, gl => gl.link_program(program))
    }

    fn link_status(&self, program: &WebGlProgram) -> bool {
        gl!(self, gl => gl.get_program_parameter(program, Gl::LINK_STATUS))
            .as_bool()
            .unwrap_or(false)
    }

    fn program_info_log(&self, program: &WebGlProgram) -> Option<String> {
        gl!(self, gl => gl.get_program_info_log(program))
    }

    fn delete_program(&self, program: &WebGlProgram) {
        gl!(self, gl => gl.delete_program(Some(program)))
    }

    fn use_program(&self, program: Option<&WebGlProgram>) {
        gl!(self, gl => gl.use_program(program))
    }

    fn attrib_location(&self, program: &WebGlProgram, name: &str) -> Option<u32> {
        // -1 if not found.
        let location = gl!(self, gl => gl.get_attrib_location(program, name));
        u32::try_from(location).ok()
    }

    fn uniform_location(&self, program: &WebGlProgram, name: &str) -> Option<WebGlUniformLocation> {
        gl!(self, gl => gl.get_uniform_location(program, name))
    }

    fn create_buffer(&self) -> Option<WebGlBuffer> {
        gl!(self, gl => gl.create_buffer())
    }

    fn bind_array_buffer(&self, buffer: Option<&WebGlBuffer>) {
        gl!(self, gl => gl.bind_buffer(Gl::ARRAY_BUFFER, buffer))
    }

    fn buffer_data(&self, data: &[f32], usage: BufferUsage) {
        let usage = match usage {
            BufferUsage::Static => Gl::STATIC_DRAW,
            BufferUsage::Dynamic => Gl::DYNAMIC_DRAW,
        };
        unsafe {
            // Points to raw rust memory so can't allocate while in use.
            let array = js_sys::Float32Array::view(data);
            gl!(self, gl => gl.buffer_data_with_array_buffer_view(Gl::ARRAY_BUFFER, &array, usage));
        }
    }

    fn delete_buffer(&self, buffer: &WebGlBuffer) {
        gl!(self, gl => gl.delete_buffer(Some(buffer)))
    }

    fn enable_vertex_attrib_array(&self, location: u32) {
        gl!(self, gl => gl.enable_vertex_attrib_array(location))
    }

    fn vertex_attrib_pointer(&self, location: u32, size: i32, stride: i32, offset: i32) {
        gl!(self, gl => gl.vertex_attrib_pointer_with_i32(
            location,
            size,
            Gl::FLOAT,
            false,
            stride,
            offset,
        ))
    }

    fn vertex_attrib_divisor(&self, location: u32, divisor: u32) {
        match self {
            Self::V1(_) => warn!("vertex_attrib_divisor requires WebGL2"),
            Self::V2(gl) => gl.vertex_attrib_divisor(location, divisor),
        }
    }

    fn uniform(&self, location: &WebGlUniformLocation, value: UniformValue) {
        let location = Some(location);
        gl!(self, gl => match value {
            UniformValue::Float(v) => gl.uniform1f(location, v),
            UniformValue::Vec2(v) => gl.uniform2f(location, v.x, v.y),
            UniformValue::Vec3(v) => gl.uniform3f(location, v.x, v.y, v.z),
            UniformValue::Vec4(v) => gl.uniform4f(location, v.x, v.y, v.z, v.w),
            UniformValue::Int(v) => gl.uniform1i(location, v),
        })
    }

    fn create_texture(&self) -> Option<WebGlTexture> {
        gl!(self, gl => gl.create_texture())
    }

    fn bind_texture(&self, unit: u32, texture: Option<&WebGlTexture>) {
        gl!(self, gl => {
            gl.active_texture(Gl::TEXTURE0 + unit);
            gl.bind_texture(Gl::TEXTURE_2D, texture);
        })
    }

    fn clamp_linear(&self) {
        gl!(self, gl => {
            gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_WRAP_S, Gl::CLAMP_TO_EDGE as i32);
            gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_WRAP_T, Gl::CLAMP_TO_EDGE as i32);
            gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_MIN_FILTER, Gl::LINEAR as i32);
            gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_MAG_FILTER, Gl::LINEAR as i32);
        })
    }

    fn tex_image(&self, image: &TextureSource) -> Result<(), String> {
        let level = 0;
        let format = Gl::RGBA;
        let ty = Gl::UNSIGNED_BYTE;

        let result = match (self, image) {
            (Self::V1(gl), TextureSource::Image(image)) => gl
                .tex_image_2d_with_u32_and_u32_and_image(
                    Gl::TEXTURE_2D,
                    level,
                    format as i32,
                    format,
                    ty,
                    image,
                ),
            (Self::V2(gl), TextureSource::Image(image)) => gl
                .tex_image_2d_with_u32_and_u32_and_html_image_element(
                    Gl::TEXTURE_2D,
                    level,
                    format as i32,
                    format,
                    ty,
                    image,
                ),
            (Self::V1(gl), TextureSource::Canvas(canvas)) => gl
                .tex_image_2d_with_u32_and_u32_and_canvas(
                    Gl::TEXTURE_2D,
                    level,
                    format as i32,
                    format,
                    ty,
                    canvas,
                ),
            (Self::V2(gl), TextureSource::Canvas(canvas)) => gl
                .tex_image_2d_with_u32_and_u32_and_html_canvas_element(
                    Gl::TEXTURE_2D,
                    level,
                    format as i32,
                    format,
                    ty,
                    canvas,
                ),
            (_, TextureSource::Pixels { size, rgba }) => {
                let expected = size.x as usize * size.y as usize * 4;
                if rgba.len() != expected {
                    return Err(format!(
                        "{}x{} texture needs {} bytes, got {}",
                        size.x,
                        size.y,
                        expected,
                        rgba.len()
                    ));
                }
                gl!(self, gl => gl
                    .tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
                        Gl::TEXTURE_2D,
                        level,
                        format as i32,
                        size.x as i32,
                        size.y as i32,
                        0,
                        format,
                        ty,
                        Some(rgba.as_slice()),
                    ))
            }
        };

        result.map_err(|e| {
            js_hooks::error_message(&e).unwrap_or_else(|| String::from("texImage2D failed"))
        })
    }

    fn delete_texture(&self, texture: &WebGlTexture) {
        gl!(self, gl => gl.delete_texture(Some(texture)))
    }

    fn viewport(&self, size: UVec2) {
        gl!(self, gl => gl.viewport(0, 0, size.x as i32, size.y as i32))
    }

    fn drawing_buffer_size(&self) -> UVec2 {
        let (width, height) =
            gl!(self, gl => (gl.drawing_buffer_width(), gl.drawing_buffer_height()));
        UVec2::new(width.max(0) as u32, height.max(0) as u32)
    }

    fn draw_triangles(&self, count: i32) {
        gl!(self, gl => gl.draw_arrays(Gl::TRIANGLES, 0, count))
    }

    fn draw_triangles_instanced(&self, count: i32, instances: i32) {
        match self {
            Self::V1(_) => warn!("draw_arrays_instanced requires WebGL2"),
            Self::V2(gl) => gl.draw_arrays_instanced(Gl::TRIANGLES, 0, count, instances),
        }
    }
}

impl Surface for HtmlCanvasElement {
    fn client_size(&self) -> DVec2 {
        dvec2(self.client_width() as f64, self.client_height() as f64)
    }

    fn device_pixel_ratio(&self) -> f64 {
        web_sys::window().map_or(1.0, |w| w.device_pixel_ratio())
    }

    fn size(&self) -> UVec2 {
        UVec2::new(self.width(), self.height())
    }

    fn set_size(&self, size: UVec2) {
        self.set_width(size.x);
        self.set_height(size.y);
    }
}

/// Filled with the renderer once it exists, so callbacks created before it can reach it.
type Slot = Rc<OnceCell<Weak<RefCell<Renderer<WebHost>>>>>;

/// Runs `f` on the renderer unless it's gone or already borrowed (a re-entrant event, which is
/// dropped).
fn with_renderer(slot: &Slot, f: impl FnOnce(&mut Renderer<WebHost>)) {
    let Some(renderer) = slot.get().and_then(Weak::upgrade) else {
        return;
    };
    let Ok(mut renderer) = renderer.try_borrow_mut() else {
        return;
    };
    f(&mut renderer);
}

/// The browser page. Owns the callbacks registered with it, so it must outlive every
/// registration; [`Renderer::dispose`] takes care of that.
pub struct WebHost {
    window: Window,
    on_frame: Closure<dyn FnMut(f64)>,
    on_resize: Closure<dyn FnMut()>,
    on_context_lost: Closure<dyn FnMut(Event)>,
    on_context_restored: Closure<dyn FnMut(Event)>,
    resize_observer: Option<ResizeObserver>,
}

impl WebHost {
    fn new(slot: &Slot) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;

        let frame_slot = Rc::clone(slot);
        let on_frame = Closure::wrap(Box::new(move |timestamp: f64| {
            with_renderer(&frame_slot, |renderer| renderer.frame(timestamp));
        }) as Box<dyn FnMut(f64)>);

        let resize_slot = Rc::clone(slot);
        let on_resize = Closure::wrap(Box::new(move || {
            // The callback may call back into the canvas, so it runs unborrowed.
            if let Some(renderer) = resize_slot.get().and_then(Weak::upgrade) {
                Renderer::resize_shared(&renderer);
            }
        }) as Box<dyn FnMut()>);

        let lost_slot = Rc::clone(slot);
        let on_context_lost = Closure::wrap(Box::new(move |event: Event| {
            // Otherwise the browser never offers to restore the context.
            event.prevent_default();
            with_renderer(&lost_slot, Renderer::context_lost);
        }) as Box<dyn FnMut(Event)>);

        let restored_slot = Rc::clone(slot);
        let on_context_restored = Closure::wrap(Box::new(move |_: Event| {
            with_renderer(&restored_slot, Renderer::context_restored);
        }) as Box<dyn FnMut(Event)>);

        // Older browsers only get window resizes.
        let resize_observer = ResizeObserver::new(on_resize.as_ref().unchecked_ref())
            .map_err(|e| warn!("no ResizeObserver: {:?}", e))
            .ok();

        Ok(Self {
            window,
            on_frame,
            on_resize,
            on_context_lost,
            on_context_restored,
            resize_observer,
        })
    }

    fn listeners(&self) -> [(&'static str, &Function); 2] {
        [
            ("webglcontextlost", self.on_context_lost.as_ref().unchecked_ref()),
            (
                "webglcontextrestored",
                self.on_context_restored.as_ref().unchecked_ref(),
            ),
        ]
    }
}

impl Host for WebHost {
    type Surface = HtmlCanvasElement;
    type Context = WebGl;

    fn find_surface(&self, key: Option<&str>) -> Option<HtmlCanvasElement> {
        match key {
            Some(key) => js_hooks::canvas_by_key(key),
            None => js_hooks::first_canvas(),
        }
    }

    fn create_context(
        &self,
        canvas: &HtmlCanvasElement,
        generation: ContextGeneration,
        attributes: &ContextAttributes,
    ) -> Result<Option<WebGl>, String> {
        let options = serde_wasm_bindgen::to_value(attributes).map_err(|e| e.to_string())?;
        let context = canvas
            .get_context_with_context_options(generation.context_name(), &options)
            .map_err(|e| {
                js_hooks::error_message(&e)
                    .unwrap_or_else(|| format!("could not create {} context", generation))
            })?;

        Ok(context.and_then(|context| match generation {
            ContextGeneration::WebGl1 => context.dyn_into::<Gl>().ok().map(WebGl::V1),
            ContextGeneration::WebGl2 => context
                .dyn_into::<WebGl2RenderingContext>()
                .ok()
                .map(WebGl::V2),
        }))
    }

    fn now(&self) -> f64 {
        self.window.performance().map_or(0.0, |p| p.now())
    }

    fn request_frame(&self) -> FrameRequest {
        match self
            .window
            .request_animation_frame(self.on_frame.as_ref().unchecked_ref())
        {
            Ok(handle) => FrameRequest(handle),
            Err(e) => {
                warn!("could not request animation frame: {:?}", e);
                // Never a real handle.
                FrameRequest(0)
            }
        }
    }

    fn cancel_frame(&self, request: FrameRequest) {
        if let Err(e) = self.window.cancel_animation_frame(request.0) {
            warn!("could not cancel animation frame: {:?}", e);
        }
    }

    fn observe(&self, canvas: &HtmlCanvasElement) {
        for (name, listener) in self.listeners() {
            if let Err(e) = canvas.add_event_listener_with_callback(name, listener) {
                warn!("could not listen for {}: {:?}", name, e);
            }
        }
        if let Err(e) = self
            .window
            .add_event_listener_with_callback("resize", self.on_resize.as_ref().unchecked_ref())
        {
            warn!("could not listen for resize: {:?}", e);
        }
        if let Some(observer) = &self.resize_observer {
            observer.observe(canvas);
        }
    }

    fn unobserve(&self, canvas: &HtmlCanvasElement) {
        for (name, listener) in self.listeners() {
            if let Err(e) = canvas.remove_event_listener_with_callback(name, listener) {
                warn!("could not stop listening for {}: {:?}", name, e);
            }
        }
        if let Err(e) = self
            .window
            .remove_event_listener_with_callback("resize", self.on_resize.as_ref().unchecked_ref())
        {
            warn!("could not stop listening for resize: {:?}", e);
        }
        if let Some(observer) = &self.resize_observer {
            observer.disconnect();
        }
    }
}

/// Options accepted from JavaScript. The canvas element and resize callback are passed
/// separately since they can't be deserialized.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsOptions {
    /// Canvas id or selector.
    #[serde(default)]
    canvas: Option<String>,
    #[serde(alias = "fragmentShader")]
    fragment: String,
    #[serde(default, alias = "vertexShader")]
    vertex: Option<String>,
    #[serde(default)]
    mode: RenderMode,
    #[serde(default)]
    num_instances: Option<u32>,
    #[serde(default)]
    attributes: Option<AttributeLayout>,
    #[serde(default)]
    uniforms: LinearMap<String, UniformType>,
    #[serde(default)]
    context_attributes: ContextAttributes,
}

impl JsOptions {
    fn into_options(
        self,
        canvas: Option<HtmlCanvasElement>,
        on_resize: Option<Function>,
    ) -> RendererOptions<HtmlCanvasElement> {
        // An element beats a key.
        let target = match (canvas, self.canvas) {
            (Some(canvas), _) => SurfaceTarget::Surface(canvas),
            (None, Some(key)) => SurfaceTarget::Key(key),
            (None, None) => SurfaceTarget::First,
        };
        let mut options = RendererOptions {
            target,
            fragment: self.fragment,
            vertex: self.vertex,
            mode: self.mode,
            num_instances: self.num_instances,
            attributes: self.attributes,
            uniforms: self.uniforms,
            on_resize: None,
            context_attributes: self.context_attributes,
        };
        if let Some(callback) = on_resize {
            options = options.on_resize(move |width, height| {
                if let Err(e) = callback.call2(&JsValue::NULL, &width.into(), &height.into()) {
                    warn!("resize callback threw: {:?}", e);
                }
            });
        }
        options
    }
}

fn js_error(error: impl ToString) -> JsValue {
    js_sys::Error::new(&error.to_string()).into()
}

/// A fragment shader rendering onto a canvas, for use from JavaScript.
///
/// ```js
/// const canvas = new ShaderCanvas({
///     fragment: source,
///     mode: "instanced",
///     numInstances: 3,
///     attributes: { a_rect: { size: 4 } },
///     uniforms: { u_mouse: "vec2", u_image: "sampler2D" },
/// }, document.getElementById("canvas"), (w, h) => console.log(w, h));
/// canvas.start();
/// ```
#[wasm_bindgen]
pub struct ShaderCanvas {
    renderer: Rc<RefCell<Renderer<WebHost>>>,
    uniforms: Uniforms,
}

#[wasm_bindgen]
impl ShaderCanvas {
    /// Builds a renderer. Throws a configuration, resource, compile or link error.
    #[wasm_bindgen(constructor)]
    pub fn from_js(
        options: JsValue,
        canvas: Option<HtmlCanvasElement>,
        on_resize: Option<Function>,
    ) -> Result<ShaderCanvas, JsValue> {
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));
        js_hooks::init_logger(if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        });

        let options: JsOptions = serde_wasm_bindgen::from_value(options)?;
        let slot = Slot::default();
        let host = WebHost::new(&slot)?;
        let renderer =
            Renderer::new(host, options.into_options(canvas, on_resize)).map_err(js_error)?;

        let uniforms = renderer.uniforms();
        let renderer = Rc::new(RefCell::new(renderer));
        let _ = slot.set(Rc::downgrade(&renderer));
        Ok(Self { renderer, uniforms })
    }

    fn with(&self, f: impl FnOnce(&mut Renderer<WebHost>)) {
        match self.renderer.try_borrow_mut() {
            Ok(mut renderer) => f(&mut renderer),
            Err(_) => warn!("renderer is busy"),
        }
    }

    /// Starts the frame loop.
    pub fn start(&self) {
        self.with(Renderer::start)
    }

    /// Stops the frame loop.
    pub fn stop(&self) {
        self.with(Renderer::stop)
    }

    /// Releases everything. The canvas is inert afterwards.
    pub fn dispose(&self) {
        self.with(Renderer::dispose)
    }

    /// Replaces the instance buffer.
    #[wasm_bindgen(js_name = setData)]
    pub fn set_data(&self, data: &[f32]) {
        self.with(|renderer| renderer.set_data(data))
    }

    /// Uploads an `<img>` into the `sampler2D` uniform `name`.
    #[wasm_bindgen(js_name = setTexture)]
    pub fn set_texture(&self, name: &str, image: HtmlImageElement) {
        self.with(|renderer| renderer.set_texture(name, &TextureSource::Image(image)))
    }

    /// Uploads another canvas into the `sampler2D` uniform `name`.
    #[wasm_bindgen(js_name = setTextureCanvas)]
    pub fn set_texture_canvas(&self, name: &str, canvas: HtmlCanvasElement) {
        self.with(|renderer| renderer.set_texture(name, &TextureSource::Canvas(canvas)))
    }

    /// Uploads RGBA8 pixels into the `sampler2D` uniform `name`.
    #[wasm_bindgen(js_name = setTexturePixels)]
    pub fn set_texture_pixels(&self, name: &str, width: u32, height: u32, rgba: Vec<u8>) {
        let source = TextureSource::Pixels {
            size: UVec2::new(width, height),
            rgba,
        };
        self.with(|renderer| renderer.set_texture(name, &source))
    }

    /// Sets a declared uniform to a number or an array of 2 to 4 numbers. `null` or `undefined`
    /// unsets it, leaving the program with its last value.
    #[wasm_bindgen(js_name = setUniform)]
    pub fn set_uniform(&self, name: &str, value: JsValue) -> Result<(), JsValue> {
        if value.is_null() || value.is_undefined() {
            return self.uniforms.clear(name).map_err(js_error);
        }
        let components: Vec<f32> = match value.as_f64() {
            Some(n) => vec![n as f32],
            None => serde_wasm_bindgen::from_value(value)?,
        };
        self.uniforms
            .set_components(name, &components)
            .map_err(js_error)
    }

    /// Gets a uniform as a number, an array of numbers, or `null` if unset.
    #[wasm_bindgen(js_name = getUniform)]
    pub fn get_uniform(&self, name: &str) -> JsValue {
        match self.uniforms.get(name) {
            None => JsValue::NULL,
            Some(UniformValue::Float(v)) => v.into(),
            Some(UniformValue::Int(v)) => v.into(),
            Some(UniformValue::Vec2(v)) => js_sys::Float32Array::from(&v.to_array()[..]).into(),
            Some(UniformValue::Vec3(v)) => js_sys::Float32Array::from(&v.to_array()[..]).into(),
            Some(UniformValue::Vec4(v)) => js_sys::Float32Array::from(&v.to_array()[..]).into(),
        }
    }

    /// Frames drawn so far.
    #[wasm_bindgen(getter, js_name = frameCount)]
    pub fn frame_count(&self) -> f64 {
        self.renderer
            .try_borrow()
            .map_or(0.0, |r| r.frame_count() as f64)
    }

    /// Whether a frame is scheduled.
    #[wasm_bindgen(getter, js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.renderer.try_borrow().map_or(false, |r| r.is_running())
    }

    /// Whether the context was lost.
    #[wasm_bindgen(getter, js_name = isContextLost)]
    pub fn is_context_lost(&self) -> bool {
        self.renderer
            .try_borrow()
            .map_or(false, |r| r.is_context_lost())
    }
}
