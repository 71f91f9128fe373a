// SPDX-FileCopyrightText: 2021 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

#![warn(missing_docs)]
#![crate_name = "js_hooks"]

//! # Js Hooks
//!
//! [`js_hooks`][`crate`] is a collection of utilities for a WASM application in a JavaScript environment.

use js_sys::Reflect;
use log::{Level, LevelFilter, Log, Metadata, Record};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlCanvasElement;

/// Looks up a canvas by element id, falling back to treating `key` as a CSS selector. Returns
/// [`None`] if nothing matches or the match isn't a canvas.
pub fn canvas_by_key(key: &str) -> Option<HtmlCanvasElement> {
    let document = web_sys::window()?.document()?;
    document
        .get_element_by_id(key)
        .or_else(|| document.query_selector(key).ok().flatten())?
        .dyn_into::<HtmlCanvasElement>()
        .ok()
}

/// Gets the first canvas in the document, if any.
pub fn first_canvas() -> Option<HtmlCanvasElement> {
    web_sys::window()?
        .document()?
        .query_selector("canvas")
        .ok()
        .flatten()?
        .dyn_into::<HtmlCanvasElement>()
        .ok()
}

/// Extracts an error message from a JavaScript error.
pub fn error_message(error: &JsValue) -> Option<String> {
    Reflect::get(error, &JsValue::from_str("message"))
        .as_ref()
        .ok()
        .and_then(JsValue::as_string)
}

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn error(s: &str);

    #[wasm_bindgen(js_namespace = console)]
    fn warn(s: &str);

    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

/// Forwards the [`log`] facade to JavaScript's console.
pub struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = format!("[{}] {}", record.target(), record.args());
        match record.level() {
            Level::Error => error(&message),
            Level::Warn => warn(&message),
            _ => log(&message),
        }
    }

    fn flush(&self) {}
}

/// Installs [`ConsoleLogger`] as the global logger. Does nothing if a logger is already set.
pub fn init_logger(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
