// SPDX-FileCopyrightText: 2021 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::context::ShaderStage;
use crate::uniform::UniformType;
use thiserror::Error;

/// Reasons a [`Renderer`][`crate::Renderer`] could not be constructed. A failed construction
/// leaves nothing behind to clean up.
#[derive(Error, Debug)]
pub enum Error {
    /// Required options are missing or malformed.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// The canvas or a graphics context could not be acquired.
    #[error(transparent)]
    Resource(#[from] ResourceError),
    /// A shader stage failed to compile.
    #[error("{stage} shader failed to compile: {log}")]
    Compile {
        /// Which stage failed.
        stage: ShaderStage,
        /// Compiler diagnostics.
        log: String,
    },
    /// The program failed to link.
    #[error("program failed to link: {0}")]
    Link(String),
}

/// The canvas or context is missing.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResourceError {
    /// No canvas matched the target.
    #[error("no canvas found")]
    SurfaceNotFound,
    /// The host can't provide a graphics context.
    #[error("{0}")]
    Unsupported(String),
    /// The context refused to allocate an object.
    #[error("could not create {0}")]
    Allocation(&'static str),
}

/// Rejected writes to [`Uniforms`][`crate::Uniforms`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UniformError {
    /// The name was never declared.
    #[error("uniform {0} was not declared")]
    Unknown(String),
    /// The value's shape doesn't match the declared type.
    #[error("uniform {name} is declared {declared} but was given {given}")]
    TypeMismatch {
        /// Uniform name.
        name: String,
        /// Declared type.
        declared: UniformType,
        /// Type of the rejected value.
        given: UniformType,
    },
    /// No uniform type has that many loose components.
    #[error("uniform {name} is declared {declared} but was given {given} components")]
    ComponentCount {
        /// Uniform name.
        name: String,
        /// Declared type.
        declared: UniformType,
        /// Number of components given.
        given: usize,
    },
}

/// Result of constructing a [`Renderer`][`crate::Renderer`].
pub type Result<T> = std::result::Result<T, Error>;
