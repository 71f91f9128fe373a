// SPDX-FileCopyrightText: 2021 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::error::UniformError;
use glam::{Vec2, Vec3, Vec4};
use linear_map::LinearMap;
use serde::Deserialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// GLSL type of a declared uniform.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub enum UniformType {
    /// `float`
    #[serde(rename = "float")]
    Float,
    /// `vec2`
    #[serde(rename = "vec2")]
    Vec2,
    /// `vec3`
    #[serde(rename = "vec3")]
    Vec3,
    /// `vec4`
    #[serde(rename = "vec4")]
    Vec4,
    /// `int`
    #[serde(rename = "int")]
    Int,
    /// `sampler2D`, set with [`Renderer::set_texture`][`crate::Renderer::set_texture`].
    #[serde(rename = "sampler2D", alias = "sampler2d")]
    Sampler2d,
}

impl UniformType {
    /// Number of numeric components, or [`None`] for samplers.
    pub fn component_count(self) -> Option<usize> {
        match self {
            Self::Float | Self::Int => Some(1),
            Self::Vec2 => Some(2),
            Self::Vec3 => Some(3),
            Self::Vec4 => Some(4),
            Self::Sampler2d => None,
        }
    }

    /// The value a freshly declared uniform starts with. Samplers have no value.
    pub fn default_value(self) -> Option<UniformValue> {
        Some(match self {
            Self::Float => UniformValue::Float(0.0),
            Self::Vec2 => UniformValue::Vec2(Vec2::ZERO),
            Self::Vec3 => UniformValue::Vec3(Vec3::ZERO),
            Self::Vec4 => UniformValue::Vec4(Vec4::ZERO),
            Self::Int => UniformValue::Int(0),
            Self::Sampler2d => return None,
        })
    }

    /// Returns true for `sampler2D`.
    pub fn is_sampler(self) -> bool {
        self == Self::Sampler2d
    }
}

impl fmt::Display for UniformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Float => "float",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
            Self::Int => "int",
            Self::Sampler2d => "sampler2D",
        })
    }
}

/// Current value of a numeric uniform.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum UniformValue {
    /// `float`
    Float(f32),
    /// `vec2`
    Vec2(Vec2),
    /// `vec3`
    Vec3(Vec3),
    /// `vec4`
    Vec4(Vec4),
    /// `int`
    Int(i32),
}

impl UniformValue {
    /// The [`UniformType`] this value can be written to.
    pub fn ty(&self) -> UniformType {
        match self {
            Self::Float(_) => UniformType::Float,
            Self::Vec2(_) => UniformType::Vec2,
            Self::Vec3(_) => UniformType::Vec3,
            Self::Vec4(_) => UniformType::Vec4,
            Self::Int(_) => UniformType::Int,
        }
    }

    /// Number of numeric components.
    pub fn component_count(&self) -> usize {
        match self {
            Self::Float(_) | Self::Int(_) => 1,
            Self::Vec2(_) => 2,
            Self::Vec3(_) => 3,
            Self::Vec4(_) => 4,
        }
    }

    /// Builds a value of type `ty` from loose components (e.g. a JavaScript array). Returns
    /// [`None`] if the component count doesn't match or `ty` is a sampler.
    pub fn from_components(ty: UniformType, components: &[f32]) -> Option<Self> {
        Some(match (ty, components) {
            (UniformType::Float, &[x]) => Self::Float(x),
            (UniformType::Int, &[x]) => Self::Int(x as i32),
            (UniformType::Vec2, &[x, y]) => Self::Vec2(Vec2::new(x, y)),
            (UniformType::Vec3, &[x, y, z]) => Self::Vec3(Vec3::new(x, y, z)),
            (UniformType::Vec4, &[x, y, z, w]) => Self::Vec4(Vec4::new(x, y, z, w)),
            _ => return None,
        })
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        Self::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        Self::Vec4(v)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(v: [f32; 2]) -> Self {
        Self::Vec2(v.into())
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(v: [f32; 3]) -> Self {
        Self::Vec3(v.into())
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(v: [f32; 4]) -> Self {
        Self::Vec4(v.into())
    }
}

/// A declared uniform that resolved against the linked program.
#[derive(Debug)]
pub struct UniformSlot<L> {
    /// Declared type.
    pub ty: UniformType,
    /// Location in the program.
    pub location: L,
    /// Texture unit, only for samplers.
    pub unit: Option<u32>,
}

#[derive(Debug)]
struct UniformEntry {
    ty: UniformType,
    value: Option<UniformValue>,
}

/// Live uniform values, read once per frame. Write at any time. As cheap to clone as an [`Rc`],
/// and every clone refers to the same values.
#[derive(Clone, Default, Debug)]
pub struct Uniforms(Rc<RefCell<LinearMap<String, UniformEntry>>>);

impl Uniforms {
    /// Declares `name`, seeding it with [`UniformType::default_value`].
    pub(crate) fn declare(&self, name: &str, ty: UniformType) {
        self.0.borrow_mut().insert(
            name.to_owned(),
            UniformEntry {
                ty,
                value: ty.default_value(),
            },
        );
    }

    /// Sets a declared uniform. The value must have the declared type.
    pub fn set(&self, name: &str, value: impl Into<UniformValue>) -> Result<(), UniformError> {
        let value = value.into();
        let mut entries = self.0.borrow_mut();
        let entry = entries
            .get_mut(name)
            .ok_or_else(|| UniformError::Unknown(name.to_owned()))?;
        if entry.ty != value.ty() {
            return Err(UniformError::TypeMismatch {
                name: name.to_owned(),
                declared: entry.ty,
                given: value.ty(),
            });
        }
        entry.value = Some(value);
        Ok(())
    }

    /// Sets a `float` uniform.
    pub fn set_float(&self, name: &str, v: f32) -> Result<(), UniformError> {
        self.set(name, v)
    }

    /// Sets a `vec2` uniform.
    pub fn set_vec2(&self, name: &str, v: Vec2) -> Result<(), UniformError> {
        self.set(name, v)
    }

    /// Sets a `vec3` uniform.
    pub fn set_vec3(&self, name: &str, v: Vec3) -> Result<(), UniformError> {
        self.set(name, v)
    }

    /// Sets a `vec4` uniform.
    pub fn set_vec4(&self, name: &str, v: Vec4) -> Result<(), UniformError> {
        self.set(name, v)
    }

    /// Sets an `int` uniform.
    pub fn set_int(&self, name: &str, v: i32) -> Result<(), UniformError> {
        self.set(name, v)
    }

    /// Sets a declared uniform from loose components, checking them against the declared type.
    pub fn set_components(&self, name: &str, components: &[f32]) -> Result<(), UniformError> {
        let ty = self
            .declared_type(name)
            .ok_or_else(|| UniformError::Unknown(name.to_owned()))?;
        match UniformValue::from_components(ty, components) {
            Some(value) => self.set(name, value),
            None => Err(match components.len() {
                1 => mismatch(name, ty, UniformType::Float),
                2 => mismatch(name, ty, UniformType::Vec2),
                3 => mismatch(name, ty, UniformType::Vec3),
                4 => mismatch(name, ty, UniformType::Vec4),
                given => UniformError::ComponentCount {
                    name: name.to_owned(),
                    declared: ty,
                    given,
                },
            }),
        }
    }

    /// Unsets a uniform. The program keeps whatever value it was last given.
    pub fn clear(&self, name: &str) -> Result<(), UniformError> {
        self.0
            .borrow_mut()
            .get_mut(name)
            .map(|entry| entry.value = None)
            .ok_or_else(|| UniformError::Unknown(name.to_owned()))
    }

    /// Gets the current value of a uniform.
    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.0.borrow().get(name).and_then(|entry| entry.value)
    }

    /// Gets the declared type of a uniform.
    pub fn declared_type(&self, name: &str) -> Option<UniformType> {
        self.0.borrow().get(name).map(|entry| entry.ty)
    }

    /// Number of declared uniforms.
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Returns true if no uniforms were declared.
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

fn mismatch(name: &str, declared: UniformType, given: UniformType) -> UniformError {
    UniformError::TypeMismatch {
        name: name.to_owned(),
        declared,
        given,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [UniformType; 6] = [
        UniformType::Float,
        UniformType::Vec2,
        UniformType::Vec3,
        UniformType::Vec4,
        UniformType::Int,
        UniformType::Sampler2d,
    ];

    #[test]
    fn test_default_component_counts() {
        let counts: Vec<_> = ALL
            .iter()
            .map(|ty| ty.default_value().map(|v| v.component_count()))
            .collect();
        assert_eq!(counts, [Some(1), Some(2), Some(3), Some(4), Some(1), None]);

        for ty in ALL {
            assert_eq!(
                ty.default_value().map(|v| v.component_count()),
                ty.component_count()
            );
            if let Some(v) = ty.default_value() {
                assert_eq!(v.ty(), ty);
            }
        }
    }

    #[test]
    fn test_seeded_and_typed_writes() {
        let uniforms = Uniforms::default();
        uniforms.declare("u_mouse", UniformType::Vec2);
        uniforms.declare("u_image", UniformType::Sampler2d);

        assert_eq!(uniforms.get("u_mouse"), Some(UniformValue::Vec2(Vec2::ZERO)));
        assert_eq!(uniforms.get("u_image"), None);

        uniforms.set_vec2("u_mouse", Vec2::new(3.0, 4.0)).unwrap();
        assert_eq!(uniforms.get("u_mouse"), Some(UniformValue::Vec2(Vec2::new(3.0, 4.0))));

        assert_eq!(
            uniforms.set_float("u_mouse", 1.0),
            Err(UniformError::TypeMismatch {
                name: "u_mouse".into(),
                declared: UniformType::Vec2,
                given: UniformType::Float,
            })
        );
        // Rejected write leaves the old value.
        assert_eq!(uniforms.get("u_mouse"), Some(UniformValue::Vec2(Vec2::new(3.0, 4.0))));

        assert!(matches!(
            uniforms.set_float("u_image", 1.0),
            Err(UniformError::TypeMismatch { .. })
        ));
        assert_eq!(
            uniforms.set_int("u_nope", 1),
            Err(UniformError::Unknown("u_nope".into()))
        );
    }

    #[test]
    fn test_components() {
        let uniforms = Uniforms::default();
        uniforms.declare("u_color", UniformType::Vec3);
        uniforms.declare("u_count", UniformType::Int);

        uniforms.set_components("u_color", &[1.0, 0.5, 0.25]).unwrap();
        assert_eq!(
            uniforms.get("u_color"),
            Some(UniformValue::Vec3(Vec3::new(1.0, 0.5, 0.25)))
        );
        assert_eq!(
            uniforms.set_components("u_color", &[1.0]),
            Err(UniformError::TypeMismatch {
                name: "u_color".into(),
                declared: UniformType::Vec3,
                given: UniformType::Float,
            })
        );

        // No type has zero or five components.
        for len in [0, 5] {
            assert_eq!(
                uniforms.set_components("u_color", &vec![0.0; len]),
                Err(UniformError::ComponentCount {
                    name: "u_color".into(),
                    declared: UniformType::Vec3,
                    given: len,
                })
            );
        }
        assert_eq!(
            uniforms.get("u_color"),
            Some(UniformValue::Vec3(Vec3::new(1.0, 0.5, 0.25)))
        );

        uniforms.set_components("u_count", &[7.0]).unwrap();
        assert_eq!(uniforms.get("u_count"), Some(UniformValue::Int(7)));
    }

    #[test]
    fn test_clones_share_values() {
        let uniforms = Uniforms::default();
        uniforms.declare("u_hover", UniformType::Float);
        let handle = uniforms.clone();
        handle.set_float("u_hover", 0.5).unwrap();
        assert_eq!(uniforms.get("u_hover"), Some(UniformValue::Float(0.5)));

        uniforms.clear("u_hover").unwrap();
        assert_eq!(handle.get("u_hover"), None);
        assert_eq!(handle.len(), 1);
    }
}
