// SPDX-FileCopyrightText: 2021 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::error::Error;
use linear_map::LinearMap;
use serde::Deserialize;
use std::mem::size_of;

/// One attribute read from the interleaved instance buffer. Every component is an [`prim@f32`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AttributeDesc {
    /// Number of components, `1..=4`.
    pub size: u8,
    /// Advance once per instance instead of once per vertex.
    #[serde(default = "instanced_default")]
    pub instanced: bool,
}

fn instanced_default() -> bool {
    true
}

impl AttributeDesc {
    /// An attribute that advances once per instance.
    pub fn instanced(size: u8) -> Self {
        Self {
            size,
            instanced: true,
        }
    }

    /// An attribute that advances once per vertex.
    pub fn per_vertex(size: u8) -> Self {
        Self {
            size,
            instanced: false,
        }
    }

    /// Size in bytes.
    pub fn bytes(&self) -> usize {
        self.size as usize * size_of::<f32>()
    }
}

/// Layout of the interleaved instance buffer. The declaration order must match the order the
/// caller writes fields into the buffer passed to
/// [`Renderer::set_data`][`crate::Renderer::set_data`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct AttributeLayout(LinearMap<String, AttributeDesc>);

impl AttributeLayout {
    /// Creates an empty [`AttributeLayout`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an attribute.
    pub fn with(mut self, name: impl Into<String>, desc: AttributeDesc) -> Self {
        self.push(name, desc);
        self
    }

    /// Appends an attribute. Redeclaring a name keeps its original position.
    pub fn push(&mut self, name: impl Into<String>, desc: AttributeDesc) {
        self.0.insert(name.into(), desc);
    }

    /// Bytes between consecutive instances.
    pub fn stride(&self) -> usize {
        self.0.values().map(AttributeDesc::bytes).sum()
    }

    /// [`prim@f32`]s per instance.
    pub fn stride_components(&self) -> usize {
        self.stride() / size_of::<f32>()
    }

    /// Iterates attributes in declaration order along with their byte offset.
    pub fn offsets(&self) -> impl Iterator<Item = (&str, AttributeDesc, usize)> {
        self.0.iter().scan(0, |offset, (name, desc)| {
            let o = *offset;
            *offset += desc.bytes();
            Some((name.as_str(), *desc, o))
        })
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.is_empty() {
            return Err(Error::Configuration(
                "instanced mode requires at least one attribute".into(),
            ));
        }
        for (name, desc) in self.0.iter() {
            if !(1..=4).contains(&desc.size) {
                return Err(Error::Configuration(format!(
                    "attribute {} has {} components (must be 1 to 4)",
                    name, desc.size
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stride_and_offsets() {
        let layout = AttributeLayout::new()
            .with("a_rect", AttributeDesc::instanced(4))
            .with("a_hover", AttributeDesc::instanced(1))
            .with("a_color", AttributeDesc::instanced(3));

        assert_eq!(layout.stride(), (4 + 1 + 3) * 4);
        assert_eq!(layout.stride_components(), 8);

        let offsets: Vec<_> = layout.offsets().map(|(n, _, o)| (n, o)).collect();
        assert_eq!(offsets, [("a_rect", 0), ("a_hover", 16), ("a_color", 20)]);
    }

    #[test]
    fn test_validate() {
        assert!(matches!(
            AttributeLayout::new().validate(),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            AttributeLayout::new()
                .with("a_big", AttributeDesc::instanced(5))
                .validate(),
            Err(Error::Configuration(_))
        ));
        assert!(AttributeLayout::new()
            .with("a_ok", AttributeDesc::per_vertex(2))
            .validate()
            .is_ok());
    }
}
