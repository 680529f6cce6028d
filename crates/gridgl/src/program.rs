//! Compiled shader programs: link-time introspection and uniform dispatch.

use crate::api::{gltype, DrawApi, ProgramInfo, UniformValue};
use crate::device::BindingState;
use crate::error::Error;
use std::collections::HashMap;

/// Bind behavior selected once per uniform from its declared type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    IntVec2,
    IntVec3,
    IntVec4,
    Mat2,
    Mat3,
    Mat4,
    /// Byte/short/int scalars, signed or not, all bound as a single int.
    Int,
    /// Sampler handles, bound as the texture unit index.
    Sampler,
}

impl UniformType {
    /// Maps a raw introspection tag to a bind behavior. Boolean-family tags
    /// and anything outside the known set fail program construction.
    pub fn from_tag(name: &str, tag: u32) -> Result<Self, Error> {
        let ty = match tag {
            gltype::FLOAT => UniformType::Float,
            gltype::FLOAT_VEC2 => UniformType::Vec2,
            gltype::FLOAT_VEC3 => UniformType::Vec3,
            gltype::FLOAT_VEC4 => UniformType::Vec4,
            gltype::INT_VEC2 => UniformType::IntVec2,
            gltype::INT_VEC3 => UniformType::IntVec3,
            gltype::INT_VEC4 => UniformType::IntVec4,
            gltype::FLOAT_MAT2 => UniformType::Mat2,
            gltype::FLOAT_MAT3 => UniformType::Mat3,
            gltype::FLOAT_MAT4 => UniformType::Mat4,
            gltype::BYTE
            | gltype::UNSIGNED_BYTE
            | gltype::SHORT
            | gltype::UNSIGNED_SHORT
            | gltype::INT
            | gltype::UNSIGNED_INT => UniformType::Int,
            gltype::SAMPLER_2D | gltype::SAMPLER_CUBE => UniformType::Sampler,
            _ => {
                return Err(Error::UnsupportedUniformType {
                    name: name.to_owned(),
                    tag,
                })
            }
        };
        Ok(ty)
    }

    fn accepts(self, value: &UniformValue) -> bool {
        matches!(
            (self, value),
            (UniformType::Float, UniformValue::Float(_))
                | (UniformType::Vec2, UniformValue::Vec2(_))
                | (UniformType::Vec3, UniformValue::Vec3(_))
                | (UniformType::Vec4, UniformValue::Vec4(_))
                | (UniformType::IntVec2, UniformValue::IVec2(_))
                | (UniformType::IntVec3, UniformValue::IVec3(_))
                | (UniformType::IntVec4, UniformValue::IVec4(_))
                | (UniformType::Mat2, UniformValue::Mat2(_))
                | (UniformType::Mat3, UniformValue::Mat3(_))
                | (UniformType::Mat4, UniformValue::Mat4(_))
                | (UniformType::Int, UniformValue::Int(_))
                | (UniformType::Sampler, UniformValue::Int(_))
        )
    }
}

#[derive(Debug, Clone)]
struct UniformSlot<L> {
    location: L,
    ty: UniformType,
}

/// A linked program with its introspected attribute and uniform tables.
/// Introspection happens once at construction; the tables are immutable.
pub struct ShaderProgram<A: DrawApi> {
    pub(crate) id: A::ProgramId,
    attributes: HashMap<String, u32>,
    uniforms: HashMap<String, UniformSlot<A::UniformLocation>>,
    max_attribute: i32,
}

impl<A: DrawApi> ShaderProgram<A> {
    pub(crate) fn from_info(
        id: A::ProgramId,
        info: ProgramInfo<A::UniformLocation>,
    ) -> Result<Self, Error> {
        let mut attributes = HashMap::new();
        let mut max_attribute = -1;
        for attr in info.attributes {
            max_attribute = max_attribute.max(attr.location as i32);
            attributes.insert(attr.name, attr.location);
        }

        let mut uniforms = HashMap::new();
        for uni in info.uniforms {
            let ty = UniformType::from_tag(&uni.name, uni.type_tag)?;
            uniforms.insert(
                uni.name,
                UniformSlot {
                    location: uni.location,
                    ty,
                },
            );
        }

        Ok(Self {
            id,
            attributes,
            uniforms,
            max_attribute,
        })
    }

    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).copied()
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.contains_key(name)
    }

    /// Highest attribute location this program uses; -1 when it has none.
    pub fn max_attribute(&self) -> i32 {
        self.max_attribute
    }

    /// Adjusts the enabled-attribute range to exactly `[0, max_attribute]`
    /// by walking only the delta against the device watermark, then makes
    /// the program current.
    pub(crate) fn activate(&self, api: &mut A, state: &mut BindingState<A>) {
        let prev = state.max_enabled_attrib;
        let want = self.max_attribute;

        if prev > want {
            for i in (want + 1)..=prev {
                api.disable_vertex_attrib(i as u32);
            }
        } else {
            for i in (prev + 1)..=want {
                api.enable_vertex_attrib(i as u32);
            }
        }
        state.max_enabled_attrib = want;

        api.use_program(self.id);
    }

    /// Pushes a value through the uniform's bind function.
    ///
    /// Unknown names are logged and skipped so draws survive uniforms the
    /// shader compiler optimized away; strict mode turns that into an error.
    pub(crate) fn bind_uniform(
        &self,
        api: &mut A,
        name: &str,
        value: &UniformValue,
        strict: bool,
    ) -> Result<(), Error> {
        let Some(slot) = self.uniforms.get(name) else {
            if strict {
                return Err(Error::UnknownUniform {
                    name: name.to_owned(),
                });
            }
            log::warn!("uniform `{name}` not found in program (optimized away?); skipping");
            return Ok(());
        };

        if !slot.ty.accepts(value) {
            return Err(Error::UniformTypeMismatch {
                name: name.to_owned(),
            });
        }

        api.set_uniform(&slot.location, value);
        Ok(())
    }
}
