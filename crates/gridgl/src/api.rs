//! The backend seam: a safe trait over the raw GPU drawing API.
//!
//! Everything above this trait (buffers, programs, passes, the binding-state
//! cache) is backend-agnostic. Shader programs are opaque compiled units
//! supplied by name; a backend compiles/links them and reports link-time
//! reflection through [`ProgramInfo`].

use crate::error::Error;
use std::fmt;

/// What a buffer object stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Per-vertex or per-instance attribute data (f32 elements).
    Vertex,
    /// Triangle indices (u16 elements).
    Index,
}

/// Upload frequency hint forwarded to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageHint {
    Static,
    Dynamic,
    Stream,
}

/// Toggleable fixed-function capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    DepthTest,
    Blend,
    CullFace,
    ScissorTest,
}

/// Raw uniform type tags as reported by program introspection.
///
/// The values mirror the GL enum space so a GL-backed implementation can
/// report them verbatim; the set a program may actually use is validated in
/// [`crate::program`].
pub mod gltype {
    pub const BYTE: u32 = 0x1400;
    pub const UNSIGNED_BYTE: u32 = 0x1401;
    pub const SHORT: u32 = 0x1402;
    pub const UNSIGNED_SHORT: u32 = 0x1403;
    pub const INT: u32 = 0x1404;
    pub const UNSIGNED_INT: u32 = 0x1405;
    pub const FLOAT: u32 = 0x1406;

    pub const FLOAT_VEC2: u32 = 0x8B50;
    pub const FLOAT_VEC3: u32 = 0x8B51;
    pub const FLOAT_VEC4: u32 = 0x8B52;
    pub const INT_VEC2: u32 = 0x8B53;
    pub const INT_VEC3: u32 = 0x8B54;
    pub const INT_VEC4: u32 = 0x8B55;
    pub const BOOL: u32 = 0x8B56;
    pub const BOOL_VEC2: u32 = 0x8B57;
    pub const BOOL_VEC3: u32 = 0x8B58;
    pub const BOOL_VEC4: u32 = 0x8B59;
    pub const FLOAT_MAT2: u32 = 0x8B5A;
    pub const FLOAT_MAT3: u32 = 0x8B5B;
    pub const FLOAT_MAT4: u32 = 0x8B5C;
    pub const SAMPLER_2D: u32 = 0x8B5E;
    pub const SAMPLER_CUBE: u32 = 0x8B60;
}

/// A value pushed into a uniform slot.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    IVec2([i32; 2]),
    IVec3([i32; 3]),
    IVec4([i32; 4]),
    /// Column-major 2x2 matrix.
    Mat2([f32; 4]),
    /// Column-major 3x3 matrix.
    Mat3([f32; 9]),
    /// Column-major 4x4 matrix.
    Mat4([f32; 16]),
    /// Integer-family scalars and sampler texture units.
    Int(i32),
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<glam::Vec2> for UniformValue {
    fn from(v: glam::Vec2) -> Self {
        UniformValue::Vec2(v.to_array())
    }
}

impl From<glam::Vec3> for UniformValue {
    fn from(v: glam::Vec3) -> Self {
        UniformValue::Vec3(v.to_array())
    }
}

impl From<glam::Vec4> for UniformValue {
    fn from(v: glam::Vec4) -> Self {
        UniformValue::Vec4(v.to_array())
    }
}

impl From<glam::Mat3> for UniformValue {
    fn from(m: glam::Mat3) -> Self {
        UniformValue::Mat3(m.to_cols_array())
    }
}

impl From<glam::Mat4> for UniformValue {
    fn from(m: glam::Mat4) -> Self {
        UniformValue::Mat4(m.to_cols_array())
    }
}

/// An active attribute reported at link time.
#[derive(Debug, Clone)]
pub struct AttributeReflection {
    pub name: String,
    pub location: u32,
}

/// An active uniform reported at link time. `type_tag` is a [`gltype`] value.
#[derive(Debug, Clone)]
pub struct UniformReflection<L> {
    pub name: String,
    pub location: L,
    pub type_tag: u32,
}

/// Link-time reflection for a compiled program.
#[derive(Debug, Clone)]
pub struct ProgramInfo<L> {
    pub attributes: Vec<AttributeReflection>,
    pub uniforms: Vec<UniformReflection<L>>,
}

/// The raw drawing API a [`crate::Device`] drives.
///
/// Implementations are stateful in the GL sense: `buffer_data` and
/// `buffer_sub_data` act on the buffer currently bound to `kind`. The device
/// layer guarantees the bind happened (possibly elided through its cache)
/// before either is called.
pub trait DrawApi {
    type BufferId: Copy + Eq + fmt::Debug;
    type ProgramId: Copy + Eq + fmt::Debug;
    type UniformLocation: Clone + fmt::Debug;

    /// Whether the context exposes hardware instancing. Mandatory for
    /// device creation; there is no software fallback.
    fn supports_instancing(&self) -> bool;

    fn create_buffer(&mut self) -> Self::BufferId;
    fn bind_buffer(&mut self, kind: BufferKind, id: Self::BufferId);
    /// Uploads the full store of the currently bound buffer.
    fn buffer_data(&mut self, kind: BufferKind, bytes: &[u8], usage: UsageHint);
    /// Overwrites a byte range of the currently bound buffer.
    fn buffer_sub_data(&mut self, kind: BufferKind, byte_offset: usize, bytes: &[u8]);

    /// Compiles and links the named shader stages, returning the program
    /// handle and its reflection.
    fn create_program(
        &mut self,
        shaders: &[&str],
    ) -> Result<(Self::ProgramId, ProgramInfo<Self::UniformLocation>), Error>;
    fn use_program(&mut self, id: Self::ProgramId);

    fn enable_vertex_attrib(&mut self, index: u32);
    fn disable_vertex_attrib(&mut self, index: u32);
    /// Points an attribute location at the currently bound vertex buffer
    /// (f32 components, tightly packed).
    fn vertex_attrib_pointer(&mut self, location: u32, item_size: u32);
    fn vertex_attrib_divisor(&mut self, location: u32, divisor: u32);

    fn set_uniform(&mut self, location: &Self::UniformLocation, value: &UniformValue);

    fn set_capability(&mut self, cap: Capability, enabled: bool);
    fn set_depth_write(&mut self, enabled: bool);
    fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32);
    fn set_clear_color(&mut self, rgba: [f32; 4]);
    fn clear(&mut self, color: bool, depth: bool);

    /// One indexed triangle-list draw over the bound index buffer.
    fn draw_triangles(&mut self, index_count: u32);
    fn draw_triangles_instanced(&mut self, index_count: u32, instances: u32);
}
