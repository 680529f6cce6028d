//! A headless drawing API: no GPU, just a call log.
//!
//! Shader programs are opaque units supplied by name, so the headless
//! backend keeps a registry of [`ShaderSpec`]s: the reflection a real
//! backend would produce at link time. Asking for an unregistered shader
//! pair fails the same way a real compile failure would.
//!
//! Every call the device layer issues is recorded, which is what the test
//! suite inspects to assert binding elision, watermark deltas, and draw
//! call shapes.

use crate::api::{
    AttributeReflection, BufferKind, Capability, DrawApi, ProgramInfo, UniformReflection,
    UniformValue, UsageHint,
};
use crate::error::Error;
use std::collections::HashMap;

/// Reflection data registered for a shader-name pair. Locations are
/// assigned in registration order.
#[derive(Debug, Clone, Default)]
pub struct ShaderSpec {
    attributes: Vec<String>,
    uniforms: Vec<(String, u32)>,
}

impl ShaderSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.push(name.into());
        self
    }

    /// `type_tag` is a [`crate::api::gltype`] value.
    pub fn uniform(mut self, name: impl Into<String>, type_tag: u32) -> Self {
        self.uniforms.push((name.into(), type_tag));
        self
    }
}

/// Everything the device layer can ask of a backend, as data.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateBuffer(u32),
    BindBuffer { kind: BufferKind, id: u32 },
    BufferData { kind: BufferKind, len: usize, usage: UsageHint },
    BufferSubData { kind: BufferKind, offset: usize, len: usize },
    UseProgram(u32),
    EnableAttrib(u32),
    DisableAttrib(u32),
    AttribPointer { location: u32, item_size: u32 },
    AttribDivisor { location: u32, divisor: u32 },
    Uniform { location: u32, value: UniformValue },
    SetCapability { cap: Capability, enabled: bool },
    DepthWrite(bool),
    Viewport { x: i32, y: i32, width: u32, height: u32 },
    ClearColor([f32; 4]),
    Clear { color: bool, depth: bool },
    DrawTriangles { indices: u32 },
    DrawTrianglesInstanced { indices: u32, instances: u32 },
}

pub struct HeadlessApi {
    registry: HashMap<String, ShaderSpec>,
    calls: Vec<Call>,
    next_buffer: u32,
    next_program: u32,
    instancing: bool,
}

impl HeadlessApi {
    pub fn new() -> Self {
        Self {
            registry: HashMap::new(),
            calls: Vec::new(),
            next_buffer: 1,
            next_program: 1,
            instancing: true,
        }
    }

    /// A context without the instancing capability; device creation must
    /// refuse it.
    pub fn without_instancing() -> Self {
        Self {
            instancing: false,
            ..Self::new()
        }
    }

    /// Registers the reflection the given shader-name set links to.
    pub fn register_program(&mut self, shaders: &[&str], spec: ShaderSpec) {
        self.registry.insert(Self::key(shaders), spec);
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Drains the call log, handy for asserting over a single operation.
    pub fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    pub fn draw_call_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    Call::DrawTriangles { .. } | Call::DrawTrianglesInstanced { .. }
                )
            })
            .count()
    }

    fn key(shaders: &[&str]) -> String {
        shaders.join("+")
    }
}

impl Default for HeadlessApi {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawApi for HeadlessApi {
    type BufferId = u32;
    type ProgramId = u32;
    type UniformLocation = u32;

    fn supports_instancing(&self) -> bool {
        self.instancing
    }

    fn create_buffer(&mut self) -> u32 {
        let id = self.next_buffer;
        self.next_buffer += 1;
        self.calls.push(Call::CreateBuffer(id));
        id
    }

    fn bind_buffer(&mut self, kind: BufferKind, id: u32) {
        self.calls.push(Call::BindBuffer { kind, id });
    }

    fn buffer_data(&mut self, kind: BufferKind, bytes: &[u8], usage: UsageHint) {
        self.calls.push(Call::BufferData {
            kind,
            len: bytes.len(),
            usage,
        });
    }

    fn buffer_sub_data(&mut self, kind: BufferKind, byte_offset: usize, bytes: &[u8]) {
        self.calls.push(Call::BufferSubData {
            kind,
            offset: byte_offset,
            len: bytes.len(),
        });
    }

    fn create_program(&mut self, shaders: &[&str]) -> Result<(u32, ProgramInfo<u32>), Error> {
        let key = Self::key(shaders);
        let spec = self.registry.get(&key).ok_or_else(|| Error::ShaderCompile {
            name: key.clone(),
            log: "no shader registered under this name".into(),
        })?;

        let attributes = spec
            .attributes
            .iter()
            .enumerate()
            .map(|(i, name)| AttributeReflection {
                name: name.clone(),
                location: i as u32,
            })
            .collect();
        let uniforms = spec
            .uniforms
            .iter()
            .enumerate()
            .map(|(i, (name, type_tag))| UniformReflection {
                name: name.clone(),
                location: i as u32,
                type_tag: *type_tag,
            })
            .collect();

        let id = self.next_program;
        self.next_program += 1;
        Ok((id, ProgramInfo { attributes, uniforms }))
    }

    fn use_program(&mut self, id: u32) {
        self.calls.push(Call::UseProgram(id));
    }

    fn enable_vertex_attrib(&mut self, index: u32) {
        self.calls.push(Call::EnableAttrib(index));
    }

    fn disable_vertex_attrib(&mut self, index: u32) {
        self.calls.push(Call::DisableAttrib(index));
    }

    fn vertex_attrib_pointer(&mut self, location: u32, item_size: u32) {
        self.calls.push(Call::AttribPointer {
            location,
            item_size,
        });
    }

    fn vertex_attrib_divisor(&mut self, location: u32, divisor: u32) {
        self.calls.push(Call::AttribDivisor { location, divisor });
    }

    fn set_uniform(&mut self, location: &u32, value: &UniformValue) {
        self.calls.push(Call::Uniform {
            location: *location,
            value: value.clone(),
        });
    }

    fn set_capability(&mut self, cap: Capability, enabled: bool) {
        self.calls.push(Call::SetCapability { cap, enabled });
    }

    fn set_depth_write(&mut self, enabled: bool) {
        self.calls.push(Call::DepthWrite(enabled));
    }

    fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.calls.push(Call::Viewport {
            x,
            y,
            width,
            height,
        });
    }

    fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.calls.push(Call::ClearColor(rgba));
    }

    fn clear(&mut self, color: bool, depth: bool) {
        self.calls.push(Call::Clear { color, depth });
    }

    fn draw_triangles(&mut self, index_count: u32) {
        self.calls.push(Call::DrawTriangles {
            indices: index_count,
        });
    }

    fn draw_triangles_instanced(&mut self, index_count: u32, instances: u32) {
        self.calls.push(Call::DrawTrianglesInstanced {
            indices: index_count,
            instances,
        });
    }
}
