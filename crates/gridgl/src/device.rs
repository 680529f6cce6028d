//! The device: owns the drawing API and the binding-state cache.
//!
//! All binds, state toggles, and draws funnel through the device so that the
//! cache (bound buffer, enabled-attribute watermark, capability flags) stays
//! a single explicit struct rather than hidden global state. Correctness of
//! the cache depends on strict sequential ordering; nothing here is
//! reentrant.

use crate::api::{Capability, DrawApi};
use crate::buffer::{BufferData, BufferDesc, BufferHandle, GpuBuffer};
use crate::camera::Camera;
use crate::error::Error;
use crate::pass::{PassDesc, PassHandle, RenderPass};
use crate::program::ShaderProgram;
use crate::scene::Scene;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Cached GPU binding state.
#[derive(Debug)]
pub struct BindingState<A: DrawApi> {
    /// The buffer last bound through the device, any kind. A single slot,
    /// so binds alternating between two buffers are never elided.
    pub(crate) bound_buffer: Option<A::BufferId>,
    /// Highest vertex-attribute index currently enabled; -1 when none.
    pub(crate) max_enabled_attrib: i32,
    caps: HashMap<Capability, bool>,
    depth_write: Option<bool>,
}

impl<A: DrawApi> BindingState<A> {
    fn new() -> Self {
        Self {
            bound_buffer: None,
            max_enabled_attrib: -1,
            caps: HashMap::new(),
            depth_write: None,
        }
    }
}

/// Owns the graphics context and hands out buffers, programs, and passes.
pub struct Device<A: DrawApi> {
    pub(crate) api: A,
    pub(crate) state: BindingState<A>,
    strict_uniforms: bool,
}

impl<A: DrawApi> Device<A> {
    /// Wraps a drawing API. Fails when the context lacks the mandatory
    /// hardware-instancing capability; there is no software fallback.
    pub fn new(api: A) -> Result<Self, Error> {
        if !api.supports_instancing() {
            return Err(Error::Initialization(
                "hardware instancing is unavailable".into(),
            ));
        }

        Ok(Self {
            api,
            state: BindingState::new(),
            strict_uniforms: false,
        })
    }

    /// The underlying API, e.g. for inspecting a recording backend.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Mutable backend access. State changed behind the device's back is
    /// not reflected in the binding cache.
    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }

    /// When set, referencing a uniform the program does not expose is a hard
    /// [`Error::UnknownUniform`] instead of a logged skip.
    pub fn set_strict_uniforms(&mut self, strict: bool) {
        self.strict_uniforms = strict;
    }

    pub(crate) fn strict_uniforms(&self) -> bool {
        self.strict_uniforms
    }

    /// Allocates a buffer and uploads its full contents. The element count
    /// is fixed from here on.
    pub fn create_buffer(&mut self, desc: BufferDesc<'_>) -> Result<BufferHandle<A>, Error> {
        let id = self.api.create_buffer();
        let buffer = GpuBuffer::new(id, &desc)?;

        self.bind_buffer(&buffer);
        self.api
            .buffer_data(buffer.kind(), buffer.mirror.as_bytes(), desc.usage);

        Ok(Rc::new(RefCell::new(buffer)))
    }

    /// Overwrites `[offset_items * item_size, ..)` in the mirror and pushes
    /// only that sub-range to the GPU, never the whole buffer.
    pub fn write_buffer(
        &mut self,
        buffer: &BufferHandle<A>,
        offset_items: usize,
        data: BufferData<'_>,
    ) -> Result<(), Error> {
        let mut buf = buffer.borrow_mut();
        let (byte_offset, byte_len) = buf.write_mirror(offset_items, &data)?;

        self.bind_buffer(&buf);
        self.api
            .buffer_sub_data(buf.kind(), byte_offset, buf.mirror_bytes(byte_offset, byte_len));
        Ok(())
    }

    /// Compiles, links, and introspects a program from opaque shader names.
    pub fn create_program(&mut self, shaders: &[&str]) -> Result<Rc<ShaderProgram<A>>, Error> {
        let (id, info) = self.api.create_program(shaders)?;
        Ok(Rc::new(ShaderProgram::from_info(id, info)?))
    }

    /// Validates pass wiring (exactly one index buffer, vertex-kind
    /// attributes) and returns a shareable pass handle.
    pub fn create_pass(&self, desc: PassDesc<A>) -> Result<PassHandle<A>, Error> {
        Ok(Rc::new(RefCell::new(RenderPass::from_desc(desc)?)))
    }

    /// Binds a buffer, elided when it is already the cached bound buffer.
    pub(crate) fn bind_buffer(&mut self, buffer: &GpuBuffer<A>) {
        if self.state.bound_buffer == Some(buffer.id) {
            return;
        }
        self.api.bind_buffer(buffer.kind(), buffer.id);
        self.state.bound_buffer = Some(buffer.id);
    }

    /// Enables or disables a capability, issuing the backend call only when
    /// the cached flag differs. The cache is updated unconditionally.
    pub fn set_capability(&mut self, cap: Capability, enabled: bool) {
        if self.state.caps.get(&cap) != Some(&enabled) {
            self.api.set_capability(cap, enabled);
        }
        self.state.caps.insert(cap, enabled);
    }

    /// Toggles depth writes through the same differs-then-cache policy.
    pub fn set_depth_write(&mut self, enabled: bool) {
        if self.state.depth_write != Some(enabled) {
            self.api.set_depth_write(enabled);
        }
        self.state.depth_write = Some(enabled);
    }

    pub(crate) fn activate_program(&mut self, program: &ShaderProgram<A>) {
        let Device { api, state, .. } = self;
        program.activate(api, state);
    }

    /// Recomputes the camera projection for the new viewport and updates the
    /// backend viewport rectangle.
    pub fn resize_viewport(&mut self, camera: &mut Camera, width: u32, height: u32) {
        camera.viewport_resized(width, height);
        self.api.set_viewport(0, 0, width, height);
    }

    /// A full frame: clear color/depth with the camera's clear color, then
    /// render the scene in priority order. Callers must not interleave
    /// frames; this is the unit of atomicity.
    pub fn render_frame(&mut self, scene: &Scene<A>, camera: &Camera) -> Result<(), Error> {
        self.api.set_clear_color(camera.clear_color.to_array());
        self.api.clear(true, true);
        scene.render(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{Call, HeadlessApi};

    #[test]
    fn missing_instancing_fails_initialization() {
        let api = HeadlessApi::without_instancing();
        match Device::new(api) {
            Err(Error::Initialization(_)) => {}
            other => panic!("expected Initialization error, got {:?}", other.err()),
        }
    }

    #[test]
    fn capability_calls_are_elided_when_cached() {
        let mut device = Device::new(HeadlessApi::new()).unwrap();

        device.set_capability(Capability::DepthTest, true);
        device.set_capability(Capability::DepthTest, true);
        device.set_capability(Capability::DepthTest, false);
        device.set_capability(Capability::Blend, false);

        let toggles: Vec<_> = device
            .api()
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::SetCapability { .. }))
            .collect();
        // Repeated DepthTest=true issues one call; the flip and the first
        // Blend call each issue one.
        assert_eq!(toggles.len(), 3);
    }

    #[test]
    fn depth_write_cache_suppresses_repeats() {
        let mut device = Device::new(HeadlessApi::new()).unwrap();

        device.set_depth_write(false);
        device.set_depth_write(false);
        device.set_depth_write(true);

        let n = device
            .api()
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::DepthWrite(_)))
            .count();
        assert_eq!(n, 2);
    }

    #[test]
    fn rebinding_the_same_buffer_is_elided() {
        let mut device = Device::new(HeadlessApi::new()).unwrap();
        let buf = device
            .create_buffer(BufferDesc::vertex(&[0.0, 1.0, 2.0, 3.0], 2))
            .unwrap();

        // Two sub-range updates to the already-bound buffer; only the
        // creation should have issued a bind.
        device
            .write_buffer(&buf, 0, BufferData::Vertex(&[9.0, 9.0]))
            .unwrap();
        device
            .write_buffer(&buf, 1, BufferData::Vertex(&[8.0, 8.0]))
            .unwrap();

        let binds = device
            .api()
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::BindBuffer { .. }))
            .count();
        assert_eq!(binds, 1);
    }
}
