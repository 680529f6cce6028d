//! Render passes: one program, a set of attribute buffers (optionally
//! instanced), exactly one index buffer, and late-bound uniform sources.

use crate::api::{BufferKind, Capability, DrawApi, UniformValue};
use crate::buffer::BufferHandle;
use crate::device::Device;
use crate::error::Error;
use crate::program::ShaderProgram;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to a pass; scenes and the owner both keep one.
pub type PassHandle<A> = Rc<RefCell<RenderPass<A>>>;

/// Anything that can supply uniform values by field name at render time.
/// [`crate::Camera`] implements this for `"perspective"` and `"view"`.
pub trait UniformFeed {
    fn uniform(&self, field: &str) -> Option<UniformValue>;
}

/// Late-bound uniform source, resolved on every draw.
#[derive(Clone)]
pub enum UniformSource {
    /// A fixed value.
    Constant(UniformValue),
    /// `feed[field]`, sampled at render time so shared objects (the camera)
    /// feed their current state into every draw.
    Field {
        feed: Rc<RefCell<dyn UniformFeed>>,
        field: String,
    },
}

impl UniformSource {
    pub fn constant(value: impl Into<UniformValue>) -> Self {
        UniformSource::Constant(value.into())
    }

    pub fn field(feed: Rc<RefCell<dyn UniformFeed>>, field: impl Into<String>) -> Self {
        UniformSource::Field {
            feed,
            field: field.into(),
        }
    }

    fn resolve(&self) -> Option<UniformValue> {
        match self {
            UniformSource::Constant(value) => Some(value.clone()),
            UniformSource::Field { feed, field } => feed.borrow().uniform(field),
        }
    }
}

struct AttributeBinding<A: DrawApi> {
    name: String,
    location: u32,
    buffer: BufferHandle<A>,
    divisor: u32,
}

/// Builder-style pass description consumed by [`Device::create_pass`].
pub struct PassDesc<A: DrawApi> {
    program: Rc<ShaderProgram<A>>,
    attributes: Vec<(String, BufferHandle<A>, u32)>,
    extra: Vec<BufferHandle<A>>,
    depth_test: bool,
    depth_write: bool,
}

impl<A: DrawApi> PassDesc<A> {
    pub fn new(program: Rc<ShaderProgram<A>>) -> Self {
        Self {
            program,
            attributes: Vec::new(),
            extra: Vec::new(),
            depth_test: true,
            depth_write: true,
        }
    }

    /// Binds a buffer to a named attribute, advanced per vertex.
    pub fn attribute(mut self, name: impl Into<String>, buffer: BufferHandle<A>) -> Self {
        self.attributes.push((name.into(), buffer, 0));
        self
    }

    /// Binds a buffer to a named attribute, advanced per `divisor` instances.
    pub fn instanced(
        mut self,
        name: impl Into<String>,
        buffer: BufferHandle<A>,
        divisor: u32,
    ) -> Self {
        self.attributes.push((name.into(), buffer, divisor));
        self
    }

    /// Adds a non-attribute buffer. An index buffer goes here; supplying a
    /// second one fails construction.
    pub fn buffer(mut self, buffer: BufferHandle<A>) -> Self {
        self.extra.push(buffer);
        self
    }

    pub fn depth_test(mut self, enabled: bool) -> Self {
        self.depth_test = enabled;
        self
    }

    pub fn depth_write(mut self, enabled: bool) -> Self {
        self.depth_write = enabled;
        self
    }
}

/// One draw call's worth of configuration.
pub struct RenderPass<A: DrawApi> {
    program: Rc<ShaderProgram<A>>,
    attributes: Vec<AttributeBinding<A>>,
    extra_buffers: Vec<BufferHandle<A>>,
    index_buffer: Option<BufferHandle<A>>,
    uniforms: Vec<(String, UniformSource)>,
    depth_test: bool,
    depth_write: bool,
    active: bool,
    instance_count: usize,
}

impl<A: DrawApi> RenderPass<A> {
    pub(crate) fn from_desc(desc: PassDesc<A>) -> Result<Self, Error> {
        let mut attributes = Vec::with_capacity(desc.attributes.len());
        let mut instance_count = 0usize;

        for (name, buffer, divisor) in desc.attributes {
            if buffer.borrow().kind() != BufferKind::Vertex {
                return Err(Error::Configuration("incorrect buffer type".into()));
            }
            let location = desc.program.attribute_location(&name).ok_or_else(|| {
                Error::Configuration(format!("program has no attribute `{name}`"))
            })?;
            if divisor > 0 {
                instance_count = instance_count.max(buffer.borrow().len_items());
            }
            attributes.push(AttributeBinding {
                name,
                location,
                buffer,
                divisor,
            });
        }

        let mut index_buffer = None;
        let mut extra_buffers = Vec::new();
        for buffer in desc.extra {
            if buffer.borrow().kind() == BufferKind::Index {
                if index_buffer.is_some() {
                    return Err(Error::Configuration("two index buffers".into()));
                }
                index_buffer = Some(buffer);
            } else {
                extra_buffers.push(buffer);
            }
        }

        Ok(Self {
            program: desc.program,
            attributes,
            extra_buffers,
            index_buffer,
            uniforms: Vec::new(),
            depth_test: desc.depth_test,
            depth_write: desc.depth_write,
            active: true,
            instance_count,
        })
    }

    /// Registers (or replaces) a late-bound uniform source.
    pub fn set_uniform(&mut self, name: impl Into<String>, source: UniformSource) {
        let name = name.into();
        if let Some(slot) = self.uniforms.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = source;
        } else {
            self.uniforms.push((name, source));
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Instance count: the max item length among divisor>0 attribute
    /// buffers; 0 means the draw is non-instanced.
    pub fn instance_count(&self) -> usize {
        self.instance_count
    }

    /// Issues exactly one draw call: activate the program, bind attribute
    /// and index buffers, resolve and push uniforms, reconcile depth state
    /// against the device cache, then draw.
    pub fn render(&self, device: &mut Device<A>) -> Result<(), Error> {
        if !self.active {
            return Ok(());
        }

        let index_buffer = self.index_buffer.as_ref().ok_or(Error::MissingIndexBuffer)?;

        device.activate_program(&self.program);

        for binding in &self.attributes {
            let buffer = binding.buffer.borrow();
            device.bind_buffer(&buffer);
            device
                .api
                .vertex_attrib_pointer(binding.location, buffer.item_size() as u32);
            // An instanced pass sets the divisor on every attribute,
            // including the divisor-0 ones.
            if self.instance_count > 0 {
                device
                    .api
                    .vertex_attrib_divisor(binding.location, binding.divisor);
            }
        }

        for buffer in &self.extra_buffers {
            device.bind_buffer(&buffer.borrow());
        }
        device.bind_buffer(&index_buffer.borrow());

        let strict = device.strict_uniforms();
        for (name, source) in &self.uniforms {
            match source.resolve() {
                Some(value) => {
                    self.program
                        .bind_uniform(&mut device.api, name, &value, strict)?
                }
                None => {
                    if strict {
                        return Err(Error::EmptyUniformSource { name: name.clone() });
                    }
                    log::warn!("uniform source for `{name}` yielded no value; skipping");
                }
            }
        }

        device.set_depth_write(self.depth_write);
        device.set_capability(Capability::DepthTest, self.depth_test);

        let index_count = index_buffer.borrow().elements() as u32;
        if self.instance_count > 0 {
            device
                .api
                .draw_triangles_instanced(index_count, self.instance_count as u32);
        } else {
            device.api.draw_triangles(index_count);
        }
        Ok(())
    }

    /// Attribute names in registration order, mostly for diagnostics.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|b| b.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::gltype;
    use crate::buffer::BufferDesc;
    use crate::headless::{Call, HeadlessApi, ShaderSpec};

    fn test_device() -> Device<HeadlessApi> {
        let mut api = HeadlessApi::new();
        api.register_program(
            &["cell.vert", "cell.frag"],
            ShaderSpec::new()
                .attribute("a_position")
                .attribute("a_offset")
                .attribute("a_scale")
                .uniform("u_projection", gltype::FLOAT_MAT4)
                .uniform("u_view", gltype::FLOAT_MAT4),
        );
        Device::new(api).unwrap()
    }

    fn quad_buffers(
        device: &mut Device<HeadlessApi>,
    ) -> (BufferHandle<HeadlessApi>, BufferHandle<HeadlessApi>) {
        let vertices = device
            .create_buffer(BufferDesc::vertex(&[0.0; 8], 2))
            .unwrap();
        let indices = device
            .create_buffer(BufferDesc::index(&[0, 1, 2, 2, 3, 0]))
            .unwrap();
        (vertices, indices)
    }

    #[test]
    fn two_index_buffers_fail_construction() {
        let mut device = test_device();
        let program = device.create_program(&["cell.vert", "cell.frag"]).unwrap();
        let (vertices, indices) = quad_buffers(&mut device);
        let second = device.create_buffer(BufferDesc::index(&[0, 1, 2])).unwrap();

        let result = device.create_pass(
            PassDesc::new(program)
                .attribute("a_position", vertices)
                .buffer(indices)
                .buffer(second),
        );
        match result {
            Err(Error::Configuration(msg)) => assert_eq!(msg, "two index buffers"),
            other => panic!("expected Configuration error, got {:?}", other.err()),
        }
    }

    #[test]
    fn index_buffer_as_attribute_fails_construction() {
        let mut device = test_device();
        let program = device.create_program(&["cell.vert", "cell.frag"]).unwrap();
        let indices = device.create_buffer(BufferDesc::index(&[0, 1, 2])).unwrap();

        let result = device.create_pass(PassDesc::new(program).attribute("a_position", indices));
        match result {
            Err(Error::Configuration(msg)) => assert_eq!(msg, "incorrect buffer type"),
            other => panic!("expected Configuration error, got {:?}", other.err()),
        }
    }

    #[test]
    fn unknown_attribute_name_fails_construction() {
        let mut device = test_device();
        let program = device.create_program(&["cell.vert", "cell.frag"]).unwrap();
        let (vertices, indices) = quad_buffers(&mut device);

        let result = device.create_pass(
            PassDesc::new(program)
                .attribute("a_missing", vertices)
                .buffer(indices),
        );
        match result {
            Err(Error::Configuration(msg)) => assert!(msg.contains("a_missing"), "{msg}"),
            other => panic!("expected Configuration error, got {:?}", other.err()),
        }
    }

    #[test]
    fn rendering_without_index_buffer_fails() {
        let mut device = test_device();
        let program = device.create_program(&["cell.vert", "cell.frag"]).unwrap();
        let (vertices, _indices) = quad_buffers(&mut device);

        let pass = device
            .create_pass(PassDesc::new(program).attribute("a_position", vertices))
            .unwrap();
        assert!(matches!(
            pass.borrow().render(&mut device),
            Err(Error::MissingIndexBuffer)
        ));
    }

    #[test]
    fn non_instanced_pass_issues_one_plain_draw() {
        let mut device = test_device();
        let program = device.create_program(&["cell.vert", "cell.frag"]).unwrap();
        let (vertices, indices) = quad_buffers(&mut device);

        let pass = device
            .create_pass(
                PassDesc::new(program)
                    .attribute("a_position", vertices)
                    .buffer(indices),
            )
            .unwrap();
        assert_eq!(pass.borrow().instance_count(), 0);

        device.api_mut().take_calls();
        pass.borrow().render(&mut device).unwrap();

        let calls = device.api_mut().take_calls();
        let draws: Vec<_> = calls
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    Call::DrawTriangles { .. } | Call::DrawTrianglesInstanced { .. }
                )
            })
            .collect();
        assert_eq!(draws.len(), 1);
        assert!(matches!(draws[0], Call::DrawTriangles { indices: 6 }));
    }

    #[test]
    fn instance_count_is_max_of_divisor_buffers() {
        let mut device = test_device();
        let program = device.create_program(&["cell.vert", "cell.frag"]).unwrap();
        let (vertices, indices) = quad_buffers(&mut device);
        // Lengths in items: vertices 4 (divisor 0), offsets 7, scales 7.
        let offsets = device
            .create_buffer(BufferDesc::vertex(&[0.0; 21], 3))
            .unwrap();
        let scales = device
            .create_buffer(BufferDesc::vertex(&[1.0; 7], 1))
            .unwrap();

        let pass = device
            .create_pass(
                PassDesc::new(program)
                    .attribute("a_position", vertices)
                    .instanced("a_offset", offsets, 1)
                    .instanced("a_scale", scales, 1)
                    .buffer(indices),
            )
            .unwrap();
        assert_eq!(pass.borrow().instance_count(), 7);

        device.api_mut().take_calls();
        pass.borrow().render(&mut device).unwrap();

        let calls = device.api_mut().take_calls();
        assert!(calls.iter().any(|c| matches!(
            c,
            Call::DrawTrianglesInstanced {
                indices: 6,
                instances: 7
            }
        )));
        // Instanced passes set a divisor for every attribute, the
        // per-vertex one included.
        let divisors = calls
            .iter()
            .filter(|c| matches!(c, Call::AttribDivisor { .. }))
            .count();
        assert_eq!(divisors, 3);
    }

    #[test]
    fn inactive_pass_draws_nothing() {
        let mut device = test_device();
        let program = device.create_program(&["cell.vert", "cell.frag"]).unwrap();
        let (vertices, indices) = quad_buffers(&mut device);

        let pass = device
            .create_pass(
                PassDesc::new(program)
                    .attribute("a_position", vertices)
                    .buffer(indices),
            )
            .unwrap();
        pass.borrow_mut().set_active(false);

        device.api_mut().take_calls();
        pass.borrow().render(&mut device).unwrap();
        assert!(device.api().calls().is_empty());
    }

    #[test]
    fn strict_mode_surfaces_a_source_that_yields_nothing() {
        struct Mute;
        impl UniformFeed for Mute {
            fn uniform(&self, _field: &str) -> Option<UniformValue> {
                None
            }
        }

        let mut device = test_device();
        let program = device.create_program(&["cell.vert", "cell.frag"]).unwrap();
        let (vertices, indices) = quad_buffers(&mut device);

        let pass = device
            .create_pass(
                PassDesc::new(program)
                    .attribute("a_position", vertices)
                    .buffer(indices),
            )
            .unwrap();
        let mute: Rc<RefCell<dyn UniformFeed>> = Rc::new(RefCell::new(Mute));
        pass.borrow_mut()
            .set_uniform("u_view", UniformSource::field(mute, "view"));

        // Best-effort mode skips the slot and still draws.
        pass.borrow().render(&mut device).unwrap();
        assert_eq!(device.api().draw_call_count(), 1);

        device.set_strict_uniforms(true);
        match pass.borrow().render(&mut device) {
            Err(Error::EmptyUniformSource { name }) => assert_eq!(name, "u_view"),
            other => panic!("expected EmptyUniformSource, got {:?}", other.err()),
        };
    }

    #[test]
    fn late_bound_uniforms_resolve_current_values() {
        struct Knob {
            value: f32,
        }
        impl UniformFeed for Knob {
            fn uniform(&self, field: &str) -> Option<UniformValue> {
                (field == "value").then(|| UniformValue::Float(self.value))
            }
        }

        let mut api = HeadlessApi::new();
        api.register_program(
            &["k.vert", "k.frag"],
            ShaderSpec::new()
                .attribute("a_position")
                .uniform("u_knob", gltype::FLOAT),
        );
        let mut device = Device::new(api).unwrap();
        let program = device.create_program(&["k.vert", "k.frag"]).unwrap();
        let vertices = device
            .create_buffer(BufferDesc::vertex(&[0.0; 6], 2))
            .unwrap();
        let indices = device.create_buffer(BufferDesc::index(&[0, 1, 2])).unwrap();

        let knob = Rc::new(RefCell::new(Knob { value: 1.0 }));
        let pass = device
            .create_pass(
                PassDesc::new(program)
                    .attribute("a_position", vertices)
                    .buffer(indices),
            )
            .unwrap();
        pass.borrow_mut()
            .set_uniform("u_knob", UniformSource::field(knob.clone(), "value"));

        pass.borrow().render(&mut device).unwrap();
        knob.borrow_mut().value = 2.0;
        pass.borrow().render(&mut device).unwrap();

        let pushed: Vec<f32> = device
            .api()
            .calls()
            .iter()
            .filter_map(|c| match c {
                Call::Uniform {
                    value: UniformValue::Float(v),
                    ..
                } => Some(*v),
                _ => None,
            })
            .collect();
        assert_eq!(pushed, vec![1.0, 2.0]);
    }
}
