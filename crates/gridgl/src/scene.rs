//! An ordered, flat collection of render passes.

use crate::api::DrawApi;
use crate::device::Device;
use crate::error::Error;
use crate::pass::PassHandle;
use std::collections::BTreeMap;

/// Passes keyed by integer priority. Rendering walks populated priorities
/// in ascending numeric order and, within a priority, passes in
/// registration order. Nothing ever reorders implicitly.
pub struct Scene<A: DrawApi> {
    passes: BTreeMap<i32, Vec<PassHandle<A>>>,
}

impl<A: DrawApi> Scene<A> {
    pub fn new() -> Self {
        Self {
            passes: BTreeMap::new(),
        }
    }

    /// Appends a pass at the given priority, creating the bucket if absent.
    pub fn add_pass(&mut self, priority: i32, pass: PassHandle<A>) {
        self.passes.entry(priority).or_default().push(pass);
    }

    pub fn pass_count(&self) -> usize {
        self.passes.values().map(Vec::len).sum()
    }

    /// Renders every pass in the deterministic two-level order.
    pub fn render(&self, device: &mut Device<A>) -> Result<(), Error> {
        for passes in self.passes.values() {
            for pass in passes {
                pass.borrow().render(device)?;
            }
        }
        Ok(())
    }
}

impl<A: DrawApi> Default for Scene<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::UniformValue;
    use crate::buffer::BufferDesc;
    use crate::headless::{Call, HeadlessApi, ShaderSpec};
    use crate::pass::{PassDesc, UniformSource};

    #[test]
    fn priorities_render_in_ascending_order() {
        let mut api = HeadlessApi::new();
        api.register_program(
            &["p.vert", "p.frag"],
            ShaderSpec::new()
                .attribute("a_position")
                .uniform("u_tag", crate::api::gltype::FLOAT),
        );
        let mut device = Device::new(api).unwrap();
        let program = device.create_program(&["p.vert", "p.frag"]).unwrap();

        let make_pass = |device: &mut Device<HeadlessApi>, tag: f32| {
            let vertices = device
                .create_buffer(BufferDesc::vertex(&[0.0; 6], 2))
                .unwrap();
            let indices = device.create_buffer(BufferDesc::index(&[0, 1, 2])).unwrap();
            let pass = device
                .create_pass(
                    PassDesc::new(program.clone())
                        .attribute("a_position", vertices)
                        .buffer(indices),
                )
                .unwrap();
            pass.borrow_mut()
                .set_uniform("u_tag", UniformSource::constant(tag));
            pass
        };

        let pass_a = make_pass(&mut device, 10.0);
        let pass_b = make_pass(&mut device, 5.0);

        let mut scene = Scene::new();
        // Registered high priority first; render order must still be 5, 10.
        scene.add_pass(10, pass_a);
        scene.add_pass(5, pass_b);

        device.api_mut().take_calls();
        scene.render(&mut device).unwrap();

        let tags: Vec<f32> = device
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
        assert_eq!(tags, vec![5.0, 10.0]);
    }

    #[test]
    fn registration_order_is_kept_within_a_priority() {
        let mut api = HeadlessApi::new();
        api.register_program(
            &["p.vert", "p.frag"],
            ShaderSpec::new()
                .attribute("a_position")
                .uniform("u_tag", crate::api::gltype::FLOAT),
        );
        let mut device = Device::new(api).unwrap();
        let program = device.create_program(&["p.vert", "p.frag"]).unwrap();

        let mut scene = Scene::new();
        for tag in [1.0f32, 2.0, 3.0] {
            let vertices = device
                .create_buffer(BufferDesc::vertex(&[0.0; 6], 2))
                .unwrap();
            let indices = device.create_buffer(BufferDesc::index(&[0, 1, 2])).unwrap();
            let pass = device
                .create_pass(
                    PassDesc::new(program.clone())
                        .attribute("a_position", vertices)
                        .buffer(indices),
                )
                .unwrap();
            pass.borrow_mut()
                .set_uniform("u_tag", UniformSource::constant(tag));
            scene.add_pass(7, pass);
        }

        device.api_mut().take_calls();
        scene.render(&mut device).unwrap();

        let tags: Vec<f32> = device
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
        assert_eq!(tags, vec![1.0, 2.0, 3.0]);
    }
}
