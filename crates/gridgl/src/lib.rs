//! Minimal immediate-mode rendering abstraction.
//!
//! A [`Device`] wraps a raw drawing API (the [`DrawApi`] seam) together with
//! an explicit binding-state cache, and hands out typed [`GpuBuffer`]s,
//! introspected [`ShaderProgram`]s, and [`RenderPass`]es. A [`Scene`] renders
//! its passes in deterministic priority order; a [`Camera`] supplies
//! projection/view matrices through late-bound uniforms and unprojects
//! screen points back onto the z=0 plane.
//!
//! Single-threaded by design: binding-cache correctness depends on strict
//! sequential ordering, so resources are shared with `Rc<RefCell<..>>` and a
//! frame (`Device::render_frame`) is the unit of atomicity.

pub mod api;
pub mod buffer;
pub mod camera;
pub mod device;
pub mod error;
pub mod headless;
pub mod pass;
pub mod program;
pub mod scene;

pub use api::{BufferKind, Capability, DrawApi, ProgramInfo, UniformValue, UsageHint};
pub use buffer::{BufferData, BufferDesc, BufferHandle, GpuBuffer};
pub use camera::Camera;
pub use device::Device;
pub use error::Error;
pub use pass::{PassDesc, PassHandle, RenderPass, UniformFeed, UniformSource};
pub use program::{ShaderProgram, UniformType};
pub use scene::Scene;
