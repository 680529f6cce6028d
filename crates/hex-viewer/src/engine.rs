//! The field engine: owns the device, the cell buffers, and the scene, and
//! maps field state into per-instance rendering attributes.

use crate::field::{AdvanceStats, FieldGrid, FieldSource, HexCell};
use crate::hexgrid;
use anyhow::Context;
use glam::{Vec2, Vec3, Vec4};
use gridgl::headless::ShaderSpec;
use gridgl::{
    api::gltype, BufferData, BufferDesc, BufferHandle, Camera, Device, DrawApi, PassDesc,
    PassHandle, Scene, UniformSource, UsageHint,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Shader stages of the cell program, supplied by name as opaque units.
pub const HEX_SHADERS: [&str; 2] = ["hex.vert", "hex.frag"];

/// Priority of the cell pass within the scene.
const CELL_PASS_PRIORITY: i32 = 10;

/// Unit hexagon as a triangle fan: center first (w = 0), six rim vertices
/// (w = 1). The w component lets the shader scale the rim only.
#[rustfmt::skip]
const HEX_FAN_VERTICES: [f32; 28] = [
     0.0,   0.0,   0.0, 0.0,
    -0.5,   0.0,   0.0, 1.0,
    -0.25,  0.433, 0.0, 1.0,
     0.25,  0.433, 0.0, 1.0,
     0.5,   0.0,   0.0, 1.0,
     0.25, -0.433, 0.0, 1.0,
    -0.25, -0.433, 0.0, 1.0,
];

#[rustfmt::skip]
const HEX_FAN_INDICES: [u16; 18] = [
    1, 2, 0,
    2, 3, 0,
    3, 4, 0,
    4, 5, 0,
    5, 6, 0,
    6, 1, 0,
];

const CELL_RED: Vec3 = Vec3::new(1.0, 0.2, 0.2);
const CELL_GREEN: Vec3 = Vec3::new(0.2, 1.0, 0.2);

/// Cell footprint scale from population, clamped to [0.2, 1.0].
pub fn cell_scale(cell: &HexCell) -> f32 {
    (cell.population / 1000.0).clamp(0.2, 1.0)
}

/// Cell color: red-to-green blend driven by the population delta
/// (delta 0 sits at the midpoint), alpha fixed at 1.
pub fn cell_color(cell: &HexCell) -> Vec4 {
    let blend = (cell.population_delta + 0.1) * 5.0;
    CELL_RED.lerp(CELL_GREEN, blend).extend(1.0)
}

/// Reflection for [`HEX_SHADERS`], for registering with a
/// [`gridgl::headless::HeadlessApi`]. A GPU-backed implementation would
/// produce the same table from the compiled source.
pub fn hex_program_spec() -> ShaderSpec {
    ShaderSpec::new()
        .attribute("a_position")
        .attribute("a_color")
        .attribute("a_offset")
        .attribute("a_scale")
        .uniform("u_projection", gltype::FLOAT_MAT4)
        .uniform("u_view", gltype::FLOAT_MAT4)
}

/// What a successful pick resolves to: the linear cell index, the
/// interpolated per-instance attributes read back from the CPU mirrors, and
/// the matched cell.
#[derive(Debug)]
pub struct PickResult<'a> {
    pub index: usize,
    pub scale: f32,
    pub color: Vec3,
    pub cell: &'a HexCell,
}

/// The dynamic per-instance buffers the engine rewrites on refresh and reads
/// back from on pick. Geometry and offset buffers are owned by the pass.
struct FieldBuffers<A: DrawApi> {
    colors: BufferHandle<A>,
    scales: BufferHandle<A>,
}

pub struct FieldEngine<A: DrawApi> {
    device: Device<A>,
    field: FieldGrid,
    buffers: FieldBuffers<A>,
    scene: Scene<A>,
    camera: Rc<RefCell<Camera>>,
    cell_pass: PassHandle<A>,
}

impl<A: DrawApi> FieldEngine<A> {
    /// Builds the cell buffers, program, pass, and camera for a fetched
    /// field. The field size is fixed for the engine's lifetime.
    pub fn new(mut device: Device<A>, field: FieldGrid) -> anyhow::Result<Self> {
        field.validate()?;

        let (offsets, colors, scales) = instance_data(&field);

        let vertices = device.create_buffer(BufferDesc::vertex(&HEX_FAN_VERTICES, 4))?;
        let indices = device.create_buffer(BufferDesc::index(&HEX_FAN_INDICES))?;
        let offsets = device.create_buffer(BufferDesc::vertex(&offsets, 3))?;
        let colors = device
            .create_buffer(BufferDesc::vertex(&colors, 4).usage(UsageHint::Dynamic))?;
        let scales = device
            .create_buffer(BufferDesc::vertex(&scales, 1).usage(UsageHint::Dynamic))?;

        let program = device
            .create_program(&HEX_SHADERS)
            .context("building the cell program")?;

        let cell_pass = device.create_pass(
            PassDesc::new(program)
                .attribute("a_position", vertices)
                .instanced("a_color", colors.clone(), 1)
                .instanced("a_offset", offsets, 1)
                .instanced("a_scale", scales.clone(), 1)
                .buffer(indices),
        )?;

        let camera = Rc::new(RefCell::new(Camera::new()));
        {
            let mut camera = camera.borrow_mut();
            camera.clear_color = Vec4::new(0.475, 0.465, 0.45, 0.5);
            camera.move_by(Vec3::new(0.0, 0.0, 7.0));
        }

        {
            let mut pass = cell_pass.borrow_mut();
            pass.set_uniform(
                "u_projection",
                UniformSource::field(camera.clone(), "perspective"),
            );
            pass.set_uniform("u_view", UniformSource::field(camera.clone(), "view"));
        }

        let mut scene = Scene::new();
        scene.add_pass(CELL_PASS_PRIORITY, cell_pass.clone());

        log::info!(
            "field engine ready: {} cells, {} instances per draw",
            field.cell_count(),
            cell_pass.borrow().instance_count()
        );

        Ok(Self {
            device,
            field,
            buffers: FieldBuffers { colors, scales },
            scene,
            camera,
            cell_pass,
        })
    }

    pub fn field(&self) -> &FieldGrid {
        &self.field
    }

    pub fn camera(&self) -> &Rc<RefCell<Camera>> {
        &self.camera
    }

    pub fn cell_pass(&self) -> &PassHandle<A> {
        &self.cell_pass
    }

    pub fn device(&self) -> &Device<A> {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut Device<A> {
        &mut self.device
    }

    /// Recomputes the camera projection and the backend viewport.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.device
            .resize_viewport(&mut self.camera.borrow_mut(), width, height);
    }

    /// Clears and renders the scene with the current camera state.
    pub fn render_frame(&mut self) -> anyhow::Result<()> {
        self.device
            .render_frame(&self.scene, &self.camera.borrow())?;
        Ok(())
    }

    /// Replaces the field with a freshly fetched state and repopulates the
    /// dynamic buffers. On failure the previous field stays in place and
    /// keeps rendering (stale but consistent).
    pub fn refresh(&mut self, source: &mut dyn FieldSource) -> anyhow::Result<()> {
        let grid = match source.fetch_field() {
            Ok(grid) => grid,
            Err(err) => {
                log::warn!("field fetch failed; keeping previous state: {err}");
                return Err(err.into());
            }
        };
        grid.validate()?;
        anyhow::ensure!(
            grid.size == self.field.size,
            "field size changed from {} to {}",
            self.field.size,
            grid.size
        );

        self.field = grid;
        self.update_cell_attributes()?;
        Ok(())
    }

    /// Advances the simulation, then fetches and applies the new state.
    pub fn advance(
        &mut self,
        source: &mut dyn FieldSource,
        steps: Option<u32>,
    ) -> anyhow::Result<AdvanceStats> {
        let stats = source.advance_field(steps)?;
        log::info!(
            "field advanced {} steps in {:.2} ms (avg {:.2} ms)",
            stats.steps_run,
            stats.total_time,
            stats.average_time
        );
        self.refresh(source)?;
        Ok(stats)
    }

    /// Resolves a world-space point (e.g. from `Camera::unproject`) to a
    /// cell and its current rendering attributes. `None` when the point
    /// falls outside the field.
    pub fn pick_at(&self, world: Vec2) -> Option<PickResult<'_>> {
        let cell = hexgrid::nearest_cell(world);
        let index = hexgrid::linear_index(cell, self.field.size)?;

        let scale = self.buffers.scales.borrow().mirror_f32()?[index];
        let color = {
            let colors = self.buffers.colors.borrow();
            let c = colors.mirror_f32()?;
            Vec3::new(c[index * 4], c[index * 4 + 1], c[index * 4 + 2])
        };

        let (major, minor) = hexgrid::storage_coords(index, self.field.size);
        Some(PickResult {
            index,
            scale,
            color,
            cell: &self.field.cells[major][minor],
        })
    }

    /// Unprojects an NDC point and picks through it. `None` both for a
    /// degenerate unprojection and for a miss outside the field.
    pub fn pick_ndc(&self, ndc_x: f32, ndc_y: f32) -> Option<PickResult<'_>> {
        let world = self.camera.borrow().unproject(ndc_x, ndc_y)?;
        self.pick_at(world.truncate())
    }

    /// Recomputes colors and scales for every cell and pushes them to the
    /// dynamic buffers.
    fn update_cell_attributes(&mut self) -> anyhow::Result<()> {
        let (_, colors, scales) = instance_data(&self.field);
        self.device
            .write_buffer(&self.buffers.colors, 0, BufferData::Vertex(&colors))?;
        self.device
            .write_buffer(&self.buffers.scales, 0, BufferData::Vertex(&scales))?;
        Ok(())
    }
}

/// Per-instance offsets, colors, and scales in linear-index order.
fn instance_data(field: &FieldGrid) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
    let n = field.cell_count();
    let mut offsets = Vec::with_capacity(n * 3);
    let mut colors = Vec::with_capacity(n * 4);
    let mut scales = Vec::with_capacity(n);

    let half = (field.size / 2) as i32;
    for major in 0..field.size {
        for minor in 0..field.size {
            let cell = &field.cells[major][minor];
            let center = hexgrid::cell_center(hexgrid::AxialHex::new(
                major as i32 - half,
                minor as i32 - half,
            ));
            offsets.extend_from_slice(&[center.x, center.y, 0.0]);

            let color = cell_color(cell);
            colors.extend_from_slice(&[color.x, color.y, color.z, color.w]);
            scales.push(cell_scale(cell));
        }
    }

    (offsets, colors, scales)
}
