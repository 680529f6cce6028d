//! Typed GPU buffers with a CPU-side mirror.
//!
//! A buffer is created once with a fixed element count and updated only via
//! bounded sub-range overwrites. The mirror keeps the last-uploaded contents
//! readable on the CPU (picking reads interpolated per-cell attributes back
//! from it without a GPU round trip).

use crate::api::{BufferKind, DrawApi, UsageHint};
use crate::error::Error;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to a buffer. Buffers are referenced by passes and by
/// whoever pushes updates, so they live behind `Rc<RefCell<..>>`.
pub type BufferHandle<A> = Rc<RefCell<GpuBuffer<A>>>;

/// Initial or update data for a buffer; the variant fixes the buffer kind.
#[derive(Debug, Clone, Copy)]
pub enum BufferData<'a> {
    Vertex(&'a [f32]),
    Index(&'a [u16]),
}

impl BufferData<'_> {
    pub fn len(&self) -> usize {
        match self {
            BufferData::Vertex(d) => d.len(),
            BufferData::Index(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> BufferKind {
        match self {
            BufferData::Vertex(_) => BufferKind::Vertex,
            BufferData::Index(_) => BufferKind::Index,
        }
    }
}

/// Allocation request for [`crate::Device::create_buffer`].
#[derive(Debug, Clone, Copy)]
pub struct BufferDesc<'a> {
    pub data: BufferData<'a>,
    /// Components per item, 1 to 4.
    pub item_size: usize,
    pub usage: UsageHint,
}

impl<'a> BufferDesc<'a> {
    /// A static vertex buffer.
    pub fn vertex(data: &'a [f32], item_size: usize) -> Self {
        Self {
            data: BufferData::Vertex(data),
            item_size,
            usage: UsageHint::Static,
        }
    }

    /// A static index buffer (item size 1).
    pub fn index(data: &'a [u16]) -> Self {
        Self {
            data: BufferData::Index(data),
            item_size: 1,
            usage: UsageHint::Static,
        }
    }

    pub fn usage(mut self, usage: UsageHint) -> Self {
        self.usage = usage;
        self
    }
}

/// CPU-side copy of the buffer contents, typed by kind.
#[derive(Debug, Clone)]
pub(crate) enum Mirror {
    Vertex(Vec<f32>),
    Index(Vec<u16>),
}

impl Mirror {
    pub(crate) fn as_bytes(&self) -> &[u8] {
        match self {
            Mirror::Vertex(d) => bytemuck::cast_slice(d),
            Mirror::Index(d) => bytemuck::cast_slice(d),
        }
    }
}

/// A GPU-resident array plus its mirror. Element count and item size are
/// fixed at creation.
#[derive(Debug)]
pub struct GpuBuffer<A: DrawApi> {
    pub(crate) id: A::BufferId,
    kind: BufferKind,
    usage: UsageHint,
    item_size: usize,
    elements: usize,
    pub(crate) mirror: Mirror,
}

impl<A: DrawApi> GpuBuffer<A> {
    pub(crate) fn new(
        id: A::BufferId,
        desc: &BufferDesc<'_>,
    ) -> Result<Self, Error> {
        let len = desc.data.len();
        debug_assert!((1..=4).contains(&desc.item_size));
        if desc.item_size == 0 || len % desc.item_size != 0 {
            return Err(Error::InvalidSize {
                len,
                item_size: desc.item_size,
            });
        }

        let mirror = match desc.data {
            BufferData::Vertex(d) => Mirror::Vertex(d.to_vec()),
            BufferData::Index(d) => Mirror::Index(d.to_vec()),
        };

        Ok(Self {
            id,
            kind: desc.data.kind(),
            usage: desc.usage,
            item_size: desc.item_size,
            elements: len,
            mirror,
        })
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn usage(&self) -> UsageHint {
        self.usage
    }

    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// Total scalar element count (`len_items * item_size`).
    pub fn elements(&self) -> usize {
        self.elements
    }

    /// Item count (vertices, instances, or indices).
    pub fn len_items(&self) -> usize {
        self.elements / self.item_size
    }

    /// The mirror as floats; `None` for index buffers.
    pub fn mirror_f32(&self) -> Option<&[f32]> {
        match &self.mirror {
            Mirror::Vertex(d) => Some(d),
            Mirror::Index(_) => None,
        }
    }

    /// The mirror as indices; `None` for vertex buffers.
    pub fn mirror_u16(&self) -> Option<&[u16]> {
        match &self.mirror {
            Mirror::Index(d) => Some(d),
            Mirror::Vertex(_) => None,
        }
    }

    /// Validates a sub-range update and writes it into the mirror, returning
    /// the byte offset and byte length to push to the GPU.
    pub(crate) fn write_mirror(
        &mut self,
        offset_items: usize,
        data: &BufferData<'_>,
    ) -> Result<(usize, usize), Error> {
        let start = offset_items * self.item_size;
        let end = start + data.len();
        if data.len() % self.item_size != 0 || end > self.elements {
            return Err(Error::InvalidRange {
                start,
                end,
                elements: self.elements,
            });
        }

        match (&mut self.mirror, data) {
            (Mirror::Vertex(mirror), BufferData::Vertex(d)) => {
                mirror[start..end].copy_from_slice(d);
                Ok((start * std::mem::size_of::<f32>(), d.len() * 4))
            }
            (Mirror::Index(mirror), BufferData::Index(d)) => {
                mirror[start..end].copy_from_slice(d);
                Ok((start * std::mem::size_of::<u16>(), d.len() * 2))
            }
            _ => Err(Error::Configuration(format!(
                "{:?} data written to a {:?} buffer",
                data.kind(),
                self.kind
            ))),
        }
    }

    /// The mirror sub-range `[byte_offset, byte_offset + byte_len)` as bytes.
    pub(crate) fn mirror_bytes(&self, byte_offset: usize, byte_len: usize) -> &[u8] {
        &self.mirror.as_bytes()[byte_offset..byte_offset + byte_len]
    }
}
