use thiserror::Error;

/// Errors raised by device setup, resource creation, and rendering.
#[derive(Debug, Error)]
pub enum Error {
    /// Context acquisition failed or a mandatory capability is missing.
    #[error("failed to initialize device: {0}")]
    Initialization(String),

    /// A shader stage failed to compile.
    #[error("shader `{name}` failed to compile: {log}")]
    ShaderCompile { name: String, log: String },

    /// Program link failure.
    #[error("program link failed: {log}")]
    Link { log: String },

    /// Introspection found a uniform whose declared type has no bind
    /// function (boolean family) or is not in the known tag set.
    #[error("uniform `{name}` has unsupported type tag {tag:#06x}")]
    UnsupportedUniformType { name: String, tag: u32 },

    /// Buffer allocation with a data length that is not a multiple of the
    /// item size.
    #[error("buffer data length {len} is not a multiple of item size {item_size}")]
    InvalidSize { len: usize, item_size: usize },

    /// Buffer sub-range update that is misaligned or exceeds the fixed
    /// element count.
    #[error("buffer update [{start}, {end}) is invalid for {elements} elements")]
    InvalidRange {
        start: usize,
        end: usize,
        elements: usize,
    },

    /// Invalid pass wiring (two index buffers, a non-vertex attribute
    /// buffer, an attribute name the program does not expose, ...).
    #[error("invalid pass configuration: {0}")]
    Configuration(String),

    /// A pass was rendered without an index buffer.
    #[error("render pass has no index buffer")]
    MissingIndexBuffer,

    /// Strict-mode report of a uniform name the program does not expose.
    /// In the default best-effort mode this is logged and skipped instead.
    #[error("uniform `{name}` is not exposed by the active program")]
    UnknownUniform { name: String },

    /// Strict-mode report of a uniform source whose feed yielded no value
    /// for its field. Logged and skipped in best-effort mode.
    #[error("uniform source for `{name}` yielded no value")]
    EmptyUniformSource { name: String },

    /// A uniform was fed a value that does not match its declared type.
    #[error("uniform `{name}` bound with a mismatched value type")]
    UniformTypeMismatch { name: String },
}
