#![forbid(unsafe_code)]

use crate::sliding_window::{DEFAULT_WINDOW_CAPACITY, MIN_WINDOW_CAPACITY};

////////////////////////////////////////////////////////////////////////////////

pub const MIN_INPUT_BUFFER_SIZE: usize = 16 << 10;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;
pub const DEFAULT_MAX_HEADER_FIELD: usize = 1 << 20;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Decode on the calling thread.
    #[default]
    SingleThread,
    /// Decode on a background thread, handing events over a bounded channel.
    Pipelined,
}

/// Knobs for [`Decompressor`](crate::Decompressor). Out-of-range values are
/// clamped to the nearest viable one instead of being rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecompressOptions {
    pub mode: Mode,
    pub channel_capacity: usize,
    pub input_buffer_size: usize,
    pub window_capacity: usize,
    pub max_header_field: usize,
}

impl Default for DecompressOptions {
    fn default() -> Self {
        Self {
            mode: Mode::SingleThread,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            input_buffer_size: MIN_INPUT_BUFFER_SIZE,
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            max_header_field: DEFAULT_MAX_HEADER_FIELD,
        }
    }
}

impl DecompressOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pipelined() -> Self {
        Self::default().with_mode(Mode::Pipelined)
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn with_input_buffer_size(mut self, size: usize) -> Self {
        self.input_buffer_size = size.max(MIN_INPUT_BUFFER_SIZE);
        self
    }

    pub fn with_window_capacity(mut self, capacity: usize) -> Self {
        self.window_capacity = capacity.max(MIN_WINDOW_CAPACITY);
        self
    }

    pub fn with_max_header_field(mut self, limit: usize) -> Self {
        self.max_header_field = limit;
        self
    }
}

////////////////////////////////////////////////////////////////////////////////
