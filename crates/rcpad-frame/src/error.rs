/// Errors that can occur while building frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload does not fit in the one-byte length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
