use super::*;

/// The error kinds a host can distinguish between, per the error-handling
/// policy: bad input and bad textures abort the current entry point and
/// surface as a structured error tile; invalid-state is a programming
/// error in the host surfaced the same way. Numeric degeneracies are never
/// represented here — they are absorbed silently inside `triangle` and
/// `cpupt::bvh`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("bad input: {0}")]
    BadInput(String),

    #[error("bad texture: {0}")]
    BadTexture(String),

    #[error("invalid state: {0}")]
    InvalidState(String),
}

pub type Result<T> = std::result::Result<T, Error>;
