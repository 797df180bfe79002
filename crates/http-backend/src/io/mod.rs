mod chunks;

pub use chunks::{Chunks, Error as ChunksError};
