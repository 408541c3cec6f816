pub mod fs;
pub mod memory;
pub mod traits;

pub use fs::FsStore;
pub use memory::MemoryStore;
pub use traits::ArtifactStore;
