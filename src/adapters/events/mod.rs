mod logging;
mod memory;

pub use logging::TracingPublisher;
pub use memory::MemoryPublisher;
