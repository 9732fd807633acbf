//! 设备执行模型：执行流、完成标记、流关联的缓冲区与分配器。

pub mod allocator;
pub mod completion;
pub mod stream;

pub use allocator::{DefaultDeviceAllocator, DeviceAllocator, DeviceBuffer, SharedAllocator};
pub use completion::Completion;
pub use stream::{Event, Stream};
