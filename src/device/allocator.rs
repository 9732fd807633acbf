use std::mem;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::stream::Stream;
use crate::error::{IndexError, Result};

/// 设备内存分配器接口。
///
/// 索引与缓存只通过该接口申请 / 归还设备缓冲区，从不直接管理内存。
pub trait DeviceAllocator: Send + Sync {
    /// 预留 `bytes` 字节；无法满足时返回 [`IndexError::ResourceExhausted`]
    fn reserve(&self, bytes: usize, stream: &Stream) -> Result<()>;

    /// 归还此前预留的字节
    fn release(&self, bytes: usize);
}

/// 共享的分配器句柄
pub type SharedAllocator = Arc<dyn DeviceAllocator>;

/// 默认分配器：可选容量上限的计数内存池
#[derive(Clone, Debug)]
pub struct DefaultDeviceAllocator {
    inner: Arc<PoolState>,
}

#[derive(Debug)]
struct PoolState {
    capacity: Option<usize>,
    usage: Mutex<Usage>,
}

#[derive(Debug, Default)]
struct Usage {
    used: usize,
    peak: usize,
}

impl DefaultDeviceAllocator {
    /// 不设上限
    pub fn unbounded() -> Self {
        Self { inner: Arc::new(PoolState { capacity: None, usage: Mutex::new(Usage::default()) }) }
    }

    /// 最多同时持有 `capacity` 字节
    pub fn with_capacity(capacity: usize) -> Self {
        Self { inner: Arc::new(PoolState { capacity: Some(capacity), usage: Mutex::new(Usage::default()) }) }
    }

    pub fn into_shared(self) -> SharedAllocator {
        Arc::new(self)
    }

    pub fn capacity(&self) -> Option<usize> {
        self.inner.capacity
    }

    pub fn used_bytes(&self) -> usize {
        self.inner.usage.lock().used
    }

    pub fn peak_bytes(&self) -> usize {
        self.inner.usage.lock().peak
    }
}

impl Default for DefaultDeviceAllocator {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl DeviceAllocator for DefaultDeviceAllocator {
    fn reserve(&self, bytes: usize, stream: &Stream) -> Result<()> {
        let mut usage = self.inner.usage.lock();
        if let Some(cap) = self.inner.capacity {
            let available = cap.saturating_sub(usage.used);
            if bytes > available {
                return Err(IndexError::ResourceExhausted { requested: bytes, available });
            }
        }
        usage.used += bytes;
        usage.peak = usage.peak.max(usage.used);
        trace!(stream = stream.id(), bytes, used = usage.used, "reserve");
        Ok(())
    }

    fn release(&self, bytes: usize) {
        let mut usage = self.inner.usage.lock();
        usage.used = usage.used.saturating_sub(bytes);
    }
}

/// 与某个流关联的设备数组。
///
/// 释放时不会立即归还内存：存储与预留字节会交给关联流上的一个任务处理，
/// 因此在此之前提交到该流的任务全部完成后才真正释放。
pub struct DeviceBuffer<T: Send + 'static> {
    data: Vec<T>,
    bytes: usize,
    allocator: SharedAllocator,
    stream: Stream,
}

impl<T: Send + 'static> DeviceBuffer<T> {
    /// 采用已有数据，按其长度向分配器预留空间
    pub fn from_vec(data: Vec<T>, allocator: &SharedAllocator, stream: &Stream) -> Result<Self> {
        let bytes = data.len() * mem::size_of::<T>();
        allocator.reserve(bytes, stream)?;
        Ok(Self { data, bytes, allocator: Arc::clone(allocator), stream: stream.clone() })
    }

    /// 从切片拷贝（主机 -> 设备）
    pub fn from_slice(data: &[T], allocator: &SharedAllocator, stream: &Stream) -> Result<Self>
    where
        T: Clone,
    {
        let bytes = data.len() * mem::size_of::<T>();
        allocator.reserve(bytes, stream)?;
        Ok(Self { data: data.to_vec(), bytes, allocator: Arc::clone(allocator), stream: stream.clone() })
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// 预留的字节数
    pub fn size_in_bytes(&self) -> usize {
        self.bytes
    }

    pub fn stream(&self) -> &Stream {
        &self.stream
    }
}

impl<T: Send + 'static> Deref for DeviceBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T: Send + std::fmt::Debug + 'static> std::fmt::Debug for DeviceBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("len", &self.data.len())
            .field("bytes", &self.bytes)
            .field("stream", &self.stream.id())
            .finish()
    }
}

impl<T: Send + 'static> Drop for DeviceBuffer<T> {
    fn drop(&mut self) {
        let data = mem::take(&mut self.data);
        let bytes = self.bytes;
        if bytes == 0 && data.capacity() == 0 {
            return;
        }
        let allocator = Arc::clone(&self.allocator);
        self.stream.enqueue(move || {
            drop(data);
            allocator.release(bytes);
        });
    }
}
