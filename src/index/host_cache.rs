use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use super::arrays::{IndexArrays, IndexMetadata};
use super::device_index::{DeviceContent, DeviceIndex};
use super::SketchIndex;
use crate::device::stream::run_stage;
use crate::device::{Completion, SharedAllocator, Stream};
use crate::error::Result;
use crate::sketch::{Direction, PositionInRead, ReadId, Representation};

pub(crate) struct HostContent {
    pub(crate) arrays: IndexArrays,
    pub(crate) metadata: IndexMetadata,
}

/// 设备索引的主机端副本。
///
/// 复制在给定流上异步进行；[`HostIndexCache::finish_copying`] 之后访问器返回主机切片。
/// 缓存独占自己的数组，之后可多次用 [`HostIndexCache::copy_index_to_device`]
/// 重新得到互相独立的设备索引，无需重新计算草图。
pub struct HostIndexCache {
    state: Arc<Completion<HostContent>>,
    first_read_id: ReadId,
    kmer_size: usize,
    window_size: usize,
    stream: Stream,
}

impl HostIndexCache {
    /// 在 `stream` 上提交 设备 -> 主机 的复制，立即返回。
    ///
    /// 复制任务先等待 `index` 生成完成；若生成失败，缓存同样失败。
    pub fn create_cache(
        index: &DeviceIndex,
        first_read_id: ReadId,
        kmer_size: usize,
        window_size: usize,
        stream: &Stream,
    ) -> Self {
        let source = index.shared_content();
        let state = Arc::new(Completion::new());
        let target = Arc::clone(&state);
        stream.enqueue(move || {
            let started = Instant::now();
            let result = run_stage("copy to host", || {
                let content = source.wait().map_err(Clone::clone)?;
                let (arrays, metadata) = content.download();
                Ok(HostContent { arrays, metadata })
            });
            match &result {
                Ok(c) => debug!(
                    first_read_id,
                    bytes = c.arrays.size_in_bytes(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "index cached on host"
                ),
                Err(e) => warn!(first_read_id, "host cache not created: {}", e),
            }
            target.complete(result);
        });
        Self::from_state(state, first_read_id, kmer_size, window_size, stream.clone())
    }

    pub(crate) fn from_state(
        state: Arc<Completion<HostContent>>,
        first_read_id: ReadId,
        kmer_size: usize,
        window_size: usize,
        stream: Stream,
    ) -> Self {
        Self { state, first_read_id, kmer_size, window_size, stream }
    }

    /// 阻塞直到复制完成
    pub fn finish_copying(&self) -> Result<()> {
        self.state.wait().map(|_| ()).map_err(Clone::clone)
    }

    pub fn first_read_id(&self) -> ReadId {
        self.first_read_id
    }

    pub fn kmer_size(&self) -> usize {
        self.kmer_size
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// 执行复制的流
    pub fn stream(&self) -> &Stream {
        &self.stream
    }

    /// 由缓存内容重新生成设备索引：在 `stream` 上经 `allocator` 分配并异步复制。
    ///
    /// 缓存复制失败时，返回的索引在 `wait_to_be_ready` 时报告同一个错误。
    pub fn copy_index_to_device(&self, allocator: SharedAllocator, stream: &Stream) -> DeviceIndex {
        let source = Arc::clone(&self.state);
        let content = Arc::new(Completion::new());
        let target = Arc::clone(&content);
        let copy_stream = stream.clone();
        stream.enqueue(move || {
            let result = run_stage("copy to device", || {
                let host = source.wait().map_err(Clone::clone)?;
                DeviceContent::upload(host.arrays.clone(), host.metadata, &allocator, &copy_stream)
            });
            if let Err(e) = &result {
                warn!("device index not restored from host cache: {}", e);
            }
            target.complete(result);
        });
        DeviceIndex::from_parts(content, stream.clone(), stream.clone())
    }

    /// # Panics
    ///
    /// 复制失败时 panic，错误由 [`HostIndexCache::finish_copying`] 返回
    pub(crate) fn content(&self) -> &HostContent {
        match self.state.wait() {
            Ok(c) => c,
            Err(e) => panic!("host index cache is not usable: {}", e),
        }
    }
}

impl std::fmt::Debug for HostIndexCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostIndexCache")
            .field("first_read_id", &self.first_read_id)
            .field("kmer_size", &self.kmer_size)
            .field("window_size", &self.window_size)
            .field("ready", &self.state.is_ok())
            .finish()
    }
}

impl SketchIndex for HostIndexCache {
    fn representations(&self) -> &[Representation] {
        &self.content().arrays.representations
    }

    fn read_ids(&self) -> &[ReadId] {
        &self.content().arrays.read_ids
    }

    fn positions_in_reads(&self) -> &[PositionInRead] {
        &self.content().arrays.positions_in_reads
    }

    fn directions_of_reads(&self) -> &[Direction] {
        &self.content().arrays.directions_of_reads
    }

    fn unique_representations(&self) -> &[Representation] {
        &self.content().arrays.unique_representations
    }

    fn first_occurrence_of_representations(&self) -> &[u32] {
        &self.content().arrays.first_occurrence_of_representations
    }

    fn number_of_reads(&self) -> ReadId {
        self.content().metadata.number_of_reads
    }

    fn smallest_read_id(&self) -> ReadId {
        self.content().metadata.smallest_read_id
    }

    fn largest_read_id(&self) -> ReadId {
        self.content().metadata.largest_read_id
    }

    fn number_of_basepairs_in_longest_read(&self) -> PositionInRead {
        self.content().metadata.number_of_basepairs_in_longest_read
    }

    fn is_ready(&self) -> bool {
        self.state.is_ok()
    }

    fn wait_to_be_ready(&self) -> Result<()> {
        self.finish_copying()
    }
}
