use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use super::arrays::{IndexArrays, IndexMetadata};
use super::builder::{sketch_reads, sort_and_filter};
use super::params::IndexParameters;
use super::SketchIndex;
use crate::device::stream::run_stage;
use crate::device::{Completion, DeviceBuffer, SharedAllocator, Stream};
use crate::error::{IndexError, Result};
use crate::io::ReadSource;
use crate::sketch::{Direction, PositionInRead, ReadId, Representation, SketchParameters};

/// 设备端索引内容：六个设备数组加标量元信息
pub(crate) struct DeviceContent {
    representations: DeviceBuffer<Representation>,
    read_ids: DeviceBuffer<ReadId>,
    positions_in_reads: DeviceBuffer<PositionInRead>,
    directions_of_reads: DeviceBuffer<Direction>,
    unique_representations: DeviceBuffer<Representation>,
    first_occurrence_of_representations: DeviceBuffer<u32>,
    metadata: IndexMetadata,
}

impl DeviceContent {
    /// 主机数组 -> 设备数组（关联到 `stream`）
    pub(crate) fn upload(
        arrays: IndexArrays,
        metadata: IndexMetadata,
        allocator: &SharedAllocator,
        stream: &Stream,
    ) -> Result<Self> {
        Ok(Self {
            representations: DeviceBuffer::from_vec(arrays.representations, allocator, stream)?,
            read_ids: DeviceBuffer::from_vec(arrays.read_ids, allocator, stream)?,
            positions_in_reads: DeviceBuffer::from_vec(arrays.positions_in_reads, allocator, stream)?,
            directions_of_reads: DeviceBuffer::from_vec(arrays.directions_of_reads, allocator, stream)?,
            unique_representations: DeviceBuffer::from_vec(arrays.unique_representations, allocator, stream)?,
            first_occurrence_of_representations: DeviceBuffer::from_vec(
                arrays.first_occurrence_of_representations,
                allocator,
                stream,
            )?,
            metadata,
        })
    }

    /// 设备数组 -> 主机数组
    pub(crate) fn download(&self) -> (IndexArrays, IndexMetadata) {
        let arrays = IndexArrays {
            representations: self.representations.to_vec(),
            read_ids: self.read_ids.to_vec(),
            positions_in_reads: self.positions_in_reads.to_vec(),
            directions_of_reads: self.directions_of_reads.to_vec(),
            unique_representations: self.unique_representations.to_vec(),
            first_occurrence_of_representations: self.first_occurrence_of_representations.to_vec(),
        };
        (arrays, self.metadata)
    }
}

/// 设备端 minimizer 索引。
///
/// 由 [`DeviceIndex::create_index`] 创建后立即返回，实际计算在生成流上异步进行。
/// 最终数组关联到复制流：它们被释放前，此前提交到复制流的工作会先完成。
pub struct DeviceIndex {
    content: Arc<Completion<DeviceContent>>,
    generation_stream: Stream,
    copy_stream: Stream,
}

impl DeviceIndex {
    /// 为 `[first_read_id, past_the_last_read_id)` 区间的 read 生成
    /// (k,w)-minimizer 表示到其全部出现位置的映射。
    ///
    /// 参数错误在此同步返回；分配失败等异步错误由 [`SketchIndex::wait_to_be_ready`] 报告。
    /// 空区间直接得到已就绪的空索引。
    pub fn create_index<R: ReadSource + ?Sized>(
        allocator: SharedAllocator,
        reads: &R,
        params: IndexParameters,
    ) -> Result<Self> {
        params.validate(reads.number_of_reads())?;
        let first_read_id = params.first_read_id;
        let past_the_last_read_id = params.past_the_last_read_id;

        // host staging: concatenated bases plus read start offsets
        let mut bases: Vec<u8> = Vec::new();
        let mut starts: Vec<usize> = Vec::with_capacity((past_the_last_read_id - first_read_id) as usize + 1);
        starts.push(0);
        let mut longest = 0usize;
        for read_id in first_read_id..past_the_last_read_id {
            let seq = reads
                .sequence(read_id)
                .ok_or_else(|| IndexError::configuration(format!("read {} missing from read source", read_id)))?;
            longest = longest.max(seq.len());
            bases.extend_from_slice(seq);
            starts.push(bases.len());
        }
        let metadata = IndexMetadata::for_range(first_read_id, past_the_last_read_id, longest as PositionInRead);

        let content = Arc::new(Completion::new());
        if first_read_id == past_the_last_read_id {
            content.complete(DeviceContent::upload(IndexArrays::empty(), metadata, &allocator, &params.copy_stream));
            return Ok(Self::from_parts(content, params.generation_stream, params.copy_stream));
        }

        info!(
            first_read_id,
            past_the_last_read_id,
            k = params.kmer_size,
            w = params.window_size,
            hash = params.hash_representations,
            filtering = params.filtering_parameter,
            stream = params.generation_stream.id(),
            "index generation issued"
        );

        let job = GenerationJob {
            bases,
            starts,
            first_read_id,
            metadata,
            sketch: params.sketch_parameters(),
            filtering_parameter: params.filtering_parameter,
            allocator,
            generation_stream: params.generation_stream.clone(),
            copy_stream: params.copy_stream.clone(),
        };
        let target = Arc::clone(&content);
        params.generation_stream.enqueue(move || {
            let started = Instant::now();
            let result = run_stage("index generation", || job.run());
            match &result {
                Ok(c) => info!(
                    first_read_id,
                    sketch_elements = c.representations.len(),
                    unique_representations = c.unique_representations.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "index ready"
                ),
                Err(e) => error!(first_read_id, "index generation failed: {}", e),
            }
            target.complete(result);
        });

        Ok(Self::from_parts(content, params.generation_stream, params.copy_stream))
    }

    pub(crate) fn from_parts(
        content: Arc<Completion<DeviceContent>>,
        generation_stream: Stream,
        copy_stream: Stream,
    ) -> Self {
        Self { content, generation_stream, copy_stream }
    }

    pub(crate) fn shared_content(&self) -> Arc<Completion<DeviceContent>> {
        Arc::clone(&self.content)
    }

    /// 表示类型能容纳的最大 k
    pub fn maximum_kmer_size() -> usize {
        super::maximum_kmer_size()
    }

    pub fn generation_stream(&self) -> &Stream {
        &self.generation_stream
    }

    pub fn copy_stream(&self) -> &Stream {
        &self.copy_stream
    }

    /// # Panics
    ///
    /// 生成失败时 panic，错误由 [`SketchIndex::wait_to_be_ready`] 返回
    fn content(&self) -> &DeviceContent {
        match self.content.wait() {
            Ok(c) => c,
            Err(e) => panic!("device index is not usable: {}", e),
        }
    }
}

impl std::fmt::Debug for DeviceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceIndex")
            .field("ready", &self.content.is_ok())
            .field("generation_stream", &self.generation_stream.id())
            .field("copy_stream", &self.copy_stream.id())
            .finish()
    }
}

impl SketchIndex for DeviceIndex {
    fn representations(&self) -> &[Representation] {
        &self.content().representations
    }

    fn read_ids(&self) -> &[ReadId] {
        &self.content().read_ids
    }

    fn positions_in_reads(&self) -> &[PositionInRead] {
        &self.content().positions_in_reads
    }

    fn directions_of_reads(&self) -> &[Direction] {
        &self.content().directions_of_reads
    }

    fn unique_representations(&self) -> &[Representation] {
        &self.content().unique_representations
    }

    fn first_occurrence_of_representations(&self) -> &[u32] {
        &self.content().first_occurrence_of_representations
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
        self.content.is_ok()
    }

    fn wait_to_be_ready(&self) -> Result<()> {
        self.content.wait().map(|_| ()).map_err(Clone::clone)
    }
}

/// 在生成流上执行的一次构建
struct GenerationJob {
    bases: Vec<u8>,
    starts: Vec<usize>,
    first_read_id: ReadId,
    metadata: IndexMetadata,
    sketch: SketchParameters,
    filtering_parameter: f64,
    allocator: SharedAllocator,
    generation_stream: Stream,
    copy_stream: Stream,
}

impl GenerationJob {
    fn run(self) -> Result<DeviceContent> {
        let stream = &self.generation_stream;
        // 临时缓冲区关联生成流，函数返回后在该流上延迟释放
        let bases = DeviceBuffer::from_vec(self.bases, &self.allocator, stream)?;
        let starts = DeviceBuffer::from_vec(self.starts, &self.allocator, stream)?;
        let reads: Vec<&[u8]> = starts.windows(2).map(|w| &bases[w[0]..w[1]]).collect();

        let elements = sketch_reads(&reads, self.first_read_id, &self.sketch);
        let mut elements = DeviceBuffer::from_vec(elements, &self.allocator, stream)?;
        let arrays = sort_and_filter(elements.as_mut_slice(), self.filtering_parameter)?;

        DeviceContent::upload(arrays, self.metadata, &self.allocator, &self.copy_stream)
    }
}
