//! (k, w)-minimizer 表示到其全部出现位置的索引。
//!
//! - [`DeviceIndex`]：在执行流上异步构建的设备端索引
//! - [`HostIndexCache`]：设备索引的主机端副本，可重新生成设备索引而无需重算
//!
//! 两者都实现只读接口 [`SketchIndex`]。

use std::fmt;
use std::ops::Range;

use crate::error::{IndexError, Result};
use crate::sketch::{PositionInRead, ReadId, Representation, SketchElement};

pub mod arrays;
pub mod builder;
pub mod device_index;
pub mod host_cache;
pub mod params;
pub mod snapshot;

pub use arrays::{IndexArrays, IndexMetadata};
pub use device_index::DeviceIndex;
pub use host_cache::HostIndexCache;
pub use params::IndexParameters;
pub use snapshot::IndexSnapshot;

/// 表示类型能容纳的最大 k（每个碱基 2 bit）
pub const fn maximum_kmer_size() -> usize {
    std::mem::size_of::<Representation>() * 8 / 2
}

/// 检查草图参数
pub(crate) fn check_sketch_parameters(kmer_size: usize, window_size: usize) -> Result<()> {
    if kmer_size == 0 || kmer_size > maximum_kmer_size() {
        return Err(IndexError::configuration(format!(
            "kmer_size {} outside supported range 1..={}",
            kmer_size,
            maximum_kmer_size()
        )));
    }
    if window_size == 0 {
        return Err(IndexError::configuration("window_size must be positive"));
    }
    Ok(())
}

/// 索引的只读接口。
///
/// 所有访问器在 `is_ready()` 为真后互相一致，可从任意线程调用。
/// 在就绪前调用访问器会阻塞直到就绪。
///
/// # Panics
///
/// 若异步构建或复制失败，数组与元信息访问器（以及基于它们的默认方法）会 panic，
/// panic 消息包含存储的错误。调用方应先通过 [`SketchIndex::wait_to_be_ready`] 获取错误。
pub trait SketchIndex: Send + Sync {
    fn representations(&self) -> &[Representation];
    fn read_ids(&self) -> &[ReadId];
    fn positions_in_reads(&self) -> &[PositionInRead];
    fn directions_of_reads(&self) -> &[crate::sketch::Direction];
    /// 每个表示只出现一次，升序
    fn unique_representations(&self) -> &[Representation];
    /// 与 `unique_representations` 对应的首次出现位置，末尾附加元素总数
    fn first_occurrence_of_representations(&self) -> &[u32];

    fn number_of_reads(&self) -> ReadId;
    /// 空索引为 0
    fn smallest_read_id(&self) -> ReadId;
    /// 空索引为 0
    fn largest_read_id(&self) -> ReadId;
    fn number_of_basepairs_in_longest_read(&self) -> PositionInRead;

    /// 是否就绪（不阻塞）
    fn is_ready(&self) -> bool;
    /// 阻塞直到就绪；异步阶段失败时返回错误
    fn wait_to_be_ready(&self) -> Result<()>;

    fn number_of_sketch_elements(&self) -> usize {
        self.representations().len()
    }

    /// 某个表示在并行数组中的区间；不存在时为空区间
    fn occurrences(&self, representation: Representation) -> Range<usize> {
        match self.unique_representations().binary_search(&representation) {
            Ok(i) => {
                let first = self.first_occurrence_of_representations();
                first[i] as usize..first[i + 1] as usize
            }
            Err(_) => 0..0,
        }
    }

    fn sketch_element(&self, i: usize) -> SketchElement {
        SketchElement::new(
            self.representations()[i],
            self.read_ids()[i],
            self.positions_in_reads()[i],
            self.directions_of_reads()[i],
        )
    }

    /// 具有给定表示的全部草图元素
    fn elements_with(&self, representation: Representation) -> Vec<SketchElement> {
        self.occurrences(representation).map(|i| self.sketch_element(i)).collect()
    }

    fn stats(&self) -> IndexStats {
        let first = self.first_occurrence_of_representations();
        let max_occurrences = first.windows(2).map(|w| w[1] - w[0]).max().unwrap_or(0);
        IndexStats {
            sketch_elements: self.number_of_sketch_elements(),
            unique_representations: self.unique_representations().len(),
            max_occurrences: max_occurrences as usize,
            number_of_reads: self.number_of_reads(),
            smallest_read_id: self.smallest_read_id(),
            largest_read_id: self.largest_read_id(),
            longest_read: self.number_of_basepairs_in_longest_read(),
        }
    }

    /// 复制为主机端数组（用于比较与快照）
    fn to_arrays(&self) -> IndexArrays {
        IndexArrays {
            representations: self.representations().to_vec(),
            read_ids: self.read_ids().to_vec(),
            positions_in_reads: self.positions_in_reads().to_vec(),
            directions_of_reads: self.directions_of_reads().to_vec(),
            unique_representations: self.unique_representations().to_vec(),
            first_occurrence_of_representations: self.first_occurrence_of_representations().to_vec(),
        }
    }

    fn metadata(&self) -> IndexMetadata {
        IndexMetadata {
            number_of_reads: self.number_of_reads(),
            smallest_read_id: self.smallest_read_id(),
            largest_read_id: self.largest_read_id(),
            number_of_basepairs_in_longest_read: self.number_of_basepairs_in_longest_read(),
        }
    }
}

/// 索引摘要
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub sketch_elements: usize,
    pub unique_representations: usize,
    pub max_occurrences: usize,
    pub number_of_reads: ReadId,
    pub smallest_read_id: ReadId,
    pub largest_read_id: ReadId,
    pub longest_read: PositionInRead,
}

impl fmt::Display for IndexStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "reads: {} (ids {}..={})", self.number_of_reads, self.smallest_read_id, self.largest_read_id)?;
        writeln!(f, "longest_read: {}", self.longest_read)?;
        writeln!(f, "sketch_elements: {}", self.sketch_elements)?;
        writeln!(f, "unique_representations: {}", self.unique_representations)?;
        write!(f, "max_occurrences: {}", self.max_occurrences)
    }
}
