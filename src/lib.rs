//! # sketchmap
//!
//! 面向 read-to-read 重叠检测的 (k, w)-minimizer 草图索引。
//!
//! 本 crate 提供：
//!
//! - **草图提取**：每个窗口选出规范表示最小的 k-mer（可选可逆哈希）
//! - **索引构建**：稳定排序、按表示分组、高频表示过滤，在执行流上异步完成
//! - **主机缓存**：把设备索引复制到主机端保存，之后无需重算即可重新生成设备索引
//! - **快照**：主机缓存的 bincode 落盘格式
//!
//! ## 快速示例
//!
//! ```rust,no_run
//! use sketchmap::device::{DefaultDeviceAllocator, Stream};
//! use sketchmap::index::{DeviceIndex, HostIndexCache, IndexParameters, SketchIndex};
//!
//! let reads = vec![b"ACGTTGCATGCAAGTC".to_vec(), b"GGCATGCAAGTCTTAG".to_vec()];
//! let allocator = DefaultDeviceAllocator::unbounded().into_shared();
//! let params = IndexParameters::new(0, 2, 5, 3).filtering_parameter(0.9);
//! let index = DeviceIndex::create_index(allocator.clone(), &reads, params)?;
//! index.wait_to_be_ready()?;
//! println!("{}", index.stats());
//!
//! let stream = Stream::new();
//! let cache = HostIndexCache::create_cache(&index, 0, 5, 3, &stream);
//! let again = cache.copy_index_to_device(allocator, &stream);
//! again.wait_to_be_ready()?;
//! assert_eq!(again.to_arrays(), index.to_arrays());
//! # Ok::<(), sketchmap::IndexError>(())
//! ```
//!
//! ## 模块说明
//!
//! - [`sketch`] — 草图元素与 minimizer 提取
//! - [`index`] — 设备索引、主机缓存、快照
//! - [`device`] — 执行流、事件、设备分配器与缓冲区
//! - [`io`] — FASTA / FASTQ 解析与 read 来源
//! - [`util`] — DNA 编码 / 反向互补等工具函数

#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

pub mod device;
pub mod error;
pub mod index;
pub mod io;
pub mod sketch;
pub mod util;

pub use error::{IndexError, Result};
pub use index::{DeviceIndex, HostIndexCache, IndexParameters, IndexSnapshot, SketchIndex};
