use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::arrays::{IndexArrays, IndexMetadata};
use super::host_cache::{HostContent, HostIndexCache};
use crate::device::{Completion, Stream};
use crate::error::Result;
use crate::sketch::ReadId;

/// 主机缓存的可序列化形式，用于落盘后在其他进程中重新生成设备索引
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub first_read_id: ReadId,
    pub kmer_size: usize,
    pub window_size: usize,
    pub metadata: IndexMetadata,
    pub arrays: IndexArrays,
    /// 构建时间（RFC 3339）
    pub build_timestamp: Option<String>,
    /// 生成索引的 read 文件
    pub reads_file: Option<String>,
    /// 表示是否经过哈希；未记录时为 `None`
    pub hash_representations: Option<bool>,
}

impl IndexSnapshot {
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let f = std::io::BufWriter::new(std::fs::File::create(path)?);
        bincode::serialize_into(f, self)?;
        Ok(())
    }

    /// 读取并校验数组不变式
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let f = std::io::BufReader::new(std::fs::File::open(path)?);
        let snapshot: Self = bincode::deserialize_from(f)?;
        snapshot.arrays.validate()?;
        Ok(snapshot)
    }
}

impl HostIndexCache {
    /// 等待复制完成后导出快照
    pub fn to_snapshot(&self) -> Result<IndexSnapshot> {
        self.finish_copying()?;
        let content = self.content();
        Ok(IndexSnapshot {
            first_read_id: self.first_read_id(),
            kmer_size: self.kmer_size(),
            window_size: self.window_size(),
            metadata: content.metadata,
            arrays: content.arrays.clone(),
            build_timestamp: Some(chrono::Utc::now().to_rfc3339()),
            reads_file: None,
            hash_representations: None,
        })
    }

    /// 由快照得到已就绪的缓存；`stream` 作为之后复制到设备的默认流
    pub fn from_snapshot(snapshot: IndexSnapshot, stream: &Stream) -> Result<Self> {
        snapshot.arrays.validate()?;
        let content = HostContent { arrays: snapshot.arrays, metadata: snapshot.metadata };
        Ok(Self::from_state(
            Arc::new(Completion::ready(content)),
            snapshot.first_read_id,
            snapshot.kmer_size,
            snapshot.window_size,
            stream.clone(),
        ))
    }
}
