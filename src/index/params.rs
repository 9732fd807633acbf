use super::check_sketch_parameters;
use crate::device::Stream;
use crate::error::{IndexError, Result};
use crate::sketch::{ReadId, SketchParameters};

/// 索引构建参数。
///
/// 默认值：开启哈希、`filtering_parameter = 1.0`（不过滤）、两个流均为默认流。
#[derive(Debug, Clone)]
pub struct IndexParameters {
    /// 第一条纳入索引的 read
    pub first_read_id: ReadId,
    /// 最后一条纳入索引的 read 的编号 + 1
    pub past_the_last_read_id: ReadId,
    /// k：k-mer 长度
    pub kmer_size: usize,
    /// w：窗口内相邻 k-mer 的个数
    pub window_size: usize,
    pub hash_representations: bool,
    /// 删除占比 `>= filtering_parameter` 的表示；1.0 关闭过滤
    pub filtering_parameter: f64,
    /// 生成索引的流，临时缓冲区与之关联
    pub generation_stream: Stream,
    /// 复制用的流，最终的设备数组与之关联
    pub copy_stream: Stream,
}

impl IndexParameters {
    pub fn new(first_read_id: ReadId, past_the_last_read_id: ReadId, kmer_size: usize, window_size: usize) -> Self {
        Self {
            first_read_id,
            past_the_last_read_id,
            kmer_size,
            window_size,
            hash_representations: true,
            filtering_parameter: 1.0,
            generation_stream: Stream::default_stream(),
            copy_stream: Stream::default_stream(),
        }
    }

    pub fn hash_representations(mut self, hash: bool) -> Self {
        self.hash_representations = hash;
        self
    }

    pub fn filtering_parameter(mut self, filtering_parameter: f64) -> Self {
        self.filtering_parameter = filtering_parameter;
        self
    }

    pub fn generation_stream(mut self, stream: Stream) -> Self {
        self.generation_stream = stream;
        self
    }

    pub fn copy_stream(mut self, stream: Stream) -> Self {
        self.copy_stream = stream;
        self
    }

    pub fn sketch_parameters(&self) -> SketchParameters {
        SketchParameters {
            kmer_size: self.kmer_size,
            window_size: self.window_size,
            hash_representations: self.hash_representations,
        }
    }

    /// 同步检查；`number_of_reads` 为 read 来源中的 read 数
    pub fn validate(&self, number_of_reads: usize) -> Result<()> {
        check_sketch_parameters(self.kmer_size, self.window_size)?;
        if self.first_read_id > self.past_the_last_read_id {
            return Err(IndexError::configuration(format!(
                "first_read_id {} is past past_the_last_read_id {}",
                self.first_read_id, self.past_the_last_read_id
            )));
        }
        if self.past_the_last_read_id as usize > number_of_reads && self.first_read_id != self.past_the_last_read_id {
            return Err(IndexError::configuration(format!(
                "read range {}..{} exceeds the {} available reads",
                self.first_read_id, self.past_the_last_read_id, number_of_reads
            )));
        }
        if !(self.filtering_parameter > 0.0 && self.filtering_parameter <= 1.0) {
            return Err(IndexError::configuration(format!(
                "filtering_parameter {} outside (0, 1]",
                self.filtering_parameter
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let p = IndexParameters::new(0, 10, 15, 5);
        assert!(p.hash_representations);
        assert_eq!(p.filtering_parameter, 1.0);
        assert!(p.generation_stream.same_stream(&Stream::default_stream()));
        assert!(p.validate(10).is_ok());
    }

    #[test]
    fn rejects_bad_configuration() {
        let ok = IndexParameters::new(0, 4, 15, 5);
        assert!(ok.clone().filtering_parameter(0.0).validate(4).is_err());
        assert!(ok.clone().filtering_parameter(f64::NAN).validate(4).is_err());
        assert!(ok.clone().filtering_parameter(1.5).validate(4).is_err());
        assert!(ok.validate(3).is_err());
        assert!(IndexParameters::new(5, 4, 15, 5).validate(10).is_err());
        assert!(IndexParameters::new(0, 4, 33, 5).validate(10).is_err());
        assert!(IndexParameters::new(0, 4, 15, 0).validate(10).is_err());
        // empty range is fine even beyond the source
        assert!(IndexParameters::new(7, 7, 15, 5).validate(0).is_ok());
    }
}
