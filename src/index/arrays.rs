use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::sketch::{Direction, PositionInRead, ReadId, Representation, SketchElement};

/// 索引内容的主机端表示（结构体数组布局）。
///
/// 四个并行数组按表示升序（稳定）排列；`unique_representations` 严格升序；
/// `first_occurrence_of_representations` 比它多一个元素，末尾为元素总数，
/// 区间 `[fo[i], fo[i+1])` 内的表示都等于 `unique_representations[i]`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexArrays {
    pub representations: Vec<Representation>,
    pub read_ids: Vec<ReadId>,
    pub positions_in_reads: Vec<PositionInRead>,
    pub directions_of_reads: Vec<Direction>,
    pub unique_representations: Vec<Representation>,
    pub first_occurrence_of_representations: Vec<u32>,
}

/// 索引的标量元信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub number_of_reads: ReadId,
    /// 空索引为 0
    pub smallest_read_id: ReadId,
    /// 空索引为 0
    pub largest_read_id: ReadId,
    pub number_of_basepairs_in_longest_read: PositionInRead,
}

impl IndexMetadata {
    pub fn for_range(first_read_id: ReadId, past_the_last_read_id: ReadId, longest_read: PositionInRead) -> Self {
        if past_the_last_read_id <= first_read_id {
            return Self::default();
        }
        Self {
            number_of_reads: past_the_last_read_id - first_read_id,
            smallest_read_id: first_read_id,
            largest_read_id: past_the_last_read_id - 1,
            number_of_basepairs_in_longest_read: longest_read,
        }
    }
}

impl Default for IndexArrays {
    fn default() -> Self {
        Self::empty()
    }
}

impl IndexArrays {
    /// 零元素索引
    pub fn empty() -> Self {
        Self {
            representations: Vec::new(),
            read_ids: Vec::new(),
            positions_in_reads: Vec::new(),
            directions_of_reads: Vec::new(),
            unique_representations: Vec::new(),
            first_occurrence_of_representations: vec![0],
        }
    }

    /// 由已按表示排序的元素构造（拆分为并行数组并生成首次出现表）
    pub fn from_sorted_elements(elements: &[SketchElement]) -> Result<Self> {
        if elements.len() > u32::MAX as usize {
            return Err(IndexError::invalid_data(format!(
                "{} sketch elements do not fit 32-bit occurrence offsets",
                elements.len()
            )));
        }
        let mut out = Self {
            representations: Vec::with_capacity(elements.len()),
            read_ids: Vec::with_capacity(elements.len()),
            positions_in_reads: Vec::with_capacity(elements.len()),
            directions_of_reads: Vec::with_capacity(elements.len()),
            unique_representations: Vec::new(),
            first_occurrence_of_representations: Vec::new(),
        };
        for (i, e) in elements.iter().enumerate() {
            if out.unique_representations.last() != Some(&e.representation) {
                out.unique_representations.push(e.representation);
                out.first_occurrence_of_representations.push(i as u32);
            }
            out.representations.push(e.representation);
            out.read_ids.push(e.read_id);
            out.positions_in_reads.push(e.position_in_read);
            out.directions_of_reads.push(e.direction);
        }
        out.first_occurrence_of_representations.push(elements.len() as u32);
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.representations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.representations.is_empty()
    }

    pub fn element(&self, i: usize) -> SketchElement {
        SketchElement::new(
            self.representations[i],
            self.read_ids[i],
            self.positions_in_reads[i],
            self.directions_of_reads[i],
        )
    }

    /// 总字节数（用于分配器计费与日志）
    pub fn size_in_bytes(&self) -> usize {
        use std::mem::size_of;
        self.representations.len() * size_of::<Representation>()
            + self.read_ids.len() * size_of::<ReadId>()
            + self.positions_in_reads.len() * size_of::<PositionInRead>()
            + self.directions_of_reads.len() * size_of::<Direction>()
            + self.unique_representations.len() * size_of::<Representation>()
            + self.first_occurrence_of_representations.len() * size_of::<u32>()
    }

    /// 检查全部不变式
    pub fn validate(&self) -> Result<()> {
        let n = self.representations.len();
        if self.read_ids.len() != n || self.positions_in_reads.len() != n || self.directions_of_reads.len() != n {
            return Err(IndexError::invalid_data("parallel arrays differ in length"));
        }
        let unique = &self.unique_representations;
        let first = &self.first_occurrence_of_representations;
        if first.len() != unique.len() + 1 {
            return Err(IndexError::invalid_data(format!(
                "{} first occurrences for {} unique representations",
                first.len(),
                unique.len()
            )));
        }
        if first[0] != 0 || first[unique.len()] as usize != n {
            return Err(IndexError::invalid_data("first occurrences do not span all elements"));
        }
        for i in 0..unique.len() {
            if i > 0 && unique[i - 1] >= unique[i] {
                return Err(IndexError::invalid_data(format!("unique representations not ascending at {}", i)));
            }
            let (s, e) = (first[i] as usize, first[i + 1] as usize);
            if s >= e || e > n {
                return Err(IndexError::invalid_data(format!("empty or out-of-range group {}", i)));
            }
            if self.representations[s..e].iter().any(|&r| r != unique[i]) {
                return Err(IndexError::invalid_data(format!("group {} mixes representations", i)));
            }
        }
        Ok(())
    }
}
