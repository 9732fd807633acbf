//! 索引构建流水线：逐 read 提取草图 → 按表示稳定排序 → 分组 → 高频过滤。

use rayon::prelude::*;
use tracing::debug;

use super::arrays::IndexArrays;
use crate::error::Result;
use crate::sketch::{minimizers, ReadId, SketchElement, SketchParameters};

/// 并行提取一批 read 的草图元素。
///
/// `reads[i]` 对应 read 编号 `first_read_id + i`；输出按 read 编号、再按位置排列，
/// 即后续稳定排序所依据的发射顺序。
pub fn sketch_reads<S: AsRef<[u8]> + Sync>(
    reads: &[S],
    first_read_id: ReadId,
    params: &SketchParameters,
) -> Vec<SketchElement> {
    let per_read: Vec<Vec<SketchElement>> = reads
        .par_iter()
        .enumerate()
        .map(|(i, seq)| minimizers(seq.as_ref(), first_read_id + i as ReadId, params).collect())
        .collect();
    let total: usize = per_read.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(total);
    for v in per_read {
        out.extend(v);
    }
    out
}

/// 过滤判定：组内元素占比 `count / total >= filtering_parameter` 时整组删除。
///
/// `filtering_parameter >= 1.0` 表示关闭过滤（即使某组占全部元素也保留）。
#[inline]
pub fn is_filtered_out(count: usize, total: usize, filtering_parameter: f64) -> bool {
    filtering_parameter < 1.0 && total > 0 && count as f64 / total as f64 >= filtering_parameter
}

/// 原地排序、分组并过滤，生成最终的索引数组
pub fn sort_and_filter(elements: &mut [SketchElement], filtering_parameter: f64) -> Result<IndexArrays> {
    // rayon 的 par_sort_by_key 是稳定排序：相同表示保持发射顺序
    elements.par_sort_by_key(|e| e.representation);
    let grouped = IndexArrays::from_sorted_elements(elements)?;
    if filtering_parameter >= 1.0 || grouped.is_empty() {
        return Ok(grouped);
    }

    let total = elements.len();
    let first = &grouped.first_occurrence_of_representations;
    let mut kept: Vec<SketchElement> = Vec::with_capacity(total);
    let mut removed_groups = 0usize;
    for w in first.windows(2) {
        let (s, e) = (w[0] as usize, w[1] as usize);
        if is_filtered_out(e - s, total, filtering_parameter) {
            removed_groups += 1;
        } else {
            kept.extend_from_slice(&elements[s..e]);
        }
    }
    if removed_groups == 0 {
        return Ok(grouped);
    }
    debug!(
        removed_groups,
        removed_elements = total - kept.len(),
        filtering_parameter,
        "filtered high-frequency representations"
    );
    IndexArrays::from_sorted_elements(&kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sketch::Direction::*;

    fn el(r: u64, read: u32, pos: u32) -> SketchElement {
        SketchElement::new(r, read, pos, Forward)
    }

    #[test]
    fn stable_sort_keeps_emission_order() {
        let mut input = vec![el(5, 0, 0), el(2, 0, 1), el(5, 0, 2), el(2, 1, 0), el(5, 1, 3)];
        let a = sort_and_filter(&mut input, 1.0).unwrap();
        assert_eq!(a.representations, vec![2, 2, 5, 5, 5]);
        assert_eq!(a.read_ids, vec![0, 1, 0, 0, 1]);
        assert_eq!(a.positions_in_reads, vec![1, 0, 0, 2, 3]);
        assert_eq!(a.unique_representations, vec![2, 5]);
        assert_eq!(a.first_occurrence_of_representations, vec![0, 2, 5]);
        a.validate().unwrap();
    }

    #[test]
    fn filtering_removes_whole_groups() {
        // 9 of 10 elements share representation 7
        let mut input: Vec<_> = (0..9).map(|i| el(7, i % 2, i)).collect();
        input.push(el(1, 1, 100));
        let kept = sort_and_filter(&mut input.clone(), 0.5).unwrap();
        assert_eq!(kept.representations, vec![1]);
        assert_eq!(kept.unique_representations, vec![1]);
        assert_eq!(kept.first_occurrence_of_representations, vec![0, 1]);

        let all = sort_and_filter(&mut input, 1.0).unwrap();
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn filter_boundary_is_inclusive() {
        // two groups of equal size: ratio exactly 0.5
        let mut input = vec![el(1, 0, 0), el(1, 0, 1), el(2, 0, 2), el(2, 0, 3)];
        assert!(sort_and_filter(&mut input.clone(), 0.5).unwrap().is_empty());
        assert_eq!(sort_and_filter(&mut input, 0.5000001).unwrap().len(), 4);
        assert!(is_filtered_out(1, 2, 0.5));
        assert!(!is_filtered_out(1, 2, 0.51));
    }

    #[test]
    fn one_disables_filtering_even_for_single_group() {
        let mut input = vec![el(4, 0, 0), el(4, 1, 0)];
        assert_eq!(sort_and_filter(&mut input, 1.0).unwrap().len(), 2);
        assert!(!is_filtered_out(2, 2, 1.0));
    }

    #[test]
    fn sketch_reads_offsets_read_ids() {
        let params = SketchParameters { kmer_size: 3, window_size: 2, hash_representations: false };
        let reads = vec![b"ACGTACGTAC".to_vec(), b"AC".to_vec(), b"GGGTTT".to_vec()];
        let elements = sketch_reads(&reads, 40, &params);
        assert!(elements.iter().any(|e| e.read_id == 40));
        assert!(elements.iter().all(|e| e.read_id != 41));
        assert!(elements.iter().any(|e| e.read_id == 42));
        // emission order: read id non-decreasing
        assert!(elements.windows(2).all(|w| w[0].read_id <= w[1].read_id));
    }

    #[quickcheck]
    fn filtering_is_monotone(reps: Vec<u8>, p1: u8, p2: u8) -> bool {
        let mut input: Vec<_> = reps.iter().enumerate().map(|(i, &r)| el((r % 7) as u64, 0, i as u32)).collect();
        let (lo, hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
        let f = |p: u8| (p as f64 + 1.0) / 256.0;
        let a = sort_and_filter(&mut input.clone(), f(lo)).unwrap();
        let b = sort_and_filter(&mut input, f(hi)).unwrap();
        a.validate().is_ok() && b.validate().is_ok() && a.len() <= b.len()
    }
}
