//! (k, w) 窗口 minimizer 提取。
//!
//! 对每个由 `w` 个相邻 k-mer 组成的窗口，选出规范表示最小的 k-mer
//! （并列时取最左侧）。规范表示 = min(正向编码, 反向互补编码)，
//! 开启哈希时两者先经过 [`wang_hash64`] 再比较。
//! 相邻窗口选中同一个 k-mer 时只输出一次。

use std::collections::VecDeque;

use super::element::{Direction, ReadId, Representation, SketchElement};
use super::hash::{kmer_mask, wang_hash64};
use crate::util::dna;

/// 草图参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SketchParameters {
    pub kmer_size: usize,
    pub window_size: usize,
    pub hash_representations: bool,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    kmer_index: usize,
    representation: Representation,
    direction: Direction,
}

/// 单条 read 的 minimizer 惰性迭代器（滑动窗口最小值，单调双端队列实现）
pub struct MinimizerIter<'a> {
    seq: &'a [u8],
    read_id: ReadId,
    kmer_size: usize,
    window: usize,
    hash: bool,
    mask: Representation,
    rc_shift: u32,
    next_base: usize,
    forward: Representation,
    reverse: Representation,
    valid_run: usize,
    candidates: VecDeque<Candidate>,
    last_emitted: Option<usize>,
}

/// 提取一条 read 的草图元素。
///
/// 长度小于 k 的 read 不产生元素；k-mer 数少于 w 时整条 read 作为一个窗口。
/// 含非 ACGT 碱基的 k-mer 不参与选择。
pub fn minimizers<'a>(seq: &'a [u8], read_id: ReadId, params: &SketchParameters) -> MinimizerIter<'a> {
    let k = params.kmer_size;
    let num_kmers = if k == 0 || seq.len() < k { 0 } else { seq.len() - k + 1 };
    let window = params.window_size.min(num_kmers).max(1);
    MinimizerIter {
        seq: if num_kmers == 0 { &seq[..0] } else { seq },
        read_id,
        kmer_size: k,
        window,
        hash: params.hash_representations,
        mask: kmer_mask(k),
        rc_shift: 2 * k.saturating_sub(1) as u32,
        next_base: 0,
        forward: 0,
        reverse: 0,
        valid_run: 0,
        candidates: VecDeque::with_capacity(window),
        last_emitted: None,
    }
}

impl<'a> MinimizerIter<'a> {
    /// 吸收一个碱基；若形成有效 k-mer 则返回其候选
    #[inline]
    fn roll(&mut self, base: u8) -> Option<Candidate> {
        match dna::base_code(base) {
            Some(code) => {
                self.forward = ((self.forward << 2) | code as Representation) & self.mask;
                self.reverse = (self.reverse >> 2)
                    | ((dna::complement_code(code) as Representation) << self.rc_shift);
                self.valid_run += 1;
            }
            None => self.valid_run = 0,
        }
        if self.valid_run < self.kmer_size {
            return None;
        }
        let (f, r) = if self.hash {
            (wang_hash64(self.forward, self.mask), wang_hash64(self.reverse, self.mask))
        } else {
            (self.forward, self.reverse)
        };
        // palindromes resolve to Forward
        let (representation, direction) =
            if f <= r { (f, Direction::Forward) } else { (r, Direction::ReverseComplement) };
        Some(Candidate { kmer_index: self.next_base + 1 - self.kmer_size, representation, direction })
    }
}

impl<'a> Iterator for MinimizerIter<'a> {
    type Item = SketchElement;

    fn next(&mut self) -> Option<SketchElement> {
        while self.next_base < self.seq.len() {
            let base = self.seq[self.next_base];
            let candidate = self.roll(base);
            self.next_base += 1;
            if self.next_base < self.kmer_size {
                continue;
            }
            let kmer_index = self.next_base - self.kmer_size;

            if let Some(c) = candidate {
                // 严格大于才弹出：相等的旧候选保留在前，保证并列取最左
                while self.candidates.back().map_or(false, |b| b.representation > c.representation) {
                    self.candidates.pop_back();
                }
                self.candidates.push_back(c);
            }

            if kmer_index + 1 < self.window {
                continue;
            }
            let window_start = kmer_index + 1 - self.window;
            while self.candidates.front().map_or(false, |f| f.kmer_index < window_start) {
                self.candidates.pop_front();
            }
            if let Some(front) = self.candidates.front().copied() {
                if self.last_emitted != Some(front.kmer_index) {
                    self.last_emitted = Some(front.kmer_index);
                    return Some(SketchElement::new(
                        front.representation,
                        self.read_id,
                        front.kmer_index as u32,
                        front.direction,
                    ));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::dna::{encode_kmer, revcomp};
    use quickcheck::{Arbitrary, Gen};

    fn params(k: usize, w: usize, hash: bool) -> SketchParameters {
        SketchParameters { kmer_size: k, window_size: w, hash_representations: hash }
    }

    /// 直接按定义计算，用于对照
    fn naive(seq: &[u8], k: usize, w: usize, hash: bool) -> Vec<SketchElement> {
        if seq.len() < k {
            return Vec::new();
        }
        let n = seq.len() - k + 1;
        let mask = kmer_mask(k);
        let kmers: Vec<Option<(u64, Direction)>> = (0..n)
            .map(|i| {
                let f = encode_kmer(&seq[i..i + k])?;
                let r = encode_kmer(&revcomp(&seq[i..i + k]))?;
                let (f, r) = if hash { (wang_hash64(f, mask), wang_hash64(r, mask)) } else { (f, r) };
                Some(if f <= r { (f, Direction::Forward) } else { (r, Direction::ReverseComplement) })
            })
            .collect();
        let w = w.min(n);
        let mut out: Vec<SketchElement> = Vec::new();
        for start in 0..=(n - w) {
            let mut best: Option<(usize, u64, Direction)> = None;
            for i in start..start + w {
                if let Some((v, d)) = kmers[i] {
                    if best.map_or(true, |b| v < b.1) {
                        best = Some((i, v, d));
                    }
                }
            }
            if let Some((i, v, d)) = best {
                if out.last().map_or(true, |e| e.position_in_read as usize != i) {
                    out.push(SketchElement::new(v, 0, i as u32, d));
                }
            }
        }
        out
    }

    #[test]
    fn acgtacgtac_k3_w2() {
        let got: Vec<_> = minimizers(b"ACGTACGTAC", 0, &params(3, 2, false)).collect();
        use Direction::*;
        let expected = vec![
            SketchElement::new(6, 0, 0, Forward),
            SketchElement::new(6, 0, 1, ReverseComplement),
            SketchElement::new(44, 0, 2, Forward),
            SketchElement::new(6, 0, 4, Forward),
            SketchElement::new(6, 0, 5, ReverseComplement),
            SketchElement::new(44, 0, 6, Forward),
        ];
        assert_eq!(got, expected);
        assert_eq!(got, naive(b"ACGTACGTAC", 3, 2, false));
    }

    #[test]
    fn short_reads() {
        assert_eq!(minimizers(b"AC", 5, &params(3, 4, false)).count(), 0);
        assert_eq!(minimizers(b"", 5, &params(3, 4, false)).count(), 0);
        // 3 k-mers < w: one window over the whole read
        let got: Vec<_> = minimizers(b"TTTAC", 9, &params(3, 10, false)).collect();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].read_id, 9);
        assert_eq!(got, naive(b"TTTAC", 3, 10, false).into_iter().map(|mut e| { e.read_id = 9; e }).collect::<Vec<_>>());
    }

    #[test]
    fn palindrome_is_forward() {
        // ACGT is its own reverse complement
        let got: Vec<_> = minimizers(b"ACGT", 0, &params(4, 1, false)).collect();
        assert_eq!(got, vec![SketchElement::new(encode_kmer(b"ACGT").unwrap(), 0, 0, Direction::Forward)]);
    }

    #[test]
    fn ambiguous_bases_break_kmers() {
        let seq = b"ACGTNNACGTTTGCAN";
        for w in 1..6 {
            let got: Vec<_> = minimizers(seq, 0, &params(3, w, false)).collect();
            assert_eq!(got, naive(seq, 3, w, false), "w={}", w);
        }
        assert_eq!(minimizers(b"NNNNNNN", 0, &params(3, 2, false)).count(), 0);
    }

    #[test]
    fn max_kmer_size() {
        let seq: Vec<u8> = b"ACGTTGCAAGGCTTACCGATGCATGCAGTCAGTAGCTAGGAT".to_vec();
        for hash in [false, true] {
            let got: Vec<_> = minimizers(&seq, 0, &params(32, 3, hash)).collect();
            assert_eq!(got, naive(&seq, 32, 3, hash));
        }
    }

    #[derive(Clone, Debug)]
    struct Dna(Vec<u8>);

    impl Arbitrary for Dna {
        fn arbitrary(g: &mut Gen) -> Self {
            let len = usize::arbitrary(g) % 120;
            Dna((0..len).map(|_| *g.choose(&b"ACGTACGTACGTN"[..]).unwrap()).collect())
        }
    }

    #[quickcheck]
    fn matches_naive(seq: Dna, k: u8, w: u8, hash: bool) -> bool {
        let k = (k % 12) as usize + 1;
        let w = (w % 10) as usize + 1;
        let got: Vec<_> = minimizers(&seq.0, 0, &params(k, w, hash)).collect();
        got == naive(&seq.0, k, w, hash)
    }

    #[quickcheck]
    fn representation_is_canonical_kmer(seq: Dna, k: u8, w: u8) -> bool {
        let k = (k % 16) as usize + 1;
        let w = (w % 8) as usize + 1;
        minimizers(&seq.0, 0, &params(k, w, false)).all(|e| {
            let start = e.position_in_read as usize;
            let kmer = &seq.0[start..start + k];
            let f = encode_kmer(kmer).unwrap();
            let r = encode_kmer(&revcomp(kmer)).unwrap();
            e.representation == f.min(r) && (e.direction == Direction::Forward) == (f <= r)
        })
    }
}
