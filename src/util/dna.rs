/// 每个碱基占用的比特数（2-bit 编码：A=0, C=1, G=2, T=3）
pub const BITS_PER_BASE: u32 = 2;

/// 将碱基映射为 2-bit 编码；非 ACGT（如 N）返回 None。
#[inline]
pub fn base_code(b: u8) -> Option<u8> {
    match b.to_ascii_uppercase() {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' | b'U' => Some(3),
        _ => None,
    }
}

/// 2-bit 编码还原为碱基字符
#[inline]
pub fn code_to_base(code: u8) -> u8 {
    match code & 0b11 {
        0 => b'A',
        1 => b'C',
        2 => b'G',
        _ => b'T',
    }
}

/// 互补碱基的 2-bit 编码（A<->T, C<->G）
#[inline]
pub fn complement_code(code: u8) -> u8 {
    3 - (code & 0b11)
}

#[inline]
pub fn complement(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' | b'U' => b'A',
        _ => b'N',
    }
}

pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(seq.len());
    for &b in seq.iter().rev() {
        out.push(complement(b));
    }
    out
}

/// 按 2-bit 规则直接编码一个 k-mer（最高位对应第一个碱基）。
/// 含非 ACGT 碱基或长度超过 32 时返回 None。
pub fn encode_kmer(kmer: &[u8]) -> Option<u64> {
    if kmer.len() > 32 {
        return None;
    }
    let mut v = 0u64;
    for &b in kmer {
        v = (v << BITS_PER_BASE) | base_code(b)? as u64;
    }
    Some(v)
}

/// 将未哈希的表示解码回长度为 k 的碱基串（调试、CLI 输出用）
pub fn decode_kmer(representation: u64, k: usize) -> String {
    let mut out = String::with_capacity(k);
    for i in (0..k).rev() {
        let code = (representation >> (i as u32 * BITS_PER_BASE)) as u8;
        out.push(code_to_base(code) as char);
    }
    out
}
