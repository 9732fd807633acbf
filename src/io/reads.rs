use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{anyhow, Result};
use tracing::info;

use super::fasta::FastaReader;
use super::fastq::FastqReader;
use crate::sketch::ReadId;

/// 一条 read：名称与碱基序列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    pub name: String,
    pub seq: Vec<u8>,
}

/// read 来源：按 read 编号提供序列。
///
/// 索引构建只读取 `[first_read_id, past_the_last_read_id)` 区间内的 read，
/// 不关心文件格式。
pub trait ReadSource {
    fn number_of_reads(&self) -> usize;

    fn sequence(&self, read_id: ReadId) -> Option<&[u8]>;

    fn name(&self, _read_id: ReadId) -> Option<&str> {
        None
    }
}

/// 内存中的 read 集合
#[derive(Debug, Default, Clone)]
pub struct ReadStore {
    records: Vec<SequenceRecord>,
}

impl ReadStore {
    pub fn new(records: Vec<SequenceRecord>) -> Self {
        Self { records }
    }

    pub fn from_fasta<R: BufRead>(reader: R) -> Result<Self> {
        Ok(Self::new(FastaReader::new(reader).collect::<Result<_>>()?))
    }

    pub fn from_fastq<R: BufRead>(reader: R) -> Result<Self> {
        Ok(Self::new(FastqReader::new(reader).collect::<Result<_>>()?))
    }

    /// 按首个非空白字符判断格式（'>' FASTA，'@' FASTQ）
    pub fn from_reader<R: BufRead>(mut reader: R) -> Result<Self> {
        let first = loop {
            let buf = reader.fill_buf()?;
            if buf.is_empty() {
                return Ok(Self::default());
            }
            match buf.iter().position(|b| !b.is_ascii_whitespace()) {
                Some(i) => break buf[i],
                None => {
                    let n = buf.len();
                    reader.consume(n);
                }
            }
        };
        match first {
            b'>' => Self::from_fasta(reader),
            b'@' => Self::from_fastq(reader),
            other => Err(anyhow!("unrecognized read file format (first byte '{}')", other as char)),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let fh = File::open(path).map_err(|e| anyhow!("cannot open reads file '{}': {}", path.display(), e))?;
        let store = Self::from_reader(BufReader::new(fh))?;
        info!(reads = store.len(), path = %path.display(), "loaded reads");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SequenceRecord] {
        &self.records
    }
}

impl ReadSource for ReadStore {
    fn number_of_reads(&self) -> usize {
        self.records.len()
    }

    fn sequence(&self, read_id: ReadId) -> Option<&[u8]> {
        self.records.get(read_id as usize).map(|r| r.seq.as_slice())
    }

    fn name(&self, read_id: ReadId) -> Option<&str> {
        self.records.get(read_id as usize).map(|r| r.name.as_str())
    }
}

impl ReadSource for [Vec<u8>] {
    fn number_of_reads(&self) -> usize {
        self.len()
    }

    fn sequence(&self, read_id: ReadId) -> Option<&[u8]> {
        self.get(read_id as usize).map(Vec::as_slice)
    }
}

impl ReadSource for Vec<Vec<u8>> {
    fn number_of_reads(&self) -> usize {
        self.len()
    }

    fn sequence(&self, read_id: ReadId) -> Option<&[u8]> {
        self.get(read_id as usize).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn detects_format() {
        let fa = ReadStore::from_reader(Cursor::new(&b"\n>a\nACGT\n>b\nGG\n"[..])).unwrap();
        assert_eq!(fa.len(), 2);
        assert_eq!(fa.sequence(1), Some(&b"GG"[..]));
        assert_eq!(fa.name(0), Some("a"));
        assert_eq!(fa.records()[0].seq, b"ACGT");

        let fq = ReadStore::from_reader(Cursor::new(&b"@q\nAC\n+\nII\n"[..])).unwrap();
        assert_eq!(fq.number_of_reads(), 1);
        assert_eq!(fq.sequence(7), None);

        assert!(ReadStore::from_reader(Cursor::new(&b"ACGT"[..])).is_err());
        assert!(ReadStore::from_reader(Cursor::new(&b""[..])).unwrap().is_empty());
    }

    #[test]
    fn plain_vectors_are_sources() {
        let reads = vec![b"ACGT".to_vec(), b"TT".to_vec()];
        assert_eq!(reads.number_of_reads(), 2);
        assert_eq!(reads.sequence(1), Some(&b"TT"[..]));
        assert_eq!(reads.name(0), None);
    }
}
