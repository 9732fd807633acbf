use anyhow::{anyhow, Result};
use std::io::BufRead;

use super::reads::SequenceRecord;

/// 四行格式 FASTQ 读取器；质量值只用于长度校验，不保留
pub struct FastqReader<R: BufRead> {
    reader: R,
    buf: String,
    line: usize,
    done: bool,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buf: String::new(), line: 0, done: false }
    }

    fn read_line(&mut self) -> Result<bool> {
        self.buf.clear();
        let n = self.reader.read_line(&mut self.buf)?;
        self.line += 1;
        Ok(n > 0)
    }

    pub fn next_record(&mut self) -> Result<Option<SequenceRecord>> {
        if self.done { return Ok(None); }

        // skip blank lines between records
        loop {
            if !self.read_line()? { self.done = true; return Ok(None); }
            if !self.buf.trim().is_empty() { break; }
        }
        let header = self.buf.trim_end().strip_prefix('@')
            .ok_or_else(|| anyhow!("line {}: FASTQ header not starting with '@'", self.line))?;
        let name = header.split_whitespace().next().unwrap_or("").to_string();

        if !self.read_line()? { return Err(anyhow!("line {}: unexpected EOF after header", self.line)); }
        let seq: Vec<u8> = self.buf.trim_end().bytes().map(|b| b.to_ascii_uppercase()).collect();

        if !self.read_line()? || !self.buf.starts_with('+') {
            return Err(anyhow!("line {}: missing '+' line", self.line));
        }

        if !self.read_line()? { return Err(anyhow!("line {}: missing quality line", self.line)); }
        if self.buf.trim_end().len() != seq.len() {
            return Err(anyhow!("line {}: seq/qual length mismatch for '{}'", self.line, name));
        }

        Ok(Some(SequenceRecord { name, seq }))
    }
}

impl<R: BufRead> Iterator for FastqReader<R> {
    type Item = Result<SequenceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
