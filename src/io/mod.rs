pub mod fasta;
pub mod fastq;
pub mod reads;

pub use reads::{ReadSource, ReadStore, SequenceRecord};
