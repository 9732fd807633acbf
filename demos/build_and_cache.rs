//! 演示如何在 library 模式下使用 sketchmap 构建索引并经主机缓存重新生成。
//!
//! 运行方式：
//! ```bash
//! cargo run --example build_and_cache
//! ```

use sketchmap::device::{DefaultDeviceAllocator, Stream};
use sketchmap::index::{DeviceIndex, HostIndexCache, IndexParameters, SketchIndex};
use sketchmap::util::dna;

fn main() -> sketchmap::Result<()> {
    // 1. 准备 read
    let reads: Vec<Vec<u8>> = vec![
        b"ACGTACGTAGCTGATCGTAGCTAGCTAGCTGATCGTAG".to_vec(),
        b"GCTAGCTGATCGTAGCTAGCTAGCTGATTTACGGA".to_vec(),
        b"TTTACGGAGCTAGCTGATCGTAGCAAAAAAAAAAAA".to_vec(),
    ];
    let (k, w) = (7, 4);

    // 2. 在两个流上异步构建索引（不哈希，便于打印 k-mer）
    let pool = DefaultDeviceAllocator::unbounded();
    let params = IndexParameters::new(0, reads.len() as u32, k, w)
        .hash_representations(false)
        .filtering_parameter(0.5)
        .generation_stream(Stream::new())
        .copy_stream(Stream::new());
    let index = DeviceIndex::create_index(pool.clone().into_shared(), &reads, params)?;
    println!("索引已提交，就绪: {}", index.is_ready());
    index.wait_to_be_ready()?;
    println!("{}", index.stats());

    // 3. 查询出现在多条 read 中的表示
    for (i, &rep) in index.unique_representations().iter().enumerate() {
        let occ = index.occurrences(rep);
        if occ.len() < 2 {
            continue;
        }
        print!("{} ({}):", dna::decode_kmer(rep, k), i);
        for e in index.elements_with(rep) {
            print!(" read{}@{}{}", e.read_id, e.position_in_read, if e.direction.is_forward() { '+' } else { '-' });
        }
        println!();
    }

    // 4. 复制到主机，释放设备索引，再从缓存重新生成
    let stream = Stream::new();
    let cache = HostIndexCache::create_cache(&index, 0, k, w, &stream);
    cache.finish_copying()?;
    let before = index.to_arrays();
    drop(index);

    let restored = cache.copy_index_to_device(pool.clone().into_shared(), &stream);
    restored.wait_to_be_ready()?;
    println!("\n重新生成后一致: {}", restored.to_arrays() == before);
    println!("分配器峰值: {} 字节", pool.peak_bytes());
    Ok(())
}
