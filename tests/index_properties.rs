//! 端到端性质：从 read 集合构建索引，经主机缓存往返，核对排序、过滤与元信息。

use std::sync::Arc;
use std::thread;

use sketchmap::device::{DefaultDeviceAllocator, Stream};
use sketchmap::index::builder::sketch_reads;
use sketchmap::index::{DeviceIndex, HostIndexCache, IndexParameters, SketchIndex};
use sketchmap::io::ReadStore;
use sketchmap::sketch::{Direction, SketchParameters};
use sketchmap::util::dna;

fn make_reads(n: usize, len: usize, seed: u32) -> Vec<Vec<u8>> {
    let bases = [b'A', b'C', b'G', b'T'];
    let mut x = seed;
    (0..n)
        .map(|_| {
            (0..len)
                .map(|_| {
                    x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                    bases[(x >> 16) as usize % 4]
                })
                .collect()
        })
        .collect()
}

#[test]
fn every_element_is_a_canonical_kmer_of_its_read() {
    let reads = make_reads(20, 150, 7);
    let allocator = DefaultDeviceAllocator::unbounded().into_shared();
    let params = IndexParameters::new(0, 20, 11, 5).hash_representations(false);
    let index = DeviceIndex::create_index(allocator, &reads, params).unwrap();
    index.wait_to_be_ready().unwrap();

    index.to_arrays().validate().unwrap();
    assert!(index.number_of_sketch_elements() > 0);
    for i in 0..index.number_of_sketch_elements() {
        let e = index.sketch_element(i);
        let pos = e.position_in_read as usize;
        let kmer = &reads[e.read_id as usize][pos..pos + 11];
        let forward = dna::encode_kmer(kmer).unwrap();
        let reverse = dna::encode_kmer(&dna::revcomp(kmer)).unwrap();
        assert_eq!(e.representation, forward.min(reverse));
        match e.direction {
            Direction::Forward => assert!(forward <= reverse),
            Direction::ReverseComplement => assert!(reverse < forward),
        }
    }
}

#[test]
fn occurrence_queries_agree_with_arrays() {
    let reads = make_reads(8, 200, 99);
    let allocator = DefaultDeviceAllocator::unbounded().into_shared();
    let index = DeviceIndex::create_index(allocator, &reads, IndexParameters::new(0, 8, 15, 10)).unwrap();
    index.wait_to_be_ready().unwrap();

    let mut seen = 0;
    for &rep in index.unique_representations() {
        let elements = index.elements_with(rep);
        assert!(!elements.is_empty());
        assert!(elements.iter().all(|e| e.representation == rep));
        seen += elements.len();
    }
    assert_eq!(seen, index.number_of_sketch_elements());
    let stats = index.stats();
    assert_eq!(stats.unique_representations, index.unique_representations().len());
    assert!(stats.max_occurrences >= 1);
}

#[test]
fn ninety_percent_group_is_filtered() {
    // read 0 is a long homopolymer, reads 1..3 are short random reads
    let mut reads = vec![vec![b'A'; 400]];
    reads.extend(make_reads(3, 12, 5));
    let params = SketchParameters { kmer_size: 4, window_size: 1, hash_representations: false };
    let all = sketch_reads(&reads, 0, &params);
    let poly = all.iter().filter(|e| e.representation == 0).count();
    assert!(poly as f64 / all.len() as f64 >= 0.9);

    let allocator = DefaultDeviceAllocator::unbounded().into_shared();
    let unfiltered = DeviceIndex::create_index(
        Arc::clone(&allocator),
        &reads,
        IndexParameters::new(0, 4, 4, 1).hash_representations(false),
    )
    .unwrap();
    let filtered = DeviceIndex::create_index(
        allocator,
        &reads,
        IndexParameters::new(0, 4, 4, 1).hash_representations(false).filtering_parameter(0.9),
    )
    .unwrap();
    unfiltered.wait_to_be_ready().unwrap();
    filtered.wait_to_be_ready().unwrap();

    assert_eq!(unfiltered.occurrences(0).len(), poly);
    assert!(filtered.occurrences(0).is_empty());
    assert_eq!(filtered.number_of_sketch_elements(), unfiltered.number_of_sketch_elements() - poly);
    filtered.to_arrays().validate().unwrap();
    // metadata covers the requested range regardless of filtering
    assert_eq!(filtered.metadata(), unfiltered.metadata());
}

#[test]
fn building_twice_gives_identical_indices() {
    let reads = make_reads(12, 120, 3);
    let allocator = DefaultDeviceAllocator::unbounded().into_shared();
    let params = IndexParameters::new(2, 10, 9, 4).filtering_parameter(0.2);
    let a = DeviceIndex::create_index(Arc::clone(&allocator), &reads, params.clone()).unwrap();
    let b = DeviceIndex::create_index(allocator, &reads, params.generation_stream(Stream::new())).unwrap();
    a.wait_to_be_ready().unwrap();
    b.wait_to_be_ready().unwrap();
    assert_eq!(a.to_arrays(), b.to_arrays());
    assert_eq!(a.metadata(), b.metadata());
}

#[test]
fn host_cache_round_trip_from_store() {
    let fasta = b">r0\nACGTTGCATGCAAGTCACGGTAC\n>r1\nGGCATGCAAGTCTTAGCA\n>r2\nTTAGCATGCAAGTCCCGA\n";
    let store = ReadStore::from_reader(&fasta[..]).unwrap();
    let allocator = DefaultDeviceAllocator::unbounded().into_shared();
    let params = IndexParameters::new(0, 3, 6, 3)
        .generation_stream(Stream::new())
        .copy_stream(Stream::new());
    let index = DeviceIndex::create_index(Arc::clone(&allocator), &store, params).unwrap();

    let stream = Stream::new();
    let cache = HostIndexCache::create_cache(&index, 0, 6, 3, &stream);
    let restored = cache.copy_index_to_device(allocator, &stream);
    restored.wait_to_be_ready().unwrap();
    assert_eq!(restored.to_arrays(), index.to_arrays());
    assert_eq!(restored.number_of_basepairs_in_longest_read(), 23);
    assert_eq!(restored.largest_read_id(), 2);
}

#[test]
fn shards_build_concurrently() {
    let reads = Arc::new(make_reads(40, 100, 11));
    let allocator = DefaultDeviceAllocator::unbounded().into_shared();
    let handles: Vec<_> = (0..4u32)
        .map(|shard| {
            let reads = Arc::clone(&reads);
            let allocator = Arc::clone(&allocator);
            thread::spawn(move || {
                let params = IndexParameters::new(shard * 10, shard * 10 + 10, 13, 6)
                    .generation_stream(Stream::new())
                    .copy_stream(Stream::new());
                let index = DeviceIndex::create_index(allocator, reads.as_slice(), params).unwrap();
                index.wait_to_be_ready().unwrap();
                index.to_arrays()
            })
        })
        .collect();
    for (shard, h) in handles.into_iter().enumerate() {
        let arrays = h.join().unwrap();
        arrays.validate().unwrap();
        let lo = shard as u32 * 10;
        assert!(arrays.read_ids.iter().all(|&r| (lo..lo + 10).contains(&r)));
    }
}
