use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use sketchmap::device::{DefaultDeviceAllocator, Stream};
use sketchmap::index::{DeviceIndex, HostIndexCache, IndexParameters, IndexSnapshot, SketchIndex};
use sketchmap::io::{ReadSource, ReadStore};
use sketchmap::sketch::ReadId;
use sketchmap::util::dna;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "sketchmap", author, version, about = "Minimizer sketch index for read overlap detection", arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a minimizer index over a range of reads
    Index {
        /// Reads file (FASTA or FASTQ)
        reads: String,
        /// k-mer length
        #[arg(short = 'k', long = "kmer-size", default_value_t = 15)]
        kmer_size: usize,
        /// Number of adjacent k-mers per window
        #[arg(short = 'w', long = "window-size", default_value_t = 10)]
        window_size: usize,
        /// Drop representations holding at least this fraction of all elements (1.0 keeps everything)
        #[arg(long = "filter", default_value_t = 1.0)]
        filtering_parameter: f64,
        /// Use raw 2-bit k-mer encodings instead of hashed ones
        #[arg(long = "no-hash")]
        no_hash: bool,
        /// First read id to index
        #[arg(long = "first", default_value_t = 0)]
        first: ReadId,
        /// One past the last read id to index (all reads if omitted)
        #[arg(long = "last")]
        last: Option<ReadId>,
        #[arg(short = 't', long = "threads", default_value_t = 1)]
        threads: usize,
        /// Copy the finished index to host memory and save it as a snapshot file
        #[arg(long = "cache")]
        cache: Option<String>,
    },
    /// Load a snapshot, rebuild the index from it and print statistics
    Inspect {
        /// Snapshot file written by `index --cache`
        snapshot: String,
        /// Number of most frequent representations to list
        #[arg(long = "top", default_value_t = 10)]
        top: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Index {
            reads,
            kmer_size,
            window_size,
            filtering_parameter,
            no_hash,
            first,
            last,
            threads,
            cache,
        } => {
            rayon::ThreadPoolBuilder::new().num_threads(threads).build_global().ok();
            let opt = IndexOpt { kmer_size, window_size, filtering_parameter, hash: !no_hash, first, last };
            run_index(&reads, opt, cache.as_deref())
        }
        Commands::Inspect { snapshot, top } => run_inspect(&snapshot, top),
    }
}

struct IndexOpt {
    kmer_size: usize,
    window_size: usize,
    filtering_parameter: f64,
    hash: bool,
    first: ReadId,
    last: Option<ReadId>,
}

fn run_index(reads_path: &str, opt: IndexOpt, cache_path: Option<&str>) -> Result<()> {
    let store = ReadStore::from_path(reads_path).map_err(|e| anyhow!("cannot read '{}': {}", reads_path, e))?;
    if store.is_empty() {
        anyhow::bail!("reads file '{}' contains no sequences", reads_path);
    }
    let past = match opt.last {
        Some(last) => last,
        None => ReadId::try_from(store.number_of_reads()).map_err(|_| anyhow!("too many reads for 32-bit read ids"))?,
    };

    let params = IndexParameters::new(opt.first, past, opt.kmer_size, opt.window_size)
        .hash_representations(opt.hash)
        .filtering_parameter(opt.filtering_parameter)
        .generation_stream(Stream::new())
        .copy_stream(Stream::new());
    let allocator = DefaultDeviceAllocator::unbounded();
    let index = DeviceIndex::create_index(allocator.clone().into_shared(), &store, params)?;
    index.wait_to_be_ready()?;

    println!("reads_file: {}", reads_path);
    println!("k: {}  w: {}", opt.kmer_size, opt.window_size);
    println!("{}", index.stats());
    info!(peak_bytes = allocator.peak_bytes(), "device memory");

    if let Some(path) = cache_path {
        let cache = HostIndexCache::create_cache(&index, opt.first, opt.kmer_size, opt.window_size, &Stream::new());
        let mut snapshot = cache.to_snapshot()?;
        snapshot.reads_file = Some(reads_path.to_string());
        snapshot.hash_representations = Some(opt.hash);
        snapshot.save_to_file(path).map_err(|e| anyhow!("cannot write snapshot to '{}': {}", path, e))?;
        println!("snapshot saved: {}", path);
    }
    Ok(())
}

fn run_inspect(path: &str, top: usize) -> Result<()> {
    let snapshot = IndexSnapshot::load_from_file(path).map_err(|e| anyhow!("cannot load snapshot '{}': {}", path, e))?;
    let (k, w) = (snapshot.kmer_size, snapshot.window_size);
    let raw_encoding = snapshot.hash_representations == Some(false);
    println!("snapshot: {}", path);
    if let Some(reads) = &snapshot.reads_file {
        println!("reads_file: {}", reads);
    }
    if let Some(ts) = &snapshot.build_timestamp {
        println!("built: {}", ts);
    }
    println!("k: {}  w: {}  first_read_id: {}", k, w, snapshot.first_read_id);

    let stream = Stream::new();
    let cache = HostIndexCache::from_snapshot(snapshot, &stream)?;
    let index = cache.copy_index_to_device(DefaultDeviceAllocator::unbounded().into_shared(), &stream);
    index.wait_to_be_ready()?;
    println!("{}", index.stats());

    let first = index.first_occurrence_of_representations();
    let mut groups: Vec<(usize, usize)> = first.windows(2).enumerate().map(|(i, f)| ((f[1] - f[0]) as usize, i)).collect();
    groups.sort_unstable_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for &(count, i) in groups.iter().take(top) {
        let representation = index.unique_representations()[i];
        let element = index.sketch_element(first[i] as usize);
        // 只有未哈希的 2-bit 编码能还原为碱基
        let kmer = if raw_encoding { dna::decode_kmer(representation, k) } else { "-".to_string() };
        println!(
            "{:>20}  {:>8}  first at read {} pos {}  {}",
            representation, count, element.read_id, element.position_in_read, kmer
        );
    }
    Ok(())
}
