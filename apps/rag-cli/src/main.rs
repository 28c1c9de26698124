use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use rag_core::config::{expand_path, Config};
use rag_core::loader::load_directory;
use rag_hybrid::{format_context, HybridEngine};

struct Args {
    data_dir: Option<PathBuf>,
    k: Option<usize>,
    show_context: bool,
    queries: Vec<String>,
}

fn usage(prog: &str) -> ! {
    eprintln!("Usage: {prog} [--k N] [--context] <data_dir> [query...]");
    eprintln!("Without queries, one query is read per line from stdin.");
    std::process::exit(1)
}

fn parse_args() -> Args {
    let mut raw: Vec<String> = env::args().collect();
    let prog = raw.remove(0);
    let mut args = Args { data_dir: None, k: None, show_context: false, queries: Vec::new() };
    let mut i = 0;
    while i < raw.len() {
        match raw[i].as_str() {
            "--help" | "-h" => usage(&prog),
            "--context" | "-c" => args.show_context = true,
            "--k" | "-k" => {
                match raw.get(i + 1).and_then(|v| v.parse::<usize>().ok()) {
                    Some(k) if k > 0 => args.k = Some(k),
                    _ => {
                        eprintln!("Error: --k requires a positive number");
                        std::process::exit(1);
                    }
                }
                i += 1;
            }
            other if other.starts_with('-') => {
                eprintln!("Error: unknown flag {other}");
                usage(&prog);
            }
            other if args.data_dir.is_none() => args.data_dir = Some(expand_path(other)),
            other => args.queries.push(other.to_string()),
        }
        i += 1;
    }
    args
}

async fn answer(engine: &HybridEngine, query: &str, k: usize, show_context: bool) -> anyhow::Result<()> {
    let results = engine.retrieve(query, k).await?;
    println!("\n🔍 {query}");
    if results.is_empty() {
        println!("   (no results)");
        return Ok(());
    }
    for (rank, hit) in results.iter().enumerate() {
        let preview: String = hit.text().chars().take(120).collect::<String>().replace('\n', " ");
        println!("{:>2}. [{:.4}] {} #{}  {}", rank + 1, hit.score, hit.chunk.source_id, hit.chunk.chunk_index, preview);
    }
    if show_context {
        println!("\n--- context ---\n{}\n---------------", format_context(&results));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let args = parse_args();
    let settings = config.settings()?;
    let data_dir = match args.data_dir {
        Some(dir) => dir,
        None => expand_path(config.get::<String>("data.raw_txt_dir").unwrap_or_else(|_| "./data/txt".to_string())),
    };
    let k = args.k.unwrap_or(settings.retrieval.default_k);

    let engine = HybridEngine::from_settings(settings).await?;

    let documents = load_directory(&data_dir)?;
    println!("Ingesting {} documents from {}", documents.len(), data_dir.display());
    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} docs ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );
    let mut chunks = 0usize;
    let mut degraded = 0usize;
    for document in &documents {
        pb.set_message(document.source_id.clone());
        let report = engine.ingest_document(document).await?;
        chunks += report.chunks_added;
        if report.degraded {
            degraded += 1;
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");
    println!(
        "📊 {} chunks ingested (lexical corpus {}, vector store {})",
        chunks,
        engine.corpus_len(),
        engine.vector_count().await?
    );
    if degraded > 0 {
        warn!(documents = degraded, "lexical index degraded; those documents are served by vector search only");
    }

    if !args.queries.is_empty() {
        for query in &args.queries {
            answer(&engine, query, k, args.show_context).await?;
        }
        return Ok(());
    }

    let stdin = io::stdin();
    print!("> ");
    io::stdout().flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        let query = line.trim();
        if !query.is_empty() {
            if let Err(e) = answer(&engine, query, k, args.show_context).await {
                eprintln!("Error: {e}");
            }
        }
        print!("> ");
        io::stdout().flush()?;
    }
    Ok(())
}
