/// Example: index a directory of text files and search it
///
/// Usage: cargo run --example file_search [DOCS_DIR [INDEX_DIR [QUERY]]]
///
/// Without arguments a few sample files are written to a scratch directory
/// under the system temp dir and searched for "fox".

use std::fs;
use std::path::PathBuf;
use siftdex::core::types::{FILENAME_FIELD, FILEPATH_FIELD};
use siftdex::{Config, SearchEngine, Snippet};

const MAX_RESULTS: usize = 5;

const SAMPLES: &[(&str, &str)] = &[
    ("fox.txt", "The quick brown fox jumps over the lazy dog."),
    ("foxes.txt", "Foxes are small omnivores. A fox hunts at night."),
    ("river.txt", "The river runs past the old mill and into the sea."),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let scratch = std::env::temp_dir().join(format!("siftdex-demo-{}", std::process::id()));

    // 1. Pick the documents to index, writing samples when none were given
    let docs_dir = match args.next() {
        Some(dir) => PathBuf::from(dir),
        None => {
            let dir = scratch.join("docs");
            fs::create_dir_all(&dir)?;
            for (name, content) in SAMPLES {
                fs::write(dir.join(name), content)?;
            }
            dir
        }
    };
    let index_dir = args.next().map(PathBuf::from).unwrap_or_else(|| scratch.join("index"));
    let query = args.next().unwrap_or_else(|| "fox".to_string());

    // 2. Index every .txt file and make it visible
    let engine = SearchEngine::open(Config::new(&index_dir))?;
    let summary = engine.index_directory(&docs_dir, None)?;
    for failure in &summary.failed {
        println!("skipped {}: {}", failure.path.display(), failure.error);
    }
    let info = engine.commit()?;
    println!(
        "indexed {} files from {} (generation {})",
        summary.succeeded.len(),
        docs_dir.display(),
        info.generation
    );

    // 3. Search and print what was found
    let results = engine.search(&query, MAX_RESULTS)?;
    println!("\n{} hits for {:?}", results.total_hits, query);
    for hit in &results.hits {
        println!("filename: {}", hit.field(FILENAME_FIELD).unwrap_or("?"));
        println!("filepath: {}", hit.field(FILEPATH_FIELD).unwrap_or("?"));
        match &hit.snippet {
            Snippet::Text(text) => println!("snippet:  ...{}...", text),
            Snippet::NoLiteralMatch => println!("snippet:  {:?} not found in content", query),
            Snippet::MissingField => println!("snippet:  (no content stored)"),
        }
        println!();
    }

    engine.close()?;
    if index_dir.starts_with(&scratch) {
        fs::remove_dir_all(&scratch)?;
    }
    Ok(())
}
