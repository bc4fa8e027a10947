mod console;

use anyhow::Result;
use newsun::EngineConfig;

fn main() -> Result<()> {
    // Initialize logging. Control verbosity with RUST_LOG env var:
    //   RUST_LOG=info   cargo run -- content     # scene changes + quest rules (default)
    //   RUST_LOG=debug  cargo run -- content     # + dialogue moves and dice rolls
    //   RUST_LOG=trace  cargo run -- content     # + keys dropped during text reveal
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        println!(
            "Usage: newsun [content-dir] [seed] [reveal_ms_per_char]\n\
             \n\
             Example:\n  newsun ./content 42 0\n\
             \n\
             Logging: set RUST_LOG=debug or RUST_LOG=trace for verbose output"
        );
        return Ok(());
    }

    let config = EngineConfig::from_args(&args)?;

    println!("Content : {}", config.content_dir.display());
    match config.seed {
        Some(seed) => println!("Seed    : {seed}"),
        None => println!("Seed    : random"),
    }

    console::run(config)
}
