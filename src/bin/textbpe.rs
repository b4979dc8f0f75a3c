use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::ThreadPoolBuilder;
use serde_json::json;
use textbpe::bytes::printable;
use textbpe::config::{IngestConfig, TrainerConfig};
use textbpe::corpus::load_text_corpus;
use textbpe::{TokenId, Tokenizer, Trainer};

const DEFAULT_OUTPUT: &str = "vocab.json";

#[derive(Parser, Debug)]
#[command(author, version, about = "Byte-level BPE toolkit for UTF-8 text", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train a new vocabulary from text files
    Train(TrainArgs),
    /// Encode text with a trained vocabulary
    Encode(EncodeArgs),
    /// Decode token ids back into text
    Decode(DecodeArgs),
    /// Inspect vocabulary metadata
    Info(InfoArgs),
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Files or directories to ingest; each file is one training text
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output path for the vocabulary JSON
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Target vocabulary size (including the 256 byte tokens)
    #[arg(long, value_name = "SIZE")]
    vocab_size: Option<usize>,

    /// Minimum frequency for merges
    #[arg(long, value_name = "COUNT")]
    min_frequency: Option<usize>,

    /// Maximum merge iterations
    #[arg(long, value_name = "COUNT")]
    max_merge_iterations: Option<usize>,

    /// Register a special token after training (repeat flag)
    #[arg(long = "special-token", value_name = "TOKEN")]
    special_tokens: Vec<String>,

    /// Disable the merge progress bar
    #[arg(long)]
    no_progress: bool,

    /// Emit pretty JSON
    #[arg(long)]
    pretty: bool,

    /// Limit Rayon worker threads
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Disable recursive directory traversal
    #[arg(long)]
    no_recursive: bool,

    /// Follow symlinks during traversal
    #[arg(long)]
    follow_symlinks: bool,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Vocabulary JSON to load
    #[arg(short = 'm', long, value_name = "PATH")]
    vocab: PathBuf,

    /// Text to encode when --input is omitted
    #[arg(value_name = "TEXT", required_unless_present = "input")]
    text: Option<String>,

    /// Read the text to encode from a file
    #[arg(long, value_name = "PATH", conflicts_with = "text")]
    input: Option<PathBuf>,

    /// Emit a JSON record instead of whitespace separated ids
    #[arg(long)]
    json: bool,

    /// Also print the token bytes next to each id
    #[arg(long)]
    show_tokens: bool,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Vocabulary JSON to load
    #[arg(short = 'm', long, value_name = "PATH")]
    vocab: PathBuf,

    /// Path to whitespace separated token ids
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Token ids to decode when --input is omitted
    #[arg(value_name = "ID", required_unless_present = "input")]
    tokens: Vec<TokenId>,

    /// Skip special tokens while decoding
    #[arg(long)]
    skip_special_tokens: bool,

    /// Output file for decoded text (defaults to stdout)
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Vocabulary JSON to inspect
    #[arg(short = 'm', long, value_name = "PATH")]
    vocab: PathBuf,

    /// Emit machine-readable JSON summary
    #[arg(long)]
    json: bool,

    /// List every byte token with its id
    #[arg(long = "list")]
    list_vocab: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Train(args) => run_train(args),
        Commands::Encode(args) => run_encode(args),
        Commands::Decode(args) => run_decode(args),
        Commands::Info(args) => run_info(args),
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    use log::LevelFilter;

    let level = if quiet > 0 {
        match quiet {
            1 => LevelFilter::Warn,
            _ => LevelFilter::Error,
        }
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    builder.filter_level(level);
    let _ = builder.try_init();
}

fn run_train(args: TrainArgs) -> Result<()> {
    if let Some(threads) = args.threads {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("unable to configure Rayon thread pool")?;
    }

    let mut cfg = TrainerConfig::builder();
    if let Some(vocab_size) = args.vocab_size {
        cfg = cfg.target_vocab_size(vocab_size);
    }
    if let Some(min_frequency) = args.min_frequency {
        cfg = cfg.min_frequency(min_frequency);
    }
    if !args.special_tokens.is_empty() {
        cfg = cfg.special_tokens(args.special_tokens.clone());
    }
    cfg = cfg.max_merge_iterations(args.max_merge_iterations);
    // The progress bar replaces per-iteration log lines.
    cfg = cfg.show_progress(false);
    let trainer_cfg = cfg.build()?;

    let ingest_cfg = IngestConfig::builder()
        .recursive(!args.no_recursive)
        .follow_symlinks(args.follow_symlinks)
        .build();

    let texts = load_text_corpus(&args.inputs, &ingest_cfg)
        .with_context(|| "failed to load text corpus")?;
    let corpus_bytes: usize = texts.iter().map(String::len).sum();
    info!("loaded {} texts totalling {corpus_bytes} bytes", texts.len());

    let trainer = Trainer::new(trainer_cfg);
    let start = Instant::now();
    let artifacts = if args.no_progress {
        trainer.train(&texts)?
    } else {
        let merges = trainer.config().target_vocab_size.saturating_sub(256);
        let pb = ProgressBar::new(merges as u64);
        let style = ProgressStyle::with_template("{bar:40} {pos}/{len} merges {elapsed}")
            .context("invalid progress template")?;
        pb.set_style(style);
        let mut observer = |done: usize, target: usize| {
            pb.set_length(target as u64);
            pb.set_position(done as u64);
        };
        let artifacts = trainer.train_with_observer(&texts, &mut observer)?;
        pb.finish_with_message("training complete");
        artifacts
    };
    drop(texts);

    let elapsed = start.elapsed();
    let learned = artifacts.metrics.learned();
    let stop_reason = artifacts.metrics.stop_reason;
    let tokenizer = artifacts.into_tokenizer()?;
    tokenizer
        .save(&args.output, args.pretty)
        .with_context(|| format!("failed to save vocabulary to {}", args.output.display()))?;

    info!(
        "training complete: merges={learned} vocab={} duration={elapsed:.2?} stop={stop_reason:?}",
        tokenizer.vocab_size()
    );
    println!(
        "wrote vocabulary with {} ids ({} merges) to {}",
        tokenizer.vocab_size(),
        learned,
        args.output.display()
    );

    Ok(())
}

fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
    Tokenizer::load(path)
        .with_context(|| format!("failed to load vocabulary from {}", path.display()))
}

fn run_encode(args: EncodeArgs) -> Result<()> {
    let tokenizer = load_tokenizer(&args.vocab)?;
    let text = match (&args.input, args.text) {
        (Some(path), _) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, Some(text)) => text,
        (None, None) => bail!("either TEXT or --input is required"),
    };

    let encoding = tokenizer.encode(&text);
    if args.json {
        let tokens: Vec<String> = encoding.tokens().iter().map(|t| printable(t)).collect();
        let record = json!({
            "ids": encoding.ids(),
            "tokens": tokens,
        });
        println!("{}", serde_json::to_string(&record)?);
    } else if args.show_tokens {
        for (id, token) in encoding.ids().iter().zip(encoding.tokens()) {
            println!("{id}\t{}", printable(token));
        }
    } else {
        let line = encoding
            .ids()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        println!("{line}");
    }

    Ok(())
}

fn run_decode(args: DecodeArgs) -> Result<()> {
    let tokenizer = load_tokenizer(&args.vocab)?;

    let tokens = if let Some(input_path) = &args.input {
        let contents = fs::read_to_string(input_path)
            .with_context(|| format!("failed to read {}", input_path.display()))?;
        parse_token_list(&contents)?
    } else {
        args.tokens
    };

    let text = if args.skip_special_tokens {
        String::from_utf8(tokenizer.decode_to_bytes(&tokens, true)?)
            .context("decoded bytes are not valid UTF-8")?
    } else {
        tokenizer.decode(&tokens)?
    };

    if let Some(path) = &args.output {
        let mut file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        file.write_all(text.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("wrote {} bytes to {}", text.len(), path.display());
    } else {
        io::stdout().write_all(text.as_bytes())?;
    }

    Ok(())
}

fn run_info(args: InfoArgs) -> Result<()> {
    let tokenizer = load_tokenizer(&args.vocab)?;
    let vocab = tokenizer.vocab();
    let special_tokens: Vec<(&str, TokenId)> = vocab.special_tokens().collect();

    if args.json {
        let mut summary = json!({
            "path": args.vocab.display().to_string(),
            "vocab_size": vocab.size(),
            "byte_tokens": vocab.byte_token_count(),
            "merges": vocab.byte_token_count().saturating_sub(256),
            "special_tokens": special_tokens
                .iter()
                .map(|(token, id)| json!({"content": token, "id": id}))
                .collect::<Vec<_>>(),
        });
        if args.list_vocab {
            summary["vocab"] = vocab
                .byte_tokens()
                .map(|(bytes, id)| json!({"token": printable(bytes), "id": id}))
                .collect();
        }
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Vocab size    : {}", vocab.size());
    println!("Byte tokens   : {}", vocab.byte_token_count());
    println!("Merges        : {}", vocab.byte_token_count().saturating_sub(256));
    if special_tokens.is_empty() {
        println!("Special tokens: (none)");
    } else {
        let listed = special_tokens
            .iter()
            .map(|(token, id)| format!("{token}={id}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("Special tokens: {listed}");
    }
    if args.list_vocab {
        for (bytes, id) in vocab.byte_tokens() {
            println!("{id}\t{}", printable(bytes));
        }
    }

    Ok(())
}

fn parse_token_list(contents: &str) -> Result<Vec<TokenId>> {
    contents
        .split_whitespace()
        .map(|part| {
            part.parse::<TokenId>()
                .with_context(|| format!("invalid token id {part:?}"))
        })
        .collect()
}
