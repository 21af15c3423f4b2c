// Command-line interface for fibdelta.
//
// Subcommands: compress (text -> binary), decompress (binary -> text),
// inspect (per-unit dump) and config.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::codec::decoder;
use crate::codec::table::{DEFAULT_TABLE_LEN, MAX_TABLE_LEN, MIN_TABLE_LEN, ReferenceTable};
use crate::engine::{Engine, EngineOptions};
use crate::io::{compress_stream, decompress_stream};

const BUF_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Fibonacci delta integer compressor.
#[derive(Parser, Debug)]
#[command(
    name = "fibdelta",
    version,
    about = "Fibonacci delta integer compressor",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Compress whitespace-separated integers into the binary format.
    Compress(StreamArgs),
    /// Decompress the binary format into space-separated integers.
    Decompress(StreamArgs),
    /// Print every encoded unit of a compressed file.
    Inspect(InspectArgs),
    /// Print build/configuration details.
    Config(TableArgs),
}

#[derive(Args, Debug)]
struct TableArgs {
    /// Number of Fibonacci references; must match on both sides.
    #[arg(
        long = "table-len",
        short = 't',
        value_parser = clap::value_parser!(u64).range(MIN_TABLE_LEN as u64..=MAX_TABLE_LEN as u64),
        default_value_t = DEFAULT_TABLE_LEN as u64
    )]
    table_len: u64,
}

#[derive(Args, Debug)]
struct StreamArgs {
    /// Input file (default: stdin).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "input_pos")]
    input: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "output_pos")]
    output: Option<PathBuf>,

    /// Write output to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    #[command(flatten)]
    table: TableArgs,

    /// Input file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    input_pos: Option<PathBuf>,

    /// Output file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    output_pos: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Compressed input file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    #[command(flatten)]
    table: TableArgs,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Compress,
    Decompress,
    Inspect,
    Config,
}

#[derive(Debug)]
struct Options {
    command: Command,
    use_stdout: bool,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    table_len: usize,
    input_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
}

fn resolve_options(cli: Cli) -> Options {
    let mut opts = Options {
        command: Command::Config,
        use_stdout: false,
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        json_output: cli.json_output,
        table_len: DEFAULT_TABLE_LEN,
        input_file: None,
        output_file: None,
    };

    match cli.command {
        Cmd::Compress(args) => {
            opts.command = Command::Compress;
            apply_stream_args(&mut opts, args);
        }
        Cmd::Decompress(args) => {
            opts.command = Command::Decompress;
            apply_stream_args(&mut opts, args);
        }
        Cmd::Inspect(args) => {
            opts.command = Command::Inspect;
            opts.table_len = args.table.table_len as usize;
            opts.input_file = Some(args.input);
        }
        Cmd::Config(args) => {
            opts.table_len = args.table_len as usize;
        }
    }
    opts
}

fn apply_stream_args(opts: &mut Options, args: StreamArgs) {
    opts.use_stdout = args.stdout;
    opts.table_len = args.table.table_len as usize;
    opts.input_file = args.input.or(args.input_pos);
    opts.output_file = args.output.or(args.output_pos);
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("fibdelta".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

fn log_level(opts: &Options) -> log::LevelFilter {
    if opts.quiet {
        return log::LevelFilter::Error;
    }
    match opts.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    }
}

fn build_engine(opts: &Options) -> Option<Engine> {
    match Engine::new(EngineOptions {
        table_len: opts.table_len,
    }) {
        Ok(engine) => Some(engine),
        Err(e) => {
            eprintln!("fibdelta: {e}");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Input/output plumbing
// ---------------------------------------------------------------------------

fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>, i32> {
    match path {
        Some(path) => match File::open(path) {
            Ok(f) => Ok(Box::new(BufReader::with_capacity(BUF_SIZE, f))),
            Err(e) => {
                eprintln!("fibdelta: input file: {}: {e}", path.display());
                Err(1)
            }
        },
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

fn open_output(opts: &Options) -> Result<Box<dyn Write>, i32> {
    match (opts.use_stdout, &opts.output_file) {
        (true, _) | (_, None) => Ok(Box::new(BufWriter::with_capacity(
            BUF_SIZE,
            io::stdout().lock(),
        ))),
        (false, Some(path)) => {
            if let Some(input) = &opts.input_file
                && same_file(input, path)
            {
                eprintln!(
                    "fibdelta: input and output are the same file: {}",
                    path.display()
                );
                return Err(1);
            }
            if path.exists() && !opts.force {
                eprintln!(
                    "fibdelta: output file exists, use -f to overwrite: {}",
                    path.display()
                );
                return Err(1);
            }
            match File::create(path) {
                Ok(f) => Ok(Box::new(SyncOnFlush(BufWriter::with_capacity(BUF_SIZE, f)))),
                Err(e) => {
                    eprintln!("fibdelta: output file: {}: {e}", path.display());
                    Err(1)
                }
            }
        }
    }
}

/// True when both paths exist and resolve to the same file.
fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// File writer that also syncs to disk when flushed.
struct SyncOnFlush(BufWriter<File>);

impl Write for SyncOnFlush {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()?;
        self.0.get_ref().sync_all()
    }
}

// ---------------------------------------------------------------------------
// Compress command
// ---------------------------------------------------------------------------

fn cmd_compress(opts: &Options) -> i32 {
    let Some(engine) = build_engine(opts) else {
        return 1;
    };
    let reader = match open_input(opts.input_file.as_deref()) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let writer = match open_output(opts) {
        Ok(w) => w,
        Err(code) => return code,
    };

    let stats = match compress_stream(&engine, reader, writer) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("fibdelta: compress error: {e}");
            return 1;
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "fibdelta: compress: values: {}, skipped tokens: {}, exact hits: {}, \
             clamped: {}, input size: {}, output size: {}",
            stats.values,
            stats.skipped_tokens,
            stats.exact_hits,
            stats.clamped,
            stats.input_bytes,
            stats.output_bytes
        );
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": "compress",
            "table_len": opts.table_len,
            "values": stats.values,
            "skipped_tokens": stats.skipped_tokens,
            "exact_hits": stats.exact_hits,
            "clamped": stats.clamped,
            "input_size": stats.input_bytes,
            "output_size": stats.output_bytes,
        });
        print_json(&json);
    }

    0
}

// ---------------------------------------------------------------------------
// Decompress command
// ---------------------------------------------------------------------------

fn cmd_decompress(opts: &Options) -> i32 {
    let Some(engine) = build_engine(opts) else {
        return 1;
    };
    let reader = match open_input(opts.input_file.as_deref()) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let writer = match open_output(opts) {
        Ok(w) => w,
        Err(code) => return code,
    };

    let stats = match decompress_stream(&engine, reader, writer) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("fibdelta: decompress error: {e}");
            return 1;
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "fibdelta: decompress: values: {}, input size: {}, output size: {}",
            stats.values, stats.input_bytes, stats.output_bytes
        );
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": "decompress",
            "table_len": opts.table_len,
            "values": stats.values,
            "input_size": stats.input_bytes,
            "output_size": stats.output_bytes,
        });
        print_json(&json);
    }

    0
}

// ---------------------------------------------------------------------------
// Inspect command
// ---------------------------------------------------------------------------

/// Reader wrapper tracking the byte position of the next unit.
struct Positioned<R: Read> {
    inner: R,
    pos: u64,
}

impl<R: Read> Read for Positioned<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }
}

fn dump_units<R: Read, W: Write>(
    src: &mut Positioned<R>,
    table: &ReferenceTable,
    out: &mut W,
    units: &mut u64,
) -> Result<(), String> {
    writeln!(
        out,
        "{:>10} {:>5} {:>20} {:>5} {:>20} {:>20}",
        "OFFSET", "INDEX", "REFERENCE", "OP", "DELTA", "VALUE"
    )
    .map_err(|e| e.to_string())?;

    loop {
        let start = src.pos;
        let unit = match decoder::read_unit(src, table) {
            Ok(Some(unit)) => unit,
            Ok(None) => return Ok(()),
            Err(e) => return Err(format!("unit {units} at byte {start}: {e}")),
        };
        let value = unit
            .resolve(table)
            .map_or_else(|| "<out of range>".to_string(), |v| v.to_string());
        writeln!(
            out,
            "{start:>10} {:>5} {:>20} {:>5} {:>20} {value:>20}",
            unit.index,
            table.as_slice()[unit.index],
            unit.op,
            unit.offset
        )
        .map_err(|e| e.to_string())?;
        *units += 1;
    }
}

fn cmd_inspect(opts: &Options) -> i32 {
    let Some(engine) = build_engine(opts) else {
        return 1;
    };
    let reader = match open_input(opts.input_file.as_deref()) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let mut src = Positioned {
        inner: reader,
        pos: 0,
    };
    let mut out = BufWriter::new(io::stdout().lock());
    let mut units = 0u64;
    let result = dump_units(&mut src, engine.table(), &mut out, &mut units);

    if let Err(e) = out.flush() {
        eprintln!("fibdelta: write flush error: {e}");
        return 1;
    }
    if let Err(e) = result {
        eprintln!("fibdelta: inspect error: {e}");
        return 1;
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": "inspect",
            "table_len": opts.table_len,
            "units": units,
            "input_size": src.pos,
        });
        print_json(&json);
    }

    0
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config(opts: &Options) -> i32 {
    let Some(engine) = build_engine(opts) else {
        return 1;
    };
    let version = env!("CARGO_PKG_VERSION");
    let parallel = cfg!(feature = "parallel") as u8;
    let table = engine.table();

    eprintln!("fibdelta version {version} (Rust)");
    eprintln!("PARALLEL={parallel}");
    eprintln!("DEFAULT_TABLE_LEN={DEFAULT_TABLE_LEN}");
    eprintln!("MIN_TABLE_LEN={MIN_TABLE_LEN}");
    eprintln!("MAX_TABLE_LEN={MAX_TABLE_LEN}");
    eprintln!("TABLE_LEN={}", table.len());
    eprintln!("LARGEST_REFERENCE={}", table.last());

    if opts.json_output {
        let json = serde_json::json!({
            "command": "config",
            "version": version,
            "parallel": parallel == 1,
            "table_len": table.len(),
            "largest_reference": table.last(),
        });
        print_json(&json);
    }

    0
}

fn print_json(json: &serde_json::Value) {
    match serde_json::to_string_pretty(json) {
        Ok(s) => eprintln!("{s}"),
        Err(e) => eprintln!("fibdelta: json error: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let mut opts = resolve_options(cli);

    env_logger::Builder::new()
        .filter_level(log_level(&opts))
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();

    // Warn if -c overrides output filename.
    if opts.use_stdout && !opts.quiet {
        if let Some(path) = opts.output_file.take() {
            eprintln!(
                "fibdelta: warning: -c option overrides output filename: {}",
                path.display()
            );
        }
    }

    let exit_code = match opts.command {
        Command::Compress => cmd_compress(&opts),
        Command::Decompress => cmd_decompress(&opts),
        Command::Inspect => cmd_inspect(&opts),
        Command::Config => cmd_config(&opts),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_opts(args: &[&str]) -> Options {
        let argv: Vec<String> = std::iter::once("fibdelta".to_string())
            .chain(args.iter().map(|s| s.to_string()))
            .collect();
        let cli = Cli::try_parse_from(argv).expect("cli parse failed");
        resolve_options(cli)
    }

    fn parse_err(args: &[&str]) -> bool {
        let argv: Vec<String> = std::iter::once("fibdelta".to_string())
            .chain(args.iter().map(|s| s.to_string()))
            .collect();
        Cli::try_parse_from(argv).is_err()
    }

    #[test]
    fn compress_subcommand_maps_correctly() {
        let opts = parse_opts(&["compress", "--table-len", "60", "data.txt", "data.bin"]);
        assert_eq!(opts.command, Command::Compress);
        assert_eq!(opts.table_len, 60);
        assert_eq!(opts.input_file, Some(PathBuf::from("data.txt")));
        assert_eq!(opts.output_file, Some(PathBuf::from("data.bin")));
        assert!(!opts.use_stdout);
    }

    #[test]
    fn decompress_subcommand_maps_correctly() {
        let opts = parse_opts(&[
            "--quiet",
            "decompress",
            "--input",
            "data.bin",
            "--output",
            "out.txt",
        ]);
        assert_eq!(opts.command, Command::Decompress);
        assert!(opts.quiet);
        assert_eq!(opts.table_len, DEFAULT_TABLE_LEN);
        assert_eq!(opts.input_file, Some(PathBuf::from("data.bin")));
        assert_eq!(opts.output_file, Some(PathBuf::from("out.txt")));
        assert_eq!(log_level(&opts), log::LevelFilter::Error);
    }

    #[test]
    fn global_stdio_and_force_flags() {
        let opts = parse_opts(&["--force", "compress", "--stdout", "in", "out"]);
        assert!(opts.use_stdout);
        assert!(opts.force);
    }

    #[test]
    fn defaults_to_stdio() {
        let opts = parse_opts(&["compress"]);
        assert!(opts.input_file.is_none());
        assert!(opts.output_file.is_none());
    }

    #[test]
    fn verbose_is_capped() {
        let opts = parse_opts(&["--verbose", "--verbose", "--verbose", "compress", "in", "out"]);
        assert_eq!(opts.verbose, 2);
        assert_eq!(log_level(&opts), log::LevelFilter::Debug);
    }

    #[test]
    fn table_len_is_range_checked() {
        assert!(parse_err(&["compress", "--table-len", "1", "in"]));
        assert!(parse_err(&["compress", "--table-len", "95", "in"]));
        assert_eq!(parse_opts(&["config", "-t", "94"]).table_len, 94);
    }

    #[test]
    fn inspect_and_config_map() {
        let opts = parse_opts(&["inspect", "data.bin"]);
        assert_eq!(opts.command, Command::Inspect);
        assert_eq!(opts.input_file, Some(PathBuf::from("data.bin")));
        assert_eq!(parse_opts(&["config"]).command, Command::Config);
        assert!(parse_opts(&["--json", "config"]).json_output);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(parse_err(&["-q", "-v", "config"]));
    }

    #[test]
    fn config_takes_table_len() {
        let opts = parse_opts(&["config", "--table-len", "12"]);
        assert_eq!(opts.command, Command::Config);
        assert_eq!(opts.table_len, 12);
        assert_eq!(parse_opts(&["config"]).table_len, DEFAULT_TABLE_LEN);
    }

    #[test]
    fn same_file_resolves_paths() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "1").unwrap();
        std::fs::write(&b, "1").unwrap();
        assert!(same_file(&a, &dir.path().join(".").join("a.txt")));
        assert!(!same_file(&a, &b));
        assert!(!same_file(&a, &dir.path().join("missing.txt")));
    }

    #[test]
    fn fuzz_parse_does_not_panic() {
        fuzz_try_parse_args(&["compress".to_string(), "--bogus".to_string()]);
        fuzz_try_parse_args(&[]);
    }
}
