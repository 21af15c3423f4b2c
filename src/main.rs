fn main() {
    #[cfg(feature = "cli")]
    fibdelta::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("fibdelta: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
