fn main() {
    #[cfg(feature = "cli")]
    birch::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("birch: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
