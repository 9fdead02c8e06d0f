//! White Background Erasure CLI Tool
//!
//! Command-line interface for the whitebg-erase library.

#[cfg(feature = "cli")]
use whitebg_erase::cli;

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    cli::main()
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
