//! IMG.LY Background Removal Gateway
//!
//! HTTP service removing image backgrounds with ordered fallback across a
//! local Tract model and remote inference APIs.

#[cfg(feature = "cli")]
use imgly_bgremove_gateway::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
