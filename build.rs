//! Build script rendering man pages for `scaleway-provider`, the one-shot
//! action runner for Scaleway managed databases.
//!
//! Besides `scaleway-provider.1`, every action (`snapshot-now`,
//! `export-backup`, `renew-certificate`, ...) gets its own
//! `scaleway-provider-<action>.1` page in the build output directory, so
//! packaging can install the full set with the binary.

use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli/mod.rs"]
mod cli;

use cli::Cli;

const BINARY: &str = "scaleway-provider";

fn render(page: &Man, target: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut buffer = Vec::new();
    page.render(&mut buffer)?;
    fs::write(target, buffer)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = std::io::stdout();
    writeln!(stdout, "cargo:rerun-if-changed=build.rs")?;
    writeln!(stdout, "cargo:rerun-if-changed=src/cli/mod.rs")?;

    let out_dir =
        PathBuf::from(env::var_os("OUT_DIR").ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "OUT_DIR was not set")
        })?);

    let command = Cli::command();
    for action in command.get_subcommands() {
        let page = format!("{BINARY}-{}", action.get_name());
        let target = out_dir.join(format!("{page}.1"));
        render(&Man::new(action.clone()).title(page), &target)?;
    }
    render(&Man::new(command), &out_dir.join(format!("{BINARY}.1")))?;

    Ok(())
}
