//! Version display.

use crate::cli::args::{OutputFormat, VersionArgs};

/// Prints the package name and version.
pub fn run(args: &VersionArgs) {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");

    match args.format {
        OutputFormat::Human => println!("{name} {version}"),
        OutputFormat::Json => println!(r#"{{"name":"{name}","version":"{version}"}}"#),
    }
}
