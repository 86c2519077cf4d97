//! Terminal output for the vocp CLI

use console::style;
use vocp_engine::CopyError;
use vocp_types::CopyResult;

/// Print the counters of a finished run
pub fn print_copy_stats(result: &CopyResult) {
    let stats = &result.stats;
    eprintln!();
    eprintln!("{}", style("Copy Statistics:").bold().underlined());
    eprintln!("  Files copied: {}", style(stats.files_copied).green());
    eprintln!(
        "  Directories created: {}",
        style(stats.directories_created).green()
    );
    eprintln!("  Files skipped: {}", style(stats.files_skipped).yellow());
    eprintln!(
        "  Symbolic links skipped: {}",
        style(stats.symlinks_skipped).yellow()
    );
    eprintln!("  Retries: {}", style(stats.retries).blue());
    eprintln!(
        "  Exit status: {}",
        if result.is_clean() {
            style(result.exit_code).green()
        } else {
            style(result.exit_code).red()
        }
    );
}

/// Print a fatal error and its remediation hint, if any
pub fn print_copy_error(error: &CopyError) {
    eprintln!("{} {}", style("Error:").red().bold(), error);
    if let Some(hint) = error.remediation() {
        eprintln!("{}", style(hint).yellow());
    }
}
