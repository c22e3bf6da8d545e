//! Seen-ID Reset Script
//!
//! Clears the persisted seen-id set so the agent will consider every post
//! again on its next cycle. Asks for confirmation unless `--yes` is passed.

use liora::config::{data_dir, BoxError};
use liora::dedup::DuplicateTracker;
use liora::store::DataFiles;
use std::env;
use std::io::{self, Write};

fn main() -> Result<(), BoxError> {
    env_logger::init();

    let files = DataFiles::new(data_dir());
    let mut tracker = DuplicateTracker::load(files.seen_ids())?;
    println!(
        "📂 {} holds {} seen ids",
        files.seen_ids().display(),
        tracker.len()
    );

    let confirmed = env::args().any(|arg| arg == "--yes");
    if !confirmed {
        print!("⚠️  Reset all seen ids? Already-replied posts may be answered again [y/N]: ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !matches!(input.trim().to_lowercase().as_str(), "y" | "yes") {
            println!("❌ Aborted");
            return Ok(());
        }
    }

    tracker.reset()?;
    println!("✅ Seen ids cleared");
    Ok(())
}
