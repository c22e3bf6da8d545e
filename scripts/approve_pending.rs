//! Pending Reply Review Script
//!
//! Lists and approves replies generated in preview mode. Approved replies are
//! posted by the agent at the start of its next cycle.
//!
//! ```bash
//! cargo run --bin approve_pending -- list
//! cargo run --bin approve_pending -- approve <post_id> [<post_id>...]
//! cargo run --bin approve_pending -- reject <post_id> [<post_id>...]
//! cargo run --bin approve_pending -- approve-all
//! ```

use liora::config::{data_dir, BoxError};
use liora::store::{DataFiles, PendingStatus, PendingStore};
use std::env;

fn print_usage() {
    println!("Usage: approve_pending <list | approve <id>... | reject <id>... | approve-all>");
}

/// Prints every entry still awaiting review.
fn list(store: &PendingStore) {
    let pending = store.with_status(PendingStatus::Pending);
    if pending.is_empty() {
        println!("✅ No replies awaiting review");
        return;
    }
    println!("📋 {} replies awaiting review:\n", pending.len());
    for entry in pending {
        println!("🆔 {} (priority {})", entry.item_id, entry.priority);
        println!("   📝 Post:  {}", entry.item_text.replace('\n', " "));
        println!("   💬 Reply: {}\n", entry.reply_text);
    }
}

fn set_all(store: &mut PendingStore, ids: &[String], status: PendingStatus) -> Result<(), BoxError> {
    if ids.is_empty() {
        print_usage();
        return Ok(());
    }
    for id in ids {
        if store.set_status(id, status)? {
            println!("✅ {} marked as {:?}", id, status);
        } else {
            println!("❌ No pending reply for {}", id);
        }
    }
    Ok(())
}

fn main() -> Result<(), BoxError> {
    env_logger::init();

    let files = DataFiles::new(data_dir());
    let mut store = PendingStore::load(files.pending())?;
    println!("📂 Using {}", files.pending().display());

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("list") | None => list(&store),
        Some("approve") => set_all(&mut store, &args[1..], PendingStatus::Approved)?,
        Some("reject") => set_all(&mut store, &args[1..], PendingStatus::Rejected)?,
        Some("approve-all") => {
            let ids: Vec<String> = store
                .with_status(PendingStatus::Pending)
                .into_iter()
                .map(|entry| entry.item_id)
                .collect();
            if ids.is_empty() {
                println!("✅ Nothing to approve");
            } else {
                set_all(&mut store, &ids, PendingStatus::Approved)?;
            }
        }
        Some(other) => {
            println!("❌ Unknown command '{}'", other);
            print_usage();
        }
    }

    Ok(())
}
