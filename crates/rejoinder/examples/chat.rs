//! Interactive chat example.
//!
//! Loads a parameter bundle and answers one line at a time.
//!
//! Run with:
//! ```bash
//! cargo run -p rejoinder --example chat -- /path/to/bundle
//! ```
//!
//! Without an argument a tiny scripted bundle is written to the temp
//! directory and used instead; it answers `hello` to every known input.

use rejoinder::prelude::*;
use rejoinder::testing::write_scripted_bundle;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let bundle_dir = match std::env::args().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => {
            let dir = std::env::temp_dir().join("rejoinder-demo-bundle");
            write_scripted_bundle(&dir)?;
            println!("No bundle given, using scripted demo at {}", dir.display());
            dir
        }
    };

    println!("Chat Example");
    println!("============\n");

    let load_start = Instant::now();
    let bot = Chatbot::builder().bundle_dir(&bundle_dir).build()?;
    let config = bot.context().config();
    println!(
        "Loaded in {:.2}s: {} words, hidden {}, {} attention, max {} tokens",
        load_start.elapsed().as_secs_f64(),
        bot.context().vocab().size(),
        config.hidden_size,
        config.attention,
        bot.max_length()
    );

    println!("\nEnter messages (empty line to quit):\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        stdin.read_line(&mut line)?;
        let line = line.trim();
        if line.is_empty() {
            break;
        }

        let start = Instant::now();
        match bot.respond(line)? {
            Some(reply) => println!("bot: {reply}"),
            None => println!("(no reply)"),
        }
        println!("  [{:.1}ms]", start.elapsed().as_secs_f64() * 1000.0);
    }

    Ok(())
}
