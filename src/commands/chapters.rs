use crate::assembler::OUTPUT_EXTENSION;
use crate::chapters::load_chapter_table;
use anyhow::Result;
use std::path::Path;

pub fn run<P: AsRef<Path>>(path: P) -> Result<()> {
    let table = load_chapter_table(&path)?;

    if table.chapters.is_empty() {
        println!("No chapters found.");
    }

    for spec in &table.chapters {
        match spec.validate() {
            Ok(range) => println!(
                "{} (p. {}-{}) -> {}",
                spec.label(),
                range.start,
                range.end,
                spec.file_name(OUTPUT_EXTENSION)
            ),
            Err(e) => println!("{} -> invalid: {}", spec.label(), e),
        }
    }

    for skipped in &table.skipped {
        println!("skipped {}", skipped);
    }

    println!(
        "\n{} chapter(s), {} line(s) skipped.",
        table.chapters.len(),
        table.skipped.len()
    );

    Ok(())
}
