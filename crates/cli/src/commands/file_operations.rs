//! Commands that work on dump and key files without a tag

use std::path::Path;

use colored::Colorize;
use eyre::bail;
use tagkit_core::dump::{DiffResult, Dump, SectorDiff, check_dump, diff};
use tagkit_core::keyfile::{check_key_file, parse_key_file};

use crate::utils::read_text;

/// Validate a dump file
pub fn check_dump_command(file: &Path, strict: bool) -> eyre::Result<()> {
    let text = read_text(file)?;
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();

    let check = check_dump(&lines, !strict);
    if !check.is_valid() {
        bail!("{}: {} (code {})", file.display(), check, check.code());
    }

    let dump = Dump::parse(&text)?;
    println!(
        "{}: {} ({} sectors, {} without keys)",
        file.display(),
        "valid".green(),
        dump.len(),
        dump.unreadable().count()
    );
    Ok(())
}

/// Validate a key file
pub fn check_keys_command(file: &Path) -> eyre::Result<()> {
    let text = read_text(file)?;

    let check = check_key_file(&text);
    if !check.is_valid() {
        bail!("{}: {} (code {})", file.display(), check, check.code());
    }

    println!(
        "{}: {} ({} keys)",
        file.display(),
        "valid".green(),
        parse_key_file(&text).len()
    );
    Ok(())
}

/// Render the differences between two dumps
pub fn render_diff(first: &Dump, second: &Dump, result: &DiffResult) -> Vec<String> {
    let mut lines = Vec::new();

    for (index, sector) in result.iter() {
        let blocks = match sector {
            SectorDiff::OnlyInFirst => {
                lines.push(format!("Sector {index}: {}", "only in first dump".yellow()));
                continue;
            }
            SectorDiff::OnlyInSecond => {
                lines.push(format!("Sector {index}: {}", "only in second dump".yellow()));
                continue;
            }
            SectorDiff::Blocks(blocks) => blocks,
        };
        if sector.is_identical() {
            lines.push(format!("Sector {index}: {}", "identical".green()));
            continue;
        }

        lines.push(format!("Sector {index}:"));
        let (Some(a), Some(b)) = (first.get(index), second.get(index)) else {
            continue;
        };
        for (block, offsets) in blocks.iter().enumerate() {
            if offsets.is_empty() {
                continue;
            }
            let marker: String = (0..a[block].to_string().len())
                .map(|i| if offsets.contains(&i) { '^' } else { ' ' })
                .collect();
            lines.push(format!("  Block {block}: {}", a[block]));
            lines.push(format!("           {}", b[block]));
            lines.push(format!("           {}", marker.red()));
        }
    }
    lines
}

/// Compare two dump files
pub fn diff_command(first: &Path, second: &Path) -> eyre::Result<()> {
    let a = Dump::parse(&read_text(first)?)?;
    let b = Dump::parse(&read_text(second)?)?;

    let result = diff(&a, &b);
    for line in render_diff(&a, &b, &result) {
        println!("{line}");
    }
    if result.is_identical() {
        println!("{}", "Dumps are identical".green());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIRST: &str = "\
+Sector: 0
11223344440804006263646566676869
00000000000000000000000000000000
00000000000000000000000000000000
FFFFFFFFFFFFFF078069FFFFFFFFFFFF
+Sector: 1
00000000000000000000000000000000
00000000000000000000000000000000
00000000000000000000000000000000
FFFFFFFFFFFFFF078069FFFFFFFFFFFF
";

    #[test]
    fn test_render_diff() {
        colored::control::set_override(false);
        let first = Dump::parse(FIRST).unwrap();
        let second = Dump::parse(
            &FIRST
                .replace("+Sector: 1\n00000000", "+Sector: 2\n00000000")
                .replacen("00000000000000000000000000000000", "00000000000000000000000000000A00", 1),
        )
        .unwrap();

        let lines = render_diff(&first, &second, &diff(&first, &second));
        assert_eq!(
            lines,
            [
                "Sector 0:",
                "  Block 1: 00000000000000000000000000000000",
                "           00000000000000000000000000000A00",
                "                                        ^  ",
                "Sector 1: only in first dump",
                "Sector 2: only in second dump",
            ]
        );
    }
}
