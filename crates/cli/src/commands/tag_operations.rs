//! Commands that talk to a tag

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use colored::Colorize;
use eyre::{OptionExt, bail};
use tagkit_core::keyfile;
use tagkit_core::{Key, KeyMap, KeyRole, NO_KEY, ValueBlock, geometry};
use tagkit_probe::{SectorWritability, ValueOp, Writer, analyze_writability, read_all};
use tracing::info;

use super::ValueAction;
use crate::config::Config;
use crate::utils::session::{PcscTag, map_keys};
use crate::utils::{KeyArgs, ProbeArgs};

/// Key files from the command line, or else from the config
fn key_files<'a>(args: &'a ProbeArgs, config: &'a Config) -> &'a [PathBuf] {
    if args.key_files.is_empty() {
        &config.key_files
    } else {
        &args.key_files
    }
}

fn show_key(key: Option<Key>) -> String {
    key.map_or_else(|| NO_KEY.dimmed().to_string(), |key| key.to_hex().green().to_string())
}

/// Render a key map, one line per sector in range
pub fn render_key_map(key_map: &KeyMap, (first, last): (usize, usize)) -> Vec<String> {
    (first..=last)
        .map(|sector| match key_map.get(sector) {
            Some(keys) => format!(
                "Sector {sector:>2}: A {}  B {}",
                show_key(keys.a),
                show_key(keys.b)
            ),
            None => format!("Sector {sector:>2}: {}", "no keys found".red()),
        })
        .collect()
}

/// Probe the tag for keys and print the key map
pub fn map_keys_command(tag: &mut PcscTag, config: &Config, args: &ProbeArgs) -> eyre::Result<()> {
    let (key_map, range) = map_keys(tag, config.probe, key_files(args, config), args.sectors)?;

    for line in render_key_map(&key_map, range) {
        println!("{line}");
    }
    println!("Found keys for {} of {} sectors", key_map.len(), range.1 - range.0 + 1);
    Ok(())
}

/// Map keys, read the tag and write the dump
pub fn dump_command(
    tag: &mut PcscTag,
    config: &Config,
    args: &ProbeArgs,
    output: Option<&Path>,
    save_keys: Option<&Path>,
) -> eyre::Result<()> {
    let (key_map, (first, last)) =
        map_keys(tag, config.probe, key_files(args, config), args.sectors)?;
    if key_map.is_empty() {
        bail!("No keys found, nothing to read");
    }

    let mut dump = read_all(tag, &key_map)?;
    for sector in first..=last {
        if !key_map.contains(sector) {
            dump.mark_unreadable(sector);
        }
    }

    let text = dump.to_text();
    match output {
        Some(path) => {
            std::fs::write(path, &text)?;
            info!("Dump saved to {}", path.display());
        }
        None => print!("{text}"),
    }

    if let Some(path) = save_keys {
        let mut keys = key_map.keys();
        for key in dump.keys() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        std::fs::write(path, keyfile::to_text(&keys))?;
        println!("{} keys saved to {}", keys.len(), path.display());
    }
    Ok(())
}

/// Map keys, then report which key can write each block
pub fn writable_command(tag: &mut PcscTag, config: &Config, args: &ProbeArgs) -> eyre::Result<()> {
    let (key_map, (first, last)) =
        map_keys(tag, config.probe, key_files(args, config), args.sectors)?;

    let targets: BTreeMap<usize, Vec<usize>> = (first..=last)
        .map(|sector| (sector, (0..geometry::block_count(sector)).collect()))
        .collect();
    let result = analyze_writability(tag, &key_map, &targets)?;

    for sector in first..=last {
        match result.get(&sector) {
            None => println!("Sector {sector:>2}: {}", "no keys found".red()),
            Some(SectorWritability::Dead) => println!("Sector {sector:>2}: {}", "dead".red()),
            Some(SectorWritability::Blocks(blocks)) => {
                println!("Sector {sector:>2}:");
                for (block, access) in blocks {
                    println!("  Block {block:>2}: {access}");
                }
            }
        }
    }
    Ok(())
}

/// Write one block
pub fn write_command(
    tag: &PcscTag,
    sector: usize,
    block: usize,
    data: &[u8; 16],
    key: &KeyArgs,
    allow_manufacturer_block: bool,
) -> eyre::Result<()> {
    Writer::new(tag)
        .allow_manufacturer_block(allow_manufacturer_block)
        .write_block(sector, block, data, &key.key, key.role.into())?;
    println!("{}", "Block written".green());
    Ok(())
}

fn read_value(
    tag: &PcscTag,
    sector: usize,
    block: usize,
    key: &Key,
    role: KeyRole,
) -> eyre::Result<ValueBlock> {
    if sector >= tag.sector_count()? || block >= tag.block_count_in_sector(sector)? {
        bail!("No block {block} in sector {sector}");
    }
    if !tag.authenticate(sector, key, role)? {
        bail!("Key {key} was rejected for sector {sector}");
    }
    let data = tag.read_block(tag.sector_to_block(sector)? + block)?;
    ValueBlock::from_bytes(&data).ok_or_eyre("Block is not a value block")
}

/// Read, increment or decrement a value block
pub fn value_command(
    tag: &PcscTag,
    action: ValueAction,
    sector: usize,
    block: usize,
    delta: u32,
    key: &KeyArgs,
) -> eyre::Result<()> {
    let role = key.role.into();
    let op = match action {
        ValueAction::Read => None,
        ValueAction::Increment => Some(ValueOp::Increment),
        ValueAction::Decrement => Some(ValueOp::Decrement),
    };
    if let Some(op) = op {
        Writer::new(tag).write_value_block(sector, block, op, delta, &key.key, role)?;
    }

    let value = read_value(tag, sector, block, &key.key, role)?;
    println!("Value: {} (address {:#04X})", value.value, value.addr);
    Ok(())
}
