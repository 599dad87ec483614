use colored::Colorize;
use tagkit_pcsc::PcscDeviceManager;

/// List all available readers
pub fn list_readers(manager: &PcscDeviceManager) -> eyre::Result<()> {
    let readers = manager.list_readers()?;

    println!("Available readers:");
    for (i, reader) in readers.iter().enumerate() {
        let status = match (reader.has_card(), reader.tag_size()) {
            (true, Some(size)) => format!("{size}, {} sectors", size.sector_count()).green(),
            (true, None) => "card present".yellow(),
            (false, _) => "no card".dimmed(),
        };
        println!("{}. {} ({})", i + 1, reader.name(), status);
    }

    Ok(())
}
