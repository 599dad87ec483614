//! Commands for decoding and encoding access conditions

use colored::Colorize;
use eyre::OptionExt;
use tagkit_core::access::{self, AccessMatrix, Operation, Requirement};

/// Colorize a requirement for display
fn show(requirement: Requirement) -> String {
    let text = requirement.to_string();
    match requirement {
        Requirement::Never => text.red().to_string(),
        Requirement::Error => text.red().bold().to_string(),
        Requirement::KeyAOrB => text.green().to_string(),
        Requirement::KeyA | Requirement::KeyB => text.yellow().to_string(),
    }
}

/// Render the permission table of an access matrix
pub fn describe_matrix(matrix: &AccessMatrix) -> Vec<String> {
    let kbr = access::key_b_readable(matrix.trailer());
    let mut lines = Vec::new();

    for group in 0..access::codec::TRAILER_GROUP {
        let bits = matrix.group(group);
        let permissions: Vec<String> = Operation::DATA
            .iter()
            .map(|&op| format!("{op}: {}", show(access::requirement(bits, op, false, kbr))))
            .collect();
        lines.push(format!("Block {group} [{bits}]  {}", permissions.join(", ")));
    }

    let bits = matrix.trailer();
    let permissions: Vec<String> = Operation::TRAILER
        .iter()
        .map(|&op| format!("{op}: {}", show(access::requirement(bits, op, true, kbr))))
        .collect();
    lines.push(format!("Trailer [{bits}]  {}", permissions.join(", ")));

    if kbr {
        lines.push("Key B is readable and cannot be used for authentication".to_string());
    }
    lines
}

/// Decode trailer access bytes and print what each key may do
pub fn decode_ac_command(bytes: [u8; 3]) -> eyre::Result<()> {
    let matrix =
        access::decode(bytes).ok_or_eyre("Access bytes are corrupt: inverted copies differ")?;

    println!("Access bytes: {}", hex::encode_upper(bytes));
    for line in describe_matrix(&matrix) {
        println!("{line}");
    }
    Ok(())
}

/// Encode C1, C2 and C3 rows into trailer access bytes
pub fn encode_ac_command(c1: [u8; 4], c2: [u8; 4], c3: [u8; 4]) -> eyre::Result<()> {
    let matrix = AccessMatrix::new([c1, c2, c3])?;
    let bytes = access::encode(&matrix);

    println!("{}", hex::encode_upper(bytes));
    for line in describe_matrix(&matrix) {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_transport_configuration() {
        colored::control::set_override(false);
        let matrix = access::decode([0xFF, 0x07, 0x80]).unwrap();
        let lines = describe_matrix(&matrix);

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("Block 0 [000]"));
        assert!(lines[0].contains("Write: Key A"));
        assert!(lines[3].starts_with("Trailer [001]"));
        assert!(lines[3].contains("Read key A: Never"));
        assert_eq!(
            lines[4],
            "Key B is readable and cannot be used for authentication"
        );
    }

    #[test]
    fn test_describe_key_b_configuration() {
        colored::control::set_override(false);
        let matrix = access::decode([0x78, 0x77, 0x88]).unwrap();
        let lines = describe_matrix(&matrix);

        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("Read: Key A|B"));
        assert!(lines[0].contains("Write: Key B"));
        assert!(lines[3].contains("Write key A: Key B"));
    }
}
