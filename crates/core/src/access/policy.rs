//! Access policy: which key a given operation requires
//!
//! The tables follow the MIFARE Classic data sheet. Trailer and data blocks
//! have separate tables; asking a trailer about a data operation (or the
//! reverse) yields [`Requirement::Error`].
//!
//! When key B is readable (trailer bits `000`, `010` or `001`) it cannot be
//! used for authentication, so data block permissions granted to "key A or B"
//! collapse to key A and those granted to key B alone become never.

use derive_more::Display;

use super::codec::AccessBits;

/// Operations governed by access conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Operation {
    /// Read a data block
    Read,
    /// Write a data block
    Write,
    /// Increment a value block
    Increment,
    /// Decrement, transfer or restore a value block
    #[display("Decrement/Transfer/Restore")]
    DecTransRest,
    /// Read key A from the trailer
    #[display("Read key A")]
    ReadKeyA,
    /// Read key B from the trailer
    #[display("Read key B")]
    ReadKeyB,
    /// Read the access bits from the trailer
    #[display("Read access bits")]
    ReadAc,
    /// Write key A into the trailer
    #[display("Write key A")]
    WriteKeyA,
    /// Write key B into the trailer
    #[display("Write key B")]
    WriteKeyB,
    /// Write the access bits into the trailer
    #[display("Write access bits")]
    WriteAc,
}

impl Operation {
    /// Operations that apply to data blocks
    pub const DATA: [Self; 4] = [Self::Read, Self::Write, Self::Increment, Self::DecTransRest];

    /// Operations that apply to sector trailers
    pub const TRAILER: [Self; 6] = [
        Self::ReadKeyA,
        Self::WriteKeyA,
        Self::ReadAc,
        Self::WriteAc,
        Self::ReadKeyB,
        Self::WriteKeyB,
    ];

    /// Whether this operation applies to sector trailers
    pub const fn is_trailer_operation(self) -> bool {
        matches!(
            self,
            Self::ReadKeyA
                | Self::ReadKeyB
                | Self::ReadAc
                | Self::WriteKeyA
                | Self::WriteKeyB
                | Self::WriteAc
        )
    }
}

/// Key required to perform an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Requirement {
    /// The operation is never permitted
    Never,
    /// Key A is required
    #[display("Key A")]
    KeyA,
    /// Key B is required
    #[display("Key B")]
    KeyB,
    /// Either key is sufficient
    #[display("Key A|B")]
    KeyAOrB,
    /// The operation does not apply, or the bits are malformed
    Error,
}

/// Whether key B can be read from the trailer, given the trailer's bits
pub const fn key_b_readable(bits: AccessBits) -> bool {
    matches!((bits.c1, bits.c2, bits.c3), (0, 0, 0) | (0, 1, 0) | (0, 0, 1))
}

/// Key required for `op` on a block governed by `bits`
pub const fn requirement(
    bits: AccessBits,
    op: Operation,
    is_trailer: bool,
    key_b_readable: bool,
) -> Requirement {
    if is_trailer {
        trailer_requirement(bits, op)
    } else {
        data_requirement(bits, op, key_b_readable)
    }
}

const fn trailer_requirement(bits: AccessBits, op: Operation) -> Requirement {
    use Operation::*;
    use Requirement::*;

    if !op.is_trailer_operation() {
        return Error;
    }
    match (bits.c1, bits.c2, bits.c3) {
        (0, 0, 0) => match op {
            WriteKeyA | ReadAc | ReadKeyB | WriteKeyB => KeyA,
            _ => Never,
        },
        (0, 1, 0) => match op {
            ReadAc | ReadKeyB => KeyA,
            _ => Never,
        },
        (1, 0, 0) => match op {
            WriteKeyA | WriteKeyB => KeyB,
            ReadAc => KeyAOrB,
            _ => Never,
        },
        (1, 1, 0) => match op {
            ReadAc => KeyAOrB,
            _ => Never,
        },
        (0, 0, 1) => match op {
            ReadKeyA => Never,
            _ => KeyA,
        },
        (0, 1, 1) => match op {
            ReadAc => KeyAOrB,
            ReadKeyA | ReadKeyB => Never,
            _ => KeyB,
        },
        (1, 0, 1) => match op {
            ReadAc => KeyAOrB,
            WriteAc => KeyB,
            _ => Never,
        },
        (1, 1, 1) => match op {
            ReadAc => KeyAOrB,
            _ => Never,
        },
        _ => Error,
    }
}

const fn data_requirement(bits: AccessBits, op: Operation, key_b_readable: bool) -> Requirement {
    use Operation::*;
    use Requirement::*;

    if op.is_trailer_operation() {
        return Error;
    }
    let (either, key_b) = if key_b_readable {
        (KeyA, Never)
    } else {
        (KeyAOrB, KeyB)
    };
    match (bits.c1, bits.c2, bits.c3) {
        (0, 0, 0) => either,
        (0, 1, 0) => match op {
            Read => either,
            _ => Never,
        },
        (1, 0, 0) => match op {
            Read => either,
            Write => key_b,
            _ => Never,
        },
        (1, 1, 0) => match op {
            Read | DecTransRest => either,
            _ => key_b,
        },
        (0, 0, 1) => match op {
            Read | DecTransRest => either,
            _ => Never,
        },
        (0, 1, 1) => match op {
            Read | Write => key_b,
            _ => Never,
        },
        (1, 0, 1) => match op {
            Read => key_b,
            _ => Never,
        },
        (1, 1, 1) => Never,
        _ => Error,
    }
}
