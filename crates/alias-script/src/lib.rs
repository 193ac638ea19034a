//! Codec for alias operations embedded in output scripts.
//!
//! An alias output carries a fixed-arity operation prefix in front of an ordinary
//! spending script:
//!
//! ```text
//! OP_<tag> <arg0> [<arg1> [<arg2>]] OP_DROP|OP_2DROP|OP_NOP ... <spending script>
//! ```
//!
//! | Operation     | Tag    | Arguments              |
//! |---------------|--------|------------------------|
//! | `New`         | `OP_1` | commitment             |
//! | `FirstUpdate` | `OP_2` | name, rand, value      |
//! | `Update`      | `OP_3` | name, value            |
//!
//! The whole prefix is rejected if the argument count does not match the tag's
//! arity exactly. There is no partial recognition.

mod error;

use bitcoin::opcodes::all::*;
use bitcoin::opcodes::Opcode;
use bitcoin::script::{Builder, Instruction, PushBytes};
use bitcoin::{Amount, Script, ScriptBuf, Transaction};

pub use error::Error;

/// Kind of an alias operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AliasOp {
    /// Commits to `hash160(rand || name)` without revealing the name.
    New,
    /// Reveals a committed name and binds the first value to it.
    FirstUpdate,
    /// Renews a registered name, optionally changing its value.
    Update,
}

impl AliasOp {
    /// Small-integer tag of the operation.
    pub const fn tag(self) -> u8 {
        match self {
            Self::New => 1,
            Self::FirstUpdate => 2,
            Self::Update => 3,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::New),
            2 => Some(Self::FirstUpdate),
            3 => Some(Self::Update),
            _ => None,
        }
    }

    /// Exact number of arguments carried by the operation.
    pub const fn arity(self) -> usize {
        match self {
            Self::New => 1,
            Self::FirstUpdate => 3,
            Self::Update => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "aliasnew",
            Self::FirstUpdate => "aliasfirstupdate",
            Self::Update => "aliasupdate",
        }
    }

    // Drops `arity + 1` stack items: the arguments and the tag.
    fn terminators(self) -> &'static [Opcode] {
        match self {
            Self::New => &[OP_2DROP],
            Self::FirstUpdate => &[OP_2DROP, OP_2DROP],
            Self::Update => &[OP_2DROP, OP_DROP],
        }
    }
}

impl std::fmt::Display for AliasOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded alias operation with its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AliasOperation {
    New {
        commitment: Vec<u8>,
    },
    FirstUpdate {
        name: Vec<u8>,
        rand: Vec<u8>,
        value: Vec<u8>,
    },
    Update {
        name: Vec<u8>,
        value: Vec<u8>,
    },
}

impl AliasOperation {
    pub fn op(&self) -> AliasOp {
        match self {
            Self::New { .. } => AliasOp::New,
            Self::FirstUpdate { .. } => AliasOp::FirstUpdate,
            Self::Update { .. } => AliasOp::Update,
        }
    }

    /// Name operated on, `None` for [`AliasOperation::New`] which only carries a commitment.
    pub fn name(&self) -> Option<&[u8]> {
        match self {
            Self::New { .. } => None,
            Self::FirstUpdate { name, .. } | Self::Update { name, .. } => Some(name),
        }
    }

    pub fn value(&self) -> Option<&[u8]> {
        match self {
            Self::New { .. } => None,
            Self::FirstUpdate { value, .. } | Self::Update { value, .. } => Some(value),
        }
    }

    /// Arguments in script order.
    pub fn args(&self) -> Vec<&[u8]> {
        match self {
            Self::New { commitment } => vec![commitment],
            Self::FirstUpdate { name, rand, value } => vec![name, rand, value],
            Self::Update { name, value } => vec![name, value],
        }
    }

    /// First script argument: the commitment for `New`, the name otherwise.
    pub fn first_arg(&self) -> &[u8] {
        match self {
            Self::New { commitment } => commitment,
            Self::FirstUpdate { name, .. } | Self::Update { name, .. } => name,
        }
    }

    fn from_args(op: AliasOp, args: Vec<Vec<u8>>) -> Option<Self> {
        if args.len() != op.arity() {
            tracing::trace!(
                "Rejecting {op} prefix with {} arguments, expected {}",
                args.len(),
                op.arity()
            );
            return None;
        }

        let mut args = args.into_iter();
        let mut next = || args.next().unwrap_or_default();

        Some(match op {
            AliasOp::New => Self::New { commitment: next() },
            AliasOp::FirstUpdate => Self::FirstUpdate {
                name: next(),
                rand: next(),
                value: next(),
            },
            AliasOp::Update => Self::Update {
                name: next(),
                value: next(),
            },
        })
    }
}

/// An alias operation decoded from an output script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasScript {
    pub operation: AliasOperation,
    /// Byte offset at which the spending script starts.
    pub spending_offset: usize,
}

impl AliasScript {
    /// Returns the spending script that follows the operation prefix in `script`.
    pub fn spending_script<'a>(&self, script: &'a Script) -> &'a Script {
        let bytes = script.as_bytes();
        Script::from_bytes(&bytes[self.spending_offset.min(bytes.len())..])
    }
}

fn small_int(opcode: Opcode) -> Option<u8> {
    let byte = opcode.to_u8();
    (OP_PUSHNUM_1.to_u8()..=OP_PUSHNUM_16.to_u8())
        .contains(&byte)
        .then(|| byte - OP_PUSHNUM_1.to_u8() + 1)
}

fn is_terminator(opcode: Opcode) -> bool {
    opcode == OP_DROP || opcode == OP_2DROP || opcode == OP_NOP
}

/// Decodes the alias operation prefix of `script`.
///
/// Returns `None` if the first instruction is not `OP_1..OP_16`, if a non-push
/// instruction appears before the terminator, if no terminator is found, or if the
/// argument count does not match the tag's arity.
pub fn decode_script(script: &Script) -> Option<AliasScript> {
    let mut instructions = script.instruction_indices();

    let tag = match instructions.next()? {
        Ok((_, Instruction::Op(opcode))) => small_int(opcode)?,
        _ => return None,
    };

    let mut args = Vec::new();
    let mut spending_offset = loop {
        match instructions.next()? {
            Ok((pos, Instruction::Op(opcode))) if is_terminator(opcode) => break pos + 1,
            Ok((_, Instruction::PushBytes(bytes))) => args.push(bytes.as_bytes().to_vec()),
            _ => return None,
        }
    };

    // Consecutive terminators all belong to the prefix.
    for instruction in instructions {
        match instruction {
            Ok((pos, Instruction::Op(opcode))) if is_terminator(opcode) => {
                spending_offset = pos + 1;
            }
            _ => break,
        }
    }

    let op = AliasOp::from_tag(tag)?;
    let operation = AliasOperation::from_args(op, args)?;

    Some(AliasScript {
        operation,
        spending_offset,
    })
}

/// Returns the first output of `tx` carrying an alias operation, with its index.
pub fn decode_transaction(tx: &Transaction) -> Option<(usize, AliasScript)> {
    tx.output
        .iter()
        .enumerate()
        .find_map(|(index, output)| decode_script(&output.script_pubkey).map(|d| (index, d)))
}

/// Returns the spending script behind the alias prefix of `script`.
pub fn strip_prefix(script: &Script) -> Result<ScriptBuf, Error> {
    let decoded = decode_script(script).ok_or(Error::NotAliasScript)?;
    Ok(decoded.spending_script(script).to_owned())
}

/// Builds `OP_<tag> <args> <drops> <spending>`.
pub fn encode_script(operation: &AliasOperation, spending: &Script) -> Result<ScriptBuf, Error> {
    let op = operation.op();
    let mut builder = Builder::new().push_opcode(Opcode::from(OP_PUSHNUM_1.to_u8() + op.tag() - 1));

    for arg in operation.args() {
        let push: &PushBytes = arg.try_into().map_err(|_| Error::PushTooLarge(arg.len()))?;
        builder = builder.push_slice(push);
    }

    for opcode in op.terminators() {
        builder = builder.push_opcode(*opcode);
    }

    let mut bytes = builder.into_script().into_bytes();
    bytes.extend_from_slice(spending.as_bytes());

    Ok(ScriptBuf::from_bytes(bytes))
}

/// Whether `script` is a burn output, i.e. exactly `OP_RETURN`.
pub fn is_burn_script(script: &Script) -> bool {
    script.as_bytes() == [OP_RETURN.to_u8()]
}

/// Script of a burn output.
pub fn burn_script() -> ScriptBuf {
    Builder::new().push_opcode(OP_RETURN).into_script()
}

/// Sum of the values burnt by `tx` in bare `OP_RETURN` outputs.
pub fn burn_fee(tx: &Transaction) -> Amount {
    tx.output
        .iter()
        .filter(|output| is_burn_script(&output.script_pubkey))
        .fold(Amount::ZERO, |acc, output| {
            acc.checked_add(output.value).unwrap_or(Amount::MAX)
        })
}

/// Human readable label of an output, `None` for outputs unrelated to aliases.
pub fn describe_output(script: &Script) -> Option<String> {
    if is_burn_script(script) {
        return Some("network fee".to_string());
    }

    let decoded = decode_script(script)?;
    let op = decoded.operation.op();

    Some(match &decoded.operation {
        AliasOperation::New { commitment } => format!("{op}: {}", hex::encode(commitment)),
        AliasOperation::FirstUpdate { name, .. } | AliasOperation::Update { name, .. } => {
            format!("{op}: {}", String::from_utf8_lossy(name))
        }
    })
}
