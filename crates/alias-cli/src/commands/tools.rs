use crate::commands::print_json;
use crate::Error;
use alias_primitives::commitment;
use alias_script::{decode_script, describe_output};
use bitcoin::ScriptBuf;
use serde::Serialize;

/// Utilities
#[derive(Debug, clap::Subcommand)]
pub enum Tools {
    /// Decode a hex encoded scriptPubkey carrying an alias operation.
    #[command(name = "decode-script")]
    DecodeScript {
        #[arg(index = 1)]
        input: String,
    },

    /// Compute the `aliasnew` commitment of a random and a name.
    Commitment {
        /// Hex encoded random.
        #[arg(long)]
        rand: String,

        #[arg(long)]
        name: String,
    },
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct DecodedScript {
    op: String,
    args: Vec<String>,
    description: Option<String>,
    spending_script: String,
}

fn decode_hex(input: &str) -> crate::Result<Vec<u8>> {
    let str_without_0x = input.strip_prefix("0x").unwrap_or(input);
    hex::decode(str_without_0x).map_err(|err| Error::Input(format!("Invalid hex: {err}")))
}

fn decode_script_hex(input: &str) -> crate::Result<DecodedScript> {
    let script = ScriptBuf::from_bytes(decode_hex(input)?);

    let decoded = decode_script(&script)
        .ok_or_else(|| Error::Input("Not an alias script".to_string()))?;

    Ok(DecodedScript {
        op: decoded.operation.op().to_string(),
        args: decoded.operation.args().into_iter().map(hex::encode).collect(),
        description: describe_output(&script),
        spending_script: decoded.spending_script(&script).to_asm_string(),
    })
}

impl Tools {
    pub fn run(self) -> crate::Result<()> {
        match self {
            Self::DecodeScript { input } => print_json(&decode_script_hex(&input)?),
            Self::Commitment { rand, name } => {
                let rand = decode_hex(&rand)?;
                println!("{}", hex::encode(commitment(&rand, name.as_bytes())));
                Ok(())
            }
        }
    }
}
