use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use shelf_store::{SerializerKind, TransformerKind};

#[derive(Parser)]
#[command(
    name = "shelf",
    about = "Shelf -- persistent dictionaries in a directory tree",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML file with the store configuration
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Store root directory (overrides the config file)
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    /// Refuse to overwrite or delete entries
    #[arg(long, global = true)]
    pub immutable: bool,

    /// Key transformer (overrides the config file)
    #[arg(short, long, global = true)]
    pub transformer: Option<TransformerArg>,

    /// Value serializer (overrides the config file)
    #[arg(short, long, global = true)]
    pub serializer: Option<SerializerArg>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum TransformerArg {
    Simple,
    Tuple,
    Base64,
    Slash,
    Backslash,
}

impl From<TransformerArg> for TransformerKind {
    fn from(arg: TransformerArg) -> Self {
        match arg {
            TransformerArg::Simple => Self::Simple,
            TransformerArg::Tuple => Self::Tuple,
            TransformerArg::Base64 => Self::Base64,
            TransformerArg::Slash => Self::Slash,
            TransformerArg::Backslash => Self::Backslash,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum SerializerArg {
    Json,
    Bincode,
    Bytes,
    Text,
}

impl From<SerializerArg> for SerializerKind {
    fn from(arg: SerializerArg) -> Self {
        match arg {
            SerializerArg::Json => Self::Json,
            SerializerArg::Bincode => Self::Bincode,
            SerializerArg::Bytes => Self::Bytes,
            SerializerArg::Text => Self::Text,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    #[command(flatten)]
    Entry(EntryCommand),
    /// Print the effective configuration
    Config,
}

/// Commands that open the store.
#[derive(Subcommand)]
pub enum EntryCommand {
    /// Print the value stored under a key
    Get(KeyArgs),
    /// Store a value under a key
    Set(SetArgs),
    /// Delete a key
    Rm(KeyArgs),
    /// Check whether a key exists
    Has(KeyArgs),
    /// List every key
    Keys,
    /// Count the entries
    Len,
}

#[derive(Args)]
pub struct KeyArgs {
    /// Key; give one part per argument for the tuple transformer
    #[arg(required = true, num_args = 1..)]
    pub key: Vec<String>,
}

#[derive(Args)]
pub struct SetArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    /// Value to store: JSON for json stores, raw text otherwise
    #[arg(long)]
    pub value: String,
}
