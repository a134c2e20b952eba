use std::io::{self, Write};

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::Value;
use shelf_store::{
    backslash, slash, Base64, FsStore, IdentityBytes, IdentityText, Json, KeyTransformer,
    Serializer, SerializerKind, Simple, Store, StoreConfig, TransformerKind, Tuple,
};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = effective_config(&cli)?;
    let mut out = io::stdout().lock();
    match cli.command {
        Command::Config => cmd_config(&config, &mut out),
        Command::Entry(command) => open_and_run(&config, command, &mut out),
    }
}

/// Configuration file (or defaults) with command-line overrides applied.
fn effective_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    if cli.immutable {
        config.mutable = false;
    }
    if let Some(transformer) = cli.transformer {
        config.transformer = transformer.into();
    }
    if let Some(serializer) = cli.serializer {
        config.serializer = serializer.into();
    }
    Ok(config)
}

fn cmd_config(config: &StoreConfig, out: &mut dyn Write) -> anyhow::Result<()> {
    write!(out, "{}", config.to_toml_string()?)?;
    Ok(())
}

// ----------------------------------------------------------------------------
// Dispatch over the configured transformer and serializer
// ----------------------------------------------------------------------------

fn open_and_run(
    config: &StoreConfig,
    command: EntryCommand,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    match config.serializer {
        SerializerKind::Json => with_transformer(config, Json::<Value>::new(), command, out),
        SerializerKind::Text => with_transformer(config, IdentityText, command, out),
        SerializerKind::Bytes => with_transformer(config, IdentityBytes, command, out),
        SerializerKind::Bincode => {
            bail!("bincode stores hold typed values and cannot be edited from the command line")
        }
    }
}

fn with_transformer<S>(
    config: &StoreConfig,
    serializer: S,
    command: EntryCommand,
    out: &mut dyn Write,
) -> anyhow::Result<()>
where
    S: Serializer,
    S::Value: CliValue,
{
    let root = config.resolved_root();
    let options = config.options();
    match config.transformer {
        TransformerKind::Simple => {
            execute(&FsStore::open(root, Simple, serializer, options)?, command, out)
        }
        TransformerKind::Tuple => {
            execute(&FsStore::open(root, Tuple, serializer, options)?, command, out)
        }
        TransformerKind::Base64 => {
            execute(&FsStore::open(root, Base64, serializer, options)?, command, out)
        }
        TransformerKind::Slash => {
            execute(&FsStore::open(root, slash(), serializer, options)?, command, out)
        }
        TransformerKind::Backslash => {
            execute(&FsStore::open(root, backslash(), serializer, options)?, command, out)
        }
    }
}

fn execute<T, S>(
    store: &FsStore<T, S>,
    command: EntryCommand,
    out: &mut dyn Write,
) -> anyhow::Result<()>
where
    T: KeyTransformer,
    T::Key: CliKey,
    S: Serializer,
    S::Value: CliValue,
{
    match command {
        EntryCommand::Get(args) => {
            let key = <T::Key as CliKey>::parse(&args.key)?;
            let value = store.get(&key)?;
            writeln!(out, "{}", value.render())?;
        }
        EntryCommand::Set(args) => {
            let key = <T::Key as CliKey>::parse(&args.key.key)?;
            let value = <S::Value as CliValue>::parse(&args.value)?;
            store.set(&key, &value)?;
            writeln!(out, "{} Stored {}", "✓".green().bold(), key.render().yellow())?;
        }
        EntryCommand::Rm(args) => {
            let key = <T::Key as CliKey>::parse(&args.key)?;
            store.delete(&key)?;
            writeln!(out, "{} Deleted {}", "✓".green().bold(), key.render().yellow())?;
        }
        EntryCommand::Has(args) => {
            let key = <T::Key as CliKey>::parse(&args.key)?;
            writeln!(out, "{}", store.contains(&key)?)?;
        }
        EntryCommand::Keys => {
            for key in store.keys() {
                writeln!(out, "{}", key?.render())?;
            }
        }
        EntryCommand::Len => {
            writeln!(out, "{}", store.len()?)?;
        }
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Command-line representations of keys and values
// ----------------------------------------------------------------------------

/// A key that can be read from and printed to the command line.
trait CliKey: Sized {
    fn parse(args: &[String]) -> anyhow::Result<Self>;
    fn render(&self) -> String;
}

impl CliKey for String {
    fn parse(args: &[String]) -> anyhow::Result<Self> {
        match args {
            [key] => Ok(key.clone()),
            _ => bail!(
                "this transformer takes a single key argument, got {}",
                args.len()
            ),
        }
    }

    fn render(&self) -> String {
        self.clone()
    }
}

impl CliKey for Vec<String> {
    fn parse(args: &[String]) -> anyhow::Result<Self> {
        Ok(args.to_vec())
    }

    fn render(&self) -> String {
        self.join(" ")
    }
}

/// A value that can be read from and printed to the command line.
trait CliValue: Sized {
    fn parse(text: &str) -> anyhow::Result<Self>;
    fn render(&self) -> String;
}

impl CliValue for Value {
    fn parse(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).with_context(|| format!("value is not valid JSON: {text}"))
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

impl CliValue for String {
    fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(text.to_string())
    }

    fn render(&self) -> String {
        self.clone()
    }
}

impl CliValue for Vec<u8> {
    fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(text.as_bytes().to_vec())
    }

    fn render(&self) -> String {
        String::from_utf8_lossy(self).into_owned()
    }
}
