mod history;

use anyhow::{Context, Result, bail};
use circuit_cipher_core::{
    CardPreset, CircuitDocument, CircuitSession, analyze_circuit, derive_parameters,
    stack_from_presets,
};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::{LevelFilter, debug, info};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

use crate::history::{GenerationLog, GenerationRecord, JsonlHistory};

const DEMO_MESSAGE: &str =
    "This is a secret message for testing the circuit-based encryption system!";

#[derive(Parser)]
#[command(
    name = "circuit-cipher",
    author,
    version,
    about = "Derive ciphers from circuit card stacks (experimental, unauthenticated)"
)]
struct Cli {
    #[arg(long, global = true)]
    debug: bool,
    /// JSON-lines file recording every parameter generation.
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "CIRCUIT_HISTORY",
        default_value = "circuit_history.jsonl"
    )]
    history: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct CircuitArgs {
    /// Circuit document (JSON with a `cards` array).
    #[arg(long, value_name = "FILE", conflicts_with = "preset")]
    circuit: Option<PathBuf>,
    /// Built-in cards stacked bottom to top, e.g. `and-gate,matrix-basic`.
    #[arg(long, value_name = "PRESET", value_delimiter = ',', num_args = 1..)]
    preset: Vec<CardPreset>,
}

#[derive(Args, Debug)]
struct CipherArgs {
    #[command(flatten)]
    circuit: CircuitArgs,
    /// Parameter set written by `params --out`.
    #[arg(long, value_name = "FILE", conflicts_with_all = ["circuit", "preset"])]
    params: Option<PathBuf>,
    #[arg(long, env = "CIRCUIT_PASSPHRASE", hide_env_values = true)]
    passphrase: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the circuit summary as JSON.
    Analyze {
        #[command(flatten)]
        source: CircuitArgs,
        /// Include the flattened graph and mesh edges.
        #[arg(long)]
        graph: bool,
    },
    /// Derive cipher parameters and log the generation.
    Params {
        #[command(flatten)]
        source: CircuitArgs,
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Encrypt a message or file into a base64 blob.
    Encrypt {
        #[command(flatten)]
        source: CipherArgs,
        #[arg(long, value_name = "TEXT")]
        message: Option<String>,
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Decrypt a blob produced by `encrypt`.
    Decrypt {
        #[command(flatten)]
        source: CipherArgs,
        #[arg(long, value_name = "FILE")]
        cipher: PathBuf,
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// List logged parameter generations.
    History {
        /// Only show the most recent N records.
        #[arg(long, value_name = "N")]
        last: Option<usize>,
    },
    /// Round-trip a message through the built-in card library.
    Demo {
        #[arg(long, default_value = DEMO_MESSAGE)]
        message: String,
        #[arg(long, default_value = "SecretKey123")]
        passphrase: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);
    let mut history = JsonlHistory::new(cli.history);
    match cli.command {
        Commands::Analyze { source, graph } => cmd_analyze(&source, graph),
        Commands::Params { source, out } => cmd_params(&source, out, &mut history),
        Commands::Encrypt {
            source,
            message,
            input,
            out,
        } => cmd_encrypt(&source, message, input, out),
        Commands::Decrypt {
            source,
            cipher,
            out,
        } => cmd_decrypt(&source, cipher, out),
        Commands::History { last } => cmd_history(&history, last),
        Commands::Demo {
            message,
            passphrase,
        } => cmd_demo(&message, &passphrase),
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(default));
    builder.format_timestamp(None);
    if debug {
        builder.filter_level(LevelFilter::Debug);
    }
    let _ = builder.try_init();
}

fn cmd_analyze(source: &CircuitArgs, include_graph: bool) -> Result<()> {
    let document = load_document(source)?;
    let analysis = analyze_circuit(&document);
    let rendered = if include_graph {
        serde_json::to_string_pretty(&analysis)?
    } else {
        serde_json::to_string_pretty(&analysis.summary)?
    };
    println!("{rendered}");
    Ok(())
}

fn cmd_params(
    source: &CircuitArgs,
    out: Option<PathBuf>,
    history: &mut dyn GenerationLog,
) -> Result<()> {
    let document = load_document(source)?;
    let analysis = analyze_circuit(&document);
    let params = derive_parameters(&analysis);
    let record = GenerationRecord::new(&analysis.summary, &params);
    match out {
        Some(path) => {
            save_json(&path, "parameters", &params)?;
            println!(
                "Wrote parameters (fingerprint {}) to {}",
                record.parameters_fingerprint,
                path.display()
            );
        }
        None => println!("{}", serde_json::to_string_pretty(&params)?),
    }
    history.append(&record)?;
    debug!(
        "logged generation cards={} complexity={} fingerprint={}",
        record.cards_count, record.complexity, record.parameters_fingerprint
    );
    Ok(())
}

fn cmd_encrypt(
    source: &CipherArgs,
    message: Option<String>,
    input: Option<PathBuf>,
    out: Option<PathBuf>,
) -> Result<()> {
    let session = load_session(source)?;
    let plaintext = resolve_plaintext(message, input)?;
    let blob = session.encrypt_bytes(&plaintext, source.passphrase.as_bytes());
    info!(
        "encrypted {} bytes with key_rounds={} matrix_size={} permutation_rounds={}",
        plaintext.len(),
        session.parameters().key_rounds(),
        session.parameters().matrix_size(),
        session.parameters().permutation_rounds()
    );
    match out {
        Some(path) => {
            fs::write(&path, format!("{blob}\n"))
                .with_context(|| format!("writing ciphertext to {}", path.display()))?;
            println!("Wrote ciphertext to {}", path.display());
        }
        None => println!("{blob}"),
    }
    Ok(())
}

fn cmd_decrypt(source: &CipherArgs, cipher_path: PathBuf, out: Option<PathBuf>) -> Result<()> {
    let session = load_session(source)?;
    let blob = fs::read_to_string(&cipher_path)
        .with_context(|| format!("reading ciphertext from {}", cipher_path.display()))?;
    let plaintext = session
        .decrypt_bytes(&blob, source.passphrase.as_bytes())
        .context("decryption failed")?;
    match out {
        Some(path) => {
            fs::write(&path, &plaintext)
                .with_context(|| format!("writing plaintext to {}", path.display()))?;
            println!(
                "Recovered {} bytes and wrote them to {}",
                plaintext.len(),
                path.display()
            );
        }
        None => {
            println!("Recovered plaintext ({} bytes):", plaintext.len());
            println!("{}", String::from_utf8_lossy(&plaintext));
        }
    }
    Ok(())
}

fn cmd_history(history: &JsonlHistory, last: Option<usize>) -> Result<()> {
    let records = history.records()?;
    if records.is_empty() {
        println!("No generations logged in {}", history.path().display());
        return Ok(());
    }
    let skip = last.map_or(0, |n| records.len().saturating_sub(n));
    for record in &records[skip..] {
        println!(
            "{}  cards={} complexity={} key_rounds={} matrix={} perm_rounds={} fp={}",
            record.timestamp,
            record.cards_count,
            record.complexity,
            record.key_rounds,
            record.matrix_size,
            record.permutation_rounds,
            &record.parameters_fingerprint[..16.min(record.parameters_fingerprint.len())]
        );
    }
    Ok(())
}

fn cmd_demo(message: &str, passphrase: &str) -> Result<()> {
    let document = stack_from_presets(&CardPreset::ALL);
    let session = CircuitSession::from_document(&document);
    if let Some(summary) = session.summary() {
        println!(
            "Stack: {} cards, {} active connections, {} mesh edges, {} gates (complexity {})",
            summary.num_cards,
            summary.num_connections,
            summary.num_mesh_connections,
            summary.num_logic_gates,
            summary.complexity_score
        );
    }
    let params = session.parameters();
    println!(
        "Parameters: key_rounds={} matrix_size={} permutation_rounds={} seed={} ops={:?}",
        params.key_rounds(),
        params.matrix_size(),
        params.permutation_rounds(),
        params.seed_hex(),
        params.logic_ops()
    );
    let blob = session.encrypt_bytes(message.as_bytes(), passphrase.as_bytes());
    println!("Ciphertext: {blob}");
    let recovered = session.decrypt_bytes(&blob, passphrase.as_bytes())?;
    if recovered != message.as_bytes() {
        bail!("round trip mismatch");
    }
    println!("Recovered: {}", String::from_utf8_lossy(&recovered));
    Ok(())
}

fn load_document(source: &CircuitArgs) -> Result<CircuitDocument> {
    if let Some(path) = &source.circuit {
        let document = CircuitDocument::from_path(path)
            .with_context(|| format!("loading circuit from {}", path.display()))?;
        return Ok(document);
    }
    if !source.preset.is_empty() {
        debug!("stacking presets {:?}", source.preset);
        return Ok(stack_from_presets(&source.preset));
    }
    bail!("Provide --circuit FILE or --preset NAME[,NAME...] to choose a circuit.")
}

fn load_session(source: &CipherArgs) -> Result<CircuitSession> {
    match &source.params {
        Some(path) => {
            let params = load_json(path, "parameters")?;
            Ok(CircuitSession::from_parameters(params))
        }
        None => Ok(CircuitSession::from_document(&load_document(
            &source.circuit,
        )?)),
    }
}

fn resolve_plaintext(message: Option<String>, input: Option<PathBuf>) -> Result<Vec<u8>> {
    match (message, input) {
        (Some(text), None) => Ok(text.into_bytes()),
        (None, Some(path)) => {
            fs::read(&path).with_context(|| format!("reading plaintext from {}", path.display()))
        }
        (Some(_), Some(_)) => bail!("Provide either --message or --input, not both."),
        (None, None) => bail!("Provide --message TEXT or --input FILE for data to encrypt."),
    }
}

fn load_json<T: DeserializeOwned>(path: &Path, label: &str) -> Result<T> {
    let data =
        fs::read(path).with_context(|| format!("reading {} from {}", label, path.display()))?;
    let value = serde_json::from_slice(&data)
        .with_context(|| format!("parsing {} from {}", label, path.display()))?;
    Ok(value)
}

fn save_json<T: ?Sized + serde::Serialize>(path: &Path, label: &str, value: &T) -> Result<()> {
    let serialized = serde_json::to_string_pretty(value)?;
    fs::write(path, serialized)
        .with_context(|| format!("writing {} to {}", label, path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::tempdir;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn preset_list_parses() {
        let cli = Cli::try_parse_from([
            "circuit-cipher",
            "analyze",
            "--preset",
            "and-gate,mesh-connector",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze { source, .. } => {
                assert_eq!(
                    source.preset,
                    vec![CardPreset::AndGate, CardPreset::MeshConnector]
                );
            }
            _ => panic!("expected analyze"),
        }
        assert!(
            Cli::try_parse_from(["circuit-cipher", "analyze", "--preset", "bogus"]).is_err()
        );
    }

    #[test]
    fn params_conflicts_with_circuit() {
        let parsed = Cli::try_parse_from([
            "circuit-cipher",
            "encrypt",
            "--params",
            "p.json",
            "--circuit",
            "c.json",
            "--passphrase",
            "pw",
            "--message",
            "hi",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn params_then_encrypt_decrypt() {
        let dir = tempdir().unwrap();
        let params_path = dir.path().join("params.json");
        let blob_path = dir.path().join("blob.txt");
        let plain_path = dir.path().join("plain.txt");
        let mut history = JsonlHistory::new(dir.path().join("history.jsonl"));
        let circuit = CircuitArgs {
            circuit: None,
            preset: vec![CardPreset::Hybrid, CardPreset::Matrix],
        };
        cmd_params(&circuit, Some(params_path.clone()), &mut history).unwrap();
        assert_eq!(history.records().unwrap().len(), 1);

        let source = CipherArgs {
            circuit: CircuitArgs {
                circuit: None,
                preset: Vec::new(),
            },
            params: Some(params_path),
            passphrase: "pw".to_string(),
        };
        cmd_encrypt(
            &source,
            Some("saved parameters".to_string()),
            None,
            Some(blob_path.clone()),
        )
        .unwrap();
        cmd_decrypt(&source, blob_path, Some(plain_path.clone())).unwrap();
        assert_eq!(fs::read(&plain_path).unwrap(), b"saved parameters");
    }

    #[test]
    fn missing_circuit_source_is_an_error() {
        let empty = CircuitArgs {
            circuit: None,
            preset: Vec::new(),
        };
        assert!(load_document(&empty).is_err());
    }

    #[test]
    fn demo_round_trips() {
        cmd_demo(DEMO_MESSAGE, "SecretKey123").unwrap();
    }
}
