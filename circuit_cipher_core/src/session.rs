use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::cipher::{CipherError, CircuitCipher};
use crate::document::{CircuitDocument, CircuitError};
use crate::graph::analyze_circuit;
use crate::params::{CipherParameters, derive_parameters};
use crate::summary::CircuitSummary;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Circuit(#[from] CircuitError),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// A cipher bound to one circuit, with file helpers for the CLI.
///
/// Sessions built from a document keep its summary; sessions loaded from a
/// saved parameter set have none.
#[derive(Clone, Debug)]
pub struct CircuitSession {
    cipher: CircuitCipher,
    summary: Option<CircuitSummary>,
}

impl CircuitSession {
    pub fn from_document(document: &CircuitDocument) -> Self {
        let analysis = analyze_circuit(document);
        let params = derive_parameters(&analysis);
        Self {
            cipher: CircuitCipher::new(params),
            summary: Some(analysis.summary),
        }
    }

    pub fn from_circuit_file(path: &Path) -> Result<Self, SessionError> {
        let document = CircuitDocument::from_path(path)?;
        debug!(
            "loaded circuit {} with {} cards",
            path.display(),
            document.cards.len()
        );
        Ok(Self::from_document(&document))
    }

    pub fn from_parameters(params: CipherParameters) -> Self {
        Self {
            cipher: CircuitCipher::new(params),
            summary: None,
        }
    }

    /// Loads a parameter set written by [`CircuitSession::save_parameters`].
    pub fn from_parameters_file(path: &Path) -> Result<Self, SessionError> {
        let reader = BufReader::new(File::open(path)?);
        let params: CipherParameters = serde_json::from_reader(reader)?;
        Ok(Self::from_parameters(params))
    }

    pub fn cipher(&self) -> &CircuitCipher {
        &self.cipher
    }

    pub fn parameters(&self) -> &CipherParameters {
        self.cipher.parameters()
    }

    pub fn summary(&self) -> Option<&CircuitSummary> {
        self.summary.as_ref()
    }

    pub fn encrypt_bytes(&self, data: &[u8], passphrase: &[u8]) -> String {
        self.cipher.encrypt(data, passphrase)
    }

    pub fn decrypt_bytes(&self, blob: &str, passphrase: &[u8]) -> Result<Vec<u8>, SessionError> {
        Ok(self.cipher.decrypt(blob.trim(), passphrase)?)
    }

    /// Encrypts `input` and writes the base64 blob, newline terminated, to `output`.
    pub fn encrypt_file(
        &self,
        passphrase: &[u8],
        input: &Path,
        output: &Path,
    ) -> Result<(), SessionError> {
        let plaintext = fs::read(input)?;
        let blob = self.encrypt_bytes(&plaintext, passphrase);
        let mut writer = BufWriter::new(File::create(output)?);
        writer.write_all(blob.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Decrypts a blob file written by `encrypt_file`. Surrounding whitespace
    /// in the file is ignored.
    pub fn decrypt_file(
        &self,
        passphrase: &[u8],
        input: &Path,
        output: &Path,
    ) -> Result<(), SessionError> {
        let blob = fs::read_to_string(input)?;
        let plaintext = self.decrypt_bytes(&blob, passphrase)?;
        fs::write(output, &plaintext)?;
        Ok(())
    }

    pub fn save_parameters(&self, path: &Path) -> Result<(), SessionError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self.parameters())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}
