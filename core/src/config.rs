use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File read from the data directory when no explicit config is given.
pub const DEFAULT_CONFIG_FILE: &str = "pipeline.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Source files read by the extract step; the table key is the file stem.
    pub source_files: Vec<String>,
    pub delimiter: char,
    /// Status value counted as an approval.
    pub approved_status: String,
    /// Transaction amounts are clipped to ±this value.
    pub amount_clip_limit: f64,
    /// Stands in for a zero balance in amount/balance ratios.
    pub zero_balance_substitute: f64,
    /// Appended to the table key when exporting, e.g. `contas_tratado.csv`.
    pub export_suffix: String,
    /// Pins "now" for age and tenure. System time when absent.
    pub as_of: Option<NaiveDateTime>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_files: [
                "agencias.csv",
                "colaborador_agencia.csv",
                "colaboradores.csv",
                "contas.csv",
                "propostas_credito.csv",
                "transacoes.csv",
                "clientes.xlsx",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            delimiter: ',',
            approved_status: "Aprovada".into(),
            amount_clip_limit: 1_000_000.0,
            zero_balance_substitute: 1e-6,
            export_suffix: "_tratado".into(),
            as_of: None,
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {e}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// `<data_dir>/pipeline.json` when it exists, defaults otherwise.
    pub fn load_or_default(data_dir: &Path) -> anyhow::Result<Self> {
        let path = data_dir.join(DEFAULT_CONFIG_FILE);
        if path.exists() {
            log::info!("Using config {}", path.display());
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.amount_clip_limit.is_finite() && self.amount_clip_limit > 0.0) {
            anyhow::bail!("amount_clip_limit must be a positive number");
        }
        if !(self.zero_balance_substitute.is_finite() && self.zero_balance_substitute != 0.0) {
            anyhow::bail!("zero_balance_substitute must be a non-zero number");
        }
        if !self.delimiter.is_ascii() {
            anyhow::bail!("delimiter must be a single ASCII character");
        }
        Ok(())
    }

    pub fn delimiter_byte(&self) -> u8 {
        if self.delimiter.is_ascii() {
            self.delimiter as u8
        } else {
            b','
        }
    }
}
