//! Reporting and export — JSON manifest and CSV artifacts.
//!
//! - **ledger.csv**: `date,cash,total_value,pos_<TICKER>...`
//! - **fills.csv**: trade tape, one row per executed fill
//! - **signals_actions.csv** / **daily_weights.csv**: the decisions that drove the run
//! - **manifest.json**: config, run id, metrics, dataset hash, schema version
//!
//! Manifests with an unknown `schema_version` are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ledgerlab_core::domain::CASH_COLUMN;
use ledgerlab_core::{DecisionTable, Fill, Ledger};

use crate::runner::{BacktestResult, SCHEMA_VERSION};
use crate::sweep::SweepEntry;

// ─── JSON manifest ──────────────────────────────────────────────────

/// Serialize the run summary (everything but the ledger and decisions).
pub fn export_manifest(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize run manifest")
}

/// Parse a manifest, rejecting schema versions newer than this build.
pub fn import_manifest(json: &str) -> Result<serde_json::Value> {
    let value: serde_json::Value =
        serde_json::from_str(json).context("failed to parse run manifest")?;
    let Some(version) = value.get("schema_version").and_then(|v| v.as_u64()) else {
        bail!("manifest has no schema_version");
    };
    if version > u64::from(SCHEMA_VERSION) {
        bail!("unsupported schema version {version} (max supported: {SCHEMA_VERSION})");
    }
    Ok(value)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Ledger as CSV, one row per simulated date.
pub fn export_ledger_csv(ledger: &Ledger) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(ledger.column_names())?;

    for row in ledger.rows() {
        let mut record = vec![
            row.date.to_string(),
            format!("{:.6}", row.cash),
            format!("{:.6}", row.total_value),
        ];
        record.extend(row.positions.iter().map(i64::to_string));
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Trade tape.
///
/// Columns: decision_date, execution_date, ticker, side, quantity, raw_price,
/// price, notional, friction
pub fn export_fills_csv(fills: &[Fill]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "decision_date",
        "execution_date",
        "ticker",
        "side",
        "quantity",
        "raw_price",
        "price",
        "notional",
        "friction",
    ])?;

    for f in fills {
        wtr.write_record([
            &f.decision_date.to_string(),
            &f.execution_date.to_string(),
            &f.ticker,
            &f.side.to_string(),
            &f.quantity.to_string(),
            &format!("{:.6}", f.raw_price),
            &format!("{:.6}", f.price),
            &format!("{:.2}", f.notional()),
            &format!("{:.2}", f.friction()),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Decisions in the same wide layout the loaders read back.
pub fn export_decisions_csv(decisions: &DecisionTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["Date".to_string()];
    header.extend(decisions.tickers().iter().cloned());

    match decisions {
        DecisionTable::Signals(table) => {
            wtr.write_record(&header)?;
            for (date, row) in table.dates().iter().zip(table.rows()) {
                let mut record = vec![date.to_string()];
                record.extend(row.iter().map(|s| s.as_str().to_string()));
                wtr.write_record(&record)?;
            }
        }
        DecisionTable::Weights(table) => {
            header.push(CASH_COLUMN.to_string());
            wtr.write_record(&header)?;
            for (date, row) in table.dates().iter().zip(table.rows()) {
                let mut record = vec![date.to_string()];
                record.extend(row.weights.iter().map(|w| w.to_string()));
                record.push(row.cash.to_string());
                wtr.write_record(&record)?;
            }
        }
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One row per sweep point.
pub fn export_sweep_csv(entries: &[SweepEntry]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "fast",
        "slow",
        "annualized_return",
        "sharpe",
        "max_drawdown",
        "total_return",
        "final_value",
        "fills",
    ])?;
    for e in entries {
        wtr.write_record([
            &e.fast.to_string(),
            &e.slow.to_string(),
            &format!("{:.6}", e.metrics.annualized_return),
            &format!("{:.6}", e.metrics.sharpe),
            &format!("{:.6}", e.metrics.max_drawdown),
            &format!("{:.6}", e.metrics.total_return),
            &format!("{:.2}", e.metrics.final_value),
            &e.fill_count.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// File name for a decision table, by mode.
pub fn decisions_file_name(decisions: &DecisionTable) -> &'static str {
    match decisions {
        DecisionTable::Signals(_) => "signals_actions.csv",
        DecisionTable::Weights(_) => "daily_weights.csv",
    }
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single run.
///
/// Creates `{provider}_{run_id prefix}/` under `output_dir` containing
/// `manifest.json`, `ledger.csv`, `fills.csv` and the decisions file.
/// Returns the path to the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let short_id: String = result.run_id.chars().take(12).collect();
    let run_dir = output_dir.join(format!("{}_{}", result.provider, short_id));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write(&run_dir.join("manifest.json"), &export_manifest(result)?)?;
    write(&run_dir.join("ledger.csv"), &export_ledger_csv(&result.ledger)?)?;
    write(
        &run_dir.join("fills.csv"),
        &export_fills_csv(result.ledger.fills())?,
    )?;
    write(
        &run_dir.join(decisions_file_name(&result.decisions)),
        &export_decisions_csv(&result.decisions)?,
    )?;

    Ok(run_dir)
}

/// Read and version-check `manifest.json` from an artifact directory.
pub fn load_manifest(dir: &Path) -> Result<serde_json::Value> {
    let path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_manifest(&json)
}

fn write(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}
