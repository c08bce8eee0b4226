use std::{
    fs,
    path::{Path, PathBuf},
};

use delphi::{
    inputs::{load_inputs, InputPaths},
    prelude::*,
    run_batch, RunConfig,
};
use log::info;
use serde::{Deserialize, Serialize};
use simple_logger::SimpleLogger;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    run: RunConfig,
    inputs: InputPaths,
    output_dir: PathBuf,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            run: RunConfig::default(),
            inputs: InputPaths::default(),
            output_dir: "predictions".into(),
            verbose: false,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: Config = toml::from_str(&data)?;
        cfg.run.prepare()?;
        Ok(cfg)
    }
}

fn write_table<T, I>(path: &Path, rows: I) -> Result<usize>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = csv::Writer::from_path(path)?;
    let mut n = 0;
    for row in rows {
        writer.serialize(row)?;
        n += 1;
    }
    writer.flush()?;
    info!("wrote {} rows to {}", n, path.display());
    Ok(n)
}

pub fn main() -> Result<()> {
    SimpleLogger::new()
        .init()
        .map_err(|e| DelphiError::Configuration(e.to_string()))?;

    let path = std::env::args().nth(1).unwrap_or_else(|| "conf.toml".to_string());
    let cfg = Config::load(&path)?;
    if cfg.verbose {
        println!("{:#?}", cfg);
    }

    let (inputs, current) = load_inputs(&cfg.inputs, cfg.run.param_layout)?;
    let output = run_batch(&inputs, &current, &cfg.run)?;
    output.report.log();

    fs::create_dir_all(&cfg.output_dir)?;
    let out = |name: &str| cfg.output_dir.join(name);
    write_table(&out("predictions_since_forecast.csv"), output.since_forecast_rows())?;
    write_table(&out("predictions_since_100_cases.csv"), output.since_100_rows())?;
    write_table(&out("scores.csv"), output.score_rows())?;
    Ok(())
}
