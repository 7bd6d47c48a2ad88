use crate::config::AppConfigOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliOverrides {
    config: Option<PathBuf>,
    frames: Option<u32>,
    script: Option<PathBuf>,
    seed: Option<u64>,
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            let Some(key) = flag.strip_prefix("--") else {
                bail!("Unexpected argument '{flag}'. Use --frames/--script/--seed/--config with values.");
            };
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "frames" => {
                    overrides.frames =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid frame count '{value}'"))?);
                }
                "seed" => {
                    overrides.seed = Some(value.parse::<u64>().with_context(|| format!("Invalid seed '{value}'"))?);
                }
                "script" => overrides.script = Some(PathBuf::from(value)),
                "config" => overrides.config = Some(PathBuf::from(value)),
                _ => bail!("Unknown flag '{flag}'. Supported flags: --frames, --script, --seed, --config."),
            }
        }
        Ok(overrides)
    }

    /// Config file to load, if given on the command line.
    pub fn config_path(&self) -> Option<&Path> {
        self.config.as_deref()
    }

    pub fn into_config_overrides(self) -> AppConfigOverrides {
        AppConfigOverrides { frames: self.frames, script: self.script, seed: self.seed }
    }
}
