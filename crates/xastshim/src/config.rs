//! Types for the configuration file usable by xastshim
use std::{
    env::current_dir,
    fs::read_to_string,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Context;
use etcetera::{choose_base_strategy, BaseStrategy};
use serde::{Deserialize, Serialize};
use xastshim_ast::parse::Options;

/// The name of the configuration file looked up in the working directory
pub const LOCAL_FILE: &str = "xastshimrc.json";

#[derive(Deserialize, Serialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// The config for the CLI usage of xastshim
pub struct Config {
    /// Which parts of each document the parser keeps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse: Option<Options>,
}

impl Config {
    /// Returns the paths the configuration is loaded from, in order of priority
    fn paths() -> anyhow::Result<Vec<PathBuf>> {
        let mut paths = vec![current_dir()?.join(LOCAL_FILE)];
        match choose_base_strategy() {
            Ok(strategy) => {
                let mut path = strategy.config_dir();
                path.push("xastshim");
                path.push("config.json");
                paths.push(path);
            }
            Err(err) => log::debug!("skipping user configuration: {err}"),
        }
        Ok(paths)
    }

    /// Tries loading the configuration from well-known paths, falling back to the default
    /// configuration when there is none.
    ///
    /// # Errors
    /// When a config exists but cannot be read or parsed
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::paths()?)
    }

    /// Loads the first configuration file found of `paths`
    ///
    /// # Errors
    /// When a config exists but cannot be read or parsed
    pub fn load_from(paths: &[PathBuf]) -> anyhow::Result<Self> {
        for path in paths {
            let Some(file) = read_if_exists(path)? else {
                continue;
            };
            log::debug!("using configuration at {}", path.display());
            return serde_json::from_str(&file).with_context(|| {
                format!("Configuration at {} cannot be parsed", path.display())
            });
        }
        Ok(Self::default())
    }
}

fn read_if_exists(path: &Path) -> anyhow::Result<Option<String>> {
    match read_to_string(path) {
        Ok(file) => Ok(Some(file)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("cannot read {}", path.display())),
    }
}

#[cfg(test)]
use pretty_assertions::assert_eq;

#[test]
fn serde() -> anyhow::Result<()> {
    let config: Config = serde_json::from_str(r#"{ "parse": { "keepComments": true } }"#)?;
    assert_eq!(
        config,
        Config {
            parse: Some(Options {
                keep_text: true,
                keep_comments: true,
                keep_whitespace: false,
            }),
        }
    );

    assert_eq!(serde_json::to_string(&Config::default())?, "{}");
    Ok(())
}

#[test]
fn load_from() -> anyhow::Result<()> {
    let dir = std::env::temp_dir().join(format!("xastshim-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let missing = dir.join("missing.json");
    let valid = dir.join("valid.json");
    let invalid = dir.join("invalid.json");
    std::fs::write(&valid, r#"{ "parse": { "keepText": false } }"#)?;
    std::fs::write(&invalid, "{ parse")?;

    assert_eq!(Config::load_from(&[missing.clone()])?, Config::default());

    let config = Config::load_from(&[missing.clone(), valid.clone(), invalid.clone()])?;
    assert_eq!(config.parse.map(|options| options.keep_text), Some(false));

    let err = Config::load_from(&[missing, invalid, valid])
        .expect_err("invalid config should fail");
    assert!(err.to_string().starts_with("Configuration at "));

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
