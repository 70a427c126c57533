//! Config command - write a starter file or print the merged configuration

use anyhow::{Context, Result, bail};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::args::{ConfigArgs, ConfigCommands};
use crate::config::AppConfig;

pub async fn execute(args: ConfigArgs, config_path: Option<PathBuf>) -> Result<()> {
    match args.command {
        ConfigCommands::Init { path, force } => write_starter(&path, force),
        ConfigCommands::Show => show_config(config_path),
    }
}

/// Write the commented starter config, never clobbering an existing file
/// unless `force` is set
fn write_starter(path: &Path, force: bool) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create config directory {}", dir.display()))?;
    }

    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    let mut file = match options.open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => bail!(
            "{} already exists, pass --force to replace it",
            path.display()
        ),
        Err(e) => {
            return Err(e).with_context(|| format!("Cannot write {}", path.display()));
        }
    };
    file.write_all(AppConfig::example_toml().as_bytes())
        .with_context(|| format!("Cannot write {}", path.display()))?;

    let defaults = AppConfig::default();
    println!("Wrote {}", path.display());
    println!();
    println!("Tokens are read from these environment variables:");
    for var in [
        &defaults.twitter.access_token_env,
        &defaults.linkedin.access_token_env,
        &defaults.linkedin.author_urn_env,
        &defaults.reddit.access_token_env,
    ] {
        println!("  {}", var);
    }
    println!();
    println!("Check the setup with 'crosspost doctor', then preview a pass with");
    println!("'crosspost run --dry-run'.");

    Ok(())
}

/// Print the merged file and environment configuration. Only variable names
/// are stored in it, so no secret is printed.
fn show_config(config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_force_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "# old\n").unwrap();

        assert!(write_starter(&path, false).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "# old\n");

        write_starter(&path, true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), AppConfig::example_toml());
    }

    #[test]
    fn test_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etc").join("crosspost").join("config.toml");

        write_starter(&path, false).unwrap();
        assert!(path.exists());
    }
}
