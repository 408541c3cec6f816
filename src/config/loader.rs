use crate::config::types::AppConfig;
use crate::foundation::{Result, TillerError};
use std::fs;
use std::path::Path;

const DEFAULT_ROLLER_URL: &str = "http://localhost:8080/v1/roller";
const DEFAULT_L1_RPC_URL: &str = "http://localhost:8545";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

pub fn load_from_toml(path: &Path, work_dir: &Path) -> Result<AppConfig> {
    let contents = fs::read_to_string(path)
        .map_err(|err| TillerError::ConfigError(format!("failed to read config {}: {}", path.display(), err)))?;
    let mut config: AppConfig = toml::from_str(&contents)?;
    apply_defaults(&mut config, work_dir);
    Ok(config)
}

/// Returns default configuration seeded with the work directory.
pub fn load_default(work_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    apply_defaults(&mut config, work_dir);
    config
}

fn apply_defaults(config: &mut AppConfig, work_dir: &Path) {
    if config.work_dir.as_os_str().is_empty() || config.work_dir == Path::new(".") {
        config.work_dir = work_dir.to_path_buf();
    }
    if config.roller.url.trim().is_empty() {
        config.roller.url = DEFAULT_ROLLER_URL.to_string();
    }
    if config.roller.timeout_secs == 0 {
        config.roller.timeout_secs = DEFAULT_HTTP_TIMEOUT_SECS;
    }
    if config.l1.rpc_url.trim().is_empty() {
        config.l1.rpc_url = DEFAULT_L1_RPC_URL.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::Dominion;
    use std::io::Write;

    #[test]
    fn defaults_fill_empty_fields() {
        let config = load_default(Path::new("/tmp/points"));
        assert_eq!(config.work_dir, Path::new("/tmp/points"));
        assert_eq!(config.roller.url, DEFAULT_ROLLER_URL);
        assert_eq!(config.roller.timeout_secs, DEFAULT_HTTP_TIMEOUT_SECS);
        assert!(config.force_dominion.is_none());
    }

    #[test]
    fn toml_overrides_survive_defaulting() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
force_dominion = "l2"

[l1]
gas_gwei = 40

[roller]
url = "http://localhost:9090/v1/roller"
"#
        )
        .unwrap();

        let config = load_from_toml(file.path(), Path::new("/tmp/points")).unwrap();
        assert_eq!(config.force_dominion, Some(Dominion::L2));
        assert_eq!(config.l1.gas_gwei, Some(40));
        assert_eq!(config.l1.rpc_url, DEFAULT_L1_RPC_URL);
        assert_eq!(config.roller.url, "http://localhost:9090/v1/roller");
    }
}
