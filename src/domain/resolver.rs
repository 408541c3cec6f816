use crate::domain::wallet::{self, WalletRecord};
use crate::foundation::{Point, Result, TillerError};
use log::warn;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

/// Where a batch's work set comes from. Exactly one source per invocation.
#[derive(Clone, Debug)]
pub enum PointSource {
    /// Explicit identifiers, numeric or phonemic.
    List(Vec<String>),
    /// Newline-delimited file of identifiers.
    File(PathBuf),
    /// Directory of local wallet records to derive points from.
    WalletDir(PathBuf),
}

impl PointSource {
    /// Builds the source from optional inputs, enforcing that exactly one is
    /// supplied. Zero or multiple sources is a configuration error.
    pub fn from_options(
        list: Option<Vec<String>>,
        file: Option<PathBuf>,
        wallet_dir: Option<PathBuf>,
    ) -> Result<PointSource> {
        let supplied = usize::from(list.is_some()) + usize::from(file.is_some()) + usize::from(wallet_dir.is_some());
        match supplied {
            0 => Err(TillerError::ConfigError("one of points, points-file or wallet directory is required".to_string())),
            1 => Ok(list
                .map(PointSource::List)
                .or(file.map(PointSource::File))
                .or(wallet_dir.map(PointSource::WalletDir))
                .expect("exactly one source present")),
            _ => Err(TillerError::ConfigError("points, points-file and wallet directory are mutually exclusive".to_string())),
        }
    }
}

/// An ordered, de-duplicated work set. Invalid entries are reported
/// individually with the offending raw input so batch processing can decide
/// whether to continue past them.
#[derive(Debug, Default)]
pub struct ResolvedPoints {
    pub points: Vec<Point>,
    pub rejected: Vec<RejectedPoint>,
    /// Wallet records keyed alongside `points` when the source was a wallet
    /// directory; empty otherwise.
    pub wallets: Vec<WalletRecord>,
}

#[derive(Debug)]
pub struct RejectedPoint {
    pub input: String,
    pub error: TillerError,
}

pub fn resolve(source: &PointSource) -> Result<ResolvedPoints> {
    match source {
        PointSource::List(entries) => Ok(resolve_raw(entries.iter().map(String::as_str))),
        PointSource::File(path) => {
            let contents = fs::read_to_string(path)
                .map_err(|err| TillerError::ConfigError(format!("cannot read points file {}: {}", path.display(), err)))?;
            Ok(resolve_raw(contents.lines()))
        }
        PointSource::WalletDir(dir) => {
            let wallets = wallet::load_wallets(dir)?;
            let mut resolved = ResolvedPoints::default();
            let mut seen = HashSet::new();
            for record in wallets {
                match record.point() {
                    Ok(point) => {
                        if seen.insert(point) {
                            resolved.points.push(point);
                            resolved.wallets.push(record);
                        }
                    }
                    Err(error) => {
                        warn!("skipping wallet record with invalid point error={}", error);
                        resolved.rejected.push(RejectedPoint { input: format!("{:?}", record.point), error });
                    }
                }
            }
            Ok(resolved)
        }
    }
}

fn resolve_raw<'a>(entries: impl Iterator<Item = &'a str>) -> ResolvedPoints {
    let mut resolved = ResolvedPoints::default();
    let mut seen = HashSet::new();
    for raw in entries {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        match Point::from_str(trimmed) {
            Ok(point) => {
                if seen.insert(point) {
                    resolved.points.push(point);
                }
            }
            Err(error) => {
                warn!("invalid point identifier input={} error={}", trimmed, error);
                resolved.rejected.push(RejectedPoint { input: trimmed.to_string(), error });
            }
        }
    }
    resolved
}
