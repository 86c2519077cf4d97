//! Source pattern resolution
//!
//! A remote source pattern may end in a cutout suffix. The suffix is split
//! off before wildcard expansion and re-attached, verbatim, to every match.
//! Local patterns are left to the shell: they are neither globbed nor parsed
//! for cutouts.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;
use vocp_storage::Storage;
use vocp_types::{CutoutKind, CutoutSpec, Result};

static PIXEL_CUTOUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<base>.*?)(?P<cutout>(\[[-+]?[\d*]+(:[-+]?[\d*]+)?(,[-+]?[\d*]+(:[-+]?[\d*]+)?)?\])+)$",
    )
    .expect("valid pixel cutout regex")
});

static SPATIAL_CUTOUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<base>.*?)(?P<cutout>\((?P<ra>[-+]?(?:\d+\.?\d*|\.\d+)),(?P<dec>[-+]?(?:\d+\.?\d*|\.\d+)),(?P<radius>(?:\d+\.?\d*|\.\d+))\))$",
    )
    .expect("valid spatial cutout regex")
});

/// Split a trailing cutout off a remote source pattern.
///
/// The pixel-range grammar is tried first, then the spatial one.
pub fn split_cutout(pattern: &str) -> (&str, Option<CutoutSpec>) {
    if let Some(captures) = PIXEL_CUTOUT.captures(pattern) {
        if let (Some(base), Some(cutout)) = (captures.name("base"), captures.name("cutout")) {
            return (
                base.as_str(),
                Some(CutoutSpec {
                    kind: CutoutKind::PixelRange,
                    suffix: cutout.as_str().to_string(),
                }),
            );
        }
    }

    if let Some(captures) = SPATIAL_CUTOUT.captures(pattern) {
        let field = |name: &str| captures.name(name).and_then(|m| m.as_str().parse::<f64>().ok());
        if let (Some(base), Some(cutout), Some(ra), Some(dec), Some(radius)) = (
            captures.name("base"),
            captures.name("cutout"),
            field("ra"),
            field("dec"),
            field("radius"),
        ) {
            return (
                base.as_str(),
                Some(CutoutSpec {
                    kind: CutoutKind::Spatial { ra, dec, radius },
                    suffix: cutout.as_str().to_string(),
                }),
            );
        }
    }

    (pattern, None)
}

/// One concrete source produced by pattern expansion
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSource {
    /// Node or file path, without any cutout
    pub path: String,
    /// Cutout to request on transfer
    pub cutout: Option<CutoutSpec>,
}

impl ResolvedSource {
    /// A source with no cutout
    pub fn plain(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            cutout: None,
        }
    }

    /// Path handed to the transfer call, cutout re-attached
    pub fn transfer_path(&self) -> String {
        match &self.cutout {
            Some(cutout) => cutout.apply(&self.path),
            None => self.path.clone(),
        }
    }
}

impl fmt::Display for ResolvedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if let Some(cutout) = &self.cutout {
            write!(f, "{cutout}")?;
        }
        Ok(())
    }
}

/// Expands raw source arguments into concrete sources
#[derive(Debug, Clone, Copy)]
pub struct PatternResolver<'a> {
    storage: &'a Storage,
}

impl<'a> PatternResolver<'a> {
    /// Resolver over the given storage
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Expand one raw source argument. No match is an empty list, not an error.
    pub async fn resolve(&self, raw: &str) -> Result<Vec<ResolvedSource>> {
        if !self.storage.is_remote(raw) {
            return Ok(vec![ResolvedSource::plain(raw)]);
        }

        let (base, cutout) = split_cutout(raw);
        debug!("cutout: {:?}", cutout.as_ref().map(|c| c.suffix.as_str()));

        let matches = self.storage.remote().glob(base).await?;
        Ok(matches
            .into_iter()
            .map(|path| ResolvedSource {
                path,
                cutout: cutout.clone(),
            })
            .collect())
    }
}
