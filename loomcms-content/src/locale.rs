//! Site locale configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::Result;
use crate::ids::LocaleId;

/// Locale capability consumed by the content service.
pub trait LocaleProvider: Send + Sync {
    /// The system's configured primary locale.
    fn primary_locale(&self) -> &LocaleId;

    /// Every locale the site serves, primary included.
    fn site_locales(&self) -> &[LocaleId];

    /// Whether cross-locale propagation has anything to do.
    fn is_multi_locale(&self) -> bool {
        self.site_locales().len() > 1
    }
}

/// The site's locale list, loadable from a `site.yaml` config file:
///
/// ```yaml
/// primary: en
/// locales:
///   - en
///   - fr
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteLocales {
    primary: LocaleId,
    #[serde(default)]
    locales: Vec<LocaleId>,
}

impl SiteLocales {
    /// Build from a primary locale and the full site list. The primary is
    /// added to the list if the config left it out.
    pub fn new(primary: LocaleId, locales: Vec<LocaleId>) -> Self {
        let mut locales = locales;
        if !locales.contains(&primary) {
            locales.insert(0, primary.clone());
        }
        Self { primary, locales }
    }

    /// A single-locale site.
    pub fn single(primary: LocaleId) -> Self {
        Self {
            primary: primary.clone(),
            locales: vec![primary],
        }
    }

    /// Load from a YAML config file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).await?;
        let parsed: SiteLocales = serde_yaml::from_str(&content)?;
        Ok(Self::new(parsed.primary, parsed.locales))
    }
}

impl LocaleProvider for SiteLocales {
    fn primary_locale(&self) -> &LocaleId {
        &self.primary
    }

    fn site_locales(&self) -> &[LocaleId] {
        &self.locales
    }
}
