//! Language resolution per site.
//!
//! [`LanguageRegistry`] is an immutable table of every site's languages and
//! base URL. Reloading builds a new registry; the content service swaps it
//! together with the rest of its configuration.

use std::collections::{HashMap, HashSet};

use cms_config::{LanguageEntry, SiteConfig};
use cms_storage::SiteId;
use serde::Serialize;

use crate::error::ContentError;
use crate::projection::SiteResolver;

/// A language as exposed to clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LanguageConfig {
    pub code: String,
    pub name: String,
    pub public: bool,
    pub redirect_on_fallback: bool,
    pub fallbacks: Vec<String>,
    pub hide_untranslated: bool,
}

impl From<&LanguageEntry> for LanguageConfig {
    fn from(entry: &LanguageEntry) -> Self {
        Self {
            code: entry.code.clone(),
            name: entry.name.clone(),
            public: entry.public,
            redirect_on_fallback: entry.redirect_on_fallback,
            fallbacks: entry.fallbacks.clone(),
            hide_untranslated: entry.hide_untranslated,
        }
    }
}

#[derive(Debug)]
struct SiteLanguages {
    base_url: String,
    languages: Vec<LanguageConfig>,
}

/// Languages and base URLs of every configured site.
#[derive(Debug, Default)]
pub struct LanguageRegistry {
    sites: HashMap<SiteId, SiteLanguages>,
}

impl LanguageRegistry {
    /// Build the registry from configured sites.
    #[must_use]
    pub fn new(sites: &[SiteConfig]) -> Self {
        let sites = sites
            .iter()
            .map(|site| {
                let entry = SiteLanguages {
                    base_url: format!("{}://{}", site.scheme, site.domain),
                    languages: site.languages.iter().map(LanguageConfig::from).collect(),
                };
                (site.id, entry)
            })
            .collect();
        Self { sites }
    }

    /// All languages configured for `site`, in declared order.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::Configuration`] if the site has no language
    /// configuration.
    pub fn languages(&self, site: SiteId) -> Result<Vec<LanguageConfig>, ContentError> {
        match self.sites.get(&site) {
            Some(entry) if !entry.languages.is_empty() => Ok(entry.languages.clone()),
            _ => Err(ContentError::Configuration(format!(
                "no languages configured for site {site}"
            ))),
        }
    }

    /// Look up a configured language.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::NotFound`] if `code` is not configured for the
    /// site, or [`ContentError::Configuration`] if the site has no languages.
    pub fn resolve(&self, site: SiteId, code: &str) -> Result<LanguageConfig, ContentError> {
        self.languages(site)?
            .into_iter()
            .find(|language| language.code == code)
            .ok_or_else(|| ContentError::NotFound(format!("language {code} on site {site}")))
    }

    /// Look up a language that is enabled for public endpoints.
    ///
    /// # Errors
    ///
    /// Same as [`LanguageRegistry::resolve`], plus [`ContentError::NotFound`]
    /// when the language exists but is not public.
    pub fn resolve_public(&self, site: SiteId, code: &str) -> Result<LanguageConfig, ContentError> {
        let language = self.resolve(site, code)?;
        if !language.public {
            return Err(ContentError::NotFound(format!(
                "language {code} on site {site} is not public"
            )));
        }
        Ok(language)
    }

    /// The requested language followed by its fallbacks in declared order.
    ///
    /// Unknown fallback codes and repeats are skipped.
    ///
    /// # Errors
    ///
    /// Same as [`LanguageRegistry::resolve`] for the requested code.
    pub fn fallback_chain(
        &self,
        site: SiteId,
        code: &str,
    ) -> Result<Vec<LanguageConfig>, ContentError> {
        let languages = self.languages(site)?;
        let requested = languages
            .iter()
            .find(|language| language.code == code)
            .ok_or_else(|| ContentError::NotFound(format!("language {code} on site {site}")))?;

        let mut seen = HashSet::from([requested.code.as_str()]);
        let mut chain = vec![requested.clone()];
        for fallback in &requested.fallbacks {
            if !seen.insert(fallback.as_str()) {
                continue;
            }
            if let Some(language) = languages.iter().find(|l| &l.code == fallback) {
                chain.push(language.clone());
            }
        }
        Ok(chain)
    }
}

impl SiteResolver for LanguageRegistry {
    fn base_url(&self, site: SiteId) -> Option<String> {
        self.sites.get(&site).map(|entry| entry.base_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn entry(code: &str, public: bool, fallbacks: &[&str]) -> LanguageEntry {
        LanguageEntry {
            code: code.to_owned(),
            name: code.to_uppercase(),
            public,
            fallbacks: fallbacks.iter().map(|s| (*s).to_owned()).collect(),
            hide_untranslated: false,
            redirect_on_fallback: true,
        }
    }

    fn site(id: u32, languages: Vec<LanguageEntry>) -> SiteConfig {
        SiteConfig {
            id,
            domain: "example.com".to_owned(),
            scheme: "https".to_owned(),
            languages,
        }
    }

    fn registry() -> LanguageRegistry {
        LanguageRegistry::new(&[
            site(
                1,
                vec![
                    entry("en", true, &["de"]),
                    entry("de", true, &["en", "xx", "en"]),
                    entry("fr", false, &["en"]),
                ],
            ),
            site(2, vec![]),
        ])
    }

    #[test]
    fn test_resolve_public_language() {
        let registry = registry();
        assert_eq!(registry.resolve_public(1, "en").unwrap().code, "en");
        assert_eq!(registry.resolve_public(1, "de").unwrap().code, "de");
    }

    #[test]
    fn test_non_public_language_is_not_found_publicly() {
        let registry = registry();
        assert_eq!(registry.resolve(1, "fr").unwrap().code, "fr");
        assert!(matches!(
            registry.resolve_public(1, "fr"),
            Err(ContentError::NotFound(_))
        ));
    }

    #[test]
    fn test_unknown_language_is_not_found() {
        assert!(matches!(
            registry().resolve(1, "es"),
            Err(ContentError::NotFound(_))
        ));
    }

    #[test]
    fn test_site_without_languages_is_configuration_error() {
        let registry = registry();
        assert!(matches!(
            registry.languages(2),
            Err(ContentError::Configuration(_))
        ));
        assert!(matches!(
            registry.languages(99),
            Err(ContentError::Configuration(_))
        ));
    }

    #[test]
    fn test_languages_keep_declared_order() {
        let codes: Vec<_> = registry()
            .languages(1)
            .unwrap()
            .into_iter()
            .map(|l| l.code)
            .collect();
        assert_eq!(codes, vec!["en", "de", "fr"]);
    }

    #[test]
    fn test_fallback_chain_skips_unknown_and_duplicates() {
        let codes: Vec<_> = registry()
            .fallback_chain(1, "de")
            .unwrap()
            .into_iter()
            .map(|l| l.code)
            .collect();
        assert_eq!(codes, vec!["de", "en"]);
    }

    #[test]
    fn test_base_url() {
        let registry = registry();
        assert_eq!(registry.base_url(1).as_deref(), Some("https://example.com"));
        assert_eq!(registry.base_url(3), None);
    }
}
