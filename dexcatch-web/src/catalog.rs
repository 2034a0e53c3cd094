//! Catalog access over the browser `fetch` API.
use async_trait::async_trait;
use dexcatch_game::{
    CatalogEntry, CatalogError, CatalogSource, DEFAULT_CATALOG_BASE, SpeciesEntry, creature_url,
};

use crate::dom;

#[derive(Debug, Clone)]
pub struct FetchCatalog {
    base: String,
}

impl Default for FetchCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_CATALOG_BASE)
    }
}

impl FetchCatalog {
    #[must_use]
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    async fn get_text(url: &str) -> Result<String, CatalogError> {
        let response = dom::fetch_response(url)
            .await
            .map_err(|err| CatalogError::Network(dom::js_error_message(&err)))?;
        if !response.ok() {
            return Err(CatalogError::Status(response.status()));
        }
        dom::response_text(&response)
            .await
            .map_err(|err| CatalogError::Network(dom::js_error_message(&err)))
    }
}

#[async_trait(?Send)]
impl CatalogSource for FetchCatalog {
    async fn creature(&self, id: u32) -> Result<CatalogEntry, CatalogError> {
        let body = Self::get_text(&creature_url(&self.base, id)).await?;
        CatalogEntry::from_json(&body)
    }

    async fn species(&self, entry: &CatalogEntry) -> Result<SpeciesEntry, CatalogError> {
        let url = entry
            .species_url()
            .ok_or(CatalogError::NotFound(entry.id))?;
        let body = Self::get_text(url).await?;
        SpeciesEntry::from_json(&body)
    }
}
