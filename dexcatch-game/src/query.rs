//! Filtering and pagination over the collection.
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::collection::{Collection, CreatureRecord};
use crate::constants::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Caught,
    Uncaught,
    Shiny,
    Legendary,
}

impl StatusFilter {
    #[must_use]
    pub const fn matches(self, record: &CreatureRecord) -> bool {
        match self {
            Self::All => true,
            Self::Caught => record.caught,
            Self::Uncaught => !record.caught,
            Self::Shiny => record.caught && record.shiny,
            Self::Legendary => record.is_legendary,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "caught" => Ok(Self::Caught),
            "uncaught" => Ok(Self::Uncaught),
            "shiny" => Ok(Self::Shiny),
            "legendary" => Ok(Self::Legendary),
            other => Err(format!("unknown status filter: {other}")),
        }
    }
}

/// A page request. Pages are zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionQuery {
    /// Case-insensitive substring of the name, or an exact id.
    pub search: Option<String>,
    pub type_name: Option<String>,
    pub status: StatusFilter,
    pub page: usize,
    pub page_size: usize,
}

impl Default for CollectionQuery {
    fn default() -> Self {
        Self {
            search: None,
            type_name: None,
            status: StatusFilter::All,
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryPage {
    pub items: Vec<CreatureRecord>,
    pub page: usize,
    pub total_pages: usize,
    pub total_matches: usize,
}

impl CollectionQuery {
    fn matches(&self, record: &CreatureRecord) -> bool {
        if !self.status.matches(record) {
            return false;
        }
        if let Some(wanted) = self.type_name.as_deref().map(str::trim)
            && !wanted.is_empty()
            && !record.types.iter().any(|t| t.eq_ignore_ascii_case(wanted))
        {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                needle.trim_start_matches('#').parse::<u32>().ok() == Some(record.id)
                    || record
                        .name
                        .to_ascii_lowercase()
                        .contains(&needle.to_ascii_lowercase())
            }
        }
    }

    /// Matching records in id order, sliced to the requested page. An
    /// out-of-range page is clamped to the last one.
    #[must_use]
    pub fn run(&self, collection: &Collection) -> QueryPage {
        let matches: Vec<&CreatureRecord> =
            collection.records().filter(|r| self.matches(r)).collect();
        let page_size = self.page_size.max(1);
        let total_matches = matches.len();
        let total_pages = total_matches.div_ceil(page_size).max(1);
        let page = self.page.min(total_pages - 1);
        let items = matches
            .into_iter()
            .skip(page * page_size)
            .take(page_size)
            .cloned()
            .collect();
        QueryPage {
            items,
            page,
            total_pages,
            total_matches,
        }
    }
}
