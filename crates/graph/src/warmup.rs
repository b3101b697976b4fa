//! Warm-up: materialize selected tables in memory, pruned to popular pages.

use serde::Serialize;
use std::collections::HashSet;
use wikigraph_codec::{Codec, LinkSlot, PageId, PageType};
use wikigraph_store::Table;

use crate::config::CacheConfig;
use crate::error::{GraphError, Result};
use crate::tables::TableName;
use crate::wikipedia::Wikipedia;

/// Rows kept per cached table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedTable {
    pub table: TableName,
    pub rows: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WarmUpReport {
    /// Size of the popular-page set, when pruning was requested
    pub valid_ids: Option<usize>,
    pub tables: Vec<CachedTable>,
    /// Requested tables that are not in the store
    pub skipped: Vec<TableName>,
}

/// Page ids allowed through the cache filters; `None` allows everything
#[derive(Clone, Copy)]
struct Validity<'a>(Option<&'a HashSet<PageId>>);

impl Validity<'_> {
    fn allows(self, id: PageId) -> bool {
        self.0.map_or(true, |valid| valid.contains(&id))
    }

    fn prune_ids(self, mut ids: Vec<PageId>) -> Vec<PageId> {
        ids.retain(|id| self.allows(*id));
        ids
    }

    /// Keep only links to valid pages; holes are dropped as well
    fn prune_links(self, slots: Vec<LinkSlot>) -> Option<Vec<LinkSlot>> {
        let kept: Vec<LinkSlot> = slots
            .into_iter()
            .filter(|slot| slot.as_link().is_some_and(|link| self.allows(link.target)))
            .collect();
        (!kept.is_empty()).then_some(kept)
    }
}

impl Wikipedia {
    /// Pages with more than `min_links_in` inbound links
    pub fn popular_pages(&self, min_links_in: u32) -> Result<Option<HashSet<PageId>>> {
        let Some(links_in) = &self.links_in else {
            log::warn!("Cannot prune by popularity: '{}' is missing", TableName::PageLinksIn);
            return Ok(None);
        };
        let threshold = min_links_in as usize;
        let mut valid = HashSet::new();
        for row in links_in.iterate()? {
            let (id, slots) = row?;
            let count = slots.iter().filter(|slot| slot.as_link().is_some()).count();
            if count > threshold {
                valid.insert(id);
            }
        }
        log::info!(
            "{} pages have more than {} inbound links",
            valid.len(),
            min_links_in
        );
        Ok(Some(valid))
    }

    /// Cache the configured tables. Distinct tables are cached in parallel.
    pub fn warm_up(&self, config: &CacheConfig) -> Result<WarmUpReport> {
        config.validate().map_err(GraphError::Other)?;

        let valid = if config.prunes() {
            self.popular_pages(config.min_links_in)?
        } else {
            None
        };
        let validity = Validity(valid.as_ref());

        let outcomes: Vec<(TableName, Result<Option<usize>>)> = std::thread::scope(|scope| {
            let handles: Vec<_> = config
                .tables
                .iter()
                .map(|name| {
                    let name = *name;
                    (name, scope.spawn(move || self.cache_table(name, validity)))
                })
                .collect();
            handles
                .into_iter()
                .map(|(name, handle)| {
                    let outcome = handle.join().unwrap_or_else(|_| {
                        Err(GraphError::Other(format!("caching '{name}' panicked")))
                    });
                    (name, outcome)
                })
                .collect()
        });

        let mut report = WarmUpReport {
            valid_ids: valid.as_ref().map(HashSet::len),
            ..WarmUpReport::default()
        };
        for (table, outcome) in outcomes {
            match outcome? {
                Some(rows) => report.tables.push(CachedTable { table, rows }),
                None => report.skipped.push(table),
            }
        }
        Ok(report)
    }

    fn cache_table(&self, name: TableName, valid: Validity<'_>) -> Result<Option<usize>> {
        match name {
            TableName::Page => {
                let rows = self.pages.cache(|id, page| {
                    let structural =
                        matches!(page.page_type, PageType::Category | PageType::Redirect);
                    (structural || valid.allows(*id)).then_some(page)
                })?;
                Ok(Some(rows))
            }
            TableName::Label => cache_optional(self.labels.as_ref(), name, |_, mut label| {
                label.senses.retain(|sense| valid.allows(sense.page_id));
                Some(label)
            }),
            TableName::ArticlesByTitle => {
                cache_optional(self.articles_by_title.as_ref(), name, |_, id| {
                    valid.allows(id).then_some(id)
                })
            }
            TableName::CategoriesByTitle => {
                cache_optional(self.categories_by_title.as_ref(), name, |_, id| Some(id))
            }
            TableName::RedirectTargetBySource => {
                cache_optional(self.redirect_target_by_source.as_ref(), name, |_, target| {
                    valid.allows(target).then_some(target)
                })
            }
            TableName::RedirectSourcesByTarget => {
                cache_optional(self.redirect_sources_by_target.as_ref(), name, |id, ids| {
                    valid.allows(*id).then_some(ids)
                })
            }
            TableName::PageLinksIn => cache_optional(self.links_in.as_ref(), name, |id, slots| {
                if valid.allows(*id) {
                    valid.prune_links(slots)
                } else {
                    None
                }
            }),
            TableName::PageLinksOut => {
                cache_optional(self.links_out.as_ref(), name, |id, slots| {
                    if valid.allows(*id) {
                        valid.prune_links(slots)
                    } else {
                        None
                    }
                })
            }
            TableName::CategoryParents => {
                cache_optional(self.category_parents.as_ref(), name, |_, ids| Some(ids))
            }
            TableName::ArticleParents => {
                cache_optional(self.article_parents.as_ref(), name, |id, ids| {
                    valid.allows(*id).then_some(ids)
                })
            }
            TableName::ChildCategories => {
                cache_optional(self.child_categories.as_ref(), name, |_, ids| Some(ids))
            }
            TableName::ChildArticles => {
                cache_optional(self.child_articles.as_ref(), name, |_, ids| {
                    Some(valid.prune_ids(ids))
                })
            }
            TableName::Structure => cache_optional(self.structure.as_ref(), name, |id, tree| {
                valid.allows(*id).then_some(tree)
            }),
            TableName::Translations => {
                cache_optional(self.translations.as_ref(), name, |id, translations| {
                    valid.allows(*id).then_some(translations)
                })
            }
            TableName::PageLabels => {
                cache_optional(self.page_labels.as_ref(), name, |id, labels| {
                    valid.allows(*id).then_some(labels)
                })
            }
            TableName::Statistics => {
                cache_optional(self.statistics.as_ref(), name, |_, value| Some(value))
            }
        }
    }
}

fn cache_optional<KC, VC, F>(
    table: Option<&Table<KC, VC>>,
    name: TableName,
    filter: F,
) -> Result<Option<usize>>
where
    KC: Codec,
    VC: Codec,
    F: FnMut(&KC::Value, VC::Value) -> Option<VC::Value>,
{
    match table {
        Some(table) => Ok(Some(table.cache(filter)?)),
        None => {
            log::warn!("Skipping cache of '{name}': table not in store");
            Ok(None)
        }
    }
}
