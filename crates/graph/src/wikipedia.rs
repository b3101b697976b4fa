use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use wikigraph_codec::{
    Codec, I32Codec, I64Codec, IdListCodec, LabelCodec, LabelRecord, LinkArrayCodec, LinkLocation,
    LinkSlot, PageCodec, PageId, PageLabel, PageLabelsCodec, PageType, StringCodec, StructureCodec,
    StructureNode, Translation, TranslationsCodec,
};
use wikigraph_store::{OpenMode, StoreDir, Table};

use crate::error::Result;
use crate::links::{self, LinkDirection, LinkIntersection};
use crate::tables::{
    IdListTable, LabelTable, LinkTable, PageLabelTable, PageTable, RedirectTable, StatisticName,
    StatisticsTable, StructureTable, TableName, TitleTable, TranslationTable,
};

/// A page with its id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub id: PageId,
    pub title: String,
    pub page_type: PageType,
}

/// Read-only view over a built store.
///
/// The page table is required; every other table is optional and answers
/// with nothing when it was never loaded. One instance can be shared by any
/// number of threads.
pub struct Wikipedia {
    store: StoreDir,
    pub(crate) pages: PageTable,
    pub(crate) labels: Option<LabelTable>,
    pub(crate) articles_by_title: Option<TitleTable>,
    pub(crate) categories_by_title: Option<TitleTable>,
    pub(crate) redirect_target_by_source: Option<RedirectTable>,
    pub(crate) redirect_sources_by_target: Option<IdListTable>,
    pub(crate) links_in: Option<LinkTable>,
    pub(crate) links_out: Option<LinkTable>,
    pub(crate) category_parents: Option<IdListTable>,
    pub(crate) article_parents: Option<IdListTable>,
    pub(crate) child_categories: Option<IdListTable>,
    pub(crate) child_articles: Option<IdListTable>,
    pub(crate) structure: Option<StructureTable>,
    pub(crate) translations: Option<TranslationTable>,
    pub(crate) page_labels: Option<PageLabelTable>,
    pub(crate) statistics: Option<StatisticsTable>,
}

fn open_optional<KC: Codec, VC: Codec>(
    store: &StoreDir,
    name: TableName,
    keys: KC,
    values: VC,
) -> Result<Option<Table<KC, VC>>> {
    let table = store.table(name.as_str(), keys, values);
    match table.open(OpenMode::ReadOnly) {
        Ok(()) => Ok(Some(table)),
        Err(err) if err.is_missing() => {
            log::warn!("Table '{name}' not found; lookups against it return nothing");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

impl Wikipedia {
    /// Open every table read-only
    pub fn open(store: StoreDir) -> Result<Self> {
        log::info!("Opening wikigraph store at {}", store.root().display());
        let pages = store.table(TableName::Page.as_str(), I32Codec, PageCodec);
        pages.open(OpenMode::ReadOnly)?;

        Ok(Self {
            labels: open_optional(&store, TableName::Label, StringCodec, LabelCodec)?,
            articles_by_title: open_optional(
                &store,
                TableName::ArticlesByTitle,
                StringCodec,
                I32Codec,
            )?,
            categories_by_title: open_optional(
                &store,
                TableName::CategoriesByTitle,
                StringCodec,
                I32Codec,
            )?,
            redirect_target_by_source: open_optional(
                &store,
                TableName::RedirectTargetBySource,
                I32Codec,
                I32Codec,
            )?,
            redirect_sources_by_target: open_optional(
                &store,
                TableName::RedirectSourcesByTarget,
                I32Codec,
                IdListCodec,
            )?,
            links_in: open_optional(&store, TableName::PageLinksIn, I32Codec, LinkArrayCodec)?,
            links_out: open_optional(&store, TableName::PageLinksOut, I32Codec, LinkArrayCodec)?,
            category_parents: open_optional(
                &store,
                TableName::CategoryParents,
                I32Codec,
                IdListCodec,
            )?,
            article_parents: open_optional(
                &store,
                TableName::ArticleParents,
                I32Codec,
                IdListCodec,
            )?,
            child_categories: open_optional(
                &store,
                TableName::ChildCategories,
                I32Codec,
                IdListCodec,
            )?,
            child_articles: open_optional(
                &store,
                TableName::ChildArticles,
                I32Codec,
                IdListCodec,
            )?,
            structure: open_optional(&store, TableName::Structure, I32Codec, StructureCodec)?,
            translations: open_optional(
                &store,
                TableName::Translations,
                I32Codec,
                TranslationsCodec,
            )?,
            page_labels: open_optional(&store, TableName::PageLabels, I32Codec, PageLabelsCodec)?,
            statistics: open_optional(&store, TableName::Statistics, I32Codec, I64Codec)?,
            pages,
            store,
        })
    }

    #[must_use]
    pub fn store(&self) -> &StoreDir {
        &self.store
    }

    /// Tables that were found on disk
    #[must_use]
    pub fn available_tables(&self) -> Vec<TableName> {
        TableName::ALL
            .into_iter()
            .filter(|name| self.has_table(*name))
            .collect()
    }

    #[must_use]
    pub fn has_table(&self, name: TableName) -> bool {
        match name {
            TableName::Page => true,
            TableName::Label => self.labels.is_some(),
            TableName::ArticlesByTitle => self.articles_by_title.is_some(),
            TableName::CategoriesByTitle => self.categories_by_title.is_some(),
            TableName::RedirectTargetBySource => self.redirect_target_by_source.is_some(),
            TableName::RedirectSourcesByTarget => self.redirect_sources_by_target.is_some(),
            TableName::PageLinksIn => self.links_in.is_some(),
            TableName::PageLinksOut => self.links_out.is_some(),
            TableName::CategoryParents => self.category_parents.is_some(),
            TableName::ArticleParents => self.article_parents.is_some(),
            TableName::ChildCategories => self.child_categories.is_some(),
            TableName::ChildArticles => self.child_articles.is_some(),
            TableName::Structure => self.structure.is_some(),
            TableName::Translations => self.translations.is_some(),
            TableName::PageLabels => self.page_labels.is_some(),
            TableName::Statistics => self.statistics.is_some(),
        }
    }

    pub fn page(&self, id: PageId) -> Result<Option<Page>> {
        Ok(self.pages.get(&id)?.map(|record| Page {
            id,
            title: record.title.clone(),
            page_type: record.page_type,
        }))
    }

    /// Article (or redirect/disambiguation) with this exact title
    pub fn article_by_title(&self, title: &str) -> Result<Option<Page>> {
        self.page_via_title(self.articles_by_title.as_ref(), title)
    }

    pub fn category_by_title(&self, title: &str) -> Result<Option<Page>> {
        self.page_via_title(self.categories_by_title.as_ref(), title)
    }

    /// Article title first, then category title
    pub fn page_by_title(&self, title: &str) -> Result<Option<Page>> {
        if let Some(page) = self.article_by_title(title)? {
            return Ok(Some(page));
        }
        self.category_by_title(title)
    }

    fn page_via_title(&self, table: Option<&TitleTable>, title: &str) -> Result<Option<Page>> {
        let Some(table) = table else {
            return Ok(None);
        };
        match table.get(&title.to_string())? {
            Some(id) => self.page(*id),
            None => Ok(None),
        }
    }

    /// Immediate target of a redirect page
    pub fn redirect_target(&self, id: PageId) -> Result<Option<PageId>> {
        match &self.redirect_target_by_source {
            Some(table) => Ok(table.get(&id)?.map(|target| *target)),
            None => Ok(None),
        }
    }

    /// Follow redirects until a non-redirect page. Dangling chains and
    /// cycles resolve to `None`.
    pub fn resolve_redirect(&self, id: PageId) -> Result<Option<Page>> {
        let mut current = id;
        let mut seen = HashSet::new();
        loop {
            let Some(page) = self.page(current)? else {
                return Ok(None);
            };
            if page.page_type != PageType::Redirect {
                return Ok(Some(page));
            }
            if !seen.insert(current) {
                log::warn!("Redirect cycle through page {current}");
                return Ok(None);
            }
            let Some(target) = self.redirect_target(current)? else {
                return Ok(None);
            };
            current = target;
        }
    }

    pub fn label(&self, text: &str) -> Result<Option<Arc<LabelRecord>>> {
        match &self.labels {
            Some(table) => Ok(table.get(&text.to_string())?),
            None => Ok(None),
        }
    }

    /// Stored slot array of a page, shared with the table cache
    fn link_slots(&self, id: PageId, direction: LinkDirection) -> Result<Arc<Vec<LinkSlot>>> {
        let table = match direction {
            LinkDirection::In => &self.links_in,
            LinkDirection::Out => &self.links_out,
        };
        match table {
            Some(table) => Ok(table.get(&id)?.unwrap_or_default()),
            None => Ok(Arc::default()),
        }
    }

    /// Links of a page in one direction, sorted by neighbor id
    pub fn links(&self, id: PageId, direction: LinkDirection) -> Result<Vec<LinkLocation>> {
        Ok(self
            .link_slots(id, direction)?
            .iter()
            .filter_map(LinkSlot::as_link)
            .cloned()
            .collect())
    }

    pub fn links_in(&self, id: PageId) -> Result<Vec<LinkLocation>> {
        self.links(id, LinkDirection::In)
    }

    pub fn links_out(&self, id: PageId) -> Result<Vec<LinkLocation>> {
        self.links(id, LinkDirection::Out)
    }

    /// Neighbor ids in one direction
    pub fn neighbors(&self, id: PageId, direction: LinkDirection) -> Result<Vec<PageId>> {
        Ok(self
            .link_slots(id, direction)?
            .iter()
            .filter_map(LinkSlot::as_link)
            .map(|link| link.target)
            .collect())
    }

    /// Sentences of `source` that link to `target`, if it links at all
    pub fn mentions(&self, source: PageId, target: PageId) -> Result<Option<Vec<u32>>> {
        let out = self.link_slots(source, LinkDirection::Out)?;
        Ok(links::find_link(out.as_slice(), target).map(|link| link.sentences.clone()))
    }

    /// Sentences of `source` that link to every page in `targets`
    pub fn sentences_mentioning_all(
        &self,
        source: PageId,
        targets: &[PageId],
    ) -> Result<Vec<u32>> {
        let out = self.link_slots(source, LinkDirection::Out)?;
        Ok(links::sentences_mentioning_all(out.as_slice(), targets))
    }

    /// Merge-join two pages' link lists. Returns both list sizes with the
    /// intersection.
    pub fn intersect(
        &self,
        a: PageId,
        b: PageId,
        direction: LinkDirection,
    ) -> Result<(usize, usize, LinkIntersection)> {
        let slots_a = self.link_slots(a, direction)?;
        let slots_b = self.link_slots(b, direction)?;
        let (slots_a, slots_b) = (slots_a.as_slice(), slots_b.as_slice());
        let joined = links::intersect_links(a, slots_a, b, slots_b);
        Ok((links::link_count(slots_a), links::link_count(slots_b), joined))
    }

    pub fn structure(&self, id: PageId) -> Result<Option<Arc<StructureNode>>> {
        match &self.structure {
            Some(table) => Ok(table.get(&id)?),
            None => Ok(None),
        }
    }

    pub fn statistic(&self, name: StatisticName) -> Result<Option<i64>> {
        match &self.statistics {
            Some(table) => Ok(table.get(&name.ordinal())?.map(|value| *value)),
            None => Ok(None),
        }
    }

    /// Every statistic that has a stored value
    pub fn statistics(&self) -> Result<Vec<(StatisticName, i64)>> {
        let mut out = Vec::new();
        for name in StatisticName::ALL {
            if let Some(value) = self.statistic(name)? {
                out.push((name, value));
            }
        }
        Ok(out)
    }

    /// Backend estimate of the number of pages
    pub fn page_count_estimate(&self) -> Result<u64> {
        Ok(self.pages.len_estimate()?)
    }

    /// Parent categories of a category or an article
    pub fn parent_categories(&self, id: PageId) -> Result<Vec<PageId>> {
        let is_category = self
            .page(id)?
            .is_some_and(|page| page.page_type == PageType::Category);
        if is_category {
            id_list(self.category_parents.as_ref(), id)
        } else {
            id_list(self.article_parents.as_ref(), id)
        }
    }

    pub fn article_parents(&self, id: PageId) -> Result<Vec<PageId>> {
        id_list(self.article_parents.as_ref(), id)
    }

    pub fn child_categories(&self, id: PageId) -> Result<Vec<PageId>> {
        id_list(self.child_categories.as_ref(), id)
    }

    pub fn child_articles(&self, id: PageId) -> Result<Vec<PageId>> {
        id_list(self.child_articles.as_ref(), id)
    }

    /// Redirect pages pointing at `id`
    pub fn redirects_to(&self, id: PageId) -> Result<Vec<PageId>> {
        id_list(self.redirect_sources_by_target.as_ref(), id)
    }

    pub fn translations(&self, id: PageId) -> Result<Vec<Translation>> {
        match &self.translations {
            Some(table) => Ok(table
                .get(&id)?
                .map(|t| t.as_ref().clone())
                .unwrap_or_default()),
            None => Ok(Vec::new()),
        }
    }

    /// Texts used to refer to a page, most used first
    pub fn labels_for_page(&self, id: PageId) -> Result<Vec<PageLabel>> {
        match &self.page_labels {
            Some(table) => Ok(table
                .get(&id)?
                .map(|labels| labels.as_ref().clone())
                .unwrap_or_default()),
            None => Ok(Vec::new()),
        }
    }
}

fn id_list(table: Option<&IdListTable>, id: PageId) -> Result<Vec<PageId>> {
    match table {
        Some(table) => Ok(table
            .get(&id)?
            .map(|ids| ids.as_ref().clone())
            .unwrap_or_default()),
        None => Ok(Vec::new()),
    }
}

impl std::fmt::Debug for Wikipedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wikipedia")
            .field("root", &self.store.root())
            .field("tables", &self.available_tables())
            .finish()
    }
}
