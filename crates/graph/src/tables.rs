//! Fixed table catalogue shared by the loader and every reader

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use wikigraph_codec::{
    I32Codec, I64Codec, IdListCodec, LabelCodec, LinkArrayCodec, PageCodec, PageLabelsCodec,
    StringCodec, StructureCodec, TranslationsCodec,
};
use wikigraph_store::Table;

pub type PageTable = Table<I32Codec, PageCodec>;
pub type LabelTable = Table<StringCodec, LabelCodec>;
pub type TitleTable = Table<StringCodec, I32Codec>;
pub type RedirectTable = Table<I32Codec, I32Codec>;
pub type IdListTable = Table<I32Codec, IdListCodec>;
pub type LinkTable = Table<I32Codec, LinkArrayCodec>;
pub type StructureTable = Table<I32Codec, StructureCodec>;
pub type TranslationTable = Table<I32Codec, TranslationsCodec>;
pub type StatisticsTable = Table<I32Codec, I64Codec>;
pub type PageLabelTable = Table<I32Codec, PageLabelsCodec>;

/// Every table the store may hold. Names and codecs must agree between the
/// writer and all readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TableName {
    /// page id → title and type
    Page,
    /// label text → statistics and senses
    Label,
    /// article title → page id (articles, redirects, disambiguations)
    ArticlesByTitle,
    /// category title → page id
    CategoriesByTitle,
    /// redirect id → target id
    RedirectTargetBySource,
    /// target id → redirect ids
    RedirectSourcesByTarget,
    /// page id → inbound link array
    PageLinksIn,
    /// page id → outbound link array
    PageLinksOut,
    /// category id → parent category ids
    CategoryParents,
    /// article id → parent category ids
    ArticleParents,
    /// category id → child category ids
    ChildCategories,
    /// category id → child article ids
    ChildArticles,
    /// page id → document structure tree
    Structure,
    /// page id → titles in other languages
    Translations,
    /// page id → labels used to refer to the page
    PageLabels,
    /// statistic ordinal → value
    Statistics,
}

impl TableName {
    pub const ALL: [TableName; 16] = [
        Self::Page,
        Self::Label,
        Self::ArticlesByTitle,
        Self::CategoriesByTitle,
        Self::RedirectTargetBySource,
        Self::RedirectSourcesByTarget,
        Self::PageLinksIn,
        Self::PageLinksOut,
        Self::CategoryParents,
        Self::ArticleParents,
        Self::ChildCategories,
        Self::ChildArticles,
        Self::Structure,
        Self::Translations,
        Self::PageLabels,
        Self::Statistics,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Label => "label",
            Self::ArticlesByTitle => "articlesByTitle",
            Self::CategoriesByTitle => "categoriesByTitle",
            Self::RedirectTargetBySource => "redirectTargetBySource",
            Self::RedirectSourcesByTarget => "redirectSourcesByTarget",
            Self::PageLinksIn => "pageLinksIn",
            Self::PageLinksOut => "pageLinksOut",
            Self::CategoryParents => "categoryParents",
            Self::ArticleParents => "articleParents",
            Self::ChildCategories => "childCategories",
            Self::ChildArticles => "childArticles",
            Self::Structure => "structure",
            Self::Translations => "translations",
            Self::PageLabels => "pageLabel",
            Self::Statistics => "statistics",
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown table '{s}'"))
    }
}

/// Corpus-wide scalars kept in the statistics table, keyed by ordinal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatisticName {
    ArticleCount,
    CategoryCount,
    DisambiguationCount,
    RedirectCount,
    /// Timestamp of the dump's last edit, in milliseconds
    LastEdit,
    MaxCategoryDepth,
    RootCategoryId,
}

impl StatisticName {
    pub const ALL: [StatisticName; 7] = [
        Self::ArticleCount,
        Self::CategoryCount,
        Self::DisambiguationCount,
        Self::RedirectCount,
        Self::LastEdit,
        Self::MaxCategoryDepth,
        Self::RootCategoryId,
    ];

    #[must_use]
    pub const fn ordinal(self) -> i32 {
        match self {
            Self::ArticleCount => 0,
            Self::CategoryCount => 1,
            Self::DisambiguationCount => 2,
            Self::RedirectCount => 3,
            Self::LastEdit => 4,
            Self::MaxCategoryDepth => 5,
            Self::RootCategoryId => 6,
        }
    }

    #[must_use]
    pub fn from_ordinal(ordinal: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.ordinal() == ordinal)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ArticleCount => "articleCount",
            Self::CategoryCount => "categoryCount",
            Self::DisambiguationCount => "disambiguationCount",
            Self::RedirectCount => "redirectCount",
            Self::LastEdit => "lastEdit",
            Self::MaxCategoryDepth => "maxCategoryDepth",
            Self::RootCategoryId => "rootCategoryId",
        }
    }

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for StatisticName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_parse_back() {
        for name in TableName::ALL {
            assert_eq!(name.as_str().parse::<TableName>(), Ok(name));
        }
        assert!("nope".parse::<TableName>().is_err());
    }

    #[test]
    fn table_names_serialize_like_display() {
        for name in TableName::ALL {
            let json = serde_json::to_string(&name).unwrap();
            assert_eq!(json, format!("\"{name}\""));
        }
    }

    #[test]
    fn statistic_ordinals_are_unique() {
        for stat in StatisticName::ALL {
            assert_eq!(StatisticName::from_ordinal(stat.ordinal()), Some(stat));
            assert_eq!(StatisticName::parse(stat.as_str()), Some(stat));
        }
        assert_eq!(StatisticName::from_ordinal(99), None);
    }
}
