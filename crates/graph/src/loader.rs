//! Bulk loader: tab-separated relation files → store tables.
//!
//! File formats (one record per line, `#` comments and blank lines ignored):
//!
//! ```text
//! page.tsv                     id  title  type
//! label.tsv                    text  docCount  occCount  linkDocCount  linkOccCount  senses
//!                              senses = id:linkDocCount:linkOccCount[:T|R|TR];...
//! pageLinkIn.tsv / Out.tsv     id  links      links = id[:s1,s2,...];...
//! categoryParents.tsv ...      id  id,id,...
//! redirectTargetsBySource.tsv  source  target
//! structure.tsv                id  structure-string
//! translations.tsv             id  lang  title  [lang  title ...]
//! pageLabel.tsv                id  text  linkDocCount  linkOccCount  flags  [text ...]
//!                              flags = any of T (title), R (redirect), P (primary), or -
//! stats.tsv                    name  value
//! ```

use serde::Serialize;
use std::cell::Cell;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use wikigraph_codec::{
    Codec, I32Codec, I64Codec, IdListCodec, LabelCodec, LabelRecord, LinkArrayCodec, LinkLocation,
    LinkSlot, PageCodec, PageId, PageLabel, PageLabelsCodec, PageRecord, PageType, SenseRecord,
    StringCodec, StructureCodec, Translation, TranslationsCodec,
};
use wikigraph_store::{OpenMode, StoreDir, StoreError};

use crate::error::LoadError;
use crate::links::normalize_links;
use crate::structure::parse_structure;
use crate::tables::{StatisticName, TableName};

/// What to do with tables that already exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Drop and rebuild every table that has a data file
    Overwrite,
    /// Leave existing tables untouched
    #[default]
    Preserve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableOutcome {
    Loaded,
    Preserved,
    MissingFile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedTable {
    pub table: TableName,
    pub file: String,
    pub outcome: TableOutcome,
    pub rows: usize,
}

/// Rows written per table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub tables: Vec<LoadedTable>,
}

impl LoadReport {
    #[must_use]
    pub fn rows(&self, table: TableName) -> Option<usize> {
        self.tables
            .iter()
            .find(|t| t.table == table && t.outcome == TableOutcome::Loaded)
            .map(|t| t.rows)
    }

    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

/// Called with the table being loaded and the rows committed so far
pub type ProgressFn = Arc<dyn Fn(TableName, usize) + Send + Sync>;

type ParseResult<T> = std::result::Result<T, String>;

pub struct Loader {
    store: StoreDir,
    data_dir: PathBuf,
    mode: LoadMode,
    progress: Option<ProgressFn>,
}

impl Loader {
    pub fn new(store: StoreDir, data_dir: impl Into<PathBuf>, mode: LoadMode) -> Self {
        Self {
            store,
            data_dir: data_dir.into(),
            mode,
            progress: None,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Load every relation file found in the data directory
    pub fn load_all(&self) -> Result<LoadReport, LoadError> {
        if !self.data_dir.is_dir() {
            return Err(LoadError::MissingDataDir(self.data_dir.clone()));
        }
        let _lock = self.store.lock_for_writing()?;
        log::info!(
            "Loading {} into {} ({:?})",
            self.data_dir.display(),
            self.store.root().display(),
            self.mode
        );

        let mut report = LoadReport::default();
        let mut record = |table: TableName, file: &str, loaded: Option<(TableOutcome, usize)>| {
            let (outcome, rows) = loaded.unwrap_or((TableOutcome::MissingFile, 0));
            report.tables.push(LoadedTable {
                table,
                file: file.to_string(),
                outcome,
                rows,
            });
        };

        record(
            TableName::Statistics,
            STATS_FILE,
            self.load(TableName::Statistics, STATS_FILE, I32Codec, I64Codec, parse_statistic)?,
        );
        record(
            TableName::Page,
            PAGE_FILE,
            self.load(TableName::Page, PAGE_FILE, I32Codec, PageCodec, parse_page)?,
        );
        record(
            TableName::ArticlesByTitle,
            PAGE_FILE,
            self.load(
                TableName::ArticlesByTitle,
                PAGE_FILE,
                StringCodec,
                I32Codec,
                |line| title_entry(line, |ty| ty != PageType::Category),
            )?,
        );
        record(
            TableName::CategoriesByTitle,
            PAGE_FILE,
            self.load(
                TableName::CategoriesByTitle,
                PAGE_FILE,
                StringCodec,
                I32Codec,
                |line| title_entry(line, |ty| ty == PageType::Category),
            )?,
        );
        record(
            TableName::Label,
            LABEL_FILE,
            self.load(TableName::Label, LABEL_FILE, StringCodec, LabelCodec, parse_label)?,
        );
        record(
            TableName::PageLabels,
            PAGE_LABEL_FILE,
            self.load(
                TableName::PageLabels,
                PAGE_LABEL_FILE,
                I32Codec,
                PageLabelsCodec,
                parse_page_labels,
            )?,
        );
        for (table, file) in [
            (TableName::PageLinksIn, LINKS_IN_FILE),
            (TableName::PageLinksOut, LINKS_OUT_FILE),
        ] {
            record(
                table,
                file,
                self.load(table, file, I32Codec, LinkArrayCodec, parse_links)?,
            );
        }
        for (table, file) in [
            (TableName::CategoryParents, "categoryParents.tsv"),
            (TableName::ArticleParents, "articleParents.tsv"),
            (TableName::ChildCategories, "childCategories.tsv"),
            (TableName::ChildArticles, "childArticles.tsv"),
            (TableName::RedirectSourcesByTarget, "redirectSourcesByTarget.tsv"),
        ] {
            record(
                table,
                file,
                self.load(table, file, I32Codec, IdListCodec, parse_id_list)?,
            );
        }
        record(
            TableName::RedirectTargetBySource,
            REDIRECT_TARGETS_FILE,
            self.load(
                TableName::RedirectTargetBySource,
                REDIRECT_TARGETS_FILE,
                I32Codec,
                I32Codec,
                parse_redirect,
            )?,
        );
        record(
            TableName::Structure,
            STRUCTURE_FILE,
            self.load(
                TableName::Structure,
                STRUCTURE_FILE,
                I32Codec,
                StructureCodec,
                parse_structure_row,
            )?,
        );
        record(
            TableName::Translations,
            TRANSLATIONS_FILE,
            self.load(
                TableName::Translations,
                TRANSLATIONS_FILE,
                I32Codec,
                TranslationsCodec,
                parse_translations,
            )?,
        );

        log::info!("Load finished: {} rows", report.total_rows());
        Ok(report)
    }

    /// Load one table from one file. `None` means the file is absent.
    fn load<KC, VC, P>(
        &self,
        table: TableName,
        file: &str,
        keys: KC,
        values: VC,
        mut parse: P,
    ) -> Result<Option<(TableOutcome, usize)>, LoadError>
    where
        KC: Codec,
        VC: Codec,
        P: FnMut(&str) -> ParseResult<Option<(KC::Value, VC::Value)>>,
    {
        let path = self.data_dir.join(file);
        if !path.is_file() {
            log::warn!("Skipping '{table}': {} not found", path.display());
            return Ok(None);
        }
        if self.mode == LoadMode::Preserve && self.store.exists(table.as_str()) {
            log::info!("Keeping existing table '{table}'");
            return Ok(Some((TableOutcome::Preserved, 0)));
        }

        log::info!("Loading '{table}' from {}", path.display());
        let reader = BufReader::new(File::open(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?);

        let handle = self.store.table(table.as_str(), keys, values);
        handle.open(OpenMode::CreateOrTruncate)?;

        let current_line = Cell::new(0usize);
        let mut failure: Option<LoadError> = None;
        let rows = RowSource {
            lines: reader.lines(),
            path: &path,
            current_line: &current_line,
            failure: &mut failure,
            parse: &mut parse,
            row: PhantomData,
        };

        let progress = self.progress.clone();
        let written = handle.bulk_put_with_progress(rows, |n| {
            if let Some(progress) = &progress {
                progress(table, n);
            }
        });

        let outcome = match (written, failure) {
            (_, Some(err)) => Err(err),
            (Err(StoreError::Encode { source, .. }), None) => Err(LoadError::Malformed {
                file: path.clone(),
                line: current_line.get(),
                reason: source.to_string(),
            }),
            (Err(err), None) => Err(err.into()),
            (Ok(rows), None) => Ok(rows),
        };

        match outcome {
            Ok(rows) => {
                handle.close()?;
                log::info!("Loaded {rows} rows into '{table}'");
                Ok(Some((TableOutcome::Loaded, rows)))
            }
            Err(err) => {
                log::warn!("Discarding partially loaded table '{table}'");
                handle.destroy()?;
                Err(err)
            }
        }
    }
}

const STATS_FILE: &str = "stats.tsv";
const PAGE_FILE: &str = "page.tsv";
const LABEL_FILE: &str = "label.tsv";
const PAGE_LABEL_FILE: &str = "pageLabel.tsv";
const LINKS_IN_FILE: &str = "pageLinkIn.tsv";
const LINKS_OUT_FILE: &str = "pageLinkOut.tsv";
const REDIRECT_TARGETS_FILE: &str = "redirectTargetsBySource.tsv";
const STRUCTURE_FILE: &str = "structure.tsv";
const TRANSLATIONS_FILE: &str = "translations.tsv";

/// Parses lines lazily, parking the first failure and ending the stream
struct RowSource<'a, L, P, K, V> {
    lines: L,
    path: &'a Path,
    current_line: &'a Cell<usize>,
    failure: &'a mut Option<LoadError>,
    parse: &'a mut P,
    row: PhantomData<fn() -> (K, V)>,
}

impl<L, P, K, V> Iterator for RowSource<'_, L, P, K, V>
where
    L: Iterator<Item = std::io::Result<String>>,
    P: FnMut(&str) -> ParseResult<Option<(K, V)>>,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.failure.is_some() {
            return None;
        }
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(source) => {
                    *self.failure = Some(LoadError::Io {
                        path: self.path.to_path_buf(),
                        source,
                    });
                    return None;
                }
            };
            let number = self.current_line.get() + 1;
            self.current_line.set(number);

            let trimmed = line.trim_end_matches(['\r', '\n']);
            if trimmed.trim().is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match (self.parse)(trimmed) {
                Ok(Some(row)) => return Some(row),
                Ok(None) => continue,
                Err(reason) => {
                    *self.failure = Some(LoadError::Malformed {
                        file: self.path.to_path_buf(),
                        line: number,
                        reason,
                    });
                    return None;
                }
            }
        }
    }
}

fn columns(line: &str, expected: usize) -> ParseResult<Vec<&str>> {
    let cols: Vec<&str> = line.split('\t').collect();
    if cols.len() != expected {
        return Err(format!("expected {expected} columns, found {}", cols.len()));
    }
    Ok(cols)
}

fn number<T: FromStr>(value: &str, what: &str) -> ParseResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err| format!("bad {what} '{value}': {err}"))
}

fn page_id(value: &str) -> ParseResult<PageId> {
    number(value, "page id")
}

fn parse_page_columns(line: &str) -> ParseResult<(PageId, PageRecord)> {
    let cols = columns(line, 3)?;
    let id = page_id(cols[0])?;
    let page_type =
        PageType::parse(cols[2]).ok_or_else(|| format!("unknown page type '{}'", cols[2]))?;
    Ok((id, PageRecord::new(cols[1], page_type)))
}

fn parse_page(line: &str) -> ParseResult<Option<(PageId, PageRecord)>> {
    parse_page_columns(line).map(Some)
}

fn title_entry(
    line: &str,
    keep: impl Fn(PageType) -> bool,
) -> ParseResult<Option<(String, PageId)>> {
    let (id, page) = parse_page_columns(line)?;
    Ok(keep(page.page_type).then_some((page.title, id)))
}

fn parse_statistic(line: &str) -> ParseResult<Option<(i32, i64)>> {
    let cols = columns(line, 2)?;
    let Some(name) = StatisticName::parse(cols[0]) else {
        log::warn!("Ignoring unknown statistic '{}'", cols[0]);
        return Ok(None);
    };
    Ok(Some((name.ordinal(), number(cols[1], "statistic value")?)))
}

fn parse_sense(entry: &str) -> ParseResult<SenseRecord> {
    let parts: Vec<&str> = entry.split(':').collect();
    if !(3..=4).contains(&parts.len()) {
        return Err(format!("sense '{entry}' is not id:linkDocCount:linkOccCount[:flags]"));
    }
    let flags = parts.get(3).copied().unwrap_or("");
    if let Some(bad) = flags.chars().find(|c| !matches!(c, 'T' | 'R')) {
        return Err(format!("unknown sense flag '{bad}'"));
    }
    Ok(SenseRecord {
        page_id: page_id(parts[0])?,
        link_doc_count: number(parts[1], "sense link doc count")?,
        link_occ_count: number(parts[2], "sense link occurrence count")?,
        from_title: flags.contains('T'),
        from_redirect: flags.contains('R'),
    })
}

fn parse_label(line: &str) -> ParseResult<Option<(String, LabelRecord)>> {
    let cols = columns(line, 6)?;
    let mut senses = cols[5]
        .split(';')
        .filter(|entry| !entry.trim().is_empty())
        .map(parse_sense)
        .collect::<ParseResult<Vec<_>>>()?;
    // Most frequently linked sense first; ties broken by id for a stable order.
    senses.sort_by(|a, b| {
        b.link_occ_count
            .cmp(&a.link_occ_count)
            .then(a.page_id.cmp(&b.page_id))
    });
    if let Some(pair) = senses.windows(2).find(|p| p[0].page_id == p[1].page_id) {
        return Err(format!("sense {} listed twice", pair[0].page_id));
    }

    let label = LabelRecord {
        doc_count: number(cols[1], "doc count")?,
        occ_count: number(cols[2], "occurrence count")?,
        link_doc_count: number(cols[3], "link doc count")?,
        link_occ_count: number(cols[4], "link occurrence count")?,
        senses,
    };
    Ok(Some((cols[0].to_string(), label)))
}

fn parse_page_label(cols: &[&str]) -> ParseResult<PageLabel> {
    let flags = match cols[3].trim() {
        "-" => "",
        flags => flags,
    };
    if let Some(bad) = flags.chars().find(|c| !matches!(c, 'T' | 'R' | 'P')) {
        return Err(format!("unknown page label flag '{bad}'"));
    }
    if cols[0].is_empty() {
        return Err("empty page label text".to_string());
    }
    Ok(PageLabel {
        text: cols[0].to_string(),
        link_doc_count: number(cols[1], "page label link doc count")?,
        link_occ_count: number(cols[2], "page label link occurrence count")?,
        from_title: flags.contains('T'),
        from_redirect: flags.contains('R'),
        is_primary: flags.contains('P'),
    })
}

fn parse_page_labels(line: &str) -> ParseResult<Option<(PageId, Vec<PageLabel>)>> {
    let cols: Vec<&str> = line.split('\t').collect();
    if cols.len() < 5 || (cols.len() - 1) % 4 != 0 {
        return Err("expected an id followed by text/linkDocCount/linkOccCount/flags groups".into());
    }
    let mut labels = cols[1..]
        .chunks(4)
        .map(parse_page_label)
        .collect::<ParseResult<Vec<_>>>()?;
    labels.sort_by(|a, b| {
        b.link_occ_count
            .cmp(&a.link_occ_count)
            .then_with(|| a.text.cmp(&b.text))
    });
    if let Some(pair) = labels.windows(2).find(|p| p[0].text == p[1].text) {
        return Err(format!("page label '{}' listed twice", pair[0].text));
    }
    Ok(Some((page_id(cols[0])?, labels)))
}

fn parse_link(entry: &str) -> ParseResult<LinkLocation> {
    let (target, sentences) = match entry.split_once(':') {
        Some((target, sentences)) => (target, sentences),
        None => (entry, ""),
    };
    let sentences = sentences
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| number::<u32>(s, "sentence index"))
        .collect::<ParseResult<Vec<_>>>()?;
    LinkLocation::new(page_id(target)?, sentences).map_err(|err| err.to_string())
}

fn parse_links(line: &str) -> ParseResult<Option<(PageId, Vec<LinkSlot>)>> {
    let cols = columns(line, 2)?;
    let id = page_id(cols[0])?;
    let links = cols[1]
        .split(';')
        .filter(|entry| !entry.trim().is_empty())
        .map(parse_link)
        .collect::<ParseResult<Vec<_>>>()?;
    let links = normalize_links(id, links).map_err(|err| err.to_string())?;
    Ok(Some((id, links.into_iter().map(LinkSlot::Link).collect())))
}

fn parse_id_list(line: &str) -> ParseResult<Option<(PageId, Vec<PageId>)>> {
    let cols = columns(line, 2)?;
    let ids = cols[1]
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(page_id)
        .collect::<ParseResult<Vec<_>>>()?;
    Ok(Some((page_id(cols[0])?, ids)))
}

fn parse_redirect(line: &str) -> ParseResult<Option<(PageId, PageId)>> {
    let cols = columns(line, 2)?;
    Ok(Some((page_id(cols[0])?, page_id(cols[1])?)))
}

fn parse_structure_row(
    line: &str,
) -> ParseResult<Option<(PageId, wikigraph_codec::StructureNode)>> {
    let cols = columns(line, 2)?;
    let tree = parse_structure(cols[1]).map_err(|err| err.to_string())?;
    Ok(Some((page_id(cols[0])?, tree)))
}

fn parse_translations(line: &str) -> ParseResult<Option<(PageId, Vec<Translation>)>> {
    let cols: Vec<&str> = line.split('\t').collect();
    if cols.len() < 3 || cols.len() % 2 == 0 {
        return Err("expected an id followed by language/title pairs".to_string());
    }
    let translations = cols[1..]
        .chunks(2)
        .map(|pair| Translation {
            language: pair[0].to_string(),
            title: pair[1].to_string(),
        })
        .collect();
    Ok(Some((page_id(cols[0])?, translations)))
}
