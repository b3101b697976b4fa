#![allow(dead_code)]

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use wikigraph_graph::{LoadMode, LoadReport, Loader, Wikipedia};
use wikigraph_store::{StoreConfig, StoreDir};

pub const PAGES: &str = "\
# id\ttitle\ttype
1\tKiwi\tdisambiguation
2\tKiwi (bird)\tarticle
3\tKiwifruit\tarticle
4\tNew Zealand\tarticle
5\tConservation\tarticle
6\tBirds\tcategory
7\tChinese gooseberry\tredirect
8\tLoop A\tredirect
9\tLoop B\tredirect
10\tFruit\tcategory
";

pub const LABELS: &str = "\
Kiwi\t50\t120\t30\t60\t2:25:45:T;3:10:15
New Zealand\t80\t200\t70\t150\t4:70:150:T
conservation\t40\t55\t12\t14\t5:12:14:T
";

pub const PAGE_LABELS: &str = "\
2\tKiwi\t25\t45\tTP\tkiwi bird\t1\t2\t-
3\tKiwi\t10\t15\t-\tKiwifruit\t9\t20\tT\tChinese gooseberry\t3\t4\tR
4\tNew Zealand\t70\t150\tTP
";

pub const LINKS_IN: &str = "\
2\t4:0,2;5:1
3\t4:3
4\t2:0,2;3:1;5:0
5\t2:1;4:4
";

pub const LINKS_OUT: &str = "\
2\t4:0,2;5:1
3\t4:1
4\t2:0;3:3;5:4
5\t2:0;4:0
";

pub fn write_corpus(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    let files = [
        ("page.tsv", PAGES),
        ("label.tsv", LABELS),
        ("pageLabel.tsv", PAGE_LABELS),
        ("pageLinkIn.tsv", LINKS_IN),
        ("pageLinkOut.tsv", LINKS_OUT),
        ("redirectTargetsBySource.tsv", "7\t3\n8\t9\n9\t8\n"),
        ("redirectSourcesByTarget.tsv", "3\t7\n"),
        ("categoryParents.tsv", "6\t\n10\t\n"),
        ("articleParents.tsv", "2\t6\n3\t10\n"),
        ("childCategories.tsv", "6\t\n10\t\n"),
        ("childArticles.tsv", "6\t2\n10\t3\n"),
        (
            "structure.tsv",
            "2\t[0,40,92](([92,130])[130,171])([180,200,240])\n",
        ),
        ("translations.tsv", "2\tfr\tKiwi (oiseau)\tde\tKiwis\n"),
        ("stats.tsv", "articleCount\t5\ncategoryCount\t2\nredirectCount\t3\n"),
    ];
    for (name, body) in files {
        fs::write(dir.join(name), body).unwrap();
    }
}

pub fn store(root: &Path) -> StoreDir {
    StoreDir::new(root, StoreConfig::for_tests()).unwrap()
}

/// A loaded store in a temp dir; `data` holds the source files
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        write_corpus(&dir.path().join("data"));
        Self { dir }
    }

    pub fn data_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("data")
    }

    pub fn store_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("store")
    }

    pub fn load(&self, mode: LoadMode) -> LoadReport {
        Loader::new(store(&self.store_dir()), self.data_dir(), mode)
            .load_all()
            .unwrap()
    }

    pub fn open(&self) -> Wikipedia {
        Wikipedia::open(store(&self.store_dir())).unwrap()
    }
}
