use thiserror::Error;
use wikigraph_codec::PageId;
use wikigraph_graph::GraphError;

pub type Result<T> = std::result::Result<T, AnnotateError>;

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Relatedness of pages {a} and {b} is {score}, expected a value in [0, 1]")]
    ScoreOutOfRange { a: PageId, b: PageId, score: f64 },

    #[error("Invalid configuration: {0}")]
    Config(String),
}
