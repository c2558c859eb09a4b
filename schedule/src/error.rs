use snafu::Snafu;
use stratum_ir::ValidationError;

pub type Result<T, E = TransformError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TransformError {
    /// Minting a clone or shadow descriptor hit a taken name.
    #[snafu(display("cannot register {name:?} in graph {graph:?}: {source}"))]
    NameCollision { graph: String, name: String, source: stratum_ir::Error },

    /// A descriptor the pass relies on is missing from the graph.
    #[snafu(display("graph {graph:?} has no data descriptor {name:?}"))]
    MissingDescriptor { graph: String, name: String },

    /// The transformed graph does not validate.
    #[snafu(display("transformed graph {graph:?} is invalid: {source}"))]
    Validation { graph: String, source: ValidationError },
}
