use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Symbolic expression text could not be parsed.
    #[snafu(display("cannot parse expression {input:?} at offset {offset}: {reason}"))]
    ExprParse { input: String, offset: usize, reason: String },

    /// A float literal was infinite or NaN.
    #[snafu(display("float literal {value} is not finite"))]
    NonFiniteFloat { value: f64 },

    /// Subset text could not be parsed.
    #[snafu(display("cannot parse subset {input:?}: {reason}"))]
    SubsetParse { input: String, reason: String },

    /// A name was registered twice in one graph namespace.
    #[snafu(display("name {name:?} is already used in graph {graph:?}"))]
    NameCollision { graph: String, name: String },

    /// Encoding a graph into its portable form failed.
    #[snafu(display("cannot encode graph {graph:?}: {source}"))]
    Encode { graph: String, source: serde_json::Error },

    /// Decoding a graph from its portable form failed.
    #[snafu(display("cannot decode graph: {source}"))]
    Decode { source: serde_json::Error },
}
