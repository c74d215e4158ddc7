use std::num::ParseFloatError;

use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

/// Reasons for discarding a single measure.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Value `{value}` is not one of the enumerated values of the metric"))]
    UnknownEnumeratedValue { value: String },

    #[snafu(display("Value `{value}` could not be parsed: {source}"))]
    ParseValue { value: String, source: ParseFloatError },

    #[snafu(display("Value `{value}` is out of the range of a 64-bit float"))]
    ValueOutOfRange { value: String },
}
