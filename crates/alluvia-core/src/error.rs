pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed dataset: {message}")]
    MalformedDataset { message: String },

    #[error("CSV parse error (line {line}): {message}")]
    CsvParse { line: usize, message: String },

    #[error("Invalid option `{option}`: {message}")]
    InvalidOption {
        option: &'static str,
        message: String,
    },

    #[error("Invalid color: {value}")]
    InvalidColor { value: String },

    #[error("Invalid options JSON: {0}")]
    OptionsJson(#[from] serde_json::Error),

    #[error("Invalid options YAML: {0}")]
    OptionsYaml(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDataset {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_option(option: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            option,
            message: message.into(),
        }
    }
}
