use serde_json::{Map, Value};
use std::error::Error;

/// Key holding the human readable description of an error converted from
/// a [`std::error::Error`].
pub const DESCRIPTION_KEY: &str = "description";

/// An error attached to a log, with an optional chain of underlying errors.
#[derive(Debug, Clone, PartialEq)]
pub struct LogError {
    pub domain: String,
    pub code: i64,
    pub user_info: Map<String, Value>,
    pub underlying: Option<Box<LogError>>,
}

impl LogError {
    pub fn new(domain: impl Into<String>, code: i64) -> Self {
        Self {
            domain: domain.into(),
            code,
            user_info: Map::new(),
            underlying: None,
        }
    }

    pub fn with_user_info(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.user_info.insert(key.into(), value.into());
        self
    }

    pub fn with_underlying(mut self, underlying: LogError) -> Self {
        self.underlying = Some(Box::new(underlying));
        self
    }

    /// Converts a standard error, following its `source()` chain.
    ///
    /// Each link gets the given domain, code 0 and its `Display` text under
    /// [`DESCRIPTION_KEY`].
    pub fn from_error(domain: &str, error: &(dyn Error + 'static)) -> Self {
        let mut log_error = Self::new(domain, 0).with_user_info(DESCRIPTION_KEY, error.to_string());
        if let Some(source) = error.source() {
            log_error.underlying = Some(Box::new(Self::from_error(domain, source)));
        }
        log_error
    }

    /// Every error in the chain, self first, each detached from its
    /// underlying link.
    pub fn disassociated_chain(&self) -> Vec<LogError> {
        let mut chain = Vec::new();
        let mut current = Some(self);
        while let Some(error) = current {
            chain.push(LogError {
                domain: error.domain.clone(),
                code: error.code,
                user_info: error.user_info.clone(),
                underlying: None,
            });
            current = error.underlying.as_deref();
        }
        chain
    }
}
