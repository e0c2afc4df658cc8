use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote display endpoint returned by console negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConsoleEndpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for ConsoleEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
