use serde::{Deserialize, Serialize};

/// A repository the metadata source may consult. The resolver only passes
/// these through; it never reads from them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub url: String,
}

impl Repository {
    pub fn new(id: &str, url: &str) -> Self {
        Self {
            id: id.to_string(),
            url: url.to_string(),
        }
    }

    pub fn maven_central() -> Self {
        Self::new("central", "https://repo.maven.apache.org/maven2")
    }
}
