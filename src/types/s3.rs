use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    #[serde(default)]
    pub encryption: Option<BucketEncryption>,
    #[serde(default)]
    pub logging: Option<BucketLogging>,
}

impl Bucket {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            encryption: None,
            logging: None,
        }
    }
}

/// Default server side encryption of a bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketEncryption {
    pub enabled: bool,
    /// `AES256` or `aws:kms`
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Server access logging of a bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketLogging {
    pub enabled: bool,
}
