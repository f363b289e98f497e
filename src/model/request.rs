use serde::{Deserialize, Serialize};

/// The JSON body accepted by the POST endpoints. Every operation reads only
/// the fields it needs; handlers destructure the ones they require.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientRequest {
    // MakeDirectory
    pub dir: Option<String>,

    // Delete (file)
    pub folder: Option<String>,
    pub filename: Option<String>,

    // DeleteDirectory
    pub directory: Option<String>,

    // Move / Copy
    pub src: Option<String>,
    pub dest: Option<String>,
}

impl ClientRequest {
    /// Returns (src, dest), both non-empty
    pub fn get_transfer(&self) -> Option<(String, String)> {
        if let (Some(src), Some(dest)) = (self.src.clone(), self.dest.clone()) {
            if !src.is_empty() && !dest.is_empty() {
                return Some((src, dest));
            }
        }
        None
    }
}
