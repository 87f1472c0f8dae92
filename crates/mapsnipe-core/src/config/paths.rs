//! Platform-specific locations for config and ledger files

use std::path::PathBuf;

/// Application directory name under the platform config/data dirs
const APP_DIR: &str = "mapsnipe";

/// Default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_DIR).join("config.json"))
}

/// Default directory for per-user data files
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join(APP_DIR))
}

/// Ledger file name for a trainer account.
///
/// Characters that are not valid in file names are replaced so odd account
/// names cannot escape the data directory.
pub fn ledger_file_name(username: &str) -> String {
    let safe: String = username
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect();
    format!("map-caught-{}.json", safe.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_file_name() {
        assert_eq!(ledger_file_name("ash"), "map-caught-ash.json");
        assert_eq!(ledger_file_name("../evil"), "map-caught-.._evil.json");
        assert_eq!(ledger_file_name("a:b*c"), "map-caught-a_b_c.json");
    }

    #[test]
    fn test_default_paths() {
        // These just verify the functions run without panicking
        let _ = default_config_path();
        let _ = default_data_dir();
    }
}
