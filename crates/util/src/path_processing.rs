use std::path::{Path, PathBuf};

use dirs_next::home_dir;

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    let p = path.trim();
    if p == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = p.strip_prefix("~/") {
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    if let Some(rest) = p.strip_prefix("~\\") {
        // Windows-style
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    PathBuf::from(p)
}

/// File name without its final extension (`plugin_1.0.0_linux_amd64.zip` -> `plugin_1.0.0_linux_amd64`).
pub fn strip_extension(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_are_untouched() {
        assert_eq!(expand_tilde(" /tmp/config.json "), PathBuf::from("/tmp/config.json"));
    }

    #[test]
    fn tilde_expands_when_home_is_known() {
        if let Some(home) = home_dir() {
            assert_eq!(expand_tilde("~/provschema"), home.join("provschema"));
        }
    }

    #[test]
    fn strips_only_the_last_extension() {
        assert_eq!(strip_extension("plugin_1.0.0_linux_amd64.zip"), "plugin_1.0.0_linux_amd64");
        assert_eq!(strip_extension("archive"), "archive");
    }
}
