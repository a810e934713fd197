//! Installed application discovery (.desktop files)
//!
//! Used to seed the entries store on first run and to resolve icons. Only
//! the fields the launcher needs are parsed; duplicates between system and
//! user application directories are dropped by name and by binary.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// A parsed desktop entry (.desktop file)
#[derive(Debug, Clone)]
pub struct DesktopEntry {
    /// Application name
    pub name: String,
    /// Exec command, field codes stripped
    pub exec: String,
    /// Icon name (can be resolved to a path)
    pub icon: Option<String>,
    /// Path to the .desktop file
    pub path: PathBuf,
}

impl DesktopEntry {
    /// Parse a .desktop file
    pub fn parse(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        let mut name = None;
        let mut exec = None;
        let mut icon = None;
        let mut hidden = false;
        let mut in_desktop_entry = false;

        for line in content.lines() {
            let line = line.trim();

            if line.starts_with('[') {
                in_desktop_entry = line == "[Desktop Entry]";
                continue;
            }

            if !in_desktop_entry {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                match key {
                    "Name" => name = Some(value.to_string()),
                    "Exec" => {
                        // Remove field codes like %u, %f, %U, %F
                        let clean_exec = value
                            .replace("%u", "")
                            .replace("%U", "")
                            .replace("%f", "")
                            .replace("%F", "")
                            .replace("%%", "%")
                            .trim()
                            .to_string();
                        exec = Some(clean_exec);
                    }
                    "Icon" => icon = Some(value.to_string()),
                    "NoDisplay" | "Hidden" => {
                        hidden = hidden || value.eq_ignore_ascii_case("true");
                    }
                    _ => {}
                }
            }
        }

        if hidden {
            return None;
        }

        Some(Self {
            name: name?,
            exec: exec?,
            icon,
            path: path.to_path_buf(),
        })
    }
}

/// Index of installed applications
#[derive(Debug, Default)]
pub struct AppIndex {
    pub entries: Vec<DesktopEntry>,
}

impl AppIndex {
    /// Scan the standard application directories
    pub fn scan() -> Self {
        let mut paths = Vec::new();

        // System applications
        paths.push(PathBuf::from("/usr/share/applications"));
        paths.push(PathBuf::from("/usr/local/share/applications"));

        // User applications
        if let Ok(home) = std::env::var("HOME") {
            paths.push(PathBuf::from(home).join(".local/share/applications"));
        }

        let mut index = Self::default();
        let mut seen_names: HashSet<String> = HashSet::new();
        let mut seen_execs: HashSet<String> = HashSet::new();

        for dir in paths {
            if let Ok(entries) = fs::read_dir(&dir) {
                for entry in entries.filter_map(|e| e.ok()) {
                    let path = entry.path();
                    if path.extension().map(|e| e == "desktop").unwrap_or(false) {
                        if let Some(desktop) = DesktopEntry::parse(&path) {
                            if desktop.exec.is_empty() {
                                continue;
                            }
                            let name_key = desktop.name.to_lowercase();
                            let exec_key = desktop
                                .exec
                                .split_whitespace()
                                .next()
                                .unwrap_or(&desktop.exec)
                                .to_string();

                            if !seen_names.contains(&name_key) && !seen_execs.contains(&exec_key) {
                                seen_names.insert(name_key);
                                seen_execs.insert(exec_key);
                                index.entries.push(desktop);
                            }
                        }
                    }
                }
            }
        }

        tracing::info!("Scanned {} desktop entries", index.entries.len());
        index
    }

    /// Look an application up by display name
    pub fn find_by_name(&self, name: &str) -> Option<&DesktopEntry> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }
}
