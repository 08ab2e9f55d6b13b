//! Module for searching for inputfuse config files

use std::{
    fs::{self, DirEntry},
    path::{Path, PathBuf},
};

use super::InputProfile;

/// Base system fallback path to use if one cannot be found with XDG
const FALLBACK_BASE_PATH: &str = "/usr/share/inputfuse";

/// Returns the base path for configuration data
pub fn get_base_path() -> PathBuf {
    let Ok(base_dirs) = xdg::BaseDirectories::with_prefix("inputfuse") else {
        log::warn!("Unable to determine config base path. Using fallback path.");
        return PathBuf::from(FALLBACK_BASE_PATH);
    };

    // Get the data directories in preference order
    let data_dirs = base_dirs.get_data_dirs();
    for dir in data_dirs {
        if dir.exists() {
            return dir;
        }
    }

    log::warn!("Config base path not found. Using fallback path.");
    PathBuf::from(FALLBACK_BASE_PATH)
}

/// Returns a list of directories in load order to find input profiles.
/// E.g. ["./rootfs/usr/share/inputfuse/profiles", "/etc/inputfuse/profiles.d", "/usr/share/inputfuse/profiles"]
pub fn get_profiles_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("./rootfs/usr/share/inputfuse/profiles"),
        PathBuf::from("/etc/inputfuse/profiles.d"),
        get_base_path().join("profiles"),
    ]
}

/// Returns the YAML files found in the given directories, sorted by file name.
/// When the same file name exists in more than one directory, the one from
/// the directory listed first wins.
pub fn get_multidir_sorted_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut entries: Vec<(usize, DirEntry)> = paths
        .iter()
        .enumerate()
        .flat_map(|(priority, path)| {
            log::trace!("Checking {path:?} for files");
            let files = match fs::read_dir(path) {
                Ok(files) => files,
                Err(e) => {
                    log::debug!("Unable to read directory: {path:?}: {e}");
                    return vec![];
                }
            };
            files
                .filter_map(|r| r.ok())
                .filter(|entry| is_yaml(&entry.path()))
                .map(|entry| (priority, entry))
                .collect()
        })
        .collect();

    entries.sort_by(|(priority_a, a), (priority_b, b)| {
        a.file_name()
            .cmp(&b.file_name())
            .then(priority_a.cmp(priority_b))
    });
    entries.dedup_by(|(_, a), (_, b)| a.file_name() == b.file_name());
    log::trace!("Got sorted entries: {entries:?}");

    entries.into_iter().map(|(_, entry)| entry.path()).collect()
}

/// Find and load the input profile with the given name from the profile
/// search paths. The name is matched against the `name` field of each profile,
/// then against the file stem.
pub fn find_profile(name: &str) -> Option<InputProfile> {
    let files = get_multidir_sorted_files(&get_profiles_paths());
    for file in files {
        let profile = match InputProfile::from_yaml_file(&file) {
            Ok(profile) => profile,
            Err(e) => {
                log::warn!("Skipping invalid profile {file:?}: {e}");
                continue;
            }
        };
        let stem_matches = file.file_stem().is_some_and(|stem| stem == name);
        if profile.name == name || stem_matches {
            log::debug!("Found profile '{name}' at {file:?}");
            return Some(profile);
        }
    }

    None
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml")
}
