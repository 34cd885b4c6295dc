use directories::ProjectDirs;
use std::path::PathBuf;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "studytrack", "StudyTrack")
}

/// Per-user data directory, or the current directory when the platform has none.
pub fn data_root() -> PathBuf {
    match project_dirs() {
        Some(pd) => pd.data_dir().to_path_buf(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

pub fn config_root() -> PathBuf {
    match project_dirs() {
        Some(pd) => pd.config_dir().to_path_buf(),
        None => data_root(),
    }
}

pub fn default_store_file() -> (PathBuf, PathBuf) {
    let root = data_root();
    let file = root.join("studytrack.json");
    let backups = root.join("backups");
    (file, backups)
}
