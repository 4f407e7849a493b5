use directories::ProjectDirs;
use serde::Deserialize;
use std::path::PathBuf;

const APP_NAME: &str = "conference-simulator";
const CONFIG_DIR_ENV: &str = "CONFERENCE_SIMULATOR_CONFIG";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub config_dir: PathBuf,
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

pub fn get_config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        PathBuf::from(dir)
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.config_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".config")
    }
}
