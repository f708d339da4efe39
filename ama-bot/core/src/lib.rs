pub mod config;
pub mod model;

use std::{
    net::{IpAddr, Ipv4Addr},
    path::{Path, PathBuf},
    sync::LazyLock,
};

use directories::ProjectDirs;

pub const PROJECT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub static PROJECT_SEMVER: LazyLock<semver::Version> = LazyLock::new(|| {
    semver::Version::parse(PROJECT_VERSION).unwrap_or(semver::Version {
        major: 0,
        minor: 0,
        patch: 0,
        pre: semver::Prerelease::EMPTY,
        build: semver::BuildMetadata::EMPTY,
    })
});

pub const PROJECT_NAME: &str = "ama-bot";
pub const PROJECT_NAME_WITH_INITIAL_CAPITAL: &str = "AMA Bot";

pub const PROGRAM_NAME: &str = "ama-bot";
pub const CONFIG_NAME: &str = "ama-bot.yaml";

pub const GRANT_FILE_NAME: &str = "gmail-grant.json";
pub const CLIENT_CONFIG_FILE_NAME: &str = "gmail-client.json";

pub const CHAT_LOG_DIRECTORY: &str = "chat_history";
pub const MASTER_CHAT_LOG_NAME: &str = "master_chat_log.txt";

// Port 0 lets the OS pick; desktop OAuth clients accept any loopback port.
pub const DEFAULT_LOOPBACK_PORT: u16 = 0;
pub const DEFAULT_LOOPBACK_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

pub const DEFAULT_COMPLETION_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_COMPLETION_MAX_TOKENS: u32 = 500;
pub const DEFAULT_COMPLETION_TEMPERATURE: f32 = 0.7;

pub static PROJECT_CONFIG_DIR: LazyLock<PathBuf> = LazyLock::new(|| {
    ProjectDirs::from("", PROJECT_NAME, PROJECT_NAME)
        .expect("Creating `ProjectDirs` should always success")
        .config_dir()
        .to_path_buf()
});

pub static PROJECT_DATA_DIR: LazyLock<PathBuf> = LazyLock::new(|| {
    ProjectDirs::from("", PROJECT_NAME, PROJECT_NAME)
        .expect("Creating `ProjectDirs` should always success")
        .data_dir()
        .to_path_buf()
});

#[must_use]
pub fn fallback_project_config_directories() -> Vec<PathBuf> {
    let Some(user_dirs) = directories::UserDirs::new() else {
        return Vec::new();
    };
    vec![
        [user_dirs.home_dir(), (Path::new(".config")), (Path::new(PROJECT_NAME))].iter().collect(),
        [user_dirs.home_dir(), (Path::new(&format!(".{PROJECT_NAME}")))].iter().collect(),
        [&Path::new("/"), &Path::new("etc"), &Path::new(PROJECT_NAME)].iter().collect(),
    ]
}
