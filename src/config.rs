//! Environment-sourced settings.
//!
//! One [`Settings`] value is built per run and passed by reference to every
//! component; nothing reads the environment after startup.

use std::env;

use crate::error::{Result, SyncError};

const DEFAULT_DOUBAN_HOST: &str = "frodo.douban.com";
const DEFAULT_DOUBAN_API_KEY: &str = "0ac44ae016490db2204ce0a042db2916";

/// Display names of the managed databases under the root page. Each one can be
/// overridden through its corresponding environment variable.
#[derive(Debug, Clone)]
pub struct DatabaseNames {
    pub movie: String,
    pub day: String,
    pub week: String,
    pub month: String,
    pub year: String,
    pub category: String,
    pub director: String,
}

impl Default for DatabaseNames {
    fn default() -> Self {
        Self {
            movie: "电影".into(),
            day: "日".into(),
            week: "周".into(),
            month: "月".into(),
            year: "年".into(),
            category: "分类".into(),
            director: "导演".into(),
        }
    }
}

impl DatabaseNames {
    fn from_env() -> Self {
        let mut names = Self::default();
        let overrides = [
            ("MOVIE_DATABASE_NAME", &mut names.movie),
            ("DAY_DATABASE_NAME", &mut names.day),
            ("WEEK_DATABASE_NAME", &mut names.week),
            ("MONTH_DATABASE_NAME", &mut names.month),
            ("YEAR_DATABASE_NAME", &mut names.year),
            ("CATEGORY_DATABASE_NAME", &mut names.category),
            ("DIRECTOR_DATABASE_NAME", &mut names.director),
        ];
        for (key, slot) in overrides {
            if let Ok(value) = env::var(key) {
                if !value.is_empty() {
                    *slot = value;
                }
            }
        }
        names
    }
}

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub douban_host: String,
    pub douban_api_key: String,
    /// Bearer token for the private mobile API; optional, some endpoints
    /// answer without it.
    pub douban_auth_token: Option<String>,
    /// Douban user id whose history is synced. Optional here; the CLI can
    /// supply it instead of the environment.
    pub douban_user: Option<String>,
    pub notion_token: String,
    /// URL of the Notion page the managed databases live under.
    pub notion_root_url: String,
    pub database_names: DatabaseNames,
}

impl Settings {
    /// Reads settings from the process environment. Call `dotenv().ok()`
    /// first if a `.env` file should participate.
    pub fn from_env() -> Result<Self> {
        let notion_token = env::var("NOTION_TOKEN")
            .or_else(|_| env::var("MOVIE_NOTION_TOKEN"))
            .map_err(|_| {
                SyncError::Config("NOTION_TOKEN or MOVIE_NOTION_TOKEN must be set".into())
            })?;

        Ok(Self {
            douban_host: env::var("DOUBAN_API_HOST")
                .unwrap_or_else(|_| DEFAULT_DOUBAN_HOST.into()),
            douban_api_key: env::var("DOUBAN_API_KEY")
                .unwrap_or_else(|_| DEFAULT_DOUBAN_API_KEY.into()),
            douban_auth_token: env::var("AUTH_TOKEN").ok().filter(|t| !t.is_empty()),
            douban_user: env::var("DOUBAN_NAME").ok().filter(|u| !u.is_empty()),
            notion_token,
            notion_root_url: env::var("NOTION_MOVIE_URL")
                .map_err(|_| SyncError::Config("NOTION_MOVIE_URL must be set".into()))?,
            database_names: DatabaseNames::from_env(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "DOUBAN_API_HOST",
            "DOUBAN_API_KEY",
            "AUTH_TOKEN",
            "DOUBAN_NAME",
            "NOTION_TOKEN",
            "MOVIE_NOTION_TOKEN",
            "NOTION_MOVIE_URL",
            "MOVIE_DATABASE_NAME",
            "WEEK_DATABASE_NAME",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn missing_required_vars_is_a_config_error() {
        clear_env();
        match Settings::from_env() {
            Err(SyncError::Config(msg)) => assert!(msg.contains("NOTION_TOKEN")),
            other => panic!("expected Config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    #[serial]
    fn defaults_and_overrides() {
        clear_env();
        env::set_var("NOTION_TOKEN", "secret");
        env::set_var("DOUBAN_NAME", "someone");
        env::set_var("NOTION_MOVIE_URL", "https://www.notion.so/abc");
        env::set_var("MOVIE_DATABASE_NAME", "Movies");

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.douban_host, DEFAULT_DOUBAN_HOST);
        assert_eq!(settings.douban_auth_token, None);
        assert_eq!(settings.douban_user.as_deref(), Some("someone"));
        assert_eq!(settings.database_names.movie, "Movies");
        assert_eq!(settings.database_names.week, "周");
        clear_env();
    }

    #[test]
    #[serial]
    fn movie_notion_token_is_accepted_as_fallback() {
        clear_env();
        env::set_var("MOVIE_NOTION_TOKEN", "fallback");
        env::set_var("DOUBAN_NAME", "someone");
        env::set_var("NOTION_MOVIE_URL", "https://www.notion.so/abc");

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.notion_token, "fallback");
        clear_env();
    }
}
