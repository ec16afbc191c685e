use std::env;

use engine::{
    compile_level_catalog, resolve_app_paths, AppError, FilePrefs, LevelCatalog, LoopConfig,
};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::session::{Session, SessionConfig, SessionError, TracingPresentation};

const START_LEVEL_ENV_VAR: &str = "AREAFLOW_START_LEVEL";
const PREFS_FILE_NAME: &str = "prefs.json";

pub(crate) type GameSession = Session<FilePrefs, TracingPresentation>;

pub(crate) struct AppWiring {
    pub(crate) loop_config: LoopConfig,
    pub(crate) session: GameSession,
}

#[derive(Debug, Error)]
pub(crate) enum GameStartupError {
    #[error(transparent)]
    App(#[from] AppError),
    #[error("invalid session configuration: {0}")]
    Session(#[from] SessionError),
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

pub(crate) fn build_app() -> Result<AppWiring, GameStartupError> {
    let paths = resolve_app_paths().map_err(AppError::from)?;
    info!(
        root = %paths.root.display(),
        levels_dir = %paths.levels_dir.display(),
        saves_dir = %paths.saves_dir.display(),
        "app_paths_resolved"
    );

    let catalog = compile_level_catalog(&paths.levels_dir).map_err(AppError::from)?;
    let prefs = FilePrefs::open(paths.saves_dir.join(PREFS_FILE_NAME)).map_err(AppError::from)?;
    info!(path = %prefs.path().display(), "prefs_opened");

    let defaults = SessionConfig::default();
    let start_level = resolve_start_level(
        env::var(START_LEVEL_ENV_VAR).ok(),
        &catalog,
        &defaults.start_level,
    );
    let config = SessionConfig {
        start_level,
        ..defaults
    };

    let session = Session::new(config, catalog, prefs, TracingPresentation::default())?;
    Ok(AppWiring {
        loop_config: LoopConfig::default(),
        session,
    })
}

/// Picks the start level override when it names a gameplay level; anything else falls
/// back to `default`.
fn resolve_start_level(raw: Option<String>, catalog: &LevelCatalog, default: &str) -> String {
    let Some(raw) = raw else {
        return default.to_string();
    };
    let requested = raw.trim();
    match catalog.level(requested) {
        Some(level) if level.role.is_gameplay() => {
            info!(level = requested, "start_level_overridden");
            requested.to_string()
        }
        Some(level) => {
            warn!(
                var = START_LEVEL_ENV_VAR,
                level = requested,
                role = ?level.role,
                fallback = default,
                "start_level_not_gameplay; using default"
            );
            default.to_string()
        }
        None => {
            warn!(
                var = START_LEVEL_ENV_VAR,
                level = requested,
                fallback = default,
                "start_level_unknown; using default"
            );
            default.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use engine::compile_level_catalog_from_str;

    use super::*;

    fn catalog() -> LevelCatalog {
        compile_level_catalog_from_str(
            Path::new("levels.xml"),
            r#"<Levels>
                <LevelDef><name>Scene1</name><role>Gameplay</role></LevelDef>
                <LevelDef><name>Scene2</name><role>Gameplay</role></LevelDef>
                <LevelDef><name>Win</name><role>Victory</role></LevelDef>
            </Levels>"#,
        )
        .expect("catalog")
    }

    #[test]
    fn start_level_override_accepts_gameplay_levels() {
        let start = resolve_start_level(Some(" Scene2 ".to_string()), &catalog(), "Scene1");
        assert_eq!(start, "Scene2");
    }

    #[test]
    fn start_level_override_falls_back_when_invalid() {
        let catalog = catalog();
        assert_eq!(resolve_start_level(None, &catalog, "Scene1"), "Scene1");
        assert_eq!(
            resolve_start_level(Some("Nowhere".to_string()), &catalog, "Scene1"),
            "Scene1"
        );
        assert_eq!(
            resolve_start_level(Some("Win".to_string()), &catalog, "Scene1"),
            "Scene1"
        );
    }

    #[test]
    fn shipped_levels_satisfy_the_default_config() {
        let levels_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("assets")
            .join("levels");
        let catalog = compile_level_catalog(&levels_dir).expect("shipped catalog");
        let temp = tempfile::TempDir::new().expect("temp");
        let prefs = FilePrefs::open(temp.path().join(PREFS_FILE_NAME)).expect("prefs");

        let session = Session::new(
            SessionConfig::default(),
            catalog,
            prefs,
            TracingPresentation::default(),
        );
        assert!(session.is_ok());
    }
}
