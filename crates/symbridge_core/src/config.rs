//! Engine library configuration.

use std::path::PathBuf;

/// Environment variable naming the engine library path.
pub const ENGINE_LIB_ENV: &str = "SYMBRIDGE_ENGINE_LIB";

/// Default base name of the engine library.
pub const DEFAULT_LIBRARY_NAME: &str = "AngouriMath.CPP.Exporting";

/// Configuration for loading an engine library.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Explicit library path. Takes precedence over name-based lookup.
    pub library_path: Option<PathBuf>,

    /// Base library name without platform prefix or extension.
    pub library_name: String,

    /// Directory searched for the platform file name of `library_name`.
    /// When unset, the system loader's search path is used.
    pub search_dir: Option<PathBuf>,

    /// Whether every elementary-function export must be present.
    pub require_functions: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            library_path: None,
            library_name: DEFAULT_LIBRARY_NAME.to_owned(),
            search_dir: None,
            require_functions: false,
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration, with the library path taken from
    /// `SYMBRIDGE_ENGINE_LIB` when set and non-empty.
    #[must_use]
    pub fn from_env() -> Self {
        let config = Self::default();
        match std::env::var_os(ENGINE_LIB_ENV) {
            Some(path) if !path.is_empty() => config.library_path(path),
            _ => config,
        }
    }

    /// Sets an explicit library path.
    #[must_use]
    pub fn library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    /// Sets the base library name.
    #[must_use]
    pub fn library_name(mut self, name: impl Into<String>) -> Self {
        self.library_name = name.into();
        self
    }

    /// Sets the directory searched for the library.
    #[must_use]
    pub fn search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dir = Some(dir.into());
        self
    }

    /// Sets whether every elementary-function export must be present.
    #[must_use]
    pub const fn require_functions(mut self, value: bool) -> Self {
        self.require_functions = value;
        self
    }

    /// The path or name handed to the system loader.
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.library_path {
            return path.clone();
        }
        let file_name = platform_file_name(&self.library_name);
        match &self.search_dir {
            Some(dir) => dir.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}

/// Platform file name of a library base name.
pub fn platform_file_name(name: &str) -> String {
    #[cfg(target_os = "windows")]
    {
        format!("{name}.dll")
    }
    #[cfg(target_os = "macos")]
    {
        format!("{name}.dylib")
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        format!("{name}.so")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn default_config() {
        let config = EngineConfig::default();
        assert!(config.library_path.is_none());
        assert_eq!(config.library_name, DEFAULT_LIBRARY_NAME);
        assert!(config.search_dir.is_none());
        assert!(!config.require_functions);
    }

    #[test]
    fn builder_pattern() {
        let config = EngineConfig::new()
            .library_name("engine")
            .search_dir("/opt/engine")
            .require_functions(true);

        assert_eq!(config.library_name, "engine");
        assert!(config.require_functions);
        assert_eq!(
            config.resolve(),
            Path::new("/opt/engine").join(platform_file_name("engine"))
        );
    }

    #[test]
    fn explicit_path_wins() {
        let config = EngineConfig::new()
            .search_dir("/opt/engine")
            .library_path("/tmp/libengine.so");
        assert_eq!(config.resolve(), PathBuf::from("/tmp/libengine.so"));
    }

    #[test]
    fn platform_name() {
        let name = platform_file_name("engine");
        #[cfg(target_os = "windows")]
        assert_eq!(name, "engine.dll");
        #[cfg(target_os = "macos")]
        assert_eq!(name, "engine.dylib");
        #[cfg(target_os = "linux")]
        assert_eq!(name, "engine.so");
    }
}
