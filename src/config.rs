//! Build and serve configuration.
//!
//! Values come from three layers, lowest precedence first: built-in
//! defaults, an optional JSON config file, then CLI flags
//! ([`BuildOverrides`] / [`ServeOverrides`]).
//!
//! CHANGELOG:
//! - 10/16/2026 - CLI overlays moved here; CARGO_TARGET_DIR honored
//! - 10/16/2026 - Initial implementation

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Env var naming a config file.
pub const CONFIG_ENV: &str = "WASM_SERVE_CONFIG";

/// Config file picked up from the current directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "wasm-serve.json";

/// Env var overriding the compiler front-end executable.
pub const CARGO_ENV: &str = "CARGO";

/// Env var cargo reads its target directory from.
pub const CARGO_TARGET_DIR_ENV: &str = "CARGO_TARGET_DIR";

/// Env var overriding the binding generator executable.
pub const WASM_BINDGEN_ENV: &str = "WASM_BINDGEN";

pub const DEFAULT_TRIPLE: &str = "wasm32-unknown-unknown";
pub const DEFAULT_EXAMPLE: &str = "instances";
pub const DEFAULT_OUT_DIR: &str = "web";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

/// Cargo build profile. Selects both the compiler flag and the directory
/// the artifact is read from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BuildProfile {
    #[default]
    Release,
    Debug,
}

impl BuildProfile {
    /// Directory name under `<target-dir>/<triple>/`.
    pub fn dir_name(&self) -> &'static str {
        match self {
            BuildProfile::Release => "release",
            BuildProfile::Debug => "debug",
        }
    }

    /// Flag passed to `cargo build`, if any.
    pub fn cargo_flag(&self) -> Option<&'static str> {
        match self {
            BuildProfile::Release => Some("--release"),
            BuildProfile::Debug => None,
        }
    }

    /// The other profile.
    pub fn other(&self) -> BuildProfile {
        match self {
            BuildProfile::Release => BuildProfile::Debug,
            BuildProfile::Debug => BuildProfile::Release,
        }
    }
}

impl std::fmt::Display for BuildProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Which cargo artifact to compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum BuildTarget {
    Example(String),
    Bin(String),
}

impl BuildTarget {
    pub fn name(&self) -> &str {
        match self {
            BuildTarget::Example(name) | BuildTarget::Bin(name) => name,
        }
    }

    /// Selector flag for `cargo build`.
    pub fn cargo_flag(&self) -> &'static str {
        match self {
            BuildTarget::Example(_) => "--example",
            BuildTarget::Bin(_) => "--bin",
        }
    }

    /// File stem of the produced `.wasm` (cargo swaps `-` for `_`).
    pub fn artifact_stem(&self) -> String {
        self.name().replace('-', "_")
    }
}

impl Default for BuildTarget {
    fn default() -> Self {
        BuildTarget::Example(DEFAULT_EXAMPLE.to_string())
    }
}

/// Everything the Build Invoker needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub target: BuildTarget,
    pub profile: BuildProfile,
    /// Compilation target triple.
    pub triple: String,
    /// Cargo's target directory.
    pub target_dir: PathBuf,
    /// Where the binding generator writes its output.
    pub out_dir: PathBuf,
    /// Explicit artifact path; bypasses profile-based resolution.
    pub artifact: Option<PathBuf>,
    pub cargo: String,
    pub wasm_bindgen: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            target: BuildTarget::default(),
            profile: BuildProfile::default(),
            triple: DEFAULT_TRIPLE.to_string(),
            target_dir: PathBuf::from(resolve_tool(CARGO_TARGET_DIR_ENV, "target")),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            artifact: None,
            cargo: resolve_tool(CARGO_ENV, "cargo"),
            wasm_bindgen: resolve_tool(WASM_BINDGEN_ENV, "wasm-bindgen"),
        }
    }
}

impl BuildConfig {
    /// Directory cargo writes artifacts to for the given profile.
    pub fn artifact_dir(&self, profile: BuildProfile) -> PathBuf {
        let dir = self
            .target_dir
            .join(&self.triple)
            .join(profile.dir_name());
        match self.target {
            BuildTarget::Example(_) => dir.join("examples"),
            BuildTarget::Bin(_) => dir,
        }
    }

    /// Path of the `.wasm` the binding generator consumes.
    ///
    /// Always derived from `self.profile` so the compile and bindgen steps
    /// agree on release vs debug.
    pub fn artifact_path(&self) -> PathBuf {
        if let Some(ref explicit) = self.artifact {
            return explicit.clone();
        }
        self.artifact_dir(self.profile)
            .join(format!("{}.wasm", self.target.artifact_stem()))
    }
}

/// Everything the Static File Server needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeConfig {
    pub root: PathBuf,
    pub host: String,
    pub port: u16,
    /// Extension -> content type, consulted before the built-in table.
    pub mime_overrides: BTreeMap<String, String>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_OUT_DIR),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            mime_overrides: default_mime_overrides(),
        }
    }
}

impl ServeConfig {
    /// `host:port` string handed to the listener.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `.js` must go out as `application/javascript`; some default tables say
/// `text/plain`, which browsers refuse to run as a module.
pub fn default_mime_overrides() -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert(".js".to_string(), "application/javascript".to_string());
    map
}

/// Optional JSON config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub example: Option<String>,
    pub bin: Option<String>,
    pub profile: Option<BuildProfile>,
    /// Target triple.
    pub target: Option<String>,
    pub target_dir: Option<String>,
    pub out_dir: Option<String>,
    pub artifact: Option<String>,
    pub cargo: Option<String>,
    pub wasm_bindgen: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    #[serde(default)]
    pub mime: BTreeMap<String, String>,
}

impl ConfigFile {
    /// Load a config file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config("load", format!("{}: {}", path.display(), e)))?;
        let file = Self::parse(&content)
            .map_err(|e| Error::config("parse", format!("{}: {}", path.display(), e)))?;
        file.validate()
            .map_err(|reason| Error::config("load", format!("{}: {}", path.display(), reason)))?;
        Ok(file)
    }

    fn parse(content: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    fn validate(&self) -> std::result::Result<(), &'static str> {
        if self.example.is_some() && self.bin.is_some() {
            return Err("example and bin are mutually exclusive");
        }
        Ok(())
    }

    /// Load from `--config`, `WASM_SERVE_CONFIG`, or `./wasm-serve.json`.
    ///
    /// An explicit path or env var must exist; the implicit file is
    /// optional.
    pub fn discover(explicit: Option<&str>) -> Result<Option<Self>> {
        let from_env = std::env::var(CONFIG_ENV).ok();
        Self::discover_in(explicit, from_env.as_deref(), Path::new("."))
    }

    fn discover_in(
        explicit: Option<&str>,
        from_env: Option<&str>,
        cwd: &Path,
    ) -> Result<Option<Self>> {
        if let Some(path) = explicit {
            return Self::load(expand_path(path)).map(Some);
        }
        if let Some(path) = from_env.filter(|p| !p.trim().is_empty()) {
            return Self::load(expand_path(path)).map(Some);
        }
        let implicit = cwd.join(DEFAULT_CONFIG_FILE);
        if implicit.is_file() {
            tracing::debug!(path = %implicit.display(), "using config file");
            return Self::load(implicit).map(Some);
        }
        Ok(None)
    }

    /// Overlay file values onto a build config.
    pub fn apply_to_build(&self, build: &mut BuildConfig) {
        if let Some(ref name) = self.bin {
            build.target = BuildTarget::Bin(name.clone());
        }
        if let Some(ref name) = self.example {
            build.target = BuildTarget::Example(name.clone());
        }
        if let Some(profile) = self.profile {
            build.profile = profile;
        }
        if let Some(ref triple) = self.target {
            build.triple = triple.clone();
        }
        if let Some(ref dir) = self.target_dir {
            build.target_dir = expand_path(dir);
        }
        if let Some(ref dir) = self.out_dir {
            build.out_dir = expand_path(dir);
        }
        if let Some(ref artifact) = self.artifact {
            build.artifact = Some(expand_path(artifact));
        }
        if let Some(ref cargo) = self.cargo {
            build.cargo = cargo.clone();
        }
        if let Some(ref bindgen) = self.wasm_bindgen {
            build.wasm_bindgen = bindgen.clone();
        }
    }

    /// Overlay file values onto a serve config.
    pub fn apply_to_serve(&self, serve: &mut ServeConfig) {
        if let Some(ref dir) = self.out_dir {
            serve.root = expand_path(dir);
        }
        if let Some(ref host) = self.host {
            serve.host = host.clone();
        }
        if let Some(port) = self.port {
            serve.port = port;
        }
        for (ext, content_type) in &self.mime {
            serve
                .mime_overrides
                .insert(ext.clone(), content_type.clone());
        }
    }
}

/// Build settings given on the command line. Unset fields leave the
/// file/default value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, clap::Args)]
pub struct BuildOverrides {
    /// Example to compile (default: instances)
    #[arg(long, conflicts_with = "bin")]
    pub example: Option<String>,

    /// Binary to compile instead of an example
    #[arg(long)]
    pub bin: Option<String>,

    /// Build profile
    #[arg(long, value_enum)]
    pub profile: Option<BuildProfile>,

    /// Compilation target triple
    #[arg(long = "target", value_name = "TRIPLE")]
    pub triple: Option<String>,

    /// Cargo target directory (default: $CARGO_TARGET_DIR, then target)
    #[arg(long)]
    pub target_dir: Option<String>,

    /// Directory wasm-bindgen writes into
    #[arg(short, long)]
    pub out_dir: Option<String>,

    /// Use this .wasm instead of the profile's artifact path
    #[arg(long)]
    pub artifact: Option<String>,
}

impl BuildOverrides {
    pub fn apply(&self, build: &mut BuildConfig) {
        if let Some(ref name) = self.bin {
            build.target = BuildTarget::Bin(name.clone());
        }
        if let Some(ref name) = self.example {
            build.target = BuildTarget::Example(name.clone());
        }
        if let Some(profile) = self.profile {
            build.profile = profile;
        }
        if let Some(ref triple) = self.triple {
            build.triple = triple.clone();
        }
        if let Some(ref dir) = self.target_dir {
            build.target_dir = expand_path(dir);
        }
        if let Some(ref dir) = self.out_dir {
            build.out_dir = expand_path(dir);
        }
        if let Some(ref artifact) = self.artifact {
            build.artifact = Some(expand_path(artifact));
        }
    }
}

/// Serve settings given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, clap::Args)]
pub struct ServeOverrides {
    /// Directory to serve (default: the build output directory)
    #[arg(long)]
    pub dir: Option<String>,

    /// Interface to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Extra content-type override, e.g. .wasm=application/wasm
    #[arg(long = "mime", value_name = "EXT=TYPE")]
    pub mime: Vec<String>,
}

impl ServeOverrides {
    pub fn apply(&self, serve: &mut ServeConfig) -> Result<()> {
        if let Some(ref dir) = self.dir {
            serve.root = expand_path(dir);
        }
        if let Some(ref host) = self.host {
            serve.host = host.clone();
        }
        if let Some(port) = self.port {
            serve.port = port;
        }
        for entry in &self.mime {
            let (ext, content_type) = parse_mime_override(entry)?;
            serve.mime_overrides.insert(ext, content_type);
        }
        Ok(())
    }
}

/// Defaults, then file, then CLI.
pub fn resolve_build(file: &ConfigFile, cli: &BuildOverrides) -> BuildConfig {
    let mut build = BuildConfig::default();
    file.apply_to_build(&mut build);
    cli.apply(&mut build);
    build
}

/// Defaults, then file, then CLI. With `build`, the root follows the build
/// output directory unless `--dir` names another.
pub fn resolve_serve(
    file: &ConfigFile,
    cli: &ServeOverrides,
    build: Option<&BuildConfig>,
) -> Result<ServeConfig> {
    let mut serve = ServeConfig::default();
    file.apply_to_serve(&mut serve);
    if let Some(build) = build {
        serve.root = build.out_dir.clone();
    }
    cli.apply(&mut serve)?;
    Ok(serve)
}

/// Expand `~` in a user-supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

/// Executable from `env_var`, else `default` (looked up on PATH at spawn).
pub fn resolve_tool(env_var: &str, default: &str) -> String {
    std::env::var(env_var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parse a `--mime EXT=TYPE` flag.
pub fn parse_mime_override(s: &str) -> Result<(String, String)> {
    let (ext, content_type) = s
        .split_once('=')
        .ok_or_else(|| Error::config("parse mime override", format!("expected EXT=TYPE, got '{}'", s)))?;
    let ext = ext.trim();
    let content_type = content_type.trim();
    if ext.is_empty() || ext == "." {
        return Err(Error::config(
            "parse mime override",
            format!("missing extension in '{}'", s),
        ));
    }
    if content_type.is_empty() || !content_type.contains('/') {
        return Err(Error::config(
            "parse mime override",
            format!("invalid content type in '{}'", s),
        ));
    }
    Ok((ext.to_string(), content_type.to_string()))
}
