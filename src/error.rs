use std::io;
use std::path::PathBuf;

/// Which kind of entity a [`ConfigError`] is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Primitive,
    Light,
    Shader,
    PostProcess,
    Texture,
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Family::Primitive => "primitive",
            Family::Light => "light",
            Family::Shader => "shader",
            Family::PostProcess => "post-process",
            Family::Texture => "texture",
        })
    }
}

/// Failure to construct a single scene entity.
///
/// These are recoverable: the scene loader logs them and skips the entity.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("unknown {family} type '{name}'")]
    UnknownType { family: Family, name: String },

    #[error("{type_name}: missing required parameter '{param}'")]
    MissingParameter { type_name: String, param: String },

    #[error("{context}: {reason}")]
    Invalid { context: String, reason: String },
}

/// Failure to load a whole scene file. Always carries the offending path.
#[derive(Debug, thiserror::Error)]
#[error("failed to load scene '{}'", path.display())]
pub struct SceneLoadError {
    pub path: PathBuf,

    #[source]
    pub kind: SceneLoadErrorKind,
}

/// Specific reason why a scene file could not be loaded.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SceneLoadErrorKind {
    #[error("could not read file")]
    Read(#[from] io::Error),

    #[error("malformed scene description")]
    Parse(#[from] serde_json::Error),

    #[error("{0}")]
    Invalid(String),
}

impl SceneLoadError {
    pub(crate) fn new(path: impl Into<PathBuf>, kind: impl Into<SceneLoadErrorKind>) -> Self {
        Self {
            path: path.into(),
            kind: kind.into(),
        }
    }
}
