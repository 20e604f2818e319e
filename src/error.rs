//! Failure kinds raised by the publish pipeline.
//!
//! These travel through `anyhow::Error` and can be recovered with
//! `err.downcast_ref::<PublishError>()`.

/// Remediation appended to errors that look like an expired or revoked token.
pub const EXPIRED_PAT_HINT: &str = "\n\nYou're likely using an expired Personal Access Token, please get a new PAT.\nMore info: https://aka.ms/vscodepat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// Mutually exclusive options were supplied together
    Configuration(String),
    /// A version directive that is neither a bump keyword nor valid semver
    InvalidVersion(String),
    /// The package archive could not be opened or read as a zip
    ArchiveOpen { path: String, reason: String },
    /// The archive holds no `extension/package.json`
    ManifestNotFound(String),
    /// More than one entry matches `extension/package.json`
    AmbiguousManifest(String),
    /// The manifest content is not valid JSON for a manifest
    ManifestParse(String),
    /// A required manifest field is missing or empty
    MissingManifestField(&'static str),
    /// Publisher or extension name is not a valid identifier
    InvalidName { kind: &'static str, value: String },
    /// An unpublish id that is not `publisher.name`
    InvalidExtensionId(String),
    /// The manifest opts into proposed APIs
    ProposedApiForbidden,
    /// The gallery already lists this exact version (full id)
    DuplicateVersion(String),
    /// The gallery rejected the upload with a conflict (full id)
    AlreadyExists(String),
    /// The user declined a confirmation prompt
    UserAborted,
    /// No credentials are stored for this publisher
    UnknownPublisher(String),
}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishError::Configuration(msg) => write!(f, "Not supported: {}", msg),
            PublishError::InvalidVersion(version) => write!(f, "Invalid version {}", version),
            PublishError::ArchiveOpen { path, reason } => {
                write!(f, "Failed to open archive {}: {}", path, reason)
            }
            PublishError::ManifestNotFound(path) => {
                write!(f, "Manifest not found in {}", path)
            }
            PublishError::AmbiguousManifest(path) => {
                write!(f, "Multiple manifests found in {}", path)
            }
            PublishError::ManifestParse(msg) => write!(f, "Malformed manifest: {}", msg),
            PublishError::MissingManifestField(field) => {
                write!(f, "Manifest missing field: {}", field)
            }
            PublishError::InvalidName { kind, value } => {
                write!(
                    f,
                    "Invalid {} name '{}'. Use letters, digits and dashes.",
                    kind, value
                )
            }
            PublishError::InvalidExtensionId(id) => {
                write!(
                    f,
                    "Invalid extension id '{}'. Expected 'publisher.name'.",
                    id
                )
            }
            PublishError::ProposedApiForbidden => write!(
                f,
                "Extensions using proposed API (enableProposedApi: true) can't be published to the Marketplace"
            ),
            PublishError::DuplicateVersion(full_id) => {
                write!(
                    f,
                    "{} already exists. Version number cannot be the same.",
                    full_id
                )
            }
            PublishError::AlreadyExists(full_id) => write!(f, "{} already exists.", full_id),
            PublishError::UserAborted => write!(f, "Aborted"),
            PublishError::UnknownPublisher(name) => {
                write!(
                    f,
                    "Unknown publisher '{}'. Run 'vsxpub login {}' first.",
                    name, name
                )
            }
        }
    }
}

impl std::error::Error for PublishError {}

/// Returns the pipeline error kind carried by an `anyhow::Error`, if any.
pub fn kind_of(error: &anyhow::Error) -> Option<&PublishError> {
    error.downcast_ref::<PublishError>()
}
