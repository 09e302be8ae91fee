use std::io::ErrorKind;
use std::path::Path;

use anyhow::{anyhow, Result};
use tokio::fs;
use tracing::{debug, warn};

use crate::cache::credential::Credential;

/// Read the token cache record. A missing file is not an error.
pub async fn read_cached(path: &Path) -> Result<Option<Credential>> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("token cache '{}' not found", path.display());
            return Ok(None);
        }
        Err(e) => return Err(anyhow!("cannot read token cache '{}': {}", path.display(), e)),
    };

    if content.trim().is_empty() {
        warn!("token cache '{}' is empty", path.display());
        return Ok(None);
    }

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| anyhow!("token cache '{}' is malformed: {}", path.display(), e))
}

/// Write the record next to its destination, restrict it to the owner, then rename over.
pub async fn write_atomic(path: &Path, credential: &Credential) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let tmp = path.with_extension("tmp");
    let content = serde_json::to_string_pretty(credential)?;
    fs::write(&tmp, content.as_bytes()).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
    }

    fs::rename(&tmp, path).await?;
    Ok(())
}
