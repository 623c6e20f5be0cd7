//! Asset byte sources.
//!
//! The two stack assets are addressed by a stable identifier:
//! `{root}/{id}.exr` (environment map) and `{root}/{id}.glb` (model).
//! A source resolves that address either against a directory on disk or
//! against an HTTP base URL, reporting download progress as it goes.

use std::io::ErrorKind;
use std::path::PathBuf;

use tokio::io::AsyncReadExt;

use crate::error::LoadError;

const READ_CHUNK: usize = 64 * 1024;

/// Where asset bytes come from.
#[derive(Debug, Clone)]
pub enum AssetSource {
    /// Read assets from a directory on disk.
    Fs(PathBuf),
    /// Fetch assets over HTTP(S) from a base URL.
    Http {
        base: String,
        client: reqwest::Client,
    },
}

impl AssetSource {
    /// Source backed by a directory on disk.
    pub fn fs(root: impl Into<PathBuf>) -> Self {
        Self::Fs(root.into())
    }

    /// Source backed by an HTTP(S) base URL.
    pub fn http(base: impl Into<String>) -> Self {
        Self::Http {
            base: base.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Pick the source matching a configured asset root: URLs go over
    /// HTTP, anything else is treated as a directory path.
    pub fn from_root(root: &str) -> Self {
        if root.starts_with("http://") || root.starts_with("https://") {
            Self::http(root)
        } else {
            Self::fs(root)
        }
    }

    /// Fetch the named resource, reporting progress ratios in [0, 1].
    ///
    /// The final ratio 1.0 is always reported before returning the bytes.
    pub(crate) async fn fetch(
        &self,
        name: &str,
        progress: &mut (dyn FnMut(f32) + Send),
    ) -> Result<Vec<u8>, LoadError> {
        match self {
            Self::Fs(root) => fetch_fs(root.join(name), progress).await,
            Self::Http { base, client } => {
                fetch_http(client, &format!("{base}/{name}"), progress).await
            }
        }
    }
}

async fn fetch_fs(
    path: PathBuf,
    progress: &mut (dyn FnMut(f32) + Send),
) -> Result<Vec<u8>, LoadError> {
    let mut file = tokio::fs::File::open(&path).await.map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            LoadError::NotFound(path.display().to_string())
        } else {
            LoadError::Network(format!("{}: {e}", path.display()))
        }
    })?;

    let total = file
        .metadata()
        .await
        .map_err(|e| LoadError::Network(format!("{}: {e}", path.display())))?
        .len();

    let mut out = Vec::with_capacity(total as usize);
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| LoadError::Network(format!("{}: {e}", path.display())))?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
        if total > 0 {
            progress(out.len() as f32 / total as f32);
        }
    }
    progress(1.0);
    Ok(out)
}

async fn fetch_http(
    client: &reqwest::Client,
    url: &str,
    progress: &mut (dyn FnMut(f32) + Send),
) -> Result<Vec<u8>, LoadError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| LoadError::Network(format!("{url}: {e}")))?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(LoadError::NotFound(url.to_string()));
    }
    let mut response = response
        .error_for_status()
        .map_err(|e| LoadError::Network(format!("{url}: {e}")))?;

    let total = response.content_length().filter(|len| *len > 0);
    let mut out = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| LoadError::Network(format!("{url}: {e}")))?
    {
        out.extend_from_slice(&chunk);
        if let Some(total) = total {
            progress(out.len() as f32 / total as f32);
        }
    }
    progress(1.0);
    Ok(out)
}
