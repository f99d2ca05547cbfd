use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use reqwest::blocking::{Client, Response};

use crate::config::Settings;

/// Network access used by the enrichment pipeline. Each call is a single attempt;
/// retries and timeouts belong to the implementation, not to the caller.
pub trait Transport {
    fn fetch_text(&self, url: &str) -> Result<String>;

    fn download(&self, url: &str, destination: &Path) -> Result<()>;
}

pub struct HttpTransport {
    client: Client,
    user_agent: String,
}

impl HttpTransport {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            user_agent: settings.user_agent.clone(),
        })
    }

    fn get(&self, url: &str, accept: &str) -> Result<Response> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", self.user_agent.clone())
            .header("Accept", accept)
            .send()
            .with_context(|| format!("failed to fetch {url}"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {} while fetching {}", status.as_u16(), url);
        }
        Ok(response)
    }
}

impl Transport for HttpTransport {
    fn fetch_text(&self, url: &str) -> Result<String> {
        self.get(url, "text/html, text/plain;q=0.9,*/*;q=0.1")?
            .text()
            .context("failed to read response body")
    }

    fn download(&self, url: &str, destination: &Path) -> Result<()> {
        let bytes = self
            .get(url, "image/png,image/*;q=0.9,*/*;q=0.1")?
            .bytes()
            .context("failed to read response body")?;
        write_atomically(destination, &bytes)
    }
}

/// Writes next to `destination` and renames into place, so an interrupted
/// write never leaves a truncated file under the final name.
pub fn write_atomically(destination: &Path, bytes: &[u8]) -> Result<()> {
    let staging = staging_path(destination);
    if let Err(error) = fs::write(&staging, bytes) {
        let _ = fs::remove_file(&staging);
        return Err(error).with_context(|| format!("failed to write {}", staging.display()));
    }
    if let Err(error) = fs::rename(&staging, destination) {
        let _ = fs::remove_file(&staging);
        return Err(error)
            .with_context(|| format!("failed to move download into {}", destination.display()));
    }
    Ok(())
}

fn staging_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::{HttpTransport, staging_path, write_atomically};
    use crate::config::Settings;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    #[test]
    fn staging_path_sits_next_to_destination() {
        assert_eq!(
            staging_path(Path::new("/vault/assets/htb_active.png")),
            Path::new("/vault/assets/htb_active.png.part")
        );
    }

    #[test]
    fn write_atomically_leaves_only_final_file() {
        let temp = tempdir().expect("tempdir");
        let destination = temp.path().join("htb_active.png");
        write_atomically(&destination, b"\x89PNG").expect("write");
        assert_eq!(fs::read(&destination).expect("read"), b"\x89PNG");
        assert!(!temp.path().join("htb_active.png.part").exists());
    }

    #[test]
    fn write_atomically_reports_missing_directory() {
        let temp = tempdir().expect("tempdir");
        let destination = temp.path().join("missing").join("htb_active.png");
        let error = write_atomically(&destination, b"x").expect_err("must fail");
        assert!(error.to_string().contains("failed to write"));
        assert!(!staging_path(&destination).exists());
    }

    #[test]
    fn failed_rename_removes_staging_file() {
        let temp = tempdir().expect("tempdir");
        let destination = temp.path().join("htb_active.png");
        fs::create_dir(&destination).expect("occupy destination");
        fs::write(destination.join("keep"), b"x").expect("fill destination");

        let error = write_atomically(&destination, b"\x89PNG").expect_err("must fail");

        assert!(error.to_string().contains("failed to move download"));
        assert!(!staging_path(&destination).exists());
    }

    #[test]
    fn http_transport_builds_from_default_settings() {
        assert!(HttpTransport::from_settings(&Settings::default()).is_ok());
    }
}
