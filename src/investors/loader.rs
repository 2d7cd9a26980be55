use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Error, Result};

use super::dataset::{InvestorRecord, fallback_investors, parse_csv};

/// Where the investor CSV is read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatasetSource {
    File(PathBuf),
    Url(String),
    Builtin,
}

impl DatasetSource {
    /// Loads the investor dataset. Never fails: any error reading or
    /// fetching the file falls back to the built-in investors.
    pub async fn load(&self) -> Vec<InvestorRecord> {
        if *self == DatasetSource::Builtin {
            return fallback_investors();
        }

        match self.fetch().await {
            Ok(csv) => {
                let investors = parse_csv(&csv);
                tracing::info!(
                    "Successfully loaded {} investors from {}",
                    investors.len(),
                    self
                );
                investors
            }
            Err(e) => {
                tracing::error!("Error reading investor data from {}: {}", self, e);
                tracing::info!("Falling back to built-in investor data");
                fallback_investors()
            }
        }
    }

    async fn fetch(&self) -> Result<String, Error> {
        let csv = match self {
            DatasetSource::File(path) => tokio::fs::read_to_string(path).await?,
            DatasetSource::Url(url) => {
                reqwest::Client::new()
                    .get(url)
                    .timeout(Duration::from_secs(30))
                    .send()
                    .await?
                    .error_for_status()?
                    .text()
                    .await?
            }
            DatasetSource::Builtin => anyhow::bail!("The built-in dataset is not fetched"),
        };
        Ok(csv)
    }
}

impl std::fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetSource::File(path) => write!(f, "{}", path.display()),
            DatasetSource::Url(url) => write!(f, "{}", url),
            DatasetSource::Builtin => write!(f, "built-in dataset"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const CSV: &str = "Investor name,Website,Global HQ\n\"Acme Ventures, LLC\",https://acme.vc,\"Austin, TX\"\nBeta Capital,https://beta.vc,London\n";

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CSV.as_bytes()).unwrap();

        let investors = DatasetSource::File(file.path().to_path_buf()).load().await;

        assert_eq!(investors.len(), 2);
        assert_eq!(investors[0].name(), "Acme Ventures, LLC");
        assert_eq!(investors[0].headquarters(), "Austin, TX");
    }

    #[tokio::test]
    async fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let source = DatasetSource::File(dir.path().join("missing.csv"));

        assert_eq!(source.load().await, fallback_investors());
    }

    #[tokio::test]
    async fn test_builtin_source() {
        assert_eq!(DatasetSource::Builtin.load().await.len(), 5);
    }

    #[tokio::test]
    async fn test_load_from_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/data/vcs.csv")
            .with_status(200)
            .with_header("content-type", "text/csv")
            .with_body(CSV)
            .create_async()
            .await;

        let source = DatasetSource::Url(format!("{}/data/vcs.csv", server.url()));
        let investors = source.load().await;

        mock.assert_async().await;
        assert_eq!(investors.len(), 2);
        assert_eq!(investors[1].name(), "Beta Capital");
    }

    #[tokio::test]
    async fn test_url_not_found_falls_back() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/data/vcs.csv")
            .with_status(404)
            .with_body("<html>not found</html>")
            .create_async()
            .await;

        let source = DatasetSource::Url(format!("{}/data/vcs.csv", server.url()));

        assert_eq!(source.load().await, fallback_investors());
    }
}
