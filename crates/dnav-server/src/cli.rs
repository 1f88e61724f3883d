//! One-shot extraction from the command line.

use std::path::Path;

use anyhow::Context;
use tracing::info;

use dnav_augment::LLMConfig;
use dnav_core::{ExtractionConfig, ExtractionMode, ExtractionOutput};
use dnav_runtime::{ExtractRequest, Extractor};

use crate::config::ServerConfig;

/// Arguments of `dnav extract`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractArgs {
    pub request: String,
    pub mode: Option<ExtractionMode>,
}

impl ExtractArgs {
    /// Parse `<request.json> [--mode m]`.
    pub fn parse(args: &[String]) -> anyhow::Result<Self> {
        let mut request = None;
        let mut mode = None;
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--mode" | "-m" => {
                    let value = iter.next().context("--mode needs a value")?;
                    mode = Some(value.parse::<ExtractionMode>()?);
                }
                other if other.starts_with("--mode=") => {
                    mode = Some(other["--mode=".len()..].parse::<ExtractionMode>()?);
                }
                other if request.is_none() => request = Some(other.to_string()),
                other => anyhow::bail!("Unexpected argument: {}", other),
            }
        }
        Ok(Self {
            request: request.context("Usage: dnav extract <request.json> [--mode local|extract|refine]")?,
            mode,
        })
    }
}

/// Read a request file, run it and return the response body.
pub async fn run_extract(args: &ExtractArgs, config: &ServerConfig) -> anyhow::Result<ExtractionOutput> {
    let body = std::fs::read_to_string(Path::new(&args.request))
        .with_context(|| format!("Failed to read {}", args.request))?;
    let request = ExtractRequest::from_json(&body)?.validate()?;
    let mode = args.mode.or(request.mode);

    let llm_config = LLMConfig::load(&config.llm_config_file());
    let extractor = Extractor::from_llm_config(ExtractionConfig::from_env(), &llm_config);
    info!("Extracting {} ({} pages)", request.document.name, request.document.pages.len());
    Ok(extractor.extract(&request.document, mode).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let a = ExtractArgs::parse(&args(&["req.json", "--mode", "refine"])).unwrap();
        assert_eq!(a.request, "req.json");
        assert_eq!(a.mode, Some(ExtractionMode::Refine));

        let a = ExtractArgs::parse(&args(&["--mode=local", "req.json"])).unwrap();
        assert_eq!(a.mode, Some(ExtractionMode::Local));

        assert!(ExtractArgs::parse(&args(&[])).is_err());
        assert!(ExtractArgs::parse(&args(&["req.json", "--mode"])).is_err());
        assert!(ExtractArgs::parse(&args(&["req.json", "--mode", "magic"])).is_err());
        assert!(ExtractArgs::parse(&args(&["a.json", "b.json"])).is_err());
    }

    #[tokio::test]
    async fn test_run_extract_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("request.json");
        std::fs::write(
            &path,
            r#"{"fileName":"memo.pdf","numPages":1,"pages":[{"pageNumber":1,"text":"Tesla will begin volume production of the new platform in Q2 2026."}]}"#,
        )
        .unwrap();
        let config = ServerConfig {
            port: 0,
            data_dir: dir.path().to_path_buf(),
        };
        let a = ExtractArgs {
            request: path.display().to_string(),
            mode: Some(ExtractionMode::Local),
        };
        let out = run_extract(&a, &config).await.unwrap();
        assert_eq!(out.doc.name, "memo.pdf");
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.meta.mode, ExtractionMode::Local);
    }
}
