use anyhow::{bail, Context, Result};
use gateway_sync_core::{Manifest, Resource};
use std::path::Path;

/// Reads a desired-state manifest from a YAML (or JSON) file, deriving missing IDs from names.
pub async fn load(path: &Path) -> Result<Manifest> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse(&text).with_context(|| format!("invalid manifest {}", path.display()))
}

pub fn parse(text: &str) -> Result<Manifest> {
    let mut manifest = serde_yaml::from_str::<Manifest>(text)?;
    manifest.assign_ids();
    check_ids(&manifest.routes)?;
    check_ids(&manifest.upstreams)?;
    check_ids(&manifest.stream_routes)?;
    check_ids(&manifest.ssls)?;
    check_ids(&manifest.plugin_configs)?;
    Ok(manifest)
}

fn check_ids<K: Resource>(objs: &[K]) -> Result<()> {
    if let Some(i) = objs.iter().position(|obj| obj.id().is_empty()) {
        bail!("{} #{i} has neither an id nor a name", K::KIND);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_sync_core::id;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[tokio::test]
    async fn loads_yaml_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
upstreams:
  - name: httpbin
    nodes:
      - host: 10.0.0.1
        port: 80
        weight: 1
routes:
  - id: explicit
    uri: /ip
    upstream_id: {}
"#,
            id::derive("httpbin"),
        )
        .unwrap();

        let manifest = load(file.path()).await.unwrap();
        assert_eq!(manifest.upstreams[0].id(), id::derive("httpbin"));
        assert_eq!(manifest.routes[0].id(), "explicit");
        assert_eq!(
            manifest.routes[0].upstream_id.as_deref(),
            Some(manifest.upstreams[0].id())
        );
    }

    #[test]
    fn json_is_accepted() {
        let manifest = parse(r#"{"ssls": [{"id": "1", "snis": ["example.com"]}]}"#).unwrap();
        assert_eq!(manifest.ssls[0].snis, ["example.com"]);
    }

    #[test]
    fn anonymous_resources_are_rejected() {
        let err = parse("routes: [{uri: /ip}]").unwrap_err();
        assert!(err.to_string().contains("neither an id nor a name"), "{err}");
    }

    #[tokio::test]
    async fn missing_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("missing.yaml")).await.is_err());
    }
}
