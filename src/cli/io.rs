use std::path::Path;

use serde::de::DeserializeOwned;

use crate::infra::error::InfraError;

/// Read `path` and parse it as the JSON body a command expects.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, InfraError> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|source| InfraError::InputFile {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_slice(&data).map_err(|source| InfraError::InputFormat {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use algoref_api_types::CodeTemplateCreate;

    use super::*;

    #[tokio::test]
    async fn parses_body_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tmp file");
        file.write_all(br#"{"language_id":2,"code":"fn main() {}"}"#)
            .expect("write");
        let template: CodeTemplateCreate = read_json(file.path()).await.expect("parse");
        assert_eq!(template.language_id, 2);
        assert!(template.explanation.is_none());
    }

    #[tokio::test]
    async fn reports_missing_file_with_path() {
        let err = read_json::<CodeTemplateCreate>(Path::new("/no/such/body.json"))
            .await
            .expect_err("missing");
        assert!(err.to_string().contains("/no/such/body.json"));
    }
}
