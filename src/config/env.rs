use std::path::PathBuf;

use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_embedding();
        self.apply_env_overrides_index();
        if let Ok(v) = std::env::var("CODESEEK_STORE_PATH") {
            self.store.path = PathBuf::from(v);
        }
    }

    fn apply_env_overrides_embedding(&mut self) {
        if let Ok(v) = std::env::var("CODESEEK_EMBEDDING_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.embedding.provider = kind;
            } else {
                tracing::warn!("ignoring invalid CODESEEK_EMBEDDING_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("CODESEEK_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("CODESEEK_EMBEDDING_BASE_URL") {
            self.embedding.base_url = v;
        }
        if let Ok(v) = std::env::var("CODESEEK_EMBEDDING_BATCH_SIZE") {
            match v.parse::<usize>() {
                Ok(n) => self.embedding.batch_size = n,
                Err(_) => {
                    tracing::warn!("ignoring invalid CODESEEK_EMBEDDING_BATCH_SIZE value: {v}");
                }
            }
        }
        if let Ok(v) = std::env::var("CODESEEK_EMBEDDING_DIMENSIONS") {
            match v.parse::<usize>() {
                Ok(n) => self.embedding.dimensions = n,
                Err(_) => {
                    tracing::warn!("ignoring invalid CODESEEK_EMBEDDING_DIMENSIONS value: {v}");
                }
            }
        }
    }

    fn apply_env_overrides_index(&mut self) {
        if let Ok(v) = std::env::var("CODESEEK_INDEX_EXTENSIONS") {
            let extensions: Vec<String> = v
                .split(',')
                .map(|s| s.trim().trim_start_matches('.').to_owned())
                .filter(|s| !s.is_empty())
                .collect();
            if extensions.is_empty() {
                tracing::warn!("ignoring empty CODESEEK_INDEX_EXTENSIONS value");
            } else {
                self.index.extensions = extensions;
            }
        }
        if let Ok(v) = std::env::var("CODESEEK_INDEX_RESPECT_GITIGNORE") {
            match v.parse::<bool>() {
                Ok(b) => self.index.respect_gitignore = b,
                Err(_) => {
                    tracing::warn!("ignoring invalid CODESEEK_INDEX_RESPECT_GITIGNORE value: {v}");
                }
            }
        }
        if let Ok(v) = std::env::var("CODESEEK_INDEX_INCLUDE_HIDDEN") {
            match v.parse::<bool>() {
                Ok(b) => self.index.include_hidden = b,
                Err(_) => {
                    tracing::warn!("ignoring invalid CODESEEK_INDEX_INCLUDE_HIDDEN value: {v}");
                }
            }
        }
    }
}
